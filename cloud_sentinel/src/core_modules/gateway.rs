// THEORY:
// The analysis gateway is the sentinel's only window onto the remote vision
// model. It is treated as a black box with two properties that matter: it is
// slow, and it fails. The module therefore has two layers:
//
// 1.  **`AnalysisGateway`**: the raw, fallible call. Implementations send one
//     image, get one reply, and return either a validated `HazardReport` or a
//     `GatewayError`.
// 2.  **`observe`**: the boundary the orchestrator actually calls. It times the
//     call and folds every failure into an `ERROR` report, so from the loop's
//     point of view every call succeeds and carries a status.
//
// `GeminiGateway` is the production backend. It speaks the Generative Language
// REST API directly: the frame travels base64-encoded inside the request body
// next to a fixed instruction prompt, and the model is told to answer with
// JSON only.

use crate::config::SentinelConfig;
use crate::core_modules::report::HazardReport;
use crate::error::GatewayError;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Instant;
use tracing::{debug, warn};

/// The fixed instruction sent with every frame.
pub const HAZARD_PROMPT: &str = "Analyze this industrial scene for safety hazards. Return ONLY valid JSON with fields: status (SAFE/DANGER), hazards (list), description.";

const MAX_ERROR_BODY_CHARS: usize = 512;

/// The key travels in a header, never in the URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    /// Sends one JPEG-encoded frame for assessment.
    async fn analyze(&self, image: &[u8]) -> Result<HazardReport, GatewayError>;
}

/// Calls the gateway, measuring wall-clock latency. Never fails: errors become
/// an `ERROR` report with an empty hazard list and the cause as description.
pub async fn observe(gateway: &dyn AnalysisGateway, image: &[u8]) -> HazardReport {
    let started = Instant::now();
    let result = gateway.analyze(image).await;
    let latency = started.elapsed();

    match result {
        Ok(report) => {
            debug!("{} answered {} in {:?}", gateway.name(), report.status, latency);
            report.with_latency(latency)
        }
        Err(e) => {
            warn!("⚠️ {} failed after {:?}: {}", gateway.name(), latency, e);
            HazardReport::error(e.to_string()).with_latency(latency)
        }
    }
}

// --- Generative Language REST backend ---

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
}

/// `AnalysisGateway` backed by the Generative Language REST API.
pub struct GeminiGateway {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGateway {
    pub fn from_config(config: &SentinelConfig) -> Result<Self, GatewayError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            api_key: config.api_key.clone().unwrap_or_default(),
            model: config.model.clone(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> String {
        let model = self.model.strip_prefix("models/").unwrap_or(&self.model);
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// The request body for one frame: prompt, inline JPEG, JSON-only reply.
    pub fn request_body(image: &[u8]) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": HAZARD_PROMPT },
                    {
                        "inline_data": {
                            "mime_type": "image/jpeg",
                            "data": general_purpose::STANDARD.encode(image),
                        }
                    }
                ]
            }],
            "generationConfig": { "responseMimeType": "application/json" }
        })
    }

    /// Lists the model names visible to the configured key, across all pages.
    pub async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        let url = format!("{}/models", self.base_url);
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(&url).header(API_KEY_HEADER, &self.api_key);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = request.send().await?;
            let body = checked_body(response).await?;
            let page: ModelList =
                serde_json::from_str(&body).map_err(|e| GatewayError::MalformedReport(e.to_string()))?;

            names.extend(page.models.into_iter().map(|m| m.name));
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(names)
    }
}

#[async_trait]
impl AnalysisGateway for GeminiGateway {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn analyze(&self, image: &[u8]) -> Result<HazardReport, GatewayError> {
        if image.is_empty() {
            return Err(GatewayError::Encode("frame is empty".to_string()));
        }
        debug!("☁️ Sending {} byte frame to {}", image.len(), self.model);

        let response = self
            .client
            .post(self.generate_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&Self::request_body(image))
            .send()
            .await?;
        let body = checked_body(response).await?;
        let text = reply_text(&body)?;
        HazardReport::from_model_text(&text)
    }
}

/// Reads the body, turning a non-success status into `GatewayError::Status`.
async fn checked_body(response: reqwest::Response) -> Result<String, GatewayError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(GatewayError::Status {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }
    Ok(body)
}

/// Concatenated text parts of the first candidate.
fn reply_text(body: &str) -> Result<String, GatewayError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| GatewayError::MalformedReport(e.to_string()))?;
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(GatewayError::EmptyResponse);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::report::HazardStatus;
    use std::time::Duration;

    struct ScriptedGateway(&'static str);

    #[async_trait]
    impl AnalysisGateway for ScriptedGateway {
        fn name(&self) -> &str {
            "scripted"
        }
        async fn analyze(&self, _image: &[u8]) -> Result<HazardReport, GatewayError> {
            HazardReport::from_model_text(self.0)
        }
    }

    struct SlowFailingGateway;

    #[async_trait]
    impl AnalysisGateway for SlowFailingGateway {
        fn name(&self) -> &str {
            "slow"
        }
        async fn analyze(&self, _image: &[u8]) -> Result<HazardReport, GatewayError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err(GatewayError::Status {
                status: 429,
                body: "quota exceeded".to_string(),
            })
        }
    }

    fn test_config() -> SentinelConfig {
        SentinelConfig {
            api_key: Some("test-key".to_string()),
            model: "models/gemini-flash-latest".to_string(),
            api_base: "https://example.invalid/v1beta/".to_string(),
            ..SentinelConfig::default()
        }
    }

    #[tokio::test]
    async fn observe_passes_reports_through_with_latency() {
        let gateway = ScriptedGateway(r#"{"status":"DANGER","hazards":["fire"],"description":"flames"}"#);
        let report = observe(&gateway, b"jpeg").await;
        assert_eq!(report.status, HazardStatus::Danger);
        assert_eq!(report.hazards, vec!["fire"]);
    }

    #[tokio::test]
    async fn parse_failure_becomes_error_report() {
        let gateway = ScriptedGateway("not json at all");
        let report = observe(&gateway, b"jpeg").await;
        assert_eq!(report.status, HazardStatus::Error);
        assert!(report.hazards.is_empty());
        assert!(!report.description.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_becomes_error_report_and_keeps_latency() {
        let report = observe(&SlowFailingGateway, b"jpeg").await;
        assert_eq!(report.status, HazardStatus::Error);
        assert!(report.description.contains("429"));
        assert!(report.latency >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn empty_frame_is_rejected_before_any_request() {
        let gateway = GeminiGateway::from_config(&test_config()).unwrap();
        let report = observe(&gateway, &[]).await;
        assert_eq!(report.status, HazardStatus::Error);
        assert!(report.description.contains("frame is empty"));
    }

    #[tokio::test]
    async fn transport_failure_never_exposes_the_api_key() {
        let config = SentinelConfig {
            api_key: Some("SECRET-KEY-123".to_string()),
            api_base: "http://127.0.0.1:9/v1beta".to_string(),
            request_timeout: Some(Duration::from_secs(2)),
            ..SentinelConfig::default()
        };
        let gateway = GeminiGateway::from_config(&config).unwrap();

        let report = observe(&gateway, b"jpeg").await;
        assert_eq!(report.status, HazardStatus::Error);
        assert!(report.description.starts_with("transport error"));
        assert!(!report.description.contains("SECRET-KEY-123"));

        let err = gateway.list_models().await.unwrap_err();
        assert!(!err.to_string().contains("SECRET-KEY-123"));
    }

    #[test]
    fn url_uses_bare_model_name() {
        let gateway = GeminiGateway::from_config(&test_config()).unwrap();
        assert_eq!(
            gateway.generate_url(),
            "https://example.invalid/v1beta/models/gemini-flash-latest:generateContent"
        );
    }

    #[test]
    fn request_body_carries_prompt_and_inline_jpeg() {
        let body = GeminiGateway::request_body(&[0xFF, 0xD8, 0xFF]);
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], HAZARD_PROMPT);
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], "/9j/");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn reply_text_joins_parts_of_first_candidate() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"status\":"},{"text":"\"SAFE\"}"}]}}]}"#;
        assert_eq!(reply_text(body).unwrap(), r#"{"status":"SAFE"}"#);
    }

    #[test]
    fn reply_without_candidates_is_empty_response() {
        assert!(matches!(
            reply_text(r#"{"candidates":[]}"#).unwrap_err(),
            GatewayError::EmptyResponse
        ));
        assert!(matches!(
            reply_text(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap_err(),
            GatewayError::EmptyResponse
        ));
    }
}

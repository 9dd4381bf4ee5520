// THEORY:
// A `HazardReport` is what one analysis cycle learns about one frame. The vision
// model is an untrusted upstream: it is asked for a strict JSON object but may
// wrap it in a code fence, omit fields, or invent a status. This module turns
// whatever text comes back into a validated, fully-populated report with
// explicit defaults, so nothing downstream does free-form dictionary access.
//
// Defaults: missing `hazards` is an empty list, missing `description` is empty,
// and a missing or unknown `status` is treated as `ERROR`. Text that is not a
// JSON object at all is a contract violation and is reported as a
// `GatewayError`, which the gateway boundary folds into an `ERROR` report.

use crate::error::GatewayError;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardStatus {
    Safe,
    Danger,
    Error,
}

impl HazardStatus {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SAFE" => Some(HazardStatus::Safe),
            "DANGER" => Some(HazardStatus::Danger),
            "ERROR" => Some(HazardStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for HazardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HazardStatus::Safe => "SAFE",
            HazardStatus::Danger => "DANGER",
            HazardStatus::Error => "ERROR",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HazardReport {
    pub status: HazardStatus,
    /// Short free-text hazard descriptors, in the order the model gave them.
    pub hazards: Vec<String>,
    pub description: String,
    /// Wall-clock time of the gateway call. Observability only.
    pub latency: Duration,
}

/// Loose mirror of the JSON the model is asked to produce.
#[derive(Debug, Default, Deserialize)]
struct ModelReply {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    hazards: Option<Vec<Value>>,
    #[serde(default)]
    description: Option<String>,
}

impl HazardReport {
    pub fn safe(description: impl Into<String>) -> Self {
        Self {
            status: HazardStatus::Safe,
            hazards: Vec::new(),
            description: description.into(),
            latency: Duration::ZERO,
        }
    }

    pub fn danger(hazards: Vec<String>, description: impl Into<String>) -> Self {
        Self {
            status: HazardStatus::Danger,
            hazards,
            description: description.into(),
            latency: Duration::ZERO,
        }
    }

    /// An `ERROR` report carrying the failure cause as its description.
    pub fn error(cause: impl Into<String>) -> Self {
        Self {
            status: HazardStatus::Error,
            hazards: Vec::new(),
            description: cause.into(),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn is_danger(&self) -> bool {
        self.status == HazardStatus::Danger
    }

    /// Validates the model's text reply into a report.
    pub fn from_model_text(text: &str) -> Result<Self, GatewayError> {
        let body = strip_code_fence(text);
        if body.is_empty() {
            return Err(GatewayError::EmptyResponse);
        }

        let value: Value =
            serde_json::from_str(body).map_err(|e| GatewayError::MalformedReport(e.to_string()))?;
        if !value.is_object() {
            return Err(GatewayError::MalformedReport(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        }
        let reply: ModelReply =
            serde_json::from_value(value).map_err(|e| GatewayError::MalformedReport(e.to_string()))?;

        let hazards: Vec<String> = reply
            .hazards
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect();
        let description = reply.description.unwrap_or_default();

        let status = match reply.status.as_deref().and_then(HazardStatus::parse) {
            Some(status) => status,
            None => {
                let note = match reply.status {
                    Some(raw) => format!("model returned unknown status '{raw}'"),
                    None => "model reply had no status".to_string(),
                };
                let description = if description.is_empty() {
                    note
                } else {
                    format!("{note}: {description}")
                };
                return Ok(Self {
                    status: HazardStatus::Error,
                    hazards,
                    description,
                    latency: Duration::ZERO,
                });
            }
        };

        Ok(Self {
            status,
            hazards,
            description,
            latency: Duration::ZERO,
        })
    }
}

/// Removes a surrounding Markdown code fence (```json ... ```), if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn danger_reply_is_parsed() {
        let report = HazardReport::from_model_text(
            r#"{"status": "DANGER", "hazards": ["fire near exit", "smoke"], "description": "Active fire."}"#,
        )
        .unwrap();
        assert_eq!(report.status, HazardStatus::Danger);
        assert_eq!(report.hazards, vec!["fire near exit", "smoke"]);
        assert_eq!(report.description, "Active fire.");
        assert!(report.is_danger());
    }

    #[test]
    fn safe_reply_with_missing_hazards_defaults_to_empty() {
        let report = HazardReport::from_model_text(r#"{"status": "safe", "description": "All clear"}"#).unwrap();
        assert_eq!(report.status, HazardStatus::Safe);
        assert!(report.hazards.is_empty());
    }

    #[test]
    fn missing_status_is_treated_as_error() {
        let report = HazardReport::from_model_text(r#"{"hazards": ["spill"]}"#).unwrap();
        assert_eq!(report.status, HazardStatus::Error);
        assert_eq!(report.hazards, vec!["spill"]);
        assert_eq!(report.description, "model reply had no status");
    }

    #[test]
    fn unknown_status_is_treated_as_error() {
        let report =
            HazardReport::from_model_text(r#"{"status": "MAYBE", "hazards": [], "description": "unsure"}"#).unwrap();
        assert_eq!(report.status, HazardStatus::Error);
        assert_eq!(report.description, "model returned unknown status 'MAYBE': unsure");
    }

    #[test]
    fn fenced_reply_is_unwrapped() {
        let text = "```json\n{\"status\": \"DANGER\", \"hazards\": [\"roof damage\"], \"description\": \"\"}\n```";
        let report = HazardReport::from_model_text(text).unwrap();
        assert_eq!(report.hazards, vec!["roof damage"]);
    }

    #[test]
    fn non_string_hazards_are_stringified_and_blanks_dropped() {
        let report = HazardReport::from_model_text(
            r#"{"status": "DANGER", "hazards": [{"type": "fire"}, "  ", null, "smoke "]}"#,
        )
        .unwrap();
        assert_eq!(report.hazards, vec![r#"{"type":"fire"}"#, "smoke"]);
    }

    #[test]
    fn malformed_json_is_a_gateway_error() {
        let err = HazardReport::from_model_text("I think there is a fire").unwrap_err();
        assert!(matches!(err, GatewayError::MalformedReport(_)));
    }

    #[test]
    fn json_array_is_a_gateway_error() {
        let err = HazardReport::from_model_text(r#"["fire"]"#).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedReport(msg) if msg.contains("an array")));
    }

    #[test]
    fn blank_reply_is_empty_response() {
        assert!(matches!(
            HazardReport::from_model_text("   ").unwrap_err(),
            GatewayError::EmptyResponse
        ));
    }

    #[test]
    fn error_constructor_has_no_hazards() {
        let report = HazardReport::error("timeout").with_latency(Duration::from_millis(1200));
        assert_eq!(report.status, HazardStatus::Error);
        assert!(report.hazards.is_empty());
        assert_eq!(report.description, "timeout");
        assert_eq!(report.latency, Duration::from_millis(1200));
    }
}

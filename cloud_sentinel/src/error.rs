// THEORY:
// Every failure the sentinel can meet is named here, one enum per concern. The
// loop never dies on the recoverable ones: gateway failures are folded into an
// `ERROR` report and store failures into a `DB_ERROR` recommendation. Only the
// administrative tools and the frame sources surface errors to their callers.

use std::path::PathBuf;
use thiserror::Error;

/// Failure talking to the remote vision backend or understanding its reply.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The request never completed (DNS, TLS, connection reset, timeout).
    /// The URL is stripped on conversion so credentials never reach a message.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The backend answered with a non-success HTTP status.
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend answered but produced no text to parse.
    #[error("backend returned no content")]
    EmptyResponse,

    /// The model text was not the JSON object we asked for.
    #[error("malformed hazard report: {0}")]
    MalformedReport(String),

    /// The frame could not be prepared for upload.
    #[error("frame encoding failed: {0}")]
    Encode(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Transport(e.without_url())
    }
}

/// Failure opening or querying the rule store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cannot open rule store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("rule store query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// The blocking worker that owns the connection panicked or was cancelled.
    #[error("rule store worker failed: {0}")]
    Worker(String),
}

/// A rule set that would violate the store's identity rules.
#[derive(Error, Debug)]
pub enum RuleSetError {
    #[error("hazard keyword must not be empty")]
    EmptyKeyword,

    #[error("protocol code must not be empty")]
    EmptyCode,

    #[error("protocol '{0}' has an empty action")]
    EmptyAction(String),

    #[error("duplicate hazard keyword '{0}'")]
    DuplicateKeyword(String),

    #[error("duplicate protocol code '{0}'")]
    DuplicateCode(String),

    #[error("trigger references unknown hazard keyword '{0}'")]
    UnknownKeyword(String),

    #[error("trigger references unknown protocol code '{0}'")]
    UnknownCode(String),

    #[error("unknown severity '{0}'")]
    UnknownSeverity(String),

    #[error("cannot read rule file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse rule file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Environment configuration that is present but unusable, or missing when required.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidVar {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Failure producing frames from a source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("frame source i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot decode frame {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cannot encode frame: {0}")]
    Encode(#[from] image::ImageError),

    /// Errors raised by an external decoder (e.g. a video backend).
    #[error("frame backend error: {0}")]
    Backend(String),
}

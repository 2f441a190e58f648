use bytes::Bytes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Access key is not configured (set ACCESS_KEY)")]
    MissingAccessKey,
}

/// Failures on the capture side, before or while handing the payload to the stream.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to serialize request: {0}")]
    Serialize(String),

    #[error("failed to put record to stream {stream}: {message}")]
    Submit { stream: String, message: String },
}

/// Failure value of `CaptureTransport::execute`.
///
/// Carries the synthesized response (already downgraded to 500) next to the cause.
#[derive(Error, Debug)]
#[error("{source}")]
pub struct DeliveryError {
    #[source]
    pub source: CaptureError,
    pub response: http::Response<Bytes>,
}

impl DeliveryError {
    pub fn into_response(self) -> http::Response<Bytes> {
        self.response
    }
}

/// A record whose payload is not a replayable HTTP request.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RecordError {
    #[error("invalid request head: {0}")]
    Head(String),

    #[error("incomplete request head")]
    Incomplete,

    #[error("unsupported request target: {0}")]
    Target(String),

    #[error("missing Host header for origin-form target {0}")]
    MissingHost(String),

    #[error("invalid header {0}")]
    Header(String),

    #[error("body truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("invalid chunked body: {0}")]
    Chunked(String),
}

/// A real delivery failure; stops the rest of the batch.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReplayError {
    #[error("{0}")]
    Execute(String),

    #[error("failed to request to {url} with status {status}")]
    Status { url: String, status: u16 },
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Capture failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP server error: {0}")]
    Server(#[from] hyper::Error),

}

pub type Result<T> = std::result::Result<T, RelayError>;

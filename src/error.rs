use thiserror::Error;

const MAX_BODY_CHARS: usize = 512;
const MAX_INPUT_CHARS: usize = 64;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no image data found in {context}")]
    NoImageData { context: String },

    #[error("invalid data URL '{input}': {reason}")]
    InvalidDataUrl { input: String, reason: String },

    #[error("invalid base64 image payload: {reason}")]
    InvalidBase64 { reason: String },

    #[error("failed to fetch image '{url}': HTTP {status} {reason}")]
    Fetch {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("upstream API rejected the request (HTTP {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("unsupported {shape} response shape: {reason}")]
    UnsupportedShape { shape: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid tool call: {0}")]
    Protocol(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    pub fn invalid_data_url(input: &str, reason: impl Into<String>) -> Self {
        BridgeError::InvalidDataUrl {
            input: truncate(input, MAX_INPUT_CHARS),
            reason: reason.into(),
        }
    }

    pub fn upstream(status: u16, body: &str) -> Self {
        BridgeError::Upstream {
            status,
            body: truncate(body, MAX_BODY_CHARS),
        }
    }
}

pub fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

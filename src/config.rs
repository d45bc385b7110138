use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_IMAGE_MODEL, DEFAULT_OUTPUT_DIR_NAME,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::error::{BridgeError, Result};
use std::{env, path::PathBuf, time::Duration};

/// Process-wide settings, resolved once at startup and passed down.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_base_url: String,
    pub output_dir: PathBuf,
    pub request_timeout: Duration,
    pub default_model: String,
}

impl Config {
    pub fn new(
        api_key: impl Into<String>,
        api_base_url: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            output_dir: output_dir.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            default_model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| BridgeError::Config("OPENAI_API_KEY is not set".to_string()))?;

        let api_base_url = env_or("OPENAI_BASE_URL", DEFAULT_API_BASE_URL);
        let output_dir = match env::var("IMAGE_OUTPUT_DIR") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
            _ => env::current_dir()?.join(DEFAULT_OUTPUT_DIR_NAME),
        };

        let mut config = Config::new(api_key, api_base_url, output_dir);
        if let Ok(raw) = env::var("REQUEST_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                BridgeError::Config(format!("REQUEST_TIMEOUT_SECS is not a number: '{}'", raw))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        config.default_model = env_or("DEFAULT_IMAGE_MODEL", DEFAULT_IMAGE_MODEL);
        Ok(config)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

use crate::constants::MAX_IMAGES_PER_REQUEST;
use crate::error::{BridgeError, Result};
use crate::normalize::RequestParams;
use serde::Deserialize;
use serde_json::Value;

pub const GENERATE_IMAGE_TOOL: &str = "generate_image";
pub const ANALYZE_IMAGE_TOOL: &str = "analyze_image";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageArgs {
    #[serde(alias = "promptText")]
    pub prompt: String,
    #[serde(default, alias = "modelId")]
    pub model: Option<String>,
    #[serde(default = "default_true", alias = "save_to_file")]
    pub save_to_file: bool,
    #[serde(default, alias = "filenameHint")]
    pub filename: Option<String>,
    #[serde(default, alias = "fullResponseRequested", alias = "full_response")]
    pub full_response: bool,
    #[serde(default, alias = "n")]
    pub count: Option<u8>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeImageArgs {
    /// Local file path, http(s) URL or data URL.
    #[serde(alias = "image_source", alias = "image")]
    pub image_source: String,
    #[serde(default, alias = "instructions")]
    pub prompt: Option<String>,
    #[serde(default, alias = "modelId")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    GenerateImage(GenerateImageArgs),
    AnalyzeImage(AnalyzeImageArgs),
}

impl ToolCall {
    pub fn parse(name: &str, arguments: Value) -> Result<Self> {
        let call = match name {
            GENERATE_IMAGE_TOOL => ToolCall::GenerateImage(parse_args(name, arguments)?),
            ANALYZE_IMAGE_TOOL => ToolCall::AnalyzeImage(parse_args(name, arguments)?),
            other => return Err(BridgeError::Protocol(format!("unknown tool '{}'", other))),
        };
        Ok(call)
    }
}

impl GenerateImageArgs {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            save_to_file: true,
            filename: None,
            full_response: false,
            count: None,
            size: None,
            quality: None,
            style: None,
        }
    }

    pub fn image_count(&self) -> u8 {
        self.count.unwrap_or(1).clamp(1, MAX_IMAGES_PER_REQUEST)
    }

    pub fn params(&self, default_model: &str) -> RequestParams {
        RequestParams {
            model: self.model_or(default_model),
            prompt: self.prompt.clone(),
            save_to_file: self.save_to_file,
            file_name: self.filename.clone(),
            full_response: self.full_response,
        }
    }

    pub fn model_or(&self, default_model: &str) -> String {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .unwrap_or(default_model)
            .to_string()
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(name: &str, arguments: Value) -> Result<T> {
    serde_json::from_value(arguments)
        .map_err(|err| BridgeError::Protocol(format!("invalid arguments for '{}': {}", name, err)))
}

fn default_true() -> bool {
    true
}

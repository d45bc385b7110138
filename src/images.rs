use crate::chat::Usage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct OpenAiImageRequestBody {
    pub model: String,
    pub prompt: String,
    pub n: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageGeneration {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub b64_json: Option<String>,
    #[serde(default)]
    pub revised_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageApiResponse {
    pub data: Vec<ImageGeneration>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

use crate::chat::{ChatApiResponse, Usage};
use crate::constants::{DEFAULT_FILE_BASE_NAME, FALLBACK_IMAGE_MIME};
use crate::error::{BridgeError, Result};
use crate::extract::extract_image_reference;
use crate::images::{ImageApiResponse, ImageGeneration};
use crate::persist::ImagePersister;
use crate::reference::{strip_base64_prefix, ImageReference};
use log::debug;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Schema family of an upstream response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Chat,
    ImageGeneration,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeKind::Chat => write!(f, "chat"),
            ShapeKind::ImageGeneration => write!(f, "image generation"),
        }
    }
}

/// The parts of the inbound call the normalizer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    pub model: String,
    pub prompt: String,
    pub save_to_file: bool,
    pub file_name: Option<String>,
    pub full_response: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ImageDescriptor {
    Url {
        url: String,
        #[serde(rename = "revisedPrompt", skip_serializing_if = "Option::is_none")]
        revised_prompt: Option<String>,
    },
    Base64 {
        #[serde(rename = "sizeKB")]
        size_kb: u64,
        format: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<String>,
        #[serde(rename = "revisedPrompt", skip_serializing_if = "Option::is_none")]
        revised_prompt: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageSummary {
    pub tokens: u64,
}

impl From<Usage> for UsageSummary {
    fn from(usage: Usage) -> Self {
        Self {
            tokens: usage.total_tokens,
        }
    }
}

/// Uniform result returned to the caller whatever the upstream shape was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub success: bool,
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub saved_files: Vec<Option<PathBuf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageSummary>,
}

impl GenerationResult {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            success: true,
            model: model.into(),
            prompt: prompt.into(),
            text: None,
            image: None,
            images: Vec::new(),
            saved_to: None,
            saved_files: Vec::new(),
            usage: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseNormalizer {
    persister: ImagePersister,
}

impl ResponseNormalizer {
    pub fn new(persister: ImagePersister) -> Self {
        Self { persister }
    }

    pub fn persister(&self) -> &ImagePersister {
        &self.persister
    }

    pub async fn normalize(
        &self,
        params: &RequestParams,
        body: &str,
        shape: ShapeKind,
    ) -> Result<GenerationResult> {
        debug!("normalizing {} response ({} bytes)", shape, body.len());
        match shape {
            ShapeKind::Chat => self.normalize_chat(params, body).await,
            ShapeKind::ImageGeneration => self.normalize_generation(params, body).await,
        }
    }

    async fn normalize_chat(&self, params: &RequestParams, body: &str) -> Result<GenerationResult> {
        let response: ChatApiResponse = serde_json::from_str(body)
            .map_err(|err| unsupported(ShapeKind::Chat, format!("unparsable body: {}", err)))?;
        let message = response
            .first_message()
            .ok_or_else(|| unsupported(ShapeKind::Chat, "response has no choices"))?;

        let mut result = GenerationResult::new(&params.model, &params.prompt);
        result.usage = response.usage.map(UsageSummary::from);

        let text = message.text();
        let text = text.trim();
        // An inline data URL is reported through the image descriptor.
        if !text.is_empty() && !text.starts_with("data:") {
            result.text = Some(text.to_string());
        }

        let Some(reference) = extract_image_reference(&response) else {
            return Ok(result);
        };
        result.image = Some(describe_reference(&reference, params.full_response));

        if params.save_to_file {
            self.save(params, &[reference], &mut result).await?;
        }
        Ok(result)
    }

    async fn normalize_generation(
        &self,
        params: &RequestParams,
        body: &str,
    ) -> Result<GenerationResult> {
        let shape = ShapeKind::ImageGeneration;
        let response: ImageApiResponse = serde_json::from_str(body)
            .map_err(|err| unsupported(shape, format!("unparsable body: {}", err)))?;
        if response.data.is_empty() {
            return Err(unsupported(shape, "response contains no images"));
        }

        let mut references = Vec::with_capacity(response.data.len());
        let mut descriptors = Vec::with_capacity(response.data.len());
        for (index, entry) in response.data.iter().enumerate() {
            let (reference, descriptor) = generation_entry(entry, params.full_response)
                .ok_or_else(|| {
                    unsupported(
                        shape,
                        format!("entry {} has neither 'url' nor 'b64_json'", index + 1),
                    )
                })?;
            references.push(reference);
            descriptors.push(descriptor);
        }

        let mut result = GenerationResult::new(&params.model, &params.prompt);
        result.usage = response.usage.map(UsageSummary::from);
        result.image = descriptors.first().cloned();
        result.images = descriptors;

        if params.save_to_file {
            self.save(params, &references, &mut result).await?;
        }
        Ok(result)
    }

    async fn save(
        &self,
        params: &RequestParams,
        references: &[ImageReference],
        result: &mut GenerationResult,
    ) -> Result<()> {
        let base_name = params
            .file_name
            .as_deref()
            .unwrap_or(DEFAULT_FILE_BASE_NAME);
        let saved = self.persister.persist(references, base_name).await?;
        result.saved_to = saved.iter().flatten().next().cloned();
        result.saved_files = saved;
        Ok(())
    }
}

fn generation_entry(
    entry: &ImageGeneration,
    full_response: bool,
) -> Option<(ImageReference, ImageDescriptor)> {
    let revised_prompt = entry.revised_prompt.clone();
    if let Some(b64) = entry.b64_json.as_deref().filter(|value| !value.trim().is_empty()) {
        let (format, payload) = match strip_base64_prefix(b64) {
            Some((mime, payload)) => (
                mime.unwrap_or_else(|| FALLBACK_IMAGE_MIME.to_string()),
                payload,
            ),
            None => (FALLBACK_IMAGE_MIME.to_string(), b64.trim()),
        };
        let descriptor = ImageDescriptor::Base64 {
            size_kb: size_kb(payload),
            format,
            data: full_response.then(|| payload.to_string()),
            revised_prompt,
        };
        return Some((ImageReference::base64(b64), descriptor));
    }

    let url = entry.url.as_deref().map(str::trim).filter(|url| !url.is_empty())?;
    let descriptor = ImageDescriptor::Url {
        url: url.to_string(),
        revised_prompt,
    };
    Some((ImageReference::remote_url(url), descriptor))
}

fn describe_reference(reference: &ImageReference, full_response: bool) -> ImageDescriptor {
    if let Some(data_url) = reference.as_data_url() {
        let (format, payload) = split_data_url(data_url);
        return ImageDescriptor::Base64 {
            size_kb: size_kb(payload),
            format,
            data: full_response.then(|| payload.to_string()),
            revised_prompt: None,
        };
    }

    ImageDescriptor::Url {
        url: reference.url().unwrap_or_default().to_string(),
        revised_prompt: None,
    }
}

/// Mime type and payload text of a data URL.
fn split_data_url(data_url: &str) -> (String, &str) {
    let rest = data_url.get(5..).unwrap_or_default();
    let (meta, payload) = rest.split_once(',').unwrap_or(("", rest));
    let mime = meta
        .split(';')
        .next()
        .map(str::trim)
        .filter(|mime| !mime.is_empty())
        .unwrap_or(FALLBACK_IMAGE_MIME)
        .to_ascii_lowercase();
    (mime, payload)
}

/// Size of the encoded text in KB, rounded. This overstates the decoded size
/// by the base64 overhead.
pub fn size_kb(encoded: &str) -> u64 {
    (encoded.len() as f64 / 1024.0).round() as u64
}

fn unsupported(shape: ShapeKind, reason: impl Into<String>) -> BridgeError {
    BridgeError::UnsupportedShape {
        shape: shape.to_string(),
        reason: reason.into(),
    }
}

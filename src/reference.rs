use crate::constants::{ALLOWED_EXTENSIONS, FALLBACK_EXTENSION, FALLBACK_IMAGE_MIME};
use crate::error::{BridgeError, Result};
use log::debug;
use percent_encoding::percent_decode_str;
use reqwest::{header::CONTENT_TYPE, Client, Url};
use std::path::Path;

/// Where the bytes of an image live before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// An http(s) URL. A `data:` URL stored here is parsed instead of fetched.
    RemoteUrl(String),
    DataUrl(String),
    /// Raw base64 text, possibly still carrying a `data:<mime>;base64,` prefix.
    Base64(String),
    RawBytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub source: ImageSource,
    /// Declared content type. Only consulted when resolution discovers none.
    pub mime_hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDataUrl {
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageReference {
    pub fn new(source: ImageSource) -> Self {
        Self {
            source,
            mime_hint: None,
        }
    }

    pub fn remote_url(url: impl Into<String>) -> Self {
        Self::new(ImageSource::RemoteUrl(url.into()))
    }

    pub fn data_url(value: impl Into<String>) -> Self {
        Self::new(ImageSource::DataUrl(value.into()))
    }

    pub fn base64(payload: impl Into<String>) -> Self {
        Self::new(ImageSource::Base64(payload.into()))
    }

    pub fn raw_bytes(bytes: Vec<u8>) -> Self {
        Self::new(ImageSource::RawBytes(bytes))
    }

    pub fn with_mime_hint(mut self, mime: impl Into<String>) -> Self {
        self.mime_hint = Some(mime.into());
        self
    }

    pub fn url(&self) -> Option<&str> {
        match &self.source {
            ImageSource::RemoteUrl(value) | ImageSource::DataUrl(value) => Some(value.trim()),
            ImageSource::Base64(_) | ImageSource::RawBytes(_) => None,
        }
    }

    /// The data URL text carried by this reference, if any.
    pub fn as_data_url(&self) -> Option<&str> {
        match &self.source {
            ImageSource::RemoteUrl(value) | ImageSource::DataUrl(value)
                if is_data_url(value) =>
            {
                Some(value.trim())
            }
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match &self.source {
            ImageSource::RemoteUrl(url) if !is_data_url(url) => format!("remote URL '{}'", url),
            ImageSource::RemoteUrl(_) | ImageSource::DataUrl(_) => "data URL".to_string(),
            ImageSource::Base64(payload) => format!("base64 payload ({} chars)", payload.len()),
            ImageSource::RawBytes(bytes) => format!("raw image bytes ({} bytes)", bytes.len()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageResolver {
    client: Client,
}

impl ImageResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Turns a reference into bytes plus an extension from the allow-list.
    ///
    /// Extension priority is fixed: a discovered mime type (HTTP
    /// `Content-Type`, data-URL header, base64 prefix) wins, then the
    /// reference's mime hint, then the URL path suffix, then `png`.
    pub async fn resolve(&self, reference: &ImageReference) -> Result<ResolvedImage> {
        let mut url_extension = None;
        let (bytes, discovered_mime) = match &reference.source {
            ImageSource::RemoteUrl(url) => {
                let url = url.trim();
                if is_data_url(url) {
                    let decoded = parse_data_url(url)?;
                    (decoded.bytes, decoded.mime)
                } else if is_http_url(url) {
                    url_extension = extension_from_url(url);
                    self.fetch(url).await?
                } else {
                    return Err(BridgeError::NoImageData {
                        context: format!("unrecognized image reference '{}'", url),
                    });
                }
            }
            ImageSource::DataUrl(value) => {
                let decoded = parse_data_url(value)?;
                (decoded.bytes, decoded.mime)
            }
            ImageSource::Base64(payload) => decode_base64_payload(payload)?,
            ImageSource::RawBytes(bytes) => (bytes.clone(), None),
        };

        if bytes.is_empty() {
            return Err(BridgeError::NoImageData {
                context: reference.describe(),
            });
        }

        let extension = resolve_extension(
            discovered_mime.as_deref(),
            reference.mime_hint.as_deref(),
            url_extension,
        );
        debug!(
            "resolved {} to {} bytes (.{})",
            reference.describe(),
            bytes.len(),
            extension
        );
        Ok(ResolvedImage { bytes, extension })
    }

    async fn fetch(&self, url: &str) -> Result<(Vec<u8>, Option<String>)> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;
        Ok((bytes.to_vec(), content_type))
    }
}

pub fn resolve_extension(
    discovered_mime: Option<&str>,
    mime_hint: Option<&str>,
    url_extension: Option<&'static str>,
) -> &'static str {
    discovered_mime
        .and_then(extension_for_mime)
        .or_else(|| mime_hint.and_then(extension_for_mime))
        .or(url_extension)
        .unwrap_or(FALLBACK_EXTENSION)
}

pub fn is_data_url(value: &str) -> bool {
    value
        .trim_start()
        .get(..5)
        .map_or(false, |scheme| scheme.eq_ignore_ascii_case("data:"))
}

pub fn is_http_url(value: &str) -> bool {
    let lowered = value.trim_start().to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

/// Parses `data:[<mime>][;base64],<data>`.
pub fn parse_data_url(input: &str) -> Result<DecodedDataUrl> {
    let trimmed = input.trim();
    if !is_data_url(trimmed) {
        return Err(BridgeError::invalid_data_url(input, "missing 'data:' scheme"));
    }
    let (meta, payload) = trimmed[5..]
        .split_once(',')
        .ok_or_else(|| BridgeError::invalid_data_url(input, "missing ',' separator"))?;

    let mut params = meta.split(';');
    let mime = params
        .next()
        .map(str::trim)
        .filter(|mime| !mime.is_empty())
        .map(str::to_ascii_lowercase);
    if let Some(mime) = &mime {
        if !mime.contains('/') {
            return Err(BridgeError::invalid_data_url(
                input,
                format!("malformed mime type '{}'", mime),
            ));
        }
    }
    let is_base64 = params.any(|param| param.trim().eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        decode_base64(payload).map_err(|err| {
            BridgeError::invalid_data_url(input, format!("invalid base64 payload: {}", err))
        })?
    } else {
        percent_decode_str(payload)
            .decode_utf8()
            .map_err(|err| {
                BridgeError::invalid_data_url(input, format!("invalid percent encoding: {}", err))
            })?
            .into_owned()
            .into_bytes()
    };

    Ok(DecodedDataUrl { mime, bytes })
}

/// Splits a `data:<mime>;base64,` prefix off a payload, returning the mime
/// segment (if any) and the remaining base64 text.
pub fn strip_base64_prefix(value: &str) -> Option<(Option<String>, &str)> {
    let trimmed = value.trim();
    if !is_data_url(trimmed) {
        return None;
    }
    let (meta, payload) = trimmed[5..].split_once(',')?;
    let mut params = meta.split(';');
    let mime = params
        .next()
        .map(str::trim)
        .filter(|mime| !mime.is_empty())
        .map(str::to_ascii_lowercase);
    if !params.any(|param| param.trim().eq_ignore_ascii_case("base64")) {
        return None;
    }
    Some((mime, payload))
}

fn decode_base64_payload(payload: &str) -> Result<(Vec<u8>, Option<String>)> {
    let (mime, body) = match strip_base64_prefix(payload) {
        Some((mime, body)) => (mime, body),
        None => (None, payload.trim()),
    };
    if body.trim().is_empty() {
        return Err(BridgeError::NoImageData {
            context: "empty base64 payload".to_string(),
        });
    }
    let bytes = decode_base64(body).map_err(|err| BridgeError::InvalidBase64 {
        reason: err.to_string(),
    })?;
    Ok((bytes, mime))
}

fn decode_base64(payload: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    base64::decode(cleaned)
}

pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let mime = mime.split(';').next()?.trim().to_ascii_lowercase();
    match mime.as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/bmp" | "image/x-ms-bmp" => Some("bmp"),
        "image/tiff" => Some("tiff"),
        "image/svg+xml" => Some("svg"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        "image/avif" => Some("avif"),
        _ => None,
    }
}

pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension_from_suffix(extension) {
        Some("jpg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tiff") => "image/tiff",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("avif") => "image/avif",
        _ => FALLBACK_IMAGE_MIME,
    }
}

pub fn extension_from_suffix(suffix: &str) -> Option<&'static str> {
    let lowered = suffix.trim().to_ascii_lowercase();
    let normalized = match lowered.as_str() {
        "jpeg" => "jpg",
        "tif" => "tiff",
        other => other,
    };
    ALLOWED_EXTENSIONS
        .iter()
        .copied()
        .find(|allowed| *allowed == normalized)
}

pub fn extension_from_url(url: &str) -> Option<&'static str> {
    let parsed = Url::parse(url.trim()).ok()?;
    let file_name = parsed.path_segments()?.last()?;
    let (_, suffix) = file_name.rsplit_once('.')?;
    extension_from_suffix(suffix)
}

/// Reads a local image for analysis. The path suffix becomes the mime hint.
pub async fn load_local_image(path: &Path) -> Result<ImageReference> {
    let bytes = tokio::fs::read(path).await?;
    let mime = path
        .extension()
        .and_then(|value| value.to_str())
        .map(mime_for_extension)
        .unwrap_or(FALLBACK_IMAGE_MIME);
    Ok(ImageReference::raw_bytes(bytes).with_mime_hint(mime))
}

pub fn to_data_url(image: &ResolvedImage) -> String {
    format!(
        "data:{};base64,{}",
        mime_for_extension(image.extension),
        base64::encode(&image.bytes)
    )
}

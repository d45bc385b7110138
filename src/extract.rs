//! Finds the image in a chat reply. Tiers are tried in order and the first hit wins.

use crate::chat::{ChatApiResponse, ChatMessage};
use crate::reference::{is_http_url, ImageReference};
use log::debug;

const URL_TERMINATORS: &[char] = &[')', ']', '>', '<', '"', '\'', '`'];
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

pub fn extract_image_reference(body: &ChatApiResponse) -> Option<ImageReference> {
    let message = body.first_message()?;
    extract_from_message(message)
}

pub fn extract_from_message(message: &ChatMessage) -> Option<ImageReference> {
    if let Some(url) = structured_image_url(message) {
        debug!("chat image found in structured images field");
        return Some(ImageReference::remote_url(url));
    }

    let text = message.text();
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if text.starts_with("http") {
        debug!("chat content is a bare URL");
        return Some(ImageReference::remote_url(text));
    }
    if text.starts_with("data:image") {
        debug!("chat content is an inline data URL");
        return Some(ImageReference::data_url(text));
    }
    if let Some(url) = find_markdown_image_url(text) {
        debug!("chat image found in markdown link");
        return Some(ImageReference::remote_url(url));
    }
    if let Some(url) = find_bare_url(text) {
        debug!("chat image found as embedded URL");
        return Some(ImageReference::remote_url(url));
    }

    debug!("chat content carries no image reference");
    None
}

fn structured_image_url(message: &ChatMessage) -> Option<&str> {
    message
        .images
        .as_ref()?
        .first()?
        .image_url
        .as_ref()
        .map(|image_url| image_url.url.trim())
        .filter(|url| !url.is_empty())
}

/// First `![alt](http(s)://...)` target in `text`.
pub fn find_markdown_image_url(text: &str) -> Option<&str> {
    let mut cursor = 0;
    while let Some(rel_start) = text[cursor..].find("![") {
        let start = cursor + rel_start + 2;
        let rel_close = text[start..].find("](")?;
        let target_start = start + rel_close + 2;
        let rel_end = text[target_start..].find(')')?;
        let target = &text[target_start..target_start + rel_end];
        // A markdown title may follow the URL after whitespace.
        let url = target.split_whitespace().next().unwrap_or_default();
        if is_http_url(url) {
            return Some(url);
        }
        cursor = start;
    }
    None
}

/// First bare `http://` or `https://` token in `text`.
pub fn find_bare_url(text: &str) -> Option<&str> {
    let start = match (text.find("http://"), text.find("https://")) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    let rest = &text[start..];
    let end = rest
        .find(|c: char| c.is_whitespace() || URL_TERMINATORS.contains(&c))
        .unwrap_or(rest.len());
    let url = rest[..end].trim_end_matches(TRAILING_PUNCTUATION);
    let scheme_len = if url.starts_with("https://") { 8 } else { 7 };
    (url.len() > scheme_len).then_some(url)
}

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Deserialize, Debug)]
pub struct ChatApiResponse {
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Debug)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Deserialize, Debug, Default)]
pub struct ChatMessage {
    #[serde(default)]
    pub content: Option<ChatContent>,
    #[serde(default, deserialize_with = "lenient_images")]
    pub images: Option<Vec<ChatImage>>,
}

/// Some upstreams send `content` as a list of typed parts instead of a string.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum ChatContent {
    Text(String),
    Parts(Vec<ChatContentPart>),
}

#[derive(Deserialize, Debug)]
pub struct ChatContentPart {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ChatContent {
    pub fn to_text(&self) -> String {
        match self {
            ChatContent::Text(text) => text.clone(),
            ChatContent::Parts(parts) => parts
                .iter()
                .filter(|part| part.kind.as_deref().map_or(true, |kind| kind == "text"))
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ChatImage {
    #[serde(default)]
    pub image_url: Option<ChatImageUrl>,
}

#[derive(Deserialize, Debug)]
pub struct ChatImageUrl {
    pub url: String,
}

/// Malformed `images` entries become empty slots instead of failing the
/// whole reply, so positions are kept and content can still be searched.
fn lenient_images<'de, D>(deserializer: D) -> Result<Option<Vec<ChatImage>>, D::Error>
where
    D: Deserializer<'de>,
{
    let images = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(entries)) => Some(
            entries
                .into_iter()
                .map(|entry| serde_json::from_value(entry).unwrap_or_default())
                .collect(),
        ),
        _ => None,
    };
    Ok(images)
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct Usage {
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Serialize, Debug)]
pub struct OpenAiChatRequestBody {
    pub model: String,
    pub messages: Vec<ChatMessageRole>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessageRole {
    pub role: String,
    pub content: String,
}

impl ChatApiResponse {
    pub fn first_message(&self) -> Option<&ChatMessage> {
        self.choices.first().map(|choice| &choice.message)
    }
}

impl ChatMessage {
    pub fn text(&self) -> String {
        self.content
            .as_ref()
            .map(ChatContent::to_text)
            .unwrap_or_default()
    }
}

use crate::bridge::Bridge;
use crate::chat::{ChatMessageRole, OpenAiChatRequestBody};
use crate::constants::{
    CHAT_COMPLETIONS_PATH, CMD_DALLE, CMD_IMAGE, CMD_VISION, DEFAULT_VISION_INSTRUCTIONS,
    DEFAULT_VISION_MAX_TOKENS, IMAGE_GENERATIONS_PATH, IMAGE_MODEL_PREFIXES,
};
use crate::error::{BridgeError, Result};
use crate::images::OpenAiImageRequestBody;
use crate::normalize::ShapeKind;
use crate::reference::{is_data_url, is_http_url, load_local_image, to_data_url, ImageResolver};
use crate::tools::{AnalyzeImageArgs, GenerateImageArgs, ToolCall};
use crate::vision::{ImageUrl, OpenAiVisionRequestBody, VisionContent, VisionMessageRole};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RequestType {
    Chat(OpenAiChatRequestBody),
    Image(OpenAiImageRequestBody),
    Vision(OpenAiVisionRequestBody),
}

impl RequestType {
    pub fn path(&self) -> &'static str {
        match self {
            RequestType::Chat(_) | RequestType::Vision(_) => CHAT_COMPLETIONS_PATH,
            RequestType::Image(_) => IMAGE_GENERATIONS_PATH,
        }
    }

    pub fn shape(&self) -> ShapeKind {
        match self {
            RequestType::Chat(_) | RequestType::Vision(_) => ShapeKind::Chat,
            RequestType::Image(_) => ShapeKind::ImageGeneration,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            RequestType::Chat(body) => &body.model,
            RequestType::Image(body) => &body.model,
            RequestType::Vision(body) => &body.model,
        }
    }
}

pub fn build_headers(api_key: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
        .map_err(|_| BridgeError::Config("API key contains invalid header characters".into()))?;
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

pub fn create_spinner(color: &str, message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template(&format!("{{spinner:.{}}} {{msg}}", color)),
    );
    spinner.enable_steady_tick(100);
    spinner.set_message(message);

    spinner
}

pub fn is_image_model(model: &str) -> bool {
    let lowered = model.trim().to_ascii_lowercase();
    IMAGE_MODEL_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

/// Image-API models go to the generations endpoint; every other model is
/// asked through chat completions.
pub fn build_generation_request(args: &GenerateImageArgs, model: &str) -> RequestType {
    if is_image_model(model) {
        RequestType::Image(build_image_request(args, model))
    } else {
        RequestType::Chat(build_chat_request(&args.prompt, model))
    }
}

pub fn build_chat_request(prompt: &str, model: &str) -> OpenAiChatRequestBody {
    OpenAiChatRequestBody {
        model: model.to_string(),
        messages: vec![ChatMessageRole {
            role: "user".to_string(),
            content: prompt.to_string(),
        }],
        stream: false,
        modalities: Some(vec!["image".to_string(), "text".to_string()]),
    }
}

pub fn build_image_request(args: &GenerateImageArgs, model: &str) -> OpenAiImageRequestBody {
    // gpt-image models always answer with b64_json and reject the field.
    let response_format = (args.save_to_file && model.to_ascii_lowercase().starts_with("dall-e"))
        .then(|| "b64_json".to_string());
    OpenAiImageRequestBody {
        model: model.to_string(),
        prompt: args.prompt.clone(),
        n: args.image_count(),
        size: args.size.clone(),
        quality: args.quality.clone(),
        style: args.style.clone(),
        response_format,
    }
}

/// Returns a URL the vision endpoint accepts. Remote and data URLs pass
/// through; local files are read and re-encoded as a data URL.
pub async fn encode_image(resolver: &ImageResolver, image_source: &str) -> Result<String> {
    let source = image_source.trim();
    if is_http_url(source) || is_data_url(source) {
        return Ok(source.to_string());
    }
    let reference = load_local_image(Path::new(source)).await.map_err(|err| match err {
        BridgeError::Io(io) => BridgeError::Io(std::io::Error::new(
            io.kind(),
            format!("failed to read image file '{}': {}", source, io),
        )),
        other => other,
    })?;
    let image = resolver.resolve(&reference).await?;
    Ok(to_data_url(&image))
}

pub fn vision_instructions(args: &AnalyzeImageArgs) -> String {
    args.prompt
        .as_deref()
        .map(str::trim)
        .filter(|prompt| !prompt.is_empty())
        .unwrap_or(DEFAULT_VISION_INSTRUCTIONS)
        .to_string()
}

pub async fn build_vision_request(
    resolver: &ImageResolver,
    args: &AnalyzeImageArgs,
    model: &str,
) -> Result<OpenAiVisionRequestBody> {
    let instructions = vision_instructions(args);
    let image_url = encode_image(resolver, &args.image_source).await?;
    Ok(OpenAiVisionRequestBody {
        model: model.to_string(),
        messages: vec![VisionMessageRole {
            role: "user".to_string(),
            content: vec![
                VisionContent::Text { text: instructions },
                VisionContent::ImageUrl {
                    image_url: ImageUrl { url: image_url },
                },
            ],
        }],
        max_tokens: DEFAULT_VISION_MAX_TOKENS,
    })
}

fn parse_command(args: &[String], default_model: &str) -> Result<ToolCall> {
    let command = args.get(1).map(String::as_str).unwrap_or_default();
    let call = match command {
        CMD_DALLE => ToolCall::GenerateImage(GenerateImageArgs {
            model: Some(default_model.to_string()),
            ..GenerateImageArgs::new(joined(args, 2)?)
        }),
        CMD_IMAGE => {
            let model = args
                .get(2)
                .ok_or_else(|| BridgeError::Protocol("missing model id".into()))?;
            ToolCall::GenerateImage(GenerateImageArgs {
                model: Some(model.clone()),
                ..GenerateImageArgs::new(joined(args, 3)?)
            })
        }
        CMD_VISION => {
            let image_source = args
                .get(2)
                .ok_or_else(|| BridgeError::Protocol("missing image path".into()))?;
            let prompt = (args.len() > 3).then(|| args[3..].join(" "));
            ToolCall::AnalyzeImage(AnalyzeImageArgs {
                image_source: image_source.clone(),
                prompt,
                model: None,
            })
        }
        other => {
            return Err(BridgeError::Protocol(format!(
                "unknown command '{}', see -help",
                other
            )))
        }
    };
    Ok(call)
}

fn joined(args: &[String], from: usize) -> Result<String> {
    let prompt = args.get(from..).unwrap_or_default().join(" ");
    if prompt.trim().is_empty() {
        return Err(BridgeError::Protocol("missing prompt".into()));
    }
    Ok(prompt)
}

pub async fn process_command(bridge: &Bridge, args: &[String]) -> Result<()> {
    let call = parse_command(args, &bridge.config().default_model)?;
    let spinner_color = match &call {
        ToolCall::GenerateImage(_) => "red",
        ToolCall::AnalyzeImage(_) => "magenta",
    };
    let spinner = create_spinner(spinner_color, "Processing request...".to_string());
    let outcome = bridge.call(&call).await;
    spinner.finish_and_clear();

    let result = outcome?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if let Some(path) = &result.saved_to {
        println!("{} {}", "Saved to".bold().green(), path.display());
    }
    Ok(())
}

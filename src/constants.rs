pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
pub const IMAGE_GENERATIONS_PATH: &str = "/images/generations";

pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
pub const GPT4_VISION_MODEL: &str = "gpt-4o";
pub const DEFAULT_VISION_INSTRUCTIONS: &str = "What's in the image?";
pub const DEFAULT_VISION_MAX_TOKENS: u32 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_OUTPUT_DIR_NAME: &str = "generated_images";
pub const DEFAULT_FILE_BASE_NAME: &str = "image";
pub const MAX_FILE_BASE_NAME_CHARS: usize = 64;
pub const MAX_IMAGES_PER_REQUEST: u8 = 10;

pub const FALLBACK_EXTENSION: &str = "png";
pub const FALLBACK_IMAGE_MIME: &str = "image/png";

/// File extensions a resolved image may carry. `jpeg` is folded into `jpg`.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "webp", "gif", "bmp", "tiff", "svg", "ico", "avif",
];

pub const IMAGE_MODEL_PREFIXES: &[&str] = &["dall-e", "gpt-image"];

pub const CMD_SERVE: &str = "serve";
pub const CMD_VISION: &str = "v";
pub const CMD_DALLE: &str = "d";
pub const CMD_IMAGE: &str = "i";

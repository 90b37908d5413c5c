/// Process-wide provider settings. Built once at startup from CLI arguments and
/// the environment, shared behind an `Arc` and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_base: String,
    pub api_key: String,
    pub image_model: String,
    pub chat_model: String,
}

/// Output parameters for the text-to-image operation.
pub const OUTPUT_SIZE: &str = "1024x1024";
pub const OUTPUT_QUALITY: &str = "standard";

/// Token cap for the multimodal chat operation.
pub const CHAT_MAX_TOKENS: u32 = 1024;

/// Instruction used when the caller does not supply a prompt of their own.
pub const DEFAULT_STYLE_PROMPT: &str = "Convert this to a Studio Ghibli style anime. \
    Create a beautiful, whimsical Studio Ghibli animation style version with soft colors, \
    detailed backgrounds, and the iconic Ghibli aesthetic. Maintain the original composition \
    but transform it into a magical anime scene that looks like it could be from a \
    Hayao Miyazaki film.";

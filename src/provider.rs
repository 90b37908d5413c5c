use crate::config::{ProviderConfig, CHAT_MAX_TOKENS, OUTPUT_QUALITY, OUTPUT_SIZE};
use crate::request_id::RequestId;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Which provider operation a request was dispatched to. The response shape
/// (and therefore the mapping back to the client contract) is keyed on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderOp {
    ImageGeneration,
    ChatVision,
}

// ---- text-to-image wire types ----

#[derive(Debug, Clone, Serialize)]
pub struct ImageGenerationRequest {
    pub model: String,
    pub prompt: String,
    pub n: u32,
    pub size: String,
    pub quality: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageGenerationResponse {
    pub data: Vec<GeneratedImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedImage {
    pub url: Option<String>,
    pub revised_prompt: Option<String>,
}

// ---- multimodal chat wire types ----

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentPart {
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<ImageUrl>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponseMessage {
    pub content: Option<String>,
}

/// Structured body most provider failures carry.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderErrorBody {
    pub error: Option<ProviderErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderErrorDetail {
    pub message: Option<String>,
}

#[derive(Debug)]
pub struct ProviderClient {
    http_client: Arc<reqwest::Client>,
    config: Arc<ProviderConfig>,
}

impl ProviderClient {
    pub fn new(http_client: Arc<reqwest::Client>, config: Arc<ProviderConfig>) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn build_target_url(&self, op: ProviderOp) -> String {
        let api_base = &self.config.api_base;
        let path = match op {
            ProviderOp::ImageGeneration => "images/generations",
            ProviderOp::ChatVision => "chat/completions",
        };
        if api_base.ends_with('/') {
            format!("{}{}", api_base, path)
        } else {
            format!("{}/{}", api_base, path)
        }
    }

    /// Dispatch the text-to-image generation operation.
    pub async fn generate_image(
        &self,
        prompt: &str,
        request_id: &RequestId,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let body = ImageGenerationRequest {
            model: self.config.image_model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: OUTPUT_SIZE.to_string(),
            quality: OUTPUT_QUALITY.to_string(),
        };
        let body =
            serde_json::to_value(&body).expect("Failed to serialize generation request");
        self.dispatch(ProviderOp::ImageGeneration, body, request_id).await
    }

    /// Dispatch the multimodal chat operation with the upload embedded as a
    /// data URI next to the instruction text.
    pub async fn transform_image(
        &self,
        instruction: &str,
        data_uri: &str,
        request_id: &RequestId,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let body = ChatRequest {
            model: self.config.chat_model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart {
                        r#type: "text".to_string(),
                        text: Some(instruction.to_string()),
                        image_url: None,
                    },
                    ContentPart {
                        r#type: "image_url".to_string(),
                        text: None,
                        image_url: Some(ImageUrl {
                            url: data_uri.to_string(),
                        }),
                    },
                ],
            }],
            max_tokens: CHAT_MAX_TOKENS,
        };
        let body = serde_json::to_value(&body).expect("Failed to serialize chat request");
        self.dispatch(ProviderOp::ChatVision, body, request_id).await
    }

    async fn dispatch(
        &self,
        op: ProviderOp,
        body: serde_json::Value,
        request_id: &RequestId,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let target_url = self.build_target_url(op);

        let mut target_request = self
            .http_client
            .post(&target_url)
            .header("Content-Type", "application/json")
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key),
            );

        // Propagate request id upstream
        if let Ok(val) = HeaderValue::from_str(&request_id.0) {
            target_request = target_request.header("x-request-id", val);
        }

        info!("Forwarding request to: {}", target_url);
        debug!(
            "request body: {}",
            serde_json::to_string(&body).unwrap_or_default()
        );
        target_request.json(&body).send().await
    }
}

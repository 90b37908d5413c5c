use crate::config::DEFAULT_STYLE_PROMPT;
use crate::media;
use crate::models::{ErrorBody, PromptRequest, TextResult, UrlResult};
use crate::provider::{
    ChatResponse, ImageGenerationResponse, ProviderClient, ProviderErrorBody, ProviderOp,
};
use crate::request_id::RequestId;
use crate::upload::{self, UploadError};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<ProviderClient>,
}

fn input_error(message: impl Into<String>) -> axum::response::Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody::new(message))).into_response()
}

/// The outbound call itself failed: network error, timeout, or the connection
/// dropped before a status arrived.
fn dispatch_error(e: reqwest::Error) -> axum::response::Response {
    warn!("Provider request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::with_details(
            "Communication with the image provider failed.",
            e.to_string(),
        )),
    )
        .into_response()
}

/// Map a provider error status onto a caller-facing message, preserving the
/// provider's numeric status and attaching its body verbatim as details.
fn provider_error_response(status: StatusCode, body: &str) -> axum::response::Response {
    let upstream_message = serde_json::from_str::<ProviderErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message);

    let message = match status.as_u16() {
        429 => "The provider rate limit was reached. Please wait a few minutes and try again."
            .to_string(),
        400 => {
            let mut m = "There is a problem with the image format or request parameters. \
                Please try a different input."
                .to_string();
            if let Some(detail) = &upstream_message {
                m.push_str(&format!(" Error: {}", detail));
            }
            m
        }
        401 => "The provider API key is invalid or expired.".to_string(),
        _ => "The provider request failed.".to_string(),
    };

    let details = if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    };
    (
        status,
        Json(ErrorBody {
            error: message,
            details,
        }),
    )
        .into_response()
}

/// Reduce the provider response to the normalized client contract. Which field
/// carries the payload depends on the operation that was dispatched.
async fn relay_provider_response(
    op: ProviderOp,
    response: reqwest::Response,
) -> axum::response::Response {
    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        warn!("Provider returned status {}: {}", status, body);
        return provider_error_response(status, &body);
    }

    match op {
        ProviderOp::ImageGeneration => match response.json::<ImageGenerationResponse>().await {
            Ok(resp) => match resp.data.into_iter().next().and_then(|img| img.url) {
                Some(url) => {
                    debug!("Provider returned image url: {}", url);
                    (StatusCode::OK, Json(UrlResult { url })).into_response()
                }
                None => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::new(
                        "The provider response did not contain an image URL.",
                    )),
                )
                    .into_response(),
            },
            Err(e) => {
                warn!("Failed to parse provider response: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::with_details(
                        "Failed to parse the provider response.",
                        e.to_string(),
                    )),
                )
                    .into_response()
            }
        },
        ProviderOp::ChatVision => match response.json::<ChatResponse>().await {
            Ok(resp) => match resp
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
            {
                Some(result) => (StatusCode::OK, Json(TextResult { result })).into_response(),
                None => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::new(
                        "The provider response did not contain any content.",
                    )),
                )
                    .into_response(),
            },
            Err(e) => {
                warn!("Failed to parse provider response: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::with_details(
                        "Failed to parse the provider response.",
                        e.to_string(),
                    )),
                )
                    .into_response()
            }
        },
    }
}

/// Decide the effective prompt for the multipart endpoints: a blank prompt is
/// an error, a missing one falls back to the fixed style instruction when an
/// image was supplied, and a body with neither field is rejected.
fn resolve_convert_prompt(
    prompt: Option<String>,
    has_image: bool,
) -> Result<String, ErrorBody> {
    match prompt {
        Some(p) if p.trim().is_empty() => {
            Err(ErrorBody::new("The prompt field must not be blank."))
        }
        Some(p) => Ok(p.trim().to_string()),
        None if has_image => Ok(DEFAULT_STYLE_PROMPT.to_string()),
        None => Err(ErrorBody::new(
            "The request must include an image or a prompt.",
        )),
    }
}

/// POST /api/generate-image — JSON `{ prompt }`, text-to-image generation.
#[axum_macros::debug_handler]
pub async fn generate_image(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<PromptRequest>,
) -> axum::response::Response {
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        info!("Rejecting generation request with empty prompt");
        return input_error("The prompt field must not be empty.");
    }

    match state.provider.generate_image(prompt, &request_id).await {
        Ok(response) => relay_provider_response(ProviderOp::ImageGeneration, response).await,
        Err(e) => dispatch_error(e),
    }
}

/// POST /api/convert-image — multipart with an optional `prompt` field, text-
/// to-image generation with the style instruction as the fallback prompt.
#[axum_macros::debug_handler]
pub async fn convert_image(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    mut multipart: Multipart,
) -> axum::response::Response {
    let mut prompt: Option<String> = None;
    let mut has_image = false;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field.name().map(|s| s.to_string());
                match name.as_deref() {
                    Some("prompt") => match field.text().await {
                        Ok(text) => prompt = Some(text),
                        Err(e) => {
                            return input_error(format!("Failed to read the upload: {}", e))
                        }
                    },
                    Some("image") => {
                        // The generation operation takes no image; drain the field.
                        has_image =
                            field.bytes().await.map(|b| !b.is_empty()).unwrap_or(false);
                    }
                    _ => {}
                }
            }
            Ok(None) => break,
            Err(e) => return input_error(format!("Failed to read the upload: {}", e)),
        }
    }

    let prompt = match resolve_convert_prompt(prompt, has_image) {
        Ok(p) => p,
        Err(body) => return (StatusCode::BAD_REQUEST, Json(body)).into_response(),
    };

    match state.provider.generate_image(&prompt, &request_id).await {
        Ok(response) => relay_provider_response(ProviderOp::ImageGeneration, response).await,
        Err(e) => dispatch_error(e),
    }
}

/// POST /api/transform-image — multipart with a required `image` field, the
/// multimodal chat operation with the upload embedded as a data URI.
#[axum_macros::debug_handler]
pub async fn transform_image(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    mut multipart: Multipart,
) -> axum::response::Response {
    let mut image: Option<(bytes::Bytes, String)> = None;
    let mut instruction: Option<String> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field.name().map(|s| s.to_string());
                match name.as_deref() {
                    Some("image") => {
                        let mime = field
                            .content_type()
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "application/octet-stream".to_string());
                        match field.bytes().await {
                            Ok(data) => image = Some((data, mime)),
                            Err(e) => {
                                return input_error(format!("Failed to read the upload: {}", e))
                            }
                        }
                    }
                    Some("prompt") => match field.text().await {
                        Ok(text) => instruction = Some(text),
                        Err(e) => {
                            return input_error(format!("Failed to read the upload: {}", e))
                        }
                    },
                    _ => {}
                }
            }
            Ok(None) => break,
            Err(e) => return input_error(format!("Failed to read the upload: {}", e)),
        }
    }

    let Some((data, declared_mime)) = image else {
        return input_error("The image field is required.");
    };
    if data.is_empty() {
        return input_error("The uploaded image is empty.");
    }
    if let Some(p) = &instruction {
        if p.trim().is_empty() {
            return input_error("The prompt field must not be blank.");
        }
    }

    let mime = media::sanitize_mime(&declared_mime).to_string();
    if let Err(e) = upload::check_upload(&mime, data.len()) {
        let status = match e {
            UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::UnsupportedType { .. } => StatusCode::BAD_REQUEST,
        };
        info!("Rejecting upload: {}", e);
        return (status, Json(ErrorBody::new(e.to_string()))).into_response();
    }

    let encoded = match media::prepare_image(&data, &mime) {
        Ok(encoded) => encoded,
        Err(e) => {
            return input_error(format!("Could not decode the uploaded image: {}", e));
        }
    };
    let data_uri = encoded.to_data_uri();
    let instruction =
        instruction.unwrap_or_else(|| DEFAULT_STYLE_PROMPT.to_string());

    match state
        .provider
        .transform_image(instruction.trim(), &data_uri, &request_id)
        .await
    {
        Ok(response) => relay_provider_response(ProviderOp::ChatVision, response).await,
        Err(e) => dispatch_error(e),
    }
}

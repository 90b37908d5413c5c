use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::{info_span, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlates a request's log lines with the upstream call and the client
/// response. Handlers pick it up from the request extensions.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

pub async fn inject_request_id(mut req: Request, next: Next) -> Response {
    // Reuse an incoming id so callers can trace across hops
    let id = match req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        Some(existing) => existing.to_string(),
        None => Uuid::new_v4().to_string(),
    };

    if let Ok(val) = HeaderValue::from_str(&id) {
        req.headers_mut().insert(REQUEST_ID_HEADER, val);
    }
    req.extensions_mut().insert(RequestId(id.clone()));

    let span = info_span!(
        "request",
        id = %id,
        method = %req.method(),
        path = %req.uri().path()
    );
    let mut resp = next.run(req).instrument(span).await;

    // Reflect the id back to the client
    if let Ok(val) = HeaderValue::from_str(&id) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, val);
    }

    resp
}

//! Inbound request buffering.
//!
//! # Responsibilities
//! - Read the request body fully, bounded by the configured limit
//! - Capture the peer address when the service was built with connect info
//! - Hand the engine a transport-neutral `IncomingRequest`

use std::error::Error as StdError;
use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;

use crate::engine::IncomingRequest;

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Buffer an axum request into an `IncomingRequest`.
///
/// Returns a ready-made error response when the body cannot be read.
pub async fn buffer_request(request: Request<Body>, limit: usize) -> Result<IncomingRequest, Response> {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) if exceeds_limit(&e) => {
            tracing::warn!(
                method = %parts.method,
                uri = %parts.uri,
                limit,
                "Request body exceeds limit"
            );
            return Err((StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded").into_response());
        }
        Err(e) => {
            tracing::warn!(
                method = %parts.method,
                uri = %parts.uri,
                error = %e,
                "Failed to read request body"
            );
            return Err((StatusCode::BAD_REQUEST, "Failed to read request body").into_response());
        }
    };

    Ok(IncomingRequest {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body,
        remote_addr,
    })
}

/// Whether a body read failed on the length limit rather than on I/O.
fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(current) = source {
        if current.is::<LengthLimitError>() {
            return true;
        }
        source = current.source();
    }
    false
}

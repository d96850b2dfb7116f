//! Reply to axum response conversion.

use axum::body::Body;
use axum::http::HeaderMap;
use axum::response::Response;

use crate::engine::{Reply, ReplyBody};
use crate::http::static_files;

/// Turn an engine reply into a response.
///
/// File bodies are resolved against the disk; headers set by the chain are
/// layered on top of those the file server produced.
pub async fn into_response(reply: Reply, request_headers: &HeaderMap) -> Response {
    let Reply { status, headers, body } = reply;

    match body {
        ReplyBody::File { root, path } => {
            let mut response = static_files::serve(&root, &path, request_headers).await;
            extend_headers(response.headers_mut(), headers);
            response
        }
        ReplyBody::Bytes(bytes) => build(status, headers, Body::from(bytes)),
        ReplyBody::Empty => build(status, headers, Body::empty()),
    }
}

fn build(status: axum::http::StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Append `extra` onto `target`; a name in `extra` replaces earlier values.
fn extend_headers(target: &mut HeaderMap, extra: HeaderMap) {
    let mut current = None;
    for (name, value) in extra {
        if let Some(name) = name {
            target.remove(&name);
            current = Some(name);
        }
        if let Some(name) = &current {
            target.append(name.clone(), value);
        }
    }
}

//! File delegation to `tower_http::services::ServeDir`.

use std::path::Path;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeDir;

/// Serve `path` from under `root`, honouring conditional and range headers.
///
/// `path` is the already-decoded sub-path; `..` components are rejected by
/// `ServeDir` with a 404.
pub async fn serve(root: &Path, path: &str, request_headers: &HeaderMap) -> Response {
    let encoded: Vec<String> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    let uri = format!("/{}", encoded.join("/"));

    let mut request = match Request::builder().method(Method::GET).uri(&uri).body(Body::empty()) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Rejected static file path");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    *request.headers_mut() = request_headers.clone();

    let service = ServeDir::new(root).precompressed_gzip();
    match service.oneshot(request).await {
        Ok(response) => {
            tracing::debug!(
                root = %root.display(),
                path = %path,
                status = response.status().as_u16(),
                "Served static file"
            );
            response.map(Body::new)
        }
        Err(never) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("grove-static-{name}-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("css")).unwrap();
        std::fs::write(dir.join("css/site.css"), "body{}").unwrap();
        std::fs::write(dir.join("hello world.txt"), "spaced").unwrap();
        dir
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn serves_nested_and_encoded_files() {
        let dir = fixture_dir("nested");

        let response = serve(&dir, "css/site.css", &HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "body{}");

        let response = serve(&dir, "hello world.txt", &HeaderMap::new()).await;
        assert_eq!(body_text(response).await, "spaced");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn missing_and_escaping_paths_are_not_found() {
        let dir = fixture_dir("missing");
        assert_eq!(serve(&dir, "nope.css", &HeaderMap::new()).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(serve(&dir, "../etc/passwd", &HeaderMap::new()).await.status(), StatusCode::NOT_FOUND);
        std::fs::remove_dir_all(&dir).ok();
    }
}

//! Request and reply values exchanged with the transport.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode, Uri};

/// A fully buffered inbound request.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub remote_addr: Option<SocketAddr>,
}

impl IncomingRequest {
    /// Bodiless request, mostly for tests and internal probes.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Percent-decoded request path; the raw path when decoding fails.
    pub fn path(&self) -> String {
        let raw = self.uri.path();
        match urlencoding::decode(raw) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => raw.to_string(),
        }
    }
}

/// Body produced by a chain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReplyBody {
    #[default]
    Empty,
    Bytes(Vec<u8>),
    /// Serve `path` relative to `root`; resolved by the file-serving layer.
    File { root: PathBuf, path: String },
}

/// Outcome of running a chain, ready for the transport to write.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ReplyBody,
}

impl Reply {
    /// Body bytes, or an empty slice for empty and file bodies.
    pub fn bytes(&self) -> &[u8] {
        match &self.body {
            ReplyBody::Bytes(bytes) => bytes,
            _ => &[],
        }
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.bytes()).into_owned()
    }
}

//! Per-request state handed to every link of a chain.
//!
//! # Responsibilities
//! - Expose the request: method, path, params, query, form, JSON body, cookies
//! - Accumulate the response: status, headers, body
//! - Carry a request-scoped key/value store between middleware and handler
//! - Track the chain cursor and the aborted flag
//!
//! # Design Decisions
//! - Body writes append; `fail` discards whatever was written before it
//! - Encoding and render failures are logged and turned into a 500 reply
//! - The key/value store is only allocated on first `set`

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::engine::error::WriteError;
use crate::engine::request::{IncomingRequest, Reply, ReplyBody};
use crate::render::Templates;
use crate::routing::Params;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// A `Set-Cookie` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Seconds until expiry; `Some(0)` or negative deletes the cookie.
    pub max_age: Option<i64>,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: None,
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: false,
        }
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Header value with the value percent-encoded.
    fn header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, urlencoding::encode(&self.value));
        if !self.path.is_empty() {
            out.push_str("; Path=");
            out.push_str(&self.path);
        }
        if let Some(domain) = &self.domain {
            out.push_str("; Domain=");
            out.push_str(domain);
        }
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={}", max_age.max(0)));
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

pub struct Context {
    method: Method,
    path: String,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    params: Params,
    pattern: Option<String>,

    status: StatusCode,
    response_headers: HeaderMap,
    response_body: ReplyBody,

    index: Option<usize>,
    chain_len: usize,
    aborted: bool,

    keys: Option<HashMap<String, Box<dyn Any + Send + Sync>>>,
    templates: Arc<Templates>,
}

impl Context {
    pub fn new(request: IncomingRequest, templates: Arc<Templates>) -> Self {
        let path = request.path();
        Self {
            method: request.method,
            path,
            uri: request.uri,
            headers: request.headers,
            body: request.body,
            remote_addr: request.remote_addr,
            params: Params::new(),
            pattern: None,
            status: StatusCode::OK,
            response_headers: HeaderMap::new(),
            response_body: ReplyBody::Empty,
            index: None,
            chain_len: 0,
            aborted: false,
            keys: None,
            templates,
        }
    }

    // ---- chain bookkeeping ----

    pub(crate) fn begin(&mut self, chain_len: usize) {
        self.chain_len = chain_len;
        self.index = None;
    }

    pub(crate) fn set_cursor(&mut self, index: usize) {
        self.index = Some(index);
    }

    pub(crate) fn set_route(&mut self, pattern: &str, params: Params) {
        self.pattern = Some(pattern.to_string());
        self.params = params;
    }

    /// Position of the link currently running, if the chain has started.
    pub fn cursor(&self) -> Option<usize> {
        self.index
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Stop the chain without touching the response.
    pub fn abort(&mut self) {
        self.index = Some(self.chain_len);
        self.aborted = true;
    }

    /// Stop the chain and reply with `{"message": message}`.
    pub fn fail(&mut self, code: StatusCode, message: impl Into<String>) {
        self.abort();
        self.response_body = ReplyBody::Empty;
        let message = message.into();
        if let Err(err) = self.write_json(code, &serde_json::json!({ "message": message })) {
            tracing::error!(error = %err, "Failed to encode failure body");
            self.status = StatusCode::INTERNAL_SERVER_ERROR;
        }
    }

    // ---- request accessors ----

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Decoded request path used for routing.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path and query exactly as received.
    pub fn request_uri(&self) -> &str {
        self.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
    }

    /// Pattern of the matched route, `None` when no route matched.
    pub fn route_pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn query(&self, key: &str) -> Option<String> {
        let query = self.uri.query()?;
        form_value(query.as_bytes(), key)
    }

    /// Form field from a urlencoded body, falling back to the query string.
    pub fn post_form(&self, key: &str) -> Option<String> {
        if self.content_type_is(FORM_URLENCODED) {
            if let Some(value) = form_value(&self.body, key) {
                return Some(value);
            }
        }
        self.query(key)
    }

    /// Raw body text when the request declares a JSON content type.
    pub fn post_json(&self) -> Option<&str> {
        if !self.content_type_is(APPLICATION_JSON) {
            return None;
        }
        std::str::from_utf8(&self.body).ok()
    }

    /// Deserialize the body as JSON regardless of content type.
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header(header::USER_AGENT.as_str())
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Percent-decoded value of the request cookie `name`.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| match urlencoding::decode(value) {
                Ok(decoded) => decoded.into_owned(),
                Err(_) => value.to_string(),
            })
    }

    fn content_type_is(&self, mime: &str) -> bool {
        self.header(header::CONTENT_TYPE.as_str())
            .and_then(|ct| ct.split(';').next())
            .map(|media| media.trim().eq_ignore_ascii_case(mime))
            .unwrap_or(false)
    }

    // ---- key/value store ----

    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.keys
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), Box::new(value));
    }

    /// Value under `key` when present and of type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.keys.as_ref()?.get(key)?.downcast_ref::<T>()
    }

    /// Like `get`, but panics when the key is absent or of another type.
    pub fn must_get<T: Any>(&self, key: &str) -> &T {
        match self.get(key) {
            Some(value) => value,
            None => panic!("Key \"{key}\" does not exist"),
        }
    }

    // ---- response writers ----

    pub fn status(&mut self, code: StatusCode) {
        self.status = code;
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Set a response header; invalid names or values are logged and skipped.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let Err(err) = self.try_set_header(name, value) {
            tracing::warn!(header = %name, error = %err, "Skipping response header");
        }
    }

    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.response_headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn set_cookie(&mut self, cookie: Cookie) {
        match HeaderValue::from_str(&cookie.header_value()) {
            Ok(value) => {
                self.response_headers.append(header::SET_COOKIE, value);
            }
            Err(_) => tracing::warn!(cookie = %cookie.name, "Skipping invalid cookie"),
        }
    }

    pub fn string(&mut self, code: StatusCode, text: impl AsRef<str>) {
        self.set_content_type(TEXT_PLAIN);
        self.status(code);
        self.append_body(text.as_ref().as_bytes());
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, code: StatusCode, value: &T) {
        if let Err(err) = self.write_json(code, value) {
            tracing::error!(path = %self.path, error = %err, "Failed to write JSON response");
            self.fail(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
        }
    }

    pub fn data(&mut self, code: StatusCode, bytes: impl AsRef<[u8]>) {
        self.status(code);
        self.append_body(bytes.as_ref());
    }

    /// Render the template `name` with `data`.
    pub fn html(&mut self, code: StatusCode, name: &str, data: &Value) {
        if let Err(err) = self.write_html(code, name, data) {
            tracing::error!(template = %name, error = %err, "Failed to render template");
            self.fail(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
        }
    }

    /// Delegate the body to the file server: `path` under `root`.
    pub fn serve_file(&mut self, root: impl Into<PathBuf>, path: impl Into<String>) {
        self.response_body = ReplyBody::File {
            root: root.into(),
            path: path.into(),
        };
    }

    pub fn into_reply(self) -> Reply {
        Reply {
            status: self.status,
            headers: self.response_headers,
            body: self.response_body,
        }
    }

    fn try_set_header(&mut self, name: &str, value: &str) -> Result<(), WriteError> {
        let invalid = || WriteError::InvalidHeader {
            name: name.to_string(),
        };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        self.response_headers.insert(header_name, header_value);
        Ok(())
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, code: StatusCode, value: &T) -> Result<(), WriteError> {
        let bytes = serde_json::to_vec(value)?;
        self.set_content_type(APPLICATION_JSON);
        self.status(code);
        self.append_body(&bytes);
        Ok(())
    }

    fn write_html(&mut self, code: StatusCode, name: &str, data: &Value) -> Result<(), WriteError> {
        let page = self.templates.render(name, data)?;
        self.set_content_type(TEXT_HTML);
        self.status(code);
        self.append_body(page.as_bytes());
        Ok(())
    }

    fn set_content_type(&mut self, value: &'static str) {
        self.response_headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
    }

    fn append_body(&mut self, bytes: &[u8]) {
        match &mut self.response_body {
            ReplyBody::Bytes(existing) => existing.extend_from_slice(bytes),
            body => *body = ReplyBody::Bytes(bytes.to_vec()),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .field("status", &self.status)
            .field("index", &self.index)
            .field("aborted", &self.aborted)
            .finish_non_exhaustive()
    }
}

fn form_value(input: &[u8], key: &str) -> Option<String> {
    url::form_urlencoded::parse(input)
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

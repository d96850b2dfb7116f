//! Route groups: prefixed namespaces with their own middleware.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::Method;

use crate::engine::chain::{Handler, Middleware};
use crate::engine::context::Context;
use crate::engine::dispatch::Engine;
use crate::routing::RouteError;

/// Methods `any` registers a handler under.
pub const ANY_METHODS: [Method; 8] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::TRACE,
];

/// Group state owned by the engine's flat group list.
pub(crate) struct GroupData {
    pub(crate) prefix: String,
    pub(crate) parent: Option<usize>,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
}

impl GroupData {
    pub(crate) fn new(prefix: String, parent: Option<usize>) -> Self {
        Self {
            prefix,
            parent,
            middlewares: Vec::new(),
        }
    }
}

/// Registration handle for one group.
///
/// Borrows the engine mutably, so all registration finishes before the
/// engine can be shared for serving.
pub struct RouteGroup<'e> {
    engine: &'e mut Engine,
    index: usize,
}

impl<'e> RouteGroup<'e> {
    pub(crate) fn new(engine: &'e mut Engine, index: usize) -> Self {
        Self { engine, index }
    }

    /// Full prefix, including every ancestor's.
    pub fn prefix(&self) -> &str {
        &self.engine.groups[self.index].prefix
    }

    /// Create a nested group at `self.prefix + prefix`.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        let full = format!("{}{}", self.prefix(), prefix);
        let index = self.engine.push_group(full, Some(self.index));
        RouteGroup::new(self.engine, index)
    }

    /// Append middleware that runs for every path under this group's prefix.
    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.engine.groups[self.index]
            .middlewares
            .push(Arc::new(middleware));
        self
    }

    /// Register `handler` for `method` at `self.prefix + pattern`.
    pub fn add_route<H: Handler>(&mut self, method: Method, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.register(method, pattern, Arc::new(handler))?;
        Ok(self)
    }

    pub fn get<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.add_route(Method::GET, pattern, handler)
    }

    pub fn post<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.add_route(Method::POST, pattern, handler)
    }

    pub fn put<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.add_route(Method::PUT, pattern, handler)
    }

    pub fn delete<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.add_route(Method::DELETE, pattern, handler)
    }

    pub fn patch<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.add_route(Method::PATCH, pattern, handler)
    }

    pub fn head<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.add_route(Method::HEAD, pattern, handler)
    }

    pub fn options<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.add_route(Method::OPTIONS, pattern, handler)
    }

    pub fn trace<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.add_route(Method::TRACE, pattern, handler)
    }

    /// Register one handler under every method in [`ANY_METHODS`].
    pub fn any<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        let handler: Arc<dyn Handler> = Arc::new(handler);
        for method in ANY_METHODS {
            self.register(method, pattern, Arc::clone(&handler))?;
        }
        Ok(self)
    }

    /// Serve files under `root` at `self.prefix + relative/...`.
    pub fn static_files(&mut self, relative: &str, root: impl Into<PathBuf>) -> Result<&mut Self, RouteError> {
        let root: PathBuf = root.into();
        let pattern = format!("{}/*filepath", relative.trim_end_matches('/'));
        let handler = move |ctx: &mut Context| {
            let file = ctx.param("filepath").unwrap_or_default().to_string();
            ctx.serve_file(root.clone(), file);
        };
        self.add_route(Method::GET, &pattern, handler)
    }

    fn register(&mut self, method: Method, pattern: &str, handler: Arc<dyn Handler>) -> Result<(), RouteError> {
        let full = format!("{}{}", self.prefix(), pattern);
        tracing::info!("Route {:>4} - {}", method.as_str(), full);
        if self.engine.router.add_route(method.clone(), &full, handler)?.is_some() {
            tracing::warn!(method = %method, pattern = %full, "Route re-registered, previous handler replaced");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::request::IncomingRequest;
    use axum::http::StatusCode;

    fn call(engine: &Engine, method: Method, uri: &str) -> crate::engine::request::Reply {
        engine.handle(IncomingRequest::new(method, uri.parse().unwrap()))
    }

    #[test]
    fn nested_prefixes_concatenate() {
        let mut engine = Engine::new();
        {
            let mut v1 = engine.group("/v1");
            assert_eq!(v1.prefix(), "/v1");
            let mut admin = v1.group("/admin");
            assert_eq!(admin.prefix(), "/v1/admin");
            admin
                .get("/users/:id", |ctx: &mut Context| {
                    let id = ctx.param("id").unwrap_or_default().to_string();
                    ctx.string(StatusCode::OK, id);
                })
                .unwrap();
        }
        let reply = call(&engine, Method::GET, "/v1/admin/users/42");
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.text(), "42");
    }

    #[test]
    fn any_registers_every_method() {
        let mut engine = Engine::new();
        engine
            .root()
            .any("/ping", |ctx: &mut Context| {
                let method = ctx.method().to_string();
                ctx.string(StatusCode::OK, method);
            })
            .unwrap();
        for method in ANY_METHODS {
            let reply = call(&engine, method.clone(), "/ping");
            assert_eq!(reply.status, StatusCode::OK);
            assert_eq!(reply.text(), method.as_str());
        }
        let routes = engine.routes();
        assert_eq!(routes.len(), ANY_METHODS.len());
    }

    #[test]
    fn static_files_delegate_the_sub_path() {
        let mut engine = Engine::new();
        engine.group("/g").static_files("/assets/", "/srv/www").unwrap();

        let reply = call(&engine, Method::GET, "/g/assets/css/site.css");
        assert_eq!(
            reply.body,
            crate::engine::request::ReplyBody::File {
                root: PathBuf::from("/srv/www"),
                path: "css/site.css".to_string(),
            }
        );
        assert_eq!(call(&engine, Method::GET, "/g/assets").status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflicting_registration_is_an_error() {
        let mut engine = Engine::new();
        let mut root = engine.root();
        root.get("/u/:id", |_: &mut Context| {}).unwrap();
        assert!(matches!(
            root.get("/u/:name", |_: &mut Context| {}),
            Err(RouteError::Conflict { .. })
        ));
    }
}

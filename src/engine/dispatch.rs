//! Engine: the composition root that owns groups, routes and templates.

use std::fmt;
use std::sync::Arc;

use axum::http::{Method, StatusCode};

use crate::engine::chain::{self, Handler, Link, Middleware};
use crate::engine::context::Context;
use crate::engine::group::{GroupData, RouteGroup};
use crate::engine::request::{IncomingRequest, Reply};
use crate::middleware::{Logger, Recovery};
use crate::render::{FuncMap, RenderError, Templates};
use crate::routing::{RouteError, Router};

/// Default responder for unmatched requests.
fn not_found(ctx: &mut Context) {
    let body = format!("404 NOT FOUND: {}\n", ctx.path());
    ctx.string(StatusCode::NOT_FOUND, body);
}

pub struct Engine {
    pub(crate) router: Router<Arc<dyn Handler>>,
    pub(crate) groups: Vec<GroupData>,
    templates: Arc<Templates>,
    not_found: Arc<dyn Handler>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Engine with an empty root group and no middleware.
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            groups: vec![GroupData::new(String::new(), None)],
            templates: Arc::new(Templates::new()),
            not_found: Arc::new(not_found),
        }
    }

    /// Engine with request logging and panic recovery on the root group.
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.use_middleware(Logger::new()).use_middleware(Recovery::new());
        engine
    }

    pub(crate) fn push_group(&mut self, prefix: String, parent: Option<usize>) -> usize {
        tracing::debug!(prefix = %prefix, parent = ?parent, "Group created");
        self.groups.push(GroupData::new(prefix, parent));
        self.groups.len() - 1
    }

    /// Registration handle for the root group (empty prefix).
    pub fn root(&mut self) -> RouteGroup<'_> {
        RouteGroup::new(self, 0)
    }

    /// Create a top-level group.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        let index = self.push_group(prefix.to_string(), Some(0));
        RouteGroup::new(self, index)
    }

    /// Append middleware to the root group; it runs for every request.
    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.groups[0].middlewares.push(Arc::new(middleware));
        self
    }

    pub fn add_route<H: Handler>(&mut self, method: Method, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.root().add_route(method, pattern, handler)?;
        Ok(self)
    }

    pub fn get<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.add_route(Method::GET, pattern, handler)
    }

    pub fn post<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.add_route(Method::POST, pattern, handler)
    }

    pub fn any<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.root().any(pattern, handler)?;
        Ok(self)
    }

    /// Replace the responder used when no route matches.
    pub fn set_not_found<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.not_found = Arc::new(handler);
        self
    }

    pub fn set_func_map(&mut self, funcs: FuncMap) -> &mut Self {
        Arc::make_mut(&mut self.templates).set_func_map(funcs);
        self
    }

    /// Load every template matching `pattern`; returns how many were loaded.
    pub fn load_templates(&mut self, pattern: &str) -> Result<usize, RenderError> {
        let loaded = Arc::make_mut(&mut self.templates).load_glob(pattern)?;
        tracing::info!(pattern = %pattern, count = loaded, "Templates loaded");
        Ok(loaded)
    }

    pub fn add_template(&mut self, name: &str, source: &str) -> Result<(), RenderError> {
        Arc::make_mut(&mut self.templates).add(name, source)
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    /// Every registered `(method, pattern)` pair.
    pub fn routes(&self) -> Vec<(Method, &str)> {
        self.router.routes()
    }

    /// Methods that have a route matching `path`.
    pub fn allowed(&self, path: &str) -> Vec<Method> {
        self.router.allowed(path)
    }

    /// Run one request through its chain.
    ///
    /// Middleware comes from every group whose prefix is a textual prefix of
    /// the path, in group creation order, followed by the route handler or
    /// the not-found responder.
    pub fn handle(&self, request: IncomingRequest) -> Reply {
        let mut ctx = Context::new(request, Arc::clone(&self.templates));
        let mut links: Vec<Link> = self
            .groups
            .iter()
            .filter(|group| ctx.path().starts_with(group.prefix.as_str()))
            .flat_map(|group| group.middlewares.iter().cloned().map(Link::Middleware))
            .collect();

        match self.router.resolve(ctx.method(), ctx.path()) {
            Ok(route) => {
                ctx.set_route(route.pattern, route.params);
                links.push(Link::Handler(Arc::clone(route.value)));
            }
            Err(err) => {
                tracing::debug!(error = %err, "No route matched");
                links.push(Link::Handler(Arc::clone(&self.not_found)));
            }
        }

        chain::execute(&mut ctx, links);
        ctx.into_reply()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<(&str, Option<usize>, usize)> = self
            .groups
            .iter()
            .map(|g| (g.prefix.as_str(), g.parent, g.middlewares.len()))
            .collect();
        f.debug_struct("Engine")
            .field("groups", &groups)
            .field("routes", &self.router.routes())
            .field("templates", &self.templates.len())
            .finish_non_exhaustive()
    }
}

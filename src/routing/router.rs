//! Method-keyed route lookup.
//!
//! # Responsibilities
//! - Keep one trie per HTTP method, created on first registration
//! - Resolve a method and path to a value plus bindings
//! - Return an explicit `NotFound` rather than a silent default
//!
//! # Design Decisions
//! - Method comparison is exact (`get` and `GET` are different methods)
//! - Immutable after registration; shared read-only across requests

use std::collections::HashMap;

use axum::http::Method;

use crate::routing::error::RouteError;
use crate::routing::params::Params;
use crate::routing::tree::Tree;

/// Outcome of a successful resolution.
#[derive(Debug)]
pub struct ResolvedRoute<'a, V> {
    pub value: &'a V,
    pub pattern: &'a str,
    pub params: Params,
}

/// Route table keyed by HTTP method.
#[derive(Debug)]
pub struct Router<V> {
    trees: HashMap<Method, Tree<V>>,
}

impl<V> Default for Router<V> {
    fn default() -> Self {
        Self {
            trees: HashMap::new(),
        }
    }
}

impl<V> Router<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` for `method` and `pattern`.
    ///
    /// Returns the replaced value when the same pattern was already present.
    pub fn add_route(&mut self, method: Method, pattern: &str, value: V) -> Result<Option<V>, RouteError> {
        self.trees.entry(method).or_default().insert(pattern, value)
    }

    /// Resolve a request to its registered value.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<ResolvedRoute<'_, V>, RouteError> {
        self.trees
            .get(method)
            .and_then(|tree| tree.lookup(path))
            .map(|m| ResolvedRoute {
                value: m.value,
                pattern: m.pattern,
                params: m.params,
            })
            .ok_or_else(|| RouteError::NotFound {
                method: method.clone(),
                path: path.to_string(),
            })
    }

    /// Methods with a route matching `path`, sorted by name.
    pub fn allowed(&self, path: &str) -> Vec<Method> {
        let mut allowed: Vec<Method> = self
            .trees
            .iter()
            .filter(|(_, tree)| tree.lookup(path).is_some())
            .map(|(method, _)| method.clone())
            .collect();
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        allowed
    }

    /// Every registered `(method, pattern)` pair, sorted.
    pub fn routes(&self) -> Vec<(Method, &str)> {
        let mut routes: Vec<(Method, &str)> = self
            .trees
            .iter()
            .flat_map(|(method, tree)| tree.routes().into_iter().map(move |p| (method.clone(), p)))
            .collect();
        routes.sort_by(|a, b| (a.1, a.0.as_str()).cmp(&(b.1, b.0.as_str())));
        routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_per_method() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/items/:id", "get").unwrap();
        router.add_route(Method::POST, "/items", "create").unwrap();

        let resolved = router.resolve(&Method::GET, "/items/9").unwrap();
        assert_eq!(*resolved.value, "get");
        assert_eq!(resolved.pattern, "/items/:id");
        assert_eq!(resolved.params.get("id"), Some("9"));

        assert!(matches!(
            router.resolve(&Method::POST, "/items/9"),
            Err(RouteError::NotFound { .. })
        ));
        assert!(matches!(
            router.resolve(&Method::DELETE, "/items"),
            Err(RouteError::NotFound { .. })
        ));
    }

    #[test]
    fn method_names_are_case_sensitive() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/", ()).unwrap();
        let lower = Method::from_bytes(b"get").unwrap();
        assert!(router.resolve(&lower, "/").is_err());
    }

    #[test]
    fn allowed_methods() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/p", ()).unwrap();
        router.add_route(Method::PUT, "/p", ()).unwrap();
        router.add_route(Method::POST, "/q", ()).unwrap();
        assert_eq!(router.allowed("/p"), vec![Method::GET, Method::PUT]);
    }
}

//! Routing error definitions.

use axum::http::Method;
use thiserror::Error;

/// A route pattern that cannot be compiled.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The pattern string was empty.
    #[error("route pattern is empty")]
    Empty,

    /// A wildcard segment appeared before the last position.
    #[error("wildcard `*{name}` must be the last segment in `{pattern}`")]
    WildcardNotLast { pattern: String, name: String },

    /// A `{name:regex}` segment is missing its `:` or closing `}`.
    #[error("malformed regex segment `{segment}` in `{pattern}`")]
    MalformedRegexSegment { pattern: String, segment: String },

    /// The embedded regular expression failed to parse.
    #[error("invalid regex for `{name}` in `{pattern}`: {source}")]
    InvalidRegex {
        pattern: String,
        name: String,
        #[source]
        source: regex::Error,
    },

    /// A `:`, `*` or `{` segment carried no parameter name.
    #[error("parameter without a name in `{pattern}`")]
    EmptyName { pattern: String },

    /// The same parameter name was bound twice.
    #[error("duplicate parameter `{name}` in `{pattern}`")]
    DuplicateName { pattern: String, name: String },
}

/// Errors raised while registering or resolving routes.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Registration failed because the pattern is malformed.
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),

    /// Two registrations disagree on the dynamic segment at one trie position.
    #[error("`{pattern}` conflicts with existing `{existing}` at the same position")]
    Conflict { pattern: String, existing: String },

    /// No registered pattern matches the request.
    #[error("no route for {method} {path}")]
    NotFound { method: Method, path: String },
}

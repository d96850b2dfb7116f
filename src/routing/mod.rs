//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup):
//!     pattern string
//!     → pattern.rs (compile into typed segments)
//!     → tree.rs (insert into the method's trie)
//!
//! Incoming request (method, path):
//!     → router.rs (pick the method's trie)
//!     → tree.rs (backtracking lookup)
//!     → Return: value + Params, or NotFound
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Most specific match wins: static > regex > named > wildcard
//! - Deterministic: same input always matches same route
//! - Regex evaluation delegated to the `regex` crate

pub mod error;
pub mod params;
pub mod pattern;
pub mod router;
pub mod tree;

pub use error::{PatternError, RouteError};
pub use params::Params;
pub use pattern::{compile, Segment};
pub use router::{ResolvedRoute, Router};
pub use tree::{Match, Tree};

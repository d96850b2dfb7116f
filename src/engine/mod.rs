//! Request engine: groups, chains and per-request context.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     Engine::group / RouteGroup::get ...
//!     → group.rs (prefix + pattern, middleware per group)
//!     → routing::Router (compiled into the method's trie)
//!
//! Request:
//!     IncomingRequest
//!     → dispatch.rs (collect middleware of prefix-matching groups, resolve route)
//!     → context.rs (params, request data, response buffer)
//!     → chain.rs (middleware ... handler, each resuming via Next)
//!     → Reply
//! ```
//!
//! # Responsibilities
//! - Hold the route table and group list, immutable once serving starts
//! - Build and run the chain for each request
//! - Produce a transport-neutral `Reply`
//!
//! # Design Decisions
//! - Synchronous handlers; the transport runs each chain on the blocking pool
//! - Group middleware selection is a plain textual prefix test on the path
//! - Unmatched requests still run the matching groups' middleware

pub mod chain;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod group;
pub mod request;

pub use chain::{Handler, Middleware, Next};
pub use context::{Context, Cookie};
pub use dispatch::Engine;
pub use error::WriteError;
pub use group::{RouteGroup, ANY_METHODS};
pub use request::{IncomingRequest, Reply, ReplyBody};

//! grove: an embeddable HTTP router and middleware-chain engine.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (axum + tower-http layers)
//!                          │
//!                          ▼
//!                     engine::dispatch ──▶ routing (pattern → trie → router)
//!                          │
//!                          ▼
//!                     engine::chain  [group middleware ... handler]
//!                          │
//!     Client Response      ▼
//!     ◀────────────── http::response (bytes, or static_files via ServeDir)
//!
//!     Cross-cutting: config, lifecycle, observability, render, net::tls
//! ```

// Core subsystems
pub mod engine;
pub mod middleware;
pub mod render;
pub mod routing;

// Transport
pub mod http;
pub mod net;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ServerConfig;
pub use engine::{Context, Engine, Handler, Middleware, Next, RouteGroup};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{PatternError, RouteError};

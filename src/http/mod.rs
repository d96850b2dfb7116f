//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, tower-http layers)
//!     → request.rs (buffer body, capture peer address)
//!     → engine (chain runs on the blocking pool)
//!     → response.rs (Reply → Response)
//!     → static_files.rs (when the reply delegates to a file)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod static_files;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, ServerError};

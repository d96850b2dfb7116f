//! HTML rendering.
//!
//! Templates are loaded once at startup (from a glob or added by hand) and
//! rendered by name from handlers via `Context::html`.

pub mod templates;

pub use templates::{FuncMap, RenderError, Templates};

//! Built-in middleware.
//!
//! Both are installed on the root group by `Engine::with_defaults`, logger
//! first so the logged status reflects a recovered panic.

pub mod logger;
pub mod recovery;

pub use logger::Logger;
pub use recovery::{panic_message, Recovery};

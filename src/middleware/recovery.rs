//! Panic recovery middleware.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use axum::http::StatusCode;

use crate::engine::{Context, Middleware, Next};

/// Turns a panic in the rest of the chain into a 500 reply.
///
/// Must be installed before the links it protects; panics in earlier
/// middleware are not caught.
#[derive(Debug, Clone, Copy, Default)]
pub struct Recovery;

impl Recovery {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for Recovery {
    fn handle(&self, ctx: &mut Context, next: Next) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| next.run(ctx)));
        if let Err(payload) = outcome {
            tracing::error!(
                method = %ctx.method(),
                path = %ctx.path(),
                panic = %panic_message(payload.as_ref()),
                "Handler panicked"
            );
            ctx.fail(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
        }
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Request logging middleware.

use std::time::Instant;

use crate::engine::{Context, Middleware, Next};
use crate::observability::metrics;

/// Logs one event per request once the rest of the chain has returned.
///
/// Fields: remote address, status, method, URI, user agent and elapsed time.
/// Also records the request counter and latency histogram.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger;

impl Logger {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for Logger {
    fn handle(&self, ctx: &mut Context, next: Next) {
        let start = Instant::now();
        next.run(ctx);

        let elapsed = start.elapsed();
        let status = ctx.status_code();
        let remote = ctx
            .remote_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "-".to_string());

        tracing::info!(
            remote_addr = %remote,
            status = status.as_u16(),
            method = %ctx.method(),
            uri = %ctx.request_uri(),
            user_agent = ctx.user_agent().unwrap_or("-"),
            elapsed = ?elapsed,
            "Request completed"
        );

        metrics::record_request(
            ctx.method().as_str(),
            status.as_u16(),
            ctx.route_pattern().unwrap_or("unmatched"),
            start,
        );
    }
}

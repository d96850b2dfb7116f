//! Chain execution with explicit continuations.
//!
//! # Model
//! ```text
//! chain = [M1, M2, ..., handler]
//!
//! Next(0).run(ctx)
//!     → M1(ctx, Next(1))
//!         → before logic
//!         → Next(1).run(ctx) → M2(ctx, Next(2)) → ... → handler(ctx)
//!         → after logic (runs once the rest of the chain returned)
//! ```
//!
//! # Design Decisions
//! - `Next` is consumed by `run`, so a link continues the chain at most once
//! - A middleware that drops its `Next` short-circuits everything after it
//! - `Context::fail` moves the cursor to the end; later `run` calls are no-ops

use std::sync::Arc;

use crate::engine::context::Context;

/// Terminal request handler bound to a route.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: &mut Context);
}

impl<F> Handler for F
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    fn call(&self, ctx: &mut Context) {
        self(ctx)
    }
}

/// A link that may run code before and after the rest of the chain.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, ctx: &mut Context, next: Next);
}

impl<F> Middleware for F
where
    F: Fn(&mut Context, Next) + Send + Sync + 'static,
{
    fn handle(&self, ctx: &mut Context, next: Next) {
        self(ctx, next)
    }
}

/// One element of a request's chain.
#[derive(Clone)]
pub(crate) enum Link {
    Middleware(Arc<dyn Middleware>),
    Handler(Arc<dyn Handler>),
}

/// Capability to resume the remaining chain.
pub struct Next {
    chain: Arc<[Link]>,
    index: usize,
}

impl Next {
    /// Run the remaining links against `ctx`.
    ///
    /// Returns once every later link that was reached has returned.
    pub fn run(self, ctx: &mut Context) {
        if ctx.is_aborted() {
            return;
        }
        let link = match self.chain.get(self.index) {
            Some(link) => link.clone(),
            None => {
                ctx.set_cursor(self.chain.len());
                return;
            }
        };

        ctx.set_cursor(self.index);
        let next = Next {
            chain: self.chain,
            index: self.index + 1,
        };
        match link {
            Link::Middleware(middleware) => middleware.handle(ctx, next),
            Link::Handler(handler) => {
                handler.call(ctx);
                next.run(ctx);
            }
        }
    }

    /// Number of links that have not started yet.
    pub fn remaining(&self) -> usize {
        self.chain.len().saturating_sub(self.index)
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("len", &self.chain.len())
            .finish()
    }
}

/// Execute `links` against `ctx` from the first link.
pub(crate) fn execute(ctx: &mut Context, links: Vec<Link>) {
    let chain: Arc<[Link]> = links.into();
    ctx.begin(chain.len());
    Next { chain, index: 0 }.run(ctx);
}

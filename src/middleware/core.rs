use std::sync::Arc;

use tracing::debug;

use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::handler::Handler;

/// Shared handle to a middleware unit
pub type MiddlewareRef = Arc<dyn Middleware>;

/// One composable step in a route's chain.
///
/// A unit either calls [`Next::run`] to hand control to the rest of the chain, or
/// returns without calling it, which halts the chain (auth failures, early
/// responses). Code after `next.run(..)` executes once the rest of the chain has
/// finished.
pub trait Middleware: Send + Sync {
    fn handle(&self, req: &mut HandlerRequest, res: &mut HandlerResponse, next: Next<'_>);

    /// Name used in logs and route dumps
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> Middleware for F
where
    F: Fn(&mut HandlerRequest, &mut HandlerResponse, Next<'_>) + Send + Sync,
{
    fn handle(&self, req: &mut HandlerRequest, res: &mut HandlerResponse, next: Next<'_>) {
        self(req, res, next)
    }

    fn name(&self) -> &str {
        "fn"
    }
}

/// Pin a closure's signature so its argument types are inferred.
pub fn middleware_fn<F>(f: F) -> F
where
    F: Fn(&mut HandlerRequest, &mut HandlerResponse, Next<'_>) + Send + Sync + 'static,
{
    f
}

/// Continuation handed to each unit: the not-yet-executed rest of the chain.
///
/// Borrows two slices, the router's global middleware followed by the route's own
/// prepared chain, and walks them without allocating.
pub struct Next<'a> {
    pending: &'a [MiddlewareRef],
    rest: &'a [MiddlewareRef],
}

impl<'a> Next<'a> {
    pub(crate) fn new(global: &'a [MiddlewareRef], local: &'a [MiddlewareRef]) -> Self {
        Self {
            pending: global,
            rest: local,
        }
    }

    /// Number of units that have not run yet
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len() + self.rest.len()
    }

    /// Run the next unit, if any.
    ///
    /// Stops at this boundary when the request has been cancelled.
    pub fn run(self, req: &mut HandlerRequest, res: &mut HandlerResponse) {
        if req.is_cancelled() {
            debug!(
                request_id = %req.request_id,
                path = %req.path,
                remaining = self.remaining(),
                "Request cancelled, middleware chain stopped"
            );
            return;
        }

        let (unit, next) = match self.pending.split_first() {
            Some((unit, pending)) => (
                unit,
                Next {
                    pending,
                    rest: self.rest,
                },
            ),
            None => match self.rest.split_first() {
                Some((unit, rest)) => (
                    unit,
                    Next {
                        pending: rest,
                        rest: &[],
                    },
                ),
                None => return,
            },
        };
        unit.handle(req, res, next);
    }
}

/// Execute `global` then `local` against one request.
pub fn run_chain(
    global: &[MiddlewareRef],
    local: &[MiddlewareRef],
    req: &mut HandlerRequest,
    res: &mut HandlerResponse,
) {
    Next::new(global, local).run(req, res);
}

/// A route handler folded into its chain.
///
/// Calls the handler, then continues so units registered with
/// [`Route::done`](crate::route::Route::done) still run.
pub(crate) struct HandlerUnit {
    handler: Arc<dyn Handler>,
}

impl HandlerUnit {
    pub(crate) fn new(handler: Arc<dyn Handler>) -> Self {
        Self { handler }
    }
}

impl Middleware for HandlerUnit {
    fn handle(&self, req: &mut HandlerRequest, res: &mut HandlerResponse, next: Next<'_>) {
        self.handler.handle(req, res);
        next.run(req, res);
    }

    fn name(&self) -> &str {
        "handler"
    }
}

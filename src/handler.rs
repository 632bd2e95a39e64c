//! Route handlers.
//!
//! A handler is the terminal unit of a route's chain. It reports results through
//! the [`HandlerResponse`] it is given; the router never sees a return value.

use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Terminal request handler for a route
pub trait Handler: Send + Sync {
    fn handle(&self, req: &HandlerRequest, res: &mut HandlerResponse);
}

impl<F> Handler for F
where
    F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync,
{
    fn handle(&self, req: &HandlerRequest, res: &mut HandlerResponse) {
        self(req, res)
    }
}

/// Pin a closure's signature so its argument types are inferred.
///
/// ```rust
/// use segroute::handler::handler_fn;
///
/// let h = handler_fn(|req, res| {
///     res.status = 200;
///     res.body = serde_json::json!({ "path": req.path });
/// });
/// # let _ = h;
/// ```
pub fn handler_fn<F>(f: F) -> F
where
    F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync + 'static,
{
    f
}

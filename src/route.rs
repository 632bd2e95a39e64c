//! A single registered endpoint.
//!
//! A [`Route`] owns its compiled [`RoutePattern`], its allowed methods and its own
//! middleware. Routes are built up by registration calls and then prepared exactly
//! once: the method set defaults to `GET` when empty and the handler is folded into
//! the chain. After that the route is frozen and builder calls fail with
//! [`RouterError::RouteFrozen`].

use std::fmt;
use std::sync::Arc;

use http::Method;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use smallvec::{smallvec, SmallVec};
use tracing::{debug, warn};

use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::RouterError;
use crate::handler::Handler;
use crate::middleware::{HandlerUnit, Middleware, MiddlewareRef, Next};
use crate::pattern::RoutePattern;

/// Allowed methods of a route; most routes allow one or two
pub type MethodSet = SmallVec<[Method; 4]>;

/// Parse method tokens, upper-casing them and dropping duplicates.
pub(crate) fn parse_methods<I, S>(methods: I) -> Result<MethodSet, RouterError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = MethodSet::new();
    for raw in methods {
        let raw = raw.as_ref();
        let upper = raw.trim().to_ascii_uppercase();
        let method =
            Method::from_bytes(upper.as_bytes()).map_err(|_| RouterError::InvalidMethod {
                method: raw.to_string(),
            })?;
        if !set.contains(&method) {
            set.push(method);
        }
    }
    Ok(set)
}

struct RouteState {
    methods: MethodSet,
    middleware: Vec<MiddlewareRef>,
    done: Vec<MiddlewareRef>,
    frozen: bool,
}

/// The frozen, servable form of a route
pub struct Prepared {
    methods: MethodSet,
    chain: Vec<MiddlewareRef>,
}

impl Prepared {
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Route middleware, then the handler, then `done` units
    #[must_use]
    pub fn chain(&self) -> &[MiddlewareRef] {
        &self.chain
    }

    /// Exact, case-sensitive method token match
    #[must_use]
    pub fn allows(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m.as_str() == method)
    }
}

pub struct Route {
    pattern: RoutePattern,
    handler: Option<Arc<dyn Handler>>,
    state: Mutex<RouteState>,
    prepared: OnceCell<Prepared>,
}

impl Route {
    pub(crate) fn new(
        pattern: RoutePattern,
        handler: Option<Arc<dyn Handler>>,
        methods: MethodSet,
        middleware: Vec<MiddlewareRef>,
    ) -> Self {
        Self {
            pattern,
            handler,
            state: Mutex::new(RouteState {
                methods,
                middleware,
                done: Vec::new(),
                frozen: false,
            }),
            prepared: OnceCell::new(),
        }
    }

    /// The normalised registration path
    #[must_use]
    pub fn path(&self) -> &str {
        self.pattern.full_path()
    }

    #[must_use]
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// `false` for catch-all sinks registered without a handler
    #[must_use]
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Add methods to the allowed set
    pub fn methods<I, S>(&self, methods: I) -> Result<&Self, RouterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = parse_methods(methods)?;
        self.with_state(|state| {
            for method in parsed {
                if !state.methods.contains(&method) {
                    state.methods.push(method);
                }
            }
        })
    }

    /// Replace the allowed set with a single method
    pub fn method(&self, method: &str) -> Result<&Self, RouterError> {
        let parsed = parse_methods([method])?;
        self.with_state(|state| state.methods = parsed)
    }

    /// Append route-specific middleware, run before the handler
    pub fn use_middleware<M>(&self, middleware: M) -> Result<&Self, RouterError>
    where
        M: Middleware + 'static,
    {
        self.push_middleware(Arc::new(middleware))
    }

    /// Closure form of [`use_middleware`](Self::use_middleware)
    pub fn use_fn<F>(&self, f: F) -> Result<&Self, RouterError>
    where
        F: Fn(&mut HandlerRequest, &mut HandlerResponse, Next<'_>) + Send + Sync + 'static,
    {
        self.push_middleware(Arc::new(f))
    }

    /// Append middleware that runs after the handler
    pub fn done<M>(&self, middleware: M) -> Result<&Self, RouterError>
    where
        M: Middleware + 'static,
    {
        let middleware: MiddlewareRef = Arc::new(middleware);
        self.with_state(|state| state.done.push(middleware))
    }

    pub(crate) fn push_middleware(&self, middleware: MiddlewareRef) -> Result<&Self, RouterError> {
        self.with_state(|state| state.middleware.push(middleware))
    }

    fn with_state<F>(&self, f: F) -> Result<&Self, RouterError>
    where
        F: FnOnce(&mut RouteState),
    {
        let mut state = self.state.lock();
        if state.frozen {
            warn!(path = %self.path(), "Attempt to modify a prepared route");
            return Err(RouterError::RouteFrozen {
                path: self.path().to_string(),
            });
        }
        f(&mut state);
        Ok(self)
    }

    /// Prepare the route for serving, once.
    ///
    /// Concurrent first callers block until the single initialisation finishes and
    /// all observe the same [`Prepared`].
    pub fn prepare(&self) -> &Prepared {
        self.prepared.get_or_init(|| {
            let mut state = self.state.lock();
            state.frozen = true;

            let methods = if state.methods.is_empty() {
                smallvec![Method::GET]
            } else {
                state.methods.clone()
            };

            let mut chain = Vec::with_capacity(state.middleware.len() + state.done.len() + 1);
            chain.extend(state.middleware.iter().map(Arc::clone));
            if let Some(handler) = &self.handler {
                chain.push(Arc::new(HandlerUnit::new(Arc::clone(handler))) as MiddlewareRef);
            }
            chain.extend(state.done.iter().map(Arc::clone));

            debug!(
                path = %self.path(),
                methods = ?methods,
                chain_len = chain.len(),
                "Route prepared"
            );

            Prepared { methods, chain }
        })
    }

    #[must_use]
    pub fn is_prepared(&self) -> bool {
        self.prepared.get().is_some()
    }

    /// Whether the prepared route accepts `method`
    #[must_use]
    pub fn allows(&self, method: &str) -> bool {
        self.prepare().allows(method)
    }

    /// Methods as currently registered; empty before preparation means `GET`
    #[must_use]
    pub fn registered_methods(&self) -> MethodSet {
        match self.prepared.get() {
            Some(prepared) => prepared.methods.clone(),
            None => self.state.lock().methods.clone(),
        }
    }

    /// Names of the route's own units in execution order
    #[must_use]
    pub fn middleware_names(&self) -> Vec<String> {
        if let Some(prepared) = self.prepared.get() {
            return prepared
                .chain
                .iter()
                .map(|m| m.name().to_string())
                .collect();
        }
        let state = self.state.lock();
        let mut names: Vec<String> = state
            .middleware
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        if self.handler.is_some() {
            names.push("handler".to_string());
        }
        names.extend(state.done.iter().map(|m| m.name().to_string()));
        names
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path())
            .field("methods", &self.registered_methods())
            .field("has_handler", &self.has_handler())
            .field("prepared", &self.is_prepared())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::pattern::compile;

    fn route(path: &str) -> Route {
        let handler: Arc<dyn Handler> = Arc::new(handler_fn(|_req, res| res.status = 204));
        Route::new(compile(path).unwrap(), Some(handler), MethodSet::new(), Vec::new())
    }

    #[test]
    fn test_methods_default_to_get_on_prepare() {
        let r = route("/a");
        assert!(r.registered_methods().is_empty());
        assert!(r.allows("GET"));
        assert!(!r.allows("POST"));
        assert_eq!(r.registered_methods().as_slice(), &[Method::GET]);
    }

    #[test]
    fn test_methods_are_uppercased_and_deduplicated() {
        let r = route("/a");
        r.methods(["post", "POST", "Put"]).unwrap();
        assert_eq!(
            r.registered_methods().as_slice(),
            &[Method::POST, Method::PUT]
        );
        assert!(r.allows("POST"));
        assert!(!r.allows("post"));
    }

    #[test]
    fn test_method_replaces_set() {
        let r = route("/a");
        r.methods(["POST", "PUT"]).unwrap().method("DELETE").unwrap();
        assert_eq!(r.registered_methods().as_slice(), &[Method::DELETE]);
    }

    #[test]
    fn test_invalid_method_rejected() {
        let r = route("/a");
        let err = r.methods(["GE T"]).unwrap_err();
        assert_eq!(
            err,
            RouterError::InvalidMethod {
                method: "GE T".to_string()
            }
        );
        assert!(matches!(
            parse_methods([""]),
            Err(RouterError::InvalidMethod { .. })
        ));
    }

    #[test]
    fn test_prepared_route_is_frozen() {
        let r = route("/a");
        r.prepare();
        assert!(r.is_prepared());
        assert!(matches!(
            r.methods(["POST"]),
            Err(RouterError::RouteFrozen { .. })
        ));
        assert!(matches!(
            r.use_fn(|req, res, next| next.run(req, res)),
            Err(RouterError::RouteFrozen { .. })
        ));
    }

    #[test]
    fn test_prepare_folds_handler_between_middleware_and_done() {
        let r = route("/a");
        r.use_fn(|req, res, next| next.run(req, res)).unwrap();
        r.done(crate::middleware::LoggerMiddleware::default()).unwrap();
        assert_eq!(r.middleware_names(), vec!["fn", "handler", "logger"]);
        let prepared = r.prepare();
        assert_eq!(prepared.chain().len(), 3);
        assert_eq!(r.middleware_names(), vec!["fn", "handler", "logger"]);
    }

    #[test]
    fn test_concurrent_prepare_runs_once() {
        let r = Arc::new(route("/a"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let r = Arc::clone(&r);
                std::thread::spawn(move || r.prepare() as *const Prepared as usize)
            })
            .collect();
        let addrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addrs.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(r.prepare().chain().len(), 1);
    }

    #[test]
    fn test_sink_route_has_no_handler_unit() {
        let r = Route::new(compile("*").unwrap(), None, MethodSet::new(), Vec::new());
        assert!(!r.has_handler());
        assert!(r.prepare().chain().is_empty());
    }
}

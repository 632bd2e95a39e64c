//! Router core module - hot path for request routing.
//!
//! `find` holds the registry read lock only for the scan; the matched route's chain
//! runs after the lock is released.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::RouterError;
use crate::handler::Handler;
use crate::middleware::{run_chain, Middleware, MiddlewareRef, Next};
use crate::pattern::{compile_with, CompileOptions, ParamVec};
use crate::route::{parse_methods, MethodSet, Route};
use crate::runtime_config::RouterConfig;

use super::party::Party;

/// Methods registered by [`Router::any`]
pub const ALL_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::CONNECT,
    Method::HEAD,
    Method::PATCH,
    Method::OPTIONS,
    Method::TRACE,
];

/// Result of successfully matching a request to a route
#[derive(Clone)]
pub struct RouteMatch {
    /// The matched route
    pub route: Arc<Route>,
    /// Path parameters extracted from the URL (e.g. `:id` → `("id", "123")`)
    pub path_params: ParamVec,
    /// Global middleware as registered when the match was made
    global: Arc<[MiddlewareRef]>,
}

impl RouteMatch {
    /// Get a path parameter by name (last write wins)
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn global_middleware(&self) -> &[MiddlewareRef] {
        &self.global
    }

    /// Run global middleware followed by the route's prepared chain
    pub fn run(&self, req: &mut HandlerRequest, res: &mut HandlerResponse) {
        run_chain(&self.global, self.route.prepare().chain(), req, res);
    }
}

impl std::fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatch")
            .field("route", &self.route.path())
            .field("path_params", &self.path_params)
            .field("global_middleware", &self.global.len())
            .finish()
    }
}

/// Outcome of [`Router::find`]
#[derive(Debug, Clone)]
pub enum Lookup {
    Found(RouteMatch),
    /// No pattern matched the path
    NotFound,
    /// At least one pattern matched, but none of those routes allow the method
    MethodNotAllowed,
}

impl Lookup {
    /// `0` when found, otherwise the HTTP status the dispatcher should emit
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Lookup::Found(_) => 0,
            Lookup::NotFound => 404,
            Lookup::MethodNotAllowed => 405,
        }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    #[must_use]
    pub fn into_match(self) -> Option<RouteMatch> {
        match self {
            Lookup::Found(m) => Some(m),
            _ => None,
        }
    }
}

struct Registry {
    routes: Vec<Arc<Route>>,
    global: Arc<[MiddlewareRef]>,
}

/// Registration-ordered route registry
///
/// Routes are scanned in insertion order and the first route whose pattern and
/// method both match wins, so registering a route earlier lets it shadow later ones.
pub struct Router {
    registry: RwLock<Registry>,
    options: CompileOptions,
    slow_match: Duration,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&RouterConfig::default())
    }

    #[must_use]
    pub fn with_config(config: &RouterConfig) -> Self {
        Self {
            registry: RwLock::new(Registry {
                routes: Vec::new(),
                global: Arc::from(Vec::new()),
            }),
            options: CompileOptions {
                enforce_constraints: config.enforce_constraints,
            },
            slow_match: Duration::from_micros(config.slow_match_threshold_us),
        }
    }

    /// Register a route
    ///
    /// An empty `methods` slice leaves the set open until preparation, when it
    /// defaults to `GET`.
    pub fn route<H>(&self, path: &str, handler: H, methods: &[&str]) -> Result<Arc<Route>, RouterError>
    where
        H: Handler + 'static,
    {
        let methods = parse_methods(methods)?;
        self.register(path, Some(Arc::new(handler)), methods, Vec::new())
    }

    /// Register a handler-less catch-all
    ///
    /// Only the match-everything pattern is accepted; requests that reach it are
    /// served by global middleware alone.
    pub fn sink(&self, path: &str) -> Result<Arc<Route>, RouterError> {
        self.register(path, None, MethodSet::new(), Vec::new())
    }

    pub(crate) fn register(
        &self,
        path: &str,
        handler: Option<Arc<dyn Handler>>,
        methods: MethodSet,
        middleware: Vec<MiddlewareRef>,
    ) -> Result<Arc<Route>, RouterError> {
        let pattern = compile_with(path, &self.options)?;
        if handler.is_none() && !pattern.is_match_all() {
            return Err(RouterError::MissingHandler {
                path: pattern.full_path().to_string(),
            });
        }

        let route = Arc::new(Route::new(pattern, handler, methods, middleware));
        let mut registry = self.registry.write();
        registry.routes.push(Arc::clone(&route));

        debug!(
            path = %route.path(),
            methods = ?route.registered_methods(),
            position = registry.routes.len() - 1,
            global_middleware = registry.global.len(),
            "Route registered"
        );
        Ok(route)
    }

    fn verb<H>(&self, method: Method, path: &str, handler: H) -> Result<Arc<Route>, RouterError>
    where
        H: Handler + 'static,
    {
        let mut methods = MethodSet::new();
        methods.push(method);
        self.register(path, Some(Arc::new(handler)), methods, Vec::new())
    }

    pub fn get<F>(&self, path: &str, handler: F) -> Result<Arc<Route>, RouterError>
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync + 'static,
    {
        self.verb(Method::GET, path, handler)
    }

    pub fn post<F>(&self, path: &str, handler: F) -> Result<Arc<Route>, RouterError>
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync + 'static,
    {
        self.verb(Method::POST, path, handler)
    }

    pub fn put<F>(&self, path: &str, handler: F) -> Result<Arc<Route>, RouterError>
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync + 'static,
    {
        self.verb(Method::PUT, path, handler)
    }

    pub fn delete<F>(&self, path: &str, handler: F) -> Result<Arc<Route>, RouterError>
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync + 'static,
    {
        self.verb(Method::DELETE, path, handler)
    }

    pub fn patch<F>(&self, path: &str, handler: F) -> Result<Arc<Route>, RouterError>
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync + 'static,
    {
        self.verb(Method::PATCH, path, handler)
    }

    pub fn head<F>(&self, path: &str, handler: F) -> Result<Arc<Route>, RouterError>
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync + 'static,
    {
        self.verb(Method::HEAD, path, handler)
    }

    pub fn options<F>(&self, path: &str, handler: F) -> Result<Arc<Route>, RouterError>
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync + 'static,
    {
        self.verb(Method::OPTIONS, path, handler)
    }

    pub fn connect<F>(&self, path: &str, handler: F) -> Result<Arc<Route>, RouterError>
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync + 'static,
    {
        self.verb(Method::CONNECT, path, handler)
    }

    pub fn trace<F>(&self, path: &str, handler: F) -> Result<Arc<Route>, RouterError>
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync + 'static,
    {
        self.verb(Method::TRACE, path, handler)
    }

    /// Register a route for every method in [`ALL_METHODS`]
    pub fn any<F>(&self, path: &str, handler: F) -> Result<Arc<Route>, RouterError>
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync + 'static,
    {
        let methods: MethodSet = ALL_METHODS.iter().cloned().collect();
        self.register(path, Some(Arc::new(handler)), methods, Vec::new())
    }

    /// Group routes under a shared prefix and shared middleware
    #[must_use]
    pub fn party(&self, prefix: &str) -> Party<'_> {
        Party::new(self, prefix)
    }

    /// Register global middleware
    ///
    /// Applies to every route, including routes registered before this call and
    /// routes that are already serving. Global units run ahead of route units.
    pub fn use_middleware<M>(&self, middleware: M) -> &Self
    where
        M: Middleware + 'static,
    {
        self.push_global(Arc::new(middleware))
    }

    /// Closure form of [`use_middleware`](Self::use_middleware)
    pub fn use_fn<F>(&self, f: F) -> &Self
    where
        F: Fn(&mut HandlerRequest, &mut HandlerResponse, Next<'_>) + Send + Sync + 'static,
    {
        self.push_global(Arc::new(f))
    }

    fn push_global(&self, middleware: MiddlewareRef) -> &Self {
        let mut registry = self.registry.write();
        let mut global = registry.global.to_vec();
        global.push(middleware);
        registry.global = Arc::from(global);
        debug!(
            global_middleware = registry.global.len(),
            routes_count = registry.routes.len(),
            "Global middleware registered"
        );
        self
    }

    /// Match a request against the registry
    ///
    /// A route whose pattern matches but whose method set does not is remembered
    /// and the scan continues, since a later route may accept the method.
    #[must_use]
    pub fn find(&self, method: &str, path: &str) -> Lookup {
        let match_start = Instant::now();
        let registry = self.registry.read();
        let mut wrong_method = false;

        for route in &registry.routes {
            if !route.pattern().matches(path) {
                continue;
            }
            if !route.allows(method) {
                wrong_method = true;
                continue;
            }

            let path_params = route.pattern().extract(path).unwrap_or_default();
            let route = Arc::clone(route);
            let global = Arc::clone(&registry.global);
            drop(registry);

            let match_duration = match_start.elapsed();
            if match_duration > self.slow_match {
                warn!(
                    method = %method,
                    path = %path,
                    route_pattern = %route.path(),
                    duration_us = match_duration.as_micros(),
                    "Slow route matching detected"
                );
            } else {
                debug!(
                    method = %method,
                    path = %path,
                    route_pattern = %route.path(),
                    path_params = ?path_params,
                    duration_us = match_duration.as_micros(),
                    "Route matched"
                );
            }

            return Lookup::Found(RouteMatch {
                route,
                path_params,
                global,
            });
        }
        drop(registry);

        if wrong_method {
            warn!(method = %method, path = %path, "Path matched but method not allowed");
            Lookup::MethodNotAllowed
        } else {
            warn!(method = %method, path = %path, "No route matched");
            Lookup::NotFound
        }
    }

    /// Methods of every route whose pattern matches `path`, in registration order
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> MethodSet {
        let registry = self.registry.read();
        let mut allowed = MethodSet::new();
        for route in registry.routes.iter().filter(|r| r.pattern().matches(path)) {
            for method in route.prepare().methods() {
                if !allowed.contains(method) {
                    allowed.push(method.clone());
                }
            }
        }
        allowed
    }

    /// Prepare every route now instead of on first dispatch
    ///
    /// Call once when registration is over and serving is about to start.
    pub fn prepare_all(&self) -> usize {
        let registry = self.registry.read();
        for route in &registry.routes {
            route.prepare();
        }

        let routes_summary: Vec<String> = registry
            .routes
            .iter()
            .take(10)
            .map(|r| format!("{:?} {}", r.registered_methods().as_slice(), r.path()))
            .collect();
        info!(
            routes_count = registry.routes.len(),
            global_middleware = registry.global.len(),
            routes_summary = ?routes_summary,
            "Routing table prepared"
        );
        registry.routes.len()
    }

    /// Snapshot of the registered routes in match order
    #[must_use]
    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.registry.read().routes.to_vec()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.read().routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.read().routes.is_empty()
    }

    /// Names of the full chain a request to `route` would run
    #[must_use]
    pub fn chain_names(&self, route: &Route) -> Vec<String> {
        let mut names: Vec<String> = self
            .registry
            .read()
            .global
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        names.extend(route.middleware_names());
        names
    }

    /// One line per route: position, methods, pattern, chain length
    #[must_use]
    pub fn describe_routes(&self) -> Vec<String> {
        let registry = self.registry.read();
        registry
            .routes
            .iter()
            .enumerate()
            .map(|(idx, route)| {
                let methods = route.registered_methods();
                let methods = if methods.is_empty() {
                    "GET".to_string()
                } else {
                    methods
                        .iter()
                        .map(Method::as_str)
                        .collect::<Vec<_>>()
                        .join(",")
                };
                format!(
                    "[{}] {} {} (prefix={:?}, chain={})",
                    idx,
                    methods,
                    route.path(),
                    route.pattern().literal_prefix(),
                    registry.global.len() + route.middleware_names().len()
                )
            })
            .collect()
    }

    /// Print all registered routes to stdout
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.len());
        for line in self.describe_routes() {
            println!("[route] {line}");
        }
    }
}

use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::RouterError;
use crate::handler::Handler;
use crate::middleware::{Middleware, MiddlewareRef, Next};
use crate::route::{parse_methods, MethodSet, Route};

use super::core::Router;

/// A group of routes sharing a path prefix and middleware
///
/// Party middleware is copied into each route when the route is registered, so a
/// route only receives the party units added before it.
pub struct Party<'r> {
    router: &'r Router,
    prefix: String,
    middleware: Vec<MiddlewareRef>,
}

impl<'r> Party<'r> {
    pub(crate) fn new(router: &'r Router, prefix: &str) -> Self {
        Self {
            router,
            prefix: prefix.trim_end_matches('/').to_string(),
            middleware: Vec::new(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        if self.prefix.is_empty() {
            "/"
        } else {
            &self.prefix
        }
    }

    /// Nested party; inherits this party's prefix and middleware
    #[must_use]
    pub fn party(&self, prefix: &str) -> Party<'r> {
        let joined = join_paths(&self.prefix, prefix);
        Party {
            router: self.router,
            prefix: joined.trim_end_matches('/').to_string(),
            middleware: self.middleware.iter().map(Arc::clone).collect(),
        }
    }

    pub fn use_middleware<M>(&mut self, middleware: M) -> &mut Self
    where
        M: Middleware + 'static,
    {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn use_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut HandlerRequest, &mut HandlerResponse, Next<'_>) + Send + Sync + 'static,
    {
        self.middleware.push(Arc::new(f));
        self
    }

    pub fn route<H>(&self, path: &str, handler: H, methods: &[&str]) -> Result<Arc<Route>, RouterError>
    where
        H: Handler + 'static,
    {
        let methods = parse_methods(methods)?;
        self.register(path, handler, methods)
    }

    fn register<H>(&self, path: &str, handler: H, methods: MethodSet) -> Result<Arc<Route>, RouterError>
    where
        H: Handler + 'static,
    {
        let full = join_paths(&self.prefix, path);
        debug!(prefix = %self.prefix(), path = %path, full = %full, "Party route");
        self.router.register(
            &full,
            Some(Arc::new(handler)),
            methods,
            self.middleware.iter().map(Arc::clone).collect(),
        )
    }

    fn verb<F>(&self, method: Method, path: &str, handler: F) -> Result<Arc<Route>, RouterError>
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync + 'static,
    {
        let mut methods = MethodSet::new();
        methods.push(method);
        self.register(path, handler, methods)
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
}

/// Join a party prefix and a relative route path
pub(crate) fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if path.is_empty() || path == "/" {
        if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }
    } else if path.starts_with('/') {
        format!("{prefix}{path}")
    } else {
        format!("{prefix}/{path}")
    }
}

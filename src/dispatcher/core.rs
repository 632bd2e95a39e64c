//! Dispatcher core module - request/response types and the dispatch loop.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::unnecessary_to_owned)]

use std::any::Any;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use http::{Extensions, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use tracing::{debug, error, warn};

use crate::cancel::CancelToken;
use crate::ids::RequestId;
use crate::pattern::ParamVec;
use crate::router::{Lookup, Router};
use crate::runtime_config::RouterConfig;

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage; names are shared `Arc<str>`
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Header used to propagate request ids
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request context handed through the middleware chain
///
/// Path parameters live here, in an explicit per-request bag, rather than in any
/// state shared between requests.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// Path parameters bound by the matched route
    pub path_params: ParamVec,
    /// Decoded query string parameters
    pub query_params: ParamVec,
    pub headers: HeaderVec,
    /// Peer address, when the caller knows it
    pub remote_addr: Option<SocketAddr>,
    /// Values passed from middleware to the handler
    pub extensions: Extensions,
    raw_query: Option<String>,
    cancel: CancelToken,
}

impl HandlerRequest {
    /// Build a request from a method and a request target (`/path?query`)
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, raw_query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        let query_params = raw_query
            .as_deref()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            request_id: RequestId::new(),
            method,
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            path_params: ParamVec::new(),
            query_params,
            headers: HeaderVec::new(),
            remote_addr: None,
            extensions: Extensions::new(),
            raw_query,
            cancel: CancelToken::new(),
        }
    }

    /// Add a request header
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    /// Record the peer address
    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Share a cancellation token with the transport
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics when a name is bound more than once.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name (last write wins, e.g. `?limit=10&limit=20`)
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The undecoded query string, if the target had one
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.raw_query.as_deref()
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Response filled in by middleware and handlers
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    pub body: Value,
}

impl Default for HandlerResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HeaderVec::new(),
            body: Value::Null,
        }
    }
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a JSON response with a content type header
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create an error response with body `{"error": message}`
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// Create a redirect response
    #[must_use]
    pub fn redirect(status: u16, location: &str) -> Self {
        let mut res = Self {
            status,
            ..Self::default()
        };
        res.set_header("location", location.to_string());
        res
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header (case-insensitive)
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

/// Custom response for an error status
pub type ErrorHandler = Arc<dyn Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync>;

/// Edge between a transport and the [`Router`]
///
/// Turns a [`Lookup`] into a response: runs the matched chain with panic
/// recovery, and renders 404/405/500 through the registered error handlers.
pub struct Dispatcher {
    router: Arc<Router>,
    path_correction: bool,
    error_handlers: HashMap<u16, ErrorHandler>,
}

impl Dispatcher {
    /// Create a dispatcher; prepares every registered route
    #[must_use]
    pub fn new(router: Arc<Router>) -> Self {
        Self::with_config(router, &RouterConfig::default())
    }

    #[must_use]
    pub fn with_config(router: Arc<Router>, config: &RouterConfig) -> Self {
        router.prepare_all();
        Self {
            router,
            path_correction: config.path_correction,
            error_handlers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Register a handler for responses emitted with `status`
    ///
    /// The handler receives a response already populated with the default JSON
    /// error body and may rewrite it.
    pub fn on_error<F>(&mut self, status: u16, handler: F) -> &mut Self
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync + 'static,
    {
        self.error_handlers.insert(status, Arc::new(handler));
        self
    }

    pub fn on_not_found<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync + 'static,
    {
        self.on_error(404, handler)
    }

    /// Handler for responses to panicking chains (status 500)
    pub fn on_panic<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync + 'static,
    {
        self.on_error(500, handler)
    }

    /// Replace `res` with an error response for `status`
    pub fn emit_error(&self, status: u16, req: &HandlerRequest, res: &mut HandlerResponse) {
        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Error");
        *res = HandlerResponse::error(status, reason);
        if let Some(handler) = self.error_handlers.get(&status) {
            handler(req, res);
        }
    }

    /// Resolve and serve one request
    pub fn dispatch(&self, mut req: HandlerRequest) -> HandlerResponse {
        let start = Instant::now();
        let inbound = req
            .get_header(REQUEST_ID_HEADER)
            .and_then(RequestId::from_inbound);
        if let Some(request_id) = inbound {
            req.request_id = request_id;
        }

        let lookup = self.router.find(req.method.as_str(), &req.path);
        let mut res = match lookup {
            Lookup::Found(mut route_match) => {
                req.path_params = std::mem::take(&mut route_match.path_params);
                let mut res = HandlerResponse::default();
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    route_match.run(&mut req, &mut res);
                }));
                if let Err(panic) = outcome {
                    error!(
                        request_id = %req.request_id,
                        method = %req.method,
                        path = %req.path,
                        route_pattern = %route_match.route.path(),
                        panic_message = %panic_message(panic.as_ref()),
                        "Handler panicked"
                    );
                    self.emit_error(500, &req, &mut res);
                }
                res
            }
            Lookup::NotFound => match self.correct_path(&req) {
                Some(redirect) => redirect,
                None => {
                    let mut res = HandlerResponse::default();
                    self.emit_error(404, &req, &mut res);
                    res
                }
            },
            Lookup::MethodNotAllowed => {
                let mut res = HandlerResponse::default();
                self.emit_error(405, &req, &mut res);
                if res.get_header("allow").is_none() {
                    let allow = self
                        .router
                        .allowed_methods(&req.path)
                        .iter()
                        .map(Method::as_str)
                        .collect::<Vec<_>>()
                        .join(", ");
                    res.set_header("allow", allow);
                }
                res
            }
        };

        res.set_header(REQUEST_ID_HEADER, req.request_id.to_string());
        debug!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            status = res.status,
            cancelled = req.is_cancelled(),
            latency_us = start.elapsed().as_micros() as u64,
            "Request dispatched"
        );
        res
    }

    /// Retry a missed path with its trailing slash toggled
    fn correct_path(&self, req: &HandlerRequest) -> Option<HandlerResponse> {
        if !self.path_correction || req.path == "/" {
            return None;
        }
        let alternate = match req.path.strip_suffix('/') {
            Some(trimmed) => trimmed.to_string(),
            None => format!("{}/", req.path),
        };
        // only redirect to a path that would actually be served
        if !self.router.find(req.method.as_str(), &alternate).is_found() {
            return None;
        }

        let location = match req.query_string() {
            Some(query) => format!("{alternate}?{query}"),
            None => alternate,
        };
        warn!(
            request_id = %req.request_id,
            path = %req.path,
            location = %location,
            "Redirecting to corrected path"
        );
        Some(HandlerResponse::redirect(301, &location))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

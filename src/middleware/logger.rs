use std::time::Instant;

use tracing::info;

use crate::dispatcher::{HandlerRequest, HandlerResponse};

use super::{Middleware, Next};

/// Which request fields the [`LoggerMiddleware`] records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggerOptions {
    pub latency: bool,
    pub status: bool,
    /// Peer IP from [`HandlerRequest::remote_addr`]
    pub ip: bool,
    pub method: bool,
    pub path: bool,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            latency: true,
            status: true,
            ip: true,
            method: true,
            path: true,
        }
    }
}

/// Request logger.
///
/// Runs the rest of the chain, then emits one `info` event per request. Disabled
/// fields are logged as empty values so the event shape stays stable.
#[derive(Debug, Default)]
pub struct LoggerMiddleware {
    options: LoggerOptions,
}

impl LoggerMiddleware {
    #[must_use]
    pub fn new(options: LoggerOptions) -> Self {
        Self { options }
    }
}

impl Middleware for LoggerMiddleware {
    fn handle(&self, req: &mut HandlerRequest, res: &mut HandlerResponse, next: Next<'_>) {
        let start = self.options.latency.then(Instant::now);
        next.run(req, res);

        let latency_us = start.map(|s| s.elapsed().as_micros() as u64);
        let method = if self.options.method { req.method.as_str() } else { "" };
        let path = if self.options.path { req.path.as_str() } else { "" };
        let status = self.options.status.then_some(res.status);
        let ip = if self.options.ip {
            req.remote_addr.map(|addr| addr.ip())
        } else {
            None
        };

        info!(
            request_id = %req.request_id,
            method = %method,
            path = %path,
            status = ?status,
            ip = ?ip,
            latency_us = ?latency_us,
            "Request completed"
        );
    }

    fn name(&self) -> &str {
        "logger"
    }
}

//! # Middleware Module
//!
//! Ordered, composable units that run around a route's handler.
//!
//! ## Chain layout
//!
//! For one request the effective chain is:
//!
//! ```text
//! [router global middleware] + [party middleware] + [route middleware] + [handler] + [done middleware]
//! ```
//!
//! Global middleware lives on the [`Router`](crate::router::Router) and is composed
//! at dispatch time, so a `use_middleware` call reaches every route no matter when
//! the route was registered. Everything after it is frozen into the route when it is
//! prepared.
//!
//! ## Writing middleware
//!
//! ```rust
//! use segroute::middleware::{middleware_fn, Next};
//!
//! let timing = middleware_fn(|req, res, next: Next<'_>| {
//!     let start = std::time::Instant::now();
//!     next.run(req, res);
//!     res.set_header("x-elapsed-us", start.elapsed().as_micros().to_string());
//! });
//! # let _ = timing;
//! ```

mod auth;
mod core;
mod logger;

pub use self::core::{middleware_fn, run_chain, Middleware, MiddlewareRef, Next};
pub(crate) use self::core::HandlerUnit;
pub use auth::AuthMiddleware;
pub use logger::{LoggerMiddleware, LoggerOptions};

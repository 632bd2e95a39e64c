//! # segroute
//!
//! **segroute** is a registration-ordered HTTP request router. Routes are path
//! patterns with named parameters and wildcards, each with its own set of allowed
//! methods and its own middleware chain.
//!
//! ## Overview
//!
//! - Patterns compile once into typed segments; matching walks segments and never
//!   re-parses the pattern string
//! - Routes are scanned in registration order and the first match wins
//! - A path that exists under another method yields 405, not 404
//! - Path parameters are bound into the request, never into shared state
//! - Middleware, handler and `done` units form one chain; any unit may halt it
//!
//! ## Architecture
//!
//! - **[`pattern`]** - Pattern compiler and segment walker
//! - **[`route`]** - A registered endpoint and its single-shot preparation
//! - **[`router`]** - Registry, `find`, global middleware, route groups
//! - **[`middleware`]** - Chain model and built-in units
//! - **[`handler`]** - Terminal handler trait
//! - **[`dispatcher`]** - Request/response types, error handlers, panic recovery
//! - **[`runtime_config`]** / **[`logging`]** - Configuration and tracing setup
//! - **[`table`]** / **[`cli`]** - TOML route tables and the `segroute` binary
//!
//! ## Pattern Syntax
//!
//! | Pattern | Matches | Binds |
//! |---|---|---|
//! | `/users` | `/users` only | nothing |
//! | `/users/:id` | `/users/42` | `id = "42"` |
//! | `/users/:id(int)` | `/users/42` | `id = "42"` (tag is advisory unless enforced) |
//! | `/files/*path` | `/files`, `/files/`, `/files/a/b` | `path = "a/b"` |
//! | `*` | everything | nothing |
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use http::Method;
//! use segroute::dispatcher::{Dispatcher, HandlerRequest};
//! use segroute::middleware::LoggerMiddleware;
//! use segroute::router::Router;
//!
//! # fn main() -> Result<(), segroute::RouterError> {
//! let router = Arc::new(Router::new());
//! router.use_middleware(LoggerMiddleware::default());
//! router.get("/hello/:name", |req, res| {
//!     res.body = serde_json::json!({ "hello": req.get_path_param("name") });
//! })?;
//!
//! let dispatcher = Dispatcher::new(router);
//! let res = dispatcher.dispatch(HandlerRequest::new(Method::GET, "/hello/world"));
//! assert_eq!(res.body["hello"], "world");
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod cli;
pub mod dispatcher;
pub mod echo;
pub mod error;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod pattern;
pub mod route;
pub mod router;
pub mod runtime_config;
pub mod table;

pub use cancel::CancelToken;
pub use error::RouterError;
pub use handler::Handler;
pub use middleware::Middleware;
pub use pattern::{compile, RoutePattern};
pub use route::Route;
pub use router::{Lookup, Router};
pub use runtime_config::RouterConfig;

//! # Dispatcher Module
//!
//! The dispatcher is the edge between a transport and the [`Router`](crate::router::Router).
//! A transport builds a [`HandlerRequest`], calls [`Dispatcher::dispatch`] and writes
//! out the [`HandlerResponse`] it gets back.
//!
//! ## Request Flow
//!
//! 1. The router resolves the method and path into a [`Lookup`](crate::router::Lookup)
//! 2. On a match, path parameters are moved into the request and the chain runs
//!    (global middleware, party and route middleware, handler, `done` units)
//! 3. A panic anywhere in the chain is caught and rendered as a 500
//! 4. 404 and 405 are rendered through the registered error handlers; 405 responses
//!    carry an `Allow` header
//!
//! ## Path Correction
//!
//! With `path_correction` on, a 404 whose path would resolve with its trailing
//! slash toggled is answered with a `301` to that path instead.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use http::Method;
//! use segroute::dispatcher::{Dispatcher, HandlerRequest};
//! use segroute::router::Router;
//!
//! let router = Arc::new(Router::new());
//! router.get("/pets/:id", |req, res| {
//!     res.body = serde_json::json!({ "id": req.get_path_param("id") });
//! }).unwrap();
//!
//! let mut dispatcher = Dispatcher::new(router);
//! dispatcher.on_not_found(|_req, res| res.body = serde_json::json!({ "error": "no pet" }));
//!
//! let res = dispatcher.dispatch(HandlerRequest::new(Method::GET, "/pets/7"));
//! assert_eq!(res.status, 200);
//! assert_eq!(res.body["id"], "7");
//!
//! let res = dispatcher.dispatch(HandlerRequest::new(Method::GET, "/cats"));
//! assert_eq!(res.status, 404);
//! ```

mod core;

pub use self::core::{
    Dispatcher, ErrorHandler, HandlerRequest, HandlerResponse, HeaderVec, MAX_INLINE_HEADERS,
    REQUEST_ID_HEADER,
};

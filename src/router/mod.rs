//! # Router Module
//!
//! The router holds the registration-ordered list of routes and resolves requests
//! against it.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling registration paths into [`RoutePattern`](crate::pattern::RoutePattern)s
//! - Keeping routes in insertion order and scanning them first-match-wins
//! - Distinguishing "no such path" (404) from "path exists, wrong method" (405)
//! - Holding global middleware, which applies to routes registered before and after it
//! - Grouping routes under shared prefixes via [`Party`]
//!
//! ## Example
//!
//! ```rust
//! use segroute::router::{Lookup, Router};
//!
//! let router = Router::new();
//! router.get("/users/:id", |req, res| {
//!     res.body = serde_json::json!({ "id": req.get_path_param("id") });
//! }).unwrap();
//!
//! match router.find("GET", "/users/42") {
//!     Lookup::Found(m) => assert_eq!(m.get_path_param("id"), Some("42")),
//!     other => panic!("unexpected {:?}", other),
//! }
//! assert_eq!(router.find("POST", "/users/42").status_code(), 405);
//! assert_eq!(router.find("GET", "/users/42/extra").status_code(), 404);
//! ```
//!
//! ## Performance
//!
//! Matching is linear in the number of routes. Each candidate is rejected on the
//! first mismatching segment, and patterns without parameters compare by string
//! equality.

mod core;
mod party;

pub use self::core::{Lookup, RouteMatch, Router, ALL_METHODS};
pub use self::party::Party;
pub use crate::pattern::ParamVec;

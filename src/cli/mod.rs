//! # CLI Module
//!
//! Backs the `segroute` binary, which loads a TOML route table (see
//! [`table`](crate::table)) and either prints it or runs a request through it.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! ```bash
//! segroute routes --table routes.toml
//! ```
//!
//! ### `match`
//!
//! ```bash
//! segroute match --table routes.toml --method GET --path '/users/42?verbose=1'
//! segroute match -t routes.toml -p /admin -H 'authorization: secret'
//! ```
//!
//! Both commands accept `--config FILE` (also `SEGROUTE_CONFIG`) and `--verbose`.

mod commands;


pub use commands::{execute, run_cli, Cli, Commands};

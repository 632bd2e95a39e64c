//! Declarative route tables
//!
//! A route table lists routes in TOML so a router can be assembled without code.
//! Every entry is served by an [`EchoHandler`] carrying the entry's name.
//!
//! ```toml
//! [[route]]
//! path = "/users/:id"
//! methods = ["GET", "DELETE"]
//! name = "user"
//!
//! [[route]]
//! path = "/files/*path"
//! name = "files"
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::echo::EchoHandler;
use crate::route::Route;
use crate::router::Router;

/// One declared route
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteEntry {
    pub path: String,
    /// Empty means `GET`
    #[serde(default)]
    pub methods: Vec<String>,
    /// Handler name echoed in responses; defaults to the path
    #[serde(default)]
    pub name: Option<String>,
}

impl RouteEntry {
    #[must_use]
    pub fn handler_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RouteTable {
    #[serde(default, rename = "route")]
    pub routes: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("Failed to parse route table")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read route table {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("Invalid route table {}", path.display()))
    }

    /// Register every entry, in table order
    ///
    /// Stops at the first entry the router rejects.
    pub fn register(&self, router: &Router) -> Result<Vec<Arc<Route>>> {
        let mut registered = Vec::with_capacity(self.routes.len());
        for (idx, entry) in self.routes.iter().enumerate() {
            let methods: Vec<&str> = entry.methods.iter().map(String::as_str).collect();
            let route = router
                .route(&entry.path, EchoHandler::new(entry.handler_name()), &methods)
                .with_context(|| format!("route #{} ({})", idx, entry.path))?;
            registered.push(route);
        }
        info!(routes_count = registered.len(), "Route table registered");
        Ok(registered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
        [[route]]
        path = "/users/:id"
        methods = ["get", "DELETE"]
        name = "user"

        [[route]]
        path = "/health"
    "#;

    #[test]
    fn test_parse_and_register() {
        let table = RouteTable::from_toml_str(TABLE).unwrap();
        assert_eq!(table.routes.len(), 2);
        assert_eq!(table.routes[0].handler_name(), "user");
        assert_eq!(table.routes[1].handler_name(), "/health");

        let router = Router::new();
        let routes = table.register(&router).unwrap();
        assert_eq!(routes.len(), 2);
        assert!(router.find("DELETE", "/users/1").is_found());
        assert!(router.find("GET", "/health").is_found());
    }

    #[test]
    fn test_bad_entry_reports_position() {
        let table = RouteTable::from_toml_str("[[route]]\npath = \"/a/:\"\n").unwrap();
        let err = table.register(&Router::new()).unwrap_err();
        assert!(format!("{err:#}").contains("route #0"));
    }

    #[test]
    fn test_empty_table() {
        let table = RouteTable::from_toml_str("").unwrap();
        assert!(table.routes.is_empty());
    }
}

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::handler::Handler;
use crate::pattern::ParamVec;

/// Handler that echoes the resolved request back as JSON
///
/// Used by route tables, where routes are declared without code.
#[derive(Debug, Clone)]
pub struct EchoHandler {
    name: Arc<str>,
}

impl EchoHandler {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Handler for EchoHandler {
    fn handle(&self, req: &HandlerRequest, res: &mut HandlerResponse) {
        res.status = 200;
        res.set_header("content-type", "application/json".to_string());
        res.body = json!({
            "handler": self.name.as_ref(),
            "method": req.method.as_str(),
            "path": req.path,
            "params": params_object(&req.path_params),
            "query": params_object(&req.query_params),
        });
    }
}

/// Unnamed echo handler for closures and tests
pub fn echo_handler(req: &HandlerRequest, res: &mut HandlerResponse) {
    EchoHandler::new("echo").handle(req, res);
}

// Later bindings overwrite earlier ones, matching the lookup helpers.
fn params_object(params: &ParamVec) -> Value {
    let mut map = Map::with_capacity(params.len());
    for (k, v) in params {
        map.insert(k.to_string(), Value::String(v.clone()));
    }
    Value::Object(map)
}

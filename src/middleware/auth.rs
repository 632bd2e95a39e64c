use crate::dispatcher::{HandlerRequest, HandlerResponse};

use super::{Middleware, Next};

/// Static token check against a request header.
///
/// On mismatch the chain halts with `401` and the handler never runs.
pub struct AuthMiddleware {
    header: String,
    token: String,
}

impl AuthMiddleware {
    /// Expect `token` in the `authorization` header
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_header("authorization", token)
    }

    #[must_use]
    pub fn with_header(header: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            token: token.into(),
        }
    }
}

impl Middleware for AuthMiddleware {
    fn handle(&self, req: &mut HandlerRequest, res: &mut HandlerResponse, next: Next<'_>) {
        match req.get_header(&self.header) {
            Some(value) if value == self.token => next.run(req, res),
            _ => {
                tracing::warn!(
                    request_id = %req.request_id,
                    path = %req.path,
                    header = %self.header,
                    "Authentication failed, chain halted"
                );
                *res = HandlerResponse::error(401, "Unauthorized");
            }
        }
    }

    fn name(&self) -> &str {
        "auth"
    }
}

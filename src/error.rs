use std::fmt;

/// Registration-time configuration error
///
/// Returned by [`Router::route`](crate::router::Router::route) and the
/// [`Route`](crate::route::Route) builder calls when a route cannot be
/// registered as written. These are fatal for startup: a malformed route is
/// never skipped silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// The registration path could not be compiled into a pattern
    InvalidPattern {
        /// The path as it was registered
        path: String,
        /// What was wrong with it
        reason: String,
    },
    /// A method token is not a valid HTTP method
    InvalidMethod {
        /// The offending token
        method: String,
    },
    /// A route without a handler was registered on a non catch-all path
    ///
    /// Only the match-everything pattern (`*` or `/*`) may be registered
    /// without a handler.
    MissingHandler {
        /// The path as it was registered
        path: String,
    },
    /// The route has already been prepared and can no longer be changed
    RouteFrozen {
        /// Registered path of the frozen route
        path: String,
    },
}

impl RouterError {
    pub(crate) fn invalid_pattern(path: &str, reason: impl Into<String>) -> Self {
        RouterError::InvalidPattern {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::InvalidPattern { path, reason } => {
                write!(f, "invalid route pattern '{}': {}", path, reason)
            }
            RouterError::InvalidMethod { method } => {
                write!(f, "invalid HTTP method token '{}'", method)
            }
            RouterError::MissingHandler { path } => {
                write!(
                    f,
                    "route '{}' has no handler; only the match-everything pattern may be registered without one",
                    path
                )
            }
            RouterError::RouteFrozen { path } => {
                write!(
                    f,
                    "route '{}' is already prepared for serving and can no longer be modified",
                    path
                )
            }
        }
    }
}

impl std::error::Error for RouterError {}

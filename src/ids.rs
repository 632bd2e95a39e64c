use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// ULID request identifier.
///
/// Every [`HandlerRequest`](crate::dispatcher::HandlerRequest) carries one so that
/// log lines emitted by the router, the dispatcher and middleware correlate.
/// The dispatcher adopts an inbound `x-request-id` when it parses.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(ulid::Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Parse a header value, ignoring surrounding whitespace
    #[must_use]
    pub fn from_inbound(value: &str) -> Option<Self> {
        value.trim().parse().ok()
    }

    /// Creation time encoded in the id, in milliseconds since the epoch
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s).map(Self)
    }
}

//! Request metadata supplied by whatever handles the inbound request.

use serde::{Deserialize, Serialize};

/// The parts of an inbound request worth keeping in a visit log.
///
/// All fields are best-effort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    /// HTTP method.
    pub method: Option<String>,
    /// Request path.
    pub path: Option<String>,
    /// Raw querystring, without the leading `?`.
    pub query_string: Option<String>,
    /// User-Agent header.
    pub user_agent: Option<String>,
    /// Referer header.
    pub referer: Option<String>,
    /// X-Forwarded-For header.
    pub forwarded_for: Option<String>,
    /// Peer address of the connection.
    pub remote_addr: Option<String>,
    /// Caller session key.
    pub session_key: Option<String>,
}

impl RequestMeta {
    /// Client address, preferring X-Forwarded-For over the peer address.
    ///
    /// Load balancers rewrite the peer address in transit.
    pub fn client_addr(&self) -> Option<&str> {
        self.forwarded_for
            .as_deref()
            .or(self.remote_addr.as_deref())
    }
}

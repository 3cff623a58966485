//! Visit log entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use visitors_core::types::{VisitLogId, VisitorPassId};

use super::request::RequestMeta;

/// An immutable record of one request processed under a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct VisitLog {
    /// Unique entry identifier.
    pub id: VisitLogId,
    /// The pass this request was made with.
    pub pass_id: VisitorPassId,
    /// The pass `visits_count` when the entry was written.
    pub visits_snapshot: i32,
    /// Caller session key.
    pub session_key: String,
    /// HTTP method.
    pub http_method: String,
    /// Request path.
    pub request_uri: String,
    /// Raw querystring.
    pub query_string: String,
    /// User-Agent header.
    pub user_agent: String,
    /// Referer header.
    pub referer: String,
    /// Client address, forwarded-for when available.
    pub remote_addr: String,
    /// Outcome status code.
    pub status_code: i32,
    /// When the entry was written.
    pub timestamp: DateTime<Utc>,
}

/// Data required to append a visit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateVisitLog {
    /// The pass this request was made with.
    pub pass_id: VisitorPassId,
    /// The pass `visits_count` at logging time.
    pub visits_snapshot: i32,
    /// Caller session key.
    pub session_key: String,
    /// HTTP method.
    pub http_method: String,
    /// Request path.
    pub request_uri: String,
    /// Raw querystring.
    pub query_string: String,
    /// User-Agent header.
    pub user_agent: String,
    /// Referer header.
    pub referer: String,
    /// Client address.
    pub remote_addr: String,
    /// Outcome status code.
    pub status_code: i32,
    /// Entry time.
    pub timestamp: DateTime<Utc>,
}

impl CreateVisitLog {
    /// Capture `request` against a pass whose current count is `visits_snapshot`.
    ///
    /// Missing request fields become empty strings.
    pub fn capture(
        pass_id: VisitorPassId,
        visits_snapshot: i32,
        request: &RequestMeta,
        status_code: i32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            pass_id,
            visits_snapshot,
            session_key: request.session_key.clone().unwrap_or_default(),
            http_method: request.method.clone().unwrap_or_default(),
            request_uri: request.path.clone().unwrap_or_default(),
            query_string: request.query_string.clone().unwrap_or_default(),
            user_agent: request.user_agent.clone().unwrap_or_default(),
            referer: request.referer.clone().unwrap_or_default(),
            remote_addr: request.client_addr().unwrap_or_default().to_string(),
            status_code,
            timestamp,
        }
    }

    /// Materialise the entry under a fresh id.
    pub fn into_entry(self) -> VisitLog {
        VisitLog {
            id: VisitLogId::new(),
            pass_id: self.pass_id,
            visits_snapshot: self.visits_snapshot,
            session_key: self.session_key,
            http_method: self.http_method,
            request_uri: self.request_uri,
            query_string: self.query_string,
            user_agent: self.user_agent,
            referer: self.referer,
            remote_addr: self.remote_addr,
            status_code: self.status_code,
            timestamp: self.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_defaults_to_empty_strings() {
        let pass_id = VisitorPassId::new();
        let now = Utc::now();
        let entry = CreateVisitLog::capture(pass_id, 3, &RequestMeta::default(), 200, now);

        assert_eq!(entry.pass_id, pass_id);
        assert_eq!(entry.visits_snapshot, 3);
        assert_eq!(entry.http_method, "");
        assert_eq!(entry.request_uri, "");
        assert_eq!(entry.remote_addr, "");
        assert_eq!(entry.session_key, "");
        assert_eq!(entry.status_code, 200);
        assert_eq!(entry.timestamp, now);
    }

    #[test]
    fn test_capture_copies_request() {
        let request = RequestMeta {
            method: Some("GET".into()),
            path: Some("/docs".into()),
            query_string: Some("vuid=abc".into()),
            user_agent: Some("curl/8".into()),
            referer: Some("https://example.com".into()),
            remote_addr: Some("10.0.0.1".into()),
            session_key: Some("s3ss10n".into()),
            ..Default::default()
        };
        let entry = CreateVisitLog::capture(VisitorPassId::new(), 1, &request, 403, Utc::now())
            .into_entry();

        assert_eq!(entry.http_method, "GET");
        assert_eq!(entry.request_uri, "/docs");
        assert_eq!(entry.query_string, "vuid=abc");
        assert_eq!(entry.user_agent, "curl/8");
        assert_eq!(entry.referer, "https://example.com");
        assert_eq!(entry.remote_addr, "10.0.0.1");
        assert_eq!(entry.session_key, "s3ss10n");
        assert_eq!(entry.status_code, 403);
    }
}

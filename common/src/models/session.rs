// common/src/models/session.rs
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Session id length: 4 alphabet chars, ~1.05M values.
pub const SESSION_ID_LEN: usize = 4;
/// Secret length: 16 alphabet chars, ~2^80 values.
pub const SESSION_SECRET_LEN: usize = 16;

/// A session waiting for both peers expires after 5 minutes.
pub const PENDING_TTL_MS: i64 = 5 * 60 * 1000;
/// Once both peers attach, the session lives for 24 hours.
pub const CONNECTED_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Pairing state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created, waiting for both peers.
    Pending,
    /// Both a DApp and a Mobile are attached.
    Connected,
    /// At least one peer attached and then released.
    Disconnected,
}

/// Which end of the pairing a WebSocket connection claims to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerRole {
    Dapp,
    Mobile,
}

impl PeerRole {
    /// Parse the `role` query parameter.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dapp" => Some(PeerRole::Dapp),
            "mobile" => Some(PeerRole::Mobile),
            _ => None,
        }
    }
}

impl fmt::Display for PeerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerRole::Dapp => write!(f, "dapp"),
            PeerRole::Mobile => write!(f, "mobile"),
        }
    }
}

/// Advisory DApp metadata supplied at creation and shown by the wallet.
/// The relay never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// One relay-scoped pairing between a DApp and a Mobile wallet.
///
/// Connection handles are not part of the record; the registry keeps them
/// alongside it so this type stays plain data.
#[derive(Debug, Clone)]
pub struct Session {
    /// 4-character public identifier.
    pub id: String,
    /// 16-character secret embedded in the short link; never returned by
    /// read endpoints.
    pub secret: String,
    /// Millisecond timestamps.
    pub created_at: i64,
    pub expires_at: i64,
    pub status: SessionStatus,
    /// True while a Mobile connection holds the session.
    pub mobile_locked: bool,
    /// Once set, no further attachments are permitted.
    pub terminated: bool,
    pub metadata: Option<SessionMetadata>,
}

impl Session {
    /// Create a fresh pending session with the 5-minute TTL.
    pub fn new(id: String, secret: String, metadata: Option<SessionMetadata>) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id,
            secret,
            created_at: now,
            expires_at: now + PENDING_TTL_MS,
            status: SessionStatus::Pending,
            mobile_locked: false,
            terminated: false,
            metadata,
        }
    }

    /// Whether the sweeper may remove this record.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at
    }
}

/// Response body for `POST /session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub id: String,
    /// Short link embedding the secret, for the QR code.
    pub url: String,
    pub expires_at: i64,
}

/// Response body for `GET /session/:id`. The secret is deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub status: SessionStatus,
    pub metadata: Option<SessionMetadata>,
    pub expires_at: i64,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            status: session.status,
            metadata: session.metadata.clone(),
            expires_at: session.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_pending_with_short_ttl() {
        let s = Session::new("A7X3".to_string(), "S".repeat(16), None);
        assert_eq!(s.status, SessionStatus::Pending);
        assert!(!s.mobile_locked);
        assert!(!s.terminated);
        assert_eq!(s.expires_at - s.created_at, PENDING_TTL_MS);
    }

    #[test]
    fn test_expiry_is_strictly_after_deadline() {
        let s = Session::new("A7X3".to_string(), "S".repeat(16), None);
        assert!(!s.is_expired(s.expires_at));
        assert!(s.is_expired(s.expires_at + 1));
    }

    #[test]
    fn test_session_info_omits_secret() {
        let s = Session::new("A7X3".to_string(), "SECRETSECRETSECR".to_string(), None);
        let info = SessionInfo::from(&s);
        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("SECRETSECRETSECR"));
        assert!(json.contains(r#""status":"pending""#));
        assert!(json.contains("expiresAt"));
    }

    #[test]
    fn test_metadata_requires_name_and_url() {
        assert!(serde_json::from_str::<SessionMetadata>(r#"{"name":"My DApp"}"#).is_err());
        let m: SessionMetadata =
            serde_json::from_str(r#"{"name":"My DApp","url":"https://d.example"}"#).unwrap();
        assert_eq!(m.icon, None);
    }

    #[test]
    fn test_peer_role_parse() {
        assert_eq!(PeerRole::parse("dapp"), Some(PeerRole::Dapp));
        assert_eq!(PeerRole::parse("mobile"), Some(PeerRole::Mobile));
        assert_eq!(PeerRole::parse("agent"), None);
    }
}

//! Session model: who is currently acting.

use serde::{Deserialize, Serialize};

use super::now_timestamp;

/// What a session is bound to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionKind {
    /// Fixed-credential administrator, not backed by a user record
    Administrator,
    /// A regular account
    #[serde(rename_all = "camelCase")]
    Member { user_id: String },
}

/// An established session, addressed by its bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub kind: SessionKind,
    pub created_at: String,
}

impl Session {
    pub fn administrator() -> Self {
        Self::with_kind(SessionKind::Administrator)
    }

    pub fn member(user_id: impl Into<String>) -> Self {
        Self::with_kind(SessionKind::Member {
            user_id: user_id.into(),
        })
    }

    fn with_kind(kind: SessionKind) -> Self {
        Self {
            token: uuid::Uuid::new_v4().to_string(),
            kind,
            created_at: now_timestamp(),
        }
    }

    pub fn is_administrator(&self) -> bool {
        matches!(self.kind, SessionKind::Administrator)
    }

    /// Label used in log lines.
    pub fn actor(&self) -> &str {
        match &self.kind {
            SessionKind::Administrator => "administrator",
            SessionKind::Member { user_id } => user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_value(SessionKind::Member {
            user_id: "u1".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "member");
        assert_eq!(json["userId"], "u1");

        let json = serde_json::to_value(SessionKind::Administrator).unwrap();
        assert_eq!(json["type"], "administrator");
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(Session::administrator().token, Session::administrator().token);
    }
}

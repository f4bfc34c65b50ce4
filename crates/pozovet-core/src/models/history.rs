//! Append-only user history entries.

use serde::{Deserialize, Serialize};

/// One immutable audit entry describing a change made to or for a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    /// Unique entry ID
    pub history_id: String,
    /// User the change concerns
    pub subject_id: String,
    /// User who performed the change; may differ from the subject
    pub actor_id: Option<String>,
    /// Short classifier (e.g., "order_created", "order_cancelled")
    pub kind: String,
    /// Human-readable description of the change
    pub detail: String,
    /// Creation timestamp
    pub created_at: String,
}

impl HistoryEntry {
    /// Create a new entry.
    pub fn new(subject_id: String, actor_id: Option<String>, kind: String, detail: String) -> Self {
        Self {
            history_id: uuid::Uuid::new_v4().to_string(),
            subject_id,
            actor_id,
            kind,
            detail,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry() {
        let entry = HistoryEntry::new(
            "user-1".into(),
            Some("admin-1".into()),
            "order_cancelled".into(),
            "order FAC-20250101-001 cancelled".into(),
        );
        assert_eq!(entry.subject_id, "user-1");
        assert_eq!(entry.actor_id.as_deref(), Some("admin-1"));
        assert_eq!(entry.history_id.len(), 36);
    }
}

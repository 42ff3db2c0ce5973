use std::fmt;

use serde::{Deserialize, Serialize};

/// A single approval record, keyed by its opaque token.
///
/// `created` and `expires_at` are epoch seconds. Everything except `status`
/// is immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApprovalRecord {
    pub token: String,
    pub domain: String,
    pub owner: String,
    pub created: i64,
    pub expires_at: i64,
    pub status: ApprovalStatus,
}

/// Fields supplied by the issuer. New records always start `PENDING`.
#[derive(Debug, Clone)]
pub struct NewApproval {
    pub token: String,
    pub domain: String,
    pub owner: String,
    pub created: i64,
    pub expires_at: i64,
}

/// `Pending` is the only non-terminal state: a record leaves it at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Expired,
    TriggerFailed,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "PENDING",
            ApprovalStatus::Approved => "APPROVED",
            ApprovalStatus::Expired => "EXPIRED",
            ApprovalStatus::TriggerFailed => "TRIGGER_FAILED",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_matches_stored_form() {
        assert_eq!(ApprovalStatus::Pending.to_string(), "PENDING");
        assert_eq!(ApprovalStatus::Approved.to_string(), "APPROVED");
        assert_eq!(ApprovalStatus::Expired.to_string(), "EXPIRED");
        assert_eq!(ApprovalStatus::TriggerFailed.to_string(), "TRIGGER_FAILED");
    }

    #[test]
    fn status_serializes_to_screaming_snake_case() {
        let json = serde_json::to_value(ApprovalStatus::TriggerFailed).unwrap();
        assert_eq!(json, "TRIGGER_FAILED");

        let back: ApprovalStatus = serde_json::from_value(json).unwrap();
        assert_eq!(back, ApprovalStatus::TriggerFailed);
    }
}

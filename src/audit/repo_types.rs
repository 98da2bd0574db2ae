use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Action tag recorded with every audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    LoginSuccess,
    LoginFailed,
    Logout,
    ReturnCreated,
    ReturnApproved,
    ReturnRejected,
    RefundCompleted,
}

impl AuditAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            AuditAction::LoginSuccess => "LOGIN_SUCCESS",
            AuditAction::LoginFailed => "LOGIN_FAILED",
            AuditAction::Logout => "LOGOUT",
            AuditAction::ReturnCreated => "RETURN_CREATED",
            AuditAction::ReturnApproved => "RETURN_APPROVED",
            AuditAction::ReturnRejected => "RETURN_REJECTED",
            AuditAction::RefundCompleted => "REFUND_COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOGIN_SUCCESS" => Some(AuditAction::LoginSuccess),
            "LOGIN_FAILED" => Some(AuditAction::LoginFailed),
            "LOGOUT" => Some(AuditAction::Logout),
            "RETURN_CREATED" => Some(AuditAction::ReturnCreated),
            "RETURN_APPROVED" => Some(AuditAction::ReturnApproved),
            "RETURN_REJECTED" => Some(AuditAction::ReturnRejected),
            "REFUND_COMPLETED" => Some(AuditAction::RefundCompleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of a security- or business-relevant action. Never
/// updated or deleted once written.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub action: AuditAction,
    /// User id of the acting party, or the attempted username for failed
    /// logins where no account was resolved.
    pub actor: String,
    pub details: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub target_user: Option<Uuid>,
    pub return_id: Option<Uuid>,
}

/// Entry as handed to the store; id and timestamp are assigned at write
/// time.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub action: AuditAction,
    pub actor: String,
    pub details: String,
    pub target_user: Option<Uuid>,
    pub return_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filtered, paginated audit retrieval.
#[derive(Debug, Clone)]
pub struct AuditQuery {
    pub limit: i64,
    pub skip: i64,
    pub action: Option<AuditAction>,
    pub actor: Option<String>,
    pub order: SortOrder,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            skip: 0,
            action: None,
            actor: None,
            order: SortOrder::Desc,
        }
    }
}

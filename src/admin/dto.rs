use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::repo_types::{AuditAction, AuditQuery, SortOrder};

/// Query params for the audit-log endpoint.
#[derive(Debug, Deserialize)]
pub struct AuditLogParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub skip: i64,
    pub action: Option<AuditAction>,
    pub actor: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
}

fn default_limit() -> i64 {
    50
}

impl From<AuditLogParams> for AuditQuery {
    fn from(p: AuditLogParams) -> Self {
        Self {
            limit: p.limit,
            skip: p.skip,
            action: p.action,
            actor: p.actor,
            order: p.order,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivityParams {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct SuspiciousParams {
    #[serde(default = "default_threshold")]
    pub threshold: i64,
}

fn default_threshold() -> i64 {
    5
}

/// Point-in-time system counters. Recomputed on every call.
#[derive(Debug, Serialize)]
pub struct SystemStats {
    pub total_users: i64,
    pub total_returns: i64,
    pub pending_returns: i64,
    pub approved_returns: i64,
    pub rejected_returns: i64,
    pub returns_last_24h: i64,
    pub logins_last_24h: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    High,
    Medium,
}

/// A user whose recent return volume crossed the reporting threshold.
#[derive(Debug, Serialize)]
pub struct SuspiciousUser {
    pub user_id: Uuid,
    pub username: String,
    pub name: String,
    pub return_count: i64,
    pub unique_orders: i64,
    pub risk_level: RiskLevel,
}

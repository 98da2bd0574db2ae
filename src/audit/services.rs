use std::collections::HashMap;

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::{error, info};
use uuid::Uuid;

use crate::audit::repo_types::{AuditAction, NewAuditEntry};
use crate::error::AppError;
use crate::state::AppState;

/// Flag thresholds for the activity summary. Fixed, not configurable.
const HIGH_RETURN_VOLUME: i64 = 10;
const FAILED_LOGIN_LIMIT: i64 = 5;

/// Append an audit entry. Best-effort: a failed write is reported to
/// operators through the error log and never propagated, so the business
/// mutation that triggered it stands.
pub async fn record(
    state: &AppState,
    action: AuditAction,
    actor: impl Into<String>,
    details: impl Into<String>,
    target_user: Option<Uuid>,
    return_id: Option<Uuid>,
) {
    let entry = NewAuditEntry {
        action,
        actor: actor.into(),
        details: details.into(),
        target_user,
        return_id,
    };
    match state.audit.append(entry).await {
        Ok(entry) => info!(action = %entry.action, actor = %entry.actor, "audit"),
        Err(e) => error!(error = %e, action = %action, "failed to append audit entry"),
    }
}

/// Per-user activity report over a trailing window.
#[derive(Debug, Serialize)]
pub struct ActivitySummary {
    pub user_id: Uuid,
    pub period_days: i64,
    pub activity_summary: HashMap<AuditAction, i64>,
    /// Return requests the user created inside the window, from the
    /// return store rather than the audit trail.
    pub returns_in_window: i64,
    pub flags: Vec<String>,
    pub is_suspicious: bool,
}

pub async fn activity_summary(
    state: &AppState,
    user_id: Uuid,
    days: i64,
) -> Result<ActivitySummary, AppError> {
    let since = OffsetDateTime::now_utc() - Duration::days(days);
    let counts = state
        .audit
        .aggregate_by_actor(&user_id.to_string(), since)
        .await?;
    let returns_in_window = state.returns.count_recent(user_id, since).await?;
    let flags = activity_flags(&counts, days);
    let is_suspicious = !flags.is_empty();
    Ok(ActivitySummary {
        user_id,
        period_days: days,
        activity_summary: counts,
        returns_in_window,
        flags,
        is_suspicious,
    })
}

/// Heuristic flags over aggregated action counts. Strictly above the
/// threshold flags; exactly at it does not.
fn activity_flags(counts: &HashMap<AuditAction, i64>, days: i64) -> Vec<String> {
    let mut flags = Vec::new();

    let created = counts
        .get(&AuditAction::ReturnCreated)
        .copied()
        .unwrap_or(0);
    if created > HIGH_RETURN_VOLUME {
        flags.push(format!("High return volume: {created} returns in {days} days"));
    }

    let failed = counts.get(&AuditAction::LoginFailed).copied().unwrap_or(0);
    if failed > FAILED_LOGIN_LIMIT {
        flags.push(format!("Multiple failed logins: {failed} attempts"));
    }

    flags
}

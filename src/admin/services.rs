use time::{Duration, OffsetDateTime};

use crate::admin::dto::{RiskLevel, SuspiciousUser, SystemStats};
use crate::audit::repo_types::AuditAction;
use crate::error::AppError;
use crate::returns::repo_types::ReturnStatus;
use crate::state::AppState;

/// Return volume above which a flagged user is classified HIGH risk.
const HIGH_RISK_VOLUME: i64 = 10;
/// Trailing window for the suspicious-user scan.
const SUSPICIOUS_WINDOW_DAYS: i64 = 30;

pub async fn system_stats(state: &AppState) -> Result<SystemStats, AppError> {
    let yesterday = OffsetDateTime::now_utc() - Duration::hours(24);
    Ok(SystemStats {
        total_users: state.users.count_users().await?,
        total_returns: state.returns.count_returns().await?,
        pending_returns: state.returns.count_by_status(ReturnStatus::Pending).await?,
        approved_returns: state.returns.count_by_status(ReturnStatus::Approved).await?,
        rejected_returns: state.returns.count_by_status(ReturnStatus::Rejected).await?,
        returns_last_24h: state.returns.count_created_since(yesterday).await?,
        logins_last_24h: state
            .audit
            .count_action_since(AuditAction::LoginSuccess, yesterday)
            .await?,
    })
}

pub async fn suspicious_users(
    state: &AppState,
    threshold: i64,
) -> Result<Vec<SuspiciousUser>, AppError> {
    let since = OffsetDateTime::now_utc() - Duration::days(SUSPICIOUS_WINDOW_DAYS);
    let volumes = state.returns.return_volume_since(since, threshold).await?;

    let mut flagged = Vec::with_capacity(volumes.len());
    for volume in volumes {
        // A volume row without a matching identity record is dropped, not
        // an error.
        let Some(user) = state.users.find_by_id(volume.user_id).await? else {
            continue;
        };
        flagged.push(SuspiciousUser {
            user_id: volume.user_id,
            username: user.username,
            name: user.name,
            return_count: volume.return_count,
            unique_orders: volume.unique_orders,
            risk_level: risk_level(volume.return_count),
        });
    }
    Ok(flagged)
}

fn risk_level(return_count: i64) -> RiskLevel {
    if return_count > HIGH_RISK_VOLUME {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    }
}

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::admin::dto::{
    ActivityParams, AuditLogParams, SuspiciousParams, SuspiciousUser, SystemStats,
};
use crate::admin::services;
use crate::audit::repo_types::AuditEntry;
use crate::audit::services::{activity_summary, ActivitySummary};
use crate::auth::extractors::AdminUser;
use crate::error::AppError;
use crate::state::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/audit-logs", get(audit_logs))
        .route("/admin/stats", get(stats))
        .route("/admin/suspicious-users", get(suspicious))
        .route("/admin/user-activity/:user_id", get(user_activity))
}

#[instrument(skip(state))]
async fn audit_logs(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(params): Query<AuditLogParams>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    Ok(Json(state.audit.query(&params.into()).await?))
}

#[instrument(skip(state))]
async fn stats(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<SystemStats>, AppError> {
    Ok(Json(services::system_stats(&state).await?))
}

#[instrument(skip(state))]
async fn suspicious(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(params): Query<SuspiciousParams>,
) -> Result<Json<Vec<SuspiciousUser>>, AppError> {
    Ok(Json(services::suspicious_users(&state, params.threshold).await?))
}

#[instrument(skip(state))]
async fn user_activity(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(user_id): Path<Uuid>,
    Query(params): Query<ActivityParams>,
) -> Result<Json<ActivitySummary>, AppError> {
    Ok(Json(activity_summary(&state, user_id, params.days).await?))
}

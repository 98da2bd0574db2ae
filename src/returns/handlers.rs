use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::extractors::{AdminUser, AuthUser};
use crate::error::AppError;
use crate::returns::dto::CreateReturnRequest;
use crate::returns::repo_types::ReturnRequest;
use crate::returns::services;
use crate::state::AppState;

pub fn return_routes() -> Router<AppState> {
    Router::new()
        .route("/returns", post(submit))
        .route("/returns/my", get(my_returns))
        .route("/returns/all", get(all_returns))
        .route("/returns/:id/approve", put(approve))
        .route("/returns/:id/reject", put(reject))
        .route("/returns/:id/refund", put(refund))
}

#[instrument(skip(state, payload))]
async fn submit(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<CreateReturnRequest>,
) -> Result<(StatusCode, Json<ReturnRequest>), AppError> {
    let created = services::submit_return(&state, claims.sub, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state))]
async fn my_returns(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<ReturnRequest>>, AppError> {
    Ok(Json(state.returns.list_by_user(claims.sub).await?))
}

#[instrument(skip(state))]
async fn all_returns(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<ReturnRequest>>, AppError> {
    Ok(Json(state.returns.list_all().await?))
}

#[instrument(skip(state))]
async fn approve(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReturnRequest>, AppError> {
    let updated = services::approve_return(&state, claims.sub, id).await?;
    Ok(Json(updated))
}

#[instrument(skip(state))]
async fn reject(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReturnRequest>, AppError> {
    let updated = services::reject_return(&state, claims.sub, id).await?;
    Ok(Json(updated))
}

#[instrument(skip(state))]
async fn refund(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReturnRequest>, AppError> {
    let updated = services::complete_refund(&state, claims.sub, id).await?;
    Ok(Json(updated))
}

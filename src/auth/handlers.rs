use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::audit;
use crate::audit::repo_types::AuditAction;
use crate::auth::{
    dto::{AuthResponse, LoginRequest, MessageResponse, PublicUser, RefreshRequest},
    extractors::AuthUser,
    jwt::JwtKeys,
    password::verify_password,
};
use crate::error::AppError;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(me))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let username = payload.username.trim().to_string();

    let Some(user) = state.users.find_by_username(&username).await? else {
        warn!(%username, "login unknown username");
        audit::record(
            &state,
            AuditAction::LoginFailed,
            username.clone(),
            format!("Failed login attempt for username: {username}"),
            None,
            None,
        )
        .await;
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        audit::record(
            &state,
            AuditAction::LoginFailed,
            username.clone(),
            format!("Failed login attempt for username: {username}"),
            None,
            None,
        )
        .await;
        return Err(AppError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(&user)?;
    let refresh_token = keys.sign_refresh(&user)?;

    audit::record(
        &state,
        AuditAction::LoginSuccess,
        user.id.to_string(),
        format!("User {} logged in successfully", user.username),
        None,
        None,
    )
    .await;
    info!(user_id = %user.id, username = %user.username, "user logged in");

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    audit::record(
        &state,
        AuditAction::Logout,
        claims.sub.to_string(),
        format!("User {} logged out", claims.username),
        None,
        None,
    )
    .await;
    info!(user_id = %claims.sub, "user logged out");
    Ok(Json(MessageResponse {
        message: "Logged out successfully".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token"))?;

    // Re-read the user so a new pair reflects current identity data.
    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or(AppError::Unauthorized("User not found"))?;

    let access_token = keys.sign_access(&user)?;
    let refresh_token = keys.sign_refresh(&user)?;
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or(AppError::Unauthorized("User not found"))?;
    Ok(Json(PublicUser::from(&user)))
}

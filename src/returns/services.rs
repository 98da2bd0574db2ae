use tracing::info;
use uuid::Uuid;

use crate::audit;
use crate::audit::repo_types::AuditAction;
use crate::error::AppError;
use crate::returns::dto::CreateReturnRequest;
use crate::returns::repo_types::{NewReturn, ReturnRequest};
use crate::state::AppState;

/// Minimum length for a return reason.
const MIN_REASON_LEN: usize = 10;

pub async fn submit_return(
    state: &AppState,
    user_id: Uuid,
    payload: CreateReturnRequest,
) -> Result<ReturnRequest, AppError> {
    let order_id = payload.order_id.trim();
    if order_id.is_empty() {
        return Err(AppError::Validation("Order ID is required"));
    }
    if payload.reason.is_empty() {
        return Err(AppError::Validation("Return reason is required"));
    }
    if payload.reason.chars().count() < MIN_REASON_LEN {
        return Err(AppError::Validation("Reason must be at least 10 characters"));
    }

    let created = state
        .returns
        .insert_return(NewReturn {
            user_id,
            order_id: order_id.to_string(),
            reason: payload.reason,
        })
        .await?;

    audit::record(
        state,
        AuditAction::ReturnCreated,
        user_id.to_string(),
        format!("Return created for order {}", created.order_id),
        None,
        Some(created.id),
    )
    .await;
    info!(return_id = %created.id, %user_id, order_id = %created.order_id, "return submitted");
    Ok(created)
}

pub async fn approve_return(
    state: &AppState,
    admin_id: Uuid,
    return_id: Uuid,
) -> Result<ReturnRequest, AppError> {
    match state.returns.approve_return(return_id).await? {
        Some(updated) => {
            audit::record(
                state,
                AuditAction::ReturnApproved,
                admin_id.to_string(),
                format!(
                    "Approved return request {} for order {}",
                    updated.id, updated.order_id
                ),
                Some(updated.user_id),
                Some(updated.id),
            )
            .await;
            info!(return_id = %updated.id, %admin_id, "return approved, refund initiated");
            Ok(updated)
        }
        None => Err(decision_error(state, return_id).await),
    }
}

pub async fn reject_return(
    state: &AppState,
    admin_id: Uuid,
    return_id: Uuid,
) -> Result<ReturnRequest, AppError> {
    match state.returns.reject_return(return_id).await? {
        Some(updated) => {
            audit::record(
                state,
                AuditAction::ReturnRejected,
                admin_id.to_string(),
                format!(
                    "Rejected return request {} for order {}",
                    updated.id, updated.order_id
                ),
                Some(updated.user_id),
                Some(updated.id),
            )
            .await;
            info!(return_id = %updated.id, %admin_id, "return rejected");
            Ok(updated)
        }
        None => Err(decision_error(state, return_id).await),
    }
}

pub async fn complete_refund(
    state: &AppState,
    admin_id: Uuid,
    return_id: Uuid,
) -> Result<ReturnRequest, AppError> {
    match state.returns.complete_refund(return_id).await? {
        Some(updated) => {
            audit::record(
                state,
                AuditAction::RefundCompleted,
                admin_id.to_string(),
                "Refund completed",
                Some(updated.user_id),
                Some(updated.id),
            )
            .await;
            info!(return_id = %updated.id, %admin_id, "refund completed");
            Ok(updated)
        }
        None => Err(decision_error(state, return_id).await),
    }
}

/// A compare-and-set miss is either a missing request or one past the
/// state the operation expects.
async fn decision_error(state: &AppState, return_id: Uuid) -> AppError {
    match state.returns.get_return(return_id).await {
        Ok(Some(_)) => AppError::InvalidTransition,
        Ok(None) => AppError::NotFound("Return request"),
        Err(e) => e,
    }
}

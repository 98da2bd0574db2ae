//! Storage seam. The service layer only sees these traits; `AppState`
//! carries them as trait objects built once at process start.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::audit::repo_types::{AuditAction, AuditEntry, AuditQuery, NewAuditEntry};
use crate::auth::repo_types::{NewUser, User};
use crate::error::AppError;
use crate::returns::repo_types::{NewReturn, ReturnRequest, ReturnStatus, ReturnVolume};

#[cfg(test)]
mod memory;
mod postgres;

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Identity store: read-mostly lookups plus seeding inserts.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn insert_user(&self, new: NewUser) -> Result<User, AppError>;
    async fn count_users(&self) -> Result<i64, AppError>;
}

/// Return requests and their state transitions.
#[async_trait]
pub trait ReturnStore: Send + Sync {
    /// Duplicate-guarded insert: fails with [`AppError::DuplicateRequest`]
    /// when a Pending or Approved request already exists for the same
    /// (user, order) pair. Check and insert are atomic at this layer.
    async fn insert_return(&self, new: NewReturn) -> Result<ReturnRequest, AppError>;

    async fn get_return(&self, id: Uuid) -> Result<Option<ReturnRequest>, AppError>;

    /// Pending → Approved, refund initiated, in one compare-and-set.
    /// `None` when no request currently satisfies the precondition; the
    /// caller distinguishes "missing" from "already decided".
    async fn approve_return(&self, id: Uuid) -> Result<Option<ReturnRequest>, AppError>;

    /// Pending → Rejected, refund marked rejected. CAS as above.
    async fn reject_return(&self, id: Uuid) -> Result<Option<ReturnRequest>, AppError>;

    /// Approved + Refund Initiated → Refund Successful. CAS as above.
    async fn complete_refund(&self, id: Uuid) -> Result<Option<ReturnRequest>, AppError>;

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<ReturnRequest>, AppError>;
    async fn list_all(&self) -> Result<Vec<ReturnRequest>, AppError>;

    async fn count_recent(&self, user_id: Uuid, since: OffsetDateTime)
        -> Result<i64, AppError>;
    async fn count_returns(&self) -> Result<i64, AppError>;
    async fn count_by_status(&self, status: ReturnStatus) -> Result<i64, AppError>;
    async fn count_created_since(&self, since: OffsetDateTime) -> Result<i64, AppError>;

    /// Per-user volume since `since`, keeping users with at least
    /// `min_count` requests, ordered by count descending.
    async fn return_volume_since(
        &self,
        since: OffsetDateTime,
        min_count: i64,
    ) -> Result<Vec<ReturnVolume>, AppError>;
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, AppError>;
    async fn query(&self, q: &AuditQuery) -> Result<Vec<AuditEntry>, AppError>;
    async fn aggregate_by_actor(
        &self,
        actor: &str,
        since: OffsetDateTime,
    ) -> Result<HashMap<AuditAction, i64>, AppError>;
    async fn count_action_since(
        &self,
        action: AuditAction,
        since: OffsetDateTime,
    ) -> Result<i64, AppError>;
}

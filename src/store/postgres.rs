use std::collections::HashMap;

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::audit::repo_types::{AuditAction, AuditEntry, AuditQuery, NewAuditEntry, SortOrder};
use crate::auth::repo_types::{NewUser, Role, User};
use crate::error::AppError;
use crate::returns::repo_types::{
    NewReturn, RefundStatus, ReturnRequest, ReturnStatus, ReturnVolume,
};
use crate::store::{AuditStore, ReturnStore, UserStore};

/// PostgreSQL-backed store for all three collections.
pub struct PgStore {
    pool: PgPool,
}

/// Bootstrap DDL, applied at startup. Idempotent. The partial unique index
/// enforces the one-active-request-per-(user, order) invariant at the
/// storage layer, so concurrent submits cannot race past the guard.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        role TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS returns (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        order_id TEXT NOT NULL,
        reason TEXT NOT NULL,
        status TEXT NOT NULL,
        refund_status TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        approved_at TIMESTAMPTZ,
        refunded_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS returns_active_per_order
        ON returns (user_id, order_id)
        WHERE status IN ('Pending', 'Approved')
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS audit_logs (
        id UUID PRIMARY KEY,
        action TEXT NOT NULL,
        actor TEXT NOT NULL,
        details TEXT NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL,
        target_user UUID,
        return_id UUID
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS audit_logs_actor_timestamp
        ON audit_logs (actor, timestamp)
    "#,
];

const RETURN_COLUMNS: &str = "id, user_id, order_id, reason, status, refund_status, \
     created_at, updated_at, approved_at, refunded_at";

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    name: String,
    email: String,
    role: String,
    created_at: OffsetDateTime,
}

impl UserRow {
    fn into_user(self) -> Result<User, AppError> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| AppError::Internal(anyhow!("unknown role: {}", self.role)))?;
        Ok(User {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            name: self.name,
            email: self.email,
            role,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReturnRow {
    id: Uuid,
    user_id: Uuid,
    order_id: String,
    reason: String,
    status: String,
    refund_status: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    approved_at: Option<OffsetDateTime>,
    refunded_at: Option<OffsetDateTime>,
}

impl ReturnRow {
    fn into_return(self) -> Result<ReturnRequest, AppError> {
        let status = ReturnStatus::parse(&self.status)
            .ok_or_else(|| AppError::Internal(anyhow!("unknown return status: {}", self.status)))?;
        let refund_status = RefundStatus::parse(&self.refund_status).ok_or_else(|| {
            AppError::Internal(anyhow!("unknown refund status: {}", self.refund_status))
        })?;
        Ok(ReturnRequest {
            id: self.id,
            user_id: self.user_id,
            order_id: self.order_id,
            reason: self.reason,
            status,
            refund_status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            approved_at: self.approved_at,
            refunded_at: self.refunded_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    action: String,
    actor: String,
    details: String,
    timestamp: OffsetDateTime,
    target_user: Option<Uuid>,
    return_id: Option<Uuid>,
}

impl AuditRow {
    fn into_entry(self) -> Result<AuditEntry, AppError> {
        let action = AuditAction::parse(&self.action)
            .ok_or_else(|| AppError::Internal(anyhow!("unknown audit action: {}", self.action)))?;
        Ok(AuditEntry {
            id: self.id,
            action,
            actor: self.actor,
            details: self.details,
            timestamp: self.timestamp,
            target_user: self.target_user,
            return_id: self.return_id,
        })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password_hash, name, email, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password_hash, name, email, role, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.map(UserRow::into_user).transpose()
    }

    async fn insert_user(&self, new: NewUser) -> Result<User, AppError> {
        let res = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, username, password_hash, name, email, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, username, password_hash, name, email, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.username)
        .bind(&new.password_hash)
        .bind(&new.name)
        .bind(&new.email)
        .bind(new.role.as_str())
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&self.pool)
        .await;
        match res {
            Ok(row) => row.into_user(),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(AppError::Validation("Username already taken"))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn count_users(&self) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl ReturnStore for PgStore {
    async fn insert_return(&self, new: NewReturn) -> Result<ReturnRequest, AppError> {
        let now = OffsetDateTime::now_utc();
        let res = sqlx::query_as::<_, ReturnRow>(&format!(
            r#"
            INSERT INTO returns (id, user_id, order_id, reason, status, refund_status,
                                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {RETURN_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(&new.order_id)
        .bind(&new.reason)
        .bind(ReturnStatus::Pending.as_str())
        .bind(RefundStatus::NotInitiated.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await;
        match res {
            Ok(row) => row.into_return(),
            // The partial unique index turned a concurrent duplicate into
            // a constraint violation.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(AppError::DuplicateRequest { order_id: new.order_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_return(&self, id: Uuid) -> Result<Option<ReturnRequest>, AppError> {
        let row = sqlx::query_as::<_, ReturnRow>(&format!(
            "SELECT {RETURN_COLUMNS} FROM returns WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ReturnRow::into_return).transpose()
    }

    async fn approve_return(&self, id: Uuid) -> Result<Option<ReturnRequest>, AppError> {
        let now = OffsetDateTime::now_utc();
        let row = sqlx::query_as::<_, ReturnRow>(&format!(
            r#"
            UPDATE returns
            SET status = $2, refund_status = $3, approved_at = $4, updated_at = $4
            WHERE id = $1 AND status = $5
            RETURNING {RETURN_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(ReturnStatus::Approved.as_str())
        .bind(RefundStatus::RefundInitiated.as_str())
        .bind(now)
        .bind(ReturnStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(ReturnRow::into_return).transpose()
    }

    async fn reject_return(&self, id: Uuid) -> Result<Option<ReturnRequest>, AppError> {
        let now = OffsetDateTime::now_utc();
        let row = sqlx::query_as::<_, ReturnRow>(&format!(
            r#"
            UPDATE returns
            SET status = $2, refund_status = $3, updated_at = $4
            WHERE id = $1 AND status = $5
            RETURNING {RETURN_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(ReturnStatus::Rejected.as_str())
        .bind(RefundStatus::Rejected.as_str())
        .bind(now)
        .bind(ReturnStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(ReturnRow::into_return).transpose()
    }

    async fn complete_refund(&self, id: Uuid) -> Result<Option<ReturnRequest>, AppError> {
        let now = OffsetDateTime::now_utc();
        let row = sqlx::query_as::<_, ReturnRow>(&format!(
            r#"
            UPDATE returns
            SET refund_status = $2, refunded_at = $3, updated_at = $3
            WHERE id = $1 AND status = $4 AND refund_status = $5
            RETURNING {RETURN_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(RefundStatus::RefundSuccessful.as_str())
        .bind(now)
        .bind(ReturnStatus::Approved.as_str())
        .bind(RefundStatus::RefundInitiated.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(ReturnRow::into_return).transpose()
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<ReturnRequest>, AppError> {
        let rows = sqlx::query_as::<_, ReturnRow>(&format!(
            r#"
            SELECT {RETURN_COLUMNS}
            FROM returns
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ReturnRow::into_return).collect()
    }

    async fn list_all(&self) -> Result<Vec<ReturnRequest>, AppError> {
        let rows = sqlx::query_as::<_, ReturnRow>(&format!(
            "SELECT {RETURN_COLUMNS} FROM returns ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ReturnRow::into_return).collect()
    }

    async fn count_recent(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
    ) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM returns WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_returns(&self) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM returns")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_by_status(&self, status: ReturnStatus) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM returns WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_created_since(&self, since: OffsetDateTime) -> Result<i64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM returns WHERE created_at >= $1")
                .bind(since)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn return_volume_since(
        &self,
        since: OffsetDateTime,
        min_count: i64,
    ) -> Result<Vec<ReturnVolume>, AppError> {
        let rows: Vec<(Uuid, i64, i64)> = sqlx::query_as(
            r#"
            SELECT user_id, COUNT(*) AS return_count, COUNT(DISTINCT order_id) AS unique_orders
            FROM returns
            WHERE created_at >= $1
            GROUP BY user_id
            HAVING COUNT(*) >= $2
            ORDER BY return_count DESC
            "#,
        )
        .bind(since)
        .bind(min_count)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(user_id, return_count, unique_orders)| ReturnVolume {
                user_id,
                return_count,
                unique_orders,
            })
            .collect())
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, AppError> {
        let row = sqlx::query_as::<_, AuditRow>(
            r#"
            INSERT INTO audit_logs (id, action, actor, details, timestamp, target_user, return_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, action, actor, details, timestamp, target_user, return_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.action.as_str())
        .bind(&entry.actor)
        .bind(&entry.details)
        .bind(OffsetDateTime::now_utc())
        .bind(entry.target_user)
        .bind(entry.return_id)
        .fetch_one(&self.pool)
        .await?;
        row.into_entry()
    }

    async fn query(&self, q: &AuditQuery) -> Result<Vec<AuditEntry>, AppError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, action, actor, details, timestamp, target_user, return_id FROM audit_logs",
        );
        let mut has_where = false;
        if let Some(action) = q.action {
            builder.push(" WHERE action = ");
            builder.push_bind(action.as_str());
            has_where = true;
        }
        if let Some(actor) = &q.actor {
            builder.push(if has_where { " AND " } else { " WHERE " });
            builder.push("actor = ");
            builder.push_bind(actor.clone());
        }
        builder.push(match q.order {
            SortOrder::Asc => " ORDER BY timestamp ASC",
            SortOrder::Desc => " ORDER BY timestamp DESC",
        });
        builder.push(" LIMIT ");
        builder.push_bind(q.limit);
        builder.push(" OFFSET ");
        builder.push_bind(q.skip);

        let rows: Vec<AuditRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(AuditRow::into_entry).collect()
    }

    async fn aggregate_by_actor(
        &self,
        actor: &str,
        since: OffsetDateTime,
    ) -> Result<HashMap<AuditAction, i64>, AppError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT action, COUNT(*)
            FROM audit_logs
            WHERE actor = $1 AND timestamp >= $2
            GROUP BY action
            "#,
        )
        .bind(actor)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        let mut summary = HashMap::with_capacity(rows.len());
        for (action, count) in rows {
            let action = AuditAction::parse(&action)
                .ok_or_else(|| AppError::Internal(anyhow!("unknown audit action: {action}")))?;
            summary.insert(action, count);
        }
        Ok(summary)
    }

    async fn count_action_since(
        &self,
        action: AuditAction,
        since: OffsetDateTime,
    ) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM audit_logs WHERE action = $1 AND timestamp >= $2",
        )
        .bind(action.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

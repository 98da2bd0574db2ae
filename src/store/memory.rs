//! In-process store used by the test suites. Same contract as the
//! PostgreSQL store, including the atomic duplicate guard: the duplicate
//! check and the insert happen under a single write lock.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::audit::repo_types::{AuditAction, AuditEntry, AuditQuery, NewAuditEntry, SortOrder};
use crate::auth::repo_types::{NewUser, User};
use crate::error::AppError;
use crate::returns::repo_types::{
    NewReturn, RefundStatus, ReturnRequest, ReturnStatus, ReturnVolume,
};
use crate::store::{AuditStore, ReturnStore, UserStore};

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    returns: RwLock<Vec<ReturnRequest>>,
    audit: RwLock<Vec<AuditEntry>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(read(&self.users).iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(read(&self.users)
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_user(&self, new: NewUser) -> Result<User, AppError> {
        let mut users = write(&self.users);
        if users.iter().any(|u| u.username == new.username) {
            return Err(AppError::Validation("Username already taken"));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            password_hash: new.password_hash,
            name: new.name,
            email: new.email,
            role: new.role,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn count_users(&self) -> Result<i64, AppError> {
        Ok(read(&self.users).len() as i64)
    }
}

#[async_trait]
impl ReturnStore for MemoryStore {
    async fn insert_return(&self, new: NewReturn) -> Result<ReturnRequest, AppError> {
        let mut returns = write(&self.returns);
        let clash = returns.iter().any(|r| {
            r.user_id == new.user_id
                && r.order_id == new.order_id
                && matches!(r.status, ReturnStatus::Pending | ReturnStatus::Approved)
        });
        if clash {
            return Err(AppError::DuplicateRequest { order_id: new.order_id });
        }
        let now = OffsetDateTime::now_utc();
        let created = ReturnRequest {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            order_id: new.order_id,
            reason: new.reason,
            status: ReturnStatus::Pending,
            refund_status: RefundStatus::NotInitiated,
            created_at: now,
            updated_at: now,
            approved_at: None,
            refunded_at: None,
        };
        returns.push(created.clone());
        Ok(created)
    }

    async fn get_return(&self, id: Uuid) -> Result<Option<ReturnRequest>, AppError> {
        Ok(read(&self.returns).iter().find(|r| r.id == id).cloned())
    }

    async fn approve_return(&self, id: Uuid) -> Result<Option<ReturnRequest>, AppError> {
        let mut returns = write(&self.returns);
        let Some(r) = returns
            .iter_mut()
            .find(|r| r.id == id && r.status == ReturnStatus::Pending)
        else {
            return Ok(None);
        };
        let now = OffsetDateTime::now_utc();
        r.status = ReturnStatus::Approved;
        r.refund_status = RefundStatus::RefundInitiated;
        r.approved_at = Some(now);
        r.updated_at = now;
        Ok(Some(r.clone()))
    }

    async fn reject_return(&self, id: Uuid) -> Result<Option<ReturnRequest>, AppError> {
        let mut returns = write(&self.returns);
        let Some(r) = returns
            .iter_mut()
            .find(|r| r.id == id && r.status == ReturnStatus::Pending)
        else {
            return Ok(None);
        };
        let now = OffsetDateTime::now_utc();
        r.status = ReturnStatus::Rejected;
        r.refund_status = RefundStatus::Rejected;
        r.updated_at = now;
        Ok(Some(r.clone()))
    }

    async fn complete_refund(&self, id: Uuid) -> Result<Option<ReturnRequest>, AppError> {
        let mut returns = write(&self.returns);
        let Some(r) = returns.iter_mut().find(|r| {
            r.id == id
                && r.status == ReturnStatus::Approved
                && r.refund_status == RefundStatus::RefundInitiated
        }) else {
            return Ok(None);
        };
        let now = OffsetDateTime::now_utc();
        r.refund_status = RefundStatus::RefundSuccessful;
        r.refunded_at = Some(now);
        r.updated_at = now;
        Ok(Some(r.clone()))
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<ReturnRequest>, AppError> {
        let mut out: Vec<ReturnRequest> = read(&self.returns)
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn list_all(&self) -> Result<Vec<ReturnRequest>, AppError> {
        let mut out: Vec<ReturnRequest> = read(&self.returns).iter().cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn count_recent(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
    ) -> Result<i64, AppError> {
        Ok(read(&self.returns)
            .iter()
            .filter(|r| r.user_id == user_id && r.created_at >= since)
            .count() as i64)
    }

    async fn count_returns(&self) -> Result<i64, AppError> {
        Ok(read(&self.returns).len() as i64)
    }

    async fn count_by_status(&self, status: ReturnStatus) -> Result<i64, AppError> {
        Ok(read(&self.returns)
            .iter()
            .filter(|r| r.status == status)
            .count() as i64)
    }

    async fn count_created_since(&self, since: OffsetDateTime) -> Result<i64, AppError> {
        Ok(read(&self.returns)
            .iter()
            .filter(|r| r.created_at >= since)
            .count() as i64)
    }

    async fn return_volume_since(
        &self,
        since: OffsetDateTime,
        min_count: i64,
    ) -> Result<Vec<ReturnVolume>, AppError> {
        let returns = read(&self.returns);
        let mut grouped: HashMap<Uuid, (i64, HashSet<String>)> = HashMap::new();
        for r in returns.iter().filter(|r| r.created_at >= since) {
            let entry = grouped.entry(r.user_id).or_default();
            entry.0 += 1;
            entry.1.insert(r.order_id.clone());
        }
        let mut out: Vec<ReturnVolume> = grouped
            .into_iter()
            .filter(|(_, (count, _))| *count >= min_count)
            .map(|(user_id, (return_count, orders))| ReturnVolume {
                user_id,
                return_count,
                unique_orders: orders.len() as i64,
            })
            .collect();
        out.sort_by(|a, b| b.return_count.cmp(&a.return_count));
        Ok(out)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, AppError> {
        let appended = AuditEntry {
            id: Uuid::new_v4(),
            action: entry.action,
            actor: entry.actor,
            details: entry.details,
            timestamp: OffsetDateTime::now_utc(),
            target_user: entry.target_user,
            return_id: entry.return_id,
        };
        write(&self.audit).push(appended.clone());
        Ok(appended)
    }

    async fn query(&self, q: &AuditQuery) -> Result<Vec<AuditEntry>, AppError> {
        let mut entries: Vec<AuditEntry> = read(&self.audit)
            .iter()
            .filter(|e| q.action.map_or(true, |a| e.action == a))
            .filter(|e| q.actor.as_ref().map_or(true, |a| &e.actor == a))
            .cloned()
            .collect();
        match q.order {
            SortOrder::Asc => entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
            SortOrder::Desc => entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        }
        Ok(entries
            .into_iter()
            .skip(q.skip.max(0) as usize)
            .take(q.limit.max(0) as usize)
            .collect())
    }

    async fn aggregate_by_actor(
        &self,
        actor: &str,
        since: OffsetDateTime,
    ) -> Result<HashMap<AuditAction, i64>, AppError> {
        let mut summary = HashMap::new();
        for e in read(&self.audit)
            .iter()
            .filter(|e| e.actor == actor && e.timestamp >= since)
        {
            *summary.entry(e.action).or_insert(0) += 1;
        }
        Ok(summary)
    }

    async fn count_action_since(
        &self,
        action: AuditAction,
        since: OffsetDateTime,
    ) -> Result<i64, AppError> {
        Ok(read(&self.audit)
            .iter()
            .filter(|e| e.action == action && e.timestamp >= since)
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn append_tagged(store: &MemoryStore, action: AuditAction, actor: &str) -> AuditEntry {
        // Spacing out appends keeps timestamp ordering unambiguous.
        tokio::time::sleep(Duration::from_millis(2)).await;
        store
            .append(NewAuditEntry {
                action,
                actor: actor.to_string(),
                details: String::new(),
                target_user: None,
                return_id: None,
            })
            .await
            .expect("append")
    }

    #[tokio::test]
    async fn query_orders_by_timestamp() {
        let store = MemoryStore::new();
        let first = append_tagged(&store, AuditAction::LoginSuccess, "a").await;
        let second = append_tagged(&store, AuditAction::ReturnCreated, "a").await;
        let third = append_tagged(&store, AuditAction::Logout, "a").await;

        let desc = store.query(&AuditQuery::default()).await.expect("query");
        assert_eq!(
            desc.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![third.id, second.id, first.id]
        );

        let asc = store
            .query(&AuditQuery { order: SortOrder::Asc, ..AuditQuery::default() })
            .await
            .expect("query");
        assert_eq!(
            asc.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![first.id, second.id, third.id]
        );
    }

    #[tokio::test]
    async fn query_paginates_with_skip_and_limit() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(append_tagged(&store, AuditAction::LoginSuccess, "a").await.id);
        }
        let page = store
            .query(&AuditQuery { limit: 2, skip: 1, ..AuditQuery::default() })
            .await
            .expect("query");
        // Descending: newest first, so skipping one lands on ids[3], ids[2].
        assert_eq!(page.iter().map(|e| e.id).collect::<Vec<_>>(), vec![ids[3], ids[2]]);
    }

    #[tokio::test]
    async fn query_filters_by_action_and_actor() {
        let store = MemoryStore::new();
        append_tagged(&store, AuditAction::LoginFailed, "mallory").await;
        append_tagged(&store, AuditAction::LoginSuccess, "alice").await;
        append_tagged(&store, AuditAction::LoginFailed, "mallory").await;

        let failed = store
            .query(&AuditQuery {
                action: Some(AuditAction::LoginFailed),
                ..AuditQuery::default()
            })
            .await
            .expect("query");
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|e| e.actor == "mallory"));

        let alice = store
            .query(&AuditQuery { actor: Some("alice".into()), ..AuditQuery::default() })
            .await
            .expect("query");
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].action, AuditAction::LoginSuccess);
    }

    #[tokio::test]
    async fn aggregate_counts_per_action_for_one_actor() {
        let store = MemoryStore::new();
        append_tagged(&store, AuditAction::LoginFailed, "mallory").await;
        append_tagged(&store, AuditAction::LoginFailed, "mallory").await;
        append_tagged(&store, AuditAction::Logout, "mallory").await;
        append_tagged(&store, AuditAction::LoginFailed, "alice").await;

        let since = OffsetDateTime::now_utc() - time::Duration::days(1);
        let summary = store
            .aggregate_by_actor("mallory", since)
            .await
            .expect("aggregate");
        assert_eq!(summary.get(&AuditAction::LoginFailed), Some(&2));
        assert_eq!(summary.get(&AuditAction::Logout), Some(&1));
        assert_eq!(summary.len(), 2);
    }
}

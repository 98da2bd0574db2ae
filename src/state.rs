use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;
use crate::store::{AuditStore, PgStore, ReturnStore, UserStore};

/// Shared application state. The store handles are built once here and
/// injected everywhere else; nothing below this layer holds a global
/// connection.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub returns: Arc<dyn ReturnStore>,
    pub audit: Arc<dyn AuditStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let store = PgStore::new(pool);
        store
            .ensure_schema()
            .await
            .context("bootstrap database schema")?;

        let store = Arc::new(store);
        Ok(Self {
            users: store.clone(),
            returns: store.clone(),
            audit: store,
            config,
        })
    }

    /// State over the in-memory store, for tests.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::JwtConfig;
        use crate::store::MemoryStore;

        let store = Arc::new(MemoryStore::new());
        let config = Arc::new(AppConfig {
            database_url: "memory".into(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
        });
        Self {
            users: store.clone(),
            returns: store.clone(),
            audit: store,
            config,
        }
    }
}

//! # Store Settings Repository
//!
//! The single `store_settings` row printed in ticket headers.

use sqlx::SqlitePool;
use tracing::{debug, info};

use counter_core::validation::validate_name;
use counter_core::{CoreError, StoreIdentity};

use crate::error::DbResult;

/// Row id of the store settings.
pub const STORE_SETTINGS_ID: i64 = 1;

#[derive(Debug, Clone)]
pub struct StoreRepository {
    pool: SqlitePool,
}

impl StoreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StoreRepository { pool }
    }

    /// Reads the store identity, falling back to defaults when the store has
    /// not been configured yet.
    pub async fn get_or_default(&self) -> DbResult<StoreIdentity> {
        let store: Option<StoreIdentity> = sqlx::query_as(
            "SELECT id, name, address, phone, logo_url FROM store_settings WHERE id = ?1",
        )
        .bind(STORE_SETTINGS_ID)
        .fetch_optional(&self.pool)
        .await?;

        if store.is_none() {
            debug!("Store settings missing, using defaults");
        }
        Ok(store.unwrap_or_default())
    }

    /// Creates or replaces the store identity. The `id` field is ignored.
    pub async fn upsert(&self, store: &StoreIdentity) -> DbResult<StoreIdentity> {
        validate_name("store name", &store.name).map_err(CoreError::from)?;

        sqlx::query(
            r#"
            INSERT INTO store_settings (id, name, address, phone, logo_url)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                address = excluded.address,
                phone = excluded.phone,
                logo_url = excluded.logo_url
            "#,
        )
        .bind(STORE_SETTINGS_ID)
        .bind(&store.name)
        .bind(&store.address)
        .bind(&store.phone)
        .bind(&store.logo_url)
        .execute(&self.pool)
        .await?;

        info!(name = %store.name, "Store settings saved");

        Ok(StoreIdentity {
            id: STORE_SETTINGS_ID,
            ..store.clone()
        })
    }
}

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::models::portal::{PortalRecord, PortalRow};
use crate::models::stats::SiteStats;
use crate::models::upload::StoredObject;
use crate::store::{PortalStore, StoreError};
use crate::util::now_millis;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Classify sqlx errors so missing-schema conditions surface distinctly.
fn map_db_err(e: sqlx::Error) -> StoreError {
    let msg = e.to_string();
    if msg.contains("no such table: portals") {
        return StoreError::SchemaMissing;
    }
    if msg.contains("no such table: objects") {
        return StoreError::BucketMissing;
    }
    StoreError::Db(e)
}

#[async_trait]
impl PortalStore for SqliteStore {
    async fn upsert_portal(&self, record: &PortalRecord) -> Result<(), StoreError> {
        tracing::debug!(
            portal_id = %record.id,
            protected = record.pass_hash.is_some(),
            payload_bytes = record.payload.len(),
            "db: upsert portal"
        );

        sqlx::query(
            "INSERT INTO portals (id, payload, pass_salt, pass_hash, pass_iterations, pass_digest, views, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, 0, ?) \
             ON CONFLICT (id) DO UPDATE SET \
               payload = excluded.payload, \
               pass_salt = excluded.pass_salt, \
               pass_hash = excluded.pass_hash, \
               pass_iterations = excluded.pass_iterations, \
               pass_digest = excluded.pass_digest",
        )
        .bind(&record.id)
        .bind(&record.payload)
        .bind(&record.pass_salt)
        .bind(&record.pass_hash)
        .bind(record.pass_iterations)
        .bind(&record.pass_digest)
        .bind(now_millis())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        tracing::debug!(portal_id = %record.id, "db: portal upserted");

        Ok(())
    }

    async fn fetch_portal(&self, id: &str) -> Result<Option<PortalRow>, StoreError> {
        tracing::debug!(portal_id = %id, "db: SELECT portal");

        let row: Option<PortalRow> = sqlx::query_as(
            "SELECT payload, pass_salt, pass_hash, pass_iterations, pass_digest, views \
             FROM portals WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        tracing::debug!(portal_id = %id, found = row.is_some(), "db: portal fetch result");

        Ok(row)
    }

    async fn increment_views(&self, id: &str) -> Result<i64, StoreError> {
        tracing::debug!(portal_id = %id, "db: atomic view increment");

        // Atomic path first. Row-absence is not a call failure and gets no
        // fallback; only a genuine execution error degrades to the
        // read-modify-write below, which can lose updates under concurrency.
        let attempt: Result<Option<(i64,)>, sqlx::Error> =
            sqlx::query_as("UPDATE portals SET views = views + 1 WHERE id = ? RETURNING views")
                .bind(id)
                .fetch_optional(&self.pool)
                .await;

        match attempt {
            Ok(Some((views,))) => {
                tracing::debug!(portal_id = %id, views, "db: views incremented");
                Ok(views)
            }
            Ok(None) => Err(StoreError::Db(sqlx::Error::RowNotFound)),
            Err(e) => {
                tracing::warn!(
                    portal_id = %id,
                    error = %e,
                    "db: atomic increment failed, falling back to read-modify-write"
                );

                let (views,): (i64,) = sqlx::query_as("SELECT views FROM portals WHERE id = ?")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_db_err)?;

                sqlx::query("UPDATE portals SET views = ? WHERE id = ?")
                    .bind(views + 1)
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_db_err)?;

                tracing::debug!(portal_id = %id, views = views + 1, "db: fallback increment done");

                Ok(views + 1)
            }
        }
    }

    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<(), StoreError> {
        tracing::debug!(key = %key, content_type = %content_type, object_bytes = bytes.len(), "db: INSERT object");

        // Plain INSERT: an existing key is a constraint violation, never an
        // overwrite.
        sqlx::query("INSERT INTO objects (key, content_type, bytes, created_at) VALUES (?, ?, ?, ?)")
            .bind(key)
            .bind(content_type)
            .bind(bytes)
            .bind(now_millis())
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;

        tracing::debug!(key = %key, "db: object stored");

        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Option<StoredObject>, StoreError> {
        tracing::debug!(key = %key, "db: SELECT object");

        let row: Option<StoredObject> =
            sqlx::query_as("SELECT content_type, bytes FROM objects WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_err)?;

        tracing::debug!(key = %key, found = row.is_some(), "db: object fetch result");

        Ok(row)
    }

    async fn site_stats(&self) -> Result<SiteStats, StoreError> {
        tracing::debug!("db: SELECT views, payload for stats");

        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT views, payload FROM portals")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;

        let total_portals = rows.len() as i64;
        let mut total_views = 0;
        let mut by_type = std::collections::BTreeMap::new();

        for (views, payload) in &rows {
            total_views += views;
            let kind = serde_json::from_str::<serde_json::Value>(payload)
                .ok()
                .and_then(|v| v.get("celebrationType").and_then(|t| t.as_str().map(String::from)))
                .unwrap_or_else(|| "general".to_string());
            *by_type.entry(kind).or_insert(0) += 1;
        }

        tracing::debug!(total_portals, total_views, "db: stats collected");

        Ok(SiteStats {
            total_portals,
            total_views,
            by_type,
            collected_at: now_millis(),
        })
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }
}

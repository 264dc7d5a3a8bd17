use async_trait::async_trait;
use std::fmt;

use crate::models::portal::{PortalRecord, PortalRow};
use crate::models::stats::SiteStats;
use crate::models::upload::StoredObject;

/// Errors surfaced by the document store. Missing-schema conditions are
/// distinguished from generic failures so operators can self-diagnose a
/// fresh deployment.
#[derive(Debug)]
pub enum StoreError {
    /// The portals table does not exist (setup SQL never ran).
    SchemaMissing,
    /// The objects table does not exist.
    BucketMissing,
    Db(sqlx::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::SchemaMissing => write!(f, "portals table missing"),
            StoreError::BucketMissing => write!(f, "objects table missing"),
            StoreError::Db(e) => write!(f, "database error: {e}"),
        }
    }
}

/// Document store behind the portal service. One process-lifetime instance
/// lives in `AppState`; tests substitute their own implementation.
#[async_trait]
pub trait PortalStore: Send + Sync {
    /// Insert-or-replace keyed on id. Replaces payload and password columns
    /// wholesale; `views` and `created_at` survive an overwrite.
    async fn upsert_portal(&self, record: &PortalRecord) -> Result<(), StoreError>;

    async fn fetch_portal(&self, id: &str) -> Result<Option<PortalRow>, StoreError>;

    /// Increment the view counter and return the new count. Implementations
    /// try an atomic increment first and may degrade to a non-atomic
    /// read-modify-write on call failure; callers see only the result.
    async fn increment_views(&self, id: &str) -> Result<i64, StoreError>;

    /// Store an object under a fresh key. Never overwrites an existing key.
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<(), StoreError>;

    async fn get_object(&self, key: &str) -> Result<Option<StoredObject>, StoreError>;

    async fn site_stats(&self) -> Result<SiteStats, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

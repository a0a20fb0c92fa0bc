// ============================================
// Storage Collaborators
// ============================================
//
// The engine reads content snapshots and user preference documents
// through two traits:
//
// ┌──────────────────┐     ┌───────────────────┐
// │  ContentSource   │     │  PreferenceStore  │
// │  list_active()   │     │  get_profile()    │
// └────────┬─────────┘     │  get_preferences()│
//          │               │  merge_prefs()    │
//          │               └─────────┬─────────┘
//   PgContentSource          RedisPreferenceStore
//   InMemoryStore            InMemoryStore
//
// merge_preferences must apply deltas with field-level atomic increments;
// a read-modify-write full document overwrite loses concurrent updates.

pub mod memory;
pub mod postgres;
pub mod redis_store;

pub use memory::InMemoryStore;
pub use postgres::PgContentSource;
pub use redis_store::RedisPreferenceStore;

use crate::models::{
    ContentItem, ContentType, PreferenceDelta, RequestedType, UserPreferences, UserProfile,
};
use async_trait::async_trait;
use futures::future::try_join_all;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Source of rankable items. Items are fetched fresh on every call.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// All items of `content_type` whose status is active. Order is irrelevant.
    async fn list_active(&self, content_type: ContentType) -> Result<Vec<ContentItem>>;
}

/// Per-user profile and learned preference maps.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;

    async fn get_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>>;

    /// Adds `delta` to the existing weights.
    ///
    /// Returns `Ok(false)` without writing anything when the user has no
    /// preferences document.
    async fn merge_preferences(&self, user_id: &str, delta: &PreferenceDelta) -> Result<bool>;

    /// Creates an empty preferences document if none exists.
    async fn create_preferences(&self, user_id: &str) -> Result<()>;
}

/// Active items for every type in `requested`, concatenated in
/// [`RequestedType::content_types`] order. Types are fetched concurrently.
pub async fn list_active_for(
    source: &dyn ContentSource,
    requested: RequestedType,
) -> Result<Vec<ContentItem>> {
    let batches = try_join_all(
        requested
            .content_types()
            .into_iter()
            .map(|content_type| source.list_active(content_type)),
    )
    .await?;

    Ok(batches.into_iter().flatten().collect())
}

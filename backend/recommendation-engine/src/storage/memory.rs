use super::{ContentSource, PreferenceStore, Result};
use crate::models::{ContentItem, ContentType, PreferenceDelta, UserPreferences, UserProfile};
use async_trait::async_trait;
use dashmap::DashMap;

/// In-process implementation of both collaborators.
///
/// Merges hold the per-user shard lock for the whole delta, so concurrent
/// merges for the same user never lose increments.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    content: DashMap<ContentType, Vec<ContentItem>>,
    profiles: DashMap<String, UserProfile>,
    preferences: DashMap<String, UserPreferences>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an active item, keyed by its own content type.
    pub fn insert_item(&self, item: ContentItem) {
        self.content.entry(item.kind).or_default().push(item);
    }

    pub fn insert_profile(&self, user_id: &str, profile: UserProfile) {
        self.profiles.insert(user_id.to_string(), profile);
    }

    pub fn insert_preferences(&self, user_id: &str, preferences: UserPreferences) {
        self.preferences.insert(user_id.to_string(), preferences);
    }

    /// Current snapshot of a user's preferences.
    pub fn preferences_snapshot(&self, user_id: &str) -> Option<UserPreferences> {
        self.preferences.get(user_id).map(|p| p.clone())
    }
}

#[async_trait]
impl ContentSource for InMemoryStore {
    async fn list_active(&self, content_type: ContentType) -> Result<Vec<ContentItem>> {
        Ok(self
            .content
            .get(&content_type)
            .map(|items| items.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl PreferenceStore for InMemoryStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.profiles.get(user_id).map(|p| p.clone()))
    }

    async fn get_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        Ok(self.preferences_snapshot(user_id))
    }

    async fn merge_preferences(&self, user_id: &str, delta: &PreferenceDelta) -> Result<bool> {
        let Some(mut prefs) = self.preferences.get_mut(user_id) else {
            return Ok(false);
        };

        for (tag, amount) in &delta.interests {
            *prefs.interests.entry(tag.clone()).or_insert(0.0) += amount;
        }
        for (requirement, amount) in &delta.skills {
            *prefs.skills.entry(requirement.clone()).or_insert(0.0) += amount;
        }

        Ok(true)
    }

    async fn create_preferences(&self, user_id: &str) -> Result<()> {
        self.preferences.entry(user_id.to_string()).or_default();
        Ok(())
    }
}

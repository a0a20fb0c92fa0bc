// ============================================
// Redis Preference Store
// ============================================
//
// Redis keys:
// - {prefix}:profile:{user_id}            - JSON UserProfile
// - {prefix}:prefs:{user_id}              - JSON location mirror; existence marks the document
// - {prefix}:prefs:{user_id}:interests    - Hash tag -> weight
// - {prefix}:prefs:{user_id}:skills       - Hash requirement -> weight
//
// Weights are merged with HINCRBYFLOAT inside a MULTI/EXEC pipeline.

use super::{PreferenceStore, Result};
use crate::models::{LocationData, PreferenceDelta, UserPreferences, UserProfile};
use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::debug;

pub struct RedisPreferenceStore {
    redis: redis::Client,
    key_prefix: String,
}

impl RedisPreferenceStore {
    pub fn new(redis: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            redis,
            key_prefix: key_prefix.into(),
        }
    }

    fn profile_key(&self, user_id: &str) -> String {
        format!("{}:profile:{}", self.key_prefix, user_id)
    }

    fn preferences_key(&self, user_id: &str) -> String {
        format!("{}:prefs:{}", self.key_prefix, user_id)
    }

    fn interests_key(&self, user_id: &str) -> String {
        format!("{}:prefs:{}:interests", self.key_prefix, user_id)
    }

    fn skills_key(&self, user_id: &str) -> String {
        format!("{}:prefs:{}:skills", self.key_prefix, user_id)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        Ok(self.redis.get_multiplexed_async_connection().await?)
    }

    /// Stores the onboarding profile, replacing any previous one.
    pub async fn put_profile(&self, user_id: &str, profile: &UserProfile) -> Result<()> {
        let mut conn = self.connection().await?;
        let json = serde_json::to_string(profile)?;
        let _: () = conn.set(self.profile_key(user_id), json).await?;
        Ok(())
    }

    /// Sets the location mirror, creating the preferences document if needed.
    pub async fn put_location(&self, user_id: &str, location: Option<&LocationData>) -> Result<()> {
        let mut conn = self.connection().await?;
        let json = serde_json::to_string(&location)?;
        let _: () = conn.set(self.preferences_key(user_id), json).await?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for RedisPreferenceStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let mut conn = self.connection().await?;
        let json: Option<String> = conn.get(self.profile_key(user_id)).await?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn get_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        let mut conn = self.connection().await?;

        let marker: Option<String> = conn.get(self.preferences_key(user_id)).await?;
        let Some(marker) = marker else {
            return Ok(None);
        };

        let location_data: Option<LocationData> = serde_json::from_str(&marker)?;
        let interests: HashMap<String, f64> = conn.hgetall(self.interests_key(user_id)).await?;
        let skills: HashMap<String, f64> = conn.hgetall(self.skills_key(user_id)).await?;

        Ok(Some(UserPreferences {
            interests,
            skills,
            location_data,
        }))
    }

    async fn merge_preferences(&self, user_id: &str, delta: &PreferenceDelta) -> Result<bool> {
        let mut conn = self.connection().await?;

        let exists: bool = conn.exists(self.preferences_key(user_id)).await?;
        if !exists {
            return Ok(false);
        }
        if delta.is_empty() {
            return Ok(true);
        }

        let interests_key = self.interests_key(user_id);
        let skills_key = self.skills_key(user_id);

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (tag, amount) in &delta.interests {
            pipe.hincr(&interests_key, tag, *amount).ignore();
        }
        for (requirement, amount) in &delta.skills {
            pipe.hincr(&skills_key, requirement, *amount).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;

        debug!(
            user_id = user_id,
            interests = delta.interests.len(),
            skills = delta.skills.len(),
            "Preference delta merged"
        );

        Ok(true)
    }

    async fn create_preferences(&self, user_id: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: bool = conn.set_nx(self.preferences_key(user_id), "null").await?;
        Ok(())
    }
}

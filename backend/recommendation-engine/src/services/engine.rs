use crate::config::{Config, ConfigError, EngineConfig};
use crate::models::{
    EngagementEvent, EngagementType, ItemSnapshot, RecommendedItem, RequestedType,
};
use crate::services::exploration::ExploreSampler;
use crate::services::learning::{LearnOutcome, PreferenceLearner};
use crate::services::ranking::{RankingLayer, RankingOutcome};
use crate::services::scoring::Scorer;
use crate::storage::{
    ContentSource, PgContentSource, PreferenceStore, RedisPreferenceStore, StorageError,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

/// Construction errors. Serving calls never fail.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid engine configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage setup failed: {0}")]
    Storage(#[from] StorageError),
}

/// Entry point used by the recommendation and engagement route handlers.
///
/// None of the operations return errors: ranking degrades to an empty list
/// and learning failures are only logged.
pub struct RecommendationEngine {
    ranking: RankingLayer,
    learner: PreferenceLearner,
    config: EngineConfig,
}

impl RecommendationEngine {
    pub fn new(
        content: Arc<dyn ContentSource>,
        preferences: Arc<dyn PreferenceStore>,
        config: EngineConfig,
    ) -> Result<Self, ConfigError> {
        let sampler = ExploreSampler::from_config(&config);
        Self::with_sampler(content, preferences, config, sampler)
    }

    /// Same as [`new`](Self::new) with an explicit random source.
    pub fn with_sampler(
        content: Arc<dyn ContentSource>,
        preferences: Arc<dyn PreferenceStore>,
        config: EngineConfig,
        sampler: ExploreSampler,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let ranking = RankingLayer::new(
            content,
            preferences.clone(),
            Scorer::from_config(&config)?,
            Arc::new(sampler),
        );
        let learner =
            PreferenceLearner::new(preferences).with_bootstrap(config.bootstrap_preferences);

        Ok(Self {
            ranking,
            learner,
            config,
        })
    }

    /// Builds the engine on PostgreSQL content and Redis preferences.
    pub async fn connect(config: &Config) -> Result<Self, EngineError> {
        config.engine.validate()?;

        let database = config
            .database
            .as_ref()
            .ok_or_else(|| StorageError::Unavailable("DATABASE_URL is not set".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(database.max_connections)
            .connect(&database.url)
            .await
            .map_err(StorageError::from)?;
        let redis = redis::Client::open(config.redis.url.clone()).map_err(StorageError::from)?;

        info!(
            redis_url = %config.redis.url,
            key_prefix = %config.redis.key_prefix,
            "Recommendation engine storage connected"
        );

        let engine = Self::new(
            Arc::new(PgContentSource::new(pool)),
            Arc::new(RedisPreferenceStore::new(
                redis,
                config.redis.key_prefix.clone(),
            )),
            config.engine.clone(),
        )?;
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn get_recommendations(
        &self,
        user_id: &str,
        requested: RequestedType,
        limit: usize,
    ) -> Vec<RecommendedItem> {
        self.explain(user_id, requested, limit).await.into_items()
    }

    /// Recommendations in shuffled order; use [`get_recommendations`](Self::get_recommendations)
    /// when a stable ordering is needed.
    pub async fn get_personalized_feed(
        &self,
        user_id: &str,
        requested: RequestedType,
        limit: usize,
    ) -> Vec<RecommendedItem> {
        let limit = self.config.normalize_limit(limit);
        self.ranking.personalized_feed(user_id, requested, limit).await
    }

    pub async fn get_cold_start_recommendations(
        &self,
        requested: RequestedType,
        limit: usize,
    ) -> Vec<RecommendedItem> {
        let limit = self.config.normalize_limit(limit);
        self.ranking.cold_start().select(requested, limit).await
    }

    /// Anonymous trending list.
    pub async fn get_trending(&self, requested: RequestedType, limit: usize) -> Vec<RecommendedItem> {
        self.get_cold_start_recommendations(requested, limit).await
    }

    /// Scored candidates with breakdowns. Crate-internal auditing only.
    pub(crate) async fn explain(
        &self,
        user_id: &str,
        requested: RequestedType,
        limit: usize,
    ) -> RankingOutcome {
        let limit = self.config.normalize_limit(limit);
        self.ranking.rank(user_id, requested, limit).await
    }

    pub async fn update_preferences_from_engagement(
        &self,
        user_id: &str,
        engagement_type: EngagementType,
        item_snapshot: &ItemSnapshot,
    ) -> LearnOutcome {
        self.learner
            .learn(user_id, engagement_type, item_snapshot)
            .await
    }

    /// Runs the learner on a background task so the caller never waits on it.
    pub fn spawn_preference_update(&self, event: EngagementEvent) -> JoinHandle<LearnOutcome> {
        let learner = self.learner.clone();
        tokio::spawn(async move { learner.learn_from_event(&event).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentItem, ContentType, LocationData, UserPreferences, UserProfile};
    use crate::storage::InMemoryStore;
    use chrono::{Duration, Utc};

    fn engine(store: Arc<InMemoryStore>, config: EngineConfig) -> RecommendationEngine {
        RecommendationEngine::with_sampler(
            store.clone(),
            store,
            config,
            ExploreSampler::seeded(12),
        )
        .unwrap()
    }

    fn job(id: &str, views: u64) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            kind: ContentType::Job,
            tags: vec!["tech".to_string()],
            requirements: vec!["rust".to_string()],
            location: None,
            created_at: Utc::now(),
            likes_count: 0,
            saves_count: 0,
            views,
        }
    }

    #[tokio::test]
    async fn test_limit_is_normalized() {
        let store = Arc::new(InMemoryStore::new());
        for i in 0..30 {
            store.insert_item(job(&format!("j{}", i), i));
        }
        let config = EngineConfig {
            default_limit: 4,
            max_limit: 10,
            ..Default::default()
        };
        let engine = engine(store, config);

        let jobs = RequestedType::Only(ContentType::Job);
        assert_eq!(engine.get_trending(jobs, 0).await.len(), 4);
        assert_eq!(engine.get_trending(jobs, 25).await.len(), 10);
    }

    #[tokio::test]
    async fn test_spawned_update_applies() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_preferences("u1", UserPreferences::default());
        let engine = engine(store.clone(), EngineConfig::default());

        let handle = engine.spawn_preference_update(EngagementEvent {
            user_id: "u1".to_string(),
            engagement_type: EngagementType::Save,
            item_snapshot: ItemSnapshot::from(&job("j1", 0)),
        });

        assert_eq!(handle.await.unwrap(), LearnOutcome::Applied);
        let prefs = store.preferences_snapshot("u1").unwrap();
        assert_eq!(prefs.interests["tech"], 1.0);
        assert_eq!(prefs.skills["rust"], 1.0);
    }

    #[tokio::test]
    async fn test_bootstrap_flag_is_wired() {
        let store = Arc::new(InMemoryStore::new());
        let config = EngineConfig {
            bootstrap_preferences: true,
            ..Default::default()
        };
        let engine = engine(store.clone(), config);

        let outcome = engine
            .update_preferences_from_engagement(
                "fresh",
                EngagementType::ClickThrough,
                &ItemSnapshot::from(&job("j1", 0)),
            )
            .await;

        assert_eq!(outcome, LearnOutcome::Applied);
        assert_eq!(store.preferences_snapshot("fresh").unwrap().interests["tech"], 0.5);
    }

    #[tokio::test]
    async fn test_connect_requires_database_url() {
        let config = Config {
            engine: EngineConfig::default(),
            redis: crate::config::RedisConfig {
                url: "redis://localhost:6379".to_string(),
                key_prefix: "recsys".to_string(),
            },
            database: None,
        };

        let result = RecommendationEngine::connect(&config).await;
        assert!(matches!(
            result,
            Err(EngineError::Storage(StorageError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_engine_config() {
        let config = Config {
            engine: EngineConfig {
                popularity_scale: 0.0,
                ..Default::default()
            },
            redis: crate::config::RedisConfig {
                url: "redis://localhost:6379".to_string(),
                key_prefix: "recsys".to_string(),
            },
            database: None,
        };

        let result = RecommendationEngine::connect(&config).await;
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_constructors_validate_config() {
        let store = Arc::new(InMemoryStore::new());

        let zero_scale = EngineConfig {
            popularity_scale: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            RecommendationEngine::new(store.clone(), store.clone(), zero_scale),
            Err(ConfigError::InvalidValue { key: "popularity_scale", .. })
        ));

        let unbalanced = EngineConfig {
            interest_weight: 0.9,
            ..Default::default()
        };
        assert!(matches!(
            RecommendationEngine::with_sampler(
                store.clone(),
                store.clone(),
                unbalanced,
                ExploreSampler::seeded(1),
            ),
            Err(ConfigError::WeightSum(_))
        ));

        let no_limit = EngineConfig {
            max_limit: 0,
            ..Default::default()
        };
        assert!(RecommendationEngine::new(store.clone(), store, no_limit).is_err());
    }

    #[tokio::test]
    async fn test_explain_keeps_breakdown_for_audit() {
        let store = Arc::new(InMemoryStore::new());
        let mut rust_job = job("job-rust", 40);
        rust_job.requirements = vec!["rust".to_string(), "sql".to_string()];
        rust_job.location = Some("Toronto, Ontario".to_string());
        rust_job.created_at = Utc::now() - Duration::days(2);
        let mut remote_job = job("job-remote", 120);
        remote_job.requirements = vec!["python".to_string()];
        remote_job.location = Some("Remote - Canada".to_string());
        remote_job.created_at = Utc::now() - Duration::days(40);
        store.insert_item(rust_job);
        store.insert_item(remote_job);
        store.insert_profile(
            "dev",
            UserProfile {
                interests: vec!["tech".to_string()],
                skills: vec!["rust".to_string(), "sql".to_string()],
                location_data: Some(LocationData {
                    city: Some("Toronto".to_string()),
                    province: Some("Ontario".to_string()),
                    country: Some("Canada".to_string()),
                }),
            },
        );
        let engine = engine(store, EngineConfig::default());

        let RankingOutcome::Personalized(scored) = engine
            .explain("dev", RequestedType::Only(ContentType::Job), 10)
            .await
        else {
            panic!("expected personalized ranking");
        };

        assert_eq!(scored[0].item.id, "job-rust");
        let top = scored[0].score_breakdown;
        assert_eq!(top.interest_match, 100.0);
        assert_eq!(top.skill_match, 100.0);
        assert_eq!(top.location_match, 100.0);
        assert_eq!(top.recency, 80.0);

        let remote = &scored[1].score_breakdown;
        assert_eq!(remote.location_match, 100.0);
        assert_eq!(remote.skill_match, 0.0);
        assert_eq!(remote.recency, 40.0);
        assert!(scored[0].score >= scored[1].score);
    }
}

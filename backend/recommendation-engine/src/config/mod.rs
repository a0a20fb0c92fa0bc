use crate::services::scoring::ScoringWeights;
use serde::Deserialize;
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Scoring weights must sum to 1.0, got {0}")]
    WeightSum(f64),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineConfig,
    pub redis: RedisConfig,
    pub database: Option<DatabaseConfig>,
}

/// Tunables for scoring, ranking and learning.
///
/// Loaded from `RECOMMENDATION_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub interest_weight: f64,
    pub skill_weight: f64,
    pub location_weight: f64,
    pub popularity_weight: f64,
    pub recency_weight: f64,
    /// Fraction of the combined score reserved for randomness
    pub explore_weight: f64,
    /// Per-day popularity decay factor: raw / (1 + age_days * decay_rate)
    pub decay_rate: f64,
    /// Decayed engagement is divided by this before the 100 cap
    pub popularity_scale: f64,
    pub default_limit: usize,
    pub max_limit: usize,
    /// Fixes the explore/shuffle random source when set
    pub explore_seed: Option<u64>,
    /// Create an empty preferences document on first engagement
    pub bootstrap_preferences: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interest_weight: 0.40,
            skill_weight: 0.25,
            location_weight: 0.05,
            popularity_weight: 0.15,
            recency_weight: 0.10,
            explore_weight: 0.05,
            decay_rate: 0.1,
            popularity_scale: 10.0,
            default_limit: 20,
            max_limit: 100,
            explore_seed: None,
            bootstrap_preferences: false,
        }
    }
}

impl EngineConfig {
    pub fn weights(&self) -> ScoringWeights {
        ScoringWeights {
            interest_match: self.interest_weight,
            skill_match: self.skill_weight,
            location_match: self.location_weight,
            popularity: self.popularity_weight,
            recency: self.recency_weight,
            explore: self.explore_weight,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights().validate()?;

        if !self.decay_rate.is_finite() || self.decay_rate < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "decay_rate",
                reason: format!("must be a non-negative number, got {}", self.decay_rate),
            });
        }
        if !self.popularity_scale.is_finite() || self.popularity_scale <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "popularity_scale",
                reason: format!("must be positive, got {}", self.popularity_scale),
            });
        }
        if self.max_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_limit",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// 0 means "use the default"; anything above `max_limit` is clamped.
    pub fn normalize_limit(&self, limit: usize) -> usize {
        let limit = if limit == 0 { self.default_limit } else { limit };
        limit.min(self.max_limit)
    }
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub key_prefix: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let engine: EngineConfig = envy::prefixed("RECOMMENDATION_").from_env()?;
        engine.validate()?;

        let database = match env::var("DATABASE_URL") {
            Ok(url) => Some(DatabaseConfig {
                url,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                        key: "DATABASE_MAX_CONNECTIONS",
                        reason: e.to_string(),
                    })?,
            }),
            Err(_) => None,
        };

        Ok(Config {
            engine,
            redis: RedisConfig {
                url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
                key_prefix: env::var("REDIS_KEY_PREFIX").unwrap_or_else(|_| "recsys".to_string()),
            },
            database,
        })
    }
}

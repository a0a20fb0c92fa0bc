pub mod config;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use config::{Config, EngineConfig};
pub use services::{
    ColdStartSelector, EngineError, PreferenceLearner, RankingLayer, RecommendationEngine, Scorer,
};
pub use storage::{ContentSource, InMemoryStore, PreferenceStore};

pub mod cold_start;
pub mod engine;
pub mod exploration;
pub mod learning;
pub mod ranking;
pub mod scoring;

pub use cold_start::ColdStartSelector;
pub use engine::{EngineError, RecommendationEngine};
pub use exploration::ExploreSampler;
pub use learning::{LearnOutcome, PreferenceLearner};
pub use ranking::RankingLayer;
pub use scoring::{Scorer, ScoringWeights};

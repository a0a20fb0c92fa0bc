//! Ranking Module
//!
//! Orchestrates personalized ranking for one user.
//!
//! # Workflow
//! 1. Fetch profile and preferences from the preference store
//! 2. Neither present → delegate to the cold-start selector
//! 3. Fetch active candidates for the requested type(s)
//! 4. Score every candidate, stable sort descending, take `limit`
//! 5. Strip score fields before returning
//!
//! Equal scores keep fetch order: by content type (opportunity, event, job,
//! resource), then by the order the content source returned items.

use crate::models::{
    RecommendedItem, RequestedType, ScoredCandidate, UserPreferences, UserProfile,
};
use crate::services::cold_start::ColdStartSelector;
use crate::services::exploration::ExploreSampler;
use crate::services::scoring::Scorer;
use crate::storage::{list_active_for, ContentSource, PreferenceStore};
use chrono::Utc;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a ranking pass, before score fields are stripped.
/// Never handed to callers outside the crate.
#[derive(Debug, Clone)]
pub(crate) enum RankingOutcome {
    /// User had no signal; items ranked by raw engagement
    ColdStart(Vec<RecommendedItem>),
    Personalized(Vec<ScoredCandidate>),
}

impl RankingOutcome {
    pub fn into_items(self) -> Vec<RecommendedItem> {
        match self {
            RankingOutcome::ColdStart(items) => items,
            RankingOutcome::Personalized(scored) => scored
                .into_iter()
                .map(ScoredCandidate::into_recommended)
                .collect(),
        }
    }
}

pub struct RankingLayer {
    content: Arc<dyn ContentSource>,
    preferences: Arc<dyn PreferenceStore>,
    scorer: Scorer,
    cold_start: ColdStartSelector,
    sampler: Arc<ExploreSampler>,
}

impl RankingLayer {
    pub fn new(
        content: Arc<dyn ContentSource>,
        preferences: Arc<dyn PreferenceStore>,
        scorer: Scorer,
        sampler: Arc<ExploreSampler>,
    ) -> Self {
        let cold_start = ColdStartSelector::new(content.clone());
        Self {
            content,
            preferences,
            scorer,
            cold_start,
            sampler,
        }
    }

    /// Selector used when a user has no signal; shared with trending requests.
    pub fn cold_start(&self) -> &ColdStartSelector {
        &self.cold_start
    }

    /// Ordered recommendations without score fields.
    pub async fn recommend(
        &self,
        user_id: &str,
        requested: RequestedType,
        limit: usize,
    ) -> Vec<RecommendedItem> {
        self.rank(user_id, requested, limit).await.into_items()
    }

    /// Same candidate set as [`recommend`](Self::recommend), uniformly shuffled.
    pub async fn personalized_feed(
        &self,
        user_id: &str,
        requested: RequestedType,
        limit: usize,
    ) -> Vec<RecommendedItem> {
        let mut items = self.recommend(user_id, requested, limit).await;
        self.sampler.shuffle(&mut items);
        items
    }

    /// Full ranking pass keeping score breakdowns for auditing.
    pub(crate) async fn rank(
        &self,
        user_id: &str,
        requested: RequestedType,
        limit: usize,
    ) -> RankingOutcome {
        let (profile, preferences) = match self.load_user_signals(user_id).await {
            Some(signals) => signals,
            None => return RankingOutcome::Personalized(Vec::new()),
        };

        if profile.is_none() && preferences.is_none() {
            info!(
                user_id = user_id,
                content_type = %requested,
                "No profile or preferences, using cold-start ranking"
            );
            return RankingOutcome::ColdStart(self.cold_start.select(requested, limit).await);
        }

        let candidates = match list_active_for(self.content.as_ref(), requested).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(
                    user_id = user_id,
                    content_type = %requested,
                    error = %e,
                    "Candidate fetch failed, returning empty list"
                );
                return RankingOutcome::Personalized(Vec::new());
            }
        };

        let candidate_count = candidates.len();
        let now = Utc::now();

        let mut scored: Vec<ScoredCandidate> = self.sampler.with_rng(|rng| {
            candidates
                .into_iter()
                .map(|item| {
                    self.scorer
                        .score(item, profile.as_ref(), preferences.as_ref(), now, rng)
                })
                .collect()
        });

        // NaN scores are treated as equal, which keeps fetch order
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(limit);

        info!(
            user_id = user_id,
            content_type = %requested,
            candidate_count = candidate_count,
            returned = scored.len(),
            "Personalized ranking completed"
        );

        RankingOutcome::Personalized(scored)
    }

    async fn load_user_signals(
        &self,
        user_id: &str,
    ) -> Option<(Option<UserProfile>, Option<UserPreferences>)> {
        let (profile, preferences) = tokio::join!(
            self.preferences.get_profile(user_id),
            self.preferences.get_preferences(user_id)
        );

        match (profile, preferences) {
            (Ok(profile), Ok(preferences)) => Some((profile, preferences)),
            (Err(e), _) | (_, Err(e)) => {
                warn!(
                    user_id = user_id,
                    error = %e,
                    "Preference store unavailable, returning empty list"
                );
                None
            }
        }
    }
}

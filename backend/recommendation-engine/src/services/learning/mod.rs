// ============================================
// Preference Learner (偏好学习)
// ============================================
//
// Turns engagement events into additive updates on the user's
// preference weight maps:
//
// - save / like      : +1.0 per tag (interests), +1.0 per requirement (skills)
// - click_through    : +0.5 per tag (interests), skills untouched
//
// Weights are never decayed or capped. Learning is best-effort: failures
// are logged and swallowed so the triggering action is never blocked.

use crate::models::{EngagementEvent, EngagementType, ItemSnapshot, PreferenceDelta};
use crate::storage::{PreferenceStore, Result};
use std::sync::Arc;
use tracing::{debug, warn};

impl EngagementType {
    /// Amount added to each tag's interest weight.
    pub fn interest_increment(&self) -> f64 {
        match self {
            EngagementType::Save | EngagementType::Like => 1.0,
            EngagementType::ClickThrough => 0.5,
        }
    }

    /// Amount added to each requirement's skill weight, if skills are learned at all.
    pub fn skill_increment(&self) -> Option<f64> {
        match self {
            EngagementType::Save | EngagementType::Like => Some(1.0),
            EngagementType::ClickThrough => None,
        }
    }
}

/// What a learn call did. Only observable through logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnOutcome {
    Applied,
    /// Snapshot had no usable tags or requirements
    NothingToLearn,
    /// User has no preferences document
    NoPreferences,
    /// Store call failed; error already logged
    Failed,
}

/// Delta produced by one engagement. Blank entries are skipped.
pub fn delta_for(engagement_type: EngagementType, snapshot: &ItemSnapshot) -> PreferenceDelta {
    let mut delta = PreferenceDelta::default();

    let interest_amount = engagement_type.interest_increment();
    for tag in snapshot.tags.iter().filter(|t| !t.trim().is_empty()) {
        delta.add_interest(tag, interest_amount);
    }

    if let Some(skill_amount) = engagement_type.skill_increment() {
        for requirement in snapshot.requirements.iter().filter(|r| !r.trim().is_empty()) {
            delta.add_skill(requirement, skill_amount);
        }
    }

    delta
}

#[derive(Clone)]
pub struct PreferenceLearner {
    store: Arc<dyn PreferenceStore>,
    bootstrap_preferences: bool,
}

impl PreferenceLearner {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self {
            store,
            bootstrap_preferences: false,
        }
    }

    /// Create a missing preferences document on first engagement instead of dropping the signal.
    pub fn with_bootstrap(mut self, enabled: bool) -> Self {
        self.bootstrap_preferences = enabled;
        self
    }

    /// Apply one engagement. Never fails to the caller.
    pub async fn learn(
        &self,
        user_id: &str,
        engagement_type: EngagementType,
        snapshot: &ItemSnapshot,
    ) -> LearnOutcome {
        match self.try_learn(user_id, engagement_type, snapshot).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    user_id = user_id,
                    engagement_type = engagement_type.as_str(),
                    error = %e,
                    "Preference update failed"
                );
                LearnOutcome::Failed
            }
        }
    }

    pub async fn learn_from_event(&self, event: &EngagementEvent) -> LearnOutcome {
        self.learn(&event.user_id, event.engagement_type, &event.item_snapshot)
            .await
    }

    async fn try_learn(
        &self,
        user_id: &str,
        engagement_type: EngagementType,
        snapshot: &ItemSnapshot,
    ) -> Result<LearnOutcome> {
        let delta = delta_for(engagement_type, snapshot);
        if delta.is_empty() {
            debug!(user_id = user_id, "Engagement carries no tags or requirements");
            return Ok(LearnOutcome::NothingToLearn);
        }

        if self.store.merge_preferences(user_id, &delta).await? {
            return Ok(self.applied(user_id, engagement_type, &delta));
        }

        if !self.bootstrap_preferences {
            debug!(
                user_id = user_id,
                engagement_type = engagement_type.as_str(),
                "No preferences document, skipping preference update"
            );
            return Ok(LearnOutcome::NoPreferences);
        }

        self.store.create_preferences(user_id).await?;
        if self.store.merge_preferences(user_id, &delta).await? {
            return Ok(self.applied(user_id, engagement_type, &delta));
        }

        warn!(user_id = user_id, "Preferences document missing after bootstrap");
        Ok(LearnOutcome::NoPreferences)
    }

    fn applied(
        &self,
        user_id: &str,
        engagement_type: EngagementType,
        delta: &PreferenceDelta,
    ) -> LearnOutcome {
        debug!(
            user_id = user_id,
            engagement_type = engagement_type.as_str(),
            interests = delta.interests.len(),
            skills = delta.skills.len(),
            "Preferences updated from engagement"
        );
        LearnOutcome::Applied
    }
}

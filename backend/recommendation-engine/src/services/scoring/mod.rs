// ============================================
// Hybrid Scorer (混合打分器)
// ============================================
//
// Maps (item, profile, preferences) to six sub-scores in [0, 100]
// and one weighted combination:
//
// ┌──────────────────┬────────┬──────────────────────────────────────┐
// │ interest_match   │  0.40  │ matched tags / user interests        │
// │ skill_match      │  0.25  │ matched requirements / requirements  │
// │ location_match   │  0.05  │ remote > city > province > country   │
// │ popularity       │  0.15  │ decayed (likes + saves + views) / 10 │
// │ recency          │  0.10  │ step function on age in days         │
// │ explore          │  0.05  │ uniform draw in [0, 100)             │
// └──────────────────┴────────┴──────────────────────────────────────┘
//
// Signal source rule: a preferences document with a non-empty map
// overrides the profile for that signal. Interests and skills are
// resolved independently. Location uses the profile first and falls
// back to the preferences mirror.

use crate::config::{ConfigError, EngineConfig};
use crate::models::{
    ContentItem, LocationData, ScoreBreakdown, ScoredCandidate, UserPreferences, UserProfile,
};
use crate::utils::{age_days, contains_ignore_case, fuzzy_contains};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::HashSet;
use tracing::debug;

const REMOTE_MARKERS: [&str; 3] = ["remote", "virtual", "online"];

/// Weight per sub-score. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub interest_match: f64,
    pub skill_match: f64,
    pub location_match: f64,
    pub popularity: f64,
    pub recency: f64,
    pub explore: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            interest_match: 0.40,
            skill_match: 0.25,
            location_match: 0.05,
            popularity: 0.15,
            recency: 0.10,
            explore: 0.05,
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.interest_match
            + self.skill_match
            + self.location_match
            + self.popularity
            + self.recency
            + self.explore
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let all = [
            ("interest_weight", self.interest_match),
            ("skill_weight", self.skill_match),
            ("location_weight", self.location_match),
            ("popularity_weight", self.popularity),
            ("recency_weight", self.recency),
            ("explore_weight", self.explore),
        ];
        for (key, weight) in all {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidValue {
                    key,
                    reason: format!("must be a non-negative number, got {}", weight),
                });
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::WeightSum(sum));
        }
        Ok(())
    }
}

/// Pure scoring function; the only impurity is the caller-supplied RNG.
#[derive(Debug, Clone)]
pub struct Scorer {
    weights: ScoringWeights,
    decay_rate: f64,
    popularity_scale: f64,
}

impl Default for Scorer {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            weights: config.weights(),
            decay_rate: config.decay_rate,
            popularity_scale: config.popularity_scale,
        }
    }
}

impl Scorer {
    /// Rejects parameters that would push scores outside [0, 100] or make them NaN.
    pub fn new(
        weights: ScoringWeights,
        decay_rate: f64,
        popularity_scale: f64,
    ) -> Result<Self, ConfigError> {
        weights.validate()?;
        if !decay_rate.is_finite() || decay_rate < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "decay_rate",
                reason: format!("must be a non-negative number, got {}", decay_rate),
            });
        }
        if !popularity_scale.is_finite() || popularity_scale <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "popularity_scale",
                reason: format!("must be positive, got {}", popularity_scale),
            });
        }

        Ok(Self {
            weights,
            decay_rate,
            popularity_scale,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        Self::new(config.weights(), config.decay_rate, config.popularity_scale)
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score one item. Missing profile/preferences degrade the affected
    /// sub-scores instead of failing.
    pub fn score<R: Rng>(
        &self,
        item: ContentItem,
        profile: Option<&UserProfile>,
        preferences: Option<&UserPreferences>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> ScoredCandidate {
        let explore = rng.gen_range(0.0..100.0);
        let breakdown = self.breakdown(&item, profile, preferences, now, explore);
        let score = self.combine(&breakdown);

        debug!(
            item_id = %item.id,
            interest = breakdown.interest_match,
            skill = breakdown.skill_match,
            location = breakdown.location_match,
            popularity = breakdown.popularity,
            recency = breakdown.recency,
            explore = breakdown.explore,
            score = score,
            "Candidate scored"
        );

        ScoredCandidate {
            item,
            score,
            score_breakdown: breakdown,
        }
    }

    /// Deterministic part of scoring with an externally drawn explore value.
    pub fn breakdown(
        &self,
        item: &ContentItem,
        profile: Option<&UserProfile>,
        preferences: Option<&UserPreferences>,
        now: DateTime<Utc>,
        explore: f64,
    ) -> ScoreBreakdown {
        let interests = resolve_interests(profile, preferences);
        let skills = resolve_skills(profile, preferences);
        let location = resolve_location(profile, preferences);
        let age = age_days(item.created_at, now);

        ScoreBreakdown {
            interest_match: interest_match(&item.tags, &interests),
            skill_match: skill_match(&item.requirements, &skills),
            location_match: location_match(item.location.as_deref(), location),
            popularity: self.popularity(item.raw_engagement(), age),
            recency: recency(age),
            explore: explore.clamp(0.0, 100.0),
        }
    }

    pub fn combine(&self, b: &ScoreBreakdown) -> f64 {
        let w = &self.weights;
        let score = b.interest_match * w.interest_match
            + b.skill_match * w.skill_match
            + b.location_match * w.location_match
            + b.popularity * w.popularity
            + b.recency * w.recency
            + b.explore * w.explore;
        score.clamp(0.0, 100.0)
    }

    /// raw / (1 + age_days * decay_rate) / scale, capped at 100
    pub fn popularity(&self, raw_engagement: u64, age_days: f64) -> f64 {
        let decayed = raw_engagement as f64 / (1.0 + age_days.max(0.0) * self.decay_rate);
        (decayed / self.popularity_scale).clamp(0.0, 100.0)
    }
}

/// Blank entries dropped, case-insensitive duplicates collapsed, first spelling kept.
fn distinct_non_blank<'a, S>(values: impl IntoIterator<Item = &'a S>) -> Vec<&'a str>
where
    S: AsRef<str> + ?Sized + 'a,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(|v| <S as AsRef<str>>::as_ref(v))
        .filter(|v| {
            let key = v.trim().to_lowercase();
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}

/// Preference keys when the learned map is non-empty, otherwise profile interests.
pub fn resolve_interests<'a>(
    profile: Option<&'a UserProfile>,
    preferences: Option<&'a UserPreferences>,
) -> Vec<&'a str> {
    match preferences {
        Some(prefs) if !prefs.interests.is_empty() => distinct_non_blank(prefs.interests.keys()),
        _ => profile
            .map(|p| distinct_non_blank(&p.interests))
            .unwrap_or_default(),
    }
}

/// Same override rule as [`resolve_interests`], over skills.
pub fn resolve_skills<'a>(
    profile: Option<&'a UserProfile>,
    preferences: Option<&'a UserPreferences>,
) -> Vec<&'a str> {
    match preferences {
        Some(prefs) if !prefs.skills.is_empty() => distinct_non_blank(prefs.skills.keys()),
        _ => profile
            .map(|p| distinct_non_blank(&p.skills))
            .unwrap_or_default(),
    }
}

pub fn resolve_location<'a>(
    profile: Option<&'a UserProfile>,
    preferences: Option<&'a UserPreferences>,
) -> Option<&'a LocationData> {
    profile
        .and_then(|p| p.location_data.as_ref())
        .filter(|l| !l.is_empty())
        .or_else(|| {
            preferences
                .and_then(|p| p.location_data.as_ref())
                .filter(|l| !l.is_empty())
        })
}

/// matched tags / user interests × 100, capped at 100. Both sides are sets.
pub fn interest_match(tags: &[String], interests: &[&str]) -> f64 {
    let tags = distinct_non_blank(tags);
    let interests = distinct_non_blank(interests);
    if tags.is_empty() || interests.is_empty() {
        return 0.0;
    }

    let matched = tags
        .iter()
        .filter(|tag| interests.iter().any(|interest| fuzzy_contains(tag, interest)))
        .count();

    (matched as f64 / interests.len() as f64 * 100.0).min(100.0)
}

/// matched requirements / requirements × 100. Both sides are sets.
pub fn skill_match(requirements: &[String], skills: &[&str]) -> f64 {
    let requirements = distinct_non_blank(requirements);
    let skills = distinct_non_blank(skills);
    if requirements.is_empty() || skills.is_empty() {
        return 0.0;
    }

    let matched = requirements
        .iter()
        .filter(|req| skills.iter().any(|skill| fuzzy_contains(req, skill)))
        .count();

    matched as f64 / requirements.len() as f64 * 100.0
}

/// First matching rule wins.
pub fn location_match(item_location: Option<&str>, user: Option<&LocationData>) -> f64 {
    let Some(user) = user.filter(|l| !l.is_empty()) else {
        return 50.0;
    };
    let item_location = item_location.unwrap_or_default();

    if REMOTE_MARKERS
        .iter()
        .any(|marker| contains_ignore_case(item_location, marker))
    {
        return 100.0;
    }

    let matches = |field: &Option<String>| {
        field
            .as_deref()
            .is_some_and(|value| contains_ignore_case(item_location, value))
    };

    if matches(&user.city) {
        100.0
    } else if matches(&user.province) {
        80.0
    } else if matches(&user.country) {
        60.0
    } else {
        20.0
    }
}

/// Step function; bucket boundaries are inclusive.
pub fn recency(age_days: f64) -> f64 {
    match age_days {
        d if d <= 1.0 => 100.0,
        d if d <= 7.0 => 80.0,
        d if d <= 30.0 => 60.0,
        d if d <= 90.0 => 40.0,
        _ => 20.0,
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The four rankable content domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Opportunity,
    Event,
    Job,
    Resource,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::Opportunity,
        ContentType::Event,
        ContentType::Job,
        ContentType::Resource,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Opportunity => "opportunity",
            ContentType::Event => "event",
            ContentType::Job => "job",
            ContentType::Resource => "resource",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown content type: {0}")]
pub struct UnknownContentType(pub String);

impl FromStr for ContentType {
    type Err = UnknownContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "opportunity" | "opportunities" => Ok(ContentType::Opportunity),
            "event" | "events" => Ok(ContentType::Event),
            "job" | "jobs" => Ok(ContentType::Job),
            "resource" | "resources" => Ok(ContentType::Resource),
            _ => Err(UnknownContentType(s.to_string())),
        }
    }
}

/// Content type filter accepted by the ranking entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedType {
    Only(ContentType),
    All,
}

impl RequestedType {
    /// Content types to fetch, in the fixed order used for tie-breaking.
    pub fn content_types(&self) -> Vec<ContentType> {
        match self {
            RequestedType::Only(content_type) => vec![*content_type],
            RequestedType::All => ContentType::ALL.to_vec(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestedType::Only(content_type) => content_type.as_str(),
            RequestedType::All => "all",
        }
    }
}

impl From<ContentType> for RequestedType {
    fn from(content_type: ContentType) -> Self {
        RequestedType::Only(content_type)
    }
}

impl FromStr for RequestedType {
    type Err = UnknownContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(RequestedType::All);
        }
        s.parse().map(RequestedType::Only)
    }
}

impl fmt::Display for RequestedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one rankable content record.
///
/// Counters are owned by the engagement collaborator; the engine only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ContentType,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub saves_count: u64,
    #[serde(default)]
    pub views: u64,
}

impl ContentItem {
    /// likes + saves + views, saturating
    pub fn raw_engagement(&self) -> u64 {
        self.likes_count
            .saturating_add(self.saves_count)
            .saturating_add(self.views)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationData {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

impl LocationData {
    /// True when none of the fields carries a non-blank value.
    pub fn is_empty(&self) -> bool {
        [&self.country, &self.province, &self.city]
            .iter()
            .all(|field| field.as_deref().map_or(true, |v| v.trim().is_empty()))
    }
}

/// Static onboarding data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub location_data: Option<LocationData>,
}

/// Behavior-derived weight maps. Weights only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub interests: HashMap<String, f64>,
    #[serde(default)]
    pub skills: HashMap<String, f64>,
    #[serde(default)]
    pub location_data: Option<LocationData>,
}

/// Additive update applied to a preferences document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferenceDelta {
    pub interests: HashMap<String, f64>,
    pub skills: HashMap<String, f64>,
}

impl PreferenceDelta {
    pub fn is_empty(&self) -> bool {
        self.interests.is_empty() && self.skills.is_empty()
    }

    pub fn add_interest(&mut self, tag: &str, amount: f64) {
        *self.interests.entry(tag.to_string()).or_insert(0.0) += amount;
    }

    pub fn add_skill(&mut self, requirement: &str, amount: f64) {
        *self.skills.entry(requirement.to_string()).or_insert(0.0) += amount;
    }
}

/// Per-factor scores, each in [0, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub interest_match: f64,
    pub skill_match: f64,
    pub location_match: f64,
    pub popularity: f64,
    pub recency: f64,
    pub explore: f64,
}

/// Item plus its transient score. Lives only for one ranking call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub item: ContentItem,
    pub score: f64,
    pub score_breakdown: ScoreBreakdown,
}

impl ScoredCandidate {
    /// Drops the score fields.
    pub fn into_recommended(self) -> RecommendedItem {
        RecommendedItem::from(self.item)
    }
}

/// Caller-facing result: the item annotated with its originating content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedItem {
    pub content_type: ContentType,
    #[serde(flatten)]
    pub item: ContentItem,
}

impl From<ContentItem> for RecommendedItem {
    fn from(item: ContentItem) -> Self {
        Self {
            content_type: item.kind,
            item,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementType {
    Save,
    Like,
    ClickThrough,
}

impl EngagementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementType::Save => "save",
            EngagementType::Like => "like",
            EngagementType::ClickThrough => "click_through",
        }
    }
}

impl FromStr for EngagementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "save" => Ok(EngagementType::Save),
            "like" => Ok(EngagementType::Like),
            "click_through" | "click-through" | "clickthrough" => Ok(EngagementType::ClickThrough),
            other => Err(format!("Unknown engagement type: {}", other)),
        }
    }
}

/// The parts of an item the learner needs, captured at event time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
}

impl From<&ContentItem> for ItemSnapshot {
    fn from(item: &ContentItem) -> Self {
        Self {
            tags: item.tags.clone(),
            requirements: item.requirements.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementEvent {
    pub user_id: String,
    pub engagement_type: EngagementType,
    pub item_snapshot: ItemSnapshot,
}

//! Cold-start selection
//!
//! Ranks candidates purely by raw engagement (`likes + saves + views`) with no
//! decay, recency or personalization. Used for users with neither a profile nor
//! preferences, and for anonymous trending requests.
//!
//! Ties keep the order in which the content source returned the items.

use crate::models::{ContentItem, RecommendedItem, RequestedType};
use crate::storage::{list_active_for, ContentSource};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct ColdStartSelector {
    content: Arc<dyn ContentSource>,
}

impl ColdStartSelector {
    pub fn new(content: Arc<dyn ContentSource>) -> Self {
        Self { content }
    }

    /// Top `limit` items by raw engagement. Data-access failures yield an empty list.
    pub async fn select(&self, requested: RequestedType, limit: usize) -> Vec<RecommendedItem> {
        let candidates = match list_active_for(self.content.as_ref(), requested).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(
                    content_type = %requested,
                    error = %e,
                    "Cold-start candidate fetch failed, returning empty list"
                );
                return Vec::new();
            }
        };

        let candidate_count = candidates.len();
        let ranked = rank_by_popularity(candidates, limit);

        info!(
            content_type = %requested,
            candidate_count = candidate_count,
            returned = ranked.len(),
            "Cold-start ranking completed"
        );

        ranked
    }
}

/// Stable descending sort on raw engagement, truncated to `limit`.
pub fn rank_by_popularity(items: Vec<ContentItem>, limit: usize) -> Vec<RecommendedItem> {
    let mut scored: Vec<(u64, ContentItem)> = items
        .into_iter()
        .map(|item| (item.raw_engagement(), item))
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));

    scored
        .into_iter()
        .take(limit)
        .map(|(_, item)| RecommendedItem::from(item))
        .collect()
}

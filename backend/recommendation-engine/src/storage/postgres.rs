use super::{ContentSource, Result};
use crate::models::{ContentItem, ContentType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

/// PostgreSQL-backed content source, one table per content type.
pub struct PgContentSource {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct ContentRow {
    id: String,
    tags: Vec<String>,
    requirements: Vec<String>,
    location: Option<String>,
    created_at: DateTime<Utc>,
    likes_count: i64,
    saves_count: i64,
    views: i64,
}

impl ContentRow {
    fn into_item(self, kind: ContentType) -> ContentItem {
        ContentItem {
            id: self.id,
            kind,
            tags: self.tags,
            requirements: self.requirements,
            location: self.location,
            created_at: self.created_at,
            likes_count: self.likes_count.max(0) as u64,
            saves_count: self.saves_count.max(0) as u64,
            views: self.views.max(0) as u64,
        }
    }
}

fn table_name(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Opportunity => "opportunities",
        ContentType::Event => "events",
        ContentType::Job => "jobs",
        ContentType::Resource => "resources",
    }
}

fn list_active_query(content_type: ContentType) -> String {
    format!(
        r#"
        SELECT
            id::text AS id,
            COALESCE(tags, '{{}}') AS tags,
            COALESCE(requirements, '{{}}') AS requirements,
            location,
            created_at,
            COALESCE(likes_count, 0)::bigint AS likes_count,
            COALESCE(saves_count, 0)::bigint AS saves_count,
            COALESCE(views, 0)::bigint AS views
        FROM {}
        WHERE status = 'active'
        "#,
        table_name(content_type)
    )
}

impl PgContentSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentSource for PgContentSource {
    async fn list_active(&self, content_type: ContentType) -> Result<Vec<ContentItem>> {
        let rows = sqlx::query_as::<_, ContentRow>(&list_active_query(content_type))
            .fetch_all(&self.pool)
            .await?;

        debug!(
            content_type = %content_type,
            count = rows.len(),
            "Fetched active content"
        );

        Ok(rows
            .into_iter()
            .map(|row| row.into_item(content_type))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_targets_type_table() {
        let query = list_active_query(ContentType::Opportunity);
        assert!(query.contains("FROM opportunities"));
        assert!(query.contains("WHERE status = 'active'"));
        assert!(query.contains("COALESCE(requirements, '{}')"));
    }

    #[test]
    fn test_negative_counters_clamped() {
        let row = ContentRow {
            id: "1".to_string(),
            tags: vec![],
            requirements: vec![],
            location: None,
            created_at: Utc::now(),
            likes_count: -3,
            saves_count: 2,
            views: 7,
        };
        let item = row.into_item(ContentType::Resource);
        assert_eq!(item.likes_count, 0);
        assert_eq!(item.raw_engagement(), 9);
        assert_eq!(item.kind, ContentType::Resource);
    }
}

use chrono::{Duration, Utc};
use recommendation_engine::models::{
    ContentItem, ContentType, EngagementType, ItemSnapshot, LocationData, RequestedType,
    UserPreferences, UserProfile,
};
use recommendation_engine::services::{ExploreSampler, LearnOutcome};
use recommendation_engine::{EngineConfig, InMemoryStore, RecommendationEngine};
use std::sync::Arc;

fn item(
    id: &str,
    kind: ContentType,
    tags: &[&str],
    requirements: &[&str],
    location: &str,
    age_days: i64,
    views: u64,
) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        kind,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        requirements: requirements.iter().map(|r| r.to_string()).collect(),
        location: Some(location.to_string()),
        created_at: Utc::now() - Duration::days(age_days),
        likes_count: views / 10,
        saves_count: views / 20,
        views,
    }
}

fn seeded_catalog() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.insert_item(item("job-rust", ContentType::Job, &["tech", "backend"], &["rust", "sql"], "Toronto, Ontario", 2, 40));
    store.insert_item(item("job-design", ContentType::Job, &["design"], &["figma"], "Vancouver, BC", 3, 900));
    store.insert_item(item("job-remote", ContentType::Job, &["tech"], &["python"], "Remote - Canada", 40, 120));
    store.insert_item(item("event-hack", ContentType::Event, &["tech", "hackathon"], &[], "Toronto", 0, 15));
    store.insert_item(item("opp-grant", ContentType::Opportunity, &["research"], &[], "Online", 10, 300));
    store.insert_item(item("res-guide", ContentType::Resource, &["career"], &[], "Virtual", 100, 5000));
    store
}

fn engine(store: Arc<InMemoryStore>) -> RecommendationEngine {
    RecommendationEngine::with_sampler(
        store.clone(),
        store,
        EngineConfig::default(),
        ExploreSampler::seeded(2024),
    )
    .unwrap()
}

fn ids(items: &[recommendation_engine::models::RecommendedItem]) -> Vec<String> {
    items.iter().map(|i| i.item.id.clone()).collect()
}

#[tokio::test]
async fn test_unknown_user_gets_cold_start_jobs() {
    let store = seeded_catalog();
    let engine = engine(store);
    let jobs = RequestedType::Only(ContentType::Job);

    let personalized = engine.get_recommendations("stranger", jobs, 10).await;
    let cold_start = engine.get_cold_start_recommendations(jobs, 10).await;

    assert_eq!(ids(&personalized), ids(&cold_start));
    assert_eq!(ids(&cold_start), vec!["job-design", "job-remote", "job-rust"]);
}

#[tokio::test]
async fn test_trending_all_spans_types() {
    let engine = engine(seeded_catalog());

    let trending = engine.get_trending(RequestedType::All, 3).await;
    assert_eq!(ids(&trending), vec!["res-guide", "job-design", "opp-grant"]);
    assert_eq!(trending[0].content_type, ContentType::Resource);
    assert_eq!(trending[1].content_type, ContentType::Job);
}

#[tokio::test]
async fn test_profile_drives_personalized_ranking() {
    let store = seeded_catalog();
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
    let engine = engine(store);

    let ranked = engine
        .get_recommendations("dev", RequestedType::Only(ContentType::Job), 10)
        .await;

    // 技能与城市都匹配的职位排第一，远程职位靠兴趣排第二
    assert_eq!(ids(&ranked), vec!["job-rust", "job-remote", "job-design"]);
    assert!(ranked.iter().all(|i| i.content_type == ContentType::Job));
}

#[tokio::test]
async fn test_results_never_carry_score_fields() {
    let store = seeded_catalog();
    store.insert_profile("dev", UserProfile {
        interests: vec!["tech".to_string()],
        ..Default::default()
    });
    let engine = engine(store);

    let items = engine.get_recommendations("dev", RequestedType::All, 4).await;
    assert_eq!(items.len(), 4);

    let json = serde_json::to_value(&items).unwrap();
    for entry in json.as_array().unwrap() {
        let obj = entry.as_object().unwrap();
        assert!(!obj.contains_key("score"));
        assert!(!obj.contains_key("scoreBreakdown"));
        assert!(obj.contains_key("content_type"));
    }
}

#[tokio::test]
async fn test_learning_shifts_future_rankings() {
    let store = seeded_catalog();
    store.insert_preferences("learner", UserPreferences::default());
    let engine = engine(store.clone());

    let design_job = item("job-design", ContentType::Job, &["design"], &["figma"], "", 0, 0);
    for _ in 0..2 {
        let outcome = engine
            .update_preferences_from_engagement(
                "learner",
                EngagementType::Like,
                &ItemSnapshot::from(&design_job),
            )
            .await;
        assert_eq!(outcome, LearnOutcome::Applied);
    }

    let prefs = store.preferences_snapshot("learner").unwrap();
    assert_eq!(prefs.interests["design"], 2.0);
    assert_eq!(prefs.skills["figma"], 2.0);

    let ranked = engine
        .get_recommendations("learner", RequestedType::Only(ContentType::Job), 10)
        .await;
    assert_eq!(ranked[0].item.id, "job-design");
}

#[tokio::test]
async fn test_learning_without_preferences_is_silent() {
    let store = seeded_catalog();
    let engine = engine(store.clone());

    let outcome = engine
        .update_preferences_from_engagement(
            "nobody",
            EngagementType::Save,
            &ItemSnapshot {
                tags: vec!["tech".to_string()],
                requirements: vec!["rust".to_string()],
            },
        )
        .await;

    assert_eq!(outcome, LearnOutcome::NoPreferences);
    assert!(store.preferences_snapshot("nobody").is_none());
}

#[tokio::test]
async fn test_feed_contains_same_items_as_ranking() {
    let store = seeded_catalog();
    store.insert_profile("dev", UserProfile {
        interests: vec!["tech".to_string()],
        ..Default::default()
    });

    let ranked = engine(store.clone())
        .get_recommendations("dev", RequestedType::All, 4)
        .await;
    let feed = engine(store)
        .get_personalized_feed("dev", RequestedType::All, 4)
        .await;

    let mut ranked_ids = ids(&ranked);
    let mut feed_ids = ids(&feed);
    ranked_ids.sort();
    feed_ids.sort();
    assert_eq!(ranked_ids, feed_ids);
}

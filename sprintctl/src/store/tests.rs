//! Store conformance suite.
//!
//! Each behavior is written once as a generic function over [`Store`] and run
//! against the in-memory backend unconditionally. The same functions run
//! against PostgreSQL under `--features postgres-tests` (requires a database
//! reachable by `#[sqlx::test]`).

use chrono::{Duration, NaiveDate, Utc};
use rstest::{fixture, rstest};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::memory::MemoryStore;
use super::models::*;
use super::{Store, StoreError};
use crate::ai::Provider;

#[cfg(feature = "postgres-tests")]
use super::postgres::PgStore;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_sprint(project_id: Uuid, name: &str, status: SprintStatus, start: NaiveDate) -> SprintCreateRequest {
    SprintCreateRequest {
        project_id,
        name: name.to_string(),
        goal: None,
        status,
        start_date: start,
        end_date: start + Duration::days(13),
        capacity_points: 20,
    }
}

fn sample_story(project_id: Uuid, sprint_id: Option<Uuid>, points: i32, status: StoryStatus) -> StoryCreateRequest {
    StoryCreateRequest {
        project_id,
        sprint_id,
        epic_id: None,
        title: "As a user I can log in".to_string(),
        description: None,
        status,
        priority: StoryPriority::Must,
        points,
        assignee: None,
    }
}

fn sample_log(user_id: Uuid) -> UsageLogCreateRequest {
    UsageLogCreateRequest {
        user_id,
        project_id: None,
        provider: Provider::Openai,
        model: "gpt-4o-mini".to_string(),
        feature: AssistantFeature::Chat,
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
        estimated_cost: Decimal::new(45, 4),
        latency_ms: 120,
        success: true,
        error_message: None,
    }
}

/// Fixture that returns MemoryStore
#[fixture]
fn memory_store() -> MemoryStore {
    MemoryStore::new()
}

async fn run_test_sprint_round_trip<S: Store>(store: &S) {
    let project_id = Uuid::new_v4();
    let created = store
        .create_sprint(&sample_sprint(project_id, "Sprint 1", SprintStatus::Planning, date(2025, 2, 3)))
        .await
        .unwrap();

    let fetched = store.get_sprint(created.id).await.unwrap().expect("sprint should exist");
    assert_eq!(fetched.name, "Sprint 1");
    assert_eq!(fetched.project_id, project_id);
    assert_eq!(fetched.status, SprintStatus::Planning);
    assert_eq!(fetched.capacity_points, 20);

    assert!(store.get_sprint(Uuid::new_v4()).await.unwrap().is_none());
}

#[rstest]
#[tokio::test]
async fn test_sprint_round_trip(memory_store: MemoryStore) {
    run_test_sprint_round_trip(&memory_store).await;
}

#[cfg(feature = "postgres-tests")]
#[sqlx::test]
async fn test_sprint_round_trip_postgres(pool: sqlx::PgPool) {
    run_test_sprint_round_trip(&PgStore::new(pool)).await;
}

async fn run_test_completed_sprints_sorted_ascending<S: Store>(store: &S) {
    let project_id = Uuid::new_v4();
    store
        .create_sprint(&sample_sprint(project_id, "Sprint 3", SprintStatus::Completed, date(2025, 3, 3)))
        .await
        .unwrap();
    store
        .create_sprint(&sample_sprint(project_id, "Sprint 1", SprintStatus::Completed, date(2025, 1, 6)))
        .await
        .unwrap();
    store
        .create_sprint(&sample_sprint(project_id, "Sprint 4", SprintStatus::Active, date(2025, 3, 17)))
        .await
        .unwrap();
    store
        .create_sprint(&sample_sprint(project_id, "Sprint 2", SprintStatus::Completed, date(2025, 2, 3)))
        .await
        .unwrap();
    // Different project is invisible
    store
        .create_sprint(&sample_sprint(Uuid::new_v4(), "Other", SprintStatus::Completed, date(2025, 1, 1)))
        .await
        .unwrap();

    let completed = store.list_completed_sprints(project_id).await.unwrap();
    let names: Vec<&str> = completed.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Sprint 1", "Sprint 2", "Sprint 3"]);

    let all = store.list_sprints(project_id).await.unwrap();
    assert_eq!(all.len(), 4);
}

#[rstest]
#[tokio::test]
async fn test_completed_sprints_sorted_ascending(memory_store: MemoryStore) {
    run_test_completed_sprints_sorted_ascending(&memory_store).await;
}

#[cfg(feature = "postgres-tests")]
#[sqlx::test]
async fn test_completed_sprints_sorted_ascending_postgres(pool: sqlx::PgPool) {
    run_test_completed_sprints_sorted_ascending(&PgStore::new(pool)).await;
}

async fn run_test_story_update_and_listing<S: Store>(store: &S) {
    let project_id = Uuid::new_v4();
    let sprint = store
        .create_sprint(&sample_sprint(project_id, "Sprint 1", SprintStatus::Active, date(2025, 2, 3)))
        .await
        .unwrap();

    let story = store
        .create_story(&sample_story(project_id, Some(sprint.id), 5, StoryStatus::Todo))
        .await
        .unwrap();
    store
        .create_story(&sample_story(project_id, None, 3, StoryStatus::Backlog))
        .await
        .unwrap();

    let in_sprint = store.list_stories_by_sprint(sprint.id).await.unwrap();
    assert_eq!(in_sprint.len(), 1);

    let fetched = store.get_story(story.id).await.unwrap().expect("story should exist");
    assert_eq!(fetched.title, story.title);
    assert!(store.get_story(Uuid::new_v4()).await.unwrap().is_none());

    let update = StoryUpdateRequest {
        status: Some(StoryStatus::Done),
        points: Some(8),
        ..Default::default()
    };
    let updated = store.update_story(story.id, &update).await.unwrap();
    assert_eq!(updated.status, StoryStatus::Done);
    assert_eq!(updated.points, 8);
    // Untouched fields survive
    assert_eq!(updated.sprint_id, Some(sprint.id));
    assert_eq!(updated.title, story.title);

    // Detach from the sprint with an explicit clear
    let detach = StoryUpdateRequest {
        sprint_id: Some(None),
        ..Default::default()
    };
    let detached = store.update_story(story.id, &detach).await.unwrap();
    assert_eq!(detached.sprint_id, None);
    assert!(store.list_stories_by_sprint(sprint.id).await.unwrap().is_empty());

    let err = store.update_story(Uuid::new_v4(), &update).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound));

    assert_eq!(store.list_stories_by_project(project_id).await.unwrap().len(), 2);
}

#[rstest]
#[tokio::test]
async fn test_story_update_and_listing(memory_store: MemoryStore) {
    run_test_story_update_and_listing(&memory_store).await;
}

#[cfg(feature = "postgres-tests")]
#[sqlx::test]
async fn test_story_update_and_listing_postgres(pool: sqlx::PgPool) {
    run_test_story_update_and_listing(&PgStore::new(pool)).await;
}

async fn run_test_epic_round_trip<S: Store>(store: &S) {
    let project_id = Uuid::new_v4();
    let epic = store
        .create_epic(&EpicCreateRequest {
            project_id,
            name: "Checkout".to_string(),
            description: Some("Everything payments".to_string()),
        })
        .await
        .unwrap();

    let mut story = sample_story(project_id, None, 5, StoryStatus::Todo);
    story.epic_id = Some(epic.id);
    store.create_story(&story).await.unwrap();

    let epics = store.list_epics(project_id).await.unwrap();
    assert_eq!(epics.len(), 1);
    assert_eq!(epics[0].name, "Checkout");

    let linked = store.list_stories_by_epic(epic.id).await.unwrap();
    assert_eq!(linked.len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_epic_round_trip(memory_store: MemoryStore) {
    run_test_epic_round_trip(&memory_store).await;
}

#[cfg(feature = "postgres-tests")]
#[sqlx::test]
async fn test_epic_round_trip_postgres(pool: sqlx::PgPool) {
    run_test_epic_round_trip(&PgStore::new(pool)).await;
}

async fn run_test_usage_counter_same_day_accumulates<S: Store>(store: &S) {
    let user_id = Uuid::new_v4();
    let day = date(2025, 6, 2);

    assert!(store.get_usage_counter(user_id).await.unwrap().is_none());

    store.increment_usage_counter(user_id, day).await.unwrap();
    store.increment_usage_counter(user_id, day).await.unwrap();
    store.increment_usage_counter(user_id, day).await.unwrap();

    let counter = store.get_usage_counter(user_id).await.unwrap().expect("counter should exist");
    assert_eq!(counter.day, day);
    assert_eq!(counter.count, 3);
}

#[rstest]
#[tokio::test]
async fn test_usage_counter_same_day_accumulates(memory_store: MemoryStore) {
    run_test_usage_counter_same_day_accumulates(&memory_store).await;
}

#[cfg(feature = "postgres-tests")]
#[sqlx::test]
async fn test_usage_counter_same_day_accumulates_postgres(pool: sqlx::PgPool) {
    run_test_usage_counter_same_day_accumulates(&PgStore::new(pool)).await;
}

async fn run_test_usage_counter_day_rollover_resets_to_one<S: Store>(store: &S) {
    let user_id = Uuid::new_v4();

    store.increment_usage_counter(user_id, date(2025, 6, 2)).await.unwrap();
    store.increment_usage_counter(user_id, date(2025, 6, 2)).await.unwrap();

    // Next day: the stale count is replaced, not accumulated
    store.increment_usage_counter(user_id, date(2025, 6, 3)).await.unwrap();

    let counter = store.get_usage_counter(user_id).await.unwrap().unwrap();
    assert_eq!(counter.day, date(2025, 6, 3));
    assert_eq!(counter.count, 1);
}

#[rstest]
#[tokio::test]
async fn test_usage_counter_day_rollover_resets_to_one(memory_store: MemoryStore) {
    run_test_usage_counter_day_rollover_resets_to_one(&memory_store).await;
}

#[cfg(feature = "postgres-tests")]
#[sqlx::test]
async fn test_usage_counter_day_rollover_resets_to_one_postgres(pool: sqlx::PgPool) {
    run_test_usage_counter_day_rollover_resets_to_one(&PgStore::new(pool)).await;
}

async fn run_test_cache_put_get_overwrite<S: Store>(store: &S) {
    let now = Utc::now();
    let entry = CachedResponse {
        fingerprint: "abc123".to_string(),
        provider: Provider::Anthropic,
        model: "claude-3-5-haiku-latest".to_string(),
        response_text: "first".to_string(),
        token_count: 7,
        created_at: now,
        expires_at: now + Duration::hours(24),
    };

    assert!(store.get_cached_response("abc123").await.unwrap().is_none());

    store.put_cached_response(&entry).await.unwrap();
    let fetched = store.get_cached_response("abc123").await.unwrap().unwrap();
    assert_eq!(fetched.response_text, "first");
    assert_eq!(fetched.token_count, 7);

    let replacement = CachedResponse {
        response_text: "second".to_string(),
        token_count: 9,
        ..entry
    };
    store.put_cached_response(&replacement).await.unwrap();
    let fetched = store.get_cached_response("abc123").await.unwrap().unwrap();
    assert_eq!(fetched.response_text, "second");
    assert_eq!(fetched.token_count, 9);
}

#[rstest]
#[tokio::test]
async fn test_cache_put_get_overwrite(memory_store: MemoryStore) {
    run_test_cache_put_get_overwrite(&memory_store).await;
}

#[cfg(feature = "postgres-tests")]
#[sqlx::test]
async fn test_cache_put_get_overwrite_postgres(pool: sqlx::PgPool) {
    run_test_cache_put_get_overwrite(&PgStore::new(pool)).await;
}

async fn run_test_usage_log_listing_and_filters<S: Store>(store: &S) {
    let user_id = Uuid::new_v4();
    let other_user = Uuid::new_v4();
    let project_id = Uuid::new_v4();

    let mut with_project = sample_log(user_id);
    with_project.project_id = Some(project_id);
    store.append_usage_log(&with_project).await.unwrap();

    let mut failed = sample_log(user_id);
    failed.success = false;
    failed.error_message = Some("provider timeout".to_string());
    store.append_usage_log(&failed).await.unwrap();

    store.append_usage_log(&sample_log(other_user)).await.unwrap();

    let all = store
        .list_usage_logs(&UsageLogFilter::new(user_id, None, 0, 10))
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    // Newest first: the failed entry was appended last
    assert!(!all[0].success);
    assert_eq!(all[0].error_message.as_deref(), Some("provider timeout"));

    let scoped = store
        .list_usage_logs(&UsageLogFilter::new(user_id, Some(project_id), 0, 10))
        .await
        .unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].project_id, Some(project_id));

    let paged = store
        .list_usage_logs(&UsageLogFilter::new(user_id, None, 1, 10))
        .await
        .unwrap();
    assert_eq!(paged.len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_usage_log_listing_and_filters(memory_store: MemoryStore) {
    run_test_usage_log_listing_and_filters(&memory_store).await;
}

#[cfg(feature = "postgres-tests")]
#[sqlx::test]
async fn test_usage_log_listing_and_filters_postgres(pool: sqlx::PgPool) {
    run_test_usage_log_listing_and_filters(&PgStore::new(pool)).await;
}

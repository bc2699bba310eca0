use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::kernel::Plugin;
use crate::plugins::auth::issue_token;
use crate::plugins::communication::stories::clock::ManualClock;
use crate::plugins::communication::stories::error::StoryError;
use crate::plugins::communication::stories::manager::StoryManager;
use crate::plugins::communication::stories::media::LocalMediaStore;
use crate::plugins::communication::stories::memory::InMemoryStoryStore;
use crate::plugins::communication::stories::models::{
    FileDescriptor, MediaKind, OwnerStorySummary, RecordViewOutcome, Story, StoryStatistics, StoryViewer,
    TransferStatus, Visibility,
};
use crate::plugins::communication::stories::plugin::StoriesPlugin;
use crate::plugins::communication::stories::policy::{StoryAccessPolicy, VisibilityPolicy};
use crate::plugins::communication::stories::repo::{DynStoryStore, StoryStore};
use crate::plugins::communication::stories::service::{StoryLifecycle, StoryLifecycleService};

const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, 0x49, 0x48, 0x44, 0x52];
const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01];
const PREFIX: &str = "/uploads/stories";
const OWNER: i64 = 1;
const VIEWER: i64 = 2;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).unwrap()
}

struct Harness {
    clock: Arc<ManualClock>,
    store: Arc<InMemoryStoryStore>,
    service: Arc<StoryLifecycleService>,
    tmp: TempDir,
}

impl Harness {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(t0()));
        let store = Arc::new(InMemoryStoryStore::new(clock.clone()));
        store.register_user(OWNER, "ada", Some("/avatars/ada.png".to_string()));
        store.register_user(VIEWER, "bob", None);
        let media = LocalMediaStore::new(tmp.path().join("media"), PREFIX).into_arc();
        let service = Arc::new(StoryLifecycleService::new(
            store.clone() as DynStoryStore,
            media,
            VisibilityPolicy::new(clock.clone()).into_arc(),
        ));
        Self { clock, store, service, tmp }
    }

    /// A service over `store` sharing this harness's media root and clock.
    fn service_over(&self, store: DynStoryStore) -> StoryLifecycleService {
        StoryLifecycleService::new(
            store,
            LocalMediaStore::new(self.media_root(), PREFIX).into_arc(),
            VisibilityPolicy::new(self.clock.clone()).into_arc(),
        )
    }

    fn manager(&self) -> StoryManager {
        StoryManager::new(self.service.clone())
    }

    fn media_root(&self) -> PathBuf {
        self.tmp.path().join("media")
    }

    fn stage(&self, name: &str, bytes: &[u8], declared: &str) -> FileDescriptor {
        let staged_path = self.tmp.path().join(format!("{}.upload", uuid::Uuid::new_v4()));
        std::fs::write(&staged_path, bytes).unwrap();
        FileDescriptor {
            original_name: name.to_string(),
            declared_content_type: Some(declared.to_string()),
            size: bytes.len() as u64,
            staged_path,
            status: TransferStatus::Complete,
        }
    }

    /// Uploads one PNG for `owner` and returns the new story id.
    async fn post_png(&self, owner: i64) -> i64 {
        let file = self.stage("photo.png", PNG, "image/png");
        let batch = self.service.upload_batch(owner, &[file], Visibility::Public).await.unwrap();
        assert_eq!(batch.uploaded_count, 1, "{:?}", batch.errors);
        batch.uploaded_stories[0].id
    }
}

/// Delegates to the in-memory store but cannot write views and cannot delete `broken_id`.
struct FaultyStore {
    inner: Arc<InMemoryStoryStore>,
    broken_id: i64,
}

#[async_trait]
impl StoryStore for FaultyStore {
    async fn create(&self, owner_id: i64, media_ref: &str, visibility: Visibility) -> Result<Story, StoryError> {
        self.inner.create(owner_id, media_ref, visibility).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Story>, StoryError> {
        self.inner.get_by_id(id).await
    }

    async fn list_active_by_owner(&self, owner_id: i64) -> Result<Vec<Story>, StoryError> {
        self.inner.list_active_by_owner(owner_id).await
    }

    async fn list_active_grouped_by_owner(&self, viewer_id: i64) -> Result<Vec<OwnerStorySummary>, StoryError> {
        self.inner.list_active_grouped_by_owner(viewer_id).await
    }

    async fn record_view(&self, _story_id: i64, _viewer_id: i64) -> Result<RecordViewOutcome, StoryError> {
        Err(StoryError::Persistence("story_views is read-only".to_string()))
    }

    async fn list_viewers(&self, story_id: i64) -> Result<Vec<StoryViewer>, StoryError> {
        self.inner.list_viewers(story_id).await
    }

    async fn count_views(&self, story_id: i64) -> Result<i64, StoryError> {
        self.inner.count_views(story_id).await
    }

    async fn has_viewed(&self, story_id: i64, viewer_id: i64) -> Result<bool, StoryError> {
        self.inner.has_viewed(story_id, viewer_id).await
    }

    async fn list_expired(&self) -> Result<Vec<Story>, StoryError> {
        self.inner.list_expired().await
    }

    async fn delete(&self, story_id: i64) -> Result<bool, StoryError> {
        if story_id == self.broken_id {
            return Err(StoryError::Persistence(format!("row {} is locked", story_id)));
        }
        self.inner.delete(story_id).await
    }

    async fn aggregate_statistics(&self) -> Result<StoryStatistics, StoryError> {
        self.inner.aggregate_statistics().await
    }
}

fn stored_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn batch_stories_get_distinct_ordered_timestamps() {
    let h = Harness::new();
    let files: Vec<_> = (0..4).map(|i| h.stage(&format!("p{}.png", i), PNG, "image/png")).collect();

    let batch = h.service.upload_batch(OWNER, &files, Visibility::Public).await.unwrap();
    assert!(batch.success);
    assert_eq!(batch.uploaded_count, 4);

    let listed = h.store.list_active_by_owner(OWNER).await.unwrap();
    let uploaded_ids: Vec<i64> = batch.uploaded_stories.iter().map(|s| s.id).collect();
    let listed_ids: Vec<i64> = listed.iter().map(|s| s.id).collect();
    assert_eq!(listed_ids, uploaded_ids);
    for pair in listed.windows(2) {
        assert!(pair[0].created_at < pair[1].created_at);
    }
    for s in &listed {
        assert_eq!(s.expires_at - s.created_at, Duration::hours(24));
        assert_eq!(s.owner.name, "ada");
    }
    assert_eq!(stored_files(&h.media_root()), 4);
}

#[tokio::test]
async fn owner_viewing_own_story_records_nothing() {
    let h = Harness::new();
    let id = h.post_png(OWNER).await;

    let view = h.service.view_story(id, OWNER).await.unwrap();
    assert_eq!(view.story.id, id);
    assert_eq!(h.store.count_views(id).await.unwrap(), 0);
    assert_eq!(h.store.view_row_count(), 0);
    assert!(!h.store.has_viewed(id, OWNER).await.unwrap());
}

#[tokio::test]
async fn repeated_view_keeps_one_row_and_refreshes_timestamp() {
    let h = Harness::new();
    let id = h.post_png(OWNER).await;

    h.service.view_story(id, VIEWER).await.unwrap();
    let first = h.store.list_viewers(id).await.unwrap()[0].viewed_at;
    h.clock.advance(Duration::minutes(5));
    h.service.view_story(id, VIEWER).await.unwrap();

    assert_eq!(h.store.view_row_count(), 1);
    let viewers = h.store.list_viewers(id).await.unwrap();
    assert_eq!(viewers.len(), 1);
    assert_eq!(viewers[0].user_id, VIEWER);
    assert_eq!(viewers[0].user.name, "bob");
    assert!(viewers[0].viewed_at > first);
    assert_eq!(viewers[0].viewed_at, t0() + Duration::minutes(5));
}

#[tokio::test]
async fn expired_story_is_invisible_until_swept() {
    let h = Harness::new();
    let id = h.post_png(OWNER).await;
    let story = h.store.get_by_id(id).await.unwrap().unwrap();

    h.clock.set(story.expires_at);
    assert!(h.store.get_by_id(id).await.unwrap().is_none());
    assert!(h.store.list_active_by_owner(OWNER).await.unwrap().is_empty());
    assert!(h.store.list_active_grouped_by_owner(VIEWER).await.unwrap().is_empty());
    assert!(!VisibilityPolicy::new(h.clock.clone()).can_access(Some(&story), OWNER));
    assert_eq!(h.store.record_view(id, VIEWER).await.unwrap(), RecordViewOutcome::NotFound);

    assert_eq!(h.store.story_row_count(), 1);
    let stats = h.service.statistics().await.unwrap();
    assert_eq!((stats.active_count, stats.expired_count), (0, 1));
}

#[tokio::test]
async fn one_bad_file_does_not_sink_the_batch() {
    let h = Harness::new();
    let files = vec![
        h.stage("a.png", PNG, "image/png"),
        // claims jpeg, is png
        h.stage("b.jpg", PNG, "image/jpeg"),
        h.stage("c.jpg", JPEG, "image/jpeg"),
    ];

    let batch = h.service.upload_batch(OWNER, &files, Visibility::Friends).await.unwrap();
    assert!(batch.success);
    assert_eq!(batch.uploaded_count, 2);
    assert_eq!(batch.error_count, 1);
    assert_eq!(batch.errors[0].file_name, "b.jpg");
    assert_eq!(batch.errors[0].code, "type_mismatch");

    for s in &batch.uploaded_stories {
        let stored = h.store.get_by_id(s.id).await.unwrap().unwrap();
        assert_eq!(stored.visibility, Visibility::Friends);
        assert_eq!(&stored, s);
    }
    assert_eq!(stored_files(&h.media_root()), 2);
}

#[tokio::test]
async fn sweep_is_idempotent_and_spares_active_stories() {
    let h = Harness::new();
    let old = h.post_png(OWNER).await;
    h.clock.advance(Duration::hours(20));
    let fresh = h.post_png(VIEWER).await;
    h.service.view_story(old, VIEWER).await.unwrap();
    h.clock.advance(Duration::hours(5));

    let first = h.service.sweep_expired().await.unwrap();
    assert_eq!(first.deleted_count, 1);
    assert_eq!(first.deleted_file_count, 1);
    assert_eq!(h.store.story_row_count(), 1);
    assert_eq!(h.store.view_row_count(), 0);
    assert_eq!(stored_files(&h.media_root()), 1);

    let second = h.service.sweep_expired().await.unwrap();
    assert_eq!(second.deleted_count, 0);
    assert_eq!(second.deleted_file_count, 0);
    assert!(h.store.get_by_id(fresh).await.unwrap().is_some());
}

#[tokio::test]
async fn sweep_counts_missing_file_as_removed() {
    let h = Harness::new();
    let id = h.post_png(OWNER).await;
    for entry in std::fs::read_dir(h.media_root()).unwrap() {
        std::fs::remove_file(entry.unwrap().path()).unwrap();
    }
    h.clock.advance(Duration::hours(25));

    let sweep = h.service.sweep_expired().await.unwrap();
    assert_eq!((sweep.deleted_count, sweep.deleted_file_count), (1, 1));
    assert!(h.store.get_by_id(id).await.unwrap().is_none());
}

#[tokio::test]
async fn only_the_owner_sees_viewers() {
    let h = Harness::new();
    let id = h.post_png(OWNER).await;
    h.service.view_story(id, VIEWER).await.unwrap();

    let err = h.service.list_viewers(id, VIEWER).await.unwrap_err();
    assert_eq!(err, StoryError::Unauthorized);

    let envelope = h.manager().viewers(Some(id), Some(VIEWER)).await;
    assert!(!envelope.success);
    assert_eq!(envelope.status, StatusCode::FORBIDDEN);
    assert_eq!(envelope.code.as_deref(), Some("unauthorized"));
    assert!(envelope.data.viewers.is_empty());
    assert_eq!(envelope.data.view_count, 0);

    let envelope = h.manager().viewers(Some(id), Some(OWNER)).await;
    assert!(envelope.success);
    assert_eq!(envelope.data.view_count, 1);
    assert_eq!(envelope.data.viewers[0].user_id, VIEWER);
}

#[tokio::test]
async fn story_expires_exactly_after_a_day() {
    let h = Harness::new();
    let id = h.post_png(OWNER).await;

    h.clock.set(t0() + Duration::hours(23) + Duration::minutes(59));
    assert!(h.store.get_by_id(id).await.unwrap().is_some());
    assert!(h.service.view_story(id, VIEWER).await.is_ok());

    h.clock.set(t0() + Duration::hours(24) + Duration::seconds(1));
    assert!(h.store.get_by_id(id).await.unwrap().is_none());
    assert_eq!(h.service.view_story(id, VIEWER).await.unwrap_err(), StoryError::NotFound);
}

#[tokio::test]
async fn failed_insert_removes_persisted_media() {
    let h = Harness::new();
    // 99 owns nothing in the user table, so the insert fails after the file is stored
    let file = h.stage("a.png", PNG, "image/png");
    let batch = h.service.upload_batch(99, &[file], Visibility::Public).await.unwrap();

    assert!(!batch.success);
    assert_eq!(batch.error_count, 1);
    assert_eq!(batch.errors[0].code, "persistence_error");
    assert_eq!(stored_files(&h.media_root()), 0);
    assert_eq!(h.store.story_row_count(), 0);
}

#[tokio::test]
async fn batch_level_input_errors() {
    let h = Harness::new();
    let file = h.stage("a.png", PNG, "image/png");
    assert_eq!(
        h.service.upload_batch(0, &[file.clone()], Visibility::Public).await.unwrap_err(),
        StoryError::InvalidOwner
    );
    assert_eq!(
        h.service.upload_batch(OWNER, &[], Visibility::Public).await.unwrap_err(),
        StoryError::NoFilesProvided
    );

    let m = h.manager();
    let env = m.upload(None, &[file.clone()], None).await;
    assert_eq!(env.code.as_deref(), Some("invalid_owner"));
    assert_eq!(env.status, StatusCode::BAD_REQUEST);

    let env = m.upload(Some(OWNER), &[file], Some("everyone")).await;
    assert_eq!(env.code.as_deref(), Some("invalid_input"));

    let env = m.view(None, Some(VIEWER)).await;
    assert_eq!(env.code.as_deref(), Some("invalid_input"));
    assert!(env.data.story.is_none());
}

#[tokio::test]
async fn all_failed_batch_is_reported_as_failure() {
    let h = Harness::new();
    let mut partial = h.stage("a.png", PNG, "image/png");
    partial.status = TransferStatus::Partial;
    let text = h.stage("notes.txt", b"hello there", "text/plain");

    let env = h.manager().upload(Some(OWNER), &[partial, text], None).await;
    assert!(!env.success);
    assert_eq!(env.status, StatusCode::BAD_REQUEST);
    assert_eq!(env.code.as_deref(), Some("upload_failed"));
    assert_eq!(env.data.error_count, 2);
    assert!(env.data.errors.iter().all(|e| e.code == "invalid_upload"));
}

#[tokio::test]
async fn view_reports_position_among_siblings() {
    let h = Harness::new();
    let a = h.post_png(OWNER).await;
    let b = h.post_png(OWNER).await;
    let c = h.post_png(OWNER).await;

    let env = h.manager().view(Some(b), Some(VIEWER)).await;
    assert!(env.success);
    assert_eq!(env.data.current_index, 1);
    assert_eq!(env.data.total, 3);
    assert_eq!(env.data.previous_story_id, Some(a));
    assert_eq!(env.data.next_story_id, Some(c));
    let card = env.data.story.unwrap();
    assert_eq!(card.media_type, MediaKind::Image);
    assert!(card.viewed);

    let env = h.manager().view(Some(12345), Some(VIEWER)).await;
    assert_eq!(env.status, StatusCode::NOT_FOUND);
    assert_eq!(env.code.as_deref(), Some("not_found"));
}

#[tokio::test]
async fn feed_and_user_stories_track_what_the_viewer_has_seen() {
    let h = Harness::new();
    let first = h.post_png(OWNER).await;
    h.clock.advance(Duration::minutes(1));
    let second = h.post_png(OWNER).await;
    h.clock.advance(Duration::minutes(1));
    h.post_png(VIEWER).await;
    h.service.view_story(first, VIEWER).await.unwrap();

    let feed = h.service.feed(VIEWER).await.unwrap();
    assert_eq!(feed.len(), 2);
    // the viewer posted last, so they lead the tray
    assert_eq!(feed[0].owner_id, VIEWER);
    let ada = &feed[1];
    assert_eq!(ada.owner.name, "ada");
    assert_eq!((ada.story_count, ada.viewed_count, ada.total_count), (2, 1, 2));

    let cards = h.service.user_stories(OWNER, VIEWER).await.unwrap();
    let seen: Vec<(i64, bool)> = cards.iter().map(|c| (c.story.id, c.viewed)).collect();
    assert_eq!(seen, vec![(first, true), (second, false)]);
}

#[tokio::test]
async fn delete_is_owner_only_and_removes_media() {
    let h = Harness::new();
    let id = h.post_png(OWNER).await;
    h.service.view_story(id, VIEWER).await.unwrap();

    let env = h.manager().delete(Some(id), Some(VIEWER)).await;
    assert_eq!(env.code.as_deref(), Some("unauthorized"));
    assert_eq!(h.store.story_row_count(), 1);

    let env = h.manager().delete(Some(id), Some(OWNER)).await;
    assert!(env.success);
    assert_eq!(env.data.story_id, id);
    assert_eq!(h.store.story_row_count(), 0);
    assert_eq!(h.store.view_row_count(), 0);
    assert_eq!(stored_files(&h.media_root()), 0);
}

#[tokio::test]
async fn cleanup_envelope_carries_counts() {
    let h = Harness::new();
    h.post_png(OWNER).await;
    h.clock.advance(Duration::days(2));
    let env = h.manager().cleanup().await;
    assert!(env.success);
    assert_eq!(env.data.deleted_count, 1);
    assert_eq!(env.data.deleted_file_count, 1);
}

fn multipart_body(boundary: &str, file_name: &str, content_type: &str, bytes: &[u8], visibility: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            file_name, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"visibility\"\r\n\r\n");
    body.extend_from_slice(visibility.as_bytes());
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[tokio::test]
async fn http_upload_then_view() {
    let h = Harness::new();
    let staging = h.tmp.path().join("staging");
    let plugin = StoriesPlugin::new(h.manager().into_arc(), &staging, "stories-test-secret");
    let app = plugin.router().await;
    let token = issue_token("stories-test-secret", OWNER, Duration::hours(1)).unwrap();

    let boundary = "storyboundary";
    let req = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(multipart_body(boundary, "pic.png", "image/png", PNG, "friends")))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["uploadedCount"], 1);
    let story = &body["uploadedStories"][0];
    assert_eq!(story["visibility"], "friends");
    assert_eq!(story["mediaType"], "image");
    assert!(story["mediaRef"].as_str().unwrap().starts_with("/uploads/stories/1_"));
    let id = story["id"].as_i64().unwrap();
    // staged payloads never outlive the request
    assert_eq!(stored_files(&staging), 0);

    let viewer_token = issue_token("stories-test-secret", VIEWER, Duration::hours(1)).unwrap();
    let req = Request::builder()
        .uri(format!("/{}", id))
        .header("authorization", format!("Bearer {}", viewer_token))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(h.store.view_row_count(), 1);

    let req = Request::builder().uri("/stats").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["activeCount"], 1);

    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn view_succeeds_when_view_tracking_fails() {
    let h = Harness::new();
    let id = h.post_png(OWNER).await;
    let faulty = FaultyStore { inner: h.store.clone(), broken_id: 0 };
    let manager = StoryManager::new(Arc::new(h.service_over(Arc::new(faulty))));

    let env = manager.view(Some(id), Some(VIEWER)).await;
    assert!(env.success);
    assert_eq!(env.data.story.as_ref().map(|c| c.story.id), Some(id));
    assert!(!env.data.story.unwrap().viewed);
    assert_eq!(h.store.view_row_count(), 0);
}

#[tokio::test]
async fn sweep_continues_past_a_failed_delete() {
    let h = Harness::new();
    let ids = vec![h.post_png(OWNER).await, h.post_png(OWNER).await, h.post_png(VIEWER).await];
    h.clock.advance(Duration::hours(25));
    let faulty = FaultyStore { inner: h.store.clone(), broken_id: ids[1] };
    let service = h.service_over(Arc::new(faulty));

    let sweep = service.sweep_expired().await.unwrap();
    assert_eq!(sweep.deleted_count, 2);
    // media goes first, so all three files are gone
    assert_eq!(sweep.deleted_file_count, 3);
    assert_eq!(h.store.story_row_count(), 1);
    assert_eq!(h.store.list_expired().await.unwrap()[0].id, ids[1]);
    assert_eq!(stored_files(&h.media_root()), 0);
}

#[tokio::test]
async fn viewed_flag_follows_what_was_recorded() {
    let h = Harness::new();
    let id = h.post_png(OWNER).await;

    let own = h.manager().view(Some(id), Some(OWNER)).await;
    assert!(!own.data.story.unwrap().viewed);
    assert_eq!(h.store.view_row_count(), 0);

    let other = h.manager().view(Some(id), Some(VIEWER)).await;
    assert!(other.data.story.unwrap().viewed);
    assert_eq!(h.store.view_row_count(), 1);
}

#[tokio::test]
async fn http_upload_without_multipart_body_gets_envelope() {
    let h = Harness::new();
    let plugin = StoriesPlugin::new(h.manager().into_arc(), h.tmp.path().join("staging"), "stories-test-secret");
    let app = plugin.router().await;
    let token = issue_token("stories-test-secret", OWNER, Duration::hours(1)).unwrap();

    let req = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from("{\"files\": []}"))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "invalid_input");
    assert_eq!(h.store.story_row_count(), 0);
}

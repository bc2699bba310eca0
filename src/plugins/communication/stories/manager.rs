use axum::http::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::http_error::story_status;
use crate::plugins::communication::shared::Envelope;
use crate::plugins::communication::stories::error::StoryError;
use crate::plugins::communication::stories::media::classify;
use crate::plugins::communication::stories::models::{
    FileDescriptor, OwnerStorySummary, Story, StoryCard, StoryStatistics, UploadFailure, ViewersResult, Visibility,
};
use crate::plugins::communication::stories::service::DynStoryLifecycle;

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UploadPayload {
    pub uploaded_count: usize,
    pub error_count: usize,
    pub errors: Vec<UploadFailure>,
    pub uploaded_stories: Vec<StoryCard>,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ViewPayload {
    pub story: Option<StoryCard>,
    pub stories: Vec<Story>,
    pub current_index: usize,
    pub total: usize,
    pub previous_story_id: Option<i64>,
    pub next_story_id: Option<i64>,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CleanupPayload {
    pub deleted_count: usize,
    pub deleted_file_count: usize,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FeedPayload {
    pub owners: Vec<OwnerStorySummary>,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserStoriesPayload {
    pub owner_id: i64,
    pub stories: Vec<StoryCard>,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeletePayload {
    pub story_id: i64,
}

fn card(story: Story, viewed: bool) -> StoryCard {
    let media_type = classify(&story.media_ref);
    StoryCard { story, media_type, viewed }
}

/// Converts a failed operation into the uniform failure envelope.
pub fn error_envelope<T: Default>(e: StoryError) -> Envelope<T> {
    if matches!(e, StoryError::Persistence(_) | StoryError::StorageWrite(_)) {
        error!("story operation failed: {}", e);
    }
    Envelope::failure(story_status(&e), e.code(), e.to_string(), T::default())
}

fn required(value: Option<i64>, field: &str) -> Result<i64, StoryError> {
    value.ok_or_else(|| StoryError::InvalidInput(format!("{} is required", field)))
}

fn required_pair(a: (Option<i64>, &str), b: (Option<i64>, &str)) -> Result<(i64, i64), StoryError> {
    Ok((required(a.0, a.1)?, required(b.0, b.1)?))
}

/// Request-facing façade: checks that inputs are present, calls the lifecycle service
/// and shapes the results into envelopes. Holds no business rules.
pub struct StoryManager {
    lifecycle: DynStoryLifecycle,
}

impl StoryManager {
    pub fn new(lifecycle: DynStoryLifecycle) -> Self {
        Self { lifecycle }
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub async fn upload(
        &self,
        owner_id: Option<i64>,
        files: &[FileDescriptor],
        visibility: Option<&str>,
    ) -> Envelope<UploadPayload> {
        let Some(owner_id) = owner_id else {
            return error_envelope(StoryError::InvalidOwner);
        };
        let visibility = match visibility.map(str::parse::<Visibility>).transpose() {
            Ok(v) => v.unwrap_or_default(),
            Err(e) => return error_envelope(e),
        };
        match self.lifecycle.upload_batch(owner_id, files, visibility).await {
            Ok(batch) => {
                let payload = UploadPayload {
                    uploaded_count: batch.uploaded_count,
                    error_count: batch.error_count,
                    errors: batch.errors,
                    uploaded_stories: batch.uploaded_stories.into_iter().map(|s| card(s, false)).collect(),
                };
                if batch.success {
                    Envelope::ok(batch.message, payload)
                } else {
                    Envelope::failure(StatusCode::BAD_REQUEST, "upload_failed", batch.message, payload)
                }
            }
            Err(e) => error_envelope(e),
        }
    }

    pub async fn view(&self, story_id: Option<i64>, viewer_id: Option<i64>) -> Envelope<ViewPayload> {
        let ids = required_pair((story_id, "storyId"), (viewer_id, "viewerId"));
        let (story_id, viewer_id) = match ids {
            Ok(ids) => ids,
            Err(e) => return error_envelope(e),
        };
        match self.lifecycle.view_story(story_id, viewer_id).await {
            Ok(view) => {
                let idx = view.current_index;
                let previous_story_id = idx.checked_sub(1).and_then(|i| view.sibling_stories.get(i)).map(|s| s.id);
                let next_story_id = view.sibling_stories.get(idx + 1).map(|s| s.id);
                let total = view.sibling_stories.len();
                let payload = ViewPayload {
                    story: Some(card(view.story, view.viewed)),
                    stories: view.sibling_stories,
                    current_index: idx,
                    total,
                    previous_story_id,
                    next_story_id,
                };
                Envelope::ok("story loaded", payload)
            }
            Err(e) => error_envelope(e),
        }
    }

    pub async fn viewers(&self, story_id: Option<i64>, requester_id: Option<i64>) -> Envelope<ViewersResult> {
        let ids = required_pair((story_id, "storyId"), (requester_id, "requesterId"));
        let (story_id, requester_id) = match ids {
            Ok(ids) => ids,
            Err(e) => return error_envelope(e),
        };
        match self.lifecycle.list_viewers(story_id, requester_id).await {
            Ok(result) => Envelope::ok(format!("{} view(s)", result.view_count), result),
            Err(e) => error_envelope(e),
        }
    }

    pub async fn cleanup(&self) -> Envelope<CleanupPayload> {
        match self.lifecycle.sweep_expired().await {
            Ok(sweep) => Envelope::ok(
                sweep.message,
                CleanupPayload { deleted_count: sweep.deleted_count, deleted_file_count: sweep.deleted_file_count },
            ),
            Err(e) => error_envelope(e),
        }
    }

    pub async fn statistics(&self) -> Envelope<StoryStatistics> {
        match self.lifecycle.statistics().await {
            Ok(stats) => Envelope::ok("statistics", stats),
            Err(e) => error_envelope(e),
        }
    }

    pub async fn feed(&self, viewer_id: Option<i64>) -> Envelope<FeedPayload> {
        let viewer_id = match required(viewer_id, "viewerId") {
            Ok(v) => v,
            Err(e) => return error_envelope(e),
        };
        match self.lifecycle.feed(viewer_id).await {
            Ok(owners) => Envelope::ok(format!("{} owner(s) with active stories", owners.len()), FeedPayload { owners }),
            Err(e) => error_envelope(e),
        }
    }

    pub async fn user_stories(&self, owner_id: Option<i64>, viewer_id: Option<i64>) -> Envelope<UserStoriesPayload> {
        let ids = required_pair((owner_id, "ownerId"), (viewer_id, "viewerId"));
        let (owner_id, viewer_id) = match ids {
            Ok(ids) => ids,
            Err(e) => return error_envelope(e),
        };
        match self.lifecycle.user_stories(owner_id, viewer_id).await {
            Ok(stories) => Envelope::ok(
                format!("{} active story(ies)", stories.len()),
                UserStoriesPayload { owner_id, stories },
            ),
            Err(e) => error_envelope(e),
        }
    }

    pub async fn delete(&self, story_id: Option<i64>, requester_id: Option<i64>) -> Envelope<DeletePayload> {
        let ids = required_pair((story_id, "storyId"), (requester_id, "requesterId"));
        let (story_id, requester_id) = match ids {
            Ok(ids) => ids,
            Err(e) => return error_envelope(e),
        };
        match self.lifecycle.delete_story(story_id, requester_id).await {
            Ok(()) => Envelope::ok("story deleted", DeletePayload { story_id }),
            Err(e) => error_envelope(e),
        }
    }
}

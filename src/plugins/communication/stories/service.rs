use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::plugins::communication::stories::error::StoryError;
use crate::plugins::communication::stories::media::DynMediaStore;
use crate::plugins::communication::stories::models::{
    BatchResult, FileDescriptor, OwnerStorySummary, RecordViewOutcome, Story, StoryCard, StoryStatistics,
    SweepResult, UploadFailure, ViewResult, ViewersResult, Visibility,
};
use crate::plugins::communication::stories::policy::DynAccessPolicy;
use crate::plugins::communication::stories::repo::DynStoryStore;
use crate::plugins::metrics::StoryMetrics;

#[async_trait]
pub trait StoryLifecycle: Send + Sync + 'static {
    async fn upload_batch(
        &self,
        owner_id: i64,
        files: &[FileDescriptor],
        visibility: Visibility,
    ) -> Result<BatchResult, StoryError>;

    async fn view_story(&self, story_id: i64, viewer_id: i64) -> Result<ViewResult, StoryError>;

    async fn list_viewers(&self, story_id: i64, requester_id: i64) -> Result<ViewersResult, StoryError>;

    async fn sweep_expired(&self) -> Result<SweepResult, StoryError>;

    async fn statistics(&self) -> Result<StoryStatistics, StoryError>;

    async fn feed(&self, viewer_id: i64) -> Result<Vec<OwnerStorySummary>, StoryError>;

    async fn user_stories(&self, owner_id: i64, viewer_id: i64) -> Result<Vec<StoryCard>, StoryError>;

    async fn delete_story(&self, story_id: i64, requester_id: i64) -> Result<(), StoryError>;
}

pub type DynStoryLifecycle = Arc<dyn StoryLifecycle>;

pub struct StoryLifecycleService {
    stories: DynStoryStore,
    media: DynMediaStore,
    policy: DynAccessPolicy,
    metrics: StoryMetrics,
}

impl StoryLifecycleService {
    pub fn new(stories: DynStoryStore, media: DynMediaStore, policy: DynAccessPolicy) -> Self {
        Self { stories, media, policy, metrics: StoryMetrics::detached() }
    }

    pub fn with_metrics(mut self, metrics: StoryMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn into_arc(self) -> DynStoryLifecycle {
        Arc::new(self)
    }

    /// validate -> persist media -> create record, deleting the media again if the
    /// record cannot be written.
    async fn upload_one(&self, owner_id: i64, file: &FileDescriptor, visibility: Visibility) -> Result<Story, StoryError> {
        self.media.validate(file).await?;
        let stored = self.media.persist(file, owner_id).await?;
        match self.stories.create(owner_id, &stored.path, visibility).await {
            Ok(story) => Ok(story),
            Err(e) => {
                if !self.media.delete(&stored.path).await {
                    warn!("orphaned media left behind after failed insert: {}", stored.path);
                }
                Err(e)
            }
        }
    }

    /// Best-effort removal of one story: media first, then the record. Both are attempted.
    async fn remove(&self, story: &Story) -> (bool, bool) {
        let file_deleted = self.media.delete(&story.media_ref).await;
        let row_deleted = match self.stories.delete(story.id).await {
            Ok(deleted) => deleted,
            Err(e) => {
                error!("failed to delete story {}: {}", story.id, e);
                false
            }
        };
        (row_deleted, file_deleted)
    }
}

fn batch_message(uploaded: usize, failed: usize) -> String {
    match (uploaded, failed) {
        (0, _) => format!("no stories uploaded, {} file(s) failed", failed),
        (n, 0) => format!("{} story(ies) uploaded", n),
        (n, f) => format!("{} story(ies) uploaded, {} file(s) failed", n, f),
    }
}

#[async_trait]
impl StoryLifecycle for StoryLifecycleService {
    async fn upload_batch(
        &self,
        owner_id: i64,
        files: &[FileDescriptor],
        visibility: Visibility,
    ) -> Result<BatchResult, StoryError> {
        if owner_id <= 0 {
            return Err(StoryError::InvalidOwner);
        }
        if files.is_empty() {
            return Err(StoryError::NoFilesProvided);
        }

        let mut uploaded_stories = Vec::with_capacity(files.len());
        let mut errors = Vec::new();
        for file in files {
            match self.upload_one(owner_id, file, visibility).await {
                Ok(story) => {
                    self.metrics.uploaded.inc();
                    uploaded_stories.push(story);
                }
                Err(e) => {
                    warn!("story upload of '{}' for owner {} failed: {}", file.original_name, owner_id, e);
                    self.metrics.upload_failures.with_label_values(&[e.code()]).inc();
                    errors.push(UploadFailure {
                        file_name: file.original_name.clone(),
                        code: e.code().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let uploaded_count = uploaded_stories.len();
        let error_count = errors.len();
        info!("owner {} uploaded {} story(ies), {} failed", owner_id, uploaded_count, error_count);
        Ok(BatchResult {
            success: uploaded_count > 0,
            message: batch_message(uploaded_count, error_count),
            uploaded_count,
            error_count,
            errors,
            uploaded_stories,
        })
    }

    async fn view_story(&self, story_id: i64, viewer_id: i64) -> Result<ViewResult, StoryError> {
        let story = self.stories.get_by_id(story_id).await?;
        if !self.policy.can_access(story.as_ref(), viewer_id) {
            return Err(if story.is_some() { StoryError::AccessDenied } else { StoryError::NotFound });
        }
        let story = story.ok_or(StoryError::NotFound)?;

        let sibling_stories = self.stories.list_active_by_owner(story.owner_id).await?;
        let current_index = match sibling_stories.iter().position(|s| s.id == story.id) {
            Some(idx) => idx,
            None => {
                warn!("story {} missing from its owner's active list", story.id);
                0
            }
        };

        let viewed = match self.stories.record_view(story.id, viewer_id).await {
            Ok(RecordViewOutcome::Recorded) => {
                self.metrics.views_recorded.inc();
                true
            }
            Ok(RecordViewOutcome::SelfView) => false,
            Ok(RecordViewOutcome::NotFound) => {
                warn!("story {} expired while being viewed", story.id);
                false
            }
            Err(e) => {
                warn!("failed to record view of story {} by {}: {}", story.id, viewer_id, e);
                // an earlier view may still be on record
                self.stories.has_viewed(story.id, viewer_id).await.unwrap_or(false)
            }
        };

        Ok(ViewResult { story, sibling_stories, current_index, viewed })
    }

    async fn list_viewers(&self, story_id: i64, requester_id: i64) -> Result<ViewersResult, StoryError> {
        let story = self.stories.get_by_id(story_id).await?.ok_or(StoryError::NotFound)?;
        if story.owner_id != requester_id {
            return Err(StoryError::Unauthorized);
        }
        let viewers = self.stories.list_viewers(story.id).await?;
        let view_count = self.stories.count_views(story.id).await?;
        Ok(ViewersResult { viewers, view_count })
    }

    async fn sweep_expired(&self) -> Result<SweepResult, StoryError> {
        let expired = self.stories.list_expired().await?;
        let mut deleted_count = 0;
        let mut deleted_file_count = 0;
        for story in &expired {
            let (row_deleted, file_deleted) = self.remove(story).await;
            if file_deleted {
                deleted_file_count += 1;
                self.metrics.swept_files.inc();
            }
            if row_deleted {
                deleted_count += 1;
                self.metrics.swept_stories.inc();
            }
        }
        let message = format!(
            "deleted {} expired story(ies) and {} file(s) out of {}",
            deleted_count,
            deleted_file_count,
            expired.len()
        );
        info!("{}", message);
        Ok(SweepResult { deleted_count, deleted_file_count, message })
    }

    async fn statistics(&self) -> Result<StoryStatistics, StoryError> {
        self.stories.aggregate_statistics().await
    }

    async fn feed(&self, viewer_id: i64) -> Result<Vec<OwnerStorySummary>, StoryError> {
        self.stories.list_active_grouped_by_owner(viewer_id).await
    }

    async fn user_stories(&self, owner_id: i64, viewer_id: i64) -> Result<Vec<StoryCard>, StoryError> {
        let stories = self.stories.list_active_by_owner(owner_id).await?;
        let mut cards = Vec::with_capacity(stories.len());
        for story in stories {
            if !self.policy.can_access(Some(&story), viewer_id) {
                continue;
            }
            let viewed = self.stories.has_viewed(story.id, viewer_id).await?;
            let media_type = self.media.classify(&story.media_ref);
            cards.push(StoryCard { story, media_type, viewed });
        }
        Ok(cards)
    }

    async fn delete_story(&self, story_id: i64, requester_id: i64) -> Result<(), StoryError> {
        let story = self.stories.get_by_id(story_id).await?.ok_or(StoryError::NotFound)?;
        if story.owner_id != requester_id {
            return Err(StoryError::Unauthorized);
        }
        let (row_deleted, file_deleted) = self.remove(&story).await;
        if !file_deleted {
            warn!("media for deleted story {} could not be removed: {}", story.id, story.media_ref);
        }
        if !row_deleted {
            return Err(StoryError::Persistence(format!("story {} could not be deleted", story.id)));
        }
        Ok(())
    }
}

use axum::extract::DefaultBodyLimit;
use axum::{routing::get, routing::post, Extension, Router};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::kernel::Plugin;
use crate::plugins::auth::JwtSecret;
use crate::plugins::communication::stories::handlers::*;
use crate::plugins::communication::stories::manager::StoryManager;
use crate::plugins::communication::stories::media::LocalMediaStore;
use crate::plugins::communication::stories::policy::VisibilityPolicy;
use crate::plugins::communication::stories::repo::PgStoryStore;
use crate::plugins::communication::stories::service::StoryLifecycleService;
use crate::plugins::metrics::StoryMetrics;

/// Upper bound on files accepted in one upload request.
pub const MAX_FILES_PER_UPLOAD: u64 = 10;

pub struct StoriesPlugin {
    manager: Arc<StoryManager>,
    staging: UploadStaging,
    jwt_secret: JwtSecret,
    body_limit: usize,
}

impl StoriesPlugin {
    pub fn new(manager: Arc<StoryManager>, staging_dir: impl Into<PathBuf>, jwt_secret: impl Into<String>) -> Self {
        Self {
            manager,
            staging: UploadStaging { dir: staging_dir.into() },
            jwt_secret: JwtSecret(jwt_secret.into()),
            body_limit: (crate::config::DEFAULT_MAX_UPLOAD_BYTES * MAX_FILES_PER_UPLOAD) as usize,
        }
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Wires the PostgreSQL store, local media storage and visibility policy together.
    pub fn from_config(pool: DbPool, cfg: &AppConfig, metrics: Option<StoryMetrics>) -> Self {
        let media = LocalMediaStore::new(&cfg.upload_dir, cfg.media_url_prefix.clone())
            .with_max_bytes(cfg.max_upload_bytes)
            .into_arc();
        let mut service = StoryLifecycleService::new(
            PgStoryStore::new(pool).into_arc(),
            media,
            VisibilityPolicy::default().into_arc(),
        );
        if let Some(m) = metrics {
            service = service.with_metrics(m);
        }
        let manager = StoryManager::new(service.into_arc()).into_arc();
        Self::new(manager, cfg.upload_tmp_dir.clone(), cfg.jwt_secret.clone())
            .with_body_limit((cfg.max_upload_bytes.saturating_mul(MAX_FILES_PER_UPLOAD)) as usize)
    }
}

#[async_trait::async_trait]
impl Plugin for StoriesPlugin {
    async fn router(&self) -> Router {
        Router::new()
            .route("/", get(feed))
            .route("/upload", post(upload_stories).layer(DefaultBodyLimit::max(self.body_limit)))
            .route("/cleanup", post(cleanup))
            .route("/stats", get(statistics))
            .route("/user/:owner_id", get(user_stories))
            .route("/:id", get(view_story).delete(delete_story))
            .route("/:id/viewers", get(story_viewers))
            .layer(Extension(self.manager.clone()))
            .layer(Extension(self.staging.clone()))
            .layer(Extension(self.jwt_secret.clone()))
    }

    fn name(&self) -> &'static str { "communication/stories" }
}

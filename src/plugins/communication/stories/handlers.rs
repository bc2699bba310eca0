use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::{Multipart, Path};
use axum::Extension;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

use crate::plugins::auth::AuthUser;
use crate::plugins::communication::shared::Envelope;
use crate::plugins::communication::stories::error::StoryError;
use crate::plugins::communication::stories::manager::{
    error_envelope, CleanupPayload, DeletePayload, FeedPayload, StoryManager, UploadPayload, UserStoriesPayload,
    ViewPayload,
};
use crate::plugins::communication::stories::models::{FileDescriptor, StoryStatistics, TransferStatus, ViewersResult};

/// Where multipart payloads are written before validation.
#[derive(Clone, Debug)]
pub struct UploadStaging {
    pub dir: PathBuf,
}

async fn stage_field(dir: &FsPath, mut field: Field<'_>) -> FileDescriptor {
    let original_name = field.file_name().unwrap_or("upload").to_string();
    let declared_content_type = field.content_type().map(str::to_string);
    let staged_path = dir.join(format!("{}.upload", Uuid::new_v4()));
    let mut size = 0u64;
    let mut status = TransferStatus::Complete;

    match tokio::fs::File::create(&staged_path).await {
        Ok(mut out) => {
            loop {
                match field.chunk().await {
                    Ok(Some(bytes)) => {
                        size += bytes.len() as u64;
                        if let Err(e) = out.write_all(&bytes).await {
                            warn!("failed to stage '{}': {}", original_name, e);
                            status = TransferStatus::Aborted;
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("transfer of '{}' interrupted: {}", original_name, e);
                        status = TransferStatus::Partial;
                        break;
                    }
                }
            }
            if let Err(e) = out.flush().await {
                warn!("failed to flush staged '{}': {}", original_name, e);
                status = TransferStatus::Aborted;
            }
        }
        Err(e) => {
            warn!("failed to create staging file for '{}': {}", original_name, e);
            status = TransferStatus::Aborted;
        }
    }

    FileDescriptor { original_name, declared_content_type, size, staged_path, status }
}

// Persisted payloads were moved away; anything still here was rejected.
async fn discard_staged(files: &[FileDescriptor]) {
    for f in files {
        let _ = tokio::fs::remove_file(&f.staged_path).await;
    }
}

pub async fn upload_stories(
    Extension(manager): Extension<Arc<StoryManager>>,
    Extension(staging): Extension<UploadStaging>,
    auth: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Envelope<UploadPayload> {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => return error_envelope(StoryError::InvalidInput(rejection.body_text())),
    };
    if let Err(e) = tokio::fs::create_dir_all(&staging.dir).await {
        return error_envelope(StoryError::StorageWrite(format!("failed to create staging dir: {}", e)));
    }

    let mut files = Vec::new();
    let mut visibility: Option<String> = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("multipart stream ended early: {}", e);
                break;
            }
        };
        if field.file_name().is_none() {
            if field.name() == Some("visibility") {
                visibility = field.text().await.ok();
            }
            continue;
        }
        files.push(stage_field(&staging.dir, field).await);
    }

    let envelope = manager.upload(Some(auth.user_id), &files, visibility.as_deref()).await;
    discard_staged(&files).await;
    envelope
}

pub async fn view_story(
    Extension(manager): Extension<Arc<StoryManager>>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Envelope<ViewPayload> {
    manager.view(Some(id), Some(auth.user_id)).await
}

pub async fn story_viewers(
    Extension(manager): Extension<Arc<StoryManager>>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Envelope<ViewersResult> {
    manager.viewers(Some(id), Some(auth.user_id)).await
}

pub async fn delete_story(
    Extension(manager): Extension<Arc<StoryManager>>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Envelope<DeletePayload> {
    manager.delete(Some(id), Some(auth.user_id)).await
}

pub async fn feed(Extension(manager): Extension<Arc<StoryManager>>, auth: AuthUser) -> Envelope<FeedPayload> {
    manager.feed(Some(auth.user_id)).await
}

pub async fn user_stories(
    Extension(manager): Extension<Arc<StoryManager>>,
    auth: AuthUser,
    Path(owner_id): Path<i64>,
) -> Envelope<UserStoriesPayload> {
    manager.user_stories(Some(owner_id), Some(auth.user_id)).await
}

pub async fn cleanup(Extension(manager): Extension<Arc<StoryManager>>) -> Envelope<CleanupPayload> {
    manager.cleanup().await
}

pub async fn statistics(Extension(manager): Extension<Arc<StoryManager>>) -> Envelope<StoryStatistics> {
    manager.statistics().await
}

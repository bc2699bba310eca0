use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::plugins::communication::stories::error::StoryError;
use crate::plugins::communication::stories::models::{
    FileDescriptor, MediaKind, StoredMedia, TransferStatus, ValidatedUpload,
};

pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "video/mp4",
    "video/quicktime",
    "video/webm",
];

const SNIFF_BYTES: u64 = 8 * 1024;
const MAX_EXTENSION_LEN: usize = 8;

#[async_trait]
pub trait MediaStore: Send + Sync + 'static {
    /// Checks transport status, size, declared type and sniffed type. No side effects.
    async fn validate(&self, file: &FileDescriptor) -> Result<ValidatedUpload, StoryError>;

    /// Moves a validated payload into durable storage under a fresh name.
    async fn persist(&self, file: &FileDescriptor, owner_id: i64) -> Result<StoredMedia, StoryError>;

    /// Removes stored media. Missing files count as removed; failures are logged and
    /// reported as `false`.
    async fn delete(&self, path: &str) -> bool;

    fn classify(&self, path: &str) -> MediaKind {
        classify(path)
    }
}

pub type DynMediaStore = Arc<dyn MediaStore>;

/// Media kind from the file extension alone.
pub fn classify(path: &str) -> MediaKind {
    match mime_guess::from_path(path).first() {
        Some(m) if m.type_() == mime_guess::mime::VIDEO => MediaKind::Video,
        _ => MediaKind::Image,
    }
}

pub fn normalize_content_type(raw: &str) -> String {
    let base = raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match base.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => base,
    }
}

fn is_allowed(content_type: &str) -> bool {
    ALLOWED_CONTENT_TYPES.contains(&content_type)
}

fn kind_of(content_type: &str) -> MediaKind {
    if content_type.starts_with("video/") {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

fn sanitize_extension(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name).extension()?.to_str()?.to_ascii_lowercase();
    if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}

fn extension_for(file: &FileDescriptor) -> String {
    if let Some(ext) = sanitize_extension(&file.original_name) {
        return ext;
    }
    file.declared_content_type
        .as_deref()
        .map(normalize_content_type)
        .and_then(|ct| mime_guess::get_mime_extensions_str(&ct).and_then(|exts| exts.first().copied()))
        .map(str::to_string)
        .unwrap_or_else(|| "bin".to_string())
}

/// `{owner}_{YYYYMMDDHHMMSS}_{micros}_{random}.{ext}`
pub fn generate_file_name(owner_id: i64, ext: &str) -> String {
    let now = Utc::now();
    let suffix: u32 = rand::thread_rng().gen();
    format!(
        "{}_{}_{:06}_{:08x}.{}",
        owner_id,
        now.format("%Y%m%d%H%M%S"),
        now.timestamp_subsec_micros(),
        suffix,
        ext
    )
}

/// Stores media as plain files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
    url_prefix: String,
    max_bytes: u64,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn into_arc(self) -> DynMediaStore {
        Arc::new(self)
    }

    /// Maps a public reference back to a file under the root, refusing anything that
    /// would escape it.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let name = path.strip_prefix(&self.url_prefix)?.trim_start_matches('/');
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return None;
        }
        Some(self.root.join(name))
    }

    async fn sniff(&self, staged: &Path) -> Result<Option<String>, StoryError> {
        let file = tokio::fs::File::open(staged)
            .await
            .map_err(|e| StoryError::InvalidUpload(format!("staged payload unreadable: {}", e)))?;
        let mut head = Vec::with_capacity(SNIFF_BYTES as usize);
        file.take(SNIFF_BYTES)
            .read_to_end(&mut head)
            .await
            .map_err(|e| StoryError::InvalidUpload(format!("staged payload unreadable: {}", e)))?;
        Ok(infer::get(&head).map(|t| normalize_content_type(t.mime_type())))
    }

    async fn move_into_place(&self, staged: &Path, dest: &Path) -> Result<(), StoryError> {
        if tokio::fs::rename(staged, dest).await.is_ok() {
            return Ok(());
        }
        // rename cannot cross filesystems; copy beside the destination, then rename.
        let mut part = dest.as_os_str().to_owned();
        part.push(".part");
        let part = PathBuf::from(part);
        let copied = async {
            tokio::fs::copy(staged, &part).await?;
            tokio::fs::rename(&part, dest).await
        }
        .await;
        if let Err(e) = copied {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(StoryError::StorageWrite(format!("failed to move upload into storage: {}", e)));
        }
        if let Err(e) = tokio::fs::remove_file(staged).await {
            debug!("could not remove staged payload {}: {}", staged.display(), e);
        }
        Ok(())
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn validate(&self, file: &FileDescriptor) -> Result<ValidatedUpload, StoryError> {
        if file.status != TransferStatus::Complete {
            return Err(StoryError::InvalidUpload("upload transfer did not complete".to_string()));
        }
        if file.size == 0 {
            return Err(StoryError::InvalidUpload("file is empty".to_string()));
        }
        if file.size > self.max_bytes {
            return Err(StoryError::InvalidUpload(format!(
                "file exceeds the {} byte limit",
                self.max_bytes
            )));
        }
        let on_disk = tokio::fs::metadata(&file.staged_path)
            .await
            .map_err(|e| StoryError::InvalidUpload(format!("staged payload unreadable: {}", e)))?
            .len();
        if on_disk != file.size {
            return Err(StoryError::InvalidUpload("upload transfer did not complete".to_string()));
        }

        let declared = match file.declared_content_type.as_deref() {
            Some(raw) => normalize_content_type(raw),
            None => return Err(StoryError::InvalidUpload("missing content type".to_string())),
        };
        if !is_allowed(&declared) {
            return Err(StoryError::InvalidUpload(format!("content type {} is not allowed", declared)));
        }

        let detected = match self.sniff(&file.staged_path).await? {
            Some(ct) => ct,
            None => return Err(StoryError::InvalidUpload("could not determine file content".to_string())),
        };
        if !is_allowed(&detected) {
            return Err(StoryError::InvalidUpload(format!("detected content {} is not allowed", detected)));
        }
        if detected != declared {
            return Err(StoryError::TypeMismatch { declared, detected });
        }

        Ok(ValidatedUpload { kind: kind_of(&detected), content_type: detected })
    }

    async fn persist(&self, file: &FileDescriptor, owner_id: i64) -> Result<StoredMedia, StoryError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoryError::StorageWrite(format!("failed to create upload dir: {}", e)))?;

        let name = generate_file_name(owner_id, &extension_for(file));
        let dest = self.root.join(&name);
        self.move_into_place(&file.staged_path, &dest).await?;

        Ok(StoredMedia { path: format!("{}/{}", self.url_prefix, name), file_path: dest })
    }

    async fn delete(&self, path: &str) -> bool {
        let Some(file_path) = self.resolve(path) else {
            warn!("refusing to delete media outside storage root: {}", path);
            return false;
        };
        match tokio::fs::remove_file(&file_path).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("media already gone: {}", file_path.display());
                true
            }
            Err(e) => {
                warn!("failed to delete media {}: {}", file_path.display(), e);
                false
            }
        }
    }
}

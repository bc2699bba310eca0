use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::plugins::communication::stories::error::StoryError;

/// Every story lives exactly this long after its creation timestamp.
pub const STORY_LIFETIME_SECS: i64 = 24 * 60 * 60;

pub fn story_lifetime() -> Duration {
    Duration::seconds(STORY_LIFETIME_SECS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    /// Stored and exposed as-is; access is currently granted as for `Public`.
    Friends,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Friends => "friends",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = StoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "friends" => Ok(Visibility::Friends),
            other => Err(StoryError::InvalidInput(format!("unknown visibility '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Display fields of a user, joined onto stories and viewer rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OwnerDisplay {
    pub name: String,
    pub avatar_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: i64,
    pub owner_id: i64,
    pub media_ref: String,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub owner: OwnerDisplay,
}

impl Story {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

// Database representation; visibility is a TEXT column.
#[derive(Debug, FromRow)]
pub struct StoryRow {
    pub id: i64,
    pub owner_id: i64,
    pub media_ref: String,
    pub visibility: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub owner_name: String,
    pub owner_avatar_ref: Option<String>,
}

impl TryFrom<StoryRow> for Story {
    type Error = StoryError;

    fn try_from(r: StoryRow) -> Result<Self, Self::Error> {
        let visibility = r
            .visibility
            .parse::<Visibility>()
            .map_err(|e| StoryError::Persistence(format!("story {}: {}", r.id, e)))?;
        Ok(Story {
            id: r.id,
            owner_id: r.owner_id,
            media_ref: r.media_ref,
            visibility,
            created_at: r.created_at,
            expires_at: r.expires_at,
            owner: OwnerDisplay { name: r.owner_name, avatar_ref: r.owner_avatar_ref },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryViewer {
    pub user_id: i64,
    pub user: OwnerDisplay,
    pub viewed_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct StoryViewerRow {
    pub viewer_id: i64,
    pub name: String,
    pub avatar_ref: Option<String>,
    pub viewed_at: DateTime<Utc>,
}

impl From<StoryViewerRow> for StoryViewer {
    fn from(r: StoryViewerRow) -> Self {
        StoryViewer {
            user_id: r.viewer_id,
            user: OwnerDisplay { name: r.name, avatar_ref: r.avatar_ref },
            viewed_at: r.viewed_at,
        }
    }
}

/// One row of the story tray: an owner with at least one active story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerStorySummary {
    pub owner_id: i64,
    pub owner: OwnerDisplay,
    pub story_count: i64,
    pub latest_created_at: DateTime<Utc>,
    pub viewed_count: i64,
    pub total_count: i64,
}

#[derive(Debug, FromRow)]
pub struct OwnerStorySummaryRow {
    pub owner_id: i64,
    pub name: String,
    pub avatar_ref: Option<String>,
    pub story_count: i64,
    pub latest_created_at: DateTime<Utc>,
    pub viewed_count: i64,
}

impl From<OwnerStorySummaryRow> for OwnerStorySummary {
    fn from(r: OwnerStorySummaryRow) -> Self {
        OwnerStorySummary {
            owner_id: r.owner_id,
            owner: OwnerDisplay { name: r.name, avatar_ref: r.avatar_ref },
            story_count: r.story_count,
            latest_created_at: r.latest_created_at,
            viewed_count: r.viewed_count,
            total_count: r.story_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordViewOutcome {
    Recorded,
    /// The viewer owns the story; nothing was written.
    SelfView,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoryStatistics {
    pub active_count: i64,
    pub expired_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Complete,
    Partial,
    Aborted,
}

/// An uploaded file staged on local disk, as handed over by the transport.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub original_name: String,
    pub declared_content_type: Option<String>,
    pub size: u64,
    pub staged_path: PathBuf,
    pub status: TransferStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpload {
    /// Normalised MIME type; declared and sniffed types agree on it.
    pub content_type: String,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    /// Public reference persisted on the story row.
    pub path: String,
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFailure {
    pub file_name: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success: bool,
    pub message: String,
    pub uploaded_count: usize,
    pub error_count: usize,
    pub errors: Vec<UploadFailure>,
    pub uploaded_stories: Vec<Story>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewResult {
    pub story: Story,
    pub sibling_stories: Vec<Story>,
    pub current_index: usize,
    /// Whether a view row for this viewer exists once the call returns.
    pub viewed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ViewersResult {
    pub viewers: Vec<StoryViewer>,
    pub view_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SweepResult {
    pub deleted_count: usize,
    pub deleted_file_count: usize,
    pub message: String,
}

/// A story as seen by a particular viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryCard {
    #[serde(flatten)]
    pub story: Story,
    pub media_type: MediaKind,
    pub viewed: bool,
}

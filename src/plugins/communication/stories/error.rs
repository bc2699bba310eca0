use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoryError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("owner id is missing or not positive")]
    InvalidOwner,

    #[error("no files provided")]
    NoFilesProvided,

    #[error("story not found")]
    NotFound,

    #[error("access to this story is denied")]
    AccessDenied,

    #[error("only the story owner may do this")]
    Unauthorized,

    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    #[error("declared type {declared} does not match detected type {detected}")]
    TypeMismatch { declared: String, detected: String },

    #[error("storage write failed: {0}")]
    StorageWrite(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl StoryError {
    /// Stable machine-readable code, used in envelopes and per-file failures.
    pub fn code(&self) -> &'static str {
        match self {
            StoryError::InvalidInput(_) => "invalid_input",
            StoryError::InvalidOwner => "invalid_owner",
            StoryError::NoFilesProvided => "no_files_provided",
            StoryError::NotFound => "not_found",
            StoryError::AccessDenied => "access_denied",
            StoryError::Unauthorized => "unauthorized",
            StoryError::InvalidUpload(_) => "invalid_upload",
            StoryError::TypeMismatch { .. } => "type_mismatch",
            StoryError::StorageWrite(_) => "storage_write_error",
            StoryError::Persistence(_) => "persistence_error",
        }
    }
}

impl From<sqlx::Error> for StoryError {
    fn from(e: sqlx::Error) -> Self {
        StoryError::Persistence(e.to_string())
    }
}

impl From<std::io::Error> for StoryError {
    fn from(e: std::io::Error) -> Self {
        StoryError::StorageWrite(e.to_string())
    }
}

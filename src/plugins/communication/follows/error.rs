use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FollowError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("you cannot follow yourself")]
    SelfFollow,

    #[error("target user not found")]
    UnknownTarget,

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl FollowError {
    pub fn code(&self) -> &'static str {
        match self {
            FollowError::InvalidInput(_) => "invalid_input",
            FollowError::SelfFollow => "self_follow",
            FollowError::UnknownTarget => "not_found",
            FollowError::Persistence(_) => "persistence_error",
        }
    }
}

impl From<sqlx::Error> for FollowError {
    fn from(e: sqlx::Error) -> Self {
        FollowError::Persistence(e.to_string())
    }
}

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::plugins::communication::follows::error::FollowError;

pub const FOLLOW_NOTIFICATION_TYPE: &str = "follow";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowToggleRequest {
    pub target_user_id: Option<i64>,
    pub action: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowAction {
    Follow,
    Unfollow,
}

impl FromStr for FollowAction {
    type Err = FollowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "follow" => Ok(FollowAction::Follow),
            "unfollow" => Ok(FollowAction::Unfollow),
            other => Err(FollowError::InvalidInput(format!("unknown action '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub from_user: i64,
    pub to_user: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub related_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowOutcome {
    pub message: String,
    pub is_following: bool,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FollowStatusPayload {
    pub is_following: bool,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FollowingPayload {
    pub following: Vec<i64>,
}

use std::sync::Arc;
use tracing::info;

use crate::plugins::communication::follows::error::FollowError;
use crate::plugins::communication::follows::models::{
    FollowAction, FollowOutcome, NewNotification, FOLLOW_NOTIFICATION_TYPE,
};
use crate::plugins::communication::follows::repo::DynFollowStore;

#[derive(Clone)]
pub struct FollowService {
    store: DynFollowStore,
}

impl FollowService {
    pub fn new(store: DynFollowStore) -> Self {
        Self { store }
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Follows or unfollows `target_id` on behalf of `caller_id`. Both directions are
    /// idempotent; a new follow also produces a notification for the target.
    pub async fn toggle(
        &self,
        caller_id: i64,
        target_id: Option<i64>,
        action: Option<&str>,
    ) -> Result<FollowOutcome, FollowError> {
        if caller_id <= 0 {
            return Err(FollowError::InvalidInput("caller is not identified".to_string()));
        }
        let target_id = target_id
            .filter(|id| *id > 0)
            .ok_or_else(|| FollowError::InvalidInput("targetUserId is required".to_string()))?;
        let action: FollowAction = action
            .ok_or_else(|| FollowError::InvalidInput("action is required".to_string()))?
            .parse()?;
        if caller_id == target_id {
            return Err(FollowError::SelfFollow);
        }
        if self.store.find_user_name(target_id).await?.is_none() {
            return Err(FollowError::UnknownTarget);
        }

        match action {
            FollowAction::Follow => {
                if self.store.is_following(caller_id, target_id).await? {
                    return Ok(FollowOutcome { message: "already following".to_string(), is_following: true });
                }
                let caller_name = self
                    .store
                    .find_user_name(caller_id)
                    .await?
                    .unwrap_or_else(|| "Someone".to_string());
                let notification = NewNotification {
                    from_user: caller_id,
                    to_user: target_id,
                    kind: FOLLOW_NOTIFICATION_TYPE.to_string(),
                    content: format!("{} started following you", caller_name),
                    related_id: Some(caller_id),
                };
                let inserted = self.store.follow(caller_id, target_id, &notification).await?;
                if inserted {
                    info!("user {} followed {}", caller_id, target_id);
                }
                let message = if inserted { "followed" } else { "already following" };
                Ok(FollowOutcome { message: message.to_string(), is_following: true })
            }
            FollowAction::Unfollow => {
                let removed = self.store.unfollow(caller_id, target_id).await?;
                if removed {
                    info!("user {} unfollowed {}", caller_id, target_id);
                }
                let message = if removed { "unfollowed" } else { "not following" };
                Ok(FollowOutcome { message: message.to_string(), is_following: false })
            }
        }
    }

    pub async fn following(&self, caller_id: i64) -> Result<Vec<i64>, FollowError> {
        if caller_id <= 0 {
            return Err(FollowError::InvalidInput("caller is not identified".to_string()));
        }
        self.store.list_following(caller_id).await
    }
}

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::plugins::communication::follows::error::FollowError;
use crate::plugins::communication::follows::models::NewNotification;

#[async_trait]
pub trait FollowStore: Send + Sync + 'static {
    async fn find_user_name(&self, user_id: i64) -> Result<Option<String>, FollowError>;

    async fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool, FollowError>;

    /// Idempotent insert; the notification is written in the same transaction and only
    /// when a new relationship was created. Returns whether a row was inserted.
    async fn follow(&self, follower_id: i64, followed_id: i64, notification: &NewNotification) -> Result<bool, FollowError>;

    /// Idempotent delete; returns whether a row was removed.
    async fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool, FollowError>;

    async fn list_following(&self, follower_id: i64) -> Result<Vec<i64>, FollowError>;
}

pub type DynFollowStore = Arc<dyn FollowStore>;

#[derive(Clone)]
pub struct PgFollowStore {
    pool: PgPool,
}

impl PgFollowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn into_arc(self) -> DynFollowStore {
        Arc::new(self)
    }
}

#[async_trait]
impl FollowStore for PgFollowStore {
    async fn find_user_name(&self, user_id: i64) -> Result<Option<String>, FollowError> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }

    async fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool, FollowError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM followers WHERE follower_user_id = $1 AND followed_user_id = $2)",
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn follow(&self, follower_id: i64, followed_id: i64, notification: &NewNotification) -> Result<bool, FollowError> {
        let mut tx = self.pool.begin().await?;
        let affected = sqlx::query(
            "INSERT INTO followers (followed_user_id, follower_user_id, followed_at) VALUES ($1, $2, now()) \
             ON CONFLICT ON CONSTRAINT followers_pair_key DO NOTHING",
        )
        .bind(followed_id)
        .bind(follower_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        let inserted = affected > 0;
        if inserted {
            sqlx::query(
                "INSERT INTO notifications (from_user, to_user, type, content, related_id) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(notification.from_user)
            .bind(notification.to_user)
            .bind(&notification.kind)
            .bind(&notification.content)
            .bind(notification.related_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool, FollowError> {
        let affected = sqlx::query("DELETE FROM followers WHERE follower_user_id = $1 AND followed_user_id = $2")
            .bind(follower_id)
            .bind(followed_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn list_following(&self, follower_id: i64) -> Result<Vec<i64>, FollowError> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT followed_user_id FROM followers WHERE follower_user_id = $1 ORDER BY followed_at DESC",
        )
        .bind(follower_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

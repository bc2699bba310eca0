use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::plugins::communication::stories::error::StoryError;
use crate::plugins::communication::stories::models::{
    OwnerStorySummary, OwnerStorySummaryRow, RecordViewOutcome, Story, StoryRow, StoryStatistics,
    StoryViewer, StoryViewerRow, Visibility, STORY_LIFETIME_SECS,
};

/// Durable record of stories and their views. Every read is qualified against the
/// expiry watermark; expired rows are invisible until they are deleted.
#[async_trait]
pub trait StoryStore: Send + Sync + 'static {
    /// Inserts a story; the store assigns `created_at` at insertion time.
    async fn create(&self, owner_id: i64, media_ref: &str, visibility: Visibility) -> Result<Story, StoryError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Story>, StoryError>;

    /// Oldest first.
    async fn list_active_by_owner(&self, owner_id: i64) -> Result<Vec<Story>, StoryError>;

    /// Most recently active owner first.
    async fn list_active_grouped_by_owner(&self, viewer_id: i64) -> Result<Vec<OwnerStorySummary>, StoryError>;

    async fn record_view(&self, story_id: i64, viewer_id: i64) -> Result<RecordViewOutcome, StoryError>;

    /// Most recent first.
    async fn list_viewers(&self, story_id: i64) -> Result<Vec<StoryViewer>, StoryError>;

    async fn count_views(&self, story_id: i64) -> Result<i64, StoryError>;

    async fn has_viewed(&self, story_id: i64, viewer_id: i64) -> Result<bool, StoryError>;

    async fn list_expired(&self) -> Result<Vec<Story>, StoryError>;

    /// Removes the story and its views atomically. Returns whether a story row existed.
    async fn delete(&self, story_id: i64) -> Result<bool, StoryError>;

    async fn aggregate_statistics(&self) -> Result<StoryStatistics, StoryError>;
}

pub type DynStoryStore = Arc<dyn StoryStore>;

const STORY_COLUMNS: &str = "s.id, s.owner_id, s.media_ref, s.visibility, s.created_at, s.expires_at, u.name AS owner_name, u.avatar_ref AS owner_avatar_ref";

#[derive(Clone)]
pub struct PgStoryStore {
    pool: PgPool,
}

impl PgStoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn into_arc(self) -> DynStoryStore {
        Arc::new(self)
    }
}

fn into_stories(rows: Vec<StoryRow>) -> Result<Vec<Story>, StoryError> {
    rows.into_iter().map(Story::try_from).collect()
}

#[async_trait]
impl StoryStore for PgStoryStore {
    async fn create(&self, owner_id: i64, media_ref: &str, visibility: Visibility) -> Result<Story, StoryError> {
        // clock_timestamp() advances within a transaction, so each insert gets its own instant.
        let sql = format!(
            "WITH ts AS (SELECT clock_timestamp() AS at), \
             ins AS (INSERT INTO stories (owner_id, media_ref, visibility, created_at, expires_at) \
                     SELECT $1, $2, $3, ts.at, ts.at + make_interval(secs => $4) FROM ts \
                     RETURNING id, owner_id, media_ref, visibility, created_at, expires_at) \
             SELECT {} FROM ins s JOIN users u ON u.id = s.owner_id",
            STORY_COLUMNS
        );
        let row = sqlx::query_as::<_, StoryRow>(&sql)
            .bind(owner_id)
            .bind(media_ref)
            .bind(visibility.as_str())
            .bind(STORY_LIFETIME_SECS as f64)
            .fetch_one(&self.pool)
            .await?;
        Story::try_from(row)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Story>, StoryError> {
        let sql = format!(
            "SELECT {} FROM stories s JOIN users u ON u.id = s.owner_id WHERE s.id = $1 AND s.expires_at > now()",
            STORY_COLUMNS
        );
        let row = sqlx::query_as::<_, StoryRow>(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(Story::try_from).transpose()
    }

    async fn list_active_by_owner(&self, owner_id: i64) -> Result<Vec<Story>, StoryError> {
        let sql = format!(
            "SELECT {} FROM stories s JOIN users u ON u.id = s.owner_id \
             WHERE s.owner_id = $1 AND s.expires_at > now() ORDER BY s.created_at ASC, s.id ASC",
            STORY_COLUMNS
        );
        let rows = sqlx::query_as::<_, StoryRow>(&sql).bind(owner_id).fetch_all(&self.pool).await?;
        into_stories(rows)
    }

    async fn list_active_grouped_by_owner(&self, viewer_id: i64) -> Result<Vec<OwnerStorySummary>, StoryError> {
        let rows = sqlx::query_as::<_, OwnerStorySummaryRow>(
            "SELECT s.owner_id, u.name, u.avatar_ref, COUNT(*) AS story_count, \
                    MAX(s.created_at) AS latest_created_at, COUNT(v.story_id) AS viewed_count \
             FROM stories s \
             JOIN users u ON u.id = s.owner_id \
             LEFT JOIN story_views v ON v.story_id = s.id AND v.viewer_id = $1 \
             WHERE s.expires_at > now() \
             GROUP BY s.owner_id, u.name, u.avatar_ref \
             ORDER BY latest_created_at DESC",
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(OwnerStorySummary::from).collect())
    }

    async fn record_view(&self, story_id: i64, viewer_id: i64) -> Result<RecordViewOutcome, StoryError> {
        let owner: Option<i64> = sqlx::query_scalar("SELECT owner_id FROM stories WHERE id = $1 AND expires_at > now()")
            .bind(story_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(owner_id) = owner else {
            return Ok(RecordViewOutcome::NotFound);
        };
        if owner_id == viewer_id {
            return Ok(RecordViewOutcome::SelfView);
        }
        sqlx::query(
            "INSERT INTO story_views (story_id, viewer_id, viewed_at) VALUES ($1, $2, clock_timestamp()) \
             ON CONFLICT (story_id, viewer_id) DO UPDATE SET viewed_at = EXCLUDED.viewed_at",
        )
        .bind(story_id)
        .bind(viewer_id)
        .execute(&self.pool)
        .await?;
        Ok(RecordViewOutcome::Recorded)
    }

    async fn list_viewers(&self, story_id: i64) -> Result<Vec<StoryViewer>, StoryError> {
        let rows = sqlx::query_as::<_, StoryViewerRow>(
            "SELECT v.viewer_id, u.name, u.avatar_ref, v.viewed_at \
             FROM story_views v JOIN users u ON u.id = v.viewer_id \
             WHERE v.story_id = $1 ORDER BY v.viewed_at DESC",
        )
        .bind(story_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(StoryViewer::from).collect())
    }

    async fn count_views(&self, story_id: i64) -> Result<i64, StoryError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM story_views WHERE story_id = $1")
            .bind(story_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn has_viewed(&self, story_id: i64, viewer_id: i64) -> Result<bool, StoryError> {
        let seen: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM story_views WHERE story_id = $1 AND viewer_id = $2)",
        )
        .bind(story_id)
        .bind(viewer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(seen)
    }

    async fn list_expired(&self) -> Result<Vec<Story>, StoryError> {
        let sql = format!(
            "SELECT {} FROM stories s JOIN users u ON u.id = s.owner_id WHERE s.expires_at <= now() ORDER BY s.expires_at ASC",
            STORY_COLUMNS
        );
        let rows = sqlx::query_as::<_, StoryRow>(&sql).fetch_all(&self.pool).await?;
        into_stories(rows)
    }

    async fn delete(&self, story_id: i64) -> Result<bool, StoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM story_views WHERE story_id = $1")
            .bind(story_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM stories WHERE id = $1")
            .bind(story_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn aggregate_statistics(&self) -> Result<StoryStatistics, StoryError> {
        let stats = sqlx::query_as::<_, StoryStatistics>(
            "SELECT COUNT(*) FILTER (WHERE expires_at > now()) AS active_count, \
                    COUNT(*) FILTER (WHERE expires_at <= now()) AS expired_count \
             FROM stories",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }
}

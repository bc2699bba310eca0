use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::plugins::communication::stories::clock::{DynClock, SystemClock};
use crate::plugins::communication::stories::error::StoryError;
use crate::plugins::communication::stories::models::{
    story_lifetime, OwnerDisplay, OwnerStorySummary, RecordViewOutcome, Story, StoryStatistics, StoryViewer,
    Visibility,
};
use crate::plugins::communication::stories::repo::{DynStoryStore, StoryStore};

#[derive(Default)]
struct Tables {
    users: HashMap<i64, OwnerDisplay>,
    stories: BTreeMap<i64, StoredStory>,
    // (story_id, viewer_id) -> viewed_at
    views: BTreeMap<(i64, i64), DateTime<Utc>>,
    next_id: i64,
    last_created_at: Option<DateTime<Utc>>,
    last_viewed_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
struct StoredStory {
    id: i64,
    owner_id: i64,
    media_ref: String,
    visibility: Visibility,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Next instant strictly after `last`, or `now` when the clock has already moved on.
fn monotonic(now: DateTime<Utc>, last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match last {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

impl Tables {
    fn display(&self, user_id: i64) -> OwnerDisplay {
        self.users.get(&user_id).cloned().unwrap_or_default()
    }

    fn materialize(&self, s: &StoredStory) -> Story {
        Story {
            id: s.id,
            owner_id: s.owner_id,
            media_ref: s.media_ref.clone(),
            visibility: s.visibility,
            created_at: s.created_at,
            expires_at: s.expires_at,
            owner: self.display(s.owner_id),
        }
    }
}

/// Process-local story store. Users must be registered before they can own stories,
/// mirroring the foreign key of the relational schema.
pub struct InMemoryStoryStore {
    inner: Mutex<Tables>,
    clock: DynClock,
}

impl InMemoryStoryStore {
    pub fn new(clock: DynClock) -> Self {
        Self { inner: Mutex::new(Tables { next_id: 1, ..Tables::default() }), clock }
    }

    pub fn register_user(&self, id: i64, name: impl Into<String>, avatar_ref: Option<String>) {
        self.inner.lock().users.insert(id, OwnerDisplay { name: name.into(), avatar_ref });
    }

    /// Number of stored view rows, active or not.
    pub fn view_row_count(&self) -> usize {
        self.inner.lock().views.len()
    }

    /// Number of stored story rows, active or not.
    pub fn story_row_count(&self) -> usize {
        self.inner.lock().stories.len()
    }

    pub fn into_arc(self) -> DynStoryStore {
        Arc::new(self)
    }
}

impl Default for InMemoryStoryStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl StoryStore for InMemoryStoryStore {
    async fn create(&self, owner_id: i64, media_ref: &str, visibility: Visibility) -> Result<Story, StoryError> {
        let now = self.clock.now();
        let mut t = self.inner.lock();
        if !t.users.contains_key(&owner_id) {
            return Err(StoryError::Persistence(format!("owner {} does not exist", owner_id)));
        }
        let created_at = monotonic(now, t.last_created_at);
        t.last_created_at = Some(created_at);
        let id = t.next_id;
        t.next_id += 1;
        let stored = StoredStory {
            id,
            owner_id,
            media_ref: media_ref.to_string(),
            visibility,
            created_at,
            expires_at: created_at + story_lifetime(),
        };
        let story = t.materialize(&stored);
        t.stories.insert(id, stored);
        Ok(story)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Story>, StoryError> {
        let now = self.clock.now();
        let t = self.inner.lock();
        Ok(t.stories.get(&id).filter(|s| now < s.expires_at).map(|s| t.materialize(s)))
    }

    async fn list_active_by_owner(&self, owner_id: i64) -> Result<Vec<Story>, StoryError> {
        let now = self.clock.now();
        let t = self.inner.lock();
        let mut stories: Vec<Story> = t
            .stories
            .values()
            .filter(|s| s.owner_id == owner_id && now < s.expires_at)
            .map(|s| t.materialize(s))
            .collect();
        stories.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(stories)
    }

    async fn list_active_grouped_by_owner(&self, viewer_id: i64) -> Result<Vec<OwnerStorySummary>, StoryError> {
        let now = self.clock.now();
        let t = self.inner.lock();
        let mut by_owner: HashMap<i64, (i64, DateTime<Utc>, i64)> = HashMap::new();
        for s in t.stories.values().filter(|s| now < s.expires_at) {
            let viewed = i64::from(t.views.contains_key(&(s.id, viewer_id)));
            let entry = by_owner.entry(s.owner_id).or_insert((0, s.created_at, 0));
            entry.0 += 1;
            entry.1 = entry.1.max(s.created_at);
            entry.2 += viewed;
        }
        let mut summaries: Vec<OwnerStorySummary> = by_owner
            .into_iter()
            .map(|(owner_id, (count, latest, viewed))| OwnerStorySummary {
                owner_id,
                owner: t.display(owner_id),
                story_count: count,
                latest_created_at: latest,
                viewed_count: viewed,
                total_count: count,
            })
            .collect();
        summaries.sort_by(|a, b| b.latest_created_at.cmp(&a.latest_created_at));
        Ok(summaries)
    }

    async fn record_view(&self, story_id: i64, viewer_id: i64) -> Result<RecordViewOutcome, StoryError> {
        let now = self.clock.now();
        let mut t = self.inner.lock();
        let owner_id = match t.stories.get(&story_id) {
            Some(s) if now < s.expires_at => s.owner_id,
            _ => return Ok(RecordViewOutcome::NotFound),
        };
        if owner_id == viewer_id {
            return Ok(RecordViewOutcome::SelfView);
        }
        let viewed_at = monotonic(now, t.last_viewed_at);
        t.last_viewed_at = Some(viewed_at);
        t.views.insert((story_id, viewer_id), viewed_at);
        Ok(RecordViewOutcome::Recorded)
    }

    async fn list_viewers(&self, story_id: i64) -> Result<Vec<StoryViewer>, StoryError> {
        let t = self.inner.lock();
        let mut viewers: Vec<StoryViewer> = t
            .views
            .range((story_id, i64::MIN)..=(story_id, i64::MAX))
            .map(|(&(_, viewer_id), &viewed_at)| StoryViewer {
                user_id: viewer_id,
                user: t.display(viewer_id),
                viewed_at,
            })
            .collect();
        viewers.sort_by(|a, b| b.viewed_at.cmp(&a.viewed_at));
        Ok(viewers)
    }

    async fn count_views(&self, story_id: i64) -> Result<i64, StoryError> {
        let t = self.inner.lock();
        Ok(t.views.range((story_id, i64::MIN)..=(story_id, i64::MAX)).count() as i64)
    }

    async fn has_viewed(&self, story_id: i64, viewer_id: i64) -> Result<bool, StoryError> {
        Ok(self.inner.lock().views.contains_key(&(story_id, viewer_id)))
    }

    async fn list_expired(&self) -> Result<Vec<Story>, StoryError> {
        let now = self.clock.now();
        let t = self.inner.lock();
        Ok(t.stories.values().filter(|s| s.expires_at <= now).map(|s| t.materialize(s)).collect())
    }

    async fn delete(&self, story_id: i64) -> Result<bool, StoryError> {
        // one lock scope: views and story go together
        let mut t = self.inner.lock();
        let existed = t.stories.remove(&story_id).is_some();
        t.views.retain(|&(sid, _), _| sid != story_id);
        Ok(existed)
    }

    async fn aggregate_statistics(&self) -> Result<StoryStatistics, StoryError> {
        let now = self.clock.now();
        let t = self.inner.lock();
        let active = t.stories.values().filter(|s| now < s.expires_at).count() as i64;
        Ok(StoryStatistics { active_count: active, expired_count: t.stories.len() as i64 - active })
    }
}

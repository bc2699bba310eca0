use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::plugins::communication::follows::error::FollowError;
use crate::plugins::communication::follows::models::NewNotification;
use crate::plugins::communication::follows::repo::{DynFollowStore, FollowStore};

#[derive(Default)]
struct State {
    users: HashMap<i64, String>,
    // (follower, followed), in insertion order
    follows: Vec<(i64, i64)>,
    index: BTreeSet<(i64, i64)>,
    notifications: Vec<NewNotification>,
}

#[derive(Default)]
pub struct InMemoryFollowStore {
    inner: Mutex<State>,
}

impl InMemoryFollowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_user(&self, id: i64, name: impl Into<String>) {
        self.inner.lock().users.insert(id, name.into());
    }

    pub fn notifications(&self) -> Vec<NewNotification> {
        self.inner.lock().notifications.clone()
    }

    pub fn relationship_count(&self) -> usize {
        self.inner.lock().index.len()
    }

    pub fn into_arc(self) -> DynFollowStore {
        Arc::new(self)
    }
}

#[async_trait]
impl FollowStore for InMemoryFollowStore {
    async fn find_user_name(&self, user_id: i64) -> Result<Option<String>, FollowError> {
        Ok(self.inner.lock().users.get(&user_id).cloned())
    }

    async fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool, FollowError> {
        Ok(self.inner.lock().index.contains(&(follower_id, followed_id)))
    }

    async fn follow(&self, follower_id: i64, followed_id: i64, notification: &NewNotification) -> Result<bool, FollowError> {
        let mut s = self.inner.lock();
        if !s.index.insert((follower_id, followed_id)) {
            return Ok(false);
        }
        s.follows.push((follower_id, followed_id));
        s.notifications.push(notification.clone());
        Ok(true)
    }

    async fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool, FollowError> {
        let mut s = self.inner.lock();
        if !s.index.remove(&(follower_id, followed_id)) {
            return Ok(false);
        }
        s.follows.retain(|pair| *pair != (follower_id, followed_id));
        Ok(true)
    }

    async fn list_following(&self, follower_id: i64) -> Result<Vec<i64>, FollowError> {
        let s = self.inner.lock();
        // newest first, as the relational store orders by followed_at
        Ok(s.follows.iter().rev().filter(|(f, _)| *f == follower_id).map(|(_, t)| *t).collect())
    }
}

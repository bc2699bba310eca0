use std::sync::Arc;

use crate::plugins::communication::stories::clock::{DynClock, SystemClock};
use crate::plugins::communication::stories::models::{Story, Visibility};

pub trait StoryAccessPolicy: Send + Sync + 'static {
    fn can_access(&self, story: Option<&Story>, requester_id: i64) -> bool;
}

pub type DynAccessPolicy = Arc<dyn StoryAccessPolicy>;

/// Grants access by ownership and visibility.
///
/// `Friends` stories are currently readable by everyone, exactly like `Public` ones:
/// there is no friend graph to consult yet. The visibility value is kept on the story
/// so this check can be tightened without a data migration.
pub struct VisibilityPolicy {
    clock: DynClock,
}

impl VisibilityPolicy {
    pub fn new(clock: DynClock) -> Self {
        Self { clock }
    }

    pub fn into_arc(self) -> DynAccessPolicy {
        Arc::new(self)
    }
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl StoryAccessPolicy for VisibilityPolicy {
    fn can_access(&self, story: Option<&Story>, requester_id: i64) -> bool {
        let Some(story) = story else {
            return false;
        };
        if !story.is_active_at(self.clock.now()) {
            return false;
        }
        if story.owner_id == requester_id {
            return true;
        }
        match story.visibility {
            Visibility::Public => true,
            // TODO: consult the follow graph once mutual-follow "friends" are defined.
            Visibility::Friends => true,
        }
    }
}

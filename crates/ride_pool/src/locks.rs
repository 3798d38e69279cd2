use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use model::ride_group::RideGroup;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use utility::id::Id;

use crate::{GroupError, GroupResult};

/// Entries are pruned once the table grows past this size.
const PRUNE_THRESHOLD: usize = 1024;

/// One async lock per ride group. Operations on different groups never wait
/// for each other.
#[derive(Clone, Default)]
pub struct GroupLocks {
    locks: Arc<Mutex<HashMap<Id<RideGroup>, Arc<AsyncMutex<()>>>>>,
}

/// Holds a group's lock until dropped.
pub struct GroupGuard {
    _guard: OwnedMutexGuard<()>,
}

impl GroupLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits at most `timeout` for the group's lock, failing with `Busy`
    /// afterwards.
    pub async fn acquire(
        &self,
        group_id: &Id<RideGroup>,
        timeout: Duration,
    ) -> GroupResult<GroupGuard> {
        let lock = self.lock_for(group_id);
        match tokio::time::timeout(timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(GroupGuard { _guard: guard }),
            Err(_) => {
                log::warn!("ride group {} is busy", group_id);
                Err(GroupError::Busy)
            }
        }
    }

    fn lock_for(&self, group_id: &Id<RideGroup>) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.len() >= PRUNE_THRESHOLD {
            // nobody but the table references these
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks.entry(*group_id).or_default().clone()
    }
}

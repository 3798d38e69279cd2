use std::sync::Arc;

use model::ride_group::RideGroup;
use utility::id::Id;

use crate::{
    database::{DatabaseOperations, RideGroupRepo, RideRepo},
    GroupResult,
};

/// Source of the maximum number of riders a vehicle can take.
pub trait VehicleCapacity: Send + Sync {
    fn max_capacity(&self) -> u32;
}

/// The same capacity for every vehicle.
#[derive(Debug, Clone, Copy)]
pub struct FixedCapacity(pub u32);

impl VehicleCapacity for FixedCapacity {
    fn max_capacity(&self) -> u32 {
        self.0
    }
}

/// Decides whether a group can take one more rider.
///
/// The answer is only reliable while the group lock is held, joins must go
/// through the registry's locked path.
#[derive(Clone)]
pub struct CapacityGate {
    vehicles: Arc<dyn VehicleCapacity>,
}

impl CapacityGate {
    pub fn new<V: VehicleCapacity + 'static>(vehicles: V) -> Self {
        Self {
            vehicles: Arc::new(vehicles),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.vehicles.max_capacity()
    }

    pub fn admits(&self, member_count: u32) -> bool {
        member_count < self.capacity()
    }

    /// Looks up the current member count and compares it to the capacity.
    /// Fails with `NotFound` for unknown groups.
    pub async fn can_admit<R>(&self, repo: &mut R, group_id: &Id<RideGroup>) -> GroupResult<bool>
    where
        R: DatabaseOperations + Send,
    {
        repo.get_group(group_id).await?;
        let member_count = repo.member_count(group_id).await?;
        Ok(self.admits(member_count))
    }
}

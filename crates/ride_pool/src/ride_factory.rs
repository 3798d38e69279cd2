use async_trait::async_trait;
use model::{
    ride::{Ride, Route},
    ride_group::RideGroup,
    user::Rider,
    WithId,
};
use utility::id::Id;

use crate::database::{self, RideRepo};

/// Creates the route and ride records for a rider joining a group.
///
/// Runs inside the caller's unit of work, so whatever it writes is discarded
/// together with the rest if the join fails later on.
#[async_trait]
pub trait RideFactory<R>: Send + Sync
where
    R: RideRepo + Send + 'static,
{
    /// Returns `None` if the ride was refused.
    async fn make_ride(
        &self,
        repo: &mut R,
        rider_id: &Id<Rider>,
        group_id: &Id<RideGroup>,
        route: &Route,
        is_first_member: bool,
    ) -> database::Result<Option<WithId<Ride>>>;
}

/// Writes routes and rides straight to the ride store. Refuses routes with
/// coordinates outside the valid ranges.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreRideFactory;

#[async_trait]
impl<R> RideFactory<R> for StoreRideFactory
where
    R: RideRepo + Send + 'static,
{
    async fn make_ride(
        &self,
        repo: &mut R,
        rider_id: &Id<Rider>,
        group_id: &Id<RideGroup>,
        route: &Route,
        is_first_member: bool,
    ) -> database::Result<Option<WithId<Ride>>> {
        if !route.pickup.is_valid() || !route.dropoff.is_valid() {
            log::warn!("refusing ride for rider {}: invalid coordinates", rider_id);
            return Ok(None);
        }
        let route_id = repo.insert_route(route).await?;
        let ride = Ride {
            rider_id: *rider_id,
            group_id: *group_id,
            route_id,
            is_first_member,
        };
        let ride_id = repo.insert_ride(&ride).await?;
        Ok(Some(WithId::new(ride_id, ride)))
    }
}

use std::{sync::Arc, time::Duration};

use chrono::Local;
use model::{
    geo::GeoExtent,
    ride::{Ride, Route},
    ride_group::RideGroup,
    user::{Driver, Rider},
    WithId,
};
use utility::id::Id;

use crate::{
    bounds::GeoBoundsTracker,
    capacity::{CapacityGate, FixedCapacity, VehicleCapacity},
    config::RegistryConfig,
    database::{Database, DatabaseTransaction, RideGroupRepo, RideRepo},
    fare::FareSplitter,
    locks::GroupLocks,
    not_found_to_none,
    ride_factory::{RideFactory, StoreRideFactory},
    GroupError, GroupResult,
};

/// Identifies a group member either by its route or by its ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRef {
    Route(Id<Route>),
    Ride(Id<Ride>),
}

/// How a flag setter treats the ride store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Only update the in-memory group, the caller already persisted the value.
    Internal,
    /// Write to the store first and mirror the value only if that succeeded.
    Persisted,
}

/// Creates ride groups and manages their members, extent, flags and driver.
///
/// Every operation deciding on a write based on what it read runs under the
/// group's lock and inside a single store transaction, so concurrent joins
/// can never push a group beyond the vehicle capacity. In-memory groups
/// passed to the registry are only updated after the store confirmed the
/// write.
pub struct RideGroupRegistry<D, F = StoreRideFactory>
where
    D: Database,
{
    database: D,
    rides: Arc<F>,
    capacity: CapacityGate,
    fares: FareSplitter,
    bounds: GeoBoundsTracker,
    locks: GroupLocks,
    lock_timeout: Duration,
}

impl<D, F> Clone for RideGroupRegistry<D, F>
where
    D: Database,
{
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            rides: self.rides.clone(),
            capacity: self.capacity.clone(),
            fares: self.fares,
            bounds: self.bounds,
            locks: self.locks.clone(),
            lock_timeout: self.lock_timeout,
        }
    }
}

impl<D> RideGroupRegistry<D, StoreRideFactory>
where
    D: Database,
{
    pub fn new(database: D, config: &RegistryConfig) -> Self {
        Self::with_collaborators(
            database,
            config,
            FixedCapacity(config.vehicle_capacity),
            StoreRideFactory,
        )
    }
}

impl<D, F> RideGroupRegistry<D, F>
where
    D: Database,
    F: RideFactory<D::Transaction> + 'static,
{
    pub fn with_collaborators<V>(
        database: D,
        config: &RegistryConfig,
        vehicles: V,
        rides: F,
    ) -> Self
    where
        V: VehicleCapacity + 'static,
    {
        Self {
            database,
            rides: Arc::new(rides),
            capacity: CapacityGate::new(vehicles),
            fares: FareSplitter::new(config.fare_surcharge_rate),
            bounds: GeoBoundsTracker::new(config.extent_reset),
            locks: GroupLocks::new(),
            lock_timeout: config.lock_timeout,
        }
    }

    pub fn database(&self) -> &D {
        &self.database
    }

    pub fn capacity(&self) -> u32 {
        self.capacity.capacity()
    }

    // - creation and loading -

    /// Persists a new group without driver or members and returns its id.
    ///
    /// A group always starts empty, so the rider counter is stored as zero
    /// whatever `num_of_riders` says. Riders are counted as they join.
    pub async fn create_group(
        &self,
        extent: GeoExtent,
        num_of_riders: u32,
        is_private: bool,
    ) -> GroupResult<Id<RideGroup>> {
        if num_of_riders != 0 {
            log::warn!(
                "ignoring initial rider count {} for new ride group, it starts empty",
                num_of_riders
            );
        }
        let now = Local::now();
        let mut group = RideGroup::new(extent, is_private);
        group.created_on = Some(now);
        group.updated_on = Some(now);

        let id = self.database.auto().insert_group(&group).await?;
        log::info!("created ride group {} (private: {})", id, is_private);
        Ok(id)
    }

    pub async fn load_group(&self, id: &Id<RideGroup>) -> GroupResult<RideGroup> {
        let mut database = self.database.auto();
        let mut group = database.get_group(id).await?;
        group.route_ids = database.member_route_ids(id).await?.into_iter().collect();
        Ok(group)
    }

    /// Loads the group the route is a member of.
    pub async fn load_group_by_route(&self, route_id: &Id<Route>) -> GroupResult<RideGroup> {
        let group_id = self.database.auto().group_id_by_route(route_id).await?;
        self.load_group(&group_id).await
    }

    // - membership -

    /// Whether the group currently has a free seat. The answer may be stale by
    /// the time it is used, `add_ride` checks again under the group lock.
    pub async fn can_admit(&self, group_id: &Id<RideGroup>) -> GroupResult<bool> {
        self.capacity
            .can_admit(&mut self.database.auto(), group_id)
            .await
    }

    /// Creates a ride for the rider in the group, grows the group's extent to
    /// the route and counts the new member.
    ///
    /// Only the first member of a group can be its founder, the flag is
    /// dropped for anyone joining a group that already has members.
    pub async fn add_ride(
        &self,
        group_id: &Id<RideGroup>,
        rider_id: &Id<Rider>,
        route: &Route,
        is_founding_member: bool,
    ) -> GroupResult<WithId<Ride>> {
        let _guard = self.locks.acquire(group_id, self.lock_timeout).await?;
        let mut tx = self.database.transaction().await?;
        tx.lock_group(group_id).await?;

        let group = tx.get_group(group_id).await?;
        if group.closed || group.completed {
            log::info!(
                "rider {} can not join ride group {}: group is closed",
                rider_id,
                group_id
            );
            return Err(GroupError::Closed);
        }

        let member_count = tx.member_count(group_id).await?;
        if !self.capacity.admits(member_count) {
            log::info!(
                "rider {} can not join ride group {}: all {} seats taken",
                rider_id,
                group_id,
                member_count
            );
            return Err(GroupError::CapacityExceeded {
                capacity: self.capacity.capacity(),
            });
        }

        let is_founding_member = if is_founding_member && member_count > 0 {
            log::debug!(
                "rider {} joins ride group {} with {} members, not as founder",
                rider_id,
                group_id,
                member_count
            );
            false
        } else {
            is_founding_member
        };

        let Some(ride) = self
            .rides
            .make_ride(&mut tx, rider_id, group_id, route, is_founding_member)
            .await?
        else {
            log::info!("ride of rider {} for ride group {} was refused", rider_id, group_id);
            return Err(GroupError::RideRefused);
        };

        let extent = self.bounds.grow(&group.extent, route);
        let num_of_riders = member_count + 1;
        if !tx
            .update_membership(group_id, &extent, num_of_riders, Local::now())
            .await?
        {
            return Err(GroupError::NotFound);
        }
        tx.commit().await?;

        log::info!(
            "rider {} joined ride group {} with ride {} ({}/{} seats)",
            rider_id,
            group_id,
            ride.id,
            num_of_riders,
            self.capacity.capacity()
        );
        Ok(ride)
    }

    /// Removes a member by deleting its route.
    ///
    /// Returns `false` and leaves `group` untouched if the route is not a
    /// member of the group or could not be deleted. When the founding member
    /// leaves, the extent is rebuilt from the remaining members as far as the
    /// reset policy allows.
    pub async fn remove_ride(
        &self,
        group: &mut RideGroup,
        member: MemberRef,
    ) -> GroupResult<bool> {
        let group_id = group.id.ok_or(GroupError::IdMissing)?;
        let _guard = self.locks.acquire(&group_id, self.lock_timeout).await?;
        let mut tx = self.database.transaction().await?;
        tx.lock_group(&group_id).await?;

        let stored = tx.get_group(&group_id).await?;
        if stored.closed {
            log::info!("can not remove member from closed ride group {}", group_id);
            return Err(GroupError::Closed);
        }

        let route_id = match member {
            MemberRef::Route(route_id) => route_id,
            MemberRef::Ride(ride_id) => tx.get_ride(&ride_id).await?.content.route_id,
        };
        let ride = match not_found_to_none(tx.ride_by_route(&route_id).await)? {
            Some(ride) if ride.content.group_id == group_id => ride,
            _ => {
                log::debug!("route {} is not a member of ride group {}", route_id, group_id);
                return Ok(false);
            }
        };
        if !tx.delete_route(&route_id).await? {
            log::warn!("could not delete route {} of ride group {}", route_id, group_id);
            return Ok(false);
        }

        let remaining = tx.member_routes(&group_id).await?;
        let num_of_riders = remaining.len() as u32;
        let extent = if self.bounds.should_reset(ride.content.is_first_member, &stored) {
            self.bounds
                .recompute(remaining.iter().map(|route| &route.content))
                .unwrap_or(stored.extent)
        } else {
            stored.extent
        };
        let now = Local::now();
        if !tx
            .update_membership(&group_id, &extent, num_of_riders, now)
            .await?
        {
            return Err(GroupError::NotFound);
        }
        tx.commit().await?;

        group.route_ids = remaining.into_iter().map(|route| route.id).collect();
        group.num_of_riders = num_of_riders;
        group.extent = extent;
        group.updated_on = Some(now);
        log::info!(
            "removed route {} from ride group {} ({} riders left)",
            route_id,
            group_id,
            num_of_riders
        );
        Ok(true)
    }

    // - driver and fare -

    /// Binds the driver to the group. Returns `false` if the group was never
    /// persisted or is gone from the store.
    ///
    /// Does not consult `is_assignable`; callers check it first.
    pub async fn assign_driver(
        &self,
        group: &mut RideGroup,
        driver_id: &Id<Driver>,
    ) -> GroupResult<bool> {
        let Some(group_id) = group.id else {
            return Ok(false);
        };
        let _guard = self.locks.acquire(&group_id, self.lock_timeout).await?;
        let now = Local::now();
        let updated = self
            .database
            .auto()
            .set_driver(&group_id, driver_id, now)
            .await?;
        if updated {
            group.driver_id = Some(*driver_id);
            group.updated_on = Some(now);
            log::info!("assigned driver {} to ride group {}", driver_id, group_id);
        }
        Ok(updated)
    }

    /// Each member's share of `total_fare`.
    pub fn distribute_fare(&self, group: &RideGroup, total_fare: f64) -> GroupResult<i64> {
        self.fares.split(total_fare, group.number_of_rides())
    }

    // - flags -

    /// Reads the closed flag from the store. A group that no longer exists
    /// counts as closed.
    pub async fn is_closed(&self, group: &mut RideGroup) -> GroupResult<bool> {
        let Some(group_id) = group.id else {
            return Ok(group.closed);
        };
        let stored = not_found_to_none(self.database.auto().get_group(&group_id).await)?;
        group.closed = stored.map(|stored| stored.closed).unwrap_or(true);
        Ok(group.closed)
    }

    /// Sets the closed flag. A closed group can not be reopened through the
    /// store.
    pub async fn has_closed(
        &self,
        group: &mut RideGroup,
        closed: bool,
        mode: WriteMode,
    ) -> GroupResult<bool> {
        if mode == WriteMode::Internal {
            group.closed = closed;
            return Ok(true);
        }
        let group_id = group.id.ok_or(GroupError::IdMissing)?;
        let _guard = self.locks.acquire(&group_id, self.lock_timeout).await?;
        let mut tx = self.database.transaction().await?;
        tx.lock_group(&group_id).await?;
        if tx.get_group(&group_id).await?.closed && !closed {
            log::warn!("refusing to reopen closed ride group {}", group_id);
            return Err(GroupError::Closed);
        }
        let now = Local::now();
        let updated = tx.set_closed(&group_id, closed, now).await?;
        tx.commit().await?;
        if updated {
            group.closed = closed;
            group.updated_on = Some(now);
            log::info!("ride group {} closed: {}", group_id, closed);
        }
        Ok(updated)
    }

    /// Reads the assignable flag from the store. A group that no longer
    /// exists can not be assigned.
    pub async fn get_is_assignable(&self, group: &mut RideGroup) -> GroupResult<bool> {
        let Some(group_id) = group.id else {
            return Ok(group.is_assignable);
        };
        let stored = not_found_to_none(self.database.auto().get_group(&group_id).await)?;
        group.is_assignable = stored.map(|stored| stored.is_assignable).unwrap_or(false);
        Ok(group.is_assignable)
    }

    pub async fn set_is_assignable(
        &self,
        group: &mut RideGroup,
        assignable: bool,
        mode: WriteMode,
    ) -> GroupResult<bool> {
        if mode == WriteMode::Internal {
            group.is_assignable = assignable;
            return Ok(true);
        }
        let group_id = group.id.ok_or(GroupError::IdMissing)?;
        let _guard = self.locks.acquire(&group_id, self.lock_timeout).await?;
        let now = Local::now();
        let updated = self
            .database
            .auto()
            .set_assignable(&group_id, assignable, now)
            .await?;
        if updated {
            group.is_assignable = assignable;
            group.updated_on = Some(now);
            log::info!("ride group {} assignable: {}", group_id, assignable);
        }
        Ok(updated)
    }

    /// Marks the trip as done, which also closes the group. Returns `false`
    /// if it was already completed.
    pub async fn complete_group(&self, group: &mut RideGroup) -> GroupResult<bool> {
        let group_id = group.id.ok_or(GroupError::IdMissing)?;
        let _guard = self.locks.acquire(&group_id, self.lock_timeout).await?;
        let mut tx = self.database.transaction().await?;
        tx.lock_group(&group_id).await?;
        if tx.get_group(&group_id).await?.completed {
            return Ok(false);
        }
        let now = Local::now();
        let updated = tx.set_completed(&group_id, now).await?;
        tx.commit().await?;
        if updated {
            group.completed = true;
            group.date_completed = Some(now);
            group.closed = true;
            group.updated_on = Some(now);
            log::info!("ride group {} completed", group_id);
        }
        Ok(updated)
    }
}

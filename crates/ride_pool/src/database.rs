use std::{error, result};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use model::{
    geo::GeoExtent,
    ride::{Ride, Route},
    ride_group::RideGroup,
    user::Driver,
    WithId,
};
use utility::id::Id;

#[derive(Debug)]
pub enum DatabaseError {
    NotFound,
    IdMissing,
    /// A lock held by another session was not released in time.
    Busy,
    Other(Box<dyn error::Error + Send + Sync>),
}

impl DatabaseError {
    pub fn other<E: Into<Box<dyn error::Error + Send + Sync>>>(why: E) -> Self {
        Self::Other(why.into())
    }
}

pub type Result<T> = result::Result<T, DatabaseError>;

/// Row level access to ride groups.
///
/// Groups returned by this repo never carry their members, `route_ids` is
/// always empty. Members are resolved through [`RideRepo`].
#[async_trait]
pub trait RideGroupRepo {
    /// Persists a new group and returns the id assigned by the store.
    async fn insert_group(&mut self, group: &RideGroup) -> Result<Id<RideGroup>>;

    async fn get_group(&mut self, id: &Id<RideGroup>) -> Result<RideGroup>;

    /// Serializes access to the group row until the surrounding transaction
    /// ends. Fails with `NotFound` if the group does not exist.
    async fn lock_group(&mut self, id: &Id<RideGroup>) -> Result<()>;

    /// Writes the extent and rider counter in one go. Returns `false` if no
    /// row was updated.
    async fn update_membership(
        &mut self,
        id: &Id<RideGroup>,
        extent: &GeoExtent,
        num_of_riders: u32,
        updated_on: DateTime<Local>,
    ) -> Result<bool>;

    async fn set_driver(
        &mut self,
        id: &Id<RideGroup>,
        driver_id: &Id<Driver>,
        updated_on: DateTime<Local>,
    ) -> Result<bool>;

    async fn set_closed(
        &mut self,
        id: &Id<RideGroup>,
        closed: bool,
        updated_on: DateTime<Local>,
    ) -> Result<bool>;

    async fn set_assignable(
        &mut self,
        id: &Id<RideGroup>,
        assignable: bool,
        updated_on: DateTime<Local>,
    ) -> Result<bool>;

    /// Marks the group completed and closed.
    async fn set_completed(
        &mut self,
        id: &Id<RideGroup>,
        completed_on: DateTime<Local>,
    ) -> Result<bool>;
}

/// Row level access to routes and the rides binding them to groups.
#[async_trait]
pub trait RideRepo {
    async fn insert_route(&mut self, route: &Route) -> Result<Id<Route>>;

    /// Fails if the route is already bound to a group.
    async fn insert_ride(&mut self, ride: &Ride) -> Result<Id<Ride>>;

    async fn get_ride(&mut self, id: &Id<Ride>) -> Result<WithId<Ride>>;

    async fn ride_by_route(&mut self, route_id: &Id<Route>) -> Result<WithId<Ride>>;

    async fn group_id_by_route(&mut self, route_id: &Id<Route>) -> Result<Id<RideGroup>>;

    /// Member route ids in the order the rides were created.
    async fn member_route_ids(
        &mut self,
        group_id: &Id<RideGroup>,
    ) -> Result<Vec<Id<Route>>>;

    async fn member_routes(
        &mut self,
        group_id: &Id<RideGroup>,
    ) -> Result<Vec<WithId<Route>>>;

    async fn member_count(&mut self, group_id: &Id<RideGroup>) -> Result<u32>;

    /// Deletes the route together with the ride referencing it. Returns `false`
    /// if there was no such route.
    async fn delete_route(&mut self, route_id: &Id<Route>) -> Result<bool>;
}

pub trait DatabaseOperations: RideGroupRepo + RideRepo {}

impl<T> DatabaseOperations for T where T: RideGroupRepo + RideRepo {}

#[async_trait]
pub trait DatabaseTransaction: DatabaseOperations {
    async fn commit(self) -> Result<()>;
}

pub trait DatabaseAutocommit: DatabaseOperations {}

/// A ride store. Cloning the handle is cheap and every clone refers to the
/// same underlying store. A transaction that is dropped without `commit` has
/// no effect.
#[async_trait]
pub trait Database: Clone + Send + Sync + Sized + 'static {
    type Transaction: DatabaseTransaction + Send + 'static;
    type Autocommit: DatabaseAutocommit + Send + 'static;

    async fn transaction(&self) -> Result<Self::Transaction>;

    fn auto(&self) -> Self::Autocommit;
}

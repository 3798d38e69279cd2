use async_trait::async_trait;
use model::{
    geo::Coordinate,
    ride::{Ride, Route},
    ride_group::RideGroup,
    WithId,
};
use ride_pool::database::{Result, RideRepo};
use sqlx::prelude::FromRow;
use utility::id::Id;

use super::DatabaseRow;
use crate::{
    queries::ride::{
        delete_route, get_ride, group_id_by_route, insert_ride, insert_route,
        member_count, member_route_ids, member_routes, ride_by_route,
    },
    PgDatabaseAutocommit, PgDatabaseTransaction,
};

#[derive(Debug, Clone, FromRow)]
pub struct RouteRow {
    pub id: i64,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub dropoff_latitude: f64,
    pub dropoff_longitude: f64,
}

impl DatabaseRow for RouteRow {
    type Model = Route;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Route::new(
            Coordinate::new(self.pickup_latitude, self.pickup_longitude),
            Coordinate::new(self.dropoff_latitude, self.dropoff_longitude),
        )
    }

    fn from_model(route: Self::Model) -> Self {
        Self {
            id: 0,
            pickup_latitude: route.pickup.latitude,
            pickup_longitude: route.pickup.longitude,
            dropoff_latitude: route.dropoff.latitude,
            dropoff_longitude: route.dropoff.longitude,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RideRow {
    pub id: i64,
    pub rider_id: i64,
    pub group_id: i64,
    pub route_id: i64,
    pub is_first_member: bool,
}

impl DatabaseRow for RideRow {
    type Model = Ride;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Ride {
            rider_id: Id::new(self.rider_id),
            group_id: Id::new(self.group_id),
            route_id: Id::new(self.route_id),
            is_first_member: self.is_first_member,
        }
    }

    fn from_model(ride: Self::Model) -> Self {
        Self {
            id: 0,
            rider_id: ride.rider_id.raw(),
            group_id: ride.group_id.raw(),
            route_id: ride.route_id.raw(),
            is_first_member: ride.is_first_member,
        }
    }
}

// Repo

#[async_trait]
impl RideRepo for PgDatabaseAutocommit {
    async fn insert_route(&mut self, route: &Route) -> Result<Id<Route>> {
        insert_route(&self.pool, route).await
    }

    async fn insert_ride(&mut self, ride: &Ride) -> Result<Id<Ride>> {
        insert_ride(&self.pool, ride).await
    }

    async fn get_ride(&mut self, id: &Id<Ride>) -> Result<WithId<Ride>> {
        get_ride(&self.pool, id).await
    }

    async fn ride_by_route(&mut self, route_id: &Id<Route>) -> Result<WithId<Ride>> {
        ride_by_route(&self.pool, route_id).await
    }

    async fn group_id_by_route(&mut self, route_id: &Id<Route>) -> Result<Id<RideGroup>> {
        group_id_by_route(&self.pool, route_id).await
    }

    async fn member_route_ids(
        &mut self,
        group_id: &Id<RideGroup>,
    ) -> Result<Vec<Id<Route>>> {
        member_route_ids(&self.pool, group_id).await
    }

    async fn member_routes(
        &mut self,
        group_id: &Id<RideGroup>,
    ) -> Result<Vec<WithId<Route>>> {
        member_routes(&self.pool, group_id).await
    }

    async fn member_count(&mut self, group_id: &Id<RideGroup>) -> Result<u32> {
        member_count(&self.pool, group_id).await
    }

    async fn delete_route(&mut self, route_id: &Id<Route>) -> Result<bool> {
        delete_route(&self.pool, route_id).await
    }
}

#[async_trait]
impl<'a> RideRepo for PgDatabaseTransaction<'a> {
    async fn insert_route(&mut self, route: &Route) -> Result<Id<Route>> {
        insert_route(&mut *self.tx, route).await
    }

    async fn insert_ride(&mut self, ride: &Ride) -> Result<Id<Ride>> {
        insert_ride(&mut *self.tx, ride).await
    }

    async fn get_ride(&mut self, id: &Id<Ride>) -> Result<WithId<Ride>> {
        get_ride(&mut *self.tx, id).await
    }

    async fn ride_by_route(&mut self, route_id: &Id<Route>) -> Result<WithId<Ride>> {
        ride_by_route(&mut *self.tx, route_id).await
    }

    async fn group_id_by_route(&mut self, route_id: &Id<Route>) -> Result<Id<RideGroup>> {
        group_id_by_route(&mut *self.tx, route_id).await
    }

    async fn member_route_ids(
        &mut self,
        group_id: &Id<RideGroup>,
    ) -> Result<Vec<Id<Route>>> {
        member_route_ids(&mut *self.tx, group_id).await
    }

    async fn member_routes(
        &mut self,
        group_id: &Id<RideGroup>,
    ) -> Result<Vec<WithId<Route>>> {
        member_routes(&mut *self.tx, group_id).await
    }

    async fn member_count(&mut self, group_id: &Id<RideGroup>) -> Result<u32> {
        member_count(&mut *self.tx, group_id).await
    }

    async fn delete_route(&mut self, route_id: &Id<Route>) -> Result<bool> {
        delete_route(&mut *self.tx, route_id).await
    }
}

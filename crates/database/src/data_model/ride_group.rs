use async_trait::async_trait;
use chrono::{DateTime, Local};
use indexmap::IndexSet;
use model::{
    geo::GeoExtent,
    ride_group::RideGroup,
    user::Driver,
};
use ride_pool::database::{Result, RideGroupRepo};
use sqlx::prelude::FromRow;
use utility::id::{Id, IdWrapper};

use super::DatabaseRow;
use crate::{
    queries::ride_group::{
        get, insert, lock, set_assignable, set_closed, set_completed, set_driver,
        set_lock_timeout, update_membership,
    },
    PgDatabaseAutocommit, PgDatabaseTransaction,
};

#[derive(Debug, Clone, FromRow)]
pub struct RideGroupRow {
    pub id: i64,
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub end_latitude: f64,
    pub end_longitude: f64,
    pub num_riders: i32,
    pub driver_id: Option<i64>,
    pub completed: bool,
    pub completed_on: Option<DateTime<Local>>,
    pub is_closed: bool,
    pub is_private: bool,
    pub is_assignable: bool,
    pub created_on: Option<DateTime<Local>>,
    pub updated_on: Option<DateTime<Local>>,
}

impl DatabaseRow for RideGroupRow {
    type Model = RideGroup;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    /// Members live in their own table, `route_ids` stays empty.
    fn to_model(self) -> Self::Model {
        RideGroup {
            id: Some(Id::new(self.id)),
            route_ids: IndexSet::new(),
            driver_id: self.driver_id.map(|id| Id::new(id)),
            extent: GeoExtent {
                start_latitude: self.start_latitude,
                start_longitude: self.start_longitude,
                end_latitude: self.end_latitude,
                end_longitude: self.end_longitude,
            },
            num_of_riders: u32::try_from(self.num_riders).unwrap_or_default(),
            completed: self.completed,
            date_completed: self.completed_on,
            closed: self.is_closed,
            is_private: self.is_private,
            is_assignable: self.is_assignable,
            created_on: self.created_on,
            updated_on: self.updated_on,
        }
    }

    fn from_model(group: Self::Model) -> Self {
        Self {
            id: group.id.raw().unwrap_or_default(),
            start_latitude: group.extent.start_latitude,
            start_longitude: group.extent.start_longitude,
            end_latitude: group.extent.end_latitude,
            end_longitude: group.extent.end_longitude,
            num_riders: i32::try_from(group.num_of_riders).unwrap_or(i32::MAX),
            driver_id: group.driver_id.raw(),
            completed: group.completed,
            completed_on: group.date_completed,
            is_closed: group.closed,
            is_private: group.is_private,
            is_assignable: group.is_assignable,
            created_on: group.created_on,
            updated_on: group.updated_on,
        }
    }
}

// Repo

#[async_trait]
impl RideGroupRepo for PgDatabaseAutocommit {
    async fn insert_group(&mut self, group: &RideGroup) -> Result<Id<RideGroup>> {
        insert(&self.pool, group).await
    }

    async fn get_group(&mut self, id: &Id<RideGroup>) -> Result<RideGroup> {
        get(&self.pool, id).await
    }

    async fn lock_group(&mut self, id: &Id<RideGroup>) -> Result<()> {
        lock(&self.pool, id).await
    }

    async fn update_membership(
        &mut self,
        id: &Id<RideGroup>,
        extent: &GeoExtent,
        num_of_riders: u32,
        updated_on: DateTime<Local>,
    ) -> Result<bool> {
        update_membership(&self.pool, id, extent, num_of_riders, updated_on).await
    }

    async fn set_driver(
        &mut self,
        id: &Id<RideGroup>,
        driver_id: &Id<Driver>,
        updated_on: DateTime<Local>,
    ) -> Result<bool> {
        set_driver(&self.pool, id, driver_id, updated_on).await
    }

    async fn set_closed(
        &mut self,
        id: &Id<RideGroup>,
        closed: bool,
        updated_on: DateTime<Local>,
    ) -> Result<bool> {
        set_closed(&self.pool, id, closed, updated_on).await
    }

    async fn set_assignable(
        &mut self,
        id: &Id<RideGroup>,
        assignable: bool,
        updated_on: DateTime<Local>,
    ) -> Result<bool> {
        set_assignable(&self.pool, id, assignable, updated_on).await
    }

    async fn set_completed(
        &mut self,
        id: &Id<RideGroup>,
        completed_on: DateTime<Local>,
    ) -> Result<bool> {
        set_completed(&self.pool, id, completed_on).await
    }
}

#[async_trait]
impl<'a> RideGroupRepo for PgDatabaseTransaction<'a> {
    async fn insert_group(&mut self, group: &RideGroup) -> Result<Id<RideGroup>> {
        insert(&mut *self.tx, group).await
    }

    async fn get_group(&mut self, id: &Id<RideGroup>) -> Result<RideGroup> {
        get(&mut *self.tx, id).await
    }

    async fn lock_group(&mut self, id: &Id<RideGroup>) -> Result<()> {
        set_lock_timeout(&mut *self.tx, self.lock_timeout).await?;
        lock(&mut *self.tx, id).await
    }

    async fn update_membership(
        &mut self,
        id: &Id<RideGroup>,
        extent: &GeoExtent,
        num_of_riders: u32,
        updated_on: DateTime<Local>,
    ) -> Result<bool> {
        update_membership(&mut *self.tx, id, extent, num_of_riders, updated_on).await
    }

    async fn set_driver(
        &mut self,
        id: &Id<RideGroup>,
        driver_id: &Id<Driver>,
        updated_on: DateTime<Local>,
    ) -> Result<bool> {
        set_driver(&mut *self.tx, id, driver_id, updated_on).await
    }

    async fn set_closed(
        &mut self,
        id: &Id<RideGroup>,
        closed: bool,
        updated_on: DateTime<Local>,
    ) -> Result<bool> {
        set_closed(&mut *self.tx, id, closed, updated_on).await
    }

    async fn set_assignable(
        &mut self,
        id: &Id<RideGroup>,
        assignable: bool,
        updated_on: DateTime<Local>,
    ) -> Result<bool> {
        set_assignable(&mut *self.tx, id, assignable, updated_on).await
    }

    async fn set_completed(
        &mut self,
        id: &Id<RideGroup>,
        completed_on: DateTime<Local>,
    ) -> Result<bool> {
        set_completed(&mut *self.tx, id, completed_on).await
    }
}

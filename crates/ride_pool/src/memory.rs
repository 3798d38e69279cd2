//! A ride store living entirely in process memory.
//!
//! Suitable for a single instance deployment and for tests. Transactions work
//! on a private copy of the store and publish the rows they touched on
//! commit. Concurrent writers to the same group must be serialized by the
//! caller, which the registry's group locks take care of.

use std::{
    collections::{BTreeMap, BTreeSet},
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

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

use crate::database::{
    Database, DatabaseAutocommit, DatabaseError, DatabaseTransaction, Result,
    RideGroupRepo, RideRepo,
};

/// Error returned while failures are switched on for testing.
#[derive(Debug)]
pub struct InjectedFailure;

impl fmt::Display for InjectedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "injected ride store failure")
    }
}

impl Error for InjectedFailure {}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    groups: BTreeMap<i64, RideGroup>,
    routes: BTreeMap<i64, Route>,
    rides: BTreeMap<i64, Ride>,
}

impl MemoryState {
    fn rides_of_group<'a>(
        &'a self,
        group_id: &'a Id<RideGroup>,
    ) -> impl Iterator<Item = (&'a i64, &'a Ride)> + 'a {
        self.rides
            .iter()
            .filter(move |(_, ride)| ride.group_id == *group_id)
    }

    fn ride_by_route(&self, route_id: &Id<Route>) -> Option<WithId<Ride>> {
        self.rides
            .iter()
            .find(|(_, ride)| ride.route_id == *route_id)
            .map(|(id, ride)| WithId::new(Id::new(*id), ride.clone()))
    }
}

/// Keys written by a transaction.
#[derive(Debug, Default)]
struct Dirty {
    groups: BTreeSet<i64>,
    routes: BTreeSet<i64>,
    rides: BTreeSet<i64>,
}

#[derive(Debug)]
struct Staged {
    working: MemoryState,
    dirty: Dirty,
}

#[derive(Default)]
struct Shared {
    state: Mutex<MemoryState>,
    next_id: AtomicI64,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    latency_ms: AtomicU64,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Simulated round trip, then the injected failure if any.
    async fn enter(&self, write: bool) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        let failing = if write {
            self.fail_writes.load(Ordering::SeqCst)
        } else {
            self.fail_reads.load(Ordering::SeqCst)
        };
        if failing {
            return Err(DatabaseError::other(InjectedFailure));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryDatabase {
    shared: Arc<Shared>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following write (including commits) fail.
    pub fn fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every following read fail.
    pub fn fail_reads(&self, fail: bool) {
        self.shared.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Delays every store operation, which lets concurrent callers interleave.
    pub fn set_latency(&self, latency: Duration) {
        self.shared
            .latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn group_count(&self) -> usize {
        self.shared.state().groups.len()
    }

    pub fn route_count(&self) -> usize {
        self.shared.state().routes.len()
    }

    pub fn ride_count(&self) -> usize {
        self.shared.state().rides.len()
    }
}

/// Either an autocommit handle writing straight to the store, or a
/// transaction staging its writes until `commit`.
pub struct MemorySession {
    shared: Arc<Shared>,
    staged: Option<Staged>,
}

impl MemorySession {
    fn read<R>(&self, f: impl FnOnce(&MemoryState) -> R) -> R {
        match &self.staged {
            Some(staged) => f(&staged.working),
            None => f(&self.shared.state()),
        }
    }

    fn write<R>(&mut self, f: impl FnOnce(&mut MemoryState, &mut Dirty) -> R) -> R {
        match &mut self.staged {
            Some(staged) => f(&mut staged.working, &mut staged.dirty),
            None => f(&mut self.shared.state(), &mut Dirty::default()),
        }
    }

    async fn update_group<U>(&mut self, id: &Id<RideGroup>, update: U) -> Result<bool>
    where
        U: FnOnce(&mut RideGroup) + Send,
    {
        self.shared.enter(true).await?;
        let id = id.raw();
        Ok(self.write(|state, dirty| match state.groups.get_mut(&id) {
            Some(group) => {
                update(group);
                dirty.groups.insert(id);
                true
            }
            None => false,
        }))
    }
}

#[async_trait]
impl RideGroupRepo for MemorySession {
    async fn insert_group(&mut self, group: &RideGroup) -> Result<Id<RideGroup>> {
        self.shared.enter(true).await?;
        let id = self.shared.next_id();
        let mut stored = group.clone();
        stored.id = Some(Id::new(id));
        stored.route_ids.clear();
        self.write(|state, dirty| {
            state.groups.insert(id, stored);
            dirty.groups.insert(id);
        });
        Ok(Id::new(id))
    }

    async fn get_group(&mut self, id: &Id<RideGroup>) -> Result<RideGroup> {
        self.shared.enter(false).await?;
        self.read(|state| state.groups.get(&id.raw()).cloned())
            .ok_or(DatabaseError::NotFound)
    }

    async fn lock_group(&mut self, id: &Id<RideGroup>) -> Result<()> {
        self.shared.enter(false).await?;
        if self.read(|state| state.groups.contains_key(&id.raw())) {
            Ok(())
        } else {
            Err(DatabaseError::NotFound)
        }
    }

    async fn update_membership(
        &mut self,
        id: &Id<RideGroup>,
        extent: &GeoExtent,
        num_of_riders: u32,
        updated_on: DateTime<Local>,
    ) -> Result<bool> {
        let extent = *extent;
        self.update_group(id, |group| {
            group.extent = extent;
            group.num_of_riders = num_of_riders;
            group.updated_on = Some(updated_on);
        })
        .await
    }

    async fn set_driver(
        &mut self,
        id: &Id<RideGroup>,
        driver_id: &Id<Driver>,
        updated_on: DateTime<Local>,
    ) -> Result<bool> {
        let driver_id = *driver_id;
        self.update_group(id, |group| {
            group.driver_id = Some(driver_id);
            group.updated_on = Some(updated_on);
        })
        .await
    }

    async fn set_closed(
        &mut self,
        id: &Id<RideGroup>,
        closed: bool,
        updated_on: DateTime<Local>,
    ) -> Result<bool> {
        self.update_group(id, |group| {
            group.closed = closed;
            group.updated_on = Some(updated_on);
        })
        .await
    }

    async fn set_assignable(
        &mut self,
        id: &Id<RideGroup>,
        assignable: bool,
        updated_on: DateTime<Local>,
    ) -> Result<bool> {
        self.update_group(id, |group| {
            group.is_assignable = assignable;
            group.updated_on = Some(updated_on);
        })
        .await
    }

    async fn set_completed(
        &mut self,
        id: &Id<RideGroup>,
        completed_on: DateTime<Local>,
    ) -> Result<bool> {
        self.update_group(id, |group| {
            group.completed = true;
            group.closed = true;
            group.date_completed = Some(completed_on);
            group.updated_on = Some(completed_on);
        })
        .await
    }
}

#[async_trait]
impl RideRepo for MemorySession {
    async fn insert_route(&mut self, route: &Route) -> Result<Id<Route>> {
        self.shared.enter(true).await?;
        let id = self.shared.next_id();
        let route = *route;
        self.write(|state, dirty| {
            state.routes.insert(id, route);
            dirty.routes.insert(id);
        });
        Ok(Id::new(id))
    }

    async fn insert_ride(&mut self, ride: &Ride) -> Result<Id<Ride>> {
        self.shared.enter(true).await?;
        let id = self.shared.next_id();
        let ride = ride.clone();
        self.write(|state, dirty| {
            if !state.groups.contains_key(&ride.group_id.raw()) {
                return Err(DatabaseError::other(format!(
                    "ride group {} does not exist",
                    ride.group_id
                )));
            }
            if !state.routes.contains_key(&ride.route_id.raw()) {
                return Err(DatabaseError::other(format!(
                    "route {} does not exist",
                    ride.route_id
                )));
            }
            if state.ride_by_route(&ride.route_id).is_some() {
                return Err(DatabaseError::other(format!(
                    "route {} already belongs to a ride group",
                    ride.route_id
                )));
            }
            state.rides.insert(id, ride);
            dirty.rides.insert(id);
            Ok(Id::new(id))
        })
    }

    async fn get_ride(&mut self, id: &Id<Ride>) -> Result<WithId<Ride>> {
        self.shared.enter(false).await?;
        self.read(|state| state.rides.get(&id.raw()).cloned())
            .map(|ride| WithId::new(*id, ride))
            .ok_or(DatabaseError::NotFound)
    }

    async fn ride_by_route(&mut self, route_id: &Id<Route>) -> Result<WithId<Ride>> {
        self.shared.enter(false).await?;
        self.read(|state| state.ride_by_route(route_id))
            .ok_or(DatabaseError::NotFound)
    }

    async fn group_id_by_route(&mut self, route_id: &Id<Route>) -> Result<Id<RideGroup>> {
        self.ride_by_route(route_id)
            .await
            .map(|ride| ride.content.group_id)
    }

    async fn member_route_ids(
        &mut self,
        group_id: &Id<RideGroup>,
    ) -> Result<Vec<Id<Route>>> {
        self.shared.enter(false).await?;
        Ok(self.read(|state| {
            state
                .rides_of_group(group_id)
                .map(|(_, ride)| ride.route_id)
                .collect()
        }))
    }

    async fn member_routes(
        &mut self,
        group_id: &Id<RideGroup>,
    ) -> Result<Vec<WithId<Route>>> {
        self.shared.enter(false).await?;
        Ok(self.read(|state| {
            state
                .rides_of_group(group_id)
                .filter_map(|(_, ride)| {
                    state
                        .routes
                        .get(&ride.route_id.raw())
                        .map(|route| WithId::new(ride.route_id, *route))
                })
                .collect()
        }))
    }

    async fn member_count(&mut self, group_id: &Id<RideGroup>) -> Result<u32> {
        self.shared.enter(false).await?;
        Ok(self.read(|state| state.rides_of_group(group_id).count() as u32))
    }

    async fn delete_route(&mut self, route_id: &Id<Route>) -> Result<bool> {
        self.shared.enter(true).await?;
        let route_id = *route_id;
        Ok(self.write(|state, dirty| {
            if state.routes.remove(&route_id.raw()).is_none() {
                return false;
            }
            dirty.routes.insert(route_id.raw());
            let rides = state
                .rides
                .iter()
                .filter(|(_, ride)| ride.route_id == route_id)
                .map(|(id, _)| *id)
                .collect::<Vec<_>>();
            for ride in rides {
                state.rides.remove(&ride);
                dirty.rides.insert(ride);
            }
            true
        }))
    }
}

#[async_trait]
impl DatabaseTransaction for MemorySession {
    async fn commit(self) -> Result<()> {
        self.shared.enter(true).await?;
        let Some(Staged { mut working, dirty }) = self.staged else {
            return Ok(());
        };
        let mut state = self.shared.state();
        for id in dirty.groups {
            match working.groups.remove(&id) {
                Some(group) => state.groups.insert(id, group),
                None => state.groups.remove(&id),
            };
        }
        for id in dirty.routes {
            match working.routes.remove(&id) {
                Some(route) => state.routes.insert(id, route),
                None => state.routes.remove(&id),
            };
        }
        for id in dirty.rides {
            match working.rides.remove(&id) {
                Some(ride) => state.rides.insert(id, ride),
                None => state.rides.remove(&id),
            };
        }
        Ok(())
    }
}

impl DatabaseAutocommit for MemorySession {}

#[async_trait]
impl Database for MemoryDatabase {
    type Transaction = MemorySession;
    type Autocommit = MemorySession;

    async fn transaction(&self) -> Result<Self::Transaction> {
        self.shared.enter(false).await?;
        let working = self.shared.state().clone();
        Ok(MemorySession {
            shared: self.shared.clone(),
            staged: Some(Staged {
                working,
                dirty: Dirty::default(),
            }),
        })
    }

    fn auto(&self) -> Self::Autocommit {
        MemorySession {
            shared: self.shared.clone(),
            staged: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use model::geo::Coordinate;

    use super::*;

    fn group() -> RideGroup {
        RideGroup::new(
            GeoExtent::covering(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0)),
            false,
        )
    }

    #[tokio::test]
    async fn uncommitted_transactions_leave_no_trace() {
        let database = MemoryDatabase::new();
        let mut tx = database.transaction().await.unwrap();
        tx.insert_group(&group()).await.unwrap();
        drop(tx);
        assert_eq!(database.group_count(), 0);
    }

    #[tokio::test]
    async fn committed_writes_become_visible() {
        let database = MemoryDatabase::new();
        let mut tx = database.transaction().await.unwrap();
        let id = tx.insert_group(&group()).await.unwrap();
        assert!(database.auto().get_group(&id).await.is_err());
        tx.commit().await.unwrap();
        let stored = database.auto().get_group(&id).await.unwrap();
        assert_eq!(stored.id, Some(id));
    }

    #[tokio::test]
    async fn deleting_a_route_removes_its_ride() {
        let database = MemoryDatabase::new();
        let mut db = database.auto();
        let group_id = db.insert_group(&group()).await.unwrap();
        let route = Route::new(Coordinate::new(0.1, 0.1), Coordinate::new(0.2, 0.2));
        let route_id = db.insert_route(&route).await.unwrap();
        db.insert_ride(&Ride {
            rider_id: Id::new(1),
            group_id,
            route_id,
            is_first_member: true,
        })
        .await
        .unwrap();
        assert_eq!(db.member_count(&group_id).await.unwrap(), 1);

        assert!(db.delete_route(&route_id).await.unwrap());
        assert!(!db.delete_route(&route_id).await.unwrap());
        assert_eq!(db.member_count(&group_id).await.unwrap(), 0);
        assert_eq!(database.ride_count(), 0);
    }

    #[tokio::test]
    async fn a_route_can_only_be_bound_once() {
        let database = MemoryDatabase::new();
        let mut db = database.auto();
        let group_id = db.insert_group(&group()).await.unwrap();
        let route = Route::new(Coordinate::new(0.1, 0.1), Coordinate::new(0.2, 0.2));
        let route_id = db.insert_route(&route).await.unwrap();
        let ride = Ride {
            rider_id: Id::new(1),
            group_id,
            route_id,
            is_first_member: false,
        };
        db.insert_ride(&ride).await.unwrap();
        assert!(matches!(
            db.insert_ride(&ride).await,
            Err(DatabaseError::Other(_))
        ));
    }

    #[tokio::test]
    async fn injected_failures_surface_as_errors() {
        let database = MemoryDatabase::new();
        database.fail_writes(true);
        assert!(matches!(
            database.auto().insert_group(&group()).await,
            Err(DatabaseError::Other(_))
        ));
        database.fail_writes(false);
        database.fail_reads(true);
        assert!(matches!(
            database.auto().get_group(&Id::new(1)).await,
            Err(DatabaseError::Other(_))
        ));
    }
}

#![allow(dead_code)]

use std::time::Duration;

use model::{
    geo::{Coordinate, GeoExtent},
    ride::Route,
    ride_group::RideGroup,
};
use ride_pool::{
    config::{ExtentResetPolicy, RegistryConfig},
    memory::MemoryDatabase,
    registry::RideGroupRegistry,
};
use utility::id::Id;

pub type Registry = RideGroupRegistry<MemoryDatabase>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn config(vehicle_capacity: u32) -> RegistryConfig {
    RegistryConfig {
        vehicle_capacity,
        ..Default::default()
    }
}

pub fn registry(vehicle_capacity: u32) -> (MemoryDatabase, Registry) {
    registry_with(config(vehicle_capacity))
}

pub fn registry_with_policy(
    vehicle_capacity: u32,
    extent_reset: ExtentResetPolicy,
) -> (MemoryDatabase, Registry) {
    registry_with(RegistryConfig {
        extent_reset,
        ..config(vehicle_capacity)
    })
}

pub fn registry_with(config: RegistryConfig) -> (MemoryDatabase, Registry) {
    init_logging();
    let database = MemoryDatabase::new();
    let registry = RideGroupRegistry::new(database.clone(), &config);
    (database, registry)
}

pub fn slow_registry(
    vehicle_capacity: u32,
    latency: Duration,
    lock_timeout: Duration,
) -> (MemoryDatabase, Registry) {
    let (database, registry) = registry_with(RegistryConfig {
        lock_timeout,
        ..config(vehicle_capacity)
    });
    database.set_latency(latency);
    (database, registry)
}

pub fn route(pickup: (f64, f64), dropoff: (f64, f64)) -> Route {
    Route::new(
        Coordinate::new(pickup.0, pickup.1),
        Coordinate::new(dropoff.0, dropoff.1),
    )
}

/// A short trip through Kiel, shifted a little for every rider.
pub fn kiel_route(rider: i64) -> Route {
    let shift = rider as f64 * 0.001;
    route((54.32 + shift, 10.12 - shift), (54.34 - shift, 10.14 + shift))
}

pub fn extent_of(route: &Route) -> GeoExtent {
    GeoExtent::covering(route.pickup, route.dropoff)
}

/// Creates a group and lets `riders` join it, the first one as founder.
pub async fn group_with_riders(registry: &Registry, riders: i64) -> Id<RideGroup> {
    let group_id = registry
        .create_group(extent_of(&kiel_route(1)), 0, false)
        .await
        .unwrap();
    for rider in 1..=riders {
        registry
            .add_ride(&group_id, &Id::new(rider), &kiel_route(rider), rider == 1)
            .await
            .unwrap();
    }
    group_id
}

pub fn assert_consistent(group: &RideGroup) {
    assert_eq!(
        group.num_of_riders as usize,
        group.route_ids.len(),
        "rider counter out of sync with members of group {:?}",
        group.id
    );
}

use std::error::Error;

use database::{DatabaseConnectionInfo, PgDatabase};
use model::{
    geo::{Coordinate, GeoExtent},
    ride::Route,
};
use ride_pool::{
    config::RegistryConfig,
    database::Database,
    memory::MemoryDatabase,
    registry::{MemberRef, RideGroupRegistry, WriteMode},
};
use utility::id::Id;

const TOTAL_FARE: f64 = 24.0;

/// Three riders share a trip across Kiel, the founder drops out and a driver
/// takes the rest.
async fn run<D: Database>(database: D, config: &RegistryConfig) -> Result<(), Box<dyn Error>> {
    let registry = RideGroupRegistry::new(database, config);
    let routes = [
        Route::new(Coordinate::new(54.3233, 10.1228), Coordinate::new(54.3520, 10.1320)),
        Route::new(Coordinate::new(54.3150, 10.1300), Coordinate::new(54.3480, 10.1410)),
        Route::new(Coordinate::new(54.3301, 10.1190), Coordinate::new(54.3610, 10.1502)),
    ];

    let group_id = registry
        .create_group(GeoExtent::covering(routes[0].pickup, routes[0].dropoff), 0, false)
        .await?;
    let mut rides = Vec::new();
    for (rider, route) in routes.iter().enumerate() {
        let ride = registry
            .add_ride(&group_id, &Id::new(rider as i64 + 1), route, rider == 0)
            .await?;
        let group = registry.load_group(&group_id).await?;
        let share = registry.distribute_fare(&group, TOTAL_FARE)?;
        log::info!(
            "{} riders pay {} each of {}",
            group.number_of_rides(),
            share,
            TOTAL_FARE
        );
        rides.push(ride);
    }

    let mut group = registry.load_group(&group_id).await?;
    registry
        .remove_ride(&mut group, MemberRef::Ride(rides[0].id))
        .await?;
    registry
        .has_closed(&mut group, true, WriteMode::Persisted)
        .await?;
    if registry.get_is_assignable(&mut group).await? {
        registry.assign_driver(&mut group, &Id::new(1)).await?;
    }
    let share = registry.distribute_fare(&group, TOTAL_FARE)?;
    log::info!("each remaining rider pays {}", share);

    println!("{}", serde_json::to_string_pretty(&group)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let config = RegistryConfig::from_env();

    match DatabaseConnectionInfo::from_env() {
        Some(info) => run(PgDatabase::connect(info).await?, &config).await,
        None => {
            log::info!("no database configured, using the in-memory store");
            run(MemoryDatabase::new(), &config).await
        }
    }
}

use model::{
    ride::{Ride, Route},
    ride_group::RideGroup,
    WithId,
};
use ride_pool::database::Result;
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{
    ride::{RideRow, RouteRow},
    with_id, with_ids,
};

use super::convert_error;

// routes

pub async fn insert_route<'c, E>(executor: E, route: &Route) -> Result<Id<Route>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        "
        INSERT INTO routes(
            pickup_latitude,
            pickup_longitude,
            dropoff_latitude,
            dropoff_longitude
        )
        VALUES ($1, $2, $3, $4)
        RETURNING id;
        ",
    )
    .bind(route.pickup.latitude)
    .bind(route.pickup.longitude)
    .bind(route.dropoff.latitude)
    .bind(route.dropoff.longitude)
    .fetch_one(executor)
    .await
    .map(|id: i64| Id::new(id))
    .map_err(convert_error)
}

/// Deletes the route, the ride referencing it goes with it.
pub async fn delete_route<'c, E>(executor: E, route_id: &Id<Route>) -> Result<bool>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("DELETE FROM routes WHERE id = $1;")
        .bind(route_id.raw())
        .execute(executor)
        .await
        .map(|result| result.rows_affected() > 0)
        .map_err(convert_error)
}

pub async fn member_routes<'c, E>(
    executor: E,
    group_id: &Id<RideGroup>,
) -> Result<Vec<WithId<Route>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            routes.id,
            routes.pickup_latitude,
            routes.pickup_longitude,
            routes.dropoff_latitude,
            routes.dropoff_longitude
        FROM
            rides JOIN routes ON routes.id = rides.route_id
        WHERE rides.group_id = $1
        ORDER BY rides.id ASC;
        ",
    )
    .bind(group_id.raw())
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|routes: Vec<RouteRow>| Ok(with_ids(routes)))
}

pub async fn member_route_ids<'c, E>(
    executor: E,
    group_id: &Id<RideGroup>,
) -> Result<Vec<Id<Route>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT route_id FROM rides WHERE group_id = $1 ORDER BY id ASC;")
        .bind(group_id.raw())
        .fetch_all(executor)
        .await
        .map_err(convert_error)?
        .into_iter()
        .map(|id: i64| Id::new(id))
        .collect::<Vec<_>>()
        .let_owned(|ids| Ok(ids))
}

// rides

pub async fn insert_ride<'c, E>(executor: E, ride: &Ride) -> Result<Id<Ride>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        "
        INSERT INTO rides(
            rider_id,
            group_id,
            route_id,
            is_first_member
        )
        VALUES ($1, $2, $3, $4)
        RETURNING id;
        ",
    )
    .bind(ride.rider_id.raw())
    .bind(ride.group_id.raw())
    .bind(ride.route_id.raw())
    .bind(ride.is_first_member)
    .fetch_one(executor)
    .await
    .map(|id: i64| Id::new(id))
    .map_err(convert_error)
}

pub async fn get_ride<'c, E>(executor: E, id: &Id<Ride>) -> Result<WithId<Ride>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            id, rider_id, group_id, route_id, is_first_member
        FROM
            rides
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map(|row: RideRow| with_id(row))
    .map_err(convert_error)
}

pub async fn ride_by_route<'c, E>(
    executor: E,
    route_id: &Id<Route>,
) -> Result<WithId<Ride>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            id, rider_id, group_id, route_id, is_first_member
        FROM
            rides
        WHERE route_id = $1;
        ",
    )
    .bind(route_id.raw())
    .fetch_one(executor)
    .await
    .map(|row: RideRow| with_id(row))
    .map_err(convert_error)
}

pub async fn group_id_by_route<'c, E>(
    executor: E,
    route_id: &Id<Route>,
) -> Result<Id<RideGroup>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT group_id FROM rides WHERE route_id = $1;")
        .bind(route_id.raw())
        .fetch_one(executor)
        .await
        .map(|id: i64| Id::new(id))
        .map_err(convert_error)
}

pub async fn member_count<'c, E>(executor: E, group_id: &Id<RideGroup>) -> Result<u32>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT COUNT(*) FROM rides WHERE group_id = $1;")
        .bind(group_id.raw())
        .fetch_one(executor)
        .await
        .map(|count: i64| u32::try_from(count).unwrap_or(u32::MAX))
        .map_err(convert_error)
}

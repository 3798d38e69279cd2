use std::time::Duration;

use chrono::{DateTime, Local};
use model::{geo::GeoExtent, ride_group::RideGroup, user::Driver};
use ride_pool::database::Result;
use sqlx::{Executor, Postgres};
use utility::{
    id::{Id, IdWrapper},
    let_also::LetAlso,
};

use crate::data_model::{ride_group::RideGroupRow, DatabaseRow};

use super::{convert_error, lock_timeout_statement};

pub async fn insert<'c, E>(executor: E, group: &RideGroup) -> Result<Id<RideGroup>>
where
    E: Executor<'c, Database = Postgres>,
{
    let row = RideGroupRow::from_model(group.clone());
    sqlx::query_scalar(
        "
        INSERT INTO ride_groups(
            start_latitude,
            start_longitude,
            end_latitude,
            end_longitude,
            num_riders,
            driver_id,
            completed,
            completed_on,
            is_closed,
            is_private,
            is_assignable,
            created_on,
            updated_on
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
            COALESCE($12, NOW()), COALESCE($13, NOW())
        )
        RETURNING id;
        ",
    )
    .bind(row.start_latitude)
    .bind(row.start_longitude)
    .bind(row.end_latitude)
    .bind(row.end_longitude)
    .bind(row.num_riders)
    .bind(row.driver_id)
    .bind(row.completed)
    .bind(row.completed_on)
    .bind(row.is_closed)
    .bind(row.is_private)
    .bind(row.is_assignable)
    .bind(row.created_on)
    .bind(row.updated_on)
    .fetch_one(executor)
    .await
    .map(|id: i64| Id::new(id))
    .map_err(convert_error)
}

pub async fn get<'c, E>(executor: E, id: &Id<RideGroup>) -> Result<RideGroup>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, RideGroupRow>(
        "
        SELECT
            id, start_latitude, start_longitude, end_latitude, end_longitude,
            num_riders, driver_id, completed, completed_on, is_closed,
            is_private, is_assignable, created_on, updated_on
        FROM
            ride_groups
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|row: RideGroupRow| Ok(row.to_model()))
}

/// Bounds how long the following row locks of the transaction may wait. A
/// lock not granted in time fails with `Busy`.
pub async fn set_lock_timeout<'c, E>(executor: E, timeout: Duration) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(lock_timeout_statement(timeout).as_ref())
        .execute(executor)
        .await
        .map(|_| ())
        .map_err(convert_error)
}

/// Takes the row lock of the group until the transaction ends.
pub async fn lock<'c, E>(executor: E, id: &Id<RideGroup>) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT id FROM ride_groups WHERE id = $1 FOR UPDATE;")
        .bind(id.raw())
        .fetch_one(executor)
        .await
        .map(|_: i64| ())
        .map_err(convert_error)
}

pub async fn update_membership<'c, E>(
    executor: E,
    id: &Id<RideGroup>,
    extent: &GeoExtent,
    num_of_riders: u32,
    updated_on: DateTime<Local>,
) -> Result<bool>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        UPDATE ride_groups SET
            start_latitude = $2,
            start_longitude = $3,
            end_latitude = $4,
            end_longitude = $5,
            num_riders = $6,
            updated_on = $7
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .bind(extent.start_latitude)
    .bind(extent.start_longitude)
    .bind(extent.end_latitude)
    .bind(extent.end_longitude)
    .bind(num_of_riders as i32)
    .bind(updated_on)
    .execute(executor)
    .await
    .map(|result| result.rows_affected() > 0)
    .map_err(convert_error)
}

pub async fn set_driver<'c, E>(
    executor: E,
    id: &Id<RideGroup>,
    driver_id: &Id<Driver>,
    updated_on: DateTime<Local>,
) -> Result<bool>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("UPDATE ride_groups SET driver_id = $2, updated_on = $3 WHERE id = $1;")
        .bind(id.raw())
        .bind(Some(driver_id).raw())
        .bind(updated_on)
        .execute(executor)
        .await
        .map(|result| result.rows_affected() > 0)
        .map_err(convert_error)
}

/// Writes one of the boolean flags of a group.
async fn set_flag<'c, E>(
    executor: E,
    id: &Id<RideGroup>,
    column: &str,
    value: bool,
    updated_on: DateTime<Local>,
) -> Result<bool>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        format!(
            "UPDATE ride_groups SET {} = $2, updated_on = $3 WHERE id = $1;",
            column
        )
        .as_ref(),
    )
    .bind(id.raw())
    .bind(value)
    .bind(updated_on)
    .execute(executor)
    .await
    .map(|result| result.rows_affected() > 0)
    .map_err(convert_error)
}

pub async fn set_closed<'c, E>(
    executor: E,
    id: &Id<RideGroup>,
    closed: bool,
    updated_on: DateTime<Local>,
) -> Result<bool>
where
    E: Executor<'c, Database = Postgres>,
{
    set_flag(executor, id, "is_closed", closed, updated_on).await
}

pub async fn set_assignable<'c, E>(
    executor: E,
    id: &Id<RideGroup>,
    assignable: bool,
    updated_on: DateTime<Local>,
) -> Result<bool>
where
    E: Executor<'c, Database = Postgres>,
{
    set_flag(executor, id, "is_assignable", assignable, updated_on).await
}

pub async fn set_completed<'c, E>(
    executor: E,
    id: &Id<RideGroup>,
    completed_on: DateTime<Local>,
) -> Result<bool>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        UPDATE ride_groups SET
            completed = TRUE,
            completed_on = $2,
            is_closed = TRUE,
            updated_on = $2
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .bind(completed_on)
    .execute(executor)
    .await
    .map(|result| result.rows_affected() > 0)
    .map_err(convert_error)
}

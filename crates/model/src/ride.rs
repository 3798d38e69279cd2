use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{geo::Coordinate, ride_group::RideGroup, user::Rider};

/// The trip a rider asked for: where to be picked up and where to be dropped off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub pickup: Coordinate,
    pub dropoff: Coordinate,
}

impl HasId for Route {
    type IdType = i64;
}

impl Route {
    pub fn new(pickup: Coordinate, dropoff: Coordinate) -> Self {
        Self { pickup, dropoff }
    }

    pub fn endpoints(&self) -> [Coordinate; 2] {
        [self.pickup, self.dropoff]
    }
}

/// Binds a rider's route to the group that serves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub rider_id: Id<Rider>,
    pub group_id: Id<RideGroup>,
    pub route_id: Id<Route>,
    pub is_first_member: bool,
}

impl HasId for Ride {
    type IdType = i64;
}

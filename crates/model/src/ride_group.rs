use chrono::{DateTime, Local};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{geo::GeoExtent, ride::Route, user::Driver};

/// A cluster of rider routes sharing one vehicle trip.
///
/// `num_of_riders` mirrors the persisted counter and equals the number of
/// `route_ids` whenever the group was loaded from or written to the store.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideGroup {
    /// Absent until the group has been persisted.
    pub id: Option<Id<RideGroup>>,
    pub route_ids: IndexSet<Id<Route>>,
    pub driver_id: Option<Id<Driver>>,
    #[serde(flatten)]
    pub extent: GeoExtent,
    pub num_of_riders: u32,
    pub completed: bool,
    pub date_completed: Option<DateTime<Local>>,
    pub closed: bool,
    pub is_private: bool,
    pub is_assignable: bool,
    pub created_on: Option<DateTime<Local>>,
    pub updated_on: Option<DateTime<Local>>,
}

impl HasId for RideGroup {
    type IdType = i64;
}

impl RideGroup {
    /// An open, unpersisted group without members.
    pub fn new(extent: GeoExtent, is_private: bool) -> Self {
        Self {
            id: None,
            route_ids: IndexSet::new(),
            driver_id: None,
            extent,
            num_of_riders: 0,
            completed: false,
            date_completed: None,
            closed: false,
            is_private,
            is_assignable: true,
            created_on: None,
            updated_on: None,
        }
    }

    pub fn number_of_rides(&self) -> usize {
        self.route_ids.len()
    }

    pub fn contains(&self, route_id: &Id<Route>) -> bool {
        self.route_ids.contains(route_id)
    }

    pub fn has_driver(&self) -> bool {
        self.driver_id.is_some()
    }
}

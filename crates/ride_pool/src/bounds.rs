use itertools::Itertools;
use model::{
    geo::{Coordinate, GeoExtent},
    ride::Route,
    ride_group::RideGroup,
};

use crate::config::ExtentResetPolicy;

/// Maintains the rectangular extent covering every pickup and dropoff of a
/// group's members.
///
/// Joining only ever grows the extent, which is cheap. A bounding box can not
/// be shrunk incrementally, so removals rebuild it from the remaining members
/// when the reset policy asks for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoBoundsTracker {
    policy: ExtentResetPolicy,
}

impl GeoBoundsTracker {
    pub fn new(policy: ExtentResetPolicy) -> Self {
        Self { policy }
    }

    /// The extent grown to also cover both endpoints of `route`.
    pub fn grow(&self, extent: &GeoExtent, route: &Route) -> GeoExtent {
        route
            .endpoints()
            .iter()
            .fold(*extent, |extent, point| include(extent, point))
    }

    /// The extent covering all routes, `None` if there are none.
    pub fn recompute<'a, I>(&self, routes: I) -> Option<GeoExtent>
    where
        I: IntoIterator<Item = &'a Route>,
    {
        let points = routes
            .into_iter()
            .flat_map(|route| route.endpoints())
            .collect::<Vec<_>>();
        let (start_latitude, end_latitude) = points
            .iter()
            .map(|point| point.latitude)
            .minmax_by(f64::total_cmp)
            .into_option()?;
        let (start_longitude, end_longitude) = points
            .iter()
            .map(|point| point.longitude)
            .minmax_by(f64::total_cmp)
            .into_option()?;
        Some(GeoExtent {
            start_latitude,
            start_longitude,
            end_latitude,
            end_longitude,
        })
    }

    /// Whether removing a member from `group` has to rebuild the extent.
    /// `group` is the state before the removal.
    pub fn should_reset(&self, removed_founding_member: bool, group: &RideGroup) -> bool {
        match self.policy {
            ExtentResetPolicy::Never => false,
            ExtentResetPolicy::Always => true,
            ExtentResetPolicy::FoundingMember => {
                removed_founding_member && !group.closed && !group.has_driver()
            }
        }
    }
}

fn include(extent: GeoExtent, point: &Coordinate) -> GeoExtent {
    GeoExtent {
        start_latitude: extent.start_latitude.min(point.latitude),
        start_longitude: extent.start_longitude.min(point.longitude),
        end_latitude: extent.end_latitude.max(point.latitude),
        end_longitude: extent.end_longitude.max(point.longitude),
    }
}

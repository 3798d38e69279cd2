use crate::{GroupError, GroupResult};

/// Share of the solo fare added to the trip for every rider beyond the first.
pub const FARE_SURCHARGE_RATE: f64 = 0.3;

/// Splits a trip fare between the members of a group.
///
/// Pooling inflates the total by `surcharge_rate` per additional member to
/// cover detours, then divides evenly:
///
/// ```text
/// share = round(fare * (1 + (members - 1) * rate) / members)
/// ```
///
/// As long as the rate stays below 1 the share shrinks as the group grows.
#[derive(Debug, Clone, Copy)]
pub struct FareSplitter {
    surcharge_rate: f64,
}

impl Default for FareSplitter {
    fn default() -> Self {
        Self::new(FARE_SURCHARGE_RATE)
    }
}

impl FareSplitter {
    pub fn new(surcharge_rate: f64) -> Self {
        Self { surcharge_rate }
    }

    /// The total collected from all members before rounding.
    pub fn pooled_total(&self, total_fare: f64, member_count: usize) -> f64 {
        let additional = member_count.saturating_sub(1) as f64;
        total_fare * (1.0 + additional * self.surcharge_rate)
    }

    /// Per member share in whole currency units, rounded half away from zero.
    pub fn split(&self, total_fare: f64, member_count: usize) -> GroupResult<i64> {
        if member_count == 0 {
            return Err(GroupError::DivisionUndefined);
        }
        if !total_fare.is_finite() || total_fare < 0.0 {
            return Err(GroupError::InvalidFare);
        }
        let share = self.pooled_total(total_fare, member_count) / member_count as f64;
        Ok(share.round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_rider_pays_the_full_fare() {
        assert_eq!(FareSplitter::default().split(100.0, 1).unwrap(), 100);
    }

    #[test]
    fn shares_shrink_as_the_group_grows() {
        let fares = FareSplitter::default();
        assert_eq!(fares.split(100.0, 2).unwrap(), 65);
        assert_eq!(fares.split(100.0, 3).unwrap(), 53);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        // 5 * 1.3 / 2 = 3.25, 7 * 1.3 / 2 = 4.55
        let fares = FareSplitter::default();
        assert_eq!(fares.split(5.0, 2).unwrap(), 3);
        assert_eq!(fares.split(7.0, 2).unwrap(), 5);
        assert_eq!(FareSplitter::new(0.0).split(5.0, 2).unwrap(), 3);
    }

    #[test]
    fn zero_members_is_rejected() {
        assert!(matches!(
            FareSplitter::default().split(100.0, 0),
            Err(GroupError::DivisionUndefined)
        ));
    }

    #[test]
    fn invalid_fares_are_rejected() {
        let fares = FareSplitter::default();
        assert!(matches!(fares.split(-1.0, 2), Err(GroupError::InvalidFare)));
        assert!(matches!(fares.split(f64::NAN, 2), Err(GroupError::InvalidFare)));
        assert!(matches!(
            fares.split(f64::INFINITY, 2),
            Err(GroupError::InvalidFare)
        ));
    }

    #[test]
    fn shares_cover_the_pooled_total() {
        let fares = FareSplitter::default();
        for fare in (0..=500).step_by(7) {
            let fare = fare as f64;
            for members in 1..=8usize {
                let share = fares.split(fare, members).unwrap() as f64;
                let pooled = fares.pooled_total(fare, members);
                assert!(share + 0.5 >= fare / members as f64);
                assert!(
                    (share * members as f64 - pooled).abs() <= 0.5 * members as f64,
                    "fare {} members {}",
                    fare,
                    members
                );
            }
        }
    }
}

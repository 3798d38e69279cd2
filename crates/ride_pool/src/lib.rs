use std::{error::Error, fmt, result};

pub mod bounds;
pub mod capacity;
pub mod config;
pub mod database;
pub mod fare;
pub mod locks;
pub mod memory;
pub mod registry;
pub mod ride_factory;

#[derive(Debug)]
pub enum GroupError {
    /// The referenced group, route or ride does not exist in the store.
    NotFound,
    /// The group has not been persisted yet, so it has no id to act on.
    IdMissing,
    /// The group already holds as many riders as the vehicle can carry.
    CapacityExceeded { capacity: u32 },
    /// The group no longer accepts membership changes.
    Closed,
    /// A fare was to be split between zero members.
    DivisionUndefined,
    /// The fare is negative or not a finite number.
    InvalidFare,
    /// The ride factory refused the member's route, e.g. for coordinates
    /// outside the valid ranges. Nothing was written.
    RideRefused,
    /// The group lock could not be acquired in time.
    Busy,
    StoreFailure(Box<dyn Error + Send + Sync>),
}

pub type GroupResult<T> = result::Result<T, GroupError>;

impl fmt::Display for GroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "ride group, route or ride not found"),
            Self::IdMissing => write!(f, "ride group has not been persisted"),
            Self::CapacityExceeded { capacity } => {
                write!(f, "ride group is full ({} riders)", capacity)
            }
            Self::Closed => write!(f, "ride group is closed"),
            Self::DivisionUndefined => write!(f, "can not split a fare between no riders"),
            Self::InvalidFare => write!(f, "fare must be a finite, non negative amount"),
            Self::RideRefused => write!(f, "ride was refused"),
            Self::Busy => write!(f, "ride group is busy, try again later"),
            Self::StoreFailure(why) => write!(f, "ride store failure: {}", why),
        }
    }
}

impl Error for GroupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StoreFailure(why) => Some(why.as_ref()),
            _ => None,
        }
    }
}

impl From<database::DatabaseError> for GroupError {
    fn from(value: database::DatabaseError) -> Self {
        match value {
            database::DatabaseError::NotFound => Self::NotFound,
            database::DatabaseError::IdMissing => Self::IdMissing,
            database::DatabaseError::Busy => Self::Busy,
            database::DatabaseError::Other(why) => Self::StoreFailure(why),
        }
    }
}

/// Turns a `NotFound` into `Ok(None)`, leaving every other error untouched.
pub(crate) fn not_found_to_none<T>(
    result: database::Result<T>,
) -> database::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(database::DatabaseError::NotFound) => Ok(None),
        Err(why) => Err(why),
    }
}

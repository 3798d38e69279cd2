use std::time::Duration;

use ride_pool::database::DatabaseError;

pub mod ride;
pub mod ride_group;

/// SQLSTATE `lock_not_available`, raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

pub(crate) fn convert_error(why: sqlx::Error) -> DatabaseError {
    match why {
        sqlx::Error::RowNotFound => DatabaseError::NotFound,
        sqlx::Error::Database(ref db) if is_lock_timeout(db.code().as_deref()) => {
            DatabaseError::Busy
        }
        _ => DatabaseError::Other(Box::new(why)),
    }
}

fn is_lock_timeout(code: Option<&str>) -> bool {
    code == Some(LOCK_NOT_AVAILABLE)
}

/// `SET LOCAL` takes no bind parameters, the value is formatted in.
pub(crate) fn lock_timeout_statement(timeout: Duration) -> String {
    format!("SET LOCAL lock_timeout = {};", timeout.as_millis().max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_timeouts_are_recognized_by_their_code() {
        assert!(is_lock_timeout(Some("55P03")));
        assert!(!is_lock_timeout(Some("23505")));
        assert!(!is_lock_timeout(None));
    }

    #[test]
    fn lock_timeout_is_set_in_milliseconds() {
        assert_eq!(
            lock_timeout_statement(Duration::from_secs(5)),
            "SET LOCAL lock_timeout = 5000;"
        );
        assert_eq!(
            lock_timeout_statement(Duration::ZERO),
            "SET LOCAL lock_timeout = 1;"
        );
    }

    #[test]
    fn missing_rows_map_to_not_found() {
        assert!(matches!(
            convert_error(sqlx::Error::RowNotFound),
            DatabaseError::NotFound
        ));
        assert!(matches!(
            convert_error(sqlx::Error::PoolTimedOut),
            DatabaseError::Other(_)
        ));
    }
}

use std::{env, fmt::Display, str::FromStr, time::Duration};

use crate::fare::FARE_SURCHARGE_RATE;

pub const DEFAULT_VEHICLE_CAPACITY: u32 = 4;
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(5000);

/// When to rebuild a group's extent from its remaining members after a
/// member left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtentResetPolicy {
    /// Only when the founding member left an open group without a driver.
    #[default]
    FoundingMember,
    Always,
    Never,
}

impl FromStr for ExtentResetPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "founding" | "founding-member" => Ok(Self::FoundingMember),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            other => Err(format!("unknown extent reset policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub vehicle_capacity: u32,
    /// How long an operation waits for a busy group before giving up.
    pub lock_timeout: Duration,
    pub fare_surcharge_rate: f64,
    pub extent_reset: ExtentResetPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            vehicle_capacity: DEFAULT_VEHICLE_CAPACITY,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            fare_surcharge_rate: FARE_SURCHARGE_RATE,
            extent_reset: ExtentResetPolicy::default(),
        }
    }
}

impl RegistryConfig {
    /// Reads the configuration from the environment. Missing or malformed
    /// variables fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup<L>(lookup: L) -> Self
    where
        L: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let lock_timeout_ms = parse_or(
            &lookup,
            "RIDE_POOL_LOCK_TIMEOUT_MS",
            defaults.lock_timeout.as_millis() as u64,
        );
        let fare_surcharge_rate = parse_or(
            &lookup,
            "RIDE_POOL_FARE_SURCHARGE",
            defaults.fare_surcharge_rate,
        );
        Self {
            vehicle_capacity: parse_or(
                &lookup,
                "RIDE_POOL_VEHICLE_CAPACITY",
                defaults.vehicle_capacity,
            )
            .max(1),
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            fare_surcharge_rate: if fare_surcharge_rate.is_finite()
                && fare_surcharge_rate >= 0.0
            {
                fare_surcharge_rate
            } else {
                log::warn!(
                    "ignoring invalid fare surcharge {}, using {}",
                    fare_surcharge_rate,
                    defaults.fare_surcharge_rate
                );
                defaults.fare_surcharge_rate
            },
            extent_reset: parse_or(
                &lookup,
                "RIDE_POOL_EXTENT_RESET",
                defaults.extent_reset,
            ),
        }
    }
}

fn parse_or<L, T>(lookup: &L, name: &str, default: T) -> T
where
    L: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|why| {
            log::warn!("invalid value for {}: {}, using {}", name, why, default);
            default
        }),
    }
}

impl Display for ExtentResetPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FoundingMember => write!(f, "founding"),
            Self::Always => write!(f, "always"),
            Self::Never => write!(f, "never"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> RegistryConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RegistryConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]);
        assert_eq!(config.vehicle_capacity, 4);
        assert_eq!(config.lock_timeout, Duration::from_secs(5));
        assert_eq!(config.fare_surcharge_rate, 0.3);
        assert_eq!(config.extent_reset, ExtentResetPolicy::FoundingMember);
    }

    #[test]
    fn reads_all_variables() {
        let config = config_from(&[
            ("RIDE_POOL_VEHICLE_CAPACITY", "6"),
            ("RIDE_POOL_LOCK_TIMEOUT_MS", "250"),
            ("RIDE_POOL_FARE_SURCHARGE", "0.25"),
            ("RIDE_POOL_EXTENT_RESET", "Always"),
        ]);
        assert_eq!(config.vehicle_capacity, 6);
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
        assert_eq!(config.fare_surcharge_rate, 0.25);
        assert_eq!(config.extent_reset, ExtentResetPolicy::Always);
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("RIDE_POOL_VEHICLE_CAPACITY", "many"),
            ("RIDE_POOL_FARE_SURCHARGE", "-1"),
            ("RIDE_POOL_EXTENT_RESET", "sometimes"),
        ]);
        assert_eq!(config.vehicle_capacity, 4);
        assert_eq!(config.fare_surcharge_rate, 0.3);
        assert_eq!(config.extent_reset, ExtentResetPolicy::FoundingMember);
    }
}

// Raffle Engine - Configuration
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// How the winner draw weighs entries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DrawWeighting {
    /// Every entry has the same chance regardless of quantity
    #[default]
    PerEntry,
    /// Every ticket has the same chance; an entry wins in proportion to its quantity
    PerTicket,
}

impl FromStr for DrawWeighting {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entry" | "per_entry" => Ok(DrawWeighting::PerEntry),
            "ticket" | "per_ticket" => Ok(DrawWeighting::PerTicket),
            other => Err(ConfigError::Invalid {
                key: ENV_DRAW_WEIGHTING,
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },

    #[error("Quantity bounds are inverted: min {min} > max {max}")]
    QuantityBounds { min: u32, max: u32 },
}

pub const ENV_MAX_QUANTITY: &str = "RAFFLE_MAX_QUANTITY";
pub const ENV_STORAGE_TIMEOUT_MS: &str = "RAFFLE_STORAGE_TIMEOUT_MS";
pub const ENV_DRAW_WEIGHTING: &str = "RAFFLE_DRAW_WEIGHTING";
pub const ENV_SNAPSHOT_PATH: &str = "RAFFLE_SNAPSHOT_PATH";

/// Engine configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Smallest quantity accepted per entry
    pub min_quantity: u32,
    /// Largest quantity accepted per entry
    pub max_quantity: u32,
    /// Bound applied to every storage call
    pub storage_timeout: Duration,
    pub draw_weighting: DrawWeighting,
    /// Where the sweep binary keeps the store snapshot
    pub snapshot_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_quantity: 1,
            max_quantity: 100,
            storage_timeout: Duration::from_secs(5),
            draw_weighting: DrawWeighting::PerEntry,
            snapshot_path: PathBuf::from("raffles.snapshot"),
        }
    }
}

impl Config {
    /// Defaults overlaid with `RAFFLE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each known key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(value) = lookup(ENV_MAX_QUANTITY) {
            config.max_quantity = parse_number(ENV_MAX_QUANTITY, &value)?;
        }
        if let Some(value) = lookup(ENV_STORAGE_TIMEOUT_MS) {
            let millis: u64 = parse_number(ENV_STORAGE_TIMEOUT_MS, &value)?;
            if millis == 0 {
                return Err(ConfigError::Invalid {
                    key: ENV_STORAGE_TIMEOUT_MS,
                    value,
                });
            }
            config.storage_timeout = Duration::from_millis(millis);
        }
        if let Some(value) = lookup(ENV_DRAW_WEIGHTING) {
            config.draw_weighting = value.parse()?;
        }
        if let Some(value) = lookup(ENV_SNAPSHOT_PATH) {
            config.snapshot_path = PathBuf::from(value);
        }

        if config.min_quantity > config.max_quantity {
            return Err(ConfigError::QuantityBounds {
                min: config.min_quantity,
                max: config.max_quantity,
            });
        }
        Ok(config)
    }
}

fn parse_number<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

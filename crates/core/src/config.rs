//! Runtime configuration, read from the environment by the launch layer.

use std::time::Duration;

use crate::errors::ValidationError;

pub const MIN_SYNC_INTERVAL_SECS: u64 = 10;

const DEFAULT_SYNC_INTERVAL_SECS: u64 = 120;
const DEFAULT_PAGE_SIZE: usize = 100;
const DEFAULT_INIT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct Config {
    /// Delay between background sync cycles.
    pub sync_interval: Duration,
    /// Page size used when a listing or search call passes no limit.
    pub default_page_size: usize,
    /// Upper bound on a bounded cache initialization.
    pub init_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            default_page_size: DEFAULT_PAGE_SIZE,
            init_timeout: Duration::from_secs(DEFAULT_INIT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Build from `NOTESYNC_*` environment variables, falling back to the
    /// defaults for anything unset or unparseable. Call [`Config::validate`]
    /// afterwards; this constructor itself never fails.
    pub fn from_env() -> Self {
        Self {
            sync_interval: Duration::from_secs(env_u64(
                "NOTESYNC_SYNC_INTERVAL_SECONDS",
                DEFAULT_SYNC_INTERVAL_SECS,
            )),
            default_page_size: env_u64("NOTESYNC_DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE as u64)
                as usize,
            init_timeout: Duration::from_secs(env_u64(
                "NOTESYNC_INIT_TIMEOUT_SECONDS",
                DEFAULT_INIT_TIMEOUT_SECS,
            )),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let interval = self.sync_interval.as_secs();
        if interval < MIN_SYNC_INTERVAL_SECS {
            return Err(ValidationError::SyncIntervalTooShort {
                got: interval,
                min: MIN_SYNC_INTERVAL_SECS,
            });
        }
        if self.default_page_size == 0 {
            return Err(ValidationError::ZeroPageSize);
        }
        if self.init_timeout.is_zero() {
            return Err(ValidationError::ZeroInitTimeout);
        }
        Ok(())
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

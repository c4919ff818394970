//! Runtime configuration
//!
//! Defaults match the reference system; both knobs can be overridden from the
//! environment.

use std::env;
use std::time::Duration;

use tracing::warn;

/// Default deadline for a single command round-trip
pub const DEFAULT_IPC_TIMEOUT_MS: u64 = 10_000;

/// Default minimum spacing between forwarded writes to one parameter
pub const DEFAULT_THROTTLE_MS: u64 = 100;

/// Session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AquaConfig {
    /// How long a command waits for its reply before failing with TIMEOUT
    pub ipc_timeout: Duration,
    /// Minimum interval between network writes for one parameter
    pub throttle_interval: Duration,
}

impl Default for AquaConfig {
    fn default() -> Self {
        Self {
            ipc_timeout: Duration::from_millis(DEFAULT_IPC_TIMEOUT_MS),
            throttle_interval: Duration::from_millis(DEFAULT_THROTTLE_MS),
        }
    }
}

impl AquaConfig {
    /// Build a config from `AQUA_IPC_TIMEOUT_MS` and `AQUA_THROTTLE_MS`
    pub fn from_env() -> Self {
        Self {
            ipc_timeout: Duration::from_millis(env_millis(
                "AQUA_IPC_TIMEOUT_MS",
                DEFAULT_IPC_TIMEOUT_MS,
            )),
            throttle_interval: Duration::from_millis(env_millis(
                "AQUA_THROTTLE_MS",
                DEFAULT_THROTTLE_MS,
            )),
        }
    }

    pub fn with_ipc_timeout(mut self, timeout: Duration) -> Self {
        self.ipc_timeout = timeout;
        self
    }

    pub fn with_throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle_interval = interval;
        self
    }
}

fn env_millis(key: &str, default: u64) -> u64 {
    parse_millis(key, env::var(key).ok().as_deref(), default)
}

fn parse_millis(key: &str, raw: Option<&str>, default: u64) -> u64 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse() {
        Ok(ms) => ms,
        Err(e) => {
            warn!(key, value = raw, error = %e, default, "ignoring unparsable setting");
            default
        }
    }
}

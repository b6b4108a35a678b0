//! Session tuning

use portal_core::EXPIRY_WINDOW_SECS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Token refresh cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Seconds between scheduled checks
    pub interval_secs: u64,
    /// A token expiring within this many seconds is refreshed
    pub expiry_window_secs: i64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 45 * 60,
            expiry_window_secs: EXPIRY_WINDOW_SECS,
        }
    }
}

impl RefreshConfig {
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

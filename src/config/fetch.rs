//! Archive download configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::DEFAULT_USER_AGENT;

/// Configuration for fetching archive sources
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Attempts per source before giving up
    pub attempts: u32,
    /// Fixed delay between attempts (seconds)
    pub retry_delay_secs: u64,
    /// Connection timeout (seconds)
    pub connect_timeout_secs: u64,
    /// Read timeout (seconds)
    pub read_timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
}

impl FetchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            retry_delay_secs: 5,
            connect_timeout_secs: 30,
            read_timeout_secs: 60,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

use std::time::Duration as StdDuration;

use chrono::Duration;

/// The configuration of the collab system
#[derive(Debug, Clone)]
pub struct Config {
    /// How long an invitation can be answered after it was sent
    pub invitation_ttl: Duration,
    /// How often expired invitations are purged from the store
    pub sweep_interval: StdDuration,
    /// How long a single operation may wait on the store before giving up
    pub deadline: StdDuration,
}

impl Config {
    /// Returns a copy of this config with a different invitation lifetime
    pub fn with_invitation_ttl(mut self, ttl: Duration) -> Self {
        self.invitation_ttl = ttl;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            invitation_ttl: Duration::minutes(10),
            // The store is allowed to purge late, readers treat expiry themselves
            sweep_interval: StdDuration::from_secs(60),
            deadline: StdDuration::from_secs(5),
        }
    }
}

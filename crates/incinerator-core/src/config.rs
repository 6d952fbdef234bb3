use serde::{Deserialize, Serialize};

/// Default number of outcomes kept in the activity log
pub const DEFAULT_LOG_CAPACITY: usize = 10;

/// Options for inventory resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Look up labels for holdings the balance source left unnamed
    pub enrich_metadata: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self { enrich_metadata: true }
    }
}

/// Configuration for a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Capacity of the recent-activity log
    pub log_capacity: usize,
    pub resolver: ResolverOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            resolver: ResolverOptions::default(),
        }
    }
}

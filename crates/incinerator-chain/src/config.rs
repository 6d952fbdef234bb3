use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ChainResult;

pub const DEFAULT_RPC_URL: &str = "https://rpc.helius.xyz/";
pub const DEFAULT_INDEXER_URL: &str = "https://api.helius.xyz";
/// Fallback used when no key is configured. Shared and rate limited.
pub const DEFAULT_API_KEY: &str = "incinerator-public-demo";

pub const API_KEY_ENV: &str = "HELIUS_API_KEY";
pub const RPC_URL_ENV: &str = "INCINERATOR_RPC_URL";
pub const INDEXER_URL_ENV: &str = "INCINERATOR_INDEXER_URL";

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_CONFIRMATION_TIMEOUT_SECONDS: u64 = 60;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Confirmation tier requested from the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }

    /// Parse the `confirmationStatus` string returned by the node
    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "processed" => Some(Commitment::Processed),
            "confirmed" => Some(Commitment::Confirmed),
            "finalized" => Some(Commitment::Finalized),
            _ => None,
        }
    }
}

/// Configuration for the chain gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// Base URL of the indexing service
    pub indexer_url: String,
    /// Key passed as the `api-key` query parameter to both services
    pub api_key: String,
    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,
    /// Tier a burn must reach before it counts as confirmed
    pub commitment: Commitment,
    /// How long to poll for confirmation before giving up
    pub confirmation_timeout_seconds: u64,
    /// Delay between signature status polls in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            indexer_url: DEFAULT_INDEXER_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            request_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            commitment: Commitment::Confirmed,
            confirmation_timeout_seconds: DEFAULT_CONFIRMATION_TIMEOUT_SECONDS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl ChainConfig {
    /// Read endpoints and API key from the environment, keeping defaults for
    /// anything unset
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(key) = env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.api_key = key;
            }
        }
        if let Ok(url) = env::var(RPC_URL_ENV) {
            config.rpc_url = url;
        }
        if let Ok(url) = env::var(INDEXER_URL_ENV) {
            config.indexer_url = url;
        }
        config
    }

    /// Whether the hardcoded fallback key is in use
    pub fn uses_default_api_key(&self) -> bool {
        self.api_key == DEFAULT_API_KEY
    }

    /// RPC endpoint with the API key attached
    pub fn rpc_endpoint(&self) -> ChainResult<Url> {
        Ok(Url::parse_with_params(&self.rpc_url, &[("api-key", self.api_key.as_str())])?)
    }

    /// Indexer endpoint for `path` with the API key attached
    pub fn indexer_endpoint(&self, path: &str) -> ChainResult<Url> {
        let base = self.indexer_url.trim_end_matches('/');
        let url = format!("{}/{}", base, path.trim_start_matches('/'));
        Ok(Url::parse_with_params(&url, &[("api-key", self.api_key.as_str())])?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

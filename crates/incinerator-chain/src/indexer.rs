/*!
 * Client for the third-party token indexing service.
 *
 * The indexer returns richer metadata than the node but may be unavailable,
 * rate limited or stale, so every caller treats it as best-effort.
 */

use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::config::ChainConfig;
use crate::error::{map_reqwest_error, status_error, ChainError, ChainResult};

/// Field names the metadata endpoint has used for the mint address
const MINT_KEYS: [&str; 3] = ["account", "mint", "address"];

const SYMBOL_PATHS: [&str; 4] = [
    "/symbol",
    "/onChainMetadata/metadata/data/symbol",
    "/legacyMetadata/symbol",
    "/offChainMetadata/metadata/symbol",
];

const NAME_PATHS: [&str; 4] = [
    "/name",
    "/onChainMetadata/metadata/data/name",
    "/legacyMetadata/name",
    "/offChainMetadata/metadata/name",
];

const LOGO_PATHS: [&str; 3] = [
    "/logoURI",
    "/legacyMetadata/logoURI",
    "/offChainMetadata/metadata/image",
];

/// One token balance as reported by the indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedToken {
    pub mint: String,

    /// Raw amount in base units
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: u64,

    #[serde(default)]
    pub decimals: u8,

    #[serde(default)]
    pub token_account: Option<String>,

    #[serde(default)]
    pub symbol: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "logoURI")]
    pub logo_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    #[serde(default)]
    tokens: Vec<IndexedToken>,
}

/// Best-effort labels for one mint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub mint: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub logo_uri: Option<String>,
}

impl TokenMetadata {
    /// Extract labels from one metadata object, whatever its shape.
    ///
    /// Returns `None` when no mint field can be found.
    pub fn from_value(value: &Value) -> Option<Self> {
        let mint = MINT_KEYS
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .map(str::to_string)?;

        Some(Self {
            mint,
            symbol: first_label(value, &SYMBOL_PATHS),
            name: first_label(value, &NAME_PATHS),
            logo_uri: first_label(value, &LOGO_PATHS),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.symbol.is_none() && self.name.is_none() && self.logo_uri.is_none()
    }
}

/// Client for the token indexing service
pub struct IndexerClient {
    http: Client,
    config: ChainConfig,
}

impl IndexerClient {
    pub fn new(config: &ChainConfig) -> ChainResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(map_reqwest_error)?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    /// Token balances held by `address`
    pub async fn fetch_balances(&self, address: &Pubkey) -> ChainResult<Vec<IndexedToken>> {
        let url = self
            .config
            .indexer_endpoint(&format!("v0/addresses/{}/balances", address))?;
        debug!(%address, "Fetching indexed balances");

        let response = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("Failed to fetch indexed balances", status, &body));
        }

        let balances: BalancesResponse = response.json().await.map_err(map_reqwest_error)?;
        debug!(%address, count = balances.tokens.len(), "Indexer returned balances");
        Ok(balances.tokens)
    }

    /// Metadata for a set of mints; entries that cannot be keyed are dropped
    pub async fn fetch_metadata(&self, mints: &[String]) -> ChainResult<Vec<TokenMetadata>> {
        if mints.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.config.indexer_endpoint("v0/token-metadata")?;
        let body = json!({
            "mintAccounts": mints,
            "includeOffChain": false,
            "disableCache": false,
        });

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("Failed to fetch token metadata", status, &body));
        }

        let entries = match response.json::<Value>().await.map_err(map_reqwest_error)? {
            Value::Array(entries) => entries,
            other => {
                return Err(ChainError::InvalidResponse(format!(
                    "Expected a metadata array, got {}",
                    type_name(&other)
                )))
            }
        };

        let mut metadata = Vec::with_capacity(entries.len());
        for entry in &entries {
            match TokenMetadata::from_value(entry) {
                Some(item) => metadata.push(item),
                None => warn!("Skipping metadata entry without a mint field"),
            }
        }
        Ok(metadata)
    }
}

fn first_label(value: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| value.pointer(path).and_then(Value::as_str))
        .map(clean_label)
        .find(|label| !label.is_empty())
}

/// On-chain metadata strings are NUL padded
fn clean_label(raw: &str) -> String {
    raw.trim_matches(|c: char| c == '\0' || c.is_whitespace()).to_string()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Text(String),
        Number(u64),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(amount) => Ok(amount),
        Amount::Text(text) => text.trim().parse::<u64>().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_token_accepts_string_or_number_amount() {
        let text: IndexedToken = serde_json::from_value(json!({
            "mint": "M1", "amount": "1200000", "decimals": 6, "symbol": "ONE"
        }))
        .unwrap();
        assert_eq!(text.amount, 1_200_000);
        assert_eq!(text.symbol.as_deref(), Some("ONE"));

        let number: IndexedToken = serde_json::from_value(json!({
            "mint": "M2", "amount": 7, "decimals": 0,
            "tokenAccount": "ACC", "logoURI": "https://x/y.png"
        }))
        .unwrap();
        assert_eq!(number.amount, 7);
        assert_eq!(number.token_account.as_deref(), Some("ACC"));
        assert_eq!(number.logo_uri.as_deref(), Some("https://x/y.png"));
    }

    #[test]
    fn test_metadata_keyed_by_any_mint_field() {
        for key in MINT_KEYS {
            let value = json!({ key: "MintX", "symbol": "X" });
            let metadata = TokenMetadata::from_value(&value).unwrap();
            assert_eq!(metadata.mint, "MintX");
            assert_eq!(metadata.symbol.as_deref(), Some("X"));
        }
        assert!(TokenMetadata::from_value(&json!({ "symbol": "X" })).is_none());
    }

    #[test]
    fn test_metadata_reads_nested_shapes() {
        let value = json!({
            "account": "MintY",
            "onChainMetadata": {
                "metadata": { "data": { "name": "Ash Token\u{0}\u{0}", "symbol": "" } }
            },
            "legacyMetadata": { "symbol": "ASH", "logoURI": "https://ash/logo.png" }
        });
        let metadata = TokenMetadata::from_value(&value).unwrap();
        assert_eq!(metadata.name.as_deref(), Some("Ash Token"));
        assert_eq!(metadata.symbol.as_deref(), Some("ASH"));
        assert_eq!(metadata.logo_uri.as_deref(), Some("https://ash/logo.png"));
    }
}

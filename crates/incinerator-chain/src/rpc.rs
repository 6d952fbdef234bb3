/*!
 * JSON-RPC client for the chain node.
 *
 * Speaks the standard node JSON-RPC over HTTP: balance query,
 * parsed-token-accounts-by-owner, latest blockhash and signature statuses.
 */

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tracing::{debug, warn};
use url::Url;

use crate::config::{ChainConfig, Commitment};
use crate::error::{map_reqwest_error, status_error, ChainError, ChainResult};

/// SPL Token program, the owner of every classic token account
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Results wrapped in `{ context, value }`
#[derive(Debug, Deserialize)]
struct Contextual<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestBlockhash {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
struct KeyedAccount {
    pubkey: String,
    account: ParsedAccount,
}

#[derive(Debug, Deserialize)]
struct ParsedAccount {
    data: ParsedData,
}

#[derive(Debug, Deserialize)]
struct ParsedData {
    parsed: ParsedTokenAccount,
}

#[derive(Debug, Deserialize)]
struct ParsedTokenAccount {
    info: TokenAccountInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountInfo {
    mint: String,
    token_amount: UiTokenAmount,
}

#[derive(Debug, Deserialize)]
struct UiTokenAmount {
    amount: String,
    decimals: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSignatureStatus {
    slot: u64,
    confirmations: Option<u64>,
    err: Option<Value>,
    confirmation_status: Option<String>,
}

/// One token account as reported by the node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccountBalance {
    /// Token account address
    pub pubkey: String,
    pub mint: String,
    pub raw_amount: u64,
    pub decimals: u8,
}

/// Status of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub slot: u64,
    /// Chain-side failure, if the transaction was included but failed
    pub err: Option<String>,
    /// Highest tier reached so far
    pub confirmation_status: Commitment,
}

impl SignatureStatus {
    pub fn reached(&self, commitment: Commitment) -> bool {
        self.confirmation_status >= commitment
    }
}

/// JSON-RPC client for the chain node
pub struct RpcClient {
    http: Client,
    endpoint: Url,
    commitment: Commitment,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(config: &ChainConfig) -> ChainResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(map_reqwest_error)?;

        Ok(Self {
            http,
            endpoint: config.rpc_endpoint()?,
            commitment: config.commitment,
            next_id: AtomicU64::new(1),
        })
    }

    /// Issue one JSON-RPC call and decode its `result`
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> ChainResult<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(method, id = request.id, "Sending RPC request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(method, status, &body));
        }

        let decoded: RpcResponse<T> = response.json().await.map_err(map_reqwest_error)?;
        if let Some(error) = decoded.error {
            warn!(method, code = error.code, "RPC returned an error: {}", error.message);
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        decoded
            .result
            .ok_or_else(|| {
                ChainError::InvalidResponse(format!("{}: response has no result", method))
            })
    }

    /// Balance of `address` in lamports
    pub async fn get_balance(&self, address: &Pubkey) -> ChainResult<u64> {
        let params = json!([address.to_string(), { "commitment": self.commitment.as_str() }]);
        let result: Contextual<u64> = self.call("getBalance", params).await?;
        Ok(result.value)
    }

    /// Every SPL token account owned by `owner`, zero balances included
    pub async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
    ) -> ChainResult<Vec<TokenAccountBalance>> {
        let params = json!([
            owner.to_string(),
            { "programId": TOKEN_PROGRAM_ID },
            { "encoding": "jsonParsed", "commitment": self.commitment.as_str() }
        ]);
        let result: Contextual<Vec<Value>> = self.call("getTokenAccountsByOwner", params).await?;

        let mut accounts = Vec::with_capacity(result.value.len());
        for entry in result.value {
            match parse_token_account(entry) {
                Ok(account) => accounts.push(account),
                Err(e) => warn!("Skipping malformed token account: {}", e),
            }
        }
        Ok(accounts)
    }

    pub async fn get_latest_blockhash(&self) -> ChainResult<Hash> {
        let params = json!([{ "commitment": self.commitment.as_str() }]);
        let result: Contextual<LatestBlockhash> = self.call("getLatestBlockhash", params).await?;
        Hash::from_str(&result.value.blockhash)
            .map_err(|e| {
                ChainError::InvalidResponse(format!(
                    "Invalid blockhash {}: {}",
                    result.value.blockhash, e
                ))
            })
    }

    /// Status of `signature`, `None` while the node has not seen it
    pub async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> ChainResult<Option<SignatureStatus>> {
        let params = json!([[signature.to_string()], { "searchTransactionHistory": false }]);
        let result: Contextual<Vec<Option<RawSignatureStatus>>> =
            self.call("getSignatureStatuses", params).await?;

        let raw = match result.value.into_iter().next().flatten() {
            Some(raw) => raw,
            None => return Ok(None),
        };

        // A null confirmation count means the slot is rooted
        let reported = raw.confirmation_status.as_deref().and_then(Commitment::parse);
        let confirmation_status = match reported {
            Some(status) => status,
            None if raw.confirmations.is_none() => Commitment::Finalized,
            None => Commitment::Processed,
        };

        Ok(Some(SignatureStatus {
            slot: raw.slot,
            err: raw.err.filter(|err| !err.is_null()).map(|err| err.to_string()),
            confirmation_status,
        }))
    }
}

fn parse_token_account(entry: Value) -> ChainResult<TokenAccountBalance> {
    let keyed: KeyedAccount = serde_json::from_value(entry)?;
    let info = keyed.account.data.parsed.info;
    let raw_amount = info
        .token_amount
        .amount
        .parse::<u64>()
        .map_err(|e| {
            ChainError::InvalidResponse(format!(
                "Invalid token amount {}: {}",
                info.token_amount.amount, e
            ))
        })?;

    Ok(TokenAccountBalance {
        pubkey: keyed.pubkey,
        mint: info.mint,
        raw_amount,
        decimals: info.token_amount.decimals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_account() {
        let entry = json!({
            "pubkey": "AccountPubkey111",
            "account": {
                "data": {
                    "parsed": {
                        "info": {
                            "mint": "MintPubkey111",
                            "owner": "Owner111",
                            "tokenAmount": { "amount": "500000", "decimals": 6, "uiAmount": 0.5 }
                        },
                        "type": "account"
                    },
                    "program": "spl-token"
                },
                "lamports": 2039280
            }
        });

        let account = parse_token_account(entry).unwrap();
        assert_eq!(account.pubkey, "AccountPubkey111");
        assert_eq!(account.mint, "MintPubkey111");
        assert_eq!(account.raw_amount, 500_000);
        assert_eq!(account.decimals, 6);
    }

    #[test]
    fn test_parse_token_account_rejects_bad_amount() {
        let entry = json!({
            "pubkey": "A",
            "account": { "data": { "parsed": { "info": {
                "mint": "M", "tokenAmount": { "amount": "-1", "decimals": 6 }
            } } } }
        });
        assert!(matches!(parse_token_account(entry), Err(ChainError::InvalidResponse(_))));
    }
}

use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use tracing::{debug, info, warn};

use crate::config::{ChainConfig, Commitment};
use crate::error::{ChainError, ChainResult};
use crate::indexer::{IndexedToken, IndexerClient, TokenMetadata};
use crate::rpc::{RpcClient, TokenAccountBalance};
use crate::signer::{SignerError, WalletSigner};

/// Network access used by the resolver and the burn submitter.
///
/// Implementations perform network calls only and never mutate local state.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Native balance in lamports
    async fn get_account_balance(&self, address: &Pubkey) -> ChainResult<u64>;

    /// Token accounts owned by `owner`, straight from the node
    async fn list_token_accounts(&self, owner: &Pubkey) -> ChainResult<Vec<TokenAccountBalance>>;

    /// Token balances of `owner` from the indexing service
    async fn fetch_indexed_balances(&self, owner: &Pubkey) -> ChainResult<Vec<IndexedToken>>;

    /// Labels for a set of mints from the indexing service
    async fn fetch_token_metadata(&self, mints: &[String]) -> ChainResult<Vec<TokenMetadata>>;

    /// Have `signer` send a transaction made of `instructions` and wait for it
    /// to reach the configured commitment
    async fn submit_and_confirm(
        &self,
        instructions: &[Instruction],
        signer: &dyn WalletSigner,
    ) -> ChainResult<Signature>;
}

/// Gateway backed by a JSON-RPC node and a Helius-compatible indexer
pub struct SolanaGateway {
    rpc: RpcClient,
    indexer: IndexerClient,
    commitment: Commitment,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl SolanaGateway {
    pub fn new(config: &ChainConfig) -> ChainResult<Self> {
        if config.uses_default_api_key() {
            warn!("No indexer API key configured, using the shared fallback key");
        }

        Ok(Self {
            rpc: RpcClient::new(config)?,
            indexer: IndexerClient::new(config)?,
            commitment: config.commitment,
            confirmation_timeout: config.confirmation_timeout(),
            poll_interval: config.poll_interval(),
        })
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub fn indexer(&self) -> &IndexerClient {
        &self.indexer
    }

    /// Poll the node until `signature` reaches the configured commitment or
    /// fails on chain. Poll errors are treated as transient.
    async fn poll_until_confirmed(&self, signature: &Signature) -> ChainResult<()> {
        loop {
            match self.rpc.get_signature_status(signature).await {
                Ok(Some(status)) => {
                    if let Some(err) = status.err {
                        return Err(ChainError::Submission(format!(
                            "Transaction failed on chain: {}",
                            err
                        )));
                    }
                    if status.reached(self.commitment) {
                        debug!(
                            %signature,
                            slot = status.slot,
                            "Signature reached {}",
                            self.commitment.as_str()
                        );
                        return Ok(());
                    }
                }
                Ok(None) => debug!(%signature, "Signature not yet visible"),
                Err(e) => warn!(%signature, "Signature status poll failed: {}", e),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl ChainGateway for SolanaGateway {
    async fn get_account_balance(&self, address: &Pubkey) -> ChainResult<u64> {
        self.rpc.get_balance(address).await
    }

    async fn list_token_accounts(&self, owner: &Pubkey) -> ChainResult<Vec<TokenAccountBalance>> {
        self.rpc.get_token_accounts_by_owner(owner).await
    }

    async fn fetch_indexed_balances(&self, owner: &Pubkey) -> ChainResult<Vec<IndexedToken>> {
        self.indexer.fetch_balances(owner).await
    }

    async fn fetch_token_metadata(&self, mints: &[String]) -> ChainResult<Vec<TokenMetadata>> {
        self.indexer.fetch_metadata(mints).await
    }

    async fn submit_and_confirm(
        &self,
        instructions: &[Instruction],
        signer: &dyn WalletSigner,
    ) -> ChainResult<Signature> {
        let payer = match signer.public_key() {
            Some(payer) if signer.is_connected() => payer,
            _ => return Err(ChainError::Submission(SignerError::NotConnected.to_string())),
        };

        let blockhash = self.rpc.get_latest_blockhash().await?;
        let mut transaction = Transaction::new_with_payer(instructions, Some(&payer));
        transaction.message.recent_blockhash = blockhash;

        let signature = signer
            .send_transaction(transaction)
            .await
            .map_err(|e| ChainError::Submission(e.to_string()))?;
        info!(%signature, "Transaction sent, awaiting confirmation");

        let confirmation = self.poll_until_confirmed(&signature);
        match tokio::time::timeout(self.confirmation_timeout, confirmation).await {
            Ok(result) => result.map(|_| signature),
            Err(_) => Err(ChainError::ConfirmationTimeout(format!(
                "{} not {} after {:?}",
                signature,
                self.commitment.as_str(),
                self.confirmation_timeout
            ))),
        }
    }
}

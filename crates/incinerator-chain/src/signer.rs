use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("Wallet not connected")]
    NotConnected,

    #[error("User rejected the request: {0}")]
    Rejected(String),

    #[error("Wallet failed to send transaction: {0}")]
    SendFailed(String),
}

/// External wallet that holds the keys.
///
/// The wallet signs and broadcasts; the gateway only prepares the
/// transaction and watches for confirmation.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Connected account, `None` when the wallet is locked or disconnected
    fn public_key(&self) -> Option<Pubkey>;

    fn is_connected(&self) -> bool;

    /// Sign `transaction` as fee payer and broadcast it
    async fn send_transaction(&self, transaction: Transaction) -> Result<Signature, SignerError>;
}

/*!
 * Incinerator Chain Gateway
 *
 * Thin adapter over the chain JSON-RPC endpoint and the token indexing
 * service: balance lookup, token-account enumeration, indexed balances,
 * token metadata, and transaction submission with confirmation polling.
 */

pub mod config;
pub mod error;
pub mod gateway;
pub mod indexer;
pub mod rpc;
pub mod signer;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::{ChainConfig, Commitment};
pub use error::{ChainError, ChainResult};
pub use gateway::{ChainGateway, SolanaGateway};
pub use indexer::{IndexedToken, IndexerClient, TokenMetadata};
pub use rpc::{RpcClient, SignatureStatus, TokenAccountBalance};
pub use signer::{SignerError, WalletSigner};

// Chain primitives used across the gateway API
pub use solana_sdk::instruction::{AccountMeta, Instruction};
pub use solana_sdk::pubkey::Pubkey;
pub use solana_sdk::signature::Signature;
pub use solana_sdk::transaction::Transaction;

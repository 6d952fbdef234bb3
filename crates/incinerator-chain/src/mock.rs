/*!
 * Scripted gateway and wallet for tests.
 *
 * Every gateway call is counted so tests can assert that validation failures
 * never reach the network.
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::error::{ChainError, ChainResult};
use crate::gateway::ChainGateway;
use crate::indexer::{IndexedToken, TokenMetadata};
use crate::rpc::TokenAccountBalance;
use crate::signer::{SignerError, WalletSigner};

/// Gateway operations, for call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayCall {
    Balance,
    TokenAccounts,
    IndexedBalances,
    Metadata,
    Submit,
}

/// Failure a scripted call should produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedError {
    Network(String),
    Submission(String),
    ConfirmationTimeout(String),
}

impl From<&ScriptedError> for ChainError {
    fn from(err: &ScriptedError) -> Self {
        match err {
            ScriptedError::Network(msg) => ChainError::Network(msg.clone()),
            ScriptedError::Submission(msg) => ChainError::Submission(msg.clone()),
            ScriptedError::ConfirmationTimeout(msg) => ChainError::ConfirmationTimeout(msg.clone()),
        }
    }
}

type Scripted<T> = Mutex<Result<T, ScriptedError>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn replay<T: Clone>(scripted: &Scripted<T>) -> ChainResult<T> {
    lock(scripted).as_ref().map(Clone::clone).map_err(ChainError::from)
}

/// Gateway that replays scripted responses
pub struct MockChainGateway {
    balance: Scripted<u64>,
    indexed: Scripted<Vec<IndexedToken>>,
    accounts: Scripted<Vec<TokenAccountBalance>>,
    metadata: Scripted<Vec<TokenMetadata>>,
    confirmation: Mutex<Option<ScriptedError>>,
    submitted: Mutex<Vec<Vec<Instruction>>>,
    calls: Mutex<HashMap<GatewayCall, usize>>,
}

impl Default for MockChainGateway {
    fn default() -> Self {
        Self {
            balance: Mutex::new(Ok(0)),
            indexed: Mutex::new(Ok(Vec::new())),
            accounts: Mutex::new(Ok(Vec::new())),
            metadata: Mutex::new(Ok(Vec::new())),
            confirmation: Mutex::new(None),
            submitted: Mutex::new(Vec::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl MockChainGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(self, lamports: u64) -> Self {
        *lock(&self.balance) = Ok(lamports);
        self
    }

    pub fn with_balance_failure(self, message: &str) -> Self {
        *lock(&self.balance) = Err(ScriptedError::Network(message.to_string()));
        self
    }

    pub fn with_indexed_tokens(self, tokens: Vec<IndexedToken>) -> Self {
        self.set_indexed_tokens(tokens);
        self
    }

    pub fn with_indexer_failure(self, message: &str) -> Self {
        *lock(&self.indexed) = Err(ScriptedError::Network(message.to_string()));
        self
    }

    pub fn with_token_accounts(self, accounts: Vec<TokenAccountBalance>) -> Self {
        self.set_token_accounts(accounts);
        self
    }

    pub fn with_rpc_failure(self, message: &str) -> Self {
        *lock(&self.accounts) = Err(ScriptedError::Network(message.to_string()));
        self
    }

    pub fn with_metadata(self, metadata: Vec<TokenMetadata>) -> Self {
        *lock(&self.metadata) = Ok(metadata);
        self
    }

    pub fn with_metadata_failure(self, message: &str) -> Self {
        *lock(&self.metadata) = Err(ScriptedError::Network(message.to_string()));
        self
    }

    /// Make every submission fail after the wallet has sent it
    pub fn with_confirmation_failure(self, error: ScriptedError) -> Self {
        *lock(&self.confirmation) = Some(error);
        self
    }

    pub fn set_indexed_tokens(&self, tokens: Vec<IndexedToken>) {
        *lock(&self.indexed) = Ok(tokens);
    }

    pub fn set_token_accounts(&self, accounts: Vec<TokenAccountBalance>) {
        *lock(&self.accounts) = Ok(accounts);
    }

    /// Number of times `call` was made
    pub fn calls(&self, call: GatewayCall) -> usize {
        lock(&self.calls).get(&call).copied().unwrap_or(0)
    }

    /// Number of gateway calls of any kind
    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }

    /// Instruction sets passed to `submit_and_confirm`, oldest first
    pub fn submitted(&self) -> Vec<Vec<Instruction>> {
        lock(&self.submitted).clone()
    }

    fn count(&self, call: GatewayCall) {
        *lock(&self.calls).entry(call).or_insert(0) += 1;
    }
}

#[async_trait]
impl ChainGateway for MockChainGateway {
    async fn get_account_balance(&self, _address: &Pubkey) -> ChainResult<u64> {
        self.count(GatewayCall::Balance);
        replay(&self.balance)
    }

    async fn list_token_accounts(&self, _owner: &Pubkey) -> ChainResult<Vec<TokenAccountBalance>> {
        self.count(GatewayCall::TokenAccounts);
        replay(&self.accounts)
    }

    async fn fetch_indexed_balances(&self, _owner: &Pubkey) -> ChainResult<Vec<IndexedToken>> {
        self.count(GatewayCall::IndexedBalances);
        replay(&self.indexed)
    }

    async fn fetch_token_metadata(&self, _mints: &[String]) -> ChainResult<Vec<TokenMetadata>> {
        self.count(GatewayCall::Metadata);
        replay(&self.metadata)
    }

    async fn submit_and_confirm(
        &self,
        instructions: &[Instruction],
        signer: &dyn WalletSigner,
    ) -> ChainResult<Signature> {
        self.count(GatewayCall::Submit);
        lock(&self.submitted).push(instructions.to_vec());

        let payer = match signer.public_key() {
            Some(payer) if signer.is_connected() => payer,
            _ => return Err(ChainError::Submission(SignerError::NotConnected.to_string())),
        };

        let transaction = Transaction::new_with_payer(instructions, Some(&payer));
        let signature = signer
            .send_transaction(transaction)
            .await
            .map_err(|e| ChainError::Submission(e.to_string()))?;

        match lock(&self.confirmation).as_ref() {
            Some(err) => Err(err.into()),
            None => Ok(signature),
        }
    }
}

/// Wallet that approves or rejects every request
pub struct MockWalletSigner {
    public_key: Pubkey,
    connected: AtomicBool,
    rejection: Option<String>,
    sent: AtomicU64,
}

impl MockWalletSigner {
    pub fn new(public_key: Pubkey) -> Self {
        Self {
            public_key,
            connected: AtomicBool::new(true),
            rejection: None,
            sent: AtomicU64::new(0),
        }
    }

    /// Signer for a fresh random-looking account
    pub fn new_unique() -> Self {
        Self::new(Pubkey::new_unique())
    }

    /// Account key, whether or not the wallet is connected
    pub fn pubkey(&self) -> Pubkey {
        self.public_key
    }

    /// Reject every transaction with `reason`
    pub fn rejecting(mut self, reason: &str) -> Self {
        self.rejection = Some(reason.to_string());
        self
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Transactions approved so far
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSigner for MockWalletSigner {
    fn public_key(&self) -> Option<Pubkey> {
        if self.is_connected() {
            Some(self.public_key)
        } else {
            None
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_transaction(&self, _transaction: Transaction) -> Result<Signature, SignerError> {
        if !self.is_connected() {
            return Err(SignerError::NotConnected);
        }
        if let Some(reason) = &self.rejection {
            return Err(SignerError::Rejected(reason.clone()));
        }

        let sequence = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
        let mut bytes = [0u8; 64];
        bytes[..8].copy_from_slice(&sequence.to_le_bytes());
        bytes[32..64].copy_from_slice(&self.public_key.to_bytes());
        Ok(Signature::from(bytes))
    }
}

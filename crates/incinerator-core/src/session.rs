/*!
 * Session state machine.
 *
 * Owns the connected wallet, the resolved inventory, the selection and the
 * reward ledger. Every transition publishes a fresh `SessionSnapshot` on a
 * watch channel so observers only ever see complete states.
 */

use std::fmt;
use std::sync::Arc;

use futures::future::join;
use incinerator_chain::{ChainGateway, Pubkey, WalletSigner};
use incinerator_types::{BurnOutcome, BurnRequest, TokenHolding};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::burn::BurnSubmitter;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::ledger::RewardLedger;
use crate::resolver::InventoryResolver;

const BUSY_MESSAGE: &str = "Operation already in progress";
const NOT_CONNECTED_MESSAGE: &str = "Wallet not connected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectedPhase {
    LoadingInventory,
    Ready,
    Burning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    Connected(ConnectedPhase),
}

impl SessionPhase {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionPhase::Connected(_))
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Disconnected => write!(f, "disconnected"),
            SessionPhase::Connecting => write!(f, "connecting"),
            SessionPhase::Connected(ConnectedPhase::LoadingInventory) => {
                write!(f, "loading inventory")
            }
            SessionPhase::Connected(ConnectedPhase::Ready) => write!(f, "ready"),
            SessionPhase::Connected(ConnectedPhase::Burning) => write!(f, "burning"),
        }
    }
}

/// Immutable view of a session at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,

    /// Connected account, base58
    pub account_address: Option<String>,

    /// Native balance in lamports, `None` when unknown
    pub sol_balance: Option<u64>,

    pub inventory: Vec<TokenHolding>,

    pub selected_mint: Option<String>,

    pub reward_total: u64,

    /// Recent successful burns, newest first
    pub activity_log: Vec<BurnOutcome>,

    /// Message for the user about the last transition, if any
    pub notice: Option<String>,

    pub last_outcome: Option<BurnOutcome>,
}

impl SessionSnapshot {
    fn disconnected() -> Self {
        Self {
            phase: SessionPhase::Disconnected,
            account_address: None,
            sol_balance: None,
            inventory: Vec::new(),
            selected_mint: None,
            reward_total: 0,
            activity_log: Vec::new(),
            notice: None,
            last_outcome: None,
        }
    }

    pub fn connected(&self) -> bool {
        self.phase.is_connected()
    }

    pub fn selected_holding(&self) -> Option<&TokenHolding> {
        let mint = self.selected_mint.as_deref()?;
        self.inventory.iter().find(|h| h.mint_address == mint)
    }
}

/// One page session: wallet connection, inventory, burns and rewards
pub struct Session {
    gateway: Arc<dyn ChainGateway>,
    resolver: InventoryResolver,
    submitter: BurnSubmitter,
    ledger: RewardLedger,
    signer: Option<Arc<dyn WalletSigner>>,
    account: Option<Pubkey>,
    state: SessionSnapshot,
    updates: watch::Sender<SessionSnapshot>,
}

impl Session {
    pub fn new(gateway: Arc<dyn ChainGateway>, config: SessionConfig) -> Self {
        let state = SessionSnapshot::disconnected();
        let (updates, _) = watch::channel(state.clone());

        Self {
            resolver: InventoryResolver::new(gateway.clone(), config.resolver),
            submitter: BurnSubmitter::new(gateway.clone()),
            ledger: RewardLedger::new(config.log_capacity),
            gateway,
            signer: None,
            account: None,
            state,
            updates,
        }
    }

    /// Receiver that observes every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn ledger(&self) -> &RewardLedger {
        &self.ledger
    }

    /// Connect `signer` and load its balance and inventory.
    ///
    /// Lookup failures do not fail the connection; they leave the affected
    /// fields empty and set a notice.
    pub async fn connect(&mut self, signer: Arc<dyn WalletSigner>) -> Result<(), SessionError> {
        if self.state.phase != SessionPhase::Disconnected {
            return Err(SessionError::InvalidTransition {
                phase: self.state.phase,
                action: "connect",
            });
        }

        self.state.notice = None;
        self.transition(SessionPhase::Connecting);

        let owner = match signer.public_key() {
            Some(owner) => owner,
            None => {
                warn!("Wallet connected without a public key");
                self.state.notice = Some(SessionError::NoPublicKey.to_string());
                self.transition(SessionPhase::Disconnected);
                return Err(SessionError::NoPublicKey);
            }
        };

        info!(account = %owner, "Wallet connected");
        self.signer = Some(signer);
        self.account = Some(owner);
        self.state.account_address = Some(owner.to_string());
        self.transition(SessionPhase::Connected(ConnectedPhase::LoadingInventory));

        let (balance, inventory) = join(
            self.gateway.get_account_balance(&owner),
            self.resolver.resolve(&owner),
        )
        .await;

        let mut notices = Vec::new();
        match balance {
            Ok(lamports) => self.state.sol_balance = Some(lamports),
            Err(e) => {
                warn!(account = %owner, "Balance lookup failed: {}", e);
                self.state.sol_balance = None;
                notices.push(format!("Could not load SOL balance: {}", e));
            }
        }
        match inventory {
            Ok(holdings) => self.state.inventory = holdings,
            Err(e) => {
                warn!(account = %owner, "Inventory resolution failed: {}", e);
                self.state.inventory = Vec::new();
                notices.push(format!("Could not load tokens: {}", e));
            }
        }
        self.state.notice = if notices.is_empty() { None } else { Some(notices.join("; ")) };

        self.transition(SessionPhase::Connected(ConnectedPhase::Ready));
        Ok(())
    }

    /// Select the holding to burn from
    pub fn select(&mut self, mint: &str) -> Result<(), SessionError> {
        if !self.state.phase.is_connected() {
            return Err(SessionError::InvalidTransition {
                phase: self.state.phase,
                action: "select a token",
            });
        }
        if !self.state.inventory.iter().any(|h| h.mint_address == mint) {
            return Err(SessionError::UnknownMint(mint.to_string()));
        }

        self.state.selected_mint = Some(mint.to_string());
        self.publish();
        Ok(())
    }

    /// Burn from the inventory. Only one burn runs at a time; a request made
    /// outside the ready phase fails without touching the network. The
    /// inventory is re-resolved after every attempt that reached the gateway.
    pub async fn burn(&mut self, request: BurnRequest) -> BurnOutcome {
        let signer = match (&self.signer, self.state.phase) {
            (Some(signer), SessionPhase::Connected(ConnectedPhase::Ready)) => signer.clone(),
            (_, SessionPhase::Disconnected) | (None, _) => {
                return BurnOutcome::failed(request.mint_address, NOT_CONNECTED_MESSAGE)
            }
            _ => return BurnOutcome::failed(request.mint_address, BUSY_MESSAGE),
        };

        self.state.notice = None;
        self.transition(SessionPhase::Connected(ConnectedPhase::Burning));

        let outcome = self
            .submitter
            .submit_burn(&request, &self.state.inventory, signer.as_ref())
            .await;

        self.ledger.record(outcome.clone());
        self.state.notice = outcome.error_message.clone();
        self.state.last_outcome = Some(outcome.clone());
        self.transition(SessionPhase::Connected(ConnectedPhase::Ready));

        // A failed confirmation does not mean nothing was burned
        if outcome.submitted {
            if let Err(e) = self.refresh_inventory().await {
                warn!("Inventory refresh after burn skipped: {}", e);
            }
        }
        outcome
    }

    /// Re-resolve the inventory, dropping the selection if its mint is gone
    pub async fn refresh_inventory(&mut self) -> Result<(), SessionError> {
        let owner = match (self.account, self.state.phase) {
            (Some(owner), SessionPhase::Connected(ConnectedPhase::Ready)) => owner,
            _ => {
                return Err(SessionError::InvalidTransition {
                    phase: self.state.phase,
                    action: "refresh the inventory",
                })
            }
        };

        self.transition(SessionPhase::Connected(ConnectedPhase::LoadingInventory));
        match self.resolver.resolve(&owner).await {
            Ok(holdings) => self.state.inventory = holdings,
            Err(e) => {
                warn!(account = %owner, "Inventory resolution failed: {}", e);
                self.state.inventory = Vec::new();
                self.state.notice = Some(format!("Could not load tokens: {}", e));
            }
        }

        let selection_gone = match &self.state.selected_mint {
            Some(mint) => !self.state.inventory.iter().any(|h| &h.mint_address == mint),
            None => false,
        };
        if selection_gone {
            self.state.selected_mint = None;
        }

        self.transition(SessionPhase::Connected(ConnectedPhase::Ready));
        Ok(())
    }

    /// Forget the wallet and everything loaded for it. Rewards and the
    /// activity log are kept.
    pub fn disconnect(&mut self) {
        if let Some(account) = self.account.take() {
            info!(%account, "Wallet disconnected");
        }
        self.signer = None;
        self.state.account_address = None;
        self.state.sol_balance = None;
        self.state.inventory = Vec::new();
        self.state.selected_mint = None;
        self.state.notice = None;
        self.transition(SessionPhase::Disconnected);
    }

    /// The wallet changed accounts: drop the old connection and load the new one
    pub async fn switch_account(
        &mut self,
        signer: Arc<dyn WalletSigner>,
    ) -> Result<(), SessionError> {
        self.disconnect();
        self.connect(signer).await
    }

    fn transition(&mut self, phase: SessionPhase) {
        self.state.phase = phase;
        self.publish();
    }

    fn publish(&mut self) {
        self.state.reward_total = self.ledger.total();
        self.state.activity_log = self.ledger.activity_log();
        self.updates.send_replace(self.state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incinerator_chain::mock::{GatewayCall, MockChainGateway, MockWalletSigner};
    use incinerator_chain::{IndexedToken, TokenAccountBalance};

    fn indexed(mint: &str, amount: u64) -> IndexedToken {
        IndexedToken {
            mint: mint.to_string(),
            amount,
            decimals: 0,
            token_account: None,
            symbol: Some("EMBR".to_string()),
            name: Some("Ember".to_string()),
            logo_uri: None,
        }
    }

    fn session(gateway: &Arc<MockChainGateway>) -> Session {
        Session::new(gateway.clone(), SessionConfig::default())
    }

    #[tokio::test]
    async fn test_connect_loads_balance_and_inventory() {
        let mint = Pubkey::new_unique().to_string();
        let gateway = Arc::new(
            MockChainGateway::new()
                .with_balance(2_500_000_000)
                .with_indexed_tokens(vec![indexed(&mint, 3)]),
        );
        let mut session = session(&gateway);
        let signer = Arc::new(MockWalletSigner::new_unique());

        session.connect(signer.clone()).await.unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Connected(ConnectedPhase::Ready));
        assert_eq!(snapshot.account_address, Some(signer.pubkey().to_string()));
        assert_eq!(snapshot.sol_balance, Some(2_500_000_000));
        assert_eq!(snapshot.inventory.len(), 1);
        assert!(snapshot.notice.is_none());
    }

    #[tokio::test]
    async fn test_connect_without_public_key_returns_to_disconnected() {
        let gateway = Arc::new(MockChainGateway::new());
        let mut session = session(&gateway);
        let signer = Arc::new(MockWalletSigner::new_unique());
        signer.disconnect();

        let result = session.connect(signer).await;

        assert_eq!(result, Err(SessionError::NoPublicKey));
        assert_eq!(session.phase(), SessionPhase::Disconnected);
        assert!(session.snapshot().notice.is_some());
        assert_eq!(gateway.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_lookup_failures_leave_session_usable() {
        let gateway = Arc::new(
            MockChainGateway::new()
                .with_balance_failure("node down")
                .with_indexer_failure("indexer down")
                .with_rpc_failure("node down"),
        );
        let mut session = session(&gateway);

        session.connect(Arc::new(MockWalletSigner::new_unique())).await.unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Connected(ConnectedPhase::Ready));
        assert!(snapshot.sol_balance.is_none());
        assert!(snapshot.inventory.is_empty());
        let notice = snapshot.notice.unwrap();
        assert!(notice.contains("SOL balance"));
        assert!(notice.contains("tokens"));
    }

    #[tokio::test]
    async fn test_connect_twice_is_rejected() {
        let gateway = Arc::new(MockChainGateway::new());
        let mut session = session(&gateway);
        session.connect(Arc::new(MockWalletSigner::new_unique())).await.unwrap();

        let result = session.connect(Arc::new(MockWalletSigner::new_unique())).await;

        assert!(matches!(result, Err(SessionError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_select_requires_inventory_membership() {
        let mint = Pubkey::new_unique().to_string();
        let gateway =
            Arc::new(MockChainGateway::new().with_indexed_tokens(vec![indexed(&mint, 1)]));
        let mut session = session(&gateway);

        assert!(session.select(&mint).is_err());
        session.connect(Arc::new(MockWalletSigner::new_unique())).await.unwrap();

        assert_eq!(
            session.select("missing"),
            Err(SessionError::UnknownMint("missing".to_string()))
        );
        session.select(&mint).unwrap();
        assert_eq!(session.snapshot().selected_holding().map(|h| h.raw_amount), Some(1));
    }

    #[tokio::test]
    async fn test_burn_while_disconnected_makes_no_calls() {
        let gateway = Arc::new(MockChainGateway::new());
        let mut session = session(&gateway);

        let outcome = session.burn(BurnRequest::new(Pubkey::new_unique().to_string(), "1")).await;

        assert!(!outcome.success);
        assert_eq!(outcome.error_message.as_deref(), Some(NOT_CONNECTED_MESSAGE));
        assert_eq!(gateway.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_burn_leaves_ledger_untouched() {
        let mint = Pubkey::new_unique().to_string();
        let gateway =
            Arc::new(MockChainGateway::new().with_indexed_tokens(vec![indexed(&mint, 5)]));
        let mut session = session(&gateway);
        session.connect(Arc::new(MockWalletSigner::new_unique())).await.unwrap();

        let outcome = session.burn(BurnRequest::new(mint.clone(), "6")).await;

        assert!(!outcome.success);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Connected(ConnectedPhase::Ready));
        assert_eq!(snapshot.reward_total, 0);
        assert!(snapshot.activity_log.is_empty());
        assert_eq!(snapshot.last_outcome, Some(outcome.clone()));
        assert_eq!(snapshot.notice, outcome.error_message);
        assert_eq!(gateway.calls(GatewayCall::Submit), 0);
    }

    #[tokio::test]
    async fn test_refresh_drops_vanished_selection() {
        let mint = Pubkey::new_unique().to_string();
        let gateway =
            Arc::new(MockChainGateway::new().with_indexed_tokens(vec![indexed(&mint, 5)]));
        let mut session = session(&gateway);
        session.connect(Arc::new(MockWalletSigner::new_unique())).await.unwrap();
        session.select(&mint).unwrap();

        gateway.set_indexed_tokens(Vec::new());
        gateway.set_token_accounts(vec![TokenAccountBalance {
            pubkey: Pubkey::new_unique().to_string(),
            mint: Pubkey::new_unique().to_string(),
            raw_amount: 1,
            decimals: 0,
        }]);
        session.refresh_inventory().await.unwrap();

        let snapshot = session.snapshot();
        assert!(snapshot.selected_mint.is_none());
        assert_eq!(snapshot.inventory.len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_clears_connection_but_keeps_rewards() {
        let mint = Pubkey::new_unique().to_string();
        let gateway = Arc::new(
            MockChainGateway::new()
                .with_balance(10)
                .with_indexed_tokens(vec![indexed(&mint, 2_000_000)]),
        );
        let mut session = session(&gateway);
        session.connect(Arc::new(MockWalletSigner::new_unique())).await.unwrap();
        session.select(&mint).unwrap();
        assert!(session.burn(BurnRequest::new(mint.clone(), "1000000")).await.success);

        session.disconnect();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Disconnected);
        assert!(snapshot.account_address.is_none());
        assert!(snapshot.sol_balance.is_none());
        assert!(snapshot.inventory.is_empty());
        assert!(snapshot.selected_mint.is_none());
        assert_eq!(snapshot.reward_total, 1000);
        assert_eq!(snapshot.activity_log.len(), 1);
    }

    #[tokio::test]
    async fn test_switch_account_reloads_for_new_wallet() {
        let gateway = Arc::new(MockChainGateway::new().with_balance(1));
        let mut session = session(&gateway);
        session.connect(Arc::new(MockWalletSigner::new_unique())).await.unwrap();
        let next = Arc::new(MockWalletSigner::new_unique());

        session.switch_account(next.clone()).await.unwrap();

        assert_eq!(session.snapshot().account_address, Some(next.pubkey().to_string()));
        assert_eq!(gateway.calls(GatewayCall::Balance), 2);
    }

    #[tokio::test]
    async fn test_subscribers_observe_connect_result() {
        let gateway = Arc::new(MockChainGateway::new());
        let mut session = session(&gateway);
        let mut updates = session.subscribe();
        assert_eq!(updates.borrow_and_update().phase, SessionPhase::Disconnected);

        session.connect(Arc::new(MockWalletSigner::new_unique())).await.unwrap();

        assert!(updates.has_changed().unwrap());
        assert_eq!(
            updates.borrow_and_update().phase,
            SessionPhase::Connected(ConnectedPhase::Ready)
        );
    }
}

/*!
 * Incinerator Core
 *
 * Inventory reconciliation across the indexer and the node, burn
 * validation and submission, the client-local reward ledger, and the
 * session state machine that orchestrates them.
 */

pub mod burn;
pub mod config;
pub mod error;
pub mod ledger;
pub mod names;
pub mod resolver;
pub mod session;

pub use burn::{reward_for, to_raw_amount, BurnSubmitter};
pub use config::{ResolverOptions, SessionConfig};
pub use error::{BurnError, BurnResult, SessionError};
pub use ledger::{ClaimProgress, RewardLedger};
pub use names::{known_mint, KnownMint, KNOWN_MINTS};
pub use resolver::InventoryResolver;
pub use session::{ConnectedPhase, Session, SessionPhase, SessionSnapshot};

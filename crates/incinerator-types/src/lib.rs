/*!
 * Incinerator Types
 *
 * Data model shared by the chain gateway, the inventory resolver,
 * the burn submitter and the session state machine.
 */

pub mod burn;
pub mod holding;

pub use burn::{BurnOutcome, BurnRequest};
pub use holding::{lamports_to_sol, HoldingSource, TokenHolding, MAX_DECIMALS};

pub use rust_decimal::Decimal;

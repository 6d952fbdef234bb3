use incinerator_chain::ChainError;
use thiserror::Error;

use crate::session::SessionPhase;

/// Why a burn attempt did not succeed
#[derive(Error, Debug)]
pub enum BurnError {
    /// Bad user input, caught before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Signing, submission or confirmation failed
    #[error(transparent)]
    Chain(#[from] ChainError),
}

pub type BurnResult<T> = Result<T, BurnError>;

impl BurnError {
    pub fn is_validation(&self) -> bool {
        matches!(self, BurnError::Validation(_))
    }
}

/// Session operations rejected by the state machine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Cannot {action} while {phase}")]
    InvalidTransition { phase: SessionPhase, action: &'static str },

    #[error("Wallet did not provide a public key")]
    NoPublicKey,

    #[error("Mint {0} is not in the inventory")]
    UnknownMint(String),
}

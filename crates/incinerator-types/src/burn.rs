use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// User intent to destroy a quantity of one holding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnRequest {
    /// Mint of the holding to burn from
    pub mint_address: String,

    /// Amount as entered by the user, in display units
    pub human_amount: String,
}

impl BurnRequest {
    pub fn new(mint_address: impl Into<String>, human_amount: impl Into<String>) -> Self {
        Self {
            mint_address: mint_address.into(),
            human_amount: human_amount.into(),
        }
    }
}

/// Result of one burn attempt.
///
/// Built only through [`BurnOutcome::succeeded`], [`BurnOutcome::failed`] and
/// [`BurnOutcome::failed_after_submission`] so that `transaction_id`,
/// `reward_granted` and `burned_amount` are present iff `success`, and
/// `error_message` iff not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnOutcome {
    pub success: bool,

    /// Mint the attempt targeted
    pub mint_address: String,

    /// Confirmed transaction signature
    pub transaction_id: Option<String>,

    /// Amount destroyed, in display units
    pub burned_amount: Option<Decimal>,

    /// ASH granted for this burn
    pub reward_granted: Option<u64>,

    /// Why the attempt failed
    pub error_message: Option<String>,

    /// Whether the attempt got past local validation and reached the gateway.
    /// Such attempts may have changed balances even when they failed.
    #[serde(default)]
    pub submitted: bool,

    pub recorded_at: DateTime<Utc>,
}

impl BurnOutcome {
    pub fn succeeded(
        mint_address: impl Into<String>,
        transaction_id: impl Into<String>,
        burned_amount: Decimal,
        reward_granted: u64,
    ) -> Self {
        Self {
            success: true,
            mint_address: mint_address.into(),
            transaction_id: Some(transaction_id.into()),
            burned_amount: Some(burned_amount),
            reward_granted: Some(reward_granted),
            error_message: None,
            submitted: true,
            recorded_at: Utc::now(),
        }
    }

    pub fn failed(mint_address: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            mint_address: mint_address.into(),
            transaction_id: None,
            burned_amount: None,
            reward_granted: None,
            error_message: Some(error_message.into()),
            submitted: false,
            recorded_at: Utc::now(),
        }
    }

    /// Failure after the request reached the gateway
    pub fn failed_after_submission(
        mint_address: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            submitted: true,
            ..Self::failed(mint_address, error_message)
        }
    }

    /// Reward to add to a ledger; zero for failures
    pub fn reward(&self) -> u64 {
        if self.success {
            self.reward_granted.unwrap_or(0)
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_carries_transaction_and_reward() {
        let outcome = BurnOutcome::succeeded("mint", "sig", Decimal::from(5), 0);
        assert!(outcome.success);
        assert_eq!(outcome.transaction_id.as_deref(), Some("sig"));
        assert_eq!(outcome.reward_granted, Some(0));
        assert!(outcome.error_message.is_none());
    }

    #[test]
    fn test_failure_carries_only_message() {
        let outcome = BurnOutcome::failed("mint", "User rejected the request");
        assert!(!outcome.success);
        assert!(outcome.transaction_id.is_none());
        assert!(outcome.reward_granted.is_none());
        assert!(outcome.burned_amount.is_none());
        assert_eq!(outcome.reward(), 0);
        assert!(!outcome.submitted);
    }

    #[test]
    fn test_failure_after_submission_is_flagged() {
        let outcome = BurnOutcome::failed_after_submission("mint", "Confirmation timeout");
        assert!(!outcome.success);
        assert!(outcome.submitted);
        assert!(outcome.transaction_id.is_none());
        assert_eq!(outcome.reward(), 0);
    }

    #[test]
    fn test_outcome_serializes_amount_as_string() {
        let outcome = BurnOutcome::succeeded("mint", "sig", Decimal::new(15, 1), 1);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["burned_amount"], "1.5");
        assert_eq!(json["reward_granted"], 1);
    }
}

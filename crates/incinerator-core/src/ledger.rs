use std::collections::VecDeque;

use incinerator_types::BurnOutcome;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DEFAULT_LOG_CAPACITY;

/// ASH redeemable for one SOL
pub const ASH_PER_SOL: u64 = 100_000;

/// How far the reward total has progressed towards SOL claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimProgress {
    /// Whole SOL the total would redeem
    pub claimable_sol: u64,
    /// ASH accumulated towards the next SOL
    pub ash_into_current: u64,
    /// ASH still needed for the next SOL
    pub ash_until_next: u64,
}

impl ClaimProgress {
    pub fn for_total(total: u64) -> Self {
        let ash_into_current = total % ASH_PER_SOL;
        Self {
            claimable_sol: total / ASH_PER_SOL,
            ash_into_current,
            ash_until_next: ASH_PER_SOL - ash_into_current,
        }
    }
}

/// Client-local reward counter and recent-activity log.
///
/// Lives as long as the owning session and is never persisted.
#[derive(Debug, Clone)]
pub struct RewardLedger {
    total: u64,
    activity: VecDeque<BurnOutcome>,
    capacity: usize,
}

impl Default for RewardLedger {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl RewardLedger {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            total: 0,
            activity: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a burn outcome. Returns `false`, and changes nothing, for
    /// failed attempts.
    pub fn record(&mut self, outcome: BurnOutcome) -> bool {
        if !outcome.success {
            return false;
        }

        self.total = self.total.saturating_add(outcome.reward());
        self.activity.push_front(outcome);
        self.activity.truncate(self.capacity);
        debug!(total = self.total, entries = self.activity.len(), "Reward recorded");
        true
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Recent successful outcomes, newest first
    pub fn activity(&self) -> impl Iterator<Item = &BurnOutcome> {
        self.activity.iter()
    }

    pub fn activity_log(&self) -> Vec<BurnOutcome> {
        self.activity.iter().cloned().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn claim_progress(&self) -> ClaimProgress {
        ClaimProgress::for_total(self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incinerator_types::Decimal;

    fn success(tx: &str, reward: u64) -> BurnOutcome {
        BurnOutcome::succeeded("mint", tx, Decimal::from(reward * 1000), reward)
    }

    #[test]
    fn test_failures_are_ignored() {
        let mut ledger = RewardLedger::default();

        assert!(!ledger.record(BurnOutcome::failed("mint", "rejected")));
        assert_eq!(ledger.total(), 0);
        assert_eq!(ledger.activity().count(), 0);
    }

    #[test]
    fn test_log_keeps_newest_entries_first() {
        let mut ledger = RewardLedger::new(10);
        for i in 0..12u64 {
            assert!(ledger.record(success(&format!("tx{}", i), 1)));
        }

        let log = ledger.activity_log();
        assert_eq!(log.len(), 10);
        assert_eq!(log[0].transaction_id.as_deref(), Some("tx11"));
        assert_eq!(log[9].transaction_id.as_deref(), Some("tx2"));
        assert_eq!(ledger.total(), 12);
    }

    #[test]
    fn test_zero_reward_burns_are_still_logged() {
        let mut ledger = RewardLedger::default();

        assert!(ledger.record(success("tx", 0)));
        assert_eq!(ledger.total(), 0);
        assert_eq!(ledger.activity().count(), 1);
    }

    #[test]
    fn test_claim_progress() {
        assert_eq!(
            ClaimProgress::for_total(0),
            ClaimProgress {
                claimable_sol: 0,
                ash_into_current: 0,
                ash_until_next: ASH_PER_SOL,
            }
        );

        let mut ledger = RewardLedger::default();
        ledger.record(success("a", 100_000));
        ledger.record(success("b", 25_000));
        let progress = ledger.claim_progress();
        assert_eq!(progress.claimable_sol, 1);
        assert_eq!(progress.ash_into_current, 25_000);
        assert_eq!(progress.ash_until_next, 75_000);
    }
}

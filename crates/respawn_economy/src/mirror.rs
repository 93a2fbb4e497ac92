//! # Runtime Mirror
//!
//! Per-session copy of a player's balance, published to the live entity so
//! other engine systems can read it without a ledger lookup. Never
//! authoritative: rebuilt from the ledger on login, flushed back on
//! disconnect.

use crate::account::Tokens;

/// Session-scoped balance state attached to the player entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuntimeMirror {
    /// Current token balance.
    pub balance: Tokens,
    /// Whether the next respawn attempt may succeed.
    pub can_respawn: bool,
    /// Game clock at the last death, in milliseconds.
    pub last_death_ms: Option<u64>,
}

impl RuntimeMirror {
    /// Builds a mirror from a ledger balance.
    #[must_use]
    pub const fn from_balance(balance: Tokens) -> Self {
        Self {
            balance,
            can_respawn: balance >= 1,
            last_death_ms: None,
        }
    }

    /// Replaces the balance and re-derives `can_respawn`.
    ///
    /// Returns true if the player could not respawn before and now can.
    pub fn sync_balance(&mut self, balance: Tokens) -> bool {
        let could = self.can_respawn;
        self.balance = balance;
        self.can_respawn = balance >= 1;
        !could && self.can_respawn
    }

    /// Records a death at `now_ms`.
    pub fn record_death(&mut self, now_ms: u64) {
        self.last_death_ms = Some(now_ms);
        self.can_respawn = self.balance >= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_balance() {
        assert!(RuntimeMirror::from_balance(1).can_respawn);
        assert!(!RuntimeMirror::from_balance(0).can_respawn);
    }

    #[test]
    fn test_sync_reports_unlock() {
        let mut mirror = RuntimeMirror::from_balance(0);
        assert!(mirror.sync_balance(2));
        assert!(!mirror.sync_balance(3));
        assert!(!mirror.sync_balance(0));
        assert!(!mirror.can_respawn);
    }

    #[test]
    fn test_record_death() {
        let mut mirror = RuntimeMirror::from_balance(0);
        mirror.record_death(1_500);
        assert_eq!(mirror.last_death_ms, Some(1_500));
        assert!(!mirror.can_respawn);
    }
}

//! # Balance Ledger
//!
//! **The only source of truth for token balances.**
//!
//! Every mutating operation follows the same transaction shape:
//!
//! ```text
//! lock table -> snapshot -> validate + apply -> save full table
//!                                                 │
//!                              Ok ────────────────┴──────────── Err
//!                              │                                 │
//!                        return result               restore snapshot, return
//!                                                    PersistenceFailure
//! ```
//!
//! A command therefore never reports success for a change that is not on
//! disk, and memory never runs ahead of disk after a failed write.
//!
//! ## Thread Safety
//!
//! The whole table sits behind one `parking_lot::Mutex`. The host drives the
//! ledger from a single game thread, so the lock is uncontended; it exists so
//! the ledger stays correct if embedded in a multi-threaded host.

use parking_lot::Mutex;

use crate::account::{names_match, normalize_name, AccountKey, PlayerAccount, PlayerUid, Tokens};
use crate::error::{EconomyError, EconomyResult};
use crate::store::{AccountStore, AccountTable};

/// How `get_or_create` produced the returned account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountOrigin {
    /// The player already had an account.
    Existing,
    /// A pending placeholder was re-keyed to the player's identity or
    /// merged into their account.
    Reconciled,
    /// A new account was seeded with the starting balance.
    Created,
}

/// Balances after a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Sender balance after the transfer.
    pub from_balance: Tokens,
    /// Recipient balance after the transfer.
    pub to_balance: Tokens,
    /// Whether the recipient account was created by this transfer.
    pub created_recipient: bool,
}

/// Per-player token balances backed by durable storage.
pub struct Ledger {
    accounts: Mutex<AccountTable>,
    store: Box<dyn AccountStore>,
}

fn require_positive(amount: Tokens) -> EconomyResult<()> {
    if amount == 0 {
        return Err(EconomyError::InvalidArgument("amount must be positive".to_string()));
    }
    Ok(())
}

fn not_found(key: &AccountKey) -> EconomyError {
    EconomyError::PlayerNotFound(key.to_string())
}

impl Ledger {
    /// Loads the account table from `store`.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidStore` if the stored table cannot be read.
    pub fn init(store: impl AccountStore + 'static) -> EconomyResult<Self> {
        let accounts = store.load()?;
        tracing::info!(accounts = accounts.len(), "ledger loaded");
        Ok(Self {
            accounts: Mutex::new(accounts),
            store: Box::new(store),
        })
    }

    /// Writes the current table again. Used at shutdown and after a failed
    /// write has been fixed.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::PersistenceFailure` if the write fails.
    pub fn flush(&self) -> EconomyResult<()> {
        let accounts = self.accounts.lock();
        self.store.save(&accounts)
    }

    /// Flushes and releases the ledger.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::PersistenceFailure` if the final write fails.
    pub fn shutdown(self) -> EconomyResult<()> {
        self.flush()?;
        tracing::info!(accounts = self.len(), "ledger closed");
        Ok(())
    }

    /// Saves `accounts`, restoring `snapshot` into it if the save fails.
    fn persist_or_restore(
        &self,
        accounts: &mut AccountTable,
        snapshot: AccountTable,
        op: &'static str,
    ) -> EconomyResult<()> {
        if let Err(err) = self.store.save(accounts) {
            *accounts = snapshot;
            tracing::error!(op, error = %err, "ledger write failed, change rolled back");
            return Err(err);
        }
        Ok(())
    }

    /// Runs `apply` against the table as one persisted transaction.
    fn mutate<T>(
        &self,
        op: &'static str,
        apply: impl FnOnce(&mut AccountTable) -> EconomyResult<T>,
    ) -> EconomyResult<T> {
        let mut accounts = self.accounts.lock();
        let snapshot = accounts.clone();
        let value = match apply(&mut accounts) {
            Ok(value) => value,
            Err(err) => {
                *accounts = snapshot;
                return Err(err);
            }
        };
        self.persist_or_restore(&mut accounts, snapshot, op)?;
        Ok(value)
    }

    /// Returns the player's account, creating or reconciling it if needed.
    ///
    /// The display name is refreshed on every call. A pending placeholder
    /// matching the name is folded into the player's account: re-keyed to
    /// `uid` when the player has no account yet, otherwise its balance is
    /// added to the existing one. Without either, a new account gets
    /// `starting_balance`.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ArithmeticOverflow` if merging a placeholder
    /// would overflow the balance, or `EconomyError::PersistenceFailure` if a
    /// change could not be saved.
    pub fn get_or_create(
        &self,
        uid: &PlayerUid,
        display_name: &str,
        starting_balance: Tokens,
    ) -> EconomyResult<(PlayerAccount, AccountOrigin)> {
        let key = AccountKey::known(uid);
        let pending_key = AccountKey::pending(display_name);
        let mut accounts = self.accounts.lock();

        if let Some(account) = accounts.get(&key) {
            if account.display_name == display_name && !accounts.contains_key(&pending_key) {
                return Ok((account.clone(), AccountOrigin::Existing));
            }
        }

        let snapshot = accounts.clone();
        let pending = accounts.remove(&pending_key);
        let merged = match (accounts.get(&key), &pending) {
            (Some(account), Some(pending)) => Some(account.balance.checked_add(pending.balance)),
            _ => None,
        };
        let merged = match merged {
            Some(None) => {
                *accounts = snapshot;
                return Err(EconomyError::ArithmeticOverflow);
            }
            Some(Some(balance)) => Some(balance),
            None => None,
        };
        let (account, origin) = match (accounts.get_mut(&key), pending) {
            (Some(account), _) => {
                account.display_name = display_name.to_string();
                match merged {
                    Some(balance) => {
                        account.balance = balance;
                        (account.clone(), AccountOrigin::Reconciled)
                    }
                    None => (account.clone(), AccountOrigin::Existing),
                }
            }
            (None, Some(mut pending)) => {
                pending.display_name = display_name.to_string();
                accounts.insert(key.clone(), pending.clone());
                (pending, AccountOrigin::Reconciled)
            }
            (None, None) => {
                let account = PlayerAccount::new(display_name, starting_balance);
                accounts.insert(key.clone(), account.clone());
                (account, AccountOrigin::Created)
            }
        };

        self.persist_or_restore(&mut accounts, snapshot, "get_or_create")?;
        match origin {
            AccountOrigin::Created => {
                tracing::info!(%uid, name = display_name, balance = account.balance, "account created");
            }
            AccountOrigin::Reconciled => {
                tracing::info!(%uid, name = display_name, balance = account.balance, "pending account reconciled");
            }
            AccountOrigin::Existing => {}
        }
        Ok((account, origin))
    }

    /// Adds tokens to an existing account. Returns the new balance.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero amount, `PlayerNotFound` for an unknown
    /// key, `ArithmeticOverflow`, or `PersistenceFailure`.
    pub fn credit(&self, key: &AccountKey, amount: Tokens) -> EconomyResult<Tokens> {
        require_positive(amount)?;
        self.mutate("credit", |accounts| {
            let account = accounts.get_mut(key).ok_or_else(|| not_found(key))?;
            account.balance = account
                .balance
                .checked_add(amount)
                .ok_or(EconomyError::ArithmeticOverflow)?;
            Ok(account.balance)
        })
    }

    /// Removes tokens from an existing account. Returns the new balance.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero amount, `PlayerNotFound`,
    /// `InsufficientBalance`, or `PersistenceFailure`.
    pub fn debit(&self, key: &AccountKey, amount: Tokens) -> EconomyResult<Tokens> {
        require_positive(amount)?;
        self.mutate("debit", |accounts| {
            let account = accounts.get_mut(key).ok_or_else(|| not_found(key))?;
            account.balance = account.balance.checked_sub(amount).ok_or(
                EconomyError::InsufficientBalance {
                    required: amount,
                    available: account.balance,
                },
            )?;
            Ok(account.balance)
        })
    }

    /// Moves tokens between accounts, creating the recipient (balance 0,
    /// named `to_name`) if it does not exist.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero amount, `SelfTransferRejected` when both
    /// sides are the same key or carry the same name ignoring case,
    /// `PlayerNotFound` for an unknown sender, `InsufficientBalance`,
    /// `ArithmeticOverflow`, or `PersistenceFailure`.
    pub fn transfer(
        &self,
        from: &AccountKey,
        to: &AccountKey,
        to_name: &str,
        amount: Tokens,
    ) -> EconomyResult<TransferReceipt> {
        require_positive(amount)?;
        if from == to {
            return Err(EconomyError::SelfTransferRejected);
        }

        self.mutate("transfer", |accounts| {
            let sender = accounts.get(from).ok_or_else(|| not_found(from))?;
            let recipient_name = accounts
                .get(to)
                .map_or(to_name, |recipient| recipient.display_name.as_str());
            if names_match(&sender.display_name, recipient_name) {
                return Err(EconomyError::SelfTransferRejected);
            }

            let from_balance = sender.balance.checked_sub(amount).ok_or(
                EconomyError::InsufficientBalance {
                    required: amount,
                    available: sender.balance,
                },
            )?;
            let to_current = accounts.get(to).map_or(0, |recipient| recipient.balance);
            let to_balance = to_current
                .checked_add(amount)
                .ok_or(EconomyError::ArithmeticOverflow)?;

            let created_recipient = !accounts.contains_key(to);
            if let Some(sender) = accounts.get_mut(from) {
                sender.balance = from_balance;
            }
            accounts
                .entry(to.clone())
                .or_insert_with(|| PlayerAccount::new(to_name, 0))
                .balance = to_balance;

            Ok(TransferReceipt {
                from_balance,
                to_balance,
                created_recipient,
            })
        })
    }

    /// Overwrites an existing account's balance.
    ///
    /// # Errors
    ///
    /// `PlayerNotFound` or `PersistenceFailure`.
    pub fn set(&self, key: &AccountKey, amount: Tokens) -> EconomyResult<Tokens> {
        self.mutate("set", |accounts| {
            let account = accounts.get_mut(key).ok_or_else(|| not_found(key))?;
            account.balance = amount;
            Ok(amount)
        })
    }

    /// Sets an existing account's balance to zero.
    ///
    /// # Errors
    ///
    /// `PlayerNotFound` or `PersistenceFailure`.
    pub fn reset(&self, key: &AccountKey) -> EconomyResult<()> {
        self.set(key, 0).map(|_| ())
    }

    /// Overwrites a balance, creating the account as `name` if absent.
    /// Returns whether the account was created.
    ///
    /// # Errors
    ///
    /// `PersistenceFailure`.
    pub fn set_or_create(&self, key: &AccountKey, name: &str, amount: Tokens) -> EconomyResult<bool> {
        self.mutate("set_or_create", |accounts| {
            let created = !accounts.contains_key(key);
            accounts
                .entry(key.clone())
                .or_insert_with(|| PlayerAccount::new(name, 0))
                .balance = amount;
            Ok(created)
        })
    }

    /// Adds tokens, creating the account as `name` with balance 0 first if
    /// absent. Returns the new balance and whether the account was created.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero amount, `ArithmeticOverflow`, or
    /// `PersistenceFailure`.
    pub fn credit_or_create(
        &self,
        key: &AccountKey,
        name: &str,
        amount: Tokens,
    ) -> EconomyResult<(Tokens, bool)> {
        require_positive(amount)?;
        self.mutate("credit_or_create", |accounts| {
            let created = !accounts.contains_key(key);
            let account = accounts
                .entry(key.clone())
                .or_insert_with(|| PlayerAccount::new(name, 0));
            account.balance = account
                .balance
                .checked_add(amount)
                .ok_or(EconomyError::ArithmeticOverflow)?;
            Ok((account.balance, created))
        })
    }

    /// Finds the account whose display name matches, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::AmbiguousPlayerName` if more than one account
    /// carries the name.
    pub fn lookup_by_name(&self, name: &str) -> EconomyResult<Option<(AccountKey, PlayerAccount)>> {
        let accounts = self.accounts.lock();
        let mut matches = accounts.iter().filter(|(_, account)| account.is_named(name));
        let first = matches.next();
        if matches.next().is_some() {
            return Err(EconomyError::AmbiguousPlayerName(normalize_name(name)));
        }
        Ok(first.map(|(key, account)| (key.clone(), account.clone())))
    }

    /// Returns an account's balance.
    #[must_use]
    pub fn balance(&self, key: &AccountKey) -> Option<Tokens> {
        self.accounts.lock().get(key).map(|account| account.balance)
    }

    /// Returns a copy of an account.
    #[must_use]
    pub fn account(&self, key: &AccountKey) -> Option<PlayerAccount> {
        self.accounts.lock().get(key).cloned()
    }

    /// Number of accounts, placeholders included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.lock().len()
    }

    /// Returns true if the ledger holds no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.lock().is_empty()
    }

    /// Sum of all balances.
    #[must_use]
    pub fn total_supply(&self) -> u64 {
        self.accounts
            .lock()
            .values()
            .map(|account| u64::from(account.balance))
            .sum()
    }

    /// Copy of the whole table.
    #[must_use]
    pub fn snapshot(&self) -> AccountTable {
        self.accounts.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::MemoryStore;

    fn ledger() -> (Ledger, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::init(Arc::clone(&store)).unwrap();
        (ledger, store)
    }

    fn uid(id: &str) -> PlayerUid {
        PlayerUid::new(id)
    }

    fn known(id: &str) -> AccountKey {
        AccountKey::known(&uid(id))
    }

    #[test]
    fn test_get_or_create_seeds_starting_balance() {
        let (ledger, _) = ledger();
        let (account, origin) = ledger.get_or_create(&uid("u1"), "Alex", 5).unwrap();
        assert_eq!(origin, AccountOrigin::Created);
        assert_eq!(account.balance, 5);

        let (account, origin) = ledger.get_or_create(&uid("u1"), "Alex", 99).unwrap();
        assert_eq!(origin, AccountOrigin::Existing);
        assert_eq!(account.balance, 5);
    }

    #[test]
    fn test_get_or_create_refreshes_name() {
        let (ledger, store) = ledger();
        ledger.get_or_create(&uid("u1"), "Alex", 5).unwrap();
        let saves = store.save_count();

        ledger.get_or_create(&uid("u1"), "Alex", 5).unwrap();
        assert_eq!(store.save_count(), saves, "unchanged login must not rewrite the file");

        ledger.get_or_create(&uid("u1"), "Alexandra", 5).unwrap();
        assert_eq!(ledger.account(&known("u1")).unwrap().display_name, "Alexandra");
        assert_eq!(store.save_count(), saves + 1);
    }

    #[test]
    fn test_pending_account_reconciled_on_login() {
        let (ledger, _) = ledger();
        ledger.set_or_create(&AccountKey::pending("Sam"), "Sam", 3).unwrap();

        let (account, origin) = ledger.get_or_create(&uid("u2"), "SAM", 5).unwrap();
        assert_eq!(origin, AccountOrigin::Reconciled);
        assert_eq!(account.balance, 3);
        assert_eq!(account.display_name, "SAM");
        assert_eq!(ledger.balance(&AccountKey::pending("sam")), None);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_pending_account_merged_into_renamed_player() {
        let (ledger, _) = ledger();
        ledger.get_or_create(&uid("r"), "Old", 5).unwrap();
        ledger.set_or_create(&AccountKey::pending("New"), "New", 2).unwrap();

        let (account, origin) = ledger.get_or_create(&uid("r"), "New", 5).unwrap();
        assert_eq!(origin, AccountOrigin::Reconciled);
        assert_eq!(account.balance, 7);
        assert_eq!(account.display_name, "New");
        assert_eq!(ledger.balance(&AccountKey::pending("new")), None);
        assert_eq!(ledger.lookup_by_name("new").unwrap().map(|(key, _)| key), Some(known("r")));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_pending_merge_overflow_changes_nothing() {
        let (ledger, _) = ledger();
        ledger.get_or_create(&uid("r"), "Old", Tokens::MAX).unwrap();
        ledger.set_or_create(&AccountKey::pending("New"), "New", 1).unwrap();

        assert_eq!(
            ledger.get_or_create(&uid("r"), "New", 5),
            Err(EconomyError::ArithmeticOverflow)
        );
        assert_eq!(ledger.balance(&known("r")), Some(Tokens::MAX));
        assert_eq!(ledger.balance(&AccountKey::pending("new")), Some(1));
        assert_eq!(ledger.account(&known("r")).unwrap().display_name, "Old");
    }

    #[test]
    fn test_credit_and_debit() {
        let (ledger, _) = ledger();
        ledger.get_or_create(&uid("u1"), "Alex", 5).unwrap();
        assert_eq!(ledger.credit(&known("u1"), 3).unwrap(), 8);
        assert_eq!(ledger.debit(&known("u1"), 8).unwrap(), 0);
        assert_eq!(
            ledger.debit(&known("u1"), 1),
            Err(EconomyError::InsufficientBalance { required: 1, available: 0 })
        );
        assert_eq!(ledger.balance(&known("u1")), Some(0));
    }

    #[test]
    fn test_zero_amounts_rejected() {
        let (ledger, _) = ledger();
        ledger.get_or_create(&uid("u1"), "Alex", 5).unwrap();
        assert!(matches!(ledger.credit(&known("u1"), 0), Err(EconomyError::InvalidArgument(_))));
        assert!(matches!(ledger.debit(&known("u1"), 0), Err(EconomyError::InvalidArgument(_))));
    }

    #[test]
    fn test_unknown_account() {
        let (ledger, _) = ledger();
        assert!(matches!(ledger.credit(&known("ghost"), 1), Err(EconomyError::PlayerNotFound(_))));
        assert!(matches!(ledger.reset(&known("ghost")), Err(EconomyError::PlayerNotFound(_))));
    }

    #[test]
    fn test_credit_overflow_rejected() {
        let (ledger, _) = ledger();
        ledger.get_or_create(&uid("u1"), "Alex", Tokens::MAX).unwrap();
        assert_eq!(ledger.credit(&known("u1"), 1), Err(EconomyError::ArithmeticOverflow));
        assert_eq!(ledger.balance(&known("u1")), Some(Tokens::MAX));
    }

    #[test]
    fn test_debit_then_credit_is_identity() {
        let (ledger, _) = ledger();
        ledger.get_or_create(&uid("u1"), "Alex", 7).unwrap();
        for amount in 1..=7 {
            ledger.debit(&known("u1"), amount).unwrap();
            ledger.credit(&known("u1"), amount).unwrap();
            assert_eq!(ledger.balance(&known("u1")), Some(7));
        }
    }

    #[test]
    fn test_set_is_idempotent() {
        let (ledger, _) = ledger();
        ledger.get_or_create(&uid("u1"), "Alex", 7).unwrap();
        ledger.set(&known("u1"), 4).unwrap();
        let once = ledger.snapshot();
        ledger.set(&known("u1"), 4).unwrap();
        assert_eq!(ledger.snapshot(), once);
        ledger.reset(&known("u1")).unwrap();
        assert_eq!(ledger.balance(&known("u1")), Some(0));
    }

    #[test]
    fn test_transfer_preserves_sum() {
        let (ledger, _) = ledger();
        ledger.get_or_create(&uid("a"), "Alex", 5).unwrap();
        ledger.get_or_create(&uid("b"), "Blake", 0).unwrap();

        let receipt = ledger.transfer(&known("a"), &known("b"), "Blake", 3).unwrap();
        assert_eq!(receipt.from_balance, 2);
        assert_eq!(receipt.to_balance, 3);
        assert!(!receipt.created_recipient);
        assert_eq!(ledger.total_supply(), 5);
    }

    #[test]
    fn test_transfer_creates_placeholder() {
        let (ledger, _) = ledger();
        ledger.get_or_create(&uid("a"), "Alex", 5).unwrap();
        let before = ledger.total_supply();

        let receipt = ledger
            .transfer(&known("a"), &AccountKey::pending("Newbie"), "Newbie", 2)
            .unwrap();
        assert!(receipt.created_recipient);
        assert_eq!(receipt.to_balance, 2);
        assert_eq!(ledger.total_supply(), before);
        assert_eq!(ledger.account(&AccountKey::pending("newbie")).unwrap().display_name, "Newbie");
    }

    #[test]
    fn test_self_transfer_rejected() {
        let (ledger, _) = ledger();
        ledger.get_or_create(&uid("a"), "Alex", 5).unwrap();
        assert_eq!(
            ledger.transfer(&known("a"), &known("a"), "Alex", 1),
            Err(EconomyError::SelfTransferRejected)
        );
        // Different key, same name in a different case.
        assert_eq!(
            ledger.transfer(&known("a"), &AccountKey::pending("ALEX"), "ALEX", 1),
            Err(EconomyError::SelfTransferRejected)
        );
        assert_eq!(ledger.balance(&known("a")), Some(5));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_transfer_insufficient_changes_nothing() {
        let (ledger, _) = ledger();
        ledger.get_or_create(&uid("a"), "Alex", 1).unwrap();
        let before = ledger.snapshot();
        assert_eq!(
            ledger.transfer(&known("a"), &AccountKey::pending("Bo"), "Bo", 2),
            Err(EconomyError::InsufficientBalance { required: 2, available: 1 })
        );
        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let (ledger, store) = ledger();
        ledger.get_or_create(&uid("a"), "Alex", 5).unwrap();
        ledger.get_or_create(&uid("b"), "Blake", 0).unwrap();
        let before = ledger.snapshot();

        store.set_fail_writes(true);
        assert!(matches!(ledger.credit(&known("a"), 1), Err(EconomyError::PersistenceFailure(_))));
        assert!(matches!(
            ledger.transfer(&known("a"), &known("b"), "Blake", 2),
            Err(EconomyError::PersistenceFailure(_))
        ));
        assert!(matches!(
            ledger.get_or_create(&uid("c"), "Casey", 5),
            Err(EconomyError::PersistenceFailure(_))
        ));
        assert_eq!(ledger.snapshot(), before);

        store.set_fail_writes(false);
        assert_eq!(ledger.credit(&known("a"), 1).unwrap(), 6);
        assert_eq!(store.load().unwrap(), ledger.snapshot());
    }

    #[test]
    fn test_lookup_by_name() {
        let (ledger, _) = ledger();
        ledger.get_or_create(&uid("a"), "Alex", 5).unwrap();
        ledger.set_or_create(&AccountKey::pending("Sam"), "Sam", 1).unwrap();

        let (key, account) = ledger.lookup_by_name("alex").unwrap().unwrap();
        assert_eq!(key, known("a"));
        assert_eq!(account.balance, 5);
        assert_eq!(ledger.lookup_by_name("SAM").unwrap().unwrap().0, AccountKey::pending("sam"));
        assert!(ledger.lookup_by_name("nobody").unwrap().is_none());
    }

    #[test]
    fn test_lookup_by_ambiguous_name() {
        let (ledger, _) = ledger();
        ledger.get_or_create(&uid("a"), "Alex", 5).unwrap();
        ledger.get_or_create(&uid("b"), "ALEX", 5).unwrap();
        assert_eq!(
            ledger.lookup_by_name("alex"),
            Err(EconomyError::AmbiguousPlayerName("alex".to_string()))
        );
    }

    #[test]
    fn test_state_survives_reload() {
        let (ledger, store) = ledger();
        ledger.get_or_create(&uid("a"), "Alex", 5).unwrap();
        ledger.credit_or_create(&AccountKey::pending("Sam"), "Sam", 4).unwrap();
        let expected = ledger.snapshot();
        ledger.shutdown().unwrap();

        let reopened = Ledger::init(store).unwrap();
        assert_eq!(reopened.snapshot(), expected);
    }

    #[test]
    fn test_random_ops_keep_memory_and_disk_in_step() {
        // Deterministic xorshift sequence of valid and invalid operations.
        let (ledger, store) = ledger();
        let keys = [known("a"), known("b"), AccountKey::pending("c")];
        ledger.get_or_create(&uid("a"), "A", 3).unwrap();
        ledger.get_or_create(&uid("b"), "B", 0).unwrap();

        let mut seed = 0x2545_F491_u32;
        for step in 0..2_000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let from = &keys[(seed % 3) as usize];
            let to = &keys[((seed >> 3) % 3) as usize];
            let amount = (seed >> 8) % 6;
            store.set_fail_writes(step % 97 == 0);

            let supply_before = ledger.total_supply();
            let result = match (seed >> 5) % 5 {
                0 => ledger.credit(from, amount).map(|_| ()),
                1 => ledger.debit(from, amount).map(|_| ()),
                2 => ledger.transfer(from, to, "C", amount).map(|_| ()),
                3 => ledger.set_or_create(from, "C", amount).map(|_| ()),
                _ => ledger.reset(from),
            };
            if result.is_err() {
                assert_eq!(ledger.total_supply(), supply_before);
            }
        }

        store.set_fail_writes(false);
        ledger.flush().unwrap();
        assert_eq!(store.load().unwrap(), ledger.snapshot());
    }
}

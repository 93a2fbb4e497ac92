//! # Transactions
//!
//! Each command runs to completion or fails without side effects on the
//! ledger:
//!
//! ```text
//! validate ──► resource side (scan, debit) ──► ledger ──► mirrors ──► reply
//! ```
//!
//! Validation failures are returned before anything is touched. Once
//! materials have been removed, a failed ledger write is reported as a
//! failure and logged at `error!` with the amount taken.
//!
//! ## Target resolution
//!
//! `transfer`, `settokens` and `give` find the other party in this order:
//!
//! 1. Online roster
//! 2. Existing ledger account with that name
//! 3. Host identity registry (joined before, offline now)
//! 4. New pending account keyed by the lowercased name

use std::fmt;

use crate::account::{names_match, validate_name, AccountKey, PlayerUid, Tokens};
use crate::config::{EconomyConfig, Exchange};
use crate::error::{EconomyError, EconomyResult};
use crate::host::GameHost;
use crate::ledger::Ledger;
use crate::lifecycle::Lifecycle;
use crate::notice::Notice;
use crate::resources::{debit, scan};

/// What a caller is allowed to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Privilege {
    /// Regular player commands.
    Player,
    /// Also `settokens`, `give` and `reset`.
    Admin,
}

/// The player running a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    /// Identity.
    pub uid: PlayerUid,
    /// Display name.
    pub name: String,
    /// Granted privilege.
    pub privilege: Privilege,
}

impl Caller {
    /// A regular player.
    #[must_use]
    pub fn player(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: PlayerUid::new(uid),
            name: name.into(),
            privilege: Privilege::Player,
        }
    }

    /// An admin.
    #[must_use]
    pub fn admin(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            privilege: Privilege::Admin,
            ..Self::player(uid, name)
        }
    }

    fn key(&self) -> AccountKey {
        AccountKey::known(&self.uid)
    }
}

/// Message returned to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandReply {
    /// Whether the command did what was asked.
    pub success: bool,
    /// Text for the caller.
    pub message: String,
}

impl CommandReply {
    /// A successful reply.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// A failed reply describing `err`.
    #[must_use]
    pub fn failed(err: &EconomyError) -> Self {
        let message = if err.is_internal() {
            format!("The command could not be completed, please tell an admin: {err}")
        } else {
            err.to_string()
        };
        Self {
            success: false,
            message,
        }
    }
}

impl fmt::Display for CommandReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Where a resolved target currently is.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Presence {
    Online(PlayerUid),
    Offline,
    NeverJoined,
}

#[derive(Clone, Debug)]
struct Target {
    key: AccountKey,
    name: String,
    presence: Presence,
}

/// Reply suffix for an admin change to a player who is not online.
const fn applies_when(presence: &Presence) -> &'static str {
    match presence {
        Presence::Online(_) => "",
        Presence::Offline => " It will apply when they join.",
        Presence::NeverJoined => " They have not joined yet; it will apply on first login.",
    }
}

/// Checks a user-supplied amount is a positive token count.
fn positive(quantity: i64) -> EconomyResult<Tokens> {
    if quantity <= 0 {
        return Err(EconomyError::InvalidArgument("quantity must be positive".to_string()));
    }
    Tokens::try_from(quantity)
        .map_err(|_| EconomyError::InvalidArgument(format!("quantity {quantity} is too large")))
}

/// Checks a user-supplied amount is a valid balance.
fn non_negative(quantity: i64) -> EconomyResult<Tokens> {
    if quantity < 0 {
        return Err(EconomyError::InvalidArgument("quantity must not be negative".to_string()));
    }
    Tokens::try_from(quantity)
        .map_err(|_| EconomyError::InvalidArgument(format!("quantity {quantity} is too large")))
}

/// One command's view of the economy and the host.
pub struct Transactions<'a> {
    config: &'a EconomyConfig,
    ledger: &'a Ledger,
    lifecycle: &'a mut Lifecycle,
    host: &'a mut dyn GameHost,
}

impl<'a> Transactions<'a> {
    /// Borrows everything a command needs.
    pub fn new(
        config: &'a EconomyConfig,
        ledger: &'a Ledger,
        lifecycle: &'a mut Lifecycle,
        host: &'a mut dyn GameHost,
    ) -> Self {
        Self {
            config,
            ledger,
            lifecycle,
            host,
        }
    }

    fn require_session(&self, caller: &Caller) -> EconomyResult<()> {
        if self.lifecycle.session(&caller.uid).is_none() {
            return Err(EconomyError::NoActiveSession(caller.name.clone()));
        }
        Ok(())
    }

    /// Units of `item` the caller holds. A player without an inventory holds
    /// nothing.
    fn held(&mut self, uid: &PlayerUid, item: &str) -> u32 {
        match self.host.inventory(uid) {
            Some(inventory) => scan(inventory, item),
            None => {
                tracing::warn!(%uid, "no inventory for player");
                0
            }
        }
    }

    /// Mirrors a new balance for `uid`, telling a dead player they can
    /// respawn again.
    fn sync_and_unlock(&mut self, uid: &PlayerUid, balance: Tokens) {
        if self.lifecycle.sync_balance(&mut *self.host, uid, balance) {
            self.host.notify(uid, &Notice::CanRespawnNow);
        }
    }

    /// `econ buy` / `econ trade`.
    ///
    /// # Errors
    ///
    /// `NoActiveSession`, `InvalidArgument`, `InsufficientResource`,
    /// `ArithmeticOverflow`, `ResourceShortfall` or `PersistenceFailure`.
    pub fn buy(&mut self, caller: &Caller, exchange: Exchange, quantity: i64) -> EconomyResult<CommandReply> {
        self.require_session(caller)?;
        let tokens = positive(quantity)?;
        self.exchange(caller, exchange, tokens)
    }

    /// `econ buyall` / `econ tradeall`.
    ///
    /// # Errors
    ///
    /// `NoActiveSession`, `NothingToBuy`, or any error of `buy`.
    pub fn buy_all(&mut self, caller: &Caller, exchange: Exchange) -> EconomyResult<CommandReply> {
        self.require_session(caller)?;
        let config = self.config;
        let rate = config.rate(exchange);
        let available = self.held(&caller.uid, &rate.item);
        let tokens = rate.affordable(available);
        if tokens == 0 {
            return Err(EconomyError::NothingToBuy {
                item: rate.item.clone(),
                cost: rate.cost,
                available,
            });
        }
        self.exchange(caller, exchange, tokens)
    }

    fn exchange(&mut self, caller: &Caller, exchange: Exchange, tokens: Tokens) -> EconomyResult<CommandReply> {
        let config = self.config;
        let rate = config.rate(exchange);
        let required = rate.price_of(tokens)?;
        let key = caller.key();
        let balance = self
            .ledger
            .balance(&key)
            .ok_or_else(|| EconomyError::PlayerNotFound(caller.name.clone()))?;
        balance.checked_add(tokens).ok_or(EconomyError::ArithmeticOverflow)?;

        let Some(inventory) = self.host.inventory(&caller.uid) else {
            return Err(EconomyError::InsufficientResource {
                item: rate.item.clone(),
                required,
                available: 0,
            });
        };
        let available = scan(inventory, &rate.item);
        if available < required {
            return Err(EconomyError::InsufficientResource {
                item: rate.item.clone(),
                required,
                available,
            });
        }

        let report = debit(inventory, &rate.item, required);
        if !report.is_complete(required) {
            return Err(EconomyError::ResourceShortfall {
                item: rate.item.clone(),
                required,
                removed: report.removed,
            });
        }

        let balance = self.ledger.credit(&key, tokens).map_err(|err| {
            tracing::error!(
                item = %rate.item,
                removed = report.removed,
                tokens,
                error = %err,
                "materials removed but tokens not credited"
            );
            err
        })?;
        self.sync_and_unlock(&caller.uid, balance);

        tracing::info!(item = %rate.item, spent = required, tokens, balance, "tokens bought");
        Ok(CommandReply::ok(format!(
            "Bought {tokens} respawn token(s) for {required} {}. You now have {balance}.",
            rate.item
        )))
    }

    /// Finds the account a name refers to. `create` decides whether a never
    /// seen name becomes a pending account or `PlayerNotFound`.
    fn resolve(&self, name: &str, create: bool) -> EconomyResult<Target> {
        if let Some(player) = self.host.online_player(name) {
            return Ok(Target {
                key: AccountKey::known(&player.uid),
                name: player.name,
                presence: Presence::Online(player.uid),
            });
        }
        if let Some((key, account)) = self.ledger.lookup_by_name(name)? {
            let presence = if key.is_pending() {
                Presence::NeverJoined
            } else {
                Presence::Offline
            };
            return Ok(Target {
                key,
                name: account.display_name,
                presence,
            });
        }
        if let Some(player) = self.host.known_player(name) {
            return Ok(Target {
                key: AccountKey::known(&player.uid),
                name: player.name,
                presence: Presence::Offline,
            });
        }
        if !create {
            return Err(EconomyError::PlayerNotFound(name.to_string()));
        }
        Ok(Target {
            key: AccountKey::pending(name),
            name: name.to_string(),
            presence: Presence::NeverJoined,
        })
    }

    /// `econ transfer`.
    ///
    /// # Errors
    ///
    /// `NoActiveSession`, `InvalidArgument`, `SelfTransferRejected`,
    /// `InsufficientBalance`, `AmbiguousPlayerName`, `ArithmeticOverflow` or
    /// `PersistenceFailure`.
    pub fn transfer(&mut self, caller: &Caller, target: &str, quantity: i64) -> EconomyResult<CommandReply> {
        self.require_session(caller)?;
        let amount = positive(quantity)?;
        let target_name = validate_name(target)?;
        if names_match(&caller.name, target_name) {
            return Err(EconomyError::SelfTransferRejected);
        }
        let key = caller.key();
        let available = self.ledger.balance(&key).unwrap_or(0);
        if available < amount {
            return Err(EconomyError::InsufficientBalance {
                required: amount,
                available,
            });
        }

        let target = self.resolve(target_name, true)?;
        let receipt = self.ledger.transfer(&key, &target.key, &target.name, amount)?;
        self.lifecycle.sync_balance(&mut *self.host, &caller.uid, receipt.from_balance);
        tracing::info!(to = %target.key, amount, created = receipt.created_recipient, "tokens transferred");

        let message = match &target.presence {
            Presence::Online(uid) => {
                self.host.notify(
                    uid,
                    &Notice::TransferReceived {
                        from: caller.name.clone(),
                        amount,
                        balance: receipt.to_balance,
                    },
                );
                self.sync_and_unlock(uid, receipt.to_balance);
                format!(
                    "Sent {amount} respawn token(s) to {}. You now have {}.",
                    target.name, receipt.from_balance
                )
            }
            Presence::Offline => format!(
                "Sent {amount} respawn token(s) to {} (offline). You now have {}.",
                target.name, receipt.from_balance
            ),
            Presence::NeverJoined => format!(
                "Sent {amount} respawn token(s) to {}, who has not joined yet and will receive them on first login. You now have {}.",
                target.name, receipt.from_balance
            ),
        };
        Ok(CommandReply::ok(message))
    }

    /// `econ balance`.
    ///
    /// # Errors
    ///
    /// `NoActiveSession`.
    pub fn balance(&self, caller: &Caller) -> EconomyResult<CommandReply> {
        let balance = match self.lifecycle.mirror(&caller.uid) {
            Some(mirror) => mirror.balance,
            None => {
                self.require_session(caller)?;
                self.ledger.balance(&caller.key()).unwrap_or(0)
            }
        };
        let hint = if balance == 0 { " You need 1 to respawn." } else { "" };
        Ok(CommandReply::ok(format!("You have {balance} respawn token(s).{hint}")))
    }

    /// `econ cost`. Works without a session.
    #[must_use]
    pub fn cost(&self) -> CommandReply {
        let buy = &self.config.buy;
        let trade = &self.config.trade;
        CommandReply::ok(format!(
            "One respawn token costs {} {} (econ buy) or {} {} (econ trade).",
            buy.cost, buy.item, trade.cost, trade.item
        ))
    }

    /// Admin `econ settokens`.
    ///
    /// # Errors
    ///
    /// `NoActiveSession`, `InvalidArgument`,
    /// `AmbiguousPlayerName` or `PersistenceFailure`.
    pub fn admin_set(&mut self, caller: &Caller, target: &str, quantity: i64) -> EconomyResult<CommandReply> {
        self.require_session(caller)?;
        let amount = non_negative(quantity)?;
        let target = self.resolve(validate_name(target)?, true)?;

        let created = self.ledger.set_or_create(&target.key, &target.name, amount)?;
        if let Presence::Online(uid) = &target.presence {
            self.host.notify(uid, &Notice::AdminSet { balance: amount });
            self.sync_and_unlock(uid, amount);
        }
        tracing::info!(admin = %caller.name, target = %target.key, amount, created, "balance set");
        Ok(CommandReply::ok(format!(
            "Set {}'s respawn tokens to {amount}.{}",
            target.name,
            applies_when(&target.presence)
        )))
    }

    /// Admin `econ give`.
    ///
    /// # Errors
    ///
    /// `NoActiveSession`, `InvalidArgument`,
    /// `AmbiguousPlayerName`, `ArithmeticOverflow` or `PersistenceFailure`.
    pub fn admin_give(&mut self, caller: &Caller, target: &str, quantity: i64) -> EconomyResult<CommandReply> {
        self.require_session(caller)?;
        let amount = positive(quantity)?;
        let target = self.resolve(validate_name(target)?, true)?;

        let (balance, created) = self.ledger.credit_or_create(&target.key, &target.name, amount)?;
        if let Presence::Online(uid) = &target.presence {
            self.host.notify(uid, &Notice::AdminGave { amount, balance });
            self.sync_and_unlock(uid, balance);
        }
        tracing::info!(admin = %caller.name, target = %target.key, amount, balance, created, "tokens given");
        Ok(CommandReply::ok(format!(
            "Gave {amount} respawn token(s) to {}. They now have {balance}.{}",
            target.name,
            applies_when(&target.presence)
        )))
    }

    /// Admin `econ reset`.
    ///
    /// # Errors
    ///
    /// `NoActiveSession`, `InvalidArgument`,
    /// `PlayerNotFound` for a name nobody has used, `AmbiguousPlayerName` or
    /// `PersistenceFailure`.
    pub fn admin_reset(&mut self, caller: &Caller, target: &str) -> EconomyResult<CommandReply> {
        self.require_session(caller)?;
        let target = self.resolve(validate_name(target)?, false)?;

        self.ledger.set_or_create(&target.key, &target.name, 0)?;
        if let Presence::Online(uid) = &target.presence {
            self.lifecycle.sync_balance(&mut *self.host, uid, 0);
            self.host.notify(uid, &Notice::AdminReset);
        }
        tracing::info!(admin = %caller.name, target = %target.key, "balance reset");
        Ok(CommandReply::ok(format!(
            "Reset {}'s respawn tokens to 0.{}",
            target.name,
            applies_when(&target.presence)
        )))
    }
}

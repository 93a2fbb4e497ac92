//! # Respawn Economy Service
//!
//! The one object the game owns. Built at server start, fed every lifecycle
//! event and chat command, closed at server stop.

use std::path::Path;

use crate::account::PlayerUid;
use crate::command::EconCommand;
use crate::config::{EconomyConfig, Exchange};
use crate::error::{EconomyError, EconomyResult};
use crate::host::{GameHost, PlayerRef};
use crate::ledger::Ledger;
use crate::lifecycle::{Lifecycle, RespawnOutcome};
use crate::mirror::RuntimeMirror;
use crate::store::{AccountStore, JsonFileStore};
use crate::transactions::{Caller, CommandReply, Privilege, Transactions};

/// Ledger, config and sessions behind one handle.
///
/// ## Usage
///
/// ```rust,ignore
/// // On server startup
/// let mut economy = RespawnEconomy::open("config/economy.toml", "moddata/tokens.json")?;
///
/// // Engine events
/// economy.on_player_login(&mut host, &player)?;
/// economy.on_player_death(&mut host, &player.uid)?;
/// let outcome = economy.on_player_respawn(&mut host, &player.uid)?;
///
/// // Chat
/// let reply = economy.handle_line(&mut host, &caller, "/econ buy 2");
///
/// // On server stop
/// economy.shutdown()?;
/// ```
pub struct RespawnEconomy {
    config: EconomyConfig,
    ledger: Ledger,
    lifecycle: Lifecycle,
}

impl RespawnEconomy {
    /// Starts the economy with an explicit config and store.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the config fails validation, `InvalidStore` if the
    /// stored ledger cannot be loaded.
    pub fn init(config: EconomyConfig, store: impl AccountStore + 'static) -> EconomyResult<Self> {
        config.validate()?;
        let ledger = Ledger::init(store)?;
        tracing::info!(
            accounts = ledger.len(),
            starting_balance = config.starting_balance,
            "respawn economy started"
        );
        Ok(Self {
            config,
            ledger,
            lifecycle: Lifecycle::new(),
        })
    }

    /// Starts the economy from files, writing a default config if none exists.
    ///
    /// # Arguments
    ///
    /// * `config_path` - TOML config file
    /// * `ledger_path` - JSON ledger file
    ///
    /// # Errors
    ///
    /// See `EconomyConfig::load_or_init` and `init`.
    pub fn open(config_path: impl AsRef<Path>, ledger_path: impl AsRef<Path>) -> EconomyResult<Self> {
        let config = EconomyConfig::load_or_init(config_path)?;
        Self::init(config, JsonFileStore::new(ledger_path))
    }

    /// Flushes every open session and the ledger.
    ///
    /// # Errors
    ///
    /// Returns the first persistence failure; the ledger is still flushed.
    pub fn shutdown(mut self) -> EconomyResult<()> {
        let sessions = self.lifecycle.close_all(&self.ledger);
        self.ledger.shutdown()?;
        sessions
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// The ledger, for read access.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Session table.
    #[must_use]
    pub const fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    // ========================================================================
    // Engine events
    // ========================================================================

    /// Player joined.
    ///
    /// # Errors
    ///
    /// Returns the ledger error if the account could not be loaded.
    pub fn on_player_login(&mut self, host: &mut dyn GameHost, player: &PlayerRef) -> EconomyResult<RuntimeMirror> {
        self.lifecycle
            .on_login(&self.ledger, self.config.starting_balance, host, player)
    }

    /// Player died.
    ///
    /// # Errors
    ///
    /// `NoActiveSession` if the player never logged in.
    pub fn on_player_death(&mut self, host: &mut dyn GameHost, uid: &PlayerUid) -> EconomyResult<()> {
        self.lifecycle.on_death(host, uid)
    }

    /// Player pressed respawn.
    ///
    /// # Errors
    ///
    /// `NoActiveSession` if the player never logged in.
    pub fn on_player_respawn(&mut self, host: &mut dyn GameHost, uid: &PlayerUid) -> EconomyResult<RespawnOutcome> {
        self.lifecycle.on_respawn(&self.ledger, host, uid)
    }

    /// Player left.
    ///
    /// # Errors
    ///
    /// Returns the ledger error if the balance could not be written.
    pub fn on_player_disconnect(&mut self, uid: &PlayerUid) -> EconomyResult<()> {
        self.lifecycle.on_disconnect(&self.ledger, uid)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Runs a parsed command.
    pub fn execute(&mut self, host: &mut dyn GameHost, caller: &Caller, command: &EconCommand) -> CommandReply {
        let span = tracing::info_span!("econ", player = %caller.name, command = command.name());
        let _enter = span.enter();

        let mut tx = Transactions::new(&self.config, &self.ledger, &mut self.lifecycle, host);
        match dispatch(&mut tx, caller, command) {
            Ok(reply) => reply,
            Err(err) => {
                if err.is_internal() {
                    tracing::error!(error = %err, "command failed");
                } else {
                    tracing::debug!(error = %err, "command rejected");
                }
                CommandReply::failed(&err)
            }
        }
    }

    /// Parses and runs a chat line.
    pub fn handle_line(&mut self, host: &mut dyn GameHost, caller: &Caller, line: &str) -> CommandReply {
        match EconCommand::parse(line) {
            Ok(command) => self.execute(host, caller, &command),
            Err(err) => CommandReply::failed(&err),
        }
    }
}

fn dispatch(tx: &mut Transactions<'_>, caller: &Caller, command: &EconCommand) -> EconomyResult<CommandReply> {
    if command.requires_admin() && caller.privilege != Privilege::Admin {
        return Err(EconomyError::PermissionDenied);
    }
    match command {
        EconCommand::Buy { quantity } => tx.buy(caller, Exchange::Buy, *quantity),
        EconCommand::BuyAll => tx.buy_all(caller, Exchange::Buy),
        EconCommand::Trade { quantity } => tx.buy(caller, Exchange::Trade, *quantity),
        EconCommand::TradeAll => tx.buy_all(caller, Exchange::Trade),
        EconCommand::Transfer { target, quantity } => tx.transfer(caller, target, *quantity),
        EconCommand::Balance => tx.balance(caller),
        EconCommand::Cost => Ok(tx.cost()),
        EconCommand::SetTokens { target, quantity } => tx.admin_set(caller, target, *quantity),
        EconCommand::Give { target, quantity } => tx.admin_give(caller, target, *quantity),
        EconCommand::Reset { target } => tx.admin_reset(caller, target),
    }
}

impl std::fmt::Debug for RespawnEconomy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RespawnEconomy")
            .field("config", &self.config)
            .field("accounts", &self.ledger.len())
            .field("sessions", &self.lifecycle.len())
            .finish()
    }
}

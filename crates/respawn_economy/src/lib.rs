//! # Respawn Economy
//!
//! Respawn tokens for a survival game: players buy tokens with crafting
//! materials and spend one each time they come back from death.
//!
//! ## Design Principles
//!
//! 1. **One source of truth** - balances live in the `Ledger`; session
//!    mirrors are copies
//! 2. **Persist before success** - every ledger change is on disk before a
//!    command reports it
//! 3. **Integer tokens** - all token and material arithmetic is checked
//! 4. **Host behind traits** - the engine is reached only through `host`
//!
//! ## Flow
//!
//! ```text
//! engine events ──► Lifecycle ──► Ledger ──► RuntimeMirror ──► host entity
//! chat command ──► EconCommand ──► Transactions ──► scan / debit + Ledger
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use respawn_economy::{Caller, RespawnEconomy};
//!
//! let mut economy = RespawnEconomy::open("config/economy.toml", "moddata/tokens.json")?;
//! economy.on_player_login(&mut host, &player)?;
//! let reply = economy.handle_line(&mut host, &Caller::player(uid, name), "econ buyall");
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod account;
pub mod command;
pub mod config;
pub mod economy;
pub mod error;
pub mod host;
pub mod inventory;
pub mod ledger;
pub mod lifecycle;
pub mod mirror;
pub mod notice;
pub mod resources;
pub mod sim;
pub mod store;
pub mod transactions;

pub use account::{AccountKey, PlayerAccount, PlayerUid, Tokens};
pub use command::EconCommand;
pub use config::{EconomyConfig, Exchange, ExchangeRate};
pub use economy::RespawnEconomy;
pub use error::{EconomyError, EconomyResult};
pub use host::{GameHost, PlayerRef, SkillError};
pub use ledger::{AccountOrigin, Ledger, TransferReceipt};
pub use lifecycle::{RespawnOutcome, SessionState};
pub use mirror::RuntimeMirror;
pub use notice::Notice;
pub use store::{AccountStore, JsonFileStore, MemoryStore};
pub use transactions::{Caller, CommandReply, Privilege};

//! # Economy Configuration
//!
//! Loaded once at startup from a TOML file and immutable afterwards.
//!
//! ```toml
//! starting_balance = 5
//!
//! [buy]
//! item = "game:gear-rusty"
//! cost = 10
//!
//! [trade]
//! item = "game:gear-temporal"
//! cost = 1
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::account::Tokens;
use crate::error::{EconomyError, EconomyResult};

/// Default item exchanged by `buy`.
pub const DEFAULT_BUY_ITEM: &str = "game:gear-rusty";
/// Default item exchanged by `trade`.
pub const DEFAULT_TRADE_ITEM: &str = "game:gear-temporal";

/// Which exchange rate a purchase uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exchange {
    /// `buy` / `buyall` (resource A).
    Buy,
    /// `trade` / `tradeall` (resource B).
    Trade,
}

/// Price of one token in units of an item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Item code matched against inventory slots.
    pub item: String,
    /// Units of `item` per token. Must be at least 1.
    pub cost: u32,
}

impl ExchangeRate {
    /// Creates a rate.
    #[must_use]
    pub fn new(item: impl Into<String>, cost: u32) -> Self {
        Self {
            item: item.into(),
            cost,
        }
    }

    /// Material needed for `tokens` tokens.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ArithmeticOverflow` if the product overflows.
    pub fn price_of(&self, tokens: Tokens) -> EconomyResult<u32> {
        tokens
            .checked_mul(self.cost)
            .ok_or(EconomyError::ArithmeticOverflow)
    }

    /// Whole tokens affordable with `available` units.
    #[must_use]
    pub fn affordable(&self, available: u32) -> Tokens {
        if self.cost == 0 {
            return 0;
        }
        available / self.cost
    }
}

/// A rate table as written in the file. Either field may be left out.
#[derive(Deserialize)]
struct RateTable {
    item: Option<String>,
    cost: Option<u32>,
}

impl RateTable {
    fn or(self, fallback: ExchangeRate) -> ExchangeRate {
        ExchangeRate {
            item: self.item.unwrap_or(fallback.item),
            cost: self.cost.unwrap_or(fallback.cost),
        }
    }
}

fn default_buy() -> ExchangeRate {
    ExchangeRate::new(DEFAULT_BUY_ITEM, 10)
}

fn default_trade() -> ExchangeRate {
    ExchangeRate::new(DEFAULT_TRADE_ITEM, 1)
}

fn buy_rate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ExchangeRate, D::Error> {
    RateTable::deserialize(deserializer).map(|table| table.or(default_buy()))
}

fn trade_rate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ExchangeRate, D::Error> {
    RateTable::deserialize(deserializer).map(|table| table.or(default_trade()))
}

/// Process-wide economy settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Tokens granted on a player's first-ever login.
    pub starting_balance: Tokens,
    /// Resource A rate.
    #[serde(deserialize_with = "buy_rate")]
    pub buy: ExchangeRate,
    /// Resource B rate.
    #[serde(deserialize_with = "trade_rate")]
    pub trade: ExchangeRate,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_balance: 5,
            buy: default_buy(),
            trade: default_trade(),
        }
    }
}

impl EconomyConfig {
    /// Returns the rate for an exchange.
    #[must_use]
    pub const fn rate(&self, exchange: Exchange) -> &ExchangeRate {
        match exchange {
            Exchange::Buy => &self.buy,
            Exchange::Trade => &self.trade,
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` on parse or validation failure.
    pub fn from_toml_str(source: &str) -> EconomyResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| EconomyError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the config file, writing the defaults back if it does not exist
    /// so operators have a file to edit.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` if the file cannot be read,
    /// parsed, validated, or (when absent) created.
    pub fn load_or_init(path: impl AsRef<Path>) -> EconomyResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            let config = Self::default();
            config.store(path)?;
            tracing::info!(path = %path.display(), "wrote default economy config");
            return Ok(config);
        }

        let source = fs::read_to_string(path).map_err(|e| {
            EconomyError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!(
            path = %path.display(),
            buy_cost = config.buy.cost,
            trade_cost = config.trade.cost,
            starting_balance = config.starting_balance,
            "loaded economy config"
        );
        Ok(config)
    }

    /// Writes the config as TOML.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` on serialization or I/O failure.
    pub fn store(&self, path: impl AsRef<Path>) -> EconomyResult<()> {
        let path = path.as_ref();
        let text =
            toml::to_string_pretty(self).map_err(|e| EconomyError::InvalidConfig(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                EconomyError::InvalidConfig(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        fs::write(path, text).map_err(|e| {
            EconomyError::InvalidConfig(format!("failed to write {}: {e}", path.display()))
        })
    }

    /// Checks invariants that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` for a zero cost or an empty item code.
    pub fn validate(&self) -> EconomyResult<()> {
        for (name, rate) in [("buy", &self.buy), ("trade", &self.trade)] {
            if rate.cost == 0 {
                return Err(EconomyError::InvalidConfig(format!("{name}.cost must be at least 1")));
            }
            if rate.item.trim().is_empty() {
                return Err(EconomyError::InvalidConfig(format!("{name}.item must not be empty")));
            }
        }
        Ok(())
    }
}

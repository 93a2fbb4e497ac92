//! # Command Parser
//!
//! Turns a chat line into a typed `EconCommand`. Parsing never touches
//! state; every malformed line becomes `Usage` or `UnknownCommand`.
//!
//! ```text
//! econ buy <quantity>                  econ settokens <player> <quantity>
//! econ buyall                          econ give <player> <quantity>
//! econ trade <quantity>                econ reset <player>
//! econ tradeall
//! econ transfer <player> <quantity>
//! econ balance
//! econ cost
//! ```
//!
//! Quantities are parsed as signed integers so that `buy -3` reaches the
//! transaction layer and is rejected there as an invalid amount rather than
//! as a syntax error.

use crate::error::{EconomyError, EconomyResult};

/// Top-level command keyword.
pub const COMMAND_NAME: &str = "econ";

/// One parsed `econ` subcommand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EconCommand {
    /// Exchange resource A for `quantity` tokens.
    Buy {
        /// Tokens requested.
        quantity: i64,
    },
    /// Exchange all resource A held.
    BuyAll,
    /// Exchange resource B for `quantity` tokens.
    Trade {
        /// Tokens requested.
        quantity: i64,
    },
    /// Exchange all resource B held.
    TradeAll,
    /// Send tokens to another player.
    Transfer {
        /// Recipient name.
        target: String,
        /// Tokens to send.
        quantity: i64,
    },
    /// Show own balance.
    Balance,
    /// Show exchange rates.
    Cost,
    /// Admin: overwrite a balance.
    SetTokens {
        /// Player name.
        target: String,
        /// New balance.
        quantity: i64,
    },
    /// Admin: add tokens.
    Give {
        /// Player name.
        target: String,
        /// Tokens to add.
        quantity: i64,
    },
    /// Admin: zero a balance.
    Reset {
        /// Player name.
        target: String,
    },
}

const SUBCOMMANDS: &str = "buy|buyall|trade|tradeall|transfer|balance|cost|settokens|give|reset";

fn usage_of(subcommand: &str) -> String {
    let args = match subcommand {
        "buy" | "trade" => " <quantity>",
        "transfer" | "settokens" | "give" => " <player> <quantity>",
        "reset" => " <player>",
        _ => "",
    };
    format!("{COMMAND_NAME} {subcommand}{args}")
}

fn usage(subcommand: &str) -> EconomyError {
    EconomyError::Usage(usage_of(subcommand))
}

impl EconCommand {
    /// Parses a command line such as `/econ buy 3` or `econ balance`.
    ///
    /// # Errors
    ///
    /// `Usage` for missing, extra or malformed arguments, `UnknownCommand`
    /// for anything that is not an `econ` subcommand.
    pub fn parse(line: &str) -> EconomyResult<Self> {
        let mut words = line.split_whitespace();
        let head = words
            .next()
            .ok_or_else(|| EconomyError::Usage(format!("{COMMAND_NAME} <{SUBCOMMANDS}>")))?;
        if !head.trim_start_matches('/').eq_ignore_ascii_case(COMMAND_NAME) {
            return Err(EconomyError::UnknownCommand(head.to_string()));
        }

        let sub = words
            .next()
            .ok_or_else(|| EconomyError::Usage(format!("{COMMAND_NAME} <{SUBCOMMANDS}>")))?
            .to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let command = match (sub.as_str(), args.as_slice()) {
            ("buy", [q]) => Self::Buy { quantity: quantity(&sub, q)? },
            ("buyall", []) => Self::BuyAll,
            ("trade", [q]) => Self::Trade { quantity: quantity(&sub, q)? },
            ("tradeall", []) => Self::TradeAll,
            ("transfer", [target, q]) => Self::Transfer {
                target: (*target).to_string(),
                quantity: quantity(&sub, q)?,
            },
            ("balance", []) => Self::Balance,
            ("cost", []) => Self::Cost,
            ("settokens", [target, q]) => Self::SetTokens {
                target: (*target).to_string(),
                quantity: quantity(&sub, q)?,
            },
            ("give", [target, q]) => Self::Give {
                target: (*target).to_string(),
                quantity: quantity(&sub, q)?,
            },
            ("reset", [target]) => Self::Reset {
                target: (*target).to_string(),
            },
            ("buy" | "buyall" | "trade" | "tradeall" | "transfer" | "balance" | "cost" | "settokens"
            | "give" | "reset", _) => return Err(usage(&sub)),
            _ => return Err(EconomyError::UnknownCommand(sub)),
        };
        Ok(command)
    }

    /// Subcommand keyword.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Buy { .. } => "buy",
            Self::BuyAll => "buyall",
            Self::Trade { .. } => "trade",
            Self::TradeAll => "tradeall",
            Self::Transfer { .. } => "transfer",
            Self::Balance => "balance",
            Self::Cost => "cost",
            Self::SetTokens { .. } => "settokens",
            Self::Give { .. } => "give",
            Self::Reset { .. } => "reset",
        }
    }

    /// Whether only admins may run the command.
    #[must_use]
    pub const fn requires_admin(&self) -> bool {
        matches!(self, Self::SetTokens { .. } | Self::Give { .. } | Self::Reset { .. })
    }
}

fn quantity(sub: &str, raw: &str) -> EconomyResult<i64> {
    raw.parse().map_err(|_| usage(sub))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_subcommands() {
        let cases = [
            ("econ buy 3", EconCommand::Buy { quantity: 3 }),
            ("/econ buyall", EconCommand::BuyAll),
            ("econ trade 1", EconCommand::Trade { quantity: 1 }),
            ("ECON TradeAll", EconCommand::TradeAll),
            (
                "econ transfer Blake 2",
                EconCommand::Transfer { target: "Blake".to_string(), quantity: 2 },
            ),
            ("econ balance", EconCommand::Balance),
            ("  econ   cost  ", EconCommand::Cost),
            (
                "/econ settokens Sam 0",
                EconCommand::SetTokens { target: "Sam".to_string(), quantity: 0 },
            ),
            ("econ give Sam 4", EconCommand::Give { target: "Sam".to_string(), quantity: 4 }),
            ("econ reset Sam", EconCommand::Reset { target: "Sam".to_string() }),
        ];
        for (line, expected) in cases {
            assert_eq!(EconCommand::parse(line).unwrap(), expected, "{line}");
        }
    }

    #[test]
    fn test_negative_quantity_parses() {
        assert_eq!(EconCommand::parse("econ buy -3").unwrap(), EconCommand::Buy { quantity: -3 });
    }

    #[test]
    fn test_malformed_arguments_give_usage() {
        assert_eq!(
            EconCommand::parse("econ buy"),
            Err(EconomyError::Usage("econ buy <quantity>".to_string()))
        );
        assert_eq!(
            EconCommand::parse("econ buy lots"),
            Err(EconomyError::Usage("econ buy <quantity>".to_string()))
        );
        assert_eq!(
            EconCommand::parse("econ transfer Blake"),
            Err(EconomyError::Usage("econ transfer <player> <quantity>".to_string()))
        );
        assert_eq!(
            EconCommand::parse("econ balance now"),
            Err(EconomyError::Usage("econ balance".to_string()))
        );
        assert!(matches!(EconCommand::parse("econ"), Err(EconomyError::Usage(_))));
        assert!(matches!(EconCommand::parse(""), Err(EconomyError::Usage(_))));
    }

    #[test]
    fn test_unknown_commands() {
        assert_eq!(
            EconCommand::parse("econ steal 5"),
            Err(EconomyError::UnknownCommand("steal".to_string()))
        );
        assert_eq!(
            EconCommand::parse("/home"),
            Err(EconomyError::UnknownCommand("/home".to_string()))
        );
    }

    #[test]
    fn test_admin_flags() {
        assert!(EconCommand::Reset { target: "x".to_string() }.requires_admin());
        assert!(!EconCommand::Balance.requires_admin());
    }
}

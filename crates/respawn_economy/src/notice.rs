//! # Player Notices
//!
//! Messages pushed to a player outside a command reply (death, respawn,
//! incoming transfers, admin changes). The host decides how to show them.

use std::fmt;

use crate::account::Tokens;

/// A message for one player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// Respawn refused for lack of tokens.
    RespawnDenied {
        /// Tokens needed to respawn.
        required: Tokens,
        /// Tokens held.
        balance: Tokens,
    },
    /// A token was spent on a respawn.
    RespawnGranted {
        /// Tokens spent.
        spent: Tokens,
        /// Tokens left.
        remaining: Tokens,
    },
    /// A dead player now holds enough tokens to respawn.
    CanRespawnNow,
    /// Skills were wiped because the player ran out of tokens.
    SkillsReset,
    /// The skill system is not installed; nothing was wiped.
    SkillsUnavailable,
    /// Another player sent tokens.
    TransferReceived {
        /// Sender's display name.
        from: String,
        /// Tokens received.
        amount: Tokens,
        /// New balance.
        balance: Tokens,
    },
    /// An admin set the balance.
    AdminSet {
        /// New balance.
        balance: Tokens,
    },
    /// An admin gave tokens.
    AdminGave {
        /// Tokens given.
        amount: Tokens,
        /// New balance.
        balance: Tokens,
    },
    /// An admin reset the balance to zero.
    AdminReset,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RespawnDenied { required, balance } => write!(
                f,
                "You need {required} respawn token(s) to respawn but have {balance}."
            ),
            Self::RespawnGranted { spent, remaining } => write!(
                f,
                "Used {spent} respawn token(s). {remaining} remaining."
            ),
            Self::CanRespawnNow => {
                f.write_str("You now have enough tokens to respawn! Click the respawn button.")
            }
            Self::SkillsReset => f.write_str("You ran out of respawn tokens! All skills have been reset."),
            Self::SkillsUnavailable => f.write_str("Skill system not detected. Skills cannot be reset."),
            Self::TransferReceived { from, amount, balance } => write!(
                f,
                "{from} sent you {amount} respawn token(s). You now have {balance}."
            ),
            Self::AdminSet { balance } if *balance >= 1 => write!(
                f,
                "An admin set your respawn tokens to {balance}."
            ),
            Self::AdminSet { balance } => write!(
                f,
                "An admin set your respawn tokens to {balance}. You need 1 to respawn."
            ),
            Self::AdminGave { amount, balance } => write!(
                f,
                "An admin gave you {amount} respawn token(s). You now have {balance}."
            ),
            Self::AdminReset => f.write_str("An admin has reset your tokens. You need 1 to respawn."),
        }
    }
}

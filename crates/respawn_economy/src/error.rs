//! # Economy Error Types
//!
//! All errors that can occur in the respawn economy.
//!
//! Validation errors (`InvalidArgument`, `Insufficient*`, `SelfTransferRejected`, ...)
//! are raised before any state changes. Internal faults (`ResourceShortfall`,
//! `PersistenceFailure`, `InvalidStore`) mean the command did not complete and
//! must never be reported as a success.

use thiserror::Error;

use crate::account::Tokens;

/// Errors that can occur in the economy system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomyError {
    /// A quantity or player name failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A command was missing arguments or had malformed ones.
    #[error("usage: {0}")]
    Usage(String),

    /// The subcommand is not part of the command surface.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// The player does not hold enough of the exchange material.
    #[error("you need {required} {item} but only have {available}")]
    InsufficientResource {
        /// Item code of the material.
        item: String,
        /// Amount required.
        required: u32,
        /// Amount found in eligible containers.
        available: u32,
    },

    /// The account does not hold enough tokens.
    #[error("insufficient tokens: need {required}, have {available}")]
    InsufficientBalance {
        /// Tokens required.
        required: Tokens,
        /// Tokens held.
        available: Tokens,
    },

    /// A buy-all / trade-all found less than one token's worth of material.
    #[error("not enough {item} to buy a token: {cost} per token, you have {available}")]
    NothingToBuy {
        /// Item code of the material.
        item: String,
        /// Cost of one token.
        cost: u32,
        /// Amount found in eligible containers.
        available: u32,
    },

    /// Sender and recipient are the same player.
    #[error("you cannot transfer tokens to yourself")]
    SelfTransferRejected,

    /// No account or known player matches the name.
    #[error("player '{0}' not found")]
    PlayerNotFound(String),

    /// More than one account carries the same display name.
    #[error("more than one account is named '{0}'")]
    AmbiguousPlayerName(String),

    /// The caller lacks the privilege the command requires.
    #[error("you do not have permission to use this command")]
    PermissionDenied,

    /// The player has no live session (not logged in).
    #[error("no active session for player {0}")]
    NoActiveSession(String),

    /// Fewer resources were removed than the scan promised.
    #[error("removed only {removed} of {required} {item} from inventory")]
    ResourceShortfall {
        /// Item code of the material.
        item: String,
        /// Amount that should have been removed.
        required: u32,
        /// Amount actually removed.
        removed: u32,
    },

    /// A token or resource calculation overflowed.
    #[error("arithmetic overflow in economic calculation")]
    ArithmeticOverflow,

    /// The ledger could not be written to durable storage.
    #[error("failed to persist ledger: {0}")]
    PersistenceFailure(String),

    /// The ledger file exists but cannot be read.
    #[error("invalid ledger store: {0}")]
    InvalidStore(String),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EconomyError {
    /// Returns true for faults that indicate broken internal state rather
    /// than a user mistake.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::ResourceShortfall { .. } | Self::PersistenceFailure(_) | Self::InvalidStore(_)
        )
    }
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;

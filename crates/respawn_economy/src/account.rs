//! # Accounts
//!
//! Identity and balance of a single ledger entry.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, EconomyResult};

/// Token count. Unsigned, so a balance can never be negative.
pub type Tokens = u32;

/// Longest player name accepted from commands.
pub const MAX_NAME_LEN: usize = 64;

/// Stable player identifier assigned by the host's identity system.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerUid(String);

impl PlayerUid {
    /// Wraps a host-assigned identifier.
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of a ledger entry.
///
/// `Pending` entries are created for names that have never logged in and
/// are re-keyed to `Known` on that player's first login.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKey {
    /// A player whose identity is known.
    Known(PlayerUid),
    /// A placeholder keyed by the lowercased player name.
    Pending(String),
}

impl AccountKey {
    /// Key for a known player.
    #[must_use]
    pub fn known(uid: &PlayerUid) -> Self {
        Self::Known(uid.clone())
    }

    /// Placeholder key for a never-seen name.
    #[must_use]
    pub fn pending(name: &str) -> Self {
        Self::Pending(normalize_name(name))
    }

    /// Returns true for placeholder entries.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(uid) => write!(f, "{uid}"),
            Self::Pending(name) => write!(f, "pending:{name}"),
        }
    }
}

/// One player's economic state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAccount {
    /// Last-known display name, refreshed on every login.
    pub display_name: String,
    /// Token balance.
    pub balance: Tokens,
}

impl PlayerAccount {
    /// Creates an account.
    #[must_use]
    pub fn new(display_name: impl Into<String>, balance: Tokens) -> Self {
        Self {
            display_name: display_name.into(),
            balance,
        }
    }

    /// Case-insensitive display name comparison.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        names_match(&self.display_name, name)
    }
}

/// Lowercases a name for pending keys and comparisons.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Case-insensitive name equality.
#[must_use]
pub fn names_match(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}

/// Validates a player name taken from a command argument.
///
/// # Errors
///
/// Returns `EconomyError::InvalidArgument` for empty, overlong, or names
/// containing whitespace or control characters.
pub fn validate_name(name: &str) -> EconomyResult<&str> {
    if name.is_empty() {
        return Err(EconomyError::InvalidArgument("player name is empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(EconomyError::InvalidArgument(format!(
            "player name longer than {MAX_NAME_LEN} characters"
        )));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(EconomyError::InvalidArgument(format!(
            "player name '{}' contains whitespace or control characters",
            name.escape_debug()
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_key_is_lowercased() {
        assert_eq!(AccountKey::pending("Steve"), AccountKey::Pending("steve".to_string()));
        assert!(AccountKey::pending("Steve").is_pending());
        assert!(!AccountKey::known(&PlayerUid::new("u1")).is_pending());
    }

    #[test]
    fn test_pending_and_known_never_collide() {
        // A uid that happens to look like a lowercased name stays distinct.
        let known = AccountKey::known(&PlayerUid::new("steve"));
        let pending = AccountKey::pending("steve");
        assert_ne!(known, pending);
    }

    #[test]
    fn test_names_match_ignores_case() {
        let account = PlayerAccount::new("Alex", 3);
        assert!(account.is_named("alex"));
        assert!(account.is_named("ALEX"));
        assert!(!account.is_named("alexa"));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Alex_01").is_ok());
        assert!(matches!(validate_name(""), Err(EconomyError::InvalidArgument(_))));
        assert!(matches!(validate_name("a b"), Err(EconomyError::InvalidArgument(_))));
        assert!(matches!(validate_name("bad\u{7}"), Err(EconomyError::InvalidArgument(_))));
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(validate_name(&long), Err(EconomyError::InvalidArgument(_))));
    }

    #[test]
    fn test_key_serializes_as_tagged_variant() {
        let json = serde_json::to_string(&AccountKey::pending("Bob")).unwrap();
        assert_eq!(json, r#"{"pending":"bob"}"#);
        let json = serde_json::to_string(&AccountKey::known(&PlayerUid::new("u-9"))).unwrap();
        assert_eq!(json, r#"{"known":"u-9"}"#);
    }
}

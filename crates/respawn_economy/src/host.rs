//! # Host Seam
//!
//! Everything the economy needs from the embedding game, split by concern:
//!
//! ```text
//! PlayerDirectory    who is online, who has ever joined
//! PlayerEntities     death state, lethal damage, mirror publishing, chat
//! InventoryProvider  per-player containers (see `inventory`)
//! SkillHost          optional third-party skill system
//! ```
//!
//! `GameHost` bundles the four and is implemented automatically. The crate
//! ships one implementation, `sim::SimHost`, for tests and the console.

use thiserror::Error;

use crate::account::{names_match, PlayerUid};
use crate::inventory::PlayerInventory;
use crate::mirror::RuntimeMirror;
use crate::notice::Notice;

/// A player identity as the host knows it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlayerRef {
    /// Stable identity.
    pub uid: PlayerUid,
    /// Current display name.
    pub name: String,
}

impl PlayerRef {
    /// Creates a player reference.
    #[must_use]
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: PlayerUid::new(uid),
            name: name.into(),
        }
    }
}

/// Session registry and identity lookup.
pub trait PlayerDirectory {
    /// Players currently connected.
    fn online_players(&self) -> Vec<PlayerRef>;

    /// Connected player with this name, ignoring case.
    fn online_player(&self, name: &str) -> Option<PlayerRef> {
        self.online_players()
            .into_iter()
            .find(|player| names_match(&player.name, name))
    }

    /// Any player who has ever joined, online or not.
    fn known_player(&self, name: &str) -> Option<PlayerRef>;
}

/// Control over live player entities.
pub trait PlayerEntities {
    /// Whether the entity is currently dead.
    fn is_dead(&self, uid: &PlayerUid) -> bool;

    /// Applies lethal damage, keeping or putting the player in the dead state.
    fn kill(&mut self, uid: &PlayerUid);

    /// Attaches the mirror to the entity so other systems can read it.
    fn publish_mirror(&mut self, uid: &PlayerUid, mirror: &RuntimeMirror);

    /// Shows a message to the player.
    fn notify(&mut self, uid: &PlayerUid, notice: &Notice);

    /// Game clock in milliseconds.
    fn elapsed_ms(&self) -> u64;
}

/// Access to player inventories.
pub trait InventoryProvider {
    /// The inventory set of a connected player.
    fn inventory(&mut self, uid: &PlayerUid) -> Option<&mut dyn PlayerInventory>;
}

/// Failure inside the skill system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkillError {
    /// The skill system has no data for the player.
    #[error("no skill data for player {0}")]
    UnknownPlayer(String),
    /// The reset call itself failed.
    #[error("skill reset failed: {0}")]
    ResetFailed(String),
}

/// Third-party skill system.
pub trait SkillSystem {
    /// Drops every skill of the player back to its first tier.
    ///
    /// # Errors
    ///
    /// Returns a `SkillError` if the reset could not be applied.
    fn reset_all_tiers(&mut self, uid: &PlayerUid) -> Result<(), SkillError>;
}

/// Optional skill system lookup.
pub trait SkillHost {
    /// The skill system, if one is installed.
    fn skills(&mut self) -> Option<&mut dyn SkillSystem>;
}

/// Everything the economy calls on the host.
pub trait GameHost: PlayerDirectory + PlayerEntities + InventoryProvider + SkillHost {}

impl<T> GameHost for T where T: PlayerDirectory + PlayerEntities + InventoryProvider + SkillHost + ?Sized {}

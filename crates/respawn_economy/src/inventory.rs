//! # Inventory Seam
//!
//! The host game owns every item. This module only describes what the
//! exchange code needs to see: named containers of slots, each slot holding
//! an item code and a quantity, plus a take operation.
//!
//! Containers may be nested: a backpack is an item sitting in a slot of the
//! character inventory, and its contents form a container of their own. The
//! engine persists the bag through the backpack item's attribute blob, so
//! after changing a nested container the blob has to be rewritten
//! (`PlayerInventory::write_back_nested`).

use std::fmt;

use thiserror::Error;

/// Identifier of a container within one player's inventory set.
pub type ContainerId = String;

/// What a container is used for. Decides eligibility for the economy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerRole {
    /// Quick-access bar.
    Hotbar,
    /// Worn equipment and backpack slots.
    Character,
    /// Contents of a backpack item.
    Backpack,
    /// Creative-mode item picker.
    Creative,
    /// Items lying on the ground around the player.
    Ground,
    /// The stack held on the cursor.
    Mouse,
    /// Active crafting grid.
    CraftingGrid,
    /// A chest or trade window opened by the player.
    Remote,
    /// Any other player-owned storage.
    Other,
}

impl ContainerRole {
    /// Whether items in this container count towards the economy.
    ///
    /// Creative, ground, cursor, crafting and remote views are excluded: the
    /// player does not truly own their contents or could double-count them.
    #[must_use]
    pub const fn is_eligible(self) -> bool {
        !matches!(
            self,
            Self::Creative | Self::Ground | Self::Mouse | Self::CraftingGrid | Self::Remote
        )
    }

    /// Classifies an engine inventory id such as `"hotbar-<uid>"` or
    /// `"craftinggrid-<uid>"`. Helper for engine glue.
    #[must_use]
    pub fn from_inventory_id(id: &str) -> Self {
        let id = id.to_ascii_lowercase();
        if id.contains("creative") {
            Self::Creative
        } else if id.contains("ground") {
            Self::Ground
        } else if id.contains("mouse") {
            Self::Mouse
        } else if id.contains("crafting") {
            Self::CraftingGrid
        } else if id.contains("chest") || id.contains("trade") {
            Self::Remote
        } else if id.contains("bagslot") || id.contains("backpack") {
            Self::Backpack
        } else if id.contains("character") {
            Self::Character
        } else if id.contains("hotbar") {
            Self::Hotbar
        } else {
            Self::Other
        }
    }
}

/// Address of one slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SlotRef {
    /// Container holding the slot.
    pub container: ContainerId,
    /// Slot index within the container.
    pub slot: usize,
}

impl SlotRef {
    /// Creates a slot reference.
    #[must_use]
    pub fn new(container: impl Into<ContainerId>, slot: usize) -> Self {
        Self {
            container: container.into(),
            slot,
        }
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.container, self.slot)
    }
}

/// Description of one container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Container id.
    pub id: ContainerId,
    /// Container role.
    pub role: ContainerRole,
    /// For a bag container, the slot holding the backpack item.
    pub host_slot: Option<SlotRef>,
}

impl ContainerInfo {
    /// A top-level container.
    #[must_use]
    pub fn new(id: impl Into<ContainerId>, role: ContainerRole) -> Self {
        Self {
            id: id.into(),
            role,
            host_slot: None,
        }
    }

    /// A bag container carried by the item in `host_slot`.
    #[must_use]
    pub fn nested(id: impl Into<ContainerId>, host_slot: SlotRef) -> Self {
        Self {
            id: id.into(),
            role: ContainerRole::Backpack,
            host_slot: Some(host_slot),
        }
    }
}

/// Contents of one non-empty slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotView {
    /// Slot index within the container.
    pub index: usize,
    /// Item code, e.g. `game:gear-rusty`.
    pub item: String,
    /// Stack size.
    pub quantity: u32,
}

/// Failure reported by the host for one container.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// The container does not exist (closed or despawned).
    #[error("container '{0}' not found")]
    NotFound(ContainerId),
    /// The container could not be enumerated right now.
    #[error("container '{id}' unavailable: {reason}")]
    Unavailable {
        /// Container id.
        id: ContainerId,
        /// Host-provided reason.
        reason: String,
    },
    /// The slot index is out of range.
    #[error("slot {0} out of range")]
    BadSlot(SlotRef),
}

/// One player's set of containers, implemented by the host.
pub trait PlayerInventory {
    /// All containers, in a stable order.
    fn containers(&self) -> Vec<ContainerInfo>;

    /// Non-empty slots of a container.
    ///
    /// # Errors
    ///
    /// Returns a `ContainerError` if the container cannot be enumerated.
    fn slots(&self, container: &str) -> Result<Vec<SlotView>, ContainerError>;

    /// Removes up to `quantity` items from a slot, returning how many were
    /// actually removed.
    ///
    /// # Errors
    ///
    /// Returns a `ContainerError` if the slot cannot be modified.
    fn take(&mut self, slot: &SlotRef, quantity: u32) -> Result<u32, ContainerError>;

    /// Flags a slot as changed so the engine syncs and saves it.
    fn mark_dirty(&mut self, slot: &SlotRef);

    /// Serializes a bag container into the attribute blob of the backpack
    /// item at `host_slot` and marks that slot dirty.
    ///
    /// # Errors
    ///
    /// Returns a `ContainerError` if either container is missing.
    fn write_back_nested(&mut self, container: &str, host_slot: &SlotRef) -> Result<(), ContainerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eligibility() {
        for role in [ContainerRole::Hotbar, ContainerRole::Character, ContainerRole::Backpack, ContainerRole::Other] {
            assert!(role.is_eligible(), "{role:?}");
        }
        for role in [
            ContainerRole::Creative,
            ContainerRole::Ground,
            ContainerRole::Mouse,
            ContainerRole::CraftingGrid,
            ContainerRole::Remote,
        ] {
            assert!(!role.is_eligible(), "{role:?}");
        }
    }

    #[test]
    fn test_classify_engine_ids() {
        assert_eq!(ContainerRole::from_inventory_id("hotbar-abc"), ContainerRole::Hotbar);
        assert_eq!(ContainerRole::from_inventory_id("backpack-abc"), ContainerRole::Backpack);
        assert_eq!(ContainerRole::from_inventory_id("bagslot0"), ContainerRole::Backpack);
        assert_eq!(ContainerRole::from_inventory_id("character-abc"), ContainerRole::Character);
        assert_eq!(ContainerRole::from_inventory_id("creative-abc"), ContainerRole::Creative);
        assert_eq!(ContainerRole::from_inventory_id("ground-abc"), ContainerRole::Ground);
        assert_eq!(ContainerRole::from_inventory_id("mouse-abc"), ContainerRole::Mouse);
        assert_eq!(ContainerRole::from_inventory_id("craftinggrid-abc"), ContainerRole::CraftingGrid);
        assert_eq!(ContainerRole::from_inventory_id("chest-12/3/4"), ContainerRole::Remote);
        assert_eq!(ContainerRole::from_inventory_id("saddlebag"), ContainerRole::Other);
    }

    #[test]
    fn test_slot_ref_display() {
        assert_eq!(SlotRef::new("hotbar", 3).to_string(), "hotbar[3]");
    }
}

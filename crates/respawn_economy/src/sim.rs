//! # Simulation Host
//!
//! In-memory implementation of every host trait. Drives the unit and
//! integration tests, the benchmark and the `econ_console` harness.
//!
//! Each connected player gets a default inventory:
//!
//! ```text
//! hotbar-<uid>     10 slots   Hotbar
//! character-<uid>   2 slots   Character (slot 0 may hold a backpack item)
//! backpack-<uid>   16 slots   Backpack, nested in character-<uid>[0]
//! mouse-<uid>       1 slot    Mouse (never counted)
//! ```

use std::collections::{HashMap, HashSet};

use serde_json::{json, Map, Value};

use crate::account::{names_match, PlayerUid};
use crate::host::{
    InventoryProvider, PlayerDirectory, PlayerEntities, PlayerRef, SkillError, SkillHost,
    SkillSystem,
};
use crate::inventory::{
    ContainerError, ContainerInfo, ContainerRole, PlayerInventory, SlotRef, SlotView,
};
use crate::mirror::RuntimeMirror;
use crate::notice::Notice;

/// Item code of the backpack placed in the default character inventory.
pub const BACKPACK_ITEM: &str = "game:backpack-normal";

/// A stack of items in a simulated slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemStack {
    /// Item code.
    pub item: String,
    /// Stack size.
    pub count: u32,
    /// Serialized item attributes (bag contents for backpacks).
    pub attributes: Option<String>,
}

impl ItemStack {
    /// Creates a stack without attributes.
    #[must_use]
    pub fn new(item: impl Into<String>, count: u32) -> Self {
        Self {
            item: item.into(),
            count,
            attributes: None,
        }
    }
}

#[derive(Clone, Debug)]
struct SimContainer {
    info: ContainerInfo,
    slots: Vec<Option<ItemStack>>,
    unavailable: bool,
}

/// One player's simulated containers.
#[derive(Clone, Debug, Default)]
pub struct SimInventory {
    containers: Vec<SimContainer>,
    dirty: HashSet<SlotRef>,
    take_limit: Option<u32>,
}

impl SimInventory {
    /// Creates an inventory with no containers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The layout every `SimHost` player starts with.
    #[must_use]
    pub fn standard(uid: &PlayerUid) -> Self {
        let hotbar = format!("hotbar-{uid}");
        let character = format!("character-{uid}");
        let mut inv = Self::new();
        inv.add_container(ContainerInfo::new(hotbar, ContainerRole::Hotbar), 10);
        inv.add_container(ContainerInfo::new(character.clone(), ContainerRole::Character), 2);
        inv.add_container(
            ContainerInfo::nested(format!("backpack-{uid}"), SlotRef::new(character.clone(), 0)),
            16,
        );
        inv.add_container(ContainerInfo::new(format!("mouse-{uid}"), ContainerRole::Mouse), 1);
        inv.put(&SlotRef::new(character, 0), ItemStack::new(BACKPACK_ITEM, 1));
        inv
    }

    /// Appends a container with `slot_count` empty slots.
    pub fn add_container(&mut self, info: ContainerInfo, slot_count: usize) {
        self.containers.push(SimContainer {
            info,
            slots: vec![None; slot_count],
            unavailable: false,
        });
    }

    fn container(&self, id: &str) -> Option<&SimContainer> {
        self.containers.iter().find(|c| c.info.id == id)
    }

    fn container_mut(&mut self, id: &str) -> Option<&mut SimContainer> {
        self.containers.iter_mut().find(|c| c.info.id == id)
    }

    fn stack_at(&self, at: &SlotRef) -> Option<&ItemStack> {
        self.container(&at.container)?.slots.get(at.slot)?.as_ref()
    }

    /// Places a stack in a slot, replacing what was there.
    pub fn put(&mut self, at: &SlotRef, stack: ItemStack) {
        match self
            .container_mut(&at.container)
            .and_then(|c| c.slots.get_mut(at.slot))
        {
            Some(slot) => *slot = Some(stack),
            None => tracing::warn!(slot = %at, "sim put into missing slot ignored"),
        }
    }

    /// Stores `count` units of `item` in the first empty slot of an eligible
    /// top-level or bag container. Returns the slot used.
    pub fn insert(&mut self, item: &str, count: u32) -> Option<SlotRef> {
        let at = self
            .containers
            .iter()
            .filter(|c| c.info.role.is_eligible() && c.info.role != ContainerRole::Character)
            .find_map(|c| {
                c.slots
                    .iter()
                    .position(Option::is_none)
                    .map(|slot| SlotRef::new(c.info.id.clone(), slot))
            })?;
        self.put(&at, ItemStack::new(item, count));
        Some(at)
    }

    /// Makes a container fail enumeration and takes.
    pub fn set_unavailable(&mut self, id: &str, unavailable: bool) {
        if let Some(container) = self.container_mut(id) {
            container.unavailable = unavailable;
        }
    }

    /// Caps how many units one `take` call hands out.
    pub fn limit_take_per_call(&mut self, limit: Option<u32>) {
        self.take_limit = limit;
    }

    /// Units held in one slot.
    #[must_use]
    pub fn quantity_at(&self, at: &SlotRef) -> u32 {
        self.stack_at(at).map_or(0, |stack| stack.count)
    }

    /// Attribute blob of the item in a slot.
    #[must_use]
    pub fn attributes_at(&self, at: &SlotRef) -> Option<String> {
        self.stack_at(at)?.attributes.clone()
    }

    /// Whether a slot was marked for sync.
    #[must_use]
    pub fn is_dirty(&self, at: &SlotRef) -> bool {
        self.dirty.contains(at)
    }

    /// Units of `item` across every container, eligible or not.
    #[must_use]
    pub fn count_everywhere(&self, item: &str) -> u32 {
        self.containers
            .iter()
            .flat_map(|c| c.slots.iter().flatten())
            .filter(|stack| stack.item == item)
            .map(|stack| stack.count)
            .sum()
    }

    fn open(&self, id: &str) -> Result<&SimContainer, ContainerError> {
        let container = self
            .container(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        if container.unavailable {
            return Err(ContainerError::Unavailable {
                id: id.to_string(),
                reason: "simulated outage".to_string(),
            });
        }
        Ok(container)
    }
}

impl PlayerInventory for SimInventory {
    fn containers(&self) -> Vec<ContainerInfo> {
        self.containers.iter().map(|c| c.info.clone()).collect()
    }

    fn slots(&self, container: &str) -> Result<Vec<SlotView>, ContainerError> {
        let container = self.open(container)?;
        Ok(container
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.as_ref().map(|stack| SlotView {
                    index,
                    item: stack.item.clone(),
                    quantity: stack.count,
                })
            })
            .collect())
    }

    fn take(&mut self, at: &SlotRef, quantity: u32) -> Result<u32, ContainerError> {
        self.open(&at.container)?;
        let limit = self.take_limit.unwrap_or(u32::MAX);
        let slot = self
            .container_mut(&at.container)
            .and_then(|c| c.slots.get_mut(at.slot))
            .ok_or_else(|| ContainerError::BadSlot(at.clone()))?;

        let Some(stack) = slot.as_mut() else {
            return Ok(0);
        };
        let taken = quantity.min(stack.count).min(limit);
        stack.count -= taken;
        if stack.count == 0 {
            *slot = None;
        }
        Ok(taken)
    }

    fn mark_dirty(&mut self, at: &SlotRef) {
        self.dirty.insert(at.clone());
    }

    fn write_back_nested(&mut self, container: &str, host_slot: &SlotRef) -> Result<(), ContainerError> {
        let bag = self
            .container(container)
            .ok_or_else(|| ContainerError::NotFound(container.to_string()))?;
        let mut slots = Map::new();
        for (index, stack) in bag.slots.iter().enumerate() {
            if let Some(stack) = stack {
                slots.insert(index.to_string(), json!({ "item": stack.item, "count": stack.count }));
            }
        }
        let blob = json!({ "slots": Value::Object(slots) });

        let host = self
            .container_mut(&host_slot.container)
            .and_then(|c| c.slots.get_mut(host_slot.slot))
            .and_then(Option::as_mut)
            .ok_or_else(|| ContainerError::BadSlot(host_slot.clone()))?;
        host.attributes = Some(blob.to_string());
        self.mark_dirty(host_slot);
        Ok(())
    }
}

/// Skill system double that records every reset.
#[derive(Clone, Debug, Default)]
pub struct SimSkills {
    resets: Vec<PlayerUid>,
    failing: bool,
}

impl SkillSystem for SimSkills {
    fn reset_all_tiers(&mut self, uid: &PlayerUid) -> Result<(), SkillError> {
        if self.failing {
            return Err(SkillError::ResetFailed("simulated skill failure".to_string()));
        }
        self.resets.push(uid.clone());
        Ok(())
    }
}

/// In-memory game host.
#[derive(Debug)]
pub struct SimHost {
    online: Vec<PlayerRef>,
    known: Vec<PlayerRef>,
    dead: HashSet<PlayerUid>,
    kills: HashMap<PlayerUid, u32>,
    mirrors: HashMap<PlayerUid, RuntimeMirror>,
    notices: Vec<(PlayerUid, Notice)>,
    inventories: HashMap<PlayerUid, SimInventory>,
    skills: Option<SimSkills>,
    clock_ms: u64,
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHost {
    /// Creates a host with a skill system installed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            online: Vec::new(),
            known: Vec::new(),
            dead: HashSet::new(),
            kills: HashMap::new(),
            mirrors: HashMap::new(),
            notices: Vec::new(),
            inventories: HashMap::new(),
            skills: Some(SimSkills::default()),
            clock_ms: 0,
        }
    }

    /// Creates a host without a skill system.
    #[must_use]
    pub fn without_skills() -> Self {
        Self {
            skills: None,
            ..Self::new()
        }
    }

    /// Connects a player, giving first-time players the standard inventory.
    pub fn connect(&mut self, uid: &str, name: &str) -> PlayerRef {
        let player = PlayerRef::new(uid, name);
        self.online.retain(|p| p.uid != player.uid);
        self.online.push(player.clone());
        self.known.retain(|p| p.uid != player.uid);
        self.known.push(player.clone());
        self.inventories
            .entry(player.uid.clone())
            .or_insert_with(|| SimInventory::standard(&player.uid));
        player
    }

    /// Registers a player who joined in the past but is offline now.
    pub fn remember(&mut self, uid: &str, name: &str) -> PlayerRef {
        let player = PlayerRef::new(uid, name);
        self.known.retain(|p| p.uid != player.uid);
        self.known.push(player.clone());
        player
    }

    /// Removes a player from the online roster.
    pub fn disconnect(&mut self, uid: &PlayerUid) {
        self.online.retain(|p| &p.uid != uid);
        self.mirrors.remove(uid);
    }

    /// Forces the dead flag, as the engine does when health reaches zero.
    pub fn set_dead(&mut self, uid: &PlayerUid, dead: bool) {
        if dead {
            self.dead.insert(uid.clone());
        } else {
            self.dead.remove(uid);
        }
    }

    /// Advances the game clock.
    pub fn advance_clock(&mut self, ms: u64) {
        self.clock_ms = self.clock_ms.saturating_add(ms);
    }

    /// Puts `count` units of `item` into the player's inventory.
    pub fn give_items(&mut self, uid: &PlayerUid, item: &str, count: u32) -> Option<SlotRef> {
        self.inventories.get_mut(uid)?.insert(item, count)
    }

    /// Direct access to a player's simulated inventory.
    pub fn inventory_mut(&mut self, uid: &PlayerUid) -> Option<&mut SimInventory> {
        self.inventories.get_mut(uid)
    }

    /// Read access to a player's simulated inventory.
    #[must_use]
    pub fn sim_inventory(&self, uid: &PlayerUid) -> Option<&SimInventory> {
        self.inventories.get(uid)
    }

    /// Units of `item` the player holds anywhere.
    #[must_use]
    pub fn item_count(&self, uid: &PlayerUid, item: &str) -> u32 {
        self.inventories
            .get(uid)
            .map_or(0, |inv| inv.count_everywhere(item))
    }

    /// Times the player was killed by the economy.
    #[must_use]
    pub fn kills(&self, uid: &PlayerUid) -> u32 {
        self.kills.get(uid).copied().unwrap_or(0)
    }

    /// Last mirror published for the player.
    #[must_use]
    pub fn mirror(&self, uid: &PlayerUid) -> Option<RuntimeMirror> {
        self.mirrors.get(uid).copied()
    }

    /// Notices sent to the player, oldest first.
    #[must_use]
    pub fn notices(&self, uid: &PlayerUid) -> Vec<Notice> {
        self.notices
            .iter()
            .filter(|(to, _)| to == uid)
            .map(|(_, notice)| notice.clone())
            .collect()
    }

    /// Drains every notice sent so far.
    pub fn take_notices(&mut self) -> Vec<(PlayerUid, Notice)> {
        std::mem::take(&mut self.notices)
    }

    /// Players whose skills were reset, in order.
    #[must_use]
    pub fn skill_resets(&self) -> &[PlayerUid] {
        match &self.skills {
            Some(skills) => &skills.resets,
            None => &[],
        }
    }

    /// Makes the installed skill system fail every reset.
    pub fn set_skills_failing(&mut self, failing: bool) {
        if let Some(skills) = self.skills.as_mut() {
            skills.failing = failing;
        }
    }
}

impl PlayerDirectory for SimHost {
    fn online_players(&self) -> Vec<PlayerRef> {
        self.online.clone()
    }

    fn known_player(&self, name: &str) -> Option<PlayerRef> {
        self.known.iter().find(|p| names_match(&p.name, name)).cloned()
    }
}

impl PlayerEntities for SimHost {
    fn is_dead(&self, uid: &PlayerUid) -> bool {
        self.dead.contains(uid)
    }

    fn kill(&mut self, uid: &PlayerUid) {
        self.dead.insert(uid.clone());
        *self.kills.entry(uid.clone()).or_default() += 1;
    }

    fn publish_mirror(&mut self, uid: &PlayerUid, mirror: &RuntimeMirror) {
        self.mirrors.insert(uid.clone(), *mirror);
    }

    fn notify(&mut self, uid: &PlayerUid, notice: &Notice) {
        tracing::debug!(%uid, %notice, "notice");
        self.notices.push((uid.clone(), notice.clone()));
    }

    fn elapsed_ms(&self) -> u64 {
        self.clock_ms
    }
}

impl InventoryProvider for SimHost {
    fn inventory(&mut self, uid: &PlayerUid) -> Option<&mut dyn PlayerInventory> {
        self.inventories
            .get_mut(uid)
            .map(|inv| inv as &mut dyn PlayerInventory)
    }
}

impl SkillHost for SimHost {
    fn skills(&mut self) -> Option<&mut dyn SkillSystem> {
        self.skills.as_mut().map(|skills| skills as &mut dyn SkillSystem)
    }
}

//! Resource scanner.

use crate::inventory::PlayerInventory;

/// Total quantity of `item` across the eligible containers of `inventory`.
///
/// A container that fails to enumerate contributes zero and is logged; one
/// unavailable view never aborts the scan.
pub fn scan(inventory: &dyn PlayerInventory, item: &str) -> u32 {
    let mut total = 0u32;

    for container in inventory.containers() {
        if !container.role.is_eligible() {
            continue;
        }

        match inventory.slots(&container.id) {
            Ok(slots) => {
                let held = slots
                    .iter()
                    .filter(|slot| slot.item == item)
                    .fold(0u32, |acc, slot| acc.saturating_add(slot.quantity));
                total = total.saturating_add(held);
            }
            Err(err) => {
                tracing::warn!(container = %container.id, error = %err, "skipping container during scan");
            }
        }
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{ContainerInfo, ContainerRole, SlotRef};
    use crate::sim::{ItemStack, SimInventory};

    const GEAR: &str = "game:gear-rusty";

    #[test]
    fn test_sums_across_containers() {
        let mut inv = SimInventory::new();
        inv.add_container(ContainerInfo::new("hotbar", ContainerRole::Hotbar), 4);
        inv.add_container(ContainerInfo::new("backpack", ContainerRole::Backpack), 4);
        inv.put(&SlotRef::new("hotbar", 0), ItemStack::new(GEAR, 7));
        inv.put(&SlotRef::new("hotbar", 2), ItemStack::new("game:stick", 30));
        inv.put(&SlotRef::new("backpack", 1), ItemStack::new(GEAR, 5));

        assert_eq!(scan(&inv, GEAR), 12);
        assert_eq!(scan(&inv, "game:stick"), 30);
        assert_eq!(scan(&inv, "game:nothing"), 0);
    }

    #[test]
    fn test_ineligible_containers_skipped() {
        let mut inv = SimInventory::new();
        inv.add_container(ContainerInfo::new("hotbar", ContainerRole::Hotbar), 2);
        for (id, role) in [
            ("creative", ContainerRole::Creative),
            ("ground", ContainerRole::Ground),
            ("mouse", ContainerRole::Mouse),
            ("craftinggrid", ContainerRole::CraftingGrid),
            ("chest", ContainerRole::Remote),
        ] {
            inv.add_container(ContainerInfo::new(id, role), 1);
            inv.put(&SlotRef::new(id, 0), ItemStack::new(GEAR, 64));
        }
        inv.put(&SlotRef::new("hotbar", 1), ItemStack::new(GEAR, 3));

        assert_eq!(scan(&inv, GEAR), 3);
    }

    #[test]
    fn test_failing_container_contributes_zero() {
        let mut inv = SimInventory::new();
        inv.add_container(ContainerInfo::new("hotbar", ContainerRole::Hotbar), 2);
        inv.add_container(ContainerInfo::new("broken", ContainerRole::Other), 2);
        inv.put(&SlotRef::new("hotbar", 0), ItemStack::new(GEAR, 4));
        inv.put(&SlotRef::new("broken", 0), ItemStack::new(GEAR, 40));
        inv.set_unavailable("broken", true);

        assert_eq!(scan(&inv, GEAR), 4);
    }
}

//! Resource debiter.

use crate::inventory::{ContainerId, PlayerInventory, SlotRef};

/// What a debit actually did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DebitReport {
    /// Units removed. Equals the requested amount unless the inventory
    /// changed since the scan.
    pub removed: u32,
    /// Slots that lost items, in removal order.
    pub touched: Vec<SlotRef>,
    /// Bag containers whose state was written back into their backpack item.
    pub rewritten_bags: Vec<ContainerId>,
}

impl DebitReport {
    /// Whether the full amount was removed.
    #[must_use]
    pub const fn is_complete(&self, required: u32) -> bool {
        self.removed >= required
    }
}

/// Removes up to `required` units of `item` from the eligible containers of
/// `inventory`, in container order and then slot order.
///
/// Callers must have scanned at least `required` units first. A short
/// removal means the inventory changed between scan and debit; it is logged
/// here and must be treated as an internal fault by the caller.
pub fn debit(inventory: &mut dyn PlayerInventory, item: &str, required: u32) -> DebitReport {
    let mut report = DebitReport::default();
    let mut remaining = required;

    for container in inventory.containers() {
        if remaining == 0 {
            break;
        }
        if !container.role.is_eligible() {
            continue;
        }

        let slots = match inventory.slots(&container.id) {
            Ok(slots) => slots,
            Err(err) => {
                tracing::warn!(container = %container.id, error = %err, "skipping container during debit");
                continue;
            }
        };

        let mut changed = false;
        for slot in slots.iter().filter(|slot| slot.item == item) {
            if remaining == 0 {
                break;
            }

            let want = remaining.min(slot.quantity);
            let at = SlotRef::new(container.id.clone(), slot.index);
            let taken = take_exact(inventory, &at, want);
            if taken > 0 {
                inventory.mark_dirty(&at);
                report.touched.push(at);
                changed = true;
            }
            remaining -= taken;
            report.removed += taken;
        }

        if changed {
            if let Some(host_slot) = &container.host_slot {
                match inventory.write_back_nested(&container.id, host_slot) {
                    Ok(()) => report.rewritten_bags.push(container.id.clone()),
                    Err(err) => {
                        tracing::error!(
                            container = %container.id,
                            host = %host_slot,
                            error = %err,
                            "failed to write bag contents back into backpack item"
                        );
                    }
                }
            }
        }
    }

    if !report.is_complete(required) {
        tracing::error!(item, required, removed = report.removed, "resource debit fell short of scan");
    }

    report
}

/// Takes `want` units from one slot, asking a second time if the first take
/// came up short. Never reports more than `want`.
fn take_exact(inventory: &mut dyn PlayerInventory, at: &SlotRef, want: u32) -> u32 {
    let mut taken = match inventory.take(at, want) {
        Ok(n) => n.min(want),
        Err(err) => {
            tracing::warn!(slot = %at, error = %err, "failed to take from slot");
            return 0;
        }
    };

    if taken > 0 && taken < want {
        match inventory.take(at, want - taken) {
            Ok(n) => taken += n.min(want - taken),
            Err(err) => tracing::warn!(slot = %at, error = %err, "retry take failed"),
        }
    }

    taken
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{ContainerInfo, ContainerRole};
    use crate::resources::scan;
    use crate::sim::{ItemStack, SimInventory};

    const GEAR: &str = "game:gear-rusty";

    fn inventory() -> SimInventory {
        let mut inv = SimInventory::new();
        inv.add_container(ContainerInfo::new("hotbar", ContainerRole::Hotbar), 4);
        inv.add_container(ContainerInfo::new("character", ContainerRole::Character), 2);
        inv.add_container(ContainerInfo::nested("bag0", SlotRef::new("character", 0)), 4);
        inv.put(&SlotRef::new("character", 0), ItemStack::new("game:backpack-normal", 1));
        inv
    }

    #[test]
    fn test_removes_in_stable_order() {
        let mut inv = inventory();
        inv.put(&SlotRef::new("hotbar", 1), ItemStack::new(GEAR, 4));
        inv.put(&SlotRef::new("hotbar", 3), ItemStack::new(GEAR, 4));
        inv.put(&SlotRef::new("bag0", 0), ItemStack::new(GEAR, 10));

        let report = debit(&mut inv, GEAR, 10);
        assert_eq!(report.removed, 10);
        assert_eq!(
            report.touched,
            vec![SlotRef::new("hotbar", 1), SlotRef::new("hotbar", 3), SlotRef::new("bag0", 0)]
        );
        assert_eq!(inv.quantity_at(&SlotRef::new("bag0", 0)), 8);
        assert_eq!(scan(&inv, GEAR), 8);
    }

    #[test]
    fn test_stops_once_satisfied() {
        let mut inv = inventory();
        inv.put(&SlotRef::new("hotbar", 0), ItemStack::new(GEAR, 12));
        inv.put(&SlotRef::new("bag0", 0), ItemStack::new(GEAR, 12));

        let report = debit(&mut inv, GEAR, 10);
        assert_eq!(report.removed, 10);
        assert_eq!(report.touched, vec![SlotRef::new("hotbar", 0)]);
        assert!(report.rewritten_bags.is_empty());
        assert_eq!(inv.quantity_at(&SlotRef::new("bag0", 0)), 12);
        assert!(inv.is_dirty(&SlotRef::new("hotbar", 0)));
    }

    #[test]
    fn test_nested_bag_written_back() {
        let mut inv = inventory();
        inv.put(&SlotRef::new("bag0", 2), ItemStack::new(GEAR, 6));

        let report = debit(&mut inv, GEAR, 5);
        assert_eq!(report.removed, 5);
        assert_eq!(report.rewritten_bags, vec!["bag0".to_string()]);

        let host = SlotRef::new("character", 0);
        assert!(inv.is_dirty(&host));
        let blob = inv.attributes_at(&host).expect("backpack attributes written");
        let contents: serde_json::Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(contents["slots"]["2"]["item"], GEAR);
        assert_eq!(contents["slots"]["2"]["count"], 1);
    }

    #[test]
    fn test_ineligible_containers_untouched() {
        let mut inv = inventory();
        inv.add_container(ContainerInfo::new("mouse", ContainerRole::Mouse), 1);
        inv.put(&SlotRef::new("mouse", 0), ItemStack::new(GEAR, 50));
        inv.put(&SlotRef::new("hotbar", 0), ItemStack::new(GEAR, 3));

        let report = debit(&mut inv, GEAR, 10);
        assert_eq!(report.removed, 3);
        assert!(!report.is_complete(10));
        assert_eq!(inv.quantity_at(&SlotRef::new("mouse", 0)), 50);
    }

    #[test]
    fn test_short_take_retried() {
        let mut inv = inventory();
        inv.put(&SlotRef::new("hotbar", 0), ItemStack::new(GEAR, 10));
        inv.limit_take_per_call(Some(6));

        let report = debit(&mut inv, GEAR, 10);
        assert_eq!(report.removed, 10);
        assert_eq!(inv.quantity_at(&SlotRef::new("hotbar", 0)), 0);
    }

    #[test]
    fn test_unavailable_container_skipped() {
        let mut inv = inventory();
        inv.put(&SlotRef::new("hotbar", 0), ItemStack::new(GEAR, 10));
        inv.put(&SlotRef::new("bag0", 0), ItemStack::new(GEAR, 10));
        inv.set_unavailable("hotbar", true);

        let report = debit(&mut inv, GEAR, 4);
        assert_eq!(report.removed, 4);
        assert_eq!(inv.quantity_at(&SlotRef::new("bag0", 0)), 6);
    }
}

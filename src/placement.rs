use crate::compare::SortContext;
use crate::config::SortRule;
use crate::container::{ContainerView, Section};
use crate::error::Result;
use crate::items::ItemStack;

/// Observations a pickup stays attributable for before the monitor gives up.
const PICKUP_PENDING_POLLS: u8 = 5;

/// Moves the stack at `source` into the first free preferred slot, falling
/// back to the first empty slot anywhere in the container. Returns `Ok(true)`
/// once the stack sits in an acceptable slot and `Ok(false)` when no slot
/// would take it.
pub fn place<C: ContainerView>(view: &mut C, source: usize, preferred: &[usize]) -> Result<bool> {
    let stack = match view.get(source)? {
        Some(stack) => stack,
        None => return Ok(false),
    };
    if preferred.contains(&source) {
        return Ok(true);
    }
    for &slot in preferred {
        // Rules may name slots this container does not have.
        if slot >= view.slot_count() {
            continue;
        }
        if view.get(slot)?.is_some() {
            continue;
        }
        if view.move_stack(source, slot)? {
            log::debug!("[Place] '{}' placed in preferred slot {}", stack.item_id, slot);
            return Ok(true);
        }
    }
    for slot in 0..view.slot_count() {
        if slot == source || view.get(slot)?.is_some() {
            continue;
        }
        if view.move_stack(source, slot)? {
            log::debug!("[Place] '{}' fell back to empty slot {}", stack.item_id, slot);
            return Ok(true);
        }
    }
    log::debug!("[Place] No slot found for '{}'", stack.item_id);
    Ok(false)
}

/// Preferred slots for a stack, best first. Every rule whose keyword matches
/// one of the stack's tree leaves contributes its slots; higher restriction
/// levels come first and declaration order breaks ties.
pub fn preferred_slots_for(ctx: &SortContext, stack: &ItemStack) -> Vec<usize> {
    let leaves = ctx.config.tree.lookup(&stack.item_id, stack.metadata, stack.tag.as_ref());
    if leaves.is_empty() {
        return Vec::new();
    }
    let mut rules: Vec<&SortRule> = ctx
        .config
        .rules
        .iter()
        .filter(|rule| {
            leaves.iter().any(|leaf| ctx.config.tree.matches_keyword(leaf, &rule.keyword))
        })
        .collect();
    rules.sort_by(|a, b| b.level.cmp(&a.level));
    rules.iter().flat_map(|rule| rule.preferred_slots.iter().copied()).collect()
}

/// Watches the hotbar for stacks appearing in previously empty slots and
/// routes them to their preferred slots. The host arms the monitor when its
/// pickup event fires; the slot diff on the next observations tells us where
/// the stack landed.
#[derive(Debug, Default)]
pub struct PickupMonitor {
    hotbar_clone: Vec<Option<ItemStack>>,
    pending: bool,
    timeout: u8,
}

impl PickupMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the monitor so the next few observations may attribute fresh
    /// hotbar stacks to a pickup.
    pub fn arm(&mut self) {
        self.pending = true;
        self.timeout = PICKUP_PENDING_POLLS;
    }

    /// Diffs the hotbar against the previous observation and returns the
    /// slots that went from empty to occupied while a pickup was pending.
    pub fn observe<C: ContainerView>(&mut self, view: &C) -> Result<Vec<usize>> {
        let range = match view.section_range(Section::Hotbar) {
            Some(range) => range,
            None => return Ok(Vec::new()),
        };
        let mut snapshot = Vec::with_capacity(range.len());
        for slot in range.clone() {
            snapshot.push(view.get(slot)?);
        }

        let mut fresh = Vec::new();
        if self.pending && self.hotbar_clone.len() == snapshot.len() {
            for (offset, (before, after)) in
                self.hotbar_clone.iter().zip(snapshot.iter()).enumerate()
            {
                if before.is_none() && after.is_some() {
                    fresh.push(range.start + offset);
                }
            }
        }
        self.hotbar_clone = snapshot;

        if !fresh.is_empty() {
            self.pending = false;
            self.timeout = 0;
        } else if self.pending {
            self.timeout = self.timeout.saturating_sub(1);
            if self.timeout == 0 {
                self.pending = false;
            }
        }
        Ok(fresh)
    }

    /// Observes the hotbar and moves every fresh pickup to its preferred
    /// slots, committing once. Returns how many stacks were routed.
    pub fn place_new_pickups<C: ContainerView>(
        &mut self,
        ctx: &SortContext,
        view: &mut C,
    ) -> Result<usize> {
        if !ctx.config.options.sort_on_pickup {
            // Keep the clone current so enabling the option later does not
            // misread old stacks as pickups.
            self.pending = false;
            self.observe(view)?;
            return Ok(0);
        }
        let fresh = self.observe(view)?;
        if fresh.is_empty() {
            return Ok(0);
        }
        let result = place_fresh(ctx, view, &fresh);
        view.apply_changes();
        match result {
            Ok(placed) => {
                // Placement may have landed inside the hotbar; re-sync the
                // clone so those slots are not flagged again.
                self.observe(view)?;
                Ok(placed)
            }
            Err(err) => {
                log::error!("[Place] Failed to move picked up stack: {}", err);
                Err(err)
            }
        }
    }
}

fn place_fresh<C: ContainerView>(
    ctx: &SortContext,
    view: &mut C,
    fresh: &[usize],
) -> Result<usize> {
    let mut placed = 0;
    for &slot in fresh {
        let stack = match view.get(slot)? {
            Some(stack) => stack,
            None => continue,
        };
        let preferred = preferred_slots_for(ctx, &stack);
        if place(view, slot, &preferred)? {
            placed += 1;
        }
    }
    Ok(placed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::container::BasicContainer;
    use crate::items::ItemCatalog;

    #[test]
    fn placement_prefers_the_first_free_preferred_slot() {
        let catalog = ItemCatalog::with_defaults();
        let mut view = BasicContainer::chest(catalog, 1);
        view.put(0, ItemStack::new("survival:bread", 10)).unwrap();
        view.put(3, ItemStack::new("survival:stone", 5)).unwrap();

        assert!(place(&mut view, 0, &[3, 5, 7]).unwrap());
        assert!(view.get(0).unwrap().is_none());
        assert_eq!(view.get(5).unwrap().unwrap().item_id, "survival:bread");
    }

    #[test]
    fn stack_already_in_a_preferred_slot_stays() {
        let catalog = ItemCatalog::with_defaults();
        let mut view = BasicContainer::chest(catalog, 1);
        view.put(5, ItemStack::new("survival:bread", 10)).unwrap();

        assert!(place(&mut view, 5, &[3, 5, 7]).unwrap());
        assert_eq!(view.get(5).unwrap().unwrap().item_id, "survival:bread");
        assert!(view.get(3).unwrap().is_none());
        assert!(view.get(7).unwrap().is_none());
    }

    #[test]
    fn fallback_takes_the_first_empty_slot() {
        let catalog = ItemCatalog::with_defaults();
        let mut view = BasicContainer::chest(catalog, 1);
        view.put(4, ItemStack::new("survival:bread", 10)).unwrap();
        for slot in [3, 5, 7] {
            view.put(slot, ItemStack::new("survival:stone", 20)).unwrap();
        }

        assert!(place(&mut view, 4, &[3, 5, 7]).unwrap());
        assert_eq!(view.get(0).unwrap().unwrap().item_id, "survival:bread");
        assert!(view.get(4).unwrap().is_none());
    }

    #[test]
    fn full_container_refuses_placement() {
        let catalog = ItemCatalog::with_defaults();
        let mut view = BasicContainer::chest(catalog, 1);
        view.put(4, ItemStack::new("survival:bread", 10)).unwrap();
        for slot in 0..9 {
            if slot != 4 {
                view.put(slot, ItemStack::new("survival:stone_pickaxe", 1)).unwrap();
            }
        }

        assert!(!place(&mut view, 4, &[0]).unwrap());
        assert_eq!(view.get(4).unwrap().unwrap().item_id, "survival:bread");
    }

    #[test]
    fn out_of_range_preferred_slots_are_skipped() {
        let catalog = ItemCatalog::with_defaults();
        let mut view = BasicContainer::chest(catalog, 1);
        view.put(2, ItemStack::new("survival:bread", 10)).unwrap();

        assert!(place(&mut view, 2, &[40, 6]).unwrap());
        assert_eq!(view.get(6).unwrap().unwrap().item_id, "survival:bread");
    }

    #[test]
    fn locked_preferred_slots_are_passed_over() {
        let catalog = ItemCatalog::with_defaults();
        let mut view = BasicContainer::chest(catalog, 1);
        view.put(0, ItemStack::new("survival:bread", 10)).unwrap();
        view.lock(3).unwrap();

        assert!(place(&mut view, 0, &[3, 5]).unwrap());
        assert!(view.get(3).unwrap().is_none());
        assert_eq!(view.get(5).unwrap().unwrap().item_id, "survival:bread");
    }

    #[test]
    fn higher_level_rules_contribute_slots_first() {
        let catalog = ItemCatalog::with_defaults();
        let mut config = Config::default();
        config.rules = vec![
            SortRule::new("equipment", vec![9], 1),
            SortRule::new("tools", vec![28], 2),
        ];
        let ctx = SortContext::new(&catalog, &config);

        let stack = ItemStack::new("survival:stone_pickaxe", 1);
        assert_eq!(preferred_slots_for(&ctx, &stack), vec![28, 9]);
    }

    #[test]
    fn unknown_kinds_have_no_preferred_slots() {
        let catalog = ItemCatalog::with_defaults();
        let config = Config::default();
        let ctx = SortContext::new(&catalog, &config);

        let stack = ItemStack::new("modded:gizmo", 1);
        assert!(preferred_slots_for(&ctx, &stack).is_empty());
    }

    #[test]
    fn pickup_lands_in_its_preferred_slot() {
        let catalog = ItemCatalog::with_defaults();
        let config = Config::default();
        let ctx = SortContext::new(&catalog, &config);
        let mut view = BasicContainer::player(catalog.clone());
        let mut monitor = PickupMonitor::new();

        monitor.observe(&view).unwrap();
        monitor.arm();
        view.put(30, ItemStack::new("survival:bread", 5)).unwrap();

        assert_eq!(monitor.place_new_pickups(&ctx, &mut view).unwrap(), 1);
        assert!(view.get(30).unwrap().is_none());
        assert_eq!(view.get(35).unwrap().unwrap().item_id, "survival:bread");
        assert_eq!(view.commit_count(), 1);
    }

    #[test]
    fn pickup_placement_respects_the_toggle() {
        let catalog = ItemCatalog::with_defaults();
        let mut disabled = Config::default();
        disabled.options.sort_on_pickup = false;
        let mut view = BasicContainer::player(catalog.clone());
        let mut monitor = PickupMonitor::new();

        monitor.observe(&view).unwrap();
        monitor.arm();
        view.put(30, ItemStack::new("survival:bread", 5)).unwrap();

        let ctx_off = SortContext::new(&catalog, &disabled);
        assert_eq!(monitor.place_new_pickups(&ctx_off, &mut view).unwrap(), 0);
        assert_eq!(view.get(30).unwrap().unwrap().item_id, "survival:bread");
        assert_eq!(view.commit_count(), 0);

        // The clone was refreshed, so enabling the option later does not
        // replay the old pickup.
        let enabled = Config::default();
        let ctx_on = SortContext::new(&catalog, &enabled);
        monitor.arm();
        assert_eq!(monitor.place_new_pickups(&ctx_on, &mut view).unwrap(), 0);
        assert_eq!(view.get(30).unwrap().unwrap().item_id, "survival:bread");
    }

    #[test]
    fn pending_pickups_expire_after_a_few_polls() {
        let catalog = ItemCatalog::with_defaults();
        let mut view = BasicContainer::player(catalog);
        let mut monitor = PickupMonitor::new();

        monitor.observe(&view).unwrap();
        monitor.arm();
        for _ in 0..PICKUP_PENDING_POLLS {
            assert!(monitor.observe(&view).unwrap().is_empty());
        }

        // Expired: a stack appearing now is no longer a pickup.
        view.put(28, ItemStack::new("survival:bread", 5)).unwrap();
        assert!(monitor.observe(&view).unwrap().is_empty());
    }
}

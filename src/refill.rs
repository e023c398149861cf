use crate::compare::{compare_stacks, CompareMode, SortContext};
use crate::container::ContainerView;
use crate::error::Result;
use crate::items::ItemStack;

/// Refills the focused slot with the best stack of the given kind found
/// elsewhere in the container. Candidates are ranked with the full
/// comparator, so the most intact, fullest replacement wins. Returns whether
/// a stack was moved.
pub fn auto_refill<C: ContainerView>(
    ctx: &SortContext,
    view: &mut C,
    focused_slot: usize,
    item_id: &str,
    metadata: u16,
) -> Result<bool> {
    let damageable = ctx.catalog.get(item_id).map_or(false, |def| def.is_damageable());

    let mut candidates: Vec<(usize, ItemStack, u32)> = Vec::new();
    for slot in 0..view.slot_count() {
        if slot == focused_slot || view.is_locked(slot) {
            continue;
        }
        if view.section_of(slot).map_or(false, |section| section.is_persistent()) {
            continue;
        }
        let stack = match view.get(slot)? {
            Some(stack) => stack,
            None => continue,
        };
        if stack.is_empty() || stack.item_id != item_id {
            continue;
        }
        // Wear metadata may differ; variant metadata must match.
        if !damageable && stack.metadata != metadata {
            continue;
        }
        let order = ctx.order_of(&stack);
        candidates.push((slot, stack, order));
    }
    candidates.sort_by(|a, b| compare_stacks(ctx, &a.1, &b.1, a.2, b.2, CompareMode::Full));

    for (slot, stack, _) in &candidates {
        if view.move_stack(*slot, focused_slot)? {
            log::info!(
                "[Refill] Moved '{}' from slot {} into focused slot {}",
                stack.item_id,
                slot,
                focused_slot
            );
            view.apply_changes();
            return Ok(true);
        }
        log::debug!("[Refill] Move from slot {} refused", slot);
    }
    log::debug!("[Refill] No replacement found for '{}'", item_id);
    Ok(false)
}

/// Tracks the focused hotbar slot between polls and refills it when its
/// stack runs out or is about to break. The first poll after a focus change
/// only observes; triggers compare against the stack remembered from the
/// previous poll of the same slot.
#[derive(Debug, Default)]
pub struct RefillMonitor {
    last_slot: Option<usize>,
    last_stack: Option<ItemStack>,
}

impl RefillMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poll<C: ContainerView>(
        &mut self,
        ctx: &SortContext,
        view: &mut C,
        focused_slot: usize,
    ) -> Result<bool> {
        let current = view.get(focused_slot)?;
        let refilled = if self.last_slot == Some(focused_slot) {
            match self.check_triggers(ctx, view, focused_slot, current.as_ref()) {
                Ok(refilled) => refilled,
                Err(err) => {
                    log::error!("[Refill] Refill of slot {} aborted: {}", focused_slot, err);
                    // Observations may be stale now; start over next poll.
                    self.last_slot = None;
                    self.last_stack = None;
                    return Err(err);
                }
            }
        } else {
            false
        };
        // Remember the slot as it stands now, re-reading after a refill so
        // the replacement becomes the next observation instead of another
        // trigger.
        self.last_slot = Some(focused_slot);
        self.last_stack = if refilled { view.get(focused_slot)? } else { current };
        Ok(refilled)
    }

    fn check_triggers<C: ContainerView>(
        &self,
        ctx: &SortContext,
        view: &mut C,
        focused_slot: usize,
        current: Option<&ItemStack>,
    ) -> Result<bool> {
        if !ctx.config.options.auto_refill {
            return Ok(false);
        }
        let stored = match &self.last_stack {
            Some(stack) if !stack.is_empty() => stack,
            _ => return Ok(false),
        };
        match current {
            Some(stack) if !stack.is_empty() => {
                if stack.item_id != stored.item_id {
                    // Consuming can leave a byproduct in the slot (an empty
                    // container, a bowl); swap it out for the real thing.
                    return auto_refill(ctx, view, focused_slot, &stored.item_id, stored.metadata);
                }
                if !ctx.config.options.refill_before_break {
                    return Ok(false);
                }
                let def = match ctx.catalog.get(&stack.item_id) {
                    Some(def) if def.is_damageable() => def,
                    _ => return Ok(false),
                };
                // Trigger exactly once, on the poll where the remaining
                // durability crosses under the threshold.
                let threshold = ctx.config.options.refill_damage_threshold;
                if stack.remaining_durability(def) < threshold
                    && stored.remaining_durability(def) >= threshold
                {
                    log::info!(
                        "[Refill] '{}' in slot {} is about to break",
                        stack.item_id,
                        focused_slot
                    );
                    return auto_refill(ctx, view, focused_slot, &stack.item_id, stack.metadata);
                }
                Ok(false)
            }
            _ => auto_refill(ctx, view, focused_slot, &stored.item_id, stored.metadata),
        }
    }
}

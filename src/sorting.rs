use serde::{Deserialize, Serialize};

use crate::compare::{compare_stacks, CompareMode, SortContext};
use crate::container::{ContainerView, Section};
use crate::error::{Result, SortError};
use crate::items::ItemStack;

// --- Strategies ---

/// How a section gets rearranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortStrategy {
    /// Ranked order, filled row-major.
    #[default]
    Default,
    /// Ranked order, filled row-major over the declared grid width.
    Horizontal,
    /// Ranked order, filled column-major over the declared grid width.
    Vertical,
    /// Merge or rebalance same-kind stacks without reordering anything.
    EvenStacks,
}

/// Repeated triggers inside this window cycle the strategy.
pub const STRATEGY_CYCLE_WINDOW_MS: u64 = 3_000;

/// Widest grid the cycled fills apply to; wider containers always sort with
/// the default strategy.
pub const STRATEGY_CYCLE_MAX_WIDTH: usize = 9;

/// Cycles Default, Horizontal, Vertical on rapid repeated triggers against
/// the same container. Timestamps come from the caller, so the engine never
/// reads a clock.
#[derive(Debug, Default)]
pub struct StrategyCycler {
    next: SortStrategy,
    last_trigger_ms: u64,
}

impl StrategyCycler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the strategy for a trigger arriving at `now_ms` against a grid
    /// `width` columns wide, and advances the cycle.
    pub fn next_strategy(&mut self, now_ms: u64, width: usize) -> SortStrategy {
        if now_ms.saturating_sub(self.last_trigger_ms) > STRATEGY_CYCLE_WINDOW_MS
            || width > STRATEGY_CYCLE_MAX_WIDTH
        {
            self.next = SortStrategy::Default;
        }
        let chosen = self.next;
        self.next = match chosen {
            SortStrategy::Default => SortStrategy::Horizontal,
            SortStrategy::Horizontal => SortStrategy::Vertical,
            SortStrategy::Vertical | SortStrategy::EvenStacks => SortStrategy::Default,
        };
        self.last_trigger_ms = now_ms;
        chosen
    }

    /// Forgets the cycle, e.g. when the container screen closes.
    pub fn reset(&mut self) {
        self.next = SortStrategy::Default;
        self.last_trigger_ms = 0;
    }
}

// --- Sorting ---

/// Sorts one section of a container: snapshot, plan, execute, then exactly
/// one commit. A fault while planning or executing abandons the rest of the
/// invocation, keeps the moves already made, and is logged once.
pub fn sort_section<C: ContainerView>(
    ctx: &SortContext,
    view: &mut C,
    section: Section,
    strategy: SortStrategy,
) -> Result<()> {
    log::info!("[Sort] {:?} sort of {:?}", strategy, section);
    let result = match strategy {
        SortStrategy::Default | SortStrategy::Horizontal | SortStrategy::Vertical => {
            rank_sort(ctx, view, section, strategy)
        }
        SortStrategy::EvenStacks => even_stacks(ctx, view, section),
    };
    view.apply_changes();
    if let Err(err) = &result {
        log::error!("[Sort] {:?} sort of {:?} aborted: {}", strategy, section, err);
    }
    result
}

/// Slots a sort may touch, in the fill order the strategy dictates. Locked
/// slots and persistent slots are excluded both as sources and destinations.
fn sort_targets<C: ContainerView>(
    view: &C,
    section: Section,
    strategy: SortStrategy,
) -> Result<Vec<usize>> {
    let range = view.section_range(section).ok_or(SortError::UnknownSection(section))?;
    let fill_order: Vec<usize> = match strategy {
        SortStrategy::Vertical => {
            let width = view.grid_width(section).max(1);
            let len = range.len();
            let rows = (len + width - 1) / width;
            let mut order = Vec::with_capacity(len);
            for column in 0..width {
                for row in 0..rows {
                    let offset = row * width + column;
                    if offset < len {
                        order.push(range.start + offset);
                    }
                }
            }
            order
        }
        _ => range.collect(),
    };
    Ok(fill_order
        .into_iter()
        .filter(|&slot| !view.is_locked(slot))
        .filter(|&slot| !view.section_of(slot).map_or(false, |s| s.is_persistent()))
        .collect())
}

fn rank_sort<C: ContainerView>(
    ctx: &SortContext,
    view: &mut C,
    section: Section,
    strategy: SortStrategy,
) -> Result<()> {
    let targets = sort_targets(view, section, strategy)?;

    // Merge partial same-kind stacks before planning. After this pass each
    // kind holds at most one partial stack, so later same-kind moves only
    // ever exchange whole values.
    let mut groups = collect_groups(view, &targets)?;
    for (exemplar, members) in &mut groups {
        let stackable = ctx.catalog.get(&exemplar.item_id).map_or(false, |def| def.is_stackable);
        if members.len() >= 2 && stackable {
            consolidate_group(ctx, view, exemplar, members)?;
        }
    }

    // Snapshot and rank. The sort is stable, so full ties keep slot order.
    let mut ranked: Vec<(ItemStack, u32)> = Vec::new();
    for &slot in &targets {
        if let Some(stack) = view.get(slot)? {
            let order = ctx.order_of(&stack);
            ranked.push((stack, order));
        }
    }
    ranked.sort_by(|a, b| compare_stacks(ctx, &a.0, &b.0, a.1, b.1, CompareMode::Full));
    log::debug!("[Sort] {} stacks over {} slots", ranked.len(), targets.len());

    // Execute: bring every target slot to its planned stack. A planned stack
    // no source can supply is abandoned; the rest of the plan continues.
    for (position, (want, _)) in ranked.iter().enumerate() {
        let target = targets[position];
        if let Some(current) = view.get(target)? {
            if current == *want {
                continue;
            }
        }
        let mut moved = false;
        for &source in &targets[position..] {
            if source == target {
                continue;
            }
            let candidate = match view.get(source)? {
                Some(stack) => stack,
                None => continue,
            };
            if candidate == *want && view.move_stack(source, target)? {
                log::debug!("[Sort] Moved slot {} -> {}", source, target);
                moved = true;
                break;
            }
        }
        if !moved {
            log::debug!("[Sort] No source could fill slot {}, leaving it", target);
        }
    }
    Ok(())
}

/// Redistributes same-kind stacks without reordering. Persistent sections
/// get their counts balanced evenly across the occupied slots, never
/// emptying one; everywhere else each kind is consolidated down to the
/// fewest slots that hold its total.
fn even_stacks<C: ContainerView>(ctx: &SortContext, view: &mut C, section: Section) -> Result<()> {
    let range = view.section_range(section).ok_or(SortError::UnknownSection(section))?;
    let slots: Vec<usize> = range.filter(|&slot| !view.is_locked(slot)).collect();

    let mut groups = collect_groups(view, &slots)?;
    for (exemplar, members) in &mut groups {
        let stackable = ctx.catalog.get(&exemplar.item_id).map_or(false, |def| def.is_stackable);
        if members.len() < 2 || !stackable {
            continue;
        }
        if section.is_persistent() {
            balance_group(view, members)?;
        } else {
            consolidate_group(ctx, view, exemplar, members)?;
        }
    }
    Ok(())
}

/// Groups the occupied slots by stack kind, in slot order. Each member keeps
/// its locally tracked count.
fn collect_groups<C: ContainerView>(
    view: &C,
    slots: &[usize],
) -> Result<Vec<(ItemStack, Vec<(usize, u32)>)>> {
    let mut groups: Vec<(ItemStack, Vec<(usize, u32)>)> = Vec::new();
    for &slot in slots {
        let stack = match view.get(slot)? {
            Some(stack) => stack,
            None => continue,
        };
        match groups.iter_mut().find(|(exemplar, _)| exemplar.same_kind(&stack)) {
            Some((_, members)) => members.push((slot, stack.quantity)),
            None => {
                let quantity = stack.quantity;
                groups.push((stack, vec![(slot, quantity)]));
            }
        }
    }
    Ok(groups)
}

/// Merges a group front-to-back so it occupies the fewest slots. Totals are
/// conserved by the move primitive's own arithmetic.
fn consolidate_group<C: ContainerView>(
    ctx: &SortContext,
    view: &mut C,
    exemplar: &ItemStack,
    members: &mut [(usize, u32)],
) -> Result<()> {
    let stack_size = match ctx.catalog.get(&exemplar.item_id) {
        Some(def) => def.stack_size,
        None => return Ok(()),
    };
    let mut front = 0;
    let mut back = members.len() - 1;
    while front < back {
        let space = stack_size.saturating_sub(members[front].1);
        if space == 0 {
            front += 1;
            continue;
        }
        if members[back].1 == 0 {
            back -= 1;
            continue;
        }
        let take = space.min(members[back].1);
        if !view.move_stack(members[back].0, members[front].0)? {
            log::debug!(
                "[Sort] Consolidation move {} -> {} refused",
                members[back].0,
                members[front].0
            );
            break;
        }
        members[front].1 += take;
        members[back].1 -= take;
    }
    Ok(())
}

/// Evens a group's counts across its occupied slots. Every occupied slot
/// holds at least one item, so targets stay above zero and no slot empties.
fn balance_group<C: ContainerView>(view: &mut C, members: &mut [(usize, u32)]) -> Result<()> {
    let total: u32 = members.iter().map(|&(_, count)| count).sum();
    let n = members.len() as u32;
    let base = total / n;
    let extra = (total % n) as usize;
    let desired: Vec<u32> =
        (0..members.len()).map(|i| if i < extra { base + 1 } else { base }).collect();

    loop {
        let donor = (0..members.len()).find(|&i| members[i].1 > desired[i]);
        let receiver = (0..members.len()).find(|&i| members[i].1 < desired[i]);
        let (donor, receiver) = match (donor, receiver) {
            (Some(donor), Some(receiver)) => (donor, receiver),
            _ => break,
        };
        let amount = (members[donor].1 - desired[donor]).min(desired[receiver] - members[receiver].1);
        if !view.transfer(members[donor].0, members[receiver].0, amount)? {
            // Splitting unsupported on this view; balancing stays a no-op.
            log::debug!(
                "[Sort] Balancing transfer {} -> {} refused",
                members[donor].0,
                members[receiver].0
            );
            break;
        }
        members[donor].1 -= amount;
        members[receiver].1 += amount;
    }
    Ok(())
}

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SortError};
use crate::items::{calculate_merge_result, ItemCatalog, ItemStack};

// --- Sections ---

/// Named sub-range of slots within a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    /// Main storage grid of a player inventory.
    Main,
    Hotbar,
    CraftingIn,
    /// Crafting input whose slots must never be emptied by automatic moves.
    CraftingInPersistent,
    CraftingOut,
    Armor,
    Chest,
}

impl Section {
    /// Persistent slots may be rebalanced but never cleared.
    pub fn is_persistent(&self) -> bool {
        matches!(self, Section::CraftingInPersistent)
    }
}

// --- The View ---

/// Indexed view over a fixed-capacity slot container.
///
/// The engines drive every rearrangement through this trait; game hosts
/// implement it over their native containers. `move_stack` and `transfer`
/// may refuse with `Ok(false)` (locked slot, empty source, nothing fits);
/// refusal is an expected outcome the engines route around. `Err` is
/// reserved for contract violations and host faults, which abort the
/// invocation in progress.
pub trait ContainerView {
    /// Total number of slots.
    fn slot_count(&self) -> usize;

    /// Value snapshot of a slot's stack, `None` when the slot is empty.
    fn get(&self, slot: usize) -> Result<Option<ItemStack>>;

    /// Slot range of a section, `None` when this container lacks it.
    fn section_range(&self, section: Section) -> Option<Range<usize>>;

    /// Section a slot belongs to.
    fn section_of(&self, slot: usize) -> Option<Section>;

    /// Number of slots in a section.
    fn section_size(&self, section: Section) -> usize {
        self.section_range(section).map(|range| range.len()).unwrap_or(0)
    }

    /// Row width the section is rendered with; drives row and column major
    /// fill orders.
    fn grid_width(&self, section: Section) -> usize;

    /// Slots excluded from automatic rearrangement.
    fn is_locked(&self, slot: usize) -> bool;

    /// Moves, merges or swaps the source slot's content into the destination
    /// slot. `Ok(false)` means the view refused the move.
    fn move_stack(&mut self, from: usize, to: usize) -> Result<bool>;

    /// Moves exactly `quantity` items between slots, merging onto a same-kind
    /// stack. Views that cannot split stacks keep this default refusal; only
    /// even-stack balancing needs it.
    fn transfer(&mut self, from: usize, to: usize, quantity: u32) -> Result<bool> {
        let _ = (from, to, quantity);
        Ok(false)
    }

    /// Flushes pending writes to the host. The engines call this exactly
    /// once per invocation, never per move.
    fn apply_changes(&mut self);
}

// --- In-Memory Container ---

/// In-memory [`ContainerView`] for hosts without a native container, and the
/// workhorse of the test suite. Sections are appended contiguously; moves
/// merge when the kinds allow it and swap otherwise.
#[derive(Debug, Clone)]
pub struct BasicContainer {
    slots: Vec<Option<ItemStack>>,
    locked: Vec<bool>,
    sections: Vec<(Section, Range<usize>, usize)>,
    catalog: ItemCatalog,
    commits: usize,
}

impl BasicContainer {
    pub fn new(catalog: ItemCatalog) -> Self {
        BasicContainer {
            slots: Vec::new(),
            locked: Vec::new(),
            sections: Vec::new(),
            catalog,
            commits: 0,
        }
    }

    /// Appends `len` empty slots as `section`, rendered `width` columns wide.
    pub fn with_section(mut self, section: Section, len: usize, width: usize) -> Self {
        let start = self.slots.len();
        self.slots.resize_with(start + len, || None);
        self.locked.resize(start + len, false);
        self.sections.push((section, start..start + len, width));
        self
    }

    /// Standard player layout: main grid 0..27, hotbar 27..36, both 9 wide.
    pub fn player(catalog: ItemCatalog) -> Self {
        Self::new(catalog)
            .with_section(Section::Main, 27, 9)
            .with_section(Section::Hotbar, 9, 9)
    }

    /// Chest with `rows` rows of 9 slots.
    pub fn chest(catalog: ItemCatalog, rows: usize) -> Self {
        Self::new(catalog).with_section(Section::Chest, rows * 9, 9)
    }

    fn check_slot(&self, slot: usize) -> Result<()> {
        if slot >= self.slots.len() {
            return Err(SortError::SlotOutOfBounds { slot, size: self.slots.len() });
        }
        Ok(())
    }

    /// Puts a stack straight into a slot, replacing whatever was there.
    pub fn put(&mut self, slot: usize, stack: ItemStack) -> Result<()> {
        self.check_slot(slot)?;
        self.slots[slot] = if stack.is_empty() { None } else { Some(stack) };
        Ok(())
    }

    pub fn clear(&mut self, slot: usize) -> Result<()> {
        self.check_slot(slot)?;
        self.slots[slot] = None;
        Ok(())
    }

    /// Excludes a slot from automatic moves.
    pub fn lock(&mut self, slot: usize) -> Result<()> {
        self.check_slot(slot)?;
        self.locked[slot] = true;
        Ok(())
    }

    /// Number of `apply_changes` calls so far.
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }
}

impl ContainerView for BasicContainer {
    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn get(&self, slot: usize) -> Result<Option<ItemStack>> {
        self.check_slot(slot)?;
        Ok(self.slots[slot].clone())
    }

    fn section_range(&self, section: Section) -> Option<Range<usize>> {
        self.sections
            .iter()
            .find(|(candidate, _, _)| *candidate == section)
            .map(|(_, range, _)| range.clone())
    }

    fn section_of(&self, slot: usize) -> Option<Section> {
        self.sections
            .iter()
            .find(|(_, range, _)| range.contains(&slot))
            .map(|(section, _, _)| *section)
    }

    fn grid_width(&self, section: Section) -> usize {
        self.sections
            .iter()
            .find(|(candidate, _, _)| *candidate == section)
            .map(|(_, _, width)| *width)
            .unwrap_or(0)
    }

    fn is_locked(&self, slot: usize) -> bool {
        self.locked.get(slot).copied().unwrap_or(false)
    }

    fn move_stack(&mut self, from: usize, to: usize) -> Result<bool> {
        self.check_slot(from)?;
        self.check_slot(to)?;
        if from == to {
            return Ok(true); // nothing to do
        }
        if self.locked[from] || self.locked[to] {
            log::debug!("[Container] Move {} -> {} refused: locked slot", from, to);
            return Ok(false);
        }
        let source = match self.slots[from].clone() {
            Some(stack) => stack,
            None => return Ok(false),
        };
        let target = match self.slots[to].clone() {
            Some(stack) => stack,
            None => {
                self.slots[to] = Some(source);
                self.slots[from] = None;
                return Ok(true);
            }
        };

        // Occupied destination: merge what fits, otherwise swap contents.
        let merge = self
            .catalog
            .get(&source.item_id)
            .and_then(|def| calculate_merge_result(&source, &target, def));
        match merge {
            Some((moved, source_new, target_new, emptied)) => {
                log::debug!("[Container] Merged {} items from slot {} onto {}", moved, from, to);
                if let Some(stack) = self.slots[to].as_mut() {
                    stack.quantity = target_new;
                }
                self.slots[from] = if emptied {
                    None
                } else {
                    let mut rest = source;
                    rest.quantity = source_new;
                    Some(rest)
                };
            }
            None => {
                self.slots.swap(from, to);
            }
        }
        Ok(true)
    }

    fn transfer(&mut self, from: usize, to: usize, quantity: u32) -> Result<bool> {
        self.check_slot(from)?;
        self.check_slot(to)?;
        if from == to || quantity == 0 {
            return Ok(false);
        }
        if self.locked[from] || self.locked[to] {
            return Ok(false);
        }
        let source = match self.slots[from].clone() {
            Some(stack) => stack,
            None => return Ok(false),
        };
        if quantity > source.quantity {
            return Ok(false);
        }
        let def = match self.catalog.get(&source.item_id) {
            Some(def) => def,
            None => return Ok(false),
        };
        if !def.is_stackable {
            return Ok(false);
        }
        match self.slots[to].clone() {
            None => {
                let mut moved = source.clone();
                moved.quantity = quantity;
                self.slots[to] = Some(moved);
            }
            Some(target) => {
                if !source.same_kind(&target) {
                    return Ok(false);
                }
                if def.stack_size.saturating_sub(target.quantity) < quantity {
                    return Ok(false);
                }
                if let Some(stack) = self.slots[to].as_mut() {
                    stack.quantity += quantity;
                }
            }
        }
        let remaining = source.quantity - quantity;
        self.slots[from] = if remaining == 0 {
            None
        } else {
            let mut rest = source;
            rest.quantity = remaining;
            Some(rest)
        };
        Ok(true)
    }

    fn apply_changes(&mut self) {
        self.commits += 1;
        log::debug!("[Container] Applied changes (commit {})", self.commits);
    }
}

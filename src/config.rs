use serde::{Deserialize, Serialize};

use crate::tree::{ItemTree, MetadataMatch};

// --- Rules ---

/// One sorting rule: stacks matching `keyword` in the active tree prefer the
/// listed slots, first slot is best.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortRule {
    pub keyword: String,
    pub preferred_slots: Vec<usize>,
    /// Restriction level. When several rules match one stack, higher levels
    /// contribute their slots first; declaration order breaks ties.
    pub level: u32,
}

impl SortRule {
    pub fn new(keyword: impl Into<String>, preferred_slots: Vec<usize>, level: u32) -> Self {
        SortRule { keyword: keyword.into(), preferred_slots, level }
    }
}

// --- Trigger & Options ---

/// Conventional scancode of the default sort key.
const DEFAULT_SORT_KEY: u32 = 19;

/// Input binding that fires a sort. The host owns input handling and
/// interprets the codes; the engine only carries the binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortTrigger {
    Key(u32),
    MouseButton(u8),
}

impl Default for SortTrigger {
    fn default() -> Self {
        SortTrigger::Key(DEFAULT_SORT_KEY)
    }
}

/// Comparator, refill and pickup toggles, plus the bound sort trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortOptions {
    /// Sort near-broken items first instead of the most intact ones. Applies
    /// to damageable kinds only; variant metadata always sorts ascending.
    pub invert_damage_sort: bool,
    /// Master switch for refilling the focused slot.
    pub auto_refill: bool,
    /// Also swap a worn tool out shortly before it breaks, not only once the
    /// stack is gone.
    pub refill_before_break: bool,
    /// Remaining durability under which a tool counts as about to break.
    pub refill_damage_threshold: u32,
    /// Move freshly picked up stacks to their rule-preferred slots.
    pub sort_on_pickup: bool,
    pub sort_trigger: SortTrigger,
}

impl Default for SortOptions {
    fn default() -> Self {
        SortOptions {
            invert_damage_sort: false,
            auto_refill: true,
            refill_before_break: false,
            refill_damage_threshold: 5,
            sort_on_pickup: true,
            sort_trigger: SortTrigger::default(),
        }
    }
}

// --- Configuration ---

/// Active configuration: the category tree, the rule list and the option set.
///
/// Plain serializable data; parsing config files and watching them for
/// changes stays with the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub tree: ItemTree,
    pub rules: Vec<SortRule>,
    pub options: SortOptions,
}

impl Config {
    pub fn new(tree: ItemTree, rules: Vec<SortRule>, options: SortOptions) -> Self {
        Config { tree, rules, options }
    }

    /// Installs a freshly built tree. The old one is replaced whole, so a
    /// reload never exposes a partially built hierarchy and existing ranks
    /// stay untouched until the swap.
    pub fn replace_tree(&mut self, tree: ItemTree) {
        log::info!("[Config] Replacing category tree ({} leaves)", tree.leaf_count());
        self.tree = tree;
    }
}

impl Default for Config {
    /// Built-in tree and rules matching the default item catalog.
    fn default() -> Self {
        Config {
            tree: default_tree(),
            rules: default_rules(),
            options: SortOptions::default(),
        }
    }
}

fn default_tree() -> ItemTree {
    let mut tree = ItemTree::new();
    tree.add_category(None, "equipment");
    tree.add_category(Some("equipment"), "weapons");
    tree.add_category(Some("equipment"), "tools");
    tree.add_category(Some("equipment"), "armor");
    tree.add_category(None, "food");
    tree.add_category(None, "materials");
    tree.add_category(None, "placeables");

    tree.add_item("weapons", "iron_sword", "survival:iron_sword", MetadataMatch::Any, None);
    tree.add_item("weapons", "stone_sword", "survival:stone_sword", MetadataMatch::Any, None);
    tree.add_item("tools", "iron_pickaxe", "survival:iron_pickaxe", MetadataMatch::Any, None);
    tree.add_item("tools", "stone_pickaxe", "survival:stone_pickaxe", MetadataMatch::Any, None);
    tree.add_item("tools", "stone_hatchet", "survival:stone_hatchet", MetadataMatch::Any, None);
    tree.add_item("armor", "iron_helmet", "survival:iron_helmet", MetadataMatch::Any, None);
    tree.add_item("armor", "iron_chestplate", "survival:iron_chestplate", MetadataMatch::Any, None);
    tree.add_item("food", "bread", "survival:bread", MetadataMatch::Any, None);
    tree.add_item("materials", "wood", "survival:wood", MetadataMatch::Any, None);
    tree.add_item("materials", "stone", "survival:stone", MetadataMatch::Any, None);
    tree.add_item("materials", "plank", "survival:plank", MetadataMatch::Any, None);
    tree.add_item("placeables", "campfire", "survival:campfire", MetadataMatch::Any, None);
    tree
}

fn default_rules() -> Vec<SortRule> {
    // Slot numbers follow the standard player layout: main grid 0..27,
    // hotbar 27..36.
    vec![
        SortRule::new("weapons", vec![27], 2),
        SortRule::new("tools", vec![28, 29, 30], 1),
        SortRule::new("food", vec![35], 1),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::ItemStack;

    #[test]
    fn default_tree_ranks_equipment_before_materials() {
        let config = Config::default();
        let sword = ItemStack::new("survival:iron_sword", 1);
        let wood = ItemStack::new("survival:wood", 10);
        assert!(config.tree.order_of(&sword) < config.tree.order_of(&wood));
    }

    #[test]
    fn default_rules_sorted_by_level_on_demand() {
        let config = Config::default();
        let top: Vec<&SortRule> = config.rules.iter().filter(|r| r.level == 2).collect();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].keyword, "weapons");
    }

    #[test]
    fn replace_tree_swaps_ranks_whole() {
        let mut config = Config::default();
        let wood = ItemStack::new("survival:wood", 10);
        let old_rank = config.tree.order_of(&wood);

        let mut rebuilt = ItemTree::new();
        rebuilt.add_category(None, "materials");
        rebuilt.add_item("materials", "wood", "survival:wood", MetadataMatch::Any, None);
        config.replace_tree(rebuilt);

        assert_ne!(config.tree.order_of(&wood), old_rank);
        assert_eq!(config.tree.order_of(&wood), 0);
    }
}

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

// --- Equipment Descriptors ---

/// Body-coverage slot of an armor piece, in ascending priority order.
/// Head coverage sorts ahead of chest, chest ahead of legs, legs ahead of feet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArmorSlot {
    Feet,
    Legs,
    Chest,
    Head,
}

/// What a tool without an explicit class label actually is. Hoes, shears and
/// fishing-rod-like tools ship with an empty class set and get their label here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolFallback {
    Hoe,
    Shears,
    FishingRod,
}

impl ToolFallback {
    pub fn class_name(&self) -> &'static str {
        match self {
            ToolFallback::Hoe => "hoe",
            ToolFallback::Shears => "shears",
            ToolFallback::FishingRod => "fishingrod",
        }
    }
}

/// Per-type equipment capability, resolved once when the catalog is built.
/// Replaces runtime type inspection: the comparator only ever matches on this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Equipment {
    NotEquipment,
    Tool { class: String, tier: i32 },
    Weapon { damage: f64, speed: f64 },
    Armor { slot: ArmorSlot, defense: i32, toughness: f32 },
}

impl Equipment {
    pub fn tool(&self) -> Option<(&str, i32)> {
        match self {
            Equipment::Tool { class, tier } => Some((class.as_str(), *tier)),
            _ => None,
        }
    }

    pub fn weapon(&self) -> Option<(f64, f64)> {
        match self {
            Equipment::Weapon { damage, speed } => Some((*damage, *speed)),
            _ => None,
        }
    }

    pub fn armor(&self) -> Option<(ArmorSlot, i32, f32)> {
        match self {
            Equipment::Armor { slot, defense, toughness } => Some((*slot, *defense, *toughness)),
            _ => None,
        }
    }
}

/// Melee class label that never counts as a tool class on its own.
const MELEE_CLASS: &str = "blade";

/// Preference order when an item carries several tool classes at once.
const PREFERRED_TOOL_CLASSES: [&str; 6] = ["pickaxe", "axe", "shovel", "hoe", "shears", "wrench"];

/// Reduces a raw tool-class set to the single class the comparator sorts under.
///
/// The melee class is discarded first (blades are weapons, not tools). An empty
/// set falls back to the hoe/shears/fishing-rod label when one applies. With
/// several classes left, the preference order above wins; failing that, the
/// lexicographically first remaining class.
pub fn derive_tool_class(raw_classes: &[&str], fallback: Option<ToolFallback>) -> Option<String> {
    let classes: BTreeSet<&str> = raw_classes
        .iter()
        .copied()
        .filter(|class| *class != MELEE_CLASS)
        .collect();

    if classes.is_empty() {
        return fallback.map(|f| f.class_name().to_string());
    }
    if classes.len() == 1 {
        return classes.iter().next().map(|class| class.to_string());
    }
    for preferred in PREFERRED_TOOL_CLASSES {
        if classes.contains(preferred) {
            return Some(preferred.to_string());
        }
    }
    classes.iter().next().map(|class| class.to_string())
}

/// Builds the `Tool` descriptor for an item from its raw class set, or
/// `NotEquipment` when no class can be derived.
pub fn tool_equipment(raw_classes: &[&str], fallback: Option<ToolFallback>, tier: i32) -> Equipment {
    match derive_tool_class(raw_classes, fallback) {
        Some(class) => Equipment::Tool { class, tier },
        None => Equipment::NotEquipment,
    }
}

// --- Item Definitions (Catalog) ---

/// Per-type item data. Everything the comparator and the merge arithmetic need
/// to know about a kind of item, keyed by its stable id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub id: String,          // Stable registry-style key, e.g. "survival:stone_pickaxe"
    pub name: String,        // Default display name
    pub is_stackable: bool,  // Can multiple instances share one slot?
    pub stack_size: u32,     // Max number per stack (if stackable)
    pub max_durability: u32, // 0 = the item does not wear
    pub equipment: Equipment,
}

impl ItemDefinition {
    /// True when the metadata value of stacks of this kind means wear, not variant.
    pub fn is_damageable(&self) -> bool {
        self.max_durability > 0
    }
}

/// All known item definitions, keyed by item id. Built by the host from its
/// own item registry; `with_defaults` seeds a small survival-flavored set that
/// also serves as the test vocabulary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemCatalog {
    definitions: HashMap<String, ItemDefinition>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, def: ItemDefinition) {
        if self.definitions.insert(def.id.clone(), def).is_some() {
            log::debug!("[Catalog] Replaced an existing item definition");
        }
    }

    pub fn get(&self, id: &str) -> Option<&ItemDefinition> {
        self.definitions.get(id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Seeds the built-in item definitions.
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();

        let defaults = vec![
            ItemDefinition {
                id: "survival:wood".to_string(),
                name: "Wood".to_string(),
                is_stackable: true,
                stack_size: 1000,
                max_durability: 0,
                equipment: Equipment::NotEquipment,
            },
            ItemDefinition {
                id: "survival:stone".to_string(),
                name: "Stone".to_string(),
                is_stackable: true,
                stack_size: 1000,
                max_durability: 0,
                equipment: Equipment::NotEquipment,
            },
            ItemDefinition {
                id: "survival:plank".to_string(),
                name: "Plank".to_string(),
                is_stackable: true,
                stack_size: 1000,
                max_durability: 0,
                equipment: Equipment::NotEquipment,
            },
            ItemDefinition {
                id: "survival:bread".to_string(),
                name: "Bread".to_string(),
                is_stackable: true,
                stack_size: 64,
                max_durability: 0,
                equipment: Equipment::NotEquipment,
            },
            ItemDefinition {
                id: "survival:stone_hatchet".to_string(),
                name: "Stone Hatchet".to_string(),
                is_stackable: false,
                stack_size: 1,
                max_durability: 132,
                equipment: Equipment::Tool { class: "axe".to_string(), tier: 1 },
            },
            ItemDefinition {
                id: "survival:stone_pickaxe".to_string(),
                name: "Stone Pickaxe".to_string(),
                is_stackable: false,
                stack_size: 1,
                max_durability: 132,
                equipment: Equipment::Tool { class: "pickaxe".to_string(), tier: 1 },
            },
            ItemDefinition {
                id: "survival:iron_pickaxe".to_string(),
                name: "Iron Pickaxe".to_string(),
                is_stackable: false,
                stack_size: 1,
                max_durability: 251,
                equipment: Equipment::Tool { class: "pickaxe".to_string(), tier: 2 },
            },
            ItemDefinition {
                id: "survival:stone_sword".to_string(),
                name: "Stone Sword".to_string(),
                is_stackable: false,
                stack_size: 1,
                max_durability: 132,
                equipment: Equipment::Weapon { damage: 5.0, speed: 1.6 },
            },
            ItemDefinition {
                id: "survival:iron_sword".to_string(),
                name: "Iron Sword".to_string(),
                is_stackable: false,
                stack_size: 1,
                max_durability: 251,
                equipment: Equipment::Weapon { damage: 6.0, speed: 1.6 },
            },
            ItemDefinition {
                id: "survival:iron_helmet".to_string(),
                name: "Iron Helmet".to_string(),
                is_stackable: false,
                stack_size: 1,
                max_durability: 166,
                equipment: Equipment::Armor { slot: ArmorSlot::Head, defense: 2, toughness: 0.0 },
            },
            ItemDefinition {
                id: "survival:iron_chestplate".to_string(),
                name: "Iron Chestplate".to_string(),
                is_stackable: false,
                stack_size: 1,
                max_durability: 241,
                equipment: Equipment::Armor { slot: ArmorSlot::Chest, defense: 6, toughness: 0.0 },
            },
            ItemDefinition {
                id: "survival:campfire".to_string(),
                name: "Camp Fire".to_string(),
                is_stackable: false,
                stack_size: 1,
                max_durability: 0,
                equipment: Equipment::NotEquipment,
            },
        ];

        let count = defaults.len();
        for def in defaults {
            catalog.register(def);
        }
        log::info!("[Catalog] Seeded {} default item definitions", count);
        catalog
    }
}

// --- Item Stacks ---

/// A level of one enchantment on a stack. Ids are assumed distinct per stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enchantment {
    pub id: u32,
    pub level: u32,
}

/// A quantity of identical items occupying one slot. Owned exclusively by the
/// slot that holds it; clones are value-semantic snapshots used for change
/// detection, never aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_id: String,                 // Links to an ItemDefinition
    pub metadata: u16,                   // Wear for damageable kinds, variant otherwise
    pub quantity: u32,                   // How many of this item
    pub tag: Option<serde_json::Value>,  // Structured payload, compared whole for equality
    pub custom_name: Option<String>,     // Player-assigned display name, if any
    pub enchantments: Vec<Enchantment>,
}

impl ItemStack {
    pub fn new(item_id: impl Into<String>, quantity: u32) -> Self {
        ItemStack {
            item_id: item_id.into(),
            metadata: 0,
            quantity,
            tag: None,
            custom_name: None,
            enchantments: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: u16) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_custom_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = Some(name.into());
        self
    }

    pub fn with_enchantment(mut self, id: u32, level: u32) -> Self {
        self.enchantments.push(Enchantment { id, level });
        self
    }

    pub fn with_tag(mut self, tag: serde_json::Value) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }

    pub fn has_custom_name(&self) -> bool {
        self.custom_name.is_some()
    }

    /// Custom name if set, else the catalog name, else the raw id.
    pub fn display_name<'a>(&'a self, catalog: &'a ItemCatalog) -> &'a str {
        if let Some(name) = &self.custom_name {
            return name;
        }
        match catalog.get(&self.item_id) {
            Some(def) => &def.name,
            None => &self.item_id,
        }
    }

    /// Two stacks of the same kind can share a slot: identical id, metadata,
    /// tag payload, custom name and enchantments.
    pub fn same_kind(&self, other: &ItemStack) -> bool {
        self.item_id == other.item_id
            && self.metadata == other.metadata
            && self.tag == other.tag
            && self.custom_name == other.custom_name
            && self.enchantments == other.enchantments
    }

    /// Durability left before this stack breaks, per its definition.
    pub fn remaining_durability(&self, def: &ItemDefinition) -> u32 {
        def.max_durability.saturating_sub(u32::from(self.metadata))
    }
}

// --- Merge Arithmetic ---

/// Computes what merging `source` onto `target` would do, without mutating
/// either. Returns `(quantity_transferred, source_new_qty, target_new_qty,
/// source_empties)`, or `None` when the pair cannot merge at all (different
/// kind, not stackable, or no space left in the target).
///
/// Shared by the container move primitive and the even-stacks planner so both
/// agree on what fits where.
pub fn calculate_merge_result(
    source: &ItemStack,
    target: &ItemStack,
    def: &ItemDefinition,
) -> Option<(u32, u32, u32, bool)> {
    if !source.same_kind(target) || !def.is_stackable {
        return None;
    }
    let space = def.stack_size.saturating_sub(target.quantity);
    let transfer = source.quantity.min(space);
    if transfer == 0 {
        return None;
    }
    let source_new = source.quantity - transfer;
    let target_new = target.quantity + transfer;
    Some((transfer, source_new, target_new, source_new == 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wood_def() -> ItemDefinition {
        ItemCatalog::with_defaults().get("survival:wood").unwrap().clone()
    }

    #[test]
    fn merge_full_empties_source() {
        let def = wood_def();
        let source = ItemStack::new("survival:wood", 40);
        let target = ItemStack::new("survival:wood", 100);
        let (transfer, source_new, target_new, emptied) =
            calculate_merge_result(&source, &target, &def).unwrap();
        assert_eq!(transfer, 40);
        assert_eq!(source_new, 0);
        assert_eq!(target_new, 140);
        assert!(emptied);
    }

    #[test]
    fn merge_partial_keeps_remainder() {
        let def = wood_def();
        let source = ItemStack::new("survival:wood", 500);
        let target = ItemStack::new("survival:wood", 700);
        let (transfer, source_new, target_new, emptied) =
            calculate_merge_result(&source, &target, &def).unwrap();
        assert_eq!(transfer, 300);
        assert_eq!(source_new, 200);
        assert_eq!(target_new, 1000);
        assert!(!emptied);
    }

    #[test]
    fn merge_rejects_full_target() {
        let def = wood_def();
        let source = ItemStack::new("survival:wood", 10);
        let target = ItemStack::new("survival:wood", 1000);
        assert!(calculate_merge_result(&source, &target, &def).is_none());
    }

    #[test]
    fn merge_rejects_different_kind() {
        let def = wood_def();
        let source = ItemStack::new("survival:wood", 10);
        let target = ItemStack::new("survival:stone", 10);
        assert!(calculate_merge_result(&source, &target, &def).is_none());

        let variant = ItemStack::new("survival:wood", 10).with_metadata(1);
        assert!(calculate_merge_result(&source, &variant, &def).is_none());
    }

    #[test]
    fn merge_rejects_unstackable() {
        let catalog = ItemCatalog::with_defaults();
        let def = catalog.get("survival:stone_pickaxe").unwrap();
        let a = ItemStack::new("survival:stone_pickaxe", 1);
        let b = ItemStack::new("survival:stone_pickaxe", 1);
        assert!(calculate_merge_result(&a, &b, def).is_none());
    }

    #[test]
    fn merge_conserves_total() {
        let def = wood_def();
        let source = ItemStack::new("survival:wood", 730);
        let target = ItemStack::new("survival:wood", 420);
        let (_, source_new, target_new, _) =
            calculate_merge_result(&source, &target, &def).unwrap();
        assert_eq!(source_new + target_new, 730 + 420);
    }

    #[test]
    fn tool_class_suppresses_melee() {
        assert_eq!(derive_tool_class(&["blade"], None), None);
        assert_eq!(
            derive_tool_class(&["blade", "axe"], None),
            Some("axe".to_string())
        );
    }

    #[test]
    fn tool_class_fallbacks() {
        assert_eq!(
            derive_tool_class(&[], Some(ToolFallback::Hoe)),
            Some("hoe".to_string())
        );
        assert_eq!(
            derive_tool_class(&[], Some(ToolFallback::FishingRod)),
            Some("fishingrod".to_string())
        );
        assert_eq!(derive_tool_class(&[], None), None);
    }

    #[test]
    fn tool_class_preference_order() {
        assert_eq!(
            derive_tool_class(&["shovel", "pickaxe", "axe"], None),
            Some("pickaxe".to_string())
        );
        // Unknown classes resolve to the lexicographically first one.
        assert_eq!(
            derive_tool_class(&["zapper", "crusher"], None),
            Some("crusher".to_string())
        );
    }

    #[test]
    fn display_name_prefers_custom() {
        let catalog = ItemCatalog::with_defaults();
        let plain = ItemStack::new("survival:wood", 1);
        assert_eq!(plain.display_name(&catalog), "Wood");
        let named = ItemStack::new("survival:wood", 1).with_custom_name("Lucky Log");
        assert_eq!(named.display_name(&catalog), "Lucky Log");
        let unknown = ItemStack::new("modded:gizmo", 1);
        assert_eq!(unknown.display_name(&catalog), "modded:gizmo");
    }
}

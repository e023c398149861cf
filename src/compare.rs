use std::cmp::Ordering;

use crate::config::Config;
use crate::items::{Enchantment, Equipment, ItemCatalog, ItemDefinition, ItemStack};
use crate::tree::UNRANKED;

const NOT_EQUIPMENT: Equipment = Equipment::NotEquipment;

// --- Context ---

/// Everything the engines consult while working: the item catalog and the
/// active configuration. Threaded explicitly through every call so separate
/// instances can run against separate configurations.
#[derive(Clone, Copy)]
pub struct SortContext<'a> {
    pub catalog: &'a ItemCatalog,
    pub config: &'a Config,
}

impl<'a> SortContext<'a> {
    pub fn new(catalog: &'a ItemCatalog, config: &'a Config) -> Self {
        SortContext { catalog, config }
    }

    /// Tree rank of a stack, [`UNRANKED`] when nothing matches.
    pub fn order_of(&self, stack: &ItemStack) -> u32 {
        self.config.tree.order_of(stack)
    }

    fn definition(&self, stack: &ItemStack) -> Option<&'a ItemDefinition> {
        self.catalog.get(&stack.item_id)
    }

    fn equipment(&self, stack: &ItemStack) -> &'a Equipment {
        self.definition(stack).map(|def| &def.equipment).unwrap_or(&NOT_EQUIPMENT)
    }
}

// --- Modes & Tracing ---

/// How ranks feed the comparison. `Api` collapses any rank beyond the tree's
/// last declared order to the unranked sentinel and declares two unranked
/// stacks exactly equal, so an external ranking system can own their order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    Full,
    Api,
}

/// One evaluated tie-break step, for diagnostics. The last recorded step of a
/// comparison is the decisive one.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceStep {
    pub step: &'static str,
    pub detail: String,
    pub outcome: Ordering,
}

struct Trace<'a> {
    steps: Option<&'a mut Vec<TraceStep>>,
}

impl Trace<'_> {
    fn push(&mut self, step: &'static str, outcome: Ordering, detail: impl FnOnce() -> String) {
        if let Some(steps) = self.steps.as_deref_mut() {
            steps.push(TraceStep { step, detail: detail(), outcome });
        }
    }
}

// --- Comparison ---

/// Compares two stacks for sorting. `Ordering::Less` means `a` sorts first.
///
/// Ranks come from the caller so a sort pass can look each stack up once per
/// snapshot. The result is a total order over well-formed stacks: empties
/// sort last, lower ranks first, and rank ties fall through tools, weapons,
/// armor, display names, enchantments, durability, stack size and finally
/// the identity key.
pub fn compare_stacks(
    ctx: &SortContext,
    a: &ItemStack,
    b: &ItemStack,
    order_a: u32,
    order_b: u32,
    mode: CompareMode,
) -> Ordering {
    compare_inner(ctx, a, b, order_a, order_b, mode, &mut Trace { steps: None })
}

/// Diagnostic variant of [`compare_stacks`]: same outcome, plus every
/// tie-break step reached with its intermediate values. The comparison
/// itself stays pure; callers that want the trace pay for the strings.
pub fn compare_stacks_traced(
    ctx: &SortContext,
    a: &ItemStack,
    b: &ItemStack,
    order_a: u32,
    order_b: u32,
    mode: CompareMode,
) -> (Ordering, Vec<TraceStep>) {
    let mut steps = Vec::new();
    let outcome =
        compare_inner(ctx, a, b, order_a, order_b, mode, &mut Trace { steps: Some(&mut steps) });
    (outcome, steps)
}

fn compare_inner(
    ctx: &SortContext,
    a: &ItemStack,
    b: &ItemStack,
    order_a: u32,
    order_b: u32,
    mode: CompareMode,
    trace: &mut Trace,
) -> Ordering {
    // Empty slots sort after everything else.
    if a.is_empty() && b.is_empty() {
        trace.push("empty", Ordering::Equal, || "both empty".to_string());
        return Ordering::Equal;
    }
    if b.is_empty() {
        trace.push("empty", Ordering::Less, || "b empty".to_string());
        return Ordering::Less;
    }
    if a.is_empty() {
        trace.push("empty", Ordering::Greater, || "a empty".to_string());
        return Ordering::Greater;
    }

    let mut order_a = order_a;
    let mut order_b = order_b;
    if mode == CompareMode::Api {
        let last = ctx.config.tree.last_order();
        if order_a > last {
            order_a = UNRANKED;
        }
        if order_b > last {
            order_b = UNRANKED;
        }
    }

    let by_rank = order_a.cmp(&order_b);
    if by_rank != Ordering::Equal {
        trace.push("rank", by_rank, || format!("{} vs {}", order_a, order_b));
        return by_rank;
    }
    if mode == CompareMode::Api && order_a == UNRANKED {
        trace.push("rank", Ordering::Equal, || "both unranked under api mode".to_string());
        return Ordering::Equal;
    }
    trace.push("rank", Ordering::Equal, || format!("{} vs {}", order_a, order_b));

    let by_tool = compare_tools(ctx, a, b, trace);
    if by_tool != Ordering::Equal {
        return by_tool;
    }
    let by_weapon = compare_weapons(ctx, a, b, trace);
    if by_weapon != Ordering::Equal {
        return by_weapon;
    }
    let by_armor = compare_armor(ctx, a, b, trace);
    if by_armor != Ordering::Equal {
        return by_armor;
    }
    let by_name = compare_names(ctx, a, b, trace);
    if by_name != Ordering::Equal {
        return by_name;
    }
    let by_enchantment = compare_enchantments(a, b, trace);
    if by_enchantment != Ordering::Equal {
        return by_enchantment;
    }
    let by_ceiling = compare_max_durability(ctx, a, b, trace);
    if by_ceiling != Ordering::Equal {
        return by_ceiling;
    }
    let by_damage = compare_current_damage(ctx, a, b, trace);
    if by_damage != Ordering::Equal {
        return by_damage;
    }

    // Fuller stacks first.
    let by_size = b.quantity.cmp(&a.quantity);
    trace.push("stack size", by_size, || format!("{} vs {}", a.quantity, b.quantity));
    if by_size != Ordering::Equal {
        return by_size;
    }

    let by_identity = a.item_id.cmp(&b.item_id);
    trace.push("identity", by_identity, || format!("{} vs {}", a.item_id, b.item_id));
    by_identity
}

// --- Tie-Break Steps ---

/// Tools before non-tools; among tools, class groups alphabetically, then
/// higher tier, then the durability ceiling.
fn compare_tools(ctx: &SortContext, a: &ItemStack, b: &ItemStack, trace: &mut Trace) -> Ordering {
    let tool_a = ctx.equipment(a).tool();
    let tool_b = ctx.equipment(b).tool();
    let outcome = match (tool_a, tool_b) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some((class_a, tier_a)), Some((class_b, tier_b))) => class_a
            .cmp(class_b)
            .then(tier_b.cmp(&tier_a))
            .then_with(|| durability_ceiling_cmp(ctx, a, b)),
    };
    trace.push("tool", outcome, || format!("{:?} vs {:?}", tool_a, tool_b));
    outcome
}

/// Weapons before non-weapons; among weapons, higher damage, then higher
/// attack speed, then the durability ceiling.
fn compare_weapons(ctx: &SortContext, a: &ItemStack, b: &ItemStack, trace: &mut Trace) -> Ordering {
    let weapon_a = ctx.equipment(a).weapon();
    let weapon_b = ctx.equipment(b).weapon();
    let outcome = match (weapon_a, weapon_b) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some((damage_a, speed_a)), Some((damage_b, speed_b))) => damage_b
            .total_cmp(&damage_a)
            .then_with(|| speed_b.total_cmp(&speed_a))
            .then_with(|| durability_ceiling_cmp(ctx, a, b)),
    };
    trace.push("weapon", outcome, || format!("{:?} vs {:?}", weapon_a, weapon_b));
    outcome
}

/// Armor before non-armor; among armor, broader coverage first (head, chest,
/// legs, feet), then defense, toughness and the durability ceiling.
fn compare_armor(ctx: &SortContext, a: &ItemStack, b: &ItemStack, trace: &mut Trace) -> Ordering {
    let armor_a = ctx.equipment(a).armor();
    let armor_b = ctx.equipment(b).armor();
    let outcome = match (armor_a, armor_b) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some((slot_a, defense_a, toughness_a)), Some((slot_b, defense_b, toughness_b))) => slot_b
            .cmp(&slot_a)
            .then(defense_b.cmp(&defense_a))
            .then(toughness_b.total_cmp(&toughness_a))
            .then_with(|| durability_ceiling_cmp(ctx, a, b)),
    };
    trace.push("armor", outcome, || format!("{:?} vs {:?}", armor_a, armor_b));
    outcome
}

/// Custom-named stacks before plain ones, then display names alphabetically.
fn compare_names(ctx: &SortContext, a: &ItemStack, b: &ItemStack, trace: &mut Trace) -> Ordering {
    let outcome = match (a.has_custom_name(), b.has_custom_name()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.display_name(ctx.catalog).cmp(b.display_name(ctx.catalog)),
    };
    trace.push("name", outcome, || {
        format!("'{}' vs '{}'", a.display_name(ctx.catalog), b.display_name(ctx.catalog))
    });
    outcome
}

/// More distinct enchantments first; ties compare the most significant
/// enchantment, higher id first, then its level.
fn compare_enchantments(a: &ItemStack, b: &ItemStack, trace: &mut Trace) -> Ordering {
    let outcome = b.enchantments.len().cmp(&a.enchantments.len()).then_with(|| {
        let (id_a, level_a) = most_significant(&a.enchantments);
        let (id_b, level_b) = most_significant(&b.enchantments);
        id_b.cmp(&id_a).then(level_b.cmp(&level_a))
    });
    trace.push("enchantment", outcome, || {
        format!("{} vs {} enchantments", a.enchantments.len(), b.enchantments.len())
    });
    outcome
}

/// The enchantment with the highest level; among equal levels, the highest id.
fn most_significant(enchantments: &[Enchantment]) -> (u32, u32) {
    let mut best_id = 0;
    let mut best_level = 0;
    for enchantment in enchantments {
        if enchantment.level > best_level {
            best_id = enchantment.id;
            best_level = enchantment.level;
        } else if enchantment.level == best_level && enchantment.id > best_id {
            best_id = enchantment.id;
        }
    }
    (best_id, best_level)
}

fn compare_max_durability(
    ctx: &SortContext,
    a: &ItemStack,
    b: &ItemStack,
    trace: &mut Trace,
) -> Ordering {
    let outcome = durability_ceiling_cmp(ctx, a, b);
    trace.push("durability ceiling", outcome, || {
        format!("{} vs {}", durability_ceiling(ctx, a), durability_ceiling(ctx, b))
    });
    outcome
}

/// Kinds that do not wear count as infinitely durable.
fn durability_ceiling(ctx: &SortContext, stack: &ItemStack) -> u32 {
    match ctx.definition(stack) {
        Some(def) if def.max_durability > 0 => def.max_durability,
        _ => u32::MAX,
    }
}

/// Higher ceilings first.
fn durability_ceiling_cmp(ctx: &SortContext, a: &ItemStack, b: &ItemStack) -> Ordering {
    durability_ceiling(ctx, b).cmp(&durability_ceiling(ctx, a))
}

/// Most intact first for damageable pairs, flipped by the inversion option.
/// Everything else sorts by plain variant order. The inversion only applies
/// when both kinds wear, so items that reached this step through equal
/// ceilings always compare in one consistent direction.
fn compare_current_damage(
    ctx: &SortContext,
    a: &ItemStack,
    b: &ItemStack,
    trace: &mut Trace,
) -> Ordering {
    let both_damageable = ctx.definition(a).map_or(false, |def| def.is_damageable())
        && ctx.definition(b).map_or(false, |def| def.is_damageable());
    let outcome = if both_damageable && ctx.config.options.invert_damage_sort {
        b.metadata.cmp(&a.metadata)
    } else {
        a.metadata.cmp(&b.metadata)
    };
    trace.push("current damage", outcome, || format!("{} vs {}", a.metadata, b.metadata));
    outcome
}

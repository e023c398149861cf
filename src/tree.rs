use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::items::ItemStack;

/// Rank of a stack no tree leaf matches. Conceptually infinity: unranked
/// stacks sort after every ranked one, and the comparator's tie-break chain
/// decides among themselves.
pub const UNRANKED: u32 = u32::MAX;

// --- Match Predicates ---

/// Metadata constraint of a tree leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataMatch {
    /// Matches any metadata value.
    Any,
    /// Matches one exact value.
    Exact(u16),
    /// Matches an inclusive range of values.
    Range(u16, u16),
}

impl MetadataMatch {
    pub fn accepts(&self, metadata: u16) -> bool {
        match self {
            MetadataMatch::Any => true,
            MetadataMatch::Exact(value) => metadata == *value,
            MetadataMatch::Range(low, high) => metadata >= *low && metadata <= *high,
        }
    }
}

// --- Tree Nodes ---

/// A named category node. Categories form a rootless forest; item leaves
/// hang off categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub name: String,
    parent: Option<usize>,
    children: Vec<usize>,
    leaves: Vec<usize>,
}

/// An item leaf: a match predicate plus the rank it confers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemLeaf {
    /// Lowercase name, usable as a rule keyword.
    pub name: String,
    /// Identity key the leaf matches.
    pub item_id: String,
    pub metadata: MetadataMatch,
    /// When set, the stack's tag payload must be equal for the leaf to match.
    pub tag: Option<serde_json::Value>,
    /// Rank in declaration order. Never changes after the tree is built.
    pub order: u32,
    category: usize,
}

impl ItemLeaf {
    fn matches(&self, item_id: &str, metadata: u16, tag: Option<&serde_json::Value>) -> bool {
        if self.item_id != item_id || !self.metadata.accepts(metadata) {
            return false;
        }
        match &self.tag {
            Some(required) => tag == Some(required),
            None => true,
        }
    }

    /// Tag equality is stricter than a metadata constraint, which is stricter
    /// than a wildcard.
    fn specificity(&self) -> u8 {
        if self.tag.is_some() {
            2
        } else if self.metadata == MetadataMatch::Any {
            0
        } else {
            1
        }
    }
}

// --- The Tree ---

/// Category hierarchy that assigns matching item stacks a sort rank.
///
/// Built once from configuration data and read-only afterwards; a reload
/// builds a fresh tree and swaps it in whole, so readers never observe a
/// half-built hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemTree {
    categories: Vec<CategoryNode>,
    leaves: Vec<ItemLeaf>,
    by_name: HashMap<String, usize>,
    by_item_id: HashMap<String, Vec<usize>>,
}

impl ItemTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a category under `parent` (`None` makes a new root) and returns
    /// its node index. An unknown parent is logged and the category becomes a
    /// root; a duplicate name returns the existing node.
    pub fn add_category(&mut self, parent: Option<&str>, name: &str) -> usize {
        let key = name.to_ascii_lowercase();
        if let Some(&existing) = self.by_name.get(&key) {
            log::warn!("[Tree] Category '{}' already exists", name);
            return existing;
        }
        let parent_index = match parent {
            Some(parent_name) => {
                let found = self.by_name.get(&parent_name.to_ascii_lowercase()).copied();
                if found.is_none() {
                    log::warn!(
                        "[Tree] Parent category '{}' not found, '{}' becomes a root",
                        parent_name,
                        name
                    );
                }
                found
            }
            None => None,
        };
        let index = self.categories.len();
        self.categories.push(CategoryNode {
            name: key.clone(),
            parent: parent_index,
            children: Vec::new(),
            leaves: Vec::new(),
        });
        if let Some(parent_index) = parent_index {
            self.categories[parent_index].children.push(index);
        }
        self.by_name.insert(key, index);
        index
    }

    /// Adds an item leaf under a category and returns its rank. Ranks follow
    /// declaration order across the whole tree.
    pub fn add_item(
        &mut self,
        category: &str,
        name: &str,
        item_id: &str,
        metadata: MetadataMatch,
        tag: Option<serde_json::Value>,
    ) -> u32 {
        let category_index = match self.by_name.get(&category.to_ascii_lowercase()) {
            Some(&index) => index,
            None => {
                log::warn!("[Tree] Category '{}' not declared, creating it as a root", category);
                self.add_category(None, category)
            }
        };
        let order = self.leaves.len() as u32;
        let leaf_index = self.leaves.len();
        self.leaves.push(ItemLeaf {
            name: name.to_ascii_lowercase(),
            item_id: item_id.to_string(),
            metadata,
            tag,
            order,
            category: category_index,
        });
        self.categories[category_index].leaves.push(leaf_index);
        self.by_item_id.entry(item_id.to_string()).or_default().push(leaf_index);
        order
    }

    /// All leaves matching the given stack attributes, most specific first;
    /// equally specific leaves keep declaration order.
    pub fn lookup(
        &self,
        item_id: &str,
        metadata: u16,
        tag: Option<&serde_json::Value>,
    ) -> Vec<&ItemLeaf> {
        let indices = match self.by_item_id.get(item_id) {
            Some(list) => list,
            None => return Vec::new(),
        };
        let mut matches: Vec<&ItemLeaf> = indices
            .iter()
            .map(|&index| &self.leaves[index])
            .filter(|leaf| leaf.matches(item_id, metadata, tag))
            .collect();
        matches.sort_by(|a, b| {
            b.specificity().cmp(&a.specificity()).then(a.order.cmp(&b.order))
        });
        matches
    }

    /// Rank of the most specific leaf matching `stack`, or [`UNRANKED`].
    /// Empty stacks never rank.
    pub fn order_of(&self, stack: &ItemStack) -> u32 {
        if stack.is_empty() {
            return UNRANKED;
        }
        self.lookup(&stack.item_id, stack.metadata, stack.tag.as_ref())
            .first()
            .map(|leaf| leaf.order)
            .unwrap_or(UNRANKED)
    }

    /// True when `keyword` names the leaf itself or any category above it.
    pub fn matches_keyword(&self, leaf: &ItemLeaf, keyword: &str) -> bool {
        let keyword = keyword.to_ascii_lowercase();
        if leaf.name == keyword {
            return true;
        }
        let mut cursor = Some(leaf.category);
        while let Some(index) = cursor {
            let node = &self.categories[index];
            if node.name == keyword {
                return true;
            }
            cursor = node.parent;
        }
        false
    }

    /// Highest rank the tree declares. Ranks beyond it were produced by some
    /// other tree build.
    pub fn last_order(&self) -> u32 {
        (self.leaves.len() as u32).saturating_sub(1)
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_tree() -> ItemTree {
        let mut tree = ItemTree::new();
        tree.add_category(None, "equipment");
        tree.add_category(Some("equipment"), "tools");
        tree.add_category(Some("equipment"), "weapons");
        tree.add_category(None, "materials");
        tree.add_item("tools", "stone_pickaxe", "survival:stone_pickaxe", MetadataMatch::Any, None);
        tree.add_item("weapons", "stone_sword", "survival:stone_sword", MetadataMatch::Any, None);
        tree.add_item("materials", "wood", "survival:wood", MetadataMatch::Any, None);
        tree
    }

    #[test]
    fn ranks_follow_declaration_order() {
        let tree = sample_tree();
        let pickaxe = ItemStack::new("survival:stone_pickaxe", 1);
        let sword = ItemStack::new("survival:stone_sword", 1);
        let wood = ItemStack::new("survival:wood", 8);
        assert_eq!(tree.order_of(&pickaxe), 0);
        assert_eq!(tree.order_of(&sword), 1);
        assert_eq!(tree.order_of(&wood), 2);
        assert_eq!(tree.last_order(), 2);
    }

    #[test]
    fn unknown_and_empty_stacks_are_unranked() {
        let tree = sample_tree();
        let modded = ItemStack::new("modded:gadget", 1);
        let empty = ItemStack::new("survival:wood", 0);
        assert_eq!(tree.order_of(&modded), UNRANKED);
        assert_eq!(tree.order_of(&empty), UNRANKED);
    }

    #[test]
    fn most_specific_leaf_wins() {
        let mut tree = ItemTree::new();
        tree.add_category(None, "materials");
        let wildcard = tree.add_item("materials", "wood", "survival:wood", MetadataMatch::Any, None);
        let charred =
            tree.add_item("materials", "charred_wood", "survival:wood", MetadataMatch::Exact(1), None);
        let blessed = tree.add_item(
            "materials",
            "blessed_wood",
            "survival:wood",
            MetadataMatch::Any,
            Some(json!({"blessed": true})),
        );

        let plain = tree.lookup("survival:wood", 0, None);
        assert_eq!(plain[0].order, wildcard);

        let variant = tree.lookup("survival:wood", 1, None);
        assert_eq!(variant[0].order, charred);
        assert_eq!(variant[1].order, wildcard);

        let tag = json!({"blessed": true});
        let tagged = tree.lookup("survival:wood", 1, Some(&tag));
        assert_eq!(tagged[0].order, blessed);
        assert_eq!(tagged[1].order, charred);
        assert_eq!(tagged[2].order, wildcard);
    }

    #[test]
    fn tag_leaves_require_equal_payload() {
        let mut tree = ItemTree::new();
        tree.add_category(None, "materials");
        tree.add_item(
            "materials",
            "blessed_wood",
            "survival:wood",
            MetadataMatch::Any,
            Some(json!({"blessed": true})),
        );
        let wrong_tag = json!({"blessed": false});
        assert!(tree.lookup("survival:wood", 0, Some(&wrong_tag)).is_empty());
        assert!(tree.lookup("survival:wood", 0, None).is_empty());
    }

    #[test]
    fn metadata_range_is_inclusive() {
        let range = MetadataMatch::Range(10, 20);
        assert!(!range.accepts(9));
        assert!(range.accepts(10));
        assert!(range.accepts(20));
        assert!(!range.accepts(21));
    }

    #[test]
    fn keyword_matches_leaf_and_ancestors() {
        let tree = sample_tree();
        let leaf = tree.lookup("survival:stone_pickaxe", 0, None)[0];
        assert!(tree.matches_keyword(leaf, "stone_pickaxe"));
        assert!(tree.matches_keyword(leaf, "tools"));
        assert!(tree.matches_keyword(leaf, "EQUIPMENT"));
        assert!(!tree.matches_keyword(leaf, "weapons"));
        assert!(!tree.matches_keyword(leaf, "materials"));
    }

    #[test]
    fn unknown_parent_becomes_root() {
        let mut tree = ItemTree::new();
        tree.add_category(Some("missing"), "orphans");
        tree.add_item("orphans", "widget", "modded:widget", MetadataMatch::Any, None);
        let leaf = tree.lookup("modded:widget", 0, None)[0];
        assert!(tree.matches_keyword(leaf, "orphans"));
        assert!(!tree.matches_keyword(leaf, "missing"));
    }
}

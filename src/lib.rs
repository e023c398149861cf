//! Inventory ordering for slot-based containers.
//!
//! A configured category tree assigns every item stack a rank, a comparator
//! turns those ranks into a strict total order, and the sorting, placement
//! and refill engines rearrange containers through a move primitive that a
//! host is always free to refuse. Engines take `&mut` container views, so a
//! container is only ever rearranged by one invocation at a time; hosts
//! without native containers can use [`BasicContainer`].

pub mod compare;
pub mod config;
pub mod container;
pub mod error;
pub mod items;
pub mod placement;
pub mod refill;
pub mod sorting;
pub mod tree;

pub use compare::{compare_stacks, compare_stacks_traced, CompareMode, SortContext, TraceStep};
pub use config::{Config, SortOptions, SortRule, SortTrigger};
pub use container::{BasicContainer, ContainerView, Section};
pub use error::{Result, SortError};
pub use items::{
    calculate_merge_result, derive_tool_class, tool_equipment, ArmorSlot, Enchantment, Equipment,
    ItemCatalog, ItemDefinition, ItemStack, ToolFallback,
};
pub use placement::{place, preferred_slots_for, PickupMonitor};
pub use refill::{auto_refill, RefillMonitor};
pub use sorting::{
    sort_section, SortStrategy, StrategyCycler, STRATEGY_CYCLE_MAX_WIDTH,
    STRATEGY_CYCLE_WINDOW_MS,
};
pub use tree::{CategoryNode, ItemLeaf, ItemTree, MetadataMatch, UNRANKED};

use thiserror::Error;

use crate::container::Section;

/// Faults raised by the sorting/placement engines and container views.
///
/// Expected outcomes are *not* errors: an unranked item flows through the
/// comparator with the unranked sentinel, a refused move is an `Ok(false)`,
/// and a full container is a "nothing placed" result. This enum is reserved
/// for contract violations and container faults that abort the remainder of
/// an invocation.
#[derive(Debug, Error)]
pub enum SortError {
    #[error("Slot index {slot} out of bounds (container has {size} slots)")]
    SlotOutOfBounds { slot: usize, size: usize },

    #[error("Container has no {0:?} section")]
    UnknownSection(Section),

    #[error("Container fault: {0}")]
    ContainerFault(String),
}

pub type Result<T> = std::result::Result<T, SortError>;

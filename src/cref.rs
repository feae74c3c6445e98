use std::fmt::{Debug, Formatter};

/// Non-owning handle to a clause in the [`ClauseAllocator`][crate::clause_allocator::ClauseAllocator].
///
/// Handles are invalidated by arena consolidation; every component holding
/// one must apply the remap produced by `consolidate`.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct ClauseRef(pub(crate) u32);

impl ClauseRef {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Debug for ClauseRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a device object (texture, view, render pass, semaphore...)
///
/// Ids are never recycled: a cache key that captured the id of a destroyed
/// object can never alias a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Raw numeric value
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out unique, monotonically increasing [`ResourceId`]s.
///
/// Owned by a graphics device and shared by reference with every object it
/// creates; there is no process-wide counter.
///
/// # Example
///
/// ```ignore
/// let ids = IdAllocator::new();
/// let a = ids.allocate();  // #1
/// let b = ids.allocate();  // #2
/// assert!(a < b);
/// ```
#[derive(Debug)]
pub struct IdAllocator {
    next_id: AtomicU64,
}

impl IdAllocator {
    /// Create an allocator whose first id is #1
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate the next id
    pub fn allocate(&self) -> ResourceId {
        ResourceId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of ids handed out so far
    pub fn allocated(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed) - 1
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "id_allocator_tests.rs"]
mod tests;

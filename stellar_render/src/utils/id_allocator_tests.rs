use super::*;
use std::collections::HashSet;
use std::sync::Arc;

// ============================================================================
// Basic allocation tests
// ============================================================================

#[test]
fn test_sequential_ids() {
    let ids = IdAllocator::new();
    assert_eq!(ids.allocate().raw(), 1);
    assert_eq!(ids.allocate().raw(), 2);
    assert_eq!(ids.allocate().raw(), 3);
    assert_eq!(ids.allocated(), 3);
}

#[test]
fn test_default_starts_empty() {
    let ids = IdAllocator::default();
    assert_eq!(ids.allocated(), 0);
}

#[test]
fn test_display() {
    let ids = IdAllocator::new();
    assert_eq!(ids.allocate().to_string(), "#1");
}

#[test]
fn test_independent_allocators_do_not_share_state() {
    let a = IdAllocator::new();
    let b = IdAllocator::new();
    a.allocate();
    a.allocate();
    assert_eq!(b.allocate().raw(), 1);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_ids_unique_across_threads() {
    let ids = Arc::new(IdAllocator::new());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ids = ids.clone();
            std::thread::spawn(move || (0..250).map(|_| ids.allocate()).collect::<Vec<_>>())
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(seen.insert(id), "duplicate id {}", id);
        }
    }
    assert_eq!(seen.len(), 1000);
}

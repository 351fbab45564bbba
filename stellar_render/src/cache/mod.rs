/// Cache module - content-addressed caches with frame-based eviction

pub mod structural_cache;
pub mod resource_caches;

pub use structural_cache::*;
pub use resource_caches::*;

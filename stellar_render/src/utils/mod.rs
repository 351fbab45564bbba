mod id_allocator;

pub use id_allocator::{IdAllocator, ResourceId};

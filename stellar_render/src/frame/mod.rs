/// Frame module - frame-in-flight ring, scratch memory and deferred deletion

pub mod scratch_allocator;
pub mod deferred_deletion;
pub mod event;
pub mod thread_session;
pub mod frame_context;
pub mod frame_lifecycle_manager;

pub use scratch_allocator::*;
pub use deferred_deletion::*;
pub use event::*;
pub use thread_session::*;
pub use frame_context::*;
pub use frame_lifecycle_manager::*;

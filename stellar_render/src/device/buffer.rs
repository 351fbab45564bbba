/// Buffer trait and buffer descriptor

use std::ptr::NonNull;
use crate::error::Result;
use crate::utils::ResourceId;

/// Buffer usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Vertex buffer
    Vertex,
    /// Index buffer
    Index,
    /// Uniform/constant buffer
    Uniform,
    /// Storage buffer
    Storage,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Debug name attached to the native object
    pub debug_name: String,
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
}

/// Buffer resource trait
///
/// Buffers created through `GraphicsDevice::create_buffer` live in
/// host-visible memory and stay mapped for their whole lifetime.
/// The buffer is automatically destroyed when dropped.
pub trait Buffer: Send + Sync {
    /// Unique id of this buffer
    fn id(&self) -> ResourceId;

    /// Size in bytes
    fn size(&self) -> u64;

    /// Usage the buffer was created with
    fn usage(&self) -> BufferUsage;

    /// Pointer to the start of the persistent mapping
    fn mapped_ptr(&self) -> Option<NonNull<u8>>;

    /// Copy `data` into the buffer at `offset`
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;
}

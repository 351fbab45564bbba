/// Linear bump allocator over one persistently mapped buffer

use std::ptr::NonNull;
use std::sync::Arc;
use bytemuck::Pod;
use crate::device::{Buffer, BufferDesc, BufferUsage, GraphicsDevice};
use crate::error::{Error, Result};
use crate::engine_fatal;

/// Minimum alignment of every scratch allocation
pub const MIN_SCRATCH_ALIGNMENT: u64 = 16;

/// A range of scratch memory, valid until its allocator is reset
///
/// Holds a reference to the backing buffer, so the mapping outlives every
/// allocation made from it.
pub struct ScratchAllocation {
    buffer: Arc<dyn Buffer>,
    offset: u64,
    size: u64,
    ptr: NonNull<u8>,
}

// SAFETY: the pointer targets the persistent mapping of `buffer`, which the
// allocation keeps alive; allocations never overlap.
unsafe impl Send for ScratchAllocation {}

impl ScratchAllocation {
    /// Backing buffer
    pub fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }

    /// Offset of the allocation inside the buffer
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Rounded size of the allocation
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Host pointer to the first byte of the allocation
    pub fn mapped_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Copy `data` to the start of the allocation
    pub fn write_bytes(&mut self, data: &[u8]) {
        assert!(
            data.len() as u64 <= self.size,
            "scratch write of {} bytes into a {} byte allocation", data.len(), self.size);
        // SAFETY: the range [ptr, ptr + size) belongs to this allocation only
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), self.ptr.as_ptr(), data.len());
        }
    }

    /// Copy a slice of plain-old-data values to the start of the allocation
    pub fn write<T: Pod>(&mut self, data: &[T]) {
        self.write_bytes(bytemuck::cast_slice(data));
    }
}

/// Linear bump allocator over a host-visible buffer
///
/// Allocations are never freed individually; the whole allocator is reset
/// once per frame (or per worker thread frame). Running out of capacity is
/// fatal: capacities are configuration values, not grown on demand.
///
/// # Example
///
/// ```ignore
/// let mut scratch = ScratchAllocator::new(&device, BufferUsage::Uniform, 1 << 20, 256, "ubo")?;
/// let a = scratch.allocate(10);   // offset 0
/// let b = scratch.allocate(20);   // offset 256
/// scratch.reset();
/// ```
pub struct ScratchAllocator {
    label: String,
    buffer: Arc<dyn Buffer>,
    base: NonNull<u8>,
    capacity: u64,
    alignment: u64,
    offset: u64,
    high_water_mark: u64,
}

// SAFETY: `base` points into the mapping of `buffer`, owned through the Arc.
unsafe impl Send for ScratchAllocator {}

impl ScratchAllocator {
    /// Create an allocator over a new buffer of `capacity` bytes
    ///
    /// `alignment` must be a power of two; it is raised to at least
    /// [`MIN_SCRATCH_ALIGNMENT`].
    pub fn new(
        device: &dyn GraphicsDevice,
        usage: BufferUsage,
        capacity: u64,
        alignment: u64,
        label: &str,
    ) -> Result<Self> {
        let buffer = device.create_buffer(&BufferDesc {
            debug_name: label.to_string(),
            size: capacity,
            usage,
        })?;
        Self::from_buffer(buffer, alignment, label)
    }

    /// Create an allocator over an existing persistently mapped buffer
    pub fn from_buffer(buffer: Arc<dyn Buffer>, alignment: u64, label: &str) -> Result<Self> {
        if !alignment.is_power_of_two() {
            return Err(Error::InvalidResource(format!(
                "scratch allocator '{}': alignment {} is not a power of two", label, alignment)));
        }
        let Some(base) = buffer.mapped_ptr() else {
            return Err(Error::InvalidResource(format!(
                "scratch allocator '{}': buffer is not host mapped", label)));
        };
        Ok(Self {
            label: label.to_string(),
            capacity: buffer.size(),
            buffer,
            base,
            alignment: alignment.max(MIN_SCRATCH_ALIGNMENT),
            offset: 0,
            high_water_mark: 0,
        })
    }

    /// Allocate `size` bytes (rounded up to the alignment)
    ///
    /// # Panics
    ///
    /// Panics when the remaining capacity is smaller than the rounded size.
    pub fn allocate(&mut self, size: u64) -> ScratchAllocation {
        let end = align_up(size, self.alignment)
            .and_then(|rounded| self.offset.checked_add(rounded))
            .filter(|&end| end <= self.capacity);
        let Some(end) = end else {
            engine_fatal!("stellar::ScratchAllocator",
                "Scratch allocator '{}' overflow: {} bytes requested, {} of {} used",
                self.label, size, self.offset, self.capacity);
        };

        let offset = self.offset;
        self.offset = end;
        self.high_water_mark = self.high_water_mark.max(end);
        ScratchAllocation {
            buffer: self.buffer.clone(),
            offset,
            size: end - offset,
            // SAFETY: offset + rounded <= capacity, inside the mapping
            ptr: unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset as usize)) },
        }
    }

    /// Allocate room for `data` and copy it in
    pub fn upload<T: Pod>(&mut self, data: &[T]) -> ScratchAllocation {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let mut allocation = self.allocate(bytes.len() as u64);
        allocation.write_bytes(bytes);
        allocation
    }

    /// Release every allocation at once
    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Bytes allocated since the last reset
    pub fn used(&self) -> u64 {
        self.offset
    }

    /// Bytes still available
    pub fn remaining(&self) -> u64 {
        self.capacity - self.offset
    }

    /// Total capacity in bytes
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Alignment applied to every allocation
    pub fn alignment(&self) -> u64 {
        self.alignment
    }

    /// Largest `used()` value ever reached
    pub fn high_water_mark(&self) -> u64 {
        self.high_water_mark
    }

    /// Backing buffer
    pub fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }
}

/// `None` when rounding up would not fit in a u64
fn align_up(value: u64, alignment: u64) -> Option<u64> {
    value.checked_add(alignment - 1).map(|v| v & !(alignment - 1))
}

// ===== SCRATCH SET =====

/// Kind of data a scratch allocator holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScratchKind {
    Vertex,
    Index,
    Uniform,
    Storage,
}

/// The four scratch allocators of one frame context or worker thread
pub struct ScratchSet {
    pub vertex: ScratchAllocator,
    pub index: ScratchAllocator,
    pub uniform: ScratchAllocator,
    pub storage: ScratchAllocator,
}

impl ScratchSet {
    /// Create the four allocators with the sizes of `config`
    ///
    /// Uniform and storage allocations honor the device's offset alignments
    /// so they can be bound with dynamic offsets.
    pub fn new(device: &dyn GraphicsDevice, config: &crate::config::FrameConfig, label: &str) -> Result<Self> {
        let limits = device.limits();
        Ok(Self {
            vertex: ScratchAllocator::new(
                device, BufferUsage::Vertex, config.vertex_scratch_size,
                MIN_SCRATCH_ALIGNMENT, &format!("{}.vbo", label))?,
            index: ScratchAllocator::new(
                device, BufferUsage::Index, config.index_scratch_size,
                MIN_SCRATCH_ALIGNMENT, &format!("{}.ibo", label))?,
            uniform: ScratchAllocator::new(
                device, BufferUsage::Uniform, config.uniform_scratch_size,
                limits.min_uniform_buffer_offset_alignment, &format!("{}.ubo", label))?,
            storage: ScratchAllocator::new(
                device, BufferUsage::Storage, config.storage_scratch_size,
                limits.min_storage_buffer_offset_alignment, &format!("{}.ssbo", label))?,
        })
    }

    /// Allocator for `kind`
    pub fn get(&mut self, kind: ScratchKind) -> &mut ScratchAllocator {
        match kind {
            ScratchKind::Vertex => &mut self.vertex,
            ScratchKind::Index => &mut self.index,
            ScratchKind::Uniform => &mut self.uniform,
            ScratchKind::Storage => &mut self.storage,
        }
    }

    /// Reset all four allocators to offset 0
    pub fn reset(&mut self) {
        self.vertex.reset();
        self.index.reset();
        self.uniform.reset();
        self.storage.reset();
    }

    /// Total bytes allocated since the last reset
    pub fn used(&self) -> u64 {
        self.vertex.used() + self.index.used() + self.uniform.used() + self.storage.used()
    }
}

#[cfg(test)]
#[path = "scratch_allocator_tests.rs"]
mod tests;

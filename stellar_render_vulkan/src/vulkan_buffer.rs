/// VulkanBuffer - host-visible, persistently mapped buffer

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::ptr::NonNull;
use std::sync::Arc;
use stellar_render::stellar::device::{Buffer, BufferDesc, BufferUsage};
use stellar_render::stellar::utils::ResourceId;
use stellar_render::stellar::{Error, Result};
use stellar_render::{engine_bail, engine_error};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{buffer_usage_to_vk, vk_error};

const SOURCE: &str = "stellar::vulkan::Buffer";

/// Vulkan buffer implementation
pub struct VulkanBuffer {
    /// Shared GPU context (device, allocator)
    ctx: Arc<GpuContext>,
    id: ResourceId,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    allocation: Option<Allocation>,
    size: u64,
    usage: BufferUsage,
}

impl VulkanBuffer {
    pub(crate) fn create(ctx: &Arc<GpuContext>, desc: &BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            engine_error!(SOURCE, "Buffer '{}' has size 0", desc.debug_name);
            return Err(Error::InvalidResource(format!("buffer '{}' has size 0", desc.debug_name)));
        }

        let buffer_create_info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(buffer_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        unsafe {
            let buffer = ctx.device.create_buffer(&buffer_create_info, None)
                .map_err(|e| vk_error(SOURCE, "Failed to create buffer", e))?;

            let mut vulkan_buffer = Self {
                ctx: Arc::clone(ctx),
                id: ctx.next_id(),
                buffer,
                allocation: None,
                size: desc.size,
                usage: desc.usage,
            };

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let allocation = ctx.allocator()
                .allocate(&AllocationCreateDesc {
                    name: &desc.debug_name,
                    requirements,
                    location: MemoryLocation::CpuToGpu,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|_| {
                    engine_error!(SOURCE, "Out of GPU memory for buffer '{}' ({} bytes)",
                        desc.debug_name, desc.size);
                    Error::OutOfMemory
                })?;

            ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .map_err(|e| vk_error(SOURCE, "Failed to bind buffer memory", e))?;
            vulkan_buffer.allocation = Some(allocation);

            if vulkan_buffer.mapped_ptr().is_none() {
                engine_bail!(SOURCE, "Buffer '{}' memory is not host-visible", desc.debug_name);
            }

            ctx.set_debug_name(buffer, &desc.debug_name);
            Ok(vulkan_buffer)
        }
    }

    /// Reinterpret a buffer created by this backend
    pub(crate) fn from_dyn(buffer: &dyn Buffer) -> &Self {
        // SAFETY: every `dyn Buffer` handed to this backend was created by VulkanDevice
        unsafe { &*(buffer as *const dyn Buffer as *const Self) }
    }
}

impl Buffer for VulkanBuffer {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn mapped_ptr(&self) -> Option<NonNull<u8>> {
        self.allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_ptr())
            .map(|ptr| ptr.cast::<u8>())
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset.checked_add(data.len() as u64);
        if end.map_or(true, |end| end > self.size) {
            engine_error!(SOURCE, "Buffer update out of bounds: offset {} + {} bytes > size {}",
                offset, data.len(), self.size);
            return Err(Error::InvalidResource(format!(
                "buffer update of {} bytes at offset {} exceeds size {}",
                data.len(), offset, self.size
            )));
        }

        let Some(mapped) = self.mapped_ptr() else {
            engine_bail!(SOURCE, "Buffer update failed: no mapped GPU allocation");
        };

        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                mapped.as_ptr().add(offset as usize),
                data.len(),
            );
        }
        Ok(())
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                self.ctx.allocator().free(allocation).ok();
            }
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}

/// Fences and semaphores

use ash::vk;
use std::sync::Arc;
use stellar_render::stellar::device::{Fence, Semaphore};
use stellar_render::stellar::utils::ResourceId;
use stellar_render::stellar::Result;
use stellar_render::engine_err;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::vk_error;

const SOURCE: &str = "stellar::vulkan::Sync";

/// Vulkan fence implementation
pub struct VulkanFence {
    ctx: Arc<GpuContext>,
    id: ResourceId,
    pub(crate) fence: vk::Fence,
}

impl VulkanFence {
    pub(crate) fn create(ctx: &Arc<GpuContext>, signaled: bool) -> Result<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe {
            ctx.device.create_fence(&create_info, None)
                .map_err(|e| vk_error(SOURCE, "Failed to create fence", e))?
        };
        Ok(Self {
            ctx: Arc::clone(ctx),
            id: ctx.next_id(),
            fence,
        })
    }

    pub(crate) fn from_dyn(fence: &dyn Fence) -> &Self {
        // SAFETY: every `dyn Fence` handed to this backend was created by VulkanDevice
        unsafe { &*(fence as *const dyn Fence as *const Self) }
    }
}

impl Fence for VulkanFence {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn wait(&self, timeout_ns: u64) -> Result<()> {
        unsafe {
            match self.ctx.device.wait_for_fences(&[self.fence], true, timeout_ns) {
                Ok(()) => Ok(()),
                Err(vk::Result::TIMEOUT) => Err(engine_err!(SOURCE,
                    "Fence wait timed out after {} ns", timeout_ns)),
                Err(e) => Err(vk_error(SOURCE, "Failed to wait for fence", e)),
            }
        }
    }

    fn reset(&self) -> Result<()> {
        unsafe {
            self.ctx.device.reset_fences(&[self.fence])
                .map_err(|e| vk_error(SOURCE, "Failed to reset fence", e))
        }
    }

    fn is_signaled(&self) -> Result<bool> {
        unsafe {
            self.ctx.device.get_fence_status(self.fence)
                .map_err(|e| vk_error(SOURCE, "Failed to query fence status", e))
        }
    }
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_fence(self.fence, None);
        }
    }
}

/// Vulkan binary semaphore implementation
pub struct VulkanSemaphore {
    ctx: Arc<GpuContext>,
    id: ResourceId,
    pub(crate) semaphore: vk::Semaphore,
}

impl VulkanSemaphore {
    pub(crate) fn create(ctx: &Arc<GpuContext>) -> Result<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe {
            ctx.device.create_semaphore(&create_info, None)
                .map_err(|e| vk_error(SOURCE, "Failed to create semaphore", e))?
        };
        Ok(Self {
            ctx: Arc::clone(ctx),
            id: ctx.next_id(),
            semaphore,
        })
    }

    pub(crate) fn from_dyn(semaphore: &dyn Semaphore) -> &Self {
        // SAFETY: every `dyn Semaphore` handed to this backend was created by VulkanDevice
        unsafe { &*(semaphore as *const dyn Semaphore as *const Self) }
    }
}

impl Semaphore for VulkanSemaphore {
    fn id(&self) -> ResourceId {
        self.id
    }
}

impl Drop for VulkanSemaphore {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// GpuContext - Shared Vulkan state for every object created by a VulkanDevice
///
/// Contains everything needed for GPU operations:
/// - Instance and logical device
/// - Allocator for memory management
/// - Graphics/present queues behind a submission lock
/// - The id allocator handing out ResourceIds
///
/// Every backend object keeps an `Arc<GpuContext>`, so the device and the
/// instance are destroyed only after the last object that uses them.

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard, PoisonError};
use stellar_render::stellar::device::DeviceLimits;
use stellar_render::stellar::utils::{IdAllocator, ResourceId};

/// Graphics and present queues (may be the same queue)
#[derive(Clone, Copy)]
pub(crate) struct Queues {
    pub graphics: vk::Queue,
    pub present: vk::Queue,
}

/// Debug-utils state, present when validation is enabled
pub(crate) struct DebugUtils {
    pub instance_loader: ash::ext::debug_utils::Instance,
    pub device_loader: ash::ext::debug_utils::Device,
    pub messenger: vk::DebugUtilsMessengerEXT,
}

/// Shared GPU context for all Vulkan resources.
pub(crate) struct GpuContext {
    /// Vulkan loader (must outlive the instance)
    pub entry: ash::Entry,
    /// Vulkan instance
    pub instance: ash::Instance,
    /// Selected physical device
    pub physical_device: vk::PhysicalDevice,
    /// Vulkan logical device
    pub device: ash::Device,
    /// GPU memory allocator, dropped before the device is destroyed
    pub allocator: ManuallyDrop<Mutex<Allocator>>,
    /// Graphics queue family index
    pub graphics_queue_family: u32,
    /// Present queue family index
    pub present_queue_family: u32,
    /// Queues; Vulkan requires external synchronization of queue access
    queues: Mutex<Queues>,
    /// Sampler used by every combined image sampler descriptor
    pub default_sampler: vk::Sampler,
    /// Limits reported to the frame layer
    pub limits: DeviceLimits,
    /// Source of ResourceIds for every object of this device
    ids: IdAllocator,
    /// Debug messenger and object naming
    pub debug_utils: Option<DebugUtils>,
}

impl GpuContext {
    /// Create a new GPU context
    ///
    /// Takes ownership of the instance, device and allocator: they are
    /// destroyed when the context drops.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        allocator: Allocator,
        graphics_queue_family: u32,
        present_queue_family: u32,
        queues: Queues,
        default_sampler: vk::Sampler,
        limits: DeviceLimits,
        debug_utils: Option<DebugUtils>,
    ) -> Self {
        Self {
            entry,
            instance,
            physical_device,
            device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            graphics_queue_family,
            present_queue_family,
            queues: Mutex::new(queues),
            default_sampler,
            limits,
            ids: IdAllocator::new(),
            debug_utils,
        }
    }

    /// Allocate a ResourceId for a new object
    pub fn next_id(&self) -> ResourceId {
        self.ids.allocate()
    }

    /// Lock the queues for a submission or a present
    pub fn queues(&self) -> MutexGuard<'_, Queues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the memory allocator
    pub fn allocator(&self) -> MutexGuard<'_, Allocator> {
        self.allocator.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a debug name to a Vulkan handle (no-op without debug utils)
    pub fn set_debug_name<H: vk::Handle>(&self, handle: H, name: &str) {
        let Some(debug_utils) = &self.debug_utils else {
            return;
        };
        let Ok(name) = std::ffi::CString::new(name) else {
            return;
        };
        let info = vk::DebugUtilsObjectNameInfoEXT::default()
            .object_handle(handle)
            .object_name(&name);
        unsafe {
            debug_utils.device_loader.set_debug_utils_object_name(&info).ok();
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            self.device.destroy_sampler(self.default_sampler, None);

            // Free VkDeviceMemory pages BEFORE destroying the device
            ManuallyDrop::drop(&mut self.allocator);

            #[cfg(feature = "vulkan-validation")]
            crate::debug::cleanup_debug_config();

            if let Some(debug_utils) = &self.debug_utils {
                debug_utils.instance_loader.destroy_debug_utils_messenger(debug_utils.messenger, None);
            }

            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

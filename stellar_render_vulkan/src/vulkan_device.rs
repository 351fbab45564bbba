/// VulkanDevice - Vulkan implementation of GraphicsDevice
///
/// Owns the shared GpuContext. Every object it creates holds the context, so
/// the device may be dropped before the objects it created.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CString;
use std::sync::Arc;
use stellar_render::stellar::device::{
    Buffer, BufferDesc, CommandList, DescriptorPool, DescriptorPoolDesc, DeviceLimits, Fence,
    Framebuffer, FramebufferDesc, GraphicsDevice, Pipeline, PipelineDesc, RenderPass,
    RenderPassDesc, RenderTarget, Semaphore, SubmitInfo, Swapchain, Texture, TextureDesc,
};
use stellar_render::stellar::{Error, Result};
use stellar_render::{engine_bail, engine_error, engine_info, engine_warn};

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_command_list::VulkanCommandList;
use crate::vulkan_config::VulkanConfig;
use crate::vulkan_context::{DebugUtils, GpuContext, Queues};
use crate::vulkan_descriptor::VulkanDescriptorPool;
use crate::vulkan_format::vk_error;
use crate::vulkan_framebuffer::VulkanFramebuffer;
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_swapchain::{SurfaceShared, VulkanSwapchain};
use crate::vulkan_sync::{VulkanFence, VulkanSemaphore};
use crate::vulkan_texture::{VulkanRenderTarget, VulkanTexture};

const SOURCE: &str = "stellar::vulkan";

fn init_error(what: &str, detail: impl std::fmt::Debug) -> Error {
    engine_error!(SOURCE, "{}: {:?}", what, detail);
    Error::InitializationFailed(format!("{}: {:?}", what, detail))
}

/// Preference of a physical device type (higher is better)
pub(crate) fn device_type_score(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 3,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 2,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 1,
        _ => 0,
    }
}

/// Physical device chosen for rendering and its queue families
struct SelectedDevice {
    physical_device: vk::PhysicalDevice,
    graphics_family: u32,
    present_family: u32,
}

/// Pick the best device with a graphics queue, presentation to `surface`
/// and swapchain support
unsafe fn select_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<SelectedDevice> {
    let physical_devices = instance.enumerate_physical_devices()
        .map_err(|e| init_error("Failed to enumerate physical devices", e))?;

    let mut best: Option<(u32, SelectedDevice)> = None;
    for physical_device in physical_devices {
        let has_swapchain = instance.enumerate_device_extension_properties(physical_device)
            .map(|extensions| extensions.iter().any(|ext| {
                ext.extension_name_as_c_str().is_ok_and(|name| name == ash::khr::swapchain::NAME)
            }))
            .unwrap_or(false);
        if !has_swapchain {
            continue;
        }

        let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
        let Some(graphics_family) = queue_families.iter()
            .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|i| i as u32)
        else {
            continue;
        };
        let supports_present = |family: u32| {
            surface_loader
                .get_physical_device_surface_support(physical_device, family, surface)
                .unwrap_or(false)
        };
        // Same family for both when possible
        let present_family = if supports_present(graphics_family) {
            Some(graphics_family)
        } else {
            (0..queue_families.len() as u32).find(|&i| supports_present(i))
        };
        let Some(present_family) = present_family else {
            continue;
        };

        let properties = instance.get_physical_device_properties(physical_device);
        let score = device_type_score(properties.device_type);
        if best.as_ref().map_or(true, |(best_score, _)| score > *best_score) {
            best = Some((score, SelectedDevice { physical_device, graphics_family, present_family }));
        }
    }

    best.map(|(_, selected)| selected).ok_or_else(|| {
        engine_error!(SOURCE, "No Vulkan-capable GPU with graphics and presentation support found");
        Error::InitializationFailed("No suitable GPU found".to_string())
    })
}

#[cfg(feature = "vulkan-validation")]
unsafe fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
    config: &VulkanConfig,
) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

    crate::debug::init_debug_config(crate::debug::Config {
        severity: config.debug_severity,
        output: config.debug_output.clone(),
        message_filter: config.debug_message_filter,
        break_on_error: config.break_on_validation_error,
        panic_on_error: config.panic_on_error,
        enable_stats: config.enable_validation_stats,
    });

    let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(crate::debug::severity_flags(config.debug_severity))
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
        )
        .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

    let messenger = debug_utils.create_debug_utils_messenger(&debug_info, None)
        .map_err(|e| init_error("Failed to create debug messenger", e))?;
    Ok((debug_utils, messenger))
}

/// Vulkan graphics device
pub struct VulkanDevice {
    ctx: Arc<GpuContext>,
    config: VulkanConfig,
}

impl VulkanDevice {
    /// Create a Vulkan device able to present to `window`
    ///
    /// The window is only used to pick a GPU and queue family that can
    /// present to it; swapchains are created with `create_swapchain`.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: VulkanConfig) -> Result<Self> {
        let validation = cfg!(feature = "vulkan-validation") && config.enable_validation;
        if config.enable_validation && !validation {
            engine_warn!(SOURCE, "Validation requested but the `vulkan-validation` feature is disabled");
        }

        let display_handle = window.display_handle()
            .map_err(|e| init_error("Failed to get display handle", e))?;
        let window_handle = window.window_handle()
            .map_err(|e| init_error("Failed to get window handle", e))?;

        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| init_error("Failed to load Vulkan library", e))?;

            let app_name = CString::new(config.app_name.as_str())
                .map_err(|e| init_error("Invalid application name", e))?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Stellar")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_2);

            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| init_error("Failed to get required extensions", e))?
                .to_vec();
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }
            let layer_names = if validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);
            let instance = entry.create_instance(&create_info, None)
                .map_err(|e| init_error("Failed to create Vulkan instance", e))?;

            // Everything created from here on is released by `destroy_partial` on failure
            let destroy_partial = |instance: &ash::Instance| {
                #[cfg(feature = "vulkan-validation")]
                crate::debug::cleanup_debug_config();
                instance.destroy_instance(None);
            };

            #[cfg(feature = "vulkan-validation")]
            let messenger = if validation {
                match create_debug_messenger(&entry, &instance, &config) {
                    Ok(messenger) => Some(messenger),
                    Err(e) => {
                        destroy_partial(&instance);
                        return Err(e);
                    }
                }
            } else {
                None
            };
            #[cfg(not(feature = "vulkan-validation"))]
            let messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> = None;

            let destroy_partial = |instance: &ash::Instance| {
                if let Some((loader, messenger)) = &messenger {
                    loader.destroy_debug_utils_messenger(*messenger, None);
                }
                destroy_partial(instance);
            };

            // Temporary surface for queue selection
            let surface = match ash_window::create_surface(
                &entry, &instance, display_handle.as_raw(), window_handle.as_raw(), None,
            ) {
                Ok(surface) => surface,
                Err(e) => {
                    destroy_partial(&instance);
                    return Err(init_error("Failed to create surface", e));
                }
            };
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
            let selected = select_physical_device(&instance, &surface_loader, surface);
            surface_loader.destroy_surface(surface, None);
            let selected = match selected {
                Ok(selected) => selected,
                Err(e) => {
                    destroy_partial(&instance);
                    return Err(e);
                }
            };

            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(selected.graphics_family)
                    .queue_priorities(&queue_priorities),
            ];
            if selected.present_family != selected.graphics_family {
                queue_create_infos.push(vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(selected.present_family)
                    .queue_priorities(&queue_priorities));
            }
            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
            let device_features = vk::PhysicalDeviceFeatures::default();
            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = match instance.create_device(selected.physical_device, &device_create_info, None) {
                Ok(device) => device,
                Err(e) => {
                    destroy_partial(&instance);
                    return Err(vk_error(SOURCE, "Failed to create logical device", e));
                }
            };
            let destroy_partial = |device: &ash::Device, instance: &ash::Instance| {
                device.destroy_device(None);
                destroy_partial(instance);
            };

            let queues = Queues {
                graphics: device.get_device_queue(selected.graphics_family, 0),
                present: device.get_device_queue(selected.present_family, 0),
            };

            let allocator = match Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device: selected.physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            }) {
                Ok(allocator) => allocator,
                Err(e) => {
                    destroy_partial(&device, &instance);
                    return Err(init_error("Failed to create GPU allocator", e));
                }
            };

            let sampler_info = vk::SamplerCreateInfo::default()
                .mag_filter(vk::Filter::LINEAR)
                .min_filter(vk::Filter::LINEAR)
                .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
                .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                .max_lod(vk::LOD_CLAMP_NONE);
            let default_sampler = match device.create_sampler(&sampler_info, None) {
                Ok(sampler) => sampler,
                Err(e) => {
                    drop(allocator);
                    destroy_partial(&device, &instance);
                    return Err(vk_error(SOURCE, "Failed to create default sampler", e));
                }
            };

            let properties = instance.get_physical_device_properties(selected.physical_device);
            let limits = DeviceLimits {
                min_uniform_buffer_offset_alignment: properties.limits.min_uniform_buffer_offset_alignment,
                min_storage_buffer_offset_alignment: properties.limits.min_storage_buffer_offset_alignment,
                max_framebuffer_extent: properties.limits.max_framebuffer_width
                    .min(properties.limits.max_framebuffer_height),
            };
            engine_info!(SOURCE, "Using GPU '{}' ({:?}), graphics family {}, present family {}",
                properties.device_name_as_c_str().map(|name| name.to_string_lossy()).unwrap_or_default(),
                properties.device_type, selected.graphics_family, selected.present_family);

            let debug_utils = messenger.map(|(instance_loader, messenger)| DebugUtils {
                device_loader: ash::ext::debug_utils::Device::new(&instance, &device),
                instance_loader,
                messenger,
            });

            let ctx = Arc::new(GpuContext::new(
                entry,
                instance,
                selected.physical_device,
                device,
                allocator,
                selected.graphics_family,
                selected.present_family,
                queues,
                default_sampler,
                limits,
                debug_utils,
            ));

            Ok(Self { ctx, config })
        }
    }

    /// Create a swapchain presenting to `window`
    pub fn create_swapchain<W: HasDisplayHandle + HasWindowHandle>(
        &self,
        window: &W,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn Swapchain>> {
        let display_handle = window.display_handle()
            .map_err(|e| init_error("Failed to get display handle", e))?;
        let window_handle = window.window_handle()
            .map_err(|e| init_error("Failed to get window handle", e))?;

        let surface = unsafe {
            ash_window::create_surface(
                &self.ctx.entry,
                &self.ctx.instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| vk_error(SOURCE, "Failed to create surface", e))?
        };
        let surface = Arc::new(SurfaceShared::new(&self.ctx, surface));

        let swapchain = VulkanSwapchain::create(
            &self.ctx, surface, width, height, self.config.vsync, vk::SwapchainKHR::null(),
        )?;
        Ok(Box::new(swapchain))
    }

    /// Configuration the device was created with
    pub fn config(&self) -> &VulkanConfig {
        &self.config
    }
}

impl GraphicsDevice for VulkanDevice {
    fn limits(&self) -> DeviceLimits {
        self.ctx.limits
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn Texture>> {
        Ok(Arc::new(VulkanTexture::create(&self.ctx, desc)?))
    }

    fn create_render_target(&self, texture: &Arc<dyn Texture>) -> Result<Arc<dyn RenderTarget>> {
        Ok(Arc::new(VulkanRenderTarget::for_texture(&self.ctx, texture)?))
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        Ok(Arc::new(VulkanBuffer::create(&self.ctx, desc)?))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        Ok(Arc::new(VulkanRenderPass::create(&self.ctx, desc)?))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>> {
        Ok(Arc::new(VulkanFramebuffer::create(&self.ctx, desc)?))
    }

    fn create_pipeline(&self, desc: &PipelineDesc, render_pass: &Arc<dyn RenderPass>) -> Result<Arc<dyn Pipeline>> {
        Ok(Arc::new(VulkanPipeline::create(&self.ctx, desc, render_pass)?))
    }

    fn create_descriptor_pool(&self, desc: &DescriptorPoolDesc) -> Result<Box<dyn DescriptorPool>> {
        Ok(Box::new(VulkanDescriptorPool::create(&self.ctx, desc)?))
    }

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>> {
        Ok(Box::new(VulkanFence::create(&self.ctx, signaled)?))
    }

    fn create_semaphore(&self) -> Result<Box<dyn Semaphore>> {
        Ok(Box::new(VulkanSemaphore::create(&self.ctx)?))
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(VulkanCommandList::create(&self.ctx)?))
    }

    fn submit(&self, commands: &dyn CommandList, info: &SubmitInfo<'_>) -> Result<()> {
        let vk_commands = VulkanCommandList::from_dyn(commands);
        if !vk_commands.is_executable() {
            engine_bail!(SOURCE, "submit: command list is still recording");
        }

        let command_buffers = [vk_commands.command_buffer];
        let wait_semaphores: Vec<vk::Semaphore> = info.wait_semaphore
            .map(|s| VulkanSemaphore::from_dyn(s).semaphore)
            .into_iter()
            .collect();
        let wait_stages = vec![vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT; wait_semaphores.len()];
        let signal_semaphores: Vec<vk::Semaphore> = info.signal_semaphore
            .map(|s| VulkanSemaphore::from_dyn(s).semaphore)
            .into_iter()
            .collect();
        let fence = info.fence
            .map(|f| VulkanFence::from_dyn(f).fence)
            .unwrap_or_else(vk::Fence::null);

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        let queues = self.ctx.queues();
        unsafe {
            self.ctx.device.queue_submit(queues.graphics, &[submit_info], fence)
                .map_err(|e| vk_error(SOURCE, "Failed to submit commands to GPU queue", e))
        }
    }

    fn wait_idle(&self) -> Result<()> {
        // Device-wide wait requires every queue to be externally synchronized
        let _queues = self.ctx.queues();
        unsafe {
            self.ctx.device.device_wait_idle()
                .map_err(|e| vk_error(SOURCE, "Failed to wait for device idle", e))
        }
    }
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;

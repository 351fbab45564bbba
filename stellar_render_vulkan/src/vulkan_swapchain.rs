/// VulkanSwapchain - window presentation
///
/// Acquire and present report out-of-date and suboptimal surfaces as
/// outcomes. Recreation chains the retired swapchain as `old_swapchain`;
/// the retired one is destroyed once the last view of its images is gone.

use ash::vk;
use std::sync::Arc;
use stellar_render::stellar::device::{
    AcquireOutcome, PresentOutcome, RenderTarget, Semaphore, Swapchain, TextureFormat,
};
use stellar_render::stellar::utils::ResourceId;
use stellar_render::stellar::{Error, Result};
use stellar_render::{engine_bail, engine_debug, engine_error, engine_info};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{vk_error, vk_to_surface_format};
use crate::vulkan_sync::VulkanSemaphore;
use crate::vulkan_texture::VulkanRenderTarget;

const SOURCE: &str = "stellar::vulkan::Swapchain";

/// Window surface shared by a swapchain and its replacements
pub(crate) struct SurfaceShared {
    _ctx: Arc<GpuContext>,
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
}

impl SurfaceShared {
    pub(crate) fn new(ctx: &Arc<GpuContext>, surface: vk::SurfaceKHR) -> Self {
        Self {
            _ctx: Arc::clone(ctx),
            surface,
            surface_loader: ash::khr::surface::Instance::new(&ctx.entry, &ctx.instance),
        }
    }
}

impl Drop for SurfaceShared {
    fn drop(&mut self) {
        unsafe {
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

/// Native swapchain, destroyed when the swapchain and every view of its images are dropped
pub(crate) struct SwapchainHandle {
    surface: Arc<SurfaceShared>,
    loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
}

impl Drop for SwapchainHandle {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

/// Swapchain settings derived from the surface capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SwapchainSettings {
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub present_mode: vk::PresentModeKHR,
}

/// Extent for a requested size: the surface's current extent when it dictates
/// one, else the request clamped to the supported range, never below 1x1
pub(crate) fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    let extent = if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: width.clamp(caps.min_image_extent.width, caps.max_image_extent.width.max(caps.min_image_extent.width)),
            height: height.clamp(caps.min_image_extent.height, caps.max_image_extent.height.max(caps.min_image_extent.height)),
        }
    };
    vk::Extent2D {
        width: extent.width.max(1),
        height: extent.height.max(1),
    }
}

/// One image more than the minimum, within the maximum (0 = unbounded)
pub(crate) fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        desired.min(caps.max_image_count)
    } else {
        desired
    }
}

/// FIFO with vsync; otherwise the lowest-latency available mode
pub(crate) fn choose_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|mode| available.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// First supported SRGB format, else the first format the engine can render to
pub(crate) fn choose_surface_format(available: &[vk::SurfaceFormatKHR]) -> Option<(vk::SurfaceFormatKHR, TextureFormat)> {
    let supported = || available.iter()
        .filter_map(|f| vk_to_surface_format(f.format).map(|format| (*f, format)));
    supported()
        .find(|(_, format)| matches!(format, TextureFormat::B8G8R8A8_SRGB | TextureFormat::R8G8B8A8_SRGB))
        .or_else(|| supported().next())
}

/// Vulkan swapchain implementation
pub struct VulkanSwapchain {
    ctx: Arc<GpuContext>,
    id: ResourceId,
    handle: Arc<SwapchainHandle>,
    /// One view per swapchain image
    render_targets: Vec<Arc<dyn RenderTarget>>,
    format: TextureFormat,
    extent: vk::Extent2D,
    vsync: bool,
}

impl VulkanSwapchain {
    pub(crate) fn create(
        ctx: &Arc<GpuContext>,
        surface: Arc<SurfaceShared>,
        width: u32,
        height: u32,
        vsync: bool,
        old_swapchain: vk::SwapchainKHR,
    ) -> Result<Self> {
        let loader = &surface.surface_loader;
        let (caps, formats, present_modes) = unsafe {
            let supported = loader
                .get_physical_device_surface_support(ctx.physical_device, ctx.present_queue_family, surface.surface)
                .map_err(|e| vk_error(SOURCE, "Failed to query surface support", e))?;
            if !supported {
                engine_error!(SOURCE, "Present queue family {} cannot present to this surface",
                    ctx.present_queue_family);
                return Err(Error::InitializationFailed("surface not supported by present queue".to_string()));
            }
            (
                loader.get_physical_device_surface_capabilities(ctx.physical_device, surface.surface)
                    .map_err(|e| vk_error(SOURCE, "Failed to get surface capabilities", e))?,
                loader.get_physical_device_surface_formats(ctx.physical_device, surface.surface)
                    .map_err(|e| vk_error(SOURCE, "Failed to get surface formats", e))?,
                loader.get_physical_device_surface_present_modes(ctx.physical_device, surface.surface)
                    .map_err(|e| vk_error(SOURCE, "Failed to get present modes", e))?,
            )
        };

        let Some((surface_format, format)) = choose_surface_format(&formats) else {
            engine_error!(SOURCE, "No supported surface format among {:?}", formats);
            return Err(Error::InitializationFailed("no supported surface format".to_string()));
        };
        let settings = SwapchainSettings {
            extent: choose_extent(&caps, width, height),
            image_count: choose_image_count(&caps),
            present_mode: choose_present_mode(&present_modes, vsync),
        };
        let composite_alpha = if caps.supported_composite_alpha.contains(vk::CompositeAlphaFlagsKHR::OPAQUE) {
            vk::CompositeAlphaFlagsKHR::OPAQUE
        } else {
            vk::CompositeAlphaFlagsKHR::INHERIT
        };

        let queue_families = [ctx.graphics_queue_family, ctx.present_queue_family];
        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.surface)
            .min_image_count(settings.image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(settings.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(caps.current_transform)
            .composite_alpha(composite_alpha)
            .present_mode(settings.present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);
        create_info = if ctx.graphics_queue_family != ctx.present_queue_family {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&queue_families)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        let swapchain_loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);
        let (swapchain, images) = unsafe {
            let swapchain = swapchain_loader.create_swapchain(&create_info, None)
                .map_err(|e| vk_error(SOURCE, "Failed to create swapchain", e))?;
            match swapchain_loader.get_swapchain_images(swapchain) {
                Ok(images) => (swapchain, images),
                Err(e) => {
                    swapchain_loader.destroy_swapchain(swapchain, None);
                    return Err(vk_error(SOURCE, "Failed to get swapchain images", e));
                }
            }
        };

        let handle = Arc::new(SwapchainHandle { surface, loader: swapchain_loader, swapchain });
        let render_targets = images.iter()
            .map(|&image| {
                VulkanRenderTarget::for_swapchain_image(
                    ctx, &handle, image, format, settings.extent.width, settings.extent.height,
                ).map(|target| Arc::new(target) as Arc<dyn RenderTarget>)
            })
            .collect::<Result<Vec<_>>>()?;

        engine_info!(SOURCE, "Created swapchain {}x{} ({} images, {:?}, {:?})",
            settings.extent.width, settings.extent.height, render_targets.len(),
            format, settings.present_mode);

        Ok(Self {
            ctx: Arc::clone(ctx),
            id: ctx.next_id(),
            handle,
            render_targets,
            format,
            extent: settings.extent,
            vsync,
        })
    }
}

impl Swapchain for VulkanSwapchain {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn acquire_next_image(&mut self, signal: &dyn Semaphore) -> Result<AcquireOutcome> {
        let semaphore = VulkanSemaphore::from_dyn(signal).semaphore;
        let result = unsafe {
            self.handle.loader.acquire_next_image(self.handle.swapchain, u64::MAX, semaphore, vk::Fence::null())
        };
        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired { image_index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                engine_debug!(SOURCE, "Swapchain out of date during acquire");
                Ok(AcquireOutcome::OutOfDate)
            }
            Err(e) => Err(vk_error(SOURCE, "Failed to acquire next swapchain image", e)),
        }
    }

    fn present(&mut self, image_index: u32, wait: &dyn Semaphore) -> Result<PresentOutcome> {
        if image_index as usize >= self.render_targets.len() {
            engine_bail!(SOURCE, "present: image_index {} out of range (count: {})",
                image_index, self.render_targets.len());
        }

        let wait_semaphores = [VulkanSemaphore::from_dyn(wait).semaphore];
        let swapchains = [self.handle.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = {
            let queues = self.ctx.queues();
            unsafe { self.handle.loader.queue_present(queues.present, &present_info) }
        };
        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(vk_error(SOURCE, "Failed to present swapchain image", e)),
        }
    }

    fn recreate(&self, width: u32, height: u32) -> Result<Box<dyn Swapchain>> {
        let swapchain = VulkanSwapchain::create(
            &self.ctx,
            Arc::clone(&self.handle.surface),
            width,
            height,
            self.vsync,
            self.handle.swapchain,
        )?;
        Ok(Box::new(swapchain))
    }

    fn render_target(&self, image_index: u32) -> Arc<dyn RenderTarget> {
        Arc::clone(&self.render_targets[image_index as usize])
    }

    fn image_count(&self) -> usize {
        self.render_targets.len()
    }

    fn width(&self) -> u32 {
        self.extent.width
    }

    fn height(&self) -> u32 {
        self.extent.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;

/// VulkanTexture / VulkanRenderTarget - images and image views

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;
use stellar_render::stellar::device::{
    RenderTarget, Texture, TextureDesc, TextureFormat, TextureInfo,
};
use stellar_render::stellar::utils::ResourceId;
use stellar_render::stellar::{Error, Result};
use stellar_render::engine_error;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{aspect_mask, format_to_vk, samples_to_vk, texture_usage_to_vk, vk_error};
use crate::vulkan_swapchain::SwapchainHandle;

const SOURCE: &str = "stellar::vulkan::Texture";

/// Vulkan texture implementation (device-local image)
pub struct VulkanTexture {
    ctx: Arc<GpuContext>,
    id: ResourceId,
    pub(crate) image: vk::Image,
    allocation: Option<Allocation>,
    info: TextureInfo,
}

impl VulkanTexture {
    pub(crate) fn create(ctx: &Arc<GpuContext>, desc: &TextureDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            engine_error!(SOURCE, "Texture '{}' has a zero extent", desc.debug_name);
            return Err(Error::InvalidResource(format!(
                "texture '{}' has a zero extent", desc.debug_name
            )));
        }

        let image_create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format_to_vk(desc.format))
            .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: 1 })
            .mip_levels(1)
            .array_layers(1)
            .samples(samples_to_vk(desc.samples))
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(texture_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        unsafe {
            let image = ctx.device.create_image(&image_create_info, None)
                .map_err(|e| vk_error(SOURCE, "Failed to create texture image", e))?;

            // Owned from here on: an early return destroys the image
            let mut texture = Self {
                ctx: Arc::clone(ctx),
                id: ctx.next_id(),
                image,
                allocation: None,
                info: TextureInfo {
                    width: desc.width,
                    height: desc.height,
                    format: desc.format,
                    usage: desc.usage,
                    samples: desc.samples,
                },
            };

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = ctx.allocator()
                .allocate(&AllocationCreateDesc {
                    name: &desc.debug_name,
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|_| {
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!(SOURCE, "Out of GPU memory for texture '{}' ({}x{}, {:.2} MB)",
                        desc.debug_name, desc.width, desc.height, size_mb);
                    Error::OutOfMemory
                })?;

            ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset())
                .map_err(|e| vk_error(SOURCE, "Failed to bind texture image memory", e))?;
            texture.allocation = Some(allocation);

            ctx.set_debug_name(image, &desc.debug_name);
            Ok(texture)
        }
    }

    /// Reinterpret a texture created by this backend
    pub(crate) fn from_dyn(texture: &dyn Texture) -> &Self {
        // SAFETY: every `dyn Texture` handed to this backend was created by VulkanDevice
        unsafe { &*(texture as *const dyn Texture as *const Self) }
    }
}

impl Texture for VulkanTexture {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

impl Drop for VulkanTexture {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                self.ctx.allocator().free(allocation).ok();
            }
            self.ctx.device.destroy_image(self.image, None);
        }
    }
}

/// Object that owns the image a render target views (held, never read)
#[allow(dead_code)]
pub(crate) enum ImageOwner {
    Texture(Arc<dyn Texture>),
    Swapchain(Arc<SwapchainHandle>),
}

/// Vulkan render target implementation
///
/// Owns its image view and keeps the image it views alive, whether that is
/// an attachment texture or a swapchain image.
pub struct VulkanRenderTarget {
    ctx: Arc<GpuContext>,
    id: ResourceId,
    pub(crate) image_view: vk::ImageView,
    width: u32,
    height: u32,
    format: TextureFormat,
    samples: u32,
    _owner: ImageOwner,
}

impl VulkanRenderTarget {
    /// Create a view over a whole texture
    pub(crate) fn for_texture(ctx: &Arc<GpuContext>, texture: &Arc<dyn Texture>) -> Result<Self> {
        let info = texture.info().clone();
        let image = VulkanTexture::from_dyn(texture.as_ref()).image;
        let image_view = Self::create_view(ctx, image, info.format)?;
        Ok(Self {
            ctx: Arc::clone(ctx),
            id: ctx.next_id(),
            image_view,
            width: info.width,
            height: info.height,
            format: info.format,
            samples: info.samples,
            _owner: ImageOwner::Texture(Arc::clone(texture)),
        })
    }

    /// Create a view over a swapchain image
    pub(crate) fn for_swapchain_image(
        ctx: &Arc<GpuContext>,
        owner: &Arc<SwapchainHandle>,
        image: vk::Image,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let image_view = Self::create_view(ctx, image, format)?;
        Ok(Self {
            ctx: Arc::clone(ctx),
            id: ctx.next_id(),
            image_view,
            width,
            height,
            format,
            samples: 1,
            _owner: ImageOwner::Swapchain(Arc::clone(owner)),
        })
    }

    fn create_view(ctx: &GpuContext, image: vk::Image, format: TextureFormat) -> Result<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format_to_vk(format))
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect_mask(format),
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        unsafe {
            ctx.device.create_image_view(&create_info, None)
                .map_err(|e| vk_error(SOURCE, "Failed to create image view", e))
        }
    }

    /// Reinterpret a render target created by this backend
    pub(crate) fn from_dyn(target: &dyn RenderTarget) -> &Self {
        // SAFETY: every `dyn RenderTarget` handed to this backend was created by VulkanDevice
        unsafe { &*(target as *const dyn RenderTarget as *const Self) }
    }
}

impl RenderTarget for VulkanRenderTarget {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn samples(&self) -> u32 {
        self.samples
    }
}

impl Drop for VulkanRenderTarget {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.image_view, None);
        }
    }
}

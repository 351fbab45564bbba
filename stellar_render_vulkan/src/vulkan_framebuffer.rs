/// VulkanFramebuffer - groups color and depth/stencil views for one render pass
///
/// Holds the views and the render pass it was created for, so none of them
/// can be destroyed while the framebuffer is alive.

use ash::vk;
use std::sync::Arc;
use stellar_render::stellar::device::{Framebuffer, FramebufferDesc, RenderPass, RenderTarget};
use stellar_render::stellar::utils::ResourceId;
use stellar_render::stellar::Result;
use stellar_render::engine_bail;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::vk_error;
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_texture::VulkanRenderTarget;

const SOURCE: &str = "stellar::vulkan::Framebuffer";

/// Vulkan framebuffer implementation
pub struct VulkanFramebuffer {
    ctx: Arc<GpuContext>,
    id: ResourceId,
    /// Vulkan framebuffer handle
    pub(crate) framebuffer: vk::Framebuffer,
    width: u32,
    height: u32,
    _render_pass: Arc<dyn RenderPass>,
    _attachments: Vec<Arc<dyn RenderTarget>>,
}

impl VulkanFramebuffer {
    pub(crate) fn create(ctx: &Arc<GpuContext>, desc: &FramebufferDesc) -> Result<Self> {
        let render_pass = &desc.render_pass;
        if render_pass.color_attachment_count() != desc.color_attachments.len()
            || render_pass.has_depth_attachment() != desc.depth_attachment.is_some()
        {
            engine_bail!(SOURCE,
                "Framebuffer '{}' attachments do not match its render pass ({} color, depth: {})",
                desc.debug_name, render_pass.color_attachment_count(), render_pass.has_depth_attachment());
        }

        let attachments: Vec<Arc<dyn RenderTarget>> = desc.color_attachments.iter()
            .chain(desc.depth_attachment.iter())
            .cloned()
            .collect();
        for attachment in &attachments {
            if attachment.width() < desc.width || attachment.height() < desc.height {
                engine_bail!(SOURCE,
                    "Framebuffer '{}' ({}x{}) is larger than an attachment ({}x{})",
                    desc.debug_name, desc.width, desc.height, attachment.width(), attachment.height());
            }
        }

        let views: Vec<vk::ImageView> = attachments.iter()
            .map(|attachment| VulkanRenderTarget::from_dyn(attachment.as_ref()).image_view)
            .collect();

        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(VulkanRenderPass::from_dyn(render_pass.as_ref()).render_pass)
            .attachments(&views)
            .width(desc.width)
            .height(desc.height)
            .layers(1);

        let framebuffer = unsafe {
            ctx.device.create_framebuffer(&create_info, None)
                .map_err(|e| vk_error(SOURCE, "Failed to create framebuffer", e))?
        };
        ctx.set_debug_name(framebuffer, &desc.debug_name);

        Ok(Self {
            ctx: Arc::clone(ctx),
            id: ctx.next_id(),
            framebuffer,
            width: desc.width,
            height: desc.height,
            _render_pass: Arc::clone(render_pass),
            _attachments: attachments,
        })
    }

    pub(crate) fn from_dyn(framebuffer: &dyn Framebuffer) -> &Self {
        // SAFETY: every `dyn Framebuffer` handed to this backend was created by VulkanDevice
        unsafe { &*(framebuffer as *const dyn Framebuffer as *const Self) }
    }
}

impl Framebuffer for VulkanFramebuffer {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for VulkanFramebuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}

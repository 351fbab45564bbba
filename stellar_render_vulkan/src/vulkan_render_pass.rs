/// VulkanRenderPass - single-subpass render pass

use ash::vk;
use std::sync::Arc;
use stellar_render::stellar::device::{AttachmentDesc, RenderPass, RenderPassDesc};
use stellar_render::stellar::utils::ResourceId;
use stellar_render::stellar::Result;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    format_to_vk, image_layout_to_vk, load_op_to_vk, samples_to_vk, store_op_to_vk, vk_error,
};

const SOURCE: &str = "stellar::vulkan::RenderPass";

/// Vulkan render pass implementation
pub struct VulkanRenderPass {
    ctx: Arc<GpuContext>,
    id: ResourceId,
    /// Vulkan render pass handle
    pub(crate) render_pass: vk::RenderPass,
    /// Sample count shared by every attachment (pipelines must match it)
    pub(crate) samples: vk::SampleCountFlags,
    color_count: usize,
    has_depth: bool,
}

fn attachment_to_vk(attachment: &AttachmentDesc) -> vk::AttachmentDescription {
    // Stencil follows the depth ops when the format has a stencil aspect
    let (stencil_load, stencil_store) = if attachment.format.has_stencil() {
        (load_op_to_vk(attachment.load_op), store_op_to_vk(attachment.store_op))
    } else {
        (vk::AttachmentLoadOp::DONT_CARE, vk::AttachmentStoreOp::DONT_CARE)
    };

    vk::AttachmentDescription::default()
        .format(format_to_vk(attachment.format))
        .samples(samples_to_vk(attachment.samples))
        .load_op(load_op_to_vk(attachment.load_op))
        .store_op(store_op_to_vk(attachment.store_op))
        .stencil_load_op(stencil_load)
        .stencil_store_op(stencil_store)
        .initial_layout(image_layout_to_vk(attachment.initial_layout))
        .final_layout(image_layout_to_vk(attachment.final_layout))
}

impl VulkanRenderPass {
    pub(crate) fn create(ctx: &Arc<GpuContext>, desc: &RenderPassDesc) -> Result<Self> {
        let mut attachments = Vec::with_capacity(desc.color_attachments.len() + 1);
        let mut color_refs = Vec::with_capacity(desc.color_attachments.len());

        for (i, color) in desc.color_attachments.iter().enumerate() {
            attachments.push(attachment_to_vk(color));
            color_refs.push(vk::AttachmentReference::default()
                .attachment(i as u32)
                .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL));
        }

        let depth_ref = desc.depth_attachment.as_ref().map(|depth| {
            let index = attachments.len() as u32;
            attachments.push(attachment_to_vk(depth));
            vk::AttachmentReference::default()
                .attachment(index)
                .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
        });

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs);
        if let Some(depth_ref) = depth_ref.as_ref() {
            subpass = subpass.depth_stencil_attachment(depth_ref);
        }

        // Attachments written here may be sampled by a later pass and vice versa
        let attachment_stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
            | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
            | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
        let attachment_access = vk::AccessFlags::COLOR_ATTACHMENT_READ
            | vk::AccessFlags::COLOR_ATTACHMENT_WRITE
            | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
            | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
        let dependencies = [
            vk::SubpassDependency::default()
                .src_subpass(vk::SUBPASS_EXTERNAL)
                .dst_subpass(0)
                .src_stage_mask(attachment_stages | vk::PipelineStageFlags::FRAGMENT_SHADER)
                .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE)
                .dst_stage_mask(attachment_stages | vk::PipelineStageFlags::FRAGMENT_SHADER)
                .dst_access_mask(attachment_access | vk::AccessFlags::SHADER_READ),
            vk::SubpassDependency::default()
                .src_subpass(0)
                .dst_subpass(vk::SUBPASS_EXTERNAL)
                .src_stage_mask(attachment_stages)
                .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE)
                .dst_stage_mask(attachment_stages | vk::PipelineStageFlags::FRAGMENT_SHADER)
                .dst_access_mask(attachment_access | vk::AccessFlags::SHADER_READ),
        ];

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(&dependencies);

        let render_pass = unsafe {
            ctx.device.create_render_pass(&render_pass_info, None)
                .map_err(|e| vk_error(SOURCE, "Failed to create render pass", e))?
        };
        ctx.set_debug_name(render_pass, &desc.debug_name);

        let samples = desc.color_attachments.first()
            .or(desc.depth_attachment.as_ref())
            .map(|attachment| samples_to_vk(attachment.samples))
            .unwrap_or(vk::SampleCountFlags::TYPE_1);

        Ok(Self {
            ctx: Arc::clone(ctx),
            id: ctx.next_id(),
            render_pass,
            samples,
            color_count: desc.color_attachments.len(),
            has_depth: desc.depth_attachment.is_some(),
        })
    }

    pub(crate) fn from_dyn(render_pass: &dyn RenderPass) -> &Self {
        // SAFETY: every `dyn RenderPass` handed to this backend was created by VulkanDevice
        unsafe { &*(render_pass as *const dyn RenderPass as *const Self) }
    }
}

impl RenderPass for VulkanRenderPass {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn color_attachment_count(&self) -> usize {
        self.color_count
    }

    fn has_depth_attachment(&self) -> bool {
        self.has_depth
    }
}

impl Drop for VulkanRenderPass {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}

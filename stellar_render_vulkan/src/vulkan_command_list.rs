/// VulkanCommandList - records rendering commands into a primary command buffer
///
/// Each command list owns its command pool, so lists of different threads
/// never share pool state.

use ash::vk;
use std::sync::Arc;
use stellar_render::stellar::device::{
    Buffer, ClearValue, CommandList, DescriptorSet, Framebuffer, IndexType, Pipeline, Rect2D,
    RenderPass, ShaderStageFlags, Viewport,
};
use stellar_render::stellar::Result;
use stellar_render::engine_bail;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_descriptor::VulkanDescriptorSet;
use crate::vulkan_format::{index_type_to_vk, stage_flags_to_vk, vk_error};
use crate::vulkan_framebuffer::VulkanFramebuffer;
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_render_pass::VulkanRenderPass;

const SOURCE: &str = "stellar::vulkan::CommandList";

/// Vulkan command list implementation
pub struct VulkanCommandList {
    ctx: Arc<GpuContext>,
    /// Command pool for allocating the command buffer
    command_pool: vk::CommandPool,
    /// Command buffer for recording
    pub(crate) command_buffer: vk::CommandBuffer,
    /// Whether the command list is currently recording
    is_recording: bool,
    /// Whether we're inside a render pass
    in_render_pass: bool,
}

impl VulkanCommandList {
    pub(crate) fn create(ctx: &Arc<GpuContext>) -> Result<Self> {
        unsafe {
            let command_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = ctx.device.create_command_pool(&command_pool_create_info, None)
                .map_err(|e| vk_error(SOURCE, "Failed to create command pool", e))?;

            let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = match ctx.device.allocate_command_buffers(&command_buffer_allocate_info) {
                Ok(buffers) => buffers,
                Err(e) => {
                    ctx.device.destroy_command_pool(command_pool, None);
                    return Err(vk_error(SOURCE, "Failed to allocate command buffer", e));
                }
            };

            Ok(Self {
                ctx: Arc::clone(ctx),
                command_pool,
                command_buffer: command_buffers[0],
                is_recording: false,
                in_render_pass: false,
            })
        }
    }

    pub(crate) fn from_dyn(commands: &dyn CommandList) -> &Self {
        // SAFETY: every `dyn CommandList` handed to this backend was created by VulkanDevice
        unsafe { &*(commands as *const dyn CommandList as *const Self) }
    }

    /// Whether recording has ended and the buffer can be submitted
    pub(crate) fn is_executable(&self) -> bool {
        !self.is_recording
    }

    fn check_recording(&self) -> Result<()> {
        if !self.is_recording {
            engine_bail!(SOURCE, "Command list not recording");
        }
        Ok(())
    }

    fn check_in_render_pass(&self) -> Result<()> {
        self.check_recording()?;
        if !self.in_render_pass {
            engine_bail!(SOURCE, "Not inside a render pass");
        }
        Ok(())
    }
}

impl CommandList for VulkanCommandList {
    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            engine_bail!(SOURCE, "Command list already recording");
        }

        unsafe {
            self.ctx.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| vk_error(SOURCE, "Failed to reset command buffer", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            self.ctx.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| vk_error(SOURCE, "Failed to begin command buffer", e))?;
        }

        self.is_recording = true;
        self.in_render_pass = false;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.check_recording()?;
        if self.in_render_pass {
            engine_bail!(SOURCE, "Render pass not ended before ending command list");
        }

        unsafe {
            self.ctx.device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| vk_error(SOURCE, "Failed to end command buffer", e))?;
        }

        self.is_recording = false;
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.check_recording()?;
        if self.in_render_pass {
            engine_bail!(SOURCE, "Already inside a render pass");
        }

        let vk_render_pass = VulkanRenderPass::from_dyn(render_pass.as_ref());
        let vk_framebuffer = VulkanFramebuffer::from_dyn(framebuffer.as_ref());

        let vk_clear_values: Vec<vk::ClearValue> = clear_values
            .iter()
            .map(|cv| match cv {
                ClearValue::Color(color) => vk::ClearValue {
                    color: vk::ClearColorValue { float32: *color },
                },
                ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue { depth: *depth, stencil: *stencil },
                },
            })
            .collect();

        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk_render_pass.render_pass)
            .framebuffer(vk_framebuffer.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: framebuffer.width(),
                    height: framebuffer.height(),
                },
            })
            .clear_values(&vk_clear_values);

        unsafe {
            self.ctx.device.cmd_begin_render_pass(
                self.command_buffer,
                &render_pass_info,
                vk::SubpassContents::INLINE,
            );
        }

        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.check_in_render_pass()?;

        unsafe {
            self.ctx.device.cmd_end_render_pass(self.command_buffer);
        }
        self.in_render_pass = false;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.check_recording()?;

        let vk_viewport = vk::Viewport::default()
            .x(viewport.x)
            .y(viewport.y)
            .width(viewport.width)
            .height(viewport.height)
            .min_depth(viewport.min_depth)
            .max_depth(viewport.max_depth);

        unsafe {
            self.ctx.device.cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.check_recording()?;

        let vk_scissor = vk::Rect2D::default()
            .offset(vk::Offset2D { x: scissor.x, y: scissor.y })
            .extent(vk::Extent2D { width: scissor.width, height: scissor.height });

        unsafe {
            self.ctx.device.cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.check_in_render_pass()?;

        let vk_pipeline = VulkanPipeline::from_dyn(pipeline.as_ref());
        unsafe {
            self.ctx.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.pipeline,
            );
        }
        Ok(())
    }

    fn bind_descriptor_set(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        descriptor_set: &Arc<dyn DescriptorSet>,
        dynamic_offsets: &[u32],
    ) -> Result<()> {
        self.check_recording()?;

        let Some(layout) = pipeline.set_layout(set_index) else {
            engine_bail!(SOURCE, "Pipeline has no descriptor set {}", set_index);
        };
        if layout.dynamic_binding_count() != dynamic_offsets.len() {
            engine_bail!(SOURCE, "Set {} expects {} dynamic offsets, got {}",
                set_index, layout.dynamic_binding_count(), dynamic_offsets.len());
        }

        let vk_pipeline = VulkanPipeline::from_dyn(pipeline.as_ref());
        let vk_set = VulkanDescriptorSet::from_dyn(descriptor_set.as_ref());
        unsafe {
            self.ctx.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.pipeline_layout,
                set_index,
                &[vk_set.descriptor_set],
                dynamic_offsets,
            );
        }
        Ok(())
    }

    fn push_constants(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        self.check_recording()?;

        let vk_pipeline = VulkanPipeline::from_dyn(pipeline.as_ref());
        unsafe {
            self.ctx.device.cmd_push_constants(
                self.command_buffer,
                vk_pipeline.pipeline_layout,
                stage_flags_to_vk(stages),
                offset,
                data,
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        self.check_recording()?;

        let vk_buffer = VulkanBuffer::from_dyn(buffer.as_ref());
        unsafe {
            self.ctx.device.cmd_bind_vertex_buffers(
                self.command_buffer,
                0,
                &[vk_buffer.buffer],
                &[offset],
            );
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()> {
        self.check_recording()?;

        let vk_buffer = VulkanBuffer::from_dyn(buffer.as_ref());
        unsafe {
            self.ctx.device.cmd_bind_index_buffer(
                self.command_buffer,
                vk_buffer.buffer,
                offset,
                index_type_to_vk(index_type),
            );
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.check_in_render_pass()?;

        unsafe {
            self.ctx.device.cmd_draw(self.command_buffer, vertex_count, 1, first_vertex, 0);
        }
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.check_in_render_pass()?;

        unsafe {
            self.ctx.device.cmd_draw_indexed(
                self.command_buffer,
                index_count,
                1, // instance_count
                first_index,
                vertex_offset,
                0, // first_instance
            );
        }
        Ok(())
    }
}

impl Drop for VulkanCommandList {
    fn drop(&mut self) {
        unsafe {
            // Freeing the pool frees its command buffer
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

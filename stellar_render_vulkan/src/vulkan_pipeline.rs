/// VulkanPipeline - graphics pipeline, its layout and descriptor set layouts
///
/// Viewport and scissor are dynamic state; everything else is baked in from
/// the PipelineDesc and the render pass the pipeline is created for.

use ash::vk;
use std::ffi::CString;
use std::sync::Arc;
use stellar_render::stellar::device::{
    DescriptorSetLayoutDesc, Pipeline, PipelineDesc, RenderPass, ShaderSource,
};
use stellar_render::stellar::utils::ResourceId;
use stellar_render::stellar::Result;
use stellar_render::{engine_debug, engine_err};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    blend_attachment_to_vk, compare_op_to_vk, cull_mode_to_vk, descriptor_type_to_vk,
    format_to_vk, stage_flags_to_vk, topology_to_vk, vk_error,
};
use crate::vulkan_render_pass::VulkanRenderPass;

const SOURCE: &str = "stellar::vulkan::Pipeline";

/// Vulkan pipeline implementation
pub struct VulkanPipeline {
    ctx: Arc<GpuContext>,
    id: ResourceId,
    /// Vulkan graphics pipeline
    pub(crate) pipeline: vk::Pipeline,
    /// Pipeline layout, used for descriptor set binding and push constants
    pub(crate) pipeline_layout: vk::PipelineLayout,
    /// One layout per set number
    pub(crate) descriptor_set_layouts: Vec<vk::DescriptorSetLayout>,
    set_layouts: Vec<DescriptorSetLayoutDesc>,
}

impl VulkanPipeline {
    pub(crate) fn create(
        ctx: &Arc<GpuContext>,
        desc: &PipelineDesc,
        render_pass: &Arc<dyn RenderPass>,
    ) -> Result<Self> {
        let vk_render_pass = VulkanRenderPass::from_dyn(render_pass.as_ref());

        // Partially built pipeline: handles still null are skipped on drop
        let mut pipeline = Self {
            ctx: Arc::clone(ctx),
            id: ctx.next_id(),
            pipeline: vk::Pipeline::null(),
            pipeline_layout: vk::PipelineLayout::null(),
            descriptor_set_layouts: Vec::with_capacity(desc.set_layouts.len()),
            set_layouts: desc.set_layouts.clone(),
        };

        unsafe {
            for layout_desc in &desc.set_layouts {
                let bindings: Vec<vk::DescriptorSetLayoutBinding> = layout_desc.bindings
                    .iter()
                    .map(|binding| {
                        vk::DescriptorSetLayoutBinding::default()
                            .binding(binding.binding)
                            .descriptor_type(descriptor_type_to_vk(binding.descriptor_type))
                            .descriptor_count(binding.count)
                            .stage_flags(stage_flags_to_vk(binding.stages))
                    })
                    .collect();
                let layout_create = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
                let set_layout = ctx.device.create_descriptor_set_layout(&layout_create, None)
                    .map_err(|e| vk_error(SOURCE, "Failed to create descriptor set layout", e))?;
                pipeline.descriptor_set_layouts.push(set_layout);
            }

            let push_constant_ranges: Vec<vk::PushConstantRange> = desc.push_constant_ranges
                .iter()
                .map(|range| vk::PushConstantRange {
                    stage_flags: stage_flags_to_vk(range.stages),
                    offset: range.offset,
                    size: range.size,
                })
                .collect();

            let layout_create_info = vk::PipelineLayoutCreateInfo::default()
                .set_layouts(&pipeline.descriptor_set_layouts)
                .push_constant_ranges(&push_constant_ranges);
            pipeline.pipeline_layout = ctx.device.create_pipeline_layout(&layout_create_info, None)
                .map_err(|e| vk_error(SOURCE, "Failed to create pipeline layout", e))?;

            let vertex_module = create_shader_module(ctx, &desc.vertex_shader)?;
            let fragment_module = match create_shader_module(ctx, &desc.fragment_shader) {
                Ok(module) => module,
                Err(e) => {
                    ctx.device.destroy_shader_module(vertex_module, None);
                    return Err(e);
                }
            };

            let result = build_pipeline(ctx, desc, vk_render_pass, pipeline.pipeline_layout,
                vertex_module, fragment_module);

            // Modules are only needed during pipeline creation
            ctx.device.destroy_shader_module(vertex_module, None);
            ctx.device.destroy_shader_module(fragment_module, None);

            pipeline.pipeline = result?;
        }

        ctx.set_debug_name(pipeline.pipeline, &desc.name);
        engine_debug!(SOURCE, "Created pipeline '{}' ({} set layouts)", desc.name, desc.set_layouts.len());
        Ok(pipeline)
    }

    pub(crate) fn from_dyn(pipeline: &dyn Pipeline) -> &Self {
        // SAFETY: every `dyn Pipeline` handed to this backend was created by VulkanDevice
        unsafe { &*(pipeline as *const dyn Pipeline as *const Self) }
    }
}

fn create_shader_module(ctx: &GpuContext, shader: &ShaderSource) -> Result<vk::ShaderModule> {
    let create_info = vk::ShaderModuleCreateInfo::default().code(&shader.code);
    unsafe {
        ctx.device.create_shader_module(&create_info, None)
            .map_err(|e| vk_error(SOURCE, "Failed to create shader module", e))
    }
}

unsafe fn build_pipeline(
    ctx: &GpuContext,
    desc: &PipelineDesc,
    render_pass: &VulkanRenderPass,
    layout: vk::PipelineLayout,
    vertex_module: vk::ShaderModule,
    fragment_module: vk::ShaderModule,
) -> Result<vk::Pipeline> {
    let entry_point_vert = CString::new(desc.vertex_shader.entry_point.as_str())
        .map_err(|_| engine_err!(SOURCE, "Invalid vertex entry point '{}'", desc.vertex_shader.entry_point))?;
    let entry_point_frag = CString::new(desc.fragment_shader.entry_point.as_str())
        .map_err(|_| engine_err!(SOURCE, "Invalid fragment entry point '{}'", desc.fragment_shader.entry_point))?;

    let shader_stages = [
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vertex_module)
            .name(&entry_point_vert),
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(fragment_module)
            .name(&entry_point_frag),
    ];

    // Vertex input state (one interleaved binding, or none)
    let vertex_bindings: Vec<vk::VertexInputBindingDescription> = if desc.vertex_layout.stride > 0 {
        vec![vk::VertexInputBindingDescription {
            binding: 0,
            stride: desc.vertex_layout.stride,
            input_rate: vk::VertexInputRate::VERTEX,
        }]
    } else {
        Vec::new()
    };
    let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc.vertex_layout.attributes
        .iter()
        .map(|attribute| vk::VertexInputAttributeDescription {
            location: attribute.location,
            binding: 0,
            format: format_to_vk(attribute.format),
            offset: attribute.offset,
        })
        .collect();
    let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&vertex_bindings)
        .vertex_attribute_descriptions(&vertex_attributes);

    let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(topology_to_vk(desc.topology))
        .primitive_restart_enable(false);

    // Viewport state (dynamic)
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);

    let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .line_width(1.0)
        .cull_mode(cull_mode_to_vk(desc.cull_mode))
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .depth_bias_enable(false);

    let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
        .sample_shading_enable(false)
        .rasterization_samples(render_pass.samples);

    let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(desc.depth.test_enable)
        .depth_write_enable(desc.depth.write_enable)
        .depth_compare_op(compare_op_to_vk(desc.depth.compare_op))
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false);

    let color_blend_attachments =
        vec![blend_attachment_to_vk(desc.blend); render_pass.color_attachment_count()];
    let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .attachments(&color_blend_attachments);

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
        .dynamic_states(&dynamic_states);

    let mut pipeline_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&shader_stages)
        .vertex_input_state(&vertex_input_state)
        .input_assembly_state(&input_assembly_state)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization_state)
        .multisample_state(&multisample_state)
        .color_blend_state(&color_blend_state)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .render_pass(render_pass.render_pass)
        .subpass(0);
    if render_pass.has_depth_attachment() {
        pipeline_info = pipeline_info.depth_stencil_state(&depth_stencil_state);
    }

    let pipelines = ctx.device
        .create_graphics_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&pipeline_info), None)
        .map_err(|(_, e)| vk_error(SOURCE, &format!("Failed to create pipeline '{}'", desc.name), e))?;

    pipelines.into_iter().next()
        .ok_or_else(|| engine_err!(SOURCE, "Pipeline '{}' creation returned no pipeline", desc.name))
}

impl Pipeline for VulkanPipeline {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn set_layout(&self, set_index: u32) -> Option<&DescriptorSetLayoutDesc> {
        self.set_layouts.get(set_index as usize)
    }

    fn set_layout_count(&self) -> u32 {
        self.set_layouts.len() as u32
    }
}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        unsafe {
            if self.pipeline != vk::Pipeline::null() {
                self.ctx.device.destroy_pipeline(self.pipeline, None);
            }
            if self.pipeline_layout != vk::PipelineLayout::null() {
                self.ctx.device.destroy_pipeline_layout(self.pipeline_layout, None);
            }
            for &set_layout in &self.descriptor_set_layouts {
                self.ctx.device.destroy_descriptor_set_layout(set_layout, None);
            }
        }
    }
}

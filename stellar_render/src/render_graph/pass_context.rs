/// What a pass callback records with: command list, scratch memory and
/// cached pipeline / descriptor set binding

use std::sync::{Arc, PoisonError};
use bytemuck::Pod;
use crate::cache::{BoundResourceKey, DescriptorSetKey, RenderPassKey};
use crate::context::RenderContext;
use crate::device::{
    Buffer, CommandList, DescriptorWrite, IndexType, Pipeline, RenderPass, RenderTarget,
    ShaderStageFlags,
};
use crate::error::Result;
use crate::frame::{ScratchAllocation, ScratchKind, ScratchSet};
use crate::engine_fatal;

/// A resource to bind into a descriptor set
pub enum DescriptorBinding<'b> {
    /// Uniform data in scratch memory
    Uniform { binding: u32, allocation: &'b ScratchAllocation },
    /// Storage data in scratch memory
    Storage { binding: u32, allocation: &'b ScratchAllocation },
    /// Range of a client-owned buffer
    Buffer { binding: u32, buffer: &'b Arc<dyn Buffer>, offset: u64, range: u64 },
    /// Attachment sampled by the pass
    Sampled { binding: u32, attachment: &'b str },
}

impl DescriptorBinding<'_> {
    fn binding(&self) -> u32 {
        match self {
            DescriptorBinding::Uniform { binding, .. }
            | DescriptorBinding::Storage { binding, .. }
            | DescriptorBinding::Buffer { binding, .. }
            | DescriptorBinding::Sampled { binding, .. } => *binding,
        }
    }
}

/// Recording state handed to a pass callback
///
/// The render pass is already begun and viewport/scissor cover the pass
/// extent. Pipeline-bound operations require a prior `bind_pipeline`.
pub struct PassContext<'a> {
    pub(crate) context: &'a RenderContext,
    pub(crate) pass_name: &'a str,
    pub(crate) slot: usize,
    pub(crate) command_list: &'a mut dyn CommandList,
    pub(crate) scratch: &'a mut ScratchSet,
    pub(crate) render_pass: &'a Arc<dyn RenderPass>,
    pub(crate) render_pass_key: &'a RenderPassKey,
    pub(crate) sampled: &'a [String],
    pub(crate) extent: (u32, u32),
    pub(crate) pipeline: Option<Arc<dyn Pipeline>>,
}

impl<'a> PassContext<'a> {
    pub fn pass_name(&self) -> &str {
        self.pass_name
    }

    /// Framebuffer extent of the pass
    pub fn extent(&self) -> (u32, u32) {
        self.extent
    }

    /// Ring slot of the frame being recorded
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn context(&self) -> &RenderContext {
        self.context
    }

    /// Raw command list, for commands without a helper
    pub fn command_list(&mut self) -> &mut dyn CommandList {
        &mut *self.command_list
    }

    /// The frame's scratch allocators
    pub fn scratch(&mut self) -> &mut ScratchSet {
        &mut *self.scratch
    }

    /// Copy `data` into the scratch allocator of `kind`
    pub fn upload<T: Pod>(&mut self, kind: ScratchKind, data: &[T]) -> ScratchAllocation {
        self.scratch.get(kind).upload(data)
    }

    /// Copy one uniform block into uniform scratch memory
    pub fn upload_uniform<T: Pod>(&mut self, value: &T) -> ScratchAllocation {
        self.scratch.uniform.upload(std::slice::from_ref(value))
    }

    /// Bind the pipeline registered as `name`, built for this pass's render pass
    ///
    /// # Panics
    ///
    /// Panics if no pipeline is registered under `name`.
    pub fn bind_pipeline(&mut self, name: &str) -> Result<()> {
        let Some((desc, generation)) = self.context.pipelines().get(name) else {
            engine_fatal!("stellar::PassContext",
                "Pass '{}' binds unregistered pipeline '{}'", self.pass_name, name);
        };
        let pipeline = self.context.caches()
            .pipeline(&desc, generation, self.render_pass_key, self.render_pass)?;
        self.command_list.bind_pipeline(&pipeline)?;
        self.pipeline = Some(pipeline);
        Ok(())
    }

    /// Currently bound pipeline
    pub fn pipeline(&self) -> Option<&Arc<dyn Pipeline>> {
        self.pipeline.as_ref()
    }

    pub fn bind_vertex_buffer(&mut self, allocation: &ScratchAllocation) -> Result<()> {
        self.command_list.bind_vertex_buffer(allocation.buffer(), allocation.offset())
    }

    pub fn bind_index_buffer(&mut self, allocation: &ScratchAllocation, index_type: IndexType) -> Result<()> {
        self.command_list.bind_index_buffer(allocation.buffer(), allocation.offset(), index_type)
    }

    /// Bind descriptor set `set_index` of the bound pipeline
    ///
    /// Sets come from the slot's descriptor set cache. Uniform and storage
    /// bindings declared dynamic by the layout take their scratch offset as
    /// a dynamic offset (ordered by binding number), so one cached set
    /// serves every frame.
    ///
    /// # Panics
    ///
    /// Panics without a bound pipeline, for a set or binding missing from
    /// the pipeline layout, when a dynamic binding is left out, or for an
    /// attachment the pass does not sample.
    pub fn bind_descriptor_set(&mut self, set_index: u32, bindings: &[DescriptorBinding<'_>]) -> Result<()> {
        let pipeline = self.require_pipeline("bind_descriptor_set").clone();
        let Some(layout) = pipeline.set_layout(set_index) else {
            engine_fatal!("stellar::PassContext",
                "Pass '{}': pipeline has no descriptor set {}", self.pass_name, set_index);
        };

        let mut sorted: Vec<&DescriptorBinding<'_>> = bindings.iter().collect();
        sorted.sort_by_key(|b| b.binding());

        let mut writes = Vec::with_capacity(sorted.len());
        let mut resources = Vec::with_capacity(sorted.len());
        let mut dynamic_offsets = Vec::new();
        for binding in sorted {
            let Some(binding_desc) = layout.binding(binding.binding()) else {
                engine_fatal!("stellar::PassContext",
                    "Pass '{}': set {} has no binding {}", self.pass_name, set_index, binding.binding());
            };
            let dynamic = binding_desc.descriptor_type.is_dynamic();

            let (buffer, offset, range) = match *binding {
                DescriptorBinding::Uniform { allocation, .. } | DescriptorBinding::Storage { allocation, .. } =>
                    (allocation.buffer().clone(), allocation.offset(), allocation.size()),
                DescriptorBinding::Buffer { buffer, offset, range, .. } => (buffer.clone(), offset, range),
                DescriptorBinding::Sampled { binding, attachment } => {
                    let view = self.sampled_view(attachment);
                    resources.push(BoundResourceKey::Image { binding, view: view.id() });
                    writes.push(DescriptorWrite::Image { binding, view });
                    continue;
                }
            };

            let binding = binding.binding();
            if dynamic {
                dynamic_offsets.push(dynamic_offset(self.pass_name, set_index, binding, offset));
            }
            let base_offset = if dynamic { 0 } else { offset };
            resources.push(BoundResourceKey::Buffer {
                binding,
                buffer: buffer.id(),
                offset: (!dynamic).then_some(offset),
                range,
            });
            writes.push(DescriptorWrite::Buffer { binding, buffer, offset: base_offset, range });
        }

        if dynamic_offsets.len() != layout.dynamic_binding_count() {
            engine_fatal!("stellar::PassContext",
                "Pass '{}': set {} needs {} dynamic bindings, {} supplied",
                self.pass_name, set_index, layout.dynamic_binding_count(), dynamic_offsets.len());
        }

        let key = DescriptorSetKey { pipeline: pipeline.id(), set_index, resources };
        let set = self.context.caches()
            .descriptor_sets(self.slot)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_allocate(key, &pipeline, &writes)?;
        self.command_list.bind_descriptor_set(&pipeline, set_index, &set, &dynamic_offsets)
    }

    /// Push constants to the bound pipeline
    pub fn push_constants<T: Pod>(&mut self, stages: ShaderStageFlags, offset: u32, value: &T) -> Result<()> {
        let pipeline = self.require_pipeline("push_constants").clone();
        self.command_list.push_constants(&pipeline, stages, offset, bytemuck::bytes_of(value))
    }

    pub fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.require_pipeline("draw");
        self.command_list.draw(vertex_count, first_vertex)
    }

    pub fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.require_pipeline("draw_indexed");
        self.command_list.draw_indexed(index_count, first_index, vertex_offset)
    }

    /// View of an attachment this pass declared as sampled
    ///
    /// # Panics
    ///
    /// Panics if the pass did not declare `attachment` with `Pass::sample`.
    pub fn sampled_view(&self, attachment: &str) -> Arc<dyn RenderTarget> {
        if !self.sampled.iter().any(|s| s == attachment) {
            engine_fatal!("stellar::PassContext",
                "Pass '{}' reads '{}' without declaring it sampled", self.pass_name, attachment);
        }
        match self.context.attachments().view(attachment) {
            Some(view) => view,
            None => engine_fatal!("stellar::PassContext",
                "Pass '{}': attachment '{}' has no view", self.pass_name, attachment),
        }
    }

    fn require_pipeline(&self, operation: &str) -> &Arc<dyn Pipeline> {
        match &self.pipeline {
            Some(pipeline) => pipeline,
            None => engine_fatal!("stellar::PassContext",
                "Pass '{}': {} without a bound pipeline", self.pass_name, operation),
        }
    }
}

/// Narrow a dynamic buffer offset to the u32 the command list takes
///
/// # Panics
///
/// Panics when `offset` does not fit in 32 bits.
pub(crate) fn dynamic_offset(pass_name: &str, set_index: u32, binding: u32, offset: u64) -> u32 {
    match u32::try_from(offset) {
        Ok(offset) => offset,
        Err(_) => engine_fatal!("stellar::PassContext",
            "Pass '{}': set {} binding {} dynamic offset {} exceeds u32",
            pass_name, set_index, binding, offset),
    }
}

/// CommandList - primary command recording

use std::sync::Arc;
use crate::error::Result;
use crate::device::{
    Buffer, DescriptorSet, Framebuffer, IndexType, Pipeline, RenderPass, ShaderStageFlags,
};

/// Recorder of one frame's (or one thread's) GPU work
///
/// `begin` .. `end`, then `GraphicsDevice::submit`. Draw and pipeline
/// commands are only valid between `begin_render_pass` and `end_render_pass`.
pub trait CommandList: Send + Sync {
    /// Begin recording commands (implicitly resets previous contents)
    fn begin(&mut self) -> Result<()>;

    /// Close recording; fails inside an open render pass
    fn end(&mut self) -> Result<()>;

    /// Start `render_pass` over the whole `framebuffer`
    ///
    /// `clear_values` holds one value per attachment, colors first, then depth.
    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()>;

    fn end_render_pass(&mut self) -> Result<()>;

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    /// Bind a descriptor set at `set_index`
    ///
    /// # Arguments
    ///
    /// * `pipeline` - Pipeline whose layout the set belongs to
    /// * `set_index` - Set index
    /// * `descriptor_set` - The descriptor set to bind
    /// * `dynamic_offsets` - One offset per dynamic binding, in binding order
    fn bind_descriptor_set(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        descriptor_set: &Arc<dyn DescriptorSet>,
        dynamic_offsets: &[u32],
    ) -> Result<()>;

    /// Write `data` into the push constant range at `offset`
    fn push_constants(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()>;

    /// Bind `buffer` at vertex binding 0
    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()>;

    /// Non-indexed draw of a single instance
    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()>;

    /// Indexed draw of a single instance
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()>;
}

/// Viewport rectangle in pixels plus depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Viewport covering `width` x `height` with the full depth range
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Scissor rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    /// Rectangle at the origin covering `width` x `height`
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// Value an attachment is cleared to by `LoadOp::Clear`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// RGBA
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

impl ClearValue {
    /// Opaque black
    pub const BLACK: Self = ClearValue::Color([0.0, 0.0, 0.0, 1.0]);

    /// Far plane depth, zero stencil
    pub const DEPTH_ONE: Self = ClearValue::DepthStencil { depth: 1.0, stencil: 0 };
}

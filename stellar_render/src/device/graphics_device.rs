/// GraphicsDevice trait - the factory and queue interface of a backend

use std::sync::Arc;
use crate::device::{
    Buffer, BufferDesc, CommandList, DescriptorPool, DescriptorPoolDesc, Fence, Framebuffer,
    FramebufferDesc, Pipeline, PipelineDesc, RenderPass, RenderPassDesc, RenderTarget,
    Semaphore, Texture, TextureDesc,
};
use crate::error::Result;

/// Device limits the frame layer depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Required alignment of uniform buffer offsets (including dynamic offsets)
    pub min_uniform_buffer_offset_alignment: u64,
    /// Required alignment of storage buffer offsets
    pub min_storage_buffer_offset_alignment: u64,
    /// Largest framebuffer width/height
    pub max_framebuffer_extent: u32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            min_uniform_buffer_offset_alignment: 256,
            min_storage_buffer_offset_alignment: 256,
            max_framebuffer_extent: 16384,
        }
    }
}

/// One queue submission
///
/// The wait on `wait_semaphore` happens at the color-attachment-output stage.
#[derive(Clone, Copy, Default)]
pub struct SubmitInfo<'a> {
    /// Semaphore to wait on before color output (e.g. "image acquired")
    pub wait_semaphore: Option<&'a dyn Semaphore>,
    /// Semaphore signalled when the commands complete (e.g. "rendering finished")
    pub signal_semaphore: Option<&'a dyn Semaphore>,
    /// Fence signalled when the commands complete
    pub fence: Option<&'a dyn Fence>,
}

/// Main device trait
///
/// Central factory interface for creating GPU objects. Implemented by
/// backend-specific devices (e.g., VulkanDevice). Every method takes `&self`
/// so the device can be shared as `Arc<dyn GraphicsDevice>`.
pub trait GraphicsDevice: Send + Sync {
    /// Limits relevant to scratch memory and attachments
    fn limits(&self) -> DeviceLimits;

    /// Create a texture (device-local image)
    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Create a view over a whole texture for use as attachment or sampled input
    fn create_render_target(&self, texture: &Arc<dyn Texture>) -> Result<Arc<dyn RenderTarget>>;

    /// Create a host-visible, persistently mapped buffer
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a render pass
    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>>;

    /// Create a framebuffer
    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>>;

    /// Create a graphics pipeline compatible with `render_pass`
    fn create_pipeline(&self, desc: &PipelineDesc, render_pass: &Arc<dyn RenderPass>) -> Result<Arc<dyn Pipeline>>;

    /// Create a descriptor pool
    fn create_descriptor_pool(&self, desc: &DescriptorPoolDesc) -> Result<Box<dyn DescriptorPool>>;

    /// Create a fence, optionally already signalled
    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>>;

    /// Create a binary semaphore
    fn create_semaphore(&self) -> Result<Box<dyn Semaphore>>;

    /// Create a primary command list
    fn create_command_list(&self) -> Result<Box<dyn CommandList>>;

    /// Submit a recorded command list to the graphics queue
    fn submit(&self, commands: &dyn CommandList, info: &SubmitInfo<'_>) -> Result<()>;

    /// Wait for all GPU work to complete
    fn wait_idle(&self) -> Result<()>;
}

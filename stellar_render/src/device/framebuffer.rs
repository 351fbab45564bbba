/// Framebuffer trait and descriptor

use std::sync::Arc;
use crate::device::{RenderPass, RenderTarget};
use crate::utils::ResourceId;

/// Framebuffer trait
///
/// Binds concrete render target views to the attachment slots of a render pass.
pub trait Framebuffer: Send + Sync {
    /// Unique id of this framebuffer
    fn id(&self) -> ResourceId;

    /// Width in pixels
    fn width(&self) -> u32;

    /// Height in pixels
    fn height(&self) -> u32;
}

/// Descriptor for creating a framebuffer
#[derive(Clone)]
pub struct FramebufferDesc {
    /// Debug name attached to the native object
    pub debug_name: String,
    /// Render pass the framebuffer must be compatible with
    pub render_pass: Arc<dyn RenderPass>,
    /// Color attachment views, in render pass order
    pub color_attachments: Vec<Arc<dyn RenderTarget>>,
    /// Optional depth attachment view
    pub depth_attachment: Option<Arc<dyn RenderTarget>>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// RenderPass trait - describes how attachments are loaded, stored and transitioned

use crate::device::TextureFormat;
use crate::utils::ResourceId;

/// Render pass trait
///
/// Describes how attachments are loaded, stored, and transitioned during rendering.
pub trait RenderPass: Send + Sync {
    /// Unique id of this render pass
    fn id(&self) -> ResourceId;

    /// Number of color attachments
    fn color_attachment_count(&self) -> usize;

    /// Whether the render pass has a depth attachment
    fn has_depth_attachment(&self) -> bool;
}

/// Descriptor for creating a render pass
#[derive(Debug, Clone, Default)]
pub struct RenderPassDesc {
    /// Debug name attached to the native object
    pub debug_name: String,
    /// Color attachments
    pub color_attachments: Vec<AttachmentDesc>,
    /// Optional depth attachment
    pub depth_attachment: Option<AttachmentDesc>,
}

/// Descriptor for a single attachment in a render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentDesc {
    /// Pixel format
    pub format: TextureFormat,
    /// Number of samples (1 = no MSAA)
    pub samples: u32,
    /// Load operation (what to do with existing content)
    pub load_op: LoadOp,
    /// Store operation (what to do with rendered content)
    pub store_op: StoreOp,
    /// Initial layout (how the attachment starts)
    pub initial_layout: ImageLayout,
    /// Final layout (how the attachment ends)
    pub final_layout: ImageLayout,
}

/// Load operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOp {
    /// Load existing content
    Load,
    /// Clear the content
    Clear,
    /// Don't care about existing content
    DontCare,
}

/// Store operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// Store the rendered content
    Store,
    /// Don't care about storing the content
    DontCare,
}

/// Image layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    /// Undefined layout (contents may be discarded)
    Undefined,
    /// Layout for color attachment
    ColorAttachment,
    /// Layout for depth/stencil attachment
    DepthStencilAttachment,
    /// Layout for shader read-only access
    ShaderReadOnly,
    /// Layout for transfer source
    TransferSrc,
    /// Layout for transfer destination
    TransferDst,
    /// Layout for presenting to swapchain
    PresentSrc,
}

impl ImageLayout {
    /// Layout an attachment of `format` is in while being rendered to
    pub fn attachment_optimal(format: TextureFormat) -> Self {
        if format.is_depth() {
            ImageLayout::DepthStencilAttachment
        } else {
            ImageLayout::ColorAttachment
        }
    }
}

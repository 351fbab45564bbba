/// Attachment registry: arena of named attachments, including the swapchain

use std::sync::Arc;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use crate::device::{GraphicsDevice, RenderTarget, Texture, TextureDesc, TextureFormat, TextureUsage};
use crate::error::{Error, Result};
use crate::frame::{DeferredDeletionQueue, DeferredResource, RenderEvent};
use crate::{engine_debug, engine_error, engine_info};

/// Reserved name of the attachment bound to the acquired swapchain image
pub const SWAPCHAIN_ATTACHMENT: &str = "swapchain";

new_key_type! {
    /// Stable handle of an attachment, valid until the attachment is removed
    pub struct AttachmentId;
}

/// How the extent of an attachment is determined
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttachmentSize {
    /// Fixed extent in pixels
    Fixed { width: u32, height: u32 },
    /// Swapchain extent multiplied by `scale`; follows swapchain recreation
    SwapchainRelative { scale: f32 },
}

impl AttachmentSize {
    /// Extent for a swapchain of `swapchain_extent`
    pub fn resolve(&self, swapchain_extent: (u32, u32)) -> (u32, u32) {
        match *self {
            AttachmentSize::Fixed { width, height } => (width, height),
            AttachmentSize::SwapchainRelative { scale } => (
                ((swapchain_extent.0 as f32 * scale).round() as u32).max(1),
                ((swapchain_extent.1 as f32 * scale).round() as u32).max(1),
            ),
        }
    }
}

/// Parameters of [`AttachmentRegistry::create_attachment`]
#[derive(Debug, Clone)]
pub struct AttachmentCreateInfo {
    pub name: String,
    pub format: TextureFormat,
    pub samples: u32,
    pub size: AttachmentSize,
}

impl AttachmentCreateInfo {
    /// Single-sampled attachment
    pub fn new(name: &str, format: TextureFormat, size: AttachmentSize) -> Self {
        Self { name: name.to_string(), format, samples: 1, size }
    }
}

/// A named logical image
///
/// Owned attachments hold their texture; the swapchain attachment only
/// holds the view of the image acquired this frame.
pub struct Attachment {
    name: String,
    format: TextureFormat,
    samples: u32,
    size: AttachmentSize,
    extent: (u32, u32),
    texture: Option<Arc<dyn Texture>>,
    view: Option<Arc<dyn RenderTarget>>,
}

impl Attachment {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn size(&self) -> AttachmentSize {
        self.size
    }

    /// Current (width, height)
    pub fn extent(&self) -> (u32, u32) {
        self.extent
    }

    /// Current view (None for the swapchain before the first acquire)
    pub fn view(&self) -> Option<&Arc<dyn RenderTarget>> {
        self.view.as_ref()
    }

    /// Backing texture (None for the swapchain)
    pub fn texture(&self) -> Option<&Arc<dyn Texture>> {
        self.texture.as_ref()
    }

    pub fn is_swapchain(&self) -> bool {
        self.name == SWAPCHAIN_ATTACHMENT
    }
}

/// Owner of every attachment
///
/// Attachments live in a slot map arena; everything else refers to them by
/// name or [`AttachmentId`]. Replaced images and views go to the deferred
/// deletion queue instead of being dropped while frames may still use them.
pub struct AttachmentRegistry {
    device: Arc<dyn GraphicsDevice>,
    attachments: SlotMap<AttachmentId, Attachment>,
    names: FxHashMap<String, AttachmentId>,
    swapchain: AttachmentId,
    swapchain_extent: (u32, u32),
    deletion_frames: u32,
}

impl AttachmentRegistry {
    /// Create a registry holding only the swapchain attachment
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        swapchain_format: TextureFormat,
        swapchain_extent: (u32, u32),
        deletion_frames: u32,
    ) -> Self {
        let mut attachments = SlotMap::with_key();
        let swapchain = attachments.insert(Attachment {
            name: SWAPCHAIN_ATTACHMENT.to_string(),
            format: swapchain_format,
            samples: 1,
            size: AttachmentSize::SwapchainRelative { scale: 1.0 },
            extent: swapchain_extent,
            texture: None,
            view: None,
        });
        let mut names = FxHashMap::default();
        names.insert(SWAPCHAIN_ATTACHMENT.to_string(), swapchain);

        Self {
            device,
            attachments,
            names,
            swapchain,
            swapchain_extent,
            deletion_frames,
        }
    }

    /// Create an owned attachment
    pub fn create_attachment(&mut self, info: &AttachmentCreateInfo) -> Result<AttachmentId> {
        if self.names.contains_key(&info.name) {
            engine_error!("stellar::AttachmentRegistry",
                "Attachment '{}' already exists", info.name);
            return Err(Error::InvalidResource(format!("attachment '{}' already exists", info.name)));
        }
        if info.samples == 0 {
            return Err(Error::InvalidResource(format!(
                "attachment '{}': sample count must be at least 1", info.name)));
        }

        let extent = info.size.resolve(self.swapchain_extent);
        let (texture, view) = self.allocate_image(&info.name, info.format, info.samples, extent)?;
        let id = self.attachments.insert(Attachment {
            name: info.name.clone(),
            format: info.format,
            samples: info.samples,
            size: info.size,
            extent,
            texture: Some(texture),
            view: Some(view),
        });
        self.names.insert(info.name.clone(), id);

        engine_info!("stellar::AttachmentRegistry",
            "Created attachment '{}' {:?} {}x{}", info.name, info.format, extent.0, extent.1);
        Ok(id)
    }

    /// Resize an owned attachment to a fixed extent
    ///
    /// The old image and view are deferred; a relative attachment becomes fixed.
    pub fn resize_attachment(
        &mut self,
        name: &str,
        width: u32,
        height: u32,
        deletion: &mut DeferredDeletionQueue,
    ) -> Result<()> {
        let id = self.owned_id(name)?;
        self.attachments[id].size = AttachmentSize::Fixed { width, height };
        self.reallocate(id, (width, height), deletion)
    }

    /// Remove an owned attachment; its image is deferred
    pub fn remove_attachment(&mut self, name: &str, deletion: &mut DeferredDeletionQueue) -> Result<()> {
        let id = self.owned_id(name)?;
        self.names.remove(name);
        if let Some(attachment) = self.attachments.remove(id) {
            self.defer(attachment.texture, attachment.view, deletion);
        }
        engine_debug!("stellar::AttachmentRegistry", "Removed attachment '{}'", name);
        Ok(())
    }

    /// Point the swapchain attachment at the image acquired this frame
    pub fn rebind_swapchain(&mut self, view: Arc<dyn RenderTarget>) {
        let attachment = &mut self.attachments[self.swapchain];
        attachment.extent = (view.width(), view.height());
        attachment.format = view.format();
        attachment.view = Some(view);
    }

    /// Apply drained render events: follow the swapchain extent
    pub fn process_events(&mut self, events: &[RenderEvent], deletion: &mut DeferredDeletionQueue) -> Result<()> {
        for event in events {
            match *event {
                RenderEvent::SwapchainRecreated { width, height, format } => {
                    self.swapchain_extent = (width, height);
                    let swapchain = &mut self.attachments[self.swapchain];
                    swapchain.extent = (width, height);
                    swapchain.format = format;
                    // Views of the old swapchain are owned by it
                    swapchain.view = None;

                    let relative: Vec<AttachmentId> = self.attachments.iter()
                        .filter(|(id, a)| *id != self.swapchain
                            && matches!(a.size, AttachmentSize::SwapchainRelative { .. }))
                        .map(|(id, _)| id)
                        .collect();
                    for id in relative {
                        let extent = self.attachments[id].size.resolve((width, height));
                        self.reallocate(id, extent, deletion)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Id of the attachment called `name`
    pub fn id(&self, name: &str) -> Option<AttachmentId> {
        self.names.get(name).copied()
    }

    pub fn get(&self, id: AttachmentId) -> Option<&Attachment> {
        self.attachments.get(id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Attachment> {
        self.id(name).and_then(|id| self.attachments.get(id))
    }

    /// Current view of the attachment called `name`
    pub fn view(&self, name: &str) -> Option<Arc<dyn RenderTarget>> {
        self.by_name(name).and_then(|a| a.view.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn swapchain_id(&self) -> AttachmentId {
        self.swapchain
    }

    pub fn swapchain_extent(&self) -> (u32, u32) {
        self.swapchain_extent
    }

    /// Number of attachments, the swapchain included
    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    // ===== INTERNAL =====

    fn owned_id(&self, name: &str) -> Result<AttachmentId> {
        match self.id(name) {
            Some(id) if id == self.swapchain => Err(Error::InvalidResource(format!(
                "attachment '{}' is managed by the swapchain", name))),
            Some(id) => Ok(id),
            None => Err(Error::InvalidResource(format!("unknown attachment '{}'", name))),
        }
    }

    fn allocate_image(
        &self,
        name: &str,
        format: TextureFormat,
        samples: u32,
        extent: (u32, u32),
    ) -> Result<(Arc<dyn Texture>, Arc<dyn RenderTarget>)> {
        let usage = if format.is_depth() {
            TextureUsage::DepthStencil
        } else {
            TextureUsage::SampledAndRenderTarget
        };
        let texture = self.device.create_texture(&TextureDesc {
            debug_name: name.to_string(),
            width: extent.0,
            height: extent.1,
            format,
            usage,
            samples,
        })?;
        let view = self.device.create_render_target(&texture)?;
        Ok((texture, view))
    }

    fn reallocate(&mut self, id: AttachmentId, extent: (u32, u32), deletion: &mut DeferredDeletionQueue) -> Result<()> {
        let attachment = &self.attachments[id];
        if attachment.extent == extent && attachment.view.is_some() {
            return Ok(());
        }
        let (texture, view) = self.allocate_image(
            &attachment.name, attachment.format, attachment.samples, extent)?;

        let attachment = &mut self.attachments[id];
        let old_texture = attachment.texture.replace(texture);
        let old_view = attachment.view.replace(view);
        attachment.extent = extent;
        engine_debug!("stellar::AttachmentRegistry",
            "Resized attachment '{}' to {}x{}", attachment.name, extent.0, extent.1);
        self.defer(old_texture, old_view, deletion);
        Ok(())
    }

    fn defer(
        &self,
        texture: Option<Arc<dyn Texture>>,
        view: Option<Arc<dyn RenderTarget>>,
        deletion: &mut DeferredDeletionQueue,
    ) {
        if let Some(view) = view {
            deletion.push(DeferredResource::RenderTarget(view), self.deletion_frames);
        }
        if let Some(texture) = texture {
            deletion.push(DeferredResource::Texture(texture), self.deletion_frames);
        }
    }
}

#[cfg(test)]
#[path = "attachment_registry_tests.rs"]
mod tests;

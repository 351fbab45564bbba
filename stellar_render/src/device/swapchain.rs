/// Swapchain trait - for window presentation

use std::sync::Arc;
use crate::device::{RenderTarget, Semaphore, TextureFormat};
use crate::error::Result;
use crate::utils::ResourceId;

/// Result of asking the presentation engine for the next image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired; `suboptimal` means the surface no longer matches exactly
    Acquired { image_index: u32, suboptimal: bool },
    /// The surface changed and the swapchain must be recreated before acquiring
    OutOfDate,
}

/// Result of a present request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// The image was queued for presentation
    Presented,
    /// Presented, but the swapchain should be recreated
    Suboptimal,
    /// Not presented: the surface changed
    OutOfDate,
}

/// Swapchain for presenting rendered images to a window
///
/// Acquire/present outcomes that only call for a resize are reported as
/// values, not errors.
pub trait Swapchain: Send + Sync {
    /// Unique id of this swapchain
    fn id(&self) -> ResourceId;

    /// Acquire the next image, signalling `signal` when it is ready to be rendered to
    fn acquire_next_image(&mut self, signal: &dyn Semaphore) -> Result<AcquireOutcome>;

    /// Present `image_index` once `wait` is signalled
    fn present(&mut self, image_index: u32, wait: &dyn Semaphore) -> Result<PresentOutcome>;

    /// Build a replacement swapchain for the same surface
    ///
    /// `self` is retired but stays alive: the caller decides when it is
    /// safe to drop it.
    fn recreate(&self, width: u32, height: u32) -> Result<Box<dyn Swapchain>>;

    /// View of swapchain image `image_index`
    fn render_target(&self, image_index: u32) -> Arc<dyn RenderTarget>;

    /// Get the number of images in the swapchain
    fn image_count(&self) -> usize;

    /// Get the width of the swapchain images in pixels
    fn width(&self) -> u32;

    /// Get the height of the swapchain images in pixels
    fn height(&self) -> u32;

    /// Get the pixel format of the swapchain images
    fn format(&self) -> TextureFormat;
}

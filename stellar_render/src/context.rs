/// Render context: the shared state of one renderer instance

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use crate::attachment::{AttachmentCreateInfo, AttachmentId, AttachmentRegistry};
use crate::cache::ResourceCaches;
use crate::config::FrameConfig;
use crate::device::{GraphicsDevice, PipelineDesc, Swapchain};
use crate::error::Result;
use crate::frame::DeferredDeletionQueue;
use crate::render_graph::PipelineLibrary;
use crate::engine_info;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Device, configuration, attachments, caches and pipelines of a renderer
///
/// Created once next to the swapchain, then borrowed by render graphs and
/// shared (through `Arc`s) with the frame lifecycle manager. The attachment
/// registry, pipeline library and deletion queue each sit behind one lock;
/// when two are held, the registry is locked first.
pub struct RenderContext {
    device: Arc<dyn GraphicsDevice>,
    config: FrameConfig,
    attachments: Arc<Mutex<AttachmentRegistry>>,
    caches: ResourceCaches,
    pipelines: Mutex<PipelineLibrary>,
    deletion: Arc<Mutex<DeferredDeletionQueue>>,
}

impl RenderContext {
    /// Create a context for presenting to `swapchain`
    pub fn new(device: Arc<dyn GraphicsDevice>, config: FrameConfig, swapchain: &dyn Swapchain) -> Result<Self> {
        config.validate()?;
        let attachments = AttachmentRegistry::new(
            device.clone(),
            swapchain.format(),
            (swapchain.width(), swapchain.height()),
            config.deferred_deletion_frames(),
        );
        let caches = ResourceCaches::new(device.clone(), &config)?;

        engine_info!("stellar::RenderContext",
            "Render context ready ({} frames in flight, swapchain {:?} {}x{})",
            config.max_frames_in_flight, swapchain.format(), swapchain.width(), swapchain.height());

        Ok(Self {
            device,
            config,
            attachments: Arc::new(Mutex::new(attachments)),
            caches,
            pipelines: Mutex::new(PipelineLibrary::new()),
            deletion: Arc::new(Mutex::new(DeferredDeletionQueue::new())),
        })
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Lock the attachment registry
    pub fn attachments(&self) -> MutexGuard<'_, AttachmentRegistry> {
        lock(&self.attachments)
    }

    pub fn caches(&self) -> &ResourceCaches {
        &self.caches
    }

    /// Lock the pipeline library
    pub fn pipelines(&self) -> MutexGuard<'_, PipelineLibrary> {
        lock(&self.pipelines)
    }

    /// Lock the deferred deletion queue
    pub fn deletion_queue(&self) -> MutexGuard<'_, DeferredDeletionQueue> {
        lock(&self.deletion)
    }

    // ===== CONVENIENCE =====

    /// Register (or replace) a named pipeline; returns its generation
    pub fn register_pipeline(&self, desc: PipelineDesc) -> u64 {
        self.pipelines().register_pipeline(desc)
    }

    /// Create an owned attachment
    pub fn create_attachment(&self, info: &AttachmentCreateInfo) -> Result<AttachmentId> {
        self.attachments().create_attachment(info)
    }

    /// Resize an owned attachment; the old image is deferred
    pub fn resize_attachment(&self, name: &str, width: u32, height: u32) -> Result<()> {
        let mut attachments = self.attachments();
        attachments.resize_attachment(name, width, height, &mut self.deletion_queue())
    }

    /// Remove an owned attachment; its image is deferred
    pub fn remove_attachment(&self, name: &str) -> Result<()> {
        let mut attachments = self.attachments();
        attachments.remove_attachment(name, &mut self.deletion_queue())
    }

    pub(crate) fn shared_attachments(&self) -> Arc<Mutex<AttachmentRegistry>> {
        self.attachments.clone()
    }

    pub(crate) fn shared_deletion_queue(&self) -> Arc<Mutex<DeferredDeletionQueue>> {
        self.deletion.clone()
    }
}

/// Frame-in-flight lifecycle: ring of frame contexts, acquire/submit/present,
/// cache eviction ticks and deferred deletion

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use crate::attachment::AttachmentRegistry;
use crate::cache::FrameTick;
use crate::config::FrameConfig;
use crate::context::RenderContext;
use crate::device::{AcquireOutcome, GraphicsDevice, PresentOutcome, SubmitInfo, Swapchain};
use crate::error::{Error, Result};
use crate::frame::{
    ActiveFrame, DeferredDeletionQueue, DeferredResource, EventQueue, FrameContext, FrameState,
    RenderEvent, ThreadSessions,
};
use crate::{engine_debug, engine_error, engine_fatal, engine_info, engine_trace, engine_warn};

/// Acquire attempts (each followed by a swapchain recreation) before giving up
const MAX_ACQUIRE_ATTEMPTS: u32 = 3;

/// Diagnostics snapshot of the frame lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames presented so far
    pub frame_number: u64,
    /// Current ring slot
    pub slot: usize,
    /// Swapchain image of the last acquired frame
    pub image_index: Option<u32>,
    pub swapchain_recreations: u64,
    pub pending_deletions: usize,
    pub swapchain_extent: (u32, u32),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owner of the frame-in-flight ring
///
/// Per slot: `Idle -> Acquiring -> Recording -> Submitted -> (fence) -> Idle`.
/// A slot is reused only after its fence is observed signaled, which bounds
/// the CPU to `max_frames_in_flight` frames ahead of the GPU.
///
/// # Example
///
/// ```ignore
/// let mut frames = FrameLifecycleManager::new(&context, swapchain)?;
/// loop {
///     {
///         let mut frame = frames.wait_for_frame()?;
///         let mut graph = RenderGraph::new(&context);
///         graph.add_pass(Pass::new("main").output("swapchain", LoadPolicy::Clear(ClearValue::BLACK)));
///         graph.build(&mut frame)?;
///     }
///     frames.submit_frame_commands()?;
///     frames.present()?;
/// }
/// ```
pub struct FrameLifecycleManager {
    device: Arc<dyn GraphicsDevice>,
    config: FrameConfig,
    swapchain: Box<dyn Swapchain>,
    frames: Vec<FrameContext>,
    current: usize,
    frame_number: u64,
    attachments: Arc<Mutex<AttachmentRegistry>>,
    deletion: Arc<Mutex<DeferredDeletionQueue>>,
    caches: Vec<Arc<dyn FrameTick>>,
    events: EventQueue,
    pending_resize: Option<(u32, u32)>,
    last_image_index: Option<u32>,
    swapchain_recreations: u64,
}

impl FrameLifecycleManager {
    /// Create the ring of `max_frames_in_flight` frame contexts
    ///
    /// Every cache of `context` is registered for per-frame eviction.
    pub fn new(context: &RenderContext, swapchain: Box<dyn Swapchain>) -> Result<Self> {
        let config = context.config().clone();
        config.validate()?;
        let device = context.device().clone();

        let mut frames = Vec::with_capacity(config.max_frames_in_flight as usize);
        for slot in 0..config.max_frames_in_flight as usize {
            frames.push(FrameContext::new(device.as_ref(), &config, slot)?);
        }

        engine_info!("stellar::FrameLifecycleManager",
            "Created {} frame contexts ({} worker threads, swapchain {}x{} with {} images)",
            frames.len(), config.num_threads, swapchain.width(), swapchain.height(),
            swapchain.image_count());

        Ok(Self {
            device,
            config,
            swapchain,
            frames,
            current: 0,
            frame_number: 0,
            attachments: context.shared_attachments(),
            deletion: context.shared_deletion_queue(),
            caches: context.caches().tickables(),
            events: EventQueue::new(),
            pending_resize: None,
            last_image_index: None,
            swapchain_recreations: 0,
        })
    }

    /// Register an additional cache to tick on every `next_frame`
    pub fn register_cache(&mut self, cache: Arc<dyn FrameTick>) {
        self.caches.push(cache);
    }

    /// Wait for the current slot, acquire a swapchain image and start recording
    ///
    /// Blocks until the GPU has finished the frame that last used the slot.
    /// An out-of-date swapchain is recreated here; the old one is deferred.
    pub fn wait_for_frame(&mut self) -> Result<ActiveFrame<'_>> {
        let slot = self.current;
        {
            let frame = &mut self.frames[slot];
            match frame.state {
                FrameState::Idle | FrameState::Submitted => {}
                state => engine_fatal!("stellar::FrameLifecycleManager",
                    "wait_for_frame() called on slot {} in state {:?}", slot, state),
            }
            frame.fence.wait(u64::MAX)?;
            frame.state = FrameState::Acquiring;
        }

        let image_index = match self.prepare_frame(slot) {
            Ok(image_index) => image_index,
            Err(err) => {
                // The fence is still signaled: the slot can be retried
                self.frames[slot].state = FrameState::Idle;
                return Err(err);
            }
        };
        self.last_image_index = Some(image_index);

        let frame = &mut self.frames[slot];
        frame.image_index = Some(image_index);
        frame.state = FrameState::Recording;
        engine_trace!("stellar::FrameLifecycleManager",
            "Frame {} recording (slot {}, image {})", self.frame_number, slot, image_index);

        Ok(ActiveFrame {
            slot,
            image_index,
            frame_number: self.frame_number,
            command_list: frame.command_list.as_mut(),
            scratch: &mut frame.scratch,
            threads: ThreadSessions::new(&frame.threads),
        })
    }

    /// Close the command list and submit it
    ///
    /// Waits on "image acquired", signals "rendering finished" and the slot fence.
    pub fn submit_frame_commands(&mut self) -> Result<()> {
        let slot = self.current;
        let frame = &mut self.frames[slot];
        if frame.state != FrameState::Recording {
            engine_fatal!("stellar::FrameLifecycleManager",
                "submit_frame_commands() called on slot {} in state {:?}", slot, frame.state);
        }

        frame.command_list.end()?;
        frame.fence.reset()?;
        self.device.submit(frame.command_list.as_ref(), &SubmitInfo {
            wait_semaphore: Some(frame.image_acquired.as_ref()),
            signal_semaphore: Some(frame.rendering_finished.as_ref()),
            fence: Some(frame.fence.as_ref()),
        })?;
        frame.state = FrameState::Submitted;
        Ok(())
    }

    /// Present the acquired image, then advance to the next frame
    ///
    /// Suboptimal and out-of-date results schedule a swapchain recreation at
    /// the next `wait_for_frame`.
    pub fn present(&mut self) -> Result<PresentOutcome> {
        let slot = self.current;
        let frame = &mut self.frames[slot];
        let image_index = match (frame.state, frame.image_index.take()) {
            (FrameState::Submitted, Some(image_index)) => image_index,
            (state, _) => engine_fatal!("stellar::FrameLifecycleManager",
                "present() called on slot {} in state {:?}", slot, state),
        };

        let result = self.swapchain.present(image_index, frame.rendering_finished.as_ref());
        self.next_frame();

        let outcome = result?;
        if outcome != PresentOutcome::Presented {
            engine_debug!("stellar::FrameLifecycleManager",
                "Present returned {:?}, scheduling swapchain recreation", outcome);
            let extent = (self.swapchain.width(), self.swapchain.height());
            self.pending_resize.get_or_insert(extent);
        }
        Ok(outcome)
    }

    /// Advance the ring, tick every cache and the deferred deletion queue
    pub fn next_frame(&mut self) {
        self.current = (self.current + 1) % self.frames.len();
        self.frame_number += 1;

        let evicted: usize = self.caches.iter().map(|cache| cache.tick()).sum();
        let freed = lock(&self.deletion).next_frame();
        if evicted > 0 || freed > 0 {
            engine_trace!("stellar::FrameLifecycleManager",
                "Frame {}: evicted {} cached objects, freed {} deferred resources",
                self.frame_number, evicted, freed);
        }
    }

    /// Ask for a swapchain of `width` x `height`, built at the next `wait_for_frame`
    pub fn request_resize(&mut self, width: u32, height: u32) {
        self.pending_resize = Some((width, height));
    }

    /// Wait for the GPU, free every deferred resource and empty every cache
    pub fn shutdown(&mut self) -> Result<()> {
        self.device.wait_idle()?;
        let freed = lock(&self.deletion).flush();
        for cache in &self.caches {
            cache.clear_all();
        }
        engine_info!("stellar::FrameLifecycleManager",
            "Shutdown after {} frames ({} deferred resources freed)", self.frame_number, freed);
        Ok(())
    }

    /// Current ring slot
    pub fn current_slot(&self) -> usize {
        self.current
    }

    /// Number of frames presented (or skipped through `next_frame`)
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Number of ring slots
    pub fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    /// Current swapchain
    pub fn swapchain(&self) -> &dyn Swapchain {
        self.swapchain.as_ref()
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            frame_number: self.frame_number,
            slot: self.current,
            image_index: self.last_image_index,
            swapchain_recreations: self.swapchain_recreations,
            pending_deletions: lock(&self.deletion).len(),
            swapchain_extent: (self.swapchain.width(), self.swapchain.height()),
        }
    }

    // ===== INTERNAL =====

    /// Steps of `wait_for_frame` after the fence wait
    fn prepare_frame(&mut self, slot: usize) -> Result<u32> {
        if let Some((width, height)) = self.pending_resize.take() {
            self.recreate_swapchain(width, height)?;
        }
        let image_index = self.acquire(slot)?;

        let events = self.events.drain();
        let mut attachments = lock(&self.attachments);
        if !events.is_empty() {
            attachments.process_events(&events, &mut lock(&self.deletion))?;
        }
        attachments.rebind_swapchain(self.swapchain.render_target(image_index));
        drop(attachments);

        let frame = &mut self.frames[slot];
        frame.scratch.reset();
        for thread in &frame.threads {
            lock(thread).reset()?;
        }
        frame.command_list.begin()?;
        Ok(image_index)
    }

    fn acquire(&mut self, slot: usize) -> Result<u32> {
        for _ in 0..MAX_ACQUIRE_ATTEMPTS {
            let signal = self.frames[slot].image_acquired.as_ref();
            match self.swapchain.acquire_next_image(signal)? {
                AcquireOutcome::Acquired { image_index, suboptimal } => {
                    if suboptimal {
                        let extent = (self.swapchain.width(), self.swapchain.height());
                        self.pending_resize.get_or_insert(extent);
                    }
                    return Ok(image_index);
                }
                AcquireOutcome::OutOfDate => {
                    let (width, height) = self.pending_resize.take()
                        .unwrap_or((self.swapchain.width(), self.swapchain.height()));
                    engine_warn!("stellar::FrameLifecycleManager",
                        "Swapchain out of date, recreating at {}x{}", width, height);
                    self.recreate_swapchain(width, height)?;
                }
            }
        }
        engine_error!("stellar::FrameLifecycleManager",
            "Swapchain still out of date after {} recreations", MAX_ACQUIRE_ATTEMPTS);
        Err(Error::SurfaceLost)
    }

    /// Build a replacement swapchain; the old one is freed after
    /// `max_frames_in_flight + 2` frames
    fn recreate_swapchain(&mut self, width: u32, height: u32) -> Result<()> {
        let replacement = self.swapchain.recreate(width.max(1), height.max(1))?;
        let old = std::mem::replace(&mut self.swapchain, replacement);
        lock(&self.deletion).push(
            DeferredResource::Swapchain(old), self.config.deferred_deletion_frames());

        self.events.push(RenderEvent::SwapchainRecreated {
            width: self.swapchain.width(),
            height: self.swapchain.height(),
            format: self.swapchain.format(),
        });
        self.swapchain_recreations += 1;
        engine_info!("stellar::FrameLifecycleManager",
            "Swapchain recreated: {}x{} ({} images)",
            self.swapchain.width(), self.swapchain.height(), self.swapchain.image_count());
        Ok(())
    }
}

impl Drop for FrameLifecycleManager {
    fn drop(&mut self) {
        if let Err(err) = self.device.wait_idle() {
            engine_error!("stellar::FrameLifecycleManager", "wait_idle failed on drop: {}", err);
        }
    }
}

#[cfg(test)]
#[path = "frame_lifecycle_manager_tests.rs"]
mod tests;

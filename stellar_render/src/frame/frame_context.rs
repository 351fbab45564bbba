/// Per-slot frame state and the view of it handed to the client

use std::sync::Mutex;
use crate::config::FrameConfig;
use crate::device::{CommandList, Fence, GraphicsDevice, Semaphore};
use crate::error::Result;
use crate::frame::{ScratchSet, ThreadResources, ThreadSessions};

/// Lifecycle state of a ring slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Acquiring,
    Recording,
    Submitted,
}

/// Resources of one frame-in-flight slot
///
/// Reuse is guarded only by `fence`: it is waited on before the slot records again.
pub(crate) struct FrameContext {
    pub(crate) fence: Box<dyn Fence>,
    pub(crate) image_acquired: Box<dyn Semaphore>,
    pub(crate) rendering_finished: Box<dyn Semaphore>,
    pub(crate) command_list: Box<dyn CommandList>,
    pub(crate) scratch: ScratchSet,
    pub(crate) threads: Vec<Mutex<ThreadResources>>,
    pub(crate) state: FrameState,
    pub(crate) image_index: Option<u32>,
}

impl FrameContext {
    pub(crate) fn new(device: &dyn GraphicsDevice, config: &FrameConfig, slot: usize) -> Result<Self> {
        let mut threads = Vec::with_capacity(config.num_threads as usize);
        for thread in 0..config.num_threads {
            threads.push(Mutex::new(ThreadResources::new(
                device, config, &format!("frame{}.thread{}", slot, thread))?));
        }
        Ok(Self {
            // Signaled so the first wait on the slot returns immediately
            fence: device.create_fence(true)?,
            image_acquired: device.create_semaphore()?,
            rendering_finished: device.create_semaphore()?,
            command_list: device.create_command_list()?,
            scratch: ScratchSet::new(device, config, &format!("frame{}", slot))?,
            threads,
            state: FrameState::Idle,
            image_index: None,
        })
    }
}

/// The frame being recorded, returned by `FrameLifecycleManager::wait_for_frame`
pub struct ActiveFrame<'a> {
    pub(crate) slot: usize,
    pub(crate) image_index: u32,
    pub(crate) frame_number: u64,
    pub(crate) command_list: &'a mut dyn CommandList,
    pub(crate) scratch: &'a mut ScratchSet,
    pub(crate) threads: ThreadSessions<'a>,
}

impl<'a> ActiveFrame<'a> {
    /// Ring slot index
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Acquired swapchain image
    pub fn image_index(&self) -> u32 {
        self.image_index
    }

    /// Number of frames presented before this one
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Primary command list of the slot, already in the recording state
    pub fn command_list(&mut self) -> &mut dyn CommandList {
        &mut *self.command_list
    }

    /// Scratch allocators of the slot, reset at frame start
    pub fn scratch(&mut self) -> &mut ScratchSet {
        &mut *self.scratch
    }

    /// Worker thread sessions of the slot
    pub fn thread_sessions(&self) -> ThreadSessions<'a> {
        self.threads
    }
}

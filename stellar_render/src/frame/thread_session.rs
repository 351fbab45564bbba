/// Per-thread recording resources and the sessions granting access to them

use std::sync::{Mutex, MutexGuard, TryLockError};
use crate::config::FrameConfig;
use crate::device::{DescriptorPool, DescriptorPoolDesc, GraphicsDevice};
use crate::error::Result;
use crate::frame::ScratchSet;
use crate::engine_fatal;

/// Private scratch memory and descriptor pool of one worker thread index
///
/// One set exists per (ring slot, thread index); it is reset when its slot
/// starts a new frame.
pub struct ThreadResources {
    scratch: ScratchSet,
    descriptor_pool: Box<dyn DescriptorPool>,
}

impl ThreadResources {
    pub fn new(device: &dyn GraphicsDevice, config: &FrameConfig, label: &str) -> Result<Self> {
        Ok(Self {
            scratch: ScratchSet::new(device, config, label)?,
            descriptor_pool: device.create_descriptor_pool(&DescriptorPoolDesc::default())?,
        })
    }

    pub(crate) fn reset(&mut self) -> Result<()> {
        self.scratch.reset();
        self.descriptor_pool.reset()
    }
}

/// Entry point for worker threads of the active frame
///
/// Copyable, so it can be moved into scoped worker threads.
#[derive(Clone, Copy)]
pub struct ThreadSessions<'a> {
    slots: &'a [Mutex<ThreadResources>],
}

impl<'a> ThreadSessions<'a> {
    pub(crate) fn new(slots: &'a [Mutex<ThreadResources>]) -> Self {
        Self { slots }
    }

    /// Open a session on thread index `index`
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range or a session is already open on it.
    pub fn begin_thread(&self, index: usize) -> ThreadSession<'a> {
        let Some(slot) = self.slots.get(index) else {
            engine_fatal!("stellar::ThreadSessions",
                "Thread index {} out of range (num_threads = {})", index, self.slots.len());
        };
        let resources = match slot.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                engine_fatal!("stellar::ThreadSessions",
                    "Thread index {} already has an open session", index);
            }
        };
        ThreadSession { index, resources }
    }

    /// Number of thread indices (`num_threads`)
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Exclusive use of one thread index's resources until `end_thread`
pub struct ThreadSession<'a> {
    index: usize,
    resources: MutexGuard<'a, ThreadResources>,
}

impl ThreadSession<'_> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// The thread's scratch allocators
    pub fn scratch(&mut self) -> &mut ScratchSet {
        &mut self.resources.scratch
    }

    /// The thread's descriptor pool (reset when the slot starts a new frame)
    pub fn descriptor_pool(&mut self) -> &mut dyn DescriptorPool {
        self.resources.descriptor_pool.as_mut()
    }

    /// Close the session
    pub fn end_thread(self) {}
}

/// Deferred deletion queue for resources replaced while frames are in flight

use std::sync::Arc;
use crate::device::{Buffer, RenderTarget, Swapchain, Texture};
use crate::engine_trace;

/// A resource waiting for the GPU to stop referencing it
///
/// Dropping the value releases the native object (or the last reference
/// to it).
pub enum DeferredResource {
    Swapchain(Box<dyn Swapchain>),
    Texture(Arc<dyn Texture>),
    RenderTarget(Arc<dyn RenderTarget>),
    Buffer(Arc<dyn Buffer>),
}

impl DeferredResource {
    fn kind(&self) -> &'static str {
        match self {
            DeferredResource::Swapchain(_) => "swapchain",
            DeferredResource::Texture(_) => "texture",
            DeferredResource::RenderTarget(_) => "render target",
            DeferredResource::Buffer(_) => "buffer",
        }
    }
}

struct DeferredDeletionEntry {
    resource: DeferredResource,
    frames_left: u32,
}

/// Resources destroyed by the client but not yet freed
///
/// Each [`next_frame`](Self::next_frame) drops the entries whose counter is
/// already zero and decrements the rest. An entry pushed with `frames_left = N`
/// survives exactly `N` ticks and is freed by tick `N + 1`.
#[derive(Default)]
pub struct DeferredDeletionQueue {
    entries: Vec<DeferredDeletionEntry>,
    freed: u64,
}

impl DeferredDeletionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `resource` to be freed after `frames_left` frames
    pub fn push(&mut self, resource: DeferredResource, frames_left: u32) {
        engine_trace!("stellar::DeferredDeletionQueue",
            "Deferring {} deletion by {} frames", resource.kind(), frames_left);
        self.entries.push(DeferredDeletionEntry { resource, frames_left });
    }

    /// Advance one frame; returns the number of resources freed
    pub fn next_frame(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain_mut(|entry| {
            if entry.frames_left == 0 {
                return false;
            }
            entry.frames_left -= 1;
            true
        });
        let freed = before - self.entries.len();
        self.freed += freed as u64;
        freed
    }

    /// Free everything immediately (the device must be idle)
    pub fn flush(&mut self) -> usize {
        let freed = self.entries.len();
        self.entries.clear();
        self.freed += freed as u64;
        freed
    }

    /// Number of pending resources
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of resources freed so far
    pub fn freed_count(&self) -> u64 {
        self.freed
    }
}

#[cfg(test)]
#[path = "deferred_deletion_tests.rs"]
mod tests;

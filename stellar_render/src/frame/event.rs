/// Render events, queued by the frame lifecycle and drained once per frame

use crate::device::TextureFormat;

/// Something that happened to the presentation surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEvent {
    /// The swapchain was rebuilt with a new extent (and possibly format)
    SwapchainRecreated { width: u32, height: u32, format: TextureFormat },
}

/// FIFO of pending render events
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<RenderEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: RenderEvent) {
        self.events.push(event);
    }

    /// Take every pending event in publication order
    pub fn drain(&mut self) -> Vec<RenderEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

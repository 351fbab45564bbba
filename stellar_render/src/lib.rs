/*!
# Stellar Render

Frame graph and resource caching layer over an explicit graphics API.

A frame is described as an ordered list of passes over named attachments.
The layer infers image layouts and load/store behavior between passes,
creates and reuses native objects through structural caches with deferred
eviction, and manages per-frame-in-flight synchronization and scratch
memory so that recording never stalls on the GPU.

## Architecture

- **device**: backend-agnostic GPU object traits (implemented by backends)
- **StructuralCache**: content-keyed cache with per-frame idle eviction
- **AttachmentRegistry**: named attachments, including the swapchain
- **FrameLifecycleManager**: ring of frame contexts, acquire/submit/present,
  deferred deletion
- **ScratchAllocator**: per-frame linear allocator over mapped memory
- **RenderGraph**: layout inference and pass recording
*/

// Internal modules
mod error;
mod config;
mod context;
pub mod log;
pub mod device;
pub mod cache;
pub mod attachment;
pub mod frame;
pub mod render_graph;
pub mod utils;

// Main stellar namespace module
pub mod stellar {
    // Error types
    pub use crate::error::{Error, Result};

    // Configuration and shared context
    pub use crate::config::FrameConfig;
    pub use crate::context::RenderContext;

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{
            Logger, LogEntry, LogSeverity, DefaultLogger, set_logger, reset_logger,
            set_min_severity, min_severity,
        };
    }

    // Device traits and descriptors
    pub mod device {
        pub use crate::device::*;
    }

    // Structural caches
    pub mod cache {
        pub use crate::cache::*;
    }

    // Attachments
    pub mod attachment {
        pub use crate::attachment::*;
    }

    // Frame lifecycle and scratch memory
    pub mod frame {
        pub use crate::frame::*;
    }

    // Render graph
    pub mod graph {
        pub use crate::render_graph::*;
    }

    // Resource ids
    pub mod utils {
        pub use crate::utils::*;
    }
}

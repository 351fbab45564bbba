/// Frame configuration: ring size, scratch capacities and worker count

use crate::error::{Error, Result};

const MIB: u64 = 1024 * 1024;

/// Configuration of the frame lifecycle and its per-frame memory
///
/// # Example
///
/// ```ignore
/// let config = FrameConfig {
///     max_frames_in_flight: 3,
///     num_threads: 4,
///     ..FrameConfig::default()
/// };
/// config.validate()?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FrameConfig {
    /// Number of frame contexts in the ring (frames the CPU may run ahead of the GPU)
    pub max_frames_in_flight: u32,
    /// Capacity in bytes of each vertex scratch buffer
    pub vertex_scratch_size: u64,
    /// Capacity in bytes of each index scratch buffer
    pub index_scratch_size: u64,
    /// Capacity in bytes of each uniform scratch buffer
    pub uniform_scratch_size: u64,
    /// Capacity in bytes of each storage scratch buffer
    pub storage_scratch_size: u64,
    /// Number of worker thread sessions available per frame
    pub num_threads: u32,
    /// Idle frames before a cached object is evicted (None = `max_frames_in_flight + 1`)
    pub cache_idle_frames: Option<u32>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frames_in_flight: 2,
            vertex_scratch_size: 4 * MIB,
            index_scratch_size: MIB,
            uniform_scratch_size: MIB,
            storage_scratch_size: 4 * MIB,
            num_threads: 0,
            cache_idle_frames: None,
        }
    }
}

impl FrameConfig {
    /// Check the configuration for values the frame lifecycle cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_frames_in_flight == 0 {
            return Err(Error::InitializationFailed(
                "max_frames_in_flight must be at least 1".to_string()));
        }
        let sizes = [
            ("vertex_scratch_size", self.vertex_scratch_size),
            ("index_scratch_size", self.index_scratch_size),
            ("uniform_scratch_size", self.uniform_scratch_size),
            ("storage_scratch_size", self.storage_scratch_size),
        ];
        for (name, size) in sizes {
            if size == 0 {
                return Err(Error::InitializationFailed(format!("{} must not be zero", name)));
            }
        }
        if let Some(idle) = self.cache_idle_frames {
            if idle < self.max_frames_in_flight {
                return Err(Error::InitializationFailed(format!(
                    "cache_idle_frames ({}) must be at least max_frames_in_flight ({})",
                    idle, self.max_frames_in_flight)));
            }
        }
        Ok(())
    }

    /// Idle threshold used by every structural cache
    pub fn cache_max_frames(&self) -> u32 {
        self.cache_idle_frames.unwrap_or(self.max_frames_in_flight + 1)
    }

    /// Frames a replaced swapchain or attachment image waits before being freed
    pub fn deferred_deletion_frames(&self) -> u32 {
        self.max_frames_in_flight + 2
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

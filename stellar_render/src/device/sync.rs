/// GPU/CPU synchronization primitives

use crate::error::Result;
use crate::utils::ResourceId;

/// Fence: signalled by the GPU when a submission completes, waited on by the CPU
pub trait Fence: Send + Sync {
    /// Unique id of this fence
    fn id(&self) -> ResourceId;

    /// Block until the fence is signalled or `timeout_ns` elapses
    fn wait(&self, timeout_ns: u64) -> Result<()>;

    /// Return the fence to the unsignalled state
    fn reset(&self) -> Result<()>;

    /// Query the fence without blocking
    fn is_signaled(&self) -> Result<bool>;
}

/// Semaphore: GPU-to-GPU ordering between submissions and presentation
pub trait Semaphore: Send + Sync {
    /// Unique id of this semaphore
    fn id(&self) -> ResourceId;
}

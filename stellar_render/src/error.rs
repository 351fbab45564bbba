//! Error types for the Stellar renderer
//!
//! Device-level failures (out of memory, device lost, surface lost, failed
//! submissions) are surfaced as [`Error`] values and propagated with `?`.
//! Contract violations in calling code are not errors: they abort through
//! [`engine_fatal!`](crate::engine_fatal) after being logged.

use std::fmt;

/// Result type for Stellar renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stellar renderer errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan, etc.)
    BackendError(String),

    /// Out of GPU or host memory reported by the device
    OutOfMemory,

    /// Invalid resource (attachment, buffer, pipeline, etc.)
    InvalidResource(String),

    /// Initialization failed (device, swapchain, frame contexts)
    InitializationFailed(String),

    /// The logical device was lost; every object created from it is unusable
    DeviceLost,

    /// The presentation surface is gone (window destroyed)
    SurfaceLost,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::DeviceLost => write!(f, "Device lost"),
            Error::SurfaceLost => write!(f, "Surface lost"),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an error and build an [`Error::BackendError`] from the same message
///
/// # Example
///
/// ```ignore
/// device.create_fence(&info, None)
///     .map_err(|e| engine_err!("stellar::vulkan", "Failed to create fence: {:?}", e))?;
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::stellar::Error::BackendError(message)
    }};
}

/// Log an error and return it as `Err(Error::BackendError)` from the current function
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

/// Log an error and abort: the caller broke a usage contract
///
/// Used for programmer errors (unknown attachment names, unregistered
/// pipelines, out-of-order frame calls) and scratch-memory exhaustion.
#[macro_export]
macro_rules! engine_fatal {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        panic!("[{}] {}", $source, message)
    }};
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

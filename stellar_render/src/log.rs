//! Logging for every stellar component
//!
//! Components log through the `engine_*` macros with a `stellar::<Component>`
//! source. Entries go to one process-wide `Logger` (coloured console output
//! unless replaced) after passing the minimum severity filter. Errors carry
//! the file and line of the call site.

use chrono::{DateTime, Local};
use colored::*;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;

/// Process-wide log sink (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Entries below this severity are dropped before reaching the logger
static MIN_SEVERITY: AtomicU8 = AtomicU8::new(LogSeverity::Trace as u8);

/// Destination of log entries
///
/// # Example
///
/// ```no_run
/// use std::sync::Mutex;
/// use stellar_render::stellar::log::{Logger, LogEntry, set_logger};
///
/// #[derive(Default)]
/// struct CaptureLogger {
///     lines: Mutex<Vec<String>>,
/// }
///
/// impl Logger for CaptureLogger {
///     fn log(&self, entry: &LogEntry) {
///         self.lines.lock().unwrap().push(format!("{}: {}", entry.source, entry.message));
///     }
/// }
///
/// set_logger(CaptureLogger::default());
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

/// One log message as handed to the `Logger`
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,
    /// Time the macro was invoked
    pub timestamp: SystemTime,
    /// Component, e.g. "stellar::RenderGraph" or "stellar::vulkan::Swapchain"
    pub source: String,
    pub message: String,
    /// Call site, recorded by `engine_error!` only
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

/// Severity, ordered from the most verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogSeverity {
    /// Per-frame and per-object events (cache hits, evictions, deferred frees)
    Trace,
    Debug,
    /// Lifecycle events (device created, swapchain recreated, shutdown)
    Info,
    Warn,
    /// Failures; printed with the call site
    Error,
}

impl LogSeverity {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogSeverity::Trace,
            1 => LogSeverity::Debug,
            2 => LogSeverity::Info,
            3 => LogSeverity::Warn,
            _ => LogSeverity::Error,
        }
    }
}

/// Coloured stdout logger
///
/// `[2026-01-31 12:00:00.000] [INFO ] [stellar::Component] message`, with
/// ` (file:line)` appended when the entry carries a call site.
pub struct DefaultLogger;

impl DefaultLogger {
    fn severity_label(severity: LogSeverity) -> ColoredString {
        match severity {
            LogSeverity::Trace => "TRACE".bright_black(),
            LogSeverity::Debug => "DEBUG".cyan(),
            LogSeverity::Info => "INFO ".green(),
            LogSeverity::Warn => "WARN ".yellow(),
            LogSeverity::Error => "ERROR".red().bold(),
        }
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let local: DateTime<Local> = entry.timestamp.into();
        let location = match (entry.file, entry.line) {
            (Some(file), Some(line)) => format!(" ({}:{})", file, line),
            _ => String::new(),
        };
        println!(
            "[{}] [{}] [{}] {}{}",
            local.format("%Y-%m-%d %H:%M:%S%.3f"),
            Self::severity_label(entry.severity),
            entry.source.bright_blue(),
            entry.message,
            location,
        );
    }
}

// ===== SINK API =====

fn sink() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

/// Replace the process-wide logger
pub fn set_logger<L: Logger + 'static>(logger: L) {
    if let Ok(mut lock) = sink().write() {
        *lock = Box::new(logger);
    }
}

/// Reset the logger to DefaultLogger and the filter to Trace
pub fn reset_logger() {
    if let Ok(mut lock) = sink().write() {
        *lock = Box::new(DefaultLogger);
    }
    MIN_SEVERITY.store(LogSeverity::Trace as u8, Ordering::Relaxed);
}

/// Drop every entry below `severity`
pub fn set_min_severity(severity: LogSeverity) {
    MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
}

/// Current minimum severity
pub fn min_severity() -> LogSeverity {
    LogSeverity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
}

/// Entry point of the `engine_*` macros
#[doc(hidden)]
pub fn log(severity: LogSeverity, source: &str, message: String) {
    dispatch(severity, source, message, None, None);
}

/// Entry point of `engine_error!`, with the call site
#[doc(hidden)]
pub fn log_detailed(
    severity: LogSeverity,
    source: &str,
    message: String,
    file: &'static str,
    line: u32,
) {
    dispatch(severity, source, message, Some(file), Some(line));
}

fn dispatch(
    severity: LogSeverity,
    source: &str,
    message: String,
    file: Option<&'static str>,
    line: Option<u32>,
) {
    if severity < min_severity() {
        return;
    }
    if let Ok(lock) = sink().read() {
        lock.log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file,
            line,
        });
    }
}

// ===== LOGGING MACROS =====

/// Log at Trace severity
///
/// # Example
///
/// ```ignore
/// engine_trace!("stellar::StructuralCache", "hit for {:?}", key);
/// ```
#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log(
            $crate::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log at Debug severity
#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log(
            $crate::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log at Info severity
///
/// # Example
///
/// ```ignore
/// engine_info!("stellar::FrameLifecycleManager", "Swapchain recreated ({}x{})", w, h);
/// ```
#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log(
            $crate::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log at Warn severity
#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log(
            $crate::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log at Error severity, recording file and line
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log_detailed(
            $crate::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;

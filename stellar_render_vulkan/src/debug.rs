/// Vulkan validation messenger - validation layer messages with colored output
///
/// Formats messages from VK_LAYER_KHRONOS_validation for the console and/or a
/// log file, groups repeated messages and keeps per-severity statistics.
/// Only compiled with the `vulkan-validation` feature.

use ash::vk;
use chrono::Local;
use colored::*;
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::vulkan_config::{DebugMessageFilter, DebugOutput, DebugSeverity, ValidationStats};

/// Configuration read by the callback; `None` once the messenger is torn down
static DEBUG_CONFIG: Mutex<Option<Config>> = Mutex::new(None);

static VALIDATION_STATS: ValidationStatsTracker = ValidationStatsTracker::new();

/// Occurrences of each message text, for grouping identical messages
static MESSAGE_TRACKER: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

#[derive(Clone)]
pub(crate) struct Config {
    pub severity: DebugSeverity,
    pub output: DebugOutput,
    pub message_filter: DebugMessageFilter,
    pub break_on_error: bool,
    pub panic_on_error: bool,
    pub enable_stats: bool,
}

/// Severity of one validation message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageLevel {
    Error,
    Warning,
    Info,
    Verbose,
}

impl MessageLevel {
    const ALL: [MessageLevel; 4] = [Self::Error, Self::Warning, Self::Info, Self::Verbose];

    fn from_flags(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        use vk::DebugUtilsMessageSeverityFlagsEXT as Severity;
        if severity.contains(Severity::ERROR) {
            Self::Error
        } else if severity.contains(Severity::WARNING) {
            Self::Warning
        } else if severity.contains(Severity::INFO) {
            Self::Info
        } else {
            Self::Verbose
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Verbose => "VERBOSE",
        }
    }

    fn colored(self, text: &str) -> ColoredString {
        match self {
            Self::Error => text.red().bold(),
            Self::Warning => text.yellow().bold(),
            Self::Info => text.cyan(),
            Self::Verbose => text.bright_black(),
        }
    }
}

/// Message counts per level, indexed like `MessageLevel::ALL`
struct ValidationStatsTracker {
    counts: [AtomicU32; 4],
}

impl ValidationStatsTracker {
    const fn new() -> Self {
        Self {
            counts: [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)],
        }
    }

    fn record(&self, severity: vk::DebugUtilsMessageSeverityFlagsEXT) {
        let level = MessageLevel::from_flags(severity);
        self.counts[level as usize].fetch_add(1, Ordering::Relaxed);
    }

    fn get_stats(&self) -> ValidationStats {
        let count = |level: MessageLevel| self.counts[level as usize].load(Ordering::Relaxed);
        ValidationStats {
            errors: count(MessageLevel::Error),
            warnings: count(MessageLevel::Warning),
            info: count(MessageLevel::Info),
            verbose: count(MessageLevel::Verbose),
        }
    }

    fn reset(&self) {
        for count in &self.counts {
            count.store(0, Ordering::Relaxed);
        }
    }
}

/// Initialize debug configuration and reset statistics
pub(crate) fn init_debug_config(config: Config) {
    VALIDATION_STATS.reset();
    *MESSAGE_TRACKER.lock().unwrap_or_else(PoisonError::into_inner) = Some(FxHashMap::default());
    *DEBUG_CONFIG.lock().unwrap_or_else(PoisonError::into_inner) = Some(config);
}

/// Stop handling messages (called before the messenger is destroyed)
pub(crate) fn cleanup_debug_config() {
    *DEBUG_CONFIG.lock().unwrap_or_else(PoisonError::into_inner) = None;
}

/// Messenger severity flags requested for a severity setting
pub(crate) fn severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    match severity {
        DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        DebugSeverity::ErrorsAndWarnings => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        DebugSeverity::All => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

/// Whether a message of `message_type` passes the category filter
pub(crate) fn category_visible(
    filter: &DebugMessageFilter,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
) -> bool {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        filter.show_validation
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        filter.show_performance
    } else {
        filter.show_general
    }
}

/// Messages counted since the messenger was created
///
/// Counting requires `VulkanConfig::enable_validation_stats`.
pub fn get_validation_stats() -> ValidationStats {
    VALIDATION_STATS.get_stats()
}

/// Print the message counts per severity to stdout
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();
    if stats.total() == 0 {
        println!("{}", "Vulkan validation: no messages".green().bold());
        return;
    }

    let counts = [stats.errors, stats.warnings, stats.info, stats.verbose];
    let summary: Vec<String> = MessageLevel::ALL.iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(level, count)| format!("{} {}", level.colored(level.label()), count))
        .collect();
    println!("{} {} ({} total)",
        "Vulkan validation:".bright_blue().bold(), summary.join(", "), stats.total());

    let tracker = MESSAGE_TRACKER.lock().unwrap_or_else(PoisonError::into_inner);
    let repeated = tracker.as_ref()
        .map_or(0, |messages| messages.values().filter(|&&count| count > 1).count());
    if repeated > 0 {
        println!("  {} distinct message(s) were reported more than once", repeated);
    }
}

fn track_message(message: &str) -> u32 {
    let mut tracker = MESSAGE_TRACKER.lock().unwrap_or_else(PoisonError::into_inner);
    let count = tracker
        .get_or_insert_with(FxHashMap::default)
        .entry(message.to_string())
        .or_insert(0);
    *count += 1;
    *count
}

unsafe fn c_str_or<'a>(ptr: *const std::os::raw::c_char, fallback: &'a str) -> &'a str {
    if ptr.is_null() {
        fallback
    } else {
        CStr::from_ptr(ptr).to_str().unwrap_or("Invalid UTF-8")
    }
}

/// Messenger callback: filter, count, print, then optionally stop the process
///
/// Always returns `VK_FALSE` so the triggering call proceeds.
pub(crate) unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = &*p_callback_data;
    let message_id_name = c_str_or(callback_data.p_message_id_name, "Unknown");
    let message = c_str_or(callback_data.p_message, "No message");

    let config = match DEBUG_CONFIG.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
        Some(config) => config.clone(),
        None => return vk::FALSE,
    };

    if !severity_flags(config.severity).intersects(message_severity)
        || !category_visible(&config.message_filter, message_type)
    {
        return vk::FALSE;
    }

    let level = MessageLevel::from_flags(message_severity);
    let category = if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "performance"
    } else {
        "general"
    };

    let occurrences = if config.enable_stats {
        VALIDATION_STATS.record(message_severity);
        track_message(message)
    } else {
        1
    };
    let repeats = if occurrences > 1 {
        format!(" (seen {} times)", occurrences)
    } else {
        String::new()
    };

    let console_output = format!(
        "{} {} {}{}\n    {}\n",
        level.colored(&format!("[vulkan {}]", level.label())),
        category.bright_black(),
        message_id_name.bright_blue(),
        repeats.yellow(),
        message,
    );
    let file_output = format!(
        "[{}] [vulkan {}] {} {}{}\n    {}",
        Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        level.label(), category, message_id_name, repeats, message,
    );

    match &config.output {
        DebugOutput::Console => eprint!("{}", console_output),
        DebugOutput::File(path) => write_to_file(path, &file_output),
        DebugOutput::Both(path) => {
            eprint!("{}", console_output);
            write_to_file(path, &file_output);
        }
    }

    if level == MessageLevel::Error {
        if config.panic_on_error {
            panic!("Vulkan validation error {}: {}", message_id_name, message);
        }
        if config.break_on_error {
            eprintln!("{} {}", "Aborting on Vulkan validation error".red().bold(), message_id_name);
            std::process::abort();
        }
    }

    vk::FALSE
}

fn write_to_file(path: &str, message: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{}", message);
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;

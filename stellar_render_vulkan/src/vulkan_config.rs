/// VulkanConfig - backend configuration and validation-layer settings

/// Debug message severity shown by the validation messenger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// Only errors
    ErrorsOnly,
    /// Errors and warnings
    ErrorsAndWarnings,
    /// Everything, including info and verbose messages
    All,
}

/// Where validation messages are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutput {
    /// Colored output on stderr
    Console,
    /// Plain text appended to a file
    File(String),
    /// Both console and file
    Both(String),
}

/// Message categories shown by the validation messenger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugMessageFilter {
    pub show_general: bool,
    pub show_validation: bool,
    pub show_performance: bool,
}

impl Default for DebugMessageFilter {
    fn default() -> Self {
        Self {
            show_general: true,
            show_validation: true,
            show_performance: true,
        }
    }
}

/// Counters of validation messages received since the device was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    /// Total number of messages
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }

    /// Whether any error was reported
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// Vulkan backend configuration
///
/// Validation settings only take effect when the crate is built with the
/// `vulkan-validation` feature.
#[derive(Debug, Clone)]
pub struct VulkanConfig {
    /// Application name reported to the driver
    pub app_name: String,
    /// Enable VK_LAYER_KHRONOS_validation and the debug messenger
    pub enable_validation: bool,
    /// Wait for vertical blank when presenting (FIFO); otherwise prefer MAILBOX
    pub vsync: bool,
    /// Severity shown by the messenger
    pub debug_severity: DebugSeverity,
    /// Output of the messenger
    pub debug_output: DebugOutput,
    /// Categories shown by the messenger
    pub debug_message_filter: DebugMessageFilter,
    /// Abort the process on the first validation error
    pub break_on_validation_error: bool,
    /// Panic on the first validation error
    pub panic_on_error: bool,
    /// Count validation messages (see `get_validation_stats`)
    pub enable_validation_stats: bool,
}

impl Default for VulkanConfig {
    fn default() -> Self {
        Self {
            app_name: "Stellar Application".to_string(),
            enable_validation: cfg!(debug_assertions),
            vsync: true,
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            debug_message_filter: DebugMessageFilter::default(),
            break_on_validation_error: false,
            panic_on_error: false,
            enable_validation_stats: true,
        }
    }
}

#[cfg(test)]
#[path = "vulkan_config_tests.rs"]
mod tests;

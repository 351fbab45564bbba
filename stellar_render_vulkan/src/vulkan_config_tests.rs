use super::*;

// ============================================================================
// DEFAULTS
// ============================================================================

#[test]
fn test_default_config() {
    let config = VulkanConfig::default();
    assert!(config.vsync);
    assert_eq!(config.debug_severity, DebugSeverity::ErrorsAndWarnings);
    assert_eq!(config.debug_output, DebugOutput::Console);
    assert!(!config.break_on_validation_error);
    assert!(!config.panic_on_error);
    assert!(config.enable_validation_stats);
}

#[test]
fn test_default_message_filter_shows_everything() {
    let filter = DebugMessageFilter::default();
    assert!(filter.show_general);
    assert!(filter.show_validation);
    assert!(filter.show_performance);
}

// ============================================================================
// VALIDATION STATS
// ============================================================================

#[test]
fn test_validation_stats_total() {
    let stats = ValidationStats { errors: 1, warnings: 2, info: 3, verbose: 4 };
    assert_eq!(stats.total(), 10);
    assert!(stats.has_errors());
}

#[test]
fn test_validation_stats_empty() {
    let stats = ValidationStats::default();
    assert_eq!(stats.total(), 0);
    assert!(!stats.has_errors());
}

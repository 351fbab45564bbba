use super::*;

// ============================================================================
// SEVERITY FILTER
// ============================================================================

#[test]
fn test_severity_flags_errors_only() {
    let flags = severity_flags(DebugSeverity::ErrorsOnly);
    assert!(flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR));
    assert!(!flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING));
}

#[test]
fn test_severity_flags_errors_and_warnings() {
    let flags = severity_flags(DebugSeverity::ErrorsAndWarnings);
    assert!(flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING));
    assert!(!flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO));
}

#[test]
fn test_severity_flags_all() {
    let flags = severity_flags(DebugSeverity::All);
    assert!(flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
    assert!(flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO));
}

// ============================================================================
// CATEGORY FILTER
// ============================================================================

#[test]
fn test_category_filter() {
    let filter = DebugMessageFilter {
        show_general: false,
        show_validation: true,
        show_performance: false,
    };
    assert!(category_visible(&filter, vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION));
    assert!(!category_visible(&filter, vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE));
    assert!(!category_visible(&filter, vk::DebugUtilsMessageTypeFlagsEXT::GENERAL));
}

// ============================================================================
// STATISTICS
// ============================================================================

#[test]
fn test_stats_tracker_records_by_severity() {
    let tracker = ValidationStatsTracker::new();
    tracker.record(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR);
    tracker.record(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING);
    tracker.record(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING);
    tracker.record(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE);

    let stats = tracker.get_stats();
    assert_eq!(stats, ValidationStats { errors: 1, warnings: 2, info: 0, verbose: 1 });

    tracker.reset();
    assert_eq!(tracker.get_stats().total(), 0);
}

#[test]
fn test_message_level_uses_highest_severity_bit() {
    let flags = vk::DebugUtilsMessageSeverityFlagsEXT::WARNING | vk::DebugUtilsMessageSeverityFlagsEXT::INFO;
    assert_eq!(MessageLevel::from_flags(flags), MessageLevel::Warning);
    assert_eq!(MessageLevel::from_flags(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE), MessageLevel::Verbose);
    assert_eq!(MessageLevel::Error.label(), "ERROR");
}

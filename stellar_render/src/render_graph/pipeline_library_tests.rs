use super::*;
use crate::device::ShaderSource;

fn desc(name: &str) -> PipelineDesc {
    PipelineDesc::new(name, ShaderSource::spirv(vec![0x0723_0203]), ShaderSource::spirv(vec![0x0723_0203]))
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_register_and_get() {
    let mut library = PipelineLibrary::new();
    let generation = library.register_pipeline(desc("opaque"));

    let (found, found_generation) = library.get("opaque").unwrap();
    assert_eq!(found.name, "opaque");
    assert_eq!(found_generation, generation);
    assert!(library.contains("opaque"));
    assert_eq!(library.len(), 1);
}

#[test]
fn test_reregister_bumps_generation() {
    let mut library = PipelineLibrary::new();
    let first = library.register_pipeline(desc("opaque"));
    let second = library.register_pipeline(desc("opaque"));

    assert!(second > first);
    assert_eq!(library.get("opaque").unwrap().1, second);
    assert_eq!(library.len(), 1);
}

#[test]
fn test_generations_never_repeat_after_unregister() {
    let mut library = PipelineLibrary::new();
    let first = library.register_pipeline(desc("a"));
    assert!(library.unregister_pipeline("a"));
    assert!(!library.unregister_pipeline("a"));
    let second = library.register_pipeline(desc("a"));
    assert_ne!(first, second);
}

#[test]
fn test_unknown_name() {
    let library = PipelineLibrary::new();
    assert!(library.get("missing").is_none());
    assert!(library.is_empty());
}

#[test]
fn test_names() {
    let mut library = PipelineLibrary::default();
    library.register_pipeline(desc("a"));
    library.register_pipeline(desc("b"));
    let mut names = library.names();
    names.sort();
    assert_eq!(names, vec!["a", "b"]);
}

/// Attachment module - named logical images used as pass outputs and inputs

pub mod attachment_registry;

pub use attachment_registry::*;

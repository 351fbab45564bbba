/// Render graph module - passes, layout inference and pass recording

pub mod pass;
pub mod layout_inference;
pub mod pipeline_library;
pub mod pass_context;
pub mod render_graph;

pub use pass::*;
pub use layout_inference::*;
pub use pipeline_library::*;
pub use pass_context::*;
pub use render_graph::*;

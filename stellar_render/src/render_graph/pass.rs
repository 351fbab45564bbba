/// Logical render pass description: outputs, sampled inputs and callback

use crate::device::{ClearValue, LoadOp};
use crate::error::Result;
use super::PassContext;

/// What happens to an output attachment's previous content when the pass begins
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadPolicy {
    /// Previous content is irrelevant (initial layout is always undefined)
    DontCare,
    /// Keep the previous content
    Load,
    /// Clear to a value
    Clear(ClearValue),
}

impl LoadPolicy {
    pub fn load_op(&self) -> LoadOp {
        match self {
            LoadPolicy::DontCare => LoadOp::DontCare,
            LoadPolicy::Load => LoadOp::Load,
            LoadPolicy::Clear(_) => LoadOp::Clear,
        }
    }
}

/// One attachment written by a pass
#[derive(Debug, Clone, PartialEq)]
pub struct PassOutput {
    pub name: String,
    pub load: LoadPolicy,
}

/// Work recorded inside a pass, between begin and end of its render pass
pub type PassCallback<'a> = Box<dyn FnOnce(&mut PassContext<'_>) -> Result<()> + 'a>;

/// A logical rendering pass
///
/// Passes of a graph execute in the order they were added; that order alone
/// determines the inferred layouts.
///
/// # Example
///
/// ```ignore
/// let pass = Pass::new("lighting")
///     .sample("gbuffer")
///     .output("swapchain", LoadPolicy::DontCare)
///     .execute(|ctx| {
///         ctx.bind_pipeline("fullscreen")?;
///         ctx.draw(3, 0)
///     });
/// ```
pub struct Pass<'a> {
    name: String,
    outputs: Vec<PassOutput>,
    sampled: Vec<String>,
    callback: Option<PassCallback<'a>>,
}

impl<'a> Pass<'a> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            outputs: Vec::new(),
            sampled: Vec::new(),
            callback: None,
        }
    }

    /// Add an output attachment (color or depth, by format)
    pub fn output(mut self, attachment: &str, load: LoadPolicy) -> Self {
        self.outputs.push(PassOutput { name: attachment.to_string(), load });
        self
    }

    /// Add an attachment read through a sampler
    pub fn sample(mut self, attachment: &str) -> Self {
        self.sampled.push(attachment.to_string());
        self
    }

    /// Set the recording callback
    pub fn execute<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&mut PassContext<'_>) -> Result<()> + 'a,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn outputs(&self) -> &[PassOutput] {
        &self.outputs
    }

    pub fn sampled(&self) -> &[String] {
        &self.sampled
    }

    pub fn writes(&self, attachment: &str) -> bool {
        self.outputs.iter().any(|o| o.name == attachment)
    }

    pub fn reads(&self, attachment: &str) -> bool {
        self.sampled.iter().any(|s| s == attachment)
    }

    pub(crate) fn take_callback(&mut self) -> Option<PassCallback<'a>> {
        self.callback.take()
    }
}

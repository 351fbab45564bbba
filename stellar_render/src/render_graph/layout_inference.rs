/// Image layout inference over an ordered pass list
///
/// Pure function of pass order and load policies: no topological sort, the
/// submission order is the execution order.

use crate::attachment::SWAPCHAIN_ATTACHMENT;
use crate::device::{ImageLayout, TextureFormat};
use super::{LoadPolicy, Pass};

/// Layouts of one output attachment of one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLayouts {
    /// Layout the attachment is in when the pass begins
    pub initial: ImageLayout,
    /// Layout the pass leaves the attachment in
    pub final_layout: ImageLayout,
}

/// Infer initial and final layouts of every output of every pass
///
/// Result is indexed `[pass][output]`, parallel to `Pass::outputs`.
/// `format_of` resolves an attachment name to its format.
pub fn infer_layouts<F>(passes: &[Pass<'_>], format_of: F) -> Vec<Vec<OutputLayouts>>
where
    F: Fn(&str) -> TextureFormat,
{
    passes
        .iter()
        .enumerate()
        .map(|(index, pass)| {
            pass.outputs()
                .iter()
                .map(|output| {
                    let format = format_of(&output.name);
                    OutputLayouts {
                        initial: initial_layout(passes, index, &output.name, output.load, format),
                        final_layout: final_layout(passes, index, &output.name, format),
                    }
                })
                .collect()
        })
        .collect()
}

/// Layout of `attachment` when pass `index` begins
///
/// The most recent earlier pass touching the attachment decides: its write
/// leaves the attachment-optimal layout, its read leaves shader-read-only.
pub fn initial_layout(
    passes: &[Pass<'_>],
    index: usize,
    attachment: &str,
    load: LoadPolicy,
    format: TextureFormat,
) -> ImageLayout {
    if load == LoadPolicy::DontCare {
        return ImageLayout::Undefined;
    }
    for earlier in passes[..index].iter().rev() {
        if earlier.writes(attachment) {
            return ImageLayout::attachment_optimal(format);
        }
        if earlier.reads(attachment) {
            return ImageLayout::ShaderReadOnly;
        }
    }
    ImageLayout::Undefined
}

/// Layout pass `index` leaves `attachment` in, for its next use
pub fn final_layout(passes: &[Pass<'_>], index: usize, attachment: &str, format: TextureFormat) -> ImageLayout {
    for later in &passes[index + 1..] {
        if later.reads(attachment) {
            return ImageLayout::ShaderReadOnly;
        }
        if later.writes(attachment) {
            return ImageLayout::attachment_optimal(format);
        }
    }
    if attachment == SWAPCHAIN_ATTACHMENT {
        ImageLayout::PresentSrc
    } else {
        ImageLayout::attachment_optimal(format)
    }
}

#[cfg(test)]
#[path = "layout_inference_tests.rs"]
mod tests;

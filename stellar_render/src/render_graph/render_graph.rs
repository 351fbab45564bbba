/// Per-frame render graph: ordered passes over named attachments

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::attachment::AttachmentRegistry;
use crate::cache::RenderPassKey;
use crate::context::RenderContext;
use crate::device::{
    AttachmentDesc, ClearValue, Rect2D, RenderPassDesc, RenderTarget, StoreOp, TextureFormat,
    Viewport,
};
use crate::error::Result;
use crate::frame::ActiveFrame;
use crate::{engine_fatal, engine_trace};
use super::{infer_layouts, LoadPolicy, OutputLayouts, Pass, PassContext};

/// Attachment state captured from the registry for one build
struct ResolvedAttachment {
    format: TextureFormat,
    samples: u32,
    extent: (u32, u32),
    view: Option<Arc<dyn RenderTarget>>,
}

/// Ordered list of passes for one frame
///
/// `build` infers every layout, materializes render passes and framebuffers
/// through the structural caches and runs each callback right after its
/// render pass begins. A graph is built exactly once.
pub struct RenderGraph<'a> {
    context: &'a RenderContext,
    passes: Vec<Pass<'a>>,
    built: bool,
}

impl<'a> RenderGraph<'a> {
    pub fn new(context: &'a RenderContext) -> Self {
        Self {
            context,
            passes: Vec::new(),
            built: false,
        }
    }

    /// Append a pass; passes execute in the order they are added
    pub fn add_pass(&mut self, pass: Pass<'a>) -> &mut Self {
        if self.built {
            engine_fatal!("stellar::RenderGraph",
                "add_pass('{}') after build()", pass.name());
        }
        self.passes.push(pass);
        self
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Layouts `build` would use, indexed `[pass][output]`
    ///
    /// # Panics
    ///
    /// Panics if a pass references an unknown attachment.
    pub fn layouts(&self) -> Vec<Vec<OutputLayouts>> {
        let resolved = self.resolve_attachments();
        infer_layouts(&self.passes, |name| resolved[name].format)
    }

    /// Record every pass into `frame`
    ///
    /// # Panics
    ///
    /// Panics on a second call, and when a pass has no output, references an
    /// unknown attachment, samples one of its own outputs, writes more than
    /// one depth attachment or mixes output extents.
    pub fn build(&mut self, frame: &mut ActiveFrame<'_>) -> Result<()> {
        if self.built {
            engine_fatal!("stellar::RenderGraph", "build() called twice on the same graph");
        }
        self.built = true;

        let callbacks: Vec<_> = self.passes.iter_mut().map(Pass::take_callback).collect();
        let resolved = self.resolve_attachments();
        let layouts = infer_layouts(&self.passes, |name| resolved[name].format);
        let caches = self.context.caches();

        for ((pass, callback), pass_layouts) in self.passes.iter().zip(callbacks).zip(&layouts) {

            let mut desc = RenderPassDesc {
                debug_name: pass.name().to_string(),
                color_attachments: Vec::new(),
                depth_attachment: None,
            };
            let mut color_views = Vec::new();
            let mut depth_view = None;
            let mut color_clears = Vec::new();
            let mut depth_clear = None;
            let mut extent = None;

            for (output, layout) in pass.outputs().iter().zip(pass_layouts) {
                let attachment = &resolved[&output.name];
                let Some(view) = attachment.view.clone() else {
                    engine_fatal!("stellar::RenderGraph",
                        "Pass '{}': attachment '{}' has no bound image", pass.name(), output.name);
                };
                match extent {
                    None => extent = Some(attachment.extent),
                    Some(e) if e != attachment.extent => engine_fatal!("stellar::RenderGraph",
                        "Pass '{}': attachment '{}' is {}x{}, other outputs are {}x{}",
                        pass.name(), output.name, attachment.extent.0, attachment.extent.1, e.0, e.1),
                    Some(_) => {}
                }

                let attachment_desc = AttachmentDesc {
                    format: attachment.format,
                    samples: attachment.samples,
                    load_op: output.load.load_op(),
                    store_op: StoreOp::Store,
                    initial_layout: layout.initial,
                    final_layout: layout.final_layout,
                };
                let clear = match output.load {
                    LoadPolicy::Clear(value) => value,
                    _ if attachment.format.is_depth() => ClearValue::DEPTH_ONE,
                    _ => ClearValue::BLACK,
                };
                if attachment.format.is_depth() {
                    desc.depth_attachment = Some(attachment_desc);
                    depth_view = Some(view);
                    depth_clear = Some(clear);
                } else {
                    desc.color_attachments.push(attachment_desc);
                    color_views.push(view);
                    color_clears.push(clear);
                }
            }
            // Validated non-empty in resolve_attachments
            let extent = extent.unwrap_or_default();
            let clears: Vec<ClearValue> = color_clears.into_iter().chain(depth_clear).collect();

            let render_pass = caches.render_pass(&desc)?;
            let render_pass_key = RenderPassKey::from_desc(&desc);
            let framebuffer = caches.framebuffer(
                pass.name(), &render_pass_key, &render_pass, &color_views, depth_view.as_ref(), extent)?;

            engine_trace!("stellar::RenderGraph",
                "Pass '{}' ({} color, depth: {}, {}x{})",
                pass.name(), color_views.len(), depth_view.is_some(), extent.0, extent.1);

            frame.command_list.begin_render_pass(&render_pass, &framebuffer, &clears)?;
            frame.command_list.set_viewport(Viewport::full(extent.0, extent.1))?;
            frame.command_list.set_scissor(Rect2D::full(extent.0, extent.1))?;

            let result = match callback {
                Some(callback) => {
                    let mut pass_context = PassContext {
                        context: self.context,
                        pass_name: pass.name(),
                        slot: frame.slot,
                        command_list: &mut *frame.command_list,
                        scratch: &mut *frame.scratch,
                        render_pass: &render_pass,
                        render_pass_key: &render_pass_key,
                        sampled: pass.sampled(),
                        extent,
                        pipeline: None,
                    };
                    callback(&mut pass_context)
                }
                None => Ok(()),
            };
            frame.command_list.end_render_pass()?;
            result?;
        }
        Ok(())
    }

    /// Validate every pass against the registry and capture what build needs
    fn resolve_attachments(&self) -> FxHashMap<String, ResolvedAttachment> {
        let registry = self.context.attachments();
        let mut resolved = FxHashMap::default();

        for pass in &self.passes {
            if pass.outputs().is_empty() {
                engine_fatal!("stellar::RenderGraph", "Pass '{}' has no output attachment", pass.name());
            }

            let mut depth_outputs = 0;
            for (i, output) in pass.outputs().iter().enumerate() {
                let format = resolve(&registry, pass, &output.name, &mut resolved);
                if format.is_depth() {
                    depth_outputs += 1;
                }
                if pass.outputs()[..i].iter().any(|o| o.name == output.name) {
                    engine_fatal!("stellar::RenderGraph",
                        "Pass '{}' writes '{}' twice", pass.name(), output.name);
                }
                if pass.reads(&output.name) {
                    engine_fatal!("stellar::RenderGraph",
                        "Pass '{}' samples its own output '{}'", pass.name(), output.name);
                }
            }
            if depth_outputs > 1 {
                engine_fatal!("stellar::RenderGraph",
                    "Pass '{}' writes {} depth attachments", pass.name(), depth_outputs);
            }
            for sampled in pass.sampled() {
                resolve(&registry, pass, sampled, &mut resolved);
            }
        }
        resolved
    }
}

fn resolve(
    registry: &AttachmentRegistry,
    pass: &Pass<'_>,
    name: &str,
    resolved: &mut FxHashMap<String, ResolvedAttachment>,
) -> TextureFormat {
    if let Some(existing) = resolved.get(name) {
        return existing.format;
    }
    let Some(attachment) = registry.by_name(name) else {
        engine_fatal!("stellar::RenderGraph",
            "Pass '{}' references unknown attachment '{}'", pass.name(), name);
    };
    resolved.insert(name.to_string(), ResolvedAttachment {
        format: attachment.format(),
        samples: attachment.samples(),
        extent: attachment.extent(),
        view: attachment.view().cloned(),
    });
    attachment.format()
}

#[cfg(test)]
#[path = "render_graph_tests.rs"]
mod tests;

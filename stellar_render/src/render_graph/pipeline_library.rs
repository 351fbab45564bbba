/// Named pipeline registrations resolved by passes at record time

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::device::PipelineDesc;
use crate::engine_debug;

struct RegisteredPipeline {
    desc: Arc<PipelineDesc>,
    generation: u64,
}

/// Pipeline descriptions by name
///
/// Native pipelines are created lazily per render pass through the pipeline
/// cache. Every registration gets a new generation, so re-registering a name
/// never hits a pipeline built from the previous description.
pub struct PipelineLibrary {
    pipelines: FxHashMap<String, RegisteredPipeline>,
    next_generation: u64,
}

impl PipelineLibrary {
    pub fn new() -> Self {
        Self {
            pipelines: FxHashMap::default(),
            next_generation: 1,
        }
    }

    /// Register `desc` under `desc.name`, replacing any previous registration
    ///
    /// Returns the generation of the new registration.
    pub fn register_pipeline(&mut self, desc: PipelineDesc) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        let name = desc.name.clone();
        let replaced = self.pipelines
            .insert(name.clone(), RegisteredPipeline { desc: Arc::new(desc), generation })
            .is_some();
        engine_debug!("stellar::PipelineLibrary",
            "{} pipeline '{}' (generation {})",
            if replaced { "Replaced" } else { "Registered" }, name, generation);
        generation
    }

    /// Description and generation registered under `name`
    pub fn get(&self, name: &str) -> Option<(Arc<PipelineDesc>, u64)> {
        self.pipelines.get(name).map(|p| (p.desc.clone(), p.generation))
    }

    /// Remove a registration; returns whether it existed
    pub fn unregister_pipeline(&mut self, name: &str) -> bool {
        self.pipelines.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pipelines.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Registered names, in no particular order
    pub fn names(&self) -> Vec<&str> {
        self.pipelines.keys().map(|k| k.as_str()).collect()
    }
}

impl Default for PipelineLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "pipeline_library_tests.rs"]
mod tests;

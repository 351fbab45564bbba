/// Typed caches for the native objects the render graph materializes

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use crate::cache::{CacheStats, FrameTick, SharedCache, StructuralCache};
use crate::config::FrameConfig;
use crate::device::{
    AttachmentDesc, DescriptorPool, DescriptorPoolDesc, DescriptorSet, DescriptorWrite,
    Framebuffer, FramebufferDesc, GraphicsDevice, Pipeline, PipelineDesc, RenderPass,
    RenderPassDesc, RenderTarget,
};
use crate::error::Result;
use crate::utils::ResourceId;
use crate::engine_debug;

// ===== KEYS =====

/// Structural key of a render pass: the per-attachment
/// (format, samples, load op, store op, initial layout, final layout) tuples
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderPassKey {
    pub color: Vec<AttachmentDesc>,
    pub depth: Option<AttachmentDesc>,
}

impl RenderPassKey {
    /// Key of a render pass descriptor (the debug name is not part of it)
    pub fn from_desc(desc: &RenderPassDesc) -> Self {
        Self {
            color: desc.color_attachments.clone(),
            depth: desc.depth_attachment,
        }
    }
}

/// Structural key of a framebuffer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FramebufferKey {
    pub render_pass: RenderPassKey,
    /// View ids in attachment order (colors, then depth)
    pub views: Vec<ResourceId>,
    pub width: u32,
    pub height: u32,
}

/// Structural key of a pipeline: registration + render pass compatibility
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub name: String,
    /// Bumped every time the pipeline is re-registered
    pub generation: u64,
    pub render_pass: RenderPassKey,
}

/// One resource bound into a descriptor set, as it participates in the key
///
/// Dynamic buffer bindings omit their offset: it is supplied at bind time,
/// so a single set serves every scratch allocation of the same size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundResourceKey {
    Buffer { binding: u32, buffer: ResourceId, offset: Option<u64>, range: u64 },
    Image { binding: u32, view: ResourceId },
}

/// Structural key of a descriptor set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DescriptorSetKey {
    pub pipeline: ResourceId,
    pub set_index: u32,
    pub resources: Vec<BoundResourceKey>,
}

// ===== DESCRIPTOR SET CACHE =====

/// Descriptor set cache of one frame-in-flight slot, with the pool its sets
/// are allocated from
pub struct DescriptorSetCache {
    // Dropped before the pool the sets come from
    sets: StructuralCache<DescriptorSetKey, Arc<dyn DescriptorSet>>,
    pool: Box<dyn DescriptorPool>,
}

impl DescriptorSetCache {
    /// Return the set matching `key`, allocating and writing it on a miss
    pub fn get_or_allocate(
        &mut self,
        key: DescriptorSetKey,
        pipeline: &Arc<dyn Pipeline>,
        writes: &[DescriptorWrite],
    ) -> Result<Arc<dyn DescriptorSet>> {
        let pool = &mut self.pool;
        let set_index = key.set_index;
        self.sets
            .get_or_create(key, |_| pool.allocate(pipeline, set_index, writes))
            .map(Arc::clone)
    }

    /// Number of cached sets
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether no set is cached
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Hit/miss/eviction counters
    pub fn stats(&self) -> CacheStats {
        self.sets.stats()
    }
}

impl FrameTick for Mutex<DescriptorSetCache> {
    fn tick(&self) -> usize {
        self.lock().unwrap_or_else(PoisonError::into_inner).sets.next_frame()
    }

    fn clear_all(&self) {
        let mut cache = self.lock().unwrap_or_else(PoisonError::into_inner);
        cache.sets.clear();
        if let Err(err) = cache.pool.reset() {
            crate::engine_warn!("stellar::ResourceCaches", "Failed to reset descriptor pool: {}", err);
        }
    }
}

// ===== RESOURCE CACHES =====

/// Aggregated statistics of every resource cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCacheStats {
    pub render_passes: CacheStats,
    pub framebuffers: CacheStats,
    pub pipelines: CacheStats,
    pub descriptor_sets: CacheStats,
}

/// Every structural cache of the renderer
///
/// Render passes, framebuffers and pipelines are shared by all frames.
/// Descriptor sets are partitioned per frame-in-flight slot so that writes
/// for frame N never touch sets still read by frame N-1.
pub struct ResourceCaches {
    device: Arc<dyn GraphicsDevice>,
    render_passes: Arc<SharedCache<RenderPassKey, Arc<dyn RenderPass>>>,
    framebuffers: Arc<SharedCache<FramebufferKey, Arc<dyn Framebuffer>>>,
    pipelines: Arc<SharedCache<PipelineKey, Arc<dyn Pipeline>>>,
    descriptor_sets: Vec<Arc<Mutex<DescriptorSetCache>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ResourceCaches {
    /// Create the caches, one descriptor set cache (and pool) per ring slot
    pub fn new(device: Arc<dyn GraphicsDevice>, config: &FrameConfig) -> Result<Self> {
        let max_frames = config.cache_max_frames();
        let mut descriptor_sets = Vec::with_capacity(config.max_frames_in_flight as usize);
        for _ in 0..config.max_frames_in_flight {
            let pool = device.create_descriptor_pool(&DescriptorPoolDesc::default())?;
            descriptor_sets.push(Arc::new(Mutex::new(DescriptorSetCache {
                sets: StructuralCache::new("descriptor_sets", max_frames),
                pool,
            })));
        }

        engine_debug!("stellar::ResourceCaches",
            "Created resource caches (idle threshold {} frames, {} descriptor partitions)",
            max_frames, descriptor_sets.len());

        Ok(Self {
            device,
            render_passes: Arc::new(Mutex::new(StructuralCache::new("render_passes", max_frames))),
            framebuffers: Arc::new(Mutex::new(StructuralCache::new("framebuffers", max_frames))),
            pipelines: Arc::new(Mutex::new(StructuralCache::new("pipelines", max_frames))),
            descriptor_sets,
        })
    }

    /// Render pass for `desc`, created on first use
    pub fn render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        let key = RenderPassKey::from_desc(desc);
        lock(&self.render_passes)
            .get_or_create(key, |_| {
                engine_debug!("stellar::ResourceCaches", "Creating render pass '{}'", desc.debug_name);
                self.device.create_render_pass(desc)
            })
            .map(Arc::clone)
    }

    /// Framebuffer binding `color_views` (+ `depth_view`) to `render_pass`, created on first use
    pub fn framebuffer(
        &self,
        debug_name: &str,
        render_pass_key: &RenderPassKey,
        render_pass: &Arc<dyn RenderPass>,
        color_views: &[Arc<dyn RenderTarget>],
        depth_view: Option<&Arc<dyn RenderTarget>>,
        extent: (u32, u32),
    ) -> Result<Arc<dyn Framebuffer>> {
        let key = FramebufferKey {
            render_pass: render_pass_key.clone(),
            views: color_views.iter().chain(depth_view).map(|v| v.id()).collect(),
            width: extent.0,
            height: extent.1,
        };
        lock(&self.framebuffers)
            .get_or_create(key, |_| {
                engine_debug!("stellar::ResourceCaches",
                    "Creating framebuffer '{}' ({}x{})", debug_name, extent.0, extent.1);
                self.device.create_framebuffer(&FramebufferDesc {
                    debug_name: debug_name.to_string(),
                    render_pass: render_pass.clone(),
                    color_attachments: color_views.to_vec(),
                    depth_attachment: depth_view.cloned(),
                    width: extent.0,
                    height: extent.1,
                })
            })
            .map(Arc::clone)
    }

    /// Pipeline `desc` (registered with `generation`) for `render_pass`, created on first use
    pub fn pipeline(
        &self,
        desc: &PipelineDesc,
        generation: u64,
        render_pass_key: &RenderPassKey,
        render_pass: &Arc<dyn RenderPass>,
    ) -> Result<Arc<dyn Pipeline>> {
        let key = PipelineKey {
            name: desc.name.clone(),
            generation,
            render_pass: render_pass_key.clone(),
        };
        lock(&self.pipelines)
            .get_or_create(key, |_| {
                engine_debug!("stellar::ResourceCaches", "Creating pipeline '{}'", desc.name);
                self.device.create_pipeline(desc, render_pass)
            })
            .map(Arc::clone)
    }

    /// Descriptor set cache of ring slot `slot`
    pub fn descriptor_sets(&self, slot: usize) -> &Mutex<DescriptorSetCache> {
        &self.descriptor_sets[slot]
    }

    /// Every cache, for registration with the frame lifecycle
    pub fn tickables(&self) -> Vec<Arc<dyn FrameTick>> {
        let mut out: Vec<Arc<dyn FrameTick>> = vec![
            self.render_passes.clone() as Arc<dyn FrameTick>,
            self.framebuffers.clone() as Arc<dyn FrameTick>,
            self.pipelines.clone() as Arc<dyn FrameTick>,
        ];
        out.extend(self.descriptor_sets.iter().map(|c| c.clone() as Arc<dyn FrameTick>));
        out
    }

    /// Number of cached render passes
    pub fn render_pass_count(&self) -> usize {
        lock(&self.render_passes).len()
    }

    /// Number of cached framebuffers
    pub fn framebuffer_count(&self) -> usize {
        lock(&self.framebuffers).len()
    }

    /// Number of cached pipelines
    pub fn pipeline_count(&self) -> usize {
        lock(&self.pipelines).len()
    }

    /// Aggregated statistics
    pub fn stats(&self) -> ResourceCacheStats {
        let mut descriptor_sets = CacheStats::default();
        for cache in &self.descriptor_sets {
            let stats = lock(cache).stats();
            descriptor_sets.hits += stats.hits;
            descriptor_sets.misses += stats.misses;
            descriptor_sets.inserts += stats.inserts;
            descriptor_sets.evictions += stats.evictions;
        }
        ResourceCacheStats {
            render_passes: lock(&self.render_passes).stats(),
            framebuffers: lock(&self.framebuffers).stats(),
            pipelines: lock(&self.pipelines).stats(),
            descriptor_sets,
        }
    }

    /// Destroy every cached object
    pub fn clear(&self) {
        for cache in self.tickables() {
            cache.clear_all();
        }
    }
}

#[cfg(test)]
#[path = "resource_caches_tests.rs"]
mod tests;

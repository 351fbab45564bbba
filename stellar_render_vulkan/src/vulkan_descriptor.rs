/// VulkanDescriptorPool / VulkanDescriptorSet
///
/// A descriptor pool grows by chaining native pools when the current one is
/// exhausted. Sets are freed individually when dropped, unless the pool was
/// reset since they were allocated (the reset already returned them).

use ash::vk;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use stellar_render::stellar::device::{
    DescriptorPool, DescriptorPoolDesc, DescriptorSet, DescriptorType, DescriptorWrite, Pipeline,
};
use stellar_render::stellar::utils::ResourceId;
use stellar_render::stellar::Result;
use stellar_render::{engine_bail, engine_debug};

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{descriptor_type_to_vk, vk_error};
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_texture::VulkanRenderTarget;

const SOURCE: &str = "stellar::vulkan::DescriptorPool";

struct PoolState {
    /// Native pools; allocation always tries the last one first
    pools: Vec<vk::DescriptorPool>,
    /// Bumped by every reset
    generation: u64,
    allocated: u32,
}

struct PoolShared {
    ctx: Arc<GpuContext>,
    desc: DescriptorPoolDesc,
    state: Mutex<PoolState>,
}

impl PoolShared {
    fn state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create_native_pool(&self) -> Result<vk::DescriptorPool> {
        let count = self.desc.descriptors_per_type;
        let pool_sizes = [
            vk::DescriptorPoolSize { ty: vk::DescriptorType::UNIFORM_BUFFER, descriptor_count: count },
            vk::DescriptorPoolSize { ty: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC, descriptor_count: count },
            vk::DescriptorPoolSize { ty: vk::DescriptorType::STORAGE_BUFFER, descriptor_count: count },
            vk::DescriptorPoolSize { ty: vk::DescriptorType::STORAGE_BUFFER_DYNAMIC, descriptor_count: count },
            vk::DescriptorPoolSize { ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER, descriptor_count: count },
        ];
        let info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .pool_sizes(&pool_sizes)
            .max_sets(self.desc.max_sets);

        unsafe {
            self.ctx.device.create_descriptor_pool(&info, None)
                .map_err(|e| vk_error(SOURCE, "Failed to create descriptor pool", e))
        }
    }
}

impl Drop for PoolShared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        unsafe {
            for &pool in &state.pools {
                self.ctx.device.destroy_descriptor_pool(pool, None);
            }
        }
    }
}

/// Vulkan descriptor pool implementation
pub struct VulkanDescriptorPool {
    shared: Arc<PoolShared>,
}

impl VulkanDescriptorPool {
    pub(crate) fn create(ctx: &Arc<GpuContext>, desc: &DescriptorPoolDesc) -> Result<Self> {
        let shared = PoolShared {
            ctx: Arc::clone(ctx),
            desc: *desc,
            state: Mutex::new(PoolState { pools: Vec::new(), generation: 0, allocated: 0 }),
        };
        let first = shared.create_native_pool()?;
        shared.state().pools.push(first);
        Ok(Self { shared: Arc::new(shared) })
    }

    /// Allocate one set from the newest native pool, growing the chain once if it is full
    fn allocate_native(&self, state: &mut PoolState, layout: vk::DescriptorSetLayout)
        -> Result<(vk::DescriptorPool, vk::DescriptorSet)>
    {
        let layouts = [layout];
        let device = &self.shared.ctx.device;

        if let Some(&current) = state.pools.last() {
            let allocate_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(current)
                .set_layouts(&layouts);
            match unsafe { device.allocate_descriptor_sets(&allocate_info) } {
                Ok(sets) => return Ok((current, sets[0])),
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL) => {}
                Err(e) => return Err(vk_error(SOURCE, "Failed to allocate descriptor set", e)),
            }
        }

        let new_pool = self.shared.create_native_pool()?;
        state.pools.push(new_pool);
        engine_debug!(SOURCE, "Descriptor pool exhausted, chained a new pool (total: {})", state.pools.len());

        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(new_pool)
            .set_layouts(&layouts);
        let sets = unsafe {
            device.allocate_descriptor_sets(&allocate_info)
                .map_err(|e| vk_error(SOURCE, "Failed to allocate descriptor set after pool growth", e))?
        };
        Ok((new_pool, sets[0]))
    }
}

impl DescriptorPool for VulkanDescriptorPool {
    fn allocate(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        writes: &[DescriptorWrite],
    ) -> Result<Arc<dyn DescriptorSet>> {
        let vk_pipeline = VulkanPipeline::from_dyn(pipeline.as_ref());
        let (Some(layout_desc), Some(&layout)) = (
            pipeline.set_layout(set_index),
            vk_pipeline.descriptor_set_layouts.get(set_index as usize),
        ) else {
            engine_bail!(SOURCE, "Set index {} out of range (pipeline has {} layouts)",
                set_index, pipeline.set_layout_count());
        };

        // Validate every write against the layout before touching the pool
        let mut typed_writes = Vec::with_capacity(writes.len());
        for write in writes {
            let Some(binding) = layout_desc.binding(write.binding()) else {
                engine_bail!(SOURCE, "Set {} has no binding {}", set_index, write.binding());
            };
            let is_image = binding.descriptor_type == DescriptorType::CombinedImageSampler;
            if is_image != matches!(write, DescriptorWrite::Image { .. }) {
                engine_bail!(SOURCE, "Write to binding {} of set {} does not match its type {:?}",
                    binding.binding, set_index, binding.descriptor_type);
            }
            typed_writes.push((write, descriptor_type_to_vk(binding.descriptor_type)));
        }

        let mut state = self.shared.state();
        let (native_pool, descriptor_set) = self.allocate_native(&mut state, layout)?;
        state.allocated += 1;
        let generation = state.generation;
        drop(state);

        // Infos must stay alive (and unmoved) until update_descriptor_sets
        let buffer_infos: Vec<vk::DescriptorBufferInfo> = typed_writes.iter()
            .filter_map(|(write, _)| match write {
                DescriptorWrite::Buffer { buffer, offset, range, .. } => Some(
                    vk::DescriptorBufferInfo::default()
                        .buffer(VulkanBuffer::from_dyn(buffer.as_ref()).buffer)
                        .offset(*offset)
                        .range(*range)),
                DescriptorWrite::Image { .. } => None,
            })
            .collect();
        let image_infos: Vec<vk::DescriptorImageInfo> = typed_writes.iter()
            .filter_map(|(write, _)| match write {
                DescriptorWrite::Image { view, .. } => Some(
                    vk::DescriptorImageInfo::default()
                        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                        .image_view(VulkanRenderTarget::from_dyn(view.as_ref()).image_view)
                        .sampler(self.shared.ctx.default_sampler)),
                DescriptorWrite::Buffer { .. } => None,
            })
            .collect();

        let mut buffer_idx = 0usize;
        let mut image_idx = 0usize;
        let vk_writes: Vec<vk::WriteDescriptorSet> = typed_writes.iter()
            .map(|(write, descriptor_type)| {
                let vk_write = vk::WriteDescriptorSet::default()
                    .dst_set(descriptor_set)
                    .dst_binding(write.binding())
                    .dst_array_element(0)
                    .descriptor_type(*descriptor_type);
                match write {
                    DescriptorWrite::Buffer { .. } => {
                        buffer_idx += 1;
                        vk_write.buffer_info(std::slice::from_ref(&buffer_infos[buffer_idx - 1]))
                    }
                    DescriptorWrite::Image { .. } => {
                        image_idx += 1;
                        vk_write.image_info(std::slice::from_ref(&image_infos[image_idx - 1]))
                    }
                }
            })
            .collect();

        unsafe {
            self.shared.ctx.device.update_descriptor_sets(&vk_writes, &[]);
        }

        Ok(Arc::new(VulkanDescriptorSet {
            id: self.shared.ctx.next_id(),
            set_index,
            descriptor_set,
            native_pool,
            generation,
            pool: Arc::clone(&self.shared),
            _resources: writes.to_vec(),
        }))
    }

    fn reset(&mut self) -> Result<()> {
        let mut state = self.shared.state();
        for &pool in &state.pools {
            unsafe {
                self.shared.ctx.device
                    .reset_descriptor_pool(pool, vk::DescriptorPoolResetFlags::empty())
                    .map_err(|e| vk_error(SOURCE, "Failed to reset descriptor pool", e))?;
            }
        }
        state.generation += 1;
        state.allocated = 0;
        Ok(())
    }

    fn allocated_sets(&self) -> u32 {
        self.shared.state().allocated
    }
}

/// Vulkan descriptor set implementation
///
/// Immutable after creation. Keeps the resources it references alive.
pub struct VulkanDescriptorSet {
    id: ResourceId,
    set_index: u32,
    /// Vulkan descriptor set handle
    pub(crate) descriptor_set: vk::DescriptorSet,
    native_pool: vk::DescriptorPool,
    generation: u64,
    pool: Arc<PoolShared>,
    _resources: Vec<DescriptorWrite>,
}

impl VulkanDescriptorSet {
    pub(crate) fn from_dyn(set: &dyn DescriptorSet) -> &Self {
        // SAFETY: every `dyn DescriptorSet` handed to this backend was created by VulkanDevice
        unsafe { &*(set as *const dyn DescriptorSet as *const Self) }
    }
}

impl DescriptorSet for VulkanDescriptorSet {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn set_index(&self) -> u32 {
        self.set_index
    }
}

impl Drop for VulkanDescriptorSet {
    fn drop(&mut self) {
        let mut state = self.pool.state();
        if state.generation != self.generation {
            return;
        }
        unsafe {
            self.pool.ctx.device
                .free_descriptor_sets(self.native_pool, &[self.descriptor_set])
                .ok();
        }
        state.allocated = state.allocated.saturating_sub(1);
    }
}

/// Descriptor pools, descriptor sets and their layout descriptions

use std::sync::Arc;
use bitflags::bitflags;
use crate::device::{Buffer, Pipeline, RenderTarget};
use crate::error::Result;
use crate::utils::ResourceId;

bitflags! {
    /// Shader stage visibility flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 0x01;
        const FRAGMENT = 0x02;
        const COMPUTE = 0x04;
        const VERTEX_FRAGMENT = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

/// Type of resource bound at a given slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    /// Uniform buffer bound at a fixed offset
    UniformBuffer,
    /// Uniform buffer whose offset is supplied at bind time
    UniformBufferDynamic,
    /// Storage buffer bound at a fixed offset
    StorageBuffer,
    /// Storage buffer whose offset is supplied at bind time
    StorageBufferDynamic,
    /// Image view + the backend's default sampler
    CombinedImageSampler,
}

impl DescriptorType {
    /// Whether the offset of this binding is supplied at bind time
    pub fn is_dynamic(self) -> bool {
        matches!(self, DescriptorType::UniformBufferDynamic | DescriptorType::StorageBufferDynamic)
    }

    /// Dynamic counterpart of a buffer type (other types are unchanged)
    pub fn to_dynamic(self) -> Self {
        match self {
            DescriptorType::UniformBuffer => DescriptorType::UniformBufferDynamic,
            DescriptorType::StorageBuffer => DescriptorType::StorageBufferDynamic,
            other => other,
        }
    }
}

/// Description of a single binding slot within a set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorBindingDesc {
    /// Binding number (corresponds to `layout(binding = N)` in GLSL)
    pub binding: u32,
    /// Type of resource at this binding
    pub descriptor_type: DescriptorType,
    /// Number of descriptors at this binding (>1 for arrays)
    pub count: u32,
    /// Shader stages that access this binding
    pub stages: ShaderStageFlags,
}

/// Description of one descriptor set layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DescriptorSetLayoutDesc {
    /// Binding slot descriptions, sorted by binding number
    pub bindings: Vec<DescriptorBindingDesc>,
}

impl DescriptorSetLayoutDesc {
    /// Find the description of `binding`
    pub fn binding(&self, binding: u32) -> Option<&DescriptorBindingDesc> {
        self.bindings.iter().find(|b| b.binding == binding)
    }

    /// Number of dynamic bindings (length of the dynamic offset array at bind time)
    pub fn dynamic_binding_count(&self) -> usize {
        self.bindings.iter().filter(|b| b.descriptor_type.is_dynamic()).count()
    }
}

/// Sizes of a descriptor pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorPoolDesc {
    /// Maximum number of sets allocated at once
    pub max_sets: u32,
    /// Descriptors reserved per descriptor type
    pub descriptors_per_type: u32,
}

impl Default for DescriptorPoolDesc {
    fn default() -> Self {
        Self {
            max_sets: 256,
            descriptors_per_type: 512,
        }
    }
}

/// A concrete resource written into a descriptor set
#[derive(Clone)]
pub enum DescriptorWrite {
    /// Buffer range (for dynamic types, `offset` is the base the dynamic offset is added to)
    Buffer {
        binding: u32,
        buffer: Arc<dyn Buffer>,
        offset: u64,
        range: u64,
    },
    /// Sampled image view
    Image {
        binding: u32,
        view: Arc<dyn RenderTarget>,
    },
}

impl DescriptorWrite {
    /// Binding number targeted by this write
    pub fn binding(&self) -> u32 {
        match self {
            DescriptorWrite::Buffer { binding, .. } | DescriptorWrite::Image { binding, .. } => *binding,
        }
    }
}

/// Descriptor pool trait
///
/// Sets allocated from a pool remain valid until they are dropped or the
/// pool is reset, whichever comes first.
pub trait DescriptorPool: Send {
    /// Allocate and write a descriptor set for `set_index` of `pipeline`'s layout
    fn allocate(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        writes: &[DescriptorWrite],
    ) -> Result<Arc<dyn DescriptorSet>>;

    /// Return every set allocated from this pool
    fn reset(&mut self) -> Result<()>;

    /// Number of sets currently allocated
    fn allocated_sets(&self) -> u32;
}

/// An immutable, written descriptor set
pub trait DescriptorSet: Send + Sync {
    /// Unique id of this descriptor set
    fn id(&self) -> ResourceId;

    /// Set index this descriptor set was allocated for
    fn set_index(&self) -> u32;
}

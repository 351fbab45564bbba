/// Pipeline trait and pipeline descriptor

use crate::device::{DescriptorSetLayoutDesc, ShaderReflection, ShaderStageFlags, TextureFormat};
use crate::utils::ResourceId;

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    /// Triangle list
    TriangleList,
    /// Triangle strip
    TriangleStrip,
    /// Line list
    LineList,
    /// Point list
    PointList,
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// 16-bit indices (max 65535 vertices)
    U16,
    /// 32-bit indices
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Attribute location in shader
    pub location: u32,
    /// Format of the attribute (data type and component count)
    pub format: TextureFormat,
    /// Offset in bytes from the start of the vertex
    pub offset: u32,
}

/// Vertex input layout (one interleaved binding)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    /// Stride in bytes between consecutive vertices (0 = no vertex input)
    pub stride: u32,
    /// Vertex attributes
    pub attributes: Vec<VertexAttribute>,
}

/// Push constant range descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PushConstantRange {
    /// Shader stages that can access these push constants
    pub stages: ShaderStageFlags,
    /// Offset in bytes
    pub offset: u32,
    /// Size in bytes
    pub size: u32,
}

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    /// No culling
    None,
    /// Cull front faces
    Front,
    /// Cull back faces
    Back,
}

/// Comparison operator for depth tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Depth testing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    /// Enable depth testing
    pub test_enable: bool,
    /// Enable writing to depth buffer
    pub write_enable: bool,
    /// Depth comparison operator
    pub compare_op: CompareOp,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test_enable: true,
            write_enable: true,
            compare_op: CompareOp::Less,
        }
    }
}

/// Color blending mode applied to every color attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Source replaces destination
    #[default]
    Opaque,
    /// Standard premultiplied-free alpha blending
    Alpha,
    /// Source is added to destination
    Additive,
}

/// Compiled shader stage (SPIR-V words)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderSource {
    /// SPIR-V code
    pub code: Vec<u32>,
    /// Entry point name
    pub entry_point: String,
}

impl ShaderSource {
    /// Shader with the conventional `main` entry point
    pub fn spirv(code: Vec<u32>) -> Self {
        Self {
            code,
            entry_point: "main".to_string(),
        }
    }
}

/// Descriptor for creating a graphics pipeline
///
/// Pipelines are registered by `name` in the pipeline library and created
/// lazily for every render pass they are bound in.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDesc {
    /// Registration name, also used as debug name
    pub name: String,
    /// Vertex shader
    pub vertex_shader: ShaderSource,
    /// Fragment shader
    pub fragment_shader: ShaderSource,
    /// Vertex input layout
    pub vertex_layout: VertexLayout,
    /// Primitive topology
    pub topology: PrimitiveTopology,
    /// Face culling
    pub cull_mode: CullMode,
    /// Depth testing (ignored when the render pass has no depth attachment)
    pub depth: DepthState,
    /// Color blending
    pub blend: BlendMode,
    /// Descriptor set layouts, indexed by set number
    pub set_layouts: Vec<DescriptorSetLayoutDesc>,
    /// Push constant ranges
    pub push_constant_ranges: Vec<PushConstantRange>,
}

impl PipelineDesc {
    /// Create a pipeline descriptor with default fixed-function state
    pub fn new(name: &str, vertex_shader: ShaderSource, fragment_shader: ShaderSource) -> Self {
        Self {
            name: name.to_string(),
            vertex_shader,
            fragment_shader,
            vertex_layout: VertexLayout::default(),
            topology: PrimitiveTopology::TriangleList,
            cull_mode: CullMode::Back,
            depth: DepthState::default(),
            blend: BlendMode::Opaque,
            set_layouts: Vec::new(),
            push_constant_ranges: Vec::new(),
        }
    }

    /// Fill set layouts and push constant ranges from shader reflection
    ///
    /// Bindings found in both stages are merged (stage flags are OR-ed).
    /// Uniform and storage buffers become their dynamic variants: transient
    /// data is always bound from scratch memory with a per-draw offset.
    pub fn with_reflection(mut self, vertex: &ShaderReflection, fragment: &ShaderReflection) -> Self {
        self.set_layouts = ShaderReflection::merge_set_layouts(&[vertex, fragment]);
        self.push_constant_ranges = ShaderReflection::merge_push_constants(&[vertex, fragment]);
        self
    }
}

/// Pipeline resource trait
///
/// Implemented by backend-specific pipeline types (e.g., VulkanPipeline).
/// The pipeline is automatically destroyed when dropped.
pub trait Pipeline: Send + Sync {
    /// Unique id of this pipeline
    fn id(&self) -> ResourceId;

    /// Layout of descriptor set `set_index`, if the pipeline uses it
    fn set_layout(&self, set_index: u32) -> Option<&DescriptorSetLayoutDesc>;

    /// Number of descriptor sets in the pipeline layout
    fn set_layout_count(&self) -> u32;
}

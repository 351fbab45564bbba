/// Shader reflection interface and layout merging

use crate::device::{
    DescriptorBindingDesc, DescriptorSetLayoutDesc, DescriptorType, PushConstantRange,
    ShaderStageFlags,
};
use crate::error::Result;

/// One descriptor binding found in a shader module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReflectedBinding {
    /// Descriptor set number
    pub set: u32,
    /// Binding number within the set
    pub binding: u32,
    /// Resource type
    pub descriptor_type: DescriptorType,
    /// Array size (1 for non-arrays)
    pub count: u32,
}

/// Reflection data of one shader stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderReflection {
    /// Stage the module was reflected for
    pub stage: ShaderStageFlags,
    /// Descriptor bindings used by the module
    pub bindings: Vec<ReflectedBinding>,
    /// Push constant ranges used by the module
    pub push_constants: Vec<PushConstantRange>,
}

impl ShaderReflection {
    /// Merge several stages into one set layout per set number
    ///
    /// Set numbers without bindings yield empty layouts so the result can be
    /// indexed by set number. Buffer bindings are promoted to dynamic types.
    pub fn merge_set_layouts(stages: &[&ShaderReflection]) -> Vec<DescriptorSetLayoutDesc> {
        let set_count = stages
            .iter()
            .flat_map(|r| r.bindings.iter())
            .map(|b| b.set + 1)
            .max()
            .unwrap_or(0);

        let mut layouts = vec![DescriptorSetLayoutDesc::default(); set_count as usize];
        for reflection in stages {
            for reflected in &reflection.bindings {
                let layout = &mut layouts[reflected.set as usize];
                let descriptor_type = reflected.descriptor_type.to_dynamic();
                match layout.bindings.iter_mut().find(|b| b.binding == reflected.binding) {
                    Some(existing) => existing.stages |= reflection.stage,
                    None => layout.bindings.push(DescriptorBindingDesc {
                        binding: reflected.binding,
                        descriptor_type,
                        count: reflected.count,
                        stages: reflection.stage,
                    }),
                }
            }
        }
        for layout in &mut layouts {
            layout.bindings.sort_by_key(|b| b.binding);
        }
        layouts
    }

    /// Merge push constant ranges; identical ranges share their stage flags
    pub fn merge_push_constants(stages: &[&ShaderReflection]) -> Vec<PushConstantRange> {
        let mut ranges: Vec<PushConstantRange> = Vec::new();
        for reflection in stages {
            for range in &reflection.push_constants {
                match ranges.iter_mut().find(|r| r.offset == range.offset && r.size == range.size) {
                    Some(existing) => existing.stages |= range.stages,
                    None => ranges.push(*range),
                }
            }
        }
        ranges
    }
}

/// Shader reflection collaborator
///
/// Given compiled SPIR-V, returns descriptor binding metadata and push
/// constant ranges. The Vulkan backend implements it on top of SPIR-V
/// reflection; tests can supply reflection data directly.
pub trait ShaderReflector: Send + Sync {
    /// Reflect `code` compiled for `stage`
    fn reflect(&self, code: &[u32], stage: ShaderStageFlags) -> Result<ShaderReflection>;
}

#[cfg(test)]
#[path = "shader_reflection_tests.rs"]
mod tests;

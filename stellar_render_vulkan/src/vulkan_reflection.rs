/// SPIR-V reflection backed by spirq

use stellar_render::stellar::device::{
    DescriptorType, PushConstantRange, ReflectedBinding, ShaderReflection, ShaderReflector,
    ShaderStageFlags,
};
use stellar_render::stellar::Result;
use stellar_render::{engine_bail, engine_err};

const SOURCE: &str = "stellar::vulkan::Reflection";

/// ShaderReflector reading descriptor bindings and push constants from SPIR-V
#[derive(Debug, Default, Clone, Copy)]
pub struct SpirqReflector;

impl SpirqReflector {
    pub fn new() -> Self {
        Self
    }
}

/// Convert spirq descriptor type to a stellar DescriptorType
pub(crate) fn descriptor_type_from_spirq(desc_ty: &spirq::ty::DescriptorType) -> Result<DescriptorType> {
    use spirq::ty::DescriptorType as Spirq;
    match desc_ty {
        Spirq::UniformBuffer() => Ok(DescriptorType::UniformBuffer),
        Spirq::StorageBuffer(..) => Ok(DescriptorType::StorageBuffer),
        Spirq::CombinedImageSampler() | Spirq::SampledImage() => Ok(DescriptorType::CombinedImageSampler),
        other => {
            engine_bail!(SOURCE, "Unsupported SPIR-V descriptor type: {:?}", other);
        }
    }
}

impl ShaderReflector for SpirqReflector {
    fn reflect(&self, code: &[u32], stage: ShaderStageFlags) -> Result<ShaderReflection> {
        let entry_points = spirq::ReflectConfig::new()
            .spv(code)
            .ref_all_rscs(true)
            .reflect()
            .map_err(|e| engine_err!(SOURCE, "SPIR-V reflection failed: {:?}", e))?;

        let mut bindings: Vec<ReflectedBinding> = Vec::new();
        let mut push_constants = Vec::new();

        for entry_point in &entry_points {
            for var in entry_point.vars.iter() {
                match var {
                    spirq::var::Variable::Descriptor { desc_bind, desc_ty, nbind, .. } => {
                        let binding = ReflectedBinding {
                            set: desc_bind.set(),
                            binding: desc_bind.bind(),
                            descriptor_type: descriptor_type_from_spirq(desc_ty)?,
                            count: (*nbind).max(1),
                        };
                        // Several entry points may share a binding
                        if !bindings.iter().any(|b| b.set == binding.set && b.binding == binding.binding) {
                            bindings.push(binding);
                        }
                    }
                    spirq::var::Variable::PushConstant { ty, .. } => {
                        let Some(size) = ty.nbyte() else {
                            engine_bail!(SOURCE, "Push constant block without a fixed size");
                        };
                        let range = PushConstantRange { stages: stage, offset: 0, size: size as u32 };
                        if !push_constants.contains(&range) {
                            push_constants.push(range);
                        }
                    }
                    _ => {}
                }
            }
        }

        bindings.sort_by_key(|b| (b.set, b.binding));
        Ok(ShaderReflection { stage, bindings, push_constants })
    }
}

#[cfg(test)]
#[path = "vulkan_reflection_tests.rs"]
mod tests;

//! Unit tests for the Vulkan conversion tables
//!
//! Pure mappings, no GPU required.

use super::*;

// ============================================================================
// FORMAT CONVERSION TESTS
// ============================================================================

#[test]
fn test_color_formats_to_vk() {
    assert_eq!(format_to_vk(TextureFormat::R8G8B8A8_SRGB), vk::Format::R8G8B8A8_SRGB);
    assert_eq!(format_to_vk(TextureFormat::R8G8B8A8_UNORM), vk::Format::R8G8B8A8_UNORM);
    assert_eq!(format_to_vk(TextureFormat::B8G8R8A8_SRGB), vk::Format::B8G8R8A8_SRGB);
    assert_eq!(format_to_vk(TextureFormat::B8G8R8A8_UNORM), vk::Format::B8G8R8A8_UNORM);
    assert_eq!(format_to_vk(TextureFormat::R16G16B16A16_SFLOAT), vk::Format::R16G16B16A16_SFLOAT);
}

#[test]
fn test_depth_formats_to_vk() {
    assert_eq!(format_to_vk(TextureFormat::D16_UNORM), vk::Format::D16_UNORM);
    assert_eq!(format_to_vk(TextureFormat::D32_FLOAT), vk::Format::D32_SFLOAT);
    assert_eq!(format_to_vk(TextureFormat::D24_UNORM_S8_UINT), vk::Format::D24_UNORM_S8_UINT);
}

#[test]
fn test_vertex_formats_to_vk() {
    assert_eq!(format_to_vk(TextureFormat::R32_SFLOAT), vk::Format::R32_SFLOAT);
    assert_eq!(format_to_vk(TextureFormat::R32G32_SFLOAT), vk::Format::R32G32_SFLOAT);
    assert_eq!(format_to_vk(TextureFormat::R32G32B32_SFLOAT), vk::Format::R32G32B32_SFLOAT);
    assert_eq!(format_to_vk(TextureFormat::R32G32B32A32_SFLOAT), vk::Format::R32G32B32A32_SFLOAT);
}

#[test]
fn test_surface_format_round_trip() {
    for format in [
        TextureFormat::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM,
    ] {
        assert_eq!(vk_to_surface_format(format_to_vk(format)), Some(format));
    }
}

#[test]
fn test_unsupported_surface_format() {
    assert_eq!(vk_to_surface_format(vk::Format::A2B10G10R10_UNORM_PACK32), None);
    assert_eq!(vk_to_surface_format(vk::Format::D32_SFLOAT), None);
}

#[test]
fn test_aspect_mask() {
    assert_eq!(aspect_mask(TextureFormat::R8G8B8A8_UNORM), vk::ImageAspectFlags::COLOR);
    assert_eq!(aspect_mask(TextureFormat::D32_FLOAT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(
        aspect_mask(TextureFormat::D24_UNORM_S8_UINT),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
}

// ============================================================================
// USAGE CONVERSION TESTS
// ============================================================================

#[test]
fn test_texture_usage_to_vk() {
    assert!(texture_usage_to_vk(TextureUsage::Sampled).contains(vk::ImageUsageFlags::SAMPLED));
    assert!(texture_usage_to_vk(TextureUsage::RenderTarget).contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));

    let both = texture_usage_to_vk(TextureUsage::SampledAndRenderTarget);
    assert!(both.contains(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::COLOR_ATTACHMENT));

    let depth = texture_usage_to_vk(TextureUsage::DepthStencil);
    assert!(depth.contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT));
    assert!(!depth.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));
}

#[test]
fn test_buffer_usage_to_vk() {
    assert_eq!(buffer_usage_to_vk(BufferUsage::Vertex), vk::BufferUsageFlags::VERTEX_BUFFER);
    assert_eq!(buffer_usage_to_vk(BufferUsage::Index), vk::BufferUsageFlags::INDEX_BUFFER);
    assert_eq!(buffer_usage_to_vk(BufferUsage::Uniform), vk::BufferUsageFlags::UNIFORM_BUFFER);
    assert_eq!(buffer_usage_to_vk(BufferUsage::Storage), vk::BufferUsageFlags::STORAGE_BUFFER);
}

#[test]
fn test_samples_to_vk() {
    assert_eq!(samples_to_vk(1), vk::SampleCountFlags::TYPE_1);
    assert_eq!(samples_to_vk(4), vk::SampleCountFlags::TYPE_4);
    assert_eq!(samples_to_vk(16), vk::SampleCountFlags::TYPE_16);
    // Unsupported counts fall back to single sampling
    assert_eq!(samples_to_vk(3), vk::SampleCountFlags::TYPE_1);
    assert_eq!(samples_to_vk(0), vk::SampleCountFlags::TYPE_1);
}

// ============================================================================
// RENDER PASS CONVERSION TESTS
// ============================================================================

#[test]
fn test_load_store_ops_to_vk() {
    assert_eq!(load_op_to_vk(LoadOp::Load), vk::AttachmentLoadOp::LOAD);
    assert_eq!(load_op_to_vk(LoadOp::Clear), vk::AttachmentLoadOp::CLEAR);
    assert_eq!(load_op_to_vk(LoadOp::DontCare), vk::AttachmentLoadOp::DONT_CARE);
    assert_eq!(store_op_to_vk(StoreOp::Store), vk::AttachmentStoreOp::STORE);
    assert_eq!(store_op_to_vk(StoreOp::DontCare), vk::AttachmentStoreOp::DONT_CARE);
}

#[test]
fn test_image_layouts_to_vk() {
    assert_eq!(image_layout_to_vk(ImageLayout::Undefined), vk::ImageLayout::UNDEFINED);
    assert_eq!(image_layout_to_vk(ImageLayout::ColorAttachment), vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    assert_eq!(
        image_layout_to_vk(ImageLayout::DepthStencilAttachment),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    );
    assert_eq!(image_layout_to_vk(ImageLayout::ShaderReadOnly), vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    assert_eq!(image_layout_to_vk(ImageLayout::TransferSrc), vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
    assert_eq!(image_layout_to_vk(ImageLayout::TransferDst), vk::ImageLayout::TRANSFER_DST_OPTIMAL);
    assert_eq!(image_layout_to_vk(ImageLayout::PresentSrc), vk::ImageLayout::PRESENT_SRC_KHR);
}

// ============================================================================
// PIPELINE STATE CONVERSION TESTS
// ============================================================================

#[test]
fn test_topology_and_cull_mode_to_vk() {
    assert_eq!(topology_to_vk(PrimitiveTopology::TriangleList), vk::PrimitiveTopology::TRIANGLE_LIST);
    assert_eq!(topology_to_vk(PrimitiveTopology::TriangleStrip), vk::PrimitiveTopology::TRIANGLE_STRIP);
    assert_eq!(topology_to_vk(PrimitiveTopology::LineList), vk::PrimitiveTopology::LINE_LIST);
    assert_eq!(topology_to_vk(PrimitiveTopology::PointList), vk::PrimitiveTopology::POINT_LIST);
    assert_eq!(cull_mode_to_vk(CullMode::None), vk::CullModeFlags::NONE);
    assert_eq!(cull_mode_to_vk(CullMode::Back), vk::CullModeFlags::BACK);
}

#[test]
fn test_compare_op_to_vk() {
    assert_eq!(compare_op_to_vk(CompareOp::Less), vk::CompareOp::LESS);
    assert_eq!(compare_op_to_vk(CompareOp::LessOrEqual), vk::CompareOp::LESS_OR_EQUAL);
    assert_eq!(compare_op_to_vk(CompareOp::Always), vk::CompareOp::ALWAYS);
}

#[test]
fn test_index_type_to_vk() {
    assert_eq!(index_type_to_vk(IndexType::U16), vk::IndexType::UINT16);
    assert_eq!(index_type_to_vk(IndexType::U32), vk::IndexType::UINT32);
}

#[test]
fn test_descriptor_types_to_vk() {
    assert_eq!(
        descriptor_type_to_vk(DescriptorType::UniformBufferDynamic),
        vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
    );
    assert_eq!(
        descriptor_type_to_vk(DescriptorType::StorageBufferDynamic),
        vk::DescriptorType::STORAGE_BUFFER_DYNAMIC
    );
    assert_eq!(
        descriptor_type_to_vk(DescriptorType::CombinedImageSampler),
        vk::DescriptorType::COMBINED_IMAGE_SAMPLER
    );
}

#[test]
fn test_stage_flags_to_vk() {
    assert_eq!(stage_flags_to_vk(ShaderStageFlags::VERTEX), vk::ShaderStageFlags::VERTEX);
    assert_eq!(
        stage_flags_to_vk(ShaderStageFlags::VERTEX_FRAGMENT),
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
    );
    assert_eq!(stage_flags_to_vk(ShaderStageFlags::empty()), vk::ShaderStageFlags::empty());
}

#[test]
fn test_blend_modes_to_vk() {
    let opaque = blend_attachment_to_vk(BlendMode::Opaque);
    assert_eq!(opaque.blend_enable, vk::FALSE);
    assert_eq!(opaque.color_write_mask, vk::ColorComponentFlags::RGBA);

    let alpha = blend_attachment_to_vk(BlendMode::Alpha);
    assert_eq!(alpha.blend_enable, vk::TRUE);
    assert_eq!(alpha.dst_color_blend_factor, vk::BlendFactor::ONE_MINUS_SRC_ALPHA);

    let additive = blend_attachment_to_vk(BlendMode::Additive);
    assert_eq!(additive.src_color_blend_factor, vk::BlendFactor::ONE);
    assert_eq!(additive.dst_color_blend_factor, vk::BlendFactor::ONE);
}

// ============================================================================
// ERROR MAPPING TESTS
// ============================================================================

#[test]
fn test_vk_error_mapping() {
    assert_eq!(
        vk_error("stellar::vulkan::test", "alloc", vk::Result::ERROR_OUT_OF_DEVICE_MEMORY),
        Error::OutOfMemory
    );
    assert_eq!(
        vk_error("stellar::vulkan::test", "submit", vk::Result::ERROR_DEVICE_LOST),
        Error::DeviceLost
    );
    assert_eq!(
        vk_error("stellar::vulkan::test", "acquire", vk::Result::ERROR_SURFACE_LOST_KHR),
        Error::SurfaceLost
    );
    match vk_error("stellar::vulkan::test", "create", vk::Result::ERROR_INITIALIZATION_FAILED) {
        Error::BackendError(message) => assert!(message.starts_with("create: ")),
        other => panic!("unexpected error {:?}", other),
    }
}

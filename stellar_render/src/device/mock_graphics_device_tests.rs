use super::*;
use crate::device::{AttachmentDesc, ImageLayout, LoadOp, StoreOp};

fn color_texture_desc() -> TextureDesc {
    TextureDesc {
        debug_name: "color".to_string(),
        width: 64,
        height: 32,
        format: TextureFormat::R8G8B8A8_UNORM,
        usage: TextureUsage::SampledAndRenderTarget,
        samples: 1,
    }
}

// ============================================================================
// Creation counters
// ============================================================================

#[test]
fn test_texture_and_view_counters() {
    let device = MockGraphicsDevice::new();
    let texture = device.create_texture(&color_texture_desc()).unwrap();
    let view = device.create_render_target(&texture).unwrap();

    assert_eq!(view.width(), 64);
    assert_eq!(view.height(), 32);
    assert_eq!(device.live("texture"), 1);
    assert_eq!(device.live("render_target"), 1);

    drop(view);
    drop(texture);
    assert_eq!(device.live("texture"), 0);
    assert_eq!(device.live("render_target"), 0);
}

#[test]
fn test_render_target_rejects_sampled_only_texture() {
    let device = MockGraphicsDevice::new();
    let mut desc = color_texture_desc();
    desc.usage = TextureUsage::Sampled;
    let texture = device.create_texture(&desc).unwrap();
    assert!(device.create_render_target(&texture).is_err());
}

#[test]
fn test_ids_are_unique() {
    let device = MockGraphicsDevice::new();
    let a = device.create_texture(&color_texture_desc()).unwrap();
    let b = device.create_texture(&color_texture_desc()).unwrap();
    assert_ne!(a.id(), b.id());
}

#[test]
fn test_fail_next_applies_once() {
    let device = MockGraphicsDevice::new();
    device.fail_next(Error::OutOfMemory);
    assert_eq!(device.create_texture(&color_texture_desc()).err(), Some(Error::OutOfMemory));
    assert!(device.create_texture(&color_texture_desc()).is_ok());
}

// ============================================================================
// Buffers
// ============================================================================

#[test]
fn test_buffer_update_and_read_back() {
    let device = MockGraphicsDevice::new();
    let buffer = device.create_buffer(&BufferDesc {
        debug_name: "ubo".to_string(),
        size: 16,
        usage: BufferUsage::Uniform,
    }).unwrap();

    buffer.update(4, &[1, 2, 3]).unwrap();
    assert_eq!(read_mock_buffer(&buffer, 3, 5), vec![0, 1, 2, 3, 0]);
    assert!(buffer.update(15, &[1, 2]).is_err());
    assert!(buffer.mapped_ptr().is_some());
}

// ============================================================================
// Command lists
// ============================================================================

#[test]
fn test_command_list_records_and_checks_state() {
    let device = MockGraphicsDevice::new();
    let rp = device.create_render_pass(&RenderPassDesc {
        debug_name: "rp".to_string(),
        color_attachments: vec![AttachmentDesc {
            format: TextureFormat::R8G8B8A8_UNORM,
            samples: 1,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            initial_layout: ImageLayout::Undefined,
            final_layout: ImageLayout::ShaderReadOnly,
        }],
        depth_attachment: None,
    }).unwrap();
    let texture = device.create_texture(&color_texture_desc()).unwrap();
    let view = device.create_render_target(&texture).unwrap();
    let fb = device.create_framebuffer(&FramebufferDesc {
        debug_name: "fb".to_string(),
        render_pass: rp.clone(),
        color_attachments: vec![view],
        depth_attachment: None,
        width: 64,
        height: 32,
    }).unwrap();

    let mut cmd = device.create_command_list().unwrap();
    assert!(cmd.draw(3, 0).is_err());
    cmd.begin().unwrap();
    assert!(cmd.draw(3, 0).is_err());
    cmd.begin_render_pass(&rp, &fb, &[ClearValue::BLACK]).unwrap();
    cmd.draw(3, 0).unwrap();
    assert!(cmd.end().is_err());
    cmd.end_render_pass().unwrap();
    cmd.end().unwrap();

    let commands = device.commands();
    assert_eq!(commands.first().map(String::as_str), Some("begin"));
    assert!(commands.contains(&"draw(3, 0)".to_string()));
    assert_eq!(commands.last().map(String::as_str), Some("end"));
    assert_eq!(mock_render_pass_desc(&rp).color_attachments.len(), 1);
}

// ============================================================================
// Sync and submission
// ============================================================================

#[test]
fn test_submit_signals_fence() {
    let device = MockGraphicsDevice::new();
    let fence = device.create_fence(false).unwrap();
    let cmd = device.create_command_list().unwrap();
    assert!(fence.wait(0).is_err());

    device.submit(cmd.as_ref(), &SubmitInfo { fence: Some(fence.as_ref()), ..Default::default() }).unwrap();
    assert!(fence.is_signaled().unwrap());
    assert!(fence.wait(0).is_ok());
}

#[test]
fn test_hung_gpu_leaves_fence_unsignaled() {
    let device = MockGraphicsDevice::new();
    device.set_fences_signal_on_submit(false);
    let fence = device.create_fence(false).unwrap();
    let cmd = device.create_command_list().unwrap();
    device.submit(cmd.as_ref(), &SubmitInfo { fence: Some(fence.as_ref()), ..Default::default() }).unwrap();
    assert!(!fence.is_signaled().unwrap());
}

// ============================================================================
// Swapchain
// ============================================================================

#[test]
fn test_swapchain_cycles_images_and_follows_script() {
    let device = MockGraphicsDevice::new();
    let mut swapchain = device.create_swapchain(800, 600, 2);
    let semaphore = device.create_semaphore().unwrap();
    swapchain.script().lock().unwrap().acquire.push_back(AcquireOutcome::OutOfDate);

    assert_eq!(swapchain.acquire_next_image(semaphore.as_ref()).unwrap(), AcquireOutcome::OutOfDate);
    assert_eq!(
        swapchain.acquire_next_image(semaphore.as_ref()).unwrap(),
        AcquireOutcome::Acquired { image_index: 0, suboptimal: false });
    assert_eq!(
        swapchain.acquire_next_image(semaphore.as_ref()).unwrap(),
        AcquireOutcome::Acquired { image_index: 1, suboptimal: false });
    assert_eq!(swapchain.present(1, semaphore.as_ref()).unwrap(), PresentOutcome::Presented);
}

#[test]
fn test_swapchain_recreate_keeps_old_alive() {
    let device = MockGraphicsDevice::new();
    let swapchain = device.create_swapchain(800, 600, 3);
    let replacement = swapchain.recreate(1024, 768).unwrap();

    assert_eq!(replacement.width(), 1024);
    assert_eq!(replacement.image_count(), 3);
    assert_ne!(replacement.id(), swapchain.id());
    assert_eq!(device.live("swapchain"), 2);

    drop(swapchain);
    assert_eq!(device.live("swapchain"), 1);
}

// ============================================================================
// Descriptors
// ============================================================================

#[test]
fn test_descriptor_pool_validates_layout() {
    use crate::device::{DescriptorBindingDesc, DescriptorType, ShaderSource};

    let device = MockGraphicsDevice::new();
    let rp = device.create_render_pass(&RenderPassDesc {
        debug_name: "rp".to_string(),
        color_attachments: Vec::new(),
        depth_attachment: None,
    }).unwrap();
    let mut desc = PipelineDesc::new("p", ShaderSource::spirv(vec![]), ShaderSource::spirv(vec![]));
    desc.set_layouts = vec![DescriptorSetLayoutDesc {
        bindings: vec![DescriptorBindingDesc {
            binding: 0,
            descriptor_type: DescriptorType::UniformBufferDynamic,
            count: 1,
            stages: ShaderStageFlags::VERTEX,
        }],
    }];
    let pipeline = device.create_pipeline(&desc, &rp).unwrap();
    let buffer = device.create_buffer(&BufferDesc {
        debug_name: "ubo".to_string(),
        size: 256,
        usage: BufferUsage::Uniform,
    }).unwrap();

    let mut pool = device.create_descriptor_pool(&DescriptorPoolDesc::default()).unwrap();
    let write = DescriptorWrite::Buffer { binding: 0, buffer: buffer.clone(), offset: 0, range: 64 };
    let set = pool.allocate(&pipeline, 0, &[write]).unwrap();
    assert_eq!(set.set_index(), 0);
    assert_eq!(pool.allocated_sets(), 1);

    let bad = DescriptorWrite::Buffer { binding: 5, buffer, offset: 0, range: 64 };
    assert!(pool.allocate(&pipeline, 0, &[bad]).is_err());
    assert!(pool.allocate(&pipeline, 1, &[]).is_err());

    pool.reset().unwrap();
    assert_eq!(pool.allocated_sets(), 0);
}

use super::*;
use crate::attachment::SWAPCHAIN_ATTACHMENT;
use crate::cache::{SharedCache, StructuralCache};
use crate::device::mock_graphics_device::{MockGraphicsDevice, MockSwapchainScript};
use crate::device::RenderPassDesc;

struct Fixture {
    device: Arc<MockGraphicsDevice>,
    context: RenderContext,
    frames: FrameLifecycleManager,
    script: Arc<Mutex<MockSwapchainScript>>,
}

fn setup(max_frames_in_flight: u32, num_threads: u32) -> Fixture {
    let device = Arc::new(MockGraphicsDevice::new());
    let swapchain = device.create_swapchain(800, 600, 3);
    let script = swapchain.script();
    let config = FrameConfig {
        max_frames_in_flight,
        num_threads,
        vertex_scratch_size: 1024,
        index_scratch_size: 1024,
        uniform_scratch_size: 4096,
        storage_scratch_size: 4096,
        cache_idle_frames: None,
    };
    let context = RenderContext::new(device.clone(), config, &swapchain).unwrap();
    let frames = FrameLifecycleManager::new(&context, Box::new(swapchain)).unwrap();
    Fixture { device, context, frames, script }
}

/// wait + submit + present, returning the slot used
fn run_frame(frames: &mut FrameLifecycleManager) -> usize {
    let slot = frames.wait_for_frame().unwrap().slot();
    frames.submit_frame_commands().unwrap();
    frames.present().unwrap();
    slot
}

fn position(commands: &[String], prefix: &str) -> usize {
    commands.iter().position(|c| c.starts_with(prefix))
        .unwrap_or_else(|| panic!("no command starting with '{}' in {:?}", prefix, commands))
}

// ============================================================================
// Ring buffer
// ============================================================================

#[test]
fn test_ring_cycles_through_slots() {
    let mut fx = setup(3, 0);
    let slots: Vec<usize> = (0..5).map(|_| run_frame(&mut fx.frames)).collect();
    assert_eq!(slots, vec![0, 1, 2, 0, 1]);
    assert_eq!(fx.frames.frame_number(), 5);
    assert_eq!(fx.frames.current_slot(), 2);
}

#[test]
fn test_creates_one_context_per_slot() {
    let fx = setup(3, 0);
    assert_eq!(fx.frames.frames_in_flight(), 3);
    assert_eq!(fx.device.count("fence.created"), 3);
    assert_eq!(fx.device.count("semaphore.created"), 6);
    assert_eq!(fx.device.count("command_list.created"), 3);
    assert_eq!(fx.device.count("buffer.created"), 12);
}

#[test]
fn test_active_frame_reports_acquired_image() {
    let mut fx = setup(2, 0);
    let frame = fx.frames.wait_for_frame().unwrap();
    assert_eq!(frame.image_index(), 0);
    assert_eq!(frame.frame_number(), 0);
    drop(frame);

    let view = fx.context.attachments().view(SWAPCHAIN_ATTACHMENT).unwrap();
    assert_eq!(view.id(), fx.frames.swapchain().render_target(0).id());
}

// ============================================================================
// Submission and presentation
// ============================================================================

#[test]
fn test_frame_command_order() {
    let mut fx = setup(2, 0);
    run_frame(&mut fx.frames);
    let commands = fx.device.commands();

    let wait = position(&commands, "wait_fence");
    let acquire = position(&commands, "acquire");
    let begin = position(&commands, "begin");
    let end = position(&commands, "end");
    let submit = position(&commands, "submit");
    let present = position(&commands, "present");
    assert!(wait < acquire && acquire < begin && begin < end && end < submit && submit < present);
    assert!(commands[present].ends_with("Presented"));
}

#[test]
fn test_submit_waits_acquired_and_signals_finished() {
    let mut fx = setup(1, 0);
    run_frame(&mut fx.frames);
    let commands = fx.device.commands();

    // Semaphore ids: acquire signals the first, present waits on the second
    let acquire = &commands[position(&commands, "acquire")];
    let submit = &commands[position(&commands, "submit")];
    let present = &commands[position(&commands, "present")];
    let acquired = acquire.trim_start_matches("acquire(").split(')').next().unwrap();
    let finished = present.trim_start_matches("present(0, ").split(')').next().unwrap();
    assert_eq!(submit, &format!("submit(wait {}, signal {})", acquired, finished));
}

#[test]
fn test_hung_gpu_fence_wait_fails() {
    let mut fx = setup(1, 0);
    fx.device.set_fences_signal_on_submit(false);
    run_frame(&mut fx.frames);

    let result = fx.frames.wait_for_frame();
    assert!(matches!(result, Err(Error::BackendError(_))));
}

#[test]
fn test_scratch_reset_when_slot_reused() {
    let mut fx = setup(1, 0);
    {
        let mut frame = fx.frames.wait_for_frame().unwrap();
        frame.scratch().vertex.allocate(100);
        frame.scratch().uniform.allocate(4);
        assert_eq!(frame.scratch().used(), 112 + 256);
    }
    fx.frames.submit_frame_commands().unwrap();
    fx.frames.present().unwrap();

    let mut frame = fx.frames.wait_for_frame().unwrap();
    assert_eq!(frame.slot(), 0);
    assert_eq!(frame.scratch().used(), 0);
    assert_eq!(frame.scratch().vertex.high_water_mark(), 112);
}

// ============================================================================
// State machine
// ============================================================================

#[test]
#[should_panic(expected = "submit_frame_commands")]
fn test_submit_without_frame_panics() {
    let mut fx = setup(2, 0);
    let _ = fx.frames.submit_frame_commands();
}

#[test]
#[should_panic(expected = "present()")]
fn test_present_before_submit_panics() {
    let mut fx = setup(2, 0);
    fx.frames.wait_for_frame().unwrap();
    let _ = fx.frames.present();
}

#[test]
#[should_panic(expected = "wait_for_frame")]
fn test_double_wait_panics() {
    let mut fx = setup(2, 0);
    fx.frames.wait_for_frame().unwrap();
    let _ = fx.frames.wait_for_frame();
}

// ============================================================================
// Swapchain recreation
// ============================================================================

#[test]
fn test_out_of_date_acquire_recreates_and_defers_old_swapchain() {
    let mut fx = setup(2, 0);
    let old_id = fx.frames.swapchain().id();
    fx.script.lock().unwrap().acquire.push_back(AcquireOutcome::OutOfDate);

    run_frame(&mut fx.frames);
    assert_ne!(fx.frames.swapchain().id(), old_id);
    assert_eq!(fx.frames.stats().swapchain_recreations, 1);
    assert_eq!(fx.device.live("swapchain"), 2);

    // max_frames_in_flight + 2 = 4 ticks survived, freed on the 5th; the first happened at present
    for _ in 0..3 {
        run_frame(&mut fx.frames);
        assert_eq!(fx.device.live("swapchain"), 2);
    }
    run_frame(&mut fx.frames);
    assert_eq!(fx.device.live("swapchain"), 1);
    assert_eq!(fx.frames.stats().pending_deletions, 0);
}

#[test]
fn test_recreation_rebinds_swapchain_attachment() {
    let mut fx = setup(2, 0);
    fx.script.lock().unwrap().acquire.push_back(AcquireOutcome::OutOfDate);

    let image_index = fx.frames.wait_for_frame().unwrap().image_index();
    let view = fx.context.attachments().view(SWAPCHAIN_ATTACHMENT).unwrap();
    assert_eq!(view.id(), fx.frames.swapchain().render_target(image_index).id());
}

#[test]
fn test_out_of_date_present_recreates_next_frame() {
    let mut fx = setup(2, 0);
    fx.script.lock().unwrap().present.push_back(PresentOutcome::OutOfDate);

    fx.frames.wait_for_frame().unwrap();
    fx.frames.submit_frame_commands().unwrap();
    assert_eq!(fx.frames.present().unwrap(), PresentOutcome::OutOfDate);
    assert_eq!(fx.frames.stats().swapchain_recreations, 0);

    run_frame(&mut fx.frames);
    assert_eq!(fx.frames.stats().swapchain_recreations, 1);
}

#[test]
fn test_suboptimal_acquire_schedules_recreation() {
    let mut fx = setup(2, 0);
    fx.script.lock().unwrap().acquire.push_back(
        AcquireOutcome::Acquired { image_index: 2, suboptimal: true });

    assert_eq!(fx.frames.wait_for_frame().unwrap().image_index(), 2);
    fx.frames.submit_frame_commands().unwrap();
    fx.frames.present().unwrap();
    assert_eq!(fx.frames.stats().swapchain_recreations, 0);

    run_frame(&mut fx.frames);
    assert_eq!(fx.frames.stats().swapchain_recreations, 1);
}

#[test]
fn test_request_resize() {
    let mut fx = setup(2, 0);
    fx.frames.request_resize(1024, 768);
    run_frame(&mut fx.frames);

    assert_eq!(fx.frames.stats().swapchain_extent, (1024, 768));
    assert_eq!(fx.context.attachments().swapchain_extent(), (1024, 768));
}

#[test]
fn test_persistent_out_of_date_is_surface_lost() {
    let mut fx = setup(2, 0);
    {
        let mut script = fx.script.lock().unwrap();
        for _ in 0..3 {
            script.acquire.push_back(AcquireOutcome::OutOfDate);
        }
    }

    assert!(matches!(fx.frames.wait_for_frame(), Err(Error::SurfaceLost)));
    // The slot is usable again once the surface recovers
    assert_eq!(run_frame(&mut fx.frames), 0);
}

#[test]
fn test_acquire_error_propagates() {
    let mut fx = setup(2, 0);
    fx.device.fail_next(Error::DeviceLost);
    assert!(matches!(fx.frames.wait_for_frame(), Err(Error::DeviceLost)));
}

// ============================================================================
// Cache ticking
// ============================================================================

#[test]
fn test_registered_cache_ticked_per_frame() {
    let mut fx = setup(2, 0);
    let cache: Arc<SharedCache<u32, u32>> = Arc::new(Mutex::new(StructuralCache::new("test", 2)));
    cache.lock().unwrap().insert(1, 10);
    fx.frames.register_cache(cache.clone());

    run_frame(&mut fx.frames);
    run_frame(&mut fx.frames);
    assert!(cache.lock().unwrap().contains_key(&1));
    run_frame(&mut fx.frames);
    assert!(!cache.lock().unwrap().contains_key(&1));
}

#[test]
fn test_context_caches_evicted_when_idle() {
    let mut fx = setup(2, 0);
    fx.context.caches().render_pass(&RenderPassDesc::default()).unwrap();
    assert_eq!(fx.device.live("render_pass"), 1);

    // Used this frame, then idle past max_frames_in_flight + 1
    for _ in 0..4 {
        run_frame(&mut fx.frames);
    }
    assert_eq!(fx.context.caches().render_pass_count(), 1);
    run_frame(&mut fx.frames);
    assert_eq!(fx.context.caches().render_pass_count(), 0);
    assert_eq!(fx.device.live("render_pass"), 0);
}

// ============================================================================
// Thread sessions
// ============================================================================

#[test]
fn test_thread_sessions_record_in_parallel() {
    let mut fx = setup(2, 2);
    let frame = fx.frames.wait_for_frame().unwrap();
    let sessions = frame.thread_sessions();
    assert_eq!(sessions.len(), 2);

    std::thread::scope(|scope| {
        for index in 0..2 {
            scope.spawn(move || {
                let mut session = sessions.begin_thread(index);
                assert_eq!(session.index(), index);
                let a = session.scratch().uniform.allocate(16);
                let b = session.scratch().uniform.allocate(16);
                assert_eq!(b.offset() - a.offset(), 256);
                session.end_thread();
            });
        }
    });
}

#[test]
fn test_thread_resources_reset_at_slot_start() {
    let mut fx = setup(1, 1);
    {
        let frame = fx.frames.wait_for_frame().unwrap();
        let mut session = frame.thread_sessions().begin_thread(0);
        session.scratch().storage.allocate(64);
        assert_eq!(session.descriptor_pool().allocated_sets(), 0);
        session.end_thread();
    }
    fx.frames.submit_frame_commands().unwrap();
    fx.frames.present().unwrap();
    let resets = fx.device.count("descriptor_pool.reset");

    let frame = fx.frames.wait_for_frame().unwrap();
    let mut session = frame.thread_sessions().begin_thread(0);
    assert_eq!(session.scratch().used(), 0);
    assert_eq!(fx.device.count("descriptor_pool.reset"), resets + 1);
}

#[test]
#[should_panic(expected = "already has an open session")]
fn test_concurrent_sessions_on_same_index_panic() {
    let mut fx = setup(2, 1);
    let frame = fx.frames.wait_for_frame().unwrap();
    let sessions = frame.thread_sessions();
    let _first = sessions.begin_thread(0);
    let _second = sessions.begin_thread(0);
}

#[test]
#[should_panic(expected = "out of range")]
fn test_thread_index_out_of_range_panics() {
    let mut fx = setup(2, 1);
    let frame = fx.frames.wait_for_frame().unwrap();
    frame.thread_sessions().begin_thread(1);
}

// ============================================================================
// Shutdown and stats
// ============================================================================

#[test]
fn test_shutdown_flushes_deletions_and_caches() {
    let mut fx = setup(2, 0);
    fx.context.caches().render_pass(&RenderPassDesc::default()).unwrap();
    fx.frames.request_resize(640, 480);
    run_frame(&mut fx.frames);
    assert_eq!(fx.frames.stats().pending_deletions, 1);

    fx.frames.shutdown().unwrap();
    assert!(fx.device.commands().iter().any(|c| c == "wait_idle"));
    assert_eq!(fx.frames.stats().pending_deletions, 0);
    assert_eq!(fx.device.live("swapchain"), 1);
    assert_eq!(fx.context.caches().render_pass_count(), 0);
}

#[test]
fn test_stats_snapshot() {
    let mut fx = setup(3, 0);
    run_frame(&mut fx.frames);
    run_frame(&mut fx.frames);

    let stats = fx.frames.stats();
    assert_eq!(stats.frame_number, 2);
    assert_eq!(stats.slot, 2);
    assert_eq!(stats.image_index, Some(1));
    assert_eq!(stats.swapchain_extent, (800, 600));
}

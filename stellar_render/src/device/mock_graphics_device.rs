/// Mock graphics device for unit tests (no GPU required)
///
/// Every object reports creation and destruction into a shared counter
/// table so tests can observe cache eviction and deferred deletion.
/// Command lists record their calls as strings. Buffers are backed by host
/// memory so scratch writes can be read back.

use std::collections::VecDeque;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;

use crate::device::{
    AcquireOutcome, Buffer, BufferDesc, BufferUsage, ClearValue, CommandList, DescriptorPool,
    DescriptorPoolDesc, DescriptorSet, DescriptorSetLayoutDesc, DescriptorWrite, DeviceLimits,
    Fence, Framebuffer, FramebufferDesc, GraphicsDevice, IndexType, Pipeline, PipelineDesc,
    PresentOutcome, Rect2D, RenderPass, RenderPassDesc, RenderTarget, Semaphore,
    ShaderStageFlags, SubmitInfo, Swapchain, Texture, TextureDesc, TextureFormat, TextureInfo,
    TextureUsage, Viewport,
};
use crate::engine_bail;
use crate::error::{Error, Result};
use crate::utils::{IdAllocator, ResourceId};

// ============================================================================
// Shared state
// ============================================================================

/// State shared by the mock device and every object it creates
#[derive(Default)]
pub struct MockShared {
    ids: IdAllocator,
    counters: Mutex<FxHashMap<String, usize>>,
    commands: Mutex<Vec<String>>,
    fail_next: Mutex<Option<Error>>,
    fences_signal_on_submit: AtomicBool,
}

impl MockShared {
    fn bump(&self, counter: &str) {
        *self.counters.lock().unwrap().entry(counter.to_string()).or_insert(0) += 1;
    }

    fn record(&self, command: String) {
        self.commands.lock().unwrap().push(command);
    }

    fn take_failure(&self) -> Result<()> {
        match self.fail_next.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Value of a counter such as "texture.created" (0 if never bumped)
    pub fn count(&self, counter: &str) -> usize {
        self.counters.lock().unwrap().get(counter).copied().unwrap_or(0)
    }

    /// Objects of `kind` created and not yet dropped
    pub fn live(&self, kind: &str) -> usize {
        self.count(&format!("{}.created", kind)) - self.count(&format!("{}.dropped", kind))
    }
}

// ============================================================================
// Mock Texture / RenderTarget
// ============================================================================

pub struct MockTexture {
    id: ResourceId,
    info: TextureInfo,
    pub name: String,
    shared: Arc<MockShared>,
}

impl Texture for MockTexture {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

impl Drop for MockTexture {
    fn drop(&mut self) {
        self.shared.bump("texture.dropped");
    }
}

pub struct MockRenderTarget {
    id: ResourceId,
    width: u32,
    height: u32,
    format: TextureFormat,
    samples: u32,
    shared: Arc<MockShared>,
}

impl RenderTarget for MockRenderTarget {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn samples(&self) -> u32 {
        self.samples
    }
}

impl Drop for MockRenderTarget {
    fn drop(&mut self) {
        self.shared.bump("render_target.dropped");
    }
}

// ============================================================================
// Mock Buffer
// ============================================================================

pub struct MockBuffer {
    id: ResourceId,
    size: u64,
    usage: BufferUsage,
    // Written through `ptr` only; never resized so the pointer stays valid
    storage: Vec<u8>,
    ptr: NonNull<u8>,
    shared: Arc<MockShared>,
}

// SAFETY: `storage` is only accessed through `ptr`, and scratch allocations
// hand out disjoint ranges of it.
unsafe impl Send for MockBuffer {}
unsafe impl Sync for MockBuffer {}

impl MockBuffer {
    /// Read back `len` bytes at `offset`
    pub fn read(&self, offset: u64, len: usize) -> Vec<u8> {
        assert!(offset as usize + len <= self.storage.len());
        let mut out = vec![0u8; len];
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr.as_ptr().add(offset as usize), out.as_mut_ptr(), len);
        }
        out
    }
}

impl Buffer for MockBuffer {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn mapped_ptr(&self) -> Option<NonNull<u8>> {
        Some(self.ptr)
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        if offset + data.len() as u64 > self.size {
            engine_bail!("stellar::mock", "buffer update out of range ({} + {} > {})",
                offset, data.len(), self.size);
        }
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), self.ptr.as_ptr().add(offset as usize), data.len());
        }
        Ok(())
    }
}

impl Drop for MockBuffer {
    fn drop(&mut self) {
        self.shared.bump("buffer.dropped");
    }
}

/// Read back bytes from a buffer created by the mock device
pub fn read_mock_buffer(buffer: &Arc<dyn Buffer>, offset: u64, len: usize) -> Vec<u8> {
    // SAFETY: only called on buffers created by MockGraphicsDevice
    let mock = unsafe { &*(buffer.as_ref() as *const dyn Buffer as *const MockBuffer) };
    mock.read(offset, len)
}

// ============================================================================
// Mock RenderPass / Framebuffer / Pipeline
// ============================================================================

pub struct MockRenderPass {
    id: ResourceId,
    pub desc: RenderPassDesc,
    shared: Arc<MockShared>,
}

impl RenderPass for MockRenderPass {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn color_attachment_count(&self) -> usize {
        self.desc.color_attachments.len()
    }

    fn has_depth_attachment(&self) -> bool {
        self.desc.depth_attachment.is_some()
    }
}

impl Drop for MockRenderPass {
    fn drop(&mut self) {
        self.shared.bump("render_pass.dropped");
    }
}

/// Access the descriptor a mock render pass was created from
pub fn mock_render_pass_desc(render_pass: &Arc<dyn RenderPass>) -> RenderPassDesc {
    // SAFETY: only called on render passes created by MockGraphicsDevice
    let mock = unsafe { &*(render_pass.as_ref() as *const dyn RenderPass as *const MockRenderPass) };
    mock.desc.clone()
}

pub struct MockFramebuffer {
    id: ResourceId,
    width: u32,
    height: u32,
    _attachments: Vec<Arc<dyn RenderTarget>>,
    shared: Arc<MockShared>,
}

impl Framebuffer for MockFramebuffer {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for MockFramebuffer {
    fn drop(&mut self) {
        self.shared.bump("framebuffer.dropped");
    }
}

pub struct MockPipeline {
    id: ResourceId,
    pub name: String,
    set_layouts: Vec<DescriptorSetLayoutDesc>,
    shared: Arc<MockShared>,
}

impl Pipeline for MockPipeline {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn set_layout(&self, set_index: u32) -> Option<&DescriptorSetLayoutDesc> {
        self.set_layouts.get(set_index as usize)
    }

    fn set_layout_count(&self) -> u32 {
        self.set_layouts.len() as u32
    }
}

impl Drop for MockPipeline {
    fn drop(&mut self) {
        self.shared.bump("pipeline.dropped");
    }
}

// ============================================================================
// Mock descriptors
// ============================================================================

pub struct MockDescriptorSet {
    id: ResourceId,
    set_index: u32,
    shared: Arc<MockShared>,
}

impl DescriptorSet for MockDescriptorSet {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn set_index(&self) -> u32 {
        self.set_index
    }
}

impl Drop for MockDescriptorSet {
    fn drop(&mut self) {
        self.shared.bump("descriptor_set.dropped");
    }
}

pub struct MockDescriptorPool {
    allocated: u32,
    max_sets: u32,
    shared: Arc<MockShared>,
}

impl DescriptorPool for MockDescriptorPool {
    fn allocate(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        writes: &[DescriptorWrite],
    ) -> Result<Arc<dyn DescriptorSet>> {
        let Some(layout) = pipeline.set_layout(set_index) else {
            engine_bail!("stellar::mock", "pipeline has no descriptor set {}", set_index);
        };
        for write in writes {
            if layout.binding(write.binding()).is_none() {
                engine_bail!("stellar::mock", "set {} has no binding {}", set_index, write.binding());
            }
        }
        if self.allocated >= self.max_sets {
            return Err(Error::OutOfMemory);
        }
        self.allocated += 1;
        self.shared.bump("descriptor_set.created");
        Ok(Arc::new(MockDescriptorSet {
            id: self.shared.ids.allocate(),
            set_index,
            shared: self.shared.clone(),
        }))
    }

    fn reset(&mut self) -> Result<()> {
        self.allocated = 0;
        self.shared.bump("descriptor_pool.reset");
        Ok(())
    }

    fn allocated_sets(&self) -> u32 {
        self.allocated
    }
}

// ============================================================================
// Mock sync objects
// ============================================================================

pub struct MockFence {
    id: ResourceId,
    signaled: AtomicBool,
    shared: Arc<MockShared>,
}

impl Fence for MockFence {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn wait(&self, _timeout_ns: u64) -> Result<()> {
        self.shared.record(format!("wait_fence({})", self.id));
        if self.signaled.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::BackendError(format!("fence {} wait timed out", self.id)))
        }
    }

    fn reset(&self) -> Result<()> {
        self.signaled.store(false, Ordering::Release);
        Ok(())
    }

    fn is_signaled(&self) -> Result<bool> {
        Ok(self.signaled.load(Ordering::Acquire))
    }
}

pub struct MockSemaphore {
    id: ResourceId,
}

impl Semaphore for MockSemaphore {
    fn id(&self) -> ResourceId {
        self.id
    }
}

// ============================================================================
// Mock CommandList
// ============================================================================

pub struct MockCommandList {
    recording: bool,
    in_render_pass: bool,
    shared: Arc<MockShared>,
}

impl MockCommandList {
    fn check_recording(&self, what: &str) -> Result<()> {
        if !self.recording {
            engine_bail!("stellar::mock", "{}: command list is not recording", what);
        }
        Ok(())
    }

    fn check_in_render_pass(&self, what: &str) -> Result<()> {
        self.check_recording(what)?;
        if !self.in_render_pass {
            engine_bail!("stellar::mock", "{}: no active render pass", what);
        }
        Ok(())
    }
}

impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        if self.recording {
            engine_bail!("stellar::mock", "begin: command list already recording");
        }
        self.recording = true;
        self.shared.record("begin".to_string());
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.check_recording("end")?;
        if self.in_render_pass {
            engine_bail!("stellar::mock", "end: render pass still active");
        }
        self.recording = false;
        self.shared.record("end".to_string());
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.check_recording("begin_render_pass")?;
        if self.in_render_pass {
            engine_bail!("stellar::mock", "begin_render_pass: render pass already active");
        }
        self.in_render_pass = true;
        self.shared.record(format!(
            "begin_render_pass({}, {}, {} clears)",
            render_pass.id(), framebuffer.id(), clear_values.len()));
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.check_in_render_pass("end_render_pass")?;
        self.in_render_pass = false;
        self.shared.record("end_render_pass".to_string());
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.check_recording("set_viewport")?;
        self.shared.record(format!("set_viewport({}x{})", viewport.width, viewport.height));
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.check_recording("set_scissor")?;
        self.shared.record(format!("set_scissor({}x{})", scissor.width, scissor.height));
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.check_in_render_pass("bind_pipeline")?;
        self.shared.record(format!("bind_pipeline({})", pipeline.id()));
        Ok(())
    }

    fn bind_descriptor_set(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        descriptor_set: &Arc<dyn DescriptorSet>,
        dynamic_offsets: &[u32],
    ) -> Result<()> {
        self.check_in_render_pass("bind_descriptor_set")?;
        self.shared.record(format!(
            "bind_descriptor_set({}, {}, {:?})",
            set_index, descriptor_set.id(), dynamic_offsets));
        Ok(())
    }

    fn push_constants(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        _stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        self.check_in_render_pass("push_constants")?;
        self.shared.record(format!("push_constants({}, {})", offset, data.len()));
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        self.check_in_render_pass("bind_vertex_buffer")?;
        self.shared.record(format!("bind_vertex_buffer({}, {})", buffer.id(), offset));
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()> {
        self.check_in_render_pass("bind_index_buffer")?;
        self.shared.record(format!("bind_index_buffer({}, {}, {:?})", buffer.id(), offset, index_type));
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.check_in_render_pass("draw")?;
        self.shared.record(format!("draw({}, {})", vertex_count, first_vertex));
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.check_in_render_pass("draw_indexed")?;
        self.shared.record(format!("draw_indexed({}, {}, {})", index_count, first_index, vertex_offset));
        Ok(())
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

/// Scripted results returned by mock swapchains before they fall back to
/// cycling through their images
#[derive(Default)]
pub struct MockSwapchainScript {
    pub acquire: VecDeque<AcquireOutcome>,
    pub present: VecDeque<PresentOutcome>,
}

pub struct MockSwapchain {
    id: ResourceId,
    width: u32,
    height: u32,
    format: TextureFormat,
    images: Vec<Arc<dyn RenderTarget>>,
    next_image: u32,
    script: Arc<Mutex<MockSwapchainScript>>,
    shared: Arc<MockShared>,
}

impl MockSwapchain {
    /// Handle to the script shared by this swapchain and its replacements
    pub fn script(&self) -> Arc<Mutex<MockSwapchainScript>> {
        self.script.clone()
    }

    fn build(
        shared: Arc<MockShared>,
        script: Arc<Mutex<MockSwapchainScript>>,
        width: u32,
        height: u32,
        format: TextureFormat,
        image_count: u32,
    ) -> Self {
        shared.bump("swapchain.created");
        let images = (0..image_count)
            .map(|_| {
                shared.bump("render_target.created");
                Arc::new(MockRenderTarget {
                    id: shared.ids.allocate(),
                    width,
                    height,
                    format,
                    samples: 1,
                    shared: shared.clone(),
                }) as Arc<dyn RenderTarget>
            })
            .collect();
        Self {
            id: shared.ids.allocate(),
            width,
            height,
            format,
            images,
            next_image: 0,
            script,
            shared,
        }
    }
}

impl Swapchain for MockSwapchain {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn acquire_next_image(&mut self, signal: &dyn Semaphore) -> Result<AcquireOutcome> {
        self.shared.take_failure()?;
        let scripted = self.script.lock().unwrap().acquire.pop_front();
        let outcome = scripted.unwrap_or_else(|| {
            let image_index = self.next_image;
            self.next_image = (self.next_image + 1) % self.images.len() as u32;
            AcquireOutcome::Acquired { image_index, suboptimal: false }
        });
        self.shared.record(format!("acquire({}) -> {:?}", signal.id(), outcome));
        Ok(outcome)
    }

    fn present(&mut self, image_index: u32, wait: &dyn Semaphore) -> Result<PresentOutcome> {
        let outcome = self.script.lock().unwrap().present.pop_front().unwrap_or(PresentOutcome::Presented);
        self.shared.record(format!("present({}, {}) -> {:?}", image_index, wait.id(), outcome));
        Ok(outcome)
    }

    fn recreate(&self, width: u32, height: u32) -> Result<Box<dyn Swapchain>> {
        self.shared.take_failure()?;
        Ok(Box::new(MockSwapchain::build(
            self.shared.clone(),
            self.script.clone(),
            width,
            height,
            self.format,
            self.images.len() as u32,
        )))
    }

    fn render_target(&self, image_index: u32) -> Arc<dyn RenderTarget> {
        self.images[image_index as usize].clone()
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

impl Drop for MockSwapchain {
    fn drop(&mut self) {
        self.shared.bump("swapchain.dropped");
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

/// Mock device that tracks created objects without GPU
pub struct MockGraphicsDevice {
    shared: Arc<MockShared>,
    limits: DeviceLimits,
}

impl MockGraphicsDevice {
    /// Create a new mock device whose fences signal on submit
    pub fn new() -> Self {
        let shared = Arc::new(MockShared::default());
        shared.fences_signal_on_submit.store(true, Ordering::Relaxed);
        Self {
            shared,
            limits: DeviceLimits::default(),
        }
    }

    /// Create a mock device with custom limits
    pub fn with_limits(limits: DeviceLimits) -> Self {
        Self { limits, ..Self::new() }
    }

    /// Shared counter/command state
    pub fn shared(&self) -> Arc<MockShared> {
        self.shared.clone()
    }

    /// Commands recorded so far by every command list
    pub fn commands(&self) -> Vec<String> {
        self.shared.commands.lock().unwrap().clone()
    }

    /// Forget recorded commands
    pub fn clear_commands(&self) {
        self.shared.commands.lock().unwrap().clear();
    }

    /// Counter value, e.g. `count("render_pass.created")`
    pub fn count(&self, counter: &str) -> usize {
        self.shared.count(counter)
    }

    /// Live objects of `kind`, e.g. `live("framebuffer")`
    pub fn live(&self, kind: &str) -> usize {
        self.shared.live(kind)
    }

    /// Make the next fallible creation (or acquire) fail with `err`
    pub fn fail_next(&self, err: Error) {
        *self.shared.fail_next.lock().unwrap() = Some(err);
    }

    /// When false, submitted fences stay unsignalled (simulates a hung GPU)
    pub fn set_fences_signal_on_submit(&self, enabled: bool) {
        self.shared.fences_signal_on_submit.store(enabled, Ordering::Relaxed);
    }

    /// Create a swapchain of `image_count` images
    pub fn create_swapchain(&self, width: u32, height: u32, image_count: u32) -> MockSwapchain {
        MockSwapchain::build(
            self.shared.clone(),
            Arc::new(Mutex::new(MockSwapchainScript::default())),
            width,
            height,
            TextureFormat::B8G8R8A8_SRGB,
            image_count,
        )
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn Texture>> {
        self.shared.take_failure()?;
        self.shared.bump("texture.created");
        Ok(Arc::new(MockTexture {
            id: self.shared.ids.allocate(),
            info: TextureInfo {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                usage: desc.usage,
                samples: desc.samples,
            },
            name: desc.debug_name.clone(),
            shared: self.shared.clone(),
        }))
    }

    fn create_render_target(&self, texture: &Arc<dyn Texture>) -> Result<Arc<dyn RenderTarget>> {
        self.shared.take_failure()?;
        let info = texture.info();
        if info.usage == TextureUsage::Sampled {
            engine_bail!("stellar::mock",
                "create_render_target: incompatible texture usage {:?}", info.usage);
        }
        self.shared.bump("render_target.created");
        Ok(Arc::new(MockRenderTarget {
            id: self.shared.ids.allocate(),
            width: info.width,
            height: info.height,
            format: info.format,
            samples: info.samples,
            shared: self.shared.clone(),
        }))
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        self.shared.take_failure()?;
        self.shared.bump("buffer.created");
        let mut storage = vec![0u8; desc.size as usize];
        let ptr = NonNull::new(storage.as_mut_ptr()).unwrap_or(NonNull::dangling());
        Ok(Arc::new(MockBuffer {
            id: self.shared.ids.allocate(),
            size: desc.size,
            usage: desc.usage,
            storage,
            ptr,
            shared: self.shared.clone(),
        }))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        self.shared.take_failure()?;
        self.shared.bump("render_pass.created");
        Ok(Arc::new(MockRenderPass {
            id: self.shared.ids.allocate(),
            desc: desc.clone(),
            shared: self.shared.clone(),
        }))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>> {
        self.shared.take_failure()?;
        self.shared.bump("framebuffer.created");
        let mut attachments = desc.color_attachments.clone();
        attachments.extend(desc.depth_attachment.clone());
        Ok(Arc::new(MockFramebuffer {
            id: self.shared.ids.allocate(),
            width: desc.width,
            height: desc.height,
            _attachments: attachments,
            shared: self.shared.clone(),
        }))
    }

    fn create_pipeline(&self, desc: &PipelineDesc, _render_pass: &Arc<dyn RenderPass>) -> Result<Arc<dyn Pipeline>> {
        self.shared.take_failure()?;
        self.shared.bump("pipeline.created");
        Ok(Arc::new(MockPipeline {
            id: self.shared.ids.allocate(),
            name: desc.name.clone(),
            set_layouts: desc.set_layouts.clone(),
            shared: self.shared.clone(),
        }))
    }

    fn create_descriptor_pool(&self, desc: &DescriptorPoolDesc) -> Result<Box<dyn DescriptorPool>> {
        self.shared.take_failure()?;
        self.shared.bump("descriptor_pool.created");
        Ok(Box::new(MockDescriptorPool {
            allocated: 0,
            max_sets: desc.max_sets,
            shared: self.shared.clone(),
        }))
    }

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>> {
        self.shared.take_failure()?;
        self.shared.bump("fence.created");
        Ok(Box::new(MockFence {
            id: self.shared.ids.allocate(),
            signaled: AtomicBool::new(signaled),
            shared: self.shared.clone(),
        }))
    }

    fn create_semaphore(&self) -> Result<Box<dyn Semaphore>> {
        self.shared.take_failure()?;
        self.shared.bump("semaphore.created");
        Ok(Box::new(MockSemaphore {
            id: self.shared.ids.allocate(),
        }))
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        self.shared.take_failure()?;
        self.shared.bump("command_list.created");
        Ok(Box::new(MockCommandList {
            recording: false,
            in_render_pass: false,
            shared: self.shared.clone(),
        }))
    }

    fn submit(&self, _commands: &dyn CommandList, info: &SubmitInfo<'_>) -> Result<()> {
        self.shared.take_failure()?;
        self.shared.bump("submit");
        let wait = info.wait_semaphore.map(|s| s.id().to_string()).unwrap_or_default();
        let signal = info.signal_semaphore.map(|s| s.id().to_string()).unwrap_or_default();
        self.shared.record(format!("submit(wait {}, signal {})", wait, signal));
        if let Some(fence) = info.fence {
            if self.shared.fences_signal_on_submit.load(Ordering::Relaxed) {
                // SAFETY: fences passed to the mock device were created by it
                let fence = unsafe { &*(fence as *const dyn Fence as *const MockFence) };
                fence.signaled.store(true, Ordering::Release);
            }
        }
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        self.shared.record("wait_idle".to_string());
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;

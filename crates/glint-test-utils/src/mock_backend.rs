//! Recording mock of [`RenderBackend`] for tests.
//!
//! Every call is recorded for later assertions, buffer writes land in
//! CPU-side byte vectors, and completion callbacks are queued until the test
//! fires them (or, with auto-completion enabled, until the next `poll`).

use std::collections::VecDeque;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::gpu_types::*;
use crate::render_backend::*;

/// One recorded backend or encoder call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateBuffer {
        id: ResourceId,
        size: u64,
        kind: BufferKind,
    },
    WriteBuffer {
        buffer: ResourceId,
        offset: u64,
        len: usize,
    },
    CreatePipeline {
        id: ResourceId,
        label: String,
        program: String,
    },
    CreateSampler {
        id: ResourceId,
    },
    CreateTexture {
        id: ResourceId,
        width: u32,
        height: u32,
    },
    BeginFrame {
        frame: u64,
    },
    BindPipeline {
        pipeline: ResourceId,
    },
    BindVertexBuffer {
        slot: u32,
        buffer: ResourceId,
        offset: u64,
    },
    BindTexture {
        texture: ResourceId,
        sampler: ResourceId,
    },
    Draw {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
    EndEncoding,
    Submit {
        frame: u64,
    },
    Resize {
        width: u32,
        height: u32,
    },
}

/// Mock GPU backend.
///
/// ```rust
/// use glint_test_utils::{BufferDesc, BufferKind, MockBackend, RenderBackend};
///
/// let mock = MockBackend::new();
/// let buffer = mock
///     .create_buffer(&BufferDesc { label: "instances", size: 256, kind: BufferKind::Vertex })
///     .unwrap();
/// mock.write_buffer(&buffer, 16, &[1, 2, 3]);
///
/// assert!(buffer.is_mock());
/// assert_eq!(&mock.buffer_contents(&buffer)[16..19], &[1, 2, 3]);
/// ```
pub struct MockBackend {
    ids: ResourceIds,
    calls: Mutex<Vec<BackendCall>>,
    buffers: Mutex<AHashMap<ResourceId, Vec<u8>>>,
    programs: Option<Vec<String>>,
    pending: Mutex<VecDeque<CompletionCallback>>,
    auto_complete: AtomicBool,
    fail_next_frame: AtomicBool,
    frames: AtomicU64,
    polls: AtomicUsize,
}

impl MockBackend {
    /// Accepts any shader program name. Completions must be fired manually.
    pub fn new() -> Self {
        Self {
            ids: ResourceIds::new(),
            calls: Mutex::new(Vec::new()),
            buffers: Mutex::new(AHashMap::new()),
            programs: None,
            pending: Mutex::new(VecDeque::new()),
            auto_complete: AtomicBool::new(false),
            fail_next_frame: AtomicBool::new(false),
            frames: AtomicU64::new(0),
            polls: AtomicUsize::new(0),
        }
    }

    /// Only the given shader programs exist; pipelines naming anything else fail.
    pub fn with_programs(programs: &[&str]) -> Self {
        Self {
            programs: Some(programs.iter().map(|p| p.to_string()).collect()),
            ..Self::new()
        }
    }

    /// Fire pending completions on every `poll`, like an idle GPU would.
    pub fn auto_completing() -> Self {
        let mock = Self::new();
        mock.set_auto_complete(true);
        mock
    }

    pub fn set_auto_complete(&self, enabled: bool) {
        self.auto_complete.store(enabled, Ordering::SeqCst);
    }

    /// Make the next `begin_frame` fail with a surface error.
    pub fn fail_next_frame(&self) {
        tracing::trace!("Mock backend will fail the next frame");
        self.fail_next_frame.store(true, Ordering::SeqCst);
    }

    /// Fire the oldest pending completion callback.
    pub fn complete_next(&self) -> bool {
        let callback = self.pending.lock().pop_front();
        match callback {
            Some(callback) => {
                tracing::trace!("Mock backend completing oldest submission");
                callback();
                true
            }
            None => false,
        }
    }

    /// Fire every pending completion callback, oldest first.
    pub fn complete_all(&self) -> usize {
        let drained: Vec<_> = self.pending.lock().drain(..).collect();
        let count = drained.len();
        tracing::trace!("Mock backend completing {} submissions", count);
        for callback in drained {
            callback();
        }
        count
    }

    pub fn pending_completions(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn count_buffer_creates(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::CreateBuffer { .. }))
    }

    pub fn count_buffer_writes(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::WriteBuffer { .. }))
    }

    pub fn count_pipeline_creates(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::CreatePipeline { .. }))
    }

    pub fn count_draws(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::Draw { .. }))
    }

    pub fn count_submits(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::Submit { .. }))
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Current bytes of a mock buffer.
    ///
    /// # Panics
    /// Panics if the buffer was not created by this backend.
    pub fn buffer_contents(&self, buffer: &GpuBuffer) -> Vec<u8> {
        self.buffers
            .lock()
            .get(&buffer.id())
            .cloned()
            .expect("buffer was not created by this MockBackend")
    }

    fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().push(call);
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for MockBackend {
    fn create_buffer(&self, desc: &BufferDesc) -> BackendResult<GpuBuffer> {
        let id = self.ids.next();
        self.buffers.lock().insert(id, vec![0; desc.size as usize]);
        self.record(BackendCall::CreateBuffer {
            id,
            size: desc.size,
            kind: desc.kind,
        });
        Ok(GpuBuffer::mock(id, desc.size))
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        if let Some(bytes) = self.buffers.lock().get_mut(&buffer.id()) {
            let start = offset as usize;
            let end = start + data.len();
            assert!(
                end <= bytes.len(),
                "write of {} bytes at {} overflows buffer of {} bytes",
                data.len(),
                offset,
                bytes.len()
            );
            bytes[start..end].copy_from_slice(data);
        }
        self.record(BackendCall::WriteBuffer {
            buffer: buffer.id(),
            offset,
            len: data.len(),
        });
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> BackendResult<GpuPipeline> {
        if let Some(programs) = &self.programs
            && !programs.iter().any(|p| p == desc.program)
        {
            return Err(BackendError::UnknownProgram(desc.program.to_string()));
        }
        let id = self.ids.next();
        self.record(BackendCall::CreatePipeline {
            id,
            label: desc.label.to_string(),
            program: desc.program.to_string(),
        });
        Ok(GpuPipeline::mock(id, desc.textured))
    }

    fn create_sampler(&self, _desc: &SamplerDesc) -> GpuSampler {
        let id = self.ids.next();
        self.record(BackendCall::CreateSampler { id });
        GpuSampler::mock(id)
    }

    fn create_texture(&self, _label: &str, image: &ImageData) -> BackendResult<GpuTexture> {
        let id = self.ids.next();
        self.record(BackendCall::CreateTexture {
            id,
            width: image.width,
            height: image.height,
        });
        Ok(GpuTexture::mock(id, image.width, image.height))
    }

    fn begin_frame(&self, _params: &FrameParams) -> BackendResult<Box<dyn FrameEncoder + '_>> {
        if self.fail_next_frame.swap(false, Ordering::SeqCst) {
            return Err(BackendError::Surface("mock surface lost".to_string()));
        }
        let frame = self.frames.fetch_add(1, Ordering::SeqCst);
        self.record(BackendCall::BeginFrame { frame });
        Ok(Box::new(MockFrameEncoder {
            backend: self,
            frame,
            ended: false,
        }))
    }

    fn poll(&self) {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self.auto_complete.load(Ordering::SeqCst) {
            self.complete_all();
        }
    }

    fn resize(&self, width: u32, height: u32) {
        self.record(BackendCall::Resize { width, height });
    }
}

struct MockFrameEncoder<'a> {
    backend: &'a MockBackend,
    frame: u64,
    ended: bool,
}

impl MockFrameEncoder<'_> {
    fn record(&self, call: BackendCall) {
        debug_assert!(!self.ended, "command recorded after end()");
        self.backend.record(call);
    }
}

impl FrameEncoder for MockFrameEncoder<'_> {
    fn bind_pipeline(&mut self, pipeline: &GpuPipeline) {
        self.record(BackendCall::BindPipeline {
            pipeline: pipeline.id(),
        });
    }

    fn bind_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer, offset: u64) {
        self.record(BackendCall::BindVertexBuffer {
            slot,
            buffer: buffer.id(),
            offset,
        });
    }

    fn bind_texture(&mut self, texture: &GpuTexture, sampler: &GpuSampler) {
        self.record(BackendCall::BindTexture {
            texture: texture.id(),
            sampler: sampler.id(),
        });
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.record(BackendCall::Draw {
            vertices,
            instances,
        });
    }

    fn end(&mut self) {
        self.record(BackendCall::EndEncoding);
        self.ended = true;
    }

    fn submit(self: Box<Self>, on_complete: CompletionCallback) -> BackendResult<()> {
        self.backend.record(BackendCall::Submit { frame: self.frame });
        self.backend.pending.lock().push_back(on_complete);
        Ok(())
    }
}

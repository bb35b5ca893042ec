//! Trait abstracting the GPU backend the renderer drives.
//!
//! The renderer only needs a narrow slice of a graphics API: create buffers,
//! pipelines, samplers and textures at startup, then per frame open an
//! encoder, bind resources, issue draws and submit with a completion
//! callback. [`RenderBackend`] and [`FrameEncoder`] capture exactly that so a
//! recording mock can stand in for the GPU in tests.

use std::fmt;
use std::ops::Range;

use crate::gpu_types::*;

/// Errors raised by a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// A pipeline referenced a shader program the backend does not know.
    UnknownProgram(String),
    /// Resource creation failed.
    ResourceCreation { label: String, reason: String },
    /// Pixel data does not match the declared image dimensions.
    InvalidImage {
        width: u32,
        height: u32,
        len: usize,
    },
    /// The presentation surface could not provide a frame.
    Surface(String),
    /// No suitable adapter or device.
    NoDevice(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProgram(name) => write!(f, "unknown shader program '{}'", name),
            Self::ResourceCreation { label, reason } => {
                write!(f, "failed to create '{}': {}", label, reason)
            }
            Self::InvalidImage { width, height, len } => write!(
                f,
                "image data of {} bytes does not match {}x{} RGBA8",
                len, width, height
            ),
            Self::Surface(reason) => write!(f, "surface error: {}", reason),
            Self::NoDevice(reason) => write!(f, "no usable GPU device: {}", reason),
        }
    }
}

impl std::error::Error for BackendError {}

pub type BackendResult<T> = Result<T, BackendError>;

/// What a buffer is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Vertex or per-instance data, written from the CPU every frame.
    Vertex,
    /// Small uniform block.
    Uniform,
}

#[derive(Debug, Clone)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub size: u64,
    pub kind: BufferKind,
}

/// Layout of one vertex buffer slot.
#[derive(Debug, Clone)]
pub struct VertexBufferDesc {
    pub stride: u64,
    pub step_mode: wgpu::VertexStepMode,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

/// Render pipeline request. `program` names a shader program known to the
/// backend; its vertex and fragment entry points are `vs_main` and `fs_main`.
#[derive(Debug, Clone)]
pub struct PipelineDesc<'a> {
    pub label: &'a str,
    pub program: &'a str,
    pub topology: wgpu::PrimitiveTopology,
    pub blend: wgpu::BlendState,
    pub vertex_buffers: Vec<VertexBufferDesc>,
    /// Whether the program samples a texture (bind group 1).
    pub textured: bool,
}

#[derive(Debug, Clone)]
pub struct SamplerDesc<'a> {
    pub label: &'a str,
    pub min_filter: wgpu::FilterMode,
    pub mag_filter: wgpu::FilterMode,
}

/// Decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageData {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> BackendResult<Self> {
        if width == 0 || height == 0 || pixels.len() != width as usize * height as usize * 4 {
            return Err(BackendError::InvalidImage {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Single-color image.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }
}

/// Per-frame values shared by every draw of the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    /// Column-major pixel-space projection.
    pub projection: [[f32; 4]; 4],
    /// SDF distance range of the font atlas, in atlas pixels.
    pub distance_range: f32,
    /// Width and height of the font atlas texture.
    pub font_atlas_size: [f32; 2],
    pub clear_color: [f32; 4],
}

/// Callback fired once the GPU has finished consuming a submitted frame.
///
/// Runs on a backend-owned thread; it must only signal.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// GPU resource creation and frame submission.
///
/// Object safe; the renderer holds it as `Arc<dyn RenderBackend>`.
pub trait RenderBackend: Send + Sync {
    fn create_buffer(&self, desc: &BufferDesc) -> BackendResult<GpuBuffer>;

    /// Copy `data` into `buffer` at `offset`. Becomes visible to work
    /// submitted after this call.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]);

    fn create_pipeline(&self, desc: &PipelineDesc) -> BackendResult<GpuPipeline>;

    fn create_sampler(&self, desc: &SamplerDesc) -> GpuSampler;

    fn create_texture(&self, label: &str, image: &ImageData) -> BackendResult<GpuTexture>;

    /// Start recording a frame; the returned encoder clears the target.
    fn begin_frame(&self, params: &FrameParams) -> BackendResult<Box<dyn FrameEncoder + '_>>;

    /// Give the backend a chance to run completion callbacks. Never blocks.
    fn poll(&self);

    /// The drawable changed size.
    fn resize(&self, width: u32, height: u32);
}

/// Records the draws of one frame.
pub trait FrameEncoder {
    fn bind_pipeline(&mut self, pipeline: &GpuPipeline);

    /// Bind `buffer` starting at byte `offset` to vertex buffer `slot`.
    fn bind_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer, offset: u64);

    fn bind_texture(&mut self, texture: &GpuTexture, sampler: &GpuSampler);

    /// Draw with the bound pipeline's topology.
    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>);

    /// Finish recording. No more commands may follow.
    fn end(&mut self);

    /// Submit, present, and register `on_complete`. On error the callback is
    /// dropped without running.
    fn submit(self: Box<Self>, on_complete: CompletionCallback) -> BackendResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_data_rejects_wrong_length() {
        let err = ImageData::new(2, 2, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            BackendError::InvalidImage {
                width: 2,
                height: 2,
                len: 15
            }
        );
        assert!(ImageData::new(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn test_solid_image_repeats_color() {
        let image = ImageData::solid(3, 1, [1, 2, 3, 4]);
        assert_eq!(image.pixels, vec![1, 2, 3, 4, 1, 2, 3, 4, 1, 2, 3, 4]);
    }
}

//! GPU resource handles that can be real or mock.
//!
//! Each handle carries a backend-assigned [`ResourceId`] so resources can be
//! compared and used as cache keys without touching the wrapped wgpu object.
//! Handles are cheap to clone (wgpu resources are reference counted).

use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a resource created through a [`RenderBackend`](crate::RenderBackend).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u64);

/// Monotonic [`ResourceId`] source shared by backend implementations.
#[derive(Debug)]
pub struct ResourceIds {
    next: AtomicU64,
}

impl ResourceIds {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next(&self) -> ResourceId {
        ResourceId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ResourceIds {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrapper around a GPU buffer.
#[derive(Clone, Debug)]
pub struct GpuBuffer {
    id: ResourceId,
    size: u64,
    inner: GpuBufferInner,
}

#[derive(Clone, Debug)]
enum GpuBufferInner {
    Real(wgpu::Buffer),
    #[cfg(feature = "mock")]
    Mock,
}

impl GpuBuffer {
    pub fn from_wgpu(id: ResourceId, buffer: wgpu::Buffer) -> Self {
        Self {
            id,
            size: buffer.size(),
            inner: GpuBufferInner::Real(buffer),
        }
    }

    #[cfg(feature = "mock")]
    pub fn mock(id: ResourceId, size: u64) -> Self {
        Self {
            id,
            size,
            inner: GpuBufferInner::Mock,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// # Panics
    /// Panics if this is a mock buffer.
    pub fn as_wgpu(&self) -> &wgpu::Buffer {
        match &self.inner {
            GpuBufferInner::Real(buffer) => buffer,
            #[cfg(feature = "mock")]
            GpuBufferInner::Mock => {
                panic!("Attempted to get wgpu::Buffer from mock buffer - this is a test-only buffer")
            }
        }
    }

    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuBufferInner::Mock)
    }
}

/// Wrapper around a sampled 2D texture and its default view.
#[derive(Clone, Debug)]
pub struct GpuTexture {
    id: ResourceId,
    width: u32,
    height: u32,
    inner: GpuTextureInner,
}

#[derive(Clone, Debug)]
enum GpuTextureInner {
    Real {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
    },
    #[cfg(feature = "mock")]
    Mock,
}

impl GpuTexture {
    pub fn from_wgpu(id: ResourceId, texture: wgpu::Texture) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            id,
            width: texture.width(),
            height: texture.height(),
            inner: GpuTextureInner::Real { texture, view },
        }
    }

    #[cfg(feature = "mock")]
    pub fn mock(id: ResourceId, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            inner: GpuTextureInner::Mock,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// # Panics
    /// Panics if this is a mock texture.
    pub fn as_wgpu(&self) -> &wgpu::Texture {
        match &self.inner {
            GpuTextureInner::Real { texture, .. } => texture,
            #[cfg(feature = "mock")]
            GpuTextureInner::Mock => panic!("Attempted to get wgpu::Texture from mock texture"),
        }
    }

    /// # Panics
    /// Panics if this is a mock texture.
    pub fn view(&self) -> &wgpu::TextureView {
        match &self.inner {
            GpuTextureInner::Real { view, .. } => view,
            #[cfg(feature = "mock")]
            GpuTextureInner::Mock => panic!("Attempted to get wgpu::TextureView from mock texture"),
        }
    }

    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuTextureInner::Mock)
    }
}

/// Wrapper around a texture sampler.
#[derive(Clone, Debug)]
pub struct GpuSampler {
    id: ResourceId,
    inner: GpuSamplerInner,
}

#[derive(Clone, Debug)]
enum GpuSamplerInner {
    Real(wgpu::Sampler),
    #[cfg(feature = "mock")]
    Mock,
}

impl GpuSampler {
    pub fn from_wgpu(id: ResourceId, sampler: wgpu::Sampler) -> Self {
        Self {
            id,
            inner: GpuSamplerInner::Real(sampler),
        }
    }

    #[cfg(feature = "mock")]
    pub fn mock(id: ResourceId) -> Self {
        Self {
            id,
            inner: GpuSamplerInner::Mock,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// # Panics
    /// Panics if this is a mock sampler.
    pub fn as_wgpu(&self) -> &wgpu::Sampler {
        match &self.inner {
            GpuSamplerInner::Real(sampler) => sampler,
            #[cfg(feature = "mock")]
            GpuSamplerInner::Mock => panic!("Attempted to get wgpu::Sampler from mock sampler"),
        }
    }
}

/// Wrapper around a render pipeline.
///
/// `textured` records whether the pipeline expects a texture/sampler binding,
/// which the backend needs when building bind groups.
#[derive(Clone, Debug)]
pub struct GpuPipeline {
    id: ResourceId,
    textured: bool,
    inner: GpuPipelineInner,
}

#[derive(Clone, Debug)]
enum GpuPipelineInner {
    Real(wgpu::RenderPipeline),
    #[cfg(feature = "mock")]
    Mock,
}

impl GpuPipeline {
    pub fn from_wgpu(id: ResourceId, textured: bool, pipeline: wgpu::RenderPipeline) -> Self {
        Self {
            id,
            textured,
            inner: GpuPipelineInner::Real(pipeline),
        }
    }

    #[cfg(feature = "mock")]
    pub fn mock(id: ResourceId, textured: bool) -> Self {
        Self {
            id,
            textured,
            inner: GpuPipelineInner::Mock,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn is_textured(&self) -> bool {
        self.textured
    }

    /// # Panics
    /// Panics if this is a mock pipeline.
    pub fn as_wgpu(&self) -> &wgpu::RenderPipeline {
        match &self.inner {
            GpuPipelineInner::Real(pipeline) => pipeline,
            #[cfg(feature = "mock")]
            GpuPipelineInner::Mock => {
                panic!("Attempted to get wgpu::RenderPipeline from mock pipeline")
            }
        }
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;

    #[test]
    fn test_resource_ids_are_unique() {
        let ids = ResourceIds::new();
        let a = ids.next();
        let b = ids.next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_mock_handles_report_metadata() {
        let buffer = GpuBuffer::mock(ResourceId(3), 512);
        assert!(buffer.is_mock());
        assert_eq!(buffer.size(), 512);
        assert_eq!(buffer.id(), ResourceId(3));

        let texture = GpuTexture::mock(ResourceId(4), 64, 32);
        assert!(texture.is_mock());
        assert_eq!((texture.width(), texture.height()), (64, 32));
    }

    #[test]
    #[should_panic(expected = "mock buffer")]
    fn test_mock_buffer_as_wgpu_panics() {
        let buffer = GpuBuffer::mock(ResourceId(1), 16);
        let _ = buffer.as_wgpu();
    }
}

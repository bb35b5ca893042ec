//! The three render pipelines and their shared resources.

use glint_core::profiling::profile_function;
use glint_test_utils::{
    BackendResult, BufferDesc, BufferKind, GpuBuffer, GpuPipeline, GpuSampler, PipelineDesc,
    RenderBackend, SamplerDesc,
};

use crate::config::PipelineKind;
use crate::instance::{AtlasInstance, PrimitiveInstance, QuadVertex, text_vertex_layout};
use crate::shaders::{ATLAS_PROGRAM, PRIMITIVE_PROGRAM, TEXT_PROGRAM};

/// Pipelines, the shared unit quad and the samplers, created once at startup.
pub struct RenderPipelines {
    pipelines: [GpuPipeline; PipelineKind::COUNT],
    quad: GpuBuffer,
    atlas_sampler: GpuSampler,
    text_sampler: GpuSampler,
}

impl RenderPipelines {
    pub fn new(backend: &dyn RenderBackend) -> BackendResult<Self> {
        profile_function!();

        let atlas = backend.create_pipeline(&PipelineDesc {
            label: "Atlas Pipeline",
            program: ATLAS_PROGRAM,
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            blend: wgpu::BlendState::ALPHA_BLENDING,
            vertex_buffers: vec![QuadVertex::layout(), AtlasInstance::layout()],
            textured: true,
        })?;

        let primitive = backend.create_pipeline(&PipelineDesc {
            label: "Primitive Pipeline",
            program: PRIMITIVE_PROGRAM,
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            blend: wgpu::BlendState::ALPHA_BLENDING,
            vertex_buffers: vec![QuadVertex::layout(), PrimitiveInstance::layout()],
            textured: false,
        })?;

        let text = backend.create_pipeline(&PipelineDesc {
            label: "Text Pipeline",
            program: TEXT_PROGRAM,
            topology: wgpu::PrimitiveTopology::TriangleList,
            blend: wgpu::BlendState::ALPHA_BLENDING,
            vertex_buffers: vec![text_vertex_layout()],
            textured: true,
        })?;

        let quad_bytes: &[u8] = bytemuck::cast_slice(&QuadVertex::UNIT_QUAD);
        let quad = backend.create_buffer(&BufferDesc {
            label: "Unit Quad",
            size: quad_bytes.len() as u64,
            kind: BufferKind::Vertex,
        })?;
        backend.write_buffer(&quad, 0, quad_bytes);

        // Pixel art stays crisp when magnified.
        let atlas_sampler = backend.create_sampler(&SamplerDesc {
            label: "Atlas Sampler",
            min_filter: wgpu::FilterMode::Linear,
            mag_filter: wgpu::FilterMode::Nearest,
        });
        // Distance fields need bilinear reconstruction.
        let text_sampler = backend.create_sampler(&SamplerDesc {
            label: "Text Sampler",
            min_filter: wgpu::FilterMode::Linear,
            mag_filter: wgpu::FilterMode::Linear,
        });

        tracing::debug!("Created atlas, primitive and text pipelines");

        Ok(Self {
            pipelines: [atlas, primitive, text],
            quad,
            atlas_sampler,
            text_sampler,
        })
    }

    pub fn get(&self, kind: PipelineKind) -> &GpuPipeline {
        &self.pipelines[kind.index()]
    }

    /// Unit quad shared by the instanced pipelines.
    pub fn quad(&self) -> &GpuBuffer {
        &self.quad
    }

    pub fn atlas_sampler(&self) -> &GpuSampler {
        &self.atlas_sampler
    }

    pub fn text_sampler(&self) -> &GpuSampler {
        &self.text_sampler
    }
}

//! [`RenderBackend`] on top of wgpu.
//!
//! Every program reads the frame globals from bind group 0; textured
//! programs additionally take a texture and sampler in bind group 1. Those
//! texture bind groups are created on first use and cached per
//! texture/sampler pair.

use std::ops::Range;

use ahash::AHashMap;
use bytemuck::{Pod, Zeroable};
use glint_core::profiling::profile_function;
use glint_test_utils::{
    BackendError, BackendResult, BufferDesc, BufferKind, CompletionCallback, FrameEncoder,
    FrameParams, GpuBuffer, GpuPipeline, GpuSampler, GpuTexture, ImageData, PipelineDesc,
    RenderBackend, ResourceId, ResourceIds, SamplerDesc,
};
use parking_lot::Mutex;

use crate::shaders::{GLOBALS_SIZE, program_source};

/// Uniform block matching `Globals` in the WGSL programs.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Globals {
    projection: [[f32; 4]; 4],
    distance_range: f32,
    atlas_width: f32,
    atlas_height: f32,
    _pad: f32,
}

static_assertions::const_assert_eq!(std::mem::size_of::<Globals>() as u64, GLOBALS_SIZE);

enum RenderTarget {
    Surface {
        surface: wgpu::Surface<'static>,
        config: Mutex<wgpu::SurfaceConfiguration>,
    },
    Offscreen {
        texture: Mutex<wgpu::Texture>,
    },
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    ids: ResourceIds,
    target: RenderTarget,
    format: wgpu::TextureFormat,
    texture_layout: wgpu::BindGroupLayout,
    globals_layout: wgpu::BindGroupLayout,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    texture_bind_groups: Mutex<AHashMap<(ResourceId, ResourceId), wgpu::BindGroup>>,
}

impl WgpuBackend {
    /// Backend rendering into an offscreen texture, for tests and tools.
    pub fn headless(width: u32, height: u32) -> BackendResult<Self> {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions::default())
                .await
                .map_err(|e| BackendError::NoDevice(e.to_string()))?;
            let (device, queue) = adapter
                .request_device(&wgpu::DeviceDescriptor {
                    label: Some("Glint Device"),
                    ..Default::default()
                })
                .await
                .map_err(|e| BackendError::NoDevice(e.to_string()))?;

            let format = wgpu::TextureFormat::Rgba8Unorm;
            let texture = offscreen_texture(&device, format, width, height);
            Ok(Self::with_target(
                device,
                queue,
                RenderTarget::Offscreen {
                    texture: Mutex::new(texture),
                },
                format,
            ))
        })
    }

    /// Backend presenting to `surface`.
    ///
    /// The surface is configured with a non-sRGB format so colors reach the
    /// drawable unconverted.
    pub fn from_surface(
        adapter: &wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> BackendResult<Self> {
        let mut config = surface
            .get_default_config(adapter, width.max(1), height.max(1))
            .ok_or_else(|| {
                BackendError::Surface("surface is not supported by the adapter".to_string())
            })?;
        config.format = config.format.remove_srgb_suffix();
        surface.configure(&device, &config);

        tracing::info!(
            "Configured surface: {}x{} {:?}",
            config.width,
            config.height,
            config.format
        );

        let format = config.format;
        Ok(Self::with_target(
            device,
            queue,
            RenderTarget::Surface {
                surface,
                config: Mutex::new(config),
            },
            format,
        ))
    }

    fn with_target(
        device: wgpu::Device,
        queue: wgpu::Queue,
        target: RenderTarget,
        format: wgpu::TextureFormat,
    ) -> Self {
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(GLOBALS_SIZE),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globals Buffer"),
            size: GLOBALS_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals Bind Group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        Self {
            device,
            queue,
            ids: ResourceIds::new(),
            target,
            format,
            texture_layout,
            globals_layout,
            globals_buffer,
            globals_bind_group,
            texture_bind_groups: Mutex::new(AHashMap::new()),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Color format of the render target.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    fn texture_bind_group(&self, texture: &GpuTexture, sampler: &GpuSampler) -> wgpu::BindGroup {
        let mut cache = self.texture_bind_groups.lock();
        cache
            .entry((texture.id(), sampler.id()))
            .or_insert_with(|| {
                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Texture Bind Group"),
                    layout: &self.texture_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(texture.view()),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(sampler.as_wgpu()),
                        },
                    ],
                })
            })
            .clone()
    }

    fn acquire_target(&self) -> BackendResult<(wgpu::TextureView, Option<wgpu::SurfaceTexture>)> {
        match &self.target {
            RenderTarget::Surface { surface, config } => {
                let frame = match surface.get_current_texture() {
                    Ok(frame) => frame,
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        tracing::debug!("Surface lost or outdated, reconfiguring");
                        surface.configure(&self.device, &config.lock());
                        surface
                            .get_current_texture()
                            .map_err(|e| BackendError::Surface(e.to_string()))?
                    }
                    Err(e) => return Err(BackendError::Surface(e.to_string())),
                };
                let view = frame
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok((view, Some(frame)))
            }
            RenderTarget::Offscreen { texture } => {
                let view = texture
                    .lock()
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok((view, None))
            }
        }
    }
}

fn offscreen_texture(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Target"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

impl RenderBackend for WgpuBackend {
    fn create_buffer(&self, desc: &BufferDesc) -> BackendResult<GpuBuffer> {
        let usage = match desc.kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Uniform => wgpu::BufferUsages::UNIFORM,
        } | wgpu::BufferUsages::COPY_DST;

        let max = self.device.limits().max_buffer_size;
        if desc.size > max {
            return Err(BackendError::ResourceCreation {
                label: desc.label.to_string(),
                reason: format!("{} bytes exceeds the device limit of {}", desc.size, max),
            });
        }

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: desc.size,
            usage,
            mapped_at_creation: false,
        });
        Ok(GpuBuffer::from_wgpu(self.ids.next(), buffer))
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer.as_wgpu(), offset, data);
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> BackendResult<GpuPipeline> {
        profile_function!();
        let source = program_source(desc.program)
            .ok_or_else(|| BackendError::UnknownProgram(desc.program.to_string()))?;

        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(desc.label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = if desc.textured {
            vec![&self.globals_layout, &self.texture_layout]
        } else {
            vec![&self.globals_layout]
        };
        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.label),
                bind_group_layouts: &bind_group_layouts,
                push_constant_ranges: &[],
            });

        let buffers: Vec<wgpu::VertexBufferLayout> = desc
            .vertex_buffers
            .iter()
            .map(|vb| wgpu::VertexBufferLayout {
                array_stride: vb.stride,
                step_mode: vb.step_mode,
                attributes: &vb.attributes,
            })
            .collect();

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.format,
                        blend: Some(desc.blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: desc.topology,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        tracing::debug!("Created pipeline '{}' ({})", desc.label, desc.program);
        Ok(GpuPipeline::from_wgpu(self.ids.next(), desc.textured, pipeline))
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> GpuSampler {
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(desc.label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: desc.mag_filter,
            min_filter: desc.min_filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        GpuSampler::from_wgpu(self.ids.next(), sampler)
    }

    fn create_texture(&self, label: &str, image: &ImageData) -> BackendResult<GpuTexture> {
        let expected = image.width as usize * image.height as usize * 4;
        if image.width == 0 || image.height == 0 || image.pixels.len() != expected {
            return Err(BackendError::InvalidImage {
                width: image.width,
                height: image.height,
                len: image.pixels.len(),
            });
        }

        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.width * 4),
                rows_per_image: Some(image.height),
            },
            size,
        );

        tracing::debug!("Uploaded texture '{}' ({}x{})", label, image.width, image.height);
        Ok(GpuTexture::from_wgpu(self.ids.next(), texture))
    }

    fn begin_frame(&self, params: &FrameParams) -> BackendResult<Box<dyn FrameEncoder + '_>> {
        profile_function!();
        let globals = Globals {
            projection: params.projection,
            distance_range: params.distance_range,
            atlas_width: params.font_atlas_size[0],
            atlas_height: params.font_atlas_size[1],
            _pad: 0.0,
        };
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        let (view, surface_texture) = self.acquire_target()?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let [r, g, b, a] = params.clear_color;
        let mut pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            })
            .forget_lifetime();
        pass.set_bind_group(0, &self.globals_bind_group, &[]);

        Ok(Box::new(WgpuFrame {
            backend: self,
            pass: Some(pass),
            encoder: Some(encoder),
            surface_texture,
        }))
    }

    fn poll(&self) {
        let _ = self.device.poll(wgpu::PollType::Poll);
    }

    fn resize(&self, width: u32, height: u32) {
        match &self.target {
            RenderTarget::Surface { surface, config } => {
                let mut config = config.lock();
                config.width = width.max(1);
                config.height = height.max(1);
                surface.configure(&self.device, &config);
            }
            RenderTarget::Offscreen { texture } => {
                *texture.lock() = offscreen_texture(&self.device, self.format, width, height);
            }
        }
    }
}

// Field order matters: the pass must drop before its encoder.
struct WgpuFrame<'a> {
    backend: &'a WgpuBackend,
    pass: Option<wgpu::RenderPass<'static>>,
    encoder: Option<wgpu::CommandEncoder>,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl WgpuFrame<'_> {
    fn pass(&mut self) -> Option<&mut wgpu::RenderPass<'static>> {
        if self.pass.is_none() {
            tracing::warn!("Command recorded after the frame pass ended");
        }
        self.pass.as_mut()
    }
}

impl FrameEncoder for WgpuFrame<'_> {
    fn bind_pipeline(&mut self, pipeline: &GpuPipeline) {
        if let Some(pass) = self.pass() {
            pass.set_pipeline(pipeline.as_wgpu());
        }
    }

    fn bind_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer, offset: u64) {
        if let Some(pass) = self.pass() {
            pass.set_vertex_buffer(slot, buffer.as_wgpu().slice(offset..));
        }
    }

    fn bind_texture(&mut self, texture: &GpuTexture, sampler: &GpuSampler) {
        let group = self.backend.texture_bind_group(texture, sampler);
        if let Some(pass) = self.pass() {
            pass.set_bind_group(1, &group, &[]);
        }
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        if let Some(pass) = self.pass() {
            pass.draw(vertices, instances);
        }
    }

    fn end(&mut self) {
        drop(self.pass.take());
    }

    fn submit(mut self: Box<Self>, on_complete: CompletionCallback) -> BackendResult<()> {
        profile_function!();
        self.end();
        let encoder = self.encoder.take().ok_or_else(|| {
            BackendError::Surface("frame was already submitted".to_string())
        })?;

        self.backend.queue.submit(std::iter::once(encoder.finish()));
        self.backend.queue.on_submitted_work_done(on_complete);

        if let Some(frame) = self.surface_texture.take() {
            frame.present();
        }
        Ok(())
    }
}

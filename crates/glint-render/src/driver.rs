//! Frame orchestration.
//!
//! [`FrameDriver::run_frame`] walks one frame through
//! `Idle -> Accumulating -> Encoding -> Submitted -> Idle`:
//!
//! 1. acquire a ring slot (blocks while every slot is in flight)
//! 2. reset the canvas and run the caller's draw closure against it
//! 3. upload the staged records into the slot's regions
//! 4. replay the batch list into the backend's frame encoder
//! 5. submit; the completion callback returns the slot to the ring

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use glint_core::math::{Mat4, pixel_space_projection};
use glint_core::profiling::{self, profile_function, profile_scope};
use glint_test_utils::{
    BackendError, FrameEncoder, FrameParams, GpuTexture, ImageData, RenderBackend,
};
use glint_text::{FontAtlasDesc, GlyphTable, TextError};

use crate::assets::{AssetError, AssetSource};
use crate::canvas::{Canvas, DrawError, DrawResult};
use crate::config::{ConfigError, DrawErrorPolicy, PipelineKind, RendererConfig};
use crate::pipelines::RenderPipelines;
use crate::ring::{FrameSlot, RingError, SlotRing};
use crate::sprite_atlas::SpriteAtlas;

/// How long dropping a driver waits for in-flight frames.
const DROP_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    /// The draw closure is filling the canvas.
    Accumulating,
    /// Batches are being replayed into the encoder.
    Encoding,
    /// Handed to the backend; returns to `Idle` once the submit is accepted.
    Submitted,
}

impl fmt::Display for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameState::Idle => "idle",
            FrameState::Accumulating => "accumulating",
            FrameState::Encoding => "encoding",
            FrameState::Submitted => "submitted",
        };
        f.write_str(name)
    }
}

/// Sprite atlas together with its GPU texture.
pub struct SpriteSheet {
    pub atlas: Arc<SpriteAtlas>,
    pub texture: GpuTexture,
}

/// Glyph table together with its MSDF texture.
pub struct FontFace {
    pub glyphs: Arc<GlyphTable>,
    pub texture: GpuTexture,
}

/// Summary of one submitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub slot: usize,
    pub frame: u64,
    pub batches: usize,
    pub draw_calls: usize,
    pub atlas_instances: u32,
    pub primitive_instances: u32,
    pub text_vertices: u32,
    /// Draw calls rejected by the canvas (only non-zero with
    /// [`DrawErrorPolicy::RenderPartial`]).
    pub rejected_draws: u32,
}

#[derive(Debug)]
pub enum FrameError {
    Config(ConfigError),
    Ring(RingError),
    Backend(BackendError),
    /// The draw closure failed and the policy is [`DrawErrorPolicy::Abort`].
    Draw(DrawError),
    Asset(AssetError),
    /// The font atlas description has unusable metrics.
    Font(TextError),
    /// `run_frame` was re-entered or called in the wrong state.
    InvalidState(FrameState),
    ShutDown,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Config(e) => write!(f, "{}", e),
            FrameError::Ring(e) => write!(f, "{}", e),
            FrameError::Backend(e) => write!(f, "{}", e),
            FrameError::Draw(e) => write!(f, "frame aborted: {}", e),
            FrameError::Asset(e) => write!(f, "{}", e),
            FrameError::Font(e) => write!(f, "{}", e),
            FrameError::InvalidState(state) => {
                write!(f, "cannot start a frame while {}", state)
            }
            FrameError::ShutDown => write!(f, "renderer has been shut down"),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameError::Config(e) => Some(e),
            FrameError::Ring(e) => Some(e),
            FrameError::Backend(e) => Some(e),
            FrameError::Draw(e) => Some(e),
            FrameError::Asset(e) => Some(e),
            FrameError::Font(e) => Some(e),
            _ => None,
        }
    }
}

pub type FrameResult<T> = Result<T, FrameError>;

impl From<ConfigError> for FrameError {
    fn from(e: ConfigError) -> Self {
        FrameError::Config(e)
    }
}

impl From<RingError> for FrameError {
    fn from(e: RingError) -> Self {
        FrameError::Ring(e)
    }
}

impl From<BackendError> for FrameError {
    fn from(e: BackendError) -> Self {
        FrameError::Backend(e)
    }
}

impl From<TextError> for FrameError {
    fn from(e: TextError) -> Self {
        FrameError::Font(e)
    }
}

impl From<AssetError> for FrameError {
    fn from(e: AssetError) -> Self {
        FrameError::Asset(e)
    }
}

/// Owns the per-frame loop of one drawable.
///
/// ```
/// use std::sync::Arc;
/// use glint_render::{Color, FrameDriver, RendererConfig};
/// use glint_test_utils::MockBackend;
///
/// let backend = Arc::new(MockBackend::auto_completing());
/// let mut driver = FrameDriver::new(backend.clone(), RendererConfig::default(), 800, 600).unwrap();
///
/// let stats = driver
///     .run_frame(|canvas| {
///         canvas.draw_primitive_circle(0.0, 0.0, 40.0, Color::rgb(1.0, 0.5, 0.0))?;
///         canvas.draw_primitive_rect(-100.0, -100.0, 50.0, 20.0, Color::rgb(0.2, 0.2, 0.2))
///     })
///     .unwrap();
/// assert_eq!(stats.primitive_instances, 2);
/// assert_eq!(stats.draw_calls, 1);
/// driver.shutdown();
/// ```
pub struct FrameDriver {
    backend: Arc<dyn RenderBackend>,
    config: RendererConfig,
    pipelines: RenderPipelines,
    ring: SlotRing,
    canvas: Canvas,
    sprites: Option<SpriteSheet>,
    font: Option<FontFace>,
    state: FrameState,
    size: (u32, u32),
    projection: Mat4,
    shut_down: bool,
}

impl FrameDriver {
    pub fn new(
        backend: Arc<dyn RenderBackend>,
        config: RendererConfig,
        width: u32,
        height: u32,
    ) -> FrameResult<Self> {
        profile_function!();
        config.validate()?;

        let pipelines = RenderPipelines::new(backend.as_ref())?;
        let ring = SlotRing::new(backend.as_ref(), &config)?;
        let canvas = Canvas::new(&config)?;

        tracing::info!(
            "Frame driver ready: {}x{}, {} frames in flight",
            width,
            height,
            config.frames_in_flight
        );

        Ok(Self {
            backend,
            config,
            pipelines,
            ring,
            canvas,
            sprites: None,
            font: None,
            state: FrameState::Idle,
            size: (width, height),
            projection: pixel_space_projection(width as f32, height as f32),
            shut_down: false,
        })
    }

    /// Upload the sprite atlas texture and make its sprites drawable.
    pub fn set_sprite_sheet(
        &mut self,
        atlas: SpriteAtlas,
        image: &ImageData,
    ) -> FrameResult<()> {
        if atlas.size() != (image.width, image.height) {
            tracing::warn!(
                "Sprite atlas expects {:?} pixels but its image is {}x{}",
                atlas.size(),
                image.width,
                image.height
            );
        }
        let texture = self.backend.create_texture("Sprite Atlas", image)?;
        let atlas = Arc::new(atlas);
        self.canvas.set_sprite_atlas(Arc::clone(&atlas));
        self.sprites = Some(SpriteSheet { atlas, texture });
        Ok(())
    }

    /// Upload the MSDF font texture and make text drawable.
    pub fn set_font(&mut self, desc: &FontAtlasDesc, image: &ImageData) -> FrameResult<()> {
        let glyphs = Arc::new(GlyphTable::new(desc)?);
        if (desc.atlas.width, desc.atlas.height) != (image.width, image.height) {
            tracing::warn!(
                "Font atlas expects {}x{} pixels but its image is {}x{}",
                desc.atlas.width,
                desc.atlas.height,
                image.width,
                image.height
            );
        }
        let texture = self.backend.create_texture("Font Atlas", image)?;
        self.canvas.set_font(Arc::clone(&glyphs));
        self.font = Some(FontFace { glyphs, texture });
        Ok(())
    }

    pub fn load_sprite_sheet(
        &mut self,
        source: &dyn AssetSource,
        name: &str,
    ) -> FrameResult<()> {
        let atlas = source.load_sprite_atlas(name)?;
        let image = source.load_image(name)?;
        self.set_sprite_sheet(atlas, &image)
    }

    pub fn load_font(&mut self, source: &dyn AssetSource, name: &str) -> FrameResult<()> {
        let desc = source.load_font_atlas(name)?;
        let image = source.load_image(name)?;
        self.set_font(&desc, &image)
    }

    /// The drawable changed size. Zero-sized (minimized) drawables are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (width, height) == self.size {
            return;
        }
        self.size = (width, height);
        self.projection = pixel_space_projection(width as f32, height as f32);
        self.backend.resize(width, height);
        tracing::info!("Drawable resized to {}x{}", width, height);
    }

    /// Record, encode and submit one frame.
    ///
    /// Blocks while all `frames_in_flight` slots are still on the GPU. A draw
    /// error returned by `draw` aborts the frame or is logged, depending on
    /// [`RendererConfig::draw_error_policy`].
    pub fn run_frame<F>(&mut self, draw: F) -> FrameResult<FrameStats>
    where
        F: FnOnce(&mut Canvas) -> DrawResult,
    {
        profile_function!();
        profiling::new_frame();

        if self.shut_down {
            return Err(FrameError::ShutDown);
        }
        if self.state != FrameState::Idle {
            return Err(FrameError::InvalidState(self.state));
        }

        let slot = self.ring.acquire(self.backend.as_ref())?;
        self.set_state(FrameState::Accumulating);
        self.canvas.begin_frame(self.projection);

        let drawn = {
            profile_scope!("draw");
            draw(&mut self.canvas)
        };
        if let Err(e) = drawn {
            match self.config.draw_error_policy {
                DrawErrorPolicy::Abort => {
                    tracing::warn!("Frame {} aborted: {}", slot.frame, e);
                    self.ring.abandon();
                    self.set_state(FrameState::Idle);
                    return Err(FrameError::Draw(e));
                }
                DrawErrorPolicy::RenderPartial => {
                    tracing::warn!("Frame {} renders partially: {}", slot.frame, e);
                }
            }
        }

        self.set_state(FrameState::Encoding);
        let result = self.encode_and_submit(slot);
        if result.is_err() {
            self.ring.abandon();
        }
        self.set_state(FrameState::Idle);
        result
    }

    fn encode_and_submit(&mut self, slot: FrameSlot) -> FrameResult<FrameStats> {
        profile_function!();
        let backend = Arc::clone(&self.backend);

        for kind in PipelineKind::ALL {
            let bytes = self.canvas.staged_bytes(kind);
            if !bytes.is_empty() {
                backend.write_buffer(
                    self.ring.buffer(kind),
                    self.ring.slot_offset(kind, slot.index),
                    bytes,
                );
            }
        }

        let mut encoder = backend.begin_frame(&self.frame_params())?;
        let mut stats = self.replay(encoder.as_mut(), slot);
        encoder.end();

        self.set_state(FrameState::Submitted);
        let releaser = self.ring.begin_submit()?;
        encoder.submit(releaser.into_callback())?;
        self.ring.finish_submit()?;

        stats.rejected_draws = self.canvas.rejected_draws();
        tracing::debug!(
            "Frame {} submitted from slot {}: {} batches, {} draw calls",
            stats.frame,
            stats.slot,
            stats.batches,
            stats.draw_calls
        );
        Ok(stats)
    }

    fn replay(&self, encoder: &mut dyn FrameEncoder, slot: FrameSlot) -> FrameStats {
        let mut stats = FrameStats {
            slot: slot.index,
            frame: slot.frame,
            ..FrameStats::default()
        };

        for batch in self.canvas.batches() {
            stats.batches += 1;
            let buffer = self.ring.buffer(batch.kind);
            let offset = self.ring.record_offset(batch.kind, slot.index, batch.start);

            match batch.kind {
                PipelineKind::Atlas => {
                    let Some(sheet) = &self.sprites else {
                        tracing::warn!("Skipping atlas batch without a sprite sheet");
                        continue;
                    };
                    encoder.bind_pipeline(self.pipelines.get(batch.kind));
                    encoder.bind_vertex_buffer(0, self.pipelines.quad(), 0);
                    encoder.bind_vertex_buffer(1, buffer, offset);
                    encoder.bind_texture(&sheet.texture, self.pipelines.atlas_sampler());
                    encoder.draw(0..4, 0..batch.count);
                    stats.atlas_instances += batch.count;
                }
                PipelineKind::Primitive => {
                    encoder.bind_pipeline(self.pipelines.get(batch.kind));
                    encoder.bind_vertex_buffer(0, self.pipelines.quad(), 0);
                    encoder.bind_vertex_buffer(1, buffer, offset);
                    encoder.draw(0..4, 0..batch.count);
                    stats.primitive_instances += batch.count;
                }
                PipelineKind::Text => {
                    let Some(font) = &self.font else {
                        tracing::warn!("Skipping text batch without a font");
                        continue;
                    };
                    encoder.bind_pipeline(self.pipelines.get(batch.kind));
                    encoder.bind_vertex_buffer(0, buffer, offset);
                    encoder.bind_texture(&font.texture, self.pipelines.text_sampler());
                    encoder.draw(0..batch.count, 0..1);
                    stats.text_vertices += batch.count;
                }
            }
            stats.draw_calls += 1;
        }
        stats
    }

    fn frame_params(&self) -> FrameParams {
        let (distance_range, font_atlas_size) = match &self.font {
            Some(font) => {
                let (w, h) = font.glyphs.atlas_size();
                (font.glyphs.distance_range(), [w, h])
            }
            None => (0.0, [1.0, 1.0]),
        };
        FrameParams {
            projection: self.projection.to_cols_array_2d(),
            distance_range,
            font_atlas_size,
            clear_color: self.config.clear_color.to_array(),
        }
    }

    fn set_state(&mut self, state: FrameState) {
        tracing::trace!("Frame state {} -> {}", self.state, state);
        self.state = state;
    }

    /// Wait for every in-flight frame to finish. No frames can run afterwards.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.ring.drain(self.backend.as_ref());
        self.shut_down = true;
        tracing::info!("Frame driver shut down");
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// The canvas as left by the last frame.
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn ring(&self) -> &SlotRing {
        &self.ring
    }

    pub fn pipelines(&self) -> &RenderPipelines {
        &self.pipelines
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn sprite_sheet(&self) -> Option<&SpriteSheet> {
        self.sprites.as_ref()
    }

    pub fn font(&self) -> Option<&FontFace> {
        self.font.as_ref()
    }
}

impl Drop for FrameDriver {
    fn drop(&mut self) {
        if self.shut_down {
            return;
        }
        if !self
            .ring
            .drain_timeout(self.backend.as_ref(), DROP_DRAIN_TIMEOUT)
        {
            tracing::error!(
                "Dropped frame driver with {} frames still in flight",
                self.ring.in_flight()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_test_utils::MockBackend;

    fn driver(mock: &Arc<MockBackend>) -> FrameDriver {
        FrameDriver::new(mock.clone(), RendererConfig::default(), 640, 480).unwrap()
    }

    #[test]
    fn test_empty_frame_still_submits() {
        let mock = Arc::new(MockBackend::auto_completing());
        let mut driver = driver(&mock);

        let stats = driver.run_frame(|_| Ok(())).unwrap();
        assert_eq!(stats.batches, 0);
        assert_eq!(mock.count_submits(), 1);
        assert_eq!(mock.count_draws(), 0);
        assert_eq!(driver.state(), FrameState::Idle);
    }

    #[test]
    fn test_resize_updates_projection() {
        let mock = Arc::new(MockBackend::auto_completing());
        let mut driver = driver(&mock);

        driver.resize(200, 100);
        assert_eq!(driver.size(), (200, 100));
        assert_eq!(driver.projection(), pixel_space_projection(200.0, 100.0));

        driver.resize(0, 0);
        assert_eq!(driver.size(), (200, 100));
        assert_eq!(
            mock.calls()
                .iter()
                .filter(|c| matches!(c, glint_test_utils::BackendCall::Resize { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_frames_after_shutdown_are_rejected() {
        let mock = Arc::new(MockBackend::auto_completing());
        let mut driver = driver(&mock);
        driver.shutdown();
        assert!(matches!(
            driver.run_frame(|_| Ok(())),
            Err(FrameError::ShutDown)
        ));
    }
}

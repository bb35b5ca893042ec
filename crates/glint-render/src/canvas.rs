//! Per-frame draw API.
//!
//! A [`Canvas`] is handed to the frame callback. Every draw call reserves
//! records through the [`BatchAccumulator`] and writes them into the
//! pipeline's staging region. Failed draws leave the frame untouched and
//! return a [`DrawError`] so the caller can decide what to do.

use std::fmt;
use std::sync::Arc;

use glint_core::Color;
use glint_core::math::{Mat4, Vec2, affine_2d};
use glint_text::{GlyphTable, TextBounds, TextLayout, TextVertex};

use crate::batch::{BatchAccumulator, BatchDescriptor, BatchError};
use crate::config::{ConfigResult, PipelineKind, RendererConfig};
use crate::instance::{AtlasInstance, PrimitiveInstance, ShapeKind};
use crate::region::{InstanceRegion, RegionError};
use crate::sprite_atlas::SpriteAtlas;

/// Edge softness used by filled and outlined circles, in pixels.
pub const CIRCLE_EDGE_SOFTNESS: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawError {
    UnknownSprite(String),
    NoSpriteAtlas,
    NoFont,
    Batch(BatchError),
    Region(RegionError),
}

impl fmt::Display for DrawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawError::UnknownSprite(name) => write!(f, "unknown sprite '{}'", name),
            DrawError::NoSpriteAtlas => write!(f, "no sprite atlas is loaded"),
            DrawError::NoFont => write!(f, "no font is loaded"),
            DrawError::Batch(e) => write!(f, "{}", e),
            DrawError::Region(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DrawError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DrawError::Batch(e) => Some(e),
            DrawError::Region(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BatchError> for DrawError {
    fn from(e: BatchError) -> Self {
        DrawError::Batch(e)
    }
}

impl From<RegionError> for DrawError {
    fn from(e: RegionError) -> Self {
        DrawError::Region(e)
    }
}

pub type DrawResult<T = ()> = Result<T, DrawError>;

/// Immediate-mode 2D draw target for one frame.
///
/// Coordinates are pixels with the origin at the drawable's center and +Y up.
pub struct Canvas {
    batches: BatchAccumulator,
    sprites: InstanceRegion<AtlasInstance>,
    primitives: InstanceRegion<PrimitiveInstance>,
    text: InstanceRegion<TextVertex>,
    text_scratch: Vec<TextVertex>,
    projection: Mat4,
    sprite_atlas: Option<Arc<SpriteAtlas>>,
    font: Option<Arc<GlyphTable>>,
    rejected_draws: u32,
}

impl Canvas {
    pub fn new(config: &RendererConfig) -> ConfigResult<Self> {
        let capacity = |kind| config.limits(kind).max_count as usize;
        Ok(Self {
            batches: BatchAccumulator::new(config)?,
            sprites: InstanceRegion::new(capacity(PipelineKind::Atlas)),
            primitives: InstanceRegion::new(capacity(PipelineKind::Primitive)),
            text: InstanceRegion::new(capacity(PipelineKind::Text)),
            text_scratch: Vec::new(),
            projection: Mat4::IDENTITY,
            sprite_atlas: None,
            font: None,
            rejected_draws: 0,
        })
    }

    pub fn set_sprite_atlas(&mut self, atlas: Arc<SpriteAtlas>) {
        self.sprite_atlas = Some(atlas);
    }

    pub fn set_font(&mut self, font: Arc<GlyphTable>) {
        self.font = Some(font);
    }

    pub fn font(&self) -> Option<&GlyphTable> {
        self.font.as_deref()
    }

    pub fn sprite_atlas(&self) -> Option<&Arc<SpriteAtlas>> {
        self.sprite_atlas.as_ref()
    }

    /// Reset all per-frame state.
    pub fn begin_frame(&mut self, projection: Mat4) {
        self.batches.reset();
        self.sprites.reset();
        self.primitives.reset();
        self.text.reset();
        self.projection = projection;
        self.rejected_draws = 0;
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Draw the named sprite centered at `(x, y)`, rotated by `rotation`
    /// radians.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_sprite(
        &mut self,
        name: &str,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: impl Into<Color>,
        rotation: f32,
    ) -> DrawResult {
        let result = self.try_draw_sprite(name, x, y, width, height, color.into(), rotation);
        self.track(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn try_draw_sprite(
        &mut self,
        name: &str,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
        rotation: f32,
    ) -> DrawResult {
        let atlas = self.sprite_atlas.as_ref().ok_or(DrawError::NoSpriteAtlas)?;
        let uv = atlas
            .get(name)
            .ok_or_else(|| DrawError::UnknownSprite(name.to_string()))?;

        let transform =
            self.projection * affine_2d(Vec2::new(x, y), rotation, Vec2::new(width, height));
        let index = self.batches.append(PipelineKind::Atlas, 1)?;
        self.sprites
            .write(index as usize, AtlasInstance::new(transform, color, uv))?;
        Ok(())
    }

    pub fn draw_primitive_circle(
        &mut self,
        x: f32,
        y: f32,
        radius: f32,
        color: impl Into<Color>,
    ) -> DrawResult {
        let transform = affine_2d(Vec2::new(x, y), 0.0, Vec2::splat(radius * 2.0));
        self.push_primitive(PrimitiveInstance::new(
            transform,
            color.into(),
            ShapeKind::Circle,
            [radius, CIRCLE_EDGE_SOFTNESS, 0.0, 0.0],
        ))
    }

    pub fn draw_primitive_circle_lines(
        &mut self,
        x: f32,
        y: f32,
        radius: f32,
        thickness: f32,
        color: impl Into<Color>,
    ) -> DrawResult {
        let transform = affine_2d(Vec2::new(x, y), 0.0, Vec2::splat(radius * 2.0));
        self.push_primitive(PrimitiveInstance::new(
            transform,
            color.into(),
            ShapeKind::CircleLines,
            [radius, CIRCLE_EDGE_SOFTNESS, thickness / 2.0, 0.0],
        ))
    }

    /// Line segment from `(x1, y1)` to `(x2, y2)`, drawn as a rotated rect.
    pub fn draw_primitive_line(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        thickness: f32,
        color: impl Into<Color>,
    ) -> DrawResult {
        let (from, to) = (Vec2::new(x1, y1), Vec2::new(x2, y2));
        let delta = to - from;
        let transform = affine_2d(
            (from + to) * 0.5,
            delta.y.atan2(delta.x),
            Vec2::new(delta.length(), thickness),
        );
        self.push_primitive(PrimitiveInstance::new(
            transform,
            color.into(),
            ShapeKind::Rect,
            [0.0; 4],
        ))
    }

    /// Filled rect with its bottom-left corner at `(x, y)`.
    pub fn draw_primitive_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: impl Into<Color>,
    ) -> DrawResult {
        let transform = rect_transform(x, y, width, height);
        self.push_primitive(PrimitiveInstance::new(
            transform,
            color.into(),
            ShapeKind::Rect,
            [0.0; 4],
        ))
    }

    pub fn draw_primitive_rounded_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        corner_radius: f32,
        color: impl Into<Color>,
    ) -> DrawResult {
        let transform = rect_transform(x, y, width, height);
        self.push_primitive(PrimitiveInstance::new(
            transform,
            color.into(),
            ShapeKind::RoundedRect,
            [width / 2.0, height / 2.0, corner_radius, 0.0],
        ))
    }

    pub fn draw_primitive_rect_lines(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        thickness: f32,
        color: impl Into<Color>,
    ) -> DrawResult {
        let transform = rect_transform(x, y, width, height);
        self.push_primitive(PrimitiveInstance::new(
            transform,
            color.into(),
            ShapeKind::RectLines,
            [width / 2.0, height / 2.0, thickness, 0.0],
        ))
    }

    fn push_primitive(&mut self, instance: PrimitiveInstance) -> DrawResult {
        let result = self
            .batches
            .append(PipelineKind::Primitive, 1)
            .map_err(DrawError::from)
            .and_then(|index| {
                self.primitives
                    .write(index as usize, instance)
                    .map_err(DrawError::from)
            });
        self.track(result)
    }

    /// Lay out `text` with the top of its first line at `y` and append all of
    /// its glyph quads as a single text batch.
    pub fn draw_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font_size: f32,
        color: impl Into<Color>,
    ) -> DrawResult {
        let result = self.try_draw_text(text, x, y, font_size, color.into());
        self.track(result)
    }

    fn try_draw_text(&mut self, text: &str, x: f32, y: f32, font_size: f32, color: Color) -> DrawResult {
        let font = self.font.as_ref().ok_or(DrawError::NoFont)?;
        if text.is_empty() {
            return Ok(());
        }

        self.text_scratch.clear();
        self.text_scratch.extend(
            TextLayout::new(font)
                .quads(text, Vec2::new(x, y), font_size, color)
                .flat_map(|quad| quad.vertices),
        );
        if self.text_scratch.is_empty() {
            return Ok(());
        }

        let count = u32::try_from(self.text_scratch.len()).map_err(|_| BatchError::CapacityExceeded {
            kind: PipelineKind::Text,
            requested: self.text_scratch.len() as u64,
            capacity: self.batches.capacity(PipelineKind::Text),
        })?;
        let start = self.batches.append(PipelineKind::Text, count)?;
        self.text.write_slice(start as usize, &self.text_scratch)?;
        Ok(())
    }

    /// Bounds of `text` at `font_size`, for centering or backgrounds.
    pub fn measure_text(&self, text: &str, font_size: f32) -> DrawResult<TextBounds> {
        let font = self.font.as_ref().ok_or(DrawError::NoFont)?;
        Ok(TextLayout::new(font).measure(text, font_size))
    }

    fn track(&mut self, result: DrawResult) -> DrawResult {
        if result.is_err() {
            self.rejected_draws += 1;
        }
        result
    }

    /// Batches accumulated so far, in draw order.
    pub fn batches(&self) -> &[BatchDescriptor] {
        self.batches.batches()
    }

    /// Draw calls rejected this frame.
    pub fn rejected_draws(&self) -> u32 {
        self.rejected_draws
    }

    /// Records reserved for `kind` this frame, alignment padding included.
    pub fn record_count(&self, kind: PipelineKind) -> u32 {
        self.batches.next_free(kind)
    }

    /// Staged bytes of `kind` to upload for this frame.
    pub fn staged_bytes(&self, kind: PipelineKind) -> &[u8] {
        match kind {
            PipelineKind::Atlas => self.sprites.written_bytes(),
            PipelineKind::Primitive => self.primitives.written_bytes(),
            PipelineKind::Text => self.text.written_bytes(),
        }
    }

    pub fn sprite_instance(&self, index: usize) -> Option<&AtlasInstance> {
        self.sprites.get(index)
    }

    pub fn primitive_instance(&self, index: usize) -> Option<&PrimitiveInstance> {
        self.primitives.get(index)
    }

    pub fn text_vertex(&self, index: usize) -> Option<&TextVertex> {
        self.text.get(index)
    }
}

#[inline]
fn rect_transform(x: f32, y: f32, width: f32, height: f32) -> Mat4 {
    affine_2d(
        Vec2::new(x + width / 2.0, y + height / 2.0),
        0.0,
        Vec2::new(width, height),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_core::math::Vec4;

    fn canvas() -> Canvas {
        let mut canvas = Canvas::new(&RendererConfig::default()).unwrap();
        canvas.begin_frame(Mat4::IDENTITY);
        canvas
    }

    fn apply(transform: [[f32; 4]; 4], x: f32, y: f32) -> Vec4 {
        Mat4::from_cols_array_2d(&transform) * Vec4::new(x, y, 0.0, 1.0)
    }

    #[test]
    fn test_circle_params_and_extent() {
        let mut canvas = canvas();
        canvas.draw_primitive_circle(10.0, 20.0, 5.0, Color::RED).unwrap();
        let circle = canvas.primitive_instance(0).unwrap();
        assert_eq!(circle.shape(), ShapeKind::Circle);
        assert_eq!(circle.sdf_params, [5.0, 0.5, 0.0, 0.0]);
        assert_eq!(apply(circle.transform, 0.5, 0.5), Vec4::new(15.0, 25.0, 0.0, 1.0));
    }

    #[test]
    fn test_circle_lines_use_half_thickness() {
        let mut canvas = canvas();
        canvas
            .draw_primitive_circle_lines(0.0, 0.0, 8.0, 3.0, Color::WHITE)
            .unwrap();
        let ring = canvas.primitive_instance(0).unwrap();
        assert_eq!(ring.shape(), ShapeKind::CircleLines);
        assert_eq!(ring.sdf_params, [8.0, 0.5, 1.5, 0.0]);
    }

    #[test]
    fn test_rect_variants_are_anchored_bottom_left() {
        let mut canvas = canvas();
        canvas.draw_primitive_rect(0.0, 0.0, 40.0, 20.0, Color::WHITE).unwrap();
        canvas
            .draw_primitive_rounded_rect(0.0, 0.0, 40.0, 20.0, 4.0, Color::WHITE)
            .unwrap();
        canvas
            .draw_primitive_rect_lines(0.0, 0.0, 40.0, 20.0, 2.0, Color::WHITE)
            .unwrap();

        let rect = canvas.primitive_instance(0).unwrap();
        assert_eq!(rect.sdf_params, [0.0; 4]);
        assert_eq!(apply(rect.transform, -0.5, -0.5), Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert_eq!(apply(rect.transform, 0.5, 0.5), Vec4::new(40.0, 20.0, 0.0, 1.0));

        let rounded = canvas.primitive_instance(1).unwrap();
        assert_eq!(rounded.shape(), ShapeKind::RoundedRect);
        assert_eq!(rounded.sdf_params, [20.0, 10.0, 4.0, 0.0]);

        let outline = canvas.primitive_instance(2).unwrap();
        assert_eq!(outline.shape(), ShapeKind::RectLines);
        assert_eq!(outline.sdf_params, [20.0, 10.0, 2.0, 0.0]);
    }

    #[test]
    fn test_line_spans_endpoints() {
        let mut canvas = canvas();
        canvas
            .draw_primitive_line(0.0, 0.0, 0.0, 10.0, 2.0, Color::WHITE)
            .unwrap();
        let line = canvas.primitive_instance(0).unwrap();
        assert_eq!(line.shape(), ShapeKind::Rect);
        let end = apply(line.transform, 0.5, 0.0);
        assert!((end - Vec4::new(0.0, 10.0, 0.0, 1.0)).abs().max_element() < 1e-5);
    }

    #[test]
    fn test_sprite_without_atlas_or_name_is_rejected() {
        let mut canvas = canvas();
        assert_eq!(
            canvas.draw_sprite("hero", 0.0, 0.0, 1.0, 1.0, Color::WHITE, 0.0),
            Err(DrawError::NoSpriteAtlas)
        );

        canvas.set_sprite_atlas(Arc::new(SpriteAtlas::default()));
        assert_eq!(
            canvas.draw_sprite("hero", 0.0, 0.0, 1.0, 1.0, Color::WHITE, 0.0),
            Err(DrawError::UnknownSprite("hero".to_string()))
        );
        assert!(canvas.batches().is_empty());
        assert_eq!(canvas.rejected_draws(), 2);
    }

    #[test]
    fn test_byte_colors_are_accepted() {
        let mut canvas = canvas();
        canvas
            .draw_primitive_rect(0.0, 0.0, 1.0, 1.0, [255u8, 0, 0, 255])
            .unwrap();
        assert_eq!(canvas.primitive_instance(0).unwrap().color, Color::RED);
    }

    #[test]
    fn test_text_without_font_is_rejected() {
        let mut canvas = canvas();
        assert_eq!(
            canvas.draw_text("hi", 0.0, 0.0, 12.0, Color::WHITE),
            Err(DrawError::NoFont)
        );
        assert_eq!(canvas.measure_text("hi", 12.0), Err(DrawError::NoFont));
    }
}

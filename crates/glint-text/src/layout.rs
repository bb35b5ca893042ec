//! Text layout: cursor advance, kerning, line breaks and bounds.
//!
//! Positions are in pixel space with +Y up. Font units are em-relative and
//! scaled by `font_size / em_size`.

use std::str::Chars;

use glint_core::Color;
use glint_core::math::Vec2;
use glint_core::profiling::profile_function;

use crate::font_atlas::{Bounds, Glyph, YOrigin};
use crate::glyph_table::GlyphTable;
use crate::vertex::TextVertex;

/// The six vertices (two CCW triangles) of one glyph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphQuad {
    pub unicode: u32,
    pub vertices: [TextVertex; 6],
}

/// Result of [`TextLayout::measure`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextBounds {
    /// Leftmost extent relative to the origin. Zero unless a glyph hangs left.
    pub min_x: f32,
    /// Rightmost extent of the widest line relative to the origin.
    pub max_x: f32,
    pub width: f32,
    /// `line_count * line_height`.
    pub height: f32,
    pub line_count: usize,
}

/// Lays text out against a [`GlyphTable`].
#[derive(Debug, Clone, Copy)]
pub struct TextLayout<'a> {
    glyphs: &'a GlyphTable,
}

impl<'a> TextLayout<'a> {
    pub fn new(glyphs: &'a GlyphTable) -> Self {
        Self { glyphs }
    }

    /// Lazy sequence of glyph quads for `text`, with the top of the first
    /// line at `origin.y`.
    ///
    /// The iterator is cheap to clone, so it can be walked twice (e.g. once
    /// to count and once to write).
    pub fn quads<'t>(
        &self,
        text: &'t str,
        origin: Vec2,
        font_size: f32,
        color: Color,
    ) -> GlyphQuads<'a, 't> {
        let scale = self.scale(font_size);
        let metrics = self.glyphs.metrics();
        let (atlas_width, atlas_height) = self.glyphs.atlas_size();
        GlyphQuads {
            glyphs: self.glyphs,
            chars: text.chars(),
            origin_x: origin.x,
            cursor: Vec2::new(origin.x, origin.y - metrics.ascender * scale),
            previous: None,
            scale,
            line_height: metrics.line_height * scale,
            atlas_width,
            atlas_height,
            flip_v: self.glyphs.y_origin() == YOrigin::Bottom,
            color,
        }
    }

    /// Number of vertices [`quads`](Self::quads) would produce.
    pub fn vertex_count(&self, text: &str, font_size: f32) -> usize {
        self.quads(text, Vec2::ZERO, font_size, Color::WHITE).count() * 6
    }

    /// Measure `text` without producing vertices.
    pub fn measure(&self, text: &str, font_size: f32) -> TextBounds {
        profile_function!();
        let scale = self.scale(font_size);
        let line_height = self.glyphs.metrics().line_height * scale;

        let mut min_x = 0.0f32;
        let mut max_x = 0.0f32;
        let mut line_max_x = 0.0f32;
        let mut cursor_x = 0.0f32;
        let mut line_count = 1;
        let mut previous: Option<u32> = None;

        for ch in text.chars() {
            if ch == '\n' {
                max_x = max_x.max(line_max_x);
                line_max_x = 0.0;
                cursor_x = 0.0;
                line_count += 1;
                previous = None;
                continue;
            }

            let unicode = ch as u32;
            if let Some(kern) = previous.and_then(|p| self.glyphs.kerning(p, unicode)) {
                cursor_x += kern * scale;
            }

            if let Some(glyph) = self.glyphs.glyph(unicode) {
                let advance_right = cursor_x + glyph.advance * scale;
                let right = match glyph.plane_bounds {
                    Some(plane) => {
                        min_x = min_x.min(cursor_x + plane.left * scale);
                        advance_right.max(cursor_x + plane.right * scale)
                    }
                    None => advance_right,
                };
                line_max_x = line_max_x.max(right);
                cursor_x = advance_right;
            }
            previous = Some(unicode);
        }

        max_x = max_x.max(line_max_x);
        TextBounds {
            min_x,
            max_x,
            width: max_x - min_x,
            height: line_count as f32 * line_height,
            line_count,
        }
    }

    fn scale(&self, font_size: f32) -> f32 {
        font_size / self.glyphs.metrics().em_size
    }
}

/// Iterator returned by [`TextLayout::quads`].
#[derive(Debug, Clone)]
pub struct GlyphQuads<'a, 't> {
    glyphs: &'a GlyphTable,
    chars: Chars<'t>,
    origin_x: f32,
    cursor: Vec2,
    previous: Option<u32>,
    scale: f32,
    line_height: f32,
    atlas_width: f32,
    atlas_height: f32,
    flip_v: bool,
    color: Color,
}

impl GlyphQuads<'_, '_> {
    fn quad(&self, unicode: u32, plane: Bounds, atlas: Bounds) -> GlyphQuad {
        let x0 = self.cursor.x + plane.left * self.scale;
        let y0 = self.cursor.y + plane.bottom * self.scale;
        let x1 = self.cursor.x + plane.right * self.scale;
        let y1 = self.cursor.y + plane.top * self.scale;

        let u0 = atlas.left / self.atlas_width;
        let u1 = atlas.right / self.atlas_width;
        // Textures are sampled with V growing downwards.
        let (v_top, v_bottom) = if self.flip_v {
            (
                (self.atlas_height - atlas.top) / self.atlas_height,
                (self.atlas_height - atlas.bottom) / self.atlas_height,
            )
        } else {
            (atlas.top / self.atlas_height, atlas.bottom / self.atlas_height)
        };

        let top_left = TextVertex::new([x0, y1], [u0, v_top], self.color);
        let top_right = TextVertex::new([x1, y1], [u1, v_top], self.color);
        let bottom_left = TextVertex::new([x0, y0], [u0, v_bottom], self.color);
        let bottom_right = TextVertex::new([x1, y0], [u1, v_bottom], self.color);

        GlyphQuad {
            unicode,
            vertices: [
                bottom_left,
                bottom_right,
                top_right,
                bottom_left,
                top_right,
                top_left,
            ],
        }
    }
}

impl Iterator for GlyphQuads<'_, '_> {
    type Item = GlyphQuad;

    fn next(&mut self) -> Option<GlyphQuad> {
        while let Some(ch) = self.chars.next() {
            if ch == '\n' {
                self.cursor.x = self.origin_x;
                self.cursor.y -= self.line_height;
                self.previous = None;
                continue;
            }

            let unicode = ch as u32;
            if let Some(kern) = self
                .previous
                .and_then(|p| self.glyphs.kerning(p, unicode))
            {
                self.cursor.x += kern * self.scale;
            }
            self.previous = Some(unicode);

            // Unknown code points contribute nothing.
            let Some(&Glyph {
                advance,
                plane_bounds,
                atlas_bounds,
                ..
            }) = self.glyphs.glyph(unicode)
            else {
                continue;
            };

            let quad = match (plane_bounds, atlas_bounds) {
                (Some(plane), Some(atlas)) => Some(self.quad(unicode, plane, atlas)),
                _ => None,
            };
            self.cursor.x += advance * self.scale;

            if quad.is_some() {
                return quad;
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.chars.size_hint().1)
    }
}

impl std::iter::FusedIterator for GlyphQuads<'_, '_> {}

//! Glint Text - MSDF text layout
//!
//! - [`FontAtlasDesc`] parses the font-atlas JSON written by msdf-atlas-gen
//! - [`GlyphTable`] is the read-only glyph/kerning lookup built from it
//! - [`TextLayout`] turns a string into glyph quads and measures bounds
//!
//! ```rust
//! use glint_core::{Color, math::Vec2};
//! use glint_text::{GlyphTable, TextLayout};
//!
//! let table = GlyphTable::from_json(r#"{
//!     "atlas": {"distanceRange": 4, "width": 64, "height": 64},
//!     "metrics": {"emSize": 1, "lineHeight": 1.25, "ascender": 1},
//!     "glyphs": [{"unicode": 72, "advance": 0.5,
//!                 "planeBounds": {"left": 0, "bottom": 0, "right": 0.5, "top": 0.7},
//!                 "atlasBounds": {"left": 0, "bottom": 0, "right": 16, "top": 22}}]
//! }"#).unwrap();
//!
//! let layout = TextLayout::new(&table);
//! let quads: Vec<_> = layout.quads("HH", Vec2::ZERO, 32.0, Color::WHITE).collect();
//! assert_eq!(quads.len(), 2);
//! assert_eq!(layout.measure("HH\nH", 32.0).height, 2.0 * 1.25 * 32.0);
//! ```

pub mod error;
pub mod font_atlas;
pub mod glyph_table;
pub mod layout;
pub mod vertex;

pub use error::{TextError, TextResult};
pub use font_atlas::{AtlasInfo, Bounds, FontAtlasDesc, FontMetrics, Glyph, KerningPair, YOrigin};
pub use glyph_table::{GlyphTable, kerning_key};
pub use layout::{GlyphQuad, GlyphQuads, TextBounds, TextLayout};
pub use vertex::TextVertex;

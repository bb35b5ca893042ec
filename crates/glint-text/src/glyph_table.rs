use ahash::AHashMap;

use crate::error::TextResult;
use crate::font_atlas::{AtlasInfo, FontAtlasDesc, FontMetrics, Glyph, YOrigin};

/// Composite kerning key: `(first << 32) | second`.
#[inline]
pub const fn kerning_key(first: u32, second: u32) -> u64 {
    ((first as u64) << 32) | second as u64
}

/// Read-only glyph and kerning lookup built once from a font atlas.
///
/// Shared freely between frames; nothing mutates it after construction.
#[derive(Debug, Clone)]
pub struct GlyphTable {
    atlas: AtlasInfo,
    metrics: FontMetrics,
    glyphs: AHashMap<u32, Glyph>,
    kerning: AHashMap<u64, f32>,
}

impl GlyphTable {
    /// Build the table, validating metrics so a hand-built or directly
    /// deserialized description fails here instead of producing NaN geometry.
    pub fn new(desc: &FontAtlasDesc) -> TextResult<Self> {
        desc.validate()?;
        let glyphs = desc.glyphs.iter().map(|g| (g.unicode, *g)).collect();
        let kerning = desc
            .kerning
            .iter()
            .map(|k| (kerning_key(k.unicode1, k.unicode2), k.advance))
            .collect();

        tracing::debug!(
            "Built glyph table: {} glyphs, {} kerning pairs, atlas {}x{}",
            desc.glyphs.len(),
            desc.kerning.len(),
            desc.atlas.width,
            desc.atlas.height
        );

        Ok(Self {
            atlas: desc.atlas.clone(),
            metrics: desc.metrics,
            glyphs,
            kerning,
        })
    }

    pub fn from_json(json: &str) -> TextResult<Self> {
        Self::new(&FontAtlasDesc::from_json(json)?)
    }

    #[inline]
    pub fn glyph(&self, unicode: u32) -> Option<&Glyph> {
        self.glyphs.get(&unicode)
    }

    /// Kerning advance (em units) between `first` and a following `second`.
    /// Direction matters: `(A, V)` and `(V, A)` are distinct pairs.
    #[inline]
    pub fn kerning(&self, first: u32, second: u32) -> Option<f32> {
        self.kerning.get(&kerning_key(first, second)).copied()
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    pub fn atlas(&self) -> &AtlasInfo {
        &self.atlas
    }

    pub fn atlas_size(&self) -> (f32, f32) {
        (self.atlas.width as f32, self.atlas.height as f32)
    }

    pub fn distance_range(&self) -> f32 {
        self.atlas.distance_range
    }

    pub(crate) fn y_origin(&self) -> YOrigin {
        self.atlas.y_origin
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kerning_key_packs_both_code_points() {
        assert_eq!(kerning_key(1, 2), (1u64 << 32) | 2);
        assert_ne!(kerning_key(65, 86), kerning_key(86, 65));
        assert_eq!(kerning_key(u32::MAX, 0) >> 32, u32::MAX as u64);
    }

    #[test]
    fn test_lookup_is_direction_dependent() {
        let table = GlyphTable::from_json(
            r#"{
                "atlas": {"distanceRange": 2, "width": 8, "height": 8},
                "metrics": {"emSize": 1, "lineHeight": 1, "ascender": 1},
                "glyphs": [{"unicode": 65, "advance": 0.5}, {"unicode": 86, "advance": 0.5}],
                "kerning": [{"unicode1": 65, "unicode2": 86, "advance": -0.1}]
            }"#,
        )
        .unwrap();

        assert_eq!(table.kerning(65, 86), Some(-0.1));
        assert_eq!(table.kerning(86, 65), None);
        assert_eq!(table.glyph(65).map(|g| g.advance), Some(0.5));
        assert!(table.glyph(66).is_none());
    }

    #[test]
    fn test_new_rejects_unvalidated_desc() {
        let desc: FontAtlasDesc = serde_json::from_str(
            r#"{
                "atlas": {"distanceRange": 2, "width": 8, "height": 8},
                "metrics": {"emSize": 0, "lineHeight": 1, "ascender": 1},
                "glyphs": [{"unicode": 65, "advance": 0.5}]
            }"#,
        )
        .unwrap();
        assert!(matches!(
            GlyphTable::new(&desc),
            Err(crate::error::TextError::InvalidMetrics(_))
        ));

        let mut desc = desc;
        desc.metrics.em_size = 1.0;
        desc.atlas.width = 0;
        assert!(GlyphTable::new(&desc).is_err());
    }
}

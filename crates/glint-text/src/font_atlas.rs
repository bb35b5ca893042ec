//! Serde model of an MSDF font-atlas description (msdf-atlas-gen JSON).

use serde::Deserialize;

use crate::error::{TextError, TextResult};

/// Edge rectangle, in em units for plane bounds and atlas pixels for atlas bounds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Bounds {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

/// Which edge atlas-bound Y coordinates are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YOrigin {
    #[default]
    Bottom,
    Top,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtlasInfo {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub distance_range: f32,
    #[serde(default)]
    pub size: f32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub y_origin: YOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontMetrics {
    pub em_size: f32,
    pub line_height: f32,
    pub ascender: f32,
    #[serde(default)]
    pub descender: f32,
    #[serde(default)]
    pub underline_y: f32,
    #[serde(default)]
    pub underline_thickness: f32,
}

/// One glyph. Glyphs without plane bounds (e.g. space) advance the cursor
/// but have no quad.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Glyph {
    pub unicode: u32,
    pub advance: f32,
    pub plane_bounds: Option<Bounds>,
    pub atlas_bounds: Option<Bounds>,
}

/// Advance adjustment applied between `unicode1` and a following `unicode2`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct KerningPair {
    pub unicode1: u32,
    pub unicode2: u32,
    pub advance: f32,
}

/// Parsed font atlas description.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FontAtlasDesc {
    pub atlas: AtlasInfo,
    pub metrics: FontMetrics,
    pub glyphs: Vec<Glyph>,
    #[serde(default)]
    pub kerning: Vec<KerningPair>,
}

impl FontAtlasDesc {
    pub fn from_json(json: &str) -> TextResult<Self> {
        let desc: FontAtlasDesc = serde_json::from_str(json)?;
        desc.validate()?;
        Ok(desc)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> TextResult<Self> {
        let desc: FontAtlasDesc = serde_json::from_slice(bytes)?;
        desc.validate()?;
        Ok(desc)
    }

    /// Reject metrics that would make layout divide by zero.
    pub(crate) fn validate(&self) -> TextResult<()> {
        if self.metrics.em_size.is_nan() || self.metrics.em_size <= 0.0 {
            return Err(TextError::InvalidMetrics(format!(
                "emSize must be positive, got {}",
                self.metrics.em_size
            )));
        }
        if self.atlas.width == 0 || self.atlas.height == 0 {
            return Err(TextError::InvalidMetrics(format!(
                "atlas dimensions must be non-zero, got {}x{}",
                self.atlas.width, self.atlas.height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "atlas": {"type": "msdf", "distanceRange": 4, "size": 48, "width": 256, "height": 128, "yOrigin": "bottom"},
        "metrics": {"emSize": 1, "lineHeight": 1.2, "ascender": 0.9, "descender": -0.25, "underlineY": -0.1, "underlineThickness": 0.05},
        "glyphs": [
            {"unicode": 32, "advance": 0.25},
            {"unicode": 65, "advance": 0.6,
             "planeBounds": {"left": 0.0, "bottom": -0.05, "right": 0.6, "top": 0.75},
             "atlasBounds": {"left": 1.5, "bottom": 2.5, "right": 30.5, "top": 40.5}}
        ],
        "kerning": [{"unicode1": 65, "unicode2": 86, "advance": -0.08}]
    }"#;

    #[test]
    fn test_parse_sample_atlas() {
        let desc = FontAtlasDesc::from_json(SAMPLE).unwrap();
        assert_eq!(desc.atlas.kind, "msdf");
        assert_eq!(desc.atlas.distance_range, 4.0);
        assert_eq!(desc.atlas.y_origin, YOrigin::Bottom);
        assert_eq!(desc.metrics.line_height, 1.2);
        assert_eq!(desc.glyphs.len(), 2);
        assert!(desc.glyphs[0].plane_bounds.is_none());
        assert_eq!(desc.glyphs[1].atlas_bounds.unwrap().right, 30.5);
        assert_eq!(desc.kerning[0].unicode2, 86);
    }

    #[test]
    fn test_kerning_is_optional() {
        let json = r#"{
            "atlas": {"distanceRange": 2, "width": 8, "height": 8},
            "metrics": {"emSize": 1, "lineHeight": 1, "ascender": 1},
            "glyphs": []
        }"#;
        let desc = FontAtlasDesc::from_json(json).unwrap();
        assert!(desc.kerning.is_empty());
        assert_eq!(desc.atlas.y_origin, YOrigin::Bottom);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = FontAtlasDesc::from_json("{ not json").unwrap_err();
        assert!(matches!(err, TextError::Json(_)));
    }

    #[test]
    fn test_zero_em_size_is_rejected() {
        let json = r#"{
            "atlas": {"distanceRange": 2, "width": 8, "height": 8},
            "metrics": {"emSize": 0, "lineHeight": 1, "ascender": 1},
            "glyphs": []
        }"#;
        let err = FontAtlasDesc::from_json(json).unwrap_err();
        assert!(matches!(err, TextError::InvalidMetrics(_)));
    }
}

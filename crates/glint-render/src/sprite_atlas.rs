//! Named sprite regions inside the shared atlas texture.

use std::fmt;

use ahash::AHashMap;

/// Normalized texture coordinates of one sprite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl UvRect {
    /// The whole texture.
    pub const FULL: UvRect = UvRect {
        min: [0.0, 0.0],
        max: [1.0, 1.0],
    };
}

/// Sprite rectangle in atlas pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasParseError {
    /// 1-based line number, or 0 when the texture itself is unusable.
    pub line: usize,
    pub reason: String,
}

impl fmt::Display for AtlasParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "sprite atlas: {}", self.reason)
        } else {
            write!(f, "sprite atlas line {}: {}", self.line, self.reason)
        }
    }
}

impl std::error::Error for AtlasParseError {}

pub type AtlasParseResult<T> = Result<T, AtlasParseError>;

/// Read-only sprite-name to [`UvRect`] table.
#[derive(Debug, Clone, Default)]
pub struct SpriteAtlas {
    width: u32,
    height: u32,
    rects: AHashMap<String, UvRect>,
}

impl SpriteAtlas {
    /// Normalize pixel rects against a `width` x `height` texture.
    ///
    /// A zero dimension is clamped to one pixel; [`SpriteAtlas::parse`]
    /// rejects it instead.
    pub fn new(
        width: u32,
        height: u32,
        sprites: impl IntoIterator<Item = (String, PixelRect)>,
    ) -> Self {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let rects = sprites
            .into_iter()
            .map(|(name, rect)| {
                let uv = UvRect {
                    min: [rect.x / w, rect.y / h],
                    max: [(rect.x + rect.width) / w, (rect.y + rect.height) / h],
                };
                (name, uv)
            })
            .collect();
        Self {
            width,
            height,
            rects,
        }
    }

    /// Parse the plain-text atlas format: a sprite count on the first line,
    /// then one `name x y width height` line per sprite.
    ///
    /// ```
    /// use glint_render::SpriteAtlas;
    ///
    /// let atlas = SpriteAtlas::parse("1\nplayer 0 0 32 64\n", 128, 128).unwrap();
    /// assert_eq!(atlas.get("player").unwrap().max, [0.25, 0.5]);
    /// ```
    pub fn parse(text: &str, width: u32, height: u32) -> AtlasParseResult<Self> {
        if width == 0 || height == 0 {
            return Err(AtlasParseError {
                line: 0,
                reason: format!("atlas texture is {}x{} pixels", width, height),
            });
        }

        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let (count_line, count) = lines.next().ok_or(AtlasParseError {
            line: 1,
            reason: "missing sprite count".to_string(),
        })?;
        let expected: usize = count.parse().map_err(|_| AtlasParseError {
            line: count_line,
            reason: format!("invalid sprite count '{}'", count),
        })?;

        let mut sprites = Vec::with_capacity(expected);
        for (line_no, line) in lines {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let [name, x, y, w, h] = parts[..] else {
                return Err(AtlasParseError {
                    line: line_no,
                    reason: format!("expected 5 fields, found {}", parts.len()),
                });
            };
            let number = |field: &str| {
                field.parse::<f32>().map_err(|_| AtlasParseError {
                    line: line_no,
                    reason: format!("invalid number '{}'", field),
                })
            };
            sprites.push((
                name.to_string(),
                PixelRect::new(number(x)?, number(y)?, number(w)?, number(h)?),
            ));
        }

        if sprites.len() != expected {
            tracing::warn!(
                "Sprite atlas declares {} sprites but lists {}",
                expected,
                sprites.len()
            );
        }

        Ok(Self::new(width, height, sprites))
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<UvRect> {
        self.rects.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rects.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rects.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_by_texture_size() {
        let atlas = SpriteAtlas::parse("2\ncoin 64 0 16 16\nwall 0 128 256 64", 256, 256).unwrap();
        assert_eq!(atlas.len(), 2);
        assert_eq!(
            atlas.get("coin"),
            Some(UvRect {
                min: [0.25, 0.0],
                max: [0.3125, 0.0625]
            })
        );
        assert_eq!(atlas.get("wall").unwrap().max, [1.0, 0.75]);
        assert!(atlas.get("missing").is_none());
    }

    #[test]
    fn test_parse_reports_bad_lines() {
        let err = SpriteAtlas::parse("1\ncoin 1 2 3", 8, 8).unwrap_err();
        assert_eq!(err.line, 2);

        let err = SpriteAtlas::parse("1\n\ncoin a 2 3 4", 8, 8).unwrap_err();
        assert_eq!(err.line, 3);

        assert!(SpriteAtlas::parse("", 8, 8).is_err());
        assert!(SpriteAtlas::parse("many\n", 8, 8).is_err());
    }

    #[test]
    fn test_parse_rejects_empty_texture() {
        let err = SpriteAtlas::parse("1\ncoin 0 0 1 1\n", 0, 64).unwrap_err();
        assert_eq!(err.line, 0);
        assert_eq!(err.to_string(), "sprite atlas: atlas texture is 0x64 pixels");

        assert!(SpriteAtlas::parse("1\ncoin 0 0 1 1\n", 64, 0).is_err());
    }

    #[test]
    fn test_count_mismatch_is_tolerated() {
        let atlas = SpriteAtlas::parse("3\na 0 0 1 1\n", 4, 4).unwrap();
        assert_eq!(atlas.len(), 1);
    }
}

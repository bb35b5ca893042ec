//! Loading sprite atlases, font atlases and images by name.
//!
//! An asset name maps to files sharing its stem: `<name>.txt` for sprite
//! rectangles, `<name>.json` for font atlas metrics and `<name>.png` for the
//! pixels of either.

use std::fmt;
use std::path::PathBuf;

use glint_test_utils::{BackendError, ImageData};
use glint_text::{FontAtlasDesc, TextError};

use crate::sprite_atlas::{AtlasParseError, SpriteAtlas};

#[derive(Debug)]
pub enum AssetError {
    /// No asset with this name exists in the source.
    NotFound { path: String },
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// An image could not be decoded.
    DecodeError { path: String, message: String },
    Font(TextError),
    SpriteAtlas(AtlasParseError),
    /// The decoded pixels were rejected.
    Image(BackendError),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::NotFound { path } => write!(f, "Asset not found: {}", path),
            AssetError::IoError { path, source } => {
                write!(f, "IO error loading '{}': {}", path.display(), source)
            }
            AssetError::DecodeError { path, message } => {
                write!(f, "Failed to decode '{}': {}", path, message)
            }
            AssetError::Font(e) => write!(f, "Invalid font atlas: {}", e),
            AssetError::SpriteAtlas(e) => write!(f, "Invalid sprite atlas: {}", e),
            AssetError::Image(e) => write!(f, "Invalid image: {}", e),
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::IoError { source, .. } => Some(source),
            AssetError::Font(e) => Some(e),
            AssetError::SpriteAtlas(e) => Some(e),
            AssetError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TextError> for AssetError {
    fn from(e: TextError) -> Self {
        AssetError::Font(e)
    }
}

impl From<AtlasParseError> for AssetError {
    fn from(e: AtlasParseError) -> Self {
        AssetError::SpriteAtlas(e)
    }
}

impl From<BackendError> for AssetError {
    fn from(e: BackendError) -> Self {
        AssetError::Image(e)
    }
}

pub type AssetResult<T> = Result<T, AssetError>;

/// Where the renderer's assets come from.
pub trait AssetSource {
    /// Sprite rectangles of the atlas `name`, in pixels of its image.
    fn load_sprite_atlas(&self, name: &str) -> AssetResult<SpriteAtlas>;

    fn load_font_atlas(&self, name: &str) -> AssetResult<FontAtlasDesc>;

    /// RGBA8 pixels of the image `name`.
    fn load_image(&self, name: &str) -> AssetResult<ImageData>;
}

/// Assets stored as files in one directory.
#[cfg(feature = "image")]
#[derive(Debug, Clone)]
pub struct DirAssetSource {
    root: PathBuf,
}

#[cfg(feature = "image")]
impl DirAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn path(&self, name: &str, extension: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, extension))
    }

    fn read(&self, name: &str, extension: &str) -> AssetResult<Vec<u8>> {
        let path = self.path(name, extension);
        std::fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                AssetError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                AssetError::IoError { path, source }
            }
        })
    }

    fn image_size(&self, name: &str) -> AssetResult<(u32, u32)> {
        let path = self.path(name, "png");
        if !path.exists() {
            return Err(AssetError::NotFound {
                path: path.display().to_string(),
            });
        }
        image::image_dimensions(&path).map_err(|e| AssetError::DecodeError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(feature = "image")]
impl AssetSource for DirAssetSource {
    fn load_sprite_atlas(&self, name: &str) -> AssetResult<SpriteAtlas> {
        let bytes = self.read(name, "txt")?;
        let text = String::from_utf8_lossy(&bytes);
        let (width, height) = self.image_size(name)?;
        let atlas = SpriteAtlas::parse(&text, width, height)?;
        tracing::debug!("Loaded sprite atlas '{}' with {} sprites", name, atlas.len());
        Ok(atlas)
    }

    fn load_font_atlas(&self, name: &str) -> AssetResult<FontAtlasDesc> {
        let bytes = self.read(name, "json")?;
        let desc = FontAtlasDesc::from_json_bytes(&bytes)?;
        tracing::debug!(
            "Loaded font atlas '{}' with {} glyphs",
            name,
            desc.glyphs.len()
        );
        Ok(desc)
    }

    fn load_image(&self, name: &str) -> AssetResult<ImageData> {
        let bytes = self.read(name, "png")?;
        let decoded = image::load_from_memory(&bytes).map_err(|e| AssetError::DecodeError {
            path: self.path(name, "png").display().to_string(),
            message: e.to_string(),
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(ImageData::new(width, height, rgba.into_raw())?)
    }
}

#[cfg(all(test, feature = "image"))]
mod tests {
    use super::*;
    use std::fs;

    fn write_png(dir: &std::path::Path, name: &str, width: u32, height: u32) {
        image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]))
            .save(dir.join(format!("{}.png", name)))
            .unwrap();
    }

    #[test]
    fn test_load_sprite_atlas_uses_image_size() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "sprites", 64, 32);
        fs::write(dir.path().join("sprites.txt"), "1\nship 0 0 32 32\n").unwrap();

        let source = DirAssetSource::new(dir.path());
        let atlas = source.load_sprite_atlas("sprites").unwrap();
        assert_eq!(atlas.size(), (64, 32));
        let uv = atlas.get("ship").unwrap();
        assert_eq!(uv.max, [0.5, 1.0]);
    }

    #[test]
    fn test_load_image_decodes_rgba() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "font", 4, 2);

        let image = DirAssetSource::new(dir.path()).load_image("font").unwrap();
        assert_eq!((image.width, image.height), (4, 2));
        assert_eq!(&image.pixels[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_missing_asset_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirAssetSource::new(dir.path());
        assert!(matches!(
            source.load_font_atlas("missing"),
            Err(AssetError::NotFound { .. })
        ));
        assert!(matches!(
            source.load_image("missing"),
            Err(AssetError::NotFound { .. })
        ));
    }

    #[test]
    fn test_malformed_font_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("font.json"), "{ not json").unwrap();
        let result = DirAssetSource::new(dir.path()).load_font_atlas("font");
        assert!(matches!(result, Err(AssetError::Font(_))));
    }
}

//! Glint Render - immediate-mode 2D batching renderer
//!
//! Draw calls made against a [`Canvas`] are appended to per-pipeline
//! instance regions and grouped into batches: consecutive draws of the same
//! pipeline extend the current batch, a pipeline switch opens a new batch
//! whose first record sits on the backend's buffer-offset alignment.
//!
//! ```text
//! draw_sprite ─┐
//! draw_primitive_* ──> BatchAccumulator ──> InstanceRegion (per pipeline)
//! draw_text ───┘              │
//!                             v
//!   FrameDriver: acquire SlotRing slot -> upload -> replay batches -> submit
//! ```
//!
//! Three slots rotate through each pipeline buffer, so the CPU can record
//! frame N+1 while the GPU still reads frames N and N-1.
//!
//! # Backends
//!
//! - [`WgpuBackend`] renders with wgpu, to a surface or offscreen
//! - `glint_test_utils::MockBackend` records calls for tests
//!
//! # Features
//!
//! - `image` (default) - [`DirAssetSource`] decodes PNG atlases from disk
//! - `mock` - re-enables the mock backend of `glint-test-utils`

pub mod assets;
pub mod batch;
pub mod canvas;
pub mod config;
pub mod driver;
pub mod instance;
pub mod pipelines;
pub mod region;
pub mod ring;
pub mod shaders;
pub mod sprite_atlas;
pub mod wgpu_backend;

#[cfg(feature = "image")]
pub use assets::DirAssetSource;
pub use assets::{AssetError, AssetResult, AssetSource};
pub use batch::{BatchAccumulator, BatchDescriptor, BatchError, BatchResult};
pub use canvas::{CIRCLE_EDGE_SOFTNESS, Canvas, DrawError, DrawResult};
pub use config::{
    ConfigError, ConfigResult, DrawErrorPolicy, PipelineKind, PipelineLimits, RendererConfig,
};
pub use driver::{
    FontFace, FrameDriver, FrameError, FrameResult, FrameState, FrameStats, SpriteSheet,
};
pub use instance::{AtlasInstance, PrimitiveInstance, QuadVertex, ShapeKind};
pub use pipelines::RenderPipelines;
pub use region::{InstanceRegion, RegionError, RegionResult};
pub use ring::{
    FrameSlot, RingError, RingResult, SlotReleaser, SlotRing, SlotSemaphore, SlotState,
};
pub use sprite_atlas::{AtlasParseError, AtlasParseResult, PixelRect, SpriteAtlas, UvRect};
pub use wgpu_backend::WgpuBackend;

// Re-export the crates callers need to drive a frame.
pub use glint_core::{self, Color};
pub use glint_test_utils::{self, RenderBackend};
pub use glint_text::{self, FontAtlasDesc, GlyphTable, TextBounds};

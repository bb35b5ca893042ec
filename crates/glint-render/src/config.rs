//! Renderer configuration.

use std::fmt;
use std::time::Duration;

use glint_core::Color;
use glint_text::TextVertex;

use crate::instance::{AtlasInstance, PrimitiveInstance};

/// The three draw channels. Each has its own pipeline and instance region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// Textured sprites from the sprite atlas.
    Atlas,
    /// SDF shapes.
    Primitive,
    /// MSDF glyph quads.
    Text,
}

impl PipelineKind {
    pub const COUNT: usize = 3;
    pub const ALL: [PipelineKind; Self::COUNT] =
        [PipelineKind::Atlas, PipelineKind::Primitive, PipelineKind::Text];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn label(self) -> &'static str {
        match self {
            PipelineKind::Atlas => "atlas",
            PipelineKind::Primitive => "primitive",
            PipelineKind::Text => "text",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Record stride and per-frame capacity of one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineLimits {
    /// Bytes per record (instance or vertex).
    pub stride: u64,
    /// Records per frame.
    pub max_count: u32,
}

impl PipelineLimits {
    pub const fn new(stride: u64, max_count: u32) -> Self {
        Self { stride, max_count }
    }

    /// Bytes needed for one frame's worth of records.
    pub const fn frame_bytes(&self) -> u64 {
        self.stride * self.max_count as u64
    }
}

/// What the frame driver does when the draw callback returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawErrorPolicy {
    /// Drop the frame, give its slot back and return the error.
    Abort,
    /// Log the error and submit whatever was accumulated.
    #[default]
    RenderPartial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroFramesInFlight,
    ZeroAlignment,
    ZeroBatches,
    ZeroCapacity(PipelineKind),
    /// `offset_alignment` is not a whole multiple of the record stride.
    MisalignedStride {
        kind: PipelineKind,
        stride: u64,
        alignment: u64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroFramesInFlight => write!(f, "frames_in_flight must be at least 1"),
            ConfigError::ZeroAlignment => write!(f, "offset_alignment must be non-zero"),
            ConfigError::ZeroBatches => write!(f, "max_batches must be at least 1"),
            ConfigError::ZeroCapacity(kind) => {
                write!(f, "{} pipeline has zero capacity or stride", kind)
            }
            ConfigError::MisalignedStride {
                kind,
                stride,
                alignment,
            } => write!(
                f,
                "{} stride of {} bytes does not divide the {}-byte offset alignment",
                kind, stride, alignment
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Renderer sizing and behavior.
///
/// ```
/// use glint_render::{PipelineKind, RendererConfig};
///
/// let config = RendererConfig::default().with_capacity(PipelineKind::Primitive, 1_000);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.alignment_step(PipelineKind::Text), 8);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Ring slots; the CPU runs at most `frames_in_flight - 1` frames ahead.
    pub frames_in_flight: usize,
    /// Minimum buffer-offset alignment of the backend, in bytes.
    pub offset_alignment: u64,
    /// Batch descriptors per frame.
    pub max_batches: usize,
    /// Indexed by [`PipelineKind::index`].
    pub limits: [PipelineLimits; PipelineKind::COUNT],
    pub clear_color: Color,
    pub draw_error_policy: DrawErrorPolicy,
    /// How long `acquire` sleeps on the slot semaphore between backend polls.
    pub slot_wait_interval: Duration,
}

impl RendererConfig {
    pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 3;
    pub const DEFAULT_OFFSET_ALIGNMENT: u64 = 256;
    pub const DEFAULT_MAX_BATCHES: usize = 1024;
    pub const DEFAULT_MAX_SPRITES: u32 = 50_000;
    pub const DEFAULT_MAX_PRIMITIVES: u32 = 50_000;
    pub const DEFAULT_MAX_TEXT_VERTICES: u32 = 4096 * 6;

    #[inline]
    pub fn limits(&self, kind: PipelineKind) -> PipelineLimits {
        self.limits[kind.index()]
    }

    /// Records per alignment unit: batch starts are multiples of this.
    #[inline]
    pub fn alignment_step(&self, kind: PipelineKind) -> u32 {
        (self.offset_alignment / self.limits(kind).stride) as u32
    }

    pub fn with_capacity(mut self, kind: PipelineKind, max_count: u32) -> Self {
        self.limits[kind.index()].max_count = max_count;
        self
    }

    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames;
        self
    }

    pub fn with_max_batches(mut self, max_batches: usize) -> Self {
        self.max_batches = max_batches;
        self
    }

    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_draw_error_policy(mut self, policy: DrawErrorPolicy) -> Self {
        self.draw_error_policy = policy;
        self
    }

    pub fn with_slot_wait_interval(mut self, interval: Duration) -> Self {
        self.slot_wait_interval = interval;
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.frames_in_flight == 0 {
            return Err(ConfigError::ZeroFramesInFlight);
        }
        if self.offset_alignment == 0 {
            return Err(ConfigError::ZeroAlignment);
        }
        if self.max_batches == 0 {
            return Err(ConfigError::ZeroBatches);
        }
        for kind in PipelineKind::ALL {
            let limits = self.limits(kind);
            if limits.stride == 0 || limits.max_count == 0 {
                return Err(ConfigError::ZeroCapacity(kind));
            }
            if self.offset_alignment % limits.stride != 0 {
                return Err(ConfigError::MisalignedStride {
                    kind,
                    stride: limits.stride,
                    alignment: self.offset_alignment,
                });
            }
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: Self::DEFAULT_FRAMES_IN_FLIGHT,
            offset_alignment: Self::DEFAULT_OFFSET_ALIGNMENT,
            max_batches: Self::DEFAULT_MAX_BATCHES,
            limits: [
                PipelineLimits::new(AtlasInstance::SIZE, Self::DEFAULT_MAX_SPRITES),
                PipelineLimits::new(PrimitiveInstance::SIZE, Self::DEFAULT_MAX_PRIMITIVES),
                PipelineLimits::new(TextVertex::SIZE, Self::DEFAULT_MAX_TEXT_VERTICES),
            ],
            clear_color: Color::BLACK,
            draw_error_policy: DrawErrorPolicy::default(),
            slot_wait_interval: Duration::from_millis(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RendererConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.alignment_step(PipelineKind::Atlas), 2);
        assert_eq!(config.alignment_step(PipelineKind::Primitive), 2);
        assert_eq!(config.alignment_step(PipelineKind::Text), 8);
    }

    #[test]
    fn test_kind_indices_match_all_order() {
        for (i, kind) in PipelineKind::ALL.into_iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_stride_must_divide_alignment() {
        let mut config = RendererConfig::default();
        config.limits[PipelineKind::Text.index()].stride = 48;
        assert_eq!(
            config.validate(),
            Err(ConfigError::MisalignedStride {
                kind: PipelineKind::Text,
                stride: 48,
                alignment: 256
            })
        );
    }

    #[test]
    fn test_zero_values_are_rejected() {
        assert_eq!(
            RendererConfig::default().with_frames_in_flight(0).validate(),
            Err(ConfigError::ZeroFramesInFlight)
        );
        assert_eq!(
            RendererConfig::default()
                .with_capacity(PipelineKind::Atlas, 0)
                .validate(),
            Err(ConfigError::ZeroCapacity(PipelineKind::Atlas))
        );
        assert_eq!(
            RendererConfig::default().with_max_batches(0).validate(),
            Err(ConfigError::ZeroBatches)
        );
    }
}

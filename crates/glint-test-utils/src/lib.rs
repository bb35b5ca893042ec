//! GPU backend abstraction and test utilities for Glint.
//!
//! - [`RenderBackend`] / [`FrameEncoder`] - the slice of a graphics API the
//!   renderer drives
//! - GPU handle types (`GpuBuffer`, `GpuTexture`, ...) - real or mock
//! - `MockBackend` - recording backend with manual completion control
//!   (requires the `mock` feature)
//! - [`FastRandom`] - reproducible pseudo-random draw traffic
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use glint_test_utils::{MockBackend, RenderBackend, SamplerDesc};
//!
//! let mock = MockBackend::new();
//! let _sampler = mock.create_sampler(&SamplerDesc {
//!     label: "atlas",
//!     min_filter: wgpu::FilterMode::Linear,
//!     mag_filter: wgpu::FilterMode::Nearest,
//! });
//! assert_eq!(mock.calls().len(), 1);
//! # }
//! ```
//!
//! The traits are object safe and take `&self`; mock state lives behind
//! `parking_lot::Mutex` so a single backend can be shared through an `Arc`
//! with the completion callbacks it hands out.

pub mod gpu_types;
#[cfg(feature = "mock")]
pub mod mock_backend;
pub mod random;
pub mod render_backend;

pub use gpu_types::*;
#[cfg(feature = "mock")]
pub use mock_backend::*;
pub use random::FastRandom;
pub use render_backend::*;

//! Glint Core
//!
//! Shared building blocks for the Glint renderer crates: logging and
//! profiling bootstrap, 2D transform helpers and the [`Color`] type.

pub mod color;
pub mod logging;
pub mod math;
pub mod profiling;

pub use color::Color;

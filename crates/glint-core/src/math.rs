//! 2D transform helpers on top of `glam`.
//!
//! All transforms are 4x4 matrices so they can be uploaded as-is into
//! instance records. Composition order is always `T * R * S`: a unit quad
//! centered at the origin is scaled first, then rotated, then translated.

pub use glam::{Mat4, Vec2, Vec3, Vec4};

/// Translation by `(x, y)` in the XY plane.
#[inline]
pub fn translation(x: f32, y: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(x, y, 0.0))
}

/// Rotation around the Z axis, in radians (counter-clockwise).
#[inline]
pub fn rotation_z(radians: f32) -> Mat4 {
    Mat4::from_rotation_z(radians)
}

/// Non-uniform scale in the XY plane.
#[inline]
pub fn scale(x: f32, y: f32) -> Mat4 {
    Mat4::from_scale(Vec3::new(x, y, 1.0))
}

/// `translation(center) * rotation_z(rotation) * scale(size)`.
#[inline]
pub fn affine_2d(center: Vec2, rotation: f32, size: Vec2) -> Mat4 {
    if rotation == 0.0 {
        translation(center.x, center.y) * scale(size.x, size.y)
    } else {
        translation(center.x, center.y) * rotation_z(rotation) * scale(size.x, size.y)
    }
}

/// Projection mapping pixel coordinates centered on the drawable to clip space.
///
/// The origin sits at the drawable's center, +Y points up, and one unit is
/// one pixel.
#[inline]
pub fn pixel_space_projection(width: f32, height: f32) -> Mat4 {
    scale(2.0 / width.max(1.0), 2.0 / height.max(1.0))
}

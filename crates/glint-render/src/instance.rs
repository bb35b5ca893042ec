//! GPU-uploadable instance and vertex records.
//!
//! Record sizes are a hard contract: batch start offsets are computed as
//! `start * stride`, and every stride divides the 256-byte offset alignment.

use bytemuck::{Pod, Zeroable};
use glint_core::Color;
use glint_core::math::Mat4;
use glint_test_utils::VertexBufferDesc;
use glint_text::TextVertex;

use crate::sprite_atlas::UvRect;

/// Corner of the shared unit quad (centered at the origin, side 1).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl QuadVertex {
    /// Triangle-strip order: bottom-left, bottom-right, top-left, top-right.
    pub const UNIT_QUAD: [QuadVertex; 4] = [
        QuadVertex {
            position: [-0.5, -0.5],
            uv: [0.0, 1.0],
        },
        QuadVertex {
            position: [0.5, -0.5],
            uv: [1.0, 1.0],
        },
        QuadVertex {
            position: [-0.5, 0.5],
            uv: [0.0, 0.0],
        },
        QuadVertex {
            position: [0.5, 0.5],
            uv: [1.0, 0.0],
        },
    ];

    pub fn layout() -> VertexBufferDesc {
        VertexBufferDesc {
            stride: std::mem::size_of::<Self>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: wgpu::vertex_attr_array![
                // location 0: position (vec2)
                0 => Float32x2,
                // location 1: uv (vec2)
                1 => Float32x2,
            ]
            .to_vec(),
        }
    }
}

/// One textured sprite. `transform` already includes the projection.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AtlasInstance {
    pub transform: [[f32; 4]; 4],
    pub color: Color,
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
    _padding: [f32; 8],
}

static_assertions::const_assert_eq!(std::mem::size_of::<AtlasInstance>(), 128);

impl AtlasInstance {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(transform: Mat4, color: Color, uv: UvRect) -> Self {
        Self {
            transform: transform.to_cols_array_2d(),
            color,
            uv_min: uv.min,
            uv_max: uv.max,
            _padding: [0.0; 8],
        }
    }

    pub fn layout() -> VertexBufferDesc {
        VertexBufferDesc {
            stride: Self::SIZE,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: wgpu::vertex_attr_array![
                // locations 2-5: transform columns
                2 => Float32x4,
                3 => Float32x4,
                4 => Float32x4,
                5 => Float32x4,
                // location 6: color
                6 => Float32x4,
                // location 7: uv_min
                7 => Float32x2,
                // location 8: uv_max
                8 => Float32x2,
            ]
            .to_vec(),
        }
    }
}

/// SDF shape selector stored in [`PrimitiveInstance::shape_kind`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    None = 0,
    Rect = 1,
    RoundedRect = 2,
    Circle = 3,
    CircleLines = 4,
    RectLines = 5,
}

/// One SDF shape. `sdf_params` meaning depends on the shape:
///
/// | shape | x | y | z |
/// |---|---|---|---|
/// | rect | 0 | 0 | 0 |
/// | rounded rect | half width | half height | corner radius |
/// | circle | radius | edge softness | 0 |
/// | circle lines | radius | edge softness | half thickness |
/// | rect lines | half width | half height | thickness |
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PrimitiveInstance {
    pub transform: [[f32; 4]; 4],
    pub color: Color,
    pub sdf_params: [f32; 4],
    pub shape_kind: u32,
    _padding: [u32; 7],
}

static_assertions::const_assert_eq!(std::mem::size_of::<PrimitiveInstance>(), 128);

impl PrimitiveInstance {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(transform: Mat4, color: Color, shape: ShapeKind, sdf_params: [f32; 4]) -> Self {
        Self {
            transform: transform.to_cols_array_2d(),
            color,
            sdf_params,
            shape_kind: shape as u32,
            _padding: [0; 7],
        }
    }

    pub fn shape(&self) -> ShapeKind {
        match self.shape_kind {
            1 => ShapeKind::Rect,
            2 => ShapeKind::RoundedRect,
            3 => ShapeKind::Circle,
            4 => ShapeKind::CircleLines,
            5 => ShapeKind::RectLines,
            _ => ShapeKind::None,
        }
    }

    pub fn layout() -> VertexBufferDesc {
        VertexBufferDesc {
            stride: Self::SIZE,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: wgpu::vertex_attr_array![
                // locations 2-5: transform columns
                2 => Float32x4,
                3 => Float32x4,
                4 => Float32x4,
                5 => Float32x4,
                // location 6: color
                6 => Float32x4,
                // location 7: sdf_params
                7 => Float32x4,
                // location 8: shape_kind
                8 => Uint32,
            ]
            .to_vec(),
        }
    }
}

/// Vertex layout of [`TextVertex`].
pub fn text_vertex_layout() -> VertexBufferDesc {
    VertexBufferDesc {
        stride: TextVertex::SIZE,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: wgpu::vertex_attr_array![
            // location 0: position
            0 => Float32x2,
            // location 1: uv
            1 => Float32x2,
            // location 2: color
            2 => Float32x4,
        ]
        .to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strides_divide_offset_alignment() {
        for stride in [AtlasInstance::SIZE, PrimitiveInstance::SIZE, TextVertex::SIZE] {
            assert_eq!(256 % stride, 0);
        }
    }

    #[test]
    fn test_layout_attributes_fit_stride() {
        for layout in [
            QuadVertex::layout(),
            AtlasInstance::layout(),
            PrimitiveInstance::layout(),
            text_vertex_layout(),
        ] {
            let end = layout
                .attributes
                .iter()
                .map(|a| a.offset + a.format.size())
                .max()
                .unwrap();
            assert!(end <= layout.stride);
        }
    }

    #[test]
    fn test_primitive_field_offsets() {
        assert_eq!(std::mem::offset_of!(PrimitiveInstance, color), 64);
        assert_eq!(std::mem::offset_of!(PrimitiveInstance, sdf_params), 80);
        assert_eq!(std::mem::offset_of!(PrimitiveInstance, shape_kind), 96);
        assert_eq!(std::mem::offset_of!(AtlasInstance, uv_max), 88);
    }

    #[test]
    fn test_shape_round_trips_through_tag() {
        let instance = PrimitiveInstance::new(Mat4::IDENTITY, Color::WHITE, ShapeKind::RectLines, [0.0; 4]);
        assert_eq!(instance.shape_kind, 5);
        assert_eq!(instance.shape(), ShapeKind::RectLines);
    }
}

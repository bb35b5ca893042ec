use glint_core::Color;

/// One text vertex: pixel-space position, atlas UV and a baked color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TextVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: Color,
}

static_assertions::const_assert_eq!(std::mem::size_of::<TextVertex>(), 32);

impl TextVertex {
    /// Byte stride of one vertex.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub const fn new(position: [f32; 2], uv: [f32; 2], color: Color) -> Self {
        Self {
            position,
            uv,
            color,
        }
    }
}

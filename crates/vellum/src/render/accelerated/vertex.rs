//! # Vertex — Per-Corner Data Sent to the GPU
//!
//! Every quad the accelerated back end draws is four [`QuadVertex`]es. The
//! position is already in target pixels: the current draw transform is applied
//! on the CPU when the quad is queued, so quads with different transforms still
//! share one vertex buffer and one draw call per texture.
//!
//! ```text
//! QuadVertex (32 bytes per vertex)
//! ┌──────────────┬──────────────┬────────────────────────┐
//! │ position     │ uv           │ color                  │
//! │ [f32; 2]     │ [f32; 2]     │ [f32; 4]               │
//! │ offset 0     │ offset 8     │ offset 16              │
//! │ location(0)  │ location(1)  │ location(2)            │
//! └──────────────┴──────────────┴────────────────────────┘
//! ```
//!
//! `uv` is normalized to the texture being sampled. `color` is the tint the
//! texel is multiplied by: the fill color for rectangles (sampling the white
//! texture), `[1, 1, 1, opacity]` for images.

use bytemuck::{Pod, Zeroable};

use crate::math::Mat4;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl QuadVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            // color
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };
}

/// Pixel-to-clip projection uploaded as a uniform buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    /// Map `0..width × 0..height` (y down) onto clip space.
    pub fn for_target(width: u32, height: u32) -> Self {
        let projection =
            Mat4::orthographic_rh(0.0, width as f32, height as f32, 0.0, -1.0, 1.0);
        Self {
            view_proj: projection.to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;

    #[test]
    fn layout_matches_struct() {
        assert_eq!(std::mem::size_of::<QuadVertex>(), 32);
        assert_eq!(QuadVertex::LAYOUT.array_stride, 32);
    }

    #[test]
    fn camera_maps_target_corners_to_clip_corners() {
        let m = Mat4::from_cols_array_2d(&CameraUniform::for_target(200, 100).view_proj);
        let tl = m.project_point3(Vec2::ZERO.extend(0.0));
        let br = m.project_point3(Vec2::new(200.0, 100.0).extend(0.0));
        assert!((tl.x + 1.0).abs() < 1e-5 && (tl.y - 1.0).abs() < 1e-5);
        assert!((br.x - 1.0).abs() < 1e-5 && (br.y + 1.0).abs() < 1e-5);
    }
}

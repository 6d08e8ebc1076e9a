//! # Batch — Queue Quads, Group Them by Texture
//!
//! Draw calls on the accelerated back end are not sent to the GPU one by one.
//! Each `fill_rect` / `draw_image` appends a quad here, already transformed
//! into target pixels, and consecutive quads that sample the same texture share
//! one [`DrawBatch`]. The queue is flushed (one render pass, one
//! `draw_indexed` per batch) whenever the target changes, the target is
//! cleared, or pixels are read back.
//!
//! Submission order is draw order. There is no sorting: the scene graph
//! already walks children in paint order, and reordering would break blending.
//!
//! ## Comparison
//!
//! - **Canvas 2D / Skia**: also defer and batch internally, flushing on state
//!   that cannot be batched across (target switches, readback).
//! - **Immediate mode**: one draw call per rectangle. Simpler, but a scene of
//!   a few hundred sprites turns into a few hundred passes.

use crate::math::Vec2;
use crate::render::TextureHandle;

use super::vertex::QuadVertex;

/// One `draw_indexed` worth of quads sharing a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DrawBatch {
    pub texture: TextureHandle,
    /// Range into the shared index buffer.
    pub index_start: u32,
    pub index_count: u32,
}

#[derive(Debug, Default)]
pub(crate) struct QuadBatch {
    pub vertices: Vec<QuadVertex>,
    pub indices: Vec<u32>,
    pub batches: Vec<DrawBatch>,
}

impl QuadBatch {
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.batches.clear();
    }

    /// Queue one quad. `corners` and `uvs` go clockwise from the top-left.
    pub fn push_quad(
        &mut self,
        texture: TextureHandle,
        corners: [Vec2; 4],
        uvs: [[f32; 2]; 4],
        color: [f32; 4],
    ) {
        let base = self.vertices.len() as u32;
        for (corner, uv) in corners.iter().zip(uvs) {
            self.vertices.push(QuadVertex {
                position: corner.to_array(),
                uv,
                color,
            });
        }

        let index_start = self.indices.len() as u32;
        self.indices
            .extend([0, 1, 2, 0, 2, 3].iter().map(|i| base + i));

        if let Some(last) = self.batches.last_mut() {
            if last.texture == texture {
                last.index_count += 6;
                return;
            }
        }
        self.batches.push(DrawBatch {
            texture,
            index_start,
            index_count: 6,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: [Vec2; 4] = [
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ];
    const UV: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

    #[test]
    fn consecutive_quads_on_one_texture_share_a_batch() {
        let mut batch = QuadBatch::default();
        let a = TextureHandle(0);
        let b = TextureHandle(3);
        batch.push_quad(a, UNIT, UV, [1.0; 4]);
        batch.push_quad(a, UNIT, UV, [1.0; 4]);
        batch.push_quad(b, UNIT, UV, [1.0; 4]);
        batch.push_quad(a, UNIT, UV, [1.0; 4]);

        assert_eq!(batch.vertices.len(), 16);
        assert_eq!(
            batch.batches,
            vec![
                DrawBatch { texture: a, index_start: 0, index_count: 12 },
                DrawBatch { texture: b, index_start: 12, index_count: 6 },
                DrawBatch { texture: a, index_start: 18, index_count: 6 },
            ]
        );
        // Second quad's indices are offset by its base vertex.
        assert_eq!(&batch.indices[6..12], &[4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn clear_empties_the_queue() {
        let mut batch = QuadBatch::default();
        batch.push_quad(TextureHandle(0), UNIT, UV, [1.0; 4]);
        assert!(!batch.is_empty());
        batch.clear();
        assert!(batch.is_empty());
        assert!(batch.vertices.is_empty());
    }
}

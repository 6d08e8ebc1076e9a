//! # Transform — Local and World Space
//!
//! An entity's local matrix maps its content rectangle `[0, w) × [0, h)` into
//! its parent's space:
//!
//! ```text
//!   local = T(position) · R(rotation) · S(scale) · T(-origin)
//!   world = parent_world · local
//! ```
//!
//! so the content point `origin` lands on `position`, and content `(0, 0)`
//! lands on `position - origin * scale` when there is no rotation. The parent's
//! world matrix is handed down on every update and draw pass and by
//! [`Entity::propagate_transforms`](crate::entity::Entity::propagate_transforms).
//!
//! Drawing does not use the world matrix: [`push`] applies the same local
//! steps to the renderer's own transform stack, which already holds the
//! parent's.

use crate::entity::Node;
use crate::math::{Affine2, Vec2};
use crate::render::Renderer;

impl Node {
    pub fn local_matrix(&self) -> Affine2 {
        Affine2::from_translation(self.position)
            * Affine2::from_angle(self.rotation)
            * Affine2::from_scale(self.scale)
            * Affine2::from_translation(-self.origin)
    }

    pub fn world_matrix(&self) -> Affine2 {
        self.parent_world * self.local_matrix()
    }

    /// Content-space point to world space.
    pub fn to_world(&self, local: Vec2) -> Vec2 {
        self.world_matrix().transform_point2(local)
    }

    /// World-space point to content space. Non-finite when the scale is zero.
    pub fn to_local(&self, world: Vec2) -> Vec2 {
        self.world_matrix().inverse().transform_point2(world)
    }

    /// Where the anchor (`origin`) ends up in world space.
    pub fn world_position(&self) -> Vec2 {
        self.to_world(self.origin)
    }

    /// Whether `world` falls inside the content rectangle.
    pub fn hit_test(&self, world: Vec2) -> bool {
        let p = self.to_local(world);
        p.x >= 0.0 && p.y >= 0.0 && p.x < self.dimension.width && p.y < self.dimension.height
    }
}

/// Enter `node`'s space on the renderer. Every `push` needs a matching [`pop`].
pub fn push(node: &Node, renderer: &mut dyn Renderer) {
    renderer.save();
    renderer.translate(node.position.x, node.position.y);
    renderer.rotate(node.rotation);
    renderer.scale(node.scale.x, node.scale.y);
    renderer.translate(-node.origin.x, -node.origin.y);
    renderer.set_opacity(renderer.opacity() * node.alpha);
}

pub fn pop(renderer: &mut dyn Renderer) {
    renderer.restore();
}

//! Origin anchoring relative to the owner's size.

use crate::component::{Component, FrameData};
use crate::entity::Node;
use crate::math::Vec2;

/// Keeps `origin` at `relative * dimension`, e.g. `(0.5, 0.5)` to rotate and
/// position around the centre.
///
/// Applied on start and on every update. Attach it after any component that
/// changes the dimension, so it sees the final size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub relative: Vec2,
}

impl Anchor {
    pub const CENTER: Self = Self {
        relative: Vec2::splat(0.5),
    };

    pub fn new(relative: Vec2) -> Self {
        Self { relative }
    }
}

impl Component for Anchor {
    fn name(&self) -> Option<&str> {
        Some("anchor")
    }

    fn start(&mut self, owner: &mut Node) {
        owner.set_origin_relative(self.relative);
    }

    fn update(&mut self, owner: &mut Node, _data: &mut FrameData<'_>) {
        owner.set_origin_relative(self.relative);
    }
}

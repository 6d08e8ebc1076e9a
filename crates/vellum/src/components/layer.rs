//! # Layer — Off-Screen Groups
//!
//! ```text
//!   draw:       Layer ─► set_context(surface) ─► later siblings draw into it
//!   post_draw:  later siblings ─► Layer ─► restore_context ─► composite
//! ```

use crate::component::{Component, FrameData};
use crate::entity::Node;
use crate::math::Color;
use crate::render::{ImageRegion, Renderer, TextureHandle};

/// Renders everything attached after it into an off-screen surface, then
/// composites that surface in one draw.
///
/// `draw` redirects the renderer; the components after it draw into the
/// surface; `post_draw`, which runs after all of theirs, restores the context
/// and blits the surface under the owner's transform and opacity. The whole
/// group is therefore faded as one image instead of piece by piece.
#[derive(Debug, Default)]
pub struct Layer {
    surface: Option<(TextureHandle, u32, u32)>,
    redirected: bool,
}

impl Layer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface sized to the owner, recreated when the owner grows or shrinks.
    fn surface(&mut self, owner: &Node, renderer: &mut dyn Renderer) -> (TextureHandle, u32, u32) {
        let w = owner.dimension.width.ceil().max(1.0) as u32;
        let h = owner.dimension.height.ceil().max(1.0) as u32;
        match self.surface {
            Some(surface @ (_, sw, sh)) if sw == w && sh == h => surface,
            _ => {
                let surface = (renderer.create_surface(w, h), w, h);
                self.surface = Some(surface);
                surface
            }
        }
    }
}

impl Component for Layer {
    fn name(&self) -> Option<&str> {
        Some("layer")
    }

    fn draw(&mut self, owner: &mut Node, renderer: &mut dyn Renderer, _data: &mut FrameData<'_>) {
        let (surface, _, _) = self.surface(owner, renderer);
        renderer.set_context(surface);
        renderer.clear(Color::TRANSPARENT);
        self.redirected = true;
    }

    fn post_draw(
        &mut self,
        _owner: &mut Node,
        renderer: &mut dyn Renderer,
        _data: &mut FrameData<'_>,
    ) {
        if !self.redirected {
            return;
        }
        self.redirected = false;
        renderer.restore_context();
        if let Some((surface, w, h)) = self.surface {
            let region = ImageRegion::whole(surface, w, h);
            let (w, h) = (region.width, region.height);
            renderer.draw_image(&region, 0.0, 0.0, w, h, 0.0, 0.0, w, h);
        }
    }
}

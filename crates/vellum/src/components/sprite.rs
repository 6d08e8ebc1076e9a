//! # Sprite — An Image Region on an Entity
//!
//! Stretches an [`ImageRegion`] over the owner's dimension. An owner with no
//! size takes the region's size when the sprite is attached.

use crate::component::{Component, FrameData};
use crate::entity::Node;
use crate::math::Size;
use crate::render::{ImageRegion, Renderer};

/// Draws an image region stretched over the owner's content rectangle.
///
/// An owner with no dimension yet takes the region's size when the sprite is
/// attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub region: ImageRegion,
}

impl Sprite {
    pub fn new(region: ImageRegion) -> Self {
        Self { region }
    }
}

impl Component for Sprite {
    fn name(&self) -> Option<&str> {
        Some("sprite")
    }

    fn attached(&mut self, owner: &mut Node) {
        if owner.dimension == Size::ZERO {
            owner.dimension = Size::new(self.region.width, self.region.height);
        }
    }

    fn draw(&mut self, owner: &mut Node, renderer: &mut dyn Renderer, _data: &mut FrameData<'_>) {
        let r = &self.region;
        renderer.draw_image(
            r,
            0.0,
            0.0,
            r.width,
            r.height,
            0.0,
            0.0,
            owner.dimension.width,
            owner.dimension.height,
        );
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::entity::{Entity, EntityConfig};
    use crate::math::Vec2;
    use crate::render::SoftwareRenderer;

    #[test]
    fn mirrored_sprite_draws_flipped() {
        let mut renderer = SoftwareRenderer::new(4, 1, false);
        let mut strip = RgbaImage::new(2, 1);
        strip.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        strip.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        let texture = renderer.load_image(&strip);

        let mut e = Entity::new(EntityConfig {
            position: Vec2::new(2.0, 0.0),
            scale: Vec2::new(-1.0, 1.0),
            ..Default::default()
        })
        .with(Sprite::new(ImageRegion::whole(texture, 2, 1)));
        assert_eq!(e.dimension, Size::new(2.0, 1.0));

        e.draw(&mut renderer, &mut FrameData::new(1.0));
        let px = renderer.frame();
        // Mirrored about x = 2: blue lands left of red.
        assert_eq!(px.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(px.get_pixel(1, 0).0, [255, 0, 0, 255]);
        assert_eq!(px.get_pixel(2, 0).0, [0, 0, 0, 0]);
    }
}

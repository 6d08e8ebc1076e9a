//! # Fill — Solid and Outlined Rectangles
//!
//! Paints the owner's `[0, w) × [0, h)` content rectangle in one color.

use crate::component::{Component, FrameData};
use crate::entity::Node;
use crate::math::Color;
use crate::render::Renderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillStyle {
    #[default]
    Solid,
    /// One-pixel outline inside the rectangle.
    Stroke,
}

/// Paints the owner's `[0, w) × [0, h)` content rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub color: Color,
    pub style: FillStyle,
}

impl Fill {
    pub fn solid(color: Color) -> Self {
        Self {
            color,
            style: FillStyle::Solid,
        }
    }

    pub fn stroke(color: Color) -> Self {
        Self {
            color,
            style: FillStyle::Stroke,
        }
    }
}

impl Component for Fill {
    fn name(&self) -> Option<&str> {
        Some("fill")
    }

    fn draw(&mut self, owner: &mut Node, renderer: &mut dyn Renderer, _data: &mut FrameData<'_>) {
        let (w, h) = (owner.dimension.width, owner.dimension.height);
        match self.style {
            FillStyle::Solid => renderer.fill_rect(self.color, 0.0, 0.0, w, h),
            FillStyle::Stroke => renderer.stroke_rect(self.color, 0.0, 0.0, w, h),
        }
    }
}

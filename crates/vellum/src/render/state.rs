//! Draw state shared by both back ends: the save/restore stack of transform
//! and opacity, and the stack of redirected drawing contexts.

use crate::math::{Affine2, Vec2};

use super::TextureHandle;

/// One snapshot of the drawing state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DrawState {
    pub transform: Affine2,
    pub opacity: f32,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Affine2::IDENTITY,
            opacity: 1.0,
        }
    }
}

/// The current state plus everything pushed by `save`.
#[derive(Debug, Clone, Default)]
pub(crate) struct StateStack {
    pub current: DrawState,
    saved: Vec<DrawState>,
}

impl StateStack {
    pub fn save(&mut self) {
        self.saved.push(self.current);
    }

    pub fn restore(&mut self) {
        match self.saved.pop() {
            Some(state) => self.current = state,
            None => log::warn!("Renderer: restore() without matching save(), ignored"),
        }
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.current.transform = self.current.transform * Affine2::from_translation(Vec2::new(x, y));
    }

    pub fn scale(&mut self, x: f32, y: f32) {
        self.current.transform = self.current.transform * Affine2::from_scale(Vec2::new(x, y));
    }

    pub fn rotate(&mut self, radians: f32) {
        self.current.transform = self.current.transform * Affine2::from_angle(radians);
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.current.opacity = opacity.clamp(0.0, 1.0);
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.saved.len()
    }
}

/// Which target draws go to, and the state stacks of the targets we
/// redirected away from.
#[derive(Debug)]
pub(crate) struct ContextStack {
    pub target: TextureHandle,
    pub state: StateStack,
    suspended: Vec<(TextureHandle, StateStack)>,
}

impl ContextStack {
    pub fn new(screen: TextureHandle) -> Self {
        Self {
            target: screen,
            state: StateStack::default(),
            suspended: Vec::new(),
        }
    }

    /// Switch to `surface` with a fresh state stack.
    pub fn push(&mut self, surface: TextureHandle) {
        let previous = std::mem::take(&mut self.state);
        self.suspended.push((self.target, previous));
        self.target = surface;
    }

    /// Return to the previous target. Returns `false` (and logs) when there is
    /// nothing to return to.
    pub fn pop(&mut self) -> bool {
        match self.suspended.pop() {
            Some((target, state)) => {
                self.target = target;
                self.state = state;
                true
            }
            None => {
                log::warn!("Renderer: restore_context() without matching set_context(), ignored");
                false
            }
        }
    }
}

/// Corners of `(x, y, w, h)` after `transform`, clockwise from the top-left.
pub(crate) fn quad_corners(transform: &Affine2, x: f32, y: f32, w: f32, h: f32) -> [Vec2; 4] {
    [
        transform.transform_point2(Vec2::new(x, y)),
        transform.transform_point2(Vec2::new(x + w, y)),
        transform.transform_point2(Vec2::new(x + w, y + h)),
        transform.transform_point2(Vec2::new(x, y + h)),
    ]
}

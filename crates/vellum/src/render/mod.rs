//! # Render — The Renderer Contract
//!
//! Every drawable component talks to a [`Renderer`]: a canvas-like capability
//! set of state stack, affine transform, rectangle fills, image blits, opacity
//! and off-screen surfaces. Two interchangeable back ends implement it:
//!
//! - [`SoftwareRenderer`] rasterizes on the CPU into `image::RgbaImage`s.
//! - `AcceleratedRenderer` (feature `accelerated`) batches quads and draws
//!   them with wgpu into GPU textures.
//!
//! ```text
//!  Entity::draw ──► transform::push ──► Renderer::fill_rect / draw_image ...
//!                                          │
//!                   ┌──────────────────────┴──────────────────────┐
//!                   ▼                                             ▼
//!           SoftwareRenderer                              AcceleratedRenderer
//!   inverse-map each pixel centre               pre-transform quad corners on CPU,
//!   into the destination rect, sample,          batch by texture, one draw call per
//!   blend straight-alpha source-over            batch, ALPHA_BLENDING pipeline
//! ```
//!
//! ## Shared Rules
//!
//! Both back ends follow the same rasterization rule so the same call sequence
//! produces the same pixels: a pixel is covered when its centre lies inside the
//! half-open destination rectangle (after the current transform); textures are
//! sampled nearest or bilinear (clamp to edge) depending on `smoothing`;
//! blending is straight-alpha source-over. Off-screen surfaces start fully
//! transparent, as does the main target.
//!
//! ## Back-End Selection
//!
//! [`setup`] picks the back end once. `Auto` and `Accelerated` probe the GPU;
//! any failure falls back to software synchronously. The probe builds all GPU
//! objects in locals and only returns a renderer when everything succeeded,
//! so nothing half-initialized survives a failed probe.

#[cfg(feature = "accelerated")]
pub mod accelerated;
pub mod software;
pub(crate) mod state;

#[cfg(feature = "accelerated")]
pub use accelerated::AcceleratedRenderer;
pub use software::SoftwareRenderer;

use image::RgbaImage;

use crate::config::{BackendPreference, RendererConfig};
use crate::error::RenderError;
use crate::math::Color;

/// Which implementation is behind a `dyn Renderer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Software,
    Accelerated,
}

/// Handle to a texture or off-screen surface owned by a renderer.
///
/// Handles are only meaningful for the renderer that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) usize);

/// A sub-rectangle of a texture, e.g. one frame of an atlas. This is the
/// handle shape the asset provider hands out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageRegion {
    pub texture: TextureHandle,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ImageRegion {
    /// The whole texture.
    pub fn whole(texture: TextureHandle, width: u32, height: u32) -> Self {
        Self {
            texture,
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
        }
    }
}

/// The renderer capability contract.
///
/// Coordinates are in pixels of the current target, y pointing down, before
/// the current transform is applied.
pub trait Renderer {
    fn backend(&self) -> BackendKind;

    /// Size of the current drawing target.
    fn size(&self) -> (u32, u32);

    /// Push a snapshot of transform and opacity.
    fn save(&mut self);
    /// Pop the last snapshot. Unbalanced calls are logged and ignored.
    fn restore(&mut self);

    fn translate(&mut self, x: f32, y: f32);
    fn scale(&mut self, x: f32, y: f32);
    fn rotate(&mut self, radians: f32);

    fn opacity(&self) -> f32;
    fn set_opacity(&mut self, opacity: f32);

    fn fill_rect(&mut self, color: Color, x: f32, y: f32, w: f32, h: f32);

    /// Outline a rectangle with a one-pixel border drawn inside its bounds.
    fn stroke_rect(&mut self, color: Color, x: f32, y: f32, w: f32, h: f32) {
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let line = 1.0_f32;
        self.fill_rect(color, x, y, w, line.min(h));
        if h > line {
            self.fill_rect(color, x, y + h - line, w, line);
        }
        let inner = h - 2.0 * line;
        if inner > 0.0 {
            self.fill_rect(color, x, y + line, line.min(w), inner);
            if w > line {
                self.fill_rect(color, x + w - line, y + line, line, inner);
            }
        }
    }

    /// Blit `(sx, sy, sw, sh)` of `region` (relative to the region's origin)
    /// into the destination rectangle `(dx, dy, dw, dh)`.
    #[allow(clippy::too_many_arguments)]
    fn draw_image(
        &mut self,
        region: &ImageRegion,
        sx: f32,
        sy: f32,
        sw: f32,
        sh: f32,
        dx: f32,
        dy: f32,
        dw: f32,
        dh: f32,
    );

    /// Upload decoded pixels and return a handle usable in [`ImageRegion`].
    fn load_image(&mut self, image: &RgbaImage) -> TextureHandle;

    fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)>;

    /// Create a transparent off-screen target that can later be drawn from.
    fn create_surface(&mut self, width: u32, height: u32) -> TextureHandle;

    /// Redirect subsequent draws to `surface` with a fresh state stack.
    fn set_context(&mut self, surface: TextureHandle);
    /// Return to the previous target. Unpaired calls are logged and ignored.
    fn restore_context(&mut self);

    /// Overwrite the whole current target, ignoring transform and opacity.
    fn clear(&mut self, color: Color);

    /// Copy the current target's pixels back.
    fn read_pixels(&mut self) -> Result<RgbaImage, RenderError>;
}

/// Draw into `surface` for the duration of `draw`, keeping
/// `set_context`/`restore_context` paired.
pub fn with_surface<R>(
    renderer: &mut dyn Renderer,
    surface: TextureHandle,
    draw: impl FnOnce(&mut dyn Renderer) -> R,
) -> R {
    renderer.set_context(surface);
    let result = draw(renderer);
    renderer.restore_context();
    result
}

/// Create the renderer for a `width × height` main target.
///
/// Never fails: when the accelerated path is unavailable the software back end
/// is returned instead.
pub fn setup(width: u32, height: u32, config: &RendererConfig) -> Box<dyn Renderer> {
    let smoothing = config.smoothing;
    match config.backend {
        BackendPreference::Software => {
            log::info!("Renderer: using software back end ({width}x{height})");
            Box::new(SoftwareRenderer::new(width, height, smoothing))
        }
        preference => match probe_accelerated(width, height, smoothing) {
            Ok(renderer) => {
                log::info!("Renderer: using accelerated back end ({width}x{height})");
                renderer
            }
            Err(e) => {
                if preference == BackendPreference::Accelerated {
                    log::warn!("Renderer: accelerated back end unavailable ({e}), using software");
                } else {
                    log::info!("Renderer: accelerated back end unavailable ({e}), using software");
                }
                Box::new(SoftwareRenderer::new(width, height, smoothing))
            }
        },
    }
}

#[cfg(feature = "accelerated")]
fn probe_accelerated(
    width: u32,
    height: u32,
    smoothing: bool,
) -> Result<Box<dyn Renderer>, RenderError> {
    Ok(Box::new(AcceleratedRenderer::new(width, height, smoothing)?))
}

#[cfg(not(feature = "accelerated"))]
fn probe_accelerated(
    _width: u32,
    _height: u32,
    _smoothing: bool,
) -> Result<Box<dyn Renderer>, RenderError> {
    Err(RenderError::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn software_preference_is_honoured() {
        let config = RendererConfig {
            backend: BackendPreference::Software,
            ..Default::default()
        };
        let renderer = setup(16, 8, &config);
        assert_eq!(renderer.backend(), BackendKind::Software);
        assert_eq!(renderer.size(), (16, 8));
    }

    #[test]
    fn auto_setup_never_fails() {
        // Whatever the host offers, setup hands back a working renderer.
        let mut renderer = setup(4, 4, &RendererConfig::default());
        renderer.fill_rect(Color::RED, 0.0, 0.0, 4.0, 4.0);
        let pixels = renderer.read_pixels().unwrap();
        assert_eq!(pixels.dimensions(), (4, 4));
        assert_eq!(pixels.get_pixel(2, 2).0, [255, 0, 0, 255]);
    }

    #[test]
    fn with_surface_keeps_contexts_paired() {
        let mut renderer = SoftwareRenderer::new(8, 8, false);
        let surface = renderer.create_surface(2, 2);
        let size = with_surface(&mut renderer, surface, |r| {
            r.fill_rect(Color::BLUE, 0.0, 0.0, 2.0, 2.0);
            r.size()
        });
        assert_eq!(size, (2, 2));
        assert_eq!(renderer.size(), (8, 8));
    }

    #[test]
    fn stroke_rect_outlines_inside_bounds() {
        let mut renderer = SoftwareRenderer::new(6, 6, false);
        renderer.stroke_rect(Color::WHITE, 1.0, 1.0, 4.0, 4.0);
        let px = renderer.read_pixels().unwrap();
        assert_eq!(px.get_pixel(1, 1).0[3], 255);
        assert_eq!(px.get_pixel(4, 4).0[3], 255);
        assert_eq!(px.get_pixel(4, 2).0[3], 255);
        // Interior and outside untouched.
        assert_eq!(px.get_pixel(2, 2).0[3], 0);
        assert_eq!(px.get_pixel(5, 5).0[3], 0);
        assert_eq!(px.get_pixel(0, 0).0[3], 0);
    }
}

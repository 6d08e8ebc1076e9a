//! # Software Back End — CPU Rasterizer
//!
//! Every target (the main frame and each off-screen surface) is an
//! `image::RgbaImage`. Drawing a rectangle works backwards: take the bounding
//! box of the transformed rectangle, map each pixel centre in it through the
//! inverse transform, and shade the pixel when the mapped point lands inside
//! the half-open source rectangle. That is the same coverage rule the GPU
//! rasterizer applies to the two triangles of a quad, which is what keeps the
//! two back ends pixel-equivalent.
//!
//! ```text
//!   target pixel (px+.5, py+.5) ──inverse──► local point ──► inside rect?
//!                                                         └─► uv = src + (local - dst) / dst_size * src_size
//! ```
//!
//! Texture lookups use texel-space coordinates: nearest takes the texel the
//! coordinate falls in, bilinear blends the four texels around `coord - 0.5`,
//! both clamped to the texture edge.

use image::{Rgba, RgbaImage};

use crate::error::RenderError;
use crate::math::{Affine2, Color, Vec2};

use super::state::{ContextStack, quad_corners};
use super::{BackendKind, ImageRegion, Renderer, TextureHandle};

/// CPU implementation of [`Renderer`].
pub struct SoftwareRenderer {
    /// Entry 0 is the main frame; surfaces and loaded images follow.
    textures: Vec<RgbaImage>,
    contexts: ContextStack,
    smoothing: bool,
}

impl SoftwareRenderer {
    pub fn new(width: u32, height: u32, smoothing: bool) -> Self {
        Self {
            textures: vec![RgbaImage::new(width.max(1), height.max(1))],
            contexts: ContextStack::new(TextureHandle(0)),
            smoothing,
        }
    }

    /// The main frame, regardless of the current context.
    pub fn frame(&self) -> &RgbaImage {
        &self.textures[0]
    }

    fn target_index(&self) -> usize {
        self.contexts.target.0
    }
}

impl Renderer for SoftwareRenderer {
    fn backend(&self) -> BackendKind {
        BackendKind::Software
    }

    fn size(&self) -> (u32, u32) {
        self.textures[self.target_index()].dimensions()
    }

    fn save(&mut self) {
        self.contexts.state.save();
    }

    fn restore(&mut self) {
        self.contexts.state.restore();
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.contexts.state.translate(x, y);
    }

    fn scale(&mut self, x: f32, y: f32) {
        self.contexts.state.scale(x, y);
    }

    fn rotate(&mut self, radians: f32) {
        self.contexts.state.rotate(radians);
    }

    fn opacity(&self) -> f32 {
        self.contexts.state.current.opacity
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.contexts.state.set_opacity(opacity);
    }

    fn fill_rect(&mut self, color: Color, x: f32, y: f32, w: f32, h: f32) {
        let state = self.contexts.state.current;
        let src = color.with_opacity(state.opacity).to_array();
        let target = self.target_index();
        rasterize(&mut self.textures[target], &state.transform, [x, y, w, h], |_| src);
    }

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
    ) {
        let source = region.texture.0;
        let target = self.target_index();
        if source >= self.textures.len() {
            log::warn!("Renderer: draw_image with unknown texture {:?}, ignored", region.texture);
            return;
        }
        if source == target {
            log::warn!("Renderer: cannot draw a surface into itself, ignored");
            return;
        }
        if sw <= 0.0 || sh <= 0.0 {
            return;
        }

        let state = self.contexts.state.current;
        let (u0, v0) = (region.x + sx, region.y + sy);
        let smoothing = self.smoothing;
        let (dst, src) = target_and_source(&mut self.textures, target, source);

        rasterize(dst, &state.transform, [dx, dy, dw, dh], |local| {
            let u = u0 + (local.x - dx) / dw * sw;
            let v = v0 + (local.y - dy) / dh * sh;
            let mut texel = if smoothing {
                sample_bilinear(src, u, v)
            } else {
                sample_nearest(src, u, v)
            };
            texel[3] *= state.opacity;
            texel
        });
    }

    /// An empty image becomes a transparent 1x1 texture, as on the GPU.
    fn load_image(&mut self, image: &RgbaImage) -> TextureHandle {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            self.textures.push(RgbaImage::new(1, 1));
        } else {
            self.textures.push(image.clone());
        }
        TextureHandle(self.textures.len() - 1)
    }

    fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures.get(texture.0).map(|t| t.dimensions())
    }

    fn create_surface(&mut self, width: u32, height: u32) -> TextureHandle {
        self.textures.push(RgbaImage::new(width.max(1), height.max(1)));
        TextureHandle(self.textures.len() - 1)
    }

    fn set_context(&mut self, surface: TextureHandle) {
        if surface.0 >= self.textures.len() {
            log::warn!("Renderer: set_context with unknown surface {surface:?}, ignored");
            return;
        }
        self.contexts.push(surface);
    }

    fn restore_context(&mut self) {
        self.contexts.pop();
    }

    fn clear(&mut self, color: Color) {
        let pixel = Rgba(color.to_array().map(to_channel));
        let target = self.target_index();
        for p in self.textures[target].pixels_mut() {
            *p = pixel;
        }
    }

    fn read_pixels(&mut self) -> Result<RgbaImage, RenderError> {
        Ok(self.textures[self.target_index()].clone())
    }
}

/// Shade every pixel whose centre maps inside `rect` (x, y, w, h) under
/// `transform`.
fn rasterize(
    target: &mut RgbaImage,
    transform: &Affine2,
    rect: [f32; 4],
    mut shade: impl FnMut(Vec2) -> [f32; 4],
) {
    let [x, y, w, h] = rect;
    if w <= 0.0 || h <= 0.0 || transform.matrix2.determinant().abs() <= f32::EPSILON {
        return;
    }
    let inverse = transform.inverse();
    let corners = quad_corners(transform, x, y, w, h);
    let lo = corners.iter().fold(Vec2::splat(f32::INFINITY), |m, c| m.min(*c));
    let hi = corners.iter().fold(Vec2::splat(f32::NEG_INFINITY), |m, c| m.max(*c));

    let (tw, th) = target.dimensions();
    let x0 = lo.x.floor().max(0.0) as u32;
    let y0 = lo.y.floor().max(0.0) as u32;
    let x1 = (hi.x.ceil().max(0.0) as u32).min(tw);
    let y1 = (hi.y.ceil().max(0.0) as u32).min(th);

    for py in y0..y1 {
        for px in x0..x1 {
            let local = inverse.transform_point2(Vec2::new(px as f32 + 0.5, py as f32 + 0.5));
            if local.x < x || local.x >= x + w || local.y < y || local.y >= y + h {
                continue;
            }
            blend(target.get_pixel_mut(px, py), shade(local));
        }
    }
}

/// Straight-alpha source-over, the same equation as `wgpu::BlendState::ALPHA_BLENDING`.
fn blend(dst: &mut Rgba<u8>, src: [f32; 4]) {
    let a = src[3].clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }
    let d = dst.0.map(|c| c as f32 / 255.0);
    let out = [
        src[0] * a + d[0] * (1.0 - a),
        src[1] * a + d[1] * (1.0 - a),
        src[2] * a + d[2] * (1.0 - a),
        a + d[3] * (1.0 - a),
    ];
    dst.0 = out.map(to_channel);
}

fn to_channel(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn texel(tex: &RgbaImage, x: i64, y: i64) -> [f32; 4] {
    let (w, h) = tex.dimensions();
    let x = x.clamp(0, w as i64 - 1) as u32;
    let y = y.clamp(0, h as i64 - 1) as u32;
    tex.get_pixel(x, y).0.map(|c| c as f32 / 255.0)
}

fn sample_nearest(tex: &RgbaImage, u: f32, v: f32) -> [f32; 4] {
    texel(tex, u.floor() as i64, v.floor() as i64)
}

fn sample_bilinear(tex: &RgbaImage, u: f32, v: f32) -> [f32; 4] {
    let fx = u - 0.5;
    let fy = v - 0.5;
    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let a = texel(tex, x0, y0);
    let b = texel(tex, x0 + 1, y0);
    let c = texel(tex, x0, y0 + 1);
    let d = texel(tex, x0 + 1, y0 + 1);

    let mut out = [0.0; 4];
    for i in 0..4 {
        let top = a[i] + (b[i] - a[i]) * tx;
        let bottom = c[i] + (d[i] - c[i]) * tx;
        out[i] = top + (bottom - top) * ty;
    }
    out
}

/// Mutable target and shared source out of the same texture list.
fn target_and_source(
    textures: &mut [RgbaImage],
    target: usize,
    source: usize,
) -> (&mut RgbaImage, &RgbaImage) {
    if target < source {
        let (lo, hi) = textures.split_at_mut(source);
        (&mut lo[target], &hi[0])
    } else {
        let (lo, hi) = textures.split_at_mut(target);
        (&mut hi[0], &lo[source])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_log;

    fn checker() -> RgbaImage {
        // 2x2: red, green / blue, white
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        img.put_pixel(0, 1, Rgba([0, 0, 255, 255]));
        img.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        img
    }

    #[test]
    fn fill_rect_covers_half_open_pixels() {
        let mut r = SoftwareRenderer::new(8, 8, false);
        r.fill_rect(Color::GREEN, 2.0, 2.0, 3.0, 3.0);
        let px = r.frame();
        assert_eq!(px.get_pixel(2, 2).0, [0, 255, 0, 255]);
        assert_eq!(px.get_pixel(4, 4).0, [0, 255, 0, 255]);
        assert_eq!(px.get_pixel(5, 5).0, [0, 0, 0, 0]);
        assert_eq!(px.get_pixel(1, 2).0, [0, 0, 0, 0]);
    }

    #[test]
    fn transform_and_opacity_apply_to_fills() {
        let mut r = SoftwareRenderer::new(8, 8, false);
        r.clear(Color::BLACK);
        r.save();
        r.translate(4.0, 0.0);
        r.scale(2.0, 1.0);
        r.set_opacity(0.5);
        r.fill_rect(Color::WHITE, 0.0, 0.0, 1.0, 1.0);
        r.restore();
        let px = r.frame();
        assert_eq!(px.get_pixel(4, 0).0, [128, 128, 128, 255]);
        assert_eq!(px.get_pixel(5, 0).0, [128, 128, 128, 255]);
        assert_eq!(px.get_pixel(6, 0).0, [0, 0, 0, 255]);
        assert_eq!(r.opacity(), 1.0);
    }

    #[test]
    fn rotated_fill_lands_where_the_transform_puts_it() {
        let mut r = SoftwareRenderer::new(8, 8, false);
        r.translate(4.0, 4.0);
        r.rotate(std::f32::consts::FRAC_PI_2);
        // Local +x becomes screen +y.
        r.fill_rect(Color::RED, 0.0, 0.0, 3.0, 1.0);
        let px = r.frame();
        assert_eq!(px.get_pixel(3, 5).0, [255, 0, 0, 255]);
        assert_eq!(px.get_pixel(5, 5).0, [0, 0, 0, 0]);
    }

    #[test]
    fn draw_image_nearest_scales_texels() {
        let mut r = SoftwareRenderer::new(4, 4, false);
        let tex = r.load_image(&checker());
        let region = ImageRegion::whole(tex, 2, 2);
        r.draw_image(&region, 0.0, 0.0, 2.0, 2.0, 0.0, 0.0, 4.0, 4.0);
        let px = r.frame();
        assert_eq!(px.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(px.get_pixel(1, 1).0, [255, 0, 0, 255]);
        assert_eq!(px.get_pixel(2, 0).0, [0, 255, 0, 255]);
        assert_eq!(px.get_pixel(0, 3).0, [0, 0, 255, 255]);
        assert_eq!(px.get_pixel(3, 3).0, [255, 255, 255, 255]);
    }

    #[test]
    fn draw_image_uses_region_offset() {
        let mut r = SoftwareRenderer::new(1, 1, false);
        let tex = r.load_image(&checker());
        let region = ImageRegion {
            texture: tex,
            x: 1.0,
            y: 1.0,
            width: 1.0,
            height: 1.0,
        };
        r.draw_image(&region, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0);
        assert_eq!(r.frame().get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn bilinear_blends_neighbouring_texels() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([255, 255, 255, 255]));
        // Sampling exactly between the two texel centres gives the midpoint.
        let mid = sample_bilinear(&img, 1.0, 0.5);
        assert!((mid[0] - 0.5).abs() < 1e-5);
        // Clamp to edge past the last centre.
        let edge = sample_bilinear(&img, 2.0, 0.5);
        assert!((edge[0] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn surfaces_are_independent_targets_and_sources() {
        let mut r = SoftwareRenderer::new(4, 4, false);
        let surface = r.create_surface(2, 2);
        r.translate(100.0, 100.0);
        r.set_context(surface);
        // Fresh state in the surface: the translate above does not apply.
        r.fill_rect(Color::BLUE, 0.0, 0.0, 2.0, 2.0);
        assert_eq!(r.size(), (2, 2));
        r.restore_context();
        assert_eq!(r.size(), (4, 4));

        // The screen's translation survived the detour.
        r.translate(-99.0, -99.0);
        let region = ImageRegion::whole(surface, 2, 2);
        r.draw_image(&region, 0.0, 0.0, 2.0, 2.0, 0.0, 0.0, 2.0, 2.0);
        let px = r.frame();
        assert_eq!(px.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(px.get_pixel(1, 1).0, [0, 0, 255, 255]);
        assert_eq!(px.get_pixel(2, 2).0, [0, 0, 255, 255]);
    }

    #[test]
    fn drawing_a_surface_into_itself_is_rejected() {
        test_log::capture();
        let mut r = SoftwareRenderer::new(4, 4, false);
        let surface = r.create_surface(2, 2);
        r.set_context(surface);
        r.fill_rect(Color::RED, 0.0, 0.0, 2.0, 2.0);
        let before = r.read_pixels().unwrap();
        r.draw_image(&ImageRegion::whole(surface, 2, 2), 0.0, 0.0, 2.0, 2.0, 1.0, 1.0, 2.0, 2.0);
        assert_eq!(r.read_pixels().unwrap(), before);
        assert!(test_log::logged(log::Level::Warn, "into itself"));
    }

    #[test]
    fn empty_image_loads_as_transparent_texel() {
        for smoothing in [false, true] {
            let mut r = SoftwareRenderer::new(4, 4, smoothing);
            let empty = r.load_image(&RgbaImage::new(0, 0));
            assert_eq!(r.texture_size(empty), Some((1, 1)));
            let region = ImageRegion::whole(empty, 1, 1);
            r.draw_image(&region, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 4.0, 4.0);
            assert!(r.frame().pixels().all(|p| p.0 == [0, 0, 0, 0]));
        }
    }

    #[test]
    fn translucent_fill_blends_over_existing_pixels() {
        let mut r = SoftwareRenderer::new(1, 1, false);
        r.clear(Color::BLUE);
        r.fill_rect(Color::rgba(1.0, 0.0, 0.0, 0.25), 0.0, 0.0, 1.0, 1.0);
        assert_eq!(r.frame().get_pixel(0, 0).0, [64, 0, 191, 255]);
    }
}

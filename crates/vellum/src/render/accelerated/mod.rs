//! # Accelerated Back End — wgpu Quads
//!
//! Implements [`Renderer`] on the GPU. Draw calls are turned into quads on the
//! CPU (corners pre-multiplied by the current transform, opacity folded into
//! the tint) and queued in a [`QuadBatch`]. The queue is flushed as one render
//! pass into the current target whenever ordering with other GPU work matters:
//!
//! ```text
//!   fill_rect / draw_image ──► QuadBatch (CPU)
//!                                  │
//!   set_context / restore_context  │ flush: write camera uniform,
//!   clear / read_pixels ───────────┴─► upload buffers, one pass,
//!                                      draw_indexed per texture batch
//! ```
//!
//! Coverage (pixel centres inside the quad), nearest / linear clamp-to-edge
//! sampling and `ALPHA_BLENDING` into `Rgba8Unorm` targets are the same rules
//! the software rasterizer follows.

mod batch;
mod gpu;
mod pipeline;
mod texture;
mod vertex;

use std::sync::mpsc;

use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::error::RenderError;
use crate::math::Color;

use super::state::{ContextStack, quad_corners};
use super::{BackendKind, ImageRegion, Renderer, TextureHandle};

use batch::QuadBatch;
use gpu::GpuContext;
use pipeline::QuadPipeline;
use texture::{SCREEN, TextureStore, WHITE};
use vertex::CameraUniform;

/// GPU implementation of [`Renderer`].
pub struct AcceleratedRenderer {
    gpu: GpuContext,
    pipeline: QuadPipeline,
    textures: TextureStore,
    batch: QuadBatch,
    contexts: ContextStack,
}

impl AcceleratedRenderer {
    /// Probe the GPU and build every object the back end needs. Nothing is
    /// kept unless all of it succeeds.
    pub fn new(width: u32, height: u32, smoothing: bool) -> Result<Self, RenderError> {
        let gpu = GpuContext::new()?;
        let pipeline = QuadPipeline::new(&gpu, smoothing)?;
        let textures = TextureStore::new(&gpu, &pipeline, width, height);
        Ok(Self {
            gpu,
            pipeline,
            textures,
            batch: QuadBatch::default(),
            contexts: ContextStack::new(SCREEN),
        })
    }

    fn target(&self) -> TextureHandle {
        self.contexts.target
    }

    /// Send the queued quads to the current target.
    fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let Some(target) = self.textures.get(self.target()) else {
            self.batch.clear();
            return;
        };
        let device = &self.gpu.device;
        let queue = &self.gpu.queue;

        let camera = CameraUniform::for_target(target.width, target.height);
        queue.write_buffer(&self.pipeline.camera_buffer, 0, bytemuck::cast_slice(&[camera]));

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad vertex buffer"),
            contents: bytemuck::cast_slice(&self.batch.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad index buffer"),
            contents: bytemuck::cast_slice(&self.batch.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("quad flush encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("quad pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.pipeline.pipeline);
            pass.set_bind_group(0, &self.pipeline.camera_bind_group, &[]);
            pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);

            for batch in &self.batch.batches {
                let Some(entry) = self.textures.get(batch.texture) else {
                    continue;
                };
                pass.set_bind_group(1, &entry.bind_group, &[]);
                pass.draw_indexed(
                    batch.index_start..batch.index_start + batch.index_count,
                    0,
                    0..1,
                );
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        log::trace!(
            "Renderer: flushed {} batches ({} quads)",
            self.batch.batches.len(),
            self.batch.vertices.len() / 4
        );
        self.batch.clear();
    }

    fn readback(&self, handle: TextureHandle) -> Result<RgbaImage, RenderError> {
        let entry = self
            .textures
            .get(handle)
            .ok_or_else(|| RenderError::Readback(format!("unknown target {handle:?}")))?;
        let device = &self.gpu.device;
        let (width, height) = (entry.width, entry.height);

        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback buffer"),
            size: (padded * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &entry.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        let mapped = loop {
            device
                .poll(wgpu::PollType::Poll)
                .map_err(|e| RenderError::Readback(e.to_string()))?;
            match rx.try_recv() {
                Ok(result) => break result,
                Err(mpsc::TryRecvError::Empty) => std::thread::yield_now(),
                Err(mpsc::TryRecvError::Disconnected) => {
                    return Err(RenderError::Readback("map callback dropped".into()));
                }
            }
        };
        mapped.map_err(|e| RenderError::Readback(e.to_string()))?;

        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        buffer.unmap();

        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| RenderError::Readback("pixel buffer size mismatch".into()))
    }
}

impl Renderer for AcceleratedRenderer {
    fn backend(&self) -> BackendKind {
        BackendKind::Accelerated
    }

    fn size(&self) -> (u32, u32) {
        self.textures
            .get(self.target())
            .map_or((0, 0), |t| (t.width, t.height))
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
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let state = self.contexts.state.current;
        let corners = quad_corners(&state.transform, x, y, w, h);
        let tint = color.with_opacity(state.opacity).to_array();
        self.batch.push_quad(WHITE, corners, [[0.5, 0.5]; 4], tint);
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
        let Some(source) = self.textures.get(region.texture) else {
            log::warn!("Renderer: draw_image with unknown texture {:?}, ignored", region.texture);
            return;
        };
        if region.texture == self.target() {
            log::warn!("Renderer: cannot draw a surface into itself, ignored");
            return;
        }
        if dw <= 0.0 || dh <= 0.0 || sw <= 0.0 || sh <= 0.0 {
            return;
        }

        let (tw, th) = (source.width as f32, source.height as f32);
        let u0 = (region.x + sx) / tw;
        let v0 = (region.y + sy) / th;
        let u1 = (region.x + sx + sw) / tw;
        let v1 = (region.y + sy + sh) / th;

        let state = self.contexts.state.current;
        let corners = quad_corners(&state.transform, dx, dy, dw, dh);
        let uvs = [[u0, v0], [u1, v0], [u1, v1], [u0, v1]];
        self.batch
            .push_quad(region.texture, corners, uvs, [1.0, 1.0, 1.0, state.opacity]);
    }

    fn load_image(&mut self, image: &RgbaImage) -> TextureHandle {
        let (width, height) = image.dimensions();
        let data = (width > 0 && height > 0).then(|| image.as_raw().as_slice());
        self.textures
            .insert(&self.gpu, &self.pipeline, "image", width, height, data)
    }

    fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures.get(texture).map(|t| (t.width, t.height))
    }

    fn create_surface(&mut self, width: u32, height: u32) -> TextureHandle {
        self.textures
            .insert(&self.gpu, &self.pipeline, "surface", width, height, None)
    }

    fn set_context(&mut self, surface: TextureHandle) {
        if surface == WHITE || self.textures.get(surface).is_none() {
            log::warn!("Renderer: set_context with unknown surface {surface:?}, ignored");
            return;
        }
        self.flush();
        self.contexts.push(surface);
    }

    fn restore_context(&mut self) {
        self.flush();
        self.contexts.pop();
    }

    fn clear(&mut self, color: Color) {
        self.flush();
        let Some(target) = self.textures.get(self.target()) else {
            return;
        };
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: color.r as f64,
                            g: color.g as f64,
                            b: color.b as f64,
                            a: color.a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
    }

    fn read_pixels(&mut self) -> Result<RgbaImage, RenderError> {
        self.flush();
        self.readback(self.target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::SoftwareRenderer;
    use image::Rgba;

    /// `None` when the host has no usable GPU; those tests then pass vacuously.
    fn gpu(width: u32, height: u32, smoothing: bool) -> Option<AcceleratedRenderer> {
        match AcceleratedRenderer::new(width, height, smoothing) {
            Ok(r) => Some(r),
            Err(e) => {
                eprintln!("skipping accelerated test: {e}");
                None
            }
        }
    }

    fn assert_close(a: &RgbaImage, b: &RgbaImage) {
        assert_eq!(a.dimensions(), b.dimensions());
        for (x, y, pa) in a.enumerate_pixels() {
            let pb = b.get_pixel(x, y);
            for c in 0..4 {
                let diff = (pa.0[c] as i16 - pb.0[c] as i16).abs();
                assert!(diff <= 2, "pixel ({x},{y}) differs: {:?} vs {:?}", pa.0, pb.0);
            }
        }
    }

    fn sprite_sheet() -> RgbaImage {
        RgbaImage::from_fn(4, 2, |x, y| {
            Rgba([(x * 60) as u8, (y * 200) as u8, 90, if x == 3 { 128 } else { 255 }])
        })
    }

    /// The same call sequence, replayed on any back end.
    fn scene(r: &mut dyn Renderer) -> RgbaImage {
        let tex = r.load_image(&sprite_sheet());
        r.clear(Color::rgba(0.1, 0.2, 0.3, 1.0));
        r.fill_rect(Color::RED, 1.0, 1.0, 6.0, 3.0);

        r.save();
        r.translate(2.0, 6.0);
        r.scale(2.0, 2.0);
        r.set_opacity(0.5);
        r.fill_rect(Color::GREEN, 0.0, 0.0, 3.0, 2.0);
        r.restore();

        let region = ImageRegion::whole(tex, 4, 2);
        r.draw_image(&region, 0.0, 0.0, 4.0, 2.0, 8.0, 8.0, 8.0, 4.0);

        let surface = r.create_surface(4, 4);
        r.set_context(surface);
        r.fill_rect(Color::BLUE, 0.0, 0.0, 2.0, 4.0);
        r.restore_context();
        r.set_opacity(0.75);
        r.draw_image(&ImageRegion::whole(surface, 4, 4), 0.0, 0.0, 4.0, 4.0, 10.0, 0.0, 4.0, 4.0);

        r.read_pixels().unwrap()
    }

    #[test]
    fn matches_software_back_end() {
        let Some(mut gpu) = gpu(16, 16, false) else {
            return;
        };
        let mut cpu = SoftwareRenderer::new(16, 16, false);
        assert_close(&scene(&mut gpu), &scene(&mut cpu));
    }

    #[test]
    fn surfaces_start_transparent() {
        let Some(mut gpu) = gpu(4, 4, false) else {
            return;
        };
        let surface = gpu.create_surface(3, 2);
        gpu.set_context(surface);
        let pixels = gpu.read_pixels().unwrap();
        assert_eq!(pixels.dimensions(), (3, 2));
        assert!(pixels.pixels().all(|p| p.0 == [0, 0, 0, 0]));
        gpu.restore_context();
        assert_eq!(gpu.size(), (4, 4));
    }

    #[test]
    fn readback_handles_unaligned_rows() {
        let Some(mut gpu) = gpu(5, 3, false) else {
            return;
        };
        gpu.fill_rect(Color::WHITE, 4.0, 2.0, 1.0, 1.0);
        let pixels = gpu.read_pixels().unwrap();
        assert_eq!(pixels.get_pixel(4, 2).0, [255, 255, 255, 255]);
        assert_eq!(pixels.get_pixel(3, 2).0, [0, 0, 0, 0]);
    }
}

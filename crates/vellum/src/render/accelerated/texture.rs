//! # Texture — Images and Surfaces on the GPU
//!
//! Every texture the accelerated back end knows about lives in one
//! [`TextureStore`], indexed by [`TextureHandle`]:
//!
//! ```text
//!   0  white 1x1      sampled by fill_rect
//!   1  main frame     render target
//!   2… loaded images and off-screen surfaces, in creation order
//! ```
//!
//! All entries share one format and one usage set, so any of them can be a
//! render target, a sampled source, or the source of a readback. Each entry
//! carries a ready-made bind group for group 1 of the quad pipeline.

use wgpu::util::DeviceExt;

use crate::render::TextureHandle;

use super::gpu::{GpuContext, TARGET_FORMAT};
use super::pipeline::QuadPipeline;

pub(crate) const WHITE: TextureHandle = TextureHandle(0);
pub(crate) const SCREEN: TextureHandle = TextureHandle(1);

pub(crate) struct TextureEntry {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub bind_group: wgpu::BindGroup,
    pub width: u32,
    pub height: u32,
}

pub(crate) struct TextureStore {
    entries: Vec<TextureEntry>,
}

impl TextureStore {
    /// A store holding the white texture and a transparent main frame.
    pub fn new(gpu: &GpuContext, pipeline: &QuadPipeline, width: u32, height: u32) -> Self {
        let mut store = Self {
            entries: Vec::new(),
        };
        store.insert(gpu, pipeline, "white 1x1", 1, 1, Some(&[255, 255, 255, 255]));
        store.insert(gpu, pipeline, "main frame", width, height, None);
        store
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&TextureEntry> {
        self.entries.get(handle.0)
    }

    /// Upload a texture. `data` is tightly packed RGBA8; `None` leaves the
    /// texture zeroed (transparent).
    pub fn insert(
        &mut self,
        gpu: &GpuContext,
        pipeline: &QuadPipeline,
        label: &str,
        width: u32,
        height: u32,
        data: Option<&[u8]>,
    ) -> TextureHandle {
        let width = width.max(1);
        let height = height.max(1);
        let descriptor = wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        };

        let texture = match data {
            Some(data) => gpu.device.create_texture_with_data(
                &gpu.queue,
                &descriptor,
                wgpu::util::TextureDataOrder::LayerMajor,
                data,
            ),
            None => gpu.device.create_texture(&descriptor),
        };

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &pipeline.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&pipeline.sampler),
                },
            ],
        });

        let handle = TextureHandle(self.entries.len());
        self.entries.push(TextureEntry {
            texture,
            view,
            bind_group,
            width,
            height,
        });
        handle
    }
}

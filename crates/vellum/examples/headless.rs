//! Headless — build a small scene, step it and save the last frame as a PNG.
//!
//! ```text
//! RUST_LOG=info cargo run --example headless -- [config.json] [out.png]
//! ```

use vellum::prelude::*;
use vellum::render;

/// Turns its owner a little every frame.
struct Spin(f32);

impl Component for Spin {
    fn update(&mut self, owner: &mut Node, data: &mut FrameData<'_>) {
        owner.rotation += self.0 * data.speed;
    }
}

fn checkerboard(size: u32) -> image::RgbaImage {
    image::RgbaImage::from_fn(size, size, |x, y| {
        if (x / 4 + y / 4) % 2 == 0 {
            image::Rgba([240, 200, 60, 255])
        } else {
            image::Rgba([40, 40, 60, 255])
        }
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let out = args.next().unwrap_or_else(|| "headless.png".to_string());

    let (width, height) = (config.renderer.width, config.renderer.height);
    let mut renderer = render::setup(width, height, &config.renderer);
    log::info!("Using {:?} back end", renderer.backend());

    let board = renderer.load_image(&checkerboard(32));
    let mut stage = Stage::new();

    stage.add(
        Entity::new(EntityConfig {
            name: Some("background".into()),
            dimension: Size::new(width as f32, height as f32),
            ..Default::default()
        })
        .with(Fill::solid(Color::rgb(0.1, 0.1, 0.15))),
    )?;

    let mut panel = Entity::new(EntityConfig {
        name: Some("panel".into()),
        position: Vec2::new(width as f32 / 2.0, height as f32 / 2.0),
        dimension: Size::new(96.0, 96.0),
        ..Default::default()
    })
    .with(Anchor::CENTER)
    .with(Spin(0.03))
    .with(Fill::solid(Color::rgba(0.2, 0.6, 1.0, 0.8)));

    panel.attach(
        Entity::new(EntityConfig {
            position: Vec2::new(16.0, 16.0),
            dimension: Size::new(64.0, 64.0),
            alpha: 0.9,
            ..Default::default()
        })
        .with(Sprite::new(ImageRegion::whole(board, 32, 32))),
        false,
    )?;
    panel.attach(Fill::stroke(Color::WHITE), false)?;
    stage.add(panel)?;

    for _ in 0..30 {
        renderer.clear(Color::BLACK);
        stage.step(1.0, renderer.as_mut());
    }

    let frame = renderer.read_pixels()?;
    frame.save(&out)?;
    log::info!("Wrote {out} after {} frames", stage.frame());
    Ok(())
}

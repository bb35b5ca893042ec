//! Render one frame offscreen with the wgpu backend.
//!
//! Optionally loads `<dir>/sprites.{txt,png}` and `<dir>/font.{json,png}`:
//!
//! ```sh
//! cargo run -p glint-render --example headless -- assets/
//! ```

use std::sync::Arc;

use glint_core::{Color, logging};
use glint_render::{DirAssetSource, FrameDriver, RendererConfig, WgpuBackend};
use glint_test_utils::FastRandom;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let (width, height) = (800, 600);
    let backend = Arc::new(WgpuBackend::headless(width, height)?);
    let config = RendererConfig::default().with_clear_color(Color::rgb(0.05, 0.05, 0.08));
    let mut driver = FrameDriver::new(backend, config, width, height)?;

    let assets = std::env::args().nth(1).map(DirAssetSource::new);
    if let Some(assets) = &assets {
        driver.load_sprite_sheet(assets, "sprites")?;
        driver.load_font(assets, "font")?;
    }

    let mut rng = FastRandom::new(42);
    for frame in 0..5 {
        let stats = driver.run_frame(|canvas| {
            for _ in 0..200 {
                let x = rng.next_f32(-380.0, 380.0);
                let y = rng.next_f32(-280.0, 280.0);
                let color = [rng.next_u8(64, 255), rng.next_u8(64, 255), rng.next_u8(64, 255), 255];
                canvas.draw_primitive_circle(x, y, rng.next_f32(2.0, 12.0), color)?;
            }
            if let Some(atlas) = canvas.sprite_atlas().cloned() {
                for (i, name) in atlas.names().take(16).enumerate() {
                    let x = -360.0 + i as f32 * 48.0;
                    canvas.draw_sprite(name, x, 240.0, 40.0, 40.0, Color::WHITE, frame as f32 * 0.1)?;
                }
            }
            canvas.draw_primitive_rounded_rect(-200.0, -40.0, 400.0, 80.0, 12.0, [30u8, 30, 40, 230])?;
            canvas.draw_primitive_rect_lines(-200.0, -40.0, 400.0, 80.0, 2.0, Color::WHITE)?;
            canvas.draw_primitive_circle_lines(0.0, 0.0, 150.0, 4.0, Color::GREEN)?;
            canvas.draw_primitive_line(-300.0, -250.0, 300.0, 250.0, 3.0, Color::BLUE)?;
            if canvas.font().is_some() {
                let bounds = canvas.measure_text("glint", 48.0)?;
                canvas.draw_text("glint", -bounds.width / 2.0, bounds.height / 2.0, 48.0, Color::WHITE)?;
            }
            Ok(())
        })?;
        tracing::info!("frame {}: {:?}", frame, stats);
    }

    driver.shutdown();
    Ok(())
}

//! Benchmarks for draw-call batching

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glint_core::Color;
use glint_core::math::Mat4;
use glint_render::{Canvas, FrameDriver, PixelRect, RendererConfig, SpriteAtlas};
use glint_test_utils::{FastRandom, ImageData, MockBackend};

fn canvas() -> Canvas {
    let mut canvas = Canvas::new(&RendererConfig::default()).unwrap();
    canvas.set_sprite_atlas(Arc::new(SpriteAtlas::new(
        256,
        256,
        [("particle".to_string(), PixelRect::new(0.0, 0.0, 16.0, 16.0))],
    )));
    canvas
}

fn bench_same_pipeline_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("same_pipeline_run");

    for count in [1_000u32, 10_000, 50_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut canvas = canvas();
            let mut rng = FastRandom::new(7);
            b.iter(|| {
                canvas.begin_frame(Mat4::IDENTITY);
                for _ in 0..count {
                    let _ = canvas.draw_primitive_circle(
                        rng.next_f32(-400.0, 400.0),
                        rng.next_f32(-300.0, 300.0),
                        4.0,
                        Color::WHITE,
                    );
                }
                black_box(canvas.batches().len())
            });
        });
    }

    group.finish();
}

fn bench_interleaved_pipelines(c: &mut Criterion) {
    let mut group = c.benchmark_group("interleaved_pipelines");

    for count in [1_000u32, 10_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let config = RendererConfig::default().with_max_batches(count as usize);
            let mut canvas = Canvas::new(&config).unwrap();
            canvas.set_sprite_atlas(Arc::new(SpriteAtlas::new(
                256,
                256,
                [("particle".to_string(), PixelRect::new(0.0, 0.0, 16.0, 16.0))],
            )));
            b.iter(|| {
                canvas.begin_frame(Mat4::IDENTITY);
                for i in 0..count / 2 {
                    let x = i as f32;
                    let _ = canvas.draw_sprite("particle", x, 0.0, 8.0, 8.0, Color::WHITE, 0.0);
                    let _ = canvas.draw_primitive_rect(x, 0.0, 8.0, 8.0, Color::RED);
                }
                black_box(canvas.batches().len())
            });
        });
    }

    group.finish();
}

fn bench_full_frame_mock(c: &mut Criterion) {
    let mock = Arc::new(MockBackend::auto_completing());
    let mut driver = FrameDriver::new(mock.clone(), RendererConfig::default(), 1280, 720).unwrap();
    driver
        .set_sprite_sheet(
            SpriteAtlas::new(
                256,
                256,
                [("particle".to_string(), PixelRect::new(0.0, 0.0, 16.0, 16.0))],
            ),
            &ImageData::solid(256, 256, [255; 4]),
        )
        .unwrap();

    c.bench_function("full_frame_10k_sprites", |b| {
        b.iter(|| {
            mock.clear_calls();
            let stats = driver
                .run_frame(|canvas| {
                    for i in 0..10_000 {
                        let angle = i as f32 * 0.01;
                        canvas.draw_sprite("particle", angle.cos() * 300.0, angle.sin() * 300.0, 8.0, 8.0, Color::WHITE, angle)?;
                    }
                    Ok(())
                })
                .unwrap();
            black_box(stats)
        });
    });

    driver.shutdown();
}

criterion_group!(
    benches,
    bench_same_pipeline_run,
    bench_interleaved_pipelines,
    bench_full_frame_mock
);
criterion_main!(benches);

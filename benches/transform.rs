use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lumaterm::{Effect, Frame, TransformStage};

fn bench_transform(c: &mut Criterion) {
    let (width, height) = (640u32, 360u32);
    let pixels: Vec<u8> = (0..width * height * 4).map(|i| (i % 251) as u8).collect();
    let frame = Frame::from_bytes(pixels, width, height, 1);

    let mut group = c.benchmark_group("transform");
    for effect in [
        Effect::None,
        Effect::Invert,
        Effect::Threshold,
        Effect::Posterize,
        Effect::Contrast,
        Effect::Edges,
    ] {
        group.bench_function(effect.as_str(), |b| {
            let mut stage = TransformStage::new(96, 54).unwrap();
            b.iter(|| {
                let out = stage.process(black_box(&frame), effect, false).unwrap();
                black_box(out.luminance().len());
            });
        });
    }
    group.bench_function("mirror", |b| {
        let mut stage = TransformStage::new(96, 54).unwrap();
        b.iter(|| {
            let out = stage.process(black_box(&frame), Effect::None, true).unwrap();
            black_box(out.luminance().len());
        });
    });
    group.finish();
}

criterion_group!(benches, bench_transform);
criterion_main!(benches);

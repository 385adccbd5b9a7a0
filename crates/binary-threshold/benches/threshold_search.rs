use binary_threshold::{AdaptiveThreshold, ThresholdConfig};
use camera_capture::VideoFrame;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Synthetic 1280x270 road ROI: grey asphalt, two bright stripes, a sunny patch
fn road_roi() -> VideoFrame {
    let (width, height) = (1280u32, 270u32);
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let px = if (300..312).contains(&x) || (960..972).contains(&x) {
                [230, 225, 210]
            } else if x > 600 && x < 700 && y > 200 {
                [170, 165, 160]
            } else {
                [90, 90, 95]
            };
            data.extend_from_slice(&px);
        }
    }
    VideoFrame::new(data, width, height, 0, 0)
}

fn bench_threshold(c: &mut Criterion) {
    let roi = road_roi();

    c.bench_function("threshold_cold_start", |b| {
        b.iter(|| {
            let mut bt = AdaptiveThreshold::new(ThresholdConfig::default());
            black_box(bt.apply(black_box(&roi)))
        })
    });

    c.bench_function("threshold_warm_start", |b| {
        let mut bt = AdaptiveThreshold::new(ThresholdConfig::default());
        bt.apply(&roi);
        b.iter(|| black_box(bt.apply(black_box(&roi))))
    });
}

criterion_group!(benches, bench_threshold);
criterion_main!(benches);

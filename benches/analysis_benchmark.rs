use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{GrayImage, Luma};
use wisdom::types::{AnalysisConfig, DeskewConfig};
use wisdom::{DeskewSearch, OrientationTransform};

/// A working-size mask with `lines` dashed rows of ink tilted by `tilt` degrees.
fn synthetic_mask(lines: u32, tilt: f64) -> GrayImage {
    let (width, height) = (200u32, 120u32);
    let mut img = GrayImage::new(width, height);
    let (sin, cos) = tilt.to_radians().sin_cos();
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    for line in 0..lines {
        let offset = (line as f64 - (lines as f64 - 1.0) / 2.0) * 18.0;
        for t in -80..80 {
            if t % 9 >= 6 {
                continue;
            }
            for n in 0..4 {
                let along = t as f64;
                let across = offset + n as f64;
                let x = cx + along * cos - across * sin;
                let y = cy + along * sin + across * cos;
                if x >= 0.0 && y >= 0.0 && x < width as f64 && y < height as f64 {
                    img.put_pixel(x as u32, y as u32, Luma([255]));
                }
            }
        }
    }
    img
}

fn benchmark_deskew(c: &mut Criterion) {
    let mut group = c.benchmark_group("deskew_search");
    group.sample_size(10);

    let search = DeskewSearch::from_config(&DeskewConfig::default());
    for tilt in [0.0, 12.0, 40.0] {
        let mask = synthetic_mask(4, tilt);
        group.bench_with_input(BenchmarkId::from_parameter(tilt), &mask, |b, mask| {
            b.iter(|| search.search(black_box(mask)).expect("search failed"))
        });
    }

    group.finish();
}

fn benchmark_orientation(c: &mut Criterion) {
    let mut group = c.benchmark_group("orientation_transform");
    group.sample_size(20);

    let mask = synthetic_mask(4, 0.0);
    let centroid = AnalysisConfig::default().orientation.center_on_centroid;
    for center_on_centroid in [centroid, !centroid] {
        let transform = OrientationTransform::new(center_on_centroid);
        group.bench_function(format!("centroid={center_on_centroid}"), |b| {
            b.iter(|| transform.transform(black_box(&mask)).mirrored())
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_deskew, benchmark_orientation);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use imgly_enhance::{
    adjust::{color, convolve, gamma, histogram},
    AdjustmentParameters, AdjustmentPipeline, AlphaMask, BackgroundMode, Compositor, Image, RgbColor,
    SharpenMode,
};

const SIZES: [u32; 3] = [256, 512, 1024];

fn gradient(size: u32) -> Image {
    let mut image = image::RgbImage::new(size, size);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        *pixel = image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8]);
    }
    Image::Rgb(image)
}

fn radial_mask(size: u32) -> AlphaMask {
    let center = size as f32 / 2.0;
    let mut data = Vec::with_capacity((size * size) as usize);
    for y in 0..size {
        for x in 0..size {
            let distance = ((x as f32 - center).powi(2) + (y as f32 - center).powi(2)).sqrt();
            data.push(if distance < center * 0.6 { 255 } else { 0 });
        }
    }
    AlphaMask::new(data, (size, size))
}

fn bench_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("stages");
    for size in SIZES {
        let image = gradient(size);
        group.bench_with_input(BenchmarkId::new("saturation", size), &image, |b, image| {
            b.iter(|| color::saturation(black_box(image), 1.4));
        });
        group.bench_with_input(BenchmarkId::new("sharpen_kernel", size), &image, |b, image| {
            b.iter(|| convolve::sharpen(black_box(image), 1.5, SharpenMode::ScaledKernel));
        });
        group.bench_with_input(BenchmarkId::new("gamma", size), &image, |b, image| {
            b.iter(|| gamma::apply_gamma(black_box(image), 1.29));
        });
        group.bench_with_input(BenchmarkId::new("equalize", size), &image, |b, image| {
            b.iter(|| histogram::equalize(black_box(image)));
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let full = AdjustmentPipeline::new(
        AdjustmentParameters::builder()
            .brightness(1.1)
            .contrast(1.2)
            .saturation(1.3)
            .sharpness(1.4)
            .gamma(0.9)
            .equalize_histogram(true)
            .build(),
    );
    let showcase = AdjustmentPipeline::new(AdjustmentParameters::showcase());

    for size in SIZES {
        let image = gradient(size);
        group.bench_with_input(BenchmarkId::new("all_stages", size), &image, |b, image| {
            b.iter(|| full.run(black_box(image)));
        });
        group.bench_with_input(BenchmarkId::new("showcase", size), &image, |b, image| {
            b.iter(|| showcase.run(black_box(image)));
        });
    }
    group.finish();
}

fn bench_compositing(c: &mut Criterion) {
    let mut group = c.benchmark_group("compositing");
    let background = BackgroundMode::Image(gradient(300));
    let solid = BackgroundMode::SolidColor(RgbColor::new(0, 249, 0));

    for size in SIZES {
        let foreground = gradient(size);
        let mask = radial_mask(size);
        group.bench_with_input(BenchmarkId::new("solid", size), &size, |b, _| {
            b.iter(|| Compositor::composite(black_box(&foreground), Some(&mask), &solid));
        });
        group.bench_with_input(BenchmarkId::new("resized_image", size), &size, |b, _| {
            b.iter(|| Compositor::composite(black_box(&foreground), Some(&mask), &background));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_stages, bench_pipeline, bench_compositing);
criterion_main!(benches);

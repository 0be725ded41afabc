use std::hint::black_box;

use cbir::codec::{FeatureCodec, FeatureRecord, FloatFormat};
use cbir::distance::{euclidean_distance, histogram_intersection};
use cbir::features::{
    ColorSpace, center_patch, color_histogram, edge_feature, hue_saturation_histogram,
    lbp_histogram, multi_part_histogram, texture_and_color,
};
use cbir::image::Image;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};

fn sample_image() -> Image {
    Image::from_fn(480, 640, |r, c| [(r % 256) as u8, (c % 256) as u8, ((r * c) % 256) as u8])
}

fn benchmark_extract(c: &mut Criterion) {
    let image = sample_image();

    let mut group = c.benchmark_group("特征提取");
    group.throughput(Throughput::Elements(1));
    group.bench_function("中心块", |b| b.iter(|| center_patch(black_box(&image))));
    group.bench_function("BGR 直方图", |b| {
        b.iter(|| color_histogram(black_box(&image), 8, ColorSpace::Bgr))
    });
    group.bench_function("HSV 直方图", |b| {
        b.iter(|| color_histogram(black_box(&image), 8, ColorSpace::Hsv))
    });
    group.bench_function("上下分块直方图", |b| {
        b.iter(|| multi_part_histogram(black_box(&image), 8))
    });
    group.bench_function("颜色与纹理", |b| {
        b.iter(|| texture_and_color(black_box(&image), 8, 16))
    });
    group.bench_function("色调-饱和度", |b| {
        b.iter(|| hue_saturation_histogram(black_box(&image)))
    });
    group.bench_function("LBP", |b| b.iter(|| lbp_histogram(black_box(&image))));
    group.bench_function("Canny", |b| b.iter(|| edge_feature(black_box(&image))));
    group.finish();
}

fn benchmark_compare(c: &mut Criterion) {
    let image = sample_image();
    let a = hue_saturation_histogram(&image).unwrap();
    let b = hue_saturation_histogram(&Image::filled(480, 640, [30, 60, 90])).unwrap();

    let mut group = c.benchmark_group("特征比较");
    group.throughput(Throughput::Elements(1));
    group.bench_function("欧氏距离", |bench| {
        bench.iter(|| euclidean_distance(black_box(&a), black_box(&b)))
    });
    group.bench_function("直方图交", |bench| {
        bench.iter(|| histogram_intersection(black_box(&a), black_box(&b)))
    });
    group.finish();
}

fn benchmark_codec(c: &mut Criterion) {
    let vector = hue_saturation_histogram(&sample_image()).unwrap();
    let record = FeatureRecord::new("/data/images/pic.0001.jpg", vector);

    let mut group = c.benchmark_group("特征编码");
    for format in [FloatFormat::Shortest, FloatFormat::Legacy] {
        let codec = FeatureCodec::new(format);
        group.bench_function(format!("{:?}", format), |b| {
            b.iter(|| codec.encode(black_box(&record)))
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_extract, benchmark_compare, benchmark_codec);
criterion_main!(benches);

//! Summary benchmarks
//!
//! The summary cost is dominated by the synthetic forward pass; these
//! compare it against a plain forward call on the same model.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use layerscope::nn::{Conv2d, Flatten, Linear, MaxPool2d, Module, ReLU, Sequential};
use layerscope::{RawTensor, summary};

fn mlp() -> Sequential {
    Sequential::new(vec![
        Box::new(Linear::new(784, 256, true)),
        Box::new(ReLU::new()),
        Box::new(Linear::new(256, 128, true)),
        Box::new(ReLU::new()),
        Box::new(Linear::new(128, 10, true)),
    ])
}

fn cnn() -> Sequential {
    Sequential::new(vec![
        Box::new(Conv2d::new(3, 8, 3, 1, 1, true)),
        Box::new(ReLU::new()),
        Box::new(MaxPool2d::new(2, 2, 0)),
        Box::new(Flatten::new()),
        Box::new(Linear::new(8 * 16 * 16, 10, true)),
    ])
}

fn bench_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("summary");

    group.bench_function("mlp_784", |b| {
        let model = mlp();
        let sizes = vec![vec![784]];
        b.iter(|| summary(black_box(&model), black_box(&sizes), -1, "cpu"));
    });

    group.bench_function("cnn_3x32x32", |b| {
        let model = cnn();
        let sizes = vec![vec![3, 32, 32]];
        b.iter(|| summary(black_box(&model), black_box(&sizes), 16, "cpu"));
    });

    group.finish();
}

fn bench_plain_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward");

    group.bench_function("mlp_784", |b| {
        let model = mlp();
        let input = RawTensor::rand(&[2, 784]);
        b.iter(|| black_box(&model).forward(black_box(&input)));
    });

    group.bench_function("cnn_3x32x32", |b| {
        let model = cnn();
        let input = RawTensor::rand(&[2, 3, 32, 32]);
        b.iter(|| black_box(&model).forward(black_box(&input)));
    });

    group.finish();
}

criterion_group!(benches, bench_summary, bench_plain_forward);
criterion_main!(benches);

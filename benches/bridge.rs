use burn::{
    backend::{ndarray::NdArrayDevice, NdArray},
    tensor::{Distribution, Tensor},
};
use burn_tagger::bridge::{repad_with_markers, unpad_and_trim, Lengths};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

type Backend = NdArray<f32>;

const BATCH_SIZE: usize = 32;
const SEQ_LENGTH: usize = 128;
const WIDTH: usize = 768;

fn lengths() -> Lengths {
    Lengths::new(
        (0..BATCH_SIZE)
            .map(|i| SEQ_LENGTH - (i * 7) % (SEQ_LENGTH - 2))
            .collect(),
    )
}

fn bench_bridge(c: &mut Criterion) {
    let device = NdArrayDevice::Cpu;
    let lengths = lengths();
    let padded = Tensor::<Backend, 3>::random(
        [BATCH_SIZE, SEQ_LENGTH, WIDTH],
        Distribution::Default,
        &device,
    );

    c.bench_function("unpad_and_trim", |b| {
        b.iter(|| unpad_and_trim(black_box(padded.clone()), black_box(&lengths)))
    });

    let trimmed = unpad_and_trim(padded, &lengths).unwrap_or_default();

    c.bench_function("repad_with_markers", |b| {
        b.iter(|| repad_with_markers(black_box(trimmed.clone())))
    });
}

criterion_group!(benches, bench_bridge);
criterion_main!(benches);

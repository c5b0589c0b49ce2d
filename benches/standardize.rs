use std::hint::black_box;
use criterion::{criterion_group, criterion_main, Criterion};
use eegstd::{
    AnnotationSet, EegSignal, Montage, RawRecording, ReferenceScheme, StandardizeConfig,
    Strictness, ELECTRODES_10_20,
};
use ndarray::{Array1, Array2};

/// 19 channels × 60 s at 250 Hz.
fn recording() -> RawRecording {
    let fs = 250.0;
    let data = Array2::from_shape_fn((ELECTRODES_10_20.len(), 15_000), |(c, t)| {
        let x = t as f64 / fs;
        (2.0 * std::f64::consts::PI * (3.0 + c as f64) * x).sin() * 50.0
    });
    RawRecording {
        channels: ELECTRODES_10_20.iter().map(|s| s.to_string()).collect(),
        data,
        fs,
        start_time: None,
    }
}

fn bench_standardize(c: &mut Criterion) {
    let raw = recording();
    let eeg = EegSignal::load(&raw, Montage::Unipolar, &ELECTRODES_10_20, Strictness::Strict).unwrap();

    c.bench_function("standardize 250→256 Hz, common average [19×15000]", |b| {
        b.iter(|| {
            let mut s = eeg.clone();
            s.standardize_with(black_box(&StandardizeConfig::default())).unwrap();
            black_box(s.n_samples())
        })
    });

    c.bench_function("standardize 250→256 Hz, bipolar [19×15000]", |b| {
        b.iter(|| {
            let mut s = eeg.clone();
            s.standardize(256.0, &ELECTRODES_10_20, black_box(&ReferenceScheme::Bipolar))
                .unwrap();
            black_box(s.n_channels())
        })
    });
}

fn bench_mask(c: &mut Criterion) {
    // One hour at 256 Hz with a seizure every ten minutes.
    let n = 3600 * 256;
    let mask = Array1::from_shape_fn(n, |i| u8::from(i % (600 * 256) < 30 * 256));
    c.bench_function("from_mask + to_mask [1 h @ 256 Hz]", |b| {
        b.iter(|| {
            let set = AnnotationSet::from_mask(black_box(mask.view()), 256.0).unwrap();
            black_box(set.to_mask(256.0).unwrap().len())
        })
    });
}

criterion_group!(benches, bench_standardize, bench_mask);
criterion_main!(benches);

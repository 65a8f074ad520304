//! cargo bench --bench analyze
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use redoscope::{Analyzer, Flags};

pub fn criterion_benchmark(c: &mut Criterion) {
    let analyzer = Analyzer::default();
    let run = |pattern: &str| analyzer.analyze(black_box(pattern), Flags::default());

    c.bench_function("analyze_safe_literal", |b| {
        b.iter(|| run(r"^\d{4}-\d{2}-\d{2}$"))
    });
    c.bench_function("analyze_safe_class_plus", |b| {
        b.iter(|| run(r"^[a-zA-Z0-9]+$"))
    });
    c.bench_function("analyze_exponential_nested_plus", |b| {
        b.iter(|| run(r"^(a+)+$"))
    });
    c.bench_function("analyze_exponential_overlap", |b| {
        b.iter(|| run(r"^(aa|b|aab)*$"))
    });
    c.bench_function("analyze_polynomial_wildcards", |b| {
        b.iter(|| run(r"^.*a.*a.*a$"))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

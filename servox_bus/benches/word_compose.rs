//! Benchmark for the register word composition hot path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use servox_bus::access::{combine_words, split_words};

fn bench_word_compose(c: &mut Criterion) {
    c.bench_function("split_u64_into_words", |b| {
        b.iter(|| split_words::<4>(black_box(0x0123_4567_89AB_CDEFu64)))
    });

    let words = [0xCDEFu16, 0x89AB, 0x4567, 0x0123];
    c.bench_function("combine_words_to_u64", |b| {
        b.iter(|| combine_words(black_box(&words)))
    });
}

criterion_group!(benches, bench_word_compose);
criterion_main!(benches);

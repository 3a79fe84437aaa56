use criterion::{Criterion, black_box, criterion_group, criterion_main};

use recode::convert;

fn bench_convert(c: &mut Criterion) {
    let ascii = "The quick brown fox jumps over the lazy dog. "
        .repeat(1400)
        .into_bytes();
    let japanese_utf8 = "こんにちは世界、日本語のテキストです。"
        .repeat(1100)
        .into_bytes();
    let japanese_sjis = convert(&japanese_utf8, "utf-8", "sjis").unwrap();

    c.bench_function("convert_latin1_to_utf8_64k", |b| {
        b.iter(|| convert(black_box(&ascii), "windows-1252", "utf-8").unwrap())
    });

    c.bench_function("convert_utf8_to_sjis_60k", |b| {
        b.iter(|| convert(black_box(&japanese_utf8), "utf-8", "sjis").unwrap())
    });

    c.bench_function("convert_sjis_to_utf8_40k", |b| {
        b.iter(|| convert(black_box(&japanese_sjis), "sjis", "utf-8").unwrap())
    });
}

criterion_group!(benches, bench_convert);
criterion_main!(benches);

//! # Front-end Benchmarks
//!
//! Measures lexing, parsing, rewriting and formatting of generated scripts.
//!
//! Run: `cargo bench --bench frontend_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use forge_core::{format, rewrite, FormatConfig, Lexer, Parser, RewriteConfig};

/// A script with `n` small functions, each asking for one line
fn script(n: usize) -> String {
    let mut source = String::new();
    for i in 0..n {
        source.push_str(&format!(
            "fn step{i}(acc) {{\n    let line = input(\"step {i}? \");\n    if line == \"\" {{ return acc; }}\n    return acc + int(line) * {i};\n}}\n"
        ));
    }
    source.push_str("let total = 0;\n");
    for i in 0..n {
        source.push_str(&format!("total = step{i}(total);\n"));
    }
    source.push_str("print(\"total\", total);\n");
    source
}

fn bench_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");

    for n in [10, 100, 1000] {
        let source = script(n);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::new("tokenize", n), &source, |b, source| {
            b.iter(|| black_box(Lexer::new(source).tokenize_with_spans().unwrap()))
        });
    }

    group.finish();
}

fn bench_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");

    for n in [10, 100, 1000] {
        let tokens = Lexer::new(&script(n)).tokenize_with_spans().unwrap();
        group.bench_with_input(BenchmarkId::new("parse", n), &tokens, |b, tokens| {
            b.iter(|| black_box(Parser::new(tokens.clone()).parse().unwrap()))
        });
    }

    group.finish();
}

fn bench_rewrite(c: &mut Criterion) {
    let mut group = c.benchmark_group("rewrite");
    let config = RewriteConfig::default();

    for n in [10, 100, 1000] {
        let source = script(n);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::new("source_to_unit", n), &source, |b, source| {
            b.iter(|| black_box(rewrite(source, &config).into_unit()))
        });
    }

    // Failure path: diagnostic plus fallback unit
    group.bench_function("unparsable", |b| {
        b.iter(|| black_box(rewrite("print(\"unterminated);", &config).into_unit()))
    });

    group.finish();
}

fn bench_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("format");
    let source = script(100);

    group.bench_function("default", |b| {
        let config = FormatConfig::default();
        b.iter(|| black_box(format(&source, &config).unwrap()))
    });
    group.bench_function("compact", |b| {
        let config = FormatConfig::compact();
        b.iter(|| black_box(format(&source, &config).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_lexer, bench_parser, bench_rewrite, bench_format);
criterion_main!(benches);

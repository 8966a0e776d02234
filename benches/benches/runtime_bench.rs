//! # Runtime Benchmarks
//!
//! Measures execution of scripts through the script host.
//!
//! Run: `cargo bench --bench runtime_bench`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use forge_core::{rewrite, RewriteConfig};
use forge_runtime::{OutputStream, RuntimeHost, ScriptHost, Value};
use tokio::runtime::Runtime;
use tokio::sync::oneshot;

fn loaded_host(rt: &Runtime) -> ScriptHost {
    let host = ScriptHost::default();
    host.set_output(Arc::new(|_: OutputStream, chunk: &str| {
        black_box(chunk);
    }));
    rt.block_on(host.load()).unwrap();
    host
}

fn bench_execute(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let host = loaded_host(&rt);
    let mut group = c.benchmark_group("execute");

    for n in [10, 15, 20] {
        let source = format!(
            "fn fib(n) {{ if n < 2 {{ return n; }} return fib(n - 1) + fib(n - 2); }} print(fib({n}));"
        );
        group.bench_with_input(BenchmarkId::new("fib", n), &source, |b, source| {
            b.iter(|| rt.block_on(host.execute(source)).unwrap())
        });
    }

    group.bench_function("loop_10k", |b| {
        let source = "let i = 0; let acc = []; while i < 10000 { i = i + 1; if i % 1000 == 0 { push(acc, i); } } print(len(acc));";
        b.iter(|| rt.block_on(host.execute(source)).unwrap())
    });

    group.finish();
}

/// Rewritten units answered by an input primitive that resolves immediately
fn bench_suspension(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let host = loaded_host(&rt);
    host.set_global(
        "input",
        Value::native("input", |_, _| {
            let (tx, rx) = oneshot::channel();
            let _ = tx.send("1".to_string());
            Ok(Value::pending(rx))
        }),
    );

    let mut group = c.benchmark_group("suspension");

    for n in [1, 100, 1000] {
        let source = format!(
            "let total = 0; let i = 0; while i < {n} {{ total = total + int(input()); i = i + 1; }} print(total);"
        );
        let unit = rewrite(&source, &RewriteConfig::default()).into_unit();
        group.bench_with_input(BenchmarkId::new("awaited_inputs", n), &unit, |b, unit| {
            b.iter(|| rt.block_on(host.execute(unit)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_execute, bench_suspension);
criterion_main!(benches);

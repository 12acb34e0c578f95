#![allow(unused)]
extern crate macroscope;

#[path = "../tests/common/mod.rs"]
mod common;

use common::*;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use macroscope::{deobfuscate, deobfuscation::DeobfuscatorConfig, module::Module, tree::RawNode};
use std::hint::black_box;

/// One document with `count` key functions, each folded into a `Shell` argument by `AutoOpen`.
fn document(count: usize) -> Vec<RawNode> {
    let mut procedures = Vec::new();
    let mut calls = Vec::new();
    for index in 0..count {
        let name = format!("Key{index}");
        let value = binary(num(index as i64), "'+'", paren(binary(num(3), "'*'", num(7))));
        procedures.push(function(&name, &[], vec![assign(&name, value)]));
        calls.push(call_stmt("Shell", vec![call(&name, vec![])]));
    }
    procedures.push(sub("AutoOpen", &[], calls));

    vec![stream(
        vec![attribute("VB_Name", "ThisDocument")],
        vec![global("counter")],
        procedures,
    )]
}

/// Benchmark the default and cosmetic presets on growing documents.
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    for count in [4usize, 32, 128] {
        let streams = document(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("default", count), &streams, |b, streams| {
            let config = DeobfuscatorConfig::default();
            b.iter(|| {
                let output = deobfuscate(black_box(streams), &config).unwrap();
                black_box(output)
            });
        });

        group.bench_with_input(BenchmarkId::new("minimal", count), &streams, |b, streams| {
            let config = DeobfuscatorConfig::minimal();
            b.iter(|| {
                let output = deobfuscate(black_box(streams), &config).unwrap();
                black_box(output)
            });
        });
    }
    group.finish();
}

/// Benchmark importing and rendering without any pass.
fn bench_round_trip(c: &mut Criterion) {
    let streams = document(128);
    c.bench_function("import_and_render", |b| {
        b.iter(|| {
            let module = Module::from_streams(black_box(&streams)).unwrap();
            black_box(module.render())
        });
    });
}

criterion_group!(benches, bench_pipeline, bench_round_trip);
criterion_main!(benches);

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Throughput of rebuilding island partitions over a chain graph.
//!
//! # Running
//!
//! ```sh
//! cargo bench --package warp-benches --bench island_rebuild
//! ```
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use warp_core::{Graph, PROPAGATE_ALL};

fn chain_graph(n: u32) -> Graph<u32, u32> {
    let mut g = Graph::new();
    for i in 0..n {
        g.add_node(i, PROPAGATE_ALL);
    }
    for i in 0..n.saturating_sub(1) {
        g.add_edge(i, i + 1, i);
    }
    g
}

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("island_rebuild");

    for &n in &[16u32, 256, 4_096] {
        group.throughput(Throughput::Elements(u64::from(n)));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bencher, &n| {
            bencher.iter_batched(
                || chain_graph(n),
                |mut g| {
                    g.rebuild_islands();
                    criterion::black_box(g.island_count())
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rebuild);
criterion_main!(benches);

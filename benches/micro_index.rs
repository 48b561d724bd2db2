#![forbid(unsafe_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use vereda::graph::WeightedGraph;
use vereda::traversal::{DijkstraTraversal, SimpleTraversal, TraversalOptions};
use vereda::{Bound, KeyBuf, PatriciaIndex, SortedIndex, VertexId};

const KEY_COUNT: usize = 16_384;
const NODE_COUNT: usize = 2_048;
const EDGE_COUNT: usize = 16_384;

fn micro_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("micro/index");
    group.sample_size(40);
    group.throughput(Throughput::Elements(1));

    let mut rng = ChaCha8Rng::seed_from_u64(0x1ade);
    let keys: Vec<u64> = (0..KEY_COUNT).map(|_| rng.gen()).collect();

    let mut trie = PatriciaIndex::with_capacity(KEY_COUNT);
    for key in &keys {
        let _ = trie.insert(KeyBuf::from_u64(*key));
    }
    let mut cursor = 0usize;
    group.bench_function("patricia_find", |b| {
        b.iter(|| {
            cursor = (cursor + 1) % keys.len();
            let key = KeyBuf::from_u64(keys[cursor]);
            black_box(trie.find(key.as_key()))
        });
    });

    let mut sorted = SortedIndex::new();
    for key in &keys {
        let _ = sorted.insert(KeyBuf::from_i64(*key as i64 >> 8));
    }
    group.bench_function("sorted_ceil", |b| {
        b.iter(|| {
            let target = KeyBuf::from_i64(rng.gen::<i64>() >> 8);
            black_box(sorted.bound(target.as_key(), Bound::Ceil))
        });
    });
    group.bench_function("sorted_insert_remove", |b| {
        b.iter(|| {
            let id = sorted
                .insert(KeyBuf::from_i64(rng.gen::<i64>() >> 8))
                .expect("duplicates allowed");
            black_box(sorted.remove(id))
        });
    });
    group.finish();
}

fn micro_traversal(c: &mut Criterion) {
    let mut group = c.benchmark_group("micro/traversal");
    group.sample_size(20);

    let (graph, vertices) = random_graph(NODE_COUNT, EDGE_COUNT);
    for depth in [1u32, 2, 3] {
        group.bench_with_input(BenchmarkId::new("bfs", depth), &depth, |b, depth| {
            let mut cursor = 0usize;
            b.iter(|| {
                cursor = (cursor + 1) % vertices.len();
                let options = TraversalOptions::bfs().max_level(*depth);
                let walk = SimpleTraversal::new(&graph, vertices[cursor], options).expect("vertex");
                black_box(walk.count())
            });
        });
    }
    group.bench_function("dijkstra_full", |b| {
        let mut paths = DijkstraTraversal::new();
        b.iter(|| {
            paths.reset(&graph, vertices[0]).expect("vertex");
            paths.run(&graph);
            black_box(paths.settled())
        });
    });
    group.finish();
}

fn random_graph(nodes: usize, edges: usize) -> (WeightedGraph<String, u32>, Vec<VertexId>) {
    let mut rng = ChaCha8Rng::seed_from_u64(0x9a7);
    let mut graph = WeightedGraph::new();
    let vertices: Vec<VertexId> = (0..nodes)
        .map(|i| graph.insert_vertex(format!("n{i:06}")).expect("unique key"))
        .collect();
    for _ in 0..edges {
        let src = vertices[rng.gen_range(0..nodes)];
        let dst = vertices[rng.gen_range(0..nodes)];
        if src != dst {
            graph
                .connect_with_cost(src, dst, rng.gen_range(1..64u32), false)
                .expect("edge");
        }
    }
    (graph, vertices)
}

criterion_group!(benches, micro_index, micro_traversal);
criterion_main!(benches);

#![allow(missing_docs)]

use std::sync::atomic::Ordering;
use std::sync::Arc;

use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use vereda::graph::{CounterMetrics, EdgeRef, GraphOptions, Link, WeightedGraph};
use vereda::traversal::DijkstraTraversal;
use vereda::{Result, VeredaError, VertexId};

type Net = WeightedGraph<String, u32>;

fn sample() -> Result<(Net, [VertexId; 4])> {
    let mut graph = Net::new();
    let a = graph.insert_vertex("A".into())?;
    let b = graph.insert_vertex("B".into())?;
    let c = graph.insert_vertex("C".into())?;
    let d = graph.insert_vertex("D".into())?;
    graph.connect_with_cost(a, b, 1, true)?;
    graph.connect_with_cost(b, c, 2, true)?;
    graph.connect_with_cost(a, c, 5, true)?;
    graph.connect_with_cost(c, d, 1, true)?;
    Ok((graph, [a, b, c, d]))
}

fn random_net(seed: u64, nodes: usize, edges: usize) -> Result<(Net, Vec<VertexId>)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut graph = Net::new();
    let vertices: Vec<VertexId> = (0..nodes)
        .map(|i| graph.insert_vertex(format!("n{i:03}")))
        .collect::<Result<_>>()?;
    for _ in 0..edges {
        let src = vertices[rng.gen_range(0..nodes)];
        let dst = vertices[rng.gen_range(0..nodes)];
        if src != dst {
            graph.connect_with_cost(src, dst, rng.gen_range(1..20), rng.gen_bool(0.3))?;
        }
    }
    Ok((graph, vertices))
}

fn recomputed(graph: &Net, root: VertexId) -> Result<DijkstraTraversal<u32>> {
    let mut paths = DijkstraTraversal::new();
    paths.reset(graph, root)?;
    paths.run(graph);
    Ok(paths)
}

// Every reached vertex is explained by its previous hop, and the first hop
// leaves the root toward the start of that chain.
fn assert_tree(graph: &Net, paths: &DijkstraTraversal<u32>, root: VertexId, vertices: &[VertexId]) {
    for v in vertices {
        let Some(cost) = paths.cost(*v) else {
            continue;
        };
        if *v == root {
            assert_eq!(cost, 0);
            continue;
        }
        let prev = paths.prev_hop(*v).expect("reached vertex has a previous hop");
        let link = graph.cost(prev, *v).expect("previous hop edge exists");
        assert_eq!(paths.cost(prev).map(|c| c + link), Some(cost), "cost of {v}");

        let mut hop = *v;
        while paths.prev_hop(hop) != Some(root) {
            hop = paths.prev_hop(hop).expect("chain reaches the root");
        }
        assert_eq!(paths.next_hop(graph, *v), Some(hop), "first hop toward {v}");
    }
}

#[test]
fn costs_and_hops_on_the_sample() -> Result<()> {
    let (graph, [a, b, c, d]) = sample()?;
    let mut paths = DijkstraTraversal::new();
    paths.reset(&graph, a)?;
    paths.run(&graph);
    assert_eq!(paths.cost(c), Some(3));
    assert_eq!(paths.prev_hop(d), Some(c));
    assert_eq!(paths.next_hop(&graph, d), Some(b));
    assert_eq!(paths.next_hop_link(d), graph.edge_between(a, b));

    paths.tree_walk_reset(&graph)?;
    let mut walk = Vec::new();
    while let Some(step) = paths.tree_walk_next(&graph) {
        walk.push(step);
    }
    assert_eq!(walk, vec![(a, 0), (b, 1), (c, 2), (d, 3)]);
    Ok(())
}

#[test]
fn decrease_is_repaired_without_a_reset() -> Result<()> {
    let metrics = Arc::new(CounterMetrics::default());
    let mut graph = Net::with_options(GraphOptions::new().metrics(metrics.clone()));
    let a = graph.insert_vertex("A".into())?;
    let b = graph.insert_vertex("B".into())?;
    let c = graph.insert_vertex("C".into())?;
    let d = graph.insert_vertex("D".into())?;
    graph.connect_with_cost(a, b, 1, true)?;
    graph.connect_with_cost(b, c, 2, true)?;
    graph.connect_with_cost(a, c, 5, true)?;
    graph.connect_with_cost(c, d, 1, true)?;

    let mut paths = DijkstraTraversal::new();
    paths.reset(&graph, a)?;
    paths.run(&graph);
    let resets = metrics.dijkstra_resets.load(Ordering::Relaxed);

    graph.connect_with_cost(a, c, 2, true)?;
    paths.update_edge(&graph, a, c)?;
    assert_eq!(paths.cost(c), Some(2));
    assert_eq!(paths.cost(d), Some(3));
    assert_eq!(paths.next_hop(&graph, d), Some(c));
    assert_eq!(
        metrics.dijkstra_resets.load(Ordering::Relaxed),
        resets,
        "repair stayed incremental"
    );
    assert_eq!(metrics.dijkstra_updates.load(Ordering::Relaxed), 1);
    assert_tree(&graph, &paths, a, &[a, b, c, d]);
    Ok(())
}

#[test]
fn removed_edge_on_the_tree_is_rerouted() -> Result<()> {
    let (mut graph, [a, b, c, d]) = sample()?;
    let mut paths = DijkstraTraversal::new();
    paths.reset(&graph, a)?;
    paths.run(&graph);
    graph.disconnect(b, c, true)?;
    paths.update(&graph, c)?;
    assert_eq!(paths.cost(c), Some(5));
    assert_eq!(paths.cost(d), Some(6));
    assert_eq!(paths.next_hop(&graph, d), Some(c));
    Ok(())
}

#[test]
fn filtered_traversal_ignores_blocked_links() -> Result<()> {
    let (graph, [a, b, c, d]) = sample()?;
    let filter = move |edge: EdgeRef<'_, Link<u32>>| edge.dst != b;
    let mut paths = DijkstraTraversal::with_filter(filter);
    paths.reset(&graph, a)?;
    paths.run(&graph);
    assert_eq!(paths.cost(b), None);
    assert_eq!(paths.cost(d), Some(6));
    assert!(paths.prev_hop_is_valid(&graph, d));
    Ok(())
}

#[test]
fn paths_past_the_cost_range_count_as_unreachable() -> Result<()> {
    let mut graph: WeightedGraph<String, u8> = WeightedGraph::new();
    let a = graph.insert_vertex("A".into())?;
    let b = graph.insert_vertex("B".into())?;
    let c = graph.insert_vertex("C".into())?;
    let d = graph.insert_vertex("D".into())?;
    graph.connect_with_cost(a, b, 200, true)?;
    graph.connect_with_cost(b, c, 100, true)?;
    graph.connect_with_cost(c, d, 1, true)?;

    let mut paths = DijkstraTraversal::new();
    paths.reset(&graph, a)?;
    paths.run(&graph);
    assert_eq!(paths.cost(b), Some(200));
    assert_eq!(paths.cost(c), None);
    assert_eq!(paths.cost(d), None);

    let mut from_c = DijkstraTraversal::new();
    from_c.reset(&graph, c)?;
    from_c.run(&graph);
    assert_eq!(from_c.cost(b), Some(100));
    assert_eq!(from_c.cost(a), None);

    graph.connect_with_cost(a, c, 254, true)?;
    paths.update_edge(&graph, a, c)?;
    assert_eq!(paths.cost(c), Some(254));
    assert_eq!(paths.cost(d), Some(255));
    assert_eq!(paths.next_hop(&graph, d), Some(c));
    Ok(())
}

#[test]
fn failed_duplex_recost_keeps_the_old_cost() -> Result<()> {
    let mut graph = Net::with_options(GraphOptions::new().edge_pool_limit(2));
    let a = graph.insert_vertex("A".into())?;
    let b = graph.insert_vertex("B".into())?;
    let c = graph.insert_vertex("C".into())?;
    graph.connect_with_cost(a, b, 4, false)?;
    graph.connect_with_cost(b, c, 1, false)?;
    assert!(matches!(
        graph.connect_with_cost(a, b, 9, true),
        Err(VeredaError::PoolExhausted(_))
    ));
    assert_eq!(graph.cost(a, b), Some(4));
    assert_eq!(graph.cost(b, a), None);

    let paths = recomputed(&graph, a)?;
    assert_eq!(paths.cost(c), Some(5));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn incremental_repair_matches_full_recompute(
        seed in any::<u64>(),
        changes in prop::collection::vec((0usize..24, 0usize..24, 1u32..20), 1..30),
    ) {
        let (mut graph, vertices) = random_net(seed, 24, 60).expect("graph builds");
        let root = vertices[0];
        let mut paths = recomputed(&graph, root).expect("root exists");
        for (src, dst, cost) in changes {
            let (src, dst) = (vertices[src], vertices[dst]);
            if src == dst {
                continue;
            }
            graph.connect_with_cost(src, dst, cost, false).expect("endpoints exist");
            paths.update_edge(&graph, src, dst).expect("update succeeds");
            let fresh = recomputed(&graph, root).expect("root exists");
            for v in &vertices {
                prop_assert_eq!(paths.cost(*v), fresh.cost(*v));
            }
            assert_tree(&graph, &paths, root, &vertices);
        }
    }
}

#![allow(missing_docs)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use vereda::graph::{Graph, QueueKind, QueuePool};
use vereda::traversal::{SimpleTraversal, TraversalOptions};
use vereda::{KeyRef, Result, VertexId};

fn assert_consistent(graph: &Graph<String>) {
    let mut outgoing = 0usize;
    let mut incoming = 0usize;
    for (v, name) in graph.vertices() {
        assert_eq!(graph.find_vertex(KeyRef::from_bytes(name.as_bytes())), Some(v));
        for edge in graph.adjacency(v) {
            assert_eq!(edge.src, v, "adjacency edge leaves its vertex");
            assert!(graph.contains_vertex(edge.dst), "adjacency target is live");
            assert_eq!(graph.edge_between(edge.src, edge.dst), Some(edge.id));
            outgoing += 1;
        }
        for edge in graph.connectors(v) {
            assert_eq!(edge.dst, v, "connector edge enters its vertex");
            assert!(graph.contains_vertex(edge.src), "connector source is live");
            incoming += 1;
        }
        assert_eq!(graph.adjacency(v).count(), graph.adjacency_count(v));
        assert_eq!(graph.connectors(v).count(), graph.connector_count(v));
    }
    assert_eq!(outgoing, graph.edge_count());
    assert_eq!(incoming, graph.edge_count());
}

#[test]
fn random_edits_keep_adjacency_and_connectors_in_step() -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut graph: Graph<String> = Graph::new();
    let mut live: Vec<VertexId> = Vec::new();
    let mut next_name = 0usize;

    for round in 0..2_000 {
        match rng.gen_range(0..10) {
            0..=2 => {
                live.push(graph.insert_vertex(format!("v{next_name:05}"))?);
                next_name += 1;
            }
            3..=6 if live.len() >= 2 => {
                let src = live[rng.gen_range(0..live.len())];
                let dst = live[rng.gen_range(0..live.len())];
                if src != dst && !graph.has_edge(src, dst) {
                    graph.connect(src, dst, ())?;
                }
            }
            7 if !live.is_empty() => {
                let v = live.swap_remove(rng.gen_range(0..live.len()));
                graph.remove_vertex(v)?;
                assert!(graph.vertex(v).is_none());
            }
            8 if live.len() >= 2 => {
                let src = live[rng.gen_range(0..live.len())];
                let dst = live[rng.gen_range(0..live.len())];
                let duplex = rng.gen_bool(0.5);
                let _ = graph.disconnect(src, dst, duplex);
                assert!(!graph.has_edge(src, dst));
            }
            _ => {}
        }
        if round % 250 == 0 {
            assert_consistent(&graph);
        }
    }
    assert_consistent(&graph);
    assert_eq!(graph.vertex_count(), live.len());
    Ok(())
}

#[test]
fn removing_a_vertex_removes_every_edge_touching_it() -> Result<()> {
    let mut graph: Graph<String> = Graph::new();
    let hub = graph.insert_vertex("hub".into())?;
    let spokes: Vec<VertexId> = (0..6)
        .map(|i| graph.insert_vertex(format!("spoke{i}")))
        .collect::<Result<_>>()?;
    for spoke in &spokes {
        graph.connect_duplex(hub, *spoke, ())?;
    }
    graph.connect(spokes[0], spokes[1], ())?;
    assert_eq!(graph.edge_count(), 13);

    graph.remove_vertex(hub)?;
    assert_eq!(graph.edge_count(), 1);
    for spoke in &spokes {
        assert!(graph.adjacency(*spoke).all(|edge| edge.dst != hub));
        assert!(graph.connectors(*spoke).all(|edge| edge.src != hub));
    }
    assert!(graph.find_vertex(KeyRef::from_bytes(b"hub")).is_none());
    assert_consistent(&graph);
    Ok(())
}

#[test]
fn bfs_levels_follow_hop_count() -> Result<()> {
    let mut graph: Graph<String> = Graph::new();
    let root = graph.insert_vertex("root".into())?;
    let a = graph.insert_vertex("a".into())?;
    let b = graph.insert_vertex("b".into())?;
    let c = graph.insert_vertex("c".into())?;
    let d = graph.insert_vertex("d".into())?;
    graph.connect(root, a, ())?;
    graph.connect(root, b, ())?;
    graph.connect(a, c, ())?;
    graph.connect(b, d, ())?;
    graph.connect(c, root, ())?;

    let visits: Vec<(VertexId, u32)> = SimpleTraversal::new(&graph, root, TraversalOptions::bfs())?
        .map(|visit| (visit.vertex, visit.level))
        .collect();
    assert_eq!(visits.len(), 5);
    for (vertex, level) in visits {
        let expected = if vertex == root {
            0
        } else if vertex == a || vertex == b {
            1
        } else {
            2
        };
        assert_eq!(level, expected, "level of {vertex}");
    }
    Ok(())
}

#[test]
fn bfs_over_a_binary_tree_reports_three_levels() -> Result<()> {
    let mut graph: Graph<String> = Graph::new();
    let root = graph.insert_vertex("root".into())?;
    let mut expected = vec![(root, 0u32)];
    let mut parents = vec![root];
    for level in 1..=2u32 {
        let mut children = Vec::new();
        for (i, parent) in parents.iter().enumerate() {
            for side in ["l", "r"] {
                let child = graph.insert_vertex(format!("t{level}.{i}{side}"))?;
                graph.connect(*parent, child, ())?;
                expected.push((child, level));
                children.push(child);
            }
        }
        parents = children;
    }

    let mut visits: Vec<(VertexId, u32)> = SimpleTraversal::new(&graph, root, TraversalOptions::bfs())?
        .map(|visit| (visit.vertex, visit.level))
        .collect();
    assert_eq!(visits.len(), 7);
    assert!(visits.windows(2).all(|pair| pair[0].1 <= pair[1].1), "levels never go back");
    visits.sort();
    expected.sort();
    assert_eq!(visits, expected);

    let shallow = SimpleTraversal::new(&graph, root, TraversalOptions::bfs().max_level(1))?.count();
    assert_eq!(shallow, 3);
    Ok(())
}

#[test]
fn queue_pool_reuses_records() -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut graph: Graph<String> = Graph::new();
    let vertices: Vec<VertexId> = (0..64)
        .map(|i| graph.insert_vertex(format!("q{i:02}")))
        .collect::<Result<_>>()?;

    let mut pool: QueuePool<u32> = QueuePool::new();
    let fifo = pool.create_queue(QueueKind::List);
    let ranked = pool.create_queue(QueueKind::Sorted);
    for round in 0..50u32 {
        for v in &vertices {
            pool.append(fifo, *v, round)?;
            let rank: u32 = rng.gen_range(0..1_000);
            pool.insert(ranked, *v, vertex_key(rank), rank)?;
        }
        let mut last = None;
        for state in pool.iter(ranked) {
            let rank = *state.payload();
            assert!(last.map_or(true, |prev| prev <= rank), "sorted queue in key order");
            last = Some(rank);
            assert_eq!(pool.memberships(state.vertex()).count(), 2);
        }
        while pool.remove_head(fifo).is_some() {}
        pool.clear(ranked)?;
        assert!(pool.is_empty(fifo) && pool.is_empty(ranked));
    }
    assert_eq!(pool.slots(), vertices.len() * 2);
    assert_eq!(pool.pooled(), pool.slots());
    Ok(())
}

fn vertex_key(rank: u32) -> vereda::KeyBuf {
    vereda::KeyBuf::from_u32(rank)
}

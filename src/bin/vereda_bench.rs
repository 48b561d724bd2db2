//! Graph engine benchmark (index churn + traversals + incremental updates)
//!
//! Run with for example:
//!
//! ```bash
//! # Default sizes
//! cargo run --release --bin vereda-bench
//!
//! # Explicit sizes, checking every repair against a full recompute
//! cargo run --release --bin vereda-bench -- --nodes 20000 --edges 80000 --updates 500 --verify
//!
//! # Sizes from a TOML file, flags still win
//! cargo run --release --bin vereda-bench -- --config bench.toml --seed 7
//! ```
#![forbid(unsafe_code)]

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;
use vereda::graph::{CounterMetrics, GraphOptions, WeightedGraph};
use vereda::traversal::{DijkstraTraversal, SimpleTraversal, TraversalOptions};
use vereda::{KeyBuf, KeyRef, SortedIndex, VertexId};

#[derive(Parser, Debug)]
#[command(
    name = "vereda-bench",
    version,
    about = "Benchmark indexes, traversals and incremental shortest paths"
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "TOML file with benchmark sizes")]
    config: Option<PathBuf>,

    #[arg(long, env = "NODES", help = "Number of vertices")]
    nodes: Option<usize>,

    #[arg(long, env = "EDGES", help = "Number of random directed edges")]
    edges: Option<usize>,

    #[arg(long, env = "LOOKUPS", help = "Number of vertex key lookups")]
    lookups: Option<usize>,

    #[arg(long, env = "UPDATES", help = "Number of cost changes repaired incrementally")]
    updates: Option<usize>,

    #[arg(long, env = "BFS_RUNS", help = "Number of bounded breadth-first walks")]
    bfs_runs: Option<usize>,

    #[arg(long, env = "BFS_DEPTH", help = "Level limit of each breadth-first walk")]
    bfs_depth: Option<u32>,

    #[arg(long, help = "Seed for the random graph")]
    seed: Option<u64>,

    #[arg(long, help = "Compare every repaired tree with a full recompute")]
    verify: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
struct BenchConfig {
    nodes: usize,
    edges: usize,
    lookups: usize,
    updates: usize,
    bfs_runs: usize,
    bfs_depth: u32,
    max_cost: u32,
    seed: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            nodes: 10_000,
            edges: 40_000,
            lookups: 10_000,
            updates: 1_000,
            bfs_runs: 1_000,
            bfs_depth: 3,
            max_cost: 100,
            seed: 0x5eed,
        }
    }
}

impl BenchConfig {
    fn load(cli: &Cli) -> Result<Self, Box<dyn Error>> {
        let mut cfg = match &cli.config {
            Some(path) => {
                let contents = fs::read_to_string(path)
                    .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
                toml::from_str(&contents)
                    .map_err(|err| format!("failed to parse {}: {err}", path.display()))?
            }
            None => BenchConfig::default(),
        };
        if let Some(nodes) = cli.nodes {
            cfg.nodes = nodes;
        }
        if let Some(edges) = cli.edges {
            cfg.edges = edges;
        }
        if let Some(lookups) = cli.lookups {
            cfg.lookups = lookups;
        }
        if let Some(updates) = cli.updates {
            cfg.updates = updates;
        }
        if let Some(runs) = cli.bfs_runs {
            cfg.bfs_runs = runs;
        }
        if let Some(depth) = cli.bfs_depth {
            cfg.bfs_depth = depth;
        }
        if let Some(seed) = cli.seed {
            cfg.seed = seed;
        }
        if cfg.nodes < 2 {
            return Err("at least two nodes are required".into());
        }
        if cfg.max_cost == 0 {
            return Err("max_cost must be positive".into());
        }
        Ok(cfg)
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("vereda-bench error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();

    let cli = Cli::parse();
    let cfg = BenchConfig::load(&cli)?;
    println!(
        "vereda bench config: NODES={}, EDGES={}, LOOKUPS={}, UPDATES={}, BFS_RUNS={}, BFS_DEPTH={}, SEED={}",
        cfg.nodes, cfg.edges, cfg.lookups, cfg.updates, cfg.bfs_runs, cfg.bfs_depth, cfg.seed
    );

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let metrics = Arc::new(CounterMetrics::default());
    let options = GraphOptions::new()
        .vertex_capacity(cfg.nodes)
        .edge_capacity(cfg.edges)
        .metrics(metrics.clone());

    let start = Instant::now();
    let (mut graph, vertices) = build_graph(&cfg, options, &mut rng)?;
    report("build", start.elapsed(), cfg.nodes + graph.edge_count());

    let start = Instant::now();
    let mut hits = 0usize;
    for _ in 0..cfg.lookups {
        let key = node_key(rng.gen_range(0..cfg.nodes));
        if graph.find_vertex(KeyRef::from_bytes(key.as_bytes())).is_some() {
            hits += 1;
        }
    }
    report("lookup", start.elapsed(), cfg.lookups);
    info!(hits, "bench.lookup.done");

    let root = vertices[0];
    let mut paths = DijkstraTraversal::new();
    let start = Instant::now();
    paths.reset(&graph, root)?;
    paths.run(&graph);
    report("dijkstra", start.elapsed(), paths.settled());

    let start = Instant::now();
    let mut mismatches = 0usize;
    for _ in 0..cfg.updates {
        let src = vertices[rng.gen_range(0..vertices.len())];
        let dst = vertices[rng.gen_range(0..vertices.len())];
        if src == dst {
            continue;
        }
        let cost = match graph.cost(src, dst) {
            Some(current) if current > 1 => rng.gen_range(1..current),
            Some(current) => current,
            None => rng.gen_range(1..=cfg.max_cost),
        };
        graph.connect_with_cost(src, dst, cost, false)?;
        paths.update_edge(&graph, src, dst)?;
        if cli.verify && !matches_recompute(&graph, &paths, root, &vertices)? {
            mismatches += 1;
        }
    }
    report("update", start.elapsed(), cfg.updates);
    if cli.verify {
        println!("  verify: {mismatches} mismatches");
        if mismatches > 0 {
            return Err(format!("{mismatches} repaired trees differ from a recompute").into());
        }
    }

    let start = Instant::now();
    let mut reached = 0usize;
    for _ in 0..cfg.bfs_runs {
        let from = vertices[rng.gen_range(0..vertices.len())];
        let options = TraversalOptions::bfs().max_level(cfg.bfs_depth);
        reached += SimpleTraversal::new(&graph, from, options)?.count();
    }
    report("bfs", start.elapsed(), reached);

    let start = Instant::now();
    let churned = churn_sorted_index(&cfg, &mut rng);
    report("sorted index churn", start.elapsed(), churned);

    let removed = vertices[vertices.len() - 1];
    graph.remove_vertex(removed)?;
    paths.update(&graph, removed)?;

    println!(
        "counters: edges_connected={}, edges_recycled={}, dijkstra_steps={}, dijkstra_resets={}, dijkstra_updates={}, bfs_steps={}",
        metrics.edges_connected.load(Ordering::Relaxed),
        metrics.edges_recycled.load(Ordering::Relaxed),
        metrics.dijkstra_steps.load(Ordering::Relaxed),
        metrics.dijkstra_resets.load(Ordering::Relaxed),
        metrics.dijkstra_updates.load(Ordering::Relaxed),
        metrics.bfs_steps.load(Ordering::Relaxed),
    );
    Ok(())
}

fn node_key(index: usize) -> String {
    format!("node-{index:08}")
}

fn build_graph(
    cfg: &BenchConfig,
    options: GraphOptions,
    rng: &mut StdRng,
) -> Result<(WeightedGraph<String, u32>, Vec<VertexId>), Box<dyn Error>> {
    let mut graph = WeightedGraph::with_options(options);
    let mut vertices = Vec::with_capacity(cfg.nodes);
    for i in 0..cfg.nodes {
        vertices.push(graph.insert_vertex(node_key(i))?);
    }
    // A ring keeps every vertex reachable from the root.
    for i in 0..cfg.nodes {
        let next = (i + 1) % cfg.nodes;
        graph.connect_with_cost(vertices[i], vertices[next], cfg.max_cost, false)?;
    }
    for _ in 0..cfg.edges.saturating_sub(cfg.nodes) {
        let src = rng.gen_range(0..cfg.nodes);
        let dst = rng.gen_range(0..cfg.nodes);
        if src == dst {
            continue;
        }
        let cost = rng.gen_range(1..=cfg.max_cost);
        graph.connect_with_cost(vertices[src], vertices[dst], cost, false)?;
    }
    Ok((graph, vertices))
}

fn matches_recompute(
    graph: &WeightedGraph<String, u32>,
    repaired: &DijkstraTraversal<u32>,
    root: VertexId,
    vertices: &[VertexId],
) -> Result<bool, Box<dyn Error>> {
    let mut fresh = DijkstraTraversal::new();
    fresh.reset(graph, root)?;
    fresh.run(graph);
    Ok(vertices
        .iter()
        .all(|v| fresh.cost(*v) == repaired.cost(*v)))
}

fn churn_sorted_index(cfg: &BenchConfig, rng: &mut StdRng) -> usize {
    let mut index = SortedIndex::new();
    let mut ids = Vec::with_capacity(cfg.lookups);
    for _ in 0..cfg.lookups {
        let value: i64 = rng.gen_range(-1_000_000..1_000_000);
        if let Ok(id) = index.insert(KeyBuf::from_i64(value)) {
            ids.push(id);
        }
    }
    let mut ops = ids.len();
    for id in ids.iter().step_by(2) {
        index.remove(*id);
        ops += 1;
    }
    while index.remove_first().is_some() {
        ops += 1;
    }
    ops
}

fn report(phase: &str, elapsed: Duration, ops: usize) {
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 { ops as f64 / secs } else { 0.0 };
    println!(
        "{phase:>20}: {ops:>9} ops in {:>9.3} ms ({rate:>12.0} ops/s)",
        secs * 1_000.0
    );
}

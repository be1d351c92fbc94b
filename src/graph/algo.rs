//! Whole-graph algorithms: degree, PageRank, components, BFS distances.
//!
//! Traversals treat the graph as undirected: a document that mentions a topic
//! and the topic are one hop apart either way.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, VecDeque};

/// Number of edges touching each node, in + out, indexed by node index.
pub fn degrees<N, E>(graph: &DiGraph<N, E>) -> Vec<usize> {
    let mut degree = vec![0usize; graph.node_count()];
    for edge in graph.edge_references() {
        degree[edge.source().index()] += 1;
        degree[edge.target().index()] += 1;
    }
    degree
}

/// Degree centrality: `degree / (n - 1)`, zero for graphs with fewer than two nodes.
pub fn degree_centrality(degrees: &[usize]) -> Vec<f64> {
    let n = degrees.len();
    if n < 2 {
        return vec![0.0; n];
    }
    degrees.iter().map(|&d| d as f64 / (n - 1) as f64).collect()
}

/// Weighted PageRank by power iteration.
///
/// Each node passes `damping` of its score along out-edges in proportion to
/// edge weight. Symmetric edges (`co_occurs`) carry score in both directions.
/// Nodes with no positive out-weight spread their score uniformly.
/// Iteration stops when the L1 change drops below `n * tolerance` or after
/// `max_iterations`. Scores sum to 1.
pub fn pagerank<N>(
    graph: &DiGraph<N, super::GraphEdge>,
    damping: f64,
    max_iterations: usize,
    tolerance: f64,
) -> Vec<f64> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }
    let nf = n as f64;

    let mut out_weight = vec![0.0f64; n];
    for edge in graph.edge_references() {
        let w = edge.weight().weight.max(0.0);
        out_weight[edge.source().index()] += w;
        if edge.weight().is_symmetric() {
            out_weight[edge.target().index()] += w;
        }
    }

    let mut rank = vec![1.0 / nf; n];
    for iteration in 0..max_iterations {
        let dangling: f64 = (0..n)
            .filter(|&i| out_weight[i] <= 0.0)
            .map(|i| rank[i])
            .sum();
        let base = (1.0 - damping) / nf + damping * dangling / nf;

        let mut next = vec![base; n];
        for edge in graph.edge_references() {
            let (s, t) = (edge.source().index(), edge.target().index());
            let w = edge.weight().weight.max(0.0);
            if out_weight[s] > 0.0 {
                next[t] += damping * rank[s] * w / out_weight[s];
            }
            if edge.weight().is_symmetric() && out_weight[t] > 0.0 {
                next[s] += damping * rank[t] * w / out_weight[t];
            }
        }

        let delta: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
        rank = next;
        if delta < nf * tolerance {
            tracing::debug!(iterations = iteration + 1, "pagerank converged");
            return rank;
        }
    }

    tracing::warn!(max_iterations, "pagerank did not converge");
    rank
}

/// Weakly connected component of each node, numbered by first appearance in
/// node order.
pub fn components<N, E>(graph: &DiGraph<N, E>) -> Vec<usize> {
    let n = graph.node_count();
    let mut uf = UnionFind::<usize>::new(n);
    for edge in graph.edge_references() {
        uf.union(edge.source().index(), edge.target().index());
    }

    let mut labels: HashMap<usize, usize> = HashMap::new();
    (0..n)
        .map(|i| {
            let root = uf.find(i);
            let next = labels.len();
            *labels.entry(root).or_insert(next)
        })
        .collect()
}

pub fn component_count<N, E>(graph: &DiGraph<N, E>) -> usize {
    components(graph).into_iter().max().map_or(0, |max| max + 1)
}

/// Hop distance from `start` to every node within `max_depth`, ignoring direction.
/// `start` itself is at distance 0.
pub fn bfs_distances<N, E>(
    graph: &DiGraph<N, E>,
    start: NodeIndex,
    max_depth: usize,
) -> HashMap<NodeIndex, usize> {
    let mut dist = HashMap::from([(start, 0usize)]);
    let mut queue = VecDeque::from([start]);

    while let Some(idx) = queue.pop_front() {
        let depth = dist[&idx];
        if depth >= max_depth {
            continue;
        }
        for neighbor in graph.neighbors_undirected(idx) {
            if !dist.contains_key(&neighbor) {
                dist.insert(neighbor, depth + 1);
                queue.push_back(neighbor);
            }
        }
    }
    dist
}

/// Fewest-hop path from `from` to `to`, ignoring direction.
pub fn shortest_path<N, E>(
    graph: &DiGraph<N, E>,
    from: NodeIndex,
    to: NodeIndex,
) -> Option<Vec<NodeIndex>> {
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([from]);
    parent.insert(from, from);

    while let Some(idx) = queue.pop_front() {
        if idx == to {
            let mut path = vec![to];
            let mut cur = to;
            while cur != from {
                cur = parent[&cur];
                path.push(cur);
            }
            path.reverse();
            return Some(path);
        }
        for neighbor in graph.neighbors_undirected(idx) {
            if let std::collections::hash_map::Entry::Vacant(slot) = parent.entry(neighbor) {
                slot.insert(idx);
                queue.push_back(neighbor);
            }
        }
    }
    None
}

/// Jaccard similarity `|a ∩ b| / |a ∪ b|`; zero when both are empty.
pub fn jaccard<T: Eq + std::hash::Hash>(
    a: &std::collections::HashSet<T>,
    b: &std::collections::HashSet<T>,
) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

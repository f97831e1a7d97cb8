//! Louvain community detection on the co-occurrence graph
//!
//! Two-phase modularity optimization with a resolution parameter: local
//! moving until no gain, then aggregation of communities into supernodes,
//! repeated until the partition stops improving. Node order is fixed, so
//! the result is deterministic for a given graph.

use crate::error::{Error, Result};
use log::debug;
use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap};

/// Assign every node of a weighted undirected graph to a community
///
/// Returns one community id per node index, densely numbered in order of
/// first appearance. Isolated nodes keep singleton communities.
pub fn louvain_communities(graph: &UnGraph<usize, u32>, resolution: f64) -> Result<Vec<usize>> {
    if resolution <= 0.0 {
        return Err(Error::invalid_parameter("resolution must be > 0"));
    }
    let n = graph.node_count();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut level = Level::from_graph(graph);
    // partition[v] = current-level node holding original node v
    let mut partition: Vec<usize> = (0..n).collect();

    // A graph with no edges cannot improve modularity; every node stays
    // in its own singleton community.
    if level.total_weight <= 0.0 {
        return Ok(partition);
    }

    loop {
        let (communities, improved) = level.one_level(resolution);
        if !improved {
            break;
        }
        for slot in partition.iter_mut() {
            *slot = communities[*slot];
        }
        level = level.aggregate(&communities);
        debug!(
            "Louvain aggregated to {} communities",
            level.node_count()
        );
    }

    Ok(relabel_dense(&partition))
}

/// One level of the Louvain hierarchy: a weighted graph as adjacency lists
struct Level {
    adjacency: Vec<Vec<(usize, f64)>>,
    self_loops: Vec<f64>,
    total_weight: f64,
}

impl Level {
    fn from_graph(graph: &UnGraph<usize, u32>) -> Self {
        let n = graph.node_count();
        let mut adjacency = vec![Vec::new(); n];
        let mut total_weight = 0.0;

        for edge in graph.edge_references() {
            let (a, b) = (edge.source().index(), edge.target().index());
            let w = f64::from(*edge.weight());
            adjacency[a].push((b, w));
            adjacency[b].push((a, w));
            total_weight += w;
        }

        Self {
            adjacency,
            self_loops: vec![0.0; n],
            total_weight,
        }
    }

    fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Weighted degree of each node (self-loops count twice)
    fn degrees(&self) -> Vec<f64> {
        self.adjacency
            .iter()
            .zip(&self.self_loops)
            .map(|(neighbours, &loop_w)| {
                neighbours.iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * loop_w
            })
            .collect()
    }

    /// Local moving phase. Returns (node -> community, whether any node moved).
    fn one_level(&self, resolution: f64) -> (Vec<usize>, bool) {
        let n = self.node_count();
        let m = self.total_weight;
        let degrees = self.degrees();

        let mut community: Vec<usize> = (0..n).collect();
        let mut community_total: Vec<f64> = degrees.clone();
        let mut improved = false;

        loop {
            let mut moved = false;

            for u in 0..n {
                let current = community[u];
                community_total[current] -= degrees[u];

                // Edge weight from u into each adjacent community; ordered
                // map so tie-breaks do not depend on hash order
                let mut links: BTreeMap<usize, f64> = BTreeMap::new();
                links.insert(current, 0.0);
                for &(v, w) in &self.adjacency[u] {
                    *links.entry(community[v]).or_insert(0.0) += w;
                }

                let mut best_community = current;
                let mut best_gain = gain(
                    links[&current],
                    degrees[u],
                    community_total[current],
                    m,
                    resolution,
                );
                for (&candidate, &weight_to) in &links {
                    if candidate == current {
                        continue;
                    }
                    let candidate_gain = gain(
                        weight_to,
                        degrees[u],
                        community_total[candidate],
                        m,
                        resolution,
                    );
                    if candidate_gain > best_gain {
                        best_gain = candidate_gain;
                        best_community = candidate;
                    }
                }

                community_total[best_community] += degrees[u];
                community[u] = best_community;
                if best_community != current {
                    moved = true;
                    improved = true;
                }
            }

            if !moved {
                break;
            }
        }

        (relabel_dense(&community), improved)
    }

    /// Aggregation phase: one supernode per community
    fn aggregate(&self, communities: &[usize]) -> Self {
        let n_communities = communities.iter().copied().max().map_or(0, |m| m + 1);
        let mut self_loops = vec![0.0; n_communities];
        let mut between: BTreeMap<(usize, usize), f64> = BTreeMap::new();

        for (u, neighbours) in self.adjacency.iter().enumerate() {
            let cu = communities[u];
            self_loops[cu] += self.self_loops[u];
            for &(v, w) in neighbours {
                // Each undirected edge appears twice in the adjacency lists
                if v < u {
                    continue;
                }
                let cv = communities[v];
                if cu == cv {
                    self_loops[cu] += w;
                } else {
                    let key = (cu.min(cv), cu.max(cv));
                    *between.entry(key).or_insert(0.0) += w;
                }
            }
        }

        let mut adjacency = vec![Vec::new(); n_communities];
        for ((a, b), w) in between {
            adjacency[a].push((b, w));
            adjacency[b].push((a, w));
        }

        Self {
            adjacency,
            self_loops,
            total_weight: self.total_weight,
        }
    }
}

/// Modularity gain (scaled by m) of placing a node into a community
fn gain(weight_to: f64, degree: f64, community_total: f64, m: f64, resolution: f64) -> f64 {
    weight_to - resolution * degree * community_total / (2.0 * m)
}

/// Renumber labels densely in order of first appearance
fn relabel_dense(labels: &[usize]) -> Vec<usize> {
    let mut mapping: HashMap<usize, usize> = HashMap::new();
    let mut out = Vec::with_capacity(labels.len());
    for &label in labels {
        let next = mapping.len();
        let dense = *mapping.entry(label).or_insert(next);
        out.push(dense);
    }
    out
}

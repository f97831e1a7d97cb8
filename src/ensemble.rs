//! Consensus clustering: repeated weak clusterings, a co-occurrence graph,
//! and community detection over it
//!
//! Mirrors the shape of the exploratory pipeline this crate grew out of:
//! each configured algorithm is run over its parameter range several times,
//! every pair of areas landing in the same cluster increments an edge
//! weight, and Louvain community detection on the resulting graph yields
//! the final assignment.

use crate::affinity::AffinityPropagation;
use crate::community::louvain_communities;
use crate::error::{Error, Result};
use crate::gmm::GaussianMixture;
use crate::kmeans::KMeans;
use crate::reduce::{NeighbourEmbedding, Pca};
use crate::table::{ClusterAssignment, IndicatorTable};
use itertools::Itertools;
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView2};
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One clustering algorithm plus the list of values for its varied parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AlgorithmSweep {
    /// K-means swept over cluster counts
    KMeans {
        /// Values of `n_clusters` to run
        n_clusters: Vec<usize>,
    },
    /// Gaussian mixture swept over component counts
    GaussianMixture {
        /// Values of `n_components` to run
        n_components: Vec<usize>,
    },
    /// Affinity propagation swept over damping factors
    AffinityPropagation {
        /// Damping values to run
        damping: Vec<f64>,
    },
}

impl AlgorithmSweep {
    /// Short algorithm name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::KMeans { .. } => "kmeans",
            Self::GaussianMixture { .. } => "gaussian_mixture",
            Self::AffinityPropagation { .. } => "affinity_propagation",
        }
    }

    /// Number of parameter values in the sweep
    pub fn n_values(&self) -> usize {
        match self {
            Self::KMeans { n_clusters } => n_clusters.len(),
            Self::GaussianMixture { n_components } => n_components.len(),
            Self::AffinityPropagation { damping } => damping.len(),
        }
    }

    /// The sweep set used by the source analysis for a few hundred areas
    pub fn default_set() -> Vec<Self> {
        Self::default_set_for(usize::MAX)
    }

    /// Like [`default_set`](Self::default_set), with cluster counts capped
    /// below the number of observations
    pub fn default_set_for(n_observations: usize) -> Vec<Self> {
        let cap = |values: Vec<usize>| -> Vec<usize> {
            values
                .into_iter()
                .filter(|&k| k < n_observations)
                .collect()
        };
        vec![
            Self::KMeans {
                n_clusters: cap((20..50).step_by(3).collect()),
            },
            Self::AffinityPropagation {
                damping: vec![0.5, 0.6, 0.7, 0.8, 0.9],
            },
            Self::GaussianMixture {
                n_components: cap((20..50).step_by(5).collect()),
            },
        ]
    }
}

/// Pairwise co-occurrence counts accumulated across ensemble runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoOccurrence {
    n_items: usize,
    counts: BTreeMap<(usize, usize), u32>,
}

impl CoOccurrence {
    /// An empty accumulator over `n_items` observations
    pub fn new(n_items: usize) -> Self {
        Self {
            n_items,
            counts: BTreeMap::new(),
        }
    }

    /// Number of observations the counts range over
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Record one run's labels: every same-labelled pair gains a count
    pub fn record(&mut self, labels: &Array1<usize>) {
        for (i, j) in (0..labels.len()).tuple_combinations() {
            if labels[i] == labels[j] {
                *self.counts.entry((i, j)).or_insert(0) += 1;
            }
        }
    }

    /// Number of distinct co-occurring pairs
    pub fn n_pairs(&self) -> usize {
        self.counts.len()
    }

    /// Count for an unordered pair, zero if they never co-occurred
    pub fn count(&self, a: usize, b: usize) -> u32 {
        let key = (a.min(b), a.max(b));
        self.counts.get(&key).copied().unwrap_or(0)
    }

    /// Iterate (i, j, count) triples in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, u32)> + '_ {
        self.counts.iter().map(|(&(i, j), &w)| (i, j, w))
    }

    /// Build the weighted co-occurrence graph
    ///
    /// Every observation becomes a node even when it never co-occurred,
    /// so community detection assigns it a (singleton) community.
    pub fn to_graph(&self) -> UnGraph<usize, u32> {
        let mut graph = UnGraph::with_capacity(self.n_items, self.counts.len());
        let nodes: Vec<NodeIndex> = (0..self.n_items).map(|i| graph.add_node(i)).collect();
        for (i, j, w) in self.iter() {
            graph.add_edge(nodes[i], nodes[j], w);
        }
        graph
    }
}

/// Ensemble of repeated clusterings feeding the co-occurrence graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterEnsemble {
    /// The algorithm/parameter sweeps to run
    pub sweeps: Vec<AlgorithmSweep>,
    /// Repetitions per (algorithm, parameter value) pair
    pub n_runs: usize,
    /// Master seed; per-run seeds are derived from it
    pub random_state: Option<u64>,
}

impl Default for ClusterEnsemble {
    fn default() -> Self {
        Self {
            sweeps: AlgorithmSweep::default_set(),
            n_runs: 10,
            random_state: None,
        }
    }
}

impl ClusterEnsemble {
    /// Create an ensemble over the given sweeps
    pub fn new(sweeps: Vec<AlgorithmSweep>) -> Self {
        Self {
            sweeps,
            ..Default::default()
        }
    }

    /// Set the number of repetitions per parameter value
    pub fn n_runs(mut self, n_runs: usize) -> Self {
        self.n_runs = n_runs;
        self
    }

    /// Set the master seed for reproducible co-occurrence graphs
    pub fn random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Run the full ensemble and accumulate co-occurrence counts
    pub fn co_occurrence(&self, vectors: ArrayView2<f64>) -> Result<CoOccurrence> {
        if self.sweeps.is_empty() {
            return Err(Error::invalid_parameter("Ensemble has no algorithm sweeps"));
        }
        if self.n_runs == 0 {
            return Err(Error::invalid_parameter("n_runs must be > 0"));
        }

        let master = self.random_state.unwrap_or(0);
        let mut co_occurrence = CoOccurrence::new(vectors.nrows());
        let mut run_counter: u64 = 0;

        info!("Running cluster ensemble over {} sweeps", self.sweeps.len());
        for sweep in &self.sweeps {
            debug!("Sweep: {} ({} values)", sweep.name(), sweep.n_values());
            match sweep {
                AlgorithmSweep::KMeans { n_clusters } => {
                    for &k in n_clusters {
                        for _ in 0..self.n_runs {
                            let labels = KMeans::new(k)
                                .n_init(1)
                                .random_state(master.wrapping_add(run_counter))
                                .fit_predict(vectors)?;
                            co_occurrence.record(&labels);
                            run_counter += 1;
                        }
                    }
                }
                AlgorithmSweep::GaussianMixture { n_components } => {
                    for &k in n_components {
                        for _ in 0..self.n_runs {
                            let labels = GaussianMixture::new(k)
                                .random_state(master.wrapping_add(run_counter))
                                .fit_predict(vectors)?;
                            co_occurrence.record(&labels);
                            run_counter += 1;
                        }
                    }
                }
                AlgorithmSweep::AffinityPropagation { damping } => {
                    for &d in damping {
                        // Deterministic, but repeated runs keep the edge
                        // weighting comparable across algorithms
                        for _ in 0..self.n_runs {
                            let labels =
                                AffinityPropagation::new(d).fit_predict(vectors)?;
                            co_occurrence.record(&labels);
                            run_counter += 1;
                        }
                    }
                }
            }
        }

        debug!(
            "Ensemble produced {} co-occurring pairs over {} runs",
            co_occurrence.n_pairs(),
            run_counter
        );
        Ok(co_occurrence)
    }
}

/// End-to-end extractor: reduction, ensemble, graph, community detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterExtractor {
    /// PCA dimensionality the ensemble clusters in
    pub pca_components: usize,
    /// Louvain resolution for community extraction
    pub resolution: f64,
    /// The clustering ensemble configuration
    pub ensemble: ClusterEnsemble,
    /// Configuration of the 2-D inspection embedding
    pub embedding: NeighbourEmbedding,
}

/// Output of a cluster extraction
#[derive(Debug, Clone)]
pub struct ClusterExtraction {
    /// Area code to community id
    pub assignment: ClusterAssignment,
    /// Area codes, in the row order of `reduced` and `embedding`
    pub area_codes: Vec<String>,
    /// The PCA-reduced vectors the ensemble clustered on
    pub reduced: Array2<f64>,
    /// 2-D embedding of `reduced`, for plotting only
    pub embedding: Array2<f64>,
    /// Community id per row, aligned with `area_codes`
    pub communities: Vec<usize>,
}

impl ClusterExtraction {
    /// Number of distinct communities
    pub fn n_clusters(&self) -> usize {
        self.assignment.n_clusters()
    }
}

impl ClusterExtractor {
    /// Create an extractor with the default ensemble and embedding
    pub fn new(pca_components: usize, resolution: f64) -> Self {
        Self {
            pca_components,
            resolution,
            ensemble: ClusterEnsemble::default(),
            embedding: NeighbourEmbedding::default(),
        }
    }

    /// Replace the ensemble configuration
    pub fn ensemble(mut self, ensemble: ClusterEnsemble) -> Self {
        self.ensemble = ensemble;
        self
    }

    /// Replace the embedding configuration
    pub fn embedding(mut self, embedding: NeighbourEmbedding) -> Self {
        self.embedding = embedding;
        self
    }

    /// Seed the ensemble and the embedding from one master seed
    pub fn random_state(mut self, seed: u64) -> Self {
        self.ensemble.random_state = Some(seed);
        self.embedding.random_state = Some(seed);
        self
    }

    /// Extract a cluster assignment from a standardized indicator table
    ///
    /// Areas with incomplete indicator data are dropped before reduction;
    /// every surviving area receives a community id.
    pub fn extract(&self, table: &IndicatorTable) -> Result<ClusterExtraction> {
        let (area_codes, dense) = table.complete_rows()?;
        info!(
            "Extracting clusters for {} areas ({} indicators, p = {}, resolution = {})",
            area_codes.len(),
            table.n_indicators(),
            self.pca_components,
            self.resolution
        );

        let reduced = Pca::new(self.pca_components).fit_transform(dense.view())?;
        let co_occurrence = self.ensemble.co_occurrence(reduced.view())?;

        debug!("Building cluster graph");
        let graph = co_occurrence.to_graph();

        debug!("Extracting communities");
        let communities = louvain_communities(&graph, self.resolution)?;

        let assignment = ClusterAssignment::from_pairs(
            area_codes
                .iter()
                .cloned()
                .zip(communities.iter().copied()),
        );

        // Visualization artifact only; labels come from the graph above
        let embedding = self.embedding.embed(reduced.view())?;

        info!("Extracted {} communities", assignment.n_clusters());
        Ok(ClusterExtraction {
            assignment,
            area_codes,
            reduced,
            embedding,
            communities,
        })
    }
}

//! Grid search over (PCA dimensionality, community resolution)

use crate::cache::DataCache;
use crate::diagnostics::cluster_heterogeneity;
use crate::ensemble::{ClusterEnsemble, ClusterExtractor};
use crate::error::Result;
use crate::reduce::NeighbourEmbedding;
use crate::table::{BenchmarkMatrix, BenchmarkTable, IndicatorTable};
use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One point of the hyperparameter grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    /// PCA dimensionality for the extraction
    pub pca_components: usize,
    /// Louvain resolution for community extraction
    pub resolution: f64,
}

impl GridPoint {
    /// Cartesian product of dimensionalities and resolutions
    pub fn product(pca_components: &[usize], resolutions: &[f64]) -> Vec<GridPoint> {
        pca_components
            .iter()
            .cartesian_product(resolutions.iter())
            .map(|(&pca_components, &resolution)| GridPoint {
                pca_components,
                resolution,
            })
            .collect()
    }
}

/// Diagnostics collected for one grid point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    /// PCA dimensionality of the extraction
    pub pca_components: usize,
    /// Louvain resolution of the extraction
    pub resolution: f64,
    /// Number of communities extracted
    pub n_clusters: usize,
    /// Silhouette of the benchmark features under the extracted clusters
    pub silhouette: f64,
    /// Per-indicator variance of cluster-level benchmark means
    pub indicator_variance: BTreeMap<String, f64>,
}

/// Outcome of one grid point: its diagnostics, or the error it hit
#[derive(Debug)]
pub struct GridOutcome {
    /// The grid point attempted
    pub point: GridPoint,
    /// Diagnostics, or the failure for this point
    pub result: Result<DiagnosticRecord>,
}

impl GridOutcome {
    /// The diagnostic record, if this point succeeded
    pub fn record(&self) -> Option<&DiagnosticRecord> {
        self.result.as_ref().ok()
    }
}

/// Sequential sweep of the extractor and scorer across a grid
#[derive(Debug, Clone)]
pub struct GridSearch {
    /// Ensemble configuration applied at every grid point
    pub ensemble: ClusterEnsemble,
    /// Embedding configuration applied at every grid point
    pub embedding: NeighbourEmbedding,
    /// Benchmark demographic subgroup scored against
    pub subgroup: String,
}

impl Default for GridSearch {
    fn default() -> Self {
        Self {
            ensemble: ClusterEnsemble::default(),
            embedding: NeighbourEmbedding::default(),
            subgroup: "Total".to_string(),
        }
    }
}

impl GridSearch {
    /// Create a grid search with the default ensemble and subgroup
    pub fn new() -> Self {
        Self::default()
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

    /// Score against a different demographic subgroup
    pub fn subgroup(mut self, subgroup: impl Into<String>) -> Self {
        self.subgroup = subgroup.into();
        self
    }

    /// Run every grid point, collecting one outcome per point
    ///
    /// A failing point is recorded with its error and the sweep continues;
    /// the output length always equals the grid length. The pivoted
    /// benchmark slice is computed once and reused across points.
    pub fn run(
        &self,
        indicators: &IndicatorTable,
        benchmark: &BenchmarkTable,
        grid: &[GridPoint],
    ) -> Vec<GridOutcome> {
        let mut pivots: DataCache<String, BenchmarkMatrix> = DataCache::new();
        let mut outcomes = Vec::with_capacity(grid.len());

        for (i, &point) in grid.iter().enumerate() {
            info!(
                "Grid point {}/{}: p = {}, resolution = {}",
                i + 1,
                grid.len(),
                point.pca_components,
                point.resolution
            );
            let result = self.run_point(indicators, benchmark, point, &mut pivots);
            if let Err(err) = &result {
                warn!(
                    "Grid point (p = {}, resolution = {}) failed: {err}",
                    point.pca_components, point.resolution
                );
            }
            outcomes.push(GridOutcome { point, result });
        }

        outcomes
    }

    fn run_point(
        &self,
        indicators: &IndicatorTable,
        benchmark: &BenchmarkTable,
        point: GridPoint,
        pivots: &mut DataCache<String, BenchmarkMatrix>,
    ) -> Result<DiagnosticRecord> {
        let extractor = ClusterExtractor::new(point.pca_components, point.resolution)
            .ensemble(self.ensemble.clone())
            .embedding(self.embedding.clone());
        let extraction = extractor.extract(indicators)?;

        let matrix =
            pivots.get_or_insert_with(self.subgroup.clone(), || benchmark.pivot(&self.subgroup))?;
        let heterogeneity = cluster_heterogeneity(matrix, &extraction.assignment)?;

        Ok(DiagnosticRecord {
            pca_components: point.pca_components,
            resolution: point.resolution,
            n_clusters: extraction.n_clusters(),
            silhouette: heterogeneity.silhouette,
            indicator_variance: heterogeneity.indicator_variance,
        })
    }
}

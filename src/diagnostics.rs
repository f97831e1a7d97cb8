//! Diagnostics: how well does a cluster assignment separate an
//! independent benchmark signal?

use crate::distance::pairwise_distances;
use crate::error::{Error, Result};
use crate::table::{BenchmarkMatrix, ClusterAssignment};
use ndarray::{Array2, ArrayView2};
use std::collections::BTreeMap;

/// Silhouette score and per-indicator spread of cluster means
#[derive(Debug, Clone, PartialEq)]
pub struct Heterogeneity {
    /// Mean silhouette coefficient over the scored areas, in [-1, 1]
    pub silhouette: f64,
    /// Sample variance of cluster-level means, per benchmark indicator
    pub indicator_variance: BTreeMap<String, f64>,
}

/// Mean silhouette coefficient of `labels` over the rows of `data`
///
/// Requires at least two distinct labels and at least two members per
/// label; anything less has no well-defined score and errors instead of
/// returning a placeholder.
pub fn silhouette_score(data: ArrayView2<f64>, labels: &[usize]) -> Result<f64> {
    let n = data.nrows();
    if labels.len() != n {
        return Err(Error::invalid_data(
            "Labels and data must have the same length",
        ));
    }

    let mut sizes: BTreeMap<usize, usize> = BTreeMap::new();
    for &label in labels {
        *sizes.entry(label).or_insert(0) += 1;
    }
    if sizes.len() < 2 {
        return Err(Error::insufficient_separation(format!(
            "Silhouette needs at least 2 clusters, got {}",
            sizes.len()
        )));
    }
    if let Some((&label, &size)) = sizes.iter().find(|&(_, &size)| size < 2) {
        return Err(Error::insufficient_separation(format!(
            "Cluster {label} has only {size} member(s); need at least 2"
        )));
    }

    let distances = pairwise_distances(data)?;

    let mut total = 0.0;
    for i in 0..n {
        // Mean distance to every cluster, keyed by label
        let mut sums: BTreeMap<usize, f64> = BTreeMap::new();
        for j in 0..n {
            if i != j {
                *sums.entry(labels[j]).or_insert(0.0) += distances[[i, j]];
            }
        }

        let own = labels[i];
        let a = sums.get(&own).copied().unwrap_or(0.0) / (sizes[&own] - 1) as f64;
        let b = sums
            .iter()
            .filter(|&(&label, _)| label != own)
            .map(|(&label, &sum)| sum / sizes[&label] as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    Ok(total / n as f64)
}

/// Score a cluster assignment against a pivoted benchmark slice
///
/// Areas without a cluster id are dropped; the silhouette is computed in
/// the benchmark feature space, and the secondary diagnostic is the
/// variance of cluster-level means per indicator.
pub fn cluster_heterogeneity(
    matrix: &BenchmarkMatrix,
    assignment: &ClusterAssignment,
) -> Result<Heterogeneity> {
    let mut kept_rows: Vec<usize> = Vec::new();
    let mut labels: Vec<usize> = Vec::new();
    for (row, code) in matrix.area_codes().iter().enumerate() {
        if let Some(cluster) = assignment.get(code) {
            kept_rows.push(row);
            labels.push(cluster);
        }
    }

    if kept_rows.len() < 2 {
        return Err(Error::missing_benchmark(format!(
            "Only {} area(s) have both benchmark data and a cluster id",
            kept_rows.len()
        )));
    }

    let n_indicators = matrix.indicators().len();
    let mut features = Array2::zeros((kept_rows.len(), n_indicators));
    for (out, &row) in kept_rows.iter().enumerate() {
        features.row_mut(out).assign(&matrix.values().row(row));
    }

    let silhouette = silhouette_score(features.view(), &labels)?;

    let mut indicator_variance = BTreeMap::new();
    for (j, indicator) in matrix.indicators().iter().enumerate() {
        // Cluster-level means of this indicator
        let mut sums: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
        for (row, &label) in labels.iter().enumerate() {
            let entry = sums.entry(label).or_insert((0.0, 0));
            entry.0 += features[[row, j]];
            entry.1 += 1;
        }
        let means: Vec<f64> = sums
            .values()
            .map(|&(sum, count)| sum / count as f64)
            .collect();

        let k = means.len() as f64;
        let grand = means.iter().sum::<f64>() / k;
        let variance = means.iter().map(|m| (m - grand).powi(2)).sum::<f64>() / (k - 1.0);
        indicator_variance.insert(indicator.clone(), variance);
    }

    Ok(Heterogeneity {
        silhouette,
        indicator_variance,
    })
}

//! Affinity propagation clustering
//!
//! Damped responsibility/availability message passing over a negative
//! squared-Euclidean similarity matrix. Deterministic: the only tunable the
//! ensemble sweeps is the damping factor.

use crate::distance::squared_euclidean;
use crate::error::{Error, Result};
use crate::utils::validate_data;
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Affinity propagation clusterer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffinityPropagation {
    /// Damping factor in [0.5, 1)
    pub damping: f64,
    /// Maximum number of message-passing iterations
    pub max_iter: usize,
    /// Iterations the exemplar set must stay unchanged to declare convergence
    pub convergence_iter: usize,
    /// Self-similarity; defaults to the median pairwise similarity
    pub preference: Option<f64>,
}

/// Result of an affinity propagation fit
#[derive(Debug, Clone)]
pub struct AffinityPropagationResult {
    /// Cluster labels, densely numbered by exemplar order
    pub labels: Array1<usize>,
    /// Row indices of the chosen exemplars
    pub exemplars: Vec<usize>,
    /// Number of iterations run
    pub n_iter: usize,
    /// Whether the exemplar set stabilized before max_iter
    pub converged: bool,
}

impl Default for AffinityPropagation {
    fn default() -> Self {
        Self {
            damping: 0.5,
            max_iter: 200,
            convergence_iter: 15,
            preference: None,
        }
    }
}

impl AffinityPropagation {
    /// Create a clusterer with the given damping factor
    pub fn new(damping: f64) -> Self {
        Self {
            damping,
            ..Default::default()
        }
    }

    /// Set the maximum number of iterations
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the number of stable iterations required for convergence
    pub fn convergence_iter(mut self, convergence_iter: usize) -> Self {
        self.convergence_iter = convergence_iter;
        self
    }

    /// Set an explicit preference (self-similarity)
    pub fn preference(mut self, preference: f64) -> Self {
        self.preference = Some(preference);
        self
    }

    /// Fit the clusterer and return exemplars plus labels
    pub fn fit(&self, data: ArrayView2<f64>) -> Result<AffinityPropagationResult> {
        self.validate_input(data)?;

        let n = data.nrows();
        let similarity = self.similarity_matrix(data)?;

        let mut responsibility = Array2::<f64>::zeros((n, n));
        let mut availability = Array2::<f64>::zeros((n, n));

        let mut previous_exemplars: Vec<usize> = Vec::new();
        let mut stable_for = 0;
        let mut n_iter = 0;
        let mut converged = false;

        for iter in 0..self.max_iter {
            n_iter = iter + 1;

            // Responsibility update
            for i in 0..n {
                let mut max1 = f64::NEG_INFINITY;
                let mut max2 = f64::NEG_INFINITY;
                let mut argmax1 = 0;
                for k in 0..n {
                    let v = availability[[i, k]] + similarity[[i, k]];
                    if v > max1 {
                        max2 = max1;
                        max1 = v;
                        argmax1 = k;
                    } else if v > max2 {
                        max2 = v;
                    }
                }
                for k in 0..n {
                    let competitor = if k == argmax1 { max2 } else { max1 };
                    let rho = similarity[[i, k]] - competitor;
                    responsibility[[i, k]] =
                        self.damping * responsibility[[i, k]] + (1.0 - self.damping) * rho;
                }
            }

            // Availability update
            for k in 0..n {
                let mut positive_sum = 0.0;
                for i in 0..n {
                    if i != k {
                        positive_sum += responsibility[[i, k]].max(0.0);
                    }
                }
                for i in 0..n {
                    let alpha = if i == k {
                        positive_sum
                    } else {
                        let without_i = positive_sum - responsibility[[i, k]].max(0.0);
                        (responsibility[[k, k]] + without_i).min(0.0)
                    };
                    availability[[i, k]] =
                        self.damping * availability[[i, k]] + (1.0 - self.damping) * alpha;
                }
            }

            let exemplars: Vec<usize> = (0..n)
                .filter(|&k| responsibility[[k, k]] + availability[[k, k]] > 0.0)
                .collect();

            if !exemplars.is_empty() && exemplars == previous_exemplars {
                stable_for += 1;
                if stable_for >= self.convergence_iter {
                    converged = true;
                    break;
                }
            } else {
                stable_for = 0;
                previous_exemplars = exemplars;
            }
        }

        if previous_exemplars.is_empty() {
            return Err(Error::computation(
                "Affinity propagation produced no exemplars",
            ));
        }

        let labels = assign_to_exemplars(&similarity, &previous_exemplars);

        Ok(AffinityPropagationResult {
            labels,
            exemplars: previous_exemplars,
            n_iter,
            converged,
        })
    }

    /// Fit the model and return only the cluster labels
    pub fn fit_predict(&self, data: ArrayView2<f64>) -> Result<Array1<usize>> {
        let result = self.fit(data)?;
        Ok(result.labels)
    }

    /// Negative squared-Euclidean similarities with preference on the diagonal
    fn similarity_matrix(&self, data: ArrayView2<f64>) -> Result<Array2<f64>> {
        let n = data.nrows();
        let mut similarity = Array2::zeros((n, n));
        let mut off_diagonal = Vec::with_capacity(n * (n - 1) / 2);

        for i in 0..n {
            for j in (i + 1)..n {
                let s = -squared_euclidean(data.row(i), data.row(j))?;
                similarity[[i, j]] = s;
                similarity[[j, i]] = s;
                off_diagonal.push(s);
            }
        }

        let preference = match self.preference {
            Some(p) => p,
            None => median(&mut off_diagonal),
        };
        for i in 0..n {
            similarity[[i, i]] = preference;
        }

        Ok(similarity)
    }

    fn validate_input(&self, data: ArrayView2<f64>) -> Result<()> {
        validate_data(data)?;

        if !(0.5..1.0).contains(&self.damping) {
            return Err(Error::invalid_parameter("damping must lie in [0.5, 1)"));
        }
        if self.max_iter == 0 {
            return Err(Error::invalid_parameter("max_iter must be > 0"));
        }
        if self.convergence_iter == 0 {
            return Err(Error::invalid_parameter("convergence_iter must be > 0"));
        }
        if data.nrows() < 2 {
            return Err(Error::invalid_data(
                "Affinity propagation needs at least two points",
            ));
        }

        Ok(())
    }
}

/// Assign every point to its most similar exemplar, by exemplar position
fn assign_to_exemplars(similarity: &Array2<f64>, exemplars: &[usize]) -> Array1<usize> {
    let n = similarity.nrows();
    let mut labels = Array1::zeros(n);

    for i in 0..n {
        if let Some(pos) = exemplars.iter().position(|&e| e == i) {
            labels[i] = pos;
            continue;
        }
        let mut best = 0;
        let mut best_similarity = f64::NEG_INFINITY;
        for (pos, &e) in exemplars.iter().enumerate() {
            if similarity[[i, e]] > best_similarity {
                best_similarity = similarity[[i, e]];
                best = pos;
            }
        }
        labels[i] = best;
    }

    labels
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

//! K-means clustering (Lloyd's algorithm)

use crate::distance::{distances_to_centroids, squared_euclidean};
use crate::error::{Error, Result};
use crate::initialization::{initialize_centroids, InitMethod};
use crate::utils::{assignments_equal, get_cluster_indices, validate_data, validate_parameters};
use ndarray::{Array1, Array2, ArrayView2};
use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// K-means clusterer over dense numeric data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeans {
    /// Number of clusters
    pub n_clusters: usize,
    /// Initialization method
    pub init_method: InitMethod,
    /// Maximum number of iterations
    pub max_iter: usize,
    /// Tolerance on total squared centroid movement for convergence
    pub tol: f64,
    /// Number of initialization runs
    pub n_init: usize,
    /// Random seed for reproducibility
    pub random_state: Option<u64>,
    /// Number of parallel jobs (None = parallel when n_init > 1)
    pub n_jobs: Option<usize>,
}

/// Result of a k-means fit
#[derive(Debug, Clone)]
pub struct KMeansResult {
    /// Cluster labels for each data point
    pub labels: Array1<usize>,
    /// Final cluster centroids
    pub centroids: Array2<f64>,
    /// Number of iterations until convergence
    pub n_iter: usize,
    /// Final inertia (total within-cluster squared distance)
    pub inertia: f64,
    /// Whether the algorithm converged
    pub converged: bool,
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            n_clusters: 8,
            init_method: InitMethod::KMeansPlusPlus,
            max_iter: 300,
            tol: 1e-4,
            n_init: 10,
            random_state: None,
            n_jobs: None,
        }
    }
}

impl KMeans {
    /// Create a new k-means clusterer with the given number of clusters
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            ..Default::default()
        }
    }

    /// Set the initialization method
    pub fn init_method(mut self, method: InitMethod) -> Self {
        self.init_method = method;
        self
    }

    /// Set the maximum number of iterations
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the convergence tolerance
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the number of initialization runs
    pub fn n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Set the random seed for reproducibility
    pub fn random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Set the number of parallel jobs
    pub fn n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    /// Fit the algorithm and return the best of `n_init` runs
    pub fn fit(&self, data: ArrayView2<f64>) -> Result<KMeansResult> {
        self.validate_input(data)?;

        let results: Vec<Result<KMeansResult>> = if self.should_use_parallel() {
            (0..self.n_init)
                .into_par_iter()
                .map(|i| {
                    let seed = self.random_state.unwrap_or(0) + i as u64;
                    self.fit_single(data, seed)
                })
                .collect()
        } else {
            (0..self.n_init)
                .map(|i| {
                    let seed = self.random_state.unwrap_or(0) + i as u64;
                    self.fit_single(data, seed)
                })
                .collect()
        };

        let mut best_result: Option<KMeansResult> = None;
        let mut best_inertia = f64::INFINITY;
        for result in results {
            let result = result?;
            if result.inertia < best_inertia {
                best_inertia = result.inertia;
                best_result = Some(result);
            }
        }

        best_result.ok_or_else(|| Error::computation("No successful k-means runs"))
    }

    /// Fit the model and return only the cluster labels
    pub fn fit_predict(&self, data: ArrayView2<f64>) -> Result<Array1<usize>> {
        let result = self.fit(data)?;
        Ok(result.labels)
    }

    /// Single Lloyd's run from one initialization
    fn fit_single(&self, data: ArrayView2<f64>, seed: u64) -> Result<KMeansResult> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut centroids = initialize_centroids(data, self.n_clusters, self.init_method, &mut rng)?;

        let mut previous_labels: Option<Array1<usize>> = None;
        let mut n_iter = 0;
        let mut converged = false;

        for iter in 0..self.max_iter {
            n_iter = iter + 1;

            let labels = assign_labels(data, centroids.view())?;

            if let Some(ref prev_labels) = previous_labels {
                if assignments_equal(labels.view(), prev_labels.view()) {
                    converged = true;
                    break;
                }
            }

            let new_centroids = self.update_centroids(data, &labels, &mut rng)?;

            let mut shift = 0.0;
            for k in 0..self.n_clusters {
                shift += squared_euclidean(centroids.row(k), new_centroids.row(k))?;
            }
            centroids = new_centroids;
            previous_labels = Some(labels);

            if shift < self.tol {
                converged = true;
                break;
            }
        }

        let final_labels = assign_labels(data, centroids.view())?;
        let inertia = calculate_inertia(data, centroids.view(), &final_labels)?;

        Ok(KMeansResult {
            labels: final_labels,
            centroids,
            n_iter,
            inertia,
            converged,
        })
    }

    /// Recompute centroids as cluster means, reseeding any empty cluster
    fn update_centroids<R: Rng>(
        &self,
        data: ArrayView2<f64>,
        labels: &Array1<usize>,
        rng: &mut R,
    ) -> Result<Array2<f64>> {
        let cluster_indices = get_cluster_indices(labels.view(), self.n_clusters);
        let mut new_centroids = Array2::zeros((self.n_clusters, data.ncols()));

        for (cluster_id, indices) in cluster_indices.iter().enumerate() {
            if indices.is_empty() {
                // Reseed an empty cluster from a random data point
                let random_idx = rng.gen_range(0..data.nrows());
                new_centroids
                    .row_mut(cluster_id)
                    .assign(&data.row(random_idx));
            } else {
                let mut mean = Array1::zeros(data.ncols());
                for &row_idx in indices {
                    mean += &data.row(row_idx);
                }
                mean /= indices.len() as f64;
                new_centroids.row_mut(cluster_id).assign(&mean);
            }
        }

        Ok(new_centroids)
    }

    /// Validate input parameters and data
    fn validate_input(&self, data: ArrayView2<f64>) -> Result<()> {
        validate_parameters(self.n_clusters, self.max_iter, self.tol, self.n_init)?;
        validate_data(data)?;

        if self.n_clusters > data.nrows() {
            return Err(Error::invalid_parameter(
                "Number of clusters cannot exceed number of data points",
            ));
        }

        Ok(())
    }

    /// Determine if parallel processing should be used
    fn should_use_parallel(&self) -> bool {
        match self.n_jobs {
            Some(1) => false,
            Some(_) => true,
            None => self.n_init > 1,
        }
    }
}

/// Assign each point to its nearest centroid
fn assign_labels(data: ArrayView2<f64>, centroids: ArrayView2<f64>) -> Result<Array1<usize>> {
    let mut assignments = Array1::zeros(data.nrows());

    for (i, point) in data.rows().into_iter().enumerate() {
        let distances = distances_to_centroids(point, centroids)?;
        let mut closest = 0;
        let mut min_distance = f64::INFINITY;
        for (k, &d) in distances.iter().enumerate() {
            if d < min_distance {
                min_distance = d;
                closest = k;
            }
        }
        assignments[i] = closest;
    }

    Ok(assignments)
}

/// Total within-cluster squared distance
fn calculate_inertia(
    data: ArrayView2<f64>,
    centroids: ArrayView2<f64>,
    assignments: &Array1<usize>,
) -> Result<f64> {
    let mut total = 0.0;
    for (i, point) in data.rows().into_iter().enumerate() {
        let cluster_id = assignments[i];
        if cluster_id >= centroids.nrows() {
            return Err(Error::invalid_data("Invalid cluster assignment"));
        }
        total += squared_euclidean(point, centroids.row(cluster_id))?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_blobs() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.2, 0.1],
            [0.1, 0.3],
            [10.0, 10.0],
            [10.2, 10.1],
            [9.9, 10.3],
        ]
    }

    #[test]
    fn test_kmeans_creation() {
        let kmeans = KMeans::new(3);
        assert_eq!(kmeans.n_clusters, 3);
        assert_eq!(kmeans.init_method, InitMethod::KMeansPlusPlus);
    }

    #[test]
    fn test_kmeans_builder_pattern() {
        let kmeans = KMeans::new(5)
            .init_method(InitMethod::Random)
            .max_iter(50)
            .tolerance(0.001)
            .n_init(5)
            .random_state(42);

        assert_eq!(kmeans.n_clusters, 5);
        assert_eq!(kmeans.init_method, InitMethod::Random);
        assert_eq!(kmeans.max_iter, 50);
        assert_eq!(kmeans.tol, 0.001);
        assert_eq!(kmeans.n_init, 5);
        assert_eq!(kmeans.random_state, Some(42));
    }

    #[test]
    fn test_kmeans_separates_blobs() {
        let data = two_blobs();
        let kmeans = KMeans::new(2).random_state(42).n_init(3);

        let result = kmeans.fit(data.view()).unwrap();
        assert_eq!(result.labels.len(), 6);
        assert!(result.converged);
        // The two blobs end up in different clusters
        assert_eq!(result.labels[0], result.labels[1]);
        assert_eq!(result.labels[3], result.labels[4]);
        assert_ne!(result.labels[0], result.labels[3]);
    }

    #[test]
    fn test_kmeans_deterministic_with_seed() {
        let data = two_blobs();
        let kmeans = KMeans::new(2).random_state(7).n_init(4);

        let a = kmeans.fit_predict(data.view()).unwrap();
        let b = kmeans.fit_predict(data.view()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_kmeans_inertia_zero_on_exact_fit() {
        let data = array![[1.0, 1.0], [1.0, 1.0], [5.0, 5.0], [5.0, 5.0]];
        let kmeans = KMeans::new(2).random_state(42).n_init(3);

        let result = kmeans.fit(data.view()).unwrap();
        assert!(result.inertia.abs() < 1e-12);
    }

    #[test]
    fn test_invalid_parameters() {
        let data = array![[1.0], [2.0]];

        let kmeans = KMeans::new(3);
        assert!(kmeans.fit(data.view()).is_err());

        let kmeans = KMeans::new(0);
        assert!(kmeans.fit(data.view()).is_err());
    }

    #[test]
    fn test_empty_data() {
        let data = Array2::<f64>::zeros((0, 0));
        let kmeans = KMeans::new(1);
        assert!(kmeans.fit(data.view()).is_err());
    }
}

//! Gaussian mixture model with diagonal covariances, fit by EM

use crate::error::{Error, Result};
use crate::initialization::{initialize_centroids, InitMethod};
use crate::utils::{validate_data, validate_parameters};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Gaussian mixture clusterer (diagonal covariance)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianMixture {
    /// Number of mixture components
    pub n_components: usize,
    /// Maximum number of EM iterations
    pub max_iter: usize,
    /// Tolerance on the mean log-likelihood gain for convergence
    pub tol: f64,
    /// Floor added to every variance to keep components non-degenerate
    pub reg_covar: f64,
    /// Number of initialization runs
    pub n_init: usize,
    /// Random seed for reproducibility
    pub random_state: Option<u64>,
    /// Number of parallel jobs (None = parallel when n_init > 1)
    pub n_jobs: Option<usize>,
}

/// Result of a Gaussian mixture fit
#[derive(Debug, Clone)]
pub struct GaussianMixtureResult {
    /// Hard component labels (argmax responsibility) for each data point
    pub labels: Array1<usize>,
    /// Component means
    pub means: Array2<f64>,
    /// Per-feature component variances
    pub variances: Array2<f64>,
    /// Mixing weights, summing to 1
    pub weights: Array1<f64>,
    /// Mean per-sample log-likelihood of the final model
    pub log_likelihood: f64,
    /// Number of EM iterations run
    pub n_iter: usize,
    /// Whether EM converged
    pub converged: bool,
}

impl Default for GaussianMixture {
    fn default() -> Self {
        Self {
            n_components: 1,
            max_iter: 100,
            tol: 1e-3,
            reg_covar: 1e-6,
            n_init: 1,
            random_state: None,
            n_jobs: None,
        }
    }
}

impl GaussianMixture {
    /// Create a new mixture with the given number of components
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            ..Default::default()
        }
    }

    /// Set the maximum number of EM iterations
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the convergence tolerance
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the variance regularization floor
    pub fn reg_covar(mut self, reg_covar: f64) -> Self {
        self.reg_covar = reg_covar;
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

    /// Fit the mixture and return the best of `n_init` runs
    pub fn fit(&self, data: ArrayView2<f64>) -> Result<GaussianMixtureResult> {
        self.validate_input(data)?;

        let results: Vec<Result<GaussianMixtureResult>> = if self.should_use_parallel() {
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

        let mut best_result: Option<GaussianMixtureResult> = None;
        let mut best_ll = f64::NEG_INFINITY;
        for result in results {
            let result = result?;
            if result.log_likelihood > best_ll {
                best_ll = result.log_likelihood;
                best_result = Some(result);
            }
        }

        best_result.ok_or_else(|| Error::computation("No successful EM runs"))
    }

    /// Fit the model and return only the hard component labels
    pub fn fit_predict(&self, data: ArrayView2<f64>) -> Result<Array1<usize>> {
        let result = self.fit(data)?;
        Ok(result.labels)
    }

    /// Single EM run from one initialization
    fn fit_single(&self, data: ArrayView2<f64>, seed: u64) -> Result<GaussianMixtureResult> {
        let mut rng = StdRng::seed_from_u64(seed);
        let (n, d) = data.dim();
        let k = self.n_components;

        let mut means =
            initialize_centroids(data, k, InitMethod::KMeansPlusPlus, &mut rng)?;
        let mut variances = Array2::from_elem((k, d), 0.0);
        let column_var = column_variances(data);
        for comp in 0..k {
            for j in 0..d {
                variances[[comp, j]] = column_var[j] + self.reg_covar;
            }
        }
        let mut weights = Array1::from_elem(k, 1.0 / k as f64);

        let mut log_likelihood = f64::NEG_INFINITY;
        let mut n_iter = 0;
        let mut converged = false;
        let mut responsibilities = Array2::zeros((n, k));

        for iter in 0..self.max_iter {
            n_iter = iter + 1;

            // E-step: responsibilities via log-sum-exp
            let mut total_ll = 0.0;
            for i in 0..n {
                let mut log_probs = vec![0.0; k];
                for comp in 0..k {
                    log_probs[comp] = weights[comp].ln()
                        + log_gaussian_diag(
                            data.row(i),
                            means.row(comp),
                            variances.row(comp),
                        );
                }
                let max_lp = log_probs
                    .iter()
                    .fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
                let lse = max_lp
                    + log_probs
                        .iter()
                        .map(|lp| (lp - max_lp).exp())
                        .sum::<f64>()
                        .ln();
                total_ll += lse;
                for comp in 0..k {
                    responsibilities[[i, comp]] = (log_probs[comp] - lse).exp();
                }
            }
            let mean_ll = total_ll / n as f64;

            if (mean_ll - log_likelihood).abs() < self.tol {
                log_likelihood = mean_ll;
                converged = true;
                break;
            }
            log_likelihood = mean_ll;

            // M-step
            for comp in 0..k {
                let resp = responsibilities.column(comp);
                let nk: f64 = resp.sum();
                if nk <= 0.0 {
                    return Err(Error::computation(format!(
                        "Component {comp} collapsed to zero responsibility"
                    )));
                }
                weights[comp] = nk / n as f64;

                let mut mean = Array1::zeros(d);
                for i in 0..n {
                    mean.scaled_add(resp[i], &data.row(i));
                }
                mean /= nk;

                let mut var = Array1::zeros(d);
                for i in 0..n {
                    for j in 0..d {
                        let diff = data[[i, j]] - mean[j];
                        var[j] += resp[i] * diff * diff;
                    }
                }
                var /= nk;
                var += self.reg_covar;

                means.row_mut(comp).assign(&mean);
                variances.row_mut(comp).assign(&var);
            }
        }

        // Hard labels from final responsibilities
        let mut labels = Array1::zeros(n);
        for i in 0..n {
            let mut best = 0;
            let mut best_resp = f64::NEG_INFINITY;
            for comp in 0..k {
                if responsibilities[[i, comp]] > best_resp {
                    best_resp = responsibilities[[i, comp]];
                    best = comp;
                }
            }
            labels[i] = best;
        }

        Ok(GaussianMixtureResult {
            labels,
            means,
            variances,
            weights,
            log_likelihood,
            n_iter,
            converged,
        })
    }

    /// Validate input parameters and data
    fn validate_input(&self, data: ArrayView2<f64>) -> Result<()> {
        validate_parameters(self.n_components, self.max_iter, self.tol, self.n_init)?;
        validate_data(data)?;

        if self.n_components > data.nrows() {
            return Err(Error::invalid_parameter(
                "Number of components cannot exceed number of data points",
            ));
        }
        if self.reg_covar < 0.0 {
            return Err(Error::invalid_parameter("reg_covar must be >= 0"));
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

/// Log-density of a point under a diagonal-covariance Gaussian
fn log_gaussian_diag(
    x: ndarray::ArrayView1<f64>,
    mean: ndarray::ArrayView1<f64>,
    var: ndarray::ArrayView1<f64>,
) -> f64 {
    let mut acc = 0.0;
    for j in 0..x.len() {
        let v = var[j];
        let diff = x[j] - mean[j];
        acc += (2.0 * std::f64::consts::PI * v).ln() + diff * diff / v;
    }
    -0.5 * acc
}

/// Sample variance of each column (ddof = 0, regularized by the caller)
fn column_variances(data: ArrayView2<f64>) -> Array1<f64> {
    let n = data.nrows() as f64;
    let means = data.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(data.ncols()));
    let mut var = Array1::zeros(data.ncols());
    for row in data.rows() {
        for j in 0..data.ncols() {
            let diff = row[j] - means[j];
            var[j] += diff * diff;
        }
    }
    var / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_blobs() -> Array2<f64> {
        array![
            [0.0, 0.1],
            [0.2, 0.0],
            [-0.1, 0.2],
            [8.0, 8.1],
            [8.2, 7.9],
            [7.9, 8.2],
        ]
    }

    #[test]
    fn test_gmm_builder() {
        let gmm = GaussianMixture::new(3)
            .max_iter(50)
            .tolerance(1e-4)
            .reg_covar(1e-5)
            .n_init(2)
            .random_state(11);

        assert_eq!(gmm.n_components, 3);
        assert_eq!(gmm.max_iter, 50);
        assert_eq!(gmm.tol, 1e-4);
        assert_eq!(gmm.reg_covar, 1e-5);
        assert_eq!(gmm.n_init, 2);
        assert_eq!(gmm.random_state, Some(11));
    }

    #[test]
    fn test_gmm_separates_blobs() {
        let data = two_blobs();
        let gmm = GaussianMixture::new(2).random_state(42).n_init(3);

        let result = gmm.fit(data.view()).unwrap();
        assert_eq!(result.labels.len(), 6);
        assert_eq!(result.labels[0], result.labels[1]);
        assert_eq!(result.labels[3], result.labels[5]);
        assert_ne!(result.labels[0], result.labels[3]);
        let weight_sum: f64 = result.weights.sum();
        assert!((weight_sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_gmm_deterministic_with_seed() {
        let data = two_blobs();
        let gmm = GaussianMixture::new(2).random_state(5).n_init(2);

        let a = gmm.fit_predict(data.view()).unwrap();
        let b = gmm.fit_predict(data.view()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_gmm_single_component() {
        let data = two_blobs();
        let gmm = GaussianMixture::new(1).random_state(1);

        let result = gmm.fit(data.view()).unwrap();
        assert!(result.labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_gmm_invalid_parameters() {
        let data = array![[1.0], [2.0]];
        assert!(GaussianMixture::new(0).fit(data.view()).is_err());
        assert!(GaussianMixture::new(3).fit(data.view()).is_err());
    }
}

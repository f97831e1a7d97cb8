//! Dimensionality reduction: PCA followed by a 2-D neighbour embedding
//!
//! The ensemble clusters on the PCA output; the 2-D embedding exists only
//! so the result can be inspected on a scatter plot. Labels are never
//! derived from the embedding.

use crate::error::{Error, Result};
use crate::utils::validate_data;
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView2};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Principal component analysis via eigendecomposition of the covariance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pca {
    /// Number of components to keep
    pub n_components: usize,
}

/// A fitted PCA basis
#[derive(Debug, Clone)]
pub struct PcaModel {
    /// Per-feature means subtracted before projection
    pub mean: Array1<f64>,
    /// Projection matrix, features x components
    pub components: Array2<f64>,
    /// Variance explained by each kept component
    pub explained_variance: Array1<f64>,
}

impl Pca {
    /// Create a PCA reducer keeping `n_components` dimensions
    pub fn new(n_components: usize) -> Self {
        Self { n_components }
    }

    /// Fit the basis on the data
    pub fn fit(&self, data: ArrayView2<f64>) -> Result<PcaModel> {
        validate_data(data)?;
        let (n, d) = data.dim();

        if self.n_components == 0 {
            return Err(Error::invalid_parameter("n_components must be > 0"));
        }
        if self.n_components > d {
            return Err(Error::invalid_parameter(format!(
                "n_components ({}) cannot exceed number of features ({d})",
                self.n_components
            )));
        }
        if self.n_components > n {
            return Err(Error::invalid_parameter(format!(
                "n_components ({}) cannot exceed number of observations ({n})",
                self.n_components
            )));
        }

        let mut mean = Array1::zeros(d);
        for row in data.rows() {
            mean += &row;
        }
        mean /= n as f64;

        // Covariance of the centered data
        let mut centered = DMatrix::zeros(n, d);
        for i in 0..n {
            for j in 0..d {
                centered[(i, j)] = data[[i, j]] - mean[j];
            }
        }
        let denom = if n > 1 { (n - 1) as f64 } else { 1.0 };
        let covariance = centered.transpose() * &centered / denom;

        let eigen = SymmetricEigen::new(covariance);
        let mut order: Vec<usize> = (0..d).collect();
        order.sort_by(|&a, &b| {
            eigen.eigenvalues[b]
                .partial_cmp(&eigen.eigenvalues[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut components = Array2::zeros((d, self.n_components));
        let mut explained_variance = Array1::zeros(self.n_components);
        for (out, &src) in order.iter().take(self.n_components).enumerate() {
            explained_variance[out] = eigen.eigenvalues[src].max(0.0);
            for j in 0..d {
                components[[j, out]] = eigen.eigenvectors[(j, src)];
            }
        }

        Ok(PcaModel {
            mean,
            components,
            explained_variance,
        })
    }

    /// Fit on the data and project it in one step
    pub fn fit_transform(&self, data: ArrayView2<f64>) -> Result<Array2<f64>> {
        let model = self.fit(data)?;
        Ok(model.transform(data))
    }
}

impl PcaModel {
    /// Project data onto the fitted basis
    pub fn transform(&self, data: ArrayView2<f64>) -> Array2<f64> {
        let (n, _) = data.dim();
        let p = self.components.ncols();
        let mut out = Array2::zeros((n, p));
        for i in 0..n {
            for c in 0..p {
                let mut acc = 0.0;
                for j in 0..data.ncols() {
                    acc += (data[[i, j]] - self.mean[j]) * self.components[[j, c]];
                }
                out[[i, c]] = acc;
            }
        }
        out
    }
}

/// Fixed-bandwidth stochastic neighbour embedding into two dimensions
///
/// A deliberately small cousin of t-SNE: Gaussian input affinities with a
/// single median-distance bandwidth, Student-t low-dimensional kernel,
/// momentum gradient descent. Adequate for eyeballing a few hundred areas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighbourEmbedding {
    /// Number of gradient descent iterations
    pub n_iter: usize,
    /// Gradient step size
    pub learning_rate: f64,
    /// Random seed for the initial layout
    pub random_state: Option<u64>,
}

impl Default for NeighbourEmbedding {
    fn default() -> Self {
        Self {
            n_iter: 300,
            learning_rate: 50.0,
            random_state: None,
        }
    }
}

impl NeighbourEmbedding {
    /// Create an embedding with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of iterations
    pub fn n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    /// Set the learning rate
    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the random seed for reproducibility
    pub fn random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Embed the rows of `data` into two dimensions
    pub fn embed(&self, data: ArrayView2<f64>) -> Result<Array2<f64>> {
        validate_data(data)?;
        if self.n_iter == 0 {
            return Err(Error::invalid_parameter("n_iter must be > 0"));
        }
        if self.learning_rate <= 0.0 {
            return Err(Error::invalid_parameter("learning_rate must be > 0"));
        }

        let n = data.nrows();
        if n == 1 {
            return Ok(Array2::zeros((1, 2)));
        }

        let affinities = input_affinities(data)?;

        let mut rng = StdRng::seed_from_u64(self.random_state.unwrap_or(0));
        let mut layout = Array2::zeros((n, 2));
        for v in layout.iter_mut() {
            *v = rng.gen_range(-1e-2..1e-2);
        }
        let mut velocity = Array2::<f64>::zeros((n, 2));

        for iter in 0..self.n_iter {
            // Student-t kernel over the current layout
            let mut kernel = Array2::<f64>::zeros((n, n));
            let mut kernel_sum = 0.0_f64;
            for i in 0..n {
                for j in (i + 1)..n {
                    let dx = layout[[i, 0]] - layout[[j, 0]];
                    let dy = layout[[i, 1]] - layout[[j, 1]];
                    let k = 1.0 / (1.0 + dx * dx + dy * dy);
                    kernel[[i, j]] = k;
                    kernel[[j, i]] = k;
                    kernel_sum += 2.0 * k;
                }
            }
            let kernel_sum = kernel_sum.max(1e-12);

            let momentum = if iter < 50 { 0.5 } else { 0.8 };
            for i in 0..n {
                let mut grad = [0.0, 0.0];
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let q = (kernel[[i, j]] / kernel_sum).max(1e-12);
                    let coeff = 4.0 * (affinities[[i, j]] - q) * kernel[[i, j]];
                    grad[0] += coeff * (layout[[i, 0]] - layout[[j, 0]]);
                    grad[1] += coeff * (layout[[i, 1]] - layout[[j, 1]]);
                }
                for axis in 0..2 {
                    velocity[[i, axis]] =
                        momentum * velocity[[i, axis]] - self.learning_rate * grad[axis];
                    layout[[i, axis]] += velocity[[i, axis]];
                }
            }
        }

        Ok(layout)
    }
}

/// Symmetric, normalized Gaussian affinities with a median-distance bandwidth
fn input_affinities(data: ArrayView2<f64>) -> Result<Array2<f64>> {
    let n = data.nrows();
    let distances = crate::distance::pairwise_distances(data)?;

    let mut off_diagonal: Vec<f64> = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            off_diagonal.push(distances[[i, j]]);
        }
    }
    off_diagonal.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let bandwidth = off_diagonal[off_diagonal.len() / 2].max(1e-9);

    let mut affinities = Array2::zeros((n, n));
    let mut total = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let a = (-distances[[i, j]].powi(2) / (2.0 * bandwidth * bandwidth)).exp();
            affinities[[i, j]] = a;
            affinities[[j, i]] = a;
            total += 2.0 * a;
        }
    }
    let total = total.max(1e-12);
    affinities.mapv_inplace(|v| (v / total).max(1e-12));
    for i in 0..n {
        affinities[[i, i]] = 0.0;
    }

    Ok(affinities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_pca_recovers_dominant_axis() {
        // Variance lies along the first feature
        let data = array![
            [-2.0, 0.1],
            [-1.0, -0.1],
            [0.0, 0.0],
            [1.0, 0.1],
            [2.0, -0.1],
        ];
        let model = Pca::new(1).fit(data.view()).unwrap();
        // Dominant component points along x (up to sign)
        assert!(model.components[[0, 0]].abs() > 0.99);
        assert!(model.explained_variance[0] > 2.0);
    }

    #[test]
    fn test_pca_projection_shape() {
        let data = array![
            [1.0, 2.0, 3.0],
            [2.0, 3.0, 4.0],
            [5.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let reduced = Pca::new(2).fit_transform(data.view()).unwrap();
        assert_eq!(reduced.dim(), (4, 2));
    }

    #[test]
    fn test_pca_centers_data() {
        let data = array![[10.0, 20.0], [12.0, 22.0], [14.0, 24.0]];
        let reduced = Pca::new(1).fit_transform(data.view()).unwrap();
        let mean: f64 = reduced.column(0).sum() / 3.0;
        assert!(mean.abs() < 1e-9);
    }

    #[test]
    fn test_pca_rejects_bad_dimensions() {
        let data = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        assert!(Pca::new(0).fit(data.view()).is_err());
        assert!(Pca::new(3).fit(data.view()).is_err());
    }

    #[test]
    fn test_embedding_shape_and_determinism() {
        let data = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [5.0, 5.0],
            [5.1, 5.1],
        ];
        let embedding = NeighbourEmbedding::new().n_iter(50).random_state(3);

        let a = embedding.embed(data.view()).unwrap();
        let b = embedding.embed(data.view()).unwrap();
        assert_eq!(a.dim(), (4, 2));
        assert_eq!(a, b);
    }

    #[test]
    fn test_embedding_keeps_neighbours_close() {
        let data = array![
            [0.0, 0.0],
            [0.05, 0.05],
            [10.0, 10.0],
            [10.05, 10.05],
        ];
        let layout = NeighbourEmbedding::new()
            .n_iter(200)
            .random_state(11)
            .embed(data.view())
            .unwrap();

        let near = ((layout[[0, 0]] - layout[[1, 0]]).powi(2)
            + (layout[[0, 1]] - layout[[1, 1]]).powi(2))
        .sqrt();
        let far = ((layout[[0, 0]] - layout[[2, 0]]).powi(2)
            + (layout[[0, 1]] - layout[[2, 1]]).powi(2))
        .sqrt();
        assert!(near < far);
    }

    #[test]
    fn test_embedding_single_row() {
        let data = array![[1.0, 2.0]];
        let layout = NeighbourEmbedding::new().embed(data.view()).unwrap();
        assert_eq!(layout.dim(), (1, 2));
    }
}

//! Centroid initialization shared by the k-means and Gaussian mixture fits

use crate::distance::squared_euclidean;
use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView2};
use rand::prelude::*;
use std::collections::HashSet;

/// Initialization methods for centroid-based clustering
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InitMethod {
    /// Randomly select data points as initial centroids
    Random,
    /// D^2-weighted seeding (k-means++)
    KMeansPlusPlus,
}

/// Initialize centroids from the data
pub fn initialize_centroids<R>(
    data: ArrayView2<f64>,
    n_clusters: usize,
    method: InitMethod,
    rng: &mut R,
) -> Result<Array2<f64>>
where
    R: Rng,
{
    if n_clusters == 0 {
        return Err(Error::invalid_parameter("Number of clusters must be > 0"));
    }

    if n_clusters > data.nrows() {
        return Err(Error::invalid_parameter(
            "Number of clusters cannot exceed number of data points",
        ));
    }

    match method {
        InitMethod::Random => random_init(data, n_clusters, rng),
        InitMethod::KMeansPlusPlus => kmeanspp_init(data, n_clusters, rng),
    }
}

/// Random initialization: select k distinct data points as centroids
fn random_init<R>(data: ArrayView2<f64>, n_clusters: usize, rng: &mut R) -> Result<Array2<f64>>
where
    R: Rng,
{
    let mut selected_indices = HashSet::new();
    let n_points = data.nrows();

    while selected_indices.len() < n_clusters {
        let idx = rng.gen_range(0..n_points);
        selected_indices.insert(idx);
    }

    let mut indices: Vec<_> = selected_indices.into_iter().collect();
    indices.sort_unstable();

    let mut centroids = Array2::zeros((n_clusters, data.ncols()));
    for (i, &data_idx) in indices.iter().enumerate() {
        centroids.row_mut(i).assign(&data.row(data_idx));
    }

    Ok(centroids)
}

/// k-means++ initialization: sample each next centroid with probability
/// proportional to its squared distance from the nearest centroid so far
fn kmeanspp_init<R>(data: ArrayView2<f64>, n_clusters: usize, rng: &mut R) -> Result<Array2<f64>>
where
    R: Rng,
{
    let n_points = data.nrows();
    let mut latest = rng.gen_range(0..n_points);
    let mut chosen = vec![latest];

    // Squared distance from each point to its nearest chosen centroid
    let mut closest_sq = vec![f64::INFINITY; n_points];

    while chosen.len() < n_clusters {
        for i in 0..n_points {
            let d = squared_euclidean(data.row(i), data.row(latest))?;
            if d < closest_sq[i] {
                closest_sq[i] = d;
            }
        }

        let total: f64 = closest_sq.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut pick = n_points - 1;
            for (i, &d) in closest_sq.iter().enumerate() {
                target -= d;
                if target <= 0.0 {
                    pick = i;
                    break;
                }
            }
            pick
        } else {
            // All remaining points coincide with a centroid
            rng.gen_range(0..n_points)
        };
        chosen.push(next);
        latest = next;
    }

    let mut centroids = Array2::zeros((n_clusters, data.ncols()));
    for (i, &data_idx) in chosen.iter().enumerate() {
        centroids.row_mut(i).assign(&data.row(data_idx));
    }

    Ok(centroids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample_data() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.1, 0.0],
            [10.0, 10.0],
            [10.1, 10.0],
        ]
    }

    #[test]
    fn test_random_init() {
        let data = sample_data();
        let mut rng = StdRng::seed_from_u64(42);

        let centroids = random_init(data.view(), 2, &mut rng).unwrap();
        assert_eq!(centroids.dim(), (2, 2));
    }

    #[test]
    fn test_kmeanspp_spreads_centroids() {
        let data = sample_data();
        let mut rng = StdRng::seed_from_u64(42);

        let centroids = kmeanspp_init(data.view(), 2, &mut rng).unwrap();
        // The two seeds should land in different blobs
        let gap = squared_euclidean(centroids.row(0), centroids.row(1)).unwrap();
        assert!(gap > 50.0);
    }

    #[test]
    fn test_kmeanspp_duplicate_points() {
        let data = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        let mut rng = StdRng::seed_from_u64(7);

        let centroids = kmeanspp_init(data.view(), 2, &mut rng).unwrap();
        assert_eq!(centroids.dim(), (2, 2));
    }

    #[test]
    fn test_initialize_centroids() {
        let data = sample_data();
        let mut rng = StdRng::seed_from_u64(42);

        for method in [InitMethod::Random, InitMethod::KMeansPlusPlus] {
            let centroids = initialize_centroids(data.view(), 2, method, &mut rng).unwrap();
            assert_eq!(centroids.dim(), (2, 2));
        }
    }

    #[test]
    fn test_invalid_parameters() {
        let data = sample_data();
        let mut rng = StdRng::seed_from_u64(42);

        assert!(initialize_centroids(data.view(), 0, InitMethod::Random, &mut rng).is_err());
        assert!(initialize_centroids(data.view(), 5, InitMethod::Random, &mut rng).is_err());
    }
}

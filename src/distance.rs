//! Distance computations shared by the clusterers and diagnostics

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Squared Euclidean distance between two points
pub fn squared_euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::invalid_data("Vectors must have the same length"));
    }

    Ok(a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>())
}

/// Euclidean distance between two points
pub fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Result<f64> {
    squared_euclidean(a, b).map(f64::sqrt)
}

/// Euclidean distances from a point to every row of a centroid matrix
pub fn distances_to_centroids(
    point: ArrayView1<f64>,
    centroids: ArrayView2<f64>,
) -> Result<Vec<f64>> {
    if centroids.ncols() != point.len() {
        return Err(Error::invalid_data(
            "Point and centroids must have same number of features",
        ));
    }

    let mut distances = Vec::with_capacity(centroids.nrows());
    for centroid_row in centroids.rows() {
        distances.push(euclidean(point, centroid_row)?);
    }
    Ok(distances)
}

/// Full symmetric matrix of pairwise Euclidean distances between rows
pub fn pairwise_distances(data: ArrayView2<f64>) -> Result<Array2<f64>> {
    let n = data.nrows();
    let mut out = Array2::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let d = euclidean(data.row(i), data.row(j))?;
            out[[i, j]] = d;
            out[[j, i]] = d;
        }
    }
    Ok(out)
}

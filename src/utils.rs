//! Utility functions shared across the clustering pipeline

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Check if two assignment arrays are equal (for convergence testing)
pub fn assignments_equal(a: ArrayView1<usize>, b: ArrayView1<usize>) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b.iter()).all(|(&x, &y)| x == y)
}

/// Get indices of points assigned to each cluster
pub fn get_cluster_indices(assignments: ArrayView1<usize>, n_clusters: usize) -> Vec<Vec<usize>> {
    let mut cluster_indices = vec![Vec::new(); n_clusters];

    for (point_idx, &cluster_id) in assignments.iter().enumerate() {
        if cluster_id < n_clusters {
            cluster_indices[cluster_id].push(point_idx);
        }
    }

    cluster_indices
}

/// Calculate cluster sizes
pub fn cluster_sizes(assignments: ArrayView1<usize>, n_clusters: usize) -> Vec<usize> {
    let mut sizes = vec![0; n_clusters];

    for &cluster_id in assignments.iter() {
        if cluster_id < n_clusters {
            sizes[cluster_id] += 1;
        }
    }

    sizes
}

/// Validate clustering hyperparameters shared by the iterative algorithms
pub fn validate_parameters(
    n_clusters: usize,
    max_iter: usize,
    tol: f64,
    n_init: usize,
) -> Result<()> {
    if n_clusters == 0 {
        return Err(Error::invalid_parameter("n_clusters must be > 0"));
    }

    if max_iter == 0 {
        return Err(Error::invalid_parameter("max_iter must be > 0"));
    }

    if tol < 0.0 {
        return Err(Error::invalid_parameter("tol must be >= 0"));
    }

    if n_init == 0 {
        return Err(Error::invalid_parameter("n_init must be > 0"));
    }

    Ok(())
}

/// Validate a numeric data matrix: non-empty with finite entries
pub fn validate_data(data: ArrayView2<f64>) -> Result<()> {
    if data.nrows() == 0 {
        return Err(Error::invalid_data("Data cannot be empty"));
    }

    if data.ncols() == 0 {
        return Err(Error::invalid_data("Data must have at least one feature"));
    }

    if data.iter().any(|v| !v.is_finite()) {
        return Err(Error::invalid_data("Data must contain only finite values"));
    }

    Ok(())
}

/// Z-score each column in place, omitting NaN cells
///
/// Columns with fewer than two observed values, or zero spread, are left
/// untouched. The sample standard deviation (ddof = 1) is used.
pub fn zscore_columns(values: &mut Array2<f64>) {
    for mut column in values.columns_mut() {
        let observed: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
        if observed.len() < 2 {
            continue;
        }

        let n = observed.len() as f64;
        let mean = observed.iter().sum::<f64>() / n;
        let var = observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        if var <= 0.0 {
            continue;
        }
        let sd = var.sqrt();

        for v in column.iter_mut() {
            if !v.is_nan() {
                *v = (*v - mean) / sd;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, array};

    #[test]
    fn test_assignments_equal() {
        let a = arr1(&[0, 1, 0, 1]);
        let b = arr1(&[0, 1, 0, 1]);
        let c = arr1(&[1, 0, 1, 0]);

        assert!(assignments_equal(a.view(), b.view()));
        assert!(!assignments_equal(a.view(), c.view()));
    }

    #[test]
    fn test_get_cluster_indices() {
        let assignments = arr1(&[0, 1, 0, 1, 2]);
        let indices = get_cluster_indices(assignments.view(), 3);

        assert_eq!(indices[0], vec![0, 2]);
        assert_eq!(indices[1], vec![1, 3]);
        assert_eq!(indices[2], vec![4]);
    }

    #[test]
    fn test_cluster_sizes() {
        let assignments = arr1(&[0, 1, 0, 1, 2]);
        let sizes = cluster_sizes(assignments.view(), 3);

        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_validate_parameters() {
        assert!(validate_parameters(2, 100, 0.001, 10).is_ok());
        assert!(validate_parameters(0, 100, 0.001, 10).is_err());
        assert!(validate_parameters(2, 0, 0.001, 10).is_err());
        assert!(validate_parameters(2, 100, -0.1, 10).is_err());
        assert!(validate_parameters(2, 100, 0.001, 0).is_err());
    }

    #[test]
    fn test_validate_data() {
        let good = array![[1.0, 2.0], [3.0, 4.0]];
        assert!(validate_data(good.view()).is_ok());

        let empty = Array2::<f64>::zeros((0, 2));
        assert!(validate_data(empty.view()).is_err());

        let with_nan = array![[1.0, f64::NAN]];
        assert!(validate_data(with_nan.view()).is_err());
    }

    #[test]
    fn test_zscore_columns() {
        let mut values = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0]];
        zscore_columns(&mut values);

        // First column standardized to mean 0, sd 1
        let col0: Vec<f64> = values.column(0).to_vec();
        assert!((col0.iter().sum::<f64>()).abs() < 1e-12);
        assert!((col0[2] - 1.0).abs() < 1e-12);
        // Constant column untouched
        assert_eq!(values[[0, 1]], 10.0);
    }

    #[test]
    fn test_zscore_columns_skips_nan() {
        let mut values = array![[1.0], [f64::NAN], [3.0]];
        zscore_columns(&mut values);

        assert!(values[[1, 0]].is_nan());
        assert!((values[[0, 0]] + values[[2, 0]]).abs() < 1e-12);
    }
}

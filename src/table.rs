//! Typed tables for area-level indicator and benchmark data
//!
//! External data enters the crate through the record types here
//! (`IndicatorRow`, `BenchmarkRow`) and is validated as it is pivoted into
//! the wide matrices the clustering and scoring code consume.

use crate::error::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One long-form observation of a standardized indicator for an area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    /// Government-issued area code (county, unitary authority, or district)
    pub area_code: String,
    /// Indicator name
    pub indicator: String,
    /// Standardized (z-scored) value; NaN marks a missing observation
    pub value: f64,
}

/// Wide table of standardized indicator values, areas x indicators
///
/// Cells are z-scored reals; `NaN` marks a missing observation. Area codes
/// are unique and the table is immutable once built.
#[derive(Debug, Clone)]
pub struct IndicatorTable {
    area_codes: Vec<String>,
    indicators: Vec<String>,
    values: Array2<f64>,
}

impl IndicatorTable {
    /// Build a table directly from a value matrix
    pub fn new(
        area_codes: Vec<String>,
        indicators: Vec<String>,
        values: Array2<f64>,
    ) -> Result<Self> {
        if area_codes.is_empty() || indicators.is_empty() {
            return Err(Error::invalid_data(
                "Indicator table must have at least one area and one indicator",
            ));
        }
        if values.dim() != (area_codes.len(), indicators.len()) {
            return Err(Error::invalid_data(format!(
                "Value matrix shape {:?} does not match {} areas x {} indicators",
                values.dim(),
                area_codes.len(),
                indicators.len()
            )));
        }
        let unique: BTreeSet<_> = area_codes.iter().collect();
        if unique.len() != area_codes.len() {
            return Err(Error::invalid_data("Duplicate area codes"));
        }
        if values.iter().any(|v| v.is_infinite()) {
            return Err(Error::invalid_data(
                "Indicator values must be finite or NaN",
            ));
        }
        Ok(Self {
            area_codes,
            indicators,
            values,
        })
    }

    /// Pivot long-form records into a wide table
    ///
    /// Areas and indicators are ordered lexicographically; pairs never
    /// observed are left as NaN. A repeated (area, indicator) pair is
    /// rejected rather than silently overwritten.
    pub fn from_records(rows: &[IndicatorRow]) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::invalid_data("No indicator records supplied"));
        }

        let area_codes: Vec<String> = rows
            .iter()
            .map(|r| r.area_code.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let indicators: Vec<String> = rows
            .iter()
            .map(|r| r.indicator.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let area_idx: BTreeMap<&str, usize> = area_codes
            .iter()
            .enumerate()
            .map(|(i, a)| (a.as_str(), i))
            .collect();
        let ind_idx: BTreeMap<&str, usize> = indicators
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        let mut values = Array2::from_elem((area_codes.len(), indicators.len()), f64::NAN);
        for row in rows {
            if row.value.is_infinite() {
                return Err(Error::invalid_data(format!(
                    "Non-finite value for {} / {}",
                    row.area_code, row.indicator
                )));
            }
            let i = area_idx[row.area_code.as_str()];
            let j = ind_idx[row.indicator.as_str()];
            if !values[[i, j]].is_nan() {
                return Err(Error::invalid_data(format!(
                    "Duplicate record for {} / {}",
                    row.area_code, row.indicator
                )));
            }
            values[[i, j]] = row.value;
        }

        Self::new(area_codes, indicators, values)
    }

    /// Area codes, in row order
    pub fn area_codes(&self) -> &[String] {
        &self.area_codes
    }

    /// Indicator names, in column order
    pub fn indicators(&self) -> &[String] {
        &self.indicators
    }

    /// The underlying value matrix
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of areas (rows)
    pub fn n_areas(&self) -> usize {
        self.area_codes.len()
    }

    /// Number of indicators (columns)
    pub fn n_indicators(&self) -> usize {
        self.indicators.len()
    }

    /// Drop areas with any missing indicator value
    ///
    /// Returns the surviving area codes alongside a dense matrix. Errors if
    /// no area has complete data.
    pub fn complete_rows(&self) -> Result<(Vec<String>, Array2<f64>)> {
        let keep: Vec<usize> = (0..self.n_areas())
            .filter(|&i| self.values.row(i).iter().all(|v| !v.is_nan()))
            .collect();
        if keep.is_empty() {
            return Err(Error::invalid_data(
                "No area has complete indicator data",
            ));
        }

        let mut dense = Array2::zeros((keep.len(), self.n_indicators()));
        for (out, &i) in keep.iter().enumerate() {
            dense.row_mut(out).assign(&self.values.row(i));
        }
        let codes = keep.iter().map(|&i| self.area_codes[i].clone()).collect();
        Ok((codes, dense))
    }
}

/// One long-form early-years benchmark observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRow {
    /// Government-issued area code
    pub area_code: String,
    /// Academic year of the observation
    pub year: u16,
    /// Demographic subgroup ("Total" is the aggregate slice)
    pub subgroup: String,
    /// Outcome indicator name
    pub indicator: String,
    /// Raw score
    pub score: f64,
    /// Score standardized within (year, subgroup, indicator)
    pub zscore: f64,
}

/// Long-format benchmark table of early-years outcomes
#[derive(Debug, Clone)]
pub struct BenchmarkTable {
    rows: Vec<BenchmarkRow>,
}

impl BenchmarkTable {
    /// Validate and wrap long-form benchmark records
    pub fn from_records(rows: Vec<BenchmarkRow>) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::invalid_data("No benchmark records supplied"));
        }
        for row in &rows {
            if !row.zscore.is_finite() {
                return Err(Error::invalid_data(format!(
                    "Non-finite z-score for {} / {} ({})",
                    row.area_code, row.indicator, row.subgroup
                )));
            }
        }
        Ok(Self { rows })
    }

    /// The underlying records
    pub fn rows(&self) -> &[BenchmarkRow] {
        &self.rows
    }

    /// Distinct subgroups present in the table
    pub fn subgroups(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| r.subgroup.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Pivot one subgroup slice to a complete area x indicator matrix
    ///
    /// Duplicate (area, indicator) observations (e.g. several years) are
    /// averaged. Areas missing any indicator are dropped; if no area
    /// survives, or the subgroup has no rows at all, the benchmark is
    /// unusable and an error is returned.
    pub fn pivot(&self, subgroup: &str) -> Result<BenchmarkMatrix> {
        let slice: Vec<&BenchmarkRow> = self
            .rows
            .iter()
            .filter(|r| r.subgroup == subgroup)
            .collect();
        if slice.is_empty() {
            return Err(Error::missing_benchmark(format!(
                "No benchmark rows for subgroup {subgroup:?}"
            )));
        }

        let area_codes: Vec<String> = slice
            .iter()
            .map(|r| r.area_code.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let indicators: Vec<String> = slice
            .iter()
            .map(|r| r.indicator.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let area_idx: BTreeMap<&str, usize> = area_codes
            .iter()
            .enumerate()
            .map(|(i, a)| (a.as_str(), i))
            .collect();
        let ind_idx: BTreeMap<&str, usize> = indicators
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        let mut sums = Array2::<f64>::zeros((area_codes.len(), indicators.len()));
        let mut counts = Array2::<u32>::zeros((area_codes.len(), indicators.len()));
        for row in &slice {
            let i = area_idx[row.area_code.as_str()];
            let j = ind_idx[row.indicator.as_str()];
            sums[[i, j]] += row.zscore;
            counts[[i, j]] += 1;
        }

        let complete: Vec<usize> = (0..area_codes.len())
            .filter(|&i| (0..indicators.len()).all(|j| counts[[i, j]] > 0))
            .collect();
        if complete.is_empty() {
            return Err(Error::missing_benchmark(format!(
                "No area has complete benchmark data for subgroup {subgroup:?}"
            )));
        }

        let mut values = Array2::<f64>::zeros((complete.len(), indicators.len()));
        for (out, &i) in complete.iter().enumerate() {
            for j in 0..indicators.len() {
                values[[out, j]] = sums[[i, j]] / f64::from(counts[[i, j]]);
            }
        }
        let kept = complete
            .iter()
            .map(|&i| area_codes[i].clone())
            .collect();

        Ok(BenchmarkMatrix {
            area_codes: kept,
            indicators,
            values,
        })
    }
}

/// A pivoted, complete area x indicator slice of the benchmark table
#[derive(Debug, Clone)]
pub struct BenchmarkMatrix {
    area_codes: Vec<String>,
    indicators: Vec<String>,
    values: Array2<f64>,
}

impl BenchmarkMatrix {
    /// Area codes, in row order
    pub fn area_codes(&self) -> &[String] {
        &self.area_codes
    }

    /// Indicator names, in column order
    pub fn indicators(&self) -> &[String] {
        &self.indicators
    }

    /// The z-score matrix
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }
}

/// Mapping from area code to cluster id
///
/// Ids are non-negative and not necessarily contiguous or stable across
/// runs. Every area in the clustered table appears exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterAssignment {
    map: BTreeMap<String, usize>,
}

impl ClusterAssignment {
    /// Build an assignment from (area code, cluster id) pairs
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, usize)>) -> Self {
        Self {
            map: pairs.into_iter().collect(),
        }
    }

    /// Cluster id for an area, if assigned
    pub fn get(&self, area_code: &str) -> Option<usize> {
        self.map.get(area_code).copied()
    }

    /// Number of assigned areas
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no area is assigned
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of distinct cluster ids
    pub fn n_clusters(&self) -> usize {
        self.map.values().collect::<BTreeSet<_>>().len()
    }

    /// Iterate (area code, cluster id) pairs in area-code order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.map.iter().map(|(k, &v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn indicator_rows() -> Vec<IndicatorRow> {
        let mut rows = Vec::new();
        for (area, a, b) in [
            ("E001", 0.5, -1.0),
            ("E002", 1.5, 0.0),
            ("E003", -0.5, 1.0),
        ] {
            rows.push(IndicatorRow {
                area_code: area.into(),
                indicator: "obesity".into(),
                value: a,
            });
            rows.push(IndicatorRow {
                area_code: area.into(),
                indicator: "smoking".into(),
                value: b,
            });
        }
        rows
    }

    #[test]
    fn test_pivot_from_records() {
        let table = IndicatorTable::from_records(&indicator_rows()).unwrap();
        assert_eq!(table.n_areas(), 3);
        assert_eq!(table.n_indicators(), 2);
        assert_eq!(table.area_codes(), &["E001", "E002", "E003"]);
        // Columns are lexicographic: obesity before smoking
        assert_eq!(table.values()[[0, 0]], 0.5);
        assert_eq!(table.values()[[0, 1]], -1.0);
    }

    #[test]
    fn test_duplicate_record_rejected() {
        let mut rows = indicator_rows();
        rows.push(rows[0].clone());
        assert!(IndicatorTable::from_records(&rows).is_err());
    }

    #[test]
    fn test_duplicate_area_codes_rejected() {
        let values = array![[1.0, 2.0], [3.0, 4.0]];
        let result = IndicatorTable::new(
            vec!["E001".into(), "E001".into()],
            vec!["a".into(), "b".into()],
            values,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_complete_rows_drops_missing() {
        let values = array![[1.0, 2.0], [f64::NAN, 4.0], [5.0, 6.0]];
        let table = IndicatorTable::new(
            vec!["E001".into(), "E002".into(), "E003".into()],
            vec!["a".into(), "b".into()],
            values,
        )
        .unwrap();

        let (codes, dense) = table.complete_rows().unwrap();
        assert_eq!(codes, vec!["E001".to_string(), "E003".to_string()]);
        assert_eq!(dense.dim(), (2, 2));
        assert_eq!(dense[[1, 0]], 5.0);
    }

    fn benchmark_rows() -> Vec<BenchmarkRow> {
        let mut rows = Vec::new();
        for (area, z) in [("E001", 1.0), ("E002", -1.0)] {
            for indicator in ["point_score", "communication"] {
                rows.push(BenchmarkRow {
                    area_code: area.into(),
                    year: 2019,
                    subgroup: "Total".into(),
                    indicator: indicator.into(),
                    score: 100.0,
                    zscore: z,
                });
            }
        }
        rows
    }

    #[test]
    fn test_benchmark_pivot() {
        let table = BenchmarkTable::from_records(benchmark_rows()).unwrap();
        let matrix = table.pivot("Total").unwrap();
        assert_eq!(matrix.area_codes(), &["E001", "E002"]);
        assert_eq!(matrix.indicators().len(), 2);
        assert_eq!(matrix.values()[[0, 0]], 1.0);
    }

    #[test]
    fn test_benchmark_pivot_averages_years() {
        let mut rows = benchmark_rows();
        let mut repeat = rows[0].clone();
        repeat.year = 2021;
        repeat.zscore = 3.0;
        rows.push(repeat);

        let table = BenchmarkTable::from_records(rows).unwrap();
        let matrix = table.pivot("Total").unwrap();
        // (1.0 + 3.0) / 2
        assert_eq!(matrix.values()[[0, 0]], 2.0);
    }

    #[test]
    fn test_benchmark_incomplete_area_dropped() {
        let mut rows = benchmark_rows();
        rows.push(BenchmarkRow {
            area_code: "E003".into(),
            year: 2019,
            subgroup: "Total".into(),
            indicator: "point_score".into(),
            score: 90.0,
            zscore: 0.0,
        });

        let table = BenchmarkTable::from_records(rows).unwrap();
        let matrix = table.pivot("Total").unwrap();
        assert_eq!(matrix.area_codes(), &["E001", "E002"]);
    }

    #[test]
    fn test_benchmark_missing_subgroup() {
        let table = BenchmarkTable::from_records(benchmark_rows()).unwrap();
        assert!(matches!(
            table.pivot("Boys"),
            Err(crate::error::Error::MissingBenchmarkData { .. })
        ));
    }

    #[test]
    fn test_assignment_counts() {
        let assignment = ClusterAssignment::from_pairs([
            ("E001".to_string(), 0),
            ("E002".to_string(), 3),
            ("E003".to_string(), 0),
        ]);
        assert_eq!(assignment.len(), 3);
        assert_eq!(assignment.n_clusters(), 2);
        assert_eq!(assignment.get("E002"), Some(3));
        assert_eq!(assignment.get("E999"), None);
    }
}

//! JSON persistence for clustering outputs
//!
//! Two artifacts leave the pipeline: the finalized area-to-cluster map
//! consumed by downstream visualization code, and the list of diagnostic
//! records from a grid search, read back by reporting code.

use crate::error::Result;
use crate::grid::DiagnosticRecord;
use crate::table::ClusterAssignment;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Write the canonical area-to-cluster JSON object
pub fn write_assignment(path: impl AsRef<Path>, assignment: &ClusterAssignment) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), assignment)?;
    Ok(())
}

/// Read an area-to-cluster JSON object
pub fn read_assignment(path: impl AsRef<Path>) -> Result<ClusterAssignment> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Write grid-search diagnostic records as a JSON array
pub fn write_diagnostics(path: impl AsRef<Path>, records: &[DiagnosticRecord]) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), records)?;
    Ok(())
}

/// Read grid-search diagnostic records back
pub fn read_diagnostics(path: impl AsRef<Path>) -> Result<Vec<DiagnosticRecord>> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

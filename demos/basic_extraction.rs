//! Basic cluster extraction example
//!
//! This example builds a small synthetic indicator table, runs the
//! consensus extractor on it, and prints the resulting assignment.

use concord::{AlgorithmSweep, ClusterEnsemble, ClusterExtractor, IndicatorTable};
use ndarray::Array2;
use rand::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Fabricate a standardized indicator table: 30 areas in three latent
    // groups, 8 indicators each
    let mut rng = StdRng::seed_from_u64(7);
    let mut values = Array2::zeros((30, 8));
    for i in 0..30 {
        let center = match i / 10 {
            0 => -2.0,
            1 => 0.0,
            _ => 2.0,
        };
        for j in 0..8 {
            values[[i, j]] = center + rng.gen_range(-0.3..0.3);
        }
    }
    let area_codes = (0..30).map(|i| format!("E07{:06}", i)).collect();
    let indicators = (0..8).map(|j| format!("indicator_{}", j)).collect();
    let table = IndicatorTable::new(area_codes, indicators, values)?;

    println!("Indicator table: {} areas x {} indicators", table.n_areas(), table.n_indicators());
    println!();

    // A small ensemble: k-means over a few cluster counts plus affinity
    // propagation over two damping values
    let ensemble = ClusterEnsemble::new(vec![
        AlgorithmSweep::KMeans {
            n_clusters: vec![3, 4, 5],
        },
        AlgorithmSweep::AffinityPropagation {
            damping: vec![0.5, 0.7],
        },
    ])
    .n_runs(5);

    let extraction = ClusterExtractor::new(3, 1.0)
        .ensemble(ensemble)
        .random_state(42)
        .extract(&table)?;

    println!("Extracted {} communities:", extraction.n_clusters());
    for (area, cluster) in extraction.assignment.iter() {
        println!("  {area} -> cluster {cluster}");
    }
    println!();

    // The 2-D embedding is kept for plotting; each row lines up with
    // extraction.area_codes
    println!("First embedded coordinates (for a scatter plot):");
    for i in 0..3 {
        println!(
            "  {}: ({:.3}, {:.3})",
            extraction.area_codes[i],
            extraction.embedding[[i, 0]],
            extraction.embedding[[i, 1]]
        );
    }

    Ok(())
}

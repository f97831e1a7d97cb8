use concord::{
    cluster_heterogeneity, louvain_communities, AlgorithmSweep, BenchmarkRow, BenchmarkTable,
    ClusterEnsemble, ClusterExtractor, GridPoint, GridSearch, IndicatorTable, Pca,
};
use ndarray::Array2;
use rand::prelude::*;

/// Ten areas in two tight, well-separated groups of five, five indicators.
fn two_group_table() -> IndicatorTable {
    let mut rng = StdRng::seed_from_u64(99);
    let mut values = Array2::zeros((10, 5));
    for i in 0..10 {
        let center = if i < 5 { 2.0 } else { -2.0 };
        for j in 0..5 {
            values[[i, j]] = center + rng.gen_range(-0.05..0.05);
        }
    }
    let area_codes = (0..10).map(|i| format!("E{:03}", i)).collect();
    let indicators = (0..5).map(|j| format!("indicator_{}", j)).collect();
    IndicatorTable::new(area_codes, indicators, values).unwrap()
}

fn two_group_benchmark() -> BenchmarkTable {
    let mut rows = Vec::new();
    for i in 0..10 {
        for indicator in ["point_score", "communication"] {
            rows.push(BenchmarkRow {
                area_code: format!("E{:03}", i),
                year: 2019,
                subgroup: "Total".into(),
                indicator: indicator.into(),
                score: if i < 5 { 10.0 } else { 0.0 },
                zscore: if i < 5 { 10.0 } else { 0.0 },
            });
        }
    }
    BenchmarkTable::from_records(rows).unwrap()
}

fn small_ensemble() -> ClusterEnsemble {
    ClusterEnsemble::new(vec![AlgorithmSweep::KMeans {
        n_clusters: vec![2],
    }])
    .n_runs(5)
    .random_state(42)
}

#[test]
fn extractor_assigns_every_area() {
    let table = two_group_table();
    let extraction = ClusterExtractor::new(3, 1.0)
        .ensemble(small_ensemble())
        .random_state(42)
        .extract(&table)
        .unwrap();

    assert_eq!(extraction.assignment.len(), table.n_areas());
    for code in table.area_codes() {
        assert!(extraction.assignment.get(code).is_some());
    }
    assert!(extraction.assignment.n_clusters() <= table.n_areas());
}

#[test]
fn co_occurrence_graph_is_deterministic_under_fixed_seed() {
    let table = two_group_table();
    let (_, dense) = table.complete_rows().unwrap();
    let reduced = Pca::new(3).fit_transform(dense.view()).unwrap();

    let ensemble = ClusterEnsemble::new(vec![
        AlgorithmSweep::KMeans {
            n_clusters: vec![2, 3],
        },
        AlgorithmSweep::AffinityPropagation {
            damping: vec![0.5, 0.7],
        },
    ])
    .n_runs(3)
    .random_state(1234);

    let first = ensemble.co_occurrence(reduced.view()).unwrap();
    let second = ensemble.co_occurrence(reduced.view()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn stable_two_cluster_ensemble_builds_two_cliques() {
    // Five repetitions of an identical 2-cluster labelling should produce
    // two 5-node cliques of weight 5 with no cross-clique edges, and
    // community detection should recover the same partition.
    let table = two_group_table();
    let (area_codes, dense) = table.complete_rows().unwrap();
    let reduced = Pca::new(3).fit_transform(dense.view()).unwrap();

    let co = small_ensemble().co_occurrence(reduced.view()).unwrap();

    for i in 0..10 {
        for j in (i + 1)..10 {
            let same_group = (i < 5) == (j < 5);
            if same_group {
                assert_eq!(co.count(i, j), 5, "pair ({i}, {j})");
            } else {
                assert_eq!(co.count(i, j), 0, "pair ({i}, {j})");
            }
        }
    }

    let graph = co.to_graph();
    assert_eq!(graph.node_count(), 10);
    assert_eq!(graph.edge_count(), 20); // two 5-cliques

    let communities = louvain_communities(&graph, 1.0).unwrap();
    let first = &communities[0..5];
    let second = &communities[5..10];
    assert!(first.iter().all(|&c| c == first[0]));
    assert!(second.iter().all(|&c| c == second[0]));
    assert_ne!(first[0], second[0]);

    // And mapped back to area codes the split matches the construction
    assert_eq!(area_codes.len(), 10);
}

#[test]
fn clearly_separated_benchmark_scores_near_one() {
    let table = two_group_table();
    let extraction = ClusterExtractor::new(3, 1.0)
        .ensemble(small_ensemble())
        .random_state(42)
        .extract(&table)
        .unwrap();

    let matrix = two_group_benchmark().pivot("Total").unwrap();
    let het = cluster_heterogeneity(&matrix, &extraction.assignment).unwrap();

    assert!(het.silhouette > 0.9);
    assert!(het.silhouette <= 1.0);
    // One variance entry per benchmark indicator
    assert_eq!(het.indicator_variance.len(), 2);
    assert!(het.indicator_variance.contains_key("point_score"));
    assert!(het.indicator_variance.contains_key("communication"));
}

#[test]
fn grid_search_yields_one_tagged_record_per_point() {
    let table = two_group_table();
    let benchmark = two_group_benchmark();
    let grid = GridPoint::product(&[2, 3], &[0.8, 1.2]);
    assert_eq!(grid.len(), 4);

    let outcomes = GridSearch::new()
        .ensemble(small_ensemble())
        .run(&table, &benchmark, &grid);

    assert_eq!(outcomes.len(), 4);
    for (outcome, point) in outcomes.iter().zip(&grid) {
        let record = outcome.record().expect("grid point should succeed");
        assert_eq!(record.pca_components, point.pca_components);
        assert_eq!(record.resolution, point.resolution);
        assert!(record.n_clusters >= 2);
        assert!((-1.0..=1.0).contains(&record.silhouette));
    }
}

#[test]
fn persisted_outputs_round_trip() {
    let table = two_group_table();
    let benchmark = two_group_benchmark();
    let grid = GridPoint::product(&[2], &[1.0]);

    let outcomes = GridSearch::new()
        .ensemble(small_ensemble())
        .run(&table, &benchmark, &grid);
    let records: Vec<_> = outcomes
        .iter()
        .filter_map(|o| o.record().cloned())
        .collect();
    assert_eq!(records.len(), 1);

    let extraction = ClusterExtractor::new(2, 1.0)
        .ensemble(small_ensemble())
        .random_state(42)
        .extract(&table)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let assignment_path = dir.path().join("area_clusters.json");
    let diagnostics_path = dir.path().join("grid_results.json");

    concord::write_assignment(&assignment_path, &extraction.assignment).unwrap();
    concord::write_diagnostics(&diagnostics_path, &records).unwrap();

    assert_eq!(
        concord::read_assignment(&assignment_path).unwrap(),
        extraction.assignment
    );
    assert_eq!(concord::read_diagnostics(&diagnostics_path).unwrap(), records);
}

#[test]
fn incomplete_areas_are_dropped_but_rest_still_assigned() {
    let mut values = Array2::zeros((6, 3));
    for i in 0..6 {
        let center = if i < 3 { 1.5 } else { -1.5 };
        for j in 0..3 {
            values[[i, j]] = center + 0.01 * (i as f64) + 0.02 * (j as f64);
        }
    }
    values[[2, 1]] = f64::NAN;

    let table = IndicatorTable::new(
        (0..6).map(|i| format!("E{:03}", i)).collect(),
        (0..3).map(|j| format!("indicator_{}", j)).collect(),
        values,
    )
    .unwrap();

    let extraction = ClusterExtractor::new(2, 1.0)
        .ensemble(small_ensemble())
        .random_state(3)
        .extract(&table)
        .unwrap();

    assert_eq!(extraction.assignment.len(), 5);
    assert!(extraction.assignment.get("E002").is_none());
    assert!(extraction.assignment.get("E000").is_some());
}

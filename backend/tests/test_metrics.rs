//! Metrics aggregation tests
//!
//! Baseline and optimized scores must come from the same snapshot through
//! the same code path, so an all-zero holding vector scores identically to
//! the baseline by construction.

use chrono::Utc;
use transit_holding_core_rs::{
    compare_cycle, improvement_percent, MetricsHistory, RouteConfig, ServiceMetrics, Snapshot,
    SnapshotBuilder, VehicleRecord,
};
use uuid::Uuid;

fn vehicle(id: &str, progress: f64, delay: f64, arrival: f64) -> VehicleRecord {
    let mut record = VehicleRecord::new(id, progress, delay);
    record.reference_arrival_secs = Some(arrival);
    record
}

/// Three vehicles with gaps of 100 s and 500 s, mean 300 s.
fn uneven_snapshot() -> Snapshot {
    let records = vec![
        vehicle("V1", 10.0, 60.0, 600.0),
        vehicle("V2", 11.0, 0.0, 100.0),
        vehicle("V3", 12.0, -30.0, 0.0),
    ];
    SnapshotBuilder::new()
        .build(Utc::now(), records, vec![])
        .snapshot
}

#[test]
fn zero_holding_scores_equal_baseline() {
    let config = RouteConfig::default();
    let snapshot = uneven_snapshot();

    let comparison = compare_cycle(&snapshot, &config, &[0.0, 0.0, 0.0], Uuid::new_v4(), false);
    assert_eq!(comparison.baseline, comparison.optimized);
}

#[test]
fn evening_out_headways_improves_regularity_and_wait() {
    let config = RouteConfig::default();
    let snapshot = uneven_snapshot();

    // Gaps are 500 s (V1-V2) and 100 s (V2-V3). Holding the middle vehicle
    // 180 s rebalances them to 320 s and 280 s.
    let comparison = compare_cycle(&snapshot, &config, &[0.0, 180.0, 0.0], Uuid::new_v4(), false);

    assert!(comparison.optimized.regularity > comparison.baseline.regularity);
    assert!(comparison.optimized.expected_wait_secs < comparison.baseline.expected_wait_secs);
    assert!(comparison.optimized.bunching_rate < comparison.baseline.bunching_rate);
}

#[test]
fn expected_wait_formula_under_random_arrivals() {
    let config = RouteConfig::default();
    let snapshot = uneven_snapshot();

    // Gaps 100/500 under zero holding: mean 300, cv 2/3.
    let metrics = ServiceMetrics::compute(&snapshot, &config, &[0.0, 0.0, 0.0]);
    assert_eq!(metrics.mean_headway_secs, 300.0);
    assert!((metrics.headway_cv - 2.0 / 3.0).abs() < 1e-12);

    // E[H]/2 * (1 + cv^2) = 150 * (1 + 4/9)
    let expected = 150.0 * (1.0 + 4.0 / 9.0);
    assert!((metrics.expected_wait_secs - expected).abs() < 1e-9);
    assert!((metrics.regularity - 1.0 / 3.0).abs() < 1e-12);
}

#[test]
fn bunching_rate_counts_collapsed_pairs() {
    let config = RouteConfig::default();
    let snapshot = uneven_snapshot();

    // One of two gaps (100 s) is at or below the 120 s threshold.
    let metrics = ServiceMetrics::compute(&snapshot, &config, &[0.0, 0.0, 0.0]);
    assert_eq!(metrics.bunching_rate, 0.5);
}

#[test]
fn on_time_fraction_reflects_holding_pushback() {
    let config = RouteConfig::default();
    let snapshot = uneven_snapshot();

    // All three delays within the 120 s tolerance without holding; a 150 s
    // hold on V1 pushes its effective deviation to 210 s.
    let baseline = ServiceMetrics::compute(&snapshot, &config, &[0.0, 0.0, 0.0]);
    assert_eq!(baseline.on_time_fraction, 1.0);

    let held = ServiceMetrics::compute(&snapshot, &config, &[150.0, 0.0, 0.0]);
    assert!((held.on_time_fraction - 2.0 / 3.0).abs() < 1e-12);
}

#[test]
fn empty_snapshot_scores_neutral() {
    let config = RouteConfig::default();
    let metrics = ServiceMetrics::compute(&Snapshot::empty(Utc::now()), &config, &[]);

    assert_eq!(metrics.mean_headway_secs, 0.0);
    assert_eq!(metrics.headway_cv, 0.0);
    assert_eq!(metrics.on_time_fraction, 1.0);
    assert_eq!(metrics.bunching_rate, 0.0);
    assert_eq!(metrics.expected_wait_secs, 0.0);
}

#[test]
fn comparison_flattens_to_six_records() {
    let config = RouteConfig::default();
    let snapshot = uneven_snapshot();
    let cycle_id = Uuid::new_v4();

    let comparison = compare_cycle(&snapshot, &config, &[0.0, 0.0, 0.0], cycle_id, false);
    let records = comparison.records();

    assert_eq!(records.len(), 6);
    let names: Vec<&str> = records.iter().map(|r| r.metric.as_str()).collect();
    assert!(names.contains(&"regularity"));
    assert!(names.contains(&"expected_wait_secs"));
    assert!(records.iter().all(|r| r.cycle_id == cycle_id));
}

#[test]
fn improvement_percent_is_signed() {
    assert_eq!(improvement_percent(200.0, 150.0), Some(25.0));
    assert_eq!(improvement_percent(200.0, 250.0), Some(-25.0));
    assert_eq!(improvement_percent(0.0, 5.0), None);
}

#[test]
fn history_iterates_oldest_first() {
    let config = RouteConfig::default();
    let snapshot = uneven_snapshot();

    let mut history = MetricsHistory::new(3);
    let mut ids = Vec::new();
    for _ in 0..5 {
        let id = Uuid::new_v4();
        ids.push(id);
        history.push(compare_cycle(&snapshot, &config, &[0.0, 0.0, 0.0], id, false));
    }

    let retained: Vec<Uuid> = history.iter().map(|c| c.cycle_id).collect();
    assert_eq!(retained, ids[2..].to_vec());
    assert_eq!(history.latest().unwrap().cycle_id, ids[4]);
}

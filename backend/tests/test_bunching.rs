//! Bunching detector tests
//!
//! Default config: target headway 300 s, threshold fraction 0.4, so pairs at
//! or below 120 s are flagged and pairs at or below 60 s are High severity.

use chrono::Utc;
use transit_holding_core_rs::{
    detect_bunching, BunchingSeverity, RouteConfig, Snapshot, SnapshotBuilder, VehicleRecord,
};

fn pair_with_gap(gap_secs: f64) -> Snapshot {
    let mut lead = VehicleRecord::new("V_LEAD", 12.0, 0.0);
    lead.reference_arrival_secs = Some(0.0);
    let mut rear = VehicleRecord::new("V_REAR", 10.0, 0.0);
    rear.reference_arrival_secs = Some(gap_secs);

    SnapshotBuilder::new()
        .build(Utc::now(), vec![lead, rear], vec![])
        .snapshot
}

#[test]
fn gap_at_threshold_is_flagged() {
    let events = detect_bunching(&pair_with_gap(120.0), &RouteConfig::default());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].leader_id, "V_LEAD");
    assert_eq!(events[0].follower_id, "V_REAR");
    assert_eq!(events[0].severity, BunchingSeverity::Medium);
    assert_eq!(events[0].severity_ratio, 0.0);
}

#[test]
fn gap_near_target_is_not_flagged() {
    let events = detect_bunching(&pair_with_gap(290.0), &RouteConfig::default());
    assert!(events.is_empty());
}

#[test]
fn gap_just_above_threshold_is_not_flagged() {
    let events = detect_bunching(&pair_with_gap(121.0), &RouteConfig::default());
    assert!(events.is_empty());
}

#[test]
fn collapsed_gap_is_high_severity() {
    let events = detect_bunching(&pair_with_gap(30.0), &RouteConfig::default());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].severity, BunchingSeverity::High);
    assert!((events[0].severity_ratio - 0.75).abs() < 1e-12);
}

#[test]
fn half_threshold_boundary_is_high() {
    let events = detect_bunching(&pair_with_gap(60.0), &RouteConfig::default());
    assert_eq!(events[0].severity, BunchingSeverity::High);
}

#[test]
fn single_vehicle_never_bunches() {
    let snapshot = SnapshotBuilder::new()
        .build(
            Utc::now(),
            vec![VehicleRecord::new("V1", 10.0, 0.0)],
            vec![],
        )
        .snapshot;
    assert!(detect_bunching(&snapshot, &RouteConfig::default()).is_empty());
}

#[test]
fn each_collapsed_pair_reported_separately() {
    let mut v1 = VehicleRecord::new("V1", 10.0, 0.0);
    v1.reference_arrival_secs = Some(150.0);
    let mut v2 = VehicleRecord::new("V2", 11.0, 0.0);
    v2.reference_arrival_secs = Some(50.0);
    let mut v3 = VehicleRecord::new("V3", 12.0, 0.0);
    v3.reference_arrival_secs = Some(0.0);

    let snapshot = SnapshotBuilder::new()
        .build(Utc::now(), vec![v1, v2, v3], vec![])
        .snapshot;
    let events = detect_bunching(&snapshot, &RouteConfig::default());

    // V1 trails V2 by 100 s, V2 trails V3 by 50 s: both under the 120 s
    // threshold, the second under 60 s.
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].severity, BunchingSeverity::Medium);
    assert_eq!(events[1].severity, BunchingSeverity::High);
}

//! Property tests for the holding solver
//!
//! Whatever the fleet state, every successful solve must respect the holding
//! bounds and the minimum-headway constraint, and solving the same snapshot
//! twice must give the same answer bit for bit.

use std::time::Duration;

use chrono::Utc;
use proptest::prelude::*;
use transit_holding_core_rs::{
    projected_headways, solve_holding, RouteConfig, Snapshot, SnapshotBuilder, SolverError,
    StopRecord, VehicleRecord,
};

const BUDGET: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
struct FleetCase {
    progress_gaps: Vec<f64>,
    delays: Vec<f64>,
    waiting: Vec<i64>,
    max_holding_secs: f64,
}

fn fleet_case() -> impl Strategy<Value = FleetCase> {
    (2usize..6).prop_flat_map(|n| {
        (
            proptest::collection::vec(0.05f64..3.0, n),
            proptest::collection::vec(-600.0f64..600.0, n),
            proptest::collection::vec(0i64..40, n),
            0.0f64..240.0,
        )
            .prop_map(
                |(progress_gaps, delays, waiting, max_holding_secs)| FleetCase {
                    progress_gaps,
                    delays,
                    waiting,
                    max_holding_secs,
                },
            )
    })
}

fn build_snapshot(case: &FleetCase) -> Snapshot {
    let mut records = Vec::new();
    let mut stops = Vec::new();
    let mut progress = 0.0;

    for (i, ((gap, delay), waiting)) in case
        .progress_gaps
        .iter()
        .zip(&case.delays)
        .zip(&case.waiting)
        .enumerate()
    {
        progress += gap;
        let stop_id = format!("S{i}");
        let mut record = VehicleRecord::new(format!("V{i}"), progress, *delay);
        record.speed_mps = Some(8.0);
        record.stop_id = Some(stop_id.clone());
        records.push(record);
        stops.push(StopRecord::new(stop_id, i as u32, *waiting));
    }

    SnapshotBuilder::new()
        .build(Utc::now(), records, stops)
        .snapshot
}

fn config_for(case: &FleetCase) -> RouteConfig {
    let mut config = RouteConfig::default();
    config.max_holding_secs = case.max_holding_secs;
    config.validate().unwrap();
    config
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_decisions_respect_bounds_and_min_headway(case in fleet_case()) {
        let snapshot = build_snapshot(&case);
        let config = config_for(&case);

        match solve_holding(&snapshot, &config, BUDGET) {
            Ok(holdings) => {
                prop_assert_eq!(holdings.len(), snapshot.num_vehicles());
                for h in &holdings {
                    prop_assert!(*h >= 0.0 && *h <= config.max_holding_secs);
                    prop_assert_eq!(h.fract(), 0.0); // whole-second dispatch
                }
                for projected in projected_headways(&snapshot, &config, &holdings) {
                    prop_assert!(projected >= config.min_headway_secs - 1e-6);
                }
            }
            // Tightly packed fleets with a small holding cap can be genuinely
            // unstretchable; that is a degraded cycle, not a solver bug.
            Err(SolverError::Infeasible) => {}
            Err(other) => prop_assert!(false, "unexpected solver error: {other}"),
        }
    }

    #[test]
    fn prop_solves_are_deterministic(case in fleet_case()) {
        let snapshot = build_snapshot(&case);
        let config = config_for(&case);

        let first = solve_holding(&snapshot, &config, BUDGET);
        let second = solve_holding(&snapshot, &config, BUDGET);
        prop_assert_eq!(first, second);
    }
}

//! Headway and regularity calculations
//!
//! Vehicles in a snapshot are ordered ascending by route progress, so for a
//! consecutive pair the later vehicle leads and the earlier one follows.
//! Headway `H` is the time by which the follower trails the leader at a
//! common reference point: holding the follower widens the gap, holding the
//! leader narrows it.
//!
//! Every function takes the holding vector it should assume applied, so the
//! baseline (all-zero) and optimized metric paths run through identical code.

use crate::config::RouteConfig;
use crate::models::{Snapshot, Vehicle};
use serde::{Deserialize, Serialize};

/// Floor applied to reported speeds when estimating headways, so a stopped
/// vehicle does not produce an infinite gap.
const MIN_SPEED_MPS: f64 = 1.0;

/// Time gap by which `follower` trails `leader`.
///
/// Uses predicted reference-point arrivals when the feed supplied both,
/// otherwise estimates from the progress gap and the follower's speed.
fn headway_between(leader: &Vehicle, follower: &Vehicle, config: &RouteConfig) -> f64 {
    if let (Some(t_leader), Some(t_follower)) =
        (leader.reference_arrival_secs, follower.reference_arrival_secs)
    {
        return (t_follower - t_leader).max(0.0);
    }

    let progress_gap = (leader.route_progress - follower.route_progress).max(0.0);
    let distance_m = progress_gap * config.stop_spacing_m;
    distance_m / follower.speed_mps.max(MIN_SPEED_MPS)
}

/// Current headways, one per consecutive vehicle pair (n-1 entries).
///
/// `headways[k]` is the gap between follower `vehicles[k]` and leader
/// `vehicles[k + 1]`.
pub fn headways(snapshot: &Snapshot, config: &RouteConfig) -> Vec<f64> {
    let vehicles = snapshot.vehicles();
    vehicles
        .windows(2)
        .map(|pair| headway_between(&pair[1], &pair[0], config))
        .collect()
}

/// Headways projected after applying a holding vector.
///
/// `holdings` is aligned with snapshot vehicle order. For pair `k`:
/// `H'_k = H_k + h_follower - h_leader`, clamped at zero.
///
/// # Panics
/// Panics if `holdings` length differs from the vehicle count.
pub fn projected_headways(snapshot: &Snapshot, config: &RouteConfig, holdings: &[f64]) -> Vec<f64> {
    assert_eq!(
        holdings.len(),
        snapshot.num_vehicles(),
        "holding vector must match vehicle count"
    );
    headways(snapshot, config)
        .iter()
        .enumerate()
        .map(|(k, h)| (h + holdings[k] - holdings[k + 1]).max(0.0))
        .collect()
}

/// Summary statistics over one cycle's headways.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadwayStats {
    pub mean: f64,
    pub std_dev: f64,
    /// Coefficient of variation: std_dev / mean (0 when mean is 0)
    pub cv: f64,
    pub min: f64,
    pub max: f64,
    /// |mean - target headway|
    pub target_deviation: f64,
}

impl HeadwayStats {
    /// Compute stats; an empty slice yields all zeros (plus the full target
    /// deviation, since the route is delivering no service interval at all).
    pub fn from_headways(headways: &[f64], target_headway_secs: f64) -> Self {
        if headways.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                cv: 0.0,
                min: 0.0,
                max: 0.0,
                target_deviation: target_headway_secs,
            };
        }

        let n = headways.len() as f64;
        let mean = headways.iter().sum::<f64>() / n;
        let variance = headways.iter().map(|h| (h - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();
        let cv = if mean > 0.0 { std_dev / mean } else { 0.0 };

        let min = headways.iter().copied().fold(f64::INFINITY, f64::min);
        let max = headways.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            mean,
            std_dev,
            cv,
            min,
            max,
            target_deviation: (mean - target_headway_secs).abs(),
        }
    }
}

/// Service regularity: `1 - cv(headways)`.
///
/// Perfectly even headways score 1.0; any unevenness scores strictly less.
pub fn regularity(headways: &[f64]) -> f64 {
    let stats = HeadwayStats::from_headways(headways, 0.0);
    1.0 - stats.cv
}

/// Fraction of vehicles whose |delay + holding| is within the tolerance.
///
/// An empty snapshot is vacuously on time (1.0).
///
/// # Panics
/// Panics if `holdings` length differs from the vehicle count.
pub fn on_time_fraction(snapshot: &Snapshot, holdings: &[f64], tolerance_secs: f64) -> f64 {
    let vehicles = snapshot.vehicles();
    assert_eq!(
        holdings.len(),
        vehicles.len(),
        "holding vector must match vehicle count"
    );
    if vehicles.is_empty() {
        return 1.0;
    }

    let on_time = vehicles
        .iter()
        .zip(holdings)
        .filter(|(v, h)| (v.delay_secs + **h).abs() <= tolerance_secs)
        .count();
    on_time as f64 / vehicles.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_headways_give_regularity_one() {
        assert!((regularity(&[300.0, 300.0, 300.0, 300.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn one_collapsed_headway_lowers_regularity() {
        let r = regularity(&[0.0, 600.0, 600.0, 600.0]);
        assert!(r < 1.0);
    }

    #[test]
    fn stats_of_empty_headways_are_zero() {
        let stats = HeadwayStats::from_headways(&[], 300.0);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.cv, 0.0);
        assert_eq!(stats.target_deviation, 300.0);
    }
}

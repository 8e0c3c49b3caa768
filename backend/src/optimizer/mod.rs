//! Holding optimizer
//!
//! Formulates and solves the per-cycle holding problem: one bounded holding
//! duration per vehicle, minimizing a weighted sum of passenger wait cost,
//! schedule-deviation cost and bunching (headway-deviation) cost.
//!
//! The problem is re-built from the snapshot every cycle; no state is carried
//! between solves, so correctness never depends on incremental diffing.
//!
//! # Formulation
//!
//! Decision variables `h_i` in `[0, H_max]`, one per vehicle, on a one-second
//! grid (holding is dispatched in whole seconds). With vehicles ordered
//! ascending by route progress, pair `k` couples follower `k` and leader
//! `k + 1`; the projected headway after holding is
//! `H_k + h_k - h_{k+1}`.
//!
//! Objective, minimized:
//!
//! - wait cost: `w1 * sum(P_i_eff * h_i)` where `P_i_eff` is the waiting
//!   count at the vehicle's stop, scaled by stop importance and the
//!   occupancy factor;
//! - schedule cost: `w2 * sum(|d_i + h_i|)`;
//! - bunching cost: `w3 * sum(|target - projected_k|)` over pairs.
//!
//! Constraint per pair: `projected_k >= min_headway`.
//!
//! # Solving
//!
//! Both cost and constraint couple only consecutive vehicles, so the problem
//! is a chain and is solved exactly by dynamic programming: a backward value
//! pass over the holding grid, then a forward argmin pass that always takes
//! the smallest holding achieving the optimum. Among multiple optimal
//! holding vectors this selects the lexicographically smallest, which makes
//! repeated solves of the same snapshot bit-identical.

mod solver;

use std::time::Duration;

use thiserror::Error;

use crate::config::RouteConfig;
use crate::models::Snapshot;

/// Why a solve produced no usable holding vector.
///
/// Never fatal: the engine maps any of these to an all-zero, degraded cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// No holding vector satisfies the minimum-headway constraints within
    /// the holding bounds (a pair's gap cannot be stretched far enough)
    #[error("holding problem is infeasible under the minimum-headway constraints")]
    Infeasible,

    /// The solve exceeded its wall-clock budget and was abandoned
    #[error("solve exceeded its {budget_ms} ms budget")]
    TimedOut { budget_ms: u64 },

    /// The solver worker thread is gone (engine-level failure)
    #[error("solver worker disconnected")]
    WorkerLost,
}

/// One cycle's holding problem, extracted from a snapshot and config.
///
/// Carries plain vectors rather than borrowing the snapshot so it can be
/// shipped to the solver worker thread.
#[derive(Debug, Clone)]
pub struct HoldingProblem {
    /// Effective wait weight per vehicle: `w1 * waiting * importance * occupancy factor`
    wait_weights: Vec<f64>,

    /// Signed schedule delay per vehicle, seconds
    delays: Vec<f64>,

    /// Current headway per consecutive pair (`n - 1` entries;
    /// entry `k` couples vehicles `k` and `k + 1`)
    headways: Vec<f64>,

    target_headway: f64,
    min_headway: f64,
    schedule_weight: f64,
    bunching_weight: f64,

    /// Holding grid upper bound, whole seconds
    max_hold_secs: usize,
}

impl HoldingProblem {
    /// Build the cycle's problem from a snapshot.
    pub fn from_snapshot(snapshot: &Snapshot, config: &RouteConfig) -> Self {
        let wait_weights = snapshot
            .vehicles()
            .iter()
            .map(|v| {
                config.wait_weight
                    * snapshot.demand_weight_for(v)
                    * v.occupancy.wait_weight_factor()
            })
            .collect();

        let delays = snapshot.vehicles().iter().map(|v| v.delay_secs).collect();

        Self {
            wait_weights,
            delays,
            headways: crate::analytics::headway::headways(snapshot, config),
            target_headway: config.target_headway_secs,
            min_headway: config.min_headway_secs,
            schedule_weight: config.schedule_weight,
            bunching_weight: config.bunching_weight,
            max_hold_secs: config.max_holding_secs.round().max(0.0) as usize,
        }
    }

    /// Number of vehicles in the problem.
    pub fn num_vehicles(&self) -> usize {
        self.wait_weights.len()
    }

    /// Solve within the wall-clock budget.
    ///
    /// Returns one holding value per vehicle, in snapshot order, each within
    /// `[0, max_holding_secs]`. A snapshot with fewer than two vehicles has
    /// no headway relationship to optimize and yields an empty vector.
    pub fn solve(&self, budget: Duration) -> Result<Vec<f64>, SolverError> {
        solver::solve_chain(self, budget)
    }

    pub(crate) fn wait_weights(&self) -> &[f64] {
        &self.wait_weights
    }

    pub(crate) fn delays(&self) -> &[f64] {
        &self.delays
    }

    pub(crate) fn headways(&self) -> &[f64] {
        &self.headways
    }

    pub(crate) fn target_headway(&self) -> f64 {
        self.target_headway
    }

    pub(crate) fn min_headway(&self) -> f64 {
        self.min_headway
    }

    pub(crate) fn schedule_weight(&self) -> f64 {
        self.schedule_weight
    }

    pub(crate) fn bunching_weight(&self) -> f64 {
        self.bunching_weight
    }

    pub(crate) fn max_hold_secs(&self) -> usize {
        self.max_hold_secs
    }
}

/// Convenience wrapper: build and solve in one call.
pub fn solve_holding(
    snapshot: &Snapshot,
    config: &RouteConfig,
    budget: Duration,
) -> Result<Vec<f64>, SolverError> {
    HoldingProblem::from_snapshot(snapshot, config).solve(budget)
}

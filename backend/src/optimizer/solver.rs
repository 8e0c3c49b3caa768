//! Chain dynamic-programming solver for the holding problem
//!
//! `value[k][h]` is the optimal cost of vehicles `k..n` given `h_k = h`,
//! covering their vehicle costs and the pair costs between them. The value
//! pass runs back-to-front; decisions are then extracted front-to-back,
//! always taking the smallest holding that achieves the optimum, so tied
//! optima resolve to the lexicographically smallest vector.

use std::time::{Duration, Instant};

use super::{HoldingProblem, SolverError};

/// Tolerance for the minimum-headway feasibility check.
const FEAS_EPS: f64 = 1e-9;

#[inline]
fn check_budget(start: Instant, budget: Duration, budget_ms: u64) -> Result<(), SolverError> {
    if start.elapsed() > budget {
        Err(SolverError::TimedOut { budget_ms })
    } else {
        Ok(())
    }
}

pub(super) fn solve_chain(
    problem: &HoldingProblem,
    budget: Duration,
) -> Result<Vec<f64>, SolverError> {
    let n = problem.num_vehicles();
    if n < 2 {
        // No headway relationship to optimize.
        return Ok(Vec::new());
    }

    let start = Instant::now();
    let budget_ms = budget.as_millis() as u64;
    let grid = problem.max_hold_secs() + 1;

    let w2 = problem.schedule_weight();
    let w3 = problem.bunching_weight();
    let target = problem.target_headway();
    let min_headway = problem.min_headway();

    let vehicle_cost = |i: usize, h: usize| -> f64 {
        let hf = h as f64;
        problem.wait_weights()[i] * hf + w2 * (problem.delays()[i] + hf).abs()
    };

    // Pair k couples follower k (held by h_prev) and leader k + 1 (held by
    // h_next). Projected headway shrinks as the leader's hold grows.
    let projected =
        |k: usize, h_prev: usize, h_next: usize| problem.headways()[k] + h_prev as f64 - h_next as f64;
    let pair_cost =
        |k: usize, h_prev: usize, h_next: usize| w3 * (target - projected(k, h_prev, h_next)).abs();
    let pair_feasible =
        |k: usize, h_prev: usize, h_next: usize| projected(k, h_prev, h_next) + FEAS_EPS >= min_headway;

    // Backward value pass.
    let mut value = vec![vec![f64::INFINITY; grid]; n];
    for h in 0..grid {
        value[n - 1][h] = vehicle_cost(n - 1, h);
    }

    for k in (0..n - 1).rev() {
        for h in 0..grid {
            // One backward step is grid^2 work; recheck the budget per row
            // so an over-budget solve is abandoned within one row of it.
            check_budget(start, budget, budget_ms)?;
            let mut best = f64::INFINITY;
            for h_next in 0..grid {
                // Projected headway only shrinks as h_next grows; once the
                // pair is infeasible no larger hold can restore it.
                if !pair_feasible(k, h, h_next) {
                    break;
                }
                let cost = pair_cost(k, h, h_next) + value[k + 1][h_next];
                if cost < best {
                    best = cost;
                }
            }
            value[k][h] = vehicle_cost(k, h) + best;
        }
    }

    // Forward extraction, smallest optimal holding first.
    let mut holdings = vec![0usize; n];

    let mut best = f64::INFINITY;
    let mut best_h = None;
    for h in 0..grid {
        if value[0][h] < best {
            best = value[0][h];
            best_h = Some(h);
        }
    }
    holdings[0] = best_h.filter(|_| best.is_finite()).ok_or(SolverError::Infeasible)?;

    for k in 1..n {
        check_budget(start, budget, budget_ms)?;
        let h_prev = holdings[k - 1];
        let mut best = f64::INFINITY;
        let mut best_h = None;
        for h in 0..grid {
            if !pair_feasible(k - 1, h_prev, h) {
                break;
            }
            let cost = pair_cost(k - 1, h_prev, h) + value[k][h];
            if cost < best {
                best = cost;
                best_h = Some(h);
            }
        }
        holdings[k] = best_h.ok_or(SolverError::Infeasible)?;
    }

    Ok(holdings.into_iter().map(|h| h as f64).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use crate::models::{SnapshotBuilder, VehicleRecord};
    use chrono::Utc;

    fn two_vehicle_problem(gap_secs: f64, config: &RouteConfig) -> HoldingProblem {
        let mut rear = VehicleRecord::new("REAR", 10.0, 0.0);
        rear.reference_arrival_secs = Some(gap_secs);
        let mut lead = VehicleRecord::new("LEAD", 12.0, 0.0);
        lead.reference_arrival_secs = Some(0.0);

        let build = SnapshotBuilder::new().build(Utc::now(), vec![rear, lead], vec![]);
        HoldingProblem::from_snapshot(&build.snapshot, config)
    }

    #[test]
    fn restores_target_gap_when_holding_is_free() {
        let mut config = RouteConfig::default();
        config.schedule_weight = 0.0; // isolate the bunching term
        let problem = two_vehicle_problem(120.0, &config);

        let holdings = problem.solve(Duration::from_secs(5)).unwrap();
        // Follower held to stretch 120s up to the 300s target.
        assert_eq!(holdings, vec![180.0, 0.0]);
    }

    #[test]
    fn infeasible_when_gap_cannot_reach_min_headway() {
        let mut config = RouteConfig::default();
        config.max_holding_secs = 30.0;
        // Gap 10s, minimum 60s: even a full 30s hold cannot stretch it.
        let problem = two_vehicle_problem(10.0, &config);

        assert_eq!(
            problem.solve(Duration::from_secs(5)),
            Err(SolverError::Infeasible)
        );
    }

    #[test]
    fn over_budget_large_grid_solve_is_abandoned_quickly() {
        let mut config = RouteConfig::default();
        config.max_holding_secs = 3600.0;
        let problem = two_vehicle_problem(120.0, &config);

        // The full grid is millions of pair evaluations; a 1 ms budget must
        // abandon the solve mid-pass rather than run it to completion.
        let started = Instant::now();
        let result = problem.solve(Duration::from_millis(1));
        assert!(matches!(result, Err(SolverError::TimedOut { .. })));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn zero_budget_times_out() {
        let problem = two_vehicle_problem(120.0, &RouteConfig::default());
        assert!(matches!(
            problem.solve(Duration::ZERO),
            Err(SolverError::TimedOut { .. })
        ));
    }

    #[test]
    fn single_vehicle_has_no_decisions() {
        let build = SnapshotBuilder::new().build(
            Utc::now(),
            vec![VehicleRecord::new("ONLY", 5.0, 30.0)],
            vec![],
        );
        let problem = HoldingProblem::from_snapshot(&build.snapshot, &RouteConfig::default());
        assert_eq!(problem.solve(Duration::from_secs(1)).unwrap(), Vec::<f64>::new());
    }
}

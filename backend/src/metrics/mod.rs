//! Metrics aggregation and baseline comparison
//!
//! Every cycle is scored twice from the same snapshot: once with all-zero
//! holding (the counterfactual baseline) and once with the published
//! decisions. Both runs go through `ServiceMetrics::compute`, differing only
//! in the holding vector, so the comparison is apples-to-apples by
//! construction — demand and positions are never re-sampled.
//!
//! Cycle comparisons accumulate in a bounded ring buffer; the oldest cycle
//! is evicted when the buffer is full.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analytics::headway::{self, HeadwayStats};
use crate::config::RouteConfig;
use crate::models::Snapshot;

/// Service-quality metrics for one cycle under one holding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetrics {
    pub mean_headway_secs: f64,

    /// Coefficient of variation of headways
    pub headway_cv: f64,

    /// `1 - cv`; 1.0 is perfectly even service
    pub regularity: f64,

    /// Fraction of vehicles within the on-time tolerance
    pub on_time_fraction: f64,

    /// Fraction of vehicle pairs at or below the bunching threshold
    pub bunching_rate: f64,

    /// Expected passenger wait under random arrivals:
    /// `E[H]/2 * (1 + cv^2)`
    pub expected_wait_secs: f64,
}

impl ServiceMetrics {
    /// Score a snapshot with a holding vector applied.
    ///
    /// Pass all zeros for the no-holding baseline. Baseline and optimized
    /// paths share this exact code; only `holdings` differs.
    ///
    /// # Panics
    /// Panics if `holdings` length differs from the vehicle count.
    pub fn compute(snapshot: &Snapshot, config: &RouteConfig, holdings: &[f64]) -> Self {
        let gaps = headway::projected_headways(snapshot, config, holdings);
        let stats = HeadwayStats::from_headways(&gaps, config.target_headway_secs);

        let threshold = config.bunching_threshold_secs();
        let bunching_rate = if gaps.is_empty() {
            0.0
        } else {
            gaps.iter().filter(|g| **g <= threshold).count() as f64 / gaps.len() as f64
        };

        let expected_wait_secs = stats.mean / 2.0 * (1.0 + stats.cv * stats.cv);

        Self {
            mean_headway_secs: stats.mean,
            headway_cv: stats.cv,
            regularity: 1.0 - stats.cv,
            on_time_fraction: headway::on_time_fraction(
                snapshot,
                holdings,
                config.on_time_tolerance_secs,
            ),
            bunching_rate,
            expected_wait_secs,
        }
    }
}

/// One metric's baseline/optimized pair for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// Metric name, e.g. `"regularity"`
    pub metric: String,
    pub baseline: f64,
    pub optimized: f64,
    /// Cycle window this record covers
    pub cycle_id: Uuid,
    pub cycle_timestamp: DateTime<Utc>,
}

/// Baseline-vs-optimized comparison for one full cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleComparison {
    pub cycle_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub degraded: bool,
    pub baseline: ServiceMetrics,
    pub optimized: ServiceMetrics,
}

impl CycleComparison {
    /// Flatten into per-metric records for downstream consumers.
    pub fn records(&self) -> Vec<PerformanceRecord> {
        let pairs = [
            ("mean_headway_secs", self.baseline.mean_headway_secs, self.optimized.mean_headway_secs),
            ("headway_cv", self.baseline.headway_cv, self.optimized.headway_cv),
            ("regularity", self.baseline.regularity, self.optimized.regularity),
            ("on_time_fraction", self.baseline.on_time_fraction, self.optimized.on_time_fraction),
            ("bunching_rate", self.baseline.bunching_rate, self.optimized.bunching_rate),
            ("expected_wait_secs", self.baseline.expected_wait_secs, self.optimized.expected_wait_secs),
        ];
        pairs
            .into_iter()
            .map(|(metric, baseline, optimized)| PerformanceRecord {
                metric: metric.to_string(),
                baseline,
                optimized,
                cycle_id: self.cycle_id,
                cycle_timestamp: self.timestamp,
            })
            .collect()
    }
}

/// Score one cycle both ways and package the comparison.
pub fn compare_cycle(
    snapshot: &Snapshot,
    config: &RouteConfig,
    holdings: &[f64],
    cycle_id: Uuid,
    degraded: bool,
) -> CycleComparison {
    let zeros = vec![0.0; snapshot.num_vehicles()];
    CycleComparison {
        cycle_id,
        timestamp: snapshot.timestamp(),
        degraded,
        baseline: ServiceMetrics::compute(snapshot, config, &zeros),
        optimized: ServiceMetrics::compute(snapshot, config, holdings),
    }
}

/// Percentage improvement of `optimized` over `baseline` for a
/// lower-is-better metric. `None` when the baseline is zero.
pub fn improvement_percent(baseline: f64, optimized: f64) -> Option<f64> {
    if baseline == 0.0 {
        None
    } else {
        Some((baseline - optimized) / baseline * 100.0)
    }
}

/// Bounded history of cycle comparisons. Oldest evicted on overflow.
///
/// Written only by the scheduler; readers receive snapshots via the engine's
/// reader handle.
#[derive(Debug, Clone)]
pub struct MetricsHistory {
    ring: VecDeque<CycleComparison>,
    capacity: usize,
}

impl MetricsHistory {
    /// # Panics
    /// Panics if `capacity` is zero (config validation rejects it earlier).
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be positive");
        Self {
            ring: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, comparison: CycleComparison) {
        if self.ring.len() == self.capacity {
            self.ring.pop_front();
        }
        self.ring.push_back(comparison);
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&CycleComparison> {
        self.ring.back()
    }

    /// Oldest-first iteration over retained cycles.
    pub fn iter(&self) -> impl Iterator<Item = &CycleComparison> {
        self.ring.iter()
    }
}

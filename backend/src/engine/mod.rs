//! Rolling-horizon holding engine
//!
//! Drives the per-cycle pipeline: build snapshot -> analytics -> solve ->
//! publish decisions -> record metrics. Each cycle is self-contained; no
//! optimizer state survives between cycles.
//!
//! # Ownership
//!
//! The engine is the sole owner and single writer of the most recent
//! published cycle and of the metrics history. Consumers hold an
//! [`EngineReader`] and receive `Arc` clones of immutable published values
//! (copy-on-publish), so a reader can never observe a half-updated cycle.
//!
//! # Degradation
//!
//! A failed or over-budget solve is absorbed: the cycle publishes all-zero
//! holding decisions with the degraded flag set, and the loop continues.
//! Only an invalid `RouteConfig` is fatal, and only at construction time.

mod worker;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::analytics::bunching::{self, BunchingEvent};
use crate::config::{ConfigError, RouteConfig};
use crate::metrics::{self, CycleComparison, MetricsHistory};
use crate::models::{HoldingDecision, Snapshot, SnapshotBuilder, StopRecord, VehicleRecord};
use crate::optimizer::HoldingProblem;
use worker::SolverWorker;

/// Consecutive degraded cycles before the engine escalates its logging.
const PERSISTENT_DEGRADATION_THRESHOLD: u32 = 3;

/// Everything one cycle publishes, as a single immutable value.
#[derive(Debug, Clone)]
pub struct PublishedCycle {
    pub cycle_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub snapshot: Arc<Snapshot>,
    pub decisions: Arc<Vec<HoldingDecision>>,
    pub bunching_events: Arc<Vec<BunchingEvent>>,
    pub degraded: bool,
}

/// Summary returned to the caller after each cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Monotonic cycle number, starting at 1
    pub cycle: u64,
    pub cycle_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub num_vehicles: usize,
    /// Vehicles excluded by snapshot validation this cycle
    pub num_excluded: usize,
    pub num_decisions: usize,
    pub num_bunching_events: usize,
    pub degraded: bool,
    pub solve_duration: Duration,
}

/// Read-only handle onto the engine's published state.
///
/// Cheap to clone and safe to hold from any thread; every access returns an
/// `Arc` clone of immutable data.
#[derive(Clone)]
pub struct EngineReader {
    published: Arc<RwLock<Option<Arc<PublishedCycle>>>>,
    history: Arc<RwLock<MetricsHistory>>,
}

impl EngineReader {
    /// Most recently published cycle, if any cycle has run.
    pub fn latest(&self) -> Option<Arc<PublishedCycle>> {
        self.published.read().clone()
    }

    /// Latest baseline-vs-optimized comparison.
    pub fn latest_comparison(&self) -> Option<CycleComparison> {
        self.history.read().latest().cloned()
    }

    /// Run a closure over the retained metrics history.
    pub fn with_history<R>(&self, f: impl FnOnce(&MetricsHistory) -> R) -> R {
        f(&self.history.read())
    }
}

/// Upstream feed collaborator: supplies raw vehicle and stop-demand records
/// once per cycle. May block briefly on I/O.
pub trait FeedSource {
    fn poll(&mut self) -> (Vec<VehicleRecord>, Vec<StopRecord>);
}

/// The rolling-horizon scheduler for one route.
pub struct HoldingEngine {
    config: RouteConfig,
    builder: SnapshotBuilder,
    worker: SolverWorker,
    cycle_counter: u64,
    degraded_cycles: u64,
    consecutive_degraded: u32,
    published: Arc<RwLock<Option<Arc<PublishedCycle>>>>,
    history: Arc<RwLock<MetricsHistory>>,
}

impl HoldingEngine {
    /// Create an engine for one route.
    ///
    /// The config is validated here; an invalid config refuses to construct
    /// the engine, so a misconfigured route never enters the scheduling loop.
    pub fn new(config: RouteConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        log::info!(
            "holding engine for route {} starting: target headway {}s, max hold {}s, cycle every {}s",
            config.route_id,
            config.target_headway_secs,
            config.max_holding_secs,
            config.cycle_interval_secs
        );

        let history = MetricsHistory::new(config.history_capacity);

        Ok(Self {
            builder: SnapshotBuilder::new(),
            worker: SolverWorker::spawn(),
            cycle_counter: 0,
            degraded_cycles: 0,
            consecutive_degraded: 0,
            published: Arc::new(RwLock::new(None)),
            history: Arc::new(RwLock::new(history)),
            config,
        })
    }

    /// Hand out a read-only view of published state.
    pub fn reader(&self) -> EngineReader {
        EngineReader {
            published: Arc::clone(&self.published),
            history: Arc::clone(&self.history),
        }
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    /// Total cycles run so far.
    pub fn cycles_run(&self) -> u64 {
        self.cycle_counter
    }

    /// Total degraded cycles so far (observability counter).
    pub fn degraded_cycles(&self) -> u64 {
        self.degraded_cycles
    }

    /// Current run of consecutive degraded cycles.
    pub fn consecutive_degraded(&self) -> u32 {
        self.consecutive_degraded
    }

    /// Run one self-contained cycle from raw feed records.
    ///
    /// Never fails: malformed records are excluded, solver trouble degrades
    /// the cycle to zero holding. The report says what happened.
    pub fn cycle(
        &mut self,
        vehicle_records: Vec<VehicleRecord>,
        stop_records: Vec<StopRecord>,
    ) -> CycleReport {
        self.cycle_counter += 1;
        let cycle = self.cycle_counter;
        let cycle_id = Uuid::new_v4();
        let timestamp = Utc::now();

        let build = self.builder.build(timestamp, vehicle_records, stop_records);
        let snapshot = Arc::new(build.snapshot);
        let num_vehicles = snapshot.num_vehicles();

        let events = bunching::detect_bunching(&snapshot, &self.config);

        // Solve off-thread; a snapshot without a vehicle pair has nothing to
        // optimize and publishes no decisions.
        let solve_started = Instant::now();
        let (holdings, degraded) = if num_vehicles < 2 {
            (Vec::new(), false)
        } else {
            let problem = HoldingProblem::from_snapshot(&snapshot, &self.config);
            let budget = Duration::from_millis(self.config.solver_budget_ms);
            match self.worker.solve(cycle, problem, budget) {
                Ok(holdings) => (holdings, false),
                Err(err) => {
                    log::warn!(
                        "route {} cycle {}: solve failed ({}), publishing zero holding",
                        self.config.route_id,
                        cycle,
                        err
                    );
                    (vec![0.0; num_vehicles], true)
                }
            }
        };
        let solve_duration = solve_started.elapsed();

        let decisions: Vec<HoldingDecision> = snapshot
            .vehicles()
            .iter()
            .zip(&holdings)
            .map(|(vehicle, holding_secs)| HoldingDecision {
                vehicle_id: vehicle.id.clone(),
                holding_secs: *holding_secs,
                cycle_id,
                cycle_timestamp: timestamp,
                degraded,
            })
            .collect();

        // Metrics always score the full vehicle list, holding or not.
        let applied = if holdings.len() == num_vehicles {
            holdings
        } else {
            vec![0.0; num_vehicles]
        };
        let comparison = metrics::compare_cycle(&snapshot, &self.config, &applied, cycle_id, degraded);

        // Copy-on-publish: build the complete new cycle value, then swap.
        let published = Arc::new(PublishedCycle {
            cycle_id,
            timestamp,
            snapshot: Arc::clone(&snapshot),
            decisions: Arc::new(decisions),
            bunching_events: Arc::new(events),
            degraded,
        });
        let num_decisions = published.decisions.len();
        let num_bunching_events = published.bunching_events.len();
        *self.published.write() = Some(published);
        self.history.write().push(comparison);

        if degraded {
            self.degraded_cycles += 1;
            self.consecutive_degraded += 1;
            if self.consecutive_degraded == PERSISTENT_DEGRADATION_THRESHOLD {
                log::warn!(
                    "route {}: solver degraded for {} consecutive cycles",
                    self.config.route_id,
                    self.consecutive_degraded
                );
            }
        } else {
            self.consecutive_degraded = 0;
        }

        log::debug!(
            "route {} cycle {}: {} vehicles ({} excluded), {} decisions, {} bunched pairs, solve {:?}{}",
            self.config.route_id,
            cycle,
            num_vehicles,
            build.excluded.len(),
            num_decisions,
            num_bunching_events,
            solve_duration,
            if degraded { ", DEGRADED" } else { "" }
        );

        CycleReport {
            cycle,
            cycle_id,
            timestamp,
            num_vehicles,
            num_excluded: build.excluded.len(),
            num_decisions,
            num_bunching_events,
            degraded,
            solve_duration,
        }
    }

    /// Drive cycles from a feed source on the configured wall-clock
    /// interval, sleeping out the remainder of each interval.
    ///
    /// Runs `max_cycles` cycles, or forever when `None`.
    pub fn run(&mut self, source: &mut dyn FeedSource, max_cycles: Option<u64>) {
        let interval = Duration::from_secs(self.config.cycle_interval_secs);
        let mut completed = 0u64;

        loop {
            let started = Instant::now();

            let (vehicles, stops) = source.poll();
            self.cycle(vehicles, stops);

            completed += 1;
            if let Some(max) = max_cycles {
                if completed >= max {
                    return;
                }
            }

            if let Some(rest) = interval.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }
    }
}

// Manual Debug: the worker handle is not Debug.
impl std::fmt::Debug for HoldingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoldingEngine")
            .field("route_id", &self.config.route_id)
            .field("cycles_run", &self.cycle_counter)
            .field("degraded_cycles", &self.degraded_cycles)
            .field("consecutive_degraded", &self.consecutive_degraded)
            .finish()
    }
}

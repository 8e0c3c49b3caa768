//! Transit Holding Core - Rust Engine
//!
//! Real-time bus-holding decision engine for a single transit route. Every
//! cycle it takes a snapshot of vehicle positions/delays and stop-level
//! passenger demand, and computes a bounded holding duration per vehicle
//! that trades off passenger wait time, schedule adherence and bunching.
//!
//! # Architecture
//!
//! - **config**: validated per-route configuration (fail fast at startup)
//! - **models**: domain types (Vehicle, StopDemand, Snapshot, HoldingDecision)
//! - **analytics**: headway/regularity calculator and bunching detector
//! - **optimizer**: the per-cycle holding problem and its exact chain solver
//! - **engine**: rolling-horizon scheduler, solver worker, published state
//! - **metrics**: baseline-vs-optimized comparison and bounded history
//!
//! # Critical invariants
//!
//! 1. Every decision satisfies `0 <= holding_secs <= max_holding_secs`
//! 2. Identical snapshot + config produce bit-identical decisions
//! 3. Per-cycle failures degrade the cycle (zero holding, flag set) and
//!    never stop the loop; only config errors are fatal, and only at startup

// Module declarations
pub mod analytics;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod models;
pub mod optimizer;

// Re-exports for convenience
pub use analytics::{
    bunching::{detect_bunching, BunchingEvent, BunchingSeverity},
    headway::{headways, on_time_fraction, projected_headways, regularity, HeadwayStats},
};
pub use config::{ConfigError, RouteConfig};
pub use engine::{CycleReport, EngineReader, FeedSource, HoldingEngine, PublishedCycle};
pub use metrics::{
    compare_cycle, improvement_percent, CycleComparison, MetricsHistory, PerformanceRecord,
    ServiceMetrics,
};
pub use models::{
    DataError, ExcludedVehicle, HoldingDecision, Occupancy, Snapshot, SnapshotBuild,
    SnapshotBuilder, StopDemand, StopRecord, Vehicle, VehicleRecord,
};
pub use optimizer::{solve_holding, HoldingProblem, SolverError};

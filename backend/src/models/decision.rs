//! Holding decision record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One vehicle's holding instruction for one cycle.
///
/// Produced once per vehicle per cycle and never mutated after publication.
/// The invariant `0 <= holding_secs <= max_holding_secs` holds for every
/// decision the engine emits, degraded cycles included (they hold zero).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingDecision {
    /// Vehicle this decision applies to
    pub vehicle_id: String,

    /// Seconds to hold the vehicle at its current stop
    pub holding_secs: f64,

    /// Cycle correlation id shared by all records of the same cycle
    pub cycle_id: uuid::Uuid,

    /// Timestamp of the snapshot the decision was computed from
    pub cycle_timestamp: DateTime<Utc>,

    /// True when the solver fell back to zero holding this cycle
    pub degraded: bool,
}

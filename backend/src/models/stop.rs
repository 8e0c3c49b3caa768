//! Stop demand model

use serde::{Deserialize, Serialize};

/// Raw stop-demand record from the demand collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopRecord {
    /// Stop identifier
    pub stop_id: String,

    /// Position of the stop in the route's ordered sequence
    pub sequence: Option<u32>,

    /// Passengers currently waiting; negative values are rejected
    pub waiting_count: Option<i64>,

    /// Importance weight, >= 1.0 (interchange hubs weigh more)
    pub importance: Option<f64>,
}

impl StopRecord {
    pub fn new(stop_id: impl Into<String>, sequence: u32, waiting_count: i64) -> Self {
        Self {
            stop_id: stop_id.into(),
            sequence: Some(sequence),
            waiting_count: Some(waiting_count),
            importance: None,
        }
    }
}

/// Validated per-stop demand inside a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopDemand {
    /// Stop identifier
    pub stop_id: String,

    /// Position of the stop in the route's ordered sequence
    pub sequence: u32,

    /// Passengers currently waiting (non-negative by construction)
    pub waiting_count: u32,

    /// Importance weight, >= 1.0
    pub importance: f64,
}

impl StopDemand {
    /// Demand weight used in the optimizer's wait-cost term.
    pub fn weight(&self) -> f64 {
        f64::from(self.waiting_count) * self.importance
    }
}

//! Bunching detection
//!
//! Flags consecutive vehicle pairs whose headway has collapsed below a
//! fraction of the target. Output is advisory context for the optimizer's
//! weighting and for external alerting; the detector mutates nothing.

use serde::{Deserialize, Serialize};

use crate::analytics::headway;
use crate::config::RouteConfig;
use crate::models::Snapshot;

/// How far below the threshold a flagged pair's headway has fallen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BunchingSeverity {
    /// Headway below the bunching threshold (default 0.4 x target)
    Medium,
    /// Headway below half the threshold (default 0.2 x target)
    High,
}

/// One flagged vehicle pair. Recomputed fresh every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BunchingEvent {
    /// Vehicle ahead
    pub leader_id: String,

    /// Vehicle trailing it
    pub follower_id: String,

    /// Observed headway between the pair
    pub headway_secs: f64,

    pub severity: BunchingSeverity,

    /// How far below threshold, as a fraction of the threshold:
    /// `(threshold - headway) / threshold`, in [0, 1]
    pub severity_ratio: f64,
}

/// Detect bunched pairs in a snapshot.
///
/// A pair is flagged when its headway is at or below
/// `bunching_threshold_fraction x target_headway` (at-threshold counts as
/// bunched: a gap exactly at the limit already needs correction).
pub fn detect_bunching(snapshot: &Snapshot, config: &RouteConfig) -> Vec<BunchingEvent> {
    let vehicles = snapshot.vehicles();
    if vehicles.len() < 2 {
        return Vec::new();
    }

    let threshold = config.bunching_threshold_secs();
    let high_threshold = 0.5 * threshold;
    let gaps = headway::headways(snapshot, config);

    let mut events = Vec::new();
    for (k, gap) in gaps.iter().enumerate() {
        if *gap > threshold {
            continue;
        }

        let severity = if *gap <= high_threshold {
            BunchingSeverity::High
        } else {
            BunchingSeverity::Medium
        };

        events.push(BunchingEvent {
            leader_id: vehicles[k + 1].id.clone(),
            follower_id: vehicles[k].id.clone(),
            headway_secs: *gap,
            severity,
            severity_ratio: ((threshold - gap) / threshold).clamp(0.0, 1.0),
        });
    }

    if !events.is_empty() {
        log::warn!(
            "route {}: {} bunched pair(s) this cycle",
            config.route_id,
            events.len()
        );
    }

    events
}

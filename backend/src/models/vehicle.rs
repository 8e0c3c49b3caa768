//! Vehicle model
//!
//! Two shapes of the same thing:
//! - `VehicleRecord` is the raw upstream record, with every field optional
//!   the way a realtime position feed delivers it.
//! - `Vehicle` is the validated form that lives inside a `Snapshot`, with
//!   required fields guaranteed present and immutable for the cycle.

use serde::{Deserialize, Serialize};

/// Ordinal passenger-load bucket reported by the position feed.
///
/// Declaration order is the load order, so `Occupancy::Empty <
/// Occupancy::Full` holds via the derived `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Occupancy {
    Empty,
    ManySeats,
    FewSeats,
    Standing,
    Full,
}

impl Occupancy {
    /// Multiplier applied to a vehicle's waiting-passenger weight in the
    /// optimizer's wait-cost term.
    ///
    /// A full or standing-room vehicle boards few of the passengers waiting
    /// at its stop, so delaying its departure costs them proportionally less.
    pub fn wait_weight_factor(self) -> f64 {
        match self {
            Occupancy::Full => 0.25,
            Occupancy::Standing => 0.5,
            _ => 1.0,
        }
    }
}

/// Raw vehicle record from the upstream position feed.
///
/// Mirrors the optionality of realtime feeds: any field may be absent.
/// `route_progress` and `delay_secs` are required downstream; a record
/// missing either is excluded from the cycle by the snapshot builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleRecord {
    /// Unique vehicle identifier
    pub vehicle_id: String,

    /// Monotonic position along the route's ordered stop sequence
    /// (fractional between stops)
    pub route_progress: Option<f64>,

    /// Scheduled-vs-actual delay in seconds (positive = late)
    pub delay_secs: Option<f64>,

    /// Instantaneous speed in metres per second
    pub speed_mps: Option<f64>,

    /// Reported passenger load bucket
    pub occupancy: Option<Occupancy>,

    /// Stop the vehicle is currently serving, if any
    pub stop_id: Option<String>,

    /// Predicted arrival at the route's common reference point, in seconds
    /// relative to the snapshot timestamp. Absent when the feed carries no
    /// trip updates; headways are then estimated from progress and speed.
    pub reference_arrival_secs: Option<f64>,
}

impl VehicleRecord {
    /// Minimal record with only the required fields set.
    pub fn new(vehicle_id: impl Into<String>, route_progress: f64, delay_secs: f64) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            route_progress: Some(route_progress),
            delay_secs: Some(delay_secs),
            speed_mps: None,
            occupancy: None,
            stop_id: None,
            reference_arrival_secs: None,
        }
    }
}

/// Validated vehicle state within one snapshot.
///
/// Owned exclusively by its `Snapshot`; never mutated after the snapshot is
/// published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    /// Unique vehicle identifier
    pub id: String,

    /// Monotonic position along the route's ordered stop sequence
    pub route_progress: f64,

    /// Scheduled-vs-actual delay in seconds (positive = late)
    pub delay_secs: f64,

    /// Speed in metres per second (defaulted when the feed omitted it)
    pub speed_mps: f64,

    /// Passenger load bucket (defaults to `ManySeats` when unreported)
    pub occupancy: Occupancy,

    /// Stop currently served, used to look up waiting-passenger demand
    pub stop_id: Option<String>,

    /// Predicted arrival offset at the common reference point, if known
    pub reference_arrival_secs: Option<f64>,
}

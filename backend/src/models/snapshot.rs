//! Per-cycle snapshot assembly
//!
//! The `SnapshotBuilder` turns raw feed records into a validated `Snapshot`.
//! Validation is per-record: a malformed vehicle or stop is excluded from the
//! cycle and logged, never fatal. A cycle with zero valid vehicles produces
//! an empty snapshot, which flows through the pipeline yielding empty
//! decision and event sets.
//!
//! A snapshot is immutable once built. Each cycle builds a fresh one;
//! superseded snapshots are dropped, never patched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::stop::{StopDemand, StopRecord};
use super::vehicle::{Occupancy, Vehicle, VehicleRecord};

/// Speed assumed when the feed reports none, for headway estimation.
const DEFAULT_SPEED_MPS: f64 = 8.0;

/// Per-record validation failure.
///
/// Always recovered by excluding the offending record from the current
/// cycle's snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("field `{field}` is not finite: {value}")]
    NotFinite { field: &'static str, value: f64 },

    #[error("field `{field}` is negative: {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("field `{field}` is out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },

    #[error("importance must be >= 1.0, got {value}")]
    ImportanceTooLow { value: f64 },

    #[error("duplicate id `{id}` already present this cycle")]
    Duplicate { id: String },
}

/// A vehicle dropped from the cycle, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedVehicle {
    pub vehicle_id: String,
    pub reason: DataError,
}

/// Validated per-cycle state: ordered vehicles plus stop demands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    timestamp: DateTime<Utc>,
    /// Ascending by route progress: index 0 trails, the last vehicle leads.
    vehicles: Vec<Vehicle>,
    stops: Vec<StopDemand>,
}

impl Snapshot {
    /// Empty snapshot for a cycle with no valid vehicles.
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            vehicles: Vec::new(),
            stops: Vec::new(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Vehicles in ascending route-progress order.
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn stops(&self) -> &[StopDemand] {
        &self.stops
    }

    pub fn num_vehicles(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Demand weight (waiting count x importance) at the stop a vehicle is
    /// currently serving. Zero when the vehicle is between stops or the stop
    /// reported no demand this cycle.
    pub fn demand_weight_for(&self, vehicle: &Vehicle) -> f64 {
        let Some(stop_id) = vehicle.stop_id.as_deref() else {
            return 0.0;
        };
        self.stops
            .iter()
            .find(|s| s.stop_id == stop_id)
            .map(StopDemand::weight)
            .unwrap_or(0.0)
    }
}

/// Result of one snapshot build: the snapshot plus the records it excluded.
#[derive(Debug, Clone)]
pub struct SnapshotBuild {
    pub snapshot: Snapshot,
    pub excluded: Vec<ExcludedVehicle>,
}

/// Assembles validated snapshots from raw feed records.
#[derive(Debug, Clone, Default)]
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build a snapshot for one cycle.
    ///
    /// Vehicles missing progress or delay (or carrying non-finite values)
    /// are excluded and reported in the build result; malformed stop records
    /// are dropped with a warning. Neither is an error.
    pub fn build(
        &self,
        timestamp: DateTime<Utc>,
        vehicle_records: Vec<VehicleRecord>,
        stop_records: Vec<StopRecord>,
    ) -> SnapshotBuild {
        let mut vehicles = Vec::with_capacity(vehicle_records.len());
        let mut excluded = Vec::new();
        let mut seen_ids = std::collections::HashSet::new();

        for record in vehicle_records {
            match Self::validate_vehicle(&record, &mut seen_ids) {
                Ok(vehicle) => vehicles.push(vehicle),
                Err(reason) => {
                    log::warn!(
                        "excluding vehicle {} from cycle: {}",
                        record.vehicle_id,
                        reason
                    );
                    excluded.push(ExcludedVehicle {
                        vehicle_id: record.vehicle_id,
                        reason,
                    });
                }
            }
        }

        // No overtaking assumed: ascending progress, ties broken by id so
        // repeated builds order identically.
        vehicles.sort_by(|a, b| {
            a.route_progress
                .partial_cmp(&b.route_progress)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut stops = Vec::with_capacity(stop_records.len());
        for record in stop_records {
            match Self::validate_stop(&record) {
                Ok(stop) => stops.push(stop),
                Err(reason) => {
                    log::warn!("dropping stop record {}: {}", record.stop_id, reason);
                }
            }
        }
        stops.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.stop_id.cmp(&b.stop_id)));

        SnapshotBuild {
            snapshot: Snapshot {
                timestamp,
                vehicles,
                stops,
            },
            excluded,
        }
    }

    fn validate_vehicle(
        record: &VehicleRecord,
        seen_ids: &mut std::collections::HashSet<String>,
    ) -> Result<Vehicle, DataError> {
        let progress = record.route_progress.ok_or(DataError::MissingField {
            field: "route_progress",
        })?;
        if !progress.is_finite() {
            return Err(DataError::NotFinite {
                field: "route_progress",
                value: progress,
            });
        }

        let delay = record.delay_secs.ok_or(DataError::MissingField {
            field: "delay_secs",
        })?;
        if !delay.is_finite() {
            return Err(DataError::NotFinite {
                field: "delay_secs",
                value: delay,
            });
        }

        let speed = match record.speed_mps {
            Some(s) if !s.is_finite() => {
                return Err(DataError::NotFinite {
                    field: "speed_mps",
                    value: s,
                })
            }
            Some(s) if s < 0.0 => {
                return Err(DataError::Negative {
                    field: "speed_mps",
                    value: s,
                })
            }
            Some(s) => s,
            None => DEFAULT_SPEED_MPS,
        };

        if !seen_ids.insert(record.vehicle_id.clone()) {
            return Err(DataError::Duplicate {
                id: record.vehicle_id.clone(),
            });
        }

        // A bogus predicted arrival is not worth excluding the vehicle over;
        // the headway calculator falls back to the progress/speed estimate.
        let reference_arrival_secs = record.reference_arrival_secs.filter(|t| t.is_finite());

        Ok(Vehicle {
            id: record.vehicle_id.clone(),
            route_progress: progress,
            delay_secs: delay,
            speed_mps: speed,
            occupancy: record.occupancy.unwrap_or(Occupancy::ManySeats),
            stop_id: record.stop_id.clone(),
            reference_arrival_secs,
        })
    }

    fn validate_stop(record: &StopRecord) -> Result<StopDemand, DataError> {
        let sequence = record
            .sequence
            .ok_or(DataError::MissingField { field: "sequence" })?;

        let waiting = record.waiting_count.ok_or(DataError::MissingField {
            field: "waiting_count",
        })?;
        if waiting < 0 {
            return Err(DataError::Negative {
                field: "waiting_count",
                value: waiting as f64,
            });
        }
        let waiting = u32::try_from(waiting).map_err(|_| DataError::OutOfRange {
            field: "waiting_count",
            value: waiting,
        })?;

        let importance = match record.importance {
            Some(i) if !i.is_finite() => {
                return Err(DataError::NotFinite {
                    field: "importance",
                    value: i,
                })
            }
            Some(i) if i < 1.0 => return Err(DataError::ImportanceTooLow { value: i }),
            Some(i) => i,
            None => 1.0,
        };

        Ok(StopDemand {
            stop_id: record.stop_id.clone(),
            sequence,
            waiting_count: waiting,
            importance,
        })
    }
}

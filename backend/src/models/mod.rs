//! Domain models for the holding engine

pub mod decision;
pub mod snapshot;
pub mod stop;
pub mod vehicle;

// Re-exports
pub use decision::HoldingDecision;
pub use snapshot::{DataError, ExcludedVehicle, Snapshot, SnapshotBuild, SnapshotBuilder};
pub use stop::{StopDemand, StopRecord};
pub use vehicle::{Occupancy, Vehicle, VehicleRecord};

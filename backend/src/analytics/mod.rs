//! Snapshot analytics
//!
//! Pure functions of a snapshot (plus an optional applied-holding vector).
//! Nothing here holds state between cycles, so every value is re-derivable
//! and unit-testable in isolation.

pub mod bunching;
pub mod headway;

// Re-exports
pub use bunching::{detect_bunching, BunchingEvent, BunchingSeverity};
pub use headway::{
    headways, on_time_fraction, projected_headways, regularity, HeadwayStats,
};

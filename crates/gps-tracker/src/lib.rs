//! GPS Fix Tracking for Geotagged Capture
//!
//! This crate turns a stream of NMEA sentences into an always-consistent
//! snapshot of the receiver state. It provides:
//! - Great-circle (Haversine) distance between positions
//! - GGA / RMC sentence parsing with field-level merge semantics
//! - A thread-safe fix tracker shared by the capture loop and the UI
//! - An async serial receiver for NMEA-speaking GPS pucks

mod error;
mod fix;
pub mod geo;
pub mod nmea;
mod receiver;
mod tracker;

pub use error::GpsError;
pub use fix::{FixUpdate, GpsFix, Position};
pub use geo::{distance, haversine_distance, EARTH_RADIUS_M};
pub use receiver::{GpsReceiver, GpsSettings, ReceiverHandle};
pub use tracker::FixTracker;

/// Conversion factor from knots to km/h
pub const KNOTS_TO_KMH: f64 = 1.852;

/// A source of GPS fixes consumed by the capture scheduler and the UI.
///
/// Implementations must return whole snapshots: a reader never sees some
/// fields of one fix combined with fields of another.
pub trait GpsSource: Send + Sync {
    /// Whether the receiver is currently connected
    fn is_connected(&self) -> bool;

    /// Snapshot of the most recent fix
    fn current_fix(&self) -> GpsFix;

    /// Whether the current snapshot is a valid fix
    fn has_fix(&self) -> bool {
        self.current_fix().has_fix()
    }
}

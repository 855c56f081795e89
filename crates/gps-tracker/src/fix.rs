//! GPS fix snapshot and partial updates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in signed decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Immutable snapshot of the receiver state.
///
/// Every field is optional: `None` means "unknown", never zero. Latitude and
/// longitude are stored together so one can never be known without the other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    /// Last reported position
    pub position: Option<Position>,
    /// Altitude above mean sea level (m)
    pub altitude: Option<f64>,
    /// Ground speed (km/h)
    pub speed: Option<f64>,
    /// Satellites in use
    pub satellites: Option<u32>,
    /// NMEA fix quality (0 = no fix, 1 = GPS, 2 = DGPS, ...)
    pub fix_quality: Option<u8>,
    /// Horizontal dilution of precision
    pub horizontal_dilution: Option<f64>,
    /// Receiver-reported UTC time of the fix
    pub timestamp: Option<DateTime<Utc>>,
}

impl GpsFix {
    /// True iff a position is known and fix quality is positive
    pub fn has_fix(&self) -> bool {
        self.position.is_some() && self.fix_quality.is_some_and(|q| q > 0)
    }

    pub fn latitude(&self) -> Option<f64> {
        self.position.map(|p| p.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.position.map(|p| p.longitude)
    }

    /// Build the next snapshot by overlaying the fields carried by `update`
    pub fn merged(&self, update: &FixUpdate) -> GpsFix {
        GpsFix {
            position: update.position.or(self.position),
            altitude: update.altitude.or(self.altitude),
            speed: update.speed.or(self.speed),
            satellites: update.satellites.or(self.satellites),
            fix_quality: update.fix_quality.or(self.fix_quality),
            horizontal_dilution: update.horizontal_dilution.or(self.horizontal_dilution),
            timestamp: update.timestamp.or(self.timestamp),
        }
    }

    /// Human-readable description of the fix quality code
    pub fn fix_description(&self) -> String {
        match self.fix_quality {
            Some(0) => "No fix".to_string(),
            Some(1) => "GPS".to_string(),
            Some(2) => "DGPS".to_string(),
            Some(3) => "PPS".to_string(),
            Some(4) => "RTK".to_string(),
            Some(5) => "Float RTK".to_string(),
            Some(6) => "Estimated".to_string(),
            Some(7) => "Manual".to_string(),
            Some(8) => "Simulation".to_string(),
            Some(q) => format!("Unknown ({})", q),
            None => "Unknown".to_string(),
        }
    }
}

/// The fields carried by a single parsed sentence.
///
/// GGA carries position, altitude, quality, satellites and HDOP; RMC carries
/// position, speed and a full date/time. Fields a sentence does not carry are
/// `None` and leave the previous snapshot untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixUpdate {
    pub position: Option<Position>,
    pub altitude: Option<f64>,
    pub speed: Option<f64>,
    pub satellites: Option<u32>,
    pub fix_quality: Option<u8>,
    pub horizontal_dilution: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

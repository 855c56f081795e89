//! Running capture statistics

use crate::config::CaptureMode;
use chrono::{DateTime, Local};
use serde::Serialize;
use uuid::Uuid;

/// Statistics for the current (or last) capture session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureStatistics {
    /// Session these numbers belong to
    pub session_id: Option<Uuid>,
    /// Successful captures this session
    pub capture_count: u64,
    /// Wall-clock time of the last successful capture
    pub last_capture_time: Option<DateTime<Local>>,
    /// Sum of capture-to-capture distances (distance mode only)
    pub distance_traveled_m: f64,
    pub mode: CaptureMode,
}

impl CaptureStatistics {
    /// Fresh statistics for a new session
    pub fn new(session_id: Uuid, mode: CaptureMode) -> Self {
        Self {
            session_id: Some(session_id),
            mode,
            ..Default::default()
        }
    }
}

impl Default for CaptureStatistics {
    fn default() -> Self {
        Self {
            session_id: None,
            capture_count: 0,
            last_capture_time: None,
            distance_traveled_m: 0.0,
            mode: CaptureMode::Time,
        }
    }
}

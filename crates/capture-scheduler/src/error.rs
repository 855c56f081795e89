//! Scheduler Error Types

use thiserror::Error;

/// Reasons a session could not start or had to end
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A session is already running
    #[error("Capture already in progress")]
    AlreadyRunning,

    /// Camera reported itself disconnected
    #[error("Camera not connected")]
    CameraNotConnected,

    /// Distance mode needs a connected GPS receiver
    #[error("GPS not connected (required for distance mode)")]
    GpsNotConnected,

    /// `start` was called outside a tokio runtime
    #[error("No async runtime available for the capture loop")]
    NoRuntime,

    /// The blocking camera call panicked or was cancelled
    #[error("Camera task failed: {0}")]
    CameraTask(String),
}

impl From<tokio::task::JoinError> for SchedulerError {
    fn from(err: tokio::task::JoinError) -> Self {
        SchedulerError::CameraTask(err.to_string())
    }
}

//! Capture Scheduler for Geotagged Image Sets
//!
//! Runs one capture session at a time, firing the camera either every
//! fixed time interval or every fixed distance traveled, and keeps running
//! statistics the UI can poll.

mod config;
mod error;
mod scheduler;
mod stats;

pub use config::{resolve_view_types, CaptureMode, ConfigError, RawSettings, SessionConfig, ENV_PREFIX};
pub use error::SchedulerError;
pub use scheduler::{CaptureScheduler, SchedulerOptions};
pub use stats::CaptureStatistics;

//! Camera Capture Library for Geotagged Image Sets
//!
//! Defines the capability the capture scheduler drives:
//! - `Camera` trait for grabbing and saving a set of views
//! - `CaptureMetadata` record persisted next to every image set
//! - `DryRunCamera` that only writes metadata sidecars
//! - `VideoRecorder` for continuous recordings with a JSON sidecar

pub mod dry_run;
pub mod metadata;
mod settings;
pub mod video;

pub use dry_run::DryRunCamera;
pub use metadata::{write_metadata_sidecar, CameraMetadata, CaptureMetadata, GpsMetadata};
pub use settings::{CameraMode, CameraSettings, Resolution, ViewType, AUTO};
pub use video::{RecordingStatus, RecordingSummary, VideoBackend, VideoCodec, VideoRecorder};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera not connected")]
    NotConnected,

    #[error("Failed to grab frame: {0}")]
    Grab(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Metadata serialization failed: {0}")]
    Serialization(String),

    #[error("Recording error: {0}")]
    Recording(String),
}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        CameraError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CameraError {
    fn from(err: serde_json::Error) -> Self {
        CameraError::Serialization(err.to_string())
    }
}

/// Files written by one capture, keyed by view
pub type CapturedPaths = BTreeMap<ViewType, PathBuf>;

/// A camera that can save a set of views in one grab.
///
/// Calls may block on the device; the scheduler invokes them off the async
/// executor threads.
pub trait Camera: Send + Sync {
    /// Whether the device is open
    fn is_connected(&self) -> bool;

    /// Grab one frame and write every requested view to `output_dir`.
    ///
    /// Implementations persist `metadata` alongside the images.
    fn capture(
        &self,
        output_dir: &Path,
        file_prefix: &str,
        metadata: &CaptureMetadata,
        view_types: &[ViewType],
    ) -> Result<CapturedPaths, CameraError>;

    /// Settings currently applied to the device
    fn current_settings(&self) -> CameraSettings;

    /// Views this device can produce
    fn available_view_types(&self) -> Vec<ViewType> {
        ViewType::ALL.to_vec()
    }
}

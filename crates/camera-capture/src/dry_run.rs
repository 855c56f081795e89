//! Camera stand-in that records metadata only
//!
//! Used when no camera SDK is linked: every capture writes the metadata
//! sidecar so a route can be surveyed and its capture points reviewed.

use crate::metadata::write_metadata_sidecar;
use crate::settings::{CameraSettings, ViewType};
use crate::{Camera, CameraError, CaptureMetadata, CapturedPaths};
use chrono::Local;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info};

/// A camera that writes no images
pub struct DryRunCamera {
    settings: CameraSettings,
    connected: AtomicBool,
    captures: AtomicU64,
}

impl DryRunCamera {
    /// Create a connected dry-run camera reporting `settings`
    pub fn new(settings: CameraSettings) -> Self {
        info!("Creating dry-run camera ({})", settings.resolution);
        Self {
            settings,
            connected: AtomicBool::new(true),
            captures: AtomicU64::new(0),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Number of sidecars written
    pub fn capture_count(&self) -> u64 {
        self.captures.load(Ordering::SeqCst)
    }
}

impl Camera for DryRunCamera {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn capture(
        &self,
        output_dir: &Path,
        file_prefix: &str,
        metadata: &CaptureMetadata,
        view_types: &[ViewType],
    ) -> Result<CapturedPaths, CameraError> {
        if !self.is_connected() {
            return Err(CameraError::NotConnected);
        }

        // Millisecond stamp: distance mode can fire more than once a second
        let stamp = Local::now().format("%Y%m%d_%H%M%S_%3f").to_string();
        let paths = CapturedPaths::new();
        let sidecar = write_metadata_sidecar(output_dir, file_prefix, &stamp, metadata, &paths)?;

        self.captures.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Dry-run capture of {:?} recorded in {}",
            view_types,
            sidecar.display()
        );
        Ok(paths)
    }

    fn current_settings(&self) -> CameraSettings {
        self.settings.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{CameraMetadata, GpsMetadata};
    use gps_tracker::GpsFix;

    fn metadata() -> CaptureMetadata {
        CaptureMetadata {
            datetime: Local::now(),
            capture_mode: "time".to_string(),
            gps: GpsMetadata::from(&GpsFix::default()),
            camera: CameraMetadata::from(&CameraSettings::default()),
            view_types: vec![ViewType::Rgb],
            sequence_number: 0,
        }
    }

    #[test]
    fn test_dry_run_writes_sidecar() {
        let dir = std::env::temp_dir().join(format!("dry-run-{}", uuid::Uuid::new_v4()));
        let camera = DryRunCamera::new(CameraSettings::default());

        let paths = camera
            .capture(&dir, "zed_20240101", &metadata(), &[ViewType::Rgb])
            .unwrap();
        assert!(paths.is_empty());
        assert_eq!(camera.capture_count(), 1);

        let written: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(written.len(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_disconnected_capture_fails() {
        let camera = DryRunCamera::new(CameraSettings::default());
        camera.set_connected(false);
        let result = camera.capture(Path::new("/nonexistent"), "x", &metadata(), &[ViewType::Rgb]);
        assert!(matches!(result, Err(CameraError::NotConnected)));
        assert_eq!(camera.capture_count(), 0);
    }
}

//! Per-capture metadata record
//!
//! The JSON shape written here is read by downstream tooling and must stay
//! stable: top-level `datetime`, `capture_mode`, `gps`, `camera`,
//! `view_types` and `sequence_number`, plus `filenames` and `timestamp` once
//! the files are on disk.

use crate::settings::{CameraSettings, ViewType};
use crate::{CameraError, CapturedPaths};
use chrono::{DateTime, Local};
use gps_tracker::GpsFix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// GPS block of the metadata record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsMetadata {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub satellites: Option<u32>,
    pub fix_quality: Option<u8>,
    pub has_fix: bool,
}

impl From<&GpsFix> for GpsMetadata {
    fn from(fix: &GpsFix) -> Self {
        Self {
            latitude: fix.latitude(),
            longitude: fix.longitude(),
            altitude: fix.altitude,
            satellites: fix.satellites,
            fix_quality: fix.fix_quality,
            has_fix: fix.has_fix(),
        }
    }
}

/// Camera block of the metadata record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraMetadata {
    pub resolution: String,
    pub mode: String,
}

impl From<&CameraSettings> for CameraMetadata {
    fn from(settings: &CameraSettings) -> Self {
        Self {
            resolution: settings.resolution.as_str().to_string(),
            mode: settings.mode.as_str().to_string(),
        }
    }
}

/// Metadata built by the scheduler for every capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    /// Local wall-clock time of the capture
    pub datetime: DateTime<Local>,
    /// `"time"` or `"gps"`
    pub capture_mode: String,
    pub gps: GpsMetadata,
    pub camera: CameraMetadata,
    pub view_types: Vec<ViewType>,
    /// Number of successful captures before this one in the session
    pub sequence_number: u64,
}

#[derive(Serialize)]
struct Sidecar<'a> {
    #[serde(flatten)]
    metadata: &'a CaptureMetadata,
    filenames: BTreeMap<ViewType, String>,
    timestamp: &'a str,
}

/// Write `<prefix>_metadata_<stamp>.json` next to the captured files
pub fn write_metadata_sidecar(
    output_dir: &Path,
    file_prefix: &str,
    stamp: &str,
    metadata: &CaptureMetadata,
    paths: &CapturedPaths,
) -> Result<PathBuf, CameraError> {
    let filenames = paths
        .iter()
        .map(|(view, path)| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            (*view, name)
        })
        .collect();

    let sidecar = Sidecar {
        metadata,
        filenames,
        timestamp: stamp,
    };

    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("{file_prefix}_metadata_{stamp}.json"));
    fs::write(&path, serde_json::to_vec_pretty(&sidecar)?)?;

    debug!("Wrote capture metadata to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gps_tracker::Position;
    use serde_json::Value;

    fn sample_metadata() -> CaptureMetadata {
        let fix = GpsFix {
            position: Some(Position::new(48.1173, 11.5167)),
            altitude: Some(545.4),
            satellites: Some(8),
            fix_quality: Some(1),
            ..Default::default()
        };
        CaptureMetadata {
            datetime: Local::now(),
            capture_mode: "gps".to_string(),
            gps: GpsMetadata::from(&fix),
            camera: CameraMetadata::from(&CameraSettings::default()),
            view_types: vec![ViewType::Rgb, ViewType::Depth],
            sequence_number: 3,
        }
    }

    #[test]
    fn test_record_shape() {
        let value = serde_json::to_value(sample_metadata()).unwrap();

        for key in ["datetime", "capture_mode", "gps", "camera", "view_types", "sequence_number"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["capture_mode"], "gps");
        assert_eq!(value["gps"]["has_fix"], true);
        assert_eq!(value["gps"]["fix_quality"], 1);
        assert_eq!(value["camera"]["resolution"], "HD1080");
        assert_eq!(value["camera"]["mode"], "auto");
        assert_eq!(value["view_types"], serde_json::json!(["rgb", "depth"]));
        assert_eq!(value["sequence_number"], 3);
    }

    #[test]
    fn test_unknown_gps_fields_are_null() {
        let gps = GpsMetadata::from(&GpsFix::default());
        let value = serde_json::to_value(gps).unwrap();
        assert_eq!(value["latitude"], Value::Null);
        assert_eq!(value["satellites"], Value::Null);
        assert_eq!(value["has_fix"], false);
    }

    #[test]
    fn test_sidecar_written() {
        let dir = std::env::temp_dir().join(format!("sidecar-{}", uuid::Uuid::new_v4()));
        let mut paths = CapturedPaths::new();
        paths.insert(ViewType::Rgb, dir.join("zed_20240101_rgb_120000.png"));

        let path = write_metadata_sidecar(&dir, "zed_20240101", "120000", &sample_metadata(), &paths)
            .unwrap();
        assert!(path.ends_with("zed_20240101_metadata_120000.json"));

        let value: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["filenames"]["rgb"], "zed_20240101_rgb_120000.png");
        assert_eq!(value["timestamp"], "120000");
        assert_eq!(value["sequence_number"], 3);

        fs::remove_dir_all(&dir).unwrap();
    }
}

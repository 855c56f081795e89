//! Session configuration
//!
//! `RawSettings` mirrors the persisted settings document and may be partial;
//! `SessionConfig` is the validated value the scheduler runs with.

use camera_capture::{CameraSettings, ViewType};
use gps_tracker::GpsSettings;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Prefix for environment overrides, e.g. `GEOCAPTURE__TIME_INTERVAL=5`
pub const ENV_PREFIX: &str = "GEOCAPTURE";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("time interval must be positive, got {0} s")]
    NonPositiveTimeInterval(i64),

    #[error("distance interval must be a positive number of meters, got {0}")]
    NonPositiveDistanceInterval(f64),

    #[error("unknown capture mode: {0:?} (expected \"time\" or \"gps\")")]
    UnknownMode(String),

    #[error("failed to load settings: {0}")]
    Load(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}

/// What triggers a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureMode {
    /// Fixed elapsed time between captures
    #[default]
    #[serde(rename = "time")]
    Time,
    /// Fixed distance traveled between captures
    #[serde(rename = "gps", alias = "distance")]
    Distance,
}

impl CaptureMode {
    /// Label persisted in capture metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMode::Time => "time",
            CaptureMode::Distance => "gps",
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "time" => Ok(CaptureMode::Time),
            "gps" | "distance" => Ok(CaptureMode::Distance),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

/// Settings as persisted or entered in the UI.
///
/// Every field has a default so partial documents deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    pub output_directory: PathBuf,
    /// Seconds between captures in time mode
    pub time_interval: i64,
    /// Meters between captures in distance mode
    pub gps_interval: f64,
    /// `"time"` or `"gps"` (`"distance"` is accepted too)
    pub capture_mode: String,
    /// View name to enabled flag
    pub view_types: BTreeMap<String, bool>,
    pub file_prefix: String,
    pub camera: CameraSettings,
    pub gps: GpsSettings,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            output_directory: default_output_directory(),
            time_interval: 10,
            gps_interval: 5.0,
            capture_mode: CaptureMode::Time.as_str().to_string(),
            view_types: BTreeMap::from([(ViewType::BASE.as_str().to_string(), true)]),
            file_prefix: "zed".to_string(),
            camera: CameraSettings::default(),
            gps: GpsSettings::default(),
        }
    }
}

impl RawSettings {
    /// Load settings from defaults, an optional file and the environment.
    ///
    /// The file format follows the extension (`.toml`, `.json`, ...).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("Loading settings from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }
}

fn default_output_directory() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("geocapture")
}

/// Validated configuration for one capture session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub mode: CaptureMode,
    pub time_interval: Duration,
    pub distance_interval_m: f64,
    pub output_directory: PathBuf,
    /// Never empty; sorted with the base view first
    pub view_types: Vec<ViewType>,
    pub file_prefix: String,
    /// Passed through to the camera untouched (`-1` = automatic)
    pub camera: CameraSettings,
    pub gps: GpsSettings,
}

impl SessionConfig {
    /// Validate raw settings.
    ///
    /// Non-positive intervals are rejected, not replaced by defaults.
    pub fn resolve(raw: &RawSettings) -> Result<Self, ConfigError> {
        let mode: CaptureMode = raw.capture_mode.parse()?;

        if raw.time_interval <= 0 {
            return Err(ConfigError::NonPositiveTimeInterval(raw.time_interval));
        }
        if !(raw.gps_interval.is_finite() && raw.gps_interval > 0.0) {
            return Err(ConfigError::NonPositiveDistanceInterval(raw.gps_interval));
        }

        Ok(Self {
            mode,
            time_interval: Duration::from_secs(raw.time_interval.unsigned_abs()),
            distance_interval_m: raw.gps_interval,
            output_directory: raw.output_directory.clone(),
            view_types: resolve_view_types(&raw.view_types),
            file_prefix: raw.file_prefix.clone(),
            camera: raw.camera.clone(),
            gps: raw.gps.clone(),
        })
    }

    /// A time-mode session with default settings otherwise
    pub fn time(interval: Duration, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            mode: CaptureMode::Time,
            time_interval: interval,
            output_directory: output_directory.into(),
            ..Self::default()
        }
    }

    /// A distance-mode session with default settings otherwise
    pub fn distance(interval_m: f64, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            mode: CaptureMode::Distance,
            distance_interval_m: interval_m,
            output_directory: output_directory.into(),
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let raw = RawSettings::default();
        Self {
            mode: CaptureMode::Time,
            time_interval: Duration::from_secs(raw.time_interval.unsigned_abs()),
            distance_interval_m: raw.gps_interval,
            output_directory: raw.output_directory,
            view_types: vec![ViewType::BASE],
            file_prefix: raw.file_prefix,
            camera: raw.camera,
            gps: raw.gps,
        }
    }
}

/// Enabled, known views in canonical order; the base view if none remain
pub fn resolve_view_types(selection: &BTreeMap<String, bool>) -> Vec<ViewType> {
    let views: BTreeSet<ViewType> = selection
        .iter()
        .filter(|(_, enabled)| **enabled)
        .filter_map(|(name, _)| match name.parse() {
            Ok(view) => Some(view),
            Err(e) => {
                warn!("Ignoring view selection: {}", e);
                None
            }
        })
        .collect();

    if views.is_empty() {
        vec![ViewType::BASE]
    } else {
        views.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_capture::AUTO;

    #[test]
    fn test_defaults_resolve() {
        let config = SessionConfig::resolve(&RawSettings::default()).unwrap();
        assert_eq!(config.mode, CaptureMode::Time);
        assert_eq!(config.time_interval, Duration::from_secs(10));
        assert_eq!(config.distance_interval_m, 5.0);
        assert_eq!(config.view_types, vec![ViewType::Rgb]);
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_non_positive_intervals_rejected() {
        let raw = RawSettings {
            time_interval: 0,
            ..Default::default()
        };
        assert!(matches!(
            SessionConfig::resolve(&raw),
            Err(ConfigError::NonPositiveTimeInterval(0))
        ));

        for bad in [0.0, -3.0, f64::NAN] {
            let raw = RawSettings {
                gps_interval: bad,
                ..Default::default()
            };
            assert!(matches!(
                SessionConfig::resolve(&raw),
                Err(ConfigError::NonPositiveDistanceInterval(_))
            ));
        }
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!("gps".parse::<CaptureMode>().unwrap(), CaptureMode::Distance);
        assert_eq!("Distance".parse::<CaptureMode>().unwrap(), CaptureMode::Distance);
        assert_eq!("time".parse::<CaptureMode>().unwrap(), CaptureMode::Time);
        assert!("video".parse::<CaptureMode>().is_err());

        let raw = RawSettings {
            capture_mode: "sometimes".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            SessionConfig::resolve(&raw),
            Err(ConfigError::UnknownMode(_))
        ));
    }

    #[test]
    fn test_view_selection() {
        let selection = BTreeMap::from([
            ("depth".to_string(), true),
            ("rgb".to_string(), true),
            ("right".to_string(), false),
            ("thermal".to_string(), true),
        ]);
        assert_eq!(
            resolve_view_types(&selection),
            vec![ViewType::Rgb, ViewType::Depth]
        );

        let nothing = BTreeMap::from([
            ("rgb".to_string(), false),
            ("thermal".to_string(), true),
        ]);
        assert_eq!(resolve_view_types(&nothing), vec![ViewType::Rgb]);
        assert_eq!(resolve_view_types(&BTreeMap::new()), vec![ViewType::Rgb]);
    }

    #[test]
    fn test_auto_camera_values_pass_through() {
        let mut raw = RawSettings::default();
        raw.camera.exposure = AUTO;
        raw.camera.gain = AUTO;
        raw.camera.whitebalance = 4600;

        let config = SessionConfig::resolve(&raw).unwrap();
        assert_eq!(config.camera.exposure, -1);
        assert_eq!(config.camera.gain, -1);
        assert_eq!(config.camera.whitebalance, 4600);
    }

    #[test]
    fn test_partial_settings_document() {
        let raw: RawSettings = serde_json::from_str(
            r#"{
                "capture_mode": "gps",
                "gps_interval": 12.5,
                "view_types": {"rgb": true, "depth": true},
                "camera": {"resolution": "HD720", "exposure": -1},
                "gps": {"port": "/dev/ttyUSB2", "timeout": 2.0}
            }"#,
        )
        .unwrap();

        let config = SessionConfig::resolve(&raw).unwrap();
        assert_eq!(config.mode, CaptureMode::Distance);
        assert_eq!(config.distance_interval_m, 12.5);
        assert_eq!(config.time_interval, Duration::from_secs(10));
        assert_eq!(config.view_types, vec![ViewType::Rgb, ViewType::Depth]);
        assert_eq!(config.camera.resolution, camera_capture::Resolution::Hd720);
        assert_eq!(config.camera.fps, 30);
        assert_eq!(config.gps.port, "/dev/ttyUSB2");
        assert_eq!(config.gps.baud_rate, 4800);
        assert_eq!(config.gps.timeout_secs, 2.0);
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("settings-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.toml");
        std::fs::write(
            &path,
            "capture_mode = \"time\"\ntime_interval = 3\nfile_prefix = \"survey\"\n\n[camera]\nfps = 15\n",
        )
        .unwrap();

        let raw = RawSettings::load(Some(&path)).unwrap();
        assert_eq!(raw.time_interval, 3);
        assert_eq!(raw.file_prefix, "survey");
        assert_eq!(raw.camera.fps, 15);
        assert_eq!(raw.camera.exposure, AUTO);

        assert!(RawSettings::load(Some(&dir.join("missing.toml"))).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

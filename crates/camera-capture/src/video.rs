//! Video recording with a JSON sidecar
//!
//! The recorder owns the session bookkeeping (file naming, sidecar, duration);
//! the backend only switches the device's encoder on and off.

use crate::settings::Resolution;
use crate::CameraError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Encoder used for the recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoCodec {
    #[default]
    H264,
    H265,
}

/// Device side of a recording
pub trait VideoBackend: Send {
    fn is_connected(&self) -> bool;

    /// Start encoding frames into `path`
    fn enable_recording(
        &mut self,
        path: &Path,
        codec: VideoCodec,
        bitrate_kbps: Option<u32>,
    ) -> Result<(), CameraError>;

    /// Stop encoding and flush the file
    fn disable_recording(&mut self);

    fn resolution(&self) -> Resolution;

    fn fps(&self) -> u32;
}

#[derive(Debug, Serialize, Deserialize)]
struct CameraBlock {
    resolution: String,
    fps: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordingBlock {
    codec: VideoCodec,
    bitrate: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VideoSidecar {
    filename: String,
    start_time: DateTime<Local>,
    camera_settings: CameraBlock,
    recording_settings: RecordingBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<DateTime<Local>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<f64>,
}

struct ActiveRecording {
    video_path: PathBuf,
    sidecar_path: PathBuf,
    start_time: DateTime<Local>,
}

/// Snapshot of the recorder state for the UI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingStatus {
    pub is_recording: bool,
    pub duration_seconds: f64,
    pub file_path: Option<PathBuf>,
    pub start_time: Option<DateTime<Local>>,
}

/// Result of a finished recording
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSummary {
    pub video_path: PathBuf,
    pub duration_seconds: f64,
}

/// Records video through a [`VideoBackend`]
pub struct VideoRecorder<B: VideoBackend> {
    backend: B,
    file_prefix: String,
    active: Option<ActiveRecording>,
}

impl<B: VideoBackend> VideoRecorder<B> {
    pub fn new(backend: B, file_prefix: impl Into<String>) -> Self {
        Self {
            backend,
            file_prefix: file_prefix.into(),
            active: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Start a recording in `output_dir`.
    ///
    /// Returns false if the camera is disconnected, a recording is already
    /// running, or the backend refuses to start.
    pub fn start_recording(
        &mut self,
        output_dir: &Path,
        codec: VideoCodec,
        bitrate_kbps: Option<u32>,
    ) -> bool {
        if !self.backend.is_connected() {
            error!("Cannot start recording: camera not connected");
            return false;
        }
        if self.active.is_some() {
            warn!("Already recording, stop the current recording first");
            return false;
        }

        match self.begin(output_dir, codec, bitrate_kbps) {
            Ok(active) => {
                info!("Recording started: {}", active.video_path.display());
                self.active = Some(active);
                true
            }
            Err(e) => {
                error!("Error starting recording: {}", e);
                false
            }
        }
    }

    fn begin(
        &mut self,
        output_dir: &Path,
        codec: VideoCodec,
        bitrate_kbps: Option<u32>,
    ) -> Result<ActiveRecording, CameraError> {
        fs::create_dir_all(output_dir)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let base = format!("{}_video_{}", self.file_prefix, stamp);
        let video_path = output_dir.join(format!("{base}.svo"));
        let sidecar_path = output_dir.join(format!("{base}.json"));

        self.backend
            .enable_recording(&video_path, codec, bitrate_kbps)?;

        let start_time = Local::now();
        let sidecar = VideoSidecar {
            filename: format!("{base}.svo"),
            start_time,
            camera_settings: CameraBlock {
                resolution: self.backend.resolution().as_str().to_string(),
                fps: self.backend.fps(),
            },
            recording_settings: RecordingBlock {
                codec,
                bitrate: bitrate_kbps,
            },
            end_time: None,
            duration_seconds: None,
        };
        if let Err(e) = fs::write(&sidecar_path, serde_json::to_vec_pretty(&sidecar)?) {
            self.backend.disable_recording();
            return Err(e.into());
        }

        Ok(ActiveRecording {
            video_path,
            sidecar_path,
            start_time,
        })
    }

    /// Stop the current recording, if any, and finalize its sidecar
    pub fn stop_recording(&mut self) -> Option<RecordingSummary> {
        let Some(active) = self.active.take() else {
            warn!("Not currently recording");
            return None;
        };

        self.backend.disable_recording();
        let end_time = Local::now();
        let duration_seconds = elapsed_seconds(active.start_time, end_time);

        if let Err(e) = finalize_sidecar(&active.sidecar_path, end_time, duration_seconds) {
            error!("Error updating recording metadata: {}", e);
        }

        info!(
            "Recording stopped after {:.1} s: {}",
            duration_seconds,
            active.video_path.display()
        );
        Some(RecordingSummary {
            video_path: active.video_path,
            duration_seconds,
        })
    }

    pub fn status(&self) -> RecordingStatus {
        match &self.active {
            Some(active) => RecordingStatus {
                is_recording: true,
                duration_seconds: elapsed_seconds(active.start_time, Local::now()),
                file_path: Some(active.video_path.clone()),
                start_time: Some(active.start_time),
            },
            None => RecordingStatus {
                is_recording: false,
                duration_seconds: 0.0,
                file_path: None,
                start_time: None,
            },
        }
    }
}

fn elapsed_seconds(start: DateTime<Local>, end: DateTime<Local>) -> f64 {
    (end - start).num_milliseconds().max(0) as f64 / 1000.0
}

fn finalize_sidecar(
    path: &Path,
    end_time: DateTime<Local>,
    duration_seconds: f64,
) -> Result<(), CameraError> {
    let mut sidecar: VideoSidecar = serde_json::from_slice(&fs::read(path)?)?;
    sidecar.end_time = Some(end_time);
    sidecar.duration_seconds = Some(duration_seconds);
    fs::write(path, serde_json::to_vec_pretty(&sidecar)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[derive(Default)]
    struct StubBackend {
        connected: bool,
        refuse: bool,
        recording_to: Option<PathBuf>,
        starts: usize,
        stops: usize,
    }

    impl VideoBackend for StubBackend {
        fn is_connected(&self) -> bool {
            self.connected
        }

        fn enable_recording(
            &mut self,
            path: &Path,
            _codec: VideoCodec,
            _bitrate_kbps: Option<u32>,
        ) -> Result<(), CameraError> {
            if self.refuse {
                return Err(CameraError::Recording("encoder busy".into()));
            }
            self.recording_to = Some(path.to_path_buf());
            self.starts += 1;
            Ok(())
        }

        fn disable_recording(&mut self) {
            self.recording_to = None;
            self.stops += 1;
        }

        fn resolution(&self) -> Resolution {
            Resolution::Hd720
        }

        fn fps(&self) -> u32 {
            60
        }
    }

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("video-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_record_and_stop() {
        let dir = temp_dir();
        let backend = StubBackend {
            connected: true,
            ..Default::default()
        };
        let mut recorder = VideoRecorder::new(backend, "zed");

        assert!(recorder.start_recording(&dir, VideoCodec::H264, Some(8000)));
        assert!(recorder.is_recording());
        assert!(!recorder.start_recording(&dir, VideoCodec::H264, None));
        assert_eq!(recorder.backend().starts, 1);

        let status = recorder.status();
        assert!(status.is_recording);
        let video_path = status.file_path.unwrap();
        assert_eq!(recorder.backend().recording_to.as_ref(), Some(&video_path));

        let summary = recorder.stop_recording().unwrap();
        assert_eq!(summary.video_path, video_path);
        assert!(summary.duration_seconds >= 0.0);
        assert_eq!(recorder.backend().stops, 1);
        assert!(!recorder.status().is_recording);

        let sidecar: Value =
            serde_json::from_slice(&fs::read(video_path.with_extension("json")).unwrap()).unwrap();
        assert_eq!(sidecar["camera_settings"]["resolution"], "HD720");
        assert_eq!(sidecar["camera_settings"]["fps"], 60);
        assert_eq!(sidecar["recording_settings"]["codec"], "H264");
        assert_eq!(sidecar["recording_settings"]["bitrate"], 8000);
        assert!(sidecar["end_time"].is_string());
        assert!(sidecar["duration_seconds"].is_number());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_refuses_when_disconnected_or_backend_fails() {
        let dir = temp_dir();
        let mut recorder = VideoRecorder::new(StubBackend::default(), "zed");
        assert!(!recorder.start_recording(&dir, VideoCodec::H265, None));

        let mut recorder = VideoRecorder::new(
            StubBackend {
                connected: true,
                refuse: true,
                ..Default::default()
            },
            "zed",
        );
        assert!(!recorder.start_recording(&dir, VideoCodec::H265, None));
        assert!(!recorder.is_recording());
        assert!(recorder.stop_recording().is_none());

        let _ = fs::remove_dir_all(&dir);
    }
}

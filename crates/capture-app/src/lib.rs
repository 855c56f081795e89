//! GeoCapture Runner
//!
//! Wires the serial GPS receiver, a camera and the capture scheduler
//! together and runs one session until Ctrl-C.

use anyhow::{Context, Result};
use camera_capture::DryRunCamera;
use capture_scheduler::{
    CaptureMode, CaptureScheduler, CaptureStatistics, RawSettings, SessionConfig,
};
use gps_tracker::{FixTracker, GpsFix, GpsReceiver, GpsSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Environment variable naming the settings file
pub const CONFIG_ENV: &str = "GEOCAPTURE_CONFIG";

/// How often the running statistics are logged
pub const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Initialize logging
pub fn init_logging() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Settings file from the command line, else from the environment
pub fn settings_path(arg: Option<String>, env: Option<String>) -> Option<PathBuf> {
    arg.or(env)
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
}

/// Run a capture session until Ctrl-C or until the session ends on its own
pub async fn run(settings: Option<&Path>) -> Result<()> {
    let raw = RawSettings::load(settings).context("Failed to load settings")?;
    let config = SessionConfig::resolve(&raw).context("Invalid settings")?;
    std::fs::create_dir_all(&config.output_directory).with_context(|| {
        format!(
            "Cannot create output directory {}",
            config.output_directory.display()
        )
    })?;
    info!(
        "Saving captures to {} (views: {:?})",
        config.output_directory.display(),
        config.view_types
    );

    let mut receiver = GpsReceiver::new(Arc::new(FixTracker::new()));
    if config.mode == CaptureMode::Distance {
        receiver
            .connect(&config.gps)
            .await
            .context("Distance mode needs a GPS receiver")?;
    }

    let camera = Arc::new(DryRunCamera::new(config.camera.clone()));
    let mut scheduler = CaptureScheduler::new(camera, Arc::new(receiver.handle()));
    scheduler
        .try_start(config)
        .context("Failed to start capture")?;

    let mut ticker = tokio::time::interval(STATS_INTERVAL);
    ticker.tick().await;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                signal.context("Failed to listen for Ctrl-C")?;
                info!("Shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                info!("{}", status_line(&scheduler.get_capture_stats(), &receiver.current_fix()));
                if !scheduler.is_capturing() {
                    warn!("Capture session ended unexpectedly");
                    break;
                }
            }
        }
    }

    scheduler.stop().await;
    receiver.disconnect().await;
    info!("{}", status_line(&scheduler.get_capture_stats(), &receiver.current_fix()));
    Ok(())
}

/// One-line progress summary for the log
pub fn status_line(stats: &CaptureStatistics, fix: &GpsFix) -> String {
    let mut line = format!("{} image sets captured ({} mode)", stats.capture_count, stats.mode);
    if stats.mode == CaptureMode::Distance {
        line.push_str(&format!(", {:.1} m traveled", stats.distance_traveled_m));
    }
    if let Some(time) = stats.last_capture_time {
        line.push_str(&format!(", last at {}", time.format("%H:%M:%S")));
    }
    line.push_str(&format!(", GPS: {}", fix.fix_description()));
    if let Some(satellites) = fix.satellites {
        line.push_str(&format!(" ({} satellites)", satellites));
    }
    line
}

//! Capture Scheduler Implementation
//!
//! One background task per session. Time mode captures, then sleeps for the
//! interval; distance mode polls the GPS source and captures whenever the
//! receiver has moved at least the configured distance since the last
//! capture. Both wait on the session's cancellation token, so `stop` never
//! waits out a full interval.

use crate::config::{CaptureMode, SessionConfig};
use crate::error::SchedulerError;
use crate::stats::CaptureStatistics;
use camera_capture::{Camera, CameraMetadata, CaptureMetadata, GpsMetadata, ViewType};
use chrono::Local;
use gps_tracker::{geo, GpsSource, Position};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Timing options for the scheduler
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// GPS poll period in distance mode (default: 100 ms)
    pub poll_interval: Duration,
    /// How long `stop` waits for the loop before aborting it (default: 2 s)
    pub stop_timeout: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            stop_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    stats: CaptureStatistics,
    /// Where the last successful capture happened while the GPS had a fix.
    /// Distance mode measures its threshold from here.
    last_capture_location: Option<Position>,
}

struct Shared {
    state: Mutex<SessionState>,
    /// Serializes capture operations between the loop and single shots
    capture_lock: tokio::sync::Mutex<()>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct ActiveSession {
    id: Uuid,
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Clears a session's running flag when its loop ends, by any path
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Distance-mode trigger, applied together with the capture counter
#[derive(Debug, Clone, Copy)]
struct DistanceTrigger {
    distance_m: f64,
    position: Position,
}

/// Everything one capture needs
#[derive(Clone)]
struct CaptureContext {
    camera: Arc<dyn Camera>,
    gps: Arc<dyn GpsSource>,
    shared: Arc<Shared>,
    config: Arc<SessionConfig>,
}

/// Capture scheduler owning the session lifecycle
pub struct CaptureScheduler {
    camera: Arc<dyn Camera>,
    gps: Arc<dyn GpsSource>,
    options: SchedulerOptions,
    shared: Arc<Shared>,
    session: Option<ActiveSession>,
}

impl CaptureScheduler {
    /// Create an idle scheduler driving `camera` with fixes from `gps`
    pub fn new(camera: Arc<dyn Camera>, gps: Arc<dyn GpsSource>) -> Self {
        Self::with_options(camera, gps, SchedulerOptions::default())
    }

    pub fn with_options(
        camera: Arc<dyn Camera>,
        gps: Arc<dyn GpsSource>,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            camera,
            gps,
            options,
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::default()),
                capture_lock: tokio::sync::Mutex::new(()),
            }),
            session: None,
        }
    }

    /// Start a session. Returns false, changing nothing, if a session is
    /// already running, the camera is disconnected, or distance mode is
    /// requested without a connected GPS.
    pub fn start(&mut self, config: SessionConfig) -> bool {
        match self.try_start(config) {
            Ok(_) => true,
            Err(SchedulerError::AlreadyRunning) => {
                warn!("Capture already in progress");
                false
            }
            Err(e) => {
                error!("Cannot start capture: {}", e);
                false
            }
        }
    }

    /// Like [`start`](Self::start), reporting why a session could not start
    pub fn try_start(&mut self, config: SessionConfig) -> Result<Uuid, SchedulerError> {
        if self.is_capturing() {
            return Err(SchedulerError::AlreadyRunning);
        }
        if !self.camera.is_connected() {
            return Err(SchedulerError::CameraNotConnected);
        }
        if config.mode == CaptureMode::Distance && !self.gps.is_connected() {
            return Err(SchedulerError::GpsNotConnected);
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;

        // A loop that ended on its own leaves its finished session behind
        if let Some(stale) = self.session.take() {
            stale.cancel.cancel();
        }

        let id = Uuid::new_v4();
        let mode = config.mode;
        {
            let mut state = self.shared.state();
            state.stats = CaptureStatistics::new(id, mode);
            state.last_capture_location = None;
        }

        let ctx = self.context(config);
        let running = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();
        let span = info_span!("capture_session", session = %id, mode = %mode);
        let handle = runtime.spawn(
            run_session(
                ctx,
                self.options.poll_interval,
                cancel.clone(),
                RunningGuard(running.clone()),
            )
            .instrument(span),
        );

        info!("Started capture session {} in {} mode", id, mode);
        self.session = Some(ActiveSession {
            id,
            running,
            cancel,
            handle,
        });
        Ok(id)
    }

    /// Stop the running session and wait (bounded) for its loop to exit.
    ///
    /// A no-op when nothing was started; safe to call repeatedly. If the loop
    /// does not exit within the stop timeout it is aborted and the session is
    /// still marked stopped.
    pub async fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        session.cancel.cancel();

        let mut handle = session.handle;
        match tokio::time::timeout(self.options.stop_timeout, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Capture loop ended abnormally: {}", e),
            Err(_) => {
                warn!(
                    "Capture loop did not exit within {:?}, aborting it",
                    self.options.stop_timeout
                );
                handle.abort();
            }
        }
        session.running.store(false, Ordering::SeqCst);

        info!(
            "Stopped capture session {} after {} image sets",
            session.id,
            self.get_capture_stats().capture_count
        );
    }

    /// Capture one image set now, outside the session loop.
    ///
    /// Needs only a connected camera. Counts toward the statistics like any
    /// other capture.
    pub async fn capture_once(&self, config: &SessionConfig) -> bool {
        if !self.camera.is_connected() {
            error!("Cannot capture: camera not connected");
            return false;
        }

        match self.context(config.clone()).capture(None).await {
            Ok(captured) => captured,
            Err(e) => {
                error!("Single capture failed: {}", e);
                false
            }
        }
    }

    /// Whether a session loop is currently running
    pub fn is_capturing(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.running.load(Ordering::SeqCst))
    }

    /// Snapshot of the current session's statistics
    pub fn get_capture_stats(&self) -> CaptureStatistics {
        self.shared.state().stats.clone()
    }

    /// Position of the last capture taken with a GPS fix this session
    pub fn last_capture_location(&self) -> Option<Position> {
        self.shared.state().last_capture_location
    }

    fn context(&self, mut config: SessionConfig) -> CaptureContext {
        config.view_types = self.supported_views(&config.view_types);
        CaptureContext {
            camera: self.camera.clone(),
            gps: self.gps.clone(),
            shared: self.shared.clone(),
            config: Arc::new(config),
        }
    }

    /// Drop views the camera cannot produce; fall back to the base view
    fn supported_views(&self, requested: &[ViewType]) -> Vec<ViewType> {
        let available = self.camera.available_view_types();
        let mut views: Vec<ViewType> = requested
            .iter()
            .copied()
            .filter(|view| {
                let supported = available.contains(view);
                if !supported {
                    warn!("Camera cannot produce {} view, skipping it", view);
                }
                supported
            })
            .collect();

        if views.is_empty() {
            views.push(ViewType::BASE);
        }
        views
    }
}

impl Drop for CaptureScheduler {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            session.cancel.cancel();
        }
    }
}

async fn run_session(
    ctx: CaptureContext,
    poll_interval: Duration,
    cancel: CancellationToken,
    _running: RunningGuard,
) {
    let result = match ctx.config.mode {
        CaptureMode::Time => run_time_mode(&ctx, &cancel).await,
        CaptureMode::Distance => run_distance_mode(&ctx, &cancel, poll_interval).await,
    };

    match result {
        Ok(()) => debug!("Capture loop exited"),
        Err(e) => error!("Error in capture loop, ending session: {}", e),
    }
}

async fn run_time_mode(
    ctx: &CaptureContext,
    cancel: &CancellationToken,
) -> Result<(), SchedulerError> {
    let interval = ctx.config.time_interval;
    info!(
        "Capturing every {:?} with view types {:?}",
        interval, ctx.config.view_types
    );

    while !cancel.is_cancelled() {
        ctx.capture(None).await?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    Ok(())
}

async fn run_distance_mode(
    ctx: &CaptureContext,
    cancel: &CancellationToken,
    poll_interval: Duration,
) -> Result<(), SchedulerError> {
    let threshold = ctx.config.distance_interval_m;
    info!(
        "Capturing every {} m with view types {:?}",
        threshold, ctx.config.view_types
    );

    let fix = ctx.gps.current_fix();
    if fix.has_fix() {
        ctx.shared.state().last_capture_location = fix.position;
    }

    if cancel.is_cancelled() {
        return Ok(());
    }
    // Baseline image, with or without a fix
    ctx.capture(None).await?;

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let fix = ctx.gps.current_fix();
        let Some(position) = fix.position.filter(|_| fix.has_fix()) else {
            continue;
        };

        // No trigger until a capture has been taken with a fix
        let last = ctx.shared.state().last_capture_location;
        let Some(distance) = geo::distance(last, Some(position)) else {
            continue;
        };
        if distance >= threshold {
            debug!("Moved {:.2} m since last capture", distance);
            ctx.capture(Some(DistanceTrigger {
                distance_m: distance,
                position,
            }))
            .await?;
        }
    }
    Ok(())
}

impl CaptureContext {
    /// The capture operation shared by both loops and single shots.
    ///
    /// Returns whether the camera succeeded. A camera failure is logged and
    /// leaves the statistics untouched; only a failed camera task is an error.
    async fn capture(&self, trigger: Option<DistanceTrigger>) -> Result<bool, SchedulerError> {
        let _serial = self.shared.capture_lock.lock().await;

        let fix = self.gps.current_fix();
        let sequence_number = self.shared.state().stats.capture_count;
        let now = Local::now();
        let metadata = CaptureMetadata {
            datetime: now,
            capture_mode: self.config.mode.as_str().to_string(),
            gps: GpsMetadata::from(&fix),
            camera: CameraMetadata::from(&self.config.camera),
            view_types: self.config.view_types.clone(),
            sequence_number,
        };
        let file_prefix = format!("{}_{}", self.config.file_prefix, now.format("%Y%m%d"));

        let camera = self.camera.clone();
        let config = self.config.clone();
        let result = tokio::task::spawn_blocking(move || {
            camera.capture(
                &config.output_directory,
                &file_prefix,
                &metadata,
                &config.view_types,
            )
        })
        .await?;

        let paths = match result {
            Ok(paths) => paths,
            Err(e) => {
                warn!("Capture #{} failed: {}", sequence_number + 1, e);
                return Ok(false);
            }
        };

        let current = self.gps.current_fix();
        let count = {
            let mut state = self.shared.state();
            state.stats.capture_count += 1;
            state.stats.last_capture_time = Some(Local::now());
            match trigger {
                Some(trigger) => {
                    state.stats.distance_traveled_m += trigger.distance_m;
                    state.last_capture_location = Some(trigger.position);
                }
                None if current.has_fix() => {
                    state.last_capture_location = current.position;
                }
                None => {}
            }
            state.stats.capture_count
        };

        let kinds: Vec<&str> = if paths.is_empty() {
            self.config.view_types.iter().map(ViewType::as_str).collect()
        } else {
            paths.keys().map(ViewType::as_str).collect()
        };
        info!("Captured image set #{} with types: {}", count, kinds.join(", "));
        Ok(true)
    }
}

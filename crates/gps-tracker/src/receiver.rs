//! Serial NMEA receiver
//!
//! Opens the puck's serial port, reads sentences on a background task and
//! publishes parsed fields into a shared [`FixTracker`].

use crate::error::GpsError;
use crate::fix::GpsFix;
use crate::nmea;
use crate::tracker::FixTracker;
use crate::GpsSource;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Number of raw sentences kept for diagnostics
const RECENT_SENTENCES: usize = 5;

/// How long `disconnect` waits for the reader task
const READER_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Serial settings for the GPS receiver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsSettings {
    /// Serial port device path (e.g., "/dev/ttyUSB0" or "COM3")
    pub port: String,
    /// Baud rate (SiRF-based pucks default to 4800)
    pub baud_rate: u32,
    /// Serial read timeout in seconds
    #[serde(alias = "timeout")]
    pub timeout_secs: f64,
}

impl Default for GpsSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 4800,
            timeout_secs: 1.0,
        }
    }
}

/// Async serial GPS receiver
pub struct GpsReceiver {
    tracker: Arc<FixTracker>,
    connected: Arc<AtomicBool>,
    recent: Arc<Mutex<VecDeque<String>>>,
    cancel: Option<CancellationToken>,
    reader: Option<JoinHandle<()>>,
}

impl GpsReceiver {
    /// Create a disconnected receiver publishing into `tracker`
    pub fn new(tracker: Arc<FixTracker>) -> Self {
        Self {
            tracker,
            connected: Arc::new(AtomicBool::new(false)),
            recent: Arc::new(Mutex::new(VecDeque::with_capacity(RECENT_SENTENCES))),
            cancel: None,
            reader: None,
        }
    }

    /// Open the serial port and start reading sentences.
    ///
    /// An existing connection is closed first.
    pub async fn connect(&mut self, settings: &GpsSettings) -> Result<(), GpsError> {
        use tokio_serial::SerialPortBuilderExt;

        if self.is_connected() {
            self.disconnect().await;
        }

        info!(
            "Connecting to GPS on {} at {} baud",
            settings.port, settings.baud_rate
        );

        let port = tokio_serial::new(&settings.port, settings.baud_rate)
            .timeout(Duration::from_secs_f64(settings.timeout_secs))
            .open_native_async()
            .map_err(|e| {
                error!("Error connecting to GPS on {}: {}", settings.port, e);
                GpsError::from(e)
            })?;

        let cancel = CancellationToken::new();
        self.connected.store(true, Ordering::SeqCst);
        self.reader = Some(tokio::spawn(read_sentences(
            port,
            self.tracker.clone(),
            self.recent.clone(),
            self.connected.clone(),
            cancel.clone(),
        )));
        self.cancel = Some(cancel);

        info!("Connected to GPS device on {}", settings.port);
        Ok(())
    }

    /// Stop the reader task and close the port
    pub async fn disconnect(&mut self) {
        let Some(cancel) = self.cancel.take() else {
            return;
        };
        cancel.cancel();

        if let Some(mut reader) = self.reader.take() {
            if tokio::time::timeout(READER_JOIN_TIMEOUT, &mut reader)
                .await
                .is_err()
            {
                warn!("GPS reader did not stop in time, aborting");
                reader.abort();
            }
        }

        self.connected.store(false, Ordering::SeqCst);
        info!("Disconnected from GPS");
    }

    /// A cloneable view of this receiver's connection state and fixes
    pub fn handle(&self) -> ReceiverHandle {
        ReceiverHandle {
            tracker: self.tracker.clone(),
            connected: self.connected.clone(),
        }
    }

    /// The tracker this receiver publishes into
    pub fn tracker(&self) -> &Arc<FixTracker> {
        &self.tracker
    }

    /// The last few raw sentences, oldest first
    pub fn recent_sentences(&self) -> Vec<String> {
        self.recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl GpsSource for GpsReceiver {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn current_fix(&self) -> GpsFix {
        self.tracker.current_fix()
    }
}

/// Shared read side of a [`GpsReceiver`].
///
/// Stays valid across reconnects; reports disconnected while the receiver
/// is closed.
#[derive(Clone)]
pub struct ReceiverHandle {
    tracker: Arc<FixTracker>,
    connected: Arc<AtomicBool>,
}

impl GpsSource for ReceiverHandle {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn current_fix(&self) -> GpsFix {
        self.tracker.current_fix()
    }
}

async fn read_sentences<R>(
    port: R,
    tracker: Arc<FixTracker>,
    recent: Arc<Mutex<VecDeque<String>>>,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
) where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut reader = BufReader::new(port);
    let mut buf = Vec::with_capacity(128);

    loop {
        buf.clear();
        tokio::select! {
            _ = cancel.cancelled() => break,
            read = reader.read_until(b'\n', &mut buf) => match read {
                Ok(0) => {
                    warn!("GPS serial stream closed");
                    break;
                }
                Ok(_) => {
                    // Line noise is replaced, not fatal
                    let line = String::from_utf8_lossy(&buf);
                    ingest_line(&tracker, &recent, &line);
                }
                Err(e) => {
                    error!("Error reading GPS data: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
    debug!("GPS reader stopped");
}

/// Record a raw line and apply it to the tracker if it parses
fn ingest_line(tracker: &FixTracker, recent: &Mutex<VecDeque<String>>, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    {
        let mut recent = recent.lock().unwrap_or_else(PoisonError::into_inner);
        if recent.len() == RECENT_SENTENCES {
            recent.pop_front();
        }
        recent.push_back(line.to_string());
    }

    if !line.starts_with('$') {
        return;
    }

    match nmea::parse_sentence(line) {
        Ok(Some(update)) => {
            tracker.update(&update);
        }
        Ok(None) => {}
        Err(e) => debug!("Skipping sentence: {}", e),
    }
}

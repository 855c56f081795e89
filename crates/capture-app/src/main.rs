//! GeoCapture - Main Entry Point

use capture_app::{init_logging, run, settings_path, CONFIG_ENV};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    info!("=== GeoCapture v{} ===", env!("CARGO_PKG_VERSION"));

    let settings = settings_path(std::env::args().nth(1), std::env::var(CONFIG_ENV).ok());
    match &settings {
        Some(path) => info!("Using settings from {}", path.display()),
        None => info!("No settings file given, using defaults"),
    }

    run(settings.as_deref()).await
}

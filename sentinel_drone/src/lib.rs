// THEORY:
// `sentinel_drone` is the outer shell around the `cloud_sentinel` engine: video
// decoding through OpenCV, console output, logging setup, and the small
// administrative tools under `src/bin`. None of the decision logic lives here.

pub mod console;
pub mod video;

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads `.env` (if any), installs logging, and reads the configuration.
pub fn bootstrap() -> anyhow::Result<cloud_sentinel::SentinelConfig> {
    dotenv::dotenv().ok();
    init_tracing();
    Ok(cloud_sentinel::SentinelConfig::from_env()?)
}

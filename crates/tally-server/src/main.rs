//! Tally server binary.
//!
//! Wires the persistent counter to the HTTP layer and serves until
//! `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `tally-config.yaml` (or `TALLY_CONFIG`)
//! 2. Initialize structured logging (tracing), then apply `TALLY_*`
//!    environment overrides and log any that were rejected
//! 3. Load the counter from its backing file (a malformed file aborts)
//! 4. Log the SPA asset tree
//! 5. Serve the API and assets

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use tally_core::{PersistentCounter, TallyConfig};
use tally_http::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "tally-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, counter loading, or the server
/// fails. Any error exits the process with a non-zero status.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Load configuration. Logging is not up yet, so remember whether
    //    the file was found and report it afterwards.
    let (mut config, config_path) = load_config()?;

    // 2. Initialize structured logging, then apply environment overrides
    //    so rejected values are actually reported.
    init_logging(&config)?;
    match &config_path {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }
    for rejected in config.apply_env_overrides() {
        warn!(
            key = rejected.key,
            value = %rejected.value,
            reason = %rejected.reason,
            "ignoring invalid environment override"
        );
    }
    info!(
        write_mode = ?config.counter.write_mode,
        assets_dir = ?config.assets.dir,
        rate_limit_enabled = config.rate_limit.enabled,
        "tally-server starting"
    );

    // 3. Load the counter. A malformed or unreadable file is fatal.
    let counter = PersistentCounter::open_with_mode(
        config.counter.path.clone(),
        config.counter.write_mode,
    )
    .inspect_err(|e| tracing::error!(error = %e, "failed to load counter"))?;
    info!(path = %counter.path().display(), value = counter.value(), "Counter ready");

    // 4. Print the asset tree for diagnostics.
    tally_http::assets::log_asset_tree(config.assets.dir.as_deref(), config.assets.tree_depth);

    // 5. Serve.
    let state = Arc::new(AppState::from_config(Arc::new(counter), &config));
    tally_http::start_server(&config.server, state).await?;

    Ok(())
}

/// Load configuration from `TALLY_CONFIG` or `tally-config.yaml`.
///
/// An explicit `TALLY_CONFIG` must exist. A missing default file yields
/// defaults and `None` for the path.
fn load_config() -> Result<(TallyConfig, Option<PathBuf>), AppError> {
    if let Some(path) = std::env::var_os("TALLY_CONFIG").map(PathBuf::from) {
        let config = TallyConfig::from_file(&path)?;
        return Ok((config, Some(path)));
    }

    let path = PathBuf::from(DEFAULT_CONFIG_PATH);
    Ok(match TallyConfig::from_optional_file(&path)? {
        Some(config) => (config, Some(path)),
        None => (TallyConfig::default(), None),
    })
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_logging(config: &TallyConfig) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .map_err(|e| AppError::Logging {
            message: format!("invalid log filter {:?}: {e}", config.logging.level),
        })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if config.logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| AppError::Logging {
        message: e.to_string(),
    })
}

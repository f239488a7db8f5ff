//! Log subscriber setup with a runtime-switchable debug level.

use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

use crate::HologramError;

/// Filter used when debug logging is switched on.
const DEBUG_FILTER: &str = "debug";

/// Filter used otherwise, unless `RUST_LOG` says something else.
const DEFAULT_FILTER: &str = "info";

fn filter_for(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::new(DEBUG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Switches the global log filter between normal and debug at runtime.
///
/// The server wires this to SIGUSR1 (debug on) and SIGUSR2 (debug off).
#[derive(Clone)]
pub struct LogLevelHandle {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl LogLevelHandle {
    /// Turns debug logging on or off.
    pub fn set_debug(&self, debug: bool) -> Result<(), HologramError> {
        self.handle
            .reload(filter_for(debug))
            .map_err(|e| HologramError::Logging(e.to_string()))
    }
}

/// Installs the global subscriber: an `EnvFilter` behind a reload layer,
/// then a plain-text formatter.
///
/// Fails if a global subscriber is already installed.
pub fn init(debug: bool) -> Result<LogLevelHandle, HologramError> {
    let (filter, handle) = reload::Layer::new(filter_for(debug));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| HologramError::Logging(e.to_string()))?;
    Ok(LogLevelHandle { handle })
}

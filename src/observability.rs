//! Logging setup
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | RUST_LOG | info | `tracing_subscriber` filter directives |
//! | SKZ_LOG_JSON | false | Emit one JSON object per event |

use tracing_subscriber::EnvFilter;

pub const ENV_LOG_JSON: &str = "SKZ_LOG_JSON";

/// Install the global tracing subscriber. Later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(ENV_LOG_JSON)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    // Err only means a subscriber is already installed
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

//! Logging setup
//!
//! Everything logs through the `log` facade; this wires it to `env_logger`.
//! `RUST_LOG` wins over the configured level.

use env_logger::{Builder, Env};

/// Install the global logger. Returns false when one was already installed.
pub fn init_logging(default_level: &str) -> bool {
    let env = Env::default().default_filter_or(default_level);
    let installed = Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()
        .is_ok();
    if installed {
        log::debug!("Logging initialised at {}", default_level);
    }
    installed
}

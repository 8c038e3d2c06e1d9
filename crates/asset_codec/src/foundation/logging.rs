//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// `RUST_LOG` takes precedence over `default_level` when it is set.
pub fn init(default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    // A second initialization (tests, embedding tools) is not an error worth surfacing
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}

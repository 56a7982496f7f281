//! Logging setup.
//!
//! The library itself only emits `tracing` events. Applications that do not
//! install their own subscriber can call [`init_logging`] with the `log`
//! section of their [`FilterSettings`](crate::config::FilterSettings).

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Installs a global `fmt` subscriber configured from `log`.
///
/// `RUST_LOG` takes precedence over `log.level` when set. Returns `false` if a
/// global subscriber was already installed, in which case nothing changes.
pub fn init_logging(log: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(log.source_location)
        .with_line_number(log.source_location)
        .with_target(true);

    let installed = if log.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let log = LogConfig::default();
        let _ = init_logging(&log);
        assert!(!init_logging(&log));
        tracing::debug!("logging still works after a repeated init");
    }
}

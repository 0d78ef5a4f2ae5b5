//! Structured logging setup
//!
//! Diagnostics go to stderr through `tracing`. `RUST_LOG` wins over the
//! verbosity flag when set.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Filter directive for a `-v` count
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "voice_recorder=debug,info",
        _ => "voice_recorder=trace,debug",
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .try_init();

    if installed.is_ok() {
        tracing::debug!(verbosity, "logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_by_default() {
        assert_eq!(default_directive(0), "warn");
    }

    #[test]
    fn verbosity_raises_crate_level() {
        assert!(default_directive(1).contains("voice_recorder=debug"));
        assert!(default_directive(5).contains("voice_recorder=trace"));
    }

    #[test]
    fn directives_parse() {
        for v in 0..3 {
            assert!(default_directive(v).parse::<EnvFilter>().is_ok());
        }
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logging(0);
        init_logging(1);
    }
}

//! Logging setup for the provider.
//!
//! Terraform captures a plugin's stderr and surfaces it when `TF_LOG` is
//! set, so logs always go to stderr. The filter comes from `TF_LOG` when it
//! names a level Terraform understands, then from `RUST_LOG`, then `info`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LEVEL: &str = "info";

/// Maps a Terraform log level name onto a tracing filter directive
pub fn tf_log_directive(tf_log: &str) -> Option<&'static str> {
    match tf_log.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "JSON" => Some("trace"),
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARN" => Some("warn"),
        "ERROR" => Some("error"),
        "OFF" => Some("off"),
        _ => None,
    }
}

fn build_filter() -> EnvFilter {
    if let Some(directive) = std::env::var("TF_LOG")
        .ok()
        .as_deref()
        .and_then(tf_log_directive)
    {
        return EnvFilter::new(directive);
    }

    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}

fn subscriber() -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry().with(build_filter()).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    )
}

/// Installs the global subscriber.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    subscriber().init();
}

/// Like [`init_logging`], but returns false instead of panicking when a
/// subscriber is already installed.
pub fn try_init_logging() -> bool {
    subscriber().try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terraform_levels_map_to_tracing_directives() {
        assert_eq!(tf_log_directive("TRACE"), Some("trace"));
        assert_eq!(tf_log_directive("debug"), Some("debug"));
        assert_eq!(tf_log_directive(" WARN "), Some("warn"));
        assert_eq!(tf_log_directive("JSON"), Some("trace"));
        assert_eq!(tf_log_directive("verbose"), None);
    }

    #[test]
    fn directives_parse_as_filters() {
        for level in ["TRACE", "DEBUG", "INFO", "WARN", "ERROR", "OFF"] {
            let directive = tf_log_directive(level).unwrap();
            assert!(EnvFilter::try_new(directive).is_ok());
        }
        assert!(EnvFilter::try_new("warn,octopusdeploy=debug").is_ok());
    }

    #[test]
    fn second_init_reports_failure_instead_of_panicking() {
        let _ = try_init_logging();
        assert!(!try_init_logging());
    }
}

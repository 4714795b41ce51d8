//! Logging initialization for the bulwark CLI.
//!
//! Configures `tracing-subscriber` based on the `[general]` section
//! of `BulwarkConfig`. Logs go to stderr; stdout carries the report stream.
//!
//! Level precedence: `--log-level` > `RUST_LOG` > `general.log_level`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use bulwark_core::config::GeneralConfig;

use crate::error::CliError;

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used.
///
/// # Formats
///
/// * `"json"` - Machine-parseable JSON lines (default)
/// * `"pretty"` - Human-readable colored output
pub fn init_tracing(config: &GeneralConfig, level_override: Option<&str>) -> Result<(), CliError> {
    let env_filter = build_filter(config, level_override)?;

    match config.log_format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| {
                CliError::Command(format!("failed to initialize JSON tracing subscriber: {e}"))
            }),
        "pretty" => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| {
                CliError::Command(format!(
                    "failed to initialize pretty tracing subscriber: {e}"
                ))
            }),
        other => Err(CliError::Config(format!(
            "unknown log format '{other}', expected 'json' or 'pretty'"
        ))),
    }
}

fn build_filter(
    config: &GeneralConfig,
    level_override: Option<&str>,
) -> Result<EnvFilter, CliError> {
    if let Some(level) = level_override {
        return EnvFilter::try_new(level)
            .map_err(|e| CliError::Usage(format!("invalid --log-level '{level}': {e}")));
    }
    Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_format_is_config_error() {
        let config = GeneralConfig {
            log_format: "xml".to_owned(),
            ..GeneralConfig::default()
        };
        let err = init_tracing(&config, None).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn test_override_filter_is_accepted() {
        let config = GeneralConfig::default();
        assert!(build_filter(&config, Some("debug")).is_ok());
        assert!(build_filter(&config, Some("bulwark_core=trace,warn")).is_ok());
    }
}

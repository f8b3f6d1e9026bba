//! Telemetry bootstrap: installs the global tracing subscriber.

use anyhow::anyhow;
use bookreview_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,tower_http=info";

/// Build the filter: `RUST_LOG` wins, then the configured directive, then
/// the built-in default.
pub fn env_filter(settings: &TelemetrySettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = settings.filter.as_deref().unwrap_or(DEFAULT_FILTER);
        EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    })
}

/// Initialize the tracing pipeline. Fails if a global subscriber is
/// already installed.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(settings));

    let installed = match settings.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))?;

    tracing::info!(
        target: "bookreview-telemetry",
        format = ?settings.log_format,
        "telemetry initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_directive_falls_back_to_default() {
        let settings = TelemetrySettings {
            log_format: LogFormat::Pretty,
            filter: Some("=[".to_string()),
        };
        let filter = env_filter(&settings);
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn second_init_reports_an_error() {
        let settings = TelemetrySettings::default();
        init(&settings).unwrap();
        assert!(init(&settings).is_err());
    }
}

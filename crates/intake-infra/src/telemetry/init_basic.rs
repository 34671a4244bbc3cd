use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "intake=debug,intake_core=debug,intake_storage=debug,intake_processing=debug";

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TelemetryFormat {
    #[default]
    Pretty,
    Json,
}

impl TelemetryFormat {
    /// JSON when the `observability-json` feature is enabled, pretty otherwise
    pub fn from_features() -> Self {
        if cfg!(feature = "observability-json") {
            TelemetryFormat::Json
        } else {
            TelemetryFormat::Pretty
        }
    }
}

/// Initialize tracing for the current process.
///
/// Returns `false` when a global subscriber was already installed; the existing
/// one is left in place.
pub fn init_telemetry(format: TelemetryFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        TelemetryFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        TelemetryFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    }
    .is_ok();

    if installed {
        tracing::info!(?format, "Tracing initialized");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_telemetry_is_repeatable() {
        init_telemetry(TelemetryFormat::Pretty);
        // A subscriber is in place now, so a second install is refused
        assert!(!init_telemetry(TelemetryFormat::Json));
    }

    #[test]
    fn test_default_format() {
        assert_eq!(TelemetryFormat::default(), TelemetryFormat::Pretty);
    }
}

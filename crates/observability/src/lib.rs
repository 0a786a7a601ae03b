use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initializes the tracing subscriber for one of the billing binaries.
///
/// `LOG_DESTINATIONS` selects the output shape: any destination list that
/// mentions `json` switches to machine-readable lines for log shippers,
/// everything else gets the human-readable formatter.
pub fn init_observability(component: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let destinations = std::env::var("LOG_DESTINATIONS").unwrap_or_default();
    let json_output = destinations
        .split(',')
        .any(|dest| dest.trim().eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json_output {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339()),
            )
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339()),
            )
            .try_init()?;
    }

    let environment = std::env::var("APP_ENV").unwrap_or_else(|_| "unknown".to_string());
    info!(component = %component, environment = %environment, "observability initialized");

    Ok(())
}

use crate::config::TelemetryConfig;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{value}'")]
    Filter {
        value: String,
        #[source]
        source: ParseError,
    },
    #[error("tracing subscriber could not be installed")]
    Install(#[from] TryInitError),
}

/// Install the global tracing subscriber. `RUST_LOG` wins when set;
/// otherwise the configured level applies with chatty HTTP internals capped
/// at warn. Output is compact, ansi per the deployment environment.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => fallback_filter(&config.log_level)?,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(config.ansi)
        .compact()
        .finish();
    Ok(subscriber.try_init()?)
}

fn fallback_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    let directives = format!("{level},hyper=warn,tower_http=warn");
    EnvFilter::try_new(&directives).map_err(|source| TelemetryError::Filter {
        value: directives,
        source,
    })
}

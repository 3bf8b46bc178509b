#![forbid(unsafe_code)]

//! Structured logging.
//!
//! Bindery logs through `tracing` and never installs a subscriber on its
//! own. Spans emitted by the core:
//!
//! | Span                  | Fields                         |
//! |-----------------------|--------------------------------|
//! | `subscription.notify` | `subscribers`, `duration_us`   |
//! | `batch.flush`         | `deferred`, `duration_us`      |
//!
//! Applications that want output can install any subscriber, or enable the
//! `tracing-json` feature and call [`init_json_logging`].

pub use tracing::{debug, debug_span, error, info, trace, trace_span, warn};

/// Error returned when a global subscriber is already installed.
#[cfg(feature = "tracing-json")]
#[derive(Debug)]
pub struct LoggingInitError(tracing_subscriber::util::TryInitError);

#[cfg(feature = "tracing-json")]
impl std::fmt::Display for LoggingInitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to install tracing subscriber: {}", self.0)
    }
}

#[cfg(feature = "tracing-json")]
impl std::error::Error for LoggingInitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Install a JSON formatter filtered by `RUST_LOG` (default `info`).
#[cfg(feature = "tracing-json")]
pub fn init_json_logging() -> Result<(), LoggingInitError> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .map_err(LoggingInitError)
}

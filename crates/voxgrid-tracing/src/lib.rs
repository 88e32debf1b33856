//! Subscriber setup shared by the voxgrid workspace.
//!
//! Tests, benches, and downstream binaries all need a `tracing` subscriber,
//! and they all want the same knobs: a filter, an output format, and an
//! environment override. This crate owns that wiring once so no consumer
//! re-implements the builder chain.

use std::env;
use std::error::Error;
use std::fmt;

pub use tracing::{debug, error, info, trace, warn};

use tracing::Subscriber;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter, Registry};

/// Formatter layer shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TracingOutput {
    /// Single-line plain text.
    Compact,
    /// Multi-line human-oriented text.
    Pretty,
    /// One JSON object per event, for log collectors.
    Json,
}

impl TracingOutput {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// How the shared subscriber filters and formats events.
#[derive(Clone, Debug)]
pub struct TracingConfig {
    /// Explicit filter directives, e.g. `voxgrid_core=debug,info`. `None`
    /// defers to `RUST_LOG`, then to [`default_directive`](Self::default_directive).
    pub directives: Option<String>,
    /// Filter applied when neither [`directives`](Self::directives) nor
    /// `RUST_LOG` yields one.
    pub default_directive: String,
    /// Whether event targets (module paths) are printed.
    pub include_targets: bool,
    /// Whether output uses ANSI colour. Off for CI, whose collectors keep
    /// the escape codes.
    pub ansi: bool,
    /// Which span lifecycle events the formatter emits.
    pub span_events: FmtSpan,
    /// Shape of the formatter layer.
    pub output: TracingOutput,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::for_local()
    }
}

impl TracingConfig {
    /// Local development preset: pretty, coloured, info-level.
    pub fn for_local() -> Self {
        Self {
            directives: None,
            default_directive: "info".to_string(),
            include_targets: true,
            ansi: true,
            span_events: FmtSpan::NONE,
            output: TracingOutput::Pretty,
        }
    }

    /// CI / log-collection preset: JSON, colourless, info-level.
    pub fn for_ci() -> Self {
        Self {
            directives: None,
            default_directive: "info".to_string(),
            include_targets: true,
            ansi: false,
            span_events: FmtSpan::NONE,
            output: TracingOutput::Json,
        }
    }

    /// Benchmark preset.
    ///
    /// Warn-level so the per-pixel hot loops being measured are not
    /// perturbed by formatting; compact text for whatever gets through.
    pub fn for_bench() -> Self {
        Self {
            directives: None,
            default_directive: "warn".to_string(),
            include_targets: false,
            ansi: false,
            span_events: FmtSpan::NONE,
            output: TracingOutput::Compact,
        }
    }

    /// Pick a preset and overrides from the environment.
    ///
    /// `VOXGRID_TRACING_PROFILE` selects `local` (default), `ci`, or
    /// `bench`; `VOXGRID_TRACING_DIRECTIVES` replaces the filter
    /// directives; `VOXGRID_TRACING_FORMAT` replaces the output shape
    /// (`pretty`, `compact`, `json`). Unrecognised values fall back to the
    /// preset.
    pub fn from_env() -> Self {
        let profile = env::var("VOXGRID_TRACING_PROFILE").unwrap_or_default();
        let mut config = match profile.trim().to_ascii_lowercase().as_str() {
            "ci" => Self::for_ci(),
            "bench" => Self::for_bench(),
            _ => Self::for_local(),
        };

        match env::var("VOXGRID_TRACING_DIRECTIVES") {
            Ok(directives) if !directives.trim().is_empty() => {
                config.directives = Some(directives);
            }
            _ => {}
        }

        if let Some(output) = env::var("VOXGRID_TRACING_FORMAT")
            .ok()
            .and_then(|value| TracingOutput::parse(&value))
        {
            // JSON output never carries colour codes.
            if output == TracingOutput::Json {
                config.ansi = false;
            }
            config.output = output;
        }

        config
    }

    fn env_filter(&self) -> Result<EnvFilter, TracingSetupError> {
        match &self.directives {
            Some(directives) => EnvFilter::try_new(directives)
                .map_err(|err| TracingSetupError::InvalidFilter(err.to_string())),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive.clone()))),
        }
    }
}

/// Failure while building or installing the shared subscriber.
#[derive(Debug)]
pub enum TracingSetupError {
    /// A directive string did not parse as an `EnvFilter`.
    InvalidFilter(String),
    /// The global default could not be set, typically because a subscriber
    /// is installed already.
    SubscriberInit(tracing_subscriber::util::TryInitError),
}

impl fmt::Display for TracingSetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TracingSetupError::InvalidFilter(msg) => {
                write!(f, "invalid tracing directive: {msg}")
            }
            TracingSetupError::SubscriberInit(err) => {
                write!(f, "failed to install global tracing subscriber: {err}")
            }
        }
    }
}

impl Error for TracingSetupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TracingSetupError::SubscriberInit(err) => Some(err),
            TracingSetupError::InvalidFilter(_) => None,
        }
    }
}

/// Filter and formatter layers, for callers composing their own registry.
pub fn subscriber_layers(
    config: &TracingConfig,
) -> Result<(EnvFilter, Box<dyn Layer<Registry> + Send + Sync>), TracingSetupError> {
    let filter = config.env_filter()?;

    let base = tracing_fmt::layer()
        .with_target(config.include_targets)
        .with_span_events(config.span_events.clone());

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.output {
        TracingOutput::Compact => Box::new(base.with_ansi(config.ansi)),
        TracingOutput::Pretty => Box::new(base.pretty().with_ansi(config.ansi)),
        TracingOutput::Json => Box::new(base.json().with_ansi(false)),
    };

    Ok((filter, layer))
}

/// Assemble a subscriber from a configuration.
pub fn build_subscriber(
    config: &TracingConfig,
) -> Result<impl Subscriber + Send + Sync, TracingSetupError> {
    let (filter, layer) = subscriber_layers(config)?;
    Ok(Registry::default().with(layer).with(filter))
}

/// Build and install the subscriber as the process-wide default.
pub fn init_global_tracing(config: &TracingConfig) -> Result<(), TracingSetupError> {
    build_subscriber(config)?
        .try_init()
        .map_err(TracingSetupError::SubscriberInit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env-var mutation is process-global; serialize the tests that do it.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_KEYS: [&str; 4] = [
        "VOXGRID_TRACING_PROFILE",
        "VOXGRID_TRACING_FORMAT",
        "VOXGRID_TRACING_DIRECTIVES",
        "RUST_LOG",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn bad_directive_is_reported_not_swallowed() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let config = TracingConfig {
            directives: Some("=::invalid".to_string()),
            ..TracingConfig::default()
        };
        assert!(matches!(
            build_subscriber(&config),
            Err(TracingSetupError::InvalidFilter(_))
        ));
    }

    #[test]
    fn default_config_builds() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        assert!(build_subscriber(&TracingConfig::default()).is_ok());
    }

    #[test]
    fn env_overrides_profile_format_and_directives() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var("VOXGRID_TRACING_PROFILE", "ci");
        env::set_var("VOXGRID_TRACING_FORMAT", "compact");
        env::set_var("VOXGRID_TRACING_DIRECTIVES", "voxgrid_core=debug");

        let config = TracingConfig::from_env();
        assert_eq!(config.directives.as_deref(), Some("voxgrid_core=debug"));
        assert!(!config.ansi);
        assert_eq!(config.output, TracingOutput::Compact);

        clear_env();
    }

    #[test]
    fn bench_profile_quiets_the_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var("VOXGRID_TRACING_PROFILE", "bench");
        let config = TracingConfig::from_env();
        assert_eq!(config.default_directive, "warn");
        assert!(!config.include_targets);
        assert_eq!(config.output, TracingOutput::Compact);

        clear_env();
    }
}

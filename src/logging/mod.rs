//! Logging setup and transcript files
//!
//! Console output goes through `tracing`; when file logging is enabled the
//! same events are also appended to `<log_dir>/server_log.txt`. Chat turns
//! and executed commands go to separate transcript files via
//! [`TranscriptLog`].

pub mod middleware;
pub mod transcript;

pub use middleware::{generate_request_id, request_span};
pub use transcript::{truncate_chars, TranscriptLog};

use crate::config::{LogFormat, LoggingConfig};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build filter directives string from LoggingConfig
///
/// # Examples
///
/// ```
/// use regis::config::LoggingConfig;
/// use regis::logging::build_filter_directives;
/// use std::collections::HashMap;
///
/// let mut component_levels = HashMap::new();
/// component_levels.insert("relay".to_string(), "debug".to_string());
///
/// let config = LoggingConfig {
///     component_levels: Some(component_levels),
///     ..LoggingConfig::default()
/// };
///
/// let filter_str = build_filter_directives(&config);
/// assert_eq!(filter_str, "info,regis::relay=debug");
/// ```
pub fn build_filter_directives(config: &LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        let mut components: Vec<_> = component_levels.iter().collect();
        components.sort();
        for (component, level) in components {
            filter_str.push_str(&format!(",regis::{}={}", component, level));
        }
    }

    filter_str
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = build_filter_directives(config);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_layer = if config.enabled {
        std::fs::create_dir_all(&config.log_dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(config.log_dir.join(transcript::SERVER_LOG_FILE))?;
        Some(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false),
        )
    } else {
        None
    };

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(file_layer)
                .with(env_filter)
                .with(fmt::layer().pretty())
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(file_layer)
                .with(env_filter)
                .with(fmt::layer().json())
                .try_init()?;
        }
    }

    Ok(())
}

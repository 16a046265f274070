//! Logging system configuration and initialization
//!
//! - Console output on stderr (stdout is reserved for results)
//! - Optional file output through a non-blocking appender
//! - Optional structured JSON formatting
//! - `RUST_LOG` overrides the configured filter entirely

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::Lazy;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;
use crate::infrastructure::config::{ConfigManager, defaults};

/// Keeps the file writer flushing until process exit.
static LOG_GUARDS: Lazy<Mutex<Vec<WorkerGuard>>> = Lazy::new(|| Mutex::new(Vec::new()));

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Local wall-clock timestamps with millisecond precision
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Directory the log file is written to
pub fn get_log_directory(config: &LoggingConfig) -> Result<PathBuf> {
    match &config.log_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(ConfigManager::get_app_data_dir()?.join("logs")),
    }
}

/// Filter from the configured level plus per-module overrides.
///
/// Dependency chatter (HTTP internals, the HTML tokenizer) stays quiet
/// unless the level is `trace`.
pub fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let mut filter = EnvFilter::new(&config.level);
    if config.level.to_lowercase().contains("trace") {
        return filter;
    }
    for (module, level) in &config.module_filters {
        match format!("{module}={level}").parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring log filter {module}={level}: {e}"),
        }
    }
    filter
}

fn console_layer(json: bool) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTimeFormatter)
        .with_target(false);
    if json { layer.json().boxed() } else { layer.boxed() }
}

fn file_layer(config: &LoggingConfig, log_dir: &Path) -> Result<BoxedLayer> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let (writer, guard) = non_blocking(rolling::never(log_dir, defaults::LOG_FILE_NAME));
    LOG_GUARDS
        .lock()
        .map_err(|_| anyhow!("Log guard registry poisoned"))?
        .push(guard);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_timer(LocalTimeFormatter)
        .with_ansi(false);
    Ok(if config.json_format {
        layer.json().with_target(true).with_file(true).with_line_number(true).boxed()
    } else {
        layer.with_target(false).boxed()
    })
}

/// Initialize logging with custom configuration
///
/// Fails when no output is enabled or a global subscriber is already set.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    if !config.console_output && !config.file_output {
        return Err(anyhow!("No logging output configured"));
    }

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut log_dir = None;
    if config.file_output {
        let dir = get_log_directory(config)?;
        layers.push(file_layer(config, &dir)?);
        log_dir = Some(dir);
    }
    if config.console_output {
        layers.push(console_layer(config.json_format));
    }

    Registry::default()
        .with(layers)
        .with(build_env_filter(config))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    info!(
        level = %config.level,
        json = config.json_format,
        file = ?log_dir,
        "Logging system initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(!config.level.is_empty());
        assert!(config.console_output);
        assert!(!config.file_output);
    }

    #[test]
    fn explicit_log_dir_wins() {
        let config = LoggingConfig {
            log_dir: Some(PathBuf::from("/tmp/pricehunt-logs")),
            ..LoggingConfig::default()
        };
        assert_eq!(get_log_directory(&config).unwrap(), PathBuf::from("/tmp/pricehunt-logs"));
    }

    #[test]
    fn rejects_config_without_outputs() {
        let config = LoggingConfig {
            console_output: false,
            file_output: false,
            ..LoggingConfig::default()
        };
        assert!(init_logging_with_config(&config).is_err());
    }

    #[test]
    fn module_filters_are_applied() {
        let filter = build_env_filter(&LoggingConfig::default());
        let rendered = filter.to_string();
        if std::env::var("RUST_LOG").is_err() {
            assert!(rendered.contains("reqwest=warn"));
            assert!(rendered.contains("info"));
        }
    }
}

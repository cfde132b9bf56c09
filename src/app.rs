//! Application wiring for the msgqueue binary
//!
//! Merges command line arguments over file configuration: CLI flags win,
//! then the selected config section, then the named section, then `[base]`.

use crate::cli::Args;
use crate::config::{ConfigManager, StressConfig};
use crate::logging::{self, LogConfig, LogDestination, LogFormat};
use crate::stress::StressReport;
use anyhow::{Context, Result};
use log::{debug, LevelFilter};
use std::str::FromStr;

/// Load configuration from --config-file or the discovery hierarchy
pub fn load_configuration(args: &Args) -> Result<ConfigManager> {
    let mut config = match &args.config_file {
        Some(path) => ConfigManager::load_from_file(path.clone())?,
        None => ConfigManager::load()?,
    };

    if let Some(section) = &args.config_name {
        config.select_section(section.clone());
    }

    Ok(config)
}

/// Build the logging configuration from CLI flags and config file
pub fn configure_logging(args: &Args, config: &ConfigManager) -> Result<LogConfig> {
    let console_level = if args.debug {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Error
    } else {
        config.get_log_level("logging", "level")?.unwrap_or(LevelFilter::Info)
    };

    let format_name = args
        .log_format
        .as_deref()
        .or_else(|| config.get_value("logging", "format").map(String::as_str));
    let format = match format_name {
        Some(format) => LogFormat::from_str(format).map_err(|e| anyhow::anyhow!(e))?,
        None => LogFormat::Text,
    };

    let log_file = args.log_file.clone().or_else(|| config.get_path("logging", "file"));

    let file_level = match &args.log_file_level {
        Some(level) => Some(logging::parse_log_level(level)?),
        None => config.get_log_level("logging", "file-level")?,
    };

    let (destination, file_level) = match log_file {
        Some(path) => (LogDestination::Both(path), Some(file_level.unwrap_or(console_level))),
        None => (LogDestination::Console, None),
    };

    let log_config = LogConfig {
        console_level,
        file_level,
        format,
        destination,
    };
    debug!("Logging configuration: {:?}", log_config);
    Ok(log_config)
}

/// Build the stress configuration: config file values overridden by CLI flags
pub fn stress_config(args: &Args, config: &ConfigManager) -> Result<StressConfig> {
    let mut stress = config.get_stress_config()?;

    if let Some(producers) = args.producers {
        stress.producers = producers;
    }
    if let Some(consumers) = args.consumers {
        stress.consumers = consumers;
    }
    if let Some(messages) = args.messages {
        stress.messages_per_producer = messages;
    }
    if let Some(batch_size) = args.batch_size {
        stress.batch_size = batch_size;
    }
    if let Some(mode) = &args.consume {
        stress.consume_mode = mode.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    }

    stress.validate().context("Invalid stress configuration")?;
    Ok(stress)
}

/// Render a report in the requested output format
pub fn render_report(report: &StressReport, output: &str) -> Result<String> {
    match output.to_lowercase().as_str() {
        "json" => serde_json::to_string_pretty(report).context("Failed to serialize stress report"),
        _ => Ok(report.summary()),
    }
}

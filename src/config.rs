use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use toml::Value;

/// Configuration storage - section_name -> key -> value
pub type Configuration = HashMap<String, HashMap<String, String>>;

/// Configuration manager
#[derive(Debug)]
pub struct ConfigManager {
    config: Configuration,
    config_file_path: Option<PathBuf>,
    selected_section: Option<String>,
}

impl ConfigManager {
    /// Create a new ConfigManager from a Configuration (primarily for testing)
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config,
            config_file_path: None,
            selected_section: None,
        }
    }

    /// Load configuration using discovery hierarchy
    pub fn load() -> Result<Self> {
        debug!("Starting configuration discovery");

        for path in discover_config_files() {
            debug!("Attempting to load config from: {}", path.display());
            if path.exists() {
                return Self::load_from_file(path);
            }
        }

        info!("No configuration file found, using empty configuration");
        Ok(Self::from_config(Configuration::new()))
    }

    /// Load configuration from explicit file path
    pub fn load_from_file(path: PathBuf) -> Result<Self> {
        debug!("Loading configuration from file: {}", path.display());

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = parse_toml_config(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Loaded configuration from: {}", path.display());
        Ok(Self {
            config,
            config_file_path: Some(path),
            selected_section: None,
        })
    }

    /// Path of the file this configuration came from, if any
    pub fn source(&self) -> Option<&PathBuf> {
        self.config_file_path.as_ref()
    }

    /// Get value from configuration with section fallback
    pub fn get_value(&self, section: &str, key: &str) -> Option<&String> {
        // Priority: selected_section -> specified section -> base
        if let Some(selected) = &self.selected_section {
            if let Some(value) = self.config.get(selected).and_then(|s| s.get(key)) {
                return Some(value);
            }
        }

        if let Some(value) = self.config.get(section).and_then(|s| s.get(key)) {
            return Some(value);
        }

        self.config.get("base").and_then(|s| s.get(key))
    }

    /// Select configuration section for --config-name
    pub fn select_section(&mut self, section: String) {
        debug!("Selecting configuration section: {}", section);
        self.selected_section = Some(section);
    }

    /// Get a value parsed into any `FromStr` type
    pub fn get_parsed<T>(&self, section: &str, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_value(section, key) {
            Some(value) => value
                .parse::<T>()
                .map(Some)
                .map_err(|e| anyhow::anyhow!("Invalid value for {}.{}: {} ({})", section, key, value, e)),
            None => Ok(None),
        }
    }

    /// Get log level value with type conversion
    pub fn get_log_level(&self, section: &str, key: &str) -> Result<Option<log::LevelFilter>> {
        match self.get_value(section, key) {
            Some(value) => Ok(Some(crate::logging::parse_log_level(value)?)),
            None => Ok(None),
        }
    }

    /// Get path value with type conversion
    pub fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.get_value(section, key).map(PathBuf::from)
    }

    /// Get stress harness configuration from config file
    pub fn get_stress_config(&self) -> Result<StressConfig> {
        let mut config = StressConfig::default();

        if let Some(producers) = self.get_parsed("stress", "producers")? {
            config.producers = producers;
        }
        if let Some(consumers) = self.get_parsed("stress", "consumers")? {
            config.consumers = consumers;
        }
        if let Some(messages) = self.get_parsed("stress", "messages")? {
            config.messages_per_producer = messages;
        }
        if let Some(batch_size) = self.get_parsed("stress", "batch-size")? {
            config.batch_size = batch_size;
        }
        if let Some(mode) = self.get_value("stress", "consume") {
            config.consume_mode = mode.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        }

        config.validate().context("Stress configuration validation failed")?;
        Ok(config)
    }
}

/// How consumer threads take messages off the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumeMode {
    /// One `pop_wait` per message
    Single,
    /// `pop_wait_batch`, taking everything buffered at once
    Batch,
}

impl FromStr for ConsumeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(ConsumeMode::Single),
            "batch" => Ok(ConsumeMode::Batch),
            _ => Err(format!("Invalid consume mode: {}. Valid options: single, batch", s)),
        }
    }
}

/// Producer/consumer topology for a stress run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    /// Number of producer threads
    pub producers: usize,
    /// Number of consumer threads
    pub consumers: usize,
    /// Messages pushed by each producer
    pub messages_per_producer: usize,
    /// Messages per producer push; 1 uses single `push`
    pub batch_size: usize,
    /// Consumer strategy
    pub consume_mode: ConsumeMode,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            producers: 4,
            consumers: num_cpus::get().max(1),
            messages_per_producer: 10_000,
            batch_size: 1,
            consume_mode: ConsumeMode::Single,
        }
    }
}

impl StressConfig {
    /// Upper bound on messages per run; the delivery ledger keeps one flag per message
    pub const MAX_TOTAL_MESSAGES: usize = 100_000_000;

    /// Total number of messages the run will push
    ///
    /// Saturates for topologies that [`validate`](Self::validate) rejects.
    pub fn total_messages(&self) -> usize {
        self.producers.saturating_mul(self.messages_per_producer)
    }

    /// Reject topologies that cannot move any messages
    pub fn validate(&self) -> Result<()> {
        if self.producers == 0 {
            anyhow::bail!("producers must be at least 1");
        }
        if self.consumers == 0 {
            anyhow::bail!("consumers must be at least 1");
        }
        if self.batch_size == 0 {
            anyhow::bail!("batch-size must be at least 1");
        }
        match self.producers.checked_mul(self.messages_per_producer) {
            Some(total) if total <= Self::MAX_TOTAL_MESSAGES => {}
            _ => anyhow::bail!(
                "{} producers x {} messages exceeds the limit of {} messages per run",
                self.producers,
                self.messages_per_producer,
                Self::MAX_TOTAL_MESSAGES
            ),
        }
        Ok(())
    }
}

/// Discover configuration files in order of precedence
fn discover_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Environment variable $MSGQUEUE_CONFIG
    if let Ok(env_path) = env::var("MSGQUEUE_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    // 2. XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("msgqueue").join("config.toml"));
    }

    // 3. Home directory
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".msgqueue.toml"));
    }

    // 4. Project local
    paths.push(PathBuf::from("./.msgqueue.toml"));

    debug!("Config discovery paths: {:?}", paths);
    paths
}

/// Parse TOML content to string-based configuration
fn parse_toml_config(content: &str) -> Result<Configuration> {
    let toml_value: Value = content.parse().context("Failed to parse TOML content")?;

    let mut config = Configuration::new();
    if let Value::Table(table) = toml_value {
        flatten_toml_table(&table, String::new(), &mut config);
    }

    debug!("Parsed configuration: {:?}", config);
    Ok(config)
}

/// Recursively flatten TOML tables into section.subsection format
fn flatten_toml_table(table: &toml::Table, prefix: String, config: &mut Configuration) {
    for (key, value) in table {
        let section_name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Table(subtable) if subtable.values().all(|v| !v.is_table()) => {
                let section = config.entry(section_name).or_default();
                for (subkey, subvalue) in subtable {
                    section.insert(subkey.clone(), toml_value_to_string(subvalue));
                }
            }
            Value::Table(subtable) => flatten_toml_table(subtable, section_name, config),
            _ => {
                // Top-level keys belong to [base]
                let section = if prefix.is_empty() { "base".to_string() } else { prefix.clone() };
                config
                    .entry(section)
                    .or_default()
                    .insert(key.clone(), toml_value_to_string(value));
            }
        }
    }
}

/// Convert TOML Value to string representation
fn toml_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        other => other.to_string(),
    }
}

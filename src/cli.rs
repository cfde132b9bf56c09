use anyhow::Result;
use clap::Parser;
use log::debug;
use std::path::PathBuf;

/// Blocking message queue stress harness
#[derive(Parser, Debug)]
#[command(name = "msgqueue")]
#[command(about = "Drive a blocking FIFO message queue with concurrent producers and consumers and verify delivery")]
#[command(version)]
pub struct Args {
    /// Number of producer threads
    #[arg(short, long, value_name = "N")]
    pub producers: Option<usize>,

    /// Number of consumer threads
    #[arg(short, long, value_name = "N")]
    pub consumers: Option<usize>,

    /// Messages pushed by each producer
    #[arg(short, long, value_name = "N")]
    pub messages: Option<usize>,

    /// Messages per producer push (1 pushes one at a time)
    #[arg(short, long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Consumer strategy: single or batch
    #[arg(long, value_name = "MODE")]
    pub consume: Option<String>,

    /// Report format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub output: String,

    /// Verbose output (debug level logging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (error level logging only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug output (trace level logging)
    #[arg(long)]
    pub debug: bool,

    /// Log format: text or json (default: text)
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<String>,

    /// Log file path for file output
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL")]
    pub log_file_level: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Configuration section name
    #[arg(long, value_name = "SECTION")]
    pub config_name: Option<String>,
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    let args = Args::parse();
    debug!("Parsed CLI arguments: {:?}", args);
    args
}

/// Validate CLI argument combinations
pub fn validate_args(args: &Args) -> Result<()> {
    let log_flags_count = [args.verbose, args.quiet, args.debug]
        .iter()
        .filter(|&&flag| flag)
        .count();

    if log_flags_count > 1 {
        return Err(anyhow::anyhow!(
            "Conflicting log level flags: only one of --verbose, --quiet, or --debug may be specified"
        ));
    }

    if let Some(ref format) = args.log_format {
        match format.to_lowercase().as_str() {
            "text" | "json" => {}
            _ => {
                return Err(anyhow::anyhow!(
                    "Invalid log format '{}'. Valid options: text, json",
                    format
                ))
            }
        }
    }

    match args.output.to_lowercase().as_str() {
        "text" | "json" => {}
        _ => {
            return Err(anyhow::anyhow!(
                "Invalid output format '{}'. Valid options: text, json",
                args.output
            ))
        }
    }

    // The log file itself may come from the config file
    if let Some(ref level) = args.log_file_level {
        crate::logging::parse_log_level(level)?;
    }

    Ok(())
}

use anyhow::Result;
use log::error;
use msgqueue::{app, cli, logging, stress};
use std::process;

fn main() {
    if let Err(e) = run() {
        error!("Application error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = cli::parse_args();

    cli::validate_args(&args)?;

    let config_manager = app::load_configuration(&args)?;

    let log_config = app::configure_logging(&args, &config_manager)?;
    logging::init_logger(log_config)?;

    let stress_config = app::stress_config(&args, &config_manager)?;
    let report = stress::run(&stress_config)?;

    println!("{}", app::render_report(&report, &args.output)?);
    Ok(())
}

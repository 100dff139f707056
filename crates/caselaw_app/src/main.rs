mod cli;
mod config;
mod harvest;

use std::process::ExitCode;

use caselaw_logging::{harvest_error, harvest_info, LogDestination};
use clap::Parser;

use crate::cli::Cli;
use crate::config::HarvestConfig;

/// Exit status when some cases are still missing after the last retry round.
const EXIT_PARTIAL: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config errors are fatal and come before any logger exists.
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("caselaw error: {:#}", err);
            return ExitCode::FAILURE;
        }
    };

    let destination = match &config.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    caselaw_logging::initialize(destination, cli.log_level());
    harvest_info!("Harvesting into {:?} from {}", config.root, config.base_url);

    match harvest::run(&config) {
        Ok(summary) => {
            summary.print();
            if summary.is_complete() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_PARTIAL)
            }
        }
        Err(err) => {
            harvest_error!("Harvest aborted: {:#}", err);
            eprintln!("caselaw error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<HarvestConfig> {
    let mut config = HarvestConfig::load(cli.config.as_deref())?;
    config.apply_cli(cli);
    config.validate()?;
    Ok(config)
}

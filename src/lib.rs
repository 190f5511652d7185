pub mod cli;
pub mod core;
pub mod monitor;
pub mod store;

use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Aum(cli::aum::AumOptions),
    Growth(cli::growth::GrowthOptions),
    Repair(cli::repair::RepairOptions),
    Monitor(cli::monitor::MonitorOptions),
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("SISET disclosure tools starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Aum(options) => cli::aum::run(&config, &options),
        AppCommand::Growth(options) => cli::growth::run(&config, &options),
        AppCommand::Repair(options) => cli::repair::run(&config, &options),
        AppCommand::Monitor(options) => cli::monitor::run(&config, &options).await,
    }
}

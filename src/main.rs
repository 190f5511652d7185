use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use siset::cli::{aum, growth, monitor, repair, setup};
use siset::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display assets under management by Afore
    Aum {
        /// Reporting period as YYYY-MM (defaults to the latest)
        #[arg(short, long)]
        period: Option<String>,
        /// Single table to show: mutual-funds, third-party or active
        #[arg(short, long)]
        table: Option<String>,
        /// Currency to report in: mxn or usd
        #[arg(long, default_value = "usd")]
        currency: String,
        /// Also export the tables as CSV
        #[arg(long)]
        csv: bool,
        /// List the periods available in the database
        #[arg(long)]
        list_periods: bool,
    },
    /// Display growth across YTD, 1Y, 3Y and 5Y windows
    Growth {
        /// Single window to show: YTD, 1Y, 3Y or 5Y
        #[arg(short, long)]
        window: Option<String>,
        /// Show only the N best-performing Afores per window
        #[arg(long)]
        top: Option<usize>,
    },
    /// Fix scale and currency inconsistencies in the database
    Repair {
        /// Scan and validate without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Watch the regulator's site for new data and manage approvals
    Monitor {
        /// Perform a single check and exit
        #[arg(long)]
        run_once: bool,
        /// Merge a pending approval into the database
        #[arg(long, value_name = "APPROVAL_ID")]
        approve: Option<String>,
        /// Discard a pending approval
        #[arg(long, value_name = "APPROVAL_ID")]
        reject: Option<String>,
        /// Inspect a pending approval's records
        #[arg(long, value_name = "APPROVAL_ID")]
        review: Option<String>,
        /// List approvals awaiting a decision
        #[arg(long)]
        list_pending: bool,
    },
}

impl TryFrom<Commands> for siset::AppCommand {
    type Error = anyhow::Error;

    fn try_from(cmd: Commands) -> Result<siset::AppCommand> {
        let app_cmd = match cmd {
            Commands::Aum {
                period,
                table,
                currency,
                csv,
                list_periods,
            } => siset::AppCommand::Aum(aum::AumOptions {
                period,
                table: table.as_deref().map(str::parse).transpose()?,
                currency: currency.parse()?,
                csv,
                list_periods,
            }),
            Commands::Growth { window, top } => siset::AppCommand::Growth(growth::GrowthOptions {
                window: window.as_deref().map(str::parse).transpose()?,
                top,
            }),
            Commands::Repair { dry_run } => {
                siset::AppCommand::Repair(repair::RepairOptions { dry_run })
            }
            Commands::Monitor {
                run_once,
                approve,
                reject,
                review,
                list_pending,
            } => siset::AppCommand::Monitor(monitor::MonitorOptions {
                run_once,
                approve,
                reject,
                review,
                list_pending,
            }),
            Commands::Setup => anyhow::bail!("Setup command should be handled separately"),
        };
        Ok(app_cmd)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup::setup(),
        Some(cmd) => match siset::AppCommand::try_from(cmd) {
            Ok(app_cmd) => siset::run_command(app_cmd, cli.config_path.as_deref()).await,
            Err(e) => Err(e),
        },
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

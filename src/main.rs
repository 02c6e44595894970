use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use warmindo::cli::assets::AssetAction;
use warmindo::cli::report::ReportOptions;
use warmindo::cli::stock::StockOptions;
use warmindo::cli::transactions::TransactionOptions;
use warmindo::core::inventory::{StockFilter, StockSort};
use warmindo::core::log::init_logging;
use warmindo::{AppCommand, RangeArgs};

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

#[derive(Args)]
struct Range {
    /// First day of the report (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Last day of the report (YYYY-MM-DD), defaults to today
    #[arg(long)]
    end: Option<NaiveDate>,
}

impl From<Range> for RangeArgs {
    fn from(range: Range) -> Self {
        RangeArgs {
            start: range.start,
            end: range.end,
        }
    }
}

#[derive(Subcommand)]
enum AssetCommands {
    /// Pre-cache every configured asset
    Install,
    /// Read one asset, from the cache when possible
    Get {
        path: String,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete asset caches of older versions
    Prune,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Owner dashboard: daily report, chart, menu ranking and expenses
    Report {
        #[command(flatten)]
        range: Range,
        /// Export the report as an Excel workbook
        #[arg(long)]
        excel: bool,
        /// Export the daily report as PDF
        #[arg(long)]
        pdf: bool,
        /// Directory for exported files
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Transaction history with item detail
    Transactions {
        #[command(flatten)]
        range: Range,
        /// Search by transaction id, cashier or menu name
        #[arg(long)]
        search: Option<String>,
        /// Only show transactions of this cashier
        #[arg(long)]
        cashier: Option<String>,
        /// Show the items of a transaction (repeatable)
        #[arg(long)]
        expand: Vec<String>,
        /// Export the items of a transaction as CSV
        #[arg(long)]
        csv: Option<String>,
        /// Directory for exported files
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Interactive transaction browser reading commands from stdin
    Browse {
        #[command(flatten)]
        range: Range,
    },
    /// Product stock overview
    Stock {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// name_asc, stock_asc, stock_desc, price_asc or price_desc
        #[arg(long)]
        sort: Option<String>,
        /// Export the visible list (or the selected product) as CSV
        #[arg(long)]
        csv: bool,
        /// Show a single product by id
        #[arg(long)]
        product: Option<String>,
        /// Directory for exported files
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Offline cache of the dashboard's static assets
    Assets {
        #[command(subcommand)]
        action: AssetCommands,
    },
}

impl TryFrom<Commands> for AppCommand {
    type Error = anyhow::Error;

    fn try_from(cmd: Commands) -> Result<AppCommand> {
        Ok(match cmd {
            Commands::Report {
                range,
                excel,
                pdf,
                out_dir,
            } => AppCommand::Report {
                range: range.into(),
                options: ReportOptions {
                    excel,
                    pdf,
                    out_dir,
                },
            },
            Commands::Transactions {
                range,
                search,
                cashier,
                expand,
                csv,
                out_dir,
            } => AppCommand::Transactions {
                range: range.into(),
                options: TransactionOptions {
                    search,
                    cashier,
                    expand,
                    csv,
                    out_dir,
                },
            },
            Commands::Browse { range } => AppCommand::Browse {
                range: range.into(),
            },
            Commands::Stock {
                search,
                category,
                sort,
                csv,
                product,
                out_dir,
            } => AppCommand::Stock(StockOptions {
                filter: StockFilter {
                    query: search,
                    category,
                    sort: sort.as_deref().map(str::parse::<StockSort>).transpose()?,
                },
                csv,
                product,
                out_dir,
            }),
            Commands::Assets { action } => AppCommand::Assets(match action {
                AssetCommands::Install => AssetAction::Install,
                AssetCommands::Get { path, out } => AssetAction::Get { path, out },
                AssetCommands::Prune => AssetAction::Prune,
            }),
            Commands::Setup => anyhow::bail!("Setup command should be handled separately"),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => warmindo::cli::setup::setup_at_path(path),
            None => warmindo::cli::setup::setup(),
        },
        Some(cmd) => match AppCommand::try_from(cmd) {
            Ok(command) => warmindo::run_command(command, cli.config_path.as_deref()).await,
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

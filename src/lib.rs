pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::assets::AssetAction;
use crate::cli::report::ReportOptions;
use crate::cli::stock::StockOptions;
use crate::cli::transactions::TransactionOptions;
use crate::core::config::AppConfig;
use crate::core::{Dashboard, DateRange, ReportError};
use crate::providers::SupabaseGateway;
use anyhow::Result;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tracing::{debug, info};

/// Optional `--start`/`--end` pair as given on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeArgs {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl RangeArgs {
    /// A missing end means `today`; a missing start means `default_days`
    /// before the end.
    pub fn resolve(&self, today: NaiveDate, default_days: u32) -> Result<DateRange, ReportError> {
        let end = self.end.unwrap_or(today);
        match self.start {
            Some(start) => DateRange::new(start, end),
            None => DateRange::ending_at(end, default_days),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AppCommand {
    Report {
        range: RangeArgs,
        options: ReportOptions,
    },
    Transactions {
        range: RangeArgs,
        options: TransactionOptions,
    },
    Browse {
        range: RangeArgs,
    },
    Stock(StockOptions),
    Assets(AssetAction),
}

fn connect(config: &AppConfig) -> Result<SupabaseGateway> {
    let api_key = config.backend.resolve_api_key()?;
    SupabaseGateway::new(&config.backend.base_url, &api_key)
}

fn dashboard(config: &AppConfig) -> Result<Dashboard> {
    Ok(Dashboard::new(Arc::new(connect(config)?)))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Warmindo starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(
        base_url = %config.backend.base_url,
        store = %config.store_name,
        "Loaded config"
    );

    let today = Local::now().date_naive();
    let default_days = config.report.default_days;

    match command {
        AppCommand::Report { range, options } => {
            let range = range.resolve(today, default_days)?;
            cli::report::run(&config, &dashboard(&config)?, range, &options).await
        }
        AppCommand::Transactions { range, options } => {
            let range = range.resolve(today, default_days)?;
            cli::transactions::run(&config, &dashboard(&config)?, range, &options).await
        }
        AppCommand::Browse { range } => {
            let range = range.resolve(today, default_days)?;
            cli::browse::run(&config, &dashboard(&config)?, range).await
        }
        AppCommand::Stock(options) => {
            cli::stock::run(&config, &connect(&config)?, &options, today).await
        }
        AppCommand::Assets(action) => cli::assets::run(&config, &action).await,
    }
}

//! Interactive transaction browser driven by line commands.

use super::transactions::{export_items, print_cashiers, print_transactions, show_items};
use super::{load_session, ui};
use crate::core::Dashboard;
use crate::core::config::AppConfig;
use crate::core::debounce::debounce;
use crate::core::report::DateRange;
use crate::core::session::{ReportSession, TransactionFilter};
use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const HELP: &str =
    "Ketik kata kunci untuk mencari. Perintah: open ID, cashier ID|-, csv ID, quit";

#[derive(Debug, PartialEq, Eq)]
pub enum BrowseCommand {
    Search(String),
    Open(String),
    Cashier(Option<String>),
    Csv(String),
    Quit,
}

pub fn parse_command(line: &str) -> BrowseCommand {
    let line = line.trim();
    if matches!(line, "quit" | "exit") {
        return BrowseCommand::Quit;
    }
    match line.split_once(char::is_whitespace) {
        Some(("open", id)) if !id.trim().is_empty() => BrowseCommand::Open(id.trim().to_string()),
        Some(("csv", id)) if !id.trim().is_empty() => BrowseCommand::Csv(id.trim().to_string()),
        Some(("cashier", "-")) => BrowseCommand::Cashier(None),
        Some(("cashier", id)) if !id.trim().is_empty() => {
            let id = id.trim();
            BrowseCommand::Cashier((id != "-").then(|| id.to_string()))
        }
        _ => BrowseCommand::Search(line.to_string()),
    }
}

async fn show_list(dashboard: &Dashboard, session: &ReportSession, filter: &TransactionFilter) {
    let visible = dashboard.filter_transactions(session, filter).await;
    print_transactions(&visible, session.transactions().len());
}

/// Runs the browser until `quit` or end of input. Returns the filter that
/// was active at the end.
pub async fn run_with_input<R>(
    dashboard: &Dashboard,
    session: &ReportSession,
    input: R,
    search_delay: Duration,
    out_dir: &Path,
) -> Result<TransactionFilter>
where
    R: AsyncBufRead + Unpin,
{
    let (query_tx, query_rx) = mpsc::channel(16);
    let mut query_tx = Some(query_tx);
    let mut queries = debounce(query_rx, search_delay);
    let mut lines = input.lines();
    let mut filter = TransactionFilter::default();

    ui::print_notice(HELP);
    show_list(dashboard, session, &filter).await;

    loop {
        tokio::select! {
            line = lines.next_line(), if query_tx.is_some() => {
                let Some(line) = line? else {
                    // Dropping the sender flushes the last pending query.
                    query_tx = None;
                    continue;
                };
                match parse_command(&line) {
                    BrowseCommand::Search(query) => {
                        if let Some(tx) = &query_tx {
                            let _ = tx.send(query).await;
                        }
                    }
                    BrowseCommand::Open(id) => {
                        show_items(dashboard, &id).await;
                    }
                    BrowseCommand::Cashier(cashier) => {
                        filter.cashier = cashier;
                        show_list(dashboard, session, &filter).await;
                    }
                    BrowseCommand::Csv(id) => {
                        if let Err(e) = export_items(dashboard, &id, out_dir).await {
                            warn!(transaction = %id, error = %e, "Export failed");
                            ui::print_error(&format!("{e:#}"));
                        }
                    }
                    BrowseCommand::Quit => break,
                }
            }
            query = queries.recv() => {
                let Some(query) = query else { break };
                debug!(query = %query, "Applying search");
                filter.query = Some(query).filter(|q| !q.trim().is_empty());
                show_list(dashboard, session, &filter).await;
            }
        }
    }
    Ok(filter)
}

/// Interactive browser over stdin.
pub async fn run(config: &AppConfig, dashboard: &Dashboard, range: DateRange) -> Result<()> {
    let session = load_session(dashboard, range).await?;
    print_cashiers(&session);
    let delay = Duration::from_millis(config.report.search_debounce_ms);
    run_with_input(
        dashboard,
        &session,
        BufReader::new(tokio::io::stdin()),
        delay,
        &config.export_dir(),
    )
    .await?;
    Ok(())
}

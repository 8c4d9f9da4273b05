//! The `qtsync update` command: the once-daily run that records balances and
//! funding activity into the spreadsheet.
//!
//! The run is fully sequential. Row placement is append-only: the next row is one
//! past the number of dates already present in the anchor column. There is no
//! backfill and no gap handling; running twice in one day produces two rows.

use crate::api::{self, Broker, Mode, QuestradeClient, Sheet};
use crate::commands::Out;
use crate::credentials::TokenStore;
use crate::model::cell::{cell, column_left};
use crate::model::money::{parse_money_cell, percent_change};
use crate::model::{cad_equity, net_funding};
use crate::{Config, Result};
use anyhow::Context;
use chrono::{Datelike, Local, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

/// The spreadsheet column holding the date key for each row.
const ANCHOR_COLUMN: &str = "A";

/// What one update run recorded.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    /// The 1-based spreadsheet row that was written.
    pub row: usize,
    /// The date recorded in the anchor column.
    pub date: String,
    /// One entry per fetched account.
    pub entries: Vec<EquityEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EquityEntry {
    pub user: String,
    pub account: String,
    pub account_type: String,
    pub equity: Decimal,
    /// The day's net deposit or withdrawal, when deposit tracking is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding: Option<Decimal>,
}

/// Runs the daily update against the real Questrade API and the sheet selected by
/// `mode`.
pub async fn update(config: Config, mode: Mode) -> Result<Out<UpdateReport>> {
    let today = Local::now().date_naive();
    // The guard comes before any client construction so that a weekend run makes
    // zero network calls.
    if let Some(out) = weekend_guard(today) {
        return Ok(out);
    }
    let store = TokenStore::load(config.qt_auth_path()).await?;
    let mut broker = QuestradeClient::new(store)?;
    let mut sheet = api::sheet(&config, mode).await?;
    run_update(today, &config, &mut broker, sheet.as_mut()).await
}

/// The orchestrator, with the date and both collaborators injected.
pub(crate) async fn run_update(
    date: NaiveDate,
    config: &Config,
    broker: &mut dyn Broker,
    sheet: &mut dyn Sheet,
) -> Result<Out<UpdateReport>> {
    if let Some(out) = weekend_guard(date) {
        return Ok(out);
    }

    let row = sheet.read_column(ANCHOR_COLUMN).await?.len() + 1;
    let date_text = date.format("%Y-%m-%d").to_string();
    debug!("Recording {date_text} in row {row}");
    sheet.write_cell(&cell(ANCHOR_COLUMN, row), &date_text).await?;

    let mut entries = Vec::new();
    for user in config.users() {
        let session = broker.login(user).await?;
        let accounts = broker.accounts(&session).await?;
        for account in &accounts {
            let mapping = config.column_for(user, &account.account_type)?;
            let balances = broker.balances(&session, &account.number).await?;
            let equity = cad_equity(&balances).with_context(|| {
                format!(
                    "Account {} of user '{user}' has no CAD balance entry",
                    account.number
                )
            })?;
            sheet
                .write_cell(&cell(&mapping.equity, row), &equity.to_string())
                .await?;

            let funding = if config.track_deposits() {
                // Config validation guarantees a deposit column exists when deposit
                // tracking is on.
                let deposit_column = mapping.deposit.as_deref().with_context(|| {
                    format!(
                        "No deposit column for user '{user}' and account type '{}'",
                        account.account_type
                    )
                })?;
                let (start, end) = funding_window(date);
                let activities = broker
                    .activities(&session, &account.number, &start, &end)
                    .await?;
                let amount = net_funding(&activities);
                sheet
                    .write_cell(&cell(deposit_column, row), &amount.to_string())
                    .await?;
                Some(amount)
            } else {
                None
            };

            entries.push(EquityEntry {
                user: user.clone(),
                account: account.number.clone(),
                account_type: account.account_type.clone(),
                equity,
                funding,
            });
        }
    }

    if row > 1 {
        for percent_column in config.percent_columns() {
            let equity_column = column_left(percent_column)?;
            let old_text = sheet.read_cell(&cell(&equity_column, row - 1)).await?;
            let new_text = sheet.read_cell(&cell(&equity_column, row)).await?;
            let old = parse_money_cell(&old_text)
                .with_context(|| format!("Bad prior value in {}", cell(&equity_column, row - 1)))?;
            let new = parse_money_cell(&new_text)
                .with_context(|| format!("Bad current value in {}", cell(&equity_column, row)))?;
            let change = percent_change(old, new)
                .with_context(|| format!("Cannot compute the change for column {percent_column}"))?;
            sheet
                .write_cell(&cell(percent_column, row), &change.to_string())
                .await?;
        }
    } else if !config.percent_columns().is_empty() {
        debug!("First row, skipping percentage columns (no prior row to compare)");
    }

    let message = format!(
        "Recorded {} account(s) for {date_text} in row {row}",
        entries.len()
    );
    Ok(Out::new(
        message,
        UpdateReport {
            row,
            date: date_text,
            entries,
        },
    ))
}

/// Markets are closed on weekends; those runs record nothing.
fn weekend_guard(date: NaiveDate) -> Option<Out<UpdateReport>> {
    let weekday = date.weekday();
    if matches!(weekday, Weekday::Sat | Weekday::Sun) {
        Some(Out::new_message(format!(
            "{date} is a {weekday}, markets are closed, nothing to record"
        )))
    } else {
        None
    }
}

/// The activity query window for one day: midnight through 17:00 at a fixed
/// Eastern offset. Not DST aware, matching the window the sheet has always been
/// populated with.
fn funding_window(date: NaiveDate) -> (String, String) {
    let day = date.format("%Y-%m-%d");
    (
        format!("{day}T00:00:00-05:00"),
        format!("{day}T17:00:00-05:00"),
    )
}

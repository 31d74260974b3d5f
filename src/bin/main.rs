// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use kassa::money::parse_amount;
use kassa::{DateRange, Ledger, LedgerConfig, LedgerError, OrderNo, ParserConfig, Person};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use thiserror::Error;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Kassa - Replay a shop journal
///
/// Reads staff messages from a CSV journal, records them in a fresh ledger
/// and prints the resulting cash summary to stdout.
#[derive(Parser, Debug)]
#[command(name = "kassa")]
#[command(about = "Replays a CSV journal of staff messages into the ledger", long_about = None)]
struct Args {
    /// Path to CSV journal
    ///
    /// Expected format: kind,user_id,user_name,text
    /// Example: cargo run -- journal.csv > summary.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Allow sequential, non-atomic writes when atomic commits are unavailable
    #[arg(long, env = "KASSA_ALLOW_DEGRADED")]
    allow_degraded: bool,

    /// Run the store without atomic multi-record commits
    #[arg(long, env = "KASSA_NON_TRANSACTIONAL")]
    non_transactional: bool,

    /// Prefixed to 9-digit local phone numbers
    #[arg(long, env = "KASSA_COUNTRY_CODE", default_value = "998")]
    country_code: String,
}

impl Args {
    fn config(&self) -> LedgerConfig {
        LedgerConfig {
            transactional: !self.non_transactional,
            allow_degraded_writes: self.allow_degraded,
            parser: ParserConfig {
                country_code: self.country_code.clone(),
                ..ParserConfig::default()
            },
            ..LedgerConfig::default()
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "kassa=info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let ledger = match replay_journal(BufReader::new(file), args.config()) {
        Ok(ledger) => ledger,
        Err(e) => {
            eprintln!("Error reading journal: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_summary(&ledger, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// One journal row.
///
/// Fields: `kind, user_id, user_name, text`
#[derive(Debug, Deserialize)]
struct JournalRow {
    kind: String,
    user_id: i64,
    user_name: String,
    text: String,
}

/// Why a journal row was skipped.
#[derive(Error, Debug)]
enum RowError {
    #[error("unknown kind {0:?}")]
    UnknownKind(String),

    #[error("no amount found in {0:?}")]
    NoAmount(String),

    #[error("no sale with order number {0}")]
    UnknownOrder(String),

    #[error("sale {0} has no debt")]
    NoDebt(OrderNo),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl JournalRow {
    fn apply(&self, ledger: &Ledger) -> Result<(), RowError> {
        let person = Person::new(self.user_id, self.user_name.as_str());
        match self.kind.to_lowercase().as_str() {
            "sale" => {
                let parsed = ledger.parse_sale_message(&self.text).require_items()?;
                ledger.record_sale(&person, parsed.items, parsed.phone)?;
            }
            "expense" => {
                let parsed = ledger
                    .parse_expense_message(&self.text)
                    .ok_or_else(|| RowError::NoAmount(self.text.clone()))?;
                ledger.record_expense(&person, &parsed.title, parsed.amount)?;
            }
            "pay" => {
                let (order, amount) = self
                    .text
                    .trim()
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| RowError::NoAmount(self.text.clone()))?;
                let amount = parse_amount(amount)
                    .map(Decimal::from)
                    .ok_or_else(|| RowError::NoAmount(self.text.clone()))?;
                let sale = OrderNo::parse_loose(order)
                    .and_then(|order_no| ledger.sale_by_order(&order_no))
                    .ok_or_else(|| RowError::UnknownOrder(order.to_string()))?;
                let debt = ledger
                    .debt_for_sale(sale.id)
                    .ok_or(RowError::NoDebt(sale.order_no))?;
                ledger.pay_debt(debt.id, amount, &person)?;
            }
            other => return Err(RowError::UnknownKind(other.to_string())),
        }
        Ok(())
    }
}

/// Replays a CSV journal into a new ledger.
///
/// Rows are streamed; malformed rows and rows the ledger rejects are logged
/// and skipped.
///
/// # CSV Format
///
/// Expected columns: `kind, user_id, user_name, text`
/// - `kind`: `sale`, `expense` or `pay`
/// - `user_id`, `user_name`: staff member sending the message
/// - `text`: the message; for `pay`, `<order-no> <amount>`
///
/// # Example
///
/// ```csv
/// kind,user_id,user_name,text
/// sale,1,Ali,"Tort 140000 100000, Perog 2ta 12000"
/// expense,1,Ali,Taxi 15000
/// pay,2,Vali,0001 40000
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails.
pub fn replay_journal<R: Read>(reader: R, config: LedgerConfig) -> Result<Ledger, csv::Error> {
    let ledger = Ledger::with_config(config);

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(reader);

    for (line, result) in rdr.deserialize::<JournalRow>().enumerate() {
        // header is line 1
        let line = line + 2;
        match result {
            Ok(row) => {
                if let Err(e) = row.apply(&ledger) {
                    warn!(line, kind = %row.kind, error = %e, "skipping journal row");
                }
            }
            Err(e) => {
                if e.is_io_error() {
                    return Err(e);
                }
                warn!(line, error = %e, "skipping malformed row");
            }
        }
    }

    Ok(ledger)
}

/// Writes the all-time cash summary as CSV.
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_summary<W: Write>(ledger: &Ledger, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    wtr.serialize(ledger.summary(&DateRange::all(), None))?;
    wtr.flush()?;
    Ok(())
}

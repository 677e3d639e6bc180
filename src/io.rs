//! Helpers for reading session data from CSV and writing delimited text

use std::{
    fmt::Display,
    io::{self, Read},
};

use chrono::{DateTime, Utc};
use csv::{QuoteStyle, Terminator, Trim};
use rust_decimal::Decimal;
use tracing::info;

use crate::{
    errors::{Error, Result},
    session::{NewAccount, NewTransaction, Session},
    types::Money,
};

/// Record terminator used for every export
const ROW_TERMINATOR: u8 = b'\n';

/// A scalar value in an exported table
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Free text, written as is
    Text(String),
    /// A plain decimal number
    Number(Decimal),
    /// A whole number
    Integer(i64),
    /// A currency amount, written pre-formatted: `$1,234.56`
    Money(Money),
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Text(text) => f.write_str(text),
            Cell::Number(number) => write!(f, "{number}"),
            Cell::Integer(number) => write!(f, "{number}"),
            Cell::Money(money) => write!(f, "{money}"),
        }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::Text(text.to_string())
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Cell::Text(text)
    }
}

impl From<Decimal> for Cell {
    fn from(number: Decimal) -> Self {
        Cell::Number(number)
    }
}

impl From<i64> for Cell {
    fn from(number: i64) -> Self {
        Cell::Integer(number)
    }
}

impl From<u32> for Cell {
    fn from(number: u32) -> Self {
        Cell::Integer(i64::from(number))
    }
}

impl From<Money> for Cell {
    fn from(money: Money) -> Self {
        Cell::Money(money)
    }
}

/// Serializes rows of cells into delimited text.
///
/// Any cell containing the delimiter, a double quote or a newline is quoted, and
/// quotes inside it are doubled. Rows end with `\n`. Rows may have differing
/// lengths; a row with no cells at all is not representable and reads back as absent.
pub fn to_delimited_text(rows: &[Vec<Cell>], delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true)
        .terminator(Terminator::Any(ROW_TERMINATOR))
        .flexible(true)
        .from_writer(vec![]);
    for row in rows {
        writer.write_record(row.iter().map(ToString::to_string))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| Error::Io(err.into_error()))?;
    String::from_utf8(bytes).map_err(|err| Error::Io(io::Error::new(io::ErrorKind::InvalidData, err)))
}

/// Parses delimited text written by [`to_delimited_text`] back into rows of strings.
///
/// A trailing newline is accepted.
pub fn parse_delimited(text: &str, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .terminator(Terminator::Any(ROW_TERMINATOR))
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut rows = vec![];
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Builds a CSV reader tolerant of padded columns and short rows
fn lenient_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader)
}

/// Loads accounts from a CSV-formatted stream into the session.
///
/// Every row goes through the same validation as the add-account form.
/// Returns the number of accounts added.
///
/// Expects input data in this format (including header):
/// ```csv
/// id,             name,                    institution, balance,  kind,     mask, last_sync
/// chase-checking, Chase Total Checking,    chase,       14247.83, checking, 4829,
/// bofa-savings,   Bank of America Savings, bofa,        10599.99, savings,  7392, 2025-08-17T09:00:00Z
/// ```
pub fn load_accounts_from_csv<R: Read>(
    reader: R,
    session: &mut Session,
    now: DateTime<Utc>,
) -> Result<usize> {
    let mut csv_reader = lenient_reader(reader);
    let mut added = 0;
    for record in csv_reader.deserialize() {
        let form: NewAccount = record?;
        session.add_account(form, now)?;
        added += 1;
    }
    info!(accounts = added, "loaded accounts from CSV");
    Ok(added)
}

/// Loads transactions from a CSV-formatted stream into the session.
///
/// Accounts must be loaded first; each row is validated like the
/// add-transaction form. Returns the number of transactions added.
///
/// Expects input data in this format (including header):
/// ```csv
/// id, account,        merchant,        amount,  category,      date,       confidence
/// 1,  chase-checking, Starbucks #1247, -6.47,   Food & Dining, 2025-08-17, 97
/// 2,  chase-checking, Payroll,         3247.85, Income,        2025-08-15,
/// ```
pub fn load_transactions_from_csv<R: Read>(reader: R, session: &mut Session) -> Result<usize> {
    let mut csv_reader = lenient_reader(reader);
    let mut added = 0;
    for record in csv_reader.deserialize() {
        let form: NewTransaction = record?;
        session.add_transaction(form)?;
        added += 1;
    }
    info!(transactions = added, "loaded transactions from CSV");
    Ok(added)
}

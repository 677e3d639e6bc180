//! Named export artifacts built from a session

use std::{
    fmt::Display,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use chrono::{Datelike, NaiveDate};
use tracing::info;

use crate::{
    errors::{Error, Result},
    io::{to_delimited_text, Cell},
    reports::{budget_vs_actual, spending_by_category, tax_summary},
    session::Session,
    types::{AccountBook, Month},
};

/// Default file name prefix for exports
pub const DEFAULT_PREFIX: &str = "payday";

const CSV_DELIMITER: u8 = b',';

/// The exports a session can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Running balance up to the next payday
    Cashflow,
    /// Posted transactions, newest first
    Transactions,
    /// Budget vs actual for the current month
    Budget,
    /// Plain-text summary written in the assistant's voice
    AiReport,
    /// Income and deductible expenses for the current year
    TaxSummary,
}

impl ExportKind {
    /// Every export kind
    pub const ALL: [ExportKind; 5] = [
        ExportKind::Cashflow,
        ExportKind::Transactions,
        ExportKind::Budget,
        ExportKind::AiReport,
        ExportKind::TaxSummary,
    ];

    /// Name used on the command line and in file names
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            ExportKind::Cashflow => "cashflow",
            ExportKind::Transactions => "transactions",
            ExportKind::Budget => "budget",
            ExportKind::AiReport => "ai-report",
            ExportKind::TaxSummary => "tax-summary",
        }
    }

    /// File extension, without the dot
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            ExportKind::AiReport => "txt",
            _ => "csv",
        }
    }

    /// MIME type of the body
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            ExportKind::AiReport => "text/plain",
            _ => "text/csv",
        }
    }

    /// `<prefix>-<kind>-<YYYY-MM-DD>.<ext>`
    #[must_use]
    pub fn file_name(self, prefix: &str, today: NaiveDate) -> String {
        format!(
            "{prefix}-{}-{}.{}",
            self.slug(),
            today.format("%Y-%m-%d"),
            self.extension()
        )
    }
}

impl Display for ExportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ExportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExportKind::ALL
            .into_iter()
            .find(|kind| kind.slug().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::validation(format!("export kind '{s}'")))
    }
}

/// A finished export, ready to be written or handed to a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    file_name: String,
    content_type: &'static str,
    body: String,
}

impl ExportFile {
    /// Suggested file name
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// MIME type of the body
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// File contents
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Writes the export into `dir`, creating it if needed, and returns the full path
    /// # Errors
    /// [`Error::Io`] if the directory or file could not be written
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.body)?;
        info!(path = %path.display(), bytes = self.body.len(), "wrote export");
        Ok(path)
    }
}

/// Builds the `kind` export of `session` as of `today`.
/// # Errors
/// [`Error::Csv`] if a table could not be serialized
pub fn export(
    kind: ExportKind,
    session: &Session,
    today: NaiveDate,
    prefix: &str,
) -> Result<ExportFile> {
    let body = match kind {
        ExportKind::Cashflow => to_delimited_text(&cashflow_rows(session, today), CSV_DELIMITER)?,
        ExportKind::Transactions => to_delimited_text(&transaction_rows(session), CSV_DELIMITER)?,
        ExportKind::Budget => to_delimited_text(&budget_rows(session, today), CSV_DELIMITER)?,
        ExportKind::TaxSummary => to_delimited_text(&tax_rows(session, today), CSV_DELIMITER)?,
        ExportKind::AiReport => ai_report(session, today),
    };
    Ok(ExportFile {
        file_name: kind.file_name(prefix, today),
        content_type: kind.content_type(),
        body,
    })
}

fn header(labels: &[&str]) -> Vec<Cell> {
    labels.iter().copied().map(Cell::from).collect()
}

fn cashflow_rows(session: &Session, today: NaiveDate) -> Vec<Vec<Cell>> {
    let projection = session.projection();
    let mut rows = vec![header(&["Date", "Description", "Amount", "Balance", "Payday"])];
    rows.extend(projection.rows_to_payday().iter().map(|row| {
        vec![
            Cell::from(row.date(today).to_string()),
            Cell::from(row.description()),
            Cell::from(row.amount()),
            Cell::from(row.balance()),
            Cell::from(if row.is_payday() { "Yes" } else { "" }),
        ]
    }));
    rows
}

fn transaction_rows(session: &Session) -> Vec<Vec<Cell>> {
    let mut rows = vec![header(&[
        "Date",
        "Merchant",
        "Category",
        "Amount",
        "Account",
        "Confidence",
    ])];
    rows.extend(session.recent_transactions().into_iter().map(|t| {
        let account = session
            .accounts()
            .account(t.account_id())
            .map_or_else(|| t.account_id().to_string(), |a| a.short_label());
        vec![
            Cell::from(t.date().to_string()),
            Cell::from(t.merchant()),
            Cell::from(t.category().label()),
            Cell::from(t.amount()),
            Cell::from(account),
            Cell::from(t.confidence().map(|c| c.to_string()).unwrap_or_default()),
        ]
    }));
    rows
}

fn budget_rows(session: &Session, today: NaiveDate) -> Vec<Vec<Cell>> {
    let report = budget_vs_actual(session.budgets(), session.transactions(), Month::of(today));
    let mut rows = vec![header(&["Category", "Budgeted", "Actual", "Remaining", "Status"])];
    rows.extend(report.lines.iter().map(|line| {
        vec![
            Cell::from(line.category.label()),
            Cell::from(line.budgeted),
            Cell::from(line.actual),
            Cell::from(line.remaining()),
            Cell::from(if line.is_over() { "Over" } else { "OK" }),
        ]
    }));
    rows.push(vec![
        Cell::from("Total"),
        Cell::from(report.total_budgeted),
        Cell::from(report.total_actual),
        Cell::from(report.total_budgeted - report.total_actual),
        Cell::from(""),
    ]);
    rows
}

fn tax_rows(session: &Session, today: NaiveDate) -> Vec<Vec<Cell>> {
    let summary = tax_summary(session.transactions(), today.year());
    let mut rows = vec![header(&["Type", "Date", "Description", "Category", "Amount"])];
    rows.extend(summary.entries.iter().map(|entry| {
        vec![
            Cell::from(entry.kind.label()),
            Cell::from(entry.date.to_string()),
            Cell::from(entry.description.as_str()),
            Cell::from(entry.category.label()),
            Cell::from(entry.amount),
        ]
    }));
    rows.push(vec![
        Cell::from("Total Income"),
        Cell::from(""),
        Cell::from(""),
        Cell::from(""),
        Cell::from(summary.total_income),
    ]);
    rows.push(vec![
        Cell::from("Total Deductions"),
        Cell::from(""),
        Cell::from(""),
        Cell::from(""),
        Cell::from(summary.total_deductions),
    ]);
    rows
}

/// Plain-text report covering totals, the payday outlook and where the money went
#[must_use]
pub fn ai_report(session: &Session, today: NaiveDate) -> String {
    let month = Month::of(today);
    let totals = session.totals(month);
    let projection = session.projection();
    let mut lines = vec![
        format!("AI Financial Report for {today}"),
        String::new(),
        format!("Total balance:     {}", totals.total_balance()),
        format!("Income:            {}", totals.monthly_income()),
        format!("Spending ({month}): {}", totals.monthly_spending()),
        match totals.savings_rate_percent() {
            Ok(rate) => format!("Savings rate:      {rate}%"),
            Err(_) => "Savings rate:      n/a (no income)".to_string(),
        },
        String::new(),
        match projection.next_payday() {
            Ok(payday) => format!(
                "Next payday in {} days ({}): balance {} before, {} after.",
                payday.offset_days(),
                payday.date(today),
                projection.balance_before_payday().unwrap_or_default(),
                payday.balance()
            ),
            Err(_) => "No upcoming income predicted.".to_string(),
        },
    ];
    let spend = spending_by_category(session.transactions(), month);
    if !spend.is_empty() {
        lines.push(String::new());
        lines.push("Top spending categories:".to_string());
        lines.extend(spend.iter().take(3).map(|item| {
            format!(
                "  {:<16} {} ({} transactions)",
                item.category.label(),
                item.total,
                item.count
            )
        }));
    }
    let over = budget_vs_actual(session.budgets(), session.transactions(), month)
        .lines
        .into_iter()
        .filter(|line| line.is_over())
        .map(|line| format!("  {} over by {}", line.category, -line.remaining()))
        .collect::<Vec<_>>();
    if !over.is_empty() {
        lines.push(String::new());
        lines.push("Budget alerts:".to_string());
        lines.extend(over);
    }
    let mut report = lines.join("\n");
    report.push('\n');
    report
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    use crate::{
        io::parse_delimited,
        session::{NewAccount, NewTransaction},
        types::{Budget, Category, PredictedTransaction},
    };

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 17).unwrap()
    }

    fn session() -> Session {
        let mut session = Session::new();
        let now = Utc.with_ymd_and_hms(2025, 8, 17, 12, 0, 0).unwrap();
        session
            .add_account(
                NewAccount {
                    id: Some("chase-checking".to_string()),
                    name: Some("Chase Total Checking".to_string()),
                    institution: Some("chase".to_string()),
                    balance: Some("24847.82".to_string()),
                    kind: Some("checking".to_string()),
                    mask: Some("4829".to_string()),
                    last_sync: None,
                },
                now,
            )
            .unwrap();
        let txn = |id: u32, merchant: &str, amount: &str, category: &str, day: u32| NewTransaction {
            id: Some(id),
            account: Some("chase-checking".to_string()),
            merchant: Some(merchant.to_string()),
            amount: Some(amount.to_string()),
            category: Some(category.to_string()),
            date: NaiveDate::from_ymd_opt(2025, 8, day),
            confidence: Some(97),
        };
        session
            .add_transaction(txn(1, "Smith, J.", "-120.00", "Groceries", 16))
            .unwrap();
        session
            .add_transaction(txn(2, "Payroll", "3247.85", "Income", 15))
            .unwrap();
        session
            .add_transaction(txn(3, "Rent", "-1850.00", "Housing", 1))
            .unwrap();
        session.add_prediction(PredictedTransaction::new(1, "Coffee", dec!(-6.50), 1));
        session.add_prediction(
            PredictedTransaction::new(2, "PAYDAY - Direct Deposit", dec!(3247.85), 12).income(),
        );
        session.add_prediction(PredictedTransaction::new(3, "After payday", dec!(-10), 20));
        session.set_budget(Budget::new(Category::Groceries, dec!(100)));
        session
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            ExportKind::Cashflow.file_name("payday", today()),
            "payday-cashflow-2025-08-17.csv"
        );
        assert_eq!(
            ExportKind::AiReport.file_name("steve", today()),
            "steve-ai-report-2025-08-17.txt"
        );
        assert_eq!("Tax-Summary".parse::<ExportKind>().unwrap(), ExportKind::TaxSummary);
        assert!("pdf".parse::<ExportKind>().is_err());
    }

    #[test]
    fn test_cashflow_export_stops_at_payday() {
        let file = export(ExportKind::Cashflow, &session(), today(), DEFAULT_PREFIX).unwrap();
        assert_eq!(file.content_type(), "text/csv");
        let rows = parse_delimited(file.body(), b',').unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], ["2025-08-17", "Current Total Balance", "$24,847.82", "$24,847.82", ""]);
        assert_eq!(rows[3][0], "2025-08-29");
        assert_eq!(rows[3][3], "$28,089.17");
        assert_eq!(rows[3][4], "Yes");
    }

    #[test]
    fn test_transactions_export_quotes_commas() {
        let file = export(ExportKind::Transactions, &session(), today(), DEFAULT_PREFIX).unwrap();
        let rows = parse_delimited(file.body(), b',').unwrap();
        assert!(rows.iter().all(|row| row.len() == 6));
        assert_eq!(rows[1][1], "Smith, J.");
        assert_eq!(rows[1][4], "Chase ••4829");
        assert_eq!(rows[1][5], "97%");
    }

    #[test]
    fn test_budget_and_tax_exports() {
        let session = session();
        let budget = export(ExportKind::Budget, &session, today(), DEFAULT_PREFIX).unwrap();
        let rows = parse_delimited(budget.body(), b',').unwrap();
        let groceries = rows.iter().find(|row| row[0] == "Groceries").unwrap();
        assert_eq!(groceries[3], "-$20.00");
        assert_eq!(groceries[4], "Over");
        let tax = export(ExportKind::TaxSummary, &session, today(), DEFAULT_PREFIX).unwrap();
        let rows = parse_delimited(tax.body(), b',').unwrap();
        assert_eq!(rows.last().unwrap()[4], "$1,850.00");
    }

    #[test]
    fn test_ai_report_text() {
        let file = export(ExportKind::AiReport, &session(), today(), DEFAULT_PREFIX).unwrap();
        assert_eq!(file.content_type(), "text/plain");
        let body = file.body();
        assert!(body.contains("Total balance:     $24,847.82"));
        assert!(body.contains("Next payday in 12 days (2025-08-29)"));
        assert!(body.contains("Groceries over by $20.00"));
        assert!(body.starts_with("AI Financial Report for 2025-08-17\n\nTotal balance:"));
        assert!(body.contains("\n\nBudget alerts:\n  Groceries over by $20.00\n"));
        assert!(body.ends_with('\n') && !body.ends_with("\n\n"));
    }

    #[test]
    fn test_write_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = export(ExportKind::Budget, &session(), today(), "test").unwrap();
        let path = file.write_to(&dir.path().join("exports")).unwrap();
        assert_eq!(path.file_name().unwrap(), "test-budget-2025-08-17.csv");
        assert_eq!(fs::read_to_string(path).unwrap(), file.body());
    }
}

use std::{fs::File, io::BufReader, path::PathBuf};

use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use comfy_table::{Cell, CellAlignment, Table};
use rand::{rngs::StdRng, SeedableRng};

use payday::{
    assistant::{Assistant, GREETING},
    backend::{BackendClient, HttpTransport, LinkFlow},
    demo,
    errors::{Error, Result},
    export::{self, ExportKind},
    io,
    reports::budget_vs_actual,
    session::Session,
    settings::{load_settings, save_settings, settings_path, Settings},
    types::{AccountBook, Money, Month},
};

#[derive(Parser)]
#[command(
    name = "payday",
    version,
    about = "Cash-flow dashboard: balances, spending and the road to your next payday."
)]
pub struct Cli {
    #[command(flatten)]
    pub source: Source,
    #[command(subcommand)]
    pub command: Commands,
}

/// Where the session comes from and which day it is
#[derive(Args)]
pub struct Source {
    /// Treat this date as today (default: the local date)
    #[arg(long, global = true, value_name = "YYYY-MM-DD")]
    today: Option<NaiveDate>,
    /// Month used for spending totals (default: the month of today)
    #[arg(long, global = true, value_name = "YYYY-MM")]
    month: Option<Month>,
    /// Load accounts from CSV instead of the demo data
    #[arg(long, global = true, value_name = "CSV")]
    accounts: Option<PathBuf>,
    /// Load transactions from CSV; needs --accounts
    #[arg(long, global = true, value_name = "CSV", requires = "accounts")]
    transactions: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show balance, income, spending and savings rate.
    Summary,
    /// List accounts.
    Accounts,
    /// List transactions, newest first.
    Transactions {
        /// Show at most this many
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the running balance up to the next payday.
    Forecast {
        /// Keep going past the first payday
        #[arg(long)]
        all: bool,
    },
    /// Compare this month's spending with the budgets.
    Budget,
    /// Write an export file (all of them when no kind is given).
    Export {
        /// cashflow, transactions, budget, ai-report or tax-summary
        kind: Option<ExportKind>,
        /// Directory to write into (default: export_dir from settings)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Ask the assistant a question.
    Ask {
        /// The question
        #[arg(required = true)]
        question: Vec<String>,
        /// Seed the responder for repeatable answers
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Check that the bank backend is up.
    Health,
    /// Link a bank through the backend, then fetch its accounts.
    Link {
        /// Public token handed back by the link widget
        #[arg(long)]
        public_token: Option<String>,
    },
    /// Fetch linked accounts from the backend.
    Sync,
    /// Show or change settings.
    Config {
        /// Name the assistant greets
        #[arg(long)]
        user_name: Option<String>,
        /// Id used with the bank backend
        #[arg(long)]
        user_id: Option<String>,
        /// Directory exports are written into
        #[arg(long)]
        export_dir: Option<String>,
        /// Prefix for export file names
        #[arg(long)]
        export_prefix: Option<String>,
    },
}

/// Everything a command needs
pub struct Context {
    session: Session,
    today: NaiveDate,
    month: Month,
    settings: Settings,
}

impl Source {
    pub fn load(&self) -> Result<Context> {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        let session = match &self.accounts {
            Some(path) => {
                let mut session = Session::new();
                let now = Utc::now();
                io::load_accounts_from_csv(BufReader::new(File::open(path)?), &mut session, now)?;
                if let Some(path) = &self.transactions {
                    io::load_transactions_from_csv(BufReader::new(File::open(path)?), &mut session)?;
                }
                session
            }
            None => demo::session(today)?,
        };
        Ok(Context {
            session,
            today,
            month: self.month.unwrap_or_else(|| Month::of(today)),
            settings: load_settings(),
        })
    }
}

fn money_cell(money: Money) -> Cell {
    Cell::new(money).set_alignment(CellAlignment::Right)
}

pub fn summary(ctx: &Context) -> Result<()> {
    let totals = ctx.session.totals(ctx.month);
    let rate = match totals.savings_rate_percent() {
        Ok(rate) => format!("{rate}%"),
        Err(Error::UndefinedRate) => "n/a".to_string(),
        Err(err) => return Err(err),
    };
    let mut table = Table::new();
    table.set_header(vec!["", "Amount"]);
    table.add_row(vec![Cell::new("Total Balance"), money_cell(totals.total_balance())]);
    table.add_row(vec![Cell::new("Income"), money_cell(totals.monthly_income())]);
    table.add_row(vec![
        Cell::new(format!("Spending ({})", totals.month())),
        money_cell(totals.monthly_spending()),
    ]);
    table.add_row(vec![Cell::new("Net Cash Flow"), money_cell(totals.net_cash_flow())]);
    table.add_row(vec![
        Cell::new("Savings Rate"),
        Cell::new(rate).set_alignment(CellAlignment::Right),
    ]);
    println!("Summary as of {}\n{table}", ctx.today);
    print_payday_outlook(ctx);
    Ok(())
}

fn print_payday_outlook(ctx: &Context) {
    let projection = ctx.session.projection();
    match (
        projection.days_to_payday(),
        projection.balance_before_payday(),
        projection.balance_after_payday(),
    ) {
        (Ok(days), Ok(before), Ok(after)) => {
            println!("Next payday in {days} days: {before} before, {after} after.");
        }
        _ => println!("No upcoming income predicted."),
    }
}

pub fn accounts(ctx: &Context) -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Institution", "Type", "Number", "Balance", "Last Sync"]);
    for account in ctx.session.accounts() {
        table.add_row(vec![
            Cell::new(account.id()),
            Cell::new(account.name()),
            Cell::new(account.institution()),
            Cell::new(account.kind()),
            Cell::new(format!("••{}", account.mask())),
            money_cell(account.balance()),
            Cell::new(account.last_sync().format("%Y-%m-%d %H:%M")),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}

pub fn transactions(ctx: &Context, limit: Option<usize>) -> Result<()> {
    let recent = ctx.session.recent_transactions();
    let shown = limit.unwrap_or(recent.len());
    let mut table = Table::new();
    table.set_header(vec!["Date", "Merchant", "Category", "Amount", "Account", "Confidence"]);
    for transaction in recent.into_iter().take(shown) {
        let account = ctx
            .session
            .accounts()
            .account(transaction.account_id())
            .map_or_else(|| transaction.account_id().to_string(), |a| a.short_label());
        table.add_row(vec![
            Cell::new(transaction.date()),
            Cell::new(transaction.merchant()),
            Cell::new(transaction.category()),
            money_cell(transaction.amount()),
            Cell::new(account),
            Cell::new(
                transaction
                    .confidence()
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
            ),
        ]);
    }
    println!("Transactions\n{table}");
    Ok(())
}

pub fn forecast(ctx: &Context, all: bool) -> Result<()> {
    let projection = ctx.session.projection();
    let rows = if all {
        projection.rows()
    } else {
        projection.rows_to_payday()
    };
    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Amount", "Balance", "Confidence", ""]);
    for row in rows {
        table.add_row(vec![
            Cell::new(row.date(ctx.today)),
            Cell::new(row.description()),
            if row.is_opening() {
                Cell::new("")
            } else {
                money_cell(row.amount())
            },
            money_cell(row.balance()),
            Cell::new(row.confidence().map(|c| c.to_string()).unwrap_or_default()),
            Cell::new(if row.is_payday() { "PAYDAY" } else { "" }),
        ]);
    }
    println!("Cash Flow to Next Payday\n{table}");
    print_payday_outlook(ctx);
    Ok(())
}

pub fn budget(ctx: &Context) -> Result<()> {
    let report = budget_vs_actual(ctx.session.budgets(), ctx.session.transactions(), ctx.month);
    let mut table = Table::new();
    table.set_header(vec!["Category", "Budgeted", "Actual", "Remaining", ""]);
    for line in &report.lines {
        table.add_row(vec![
            Cell::new(line.category),
            money_cell(line.budgeted),
            money_cell(line.actual),
            money_cell(line.remaining()),
            Cell::new(if line.is_over() { "OVER" } else { "" }),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total"),
        money_cell(report.total_budgeted),
        money_cell(report.total_actual),
        money_cell(report.total_budgeted - report.total_actual),
        Cell::new(""),
    ]);
    println!("Budget for {}\n{table}", report.month);
    Ok(())
}

pub fn export(ctx: &Context, kind: Option<ExportKind>, output: Option<PathBuf>) -> Result<()> {
    let dir = output.unwrap_or_else(|| PathBuf::from(&ctx.settings.export_dir));
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => ExportKind::ALL.to_vec(),
    };
    for kind in kinds {
        let file = export::export(kind, &ctx.session, ctx.today, &ctx.settings.export_prefix)?;
        let path = file.write_to(&dir)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

pub fn ask(ctx: &Context, question: &[String], seed: Option<u64>) -> Result<()> {
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut assistant = if ctx.settings.user_name.is_empty() {
        Assistant::new(rng)
    } else {
        let greeting = GREETING.replacen("Hi!", &format!("Hi {}!", ctx.settings.user_name), 1);
        Assistant::with_greeting(rng, greeting)
    };
    if assistant.ask(&question.join(" ")).is_none() {
        return Err(Error::Validation("question: required".to_string()));
    }
    for message in assistant.transcript() {
        println!("{}: {}\n", message.speaker(), message.text());
    }
    Ok(())
}

fn backend(settings: &Settings) -> BackendClient<HttpTransport> {
    BackendClient::new(&settings.api_base_url, HttpTransport::default())
}

/// Prints a backend failure and carries on with the session already loaded
fn keep_session(result: Result<()>, ctx: &Context) -> Result<()> {
    match result {
        Err(err @ Error::Network { .. }) => {
            eprintln!("{err}\nShowing demo data instead.");
            accounts(ctx)
        }
        other => other,
    }
}

pub fn health() -> Result<()> {
    let settings = load_settings();
    let mut client = backend(&settings);
    let status = client.health()?;
    println!("Backend {}: {status}", client.base_url());
    Ok(())
}

pub fn link(ctx: &mut Context, public_token: Option<String>) -> Result<()> {
    let mut client = backend(&ctx.settings);
    let mut flow = LinkFlow::new(&ctx.settings.user_id);
    let result = flow.start(&mut client).and_then(|link_token| match public_token {
        None => {
            println!("Link token: {link_token}");
            println!("Open the link widget with it, then run `payday link --public-token <token>`.");
            Ok(())
        }
        Some(public_token) => {
            flow.complete(&mut client, &public_token)?;
            let count = flow.sync(&mut client, &mut ctx.session, Utc::now())?;
            println!("Linked {count} accounts.");
            accounts(ctx)
        }
    });
    keep_session(result, ctx)
}

pub fn sync(ctx: &mut Context) -> Result<()> {
    let mut client = backend(&ctx.settings);
    let result = client
        .accounts(&ctx.settings.user_id, Utc::now())
        .and_then(|linked| {
            println!("Fetched {} accounts from {}.", linked.len(), client.base_url());
            ctx.session.replace_accounts(linked);
            accounts(ctx)
        });
    keep_session(result, ctx)
}

pub fn config(
    user_name: Option<String>,
    user_id: Option<String>,
    export_dir: Option<String>,
    export_prefix: Option<String>,
) -> Result<()> {
    let mut settings = load_settings();
    let changed = user_name.is_some()
        || user_id.is_some()
        || export_dir.is_some()
        || export_prefix.is_some();
    if let Some(value) = user_name {
        settings.user_name = value;
    }
    if let Some(value) = user_id {
        settings.user_id = value;
    }
    if let Some(value) = export_dir {
        settings.export_dir = value;
    }
    if let Some(value) = export_prefix {
        settings.export_prefix = value;
    }
    if changed {
        save_settings(&settings)?;
        println!("Saved {}", settings_path().display());
    }
    let mut table = Table::new();
    table.set_header(vec!["Setting", "Value"]);
    table.add_row(vec!["user_name", settings.user_name.as_str()]);
    table.add_row(vec!["user_id", settings.user_id.as_str()]);
    table.add_row(vec!["api_base_url", settings.api_base_url.as_str()]);
    table.add_row(vec!["export_dir", settings.export_dir.as_str()]);
    table.add_row(vec!["export_prefix", settings.export_prefix.as_str()]);
    println!("{table}");
    Ok(())
}

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const TODAY: &str = "2025-08-17";

/// A `payday` command with an isolated home directory
fn payday(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("payday").unwrap();
    cmd.env("HOME", home.path())
        .env_remove("PAYDAY_API_BASE_URL")
        .env_remove("RUST_LOG")
        .args(["--today", TODAY]);
    cmd
}

#[test]
fn summary_shows_demo_totals() {
    let home = TempDir::new().unwrap();
    payday(&home)
        .arg("summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("$24,847.82"))
        .stdout(predicate::str::contains("Next payday in 12 days"));
}

#[test]
fn forecast_stops_at_payday() {
    let home = TempDir::new().unwrap();
    payday(&home)
        .arg("forecast")
        .assert()
        .success()
        .stdout(predicate::str::contains("PAYDAY - Direct Deposit"))
        .stdout(predicate::str::contains("$28,000.17"))
        .stdout(predicate::str::contains("2025-08-29"));
}

#[test]
fn export_writes_named_file() {
    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    payday(&home)
        .args(["export", "cashflow", "--output"])
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("payday-cashflow-2025-08-17.csv"));
    let body = std::fs::read_to_string(out.path().join("payday-cashflow-2025-08-17.csv")).unwrap();
    assert!(body.starts_with("Date,Description,Amount,Balance,Payday\n"));
    assert!(body.contains("Current Total Balance"));
}

#[test]
fn export_without_kind_writes_everything() {
    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    payday(&home)
        .arg("export")
        .arg("--output")
        .arg(out.path())
        .assert()
        .success();
    for name in [
        "payday-cashflow-2025-08-17.csv",
        "payday-transactions-2025-08-17.csv",
        "payday-budget-2025-08-17.csv",
        "payday-ai-report-2025-08-17.txt",
        "payday-tax-summary-2025-08-17.csv",
    ] {
        assert!(out.path().join(name).exists(), "missing {name}");
    }
}

#[test]
fn ask_prints_transcript() {
    let home = TempDir::new().unwrap();
    payday(&home)
        .args(["ask", "--seed", "3", "predict", "my", "cash", "flow"])
        .assert()
        .success()
        .stdout(predicate::str::contains("You: predict my cash flow"))
        .stdout(predicate::str::contains("AI: "));
}

#[test]
fn config_greets_by_name() {
    let home = TempDir::new().unwrap();
    payday(&home)
        .args(["config", "--user-name", "Steve"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved"));
    assert!(home.path().join(".config/payday/settings.json").exists());
    payday(&home)
        .args(["ask", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hi Steve!"));
}

#[test]
fn loads_accounts_from_csv() {
    let home = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    let accounts = data.path().join("accounts.csv");
    let transactions = data.path().join("transactions.csv");
    std::fs::write(
        &accounts,
        "id,name,balance,kind,mask\nmain,Main Checking,1000.00,checking,1234\n",
    )
    .unwrap();
    std::fs::write(
        &transactions,
        "id,account,merchant,amount,category,date\n1,main,\"Smith, J.\",-250.00,Other,2025-08-02\n2,main,Salary,1000.00,Income,2025-08-01\n",
    )
    .unwrap();
    payday(&home)
        .arg("--accounts")
        .arg(&accounts)
        .arg("--transactions")
        .arg(&transactions)
        .arg("summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("$1,000.00"))
        .stdout(predicate::str::contains("75.0%"))
        .stdout(predicate::str::contains("No upcoming income predicted."));
}

#[test]
fn missing_file_reports_error() {
    let home = TempDir::new().unwrap();
    payday(&home)
        .args(["--accounts", "/nonexistent/accounts.csv", "accounts"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("Error: IO error"));
}

/// Nothing listens on the discard port
const UNREACHABLE: &str = "http://127.0.0.1:9";

#[test]
fn sync_keeps_demo_data_when_backend_is_down() {
    let home = TempDir::new().unwrap();
    payday(&home)
        .env("PAYDAY_API_BASE_URL", UNREACHABLE)
        .arg("sync")
        .assert()
        .success()
        .stderr(predicate::str::contains("Network error"))
        .stderr(predicate::str::contains("Showing demo data instead."))
        .stdout(predicate::str::contains("Chase Total Checking"));
}

#[test]
fn link_keeps_demo_data_when_backend_is_down() {
    let home = TempDir::new().unwrap();
    payday(&home)
        .env("PAYDAY_API_BASE_URL", UNREACHABLE)
        .args(["link", "--public-token", "public-sandbox-1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Network error"))
        .stdout(predicate::str::contains("Bank of America Advantage"));
}

#[test]
fn health_fails_when_backend_is_down() {
    let home = TempDir::new().unwrap();
    payday(&home)
        .env("PAYDAY_API_BASE_URL", UNREACHABLE)
        .arg("health")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("Error: Network error"));
}

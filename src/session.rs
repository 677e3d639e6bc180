//! The in-memory session store and its add-account / add-transaction forms

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    errors::{Error, Result},
    ops::{aggregate, Totals},
    projection::{project, Projection},
    types::{
        Account, AccountBook, AccountKind, Budget, Category, Confidence, MemoryAccountBook,
        MemoryTransactionLog, Money, Month, PredictedTransaction, Transaction, TransactionLog,
    },
};

/// Institution tag for accounts entered by hand
pub const MANUAL_INSTITUTION: &str = "manual";

/// Returns the trimmed value of a required form field
fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::validation(format!("{field}: required")))
}

/// Returns the trimmed value of an optional form field, `None` when blank
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Raw add-account form input. Every field arrives optional and is checked by
/// [`NewAccount::validate`].
#[derive(Debug, Default, Clone, Deserialize)]
pub struct NewAccount {
    /// Unique account id
    pub id: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Institution tag; defaults to [`MANUAL_INSTITUTION`]
    pub institution: Option<String>,
    /// Current balance, plain (`1234.56`) or formatted (`$1,234.56`)
    pub balance: Option<String>,
    /// `checking`, `savings` or `credit`
    pub kind: Option<String>,
    /// Account number; only the last four digits are kept
    pub mask: Option<String>,
    /// Last refresh time; defaults to the validation time
    pub last_sync: Option<DateTime<Utc>>,
}

impl NewAccount {
    /// Checks the form and builds an [`Account`].
    /// # Errors
    /// [`Error::Validation`] naming the first missing or malformed field
    pub fn validate(self, now: DateTime<Utc>) -> Result<Account> {
        let id = required(self.id, "account id")?;
        let name = required(self.name, "account name")?;
        let balance: Money = required(self.balance, "balance")?.parse()?;
        let kind: AccountKind = required(self.kind, "account kind")?.parse()?;
        let mask = match optional(self.mask) {
            Some(number) if number.chars().all(|c| c.is_ascii_digit()) => {
                let skip = number.len().saturating_sub(4);
                number[skip..].to_string()
            }
            Some(number) => return Err(Error::validation(format!("account number '{number}'"))),
            None => String::new(),
        };
        Ok(Account {
            id: id.into(),
            name,
            institution: optional(self.institution)
                .unwrap_or_else(|| MANUAL_INSTITUTION.to_string()),
            balance,
            kind,
            mask,
            last_sync: self.last_sync.unwrap_or(now),
        })
    }
}

/// Raw add-transaction form input, checked by [`NewTransaction::validate`]
#[derive(Debug, Default, Clone, Deserialize)]
pub struct NewTransaction {
    /// Unique transaction id
    pub id: Option<u32>,
    /// Id of the account the transaction was posted to
    pub account: Option<String>,
    /// Merchant name or description
    pub merchant: Option<String>,
    /// Signed amount: negative for debits
    pub amount: Option<String>,
    /// Category label; defaults to Income for credits and Other for debits
    pub category: Option<String>,
    /// Occurrence date, `YYYY-MM-DD`
    pub date: Option<NaiveDate>,
    /// Advisory confidence, 0-100
    pub confidence: Option<u8>,
}

impl NewTransaction {
    /// Checks the form and builds a [`Transaction`].
    /// # Errors
    /// [`Error::Validation`] naming the first missing or malformed field
    pub fn validate(self) -> Result<Transaction> {
        let id = self
            .id
            .ok_or_else(|| Error::validation("transaction id: required"))?;
        let account_id = required(self.account, "account")?;
        let merchant = required(self.merchant, "merchant")?;
        let amount: Money = required(self.amount, "amount")?.parse()?;
        let date = self
            .date
            .ok_or_else(|| Error::validation("date: required"))?;
        let category = match optional(self.category) {
            Some(label) => label.parse()?,
            None if amount.is_positive() => Category::Income,
            None => Category::Other,
        };
        let confidence = self.confidence.map(Confidence::try_from).transpose()?;
        Ok(Transaction {
            id: id.into(),
            account_id: account_id.into(),
            merchant,
            amount,
            category,
            date,
            confidence,
        })
    }
}

/// Owns every record the dashboard works with.
///
/// # Limitations
/// No persistence and a single writer. Lives for one process run.
#[derive(Debug, Default)]
pub struct Session {
    accounts: MemoryAccountBook,
    transactions: MemoryTransactionLog,
    predictions: Vec<PredictedTransaction>,
    budgets: Vec<Budget>,
}

impl Session {
    /// Creates an empty session
    #[must_use]
    pub fn new() -> Self {
        Session::default()
    }

    /// All accounts, ordered by id
    #[must_use]
    pub fn accounts(&self) -> &MemoryAccountBook {
        &self.accounts
    }

    /// All posted transactions, ordered by id
    #[must_use]
    pub fn transactions(&self) -> &MemoryTransactionLog {
        &self.transactions
    }

    /// Posted transactions, most recent first
    #[must_use]
    pub fn recent_transactions(&self) -> Vec<&Transaction> {
        let mut recent: Vec<&Transaction> = (&self.transactions).into_iter().collect();
        recent.sort_by(|a, b| b.date().cmp(&a.date()).then(b.id().cmp(&a.id())));
        recent
    }

    /// Predicted future transactions, in load order
    #[must_use]
    pub fn predictions(&self) -> &[PredictedTransaction] {
        &self.predictions
    }

    /// Monthly budgets
    #[must_use]
    pub fn budgets(&self) -> &[Budget] {
        &self.budgets
    }

    /// Validates and adds an account.
    /// # Errors
    /// [`Error::Validation`] for bad form input, [`Error::DuplicateAccount`] for a reused id
    pub fn add_account(&mut self, form: NewAccount, now: DateTime<Utc>) -> Result<&Account> {
        let account = form.validate(now)?;
        let id = account.id().clone();
        self.accounts.insert(account)?;
        debug!(account = %id, "added account");
        self.accounts
            .account(&id)
            .ok_or_else(|| Error::validation(format!("account {id}")))
    }

    /// Validates and adds a transaction against an existing account.
    /// # Errors
    /// [`Error::Validation`] for bad form input or an unknown account,
    /// [`Error::DuplicateTransaction`] for a reused id
    pub fn add_transaction(&mut self, form: NewTransaction) -> Result<&Transaction> {
        let transaction = form.validate()?;
        if self.accounts.account(transaction.account_id()).is_none() {
            return Err(Error::validation(format!(
                "account '{}': no such account",
                transaction.account_id()
            )));
        }
        let id = transaction.id();
        self.transactions.register(transaction)?;
        debug!(transaction = %id, "added transaction");
        self.transactions
            .transaction(id)
            .ok_or_else(|| Error::validation(format!("transaction {id}")))
    }

    /// Adds a predicted transaction for the projector
    pub fn add_prediction(&mut self, prediction: PredictedTransaction) {
        self.predictions.push(prediction);
    }

    /// Sets the monthly limit for a category, replacing any earlier limit
    pub fn set_budget(&mut self, budget: Budget) {
        match self
            .budgets
            .iter_mut()
            .find(|existing| existing.category() == budget.category())
        {
            Some(existing) => *existing = budget,
            None => self.budgets.push(budget),
        }
    }

    /// Replaces every account with a freshly synced set. Transactions are kept.
    pub fn replace_accounts(&mut self, accounts: Vec<Account>) {
        info!(accounts = accounts.len(), "replacing session accounts");
        self.accounts.replace_all(accounts);
    }

    /// Recomputes the dashboard totals for `month`
    #[must_use]
    pub fn totals(&self, month: Month) -> Totals {
        aggregate(&self.accounts, &self.transactions, month)
    }

    /// Projects the current total balance through the predicted transactions
    #[must_use]
    pub fn projection(&self) -> Projection {
        let starting_balance: Money = (&self.accounts).into_iter().map(Account::balance).sum();
        project(starting_balance, &self.predictions)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 17, 12, 0, 0).unwrap()
    }

    fn checking_form() -> NewAccount {
        NewAccount {
            id: Some("chase-checking".to_string()),
            name: Some("Chase Total Checking".to_string()),
            institution: Some("chase".to_string()),
            balance: Some("$14,247.83".to_string()),
            kind: Some("checking".to_string()),
            mask: Some("000011114829".to_string()),
            last_sync: None,
        }
    }

    fn coffee_form(id: u32) -> NewTransaction {
        NewTransaction {
            id: Some(id),
            account: Some("chase-checking".to_string()),
            merchant: Some("Starbucks #1247".to_string()),
            amount: Some("-6.47".to_string()),
            category: Some("Food & Dining".to_string()),
            date: NaiveDate::from_ymd_opt(2025, 8, 17),
            confidence: Some(97),
        }
    }

    #[test]
    fn test_account_form_validates() {
        let account = checking_form().validate(now()).unwrap();
        assert_eq!(account.balance(), Money::from(dec!(14247.83)));
        assert_eq!(account.mask(), "4829");
        assert_eq!(account.kind(), AccountKind::Checking);
        assert_eq!(account.last_sync(), now());
        assert_eq!(account.short_label(), "Chase ••4829");
    }

    #[test]
    fn test_account_form_missing_fields() {
        let form = NewAccount {
            name: Some("   ".to_string()),
            ..checking_form()
        };
        match form.validate(now()) {
            Err(Error::Validation(field)) => assert!(field.starts_with("account name")),
            other => panic!("Unexpected result {other:?}"),
        }
        let form = NewAccount {
            kind: Some("brokerage".to_string()),
            ..checking_form()
        };
        assert!(matches!(form.validate(now()), Err(Error::Validation(_))));
        let form = NewAccount {
            mask: Some("12ab".to_string()),
            ..checking_form()
        };
        assert!(matches!(form.validate(now()), Err(Error::Validation(_))));
        let form = NewAccount {
            institution: None,
            mask: None,
            ..checking_form()
        };
        let account = form.validate(now()).unwrap();
        assert_eq!(account.institution(), MANUAL_INSTITUTION);
        assert_eq!(account.mask(), "");
    }

    #[test]
    fn test_transaction_form_defaults_category() {
        let form = NewTransaction {
            category: None,
            amount: Some("3247.85".to_string()),
            ..coffee_form(4)
        };
        assert_eq!(form.validate().unwrap().category(), Category::Income);
        let form = NewTransaction {
            category: Some(" ".to_string()),
            ..coffee_form(5)
        };
        assert_eq!(form.validate().unwrap().category(), Category::Other);
    }

    #[test]
    fn test_transaction_form_rejects_bad_input() {
        let form = NewTransaction {
            date: None,
            ..coffee_form(1)
        };
        assert!(matches!(form.validate(), Err(Error::Validation(_))));
        let form = NewTransaction {
            confidence: Some(140),
            ..coffee_form(1)
        };
        assert!(matches!(form.validate(), Err(Error::Validation(_))));
        let form = NewTransaction {
            amount: Some("lots".to_string()),
            ..coffee_form(1)
        };
        assert!(matches!(form.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_session_requires_known_account() {
        let mut session = Session::new();
        assert!(matches!(
            session.add_transaction(coffee_form(1)),
            Err(Error::Validation(_))
        ));
        session.add_account(checking_form(), now()).unwrap();
        session.add_transaction(coffee_form(1)).unwrap();
        assert!(matches!(
            session.add_transaction(coffee_form(1)),
            Err(Error::DuplicateTransaction(_))
        ));
        assert!(matches!(
            session.add_account(checking_form(), now()),
            Err(Error::DuplicateAccount(_))
        ));
    }

    #[test]
    fn test_session_totals_and_projection() {
        let mut session = Session::new();
        session.add_account(checking_form(), now()).unwrap();
        session.add_transaction(coffee_form(1)).unwrap();
        session.add_prediction(PredictedTransaction::new(1, "Payroll", dec!(3247.85), 12).income());
        let totals = session.totals(Month::new(2025, 8).unwrap());
        assert_eq!(totals.total_balance(), Money::from(dec!(14247.83)));
        assert_eq!(totals.monthly_spending(), Money::from(dec!(6.47)));
        assert!(matches!(totals.savings_rate(), Err(Error::UndefinedRate)));
        let projection = session.projection();
        assert_eq!(projection.final_balance(), Money::from(dec!(17495.68)));
    }

    #[test]
    fn test_set_budget_replaces() {
        let mut session = Session::new();
        session.set_budget(Budget::new(Category::Groceries, dec!(500)));
        session.set_budget(Budget::new(Category::Groceries, dec!(600)));
        session.set_budget(Budget::new(Category::Housing, dec!(1850)));
        assert_eq!(session.budgets().len(), 2);
        assert_eq!(session.budgets()[0].limit(), Money::from(dec!(600)));
    }

    #[test]
    fn test_replace_accounts_keeps_transactions() {
        let mut session = Session::new();
        session.add_account(checking_form(), now()).unwrap();
        session.add_transaction(coffee_form(1)).unwrap();
        let synced = NewAccount {
            id: Some("plaid-1".to_string()),
            balance: Some("10".to_string()),
            ..checking_form()
        }
        .validate(now())
        .unwrap();
        session.replace_accounts(vec![synced]);
        assert_eq!(session.accounts().len(), 1);
        assert_eq!(session.transactions().len(), 1);
    }

    #[test]
    fn test_recent_transactions_newest_first() {
        let mut session = Session::new();
        session.add_account(checking_form(), now()).unwrap();
        session.add_transaction(coffee_form(1)).unwrap();
        session
            .add_transaction(NewTransaction {
                date: NaiveDate::from_ymd_opt(2025, 8, 15),
                ..coffee_form(2)
            })
            .unwrap();
        session
            .add_transaction(NewTransaction {
                date: NaiveDate::from_ymd_opt(2025, 8, 16),
                ..coffee_form(3)
            })
            .unwrap();
        let ids: Vec<u32> = session
            .recent_transactions()
            .iter()
            .map(|t| t.id().into())
            .collect();
        assert_eq!(ids, [1, 3, 2]);
    }
}

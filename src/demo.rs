//! Built-in demo data, dated relative to the day it is loaded

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal_macros::dec;
use tracing::debug;

use crate::{
    errors::Result,
    session::{NewAccount, NewTransaction, Session},
    types::{Budget, Category, Confidence, PredictedTransaction},
};

struct DemoAccount {
    id: &'static str,
    name: &'static str,
    institution: &'static str,
    balance: &'static str,
    kind: &'static str,
    mask: &'static str,
}

const ACCOUNTS: [DemoAccount; 2] = [
    DemoAccount {
        id: "chase-checking",
        name: "Chase Total Checking",
        institution: "chase",
        balance: "14247.83",
        kind: "checking",
        mask: "4829",
    },
    DemoAccount {
        id: "bofa-savings",
        name: "Bank of America Advantage",
        institution: "bofa",
        balance: "10599.99",
        kind: "savings",
        mask: "7392",
    },
];

/// (merchant, amount, category, days ago)
const TRANSACTIONS: [(&str, &str, &str, i64); 8] = [
    ("Starbucks #1247", "-6.47", "Food & Dining", 0),
    ("Uber Trip", "-14.23", "Transportation", 0),
    ("Whole Foods Market", "-89.34", "Groceries", 1),
    ("Payroll Direct Deposit", "3247.85", "Income", 2),
    ("Amazon.com", "-64.12", "Shopping", 4),
    ("Netflix", "-15.49", "Entertainment", 6),
    ("ConEd Utilities", "-112.40", "Utilities", 9),
    ("Rent - Parkview Apartments", "-1850.00", "Housing", 14),
];

fn budgets() -> [Budget; 7] {
    [
        Budget::new(Category::FoodAndDining, dec!(400)),
        Budget::new(Category::Groceries, dec!(600)),
        Budget::new(Category::Transportation, dec!(200)),
        Budget::new(Category::Shopping, dec!(300)),
        Budget::new(Category::Entertainment, dec!(100)),
        Budget::new(Category::Housing, dec!(1850)),
        Budget::new(Category::Utilities, dec!(250)),
    ]
}

fn confidence(value: u8) -> Result<Confidence> {
    Confidence::try_from(value)
}

fn predictions() -> Result<Vec<PredictedTransaction>> {
    Ok(vec![
        PredictedTransaction::new(1, "Starbucks (Predicted)", dec!(-6.50), 1)
            .with_category(Category::FoodAndDining)
            .with_confidence(confidence(94)?)
            .on_account("chase-checking"),
        PredictedTransaction::new(2, "Grocery Shopping (Tuesday)", dec!(-89.00), 3)
            .with_category(Category::Groceries)
            .with_confidence(confidence(91)?)
            .on_account("chase-checking"),
        PredictedTransaction::new(3, "PAYDAY - Direct Deposit", dec!(3247.85), 12)
            .income()
            .with_confidence(confidence(99)?)
            .on_account("chase-checking"),
    ])
}

/// Builds the demo session: two accounts totalling $24,847.82, a couple of
/// weeks of transactions ending on `today`, monthly budgets and three predicted
/// events leading up to a payday 12 days out.
/// # Errors
/// Only if the built-in records fail validation
pub fn session(today: NaiveDate) -> Result<Session> {
    let mut session = Session::new();
    let now = Utc.from_utc_datetime(&today.and_time(NaiveTime::MIN));
    for account in &ACCOUNTS {
        session.add_account(
            NewAccount {
                id: Some(account.id.to_string()),
                name: Some(account.name.to_string()),
                institution: Some(account.institution.to_string()),
                balance: Some(account.balance.to_string()),
                kind: Some(account.kind.to_string()),
                mask: Some(account.mask.to_string()),
                last_sync: None,
            },
            now,
        )?;
    }
    for (id, (merchant, amount, category, days_ago)) in (1u32..).zip(TRANSACTIONS) {
        session.add_transaction(NewTransaction {
            id: Some(id),
            account: Some(ACCOUNTS[0].id.to_string()),
            merchant: Some(merchant.to_string()),
            amount: Some(amount.to_string()),
            category: Some(category.to_string()),
            date: Some(today - Duration::days(days_ago)),
            confidence: Some(97),
        })?;
    }
    for prediction in predictions()? {
        session.add_prediction(prediction);
    }
    for budget in budgets() {
        session.set_budget(budget);
    }
    debug!(%today, "loaded demo session");
    Ok(session)
}

#[cfg(test)]
mod tests {
    use crate::types::{Money, Month, TransactionLog};

    use super::*;

    #[test]
    fn test_demo_payday_scenario() {
        let today = NaiveDate::from_ymd_opt(2025, 8, 17).unwrap();
        let session = session(today).unwrap();
        let totals = session.totals(Month::of(today));
        assert_eq!(totals.total_balance(), Money::from(dec!(24847.82)));
        assert_eq!(session.transactions().len(), 8);
        let projection = session.projection();
        assert_eq!(projection.rows().len(), 4);
        assert_eq!(projection.days_to_payday().unwrap(), 12);
        assert_eq!(
            projection.balance_before_payday().unwrap(),
            Money::from(dec!(24752.32))
        );
        assert_eq!(
            projection.balance_after_payday().unwrap(),
            Money::from(dec!(28000.17))
        );
    }

    #[test]
    fn test_demo_dates_follow_today() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
        let session = session(today).unwrap();
        let newest = session.recent_transactions()[0];
        assert_eq!(newest.date(), today);
        assert_eq!(session.budgets().len(), 7);
    }
}

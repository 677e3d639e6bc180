use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::{
    errors::{Error, Result},
    types::{
        Account, AccountBook, AccountId, MemoryAccountBook, MemoryTransactionLog, Money, Month,
        Transaction, TransactionId, TransactionLog,
    },
};

/// Decimal places kept on the savings rate ratio
const RATE_SCALE: u32 = 4;

/// Totals derived from the session's accounts and transactions for one month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    month: Month,
    total_balance: Money,
    monthly_income: Money,
    monthly_spending: Money,
    savings_rate: Option<Decimal>,
}

impl Totals {
    /// The month spending was measured for
    #[must_use]
    #[inline]
    pub fn month(&self) -> Month {
        self.month
    }

    /// Sum of every account balance
    #[must_use]
    #[inline]
    pub fn total_balance(&self) -> Money {
        self.total_balance
    }

    /// Sum of all credits
    #[must_use]
    #[inline]
    pub fn monthly_income(&self) -> Money {
        self.monthly_income
    }

    /// Sum of debits inside the month, as a positive amount
    #[must_use]
    #[inline]
    pub fn monthly_spending(&self) -> Money {
        self.monthly_spending
    }

    /// Income minus spending
    #[must_use]
    pub fn net_cash_flow(&self) -> Money {
        self.monthly_income - self.monthly_spending
    }

    /// `(income - spending) / income` as a ratio, e.g. `0.9692`.
    /// # Errors
    /// [`Error::UndefinedRate`] when there was no income
    pub fn savings_rate(&self) -> Result<Decimal> {
        self.savings_rate.ok_or(Error::UndefinedRate)
    }

    /// The savings rate as a percentage rounded to one decimal place
    /// # Errors
    /// [`Error::UndefinedRate`] when there was no income
    pub fn savings_rate_percent(&self) -> Result<Decimal> {
        Ok((self.savings_rate()? * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero))
    }
}

/// Computes [`Totals`] over any set of borrowed accounts and transactions.
///
/// Income counts every credit; spending counts only debits dated inside `as_of`.
/// Pure and cheap enough to call on every refresh.
pub fn aggregate<'a, A, T>(accounts: A, transactions: T, as_of: Month) -> Totals
where
    A: IntoIterator<Item = &'a Account>,
    T: IntoIterator<Item = &'a Transaction>,
{
    let total_balance: Money = accounts.into_iter().map(Account::balance).sum();
    let mut monthly_income = Money::ZERO;
    let mut monthly_spending = Money::ZERO;
    for transaction in transactions {
        let amount = transaction.amount();
        if amount.is_positive() {
            monthly_income += amount;
        } else if amount.is_negative() && as_of.contains(transaction.date()) {
            monthly_spending += amount.abs();
        }
    }
    let savings_rate = if monthly_income.is_zero() {
        None
    } else {
        (monthly_income - monthly_spending)
            .amount()
            .checked_div(monthly_income.amount())
            .map(|rate| {
                rate.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero)
            })
    };
    debug!(
        month = %as_of,
        %total_balance,
        %monthly_income,
        %monthly_spending,
        "aggregated totals"
    );
    Totals {
        month: as_of,
        total_balance,
        monthly_income,
        monthly_spending,
        savings_rate,
    }
}

impl AccountBook for MemoryAccountBook {
    fn account(&self, account_id: &AccountId) -> Option<&Account> {
        self.accounts.get(account_id)
    }

    fn insert(&mut self, account: Account) -> Result<()> {
        if self.accounts.contains_key(account.id()) {
            return Err(Error::DuplicateAccount(account.id().clone()));
        }
        self.accounts.insert(account.id().clone(), account);
        Ok(())
    }

    fn replace_all(&mut self, accounts: Vec<Account>) {
        self.accounts = accounts
            .into_iter()
            .map(|account| (account.id().clone(), account))
            .collect();
    }

    fn len(&self) -> usize {
        self.accounts.len()
    }
}

impl<'a> IntoIterator for &'a MemoryAccountBook {
    type Item = &'a Account;

    type IntoIter = std::collections::btree_map::Values<'a, AccountId, Account>;

    fn into_iter(self) -> Self::IntoIter {
        self.accounts.values()
    }
}

impl TransactionLog for MemoryTransactionLog {
    fn transaction(&self, transaction_id: TransactionId) -> Option<&Transaction> {
        self.transactions.get(&transaction_id)
    }

    fn register(&mut self, transaction: Transaction) -> Result<()> {
        if self.transactions.contains_key(&transaction.id()) {
            return Err(Error::DuplicateTransaction(transaction.id()));
        }
        self.transactions.insert(transaction.id(), transaction);
        Ok(())
    }

    fn len(&self) -> usize {
        self.transactions.len()
    }
}

impl<'a> IntoIterator for &'a MemoryTransactionLog {
    type Item = &'a Transaction;

    type IntoIter = std::collections::btree_map::Values<'a, TransactionId, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.transactions.values()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;

    use crate::types::{AccountKind, Category};

    use super::*;

    fn account(id: &str, balance: Decimal) -> Account {
        Account {
            id: id.into(),
            name: format!("{id} account"),
            institution: "test".to_string(),
            balance: balance.into(),
            kind: AccountKind::Checking,
            mask: "0000".to_string(),
            last_sync: Utc.with_ymd_and_hms(2025, 8, 17, 9, 0, 0).unwrap(),
        }
    }

    fn transaction(id: u32, amount: Decimal, date: (i32, u32, u32)) -> Transaction {
        Transaction {
            id: id.into(),
            account_id: "a".into(),
            merchant: format!("merchant {id}"),
            amount: amount.into(),
            category: if amount > Decimal::ZERO {
                Category::Income
            } else {
                Category::Other
            },
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            confidence: None,
        }
    }

    const NO_ACCOUNTS: &[Account] = &[];
    const NO_TRANSACTIONS: &[Transaction] = &[];

    fn august() -> Month {
        Month::new(2025, 8).unwrap()
    }

    #[test]
    fn test_total_balance_is_order_independent() {
        let accounts = vec![
            account("a", dec!(14247.83)),
            account("b", dec!(10599.99)),
            account("c", dec!(-512.40)),
        ];
        let mut reversed = accounts.clone();
        reversed.reverse();
        let forward = aggregate(&accounts, NO_TRANSACTIONS, august());
        let backward = aggregate(&reversed, NO_TRANSACTIONS, august());
        assert_eq!(forward.total_balance(), Money::from(dec!(24335.42)));
        assert_eq!(forward.total_balance(), backward.total_balance());
    }

    #[test]
    fn test_spending_is_limited_to_month() {
        let transactions = vec![
            transaction(1, dec!(-6.47), (2025, 8, 17)),
            transaction(2, dec!(-89.34), (2025, 8, 16)),
            transaction(3, dec!(-1850.00), (2025, 7, 31)),
            transaction(4, dec!(3247.85), (2025, 8, 15)),
        ];
        let totals = aggregate(NO_ACCOUNTS, &transactions, august());
        assert_eq!(totals.monthly_spending(), Money::from(dec!(95.81)));
        assert_eq!(totals.monthly_income(), Money::from(dec!(3247.85)));
        assert_eq!(totals.net_cash_flow(), Money::from(dec!(3152.04)));
        assert_eq!(totals.savings_rate().unwrap(), dec!(0.9705));
        assert_eq!(totals.savings_rate_percent().unwrap(), dec!(97.1));
    }

    #[test]
    fn test_income_is_not_month_filtered() {
        let transactions = vec![
            transaction(1, dec!(1000), (2025, 6, 1)),
            transaction(2, dec!(-250), (2025, 8, 2)),
        ];
        let totals = aggregate(NO_ACCOUNTS, &transactions, august());
        assert_eq!(totals.monthly_income(), Money::from(dec!(1000)));
        assert_eq!(totals.savings_rate().unwrap(), dec!(0.75));
    }

    #[test]
    fn test_zero_income_is_undefined_rate() {
        let transactions = vec![transaction(1, dec!(-42.00), (2025, 8, 3))];
        let totals = aggregate(NO_ACCOUNTS, &transactions, august());
        assert!(matches!(totals.savings_rate(), Err(Error::UndefinedRate)));
        assert!(matches!(totals.savings_rate_percent(), Err(Error::UndefinedRate)));
        let empty = aggregate(NO_ACCOUNTS, NO_TRANSACTIONS, august());
        assert!(matches!(empty.savings_rate(), Err(Error::UndefinedRate)));
    }

    #[test]
    fn test_overspending_gives_negative_rate() {
        let transactions = vec![
            transaction(1, dec!(100), (2025, 8, 1)),
            transaction(2, dec!(-150), (2025, 8, 2)),
        ];
        let totals = aggregate(NO_ACCOUNTS, &transactions, august());
        assert_eq!(totals.savings_rate().unwrap(), dec!(-0.5));
    }

    #[test]
    fn test_account_book_rejects_duplicates() {
        let mut book = MemoryAccountBook::new();
        book.insert(account("chase", dec!(1))).unwrap();
        assert!(matches!(
            book.insert(account("chase", dec!(2))),
            Err(Error::DuplicateAccount(_))
        ));
        assert_eq!(book.len(), 1);
        assert_eq!(
            book.account(&"chase".into()).unwrap().balance(),
            Money::from(dec!(1))
        );
    }

    #[test]
    fn test_replace_all_accounts() {
        let mut book = MemoryAccountBook::new();
        book.insert(account("demo", dec!(1))).unwrap();
        book.replace_all(vec![account("live-1", dec!(5)), account("live-2", dec!(6))]);
        assert_eq!(book.len(), 2);
        assert!(book.account(&"demo".into()).is_none());
        let ids: Vec<&str> = (&book).into_iter().map(|a| a.id().as_str()).collect();
        assert_eq!(ids, ["live-1", "live-2"]);
    }

    #[test]
    fn test_transaction_log_rejects_duplicates() {
        let mut log = MemoryTransactionLog::new();
        log.register(transaction(7, dec!(-1), (2025, 8, 1))).unwrap();
        assert!(matches!(
            log.register(transaction(7, dec!(-2), (2025, 8, 1))),
            Err(Error::DuplicateTransaction(_))
        ));
        assert_eq!(
            log.transaction(7.into()).unwrap().amount(),
            Money::from(dec!(-1))
        );
        assert!(!log.is_empty());
    }
}

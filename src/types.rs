//! Common datatypes shared by the aggregator, projector and exporters

use std::{
    collections::BTreeMap,
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub},
    str::FromStr,
};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{Error, Result};

/// The number of decimals tracked for all amounts
pub const MONEY_SCALE: u32 = 2;

/// A currency amount held as fixed-point decimal with [`MONEY_SCALE`] fraction digits.
///
/// Summation never drifts the way floating point does, so `total_balance` is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero dollars
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Builds an amount from a whole number of cents
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, MONEY_SCALE))
    }

    /// Returns the underlying decimal
    #[must_use]
    #[inline]
    pub fn amount(self) -> Decimal {
        self.0
    }

    /// Returns the absolute value of the amount
    #[must_use]
    #[inline]
    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Whether the amount is a debit
    #[must_use]
    #[inline]
    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Whether the amount is a credit
    #[must_use]
    #[inline]
    pub fn is_positive(self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Whether the amount is exactly zero
    #[must_use]
    #[inline]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Decimal> for Money {
    fn from(mut amount: Decimal) -> Self {
        amount.rescale(MONEY_SCALE);
        Self(amount)
    }
}

impl FromStr for Money {
    type Err = Error;

    /// Accepts plain decimals as well as display strings like `-$1,234.56`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s
            .trim()
            .chars()
            .filter(|c| *c != '$' && *c != ',')
            .collect();
        Decimal::from_str(&cleaned)
            .map(Money::from)
            .map_err(|_| Error::validation(format!("amount '{s}'")))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        rust_decimal::serde::str::deserialize(deserializer).map(Money::from)
    }
}

/// Formats as a dollar amount with thousands separators: `$1,234.56`, `-$6.50`
impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = format!("{:.2}", self.0.abs());
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((&digits, "00"));
        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, c) in int_part.chars().rev().enumerate() {
            if i > 0 && i % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        let grouped: String = grouped.chars().rev().collect();
        let sign = if self.is_negative() { "-" } else { "" };
        write!(f, "{sign}${grouped}.{frac_part}")
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Unique identifier for an account, as issued by the institution or aggregator
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Returns the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountId {
    fn from(account_id: &str) -> Self {
        Self(account_id.to_string())
    }
}

impl From<String> for AccountId {
    fn from(account_id: String) -> Self {
        Self(account_id)
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a transaction or predicted transaction
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct TransactionId(u32);

impl From<u32> for TransactionId {
    fn from(transaction_id: u32) -> Self {
        Self(transaction_id)
    }
}

impl From<TransactionId> for u32 {
    fn from(transaction_id: TransactionId) -> Self {
        transaction_id.0
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "id[{}]", self.0)
    }
}

/// The kinds of account a session can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Everyday transaction account
    Checking,
    /// Interest-bearing deposit account
    Savings,
    /// Credit card or line of credit
    Credit,
}

impl AccountKind {
    /// Lowercase label, as used in CSV files
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AccountKind::Checking => "checking",
            AccountKind::Savings => "savings",
            AccountKind::Credit => "credit",
        }
    }
}

impl Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AccountKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "checking" => Ok(AccountKind::Checking),
            "savings" => Ok(AccountKind::Savings),
            "credit" => Ok(AccountKind::Credit),
            _ => Err(Error::validation(format!("account kind '{s}'"))),
        }
    }
}

/// Spending and income categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Restaurants and coffee
    #[serde(rename = "Food & Dining")]
    FoodAndDining,
    /// Rides, fuel and transit
    Transportation,
    /// Supermarkets
    Groceries,
    /// Payroll and other credits
    Income,
    /// Retail purchases
    Shopping,
    /// Streaming, events and hobbies
    Entertainment,
    /// Rent or mortgage
    Housing,
    /// Power, water, internet
    Utilities,
    /// Medical costs
    Healthcare,
    /// Anything else
    Other,
}

impl Category {
    /// Every category, in display order
    pub const ALL: [Category; 10] = [
        Category::FoodAndDining,
        Category::Transportation,
        Category::Groceries,
        Category::Income,
        Category::Shopping,
        Category::Entertainment,
        Category::Housing,
        Category::Utilities,
        Category::Healthcare,
        Category::Other,
    ];

    /// Display label, as used in CSV files and exports
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Category::FoodAndDining => "Food & Dining",
            Category::Transportation => "Transportation",
            Category::Groceries => "Groceries",
            Category::Income => "Income",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::Housing => "Housing",
            Category::Utilities => "Utilities",
            Category::Healthcare => "Healthcare",
            Category::Other => "Other",
        }
    }

    /// Categories whose debits are listed as deductions in the tax summary
    #[must_use]
    pub fn is_deductible(self) -> bool {
        matches!(
            self,
            Category::Housing | Category::Utilities | Category::Healthcare
        )
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::validation(format!("category '{s}'")))
    }
}

/// Advisory 0-100 score attached to transactions and predictions. Display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Confidence(u8);

impl Confidence {
    /// Highest possible score
    pub const CERTAIN: Confidence = Confidence(100);

    /// Returns the score as a percentage
    #[must_use]
    #[inline]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Confidence {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > 100 {
            return Err(Error::validation(format!("confidence {value}, must be 0-100")));
        }
        Ok(Self(value))
    }
}

impl From<Confidence> for u8 {
    fn from(confidence: Confidence) -> Self {
        confidence.0
    }
}

impl Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// A calendar month, used to bound the monthly totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Creates a month, rejecting month numbers outside 1-12
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidMonth(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    /// The month a date falls in
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Whether `date` falls inside this month
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Calendar year
    #[must_use]
    #[inline]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Month number, 1-12
    #[must_use]
    #[inline]
    pub fn month(&self) -> u32 {
        self.month
    }
}

impl FromStr for Month {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidMonth(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        Month::new(year, month).map_err(|_| invalid())
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A bank, savings or credit account held in the session
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// The unique identifier for the account
    pub(crate) id: AccountId,
    /// Display name, e.g. "Chase Total Checking"
    pub(crate) name: String,
    /// Tag of the owning institution, e.g. "chase"
    pub(crate) institution: String,
    /// Current balance. Credit accounts usually carry a negative balance.
    pub(crate) balance: Money,
    /// What kind of account this is
    pub(crate) kind: AccountKind,
    /// Last four digits of the account number
    pub(crate) mask: String,
    /// When the balance was last refreshed
    pub(crate) last_sync: DateTime<Utc>,
}

impl Account {
    /// Returns the unique identifier for the account
    #[must_use]
    #[inline]
    pub fn id(&self) -> &AccountId {
        &self.id
    }

    /// Returns the display name
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the institution tag
    #[must_use]
    #[inline]
    pub fn institution(&self) -> &str {
        &self.institution
    }

    /// Returns the current balance
    #[must_use]
    #[inline]
    pub fn balance(&self) -> Money {
        self.balance
    }

    /// Returns the account kind
    #[must_use]
    #[inline]
    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    /// Returns the last four digits of the account number
    #[must_use]
    #[inline]
    pub fn mask(&self) -> &str {
        &self.mask
    }

    /// Returns when the balance was last refreshed
    #[must_use]
    #[inline]
    pub fn last_sync(&self) -> DateTime<Utc> {
        self.last_sync
    }

    /// Short label used next to transactions, e.g. `Chase ••4829`
    #[must_use]
    pub fn short_label(&self) -> String {
        let first_word = self.name.split_whitespace().next().unwrap_or(&self.name);
        format!("{first_word} ••{}", self.mask)
    }
}

/// A posted transaction on one of the session's accounts
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Unique identifier for this transaction
    pub(crate) id: TransactionId,
    /// Account this transaction was posted to
    pub(crate) account_id: AccountId,
    /// Merchant name or description
    pub(crate) merchant: String,
    /// Signed amount: negative for debits, positive for credits
    pub(crate) amount: Money,
    /// Spending category
    pub(crate) category: Category,
    /// Date the transaction occurred
    pub(crate) date: NaiveDate,
    /// Advisory categorization confidence
    pub(crate) confidence: Option<Confidence>,
}

impl Transaction {
    /// Returns the unique identifier
    #[must_use]
    #[inline]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the owning account
    #[must_use]
    #[inline]
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// Returns the merchant or description
    #[must_use]
    #[inline]
    pub fn merchant(&self) -> &str {
        &self.merchant
    }

    /// Returns the signed amount
    #[must_use]
    #[inline]
    pub fn amount(&self) -> Money {
        self.amount
    }

    /// Returns the category
    #[must_use]
    #[inline]
    pub fn category(&self) -> Category {
        self.category
    }

    /// Returns the occurrence date
    #[must_use]
    #[inline]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Returns the advisory confidence, if one was recorded
    #[must_use]
    #[inline]
    pub fn confidence(&self) -> Option<Confidence> {
        self.confidence
    }
}

/// A future transaction expected at a day offset from the projection's anchor date.
///
/// Generated once when the session is loaded and consumed only by
/// [`project`](crate::projection::project).
#[derive(Debug, Clone, PartialEq)]
pub struct PredictedTransaction {
    pub(crate) id: TransactionId,
    pub(crate) account_id: Option<AccountId>,
    pub(crate) description: String,
    pub(crate) amount: Money,
    pub(crate) category: Category,
    pub(crate) offset_days: u32,
    pub(crate) confidence: Confidence,
    pub(crate) is_income: bool,
}

impl PredictedTransaction {
    /// Creates a non-income prediction in [`Category::Other`] with full confidence
    #[must_use]
    pub fn new(
        id: impl Into<TransactionId>,
        description: impl Into<String>,
        amount: impl Into<Money>,
        offset_days: u32,
    ) -> Self {
        Self {
            id: id.into(),
            account_id: None,
            description: description.into(),
            amount: amount.into(),
            category: Category::Other,
            offset_days,
            confidence: Confidence::CERTAIN,
            is_income: false,
        }
    }

    /// Marks the prediction as a payday
    #[must_use]
    pub fn income(mut self) -> Self {
        self.is_income = true;
        self.category = Category::Income;
        self
    }

    /// Sets the category
    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Sets the advisory confidence
    #[must_use]
    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    /// Attributes the prediction to an account
    #[must_use]
    pub fn on_account(mut self, account_id: impl Into<AccountId>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Returns the unique identifier
    #[must_use]
    #[inline]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the account the prediction is expected on, if known
    #[must_use]
    #[inline]
    pub fn account_id(&self) -> Option<&AccountId> {
        self.account_id.as_ref()
    }

    /// Returns the description
    #[must_use]
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the signed amount
    #[must_use]
    #[inline]
    pub fn amount(&self) -> Money {
        self.amount
    }

    /// Returns the category
    #[must_use]
    #[inline]
    pub fn category(&self) -> Category {
        self.category
    }

    /// Days after the anchor date the transaction is expected
    #[must_use]
    #[inline]
    pub fn offset_days(&self) -> u32 {
        self.offset_days
    }

    /// Returns the advisory confidence
    #[must_use]
    #[inline]
    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    /// Whether this is a payday
    #[must_use]
    #[inline]
    pub fn is_income(&self) -> bool {
        self.is_income
    }
}

/// A monthly spending limit for one category
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Budget {
    pub(crate) category: Category,
    pub(crate) limit: Money,
}

impl Budget {
    /// Creates a budget line
    #[must_use]
    pub fn new(category: Category, limit: impl Into<Money>) -> Self {
        Self {
            category,
            limit: limit.into(),
        }
    }

    /// Returns the budgeted category
    #[must_use]
    #[inline]
    pub fn category(&self) -> Category {
        self.category
    }

    /// Returns the monthly limit
    #[must_use]
    #[inline]
    pub fn limit(&self) -> Money {
        self.limit
    }
}

/// An interface to all accounts
pub trait AccountBook
where
    for<'a> &'a Self: IntoIterator<Item = &'a Account>,
{
    /// Fetches an account by ID, if one exists
    fn account(&self, account_id: &AccountId) -> Option<&Account>;

    /// Adds an account to the book.
    /// # Errors
    /// [`Error::DuplicateAccount`] if the ID is already present
    fn insert(&mut self, account: Account) -> Result<()>;

    /// Drops every account and replaces them with a freshly synced set
    fn replace_all(&mut self, accounts: Vec<Account>);

    /// Number of accounts in the book
    fn len(&self) -> usize;

    /// Whether the book holds no accounts
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An interface to all posted transactions
pub trait TransactionLog
where
    for<'a> &'a Self: IntoIterator<Item = &'a Transaction>,
{
    /// Fetches a transaction by ID, if one exists
    fn transaction(&self, transaction_id: TransactionId) -> Option<&Transaction>;

    /// Registers a transaction in the log.
    /// # Errors
    /// [`Error::DuplicateTransaction`] if the ID was registered before
    fn register(&mut self, transaction: Transaction) -> Result<()>;

    /// Number of registered transactions
    fn len(&self) -> usize;

    /// Whether the log holds no transactions
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Holds all accounts in an in-memory structure, ordered by ID.
///
/// # Limitations
/// No persistence. Lives as long as the session that owns it.
#[derive(Default, Debug)]
pub struct MemoryAccountBook {
    /// Storage for the map of account ID to account
    pub(crate) accounts: BTreeMap<AccountId, Account>,
}

impl MemoryAccountBook {
    /// Creates a new, empty [`MemoryAccountBook`].
    #[must_use]
    pub fn new() -> Self {
        MemoryAccountBook::default()
    }
}

/// Holds all transactions in an in-memory structure, ordered by ID.
///
/// # Limitations
/// No persistence. Lives as long as the session that owns it.
#[derive(Default, Debug)]
pub struct MemoryTransactionLog {
    /// Storage for transactions that have been registered
    pub(crate) transactions: BTreeMap<TransactionId, Transaction>,
}

impl MemoryTransactionLog {
    /// Creates a new, empty [`MemoryTransactionLog`]
    #[must_use]
    pub fn new() -> Self {
        MemoryTransactionLog::default()
    }
}

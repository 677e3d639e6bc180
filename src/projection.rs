//! Running-balance projection over predicted transactions

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::{
    errors::{Error, Result},
    types::{Confidence, Money, PredictedTransaction, TransactionId},
};

/// Description used for the opening row of every projection
pub const OPENING_DESCRIPTION: &str = "Current Total Balance";

/// One line of the cash-flow table
#[derive(Debug, Clone, PartialEq)]
pub struct RunningBalanceRow {
    event: Option<TransactionId>,
    offset_days: u32,
    description: String,
    amount: Money,
    balance: Money,
    confidence: Option<Confidence>,
    payday: bool,
}

impl RunningBalanceRow {
    fn opening(starting_balance: Money) -> Self {
        Self {
            event: None,
            offset_days: 0,
            description: OPENING_DESCRIPTION.to_string(),
            amount: starting_balance,
            balance: starting_balance,
            confidence: None,
            payday: false,
        }
    }

    /// The predicted transaction this row applies, or `None` for the opening row
    #[must_use]
    #[inline]
    pub fn event(&self) -> Option<TransactionId> {
        self.event
    }

    /// Whether this is the opening row holding the starting balance
    #[must_use]
    #[inline]
    pub fn is_opening(&self) -> bool {
        self.event.is_none()
    }

    /// Days after the anchor date
    #[must_use]
    #[inline]
    pub fn offset_days(&self) -> u32 {
        self.offset_days
    }

    /// Calendar date of the row relative to `anchor`
    #[must_use]
    pub fn date(&self, anchor: NaiveDate) -> NaiveDate {
        anchor + Duration::days(i64::from(self.offset_days))
    }

    /// Row description
    #[must_use]
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Signed amount applied by this row; the starting balance for the opening row
    #[must_use]
    #[inline]
    pub fn amount(&self) -> Money {
        self.amount
    }

    /// Running balance after this row
    #[must_use]
    #[inline]
    pub fn balance(&self) -> Money {
        self.balance
    }

    /// Advisory confidence of the underlying prediction
    #[must_use]
    #[inline]
    pub fn confidence(&self) -> Option<Confidence> {
        self.confidence
    }

    /// Whether the row is an income event. Display only.
    #[must_use]
    #[inline]
    pub fn is_payday(&self) -> bool {
        self.payday
    }
}

/// A running-balance table plus the position of the first payday in it
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    rows: Vec<RunningBalanceRow>,
    payday_index: Option<usize>,
}

impl Projection {
    /// Every row, opening row first
    #[must_use]
    pub fn rows(&self) -> &[RunningBalanceRow] {
        &self.rows
    }

    /// Rows up to and including the first payday. All rows when no payday exists.
    #[must_use]
    pub fn rows_to_payday(&self) -> &[RunningBalanceRow] {
        match self.payday_index {
            Some(index) => &self.rows[..=index],
            None => &self.rows,
        }
    }

    /// Starting balance the projection was built from
    #[must_use]
    pub fn starting_balance(&self) -> Money {
        self.rows[0].balance
    }

    /// Balance after the last row
    #[must_use]
    pub fn final_balance(&self) -> Money {
        self.rows[self.rows.len() - 1].balance
    }

    /// The first payday row
    /// # Errors
    /// [`Error::NoUpcomingIncome`] if no event is income
    pub fn next_payday(&self) -> Result<&RunningBalanceRow> {
        self.payday_index
            .map(|index| &self.rows[index])
            .ok_or(Error::NoUpcomingIncome)
    }

    /// Running balance immediately before the first payday
    /// # Errors
    /// [`Error::NoUpcomingIncome`] if no event is income
    pub fn balance_before_payday(&self) -> Result<Money> {
        let index = self.payday_index.ok_or(Error::NoUpcomingIncome)?;
        Ok(self.rows[index - 1].balance)
    }

    /// Running balance immediately after the first payday
    /// # Errors
    /// [`Error::NoUpcomingIncome`] if no event is income
    pub fn balance_after_payday(&self) -> Result<Money> {
        Ok(self.next_payday()?.balance)
    }

    /// Days from the anchor date to the first payday
    /// # Errors
    /// [`Error::NoUpcomingIncome`] if no event is income
    pub fn days_to_payday(&self) -> Result<u32> {
        Ok(self.next_payday()?.offset_days)
    }
}

/// Projects `starting_balance` forward through `events`.
///
/// Events are stable-sorted by day offset first, so ties keep their input order and
/// the same input always produces the same table. Row 0 holds the starting balance;
/// each following row adds one event's amount.
#[must_use]
pub fn project(starting_balance: Money, events: &[PredictedTransaction]) -> Projection {
    let mut ordered: Vec<&PredictedTransaction> = events.iter().collect();
    ordered.sort_by_key(|event| event.offset_days());

    let mut rows = Vec::with_capacity(ordered.len() + 1);
    rows.push(RunningBalanceRow::opening(starting_balance));
    let mut balance = starting_balance;
    let mut payday_index = None;
    for event in ordered {
        balance += event.amount();
        if event.is_income() && payday_index.is_none() {
            payday_index = Some(rows.len());
        }
        rows.push(RunningBalanceRow {
            event: Some(event.id()),
            offset_days: event.offset_days(),
            description: event.description().to_string(),
            amount: event.amount(),
            balance,
            confidence: Some(event.confidence()),
            payday: event.is_income(),
        });
    }
    debug!(
        events = events.len(),
        %starting_balance,
        final_balance = %balance,
        has_payday = payday_index.is_some(),
        "projected cash flow"
    );
    Projection { rows, payday_index }
}

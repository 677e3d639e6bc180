//! Derived reports behind the budget, tax and AI summary exports

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::types::{Budget, Category, Money, Month, Transaction};

/// Total debits per category inside a month
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySpend {
    /// Spending category
    pub category: Category,
    /// Sum of debits, as a positive amount
    pub total: Money,
    /// Number of debits
    pub count: usize,
}

/// Debits inside `month` grouped by category, largest total first
pub fn spending_by_category<'a, T>(transactions: T, month: Month) -> Vec<CategorySpend>
where
    T: IntoIterator<Item = &'a Transaction>,
{
    let mut totals: BTreeMap<Category, (Money, usize)> = BTreeMap::new();
    for transaction in transactions {
        if transaction.amount().is_negative() && month.contains(transaction.date()) {
            let entry = totals.entry(transaction.category()).or_default();
            entry.0 += transaction.amount().abs();
            entry.1 += 1;
        }
    }
    let mut spend: Vec<CategorySpend> = totals
        .into_iter()
        .map(|(category, (total, count))| CategorySpend {
            category,
            total,
            count,
        })
        .collect();
    spend.sort_by(|a, b| b.total.cmp(&a.total));
    spend
}

/// One category's budget and spending
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetLine {
    /// Budgeted category
    pub category: Category,
    /// Monthly limit; zero when the category has no budget
    pub budgeted: Money,
    /// Debits in the month, as a positive amount
    pub actual: Money,
}

impl BudgetLine {
    /// Budget left; negative when overspent
    #[must_use]
    pub fn remaining(&self) -> Money {
        self.budgeted - self.actual
    }

    /// Whether spending exceeded the budget
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.actual > self.budgeted
    }
}

/// Budget vs actual for one month
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetReport {
    /// Month the spending was measured for
    pub month: Month,
    /// Per-category lines
    pub lines: Vec<BudgetLine>,
    /// Sum of all limits
    pub total_budgeted: Money,
    /// Sum of all spending
    pub total_actual: Money,
}

/// Compares each category's spending in `month` against its budget.
///
/// Lines follow [`Category::ALL`] order. Categories with spending but no budget get a
/// zero budget; income is never listed.
pub fn budget_vs_actual<'a, T>(budgets: &[Budget], transactions: T, month: Month) -> BudgetReport
where
    T: IntoIterator<Item = &'a Transaction>,
{
    let spent: BTreeMap<Category, Money> = spending_by_category(transactions, month)
        .into_iter()
        .map(|spend| (spend.category, spend.total))
        .collect();
    let lines: Vec<BudgetLine> = Category::ALL
        .into_iter()
        .filter(|category| *category != Category::Income)
        .filter_map(|category| {
            let budgeted = budgets
                .iter()
                .find(|budget| budget.category() == category)
                .map(Budget::limit);
            let actual = spent.get(&category).copied();
            if budgeted.is_none() && actual.is_none() {
                return None;
            }
            Some(BudgetLine {
                category,
                budgeted: budgeted.unwrap_or_default(),
                actual: actual.unwrap_or_default(),
            })
        })
        .collect();
    BudgetReport {
        month,
        total_budgeted: lines.iter().map(|line| line.budgeted).sum(),
        total_actual: lines.iter().map(|line| line.actual).sum(),
        lines,
    }
}

/// Whether a tax summary line is income or a deduction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxEntryKind {
    /// Taxable credit
    Income,
    /// Deductible debit
    Deduction,
}

impl TaxEntryKind {
    /// Label used in the export
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            TaxEntryKind::Income => "Income",
            TaxEntryKind::Deduction => "Deduction",
        }
    }
}

/// One line of the tax summary
#[derive(Debug, Clone, PartialEq)]
pub struct TaxEntry {
    /// Income or deduction
    pub kind: TaxEntryKind,
    /// Transaction date
    pub date: NaiveDate,
    /// Merchant or description
    pub description: String,
    /// Transaction category
    pub category: Category,
    /// Unsigned amount
    pub amount: Money,
}

/// Income and deductions for one calendar year
#[derive(Debug, Clone, PartialEq)]
pub struct TaxSummary {
    /// Calendar year covered
    pub year: i32,
    /// Lines, oldest first
    pub entries: Vec<TaxEntry>,
    /// Sum of income lines
    pub total_income: Money,
    /// Sum of deduction lines
    pub total_deductions: Money,
}

/// Lists the year's income credits and deductible debits, oldest first.
/// Deduction amounts are reported as positive numbers.
pub fn tax_summary<'a, T>(transactions: T, year: i32) -> TaxSummary
where
    T: IntoIterator<Item = &'a Transaction>,
{
    let mut entries: Vec<TaxEntry> = transactions
        .into_iter()
        .filter(|t| t.date().year() == year)
        .filter_map(|t| {
            let kind = if t.category() == Category::Income && t.amount().is_positive() {
                TaxEntryKind::Income
            } else if t.category().is_deductible() && t.amount().is_negative() {
                TaxEntryKind::Deduction
            } else {
                return None;
            };
            Some(TaxEntry {
                kind,
                date: t.date(),
                description: t.merchant().to_string(),
                category: t.category(),
                amount: t.amount().abs(),
            })
        })
        .collect();
    entries.sort_by_key(|entry| entry.date);
    let total = |kind: TaxEntryKind| -> Money {
        entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.amount)
            .sum()
    };
    TaxSummary {
        year,
        total_income: total(TaxEntryKind::Income),
        total_deductions: total(TaxEntryKind::Deduction),
        entries,
    }
}

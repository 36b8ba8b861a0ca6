//! Read-only derivations over a set of transactions: period filtering,
//! per-category totals, net balance and budget utilization.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::models::{Budgets, Transaction, TransactionKind, EXPENSE_CATEGORIES};

/// Calendar window relative to "now" in the viewer's time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Month,
    Year,
    All,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Month => "monthly",
            Self::Year => "annual",
            Self::All => "all",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().trim_start_matches("--").to_lowercase().as_str() {
            "month" | "monthly" | "m" => Some(Self::Month),
            "year" | "annual" | "yearly" | "y" => Some(Self::Year),
            "all" | "a" => Some(Self::All),
            _ => None,
        }
    }

    /// Whether `date` falls in this period, with calendar boundaries taken in `now`'s zone.
    pub fn contains<Tz: TimeZone>(&self, date: &DateTime<Utc>, now: &DateTime<Tz>) -> bool {
        let local = date.with_timezone(&now.timezone());
        match self {
            Self::Month => local.year() == now.year() && local.month() == now.month(),
            Self::Year => local.year() == now.year(),
            Self::All => true,
        }
    }

    /// Heading for the period, e.g. `"2026-10"`, `"2026"` or `"All time"`.
    pub fn label<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String {
        match self {
            Self::Month => format!("{:04}-{:02}", now.year(), now.month()),
            Self::Year => format!("{:04}", now.year()),
            Self::All => "All time".to_string(),
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn filter_period<'a, Tz: TimeZone>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    period: Period,
    now: &DateTime<Tz>,
) -> Vec<&'a Transaction> {
    transactions
        .into_iter()
        .filter(|t| period.contains(&t.date, now))
        .collect()
}

/// Income and expense sums, overall and grouped by category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Totals {
    pub income: Decimal,
    pub expense: Decimal,
    pub income_by_category: BTreeMap<String, Decimal>,
    pub expense_by_category: BTreeMap<String, Decimal>,
}

impl Totals {
    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut totals = Self::default();
        for t in transactions {
            let (total, by_category) = match t.kind {
                TransactionKind::Income => (&mut totals.income, &mut totals.income_by_category),
                TransactionKind::Expense => (&mut totals.expense, &mut totals.expense_by_category),
            };
            *total += t.amount;
            *by_category.entry(t.category.clone()).or_default() += t.amount;
        }
        totals
    }

    /// Income minus expenses.
    pub fn net(&self) -> Decimal {
        self.income - self.expense
    }

    pub fn by_category(&self, kind: TransactionKind) -> &BTreeMap<String, Decimal> {
        match kind {
            TransactionKind::Income => &self.income_by_category,
            TransactionKind::Expense => &self.expense_by_category,
        }
    }

    pub fn category_total(&self, kind: TransactionKind, category: &str) -> Decimal {
        self.by_category(kind)
            .get(category)
            .copied()
            .unwrap_or_default()
    }

    /// Expense total for one category.
    pub fn spent(&self, category: &str) -> Decimal {
        self.category_total(TransactionKind::Expense, category)
    }

    /// Percentage of the kind's total that `category` accounts for; zero when nothing was recorded.
    pub fn share(&self, kind: TransactionKind, category: &str) -> Decimal {
        let total = match kind {
            TransactionKind::Income => self.income,
            TransactionKind::Expense => self.expense,
        };
        self.category_total(kind, category)
            .checked_div(total)
            .map_or(Decimal::ZERO, |ratio| ratio * Decimal::ONE_HUNDRED)
    }

    /// Categories of one kind ordered by amount, largest first (ties by name).
    pub fn ranked(&self, kind: TransactionKind) -> Vec<(&str, Decimal)> {
        let mut rows: Vec<(&str, Decimal)> = self
            .by_category(kind)
            .iter()
            .map(|(name, amount)| (name.as_str(), *amount))
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        rows
    }
}

pub fn net_balance<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Decimal {
    transactions.into_iter().map(Transaction::signed_amount).sum()
}

/// Progress toward a limit clamped to `[.., 1]`, and whether the limit is exceeded.
/// A missing or zero limit means unlimited: progress 0, never over budget.
pub fn utilization(spent: Decimal, limit: Option<Decimal>) -> (Decimal, bool) {
    match limit.filter(|l| *l > Decimal::ZERO) {
        Some(limit) => {
            let ratio = spent.checked_div(limit).unwrap_or(Decimal::ONE);
            (ratio.min(Decimal::ONE), spent > limit)
        }
        None => (Decimal::ZERO, false),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetStatus {
    pub category: String,
    pub spent: Decimal,
    pub limit: Option<Decimal>,
    pub progress: Decimal,
    pub over_budget: bool,
}

impl BudgetStatus {
    pub fn new(category: impl Into<String>, spent: Decimal, limit: Option<Decimal>) -> Self {
        let (progress, over_budget) = utilization(spent, limit);
        Self {
            category: category.into(),
            spent,
            limit: limit.filter(|l| !l.is_zero()),
            progress,
            over_budget,
        }
    }

    /// What is left before the limit is hit; negative once over budget.
    pub fn remaining(&self) -> Option<Decimal> {
        self.limit.map(|limit| limit - self.spent)
    }
}

/// One row per conventional expense category, followed by any other category
/// that has a limit or spending, in name order.
pub fn budget_report(totals: &Totals, budgets: &Budgets) -> Vec<BudgetStatus> {
    let mut rows: Vec<BudgetStatus> = EXPENSE_CATEGORIES
        .iter()
        .map(|c| BudgetStatus::new(*c, totals.spent(c), budgets.get(*c).copied()))
        .collect();

    let mut extra: Vec<&str> = budgets
        .keys()
        .chain(totals.expense_by_category.keys())
        .map(String::as_str)
        .filter(|c| !EXPENSE_CATEGORIES.contains(c))
        .collect();
    extra.sort_unstable();
    extra.dedup();

    rows.extend(
        extra
            .into_iter()
            .map(|c| BudgetStatus::new(c, totals.spent(c), budgets.get(c).copied())),
    );
    rows
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Expense,
    Income,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "expense" | "expenses" | "e" => Some(Self::Expense),
            "income" | "i" => Some(Self::Income),
            _ => None,
        }
    }

    pub fn all() -> &'static [TransactionKind] {
        &[Self::Expense, Self::Income]
    }

    /// Sign applied to the amount when computing a net balance.
    pub fn sign(&self) -> Decimal {
        match self {
            Self::Expense => Decimal::NEGATIVE_ONE,
            Self::Income => Decimal::ONE,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single recorded money movement.
///
/// Field names match the persisted `transactions` blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub amount: Decimal,
    pub category: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
}

impl Transaction {
    pub fn is_income(&self) -> bool {
        self.kind == TransactionKind::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }

    /// Amount with the kind's sign applied: income positive, expense negative.
    pub fn signed_amount(&self) -> Decimal {
        self.amount * self.kind.sign()
    }

    pub fn note_or_empty(&self) -> &str {
        self.note.as_deref().unwrap_or("")
    }
}

/// Everything a caller supplies to record a transaction; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub amount: Decimal,
    pub category: String,
    pub date: DateTime<Utc>,
    pub note: Option<String>,
    pub kind: TransactionKind,
}

impl NewTransaction {
    pub fn new(kind: TransactionKind, amount: Decimal, category: impl Into<String>) -> Self {
        Self {
            amount,
            category: category.into(),
            date: Utc::now(),
            note: None,
            kind,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub(crate) fn into_transaction(self, id: String) -> Transaction {
        Transaction {
            id,
            amount: self.amount,
            category: self.category,
            date: self.date,
            note: self.note,
            kind: self.kind,
        }
    }
}

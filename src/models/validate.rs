use rust_decimal::Decimal;
use std::str::FromStr;

use super::{NewTransaction, TransactionKind};
use crate::error::ValidationError;

/// Parse a user-entered amount such as `"12.50"`, `"$1,200"` or `" 3 "`.
pub fn parse_amount(text: &str) -> Result<Decimal, ValidationError> {
    let cleaned = text.trim().replace(['$', ','], "");
    if cleaned.is_empty() {
        return Err(ValidationError::InvalidAmount(text.to_string()));
    }
    let amount =
        Decimal::from_str(&cleaned).map_err(|_| ValidationError::InvalidAmount(text.to_string()))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ValidationError::NegativeAmount(amount));
    }
    Ok(amount)
}

/// Validate a budget limit entered by the user. Zero is allowed and clears the limit.
pub fn parse_budget_limit(text: &str) -> Result<Decimal, ValidationError> {
    parse_amount(text)
}

impl NewTransaction {
    /// Build a transaction request from raw form input, dated now.
    pub fn parse(
        kind: TransactionKind,
        amount: &str,
        category: &str,
        note: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let amount = parse_amount(amount)?;
        let category = category.trim();
        if category.is_empty() {
            return Err(ValidationError::MissingCategory);
        }
        let mut txn = NewTransaction::new(kind, amount, category);
        if let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) {
            txn = txn.with_note(note);
        }
        Ok(txn)
    }
}

use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Monthly spending limit per category. A missing entry means "no limit".
pub type Budgets = BTreeMap<String, Decimal>;

/// Drop entries that carry no limit so absence stays the only "unlimited" form.
pub(crate) fn normalize(budgets: &mut Budgets) -> usize {
    let before = budgets.len();
    budgets.retain(|_, limit| !limit.is_zero());
    before - budgets.len()
}

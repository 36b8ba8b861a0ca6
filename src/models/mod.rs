mod budget;
mod category;
mod transaction;
mod validate;

pub use budget::Budgets;
pub(crate) use budget::normalize as normalize_budgets;
pub use category::{categories_for, find_category, EXPENSE_CATEGORIES, INCOME_CATEGORIES};
pub use transaction::{NewTransaction, Transaction, TransactionKind};
pub use validate::{parse_amount, parse_budget_limit};

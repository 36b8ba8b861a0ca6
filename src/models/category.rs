use super::TransactionKind;

pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Alquiler",
    "Luz",
    "Agua",
    "Internet",
    "Subscripciones",
    "Comida",
    "Salud",
    "Otros",
    "Casa",
    "Deporte",
    "Transporte",
    "Delivery",
    "Ocio",
    "Regalos",
    "3D",
];

pub const INCOME_CATEGORIES: &[&str] = &["Sueldo", "Devuelta", "Hustle", "Otros"];

/// The conventional category list for a transaction kind.
pub fn categories_for(kind: TransactionKind) -> &'static [&'static str] {
    match kind {
        TransactionKind::Expense => EXPENSE_CATEGORIES,
        TransactionKind::Income => INCOME_CATEGORIES,
    }
}

/// Find a conventional category by name (case-insensitive), returning its canonical spelling.
pub fn find_category(kind: TransactionKind, name: &str) -> Option<&'static str> {
    let lower = name.trim().to_lowercase();
    categories_for(kind)
        .iter()
        .copied()
        .find(|c| c.to_lowercase() == lower)
}

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Dollar amount rounded to cents with thousands separators, e.g. `-$1,234.50`.
pub(crate) fn format_amount(val: Decimal) -> String {
    let cents = val.abs().round_dp(2);
    let text = format!("{cents:.2}");
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if val.is_sign_negative() && !cents.is_zero() { "-" } else { "" };
    format!("{sign}${grouped}.{frac}")
}

/// A budget limit, or `∞` when there is none.
pub(crate) fn format_limit(limit: Option<Decimal>) -> String {
    limit.map_or_else(|| "∞".to_string(), format_amount)
}

/// At most `max` characters; longer text ends in `…`.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some(_) if max == 0 => String::new(),
        Some(_) => {
            let kept: String = s.chars().take(max - 1).collect();
            format!("{kept}…")
        }
    }
}

/// Fixed-width bar for a progress ratio in `[0, 1]`, e.g. `[#####-----]`.
pub(crate) fn progress_bar(progress: Decimal, width: usize) -> String {
    let ratio = progress
        .max(Decimal::ZERO)
        .min(Decimal::ONE)
        .to_f64()
        .unwrap_or(0.0);
    let filled = ((ratio * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

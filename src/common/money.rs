// Money amounts in smallest-currency-unit integers

/// Donation amount in cents. All comparisons, minimums, and arithmetic
/// happen on this integer type; fractional dollars exist only in display
/// formatting.
pub type Cents = i64;

/// Parse a whole-dollar amount string (e.g. "50" or "13.37") into cents.
///
/// Returns `None` for unparseable input or amounts below `minimum_dollars`.
pub fn parse_amount_dollars(raw: &str, minimum_dollars: i64) -> Option<Cents> {
    let parsed = raw.trim().parse::<f64>().ok()?;
    if !parsed.is_finite() || parsed < minimum_dollars as f64 {
        return None;
    }
    Some((parsed * 100.0).round() as Cents)
}

/// Format cents as a dollar string with thousands separators: `$1,337.00`.
pub fn format_dollars(amount: Cents) -> String {
    let negative = amount < 0;
    let amount = amount.unsigned_abs();
    let dollars = amount / 100;
    let cents = amount % 100;

    let digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if negative {
        format!("-${}.{:02}", grouped, cents)
    } else {
        format!("${}.{:02}", grouped, cents)
    }
}

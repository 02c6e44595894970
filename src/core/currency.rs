//! Rupiah formatting.

/// Whole rupiah. The backend never stores fractional amounts.
pub type Amount = i64;

/// Formats an amount the way the `id-ID` locale renders IDR with no fraction
/// digits, e.g. `Rp 50.000` and `-Rp 40.000`.
pub fn format_rupiah(amount: Amount) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if amount < 0 {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

//! Amounts in words, Indian numbering (thousand, lakh, crore).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

const ONES: [&str; 20] = [
    "", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten", "Eleven",
    "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen", "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

fn spell(n: u128) -> String {
    fn join(head: String, unit: &str, rest: u128) -> String {
        if rest == 0 {
            format!("{head} {unit}")
        } else {
            format!("{head} {unit} {}", spell(rest))
        }
    }

    match n {
        0 => String::new(),
        1..=19 => ONES[n as usize].to_string(),
        20..=99 => {
            let tens = TENS[(n / 10) as usize];
            match n % 10 {
                0 => tens.to_string(),
                ones => format!("{tens} {}", ONES[ones as usize]),
            }
        }
        100..=999 => join(ONES[(n / 100) as usize].to_string(), "Hundred", n % 100),
        1_000..=99_999 => join(spell(n / 1_000), "Thousand", n % 1_000),
        100_000..=9_999_999 => join(spell(n / 100_000), "Lakh", n % 100_000),
        _ => join(spell(n / 10_000_000), "Crore", n % 10_000_000),
    }
}

/// `1234.5` becomes `"One Thousand Two Hundred Thirty Four Rupees and Fifty Paise Only"`.
///
/// Paise are rounded to the nearest whole paisa. Negative amounts are
/// prefixed with `"Minus"`. Any `Decimal` can be spelled; past a crore the
/// crore count itself is spelled in the same system.
pub fn amount_in_words(amount: Decimal) -> String {
    let abs = amount.abs();
    let mut rupees = abs.trunc().to_u128().unwrap_or_default();
    let mut paise = (abs.fract() * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u128()
        .unwrap_or_default();
    if paise == 100 {
        rupees += 1;
        paise = 0;
    }
    if rupees == 0 && paise == 0 {
        return "Zero Rupees Only".to_string();
    }

    let mut out = String::new();
    if amount.is_sign_negative() {
        out.push_str("Minus ");
    }
    if rupees == 0 {
        out.push_str("Zero");
    } else {
        out.push_str(&spell(rupees));
    }
    out.push_str(" Rupees");
    if paise > 0 {
        out.push_str(" and ");
        out.push_str(&spell(paise));
        out.push_str(" Paise");
    }
    out.push_str(" Only");
    out
}

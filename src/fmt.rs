use rust_decimal::prelude::*;

fn group_thousands(int_part: &str) -> String {
    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

/// Format an amount with thousands separators and two decimals: 1,234.56
pub fn money(val: Decimal) -> String {
    let rounded = val.abs().round_dp(2);
    let fixed = format!("{rounded:.2}");
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if val.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}{}.{dec_part}", group_thousands(int_part))
}

/// Short form for dashboards: 1.23M, 4.56K, 789.00
pub fn compact(val: Decimal) -> String {
    let abs = val.abs();
    let million = Decimal::from(1_000_000);
    let thousand = Decimal::from(1_000);
    if abs >= million {
        format!("{:.2}M", (val / million).round_dp(2))
    } else if abs >= thousand {
        format!("{:.2}K", (val / thousand).round_dp(2))
    } else {
        format!("{:.2}", val.round_dp(2))
    }
}

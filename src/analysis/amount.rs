//! Token amount helpers
//!
//! Single transfers are `uint256` on chain. Running sums are widened to 512
//! bits so summation never overflows; floats appear only when a final
//! ratio is taken.

use alloy_primitives::{U256, U512};

/// Parse a base-unit amount given as a decimal or `0x`-prefixed hex string.
///
/// Returns `None` for anything that is not a non-negative integer fitting in
/// 256 bits.
pub fn parse_amount(raw: &str) -> Option<U256> {
    let raw = raw.trim();
    let (digits, radix) = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (raw, 10),
    };

    if digits.is_empty() {
        return None;
    }
    let valid = if radix == 16 {
        digits.chars().all(|c| c.is_ascii_hexdigit())
    } else {
        digits.chars().all(|c| c.is_ascii_digit())
    };
    if !valid {
        return None;
    }

    U256::from_str_radix(digits, radix).ok()
}

/// Widen a single amount into the summation type
pub fn widen(amount: U256) -> U512 {
    let mut limbs = [0u64; 8];
    limbs[..4].copy_from_slice(amount.as_limbs());
    U512::from_limbs(limbs)
}

/// Lossy conversion for statistics; most significant limb first so the
/// rounding sequence is fixed.
pub fn to_f64(value: &U512) -> f64 {
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, &limb| acc * 18_446_744_073_709_551_616.0 + limb as f64)
}

/// Exact `numerator / denominator` as a float, `0.0` for a zero denominator
pub fn ratio(numerator: &U512, denominator: &U512) -> f64 {
    if denominator.is_zero() {
        return 0.0;
    }
    to_f64(numerator) / to_f64(denominator)
}

/// Render a base-unit amount with `decimals` fractional digits, trimming
/// trailing zeros but keeping at least one (`1500000000000000000` -> `1.5`).
pub fn format_units(value: &U512, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };

    let (whole, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1000"), Some(U256::from(1000u64)));
        assert_eq!(parse_amount("0x3e8"), Some(U256::from(1000u64)));
        assert_eq!(parse_amount(" 42 "), Some(U256::from(42u64)));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("0x"), None);
        assert_eq!(parse_amount("-5"), None);
        assert_eq!(parse_amount("1.5"), None);
        assert_eq!(parse_amount("1e18"), None);
    }

    #[test]
    fn test_parse_amount_beyond_u64() {
        // 2^70
        let amount = parse_amount("1180591620717411303424").unwrap();
        assert!(amount > U256::from(u64::MAX));
        assert_eq!(amount.to_string(), "1180591620717411303424");
    }

    #[test]
    fn test_widen_and_to_f64() {
        let wide = widen(U256::MAX);
        assert_eq!(wide.to_string(), U256::MAX.to_string());
        assert_eq!(to_f64(&U512::from(12345u64)), 12345.0);
        let two_pow_70 = widen(parse_amount("1180591620717411303424").unwrap());
        assert_eq!(to_f64(&two_pow_70), 2f64.powi(70));
    }

    #[test]
    fn test_ratio_zero_denominator() {
        assert_eq!(ratio(&U512::from(5u64), &U512::ZERO), 0.0);
        assert_eq!(ratio(&U512::from(1u64), &U512::from(4u64)), 0.25);
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(&U512::from(1_500_000_000_000_000_000u64), 18), "1.5");
        assert_eq!(format_units(&U512::from(1_000_000_000_000_000_000u64), 18), "1.0");
        assert_eq!(format_units(&U512::from(1u64), 18), "0.000000000000000001");
        assert_eq!(format_units(&U512::ZERO, 18), "0.0");
        assert_eq!(format_units(&U512::from(1234u64), 0), "1234");
        assert_eq!(format_units(&U512::from(1234u64), 2), "12.34");
    }
}

//! Numeric value to ASCII conversion.
//!
//! Pure digit-extraction routines with no buffer dependency. Integer
//! conversion walks the magnitude in the requested radix; floating
//! conversion normalizes the value into `[1, 10)` by decimal-order jumps
//! and extracts one digit at a time, never calling into a platform
//! formatting routine.

/// Rendering mode for [`float_body`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatMode {
    /// Fixed-point (`%f`).
    Plain,
    /// Exponential notation (`%e`, `%E`).
    Exp,
    /// Fixed or exponential depending on the exponent (`%g`, `%G`).
    General,
}

/// Number of significant digits in a 64-bit float. Digit extraction past
/// this always yields `'0'`.
const MAX_SIGNIFICANT: u32 = 16;

/// Renders `value` in `base` most-significant-digit-first.
///
/// Digits are zero-padded on the left to `min_digits`. When `group` is
/// set, the separator is inserted every three digits counted from the
/// least-significant end, after any zero padding.
pub(crate) fn integer_digits(
    mut value: u64,
    base: u32,
    charset: &[u8; 16],
    min_digits: usize,
    group: Option<u8>,
) -> Vec<u8> {
    let base = u64::from(base);
    // Least-significant-first, reversed at the end.
    let mut out = Vec::with_capacity(min_digits.max(20));
    loop {
        out.push(charset[(value % base) as usize]);
        value /= base;
        if value == 0 {
            break;
        }
    }
    while out.len() < min_digits {
        out.push(b'0');
    }
    if let Some(sep) = group {
        let mut grouped = Vec::with_capacity(out.len() + out.len() / 3);
        for (i, &digit) in out.iter().enumerate() {
            if i > 0 && i % 3 == 0 {
                grouped.push(sep);
            }
            grouped.push(digit);
        }
        out = grouped;
    }
    out.reverse();
    out
}

/// Returns the ASCII code for the leading digit of `value`, which must be
/// in `[0, 10)`, then renormalizes `value` by a factor of ten.
///
/// The counter is incremented each call; past [`MAX_SIGNIFICANT`] digits
/// `'0'` is always returned.
fn get_digit(value: &mut f64, count: &mut u32) -> u8 {
    if *count >= MAX_SIGNIFICANT {
        *count += 1;
        return b'0';
    }
    *count += 1;
    let digit = *value as u8;
    *value = (*value - f64::from(digit)) * 10.0;
    b'0' + digit
}

/// Renders a non-negative floating value, sign included, without any
/// width padding.
///
/// `precision` is the digit count after the decimal point (already
/// decremented by one for [`FloatMode::General`]). Magnitudes whose
/// base-10 exponent falls outside ±350 render as the literal `NaN`
/// overflow placeholder, dropping the sign.
pub(crate) fn float_body(
    mut value: f64,
    sign: Option<u8>,
    mut precision: i32,
    mode: FloatMode,
    alternate_form: bool,
    alt_form2: bool,
    lowercase: bool,
) -> Vec<u8> {
    let mut rounder = 0.5;
    let mut idx = precision;
    while idx > 0 {
        rounder *= 0.1;
        idx -= 1;
    }
    if mode == FloatMode::Plain {
        value += rounder;
    }

    // Normalize to 10.0 > value >= 1.0 while tracking the exponent.
    let mut exp = 0i32;
    if value > 0.0 {
        while value >= 1e32 && exp <= 350 {
            value *= 1e-32;
            exp += 32;
        }
        while value >= 1e8 && exp <= 350 {
            value *= 1e-8;
            exp += 8;
        }
        while value >= 10.0 && exp <= 350 {
            value *= 0.1;
            exp += 1;
        }
        while value < 1e-8 && exp >= -350 {
            value *= 1e8;
            exp -= 8;
        }
        while value < 1.0 && exp >= -350 {
            value *= 10.0;
            exp -= 1;
        }
        if exp > 350 || exp < -350 {
            return b"NaN".to_vec();
        }
    }

    let force_exp_suffix = mode == FloatMode::Exp;
    if mode != FloatMode::Plain {
        // Round after normalization and re-check for a carry into the
        // next magnitude.
        value += rounder;
        if value >= 10.0 {
            value *= 0.1;
            exp += 1;
        }
    }

    // General picks fixed or exponential from the exponent; fixed output
    // strips trailing zeros unless the alternate form keeps them.
    let strip_zeros;
    let exp_mode;
    if mode == FloatMode::General {
        strip_zeros = !alternate_form;
        if exp < -4 || exp > precision {
            exp_mode = true;
        } else {
            precision -= exp;
            exp_mode = false;
        }
    } else {
        strip_zeros = false;
        exp_mode = mode == FloatMode::Exp;
    }
    let mut e2 = if exp_mode { 0 } else { exp };

    let mut out = Vec::with_capacity(precision.max(0) as usize + 16);
    let mut nsd = 0u32;
    let show_dp = precision > 0 || alternate_form || alt_form2;

    if let Some(s) = sign {
        out.push(s);
    }
    // Digits prior to the decimal point.
    if e2 < 0 {
        out.push(b'0');
    } else {
        while e2 >= 0 {
            out.push(get_digit(&mut value, &mut nsd));
            e2 -= 1;
        }
    }
    if show_dp {
        out.push(b'.');
    }
    // Zero digits between the decimal point and the first significant
    // digit of a small number.
    e2 += 1;
    while e2 < 0 && precision > 0 {
        out.push(b'0');
        precision -= 1;
        e2 += 1;
    }
    // Significant digits after the decimal point.
    while precision > 0 {
        out.push(get_digit(&mut value, &mut nsd));
        precision -= 1;
    }
    // Remove trailing zeros and a trailing lone decimal point.
    if strip_zeros && show_dp {
        while out.last() == Some(&b'0') {
            out.pop();
        }
        if out.last() == Some(&b'.') {
            if alt_form2 {
                out.push(b'0');
            } else {
                out.pop();
            }
        }
    }
    // The exponent suffix: letter, explicit sign, two or three digits.
    if force_exp_suffix || (exp_mode && exp != 0) {
        out.push(if lowercase { b'e' } else { b'E' });
        let mut e = exp;
        if e < 0 {
            out.push(b'-');
            e = -e;
        } else {
            out.push(b'+');
        }
        if e >= 100 {
            out.push(b'0' + (e / 100) as u8);
            e %= 100;
        }
        out.push(b'0' + (e / 10) as u8);
        out.push(b'0' + (e % 10) as u8);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::table::{DIGITS_LOWER, DIGITS_UPPER};

    fn s(v: Vec<u8>) -> String {
        String::from_utf8(v).unwrap()
    }

    #[test]
    fn test_integer_decimal() {
        assert_eq!(s(integer_digits(0, 10, DIGITS_UPPER, 0, None)), "0");
        assert_eq!(s(integer_digits(12345, 10, DIGITS_UPPER, 0, None)), "12345");
    }

    #[test]
    fn test_integer_min_digits() {
        assert_eq!(s(integer_digits(42, 10, DIGITS_UPPER, 5, None)), "00042");
    }

    #[test]
    fn test_integer_hex_charsets() {
        assert_eq!(s(integer_digits(0xBEEF, 16, DIGITS_LOWER, 0, None)), "beef");
        assert_eq!(s(integer_digits(0xBEEF, 16, DIGITS_UPPER, 0, None)), "BEEF");
    }

    #[test]
    fn test_integer_octal() {
        assert_eq!(s(integer_digits(8, 8, DIGITS_UPPER, 0, None)), "10");
    }

    #[test]
    fn test_integer_grouping() {
        assert_eq!(
            s(integer_digits(1234567, 10, DIGITS_UPPER, 0, Some(b','))),
            "1,234,567"
        );
        assert_eq!(s(integer_digits(100, 10, DIGITS_UPPER, 0, Some(b','))), "100");
    }

    #[test]
    fn test_integer_grouping_after_zero_pad() {
        assert_eq!(
            s(integer_digits(1, 10, DIGITS_UPPER, 4, Some(b','))),
            "0,001"
        );
    }

    #[test]
    fn test_integer_u64_max() {
        assert_eq!(
            s(integer_digits(u64::MAX, 10, DIGITS_UPPER, 0, None)),
            "18446744073709551615"
        );
    }

    #[test]
    fn test_float_plain() {
        let body = float_body(3.14159, None, 6, FloatMode::Plain, false, false, true);
        assert_eq!(s(body), "3.141590");
    }

    #[test]
    fn test_float_plain_zero_precision() {
        let body = float_body(3.7, None, 0, FloatMode::Plain, false, false, true);
        assert_eq!(s(body), "4");
    }

    #[test]
    fn test_float_rounding_carries() {
        let body = float_body(9.9999, None, 2, FloatMode::Plain, false, false, true);
        assert_eq!(s(body), "10.00");
    }

    #[test]
    fn test_float_with_sign() {
        let body = float_body(2.5, Some(b'-'), 1, FloatMode::Plain, false, false, true);
        assert_eq!(s(body), "-2.5");
    }

    #[test]
    fn test_float_zero() {
        let body = float_body(0.0, None, 6, FloatMode::Plain, false, false, true);
        assert_eq!(s(body), "0.000000");
    }

    #[test]
    fn test_exp_mode() {
        let body = float_body(1234.5, None, 2, FloatMode::Exp, false, false, true);
        assert_eq!(s(body), "1.23e+03");
    }

    #[test]
    fn test_exp_mode_uppercase() {
        let body = float_body(1234.5, None, 2, FloatMode::Exp, false, false, false);
        assert_eq!(s(body), "1.23E+03");
    }

    #[test]
    fn test_exp_zero_exponent_keeps_suffix() {
        let body = float_body(5.0, None, 2, FloatMode::Exp, false, false, true);
        assert_eq!(s(body), "5.00e+00");
    }

    #[test]
    fn test_general_small_magnitude_uses_exp() {
        // Default precision 6 arrives as 5 after the general-mode decrement.
        let body = float_body(0.00001234, None, 5, FloatMode::General, false, false, true);
        assert_eq!(s(body), "1.234e-05");
    }

    #[test]
    fn test_general_strips_trailing_zeros() {
        let body = float_body(2.5, None, 5, FloatMode::General, false, false, true);
        assert_eq!(s(body), "2.5");
    }

    #[test]
    fn test_general_whole_number_strips_point() {
        let body = float_body(4.0, None, 5, FloatMode::General, false, false, true);
        assert_eq!(s(body), "4");
    }

    #[test]
    fn test_general_alt_form2_keeps_one_zero() {
        let body = float_body(4.0, None, 5, FloatMode::General, true, true, true);
        // Alternate form disables stripping entirely; the bang form alone
        // keeps a single zero after the point.
        assert_eq!(s(body), "4.00000");
        let body = float_body(4.0, None, 5, FloatMode::General, false, true, true);
        assert_eq!(s(body), "4.0");
    }

    #[test]
    fn test_overflow_renders_placeholder() {
        let body = float_body(1e308 * 10.0, None, 6, FloatMode::Plain, false, false, true);
        assert_eq!(s(body), "NaN");
    }

    #[test]
    fn test_significant_digit_cap() {
        let body = float_body(
            1.2345678901234567890,
            None,
            20,
            FloatMode::Plain,
            false,
            false,
            true,
        );
        let text = s(body);
        // Sixteen significant digits, then zeros.
        assert_eq!(text.len(), 22);
        assert!(text.ends_with("0000"));
        assert!(text.starts_with("1.23456789012345"));
    }

    #[test]
    fn test_three_digit_exponent() {
        let body = float_body(1e120, None, 1, FloatMode::Exp, false, false, true);
        assert_eq!(s(body), "1.0e+120");
    }
}

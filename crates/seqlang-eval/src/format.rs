//! Output formatting for values and `print` string literals.

use crate::value::{Num, Seq, Var};
use std::fmt;

/// Fractional digits kept when printing a `Real`.
pub const REAL_FRACTION_DIGITS: usize = 12;

/// Magnitudes at or below this print in scientific notation.
const SCIENTIFIC_BELOW: f64 = 1e-4;
/// Magnitudes at or above this print in scientific notation.
const SCIENTIFIC_ABOVE: f64 = 1e8;

// ══════════════════════════════════════════════════════════════════════════════
// Numbers
// ══════════════════════════════════════════════════════════════════════════════

/// Format a double the way `out` prints it.
///
/// The exact decimal value of `v` is rounded half-up to
/// [`REAL_FRACTION_DIGITS`] fractional digits and trailing zeros are dropped.
/// Very small and very large magnitudes use `1.5E+8` / `1E-5` notation.
pub fn format_real(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let (digits, int_len) = rounded_digits(v.abs());
    let Some(first) = digits.iter().position(|&d| d != 0) else {
        return "0".to_string();
    };
    let sign = if v < 0.0 { "-" } else { "" };
    let magnitude = v.abs();

    if magnitude <= SCIENTIFIC_BELOW || magnitude >= SCIENTIFIC_ABOVE {
        let significant = trim_trailing_zeros(&digits[first..]);
        let exponent = int_len as i64 - 1 - first as i64;
        let mut mantissa = digit_string(&significant[..1]);
        if significant.len() > 1 {
            mantissa.push('.');
            mantissa.push_str(&digit_string(&significant[1..]));
        }
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        return format!("{sign}{mantissa}E{exp_sign}{}", exponent.abs());
    }

    let int_part = digit_string(&digits[..int_len]);
    let frac = trim_trailing_zeros(&digits[int_len..]);
    if frac.is_empty() {
        format!("{sign}{int_part}")
    } else {
        format!("{sign}{int_part}.{}", digit_string(frac))
    }
}

/// Decimal digits of `v >= 0` rounded half-up to [`REAL_FRACTION_DIGITS`]
/// places, plus the number of integer digits at the front.
fn rounded_digits(v: f64) -> (Vec<u8>, usize) {
    let exact = format!("{:.*}", exact_precision(v), v);
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));

    let mut digits: Vec<u8> = int_part.bytes().map(|b| b - b'0').collect();
    let mut int_len = digits.len();
    digits.extend(
        frac_part
            .bytes()
            .map(|b| b - b'0')
            .chain(std::iter::repeat(0))
            .take(REAL_FRACTION_DIGITS),
    );

    let round_up = frac_part
        .as_bytes()
        .get(REAL_FRACTION_DIGITS)
        .is_some_and(|&d| d >= b'5');
    if round_up {
        let mut carry = true;
        for d in digits.iter_mut().rev() {
            if *d == 9 {
                *d = 0;
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, 1);
            int_len += 1;
        }
    }
    (digits, int_len)
}

/// Number of fractional digits needed to write `v` exactly.
fn exact_precision(v: f64) -> usize {
    let biased = ((v.to_bits() >> 52) & 0x7ff) as i32;
    // Value of the least significant mantissa bit is 2^lsb.
    let lsb = if biased == 0 { -1074 } else { biased - 1075 };
    if lsb < 0 {
        (-lsb) as usize
    } else {
        0
    }
}

fn trim_trailing_zeros(digits: &[u8]) -> &[u8] {
    let end = digits.iter().rposition(|&d| d != 0).map_or(0, |i| i + 1);
    &digits[..end]
}

fn digit_string(digits: &[u8]) -> String {
    digits.iter().map(|&d| char::from(b'0' + d)).collect()
}

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => f.write_str(&format_real(*r)),
        }
    }
}

impl fmt::Display for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{ ")?;
        for (i, element) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{element}")?;
        }
        f.write_str(" }")
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => fmt::Display::fmt(n, f),
            Self::Seq(s) => fmt::Display::fmt(s, f),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// String literals
// ══════════════════════════════════════════════════════════════════════════════

/// Turn a raw `print` literal (quotes included) into the text it prints.
///
/// `\n`, `\t`, `\\` and `\"` are decoded, `\r` is dropped, and any other
/// backslash sequence is kept as written.
pub fn unescape_string(raw: &str) -> String {
    let body = raw.strip_prefix('"').unwrap_or(raw);
    let body = body.strip_suffix('"').unwrap_or(body);

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => {}
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Quote `text` as a literal that [`unescape_string`] maps back to `text`.
pub fn escape_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_reals() {
        assert_eq!(format_real(0.5), "0.5");
        assert_eq!(format_real(-2.25), "-2.25");
        assert_eq!(format_real(3.0), "3");
        assert_eq!(format_real(0.1), "0.1");
        assert_eq!(format_real(1.0 / 3.0), "0.333333333333");
        assert_eq!(format_real(2.0 / 3.0), "0.666666666667");
        assert_eq!(format_real(12345678.5), "12345678.5");
    }

    #[test]
    fn test_rounding_is_half_up_on_the_exact_value() {
        assert_eq!(format_real(0.1 + 0.2), "0.3");
        assert_eq!(format_real(0.9999999999999), "1");
        assert_eq!(format_real(99999999.9999999999), "1E+8");
    }

    #[test]
    fn test_rounded_zero_prints_zero() {
        assert_eq!(format_real(0.0), "0");
        assert_eq!(format_real(-0.0), "0");
        assert_eq!(format_real(1e-13), "0");
        assert_eq!(format_real(-4e-13), "0");
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(format_real(1.5e8), "1.5E+8");
        assert_eq!(format_real(1e8), "1E+8");
        assert_eq!(format_real(-2.5e10), "-2.5E+10");
        assert_eq!(format_real(1e-5), "1E-5");
        assert_eq!(format_real(1e-4), "1E-4");
        assert_eq!(format_real(1.25e-6), "1.25E-6");
    }

    #[test]
    fn test_non_finite() {
        assert_eq!(format_real(f64::INFINITY), "Infinity");
        assert_eq!(format_real(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_real(f64::NAN), "NaN");
    }

    #[test]
    fn test_exact_precision() {
        assert_eq!(exact_precision(1.0), 52);
        assert_eq!(exact_precision(2f64.powi(60)), 0);
        assert_eq!(exact_precision(f64::MIN_POSITIVE / 4.0), 1074);
    }

    #[test]
    fn test_sequence_display() {
        assert_eq!(Seq::range(1, 3).to_string(), "{ 1, 2, 3 }");
        assert_eq!(Seq::empty().to_string(), "{  }");
        let mixed = Seq::from_vec(vec![Var::Num(Num::Real(0.5)), Var::Num(Num::Integer(-2))]);
        assert_eq!(Var::Seq(mixed).to_string(), "{ 0.5, -2 }");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape_string(r#""a\nb""#), "a\nb");
        assert_eq!(unescape_string(r#""tab\there""#), "tab\there");
        assert_eq!(unescape_string(r#""cr\rlf""#), "crlf");
        assert_eq!(unescape_string(r#""q\"q\\""#), "q\"q\\");
        assert_eq!(unescape_string(r#""keep \x as is""#), "keep \\x as is");
        assert_eq!(unescape_string(r#""""#), "");
    }

    #[test]
    fn test_escape_round_trip() {
        for text in ["", "plain", "line\nbreak", "tab\t", "quote \" and \\", "é \r ok", "\\n"] {
            assert_eq!(unescape_string(&escape_string(text)), text, "round trip of {text:?}");
        }
    }
}

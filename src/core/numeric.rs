//! Conversion between operator-typed amount text and numbers.
//!
//! Operators type amounts with thousands grouping (spaces) and either a dot
//! or a comma as the decimal separator. Parsing never fails: anything that
//! does not yield a number reads as `0`.

/// Separator inserted between thousands groups.
pub const GROUP_SEPARATOR: char = ' ';

/// The parts of a numeric string that survive sanitisation.
#[derive(Debug, Default, PartialEq, Eq)]
struct NumericParts {
    negative: bool,
    integer: String,
    fraction: Option<String>,
}

/// Keep digits, the first decimal separator and a leading minus.
///
/// A minus counts as leading when no digit or separator has been kept yet.
fn sanitize(text: &str) -> NumericParts {
    let mut parts = NumericParts::default();
    let mut started = false;
    for c in text.chars() {
        match c {
            '-' if !started && !parts.negative => parts.negative = true,
            '0'..='9' => {
                started = true;
                match parts.fraction.as_mut() {
                    Some(fraction) => fraction.push(c),
                    None => parts.integer.push(c),
                }
            }
            '.' | ',' => {
                started = true;
                if parts.fraction.is_none() {
                    parts.fraction = Some(String::new());
                }
            }
            _ => {}
        }
    }
    let trimmed = parts.integer.trim_start_matches('0');
    if trimmed.len() != parts.integer.len() {
        parts.integer = if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        };
    }
    parts
}

fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(GROUP_SEPARATOR);
        }
        out.push(c);
    }
    out
}

/// Parse operator-typed amount text.
///
/// Whitespace (grouping) is ignored, a comma reads as the decimal point,
/// and unparsable or empty input yields `0.0`.
///
/// # Examples
///
/// ```
/// use exchange_desk::core::numeric::parse_amount;
///
/// assert_eq!(parse_amount("10 000,5"), 10000.5);
/// assert_eq!(parse_amount("abc"), 0.0);
/// ```
pub fn parse_amount(text: &str) -> f64 {
    let parts = sanitize(text);
    let fraction = parts.fraction.as_deref().unwrap_or("");
    if parts.integer.is_empty() && fraction.is_empty() {
        return 0.0;
    }
    let mut canonical = String::with_capacity(parts.integer.len() + fraction.len() + 3);
    if parts.negative {
        canonical.push('-');
    }
    if parts.integer.is_empty() {
        canonical.push('0');
    } else {
        canonical.push_str(&parts.integer);
    }
    if !fraction.is_empty() {
        canonical.push('.');
        canonical.push_str(fraction);
    }
    canonical
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Clean up a keystroke-by-keystroke edit and regroup the integer part.
///
/// An in-progress trailing decimal point or partial fraction is preserved,
/// so `"1234."` becomes `"1 234."`.
pub fn format_for_edit(text: &str) -> String {
    let parts = sanitize(text);
    let mut out = String::new();
    if parts.negative {
        out.push('-');
    }
    match (&parts.fraction, parts.integer.is_empty()) {
        (Some(_), true) => out.push('0'),
        _ => out.push_str(&group_digits(&parts.integer)),
    }
    if let Some(fraction) = &parts.fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// Render a computed value for a read-back field.
///
/// Integral values show no decimals, fractional values exactly `decimals`
/// places. Zero, values that round to zero and non-finite values render
/// as an empty string so a cleared field stays blank.
pub fn format_for_display(value: f64, decimals: usize) -> String {
    if !value.is_finite() || value == 0.0 {
        return String::new();
    }
    let raw = if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.*}", decimals, value)
    };
    if raw.chars().all(|c| matches!(c, '-' | '0' | '.')) {
        return String::new();
    }
    let (sign, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.as_str()),
    };
    match unsigned.split_once('.') {
        Some((int_part, frac_part)) => {
            format!("{}{}.{}", sign, group_digits(int_part), frac_part)
        }
        None => format!("{}{}", sign, group_digits(unsigned)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        assert_eq!(parse_amount("1234.5"), 1234.5);
        assert_eq!(parse_amount("-42"), -42.0);
    }

    #[test]
    fn test_parse_grouped_and_comma() {
        assert_eq!(parse_amount("1 234 567,25"), 1_234_567.25);
        assert_eq!(parse_amount("1\u{a0}000"), 1000.0);
    }

    #[test]
    fn test_parse_garbage_is_zero() {
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("-"), 0.0);
        assert_eq!(parse_amount("."), 0.0);
        assert_eq!(parse_amount("RUB"), 0.0);
    }

    #[test]
    fn test_parse_second_separator_ignored() {
        assert_eq!(parse_amount("1.2.3"), 1.23);
        assert_eq!(parse_amount("1,5.5"), 1.55);
    }

    #[test]
    fn test_format_for_edit_groups() {
        assert_eq!(format_for_edit("1234567"), "1 234 567");
        assert_eq!(format_for_edit("12 34"), "1 234");
        assert_eq!(format_for_edit("100"), "100");
    }

    #[test]
    fn test_format_for_edit_keeps_partial_fraction() {
        assert_eq!(format_for_edit("1234."), "1 234.");
        assert_eq!(format_for_edit("1234,5"), "1 234.5");
        assert_eq!(format_for_edit(",5"), "0.5");
    }

    #[test]
    fn test_format_for_edit_strips_noise() {
        assert_eq!(format_for_edit("12a3b"), "123");
        assert_eq!(format_for_edit("-0012"), "-12");
        assert_eq!(format_for_edit("1-2"), "12");
        assert_eq!(format_for_edit(""), "");
    }

    #[test]
    fn test_format_for_display() {
        assert_eq!(format_for_display(3685.8638, 2), "3 685.86");
        assert_eq!(format_for_display(10000.0, 2), "10 000");
        assert_eq!(format_for_display(-1234.5, 2), "-1 234.50");
        assert_eq!(format_for_display(0.5, 4), "0.5000");
    }

    #[test]
    fn test_format_for_display_blank_values() {
        assert_eq!(format_for_display(0.0, 2), "");
        assert_eq!(format_for_display(f64::NAN, 2), "");
        assert_eq!(format_for_display(f64::INFINITY, 2), "");
    }

    #[test]
    fn test_format_for_display_rounds_to_blank() {
        assert_eq!(format_for_display(-0.001, 2), "");
        assert_eq!(format_for_display(0.004, 2), "");
        assert_eq!(format_for_display(-0.005001, 2), "-0.01");
    }

    #[test]
    fn test_edit_then_parse_keeps_value() {
        for s in ["12 345,67", "-1.", "abc9", "0007.10", "1,2,3"] {
            assert_eq!(parse_amount(&format_for_edit(s)), parse_amount(s), "input {s:?}");
        }
    }
}

//! Display formatting and parsing of field values.

/// Significant digits kept before rendering; hides binary noise such as
/// `8.400000000000001` left by unit conversions.
const SIGNIFICANT_DIGITS: usize = 12;

/// Round `v` to [`SIGNIFICANT_DIGITS`] significant digits.
#[inline]
pub fn round_significant(v: f64) -> f64 {
    if v == 0.0 || !v.is_finite() {
        return v;
    }
    format!("{:.*e}", SIGNIFICANT_DIGITS - 1, v)
        .parse::<f64>()
        .unwrap_or(v)
}

/// Render `v` with the fewest decimals that round-trip, padded to at least
/// `min_decimals` digits after the decimal point.
///
/// ```
/// use siggen_core::format::format_value;
/// assert_eq!(format_value(127.0, 0), "127");
/// assert_eq!(format_value(127.0, 1), "127.0");
/// assert_eq!(format_value(0.25, 0), "0.25");
/// ```
pub fn format_value(v: f64, min_decimals: usize) -> String {
    let mut s = format!("{}", round_significant(v));
    if s == "-0" {
        s = "0".to_string();
    }
    if min_decimals > 0 {
        let decimals = s.find('.').map_or(0, |dot| s.len() - dot - 1);
        if !s.contains('.') {
            s.push('.');
        }
        for _ in decimals..min_decimals {
            s.push('0');
        }
    }
    s
}

/// Value rendered into a device command (base units, no padding).
#[inline]
pub fn format_command_value(v: f64) -> String {
    format_value(v, 0)
}

/// Parse user-entered text. Accepts surrounding whitespace and a comma as the
/// decimal separator; rejects empty, non-numeric and non-finite input.
pub fn parse_value(text: &str) -> Option<f64> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }
    let v = if t.contains(',') && !t.contains('.') {
        t.replacen(',', ".", 1).parse::<f64>().ok()?
    } else {
        t.parse::<f64>().ok()?
    };
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(127.0, 0, "127")]
    #[case(127.0, 1, "127.0")]
    #[case(1.5, 3, "1.500")]
    #[case(8.400000000000001, 1, "8.4")]
    #[case(0.1 + 0.2, 0, "0.3")]
    #[case(-0.0, 0, "0")]
    #[case(1_000_000.0, 0, "1000000")]
    #[case(2e-6, 0, "0.000002")]
    fn formats(#[case] v: f64, #[case] min: usize, #[case] want: &str) {
        assert_eq!(format_value(v, min), want);
    }

    #[rstest]
    #[case(" 12.5 ", Some(12.5))]
    #[case("12,5", Some(12.5))]
    #[case("1e3", Some(1000.0))]
    #[case("-4", Some(-4.0))]
    #[case("", None)]
    #[case("abc", None)]
    #[case("inf", None)]
    #[case("NaN", None)]
    #[case("1,000.5", None)]
    fn parses(#[case] text: &str, #[case] want: Option<f64>) {
        assert_eq!(parse_value(text), want);
    }
}

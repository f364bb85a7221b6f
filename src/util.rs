// Utility helpers for parsing and basic statistics.
//
// This module centralizes all the "dirty" CSV/number handling and the small
// amount of numerical machinery so the rest of the code can assume clean,
// typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces, text).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters (e.g. "N/A", "..").
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(",", "");
    s.parse::<f64>().ok()
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    // CSV dates are expected in `YYYY-MM-DD` format.
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

#[derive(Debug, Clone, Copy)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_value: f64,
}

/// Ordinary least-squares fit of `y` against `x`.
///
/// Returns `None` when fewer than two points are given or when all `x`
/// values coincide (the slope is undefined). When `y` has zero variance the
/// fit is degenerate: the slope is 0 and `r_value` is defined as 0.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mean_x = average(x);
    let mean_y = average(y);
    let mut ss_xx = 0.0;
    let mut ss_yy = 0.0;
    let mut ss_xy = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        ss_xx += dx * dx;
        ss_yy += dy * dy;
        ss_xy += dx * dy;
    }
    if ss_xx == 0.0 {
        return None;
    }
    let slope = ss_xy / ss_xx;
    let intercept = mean_y - slope * mean_x;
    let r_value = if ss_yy == 0.0 {
        0.0
    } else {
        ss_xy / (ss_xx * ss_yy).sqrt()
    };
    Some(LinearFit {
        slope,
        intercept,
        r_value,
    })
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative();
    let abs_n = n.abs();
    // First, format to a plain fixed-decimal string like `1234567.89`.
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Use `num-format` to insert commas into the integer portion.
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values. This is used
    // for counts in console messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn parse_f64_safe_accepts_messy_numbers() {
        assert_eq!(parse_f64_safe(Some(" 1,234.5 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("-3.25")), Some(-3.25));
    }

    #[test]
    fn parse_f64_safe_rejects_text_and_blanks() {
        assert_eq!(parse_f64_safe(Some("N/A")), None);
        assert_eq!(parse_f64_safe(Some("..")), None);
        assert_eq!(parse_f64_safe(Some("   ")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn parse_date_safe_handles_iso_dates() {
        assert!(parse_date_safe(Some("1850-01-01")).is_some());
        assert!(parse_date_safe(Some("01/1850")).is_none());
        assert!(parse_date_safe(Some("")).is_none());
    }

    #[test]
    fn average_of_values() {
        assert!(close(average(&[1.0, 2.0, 3.0, 4.0]), 2.5));
        assert!(close(average(&[]), 0.0));
    }

    #[test]
    fn regression_recovers_exact_line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let fit = linear_regression(&x, &y).unwrap();
        assert!(close(fit.slope, 2.0));
        assert!(close(fit.intercept, 1.0));
        assert!(close(fit.r_value, 1.0));
    }

    #[test]
    fn regression_flat_series_is_degenerate() {
        let x = [0.0, 1.0, 2.0];
        let y = [4.0, 4.0, 4.0];
        let fit = linear_regression(&x, &y).unwrap();
        assert!(close(fit.slope, 0.0));
        assert!(close(fit.r_value, 0.0));
    }

    #[test]
    fn regression_needs_two_points() {
        assert!(linear_regression(&[1.0], &[2.0]).is_none());
        assert!(linear_regression(&[1.0, 1.0], &[2.0, 3.0]).is_none());
    }

    #[test]
    fn format_number_groups_thousands() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-42.5, 2), "-42.50");
    }
}

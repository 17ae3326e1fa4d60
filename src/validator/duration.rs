//! Duration literal checks for HEALTHCHECK timing flags.
//!
//! Follows the semantics of Go's `time.ParseDuration`, which the builder
//! uses: a sequence of decimal magnitudes each followed by a unit, summed,
//! with everything under one millisecond rejected.

use crate::document::Span;
use crate::types::{Diagnostic, ErrorCode};
use crate::validator::Walk;

/// Milliseconds per supported unit.
fn unit_factor(unit: &str) -> Option<f64> {
    match unit {
        "h" => Some(3_600_000.0),
        "m" => Some(60_000.0),
        "s" => Some(1_000.0),
        "ms" => Some(1.0),
        // both the micro sign and the Greek mu are accepted
        "us" | "\u{00b5}s" | "\u{03bc}s" => Some(0.001),
        "ns" => Some(0.000_001),
        _ => None,
    }
}

/// Validate one duration flag value.
pub(crate) fn check(
    walk: &Walk<'_>,
    flag_name: &str,
    value: &str,
    span: Span,
    out: &mut Vec<Diagnostic>,
) {
    let chars: Vec<char> = value.chars().collect();
    let Some(&first) = chars.first() else {
        out.push(walk.error(ErrorCode::FlagInvalidDuration, span, &[value]));
        return;
    };
    if !first.is_ascii_digit() && first != '.' && first != '-' {
        out.push(walk.error(ErrorCode::FlagInvalidDuration, span, &[value]));
        return;
    }

    let mut i = 0;
    let mut negative = false;
    if chars[0] == '-' {
        negative = true;
        i = 1;
        if chars.get(1) == Some(&'-') {
            out.push(walk.error(ErrorCode::FlagInvalidDuration, span, &[value]));
            return;
        }
    }

    let mut total_ms = 0.0f64;
    let mut pairs = 0usize;
    while i < chars.len() {
        // magnitude: a run of digits and at most one period
        let magnitude_start = i;
        let mut periods = 0;
        while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
            if chars[i] == '.' {
                periods += 1;
            }
            i += 1;
        }
        if periods > 1 {
            out.push(walk.error(ErrorCode::FlagMissingDuration, span, &[value]));
            return;
        }
        let magnitude_text: String = chars[magnitude_start..i].iter().collect();
        let Ok(magnitude) = magnitude_text.parse::<f64>() else {
            out.push(walk.error(ErrorCode::FlagInvalidDuration, span, &[value]));
            return;
        };

        // unit: everything up to the next digit or period
        let unit_start = i;
        while i < chars.len() && !chars[i].is_ascii_digit() && chars[i] != '.' {
            i += 1;
        }
        let unit: String = chars[unit_start..i].iter().collect();
        if unit.is_empty() {
            out.push(walk.error(ErrorCode::FlagMissingDuration, span, &[value]));
            return;
        }
        let Some(factor) = unit_factor(&unit) else {
            out.push(walk.error(ErrorCode::FlagUnknownUnit, span, &[&unit, value]));
            return;
        };
        total_ms += magnitude * factor;
        pairs += 1;
    }

    if pairs == 0 {
        out.push(walk.error(ErrorCode::FlagMissingDuration, span, &[value]));
        return;
    }
    if negative || total_ms < 1.0 {
        out.push(walk.error(ErrorCode::FlagLessThan1ms, span, &[flag_name]));
    }
}

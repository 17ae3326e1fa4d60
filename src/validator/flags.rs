//! Shared option checks: unknown names, duplicates, missing values and
//! boolean value shapes.

use crate::parser::{Flag, Instruction};
use crate::types::{Diagnostic, ErrorCode};
use crate::validator::Walk;
use std::collections::HashMap;

/// How a recognized flag treats its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlagKind {
    /// A value after `=` is required.
    Value,
    /// No value, or a case-insensitive `true`/`false`.
    Boolean,
}

/// A recognized flag of one instruction keyword.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FlagSpec {
    pub name: &'static str,
    pub kind: FlagKind,
}

impl FlagSpec {
    pub const fn value(name: &'static str) -> Self {
        Self {
            name,
            kind: FlagKind::Value,
        }
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self {
            name,
            kind: FlagKind::Boolean,
        }
    }
}

/// Check an instruction's flags against the recognized set.
pub(crate) fn check_flags(
    walk: &Walk<'_>,
    instruction: &Instruction,
    allowed: &[FlagSpec],
    unknown_code: ErrorCode,
    out: &mut Vec<Diagnostic>,
) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for flag in &instruction.flags {
        *counts.entry(flag.name.as_str()).or_default() += 1;
    }
    for flag in &instruction.flags {
        if counts[flag.name.as_str()] > 1 {
            out.push(walk.error(ErrorCode::FlagDuplicate, flag.name_span, &[&flag.name]));
        }
        check_flag(walk, flag, allowed, unknown_code, out);
    }
}

fn check_flag(
    walk: &Walk<'_>,
    flag: &Flag,
    allowed: &[FlagSpec],
    unknown_code: ErrorCode,
    out: &mut Vec<Diagnostic>,
) {
    let Some(spec) = allowed.iter().find(|spec| spec.name == flag.name) else {
        out.push(walk.error(unknown_code, flag.name_span, &[&flag.name]));
        return;
    };
    match spec.kind {
        FlagKind::Value => {
            if flag.value.is_none() {
                out.push(walk.error(
                    ErrorCode::FlagMissingValue,
                    flag.name_span,
                    &[&flag.name],
                ));
            }
        }
        FlagKind::Boolean => {
            if let Some(value) = &flag.value {
                if !value.is_empty()
                    && !value.eq_ignore_ascii_case("true")
                    && !value.eq_ignore_ascii_case("false")
                {
                    let span = flag.value_span.unwrap_or(flag.span);
                    out.push(walk.error(
                        ErrorCode::FlagExpectedBooleanValue,
                        span,
                        &[&flag.name, value],
                    ));
                }
            }
        }
    }
}

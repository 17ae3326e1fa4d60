//! HEALTHCHECK: type dispatch, timing flags and retries.

use crate::document::Span;
use crate::parser::Instruction;
use crate::types::{Diagnostic, ErrorCode};
use crate::validator::flags::{check_flags, FlagSpec};
use crate::validator::{duration, Walk};

const HEALTHCHECK_FLAGS: &[FlagSpec] = &[
    FlagSpec::value("interval"),
    FlagSpec::value("retries"),
    FlagSpec::value("start-interval"),
    FlagSpec::value("start-period"),
    FlagSpec::value("timeout"),
];

pub(crate) fn check(walk: &Walk<'_>, instruction: &Instruction, out: &mut Vec<Diagnostic>) {
    check_flags(
        walk,
        instruction,
        HEALTHCHECK_FLAGS,
        ErrorCode::UnknownHealthcheckFlag,
        out,
    );

    for flag in &instruction.flags {
        let Some(value) = &flag.value else { continue };
        let value_span = flag.value_span.unwrap_or(flag.span);
        match flag.name.as_str() {
            "retries" => check_retries(walk, value, value_span, out),
            "interval" | "start-interval" | "start-period" | "timeout" => {
                duration::check(walk, &flag.name, value, value_span, out);
            }
            _ => {}
        }
    }

    let args = &instruction.args;
    if args.is_empty() {
        out.push(walk.error(
            ErrorCode::ArgumentRequiresAtLeastOne,
            instruction.keyword_span,
            &[instruction.kind.canonical()],
        ));
        return;
    }

    match args[0].text.to_uppercase().as_str() {
        "NONE" => {
            // flags above NONE are tolerated; the builder ignores them
            if args.len() > 1 {
                let span = Span::new(args[1].span.start, args[args.len() - 1].span.end);
                out.push(walk.error(ErrorCode::ArgumentUnnecessary, span, &[]));
            }
        }
        "CMD" => {
            if args.len() == 1 {
                out.push(walk.error(
                    ErrorCode::HealthcheckCmdArgumentMissing,
                    args[0].span,
                    &[],
                ));
            }
        }
        other => {
            out.push(walk.error(ErrorCode::UnknownType, args[0].span, &[other]));
        }
    }
}

fn check_retries(walk: &Walk<'_>, value: &str, span: Span, out: &mut Vec<Diagnostic>) {
    match value.parse::<i64>() {
        Ok(retries) => {
            if retries < 1 {
                out.push(walk.error(
                    ErrorCode::FlagAtLeastOne,
                    span,
                    &["retries", value],
                ));
            }
        }
        Err(_) => {
            out.push(walk.error(ErrorCode::InvalidSyntax, span, &[value]));
        }
    }
}

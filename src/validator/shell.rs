//! SHELL: the arguments must form a JSON array of double-quoted strings.

use crate::parser::Instruction;
use crate::types::{Diagnostic, ErrorCode};
use crate::validator::Walk;

pub(crate) fn check(walk: &Walk<'_>, instruction: &Instruction, out: &mut Vec<Diagnostic>) {
    if instruction.args.is_empty() {
        out.push(walk.error(
            ErrorCode::ArgumentRequiresAtLeastOne,
            instruction.keyword_span,
            &[instruction.kind.canonical()],
        ));
        return;
    }
    let span = match instruction.args_span() {
        Some(span) => span,
        None => instruction.keyword_span,
    };

    let Some(json) = &instruction.json else {
        out.push(walk.error(ErrorCode::ShellJsonForm, span, &[]));
        return;
    };
    if !json.well_formed || json.close_span.is_none() || json.bad_escape.is_some() {
        out.push(walk.error(ErrorCode::ShellJsonForm, span, &[]));
        return;
    }
    if json.strings.is_empty() {
        out.push(walk.error(ErrorCode::ShellRequiresOne, span, &[]));
    }
}

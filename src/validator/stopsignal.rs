//! STOPSIGNAL: one argument, a signal name, number or substitution.

use crate::document::Span;
use crate::parser::Instruction;
use crate::types::{Diagnostic, ErrorCode};
use crate::validator::Walk;

pub(crate) fn check(walk: &Walk<'_>, instruction: &Instruction, out: &mut Vec<Diagnostic>) {
    let args = &instruction.args;
    if args.is_empty() {
        out.push(walk.error(
            ErrorCode::ArgumentRequiresOne,
            instruction.keyword_span,
            &[instruction.kind.canonical()],
        ));
        return;
    }
    if args.len() > 1 {
        let span = Span::new(args[1].span.start, args[args.len() - 1].span.end);
        out.push(walk.error(
            ErrorCode::ArgumentExtra,
            span,
            &[instruction.kind.canonical()],
        ));
    }

    let token = &args[0];
    let text = token.text.as_str();
    if text.starts_with("SIG") {
        return;
    }
    if text.contains('$') {
        // substitutions pass as long as every variable can resolve
        let unresolved = token
            .variables
            .iter()
            .any(|variable| !variable.declared && variable.value.is_none());
        if unresolved {
            out.push(walk.error(ErrorCode::InvalidSignal, token.span, &[""]));
        }
        return;
    }
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        return;
    }
    out.push(walk.error(ErrorCode::InvalidSignal, token.span, &[text]));
}

//! Detection of JSON arrays written with single quotes.
//!
//! A micro state machine over the raw argument text. Any structural
//! deviation aborts silently; only a complete single-quoted array is
//! reported.

use crate::document::Span;
use crate::parser::Instruction;
use crate::settings::RuleKey;
use crate::types::{Diagnostic, ErrorCode};
use crate::validator::Walk;

pub(crate) fn check(walk: &Walk<'_>, instruction: &Instruction, out: &mut Vec<Diagnostic>) {
    let Some(first) = instruction.args.first() else {
        return;
    };
    let span = Span::new(first.span.start, instruction.args[instruction.args.len() - 1].span.end);
    let text = walk.doc.text(span);
    if !scan(text) {
        return;
    }
    out.extend(walk.configured(
        RuleKey::InstructionJsonInSingleQuotes,
        ErrorCode::JsonInSingleQuotes,
        span,
        &[],
    ));
}

#[derive(PartialEq)]
enum State {
    Open,
    Element { first: bool },
    InString,
    AfterElement,
    Closed,
}

/// Returns true when the text is a bracketed, comma-separated list of
/// single-quoted strings.
fn scan(text: &str) -> bool {
    let mut state = State::Open;
    let mut strings = 0;
    for c in text.chars() {
        state = match (state, c) {
            (State::Open, '[') => State::Element { first: true },
            (State::Open, _) => return false,
            (State::Element { .. }, '\'') => State::InString,
            (State::Element { first: true }, ']') => State::Closed,
            (State::Element { .. }, c) if c.is_whitespace() => State::Element { first: false },
            (State::Element { .. }, _) => return false,
            (State::InString, '\'') => {
                strings += 1;
                State::AfterElement
            }
            (State::InString, _) => State::InString,
            (State::AfterElement, ',') => State::Element { first: false },
            (State::AfterElement, ']') => State::Closed,
            (State::AfterElement, c) if c.is_whitespace() => State::AfterElement,
            (State::AfterElement, _) => return false,
            (State::Closed, c) if c.is_whitespace() => State::Closed,
            (State::Closed, _) => return false,
        };
    }
    state == State::Closed && strings > 0
}

//! EXPOSE: port and protocol expressions.

use crate::parser::Instruction;
use crate::types::{Diagnostic, ErrorCode};
use crate::validator::Walk;
use once_cell::sync::Lazy;
use regex::Regex;

static PORT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9])+(-[0-9]+)?(:([0-9])+(-[0-9]*)?)?(/(\w*))?(/\w*)*$").unwrap()
});

pub(crate) fn check(walk: &Walk<'_>, instruction: &Instruction, out: &mut Vec<Diagnostic>) {
    if instruction.args.is_empty() {
        out.push(walk.error(
            ErrorCode::ArgumentRequiresAtLeastOne,
            instruction.keyword_span,
            &[instruction.kind.canonical()],
        ));
        return;
    }

    for token in &instruction.args {
        let expanded = token.expanded.as_str();
        let (stripped, quote_offset) = strip_double_quotes(expanded);

        // unresolved substitutions are the builder's problem
        if stripped.starts_with('$') {
            continue;
        }

        let Some(captures) = PORT_PATTERN.captures(stripped) else {
            out.push(walk.error(ErrorCode::InvalidPort, token.span, &[stripped]));
            continue;
        };
        if let Some(protocol) = captures.get(7) {
            let text = protocol.as_str();
            if !text.is_empty()
                && !text.eq_ignore_ascii_case("tcp")
                && !text.eq_ignore_ascii_case("udp")
                && !text.eq_ignore_ascii_case("sctp")
            {
                // map the protocol substring back when the token was
                // written verbatim, otherwise fall back to the token
                let span = if expanded == token.text {
                    token
                        .span_of(
                            quote_offset + protocol.start(),
                            quote_offset + protocol.end(),
                        )
                        .unwrap_or(token.span)
                } else {
                    token.span
                };
                out.push(walk.error(ErrorCode::InvalidProto, span, &[text]));
            }
        }
    }
}

fn strip_double_quotes(text: &str) -> (&str, usize) {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        (&text[1..text.len() - 1], 1)
    } else {
        (text, 0)
    }
}

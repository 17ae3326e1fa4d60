//! FROM: argument shape, image reference format, build stage names.

use crate::document::Span;
use crate::parser::{Instruction, Token};
use crate::types::{Diagnostic, ErrorCode};
use crate::validator::flags::{check_flags, FlagSpec};
use crate::validator::Walk;
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w][\w.-]{0,127}$").unwrap());
static STAGE_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]([a-z0-9_\-.]*)*$").unwrap());
static DIGEST_ALGORITHM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Fa-f0-9_+.-]+$").unwrap());
static DIGEST_HEX_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Fa-f0-9]+$").unwrap());

const FROM_FLAGS: &[FlagSpec] = &[FlagSpec::value("platform")];

pub(crate) fn check(walk: &Walk<'_>, instruction: &Instruction, out: &mut Vec<Diagnostic>) {
    check_flags(walk, instruction, FROM_FLAGS, ErrorCode::UnknownFromFlag, out);

    let args = &instruction.args;
    match args.len() {
        0 => {
            out.push(walk.error(
                ErrorCode::ArgumentRequiresOneOrThree,
                instruction.keyword_span,
                &[instruction.kind.canonical()],
            ));
            return;
        }
        1 | 3 => {}
        _ => {
            let trailing = Span::new(args[1].span.start, args[args.len() - 1].span.end);
            out.push(walk.error(
                ErrorCode::ArgumentRequiresOneOrThree,
                trailing,
                &[instruction.kind.canonical()],
            ));
        }
    }

    check_image(walk, instruction, &args[0], out);

    if args.len() >= 3 {
        if !args[1].text.eq_ignore_ascii_case("AS") {
            out.push(walk.error(ErrorCode::InvalidAs, args[1].span, &[]));
        }
        let name = &args[2];
        if !STAGE_NAME_PATTERN.is_match(&name.text.to_lowercase()) {
            out.push(walk.error(
                ErrorCode::InvalidBuildStageName,
                name.span,
                &[&name.text],
            ));
        }
    }
}

fn check_image(walk: &Walk<'_>, instruction: &Instruction, image: &Token, out: &mut Vec<Diagnostic>) {
    // a lone variable reference: the base name must resolve to something
    if let [variable] = image.variables.as_slice() {
        if variable.text_start == 0 && variable.text_len == image.text.len() {
            let blank = match &variable.value {
                Some(value) => value.is_empty(),
                None => !variable.declared,
            };
            if blank {
                out.push(walk.error(ErrorCode::BaseNameEmpty, image.span, &[&image.text]));
            }
            return;
        }
    }

    let Some(parts) = instruction.from else { return };

    if let Some(tag_span) = parts.tag_span {
        let tag = walk.doc.text(tag_span);
        if tag.is_empty() {
            out.push(walk.error(ErrorCode::InvalidReferenceFormat, image.span, &[]));
        } else if !tag.contains('$') && !TAG_PATTERN.is_match(tag) {
            out.push(walk.error(ErrorCode::InvalidReferenceFormat, tag_span, &[]));
        }
    }

    if let Some(digest_span) = parts.digest_span {
        let digest = walk.doc.text(digest_span);
        if digest.is_empty() {
            out.push(walk.error(ErrorCode::InvalidReferenceFormat, image.span, &[]));
        } else if !digest.contains('$') && !valid_digest(digest) {
            out.push(walk.error(ErrorCode::InvalidReferenceFormat, digest_span, &[]));
        }
    }
}

fn valid_digest(digest: &str) -> bool {
    match digest.split_once(':') {
        Some((algorithm, hex)) => {
            DIGEST_ALGORITHM_PATTERN.is_match(algorithm) && DIGEST_HEX_PATTERN.is_match(hex)
        }
        None => false,
    }
}

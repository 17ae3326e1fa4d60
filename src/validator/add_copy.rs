//! ADD and COPY: source/destination shape and option values.

use crate::parser::{Instruction, Keyword};
use crate::types::{Diagnostic, ErrorCode};
use crate::validator::flags::{check_flags, FlagSpec};
use crate::validator::Walk;
use once_cell::sync::Lazy;
use regex::Regex;

static FROM_VALUE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9].*$").unwrap());

const ADD_FLAGS: &[FlagSpec] = &[
    FlagSpec::value("checksum"),
    FlagSpec::value("chmod"),
    FlagSpec::value("chown"),
    FlagSpec::boolean("keep-git-dir"),
    FlagSpec::boolean("link"),
];

const COPY_FLAGS: &[FlagSpec] = &[
    FlagSpec::value("chmod"),
    FlagSpec::value("chown"),
    FlagSpec::value("from"),
    FlagSpec::boolean("link"),
];

pub(crate) fn check(walk: &Walk<'_>, instruction: &Instruction, out: &mut Vec<Diagnostic>) {
    let (allowed, unknown_code) = match instruction.kind {
        Keyword::Add => (ADD_FLAGS, ErrorCode::UnknownAddFlag),
        _ => (COPY_FLAGS, ErrorCode::UnknownCopyFlag),
    };
    check_flags(walk, instruction, allowed, unknown_code, out);

    if instruction.kind == Keyword::Copy {
        check_from_flag(walk, instruction, out);
    }

    // a well-formed JSON form counts its strings, anything else its tokens
    let json = instruction.json.as_ref().filter(|json| json.well_formed);
    let json_strings = json.map(|json| &json.strings[..]).unwrap_or(&[]);
    let count = if json.is_some() {
        json_strings.len()
    } else {
        instruction.args.len()
    };

    if count < 2 {
        out.push(walk.error(
            ErrorCode::ArgumentRequiresAtLeastTwo,
            instruction.keyword_span,
            &[instruction.kind.canonical()],
        ));
        return;
    }

    if count > 2 && instruction.heredocs.is_empty() {
        let (destination, destination_span) = if json.is_some() {
            let last = &json_strings[json_strings.len() - 1];
            (last.value.clone(), last.span)
        } else {
            let last = &instruction.args[instruction.args.len() - 1];
            (last.text.clone(), last.span)
        };
        if !destination.ends_with('/') && !destination.ends_with('\\') {
            // a trailing variable may expand to a separator; the offset
            // relation compensates for how quoted ranges are reported
            let abuts_variable = instruction.variables().any(|variable| {
                variable.span.end == destination_span.end
                    || variable.span.end == destination_span.end - 1
            });
            if !abuts_variable {
                out.push(walk.error(
                    ErrorCode::InvalidDestination,
                    destination_span,
                    &[instruction.kind.canonical()],
                ));
            }
        }
    }
}

fn check_from_flag(walk: &Walk<'_>, instruction: &Instruction, out: &mut Vec<Diagnostic>) {
    for flag in &instruction.flags {
        if flag.name != "from" {
            continue;
        }
        let Some(value) = &flag.value else { continue };
        if value.is_empty() {
            out.push(walk.error(ErrorCode::FlagInvalidFromValue, flag.span, &[value]));
        } else if !FROM_VALUE_PATTERN.is_match(value) {
            let span = flag.value_span.unwrap_or(flag.span);
            out.push(walk.error(ErrorCode::FlagInvalidFromValue, span, &[value]));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::document::TextDocument;
    use crate::parser;
    use crate::settings::ValidatorSettings;
    use crate::types::{ErrorCode, Range};
    use crate::validator::run;

    fn diagnostics(source: &str) -> Vec<crate::types::Diagnostic> {
        let doc = TextDocument::new(source);
        let dockerfile = parser::parse(source);
        run(&doc, &dockerfile, &ValidatorSettings::default())
    }

    fn codes(source: &str) -> Vec<ErrorCode> {
        diagnostics(source).into_iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_two_arguments_are_fine() {
        assert!(codes("FROM node\nCOPY src /app").is_empty());
        assert!(codes("FROM node\nADD src.tar.gz /app").is_empty());
    }

    #[test]
    fn test_requires_two_arguments() {
        assert_eq!(
            codes("FROM node\nCOPY src"),
            vec![ErrorCode::ArgumentRequiresAtLeastTwo]
        );
        assert_eq!(
            codes("FROM node\nCOPY [\"src\"]"),
            vec![ErrorCode::ArgumentRequiresAtLeastTwo]
        );
    }

    #[test]
    fn test_multiple_sources_need_directory_destination() {
        assert_eq!(
            codes("FROM node\nCOPY a b /dest"),
            vec![ErrorCode::InvalidDestination]
        );
        assert!(codes("FROM node\nCOPY a b /dest/").is_empty());
        // with the backtick escape directive a backslash is plain text
        assert!(codes("# escape=`\nFROM node\nCOPY a b C:\\dest\\").is_empty());
    }

    #[test]
    fn test_json_form_destination() {
        assert_eq!(
            codes("FROM node\nCOPY [\"a\", \"b\", \"/dest\"]"),
            vec![ErrorCode::InvalidDestination]
        );
        assert!(codes("FROM node\nCOPY [\"a\", \"b\", \"/dest/\"]").is_empty());
    }

    #[test]
    fn test_trailing_variable_destination_is_tolerated() {
        assert!(codes("FROM node\nARG dest\nCOPY a b ${dest}").is_empty());
    }

    #[test]
    fn test_heredoc_sources_skip_destination_rule() {
        assert!(codes("FROM node\nCOPY <<eot /dest\nhello\neot").is_empty());
    }

    #[test]
    fn test_from_flag_value() {
        assert!(codes("FROM node AS builder\nCOPY --from=builder /a /b").is_empty());
        assert!(codes("FROM node\nCOPY --from=0 /a /b").is_empty());
        let found = diagnostics("FROM alpine\nCOPY --from=^abc . .");
        assert_eq!(found[0].code, ErrorCode::FlagInvalidFromValue);
        assert_eq!(found[0].range, Range::of(1, 12, 1, 16));
    }

    #[test]
    fn test_empty_from_flag_value() {
        assert_eq!(
            codes("FROM node\nCOPY --from= /a /b"),
            vec![ErrorCode::FlagInvalidFromValue]
        );
    }

    #[test]
    fn test_add_specific_flags() {
        assert!(codes("FROM node\nADD --keep-git-dir=true repo /app/").is_empty());
        assert!(
            codes("FROM node\nADD --checksum=sha256:abc f.tar /app/").is_empty()
        );
        assert_eq!(
            codes("FROM node\nADD --from=x f /app/"),
            vec![ErrorCode::UnknownAddFlag]
        );
    }
}

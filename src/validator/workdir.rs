//! WORKDIR: paths should be absolute.

use crate::parser::{unquote, Instruction};
use crate::settings::RuleKey;
use crate::types::{Diagnostic, ErrorCode};
use crate::validator::Walk;
use once_cell::sync::Lazy;
use regex::Regex;

/// Drive-letter roots and variable-rooted paths count as absolute.
static ABSOLUTE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\$|([a-zA-Z](\$|:(\$|\\|/)))).*$").unwrap());

pub(crate) fn check(walk: &Walk<'_>, instruction: &Instruction, out: &mut Vec<Diagnostic>) {
    let args = &instruction.args;
    if args.is_empty() {
        out.push(walk.error(
            ErrorCode::ArgumentRequiresAtLeastOne,
            instruction.keyword_span,
            &[instruction.kind.canonical()],
        ));
        return;
    }

    let path = unquote(&args[0].text);
    if path.starts_with('/') || ABSOLUTE_PATTERN.is_match(&path) {
        return;
    }
    out.extend(walk.configured(
        RuleKey::InstructionWorkdirRelative,
        ErrorCode::WorkdirIsNotAbsolute,
        args[0].span,
        &[],
    ));
}

#[cfg(test)]
mod tests {
    use crate::document::TextDocument;
    use crate::parser;
    use crate::settings::{RuleKey, ValidatorSettings};
    use crate::types::{ErrorCode, Severity};
    use crate::validator::run;

    fn codes(source: &str) -> Vec<ErrorCode> {
        let doc = TextDocument::new(source);
        let dockerfile = parser::parse(source);
        run(&doc, &dockerfile, &ValidatorSettings::default())
            .into_iter()
            .map(|d| d.code)
            .collect()
    }

    #[test]
    fn test_absolute_paths() {
        assert!(codes("FROM node\nWORKDIR /app").is_empty());
        assert!(codes("FROM node\nWORKDIR \"/app\"").is_empty());
        assert!(codes("FROM node\nWORKDIR '/app'").is_empty());
        assert!(codes("FROM node\nWORKDIR $DIR").is_empty());
        assert!(codes("FROM node\nWORKDIR C:/app").is_empty());
        assert!(codes("FROM node\nWORKDIR c:$p").is_empty());
    }

    #[test]
    fn test_windows_backslash_path() {
        // the backtick escape keeps the backslashes literal
        assert!(codes("# escape=`\nFROM node\nWORKDIR C:\\app").is_empty());
    }

    #[test]
    fn test_relative_paths() {
        assert_eq!(codes("FROM node\nWORKDIR app"), vec![ErrorCode::WorkdirIsNotAbsolute]);
        assert_eq!(
            codes("FROM node\nWORKDIR ./app"),
            vec![ErrorCode::WorkdirIsNotAbsolute]
        );
    }

    #[test]
    fn test_severity_is_configurable() {
        let source = "FROM node\nWORKDIR app";
        let doc = TextDocument::new(source);
        let dockerfile = parser::parse(source);
        let settings = ValidatorSettings::new()
            .with_severity(RuleKey::InstructionWorkdirRelative, Severity::Ignore);
        assert!(run(&doc, &dockerfile, &settings).is_empty());

        let settings = ValidatorSettings::new()
            .with_severity(RuleKey::InstructionWorkdirRelative, Severity::Error);
        let diagnostics = run(&doc, &dockerfile, &settings);
        assert_eq!(diagnostics[0].severity, Severity::Error);
    }
}

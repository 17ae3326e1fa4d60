//! The validation engine.
//!
//! Walks the parsed AST and applies per-instruction rule sets, collecting
//! diagnostics into an explicit accumulator. Rules are independent: a rule
//! that does not apply never prevents later rules from running, and a
//! malformed node degrades by skipping the specific check.

use crate::document::{Span, TextDocument};
use crate::messages::format_message;
use crate::parser::{Comment, Directive, Dockerfile, Instruction, Keyword};
use crate::settings::{RuleKey, ValidatorSettings};
use crate::types::{Diagnostic, DiagnosticTag, ErrorCode, Position, Range, Severity};
use std::collections::{HashMap, HashSet};

mod add_copy;
mod duration;
mod expose;
mod flags;
mod from;
mod healthcheck;
mod json_quotes;
mod onbuild;
mod properties;
mod shell;
mod stopsignal;
mod workdir;

/// Shared read-only state for one validation walk.
pub(crate) struct Walk<'a> {
    pub doc: &'a TextDocument<'a>,
    pub escape: char,
    pub settings: &'a ValidatorSettings,
}

impl<'a> Walk<'a> {
    pub fn range(&self, span: Span) -> Range {
        self.doc.range_of(span)
    }

    /// A diagnostic at its intrinsic severity (error).
    pub fn error(&self, code: ErrorCode, span: Span, params: &[&str]) -> Diagnostic {
        Diagnostic::new(
            code,
            Severity::Error,
            self.range(span),
            format_message(code, params),
        )
    }

    /// A diagnostic gated by a configured severity. `None` when the rule
    /// is set to ignore.
    pub fn configured(
        &self,
        key: RuleKey,
        code: ErrorCode,
        span: Span,
        params: &[&str],
    ) -> Option<Diagnostic> {
        match self.settings.severity(key) {
            Severity::Ignore => None,
            severity => Some(Diagnostic::new(
                code,
                severity,
                self.range(span),
                format_message(code, params),
            )),
        }
    }
}

/// Validate a parsed Dockerfile against the given settings.
///
/// [`crate::validate`] wraps this for callers that start from source
/// text; this entry point reuses an already-parsed AST.
pub fn run(
    doc: &TextDocument<'_>,
    dockerfile: &Dockerfile,
    settings: &ValidatorSettings,
) -> Vec<Diagnostic> {
    let walk = Walk {
        doc,
        escape: dockerfile.escape,
        settings,
    };
    let mut out = Vec::new();

    check_directives(&walk, &dockerfile.directives, &mut out);
    check_source_image(&walk, &dockerfile.instructions, &mut out);
    check_stage_multiples(&walk, &dockerfile.instructions, &mut out);
    check_duplicate_stage_names(&walk, &dockerfile.instructions, &mut out);

    for instruction in &dockerfile.instructions {
        let before = out.len();
        check_instruction(&walk, instruction, true, &mut out);
        let line = doc.position_at(instruction.span.start).line;
        for diagnostic in out[before..].iter_mut() {
            if diagnostic.instruction_line.is_none() {
                diagnostic.instruction_line = Some(line);
            }
        }
    }

    suppress_ignored(doc, &dockerfile.comments, &mut out);
    log::debug!("validation produced {} diagnostic(s)", out.len());
    out
}

/// Step 1: the directive pass. Only the escape directive is validated.
fn check_directives(walk: &Walk<'_>, directives: &[Directive], out: &mut Vec<Diagnostic>) {
    let mut escape_seen = false;
    for directive in directives {
        if !directive.is_escape() {
            continue;
        }
        if escape_seen {
            out.push(walk.error(
                ErrorCode::DuplicatedEscapeDirective,
                directive.name_span,
                &[],
            ));
            continue;
        }
        escape_seen = true;
        if directive.name != directive.name.to_lowercase() {
            out.extend(walk.configured(
                RuleKey::DirectiveCasing,
                ErrorCode::CasingDirective,
                directive.name_span,
                &[],
            ));
        }
        if !matches!(directive.value.as_str(), "\\" | "`" | "") {
            out.push(walk.error(
                ErrorCode::InvalidEscapeDirective,
                directive.value_span,
                &[&directive.value],
            ));
        }
    }
}

/// Step 2: every recipe needs a source image before anything else runs.
fn check_source_image(walk: &Walk<'_>, instructions: &[Instruction], out: &mut Vec<Diagnostic>) {
    for instruction in instructions {
        match instruction.kind {
            Keyword::Arg => continue,
            Keyword::From => return,
            _ => {
                let line = walk.doc.position_at(instruction.span.start).line;
                out.push(
                    walk.error(ErrorCode::NoSourceImage, instruction.keyword_span, &[])
                        .for_instruction(line),
                );
                return;
            }
        }
    }
    out.push(Diagnostic::new(
        ErrorCode::NoSourceImage,
        Severity::Error,
        Range::new(Position::new(0, 0), Position::new(0, 0)),
        format_message(ErrorCode::NoSourceImage, &[]),
    ));
}

/// Step 3: at most one CMD, ENTRYPOINT and HEALTHCHECK per build stage.
fn check_stage_multiples(
    walk: &Walk<'_>,
    instructions: &[Instruction],
    out: &mut Vec<Diagnostic>,
) {
    #[derive(Default)]
    struct Buckets<'i> {
        cmd: Vec<&'i Instruction>,
        entrypoint: Vec<&'i Instruction>,
        healthcheck: Vec<&'i Instruction>,
    }

    fn flush(walk: &Walk<'_>, buckets: &mut Buckets<'_>, out: &mut Vec<Diagnostic>) {
        let groups = [
            (
                std::mem::take(&mut buckets.cmd),
                RuleKey::InstructionCmdMultiple,
                Keyword::Cmd,
            ),
            (
                std::mem::take(&mut buckets.entrypoint),
                RuleKey::InstructionEntrypointMultiple,
                Keyword::Entrypoint,
            ),
            (
                std::mem::take(&mut buckets.healthcheck),
                RuleKey::InstructionHealthcheckMultiple,
                Keyword::Healthcheck,
            ),
        ];
        for (entries, key, kind) in groups {
            if entries.len() < 2 {
                continue;
            }
            for instruction in &entries[..entries.len() - 1] {
                let line = walk.doc.position_at(instruction.span.start).line;
                out.extend(
                    walk.configured(
                        key,
                        ErrorCode::MultipleInstructions,
                        instruction.span,
                        &[kind.canonical()],
                    )
                    .map(|d| d.with_tag(DiagnosticTag::Unnecessary).for_instruction(line)),
                );
            }
        }
    }

    let mut buckets = Buckets::default();
    for instruction in instructions {
        match instruction.kind {
            Keyword::From => flush(walk, &mut buckets, out),
            Keyword::Cmd => buckets.cmd.push(instruction),
            Keyword::Entrypoint => buckets.entrypoint.push(instruction),
            Keyword::Healthcheck => buckets.healthcheck.push(instruction),
            _ => {}
        }
    }
    flush(walk, &mut buckets, out);
}

/// Step 4: build-stage names share one case-insensitive namespace.
fn check_duplicate_stage_names(
    walk: &Walk<'_>,
    instructions: &[Instruction],
    out: &mut Vec<Diagnostic>,
) {
    let mut names: HashMap<String, Vec<&crate::parser::Token>> = HashMap::new();
    for instruction in instructions {
        if instruction.kind != Keyword::From || instruction.args.len() < 3 {
            continue;
        }
        if !instruction.args[1].text.eq_ignore_ascii_case("AS") {
            continue;
        }
        let token = &instruction.args[2];
        names
            .entry(token.text.to_lowercase())
            .or_default()
            .push(token);
    }
    let mut duplicated: Vec<&crate::parser::Token> = names
        .into_values()
        .filter(|occurrences| occurrences.len() >= 2)
        .flatten()
        .collect();
    duplicated.sort_by_key(|token| token.span.start);
    for token in duplicated {
        let line = walk.doc.position_at(token.span.start).line;
        out.push(
            walk.error(ErrorCode::DuplicateBuildStageName, token.span, &[&token.text])
                .for_instruction(line),
        );
    }
}

/// Step 5: per-instruction dispatch. `top_level` is false inside ONBUILD
/// triggers, which skip the empty-continuation-line rule.
pub(crate) fn check_instruction(
    walk: &Walk<'_>,
    instruction: &Instruction,
    top_level: bool,
    out: &mut Vec<Diagnostic>,
) {
    if instruction.kind == Keyword::Unknown {
        out.push(walk.error(
            ErrorCode::UnknownInstruction,
            instruction.keyword_span,
            &[&instruction.keyword.to_uppercase()],
        ));
        return;
    }

    if !instruction.keyword_is_canonical() {
        out.extend(walk.configured(
            RuleKey::InstructionCasing,
            ErrorCode::CasingInstruction,
            instruction.keyword_span,
            &[],
        ));
    }

    if instruction.kind == Keyword::Maintainer {
        out.extend(
            walk.configured(
                RuleKey::DeprecatedMaintainer,
                ErrorCode::DeprecatedMaintainer,
                instruction.keyword_span,
                &[],
            )
            .map(|d| d.with_tag(DiagnosticTag::Deprecated)),
        );
    }

    if top_level {
        check_empty_continuation_lines(walk, instruction, out);
    }
    check_variable_modifiers(walk, instruction, out);

    match instruction.kind {
        Keyword::From => from::check(walk, instruction, out),
        Keyword::Add | Keyword::Copy => add_copy::check(walk, instruction, out),
        Keyword::Arg => properties::check_arg(walk, instruction, out),
        Keyword::Env | Keyword::Label => properties::check_env_label(walk, instruction, out),
        Keyword::Expose => expose::check(walk, instruction, out),
        Keyword::Healthcheck => healthcheck::check(walk, instruction, out),
        Keyword::Onbuild => onbuild::check(walk, instruction, out),
        Keyword::Shell => shell::check(walk, instruction, out),
        Keyword::Stopsignal => stopsignal::check(walk, instruction, out),
        Keyword::Workdir => workdir::check(walk, instruction, out),
        Keyword::Run | Keyword::Cmd | Keyword::Entrypoint | Keyword::Volume => {}
        Keyword::User | Keyword::Maintainer => check_at_least_one(walk, instruction, out),
        // handled by the early return above
        Keyword::Unknown => {}
    }

    if matches!(
        instruction.kind,
        Keyword::Add
            | Keyword::Copy
            | Keyword::Run
            | Keyword::Cmd
            | Keyword::Entrypoint
            | Keyword::Volume
    ) {
        json_quotes::check(walk, instruction, out);
    }
}

/// The generic argument-presence rule for keywords without a richer set.
pub(crate) fn check_at_least_one(
    walk: &Walk<'_>,
    instruction: &Instruction,
    out: &mut Vec<Diagnostic>,
) {
    if instruction.args.is_empty() {
        out.push(walk.error(
            ErrorCode::ArgumentRequiresAtLeastOne,
            instruction.keyword_span,
            &[instruction.kind.canonical()],
        ));
    }
}

/// Step 6: blank lines inside a continued instruction.
fn check_empty_continuation_lines(
    walk: &Walk<'_>,
    instruction: &Instruction,
    out: &mut Vec<Diagnostic>,
) {
    let doc = walk.doc;
    let first = doc.line_of(instruction.span.start);
    let last = doc.line_of(instruction.span.end);
    if last <= first {
        return;
    }

    let mut heredoc_lines = HashSet::new();
    for heredoc in &instruction.heredocs {
        if let Some(content) = heredoc.content_span {
            for line in doc.line_of(content.start)..=doc.line_of(content.end.saturating_sub(1)) {
                heredoc_lines.insert(line);
            }
        }
        if let Some(delimiter) = heredoc.delimiter_span {
            heredoc_lines.insert(doc.line_of(delimiter.start));
        }
    }

    let severity = walk.settings.severity(RuleKey::EmptyContinuationLine);
    if severity == Severity::Ignore {
        return;
    }

    let mut run_start: Option<usize> = None;
    for line in first..=last + 1 {
        let blank = line <= last
            && !heredoc_lines.contains(&line)
            && doc.line_text(line).trim().is_empty();
        match (blank, run_start) {
            (true, None) => run_start = Some(line),
            (false, Some(start)) => {
                let end = if line < doc.line_count() {
                    Position::new(line as u32, 0)
                } else {
                    doc.position_at(doc.content().len())
                };
                out.push(Diagnostic::new(
                    ErrorCode::EmptyContinuationLine,
                    severity,
                    Range::new(Position::new(start as u32, 0), end),
                    format_message(ErrorCode::EmptyContinuationLine, &[]),
                ));
                run_start = None;
            }
            _ => {}
        }
    }
}

/// Step 7: only `+`, `-` and `?` are valid substitution modifiers.
fn check_variable_modifiers(
    walk: &Walk<'_>,
    instruction: &Instruction,
    out: &mut Vec<Diagnostic>,
) {
    if matches!(
        instruction.kind,
        Keyword::Cmd | Keyword::Entrypoint | Keyword::Run
    ) {
        return;
    }
    for variable in instruction.variables() {
        let Some(modifier) = &variable.modifier else {
            continue;
        };
        if matches!(modifier.as_str(), "+" | "-" | "?") {
            continue;
        }
        let span = if modifier.is_empty() {
            variable.span
        } else {
            variable.modifier_span.unwrap_or(variable.span)
        };
        out.push(walk.error(ErrorCode::UnsupportedModifier, span, &[modifier]));
    }
}

/// Step 8: `# dockerfile-utils: ignore` suppresses the next line's
/// instruction-scoped diagnostics.
fn suppress_ignored(doc: &TextDocument<'_>, comments: &[Comment], out: &mut Vec<Diagnostic>) {
    let ignored: HashSet<u32> = comments
        .iter()
        .filter(|comment| comment.content == "dockerfile-utils: ignore")
        .map(|comment| doc.position_at(comment.span.start).line + 1)
        .collect();
    if ignored.is_empty() {
        return;
    }
    out.retain(|diagnostic| match diagnostic.instruction_line {
        Some(line) => !ignored.contains(&line),
        None => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn validate(source: &str) -> Vec<Diagnostic> {
        let doc = TextDocument::new(source);
        let dockerfile = parser::parse(source);
        run(&doc, &dockerfile, &ValidatorSettings::default())
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<ErrorCode> {
        diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_empty_document_has_no_source_image() {
        let diagnostics = validate("");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::NoSourceImage]);
        assert_eq!(diagnostics[0].range, Range::of(0, 0, 0, 0));
        assert_eq!(diagnostics[0].instruction_line, None);
    }

    #[test]
    fn test_arg_only_document_has_no_source_image() {
        let diagnostics = validate("ARG version=1");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::NoSourceImage]);
        assert_eq!(diagnostics[0].range, Range::of(0, 0, 0, 0));
    }

    #[test]
    fn test_first_non_from_instruction_is_flagged() {
        let diagnostics = validate("EXPOSE 8080");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::NoSourceImage]);
        assert_eq!(diagnostics[0].range, Range::of(0, 0, 0, 6));
        assert_eq!(diagnostics[0].instruction_line, Some(0));
    }

    #[test]
    fn test_clean_dockerfile_has_no_diagnostics() {
        let diagnostics = validate(
            "FROM node:18 AS build\nWORKDIR /app\nCOPY . .\nRUN npm ci\nEXPOSE 8080/tcp\nCMD [\"node\", \"app.js\"]",
        );
        assert!(diagnostics.is_empty(), "unexpected: {:?}", diagnostics);
    }

    #[test]
    fn test_unknown_instruction() {
        let diagnostics = validate("FROM node\nFOO bar");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::UnknownInstruction]);
        assert_eq!(diagnostics[0].message, "Unknown instruction: FOO");
    }

    #[test]
    fn test_lowercase_keyword_casing() {
        let diagnostics = validate("from node");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::CasingInstruction]);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_maintainer_is_deprecated() {
        let diagnostics = validate("FROM node\nMAINTAINER someone");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::DeprecatedMaintainer]);
        assert_eq!(diagnostics[0].tags, vec![DiagnosticTag::Deprecated]);
    }

    #[test]
    fn test_duplicate_stage_names() {
        let diagnostics = validate("FROM node AS setup\nFROM node AS setup");
        assert_eq!(
            codes(&diagnostics),
            vec![
                ErrorCode::DuplicateBuildStageName,
                ErrorCode::DuplicateBuildStageName
            ]
        );
        assert_eq!(diagnostics[0].range, Range::of(0, 13, 0, 18));
        assert_eq!(diagnostics[1].range, Range::of(1, 13, 1, 18));
    }

    #[test]
    fn test_duplicate_stage_names_are_case_insensitive() {
        let diagnostics = validate("FROM node AS Build\nFROM node AS build");
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn test_multiple_cmd_marks_all_but_last() {
        let diagnostics = validate("FROM node\nCMD [\"a\"]\nCMD [\"b\"]\nCMD [\"c\"]");
        let multiples: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.code == ErrorCode::MultipleInstructions)
            .collect();
        assert_eq!(multiples.len(), 2);
        assert_eq!(multiples[0].tags, vec![DiagnosticTag::Unnecessary]);
        assert!(multiples.iter().all(|d| d.range.start.line < 3));
    }

    #[test]
    fn test_multiple_cmd_reset_by_from() {
        let diagnostics = validate("FROM node\nCMD [\"a\"]\nFROM alpine\nCMD [\"b\"]");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_duplicated_escape_directive() {
        let diagnostics = validate("# escape=`\n# escape=\\\nFROM node");
        assert_eq!(
            codes(&diagnostics),
            vec![ErrorCode::DuplicatedEscapeDirective]
        );
        assert_eq!(diagnostics[0].instruction_line, None);
    }

    #[test]
    fn test_invalid_escape_directive_value() {
        let diagnostics = validate("# escape=x\nFROM node");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::InvalidEscapeDirective]);
        assert!(diagnostics[0].message.contains('x'));
    }

    #[test]
    fn test_escape_directive_casing() {
        let diagnostics = validate("# Escape=`\nFROM node");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::CasingDirective]);
    }

    #[test]
    fn test_empty_continuation_line() {
        let diagnostics = validate("FROM node\nRUN echo a \\\n\n  && echo b");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::EmptyContinuationLine]);
        assert_eq!(diagnostics[0].range, Range::of(2, 0, 3, 0));
    }

    #[test]
    fn test_empty_continuation_ignores_heredoc_content() {
        let diagnostics = validate("FROM node\nRUN <<EOT\nabc\n\ndef\nEOT");
        assert!(diagnostics.is_empty(), "unexpected: {:?}", diagnostics);
    }

    #[test]
    fn test_unsupported_modifier() {
        let diagnostics = validate("FROM node\nWORKDIR /a\nEXPOSE ${port:Z8080}");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::UnsupportedModifier]);
        // the modifier character alone
        assert_eq!(diagnostics[0].range, Range::of(2, 14, 2, 15));
    }

    #[test]
    fn test_empty_modifier_reports_whole_variable() {
        let diagnostics = validate("FROM node\nWORKDIR ${dir:}");
        let modifier: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.code == ErrorCode::UnsupportedModifier)
            .collect();
        assert_eq!(modifier.len(), 1);
        assert_eq!(modifier[0].range, Range::of(1, 8, 1, 15));
    }

    #[test]
    fn test_run_allows_shell_modifiers() {
        let diagnostics = validate("FROM node\nRUN echo ${x:Q}");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_ignore_comment_suppresses_next_line() {
        let diagnostics = validate("FROM node\n# dockerfile-utils: ignore\nMAINTAINER someone");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_ignore_comment_only_affects_next_line() {
        let diagnostics =
            validate("FROM node\n# dockerfile-utils: ignore\nRUN ls\nMAINTAINER someone");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::DeprecatedMaintainer]);
    }

    #[test]
    fn test_ignore_comment_does_not_suppress_document_diagnostics() {
        let diagnostics = validate("# escape=x\n# dockerfile-utils: ignore\nFROM node");
        assert!(codes(&diagnostics).contains(&ErrorCode::InvalidEscapeDirective));
    }

    #[test]
    fn test_settings_ignore_suppresses_rule() {
        let source = "from node";
        let doc = TextDocument::new(source);
        let dockerfile = parser::parse(source);
        let settings = ValidatorSettings::new()
            .with_severity(RuleKey::InstructionCasing, Severity::Ignore);
        let diagnostics = run(&doc, &dockerfile, &settings);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_settings_elevation_changes_severity_only() {
        let source = "from node";
        let doc = TextDocument::new(source);
        let dockerfile = parser::parse(source);
        let settings = ValidatorSettings::new()
            .with_severity(RuleKey::InstructionCasing, Severity::Error);
        let diagnostics = run(&doc, &dockerfile, &settings);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert_eq!(diagnostics[0].code, ErrorCode::CasingInstruction);
    }

    #[test]
    fn test_onbuild_trigger_line_attribution() {
        let diagnostics = validate("FROM node\nONBUILD MAINTAINER someone");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::OnbuildTriggerDisallowed]);
        assert_eq!(diagnostics[0].instruction_line, Some(1));
    }

    #[test]
    fn test_every_diagnostic_lies_within_document() {
        let source = "FROM node\nRUN echo a \\\n\n\nHEALTHCHECK --retries=x CMD ls\nEXPOSE 99999999";
        let doc = TextDocument::new(source);
        let last = doc.position_at(source.len());
        for diagnostic in validate(source) {
            assert!(diagnostic.range.start <= diagnostic.range.end);
            assert!(diagnostic.range.end <= Position::new(last.line + 1, 0));
        }
    }
}

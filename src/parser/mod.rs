//! Dockerfile parsing into a positioned AST.
//!
//! The parser produces directives, comments and instructions with byte
//! spans into the original source. Validation and formatting consume the
//! AST read-only; nothing here reports diagnostics.

use crate::document::Span;
use std::collections::HashMap;

pub mod instruction;
mod scan;

pub use instruction::{
    Flag, FromParts, Heredoc, Instruction, JsonForm, JsonString, Keyword, Property, Segment,
    Token, Variable,
};

use scan::Scanner;

/// The default escape character.
pub const DEFAULT_ESCAPE: char = '\\';

/// A `# key=value` parser directive before the first instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// The directive line, from `#` to the end of the line.
    pub span: Span,
    /// The directive name as written.
    pub name: String,
    /// Span of the name.
    pub name_span: Span,
    /// The directive value, surrounding blanks trimmed.
    pub value: String,
    /// Span of the value.
    pub value_span: Span,
}

impl Directive {
    /// Whether this directive sets the escape character.
    pub fn is_escape(&self) -> bool {
        self.name.eq_ignore_ascii_case("escape")
    }
}

/// A `#` comment line.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// From `#` to the end of the line.
    pub span: Span,
    /// The text after `#`, surrounding blanks trimmed.
    pub content: String,
}

/// A parsed Dockerfile.
#[derive(Debug, Clone, PartialEq)]
pub struct Dockerfile {
    /// The active escape character, `\` unless a directive overrides it.
    pub escape: char,
    /// Leading parser directives.
    pub directives: Vec<Directive>,
    /// Every comment line, including ones inside continued instructions.
    pub comments: Vec<Comment>,
    /// Instructions in source order.
    pub instructions: Vec<Instruction>,
}

/// Build argument names docker predefines for every build.
const BUILTIN_ARGS: &[&str] = &[
    "BUILDARCH",
    "BUILDOS",
    "BUILDPLATFORM",
    "BUILDVARIANT",
    "TARGETARCH",
    "TARGETOS",
    "TARGETPLATFORM",
    "TARGETVARIANT",
];

/// Parse a Dockerfile source text.
pub fn parse(source: &str) -> Dockerfile {
    let (directives, resume) = parse_directives(source);
    let escape = resolve_escape(&directives);
    log::trace!(
        "parsed {} directive(s), escape character {:?}",
        directives.len(),
        escape
    );

    let mut scanner = Scanner::new(source, escape, resume);
    let mut instructions = Vec::new();
    loop {
        match scanner.cur() {
            None => break,
            Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') => scanner.pos += 1,
            Some(b'#') => scanner.consume_comment_line(),
            Some(_) => instructions.push(scanner.parse_instruction()),
        }
    }
    let mut comments = scanner.comments;
    comments.sort_by_key(|c| c.span.start);

    resolve_variables(&mut instructions);

    Dockerfile {
        escape,
        directives,
        comments,
        instructions,
    }
}

fn resolve_escape(directives: &[Directive]) -> char {
    for directive in directives {
        if directive.is_escape() {
            return match directive.value.as_str() {
                "`" => '`',
                _ => DEFAULT_ESCAPE,
            };
        }
    }
    DEFAULT_ESCAPE
}

/// Scan the leading `# key=value` directive lines.
///
/// Directive processing stops at the first line that is not
/// directive-shaped: an instruction, a blank line or a plain comment.
fn parse_directives(source: &str) -> (Vec<Directive>, usize) {
    let bytes = source.as_bytes();
    let mut directives = Vec::new();
    let mut offset = 0;

    'lines: loop {
        let line_start = offset;
        let mut i = line_start;
        while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'#' {
            break;
        }
        let hash = i;
        let mut line_end = i;
        while line_end < bytes.len() && bytes[line_end] != b'\n' && bytes[line_end] != b'\r' {
            line_end += 1;
        }

        // name
        i += 1;
        while i < line_end && (bytes[i] == b' ' || bytes[i] == b'\t') {
            i += 1;
        }
        let name_start = i;
        while i < line_end && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
            i += 1;
        }
        let name_end = i;
        if name_end == name_start {
            break;
        }

        // separator
        while i < line_end && (bytes[i] == b' ' || bytes[i] == b'\t') {
            i += 1;
        }
        if i >= line_end || bytes[i] != b'=' {
            break;
        }
        i += 1;
        while i < line_end && (bytes[i] == b' ' || bytes[i] == b'\t') {
            i += 1;
        }
        let value_start = i;
        let mut value_end = line_end;
        while value_end > value_start
            && (bytes[value_end - 1] == b' ' || bytes[value_end - 1] == b'\t')
        {
            value_end -= 1;
        }

        directives.push(Directive {
            span: Span::new(hash, line_end),
            name: source[name_start..name_end].to_string(),
            name_span: Span::new(name_start, name_end),
            value: source[value_start..value_end].to_string(),
            value_span: Span::new(value_start, value_end),
        });

        // step over the terminator
        offset = line_end;
        if offset < bytes.len() {
            offset += if bytes[offset] == b'\r'
                && offset + 1 < bytes.len()
                && bytes[offset + 1] == b'\n'
            {
                2
            } else {
                1
            };
        } else {
            break 'lines;
        }
    }

    (directives, offset)
}

/// Annotate variable occurrences with declaredness and resolved values,
/// and compute each token's expanded text.
fn resolve_variables(instructions: &mut [Instruction]) {
    let mut env: HashMap<String, Option<String>> = BUILTIN_ARGS
        .iter()
        .map(|name| (name.to_string(), None))
        .collect();

    for instruction in instructions.iter_mut() {
        let snapshot = env.clone();
        resolve_instruction(instruction, &snapshot);
        record_declarations(instruction, &mut env);
    }
}

fn resolve_instruction(instruction: &mut Instruction, env: &HashMap<String, Option<String>>) {
    for token in instruction.args.iter_mut() {
        let mut expanded = token.text.clone();
        for variable in token.variables.iter_mut().rev() {
            variable.declared = env.contains_key(&variable.name);
            let current = env.get(&variable.name).cloned().flatten();
            variable.value = effective_value(variable, current);
            if let Some(value) = &variable.value {
                expanded.replace_range(
                    variable.text_start..variable.text_start + variable.text_len,
                    value,
                );
            }
        }
        token.expanded = expanded;
    }
    for flag in instruction.flags.iter_mut() {
        for variable in flag.variables.iter_mut() {
            variable.declared = env.contains_key(&variable.name);
            let current = env.get(&variable.name).cloned().flatten();
            variable.value = effective_value(variable, current);
        }
    }
    if let Some(trigger) = instruction.trigger.as_mut() {
        resolve_instruction(trigger, env);
    }
}

/// Apply the `:-`/`:+` modifier semantics to a resolved value.
fn effective_value(variable: &Variable, current: Option<String>) -> Option<String> {
    match variable.modifier.as_deref() {
        Some("-") => match current {
            Some(v) if !v.is_empty() => Some(v),
            _ => Some(variable.words.clone().unwrap_or_default()),
        },
        Some("+") => match current {
            Some(v) if !v.is_empty() => Some(variable.words.clone().unwrap_or_default()),
            _ => Some(String::new()),
        },
        _ => current,
    }
}

/// Record ARG/ENV declarations. Values are taken from the expanded token
/// text so that `ARG B=$A` sees what `A` resolved to.
fn record_declarations(instruction: &Instruction, env: &mut HashMap<String, Option<String>>) {
    let args = &instruction.args;
    match instruction.kind {
        Keyword::Arg => {
            for token in args {
                match token.expanded.split_once('=') {
                    Some((name, value)) if !name.is_empty() => {
                        env.insert(unquote(name), Some(unquote(value)));
                    }
                    Some(_) => {}
                    None if !token.expanded.is_empty() => {
                        env.insert(unquote(&token.expanded), None);
                    }
                    None => {}
                }
            }
        }
        Keyword::Env => {
            let Some(first) = args.first() else { return };
            if !first.text.contains('=') {
                // legacy space syntax
                if args.len() > 1 {
                    let value = args[1..]
                        .iter()
                        .map(|t| t.expanded.as_str())
                        .collect::<Vec<_>>()
                        .join(" ");
                    env.insert(unquote(&first.text), Some(unquote(&value)));
                }
            } else {
                for token in args {
                    if let Some((name, value)) = token.expanded.split_once('=') {
                        if !name.is_empty() {
                            env.insert(unquote(name), Some(unquote(value)));
                        }
                    }
                }
            }
        }
        _ => {}
    }
}

/// Strip one layer of matching surrounding quotes.
pub(crate) fn unquote(text: &str) -> String {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
            return text[1..text.len() - 1].to_string();
        }
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directives() {
        let dockerfile = parse("# escape=`\n# syntax=docker/dockerfile:1\nFROM node");
        assert_eq!(dockerfile.directives.len(), 2);
        assert_eq!(dockerfile.directives[0].name, "escape");
        assert_eq!(dockerfile.directives[0].value, "`");
        assert_eq!(dockerfile.escape, '`');
        assert_eq!(dockerfile.instructions.len(), 1);
    }

    #[test]
    fn test_directives_stop_at_blank_line() {
        let dockerfile = parse("\n# escape=`\nFROM node");
        assert!(dockerfile.directives.is_empty());
        assert_eq!(dockerfile.escape, '\\');
        assert_eq!(dockerfile.comments.len(), 1);
    }

    #[test]
    fn test_directives_stop_at_plain_comment() {
        let dockerfile = parse("# a comment\n# escape=`\nFROM node");
        assert!(dockerfile.directives.is_empty());
        assert_eq!(dockerfile.comments.len(), 2);
    }

    #[test]
    fn test_invalid_escape_value_keeps_default() {
        let dockerfile = parse("# escape=x\nFROM node");
        assert_eq!(dockerfile.directives.len(), 1);
        assert_eq!(dockerfile.escape, '\\');
    }

    #[test]
    fn test_comments_and_instructions() {
        let dockerfile = parse("FROM node\n# build it\nRUN make");
        assert_eq!(dockerfile.instructions.len(), 2);
        assert_eq!(dockerfile.comments.len(), 1);
        assert_eq!(dockerfile.comments[0].content, "build it");
    }

    #[test]
    fn test_arg_value_resolves_later_reference() {
        let dockerfile = parse("ARG VERSION=18\nFROM node:$VERSION");
        let from = &dockerfile.instructions[1];
        assert_eq!(from.args[0].expanded, "node:18");
        let variable = &from.args[0].variables[0];
        assert!(variable.declared);
        assert_eq!(variable.value.as_deref(), Some("18"));
    }

    #[test]
    fn test_env_value_resolves_later_reference() {
        let dockerfile = parse("FROM alpine\nENV PORT=8080\nEXPOSE $PORT/tcp");
        let expose = &dockerfile.instructions[2];
        assert_eq!(expose.args[0].expanded, "8080/tcp");
    }

    #[test]
    fn test_undeclared_variable_stays_verbatim() {
        let dockerfile = parse("FROM alpine\nEXPOSE $PORT");
        let expose = &dockerfile.instructions[1];
        assert_eq!(expose.args[0].expanded, "$PORT");
        assert!(!expose.args[0].variables[0].declared);
    }

    #[test]
    fn test_default_modifier_applies_when_unset() {
        let dockerfile = parse("FROM alpine\nEXPOSE ${PORT:-9090}");
        let expose = &dockerfile.instructions[1];
        assert_eq!(expose.args[0].expanded, "9090");
    }

    #[test]
    fn test_builtin_args_are_declared() {
        let dockerfile = parse("FROM alpine\nSTOPSIGNAL $TARGETARCH");
        let stopsignal = &dockerfile.instructions[1];
        assert!(stopsignal.args[0].variables[0].declared);
    }

    #[test]
    fn test_declaration_is_not_visible_to_itself() {
        let dockerfile = parse("ARG A=1\nARG B=$A\nFROM alpine$B");
        let from = &dockerfile.instructions[2];
        assert_eq!(from.args[0].expanded, "alpine1");
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("'abc'"), "abc");
        assert_eq!(unquote("abc"), "abc");
        assert_eq!(unquote("\"abc'"), "\"abc'");
    }
}

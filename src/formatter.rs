//! The whitespace formatter.
//!
//! Re-indents continuation lines and trims blank lines, touching nothing
//! else. Heredoc bodies are left exactly as written; an unterminated
//! heredoc swallows the rest of the instruction and produces no edits
//! rather than destructive ones.

use crate::document::{Span, TextDocument};
use crate::parser::Dockerfile;
use crate::settings::FormatterSettings;
use crate::types::{Position, TextEdit};
use std::collections::HashSet;

/// Per-line classification for one document.
struct Classification {
    /// Continuation lines of a multi-line instruction.
    indented: Vec<bool>,
    /// Lines skipped entirely under `ignore_multiline_instructions`.
    skipped: Vec<bool>,
    /// Lines inside heredoc bodies, delimiters included.
    heredoc_lines: HashSet<usize>,
}

fn classify(doc: &TextDocument<'_>, dockerfile: &Dockerfile) -> Classification {
    let count = doc.line_count();
    let mut indented = vec![false; count];
    let mut skipped = vec![false; count];
    let mut heredoc_lines = HashSet::new();

    for instruction in &dockerfile.instructions {
        let first = doc.line_of(instruction.span.start);
        let last = doc.line_of(instruction.span.end).min(count - 1);
        for line in first + 1..=last {
            indented[line] = true;
            skipped[line] = true;
        }
        for heredoc in &instruction.heredocs {
            let from = heredoc
                .content_span
                .map(|span| doc.line_of(span.start))
                .or_else(|| heredoc.delimiter_span.map(|span| doc.line_of(span.start)));
            let to = heredoc
                .delimiter_span
                .map(|span| doc.line_of(span.start))
                .or_else(|| {
                    heredoc
                        .content_span
                        .map(|span| doc.line_of(span.end.saturating_sub(1)))
                });
            if let (Some(from), Some(to)) = (from, to) {
                for line in from..=to {
                    heredoc_lines.insert(line);
                }
            }
        }
    }

    Classification {
        indented,
        skipped,
        heredoc_lines,
    }
}

/// Compute the edit for one line, if any.
fn format_line(
    doc: &TextDocument<'_>,
    line: usize,
    indented: bool,
    unit: &str,
) -> Option<TextEdit> {
    let start = doc.line_start(line);
    let end = doc.line_end(line);
    let text = doc.line_text(line);

    match text.find(|c| c != ' ' && c != '\t') {
        None => {
            // a blank line: trim whatever whitespace it holds
            if end > start {
                Some(TextEdit::delete(doc.range_of(Span::new(start, end))))
            } else {
                None
            }
        }
        Some(first) => {
            if indented {
                if &text[..first] != unit {
                    Some(TextEdit::replace(
                        doc.range_of(Span::new(start, start + first)),
                        unit,
                    ))
                } else {
                    None
                }
            } else if first > 0 {
                Some(TextEdit::delete(doc.range_of(Span::new(
                    start,
                    start + first,
                ))))
            } else {
                None
            }
        }
    }
}

fn format_lines(
    doc: &TextDocument<'_>,
    dockerfile: &Dockerfile,
    settings: &FormatterSettings,
    first_line: usize,
    last_line: usize,
) -> Vec<TextEdit> {
    let classification = classify(doc, dockerfile);
    let unit = settings.indentation();
    let mut edits = Vec::new();
    for line in first_line..=last_line.min(doc.line_count() - 1) {
        if settings.ignore_multiline_instructions && classification.skipped[line] {
            continue;
        }
        if classification.heredoc_lines.contains(&line) {
            continue;
        }
        edits.extend(format_line(doc, line, classification.indented[line], &unit));
    }
    log::debug!(
        "formatter produced {} edit(s) for lines {}..={}",
        edits.len(),
        first_line,
        last_line
    );
    edits
}

/// Format the whole document.
pub fn format(
    doc: &TextDocument<'_>,
    dockerfile: &Dockerfile,
    settings: &FormatterSettings,
) -> Vec<TextEdit> {
    format_lines(doc, dockerfile, settings, 0, doc.line_count() - 1)
}

/// Format the lines touched by `range`.
pub fn format_range(
    doc: &TextDocument<'_>,
    dockerfile: &Dockerfile,
    settings: &FormatterSettings,
    range: crate::types::Range,
) -> Vec<TextEdit> {
    let first = range.start.line.min(range.end.line) as usize;
    let last = range.start.line.max(range.end.line) as usize;
    format_lines(doc, dockerfile, settings, first, last)
}

/// React to a typed character: when the active escape character is typed
/// at the end of a line, schedule the next line for indentation.
pub fn format_on_type(
    doc: &TextDocument<'_>,
    dockerfile: &Dockerfile,
    settings: &FormatterSettings,
    position: Position,
    character: char,
) -> Vec<TextEdit> {
    if character != dockerfile.escape {
        return Vec::new();
    }

    let offset = doc.offset_at(position);
    let inside_comment = dockerfile
        .comments
        .iter()
        .map(|comment| comment.span)
        .chain(dockerfile.directives.iter().map(|directive| directive.span))
        .any(|span| offset >= span.start && offset <= span.end);
    if inside_comment {
        return Vec::new();
    }

    // only trailing blanks may follow the cursor on its line
    let line = position.line as usize;
    if line >= doc.line_count() {
        return Vec::new();
    }
    let rest = &doc.content()[offset..doc.line_end(line)];
    if !rest.chars().all(|c| c == ' ' || c == '\t') {
        return Vec::new();
    }

    let next = line + 1;
    if next >= doc.line_count() {
        return Vec::new();
    }
    let classification = classify(doc, dockerfile);
    if classification.heredoc_lines.contains(&next) {
        return Vec::new();
    }
    if settings.ignore_multiline_instructions && classification.skipped[next] {
        return Vec::new();
    }
    format_line(doc, next, true, &settings.indentation())
        .into_iter()
        .collect()
}

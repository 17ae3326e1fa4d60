//! dockerfile-utils: a validator and formatter for Dockerfiles.
//!
//! The validator applies a catalog of semantic rules against a parsed
//! Dockerfile and returns diagnostics with stable numeric codes,
//! configurable severities and editor-protocol coordinates (zero-based
//! lines, UTF-16 character offsets). The formatter computes whitespace
//! edits that normalize continuation-line indentation and trim blank
//! lines, and nothing else.
//!
//! Both entry points are pure functions of their inputs: no state is
//! retained between calls, nothing blocks, and concurrent calls need no
//! synchronization.
//!
//! # Example
//!
//! ```
//! use dockerfile_utils::{validate, ValidatorSettings};
//!
//! let diagnostics = validate("FROM node:18\nEXPOSE 8080/tcp", &ValidatorSettings::default());
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate("EXPOSE 8080", &ValidatorSettings::default());
//! assert_eq!(diagnostics.len(), 1);
//! ```

pub mod document;
pub mod formatter;
pub mod messages;
pub mod parser;
pub mod settings;
pub mod types;
pub mod validator;

pub use settings::{FormatterSettings, RuleKey, SettingsError, ValidatorSettings};
pub use types::{
    Diagnostic, DiagnosticTag, ErrorCode, Position, Range, Severity, TextEdit,
    DIAGNOSTIC_SOURCE,
};

use document::TextDocument;

/// Validate a Dockerfile and return its diagnostics in emission order.
pub fn validate(content: &str, settings: &ValidatorSettings) -> Vec<Diagnostic> {
    let doc = TextDocument::new(content);
    let dockerfile = parser::parse(content);
    validator::run(&doc, &dockerfile, settings)
}

/// Compute whitespace edits for the whole document.
pub fn format(content: &str, settings: &FormatterSettings) -> Vec<TextEdit> {
    let doc = TextDocument::new(content);
    let dockerfile = parser::parse(content);
    formatter::format(&doc, &dockerfile, settings)
}

/// Compute whitespace edits for the lines touched by `range`.
pub fn format_range(content: &str, range: Range, settings: &FormatterSettings) -> Vec<TextEdit> {
    let doc = TextDocument::new(content);
    let dockerfile = parser::parse(content);
    formatter::format_range(&doc, &dockerfile, settings, range)
}

/// Compute whitespace edits in reaction to a typed character.
///
/// Only typing the active escape character at the end of a line outside
/// comments and directives produces edits: the following line is
/// scheduled for indentation.
pub fn format_on_type(
    content: &str,
    position: Position,
    character: char,
    settings: &FormatterSettings,
) -> Vec<TextEdit> {
    let doc = TextDocument::new(content);
    let dockerfile = parser::parse(content);
    formatter::format_on_type(&doc, &dockerfile, settings, position, character)
}

//! Core types for the Dockerfile validator and formatter.
//!
//! Positions follow the editor-protocol convention: zero-based lines,
//! zero-based character offsets measured in UTF-16 code units. Diagnostics
//! carry a stable numeric code, a configurable severity and the line of the
//! instruction that produced them so that suppression comments can be
//! matched against them.

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A position in a text document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Zero-based line number.
    pub line: u32,
    /// Zero-based character offset, in UTF-16 code units.
    pub character: u32,
}

impl Position {
    /// Create a new position.
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.character)
    }
}

/// A range in a text document, half-open by column and inclusive by line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    /// The start position (inclusive).
    pub start: Position,
    /// The end position (exclusive).
    pub end: Position,
}

impl Range {
    /// Create a new range.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Create a range from raw line/character quadruples.
    pub fn of(start_line: u32, start_character: u32, end_line: u32, end_character: u32) -> Self {
        Self {
            start: Position::new(start_line, start_character),
            end: Position::new(end_line, end_character),
        }
    }

    /// Check whether a position lies within this range.
    pub fn contains(&self, position: Position) -> bool {
        position >= self.start && position < self.end
    }
}

/// A textual edit applicable to a document.
///
/// An empty `new_text` denotes a deletion of the ranged text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    /// The range of the document to be replaced.
    pub range: Range,
    /// The replacement text.
    #[serde(rename = "newText")]
    pub new_text: String,
}

impl TextEdit {
    /// Create an edit replacing `range` with `new_text`.
    pub fn replace(range: Range, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }

    /// Create an edit deleting the text within `range`.
    pub fn delete(range: Range) -> Self {
        Self {
            range,
            new_text: String::new(),
        }
    }

    /// Check whether this edit deletes text.
    pub fn is_deletion(&self) -> bool {
        self.new_text.is_empty()
    }
}

/// Severity levels for diagnostics.
///
/// `Ignore` suppresses emission entirely and never appears in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The rule is disabled; no diagnostic is produced.
    Ignore,
    /// Reported as a warning.
    Warning,
    /// Reported as an error.
    Error,
}

impl Severity {
    /// Parse a severity from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ignore" => Some(Self::Ignore),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// The editor-protocol numeric value (1 = Error, 2 = Warning).
    ///
    /// `Ignore` has no wire representation; diagnostics with that
    /// severity are filtered out before serialization.
    pub fn to_wire(self) -> u8 {
        match self {
            Self::Error => 1,
            Self::Warning => 2,
            Self::Ignore => 0,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.to_wire())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "unknown severity '{}', expected ignore, warning or error",
                s
            ))
        })
    }
}

/// Extra semantics attached to a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticTag {
    /// The flagged code is unused or redundant.
    Unnecessary,
    /// The flagged code relies on a deprecated feature.
    Deprecated,
}

impl DiagnosticTag {
    /// The editor-protocol numeric value (1 = Unnecessary, 2 = Deprecated).
    pub fn to_wire(self) -> u8 {
        match self {
            Self::Unnecessary => 1,
            Self::Deprecated => 2,
        }
    }
}

impl Serialize for DiagnosticTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.to_wire())
    }
}

/// Stable identifiers for every rule the validator can report.
///
/// The names are part of the public API; the numeric values are stable
/// within a major version and serialize as integers on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    CasingInstruction = 1,
    CasingDirective = 2,
    ArgumentMissing = 3,
    ArgumentExtra = 4,
    ArgumentRequiresOne = 5,
    ArgumentRequiresAtLeastOne = 6,
    ArgumentRequiresTwo = 7,
    ArgumentRequiresAtLeastTwo = 8,
    ArgumentRequiresOneOrThree = 9,
    ArgumentUnnecessary = 10,
    DuplicateBuildStageName = 11,
    EmptyContinuationLine = 12,
    InvalidBuildStageName = 13,
    FlagAtLeastOne = 14,
    FlagDuplicate = 15,
    FlagInvalidDuration = 16,
    FlagLessThan1ms = 17,
    FlagMissingDuration = 18,
    FlagMissingValue = 19,
    FlagUnknownUnit = 20,
    FlagExpectedBooleanValue = 21,
    FlagInvalidFromValue = 22,
    NoSourceImage = 23,
    InvalidEscapeDirective = 24,
    DuplicatedEscapeDirective = 25,
    InvalidAs = 26,
    InvalidDestination = 27,
    InvalidPort = 28,
    InvalidProto = 29,
    InvalidReferenceFormat = 30,
    InvalidSignal = 31,
    InvalidSyntax = 32,
    OnbuildChainingDisallowed = 33,
    OnbuildTriggerDisallowed = 34,
    ShellJsonForm = 35,
    ShellRequiresOne = 36,
    SyntaxMissingEquals = 37,
    SyntaxMissingNames = 38,
    SyntaxMissingSingleQuote = 39,
    SyntaxMissingDoubleQuote = 40,
    MultipleInstructions = 41,
    UnknownInstruction = 42,
    UnknownAddFlag = 43,
    UnknownCopyFlag = 44,
    UnknownFromFlag = 45,
    UnknownHealthcheckFlag = 46,
    UnknownType = 47,
    UnsupportedModifier = 48,
    DeprecatedMaintainer = 49,
    HealthcheckCmdArgumentMissing = 50,
    JsonInSingleQuotes = 51,
    WorkdirIsNotAbsolute = 52,
    BaseNameEmpty = 53,
}

impl ErrorCode {
    /// The stable numeric value used on the wire.
    pub fn value(self) -> u16 {
        self as u16
    }

    /// The stable name of the code.
    pub fn name(self) -> &'static str {
        match self {
            Self::CasingInstruction => "CASING_INSTRUCTION",
            Self::CasingDirective => "CASING_DIRECTIVE",
            Self::ArgumentMissing => "ARGUMENT_MISSING",
            Self::ArgumentExtra => "ARGUMENT_EXTRA",
            Self::ArgumentRequiresOne => "ARGUMENT_REQUIRES_ONE",
            Self::ArgumentRequiresAtLeastOne => "ARGUMENT_REQUIRES_AT_LEAST_ONE",
            Self::ArgumentRequiresTwo => "ARGUMENT_REQUIRES_TWO",
            Self::ArgumentRequiresAtLeastTwo => "ARGUMENT_REQUIRES_AT_LEAST_TWO",
            Self::ArgumentRequiresOneOrThree => "ARGUMENT_REQUIRES_ONE_OR_THREE",
            Self::ArgumentUnnecessary => "ARGUMENT_UNNECESSARY",
            Self::DuplicateBuildStageName => "DUPLICATE_BUILD_STAGE_NAME",
            Self::EmptyContinuationLine => "EMPTY_CONTINUATION_LINE",
            Self::InvalidBuildStageName => "INVALID_BUILD_STAGE_NAME",
            Self::FlagAtLeastOne => "FLAG_AT_LEAST_ONE",
            Self::FlagDuplicate => "FLAG_DUPLICATE",
            Self::FlagInvalidDuration => "FLAG_INVALID_DURATION",
            Self::FlagLessThan1ms => "FLAG_LESS_THAN_1MS",
            Self::FlagMissingDuration => "FLAG_MISSING_DURATION",
            Self::FlagMissingValue => "FLAG_MISSING_VALUE",
            Self::FlagUnknownUnit => "FLAG_UNKNOWN_UNIT",
            Self::FlagExpectedBooleanValue => "FLAG_EXPECTED_BOOLEAN_VALUE",
            Self::FlagInvalidFromValue => "FLAG_INVALID_FROM_VALUE",
            Self::NoSourceImage => "NO_SOURCE_IMAGE",
            Self::InvalidEscapeDirective => "INVALID_ESCAPE_DIRECTIVE",
            Self::DuplicatedEscapeDirective => "DUPLICATED_ESCAPE_DIRECTIVE",
            Self::InvalidAs => "INVALID_AS",
            Self::InvalidDestination => "INVALID_DESTINATION",
            Self::InvalidPort => "INVALID_PORT",
            Self::InvalidProto => "INVALID_PROTO",
            Self::InvalidReferenceFormat => "INVALID_REFERENCE_FORMAT",
            Self::InvalidSignal => "INVALID_SIGNAL",
            Self::InvalidSyntax => "INVALID_SYNTAX",
            Self::OnbuildChainingDisallowed => "ONBUILD_CHAINING_DISALLOWED",
            Self::OnbuildTriggerDisallowed => "ONBUILD_TRIGGER_DISALLOWED",
            Self::ShellJsonForm => "SHELL_JSON_FORM",
            Self::ShellRequiresOne => "SHELL_REQUIRES_ONE",
            Self::SyntaxMissingEquals => "SYNTAX_MISSING_EQUALS",
            Self::SyntaxMissingNames => "SYNTAX_MISSING_NAMES",
            Self::SyntaxMissingSingleQuote => "SYNTAX_MISSING_SINGLE_QUOTE",
            Self::SyntaxMissingDoubleQuote => "SYNTAX_MISSING_DOUBLE_QUOTE",
            Self::MultipleInstructions => "MULTIPLE_INSTRUCTIONS",
            Self::UnknownInstruction => "UNKNOWN_INSTRUCTION",
            Self::UnknownAddFlag => "UNKNOWN_ADD_FLAG",
            Self::UnknownCopyFlag => "UNKNOWN_COPY_FLAG",
            Self::UnknownFromFlag => "UNKNOWN_FROM_FLAG",
            Self::UnknownHealthcheckFlag => "UNKNOWN_HEALTHCHECK_FLAG",
            Self::UnknownType => "UNKNOWN_TYPE",
            Self::UnsupportedModifier => "UNSUPPORTED_MODIFIER",
            Self::DeprecatedMaintainer => "DEPRECATED_MAINTAINER",
            Self::HealthcheckCmdArgumentMissing => "HEALTHCHECK_CMD_ARGUMENT_MISSING",
            Self::JsonInSingleQuotes => "JSON_IN_SINGLE_QUOTES",
            Self::WorkdirIsNotAbsolute => "WORKDIR_IS_NOT_ABSOLUTE",
            Self::BaseNameEmpty => "BASE_NAME_EMPTY",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.value())
    }
}

/// The diagnostic source reported for every finding.
pub const DIAGNOSTIC_SOURCE: &str = "dockerfile-utils";

/// A single finding produced by the validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// The source range the finding applies to.
    pub range: Range,
    /// Effective severity after configuration overrides.
    pub severity: Severity,
    /// The stable rule code.
    pub code: ErrorCode,
    /// Always `"dockerfile-utils"`.
    pub source: &'static str,
    /// The formatted, human-readable message.
    pub message: String,
    /// Extra semantics (unnecessary/deprecated), omitted when empty.
    #[serde(skip_serializing_if = "Vec::is_empty", serialize_with = "serialize_tags")]
    pub tags: Vec<DiagnosticTag>,
    /// The first line of the instruction that produced the finding, if any.
    ///
    /// Document-level findings (directives, empty documents) carry `None`.
    #[serde(rename = "instructionLine")]
    pub instruction_line: Option<u32>,
}

fn serialize_tags<S: Serializer>(tags: &[DiagnosticTag], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(tags.len()))?;
    for tag in tags {
        seq.serialize_element(tag)?;
    }
    seq.end()
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(
        code: ErrorCode,
        severity: Severity,
        range: Range,
        message: impl Into<String>,
    ) -> Self {
        Self {
            range,
            severity,
            code,
            source: DIAGNOSTIC_SOURCE,
            message: message.into(),
            tags: Vec::new(),
            instruction_line: None,
        }
    }

    /// Attach a tag to the diagnostic.
    pub fn with_tag(mut self, tag: DiagnosticTag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Record the first line of the owning instruction.
    pub fn for_instruction(mut self, line: u32) -> Self {
        self.instruction_line = Some(line);
        self
    }
}

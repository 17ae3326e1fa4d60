//! Configuration for the validator and the formatter.
//!
//! Severity configuration maps rule keys to a [`Severity`]. Unspecified
//! keys keep their defaults; a rule configured as `ignore` produces no
//! diagnostics anywhere in the document. Settings deserialize from the
//! camelCase JSON shape an editor client sends.

use crate::types::Severity;
use serde::Deserialize;
use thiserror::Error;

/// The configurable rule keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKey {
    /// MAINTAINER is deprecated.
    DeprecatedMaintainer,
    /// Parser directives should be lowercase.
    DirectiveCasing,
    /// Blank lines inside a continued instruction.
    EmptyContinuationLine,
    /// Instruction keywords should be uppercase.
    InstructionCasing,
    /// More than one CMD per build stage.
    InstructionCmdMultiple,
    /// More than one ENTRYPOINT per build stage.
    InstructionEntrypointMultiple,
    /// More than one HEALTHCHECK per build stage.
    InstructionHealthcheckMultiple,
    /// JSON arrays written with single quotes.
    InstructionJsonInSingleQuotes,
    /// WORKDIR paths that are not absolute.
    InstructionWorkdirRelative,
}

/// Errors raised while deserializing settings.
///
/// Validation findings are diagnostics, never errors; this type only
/// covers a malformed settings payload.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings JSON could not be parsed.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Severity configuration for the validator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidatorSettings {
    /// Severity of [`RuleKey::DeprecatedMaintainer`].
    pub deprecated_maintainer: Severity,
    /// Severity of [`RuleKey::DirectiveCasing`].
    pub directive_casing: Severity,
    /// Severity of [`RuleKey::EmptyContinuationLine`].
    pub empty_continuation_line: Severity,
    /// Severity of [`RuleKey::InstructionCasing`].
    pub instruction_casing: Severity,
    /// Severity of [`RuleKey::InstructionCmdMultiple`].
    pub instruction_cmd_multiple: Severity,
    /// Severity of [`RuleKey::InstructionEntrypointMultiple`].
    pub instruction_entrypoint_multiple: Severity,
    /// Severity of [`RuleKey::InstructionHealthcheckMultiple`].
    pub instruction_healthcheck_multiple: Severity,
    /// Severity of [`RuleKey::InstructionJsonInSingleQuotes`].
    #[serde(rename = "instructionJSONInSingleQuotes")]
    pub instruction_json_in_single_quotes: Severity,
    /// Severity of [`RuleKey::InstructionWorkdirRelative`].
    pub instruction_workdir_relative: Severity,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            deprecated_maintainer: Severity::Warning,
            directive_casing: Severity::Warning,
            empty_continuation_line: Severity::Warning,
            instruction_casing: Severity::Warning,
            instruction_cmd_multiple: Severity::Warning,
            instruction_entrypoint_multiple: Severity::Warning,
            instruction_healthcheck_multiple: Severity::Warning,
            instruction_json_in_single_quotes: Severity::Warning,
            instruction_workdir_relative: Severity::Warning,
        }
    }
}

impl ValidatorSettings {
    /// Create settings with the default severities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The effective severity for a rule key.
    pub fn severity(&self, key: RuleKey) -> Severity {
        match key {
            RuleKey::DeprecatedMaintainer => self.deprecated_maintainer,
            RuleKey::DirectiveCasing => self.directive_casing,
            RuleKey::EmptyContinuationLine => self.empty_continuation_line,
            RuleKey::InstructionCasing => self.instruction_casing,
            RuleKey::InstructionCmdMultiple => self.instruction_cmd_multiple,
            RuleKey::InstructionEntrypointMultiple => self.instruction_entrypoint_multiple,
            RuleKey::InstructionHealthcheckMultiple => self.instruction_healthcheck_multiple,
            RuleKey::InstructionJsonInSingleQuotes => self.instruction_json_in_single_quotes,
            RuleKey::InstructionWorkdirRelative => self.instruction_workdir_relative,
        }
    }

    /// Builder method to override the severity of a rule.
    pub fn with_severity(mut self, key: RuleKey, severity: Severity) -> Self {
        match key {
            RuleKey::DeprecatedMaintainer => self.deprecated_maintainer = severity,
            RuleKey::DirectiveCasing => self.directive_casing = severity,
            RuleKey::EmptyContinuationLine => self.empty_continuation_line = severity,
            RuleKey::InstructionCasing => self.instruction_casing = severity,
            RuleKey::InstructionCmdMultiple => self.instruction_cmd_multiple = severity,
            RuleKey::InstructionEntrypointMultiple => {
                self.instruction_entrypoint_multiple = severity
            }
            RuleKey::InstructionHealthcheckMultiple => {
                self.instruction_healthcheck_multiple = severity
            }
            RuleKey::InstructionJsonInSingleQuotes => {
                self.instruction_json_in_single_quotes = severity
            }
            RuleKey::InstructionWorkdirRelative => self.instruction_workdir_relative = severity,
        }
        self
    }

    /// Builder method to silence every configurable rule.
    pub fn ignore_all(self) -> Self {
        Self {
            deprecated_maintainer: Severity::Ignore,
            directive_casing: Severity::Ignore,
            empty_continuation_line: Severity::Ignore,
            instruction_casing: Severity::Ignore,
            instruction_cmd_multiple: Severity::Ignore,
            instruction_entrypoint_multiple: Severity::Ignore,
            instruction_healthcheck_multiple: Severity::Ignore,
            instruction_json_in_single_quotes: Severity::Ignore,
            instruction_workdir_relative: Severity::Ignore,
        }
    }
}

/// Options for the whitespace formatter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormatterSettings {
    /// Indent with spaces instead of a tab.
    pub insert_spaces: bool,
    /// Number of spaces per indent level when `insert_spaces` is set.
    pub tab_size: u32,
    /// Leave continuation lines of multi-line instructions untouched.
    pub ignore_multiline_instructions: bool,
}

impl Default for FormatterSettings {
    fn default() -> Self {
        Self {
            insert_spaces: false,
            tab_size: 4,
            ignore_multiline_instructions: false,
        }
    }
}

impl FormatterSettings {
    /// The text of one indentation unit.
    pub fn indentation(&self) -> String {
        if self.insert_spaces {
            " ".repeat(self.tab_size as usize)
        } else {
            "\t".to_string()
        }
    }
}

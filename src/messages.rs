//! Message templates for every rule code.
//!
//! Templates use positional `${0}`, `${1}`, … placeholders. The table is
//! immutable process-wide data; formatting substitutes parameters
//! positionally and leaves unmatched placeholders untouched.

use crate::types::ErrorCode;

/// The message template for a rule code.
pub fn template(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::CasingInstruction => "Instructions should be written in uppercase letters",
        ErrorCode::CasingDirective => "Parser directives should be written in lowercase letters",
        ErrorCode::ArgumentMissing => "ONBUILD requires at least one argument",
        ErrorCode::ArgumentExtra => "${0} takes a single argument",
        ErrorCode::ArgumentRequiresOne => "${0} requires exactly one argument",
        ErrorCode::ArgumentRequiresAtLeastOne => "${0} requires at least one argument",
        ErrorCode::ArgumentRequiresTwo => "${0} must have two arguments",
        ErrorCode::ArgumentRequiresAtLeastTwo => "${0} requires at least two arguments",
        ErrorCode::ArgumentRequiresOneOrThree => "${0} requires either one or three arguments",
        ErrorCode::ArgumentUnnecessary => "HEALTHCHECK NONE takes no arguments",
        ErrorCode::DuplicateBuildStageName => "duplicate name ${0}",
        ErrorCode::EmptyContinuationLine => "Empty continuation line",
        ErrorCode::InvalidBuildStageName => "invalid name for build stage: ${0}",
        ErrorCode::FlagAtLeastOne => "${0} must be at least 1 (not ${1})",
        ErrorCode::FlagDuplicate => "Duplicate flag specified: ${0}",
        ErrorCode::FlagInvalidDuration => "time: invalid duration ${0}",
        ErrorCode::FlagLessThan1ms => "Interval \"${0}\" cannot be less than 1ms",
        ErrorCode::FlagMissingDuration => "time: missing unit in duration ${0}",
        ErrorCode::FlagMissingValue => "Missing a value on flag: ${0}",
        ErrorCode::FlagUnknownUnit => "time: unknown unit ${0} in duration ${1}",
        ErrorCode::FlagExpectedBooleanValue => "expecting boolean value for flag ${0}, not: ${1}",
        ErrorCode::FlagInvalidFromValue => "invalid from flag value ${0}",
        ErrorCode::NoSourceImage => "No source image provided with FROM",
        ErrorCode::InvalidEscapeDirective => "invalid ESCAPE '${0}'. Must be ` or \\",
        ErrorCode::DuplicatedEscapeDirective => "only one escape parser directive can be used",
        ErrorCode::InvalidAs => "Second argument should be AS",
        ErrorCode::InvalidDestination => {
            "When using ${0} with more than one source file, the destination must be a directory and end with a / or a \\"
        }
        ErrorCode::InvalidPort => "Invalid containerPort: ${0}",
        ErrorCode::InvalidProto => "Invalid proto: ${0}",
        ErrorCode::InvalidReferenceFormat => "invalid reference format",
        ErrorCode::InvalidSignal => "Invalid signal: ${0}",
        ErrorCode::InvalidSyntax => "parsing \"${0}\": invalid syntax",
        ErrorCode::OnbuildChainingDisallowed => "Chaining ONBUILD via `ONBUILD ONBUILD` isn't allowed",
        ErrorCode::OnbuildTriggerDisallowed => "${0} isn't allowed as an ONBUILD trigger",
        ErrorCode::ShellJsonForm => "SHELL requires the arguments to be in JSON form",
        ErrorCode::ShellRequiresOne => "SHELL requires at least one argument",
        ErrorCode::SyntaxMissingEquals => {
            "Syntax error - can't find = in \"${0}\". Must be of the form: name=value"
        }
        ErrorCode::SyntaxMissingNames => "${0} names can not be blank",
        ErrorCode::SyntaxMissingSingleQuote => {
            "failed to process \"${0}\": unexpected end of statement while looking for matching single-quote"
        }
        ErrorCode::SyntaxMissingDoubleQuote => {
            "failed to process \"${0}\": unexpected end of statement while looking for matching double-quote"
        }
        ErrorCode::MultipleInstructions => {
            "Multiple ${0} instructions found, only the last one will be used"
        }
        ErrorCode::UnknownInstruction => "Unknown instruction: ${0}",
        ErrorCode::UnknownAddFlag => "Unknown flag: ${0}",
        ErrorCode::UnknownCopyFlag => "Unknown flag: ${0}",
        ErrorCode::UnknownFromFlag => "Unknown flag: ${0}",
        ErrorCode::UnknownHealthcheckFlag => "Unknown flag: ${0}",
        ErrorCode::UnknownType => "Unknown type \"${0}\" in HEALTHCHECK (try CMD)",
        ErrorCode::UnsupportedModifier => "Unsupported modifier (${0}) in substitution",
        ErrorCode::DeprecatedMaintainer => "MAINTAINER has been deprecated",
        ErrorCode::HealthcheckCmdArgumentMissing => "Missing command after HEALTHCHECK CMD",
        ErrorCode::JsonInSingleQuotes => {
            "Instruction written as a JSON array but is using single quotes instead of double quotes"
        }
        ErrorCode::WorkdirIsNotAbsolute => "WORKDIR paths should be absolute",
        ErrorCode::BaseNameEmpty => "base name (${0}) should not be blank",
    }
}

/// Format the message for a rule code, substituting `${n}` placeholders.
pub fn format_message(code: ErrorCode, params: &[&str]) -> String {
    let mut message = template(code).to_string();
    for (i, param) in params.iter().enumerate() {
        message = message.replace(&format!("${{{}}}", i), param);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_without_params() {
        assert_eq!(
            format_message(ErrorCode::DeprecatedMaintainer, &[]),
            "MAINTAINER has been deprecated"
        );
    }

    #[test]
    fn test_format_substitutes_positionally() {
        assert_eq!(
            format_message(ErrorCode::UnknownInstruction, &["FOO"]),
            "Unknown instruction: FOO"
        );
        assert_eq!(
            format_message(ErrorCode::FlagUnknownUnit, &["x", "5x"]),
            "time: unknown unit x in duration 5x"
        );
    }

    #[test]
    fn test_unmatched_placeholder_is_left_alone() {
        assert_eq!(
            format_message(ErrorCode::UnknownInstruction, &[]),
            "Unknown instruction: ${0}"
        );
    }
}

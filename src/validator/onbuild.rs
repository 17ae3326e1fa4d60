//! ONBUILD: trigger restrictions and recursion into the trigger.

use crate::parser::{Instruction, Keyword};
use crate::types::{Diagnostic, ErrorCode};
use crate::validator::{check_instruction, Walk};

pub(crate) fn check(walk: &Walk<'_>, instruction: &Instruction, out: &mut Vec<Diagnostic>) {
    let Some(trigger) = &instruction.trigger else {
        out.push(walk.error(ErrorCode::ArgumentMissing, instruction.keyword_span, &[]));
        return;
    };
    match trigger.kind {
        Keyword::From | Keyword::Maintainer => {
            out.push(walk.error(
                ErrorCode::OnbuildTriggerDisallowed,
                trigger.keyword_span,
                &[trigger.kind.canonical()],
            ));
        }
        Keyword::Onbuild => {
            out.push(walk.error(
                ErrorCode::OnbuildChainingDisallowed,
                trigger.keyword_span,
                &[],
            ));
        }
        _ => check_instruction(walk, trigger, false, out),
    }
}

#[cfg(test)]
mod tests {
    use crate::document::TextDocument;
    use crate::parser;
    use crate::settings::ValidatorSettings;
    use crate::types::ErrorCode;
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
    fn test_valid_trigger() {
        assert!(codes("FROM node\nONBUILD RUN npm ci").is_empty());
        assert!(codes("FROM node\nONBUILD COPY . /app").is_empty());
    }

    #[test]
    fn test_missing_trigger() {
        assert_eq!(codes("FROM node\nONBUILD"), vec![ErrorCode::ArgumentMissing]);
    }

    #[test]
    fn test_from_trigger_disallowed() {
        assert_eq!(
            codes("FROM node\nONBUILD FROM alpine"),
            vec![ErrorCode::OnbuildTriggerDisallowed]
        );
    }

    #[test]
    fn test_maintainer_trigger_disallowed() {
        assert_eq!(
            codes("FROM node\nONBUILD MAINTAINER someone"),
            vec![ErrorCode::OnbuildTriggerDisallowed]
        );
    }

    #[test]
    fn test_chaining_disallowed() {
        assert_eq!(
            codes("FROM node\nONBUILD ONBUILD RUN ls"),
            vec![ErrorCode::OnbuildChainingDisallowed]
        );
    }

    #[test]
    fn test_trigger_is_validated() {
        assert_eq!(
            codes("FROM node\nONBUILD HEALTHCHECK CURL x"),
            vec![ErrorCode::UnknownType]
        );
        assert_eq!(
            codes("FROM node\nONBUILD FOO bar"),
            vec![ErrorCode::UnknownInstruction]
        );
    }

    #[test]
    fn test_blank_continuation_reported_once_for_onbuild() {
        // the wrapper owns the lines; the trigger must not re-report them
        assert_eq!(
            codes("FROM node\nONBUILD RUN echo a \\\n\n  b"),
            vec![ErrorCode::EmptyContinuationLine]
        );
    }
}

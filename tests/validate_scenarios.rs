//! End-to-end validation scenarios through the public API.

use dockerfile_utils::{
    validate, Diagnostic, ErrorCode, Range, RuleKey, Severity, ValidatorSettings,
};

fn codes(diagnostics: &[Diagnostic]) -> Vec<ErrorCode> {
    diagnostics.iter().map(|d| d.code).collect()
}

#[test]
fn empty_input_reports_no_source_image_at_origin() {
    let diagnostics = validate("", &ValidatorSettings::default());
    assert_eq!(codes(&diagnostics), vec![ErrorCode::NoSourceImage]);
    assert_eq!(diagnostics[0].range, Range::of(0, 0, 0, 0));
    assert_eq!(diagnostics[0].severity, Severity::Error);
}

#[test]
fn leading_expose_reports_no_source_image_on_keyword() {
    let diagnostics = validate("EXPOSE 8080", &ValidatorSettings::default());
    assert_eq!(codes(&diagnostics), vec![ErrorCode::NoSourceImage]);
    assert_eq!(diagnostics[0].range, Range::of(0, 0, 0, 6));
}

#[test]
fn duplicate_build_stage_names_are_both_flagged() {
    let diagnostics = validate(
        "FROM node AS setup\nFROM node AS setup",
        &ValidatorSettings::default(),
    );
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
fn healthcheck_retries_below_one() {
    let diagnostics = validate(
        "FROM alpine\nHEALTHCHECK --retries=0 CMD ls",
        &ValidatorSettings::default(),
    );
    assert_eq!(codes(&diagnostics), vec![ErrorCode::FlagAtLeastOne]);
    assert_eq!(diagnostics[0].range, Range::of(1, 22, 1, 23));
}

#[test]
fn copy_from_flag_with_invalid_value() {
    let diagnostics = validate(
        "FROM alpine\nCOPY --from=^abc . .",
        &ValidatorSettings::default(),
    );
    assert_eq!(codes(&diagnostics), vec![ErrorCode::FlagInvalidFromValue]);
    assert_eq!(diagnostics[0].range, Range::of(1, 12, 1, 16));
}

#[test]
fn ignore_comment_suppresses_the_next_instruction() {
    let source = "FROM node\n# dockerfile-utils: ignore\nMAINTAINER someone";
    assert!(validate(source, &ValidatorSettings::default()).is_empty());

    // without the comment the deprecation fires
    let source = "FROM node\nMAINTAINER someone";
    assert_eq!(
        codes(&validate(source, &ValidatorSettings::default())),
        vec![ErrorCode::DeprecatedMaintainer]
    );
}

#[test]
fn ignoring_every_setting_yields_a_subset_of_the_defaults() {
    let source = "from node\n\
                  MAINTAINER someone\n\
                  workdir app\n\
                  CMD ['a']\n\
                  CMD [\"b\"]\n\
                  RUN echo a \\\n\
                  \n\
                  b\n\
                  STOPSIGNAL TERM";
    let defaults = validate(source, &ValidatorSettings::default());
    let silenced = validate(source, &ValidatorSettings::default().ignore_all());

    let settings_codes = [
        ErrorCode::CasingInstruction,
        ErrorCode::CasingDirective,
        ErrorCode::DeprecatedMaintainer,
        ErrorCode::EmptyContinuationLine,
        ErrorCode::MultipleInstructions,
        ErrorCode::JsonInSingleQuotes,
        ErrorCode::WorkdirIsNotAbsolute,
    ];
    for diagnostic in &silenced {
        assert!(!settings_codes.contains(&diagnostic.code));
        assert!(defaults
            .iter()
            .any(|d| d.code == diagnostic.code && d.range == diagnostic.range));
    }
    // the intrinsic error is still present
    assert!(codes(&silenced).contains(&ErrorCode::InvalidSignal));
}

#[test]
fn elevation_changes_severity_but_nothing_else() {
    let source = "FROM node\nMAINTAINER someone";
    let warnings = validate(source, &ValidatorSettings::default());
    let errors = validate(
        source,
        &ValidatorSettings::default().with_severity(RuleKey::DeprecatedMaintainer, Severity::Error),
    );
    assert_eq!(warnings.len(), 1);
    assert_eq!(errors.len(), 1);
    assert_eq!(warnings[0].severity, Severity::Warning);
    assert_eq!(errors[0].severity, Severity::Error);
    assert_eq!(warnings[0].code, errors[0].code);
    assert_eq!(warnings[0].range, errors[0].range);
}

#[test]
fn unknown_instruction_is_the_sole_keyword_diagnostic() {
    let diagnostics = validate("FROM node\nBOGUS arg1 arg2", &ValidatorSettings::default());
    assert_eq!(codes(&diagnostics), vec![ErrorCode::UnknownInstruction]);
    assert_eq!(diagnostics[0].message, "Unknown instruction: BOGUS");
}

#[test]
fn diagnostics_serialize_to_the_editor_protocol_shape() {
    let diagnostics = validate(
        "FROM node\nMAINTAINER someone",
        &ValidatorSettings::default(),
    );
    let json = serde_json::to_value(&diagnostics).unwrap();
    let entry = &json[0];
    assert_eq!(entry["severity"], 2);
    assert_eq!(entry["source"], "dockerfile-utils");
    assert_eq!(entry["code"], ErrorCode::DeprecatedMaintainer.value());
    assert_eq!(entry["message"], "MAINTAINER has been deprecated");
    assert_eq!(entry["tags"][0], 2);
    assert_eq!(entry["instructionLine"], 1);
    assert_eq!(entry["range"]["start"]["line"], 1);
    assert_eq!(entry["range"]["start"]["character"], 0);

    let errors = validate("FROM node\nFROM node AS a AS b", &ValidatorSettings::default());
    let json = serde_json::to_value(&errors).unwrap();
    assert_eq!(json[0]["severity"], 1);
}

#[test]
fn settings_deserialize_from_editor_json() {
    let settings = ValidatorSettings::from_json(
        r#"{"deprecatedMaintainer": "ignore", "instructionCasing": "error"}"#,
    )
    .unwrap();
    let diagnostics = validate("from node\nMAINTAINER someone", &settings);
    assert_eq!(codes(&diagnostics), vec![ErrorCode::CasingInstruction]);
    assert_eq!(diagnostics[0].severity, Severity::Error);
}

#[test]
fn multi_stage_dockerfile_with_no_findings() {
    let source = "# escape=\\\n\
                  ARG NODE_VERSION=18\n\
                  FROM node:${NODE_VERSION} AS build\n\
                  WORKDIR /app\n\
                  COPY package.json package-lock.json ./\n\
                  RUN npm ci\n\
                  COPY . .\n\
                  RUN npm run build\n\
                  \n\
                  FROM nginx:1.25-alpine\n\
                  COPY --from=build /app/dist /usr/share/nginx/html/\n\
                  EXPOSE 80/tcp\n\
                  HEALTHCHECK --interval=30s --timeout=3s --retries=3 \\\n\
                  \tCMD curl -f http://localhost/ || exit 1\n\
                  STOPSIGNAL SIGQUIT\n\
                  CMD [\"nginx\", \"-g\", \"daemon off;\"]";
    let diagnostics = validate(source, &ValidatorSettings::default());
    assert!(diagnostics.is_empty(), "unexpected: {:?}", diagnostics);
}

#[test]
fn heredoc_bodies_are_not_validated_as_instructions() {
    let source = "FROM alpine\nRUN <<EOF\nMAINTAINER not-an-instruction\nEOF";
    assert!(validate(source, &ValidatorSettings::default()).is_empty());
}

#[test]
fn onbuild_triggers_are_validated_in_place() {
    let source = "FROM alpine\nONBUILD EXPOSE 8080/tcpx";
    let diagnostics = validate(source, &ValidatorSettings::default());
    assert_eq!(codes(&diagnostics), vec![ErrorCode::InvalidProto]);
    assert_eq!(diagnostics[0].instruction_line, Some(1));
}

#[test]
fn the_whole_rule_catalog_can_fire() {
    // one pathological Dockerfile that triggers every rule code
    let source = r#"# Escape=x
# escape=x
MAINTAINER old
from node:a!b AS 1st
FROM node IS x
FROM node AS dup
FROM node AS DUP
FROM --platform node
FROM --os=x node
FROM $undeclared
FROM node AS
WORKDIR app
EXPOSE 8080/tcpx
EXPOSE abc
EXPOSE ${p:Z}
ENV x
ENV a=1 b
ENV q="unterminated
ENV r='unterminated
LABEL =v
COPY a
COPY a b /dest
COPY --chowm=1 a /b/
ADD --bogus=1 a /b/
COPY --from= a /b/
COPY --link=maybe a /b/
COPY --chown=a --chown=b s /d/
HEALTHCHECK --retries=0 CMD ls
HEALTHCHECK --retries=x CMD ls
HEALTHCHECK --interval=10 CMD ls
HEALTHCHECK --timeout=5x CMD ls
HEALTHCHECK --start-period=0s CMD ls
HEALTHCHECK --interval=--5s CMD ls
HEALTHCHECK --badflag=1 CMD ls
HEALTHCHECK NONE ls
HEALTHCHECK WAT
HEALTHCHECK CMD
CMD ['a']
CMD ["b"]
ENTRYPOINT ["a"]
ENTRYPOINT ["b"]
SHELL [bad
SHELL []
STOPSIGNAL TERM
STOPSIGNAL 9 9
STOPSIGNAL
ONBUILD FROM x
ONBUILD ONBUILD RUN a
ONBUILD
WOOF bark
USER
RUN echo a \

b"#;
    let diagnostics = validate(source, &ValidatorSettings::default());
    let triggered: std::collections::HashSet<ErrorCode> =
        diagnostics.iter().map(|d| d.code).collect();

    let expected = [
        ErrorCode::CasingInstruction,
        ErrorCode::CasingDirective,
        ErrorCode::ArgumentMissing,
        ErrorCode::ArgumentExtra,
        ErrorCode::ArgumentRequiresOne,
        ErrorCode::ArgumentRequiresAtLeastOne,
        ErrorCode::ArgumentRequiresTwo,
        ErrorCode::ArgumentRequiresAtLeastTwo,
        ErrorCode::ArgumentRequiresOneOrThree,
        ErrorCode::ArgumentUnnecessary,
        ErrorCode::DuplicateBuildStageName,
        ErrorCode::EmptyContinuationLine,
        ErrorCode::InvalidBuildStageName,
        ErrorCode::FlagAtLeastOne,
        ErrorCode::FlagDuplicate,
        ErrorCode::FlagInvalidDuration,
        ErrorCode::FlagLessThan1ms,
        ErrorCode::FlagMissingDuration,
        ErrorCode::FlagMissingValue,
        ErrorCode::FlagUnknownUnit,
        ErrorCode::FlagExpectedBooleanValue,
        ErrorCode::FlagInvalidFromValue,
        ErrorCode::NoSourceImage,
        ErrorCode::InvalidEscapeDirective,
        ErrorCode::DuplicatedEscapeDirective,
        ErrorCode::InvalidAs,
        ErrorCode::InvalidDestination,
        ErrorCode::InvalidPort,
        ErrorCode::InvalidProto,
        ErrorCode::InvalidReferenceFormat,
        ErrorCode::InvalidSignal,
        ErrorCode::InvalidSyntax,
        ErrorCode::OnbuildChainingDisallowed,
        ErrorCode::OnbuildTriggerDisallowed,
        ErrorCode::ShellJsonForm,
        ErrorCode::ShellRequiresOne,
        ErrorCode::SyntaxMissingEquals,
        ErrorCode::SyntaxMissingNames,
        ErrorCode::SyntaxMissingSingleQuote,
        ErrorCode::SyntaxMissingDoubleQuote,
        ErrorCode::MultipleInstructions,
        ErrorCode::UnknownInstruction,
        ErrorCode::UnknownAddFlag,
        ErrorCode::UnknownCopyFlag,
        ErrorCode::UnknownFromFlag,
        ErrorCode::UnknownHealthcheckFlag,
        ErrorCode::UnknownType,
        ErrorCode::UnsupportedModifier,
        ErrorCode::DeprecatedMaintainer,
        ErrorCode::HealthcheckCmdArgumentMissing,
        ErrorCode::JsonInSingleQuotes,
        ErrorCode::WorkdirIsNotAbsolute,
        ErrorCode::BaseNameEmpty,
    ];
    for code in expected {
        assert!(triggered.contains(&code), "{} did not fire", code);
    }
}

#[test]
fn every_range_is_inside_the_document() {
    let sources = [
        "",
        "EXPOSE 8080",
        "FROM node:\nHEALTHCHECK --retries=0 --interval=1..5s CMD ls",
        "from node\nENV a=\"unterminated\nSHELL ['sh']",
        "FROM node\nRUN echo a \\\n\n\n",
    ];
    for source in sources {
        let line_count = source.split(['\n']).count() as u32;
        for diagnostic in validate(source, &ValidatorSettings::default()) {
            assert!(diagnostic.range.start <= diagnostic.range.end, "{:?}", diagnostic);
            assert!(
                diagnostic.range.end.line <= line_count,
                "range out of bounds for {:?}: {:?}",
                source,
                diagnostic
            );
        }
    }
}

//! Instruction AST types.
//!
//! Every node carries byte spans into the original source so diagnostics
//! and edits can be mapped to editor coordinates. Argument tokens keep a
//! segment map so sub-ranges (an image tag, a flag value, a protocol
//! substring) survive line continuations.

use crate::document::Span;

/// The closed set of recognized instruction keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Add,
    Arg,
    Cmd,
    Copy,
    Entrypoint,
    Env,
    Expose,
    From,
    Healthcheck,
    Label,
    Maintainer,
    Onbuild,
    Run,
    Shell,
    Stopsignal,
    User,
    Volume,
    Workdir,
    /// Anything else.
    Unknown,
}

impl Keyword {
    /// Resolve a raw keyword, case-insensitively.
    pub fn parse(text: &str) -> Self {
        match text.to_ascii_uppercase().as_str() {
            "ADD" => Self::Add,
            "ARG" => Self::Arg,
            "CMD" => Self::Cmd,
            "COPY" => Self::Copy,
            "ENTRYPOINT" => Self::Entrypoint,
            "ENV" => Self::Env,
            "EXPOSE" => Self::Expose,
            "FROM" => Self::From,
            "HEALTHCHECK" => Self::Healthcheck,
            "LABEL" => Self::Label,
            "MAINTAINER" => Self::Maintainer,
            "ONBUILD" => Self::Onbuild,
            "RUN" => Self::Run,
            "SHELL" => Self::Shell,
            "STOPSIGNAL" => Self::Stopsignal,
            "USER" => Self::User,
            "VOLUME" => Self::Volume,
            "WORKDIR" => Self::Workdir,
            _ => Self::Unknown,
        }
    }

    /// The canonical uppercase spelling.
    pub fn canonical(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Arg => "ARG",
            Self::Cmd => "CMD",
            Self::Copy => "COPY",
            Self::Entrypoint => "ENTRYPOINT",
            Self::Env => "ENV",
            Self::Expose => "EXPOSE",
            Self::From => "FROM",
            Self::Healthcheck => "HEALTHCHECK",
            Self::Label => "LABEL",
            Self::Maintainer => "MAINTAINER",
            Self::Onbuild => "ONBUILD",
            Self::Run => "RUN",
            Self::Shell => "SHELL",
            Self::Stopsignal => "STOPSIGNAL",
            Self::User => "USER",
            Self::Volume => "VOLUME",
            Self::Workdir => "WORKDIR",
            Self::Unknown => "",
        }
    }

    /// Instructions whose arguments may be written as a JSON array.
    pub fn accepts_json_form(self) -> bool {
        matches!(
            self,
            Self::Cmd
                | Self::Entrypoint
                | Self::Run
                | Self::Shell
                | Self::Volume
                | Self::Add
                | Self::Copy
        )
    }

    /// Instructions that may introduce heredoc bodies.
    pub fn accepts_heredocs(self) -> bool {
        matches!(self, Self::Run | Self::Copy | Self::Add)
    }

    /// Instructions whose leading `--name` tokens are options.
    pub fn accepts_flags(self) -> bool {
        matches!(self, Self::From | Self::Add | Self::Copy | Self::Healthcheck)
    }

    /// Instructions whose arguments decompose into `key=value` properties.
    pub fn accepts_properties(self) -> bool {
        matches!(self, Self::Arg | Self::Env | Self::Label)
    }
}

/// One contiguous run of token text copied verbatim from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Byte offset of the run inside the token text.
    pub text_start: usize,
    /// Byte offset of the run in the source.
    pub src_start: usize,
    /// Length of the run in bytes.
    pub len: usize,
}

/// A variable occurrence inside an argument token.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// The full occurrence, `$name` or `${name...}`.
    pub span: Span,
    /// The variable name.
    pub name: String,
    /// Span of the name alone.
    pub name_span: Span,
    /// The modifier character after `:` in `${name:mod...}`.
    ///
    /// `Some("")` when the colon is immediately followed by `}`.
    pub modifier: Option<String>,
    /// Span of the modifier character (empty span for `${name:}`).
    pub modifier_span: Option<Span>,
    /// The text between the modifier character and the closing brace.
    pub words: Option<String>,
    /// Byte range of the occurrence inside its token's text.
    pub text_start: usize,
    /// Length of the occurrence inside its token's text.
    pub text_len: usize,
    /// Whether a preceding ARG or ENV declares this name.
    pub declared: bool,
    /// The resolved value, when a preceding declaration supplies one.
    pub value: Option<String>,
}

impl Variable {
    /// The raw text of the occurrence as written.
    pub fn raw<'a>(&self, token: &'a Token) -> &'a str {
        &token.text[self.text_start..self.text_start + self.text_len]
    }
}

/// A positional argument token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token text with line continuations removed.
    pub text: String,
    /// The source span, from first to last character.
    pub span: Span,
    /// Verbatim runs mapping text offsets back to source offsets.
    pub segments: Vec<Segment>,
    /// Variable occurrences within the token.
    pub variables: Vec<Variable>,
    /// The text after substituting resolvable variables.
    pub expanded: String,
}

impl Token {
    /// Map a byte range of the token text back to a source span.
    ///
    /// Returns `None` when the range does not lie within recorded
    /// segments (e.g. it starts inside a removed continuation).
    pub fn span_of(&self, start: usize, end: usize) -> Option<Span> {
        if start > end || end > self.text.len() {
            return None;
        }
        let src_start = self.map_offset(start)?;
        let src_end = if end == start {
            src_start
        } else {
            self.map_end(end)?
        };
        Some(Span::new(src_start, src_end))
    }

    fn map_offset(&self, text_offset: usize) -> Option<usize> {
        for segment in &self.segments {
            if text_offset >= segment.text_start && text_offset <= segment.text_start + segment.len
            {
                return Some(segment.src_start + (text_offset - segment.text_start));
            }
        }
        None
    }

    fn map_end(&self, text_end: usize) -> Option<usize> {
        for segment in &self.segments {
            if text_end > segment.text_start && text_end <= segment.text_start + segment.len {
                return Some(segment.src_start + (text_end - segment.text_start));
            }
        }
        None
    }
}

/// A `--name` or `--name=value` option token.
#[derive(Debug, Clone, PartialEq)]
pub struct Flag {
    /// The whole token, dashes included.
    pub span: Span,
    /// The flag name, without the leading dashes.
    pub name: String,
    /// Span of the name alone.
    pub name_span: Span,
    /// The value after `=`, when present.
    pub value: Option<String>,
    /// Span of the value (empty span for a trailing `=`).
    pub value_span: Option<Span>,
    /// Variable occurrences within the flag token.
    pub variables: Vec<Variable>,
}

/// A `key=value` fragment of ARG, ENV or LABEL.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// The whole fragment.
    pub span: Span,
    /// The raw key text, quotes included.
    pub name: String,
    /// Span of the key.
    pub name_span: Span,
    /// Whether an `=` separated key and value.
    pub has_equals: bool,
    /// The raw value text, quotes included.
    pub value: Option<String>,
    /// Span of the value.
    pub value_span: Option<Span>,
}

/// A heredoc region of a RUN, COPY or ADD instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Heredoc {
    /// The `<<NAME` introduction token.
    pub start_span: Span,
    /// The delimiter name.
    pub name: String,
    /// Whether leading tabs are stripped (`<<-NAME`).
    pub strip_tabs: bool,
    /// The body, from the first content line to the last, terminators
    /// included. `None` when the delimiter immediately follows.
    pub content_span: Option<Span>,
    /// The closing delimiter line. `None` when the heredoc never
    /// terminates before end of file.
    pub delimiter_span: Option<Span>,
}

/// A double-quoted string inside a JSON-form argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonString {
    /// The string, quotes included.
    pub span: Span,
    /// The unescaped content.
    pub value: String,
    /// Whether the closing quote was found.
    pub terminated: bool,
}

/// Decomposition of a JSON-form argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonForm {
    /// The opening bracket.
    pub open_span: Span,
    /// The closing bracket, when found.
    pub close_span: Option<Span>,
    /// The decomposed strings, in order.
    pub strings: Vec<JsonString>,
    /// Whether the list consists solely of terminated double-quoted
    /// strings separated by commas between matching brackets.
    pub well_formed: bool,
    /// The first `\` followed by whitespace inside a string, if any.
    pub bad_escape: Option<Span>,
}

/// FROM-specific sub-ranges of the image argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FromParts {
    /// The tag after `:`, empty span for a bare trailing colon.
    pub tag_span: Option<Span>,
    /// The digest after `@`, empty span for a bare trailing at-sign.
    pub digest_span: Option<Span>,
}

/// A parsed instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The resolved keyword.
    pub kind: Keyword,
    /// The keyword as written.
    pub keyword: String,
    /// Span of the keyword.
    pub keyword_span: Span,
    /// The full instruction, continuations and heredoc bodies included.
    pub span: Span,
    /// Positional arguments, flags excluded.
    pub args: Vec<Token>,
    /// Leading `--name[=value]` options, for keywords that take them.
    pub flags: Vec<Flag>,
    /// `key=value` decomposition, for ARG, ENV and LABEL.
    pub properties: Vec<Property>,
    /// Heredoc regions, for RUN, COPY and ADD.
    pub heredocs: Vec<Heredoc>,
    /// JSON-form decomposition, when the arguments open with `[`.
    pub json: Option<JsonForm>,
    /// Image sub-ranges, for FROM.
    pub from: Option<FromParts>,
    /// The triggered instruction, for ONBUILD.
    pub trigger: Option<Box<Instruction>>,
}

impl Instruction {
    /// The span from the first option or argument to the last, heredoc
    /// bodies excluded. `None` when the instruction has no arguments.
    pub fn args_span(&self) -> Option<Span> {
        let first = self
            .flags
            .first()
            .map(|f| f.span.start)
            .into_iter()
            .chain(self.args.first().map(|a| a.span.start))
            .min()?;
        let last = self
            .flags
            .last()
            .map(|f| f.span.end)
            .into_iter()
            .chain(self.args.last().map(|a| a.span.end))
            .max()?;
        Some(Span::new(first, last))
    }

    /// Iterate every variable occurrence in the instruction's arguments
    /// and flags.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.args
            .iter()
            .flat_map(|token| token.variables.iter())
            .chain(self.flags.iter().flat_map(|flag| flag.variables.iter()))
    }

    /// Whether the keyword is written in its canonical uppercase form.
    pub fn keyword_is_canonical(&self) -> bool {
        self.keyword == self.kind.canonical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_parse_is_case_insensitive() {
        assert_eq!(Keyword::parse("from"), Keyword::From);
        assert_eq!(Keyword::parse("From"), Keyword::From);
        assert_eq!(Keyword::parse("HEALTHCHECK"), Keyword::Healthcheck);
        assert_eq!(Keyword::parse("BOGUS"), Keyword::Unknown);
    }

    #[test]
    fn test_keyword_families() {
        assert!(Keyword::Shell.accepts_json_form());
        assert!(!Keyword::Env.accepts_json_form());
        assert!(Keyword::Run.accepts_heredocs());
        assert!(!Keyword::Cmd.accepts_heredocs());
        assert!(Keyword::Healthcheck.accepts_flags());
        assert!(!Keyword::Run.accepts_flags());
        assert!(Keyword::Label.accepts_properties());
    }

    #[test]
    fn test_token_span_mapping() {
        // Token "node:18" split by a continuation between "node" and ":18".
        let token = Token {
            text: "node:18".to_string(),
            span: Span::new(5, 20),
            segments: vec![
                Segment {
                    text_start: 0,
                    src_start: 5,
                    len: 4,
                },
                Segment {
                    text_start: 4,
                    src_start: 17,
                    len: 3,
                },
            ],
            variables: Vec::new(),
            expanded: "node:18".to_string(),
        };
        assert_eq!(token.span_of(0, 4), Some(Span::new(5, 9)));
        assert_eq!(token.span_of(5, 7), Some(Span::new(18, 20)));
        assert_eq!(token.span_of(4, 4), Some(Span::new(9, 9)));
    }
}

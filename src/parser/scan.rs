//! The instruction scanner.
//!
//! Scans logical instructions out of the raw source, honoring the active
//! escape character: an escape followed by trailing blanks and a line
//! terminator continues the instruction, and blank or comment lines after
//! a continuation are consumed into the instruction. Tokens record the
//! verbatim source runs they were assembled from.

use crate::document::Span;
use crate::parser::instruction::{
    Flag, FromParts, Heredoc, Instruction, JsonForm, JsonString, Keyword, Property, Segment,
    Token, Variable,
};
use crate::parser::Comment;

pub(crate) struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pub(crate) pos: usize,
    escape: u8,
    /// Comments discovered inside continued instructions.
    pub(crate) comments: Vec<Comment>,
    /// End offset of the last consumed content, line breaks excluded.
    end_marker: usize,
}

fn is_space(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn is_break(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(src: &'a str, escape: char, pos: usize) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos,
            escape: escape as u8,
            comments: Vec::new(),
            end_marker: pos,
        }
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub(crate) fn cur(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.src[offset..].chars().next()
    }

    fn after_break(&self, at: usize) -> usize {
        if self.bytes.get(at) == Some(&b'\r') && self.bytes.get(at + 1) == Some(&b'\n') {
            at + 2
        } else {
            at + 1
        }
    }

    fn line_end_from(&self, mut i: usize) -> usize {
        while i < self.bytes.len() && !is_break(self.bytes[i]) {
            i += 1;
        }
        i
    }

    fn push_comment(&mut self, hash: usize, end: usize) {
        let content = self.src[hash + 1..end].trim().to_string();
        self.comments.push(Comment {
            span: Span::new(hash, end),
            content,
        });
    }

    /// Consume a stand-alone comment line at the current position.
    pub(crate) fn consume_comment_line(&mut self) {
        let hash = self.pos;
        let end = self.line_end_from(hash);
        self.push_comment(hash, end);
        self.pos = end;
    }

    /// If `at` starts an escape-continuation (escape, blanks, terminator),
    /// return the offset just past the terminator.
    fn continuation_after(&self, at: usize) -> Option<usize> {
        if self.bytes.get(at) != Some(&self.escape) {
            return None;
        }
        let mut j = at + 1;
        while j < self.bytes.len() && is_space(self.bytes[j]) {
            j += 1;
        }
        if j >= self.bytes.len() {
            return Some(j);
        }
        if is_break(self.bytes[j]) {
            Some(self.after_break(j))
        } else {
            None
        }
    }

    /// Consume a continuation at the current position, together with any
    /// blank or comment lines that follow it.
    fn try_continuation(&mut self) -> bool {
        let Some(after) = self.continuation_after(self.pos) else {
            return false;
        };
        self.pos = after;
        loop {
            let line_start = self.pos;
            let mut j = line_start;
            while j < self.bytes.len() && is_space(self.bytes[j]) {
                j += 1;
            }
            if j >= self.bytes.len() {
                // trailing blank run up to end of file
                self.pos = j;
                self.end_marker = self.end_marker.max(j);
                return true;
            }
            if is_break(self.bytes[j]) {
                // an empty continuation line, consumed into the instruction
                self.end_marker = self.end_marker.max(j);
                self.pos = self.after_break(j);
                continue;
            }
            if self.bytes[j] == b'#' {
                let end = self.line_end_from(j);
                self.push_comment(j, end);
                self.end_marker = self.end_marker.max(end);
                self.pos = if end < self.bytes.len() {
                    self.after_break(end)
                } else {
                    end
                };
                continue;
            }
            self.pos = line_start;
            return true;
        }
    }

    /// Skip blanks and continuations between tokens of one instruction.
    fn skip_inline_space(&mut self) {
        loop {
            match self.cur() {
                Some(b) if is_space(b) => self.pos += 1,
                Some(b) if b == self.escape && self.continuation_after(self.pos).is_some() => {
                    self.try_continuation();
                }
                _ => return,
            }
        }
    }

    fn push_char(&mut self, builder: &mut TokenBuilder, ch: char) {
        builder.push(ch, self.pos, &mut self.end_marker);
        self.pos += ch.len_utf8();
    }

    /// Scan one whitespace-delimited token. Double and single quotes group
    /// text, escaped characters keep both bytes, continuations vanish.
    pub(crate) fn scan_token(&mut self) -> Token {
        let mut builder = TokenBuilder::new(self.pos);
        let mut quote: Option<u8> = None;
        loop {
            let Some(b) = self.cur() else { break };
            if b == self.escape && self.continuation_after(self.pos).is_some() {
                self.try_continuation();
                // a blank after the continuation ends the token
                if quote.is_none() {
                    match self.cur() {
                        Some(b2) if is_space(b2) => break,
                        _ => {}
                    }
                }
                continue;
            }
            if is_break(b) {
                break;
            }
            match quote {
                None => {
                    if is_space(b) {
                        break;
                    }
                    if b == b'"' || b == b'\'' {
                        quote = Some(b);
                        self.push_char(&mut builder, b as char);
                    } else if b == self.escape {
                        self.push_char(&mut builder, b as char);
                        if let Some(ch) = self.cur().filter(|b2| !is_break(*b2)).and_then(|_| {
                            self.char_at(self.pos)
                        }) {
                            self.push_char(&mut builder, ch);
                        }
                    } else if b == b'$' {
                        self.scan_variable(&mut builder);
                    } else {
                        let ch = self.char_at(self.pos).unwrap();
                        self.push_char(&mut builder, ch);
                    }
                }
                Some(q) => {
                    if b == q {
                        quote = None;
                        self.push_char(&mut builder, b as char);
                    } else if b == self.escape {
                        self.push_char(&mut builder, b as char);
                        if let Some(ch) = self.cur().filter(|b2| !is_break(*b2)).and_then(|_| {
                            self.char_at(self.pos)
                        }) {
                            self.push_char(&mut builder, ch);
                        }
                    } else if b == b'$' {
                        self.scan_variable(&mut builder);
                    } else {
                        let ch = self.char_at(self.pos).unwrap();
                        self.push_char(&mut builder, ch);
                    }
                }
            }
        }
        builder.finish()
    }

    /// Scan a `$name` or `${name...}` occurrence into the current token.
    fn scan_variable(&mut self, builder: &mut TokenBuilder) {
        let var_src_start = self.pos;
        let var_text_start = builder.text.len();
        self.push_char(builder, '$');

        if self.cur() == Some(b'{') {
            self.push_char(builder, '{');
            let name_start = self.pos;
            let mut name = String::new();
            loop {
                if self.try_continuation() {
                    continue;
                }
                match self.cur() {
                    Some(b) if !is_break(b) && b != b':' && b != b'}' => {
                        let ch = self.char_at(self.pos).unwrap();
                        name.push(ch);
                        self.push_char(builder, ch);
                    }
                    _ => break,
                }
            }
            let name_span = Span::new(name_start, self.pos);
            let mut modifier = None;
            let mut modifier_span = None;
            let mut words = None;
            if self.cur() == Some(b':') {
                self.push_char(builder, ':');
                if self.cur() == Some(b'}') {
                    modifier = Some(String::new());
                    modifier_span = Some(Span::empty(self.pos));
                } else if self.cur().is_some_and(|b| !is_break(b)) {
                    let ch = self.char_at(self.pos).unwrap();
                    let start = self.pos;
                    modifier = Some(ch.to_string());
                    self.push_char(builder, ch);
                    modifier_span = Some(Span::new(start, self.pos));
                    // the words run to the matching brace, nesting allowed
                    let mut depth = 0u32;
                    let mut collected = String::new();
                    loop {
                        if self.try_continuation() {
                            continue;
                        }
                        match self.cur() {
                            Some(b'{') => {
                                depth += 1;
                                collected.push('{');
                                self.push_char(builder, '{');
                            }
                            Some(b'}') if depth > 0 => {
                                depth -= 1;
                                collected.push('}');
                                self.push_char(builder, '}');
                            }
                            Some(b'}') => break,
                            Some(b) if !is_break(b) => {
                                let ch = self.char_at(self.pos).unwrap();
                                collected.push(ch);
                                self.push_char(builder, ch);
                            }
                            _ => break,
                        }
                    }
                    words = Some(collected);
                }
            }
            if self.cur() == Some(b'}') {
                self.push_char(builder, '}');
            }
            builder.variables.push(Variable {
                span: Span::new(var_src_start, self.pos),
                name,
                name_span,
                modifier,
                modifier_span,
                words,
                text_start: var_text_start,
                text_len: builder.text.len() - var_text_start,
                declared: false,
                value: None,
            });
        } else {
            let name_start = self.pos;
            let mut name = String::new();
            while let Some(b) = self.cur() {
                let ok = if name.is_empty() {
                    b.is_ascii_alphabetic() || b == b'_'
                } else {
                    b.is_ascii_alphanumeric() || b == b'_'
                };
                if !ok {
                    break;
                }
                name.push(b as char);
                self.push_char(builder, b as char);
            }
            if name.is_empty() {
                // a bare '$', not a variable
                return;
            }
            builder.variables.push(Variable {
                span: Span::new(var_src_start, self.pos),
                name,
                name_span: Span::new(name_start, self.pos),
                modifier: None,
                modifier_span: None,
                words: None,
                text_start: var_text_start,
                text_len: builder.text.len() - var_text_start,
                declared: false,
                value: None,
            });
        }
    }

    /// Parse one instruction starting at the current position. Consumes
    /// the logical line, any heredoc bodies and the trailing terminator.
    pub(crate) fn parse_instruction(&mut self) -> Instruction {
        let start = self.pos;
        self.end_marker = self.pos;
        let keyword_token = self.scan_token();
        let kind = Keyword::parse(&keyword_token.text);

        if kind == Keyword::Onbuild {
            self.skip_inline_space();
            let trigger = match self.cur() {
                None => None,
                Some(b) if is_break(b) => {
                    self.pos = self.after_break(self.pos);
                    None
                }
                Some(_) => Some(Box::new(self.parse_instruction())),
            };
            let end = trigger
                .as_ref()
                .map(|t| t.span.end)
                .unwrap_or(keyword_token.span.end);
            return Instruction {
                kind,
                keyword: keyword_token.text,
                keyword_span: keyword_token.span,
                span: Span::new(start, end),
                args: Vec::new(),
                flags: Vec::new(),
                properties: Vec::new(),
                heredocs: Vec::new(),
                json: None,
                from: None,
                trigger,
            };
        }

        let mut tokens = Vec::new();
        let mut pending: Vec<(String, bool, Span)> = Vec::new();
        loop {
            self.skip_inline_space();
            match self.cur() {
                None => break,
                Some(b) if is_break(b) => {
                    self.pos = self.after_break(self.pos);
                    break;
                }
                Some(_) => {}
            }
            let token = self.scan_token();
            if kind.accepts_heredocs() {
                if let Some((name, strip_tabs)) = heredoc_intro(&token.text) {
                    pending.push((name, strip_tabs, token.span));
                }
            }
            tokens.push(token);
        }

        let mut heredocs = Vec::new();
        for (name, strip_tabs, start_span) in pending {
            heredocs.push(self.scan_heredoc_body(name, strip_tabs, start_span));
        }

        let (flags, args) = if kind.accepts_flags() {
            split_flags(tokens)
        } else {
            (Vec::new(), tokens)
        };

        let properties = if kind.accepts_properties() {
            build_properties(kind, &args)
        } else {
            Vec::new()
        };

        let json = if kind.accepts_json_form() {
            parse_json_form(&args)
        } else {
            None
        };

        let from = if kind == Keyword::From {
            args.first().map(from_parts)
        } else {
            None
        };

        let end = self.end_marker.max(keyword_token.span.end);
        Instruction {
            kind,
            keyword: keyword_token.text,
            keyword_span: keyword_token.span,
            span: Span::new(start, end),
            args,
            flags,
            properties,
            heredocs,
            json,
            from,
            trigger: None,
        }
    }

    fn scan_heredoc_body(&mut self, name: String, strip_tabs: bool, start_span: Span) -> Heredoc {
        let content_start = self.pos;
        loop {
            if self.at_end() {
                // unterminated: the rest of the file belongs to the body
                self.end_marker = self.end_marker.max(self.src.len());
                return Heredoc {
                    start_span,
                    name,
                    strip_tabs,
                    content_span: if content_start < self.src.len() {
                        Some(Span::new(content_start, self.src.len()))
                    } else {
                        None
                    },
                    delimiter_span: None,
                };
            }
            let line_start = self.pos;
            let line_end = self.line_end_from(line_start);
            let line = &self.src[line_start..line_end];
            let candidate = if strip_tabs {
                line.trim_start_matches('\t')
            } else {
                line
            };
            if candidate == name {
                let delim_start = line_start + (line.len() - candidate.len());
                self.end_marker = self.end_marker.max(line_end);
                self.pos = if line_end < self.src.len() {
                    self.after_break(line_end)
                } else {
                    line_end
                };
                return Heredoc {
                    start_span,
                    name,
                    strip_tabs,
                    content_span: if line_start > content_start {
                        Some(Span::new(content_start, line_start))
                    } else {
                        None
                    },
                    delimiter_span: Some(Span::new(delim_start, line_end)),
                };
            }
            self.end_marker = self.end_marker.max(line_end);
            self.pos = if line_end < self.src.len() {
                self.after_break(line_end)
            } else {
                line_end
            };
        }
    }
}

/// Builder accumulating one token's text, segments and variables.
struct TokenBuilder {
    start: usize,
    last_end: usize,
    text: String,
    segments: Vec<Segment>,
    variables: Vec<Variable>,
}

impl TokenBuilder {
    fn new(start: usize) -> Self {
        Self {
            start,
            last_end: start,
            text: String::new(),
            segments: Vec::new(),
            variables: Vec::new(),
        }
    }

    fn push(&mut self, ch: char, src_offset: usize, end_marker: &mut usize) {
        let text_offset = self.text.len();
        let len = ch.len_utf8();
        match self.segments.last_mut() {
            Some(seg)
                if seg.text_start + seg.len == text_offset
                    && seg.src_start + seg.len == src_offset =>
            {
                seg.len += len;
            }
            _ => self.segments.push(Segment {
                text_start: text_offset,
                src_start: src_offset,
                len,
            }),
        }
        self.text.push(ch);
        self.last_end = src_offset + len;
        *end_marker = (*end_marker).max(self.last_end);
    }

    fn finish(self) -> Token {
        let expanded = self.text.clone();
        Token {
            text: self.text,
            span: Span::new(self.start, self.last_end),
            segments: self.segments,
            variables: self.variables,
            expanded,
        }
    }
}

/// Recognize a `<<NAME`, `<<-NAME`, `<<"NAME"` or `<<'NAME'` token.
pub(crate) fn heredoc_intro(text: &str) -> Option<(String, bool)> {
    let rest = text.strip_prefix("<<")?;
    let (rest, strip_tabs) = match rest.strip_prefix('-') {
        Some(r) => (r, true),
        None => (rest, false),
    };
    let name = match rest.chars().next() {
        Some(q @ ('"' | '\'')) => rest[1..].strip_suffix(q)?,
        _ => rest,
    };
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((name.to_string(), strip_tabs))
}

fn split_flags(tokens: Vec<Token>) -> (Vec<Flag>, Vec<Token>) {
    let mut flags = Vec::new();
    let mut args = Vec::new();
    let mut in_flags = true;
    for token in tokens {
        if in_flags && token.text.starts_with("--") {
            flags.push(flag_from_token(&token));
        } else {
            in_flags = false;
            args.push(token);
        }
    }
    (flags, args)
}

fn flag_from_token(token: &Token) -> Flag {
    let text = &token.text;
    match text.find('=') {
        Some(eq) => Flag {
            span: token.span,
            name: text[2..eq].to_string(),
            name_span: token.span_of(2, eq).unwrap_or(token.span),
            value: Some(text[eq + 1..].to_string()),
            value_span: Some(token.span_of(eq + 1, text.len()).unwrap_or(token.span)),
            variables: token.variables.clone(),
        },
        None => Flag {
            span: token.span,
            name: text[2..].to_string(),
            name_span: token.span_of(2, text.len()).unwrap_or(token.span),
            value: None,
            value_span: None,
            variables: token.variables.clone(),
        },
    }
}

fn build_properties(kind: Keyword, args: &[Token]) -> Vec<Property> {
    if args.is_empty() {
        return Vec::new();
    }
    if matches!(kind, Keyword::Env | Keyword::Label) && !args[0].text.contains('=') {
        // legacy space syntax: the first token is the key, the rest the value
        let key = &args[0];
        let (value, value_span) = if args.len() > 1 {
            let text = args[1..]
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let span = Span::new(args[1].span.start, args[args.len() - 1].span.end);
            (Some(text), Some(span))
        } else {
            (None, None)
        };
        let end = args[args.len() - 1].span.end;
        return vec![Property {
            span: Span::new(key.span.start, end),
            name: key.text.clone(),
            name_span: key.span,
            has_equals: false,
            value,
            value_span,
        }];
    }
    args.iter().map(property_from_token).collect()
}

fn property_from_token(token: &Token) -> Property {
    match token.text.find('=') {
        Some(eq) => Property {
            span: token.span,
            name: token.text[..eq].to_string(),
            name_span: token.span_of(0, eq).unwrap_or(token.span),
            has_equals: true,
            value: Some(token.text[eq + 1..].to_string()),
            value_span: Some(token.span_of(eq + 1, token.text.len()).unwrap_or(token.span)),
        },
        None => Property {
            span: token.span,
            name: token.text.clone(),
            name_span: token.span,
            has_equals: false,
            value: None,
            value_span: None,
        },
    }
}

/// Locate the tag and digest delimiters of a FROM image argument,
/// skipping over variable occurrences.
fn from_parts(token: &Token) -> FromParts {
    let text = &token.text;
    let in_variable = |i: usize| {
        token
            .variables
            .iter()
            .any(|v| i >= v.text_start && i < v.text_start + v.text_len)
    };
    if let Some(at) = text
        .char_indices()
        .find(|(i, c)| *c == '@' && !in_variable(*i))
        .map(|(i, _)| i)
    {
        return FromParts {
            tag_span: None,
            digest_span: token.span_of(at + 1, text.len()),
        };
    }
    let last_slash = text
        .char_indices()
        .filter(|(i, c)| *c == '/' && !in_variable(*i))
        .map(|(i, _)| i)
        .last();
    let search_from = last_slash.map(|i| i + 1).unwrap_or(0);
    let colon = text[search_from..]
        .char_indices()
        .find(|(i, c)| *c == ':' && !in_variable(search_from + i))
        .map(|(i, _)| search_from + i);
    FromParts {
        tag_span: colon.and_then(|i| token.span_of(i + 1, text.len())),
        digest_span: None,
    }
}

/// Decompose a JSON-form argument list from the instruction's tokens.
fn parse_json_form(args: &[Token]) -> Option<JsonForm> {
    let first = args.first()?;
    if !first.text.starts_with('[') {
        return None;
    }

    #[derive(PartialEq)]
    enum State {
        ExpectOpen,
        ExpectElement { first: bool },
        AfterElement,
        Done,
    }

    let mut state = State::ExpectOpen;
    let mut open_span = None;
    let mut close_span = None;
    let mut strings = Vec::new();
    let mut well_formed = true;
    let mut bad_escape = None;

    'outer: for token in args {
        let text = token.text.as_bytes();
        let mut i = 0;
        while i < text.len() {
            let b = text[i];
            match b {
                b'[' if state == State::ExpectOpen => {
                    open_span = token.span_of(i, i + 1);
                    state = State::ExpectElement { first: true };
                    i += 1;
                }
                b']' if matches!(
                    state,
                    State::AfterElement | State::ExpectElement { first: true }
                ) =>
                {
                    close_span = token.span_of(i, i + 1);
                    state = State::Done;
                    i += 1;
                }
                b',' if state == State::AfterElement => {
                    state = State::ExpectElement { first: false };
                    i += 1;
                }
                b'"' if matches!(state, State::ExpectElement { .. }) => {
                    let start = i;
                    let mut value = String::new();
                    let mut terminated = false;
                    i += 1;
                    while i < text.len() {
                        match text[i] {
                            b'"' => {
                                terminated = true;
                                i += 1;
                                break;
                            }
                            b'\\' if i + 1 < text.len() => {
                                let next = text[i + 1];
                                if (next == b' ' || next == b'\t') && bad_escape.is_none() {
                                    bad_escape = token.span_of(i, i + 2);
                                }
                                if next == b'"' || next == b'\\' {
                                    value.push(next as char);
                                } else {
                                    value.push('\\');
                                    value.push(next as char);
                                }
                                i += 2;
                            }
                            _ => {
                                let ch = token.text[i..].chars().next().unwrap();
                                value.push(ch);
                                i += ch.len_utf8();
                            }
                        }
                    }
                    if !terminated {
                        well_formed = false;
                    }
                    strings.push(JsonString {
                        span: token.span_of(start, i).unwrap_or(token.span),
                        value,
                        terminated,
                    });
                    state = State::AfterElement;
                }
                _ => {
                    well_formed = false;
                    break 'outer;
                }
            }
        }
    }

    if state != State::Done {
        well_formed = false;
    }

    Some(JsonForm {
        open_span: open_span?,
        close_span,
        strings,
        well_formed,
        bad_escape,
    })
}

// ES|QL lexer
//
// Mode-driven tokenizer. Which tokens are reachable depends on the top of
// the mode stack: the same text is an index pattern after FROM, a field
// pattern after KEEP and an identifier after EVAL. Command keywords push
// modes, `|` pops back to Default, `[` and `]` open and close bracket
// frames. Whitespace and comments are emitted on the hidden channel.
//
// The lexer never fails: input the active mode does not accept becomes an
// Error token plus a lexical diagnostic, and lexing continues.

use esql_ast::Span;
use esql_error::Diagnostic;
use memchr::memchr2;
use tracing::debug;

use crate::mode::{Mode, ModeStack};
use crate::stream::CharStream;
use crate::token::{command_keyword, expression_keyword, Channel, Token, TokenKind};

/// Knobs the lexer honours. The dev gate decides whether preview keywords
/// are keywords at all; it never changes token boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LexerOptions {
    pub dev_features: bool,
}

/// ES|QL lexer that produces a stream of tokens from query text.
pub struct Lexer<'a> {
    stream: CharStream<'a>,
    modes: ModeStack,
    options: LexerOptions,
    diagnostics: Vec<Diagnostic>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str, options: LexerOptions) -> Self {
        Self {
            stream: CharStream::new(source),
            modes: ModeStack::new(),
            options,
            diagnostics: Vec::new(),
            finished: false,
        }
    }

    /// Tokenize the entire input. The last token is always `Eof`.
    #[must_use]
    pub fn tokenize(source: &'a str, options: LexerOptions) -> Vec<Token<'a>> {
        let mut lexer = Self::new(source, options);
        lexer.tokenize_all()
    }

    /// Drain the remaining input into tokens, `Eof` included.
    pub fn tokenize_all(&mut self) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        tokens
    }

    #[must_use]
    pub const fn mode_stack(&self) -> &ModeStack {
        &self.modes
    }

    /// Lexical diagnostics recorded so far, in source order.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Produce the next token. After end of input this keeps returning `Eof`.
    pub fn next_token(&mut self) -> Token<'a> {
        let start = self.stream.position();
        let line = self.stream.line();
        let col = self.stream.col();

        let Some(ch) = self.stream.peek(0) else {
            if !self.finished {
                self.modes.unwind_at_eof();
                self.finished = true;
            }
            return self.make_token(TokenKind::Eof, start, line, col);
        };

        let kind = if let Some(kind) = self.lex_trivia(ch, start, line, col) {
            kind
        } else if ch == '|' {
            self.stream.advance();
            self.modes.pop_to_default();
            TokenKind::Pipe
        } else {
            match self.modes.current() {
                Mode::Default => self.lex_default(ch, start, line, col),
                Mode::Expression => self.lex_expression(ch, start, line, col),
                Mode::Explain => self.lex_explain(ch, start, line, col),
                Mode::From => self.lex_from(ch, start, line, col),
                Mode::Project => self.lex_project(ch, start, line, col, false),
                Mode::Rename => self.lex_project(ch, start, line, col, true),
                Mode::Enrich => self.lex_enrich(ch, start, line, col),
                Mode::EnrichField => self.lex_enrich_field(ch, start, line, col),
                Mode::MvExpand => self.lex_mv_expand(ch, start, line, col),
                Mode::Show => self.lex_show(start, line, col),
                Mode::Setting => self.lex_setting(ch, start, line, col),
                Mode::Lookup => self.lex_lookup(ch, start, line, col),
                Mode::LookupField => self.lex_lookup_field(ch, start, line, col),
                Mode::Metrics => self.lex_metrics(ch, start, line, col),
                Mode::ClosingMetrics => self.lex_closing_metrics(ch, start, line, col),
            }
        };

        self.make_token(kind, start, line, col)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    #[allow(clippy::cast_possible_truncation)]
    fn make_token(&self, kind: TokenKind, start: usize, line: u32, col: u32) -> Token<'a> {
        let end = self.stream.position();
        Token {
            kind,
            text: self.stream.slice(start, end),
            span: Span::new(start as u32, end as u32),
            line,
            col,
            channel: if kind.is_trivia() {
                Channel::Hidden
            } else {
                Channel::Default
            },
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn report(&mut self, message: String, start: usize, line: u32, col: u32) {
        let span = Span::new(start as u32, self.stream.position() as u32);
        debug!(%span, mode = ?self.modes.current(), %message, "lexical error");
        self.diagnostics
            .push(Diagnostic::lexical(message, span, line, col));
    }

    /// Consume a single character and return `kind`.
    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.stream.advance();
        kind
    }

    /// Consume the offending run (up to whitespace, `|` or EOF) as an Error
    /// token. The mode stack is left alone.
    fn error_run(&mut self, start: usize, line: u32, col: u32) -> TokenKind {
        self.stream.advance();
        self.stream.advance_while(|c| !is_ws(c) && c != '|');
        let text = self.stream.slice(start, self.stream.position());
        self.report(format!("unrecognized input '{text}'"), start, line, col);
        TokenKind::Error
    }

    /// An unterminated string, quoted identifier or comment: report it and
    /// resynchronize in Default mode.
    fn unterminated(&mut self, what: &str, start: usize, line: u32, col: u32) -> TokenKind {
        self.report(format!("unterminated {what}"), start, line, col);
        self.modes.reset();
        TokenKind::Error
    }

    fn open_bracket(&mut self, mode: Mode) -> TokenKind {
        self.stream.advance();
        self.modes.push_bracket(mode);
        TokenKind::OpeningBracket
    }

    fn close_bracket(&mut self) -> TokenKind {
        self.stream.advance();
        self.modes.close_bracket();
        TokenKind::ClosingBracket
    }

    fn text_since(&self, start: usize) -> &'a str {
        self.stream.slice(start, self.stream.position())
    }

    // -----------------------------------------------------------------------
    // Trivia (all modes)
    // -----------------------------------------------------------------------

    fn lex_trivia(&mut self, ch: char, start: usize, line: u32, col: u32) -> Option<TokenKind> {
        if self.stream.starts_with("//") {
            self.stream.skip_line();
            return Some(TokenKind::LineComment);
        }
        if self.stream.starts_with("/*") {
            return Some(self.lex_block_comment(start, line, col));
        }
        if is_ws(ch) {
            self.stream.advance_while(is_ws);
            return Some(TokenKind::Whitespace);
        }
        None
    }

    /// `/* ... */`, nesting allowed.
    fn lex_block_comment(&mut self, start: usize, line: u32, col: u32) -> TokenKind {
        let mut depth = 0usize;
        loop {
            if self.stream.starts_with("/*") {
                self.stream.advance_to(self.stream.position() + 2);
                depth += 1;
            } else if self.stream.starts_with("*/") {
                self.stream.advance_to(self.stream.position() + 2);
                depth -= 1;
                if depth == 0 {
                    return TokenKind::MultilineComment;
                }
            } else {
                // Jump to the next candidate delimiter byte.
                let rest = self.stream.rest().as_bytes();
                match memchr2(b'/', b'*', rest) {
                    Some(0) => {
                        self.stream.advance();
                    }
                    Some(idx) => self.stream.advance_to(self.stream.position() + idx),
                    None => {
                        self.stream.advance_to(self.stream.source().len());
                        return self.unterminated("block comment", start, line, col);
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Shared scanners
    // -----------------------------------------------------------------------

    /// `[a-z][a-z0-9_]*` or `[_@]+[a-z0-9_]+`, case-insensitive.
    fn scan_unquoted_identifier(&mut self) -> bool {
        match self.stream.peek(0) {
            Some(c) if c.is_ascii_alphabetic() => {
                self.stream.advance();
                self.stream.advance_while(is_id_body);
                true
            }
            Some('_' | '@') if self.at_prefixed_id(is_id_body) => {
                self.stream.advance_while(is_id_prefix);
                self.stream.advance_while(is_id_body);
                true
            }
            _ => false,
        }
    }

    /// Whether the cursor sits on `[_@]+` followed by at least one `body`
    /// character. A trailing `_` of the run can serve as that character.
    fn at_prefixed_id(&self, body: fn(char) -> bool) -> bool {
        let run = self.stream.rest().bytes().take_while(|&b| b == b'_' || b == b'@');
        let (len, last) = run.fold((0, None), |(n, _), b| (n + 1, Some(b)));
        match last {
            None => false,
            Some(b'_') if len >= 2 => true,
            Some(_) => self.stream.peek(len).is_some_and(body),
        }
    }

    /// A backquoted identifier with doubled backquotes as escapes. Returns
    /// false when the closing backquote is missing (cursor left at EOF).
    fn scan_quoted_identifier(&mut self) -> bool {
        self.stream.advance();
        loop {
            match self.stream.find_byte(b'`') {
                Some(idx) => {
                    self.stream.advance_to(self.stream.position() + idx + 1);
                    if self.stream.peek(0) == Some('`') {
                        self.stream.advance();
                    } else {
                        return true;
                    }
                }
                None => {
                    self.stream.advance_to(self.stream.source().len());
                    return false;
                }
            }
        }
    }

    fn lex_quoted_identifier(&mut self, start: usize, line: u32, col: u32) -> TokenKind {
        if self.scan_quoted_identifier() {
            TokenKind::QuotedIdentifier
        } else {
            self.unterminated("quoted identifier", start, line, col)
        }
    }

    /// Field pattern: unquoted parts may contain `*`, backquoted parts may
    /// be glued on. `None` when nothing matched.
    fn lex_id_pattern(&mut self, start: usize, line: u32, col: u32) -> Option<TokenKind> {
        let mut matched = false;
        loop {
            match self.stream.peek(0) {
                Some('`') => {
                    if !self.scan_quoted_identifier() {
                        return Some(self.unterminated("quoted identifier", start, line, col));
                    }
                }
                Some(c) if c.is_ascii_alphabetic() || c == '*' => {
                    self.stream.advance();
                    self.stream.advance_while(is_pattern_body);
                }
                Some('_' | '@') if self.at_prefixed_id(is_pattern_body) => {
                    self.stream.advance_while(is_id_prefix);
                    self.stream.advance_while(is_pattern_body);
                }
                _ => break,
            }
            matched = true;
        }
        matched.then_some(TokenKind::IdPattern)
    }

    /// Index or table name: anything but `: " = | , [ ]` and whitespace.
    /// A `/` takes the next character with it, whatever it is, unless the
    /// pair opens a comment.
    fn scan_unquoted_source(&mut self) -> usize {
        let begin = self.stream.position();
        while let Some(c) = self.stream.peek(0) {
            if c == '/' {
                match self.stream.peek(1) {
                    Some(n) if n != '*' && n != '/' => {
                        self.stream.advance();
                        self.stream.advance();
                        continue;
                    }
                    _ => break,
                }
            }
            if is_ws(c) || matches!(c, ':' | '"' | '=' | '|' | ',' | '[' | ']') {
                break;
            }
            self.stream.advance();
        }
        self.stream.position() - begin
    }

    fn lex_param(&mut self) -> TokenKind {
        self.stream.advance();
        match self.stream.peek(0) {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                self.stream.advance_while(is_id_body);
                TokenKind::NamedOrPositionalParam
            }
            Some(c) if c.is_ascii_digit() => {
                self.stream.advance_while(|c| c.is_ascii_digit());
                TokenKind::NamedOrPositionalParam
            }
            _ => TokenKind::Param,
        }
    }

    // -----------------------------------------------------------------------
    // Literals
    // -----------------------------------------------------------------------

    /// `1`, `1.`, `.5`, `1e3`, `1.5E-3`.
    fn lex_number(&mut self) -> TokenKind {
        let int_digits = self.stream.advance_while(|c| c.is_ascii_digit());
        let mut decimal = false;
        if self.stream.peek(0) == Some('.')
            && (int_digits > 0 || self.stream.peek(1).is_some_and(|c| c.is_ascii_digit()))
        {
            self.stream.advance();
            self.stream.advance_while(|c| c.is_ascii_digit());
            decimal = true;
        }
        if matches!(self.stream.peek(0), Some('e' | 'E')) {
            let exponent_digits_at = match self.stream.peek(1) {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if self
                .stream
                .peek(exponent_digits_at)
                .is_some_and(|c| c.is_ascii_digit())
            {
                for _ in 0..exponent_digits_at {
                    self.stream.advance();
                }
                self.stream.advance_while(|c| c.is_ascii_digit());
                decimal = true;
            }
        }
        if decimal {
            TokenKind::DecimalLiteral
        } else {
            TokenKind::IntegerLiteral
        }
    }

    /// `"..."` with `\t \n \r \" \\` escapes, or single-line `"""..."""`.
    fn lex_string(&mut self, start: usize, line: u32, col: u32) -> TokenKind {
        if self.stream.starts_with("\"\"\"") {
            self.stream.advance_to(start + 3);
            let line_end = self.stream.line_end();
            return match self.stream.find("\"\"\"") {
                Some(idx) if idx + 3 <= line_end => {
                    self.stream.advance_to(self.stream.position() + idx + 3);
                    for _ in 0..2 {
                        if self.stream.peek(0) == Some('"') {
                            self.stream.advance();
                        }
                    }
                    TokenKind::QuotedString
                }
                _ => {
                    self.stream.advance_to(self.stream.position() + line_end);
                    self.unterminated("triple-quoted string", start, line, col)
                }
            };
        }

        self.stream.advance();
        let mut bad_escape = false;
        loop {
            match self.stream.peek(0) {
                None | Some('\n' | '\r') => {
                    return self.unterminated("quoted string", start, line, col);
                }
                Some('"') => {
                    self.stream.advance();
                    break;
                }
                Some('\\') => {
                    self.stream.advance();
                    if matches!(self.stream.peek(0), Some('t' | 'n' | 'r' | '"' | '\\')) {
                        self.stream.advance();
                    } else {
                        bad_escape = true;
                    }
                }
                Some(_) => {
                    self.stream.advance();
                }
            }
        }
        if bad_escape {
            self.report(
                "invalid escape sequence in string".to_owned(),
                start,
                line,
                col,
            );
            return TokenKind::Error;
        }
        TokenKind::QuotedString
    }

    // -----------------------------------------------------------------------
    // Modes
    // -----------------------------------------------------------------------

    fn lex_default(&mut self, ch: char, start: usize, line: u32, col: u32) -> TokenKind {
        if ch == ']' {
            return self.close_bracket();
        }
        let consumed = self
            .stream
            .advance_while(|c| !is_ws(c) && !matches!(c, '[' | ']' | '/' | '|'));
        if consumed == 0 {
            return self.error_run(start, line, col);
        }
        let word = self.text_since(start);
        let kind = match command_keyword(word) {
            Some(
                TokenKind::DevInlineStats
                | TokenKind::DevLookup
                | TokenKind::DevMatch
                | TokenKind::DevMetrics,
            ) if !self.options.dev_features => TokenKind::UnknownCmd,
            Some(kind) => kind,
            None => TokenKind::UnknownCmd,
        };
        self.modes.push(command_mode(kind));
        kind
    }

    fn lex_explain(&mut self, ch: char, start: usize, line: u32, col: u32) -> TokenKind {
        match ch {
            '[' => self.open_bracket(Mode::Default),
            ']' => self.close_bracket(),
            _ => self.error_run(start, line, col),
        }
    }

    fn lex_expression(&mut self, ch: char, start: usize, line: u32, col: u32) -> TokenKind {
        match ch {
            '0'..='9' => self.lex_number(),
            '.' if self.stream.peek(1).is_some_and(|c| c.is_ascii_digit()) => self.lex_number(),
            '"' => self.lex_string(start, line, col),
            '`' => self.lex_quoted_identifier(start, line, col),
            '?' => self.lex_param(),
            '[' => self.open_bracket(Mode::Expression),
            ']' => self.close_bracket(),
            c if c.is_ascii_alphabetic() || c == '_' || c == '@' => {
                if !self.scan_unquoted_identifier() {
                    return self.error_run(start, line, col);
                }
                let word = self.text_since(start);
                if let Some(kind) = expression_keyword(word) {
                    kind
                } else if self.options.dev_features && word.eq_ignore_ascii_case("match") {
                    TokenKind::DevMatch
                } else {
                    TokenKind::UnquotedIdentifier
                }
            }
            _ => match self.lex_operator(ch) {
                Some(kind) => kind,
                None => self.error_run(start, line, col),
            },
        }
    }

    fn lex_operator(&mut self, ch: char) -> Option<TokenKind> {
        let next = self.stream.peek(1);
        let (kind, len) = match (ch, next) {
            ('=', Some('=')) => (TokenKind::Eq, 2),
            ('=', Some('~')) => (TokenKind::CiEq, 2),
            ('=', _) => (TokenKind::Assign, 1),
            ('!', Some('=')) => (TokenKind::Neq, 2),
            ('<', Some('=')) => (TokenKind::Lte, 2),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', Some('=')) => (TokenKind::Gte, 2),
            ('>', _) => (TokenKind::Gt, 1),
            (':', Some(':')) => (TokenKind::CastOp, 2),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Asterisk, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('(', _) => (TokenKind::LeftParen, 1),
            (')', _) => (TokenKind::RightParen, 1),
            (',', _) => (TokenKind::Comma, 1),
            ('.', _) => (TokenKind::Dot, 1),
            _ => return None,
        };
        for _ in 0..len {
            self.stream.advance();
        }
        Some(kind)
    }

    fn lex_from(&mut self, ch: char, start: usize, line: u32, col: u32) -> TokenKind {
        match ch {
            ',' => self.single(TokenKind::Comma),
            ':' => self.single(TokenKind::Colon),
            '=' => self.single(TokenKind::Assign),
            '[' => self.open_bracket(Mode::From),
            ']' => self.close_bracket(),
            '"' => self.lex_string(start, line, col),
            _ => {
                if self.scan_unquoted_source() == 0 {
                    return self.error_run(start, line, col);
                }
                if self.text_since(start).eq_ignore_ascii_case("metadata") {
                    TokenKind::Metadata
                } else {
                    TokenKind::UnquotedSource
                }
            }
        }
    }

    /// KEEP/DROP, and RENAME when `rename` is set (adds `=` and `AS`).
    fn lex_project(
        &mut self,
        ch: char,
        start: usize,
        line: u32,
        col: u32,
        rename: bool,
    ) -> TokenKind {
        match ch {
            ',' => self.single(TokenKind::Comma),
            '.' => self.single(TokenKind::Dot),
            '?' => self.lex_param(),
            '=' if rename => self.single(TokenKind::Assign),
            _ => match self.lex_id_pattern(start, line, col) {
                Some(TokenKind::IdPattern)
                    if rename && self.text_since(start).eq_ignore_ascii_case("as") =>
                {
                    TokenKind::As
                }
                Some(kind) => kind,
                None => self.error_run(start, line, col),
            },
        }
    }

    fn lex_enrich(&mut self, ch: char, start: usize, line: u32, col: u32) -> TokenKind {
        if ch == '[' {
            return self.open_bracket(Mode::Setting);
        }
        if self.stream.advance_while(is_policy_body) == 0 {
            return self.error_run(start, line, col);
        }
        if self.stream.peek(0) == Some(':') && self.stream.peek(1).is_some_and(is_policy_body) {
            self.stream.advance();
            self.stream.advance_while(is_policy_body);
        }
        let word = self.text_since(start);
        if word.eq_ignore_ascii_case("on") {
            self.modes.push(Mode::EnrichField);
            TokenKind::On
        } else if word.eq_ignore_ascii_case("with") {
            self.modes.push(Mode::EnrichField);
            TokenKind::With
        } else {
            TokenKind::EnrichPolicyName
        }
    }

    fn lex_enrich_field(&mut self, ch: char, start: usize, line: u32, col: u32) -> TokenKind {
        match ch {
            '=' => self.single(TokenKind::Assign),
            ',' => self.single(TokenKind::Comma),
            '.' => self.single(TokenKind::Dot),
            '?' => self.lex_param(),
            _ => match self.lex_id_pattern(start, line, col) {
                Some(TokenKind::IdPattern) if self.text_since(start).eq_ignore_ascii_case("with") => {
                    TokenKind::With
                }
                Some(kind) => kind,
                None => self.error_run(start, line, col),
            },
        }
    }

    fn lex_mv_expand(&mut self, ch: char, start: usize, line: u32, col: u32) -> TokenKind {
        match ch {
            '.' => self.single(TokenKind::Dot),
            '?' => self.lex_param(),
            '`' => self.lex_quoted_identifier(start, line, col),
            _ if self.scan_unquoted_identifier() => TokenKind::UnquotedIdentifier,
            _ => self.error_run(start, line, col),
        }
    }

    fn lex_show(&mut self, start: usize, line: u32, col: u32) -> TokenKind {
        let rest = self.stream.rest();
        let is_info = rest
            .get(..4)
            .is_some_and(|w| w.eq_ignore_ascii_case("info"))
            && !rest[4..].chars().next().is_some_and(is_id_body);
        if is_info {
            self.stream.advance_to(start + 4);
            TokenKind::Info
        } else {
            self.error_run(start, line, col)
        }
    }

    fn lex_setting(&mut self, ch: char, start: usize, line: u32, col: u32) -> TokenKind {
        match ch {
            ']' => self.close_bracket(),
            ':' => self.single(TokenKind::Colon),
            c if is_setting_char(c) => {
                self.stream.advance_while(is_setting_char);
                TokenKind::Setting
            }
            _ => self.error_run(start, line, col),
        }
    }

    fn lex_lookup(&mut self, ch: char, start: usize, line: u32, col: u32) -> TokenKind {
        match ch {
            ':' => self.single(TokenKind::Colon),
            ',' => self.single(TokenKind::Comma),
            '"' => self.lex_string(start, line, col),
            _ => {
                if self.scan_unquoted_source() == 0 {
                    return self.error_run(start, line, col);
                }
                let word = self.text_since(start);
                if word == "." {
                    TokenKind::Dot
                } else if word.eq_ignore_ascii_case("on") {
                    self.modes.push(Mode::LookupField);
                    TokenKind::On
                } else {
                    TokenKind::UnquotedSource
                }
            }
        }
    }

    fn lex_lookup_field(&mut self, ch: char, start: usize, line: u32, col: u32) -> TokenKind {
        match ch {
            ',' => self.single(TokenKind::Comma),
            '.' => self.single(TokenKind::Dot),
            _ => match self.lex_id_pattern(start, line, col) {
                Some(kind) => kind,
                None => self.error_run(start, line, col),
            },
        }
    }

    fn lex_metrics(&mut self, ch: char, start: usize, line: u32, col: u32) -> TokenKind {
        let kind = if ch == '"' {
            self.lex_string(start, line, col)
        } else if self.scan_unquoted_source() > 0 {
            TokenKind::UnquotedSource
        } else {
            return self.error_run(start, line, col);
        };
        if kind != TokenKind::Error {
            self.modes.switch(Mode::ClosingMetrics);
        }
        kind
    }

    fn lex_closing_metrics(&mut self, ch: char, start: usize, line: u32, col: u32) -> TokenKind {
        match ch {
            ':' | ',' => {
                self.modes.switch(Mode::Metrics);
                self.single(if ch == ':' {
                    TokenKind::Colon
                } else {
                    TokenKind::Comma
                })
            }
            '`' => {
                let kind = self.lex_quoted_identifier(start, line, col);
                if kind != TokenKind::Error {
                    self.modes.switch(Mode::Expression);
                }
                kind
            }
            _ if self.scan_unquoted_identifier() => {
                self.modes.switch(Mode::Expression);
                if self.text_since(start).eq_ignore_ascii_case("by") {
                    TokenKind::By
                } else {
                    TokenKind::UnquotedIdentifier
                }
            }
            _ => self.error_run(start, line, col),
        }
    }
}

/// The mode a command keyword pushes.
const fn command_mode(kind: TokenKind) -> Mode {
    match kind {
        TokenKind::From => Mode::From,
        TokenKind::Keep | TokenKind::Drop => Mode::Project,
        TokenKind::Rename => Mode::Rename,
        TokenKind::Enrich => Mode::Enrich,
        TokenKind::MvExpand => Mode::MvExpand,
        TokenKind::Show => Mode::Show,
        TokenKind::Explain => Mode::Explain,
        TokenKind::DevLookup => Mode::Lookup,
        TokenKind::DevMetrics => Mode::Metrics,
        _ => Mode::Expression,
    }
}

const fn is_ws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

const fn is_id_body(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

const fn is_id_prefix(c: char) -> bool {
    matches!(c, '_' | '@')
}

const fn is_pattern_body(c: char) -> bool {
    is_id_body(c) || c == '*'
}

const fn is_setting_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_')
}

const fn is_policy_body(c: char) -> bool {
    !is_ws(c)
        && !matches!(
            c,
            '\\' | '/' | '?' | '"' | '<' | '>' | '|' | ',' | '#' | ':' | '[' | ']'
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use esql_error::DiagnosticKind;

    fn lex_with(src: &str, dev: bool) -> Vec<Token<'_>> {
        Lexer::tokenize(src, LexerOptions { dev_features: dev })
    }

    /// Significant kinds, `Eof` included.
    fn kinds(src: &str) -> Vec<TokenKind> {
        kinds_with(src, false)
    }

    fn kinds_with(src: &str, dev: bool) -> Vec<TokenKind> {
        lex_with(src, dev)
            .into_iter()
            .filter(|t| !t.is_hidden())
            .map(|t| t.kind)
            .collect()
    }

    fn texts(src: &str) -> Vec<&str> {
        lex_with(src, false)
            .into_iter()
            .filter(|t| !t.is_hidden() && t.kind != TokenKind::Eof)
            .map(|t| t.text)
            .collect()
    }

    fn final_modes(src: &str, dev: bool) -> Vec<Mode> {
        let mut lexer = Lexer::new(src, LexerOptions { dev_features: dev });
        let _ = lexer.tokenize_all();
        lexer.mode_stack().modes()
    }

    #[test]
    fn test_lex_simple_pipeline() {
        use TokenKind::*;
        assert_eq!(
            kinds("FROM logs-* | WHERE status == 200 | LIMIT 10"),
            vec![
                From,
                UnquotedSource,
                Pipe,
                Where,
                UnquotedIdentifier,
                Eq,
                IntegerLiteral,
                Pipe,
                Limit,
                IntegerLiteral,
                Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        use TokenKind::*;
        assert_eq!(
            kinds("fRoM idx | sOrT a DeSc NuLlS fIrSt"),
            vec![From, UnquotedSource, Pipe, Sort, UnquotedIdentifier, Desc, Nulls, First, Eof]
        );
    }

    #[test]
    fn test_from_sources_and_metadata() {
        use TokenKind::*;
        let src = "FROM logs-*, remote:idx-2024.01, \"quoted\" METADATA _id, _index";
        assert_eq!(
            kinds(src),
            vec![
                From,
                UnquotedSource,
                Comma,
                UnquotedSource,
                Colon,
                UnquotedSource,
                Comma,
                QuotedString,
                Metadata,
                UnquotedSource,
                Comma,
                UnquotedSource,
                Eof,
            ]
        );
        assert_eq!(texts(src)[3], "remote");
        assert_eq!(texts(src)[5], "idx-2024.01");
    }

    #[test]
    fn test_from_source_allows_slash_but_not_comments() {
        assert_eq!(texts("FROM a/b//c"), vec!["FROM", "a/b"]);
        assert_eq!(texts("FROM a/*x*/b"), vec!["FROM", "a", "b"]);
    }

    #[test]
    fn test_from_source_slash_takes_next_char() {
        use TokenKind::*;
        assert_eq!(texts("FROM a/:b, c"), vec!["FROM", "a/:b", ",", "c"]);
        assert_eq!(kinds("FROM a/:b"), vec![From, UnquotedSource, Eof]);
        assert_eq!(texts("FROM x/,y"), vec!["FROM", "x/,y"]);
    }

    #[test]
    fn test_from_bracketed_metadata() {
        use TokenKind::*;
        assert_eq!(
            kinds("FROM idx [METADATA _id]"),
            vec![From, UnquotedSource, OpeningBracket, Metadata, UnquotedSource, ClosingBracket, Eof]
        );
        assert_eq!(final_modes("FROM idx [METADATA _id]", false), vec![Mode::Default]);
        assert_eq!(
            final_modes("FROM idx [METADATA _id", false),
            vec![Mode::Default, Mode::From, Mode::From]
        );
    }

    #[test]
    fn test_numeric_literals() {
        use TokenKind::*;
        let src = "ROW a = 1, b = 1.5, c = .5, d = 1e3, e = 1., f = 1.5E-3, g = 2e";
        let ks: Vec<_> = kinds(src)
            .into_iter()
            .filter(|k| matches!(k, IntegerLiteral | DecimalLiteral))
            .collect();
        assert_eq!(
            ks,
            vec![
                IntegerLiteral,
                DecimalLiteral,
                DecimalLiteral,
                DecimalLiteral,
                DecimalLiteral,
                DecimalLiteral,
                IntegerLiteral,
            ]
        );
        // `2e` is an integer followed by an identifier.
        assert_eq!(texts(src).last(), Some(&"e"));
    }

    #[test]
    fn test_quoted_strings_and_escapes() {
        let tokens = texts(r#"ROW a = "x\"y\\z\t", b = "", c = """raw "quoted" text""""#);
        assert_eq!(tokens[3], r#""x\"y\\z\t""#);
        assert_eq!(tokens[7], r#""""#);
        assert_eq!(tokens[11], r#""""raw "quoted" text""""#);
    }

    #[test]
    fn test_triple_quoted_keeps_two_extra_quotes() {
        let src = "ROW a = \"\"\"abc\"\"\"\"\"";
        let toks = lex_with(src, false);
        let s = toks
            .iter()
            .find(|t| t.kind == TokenKind::QuotedString)
            .unwrap();
        assert_eq!(s.text, "\"\"\"abc\"\"\"\"\"");
    }

    #[test]
    fn test_invalid_escape_is_error_token_without_reset() {
        let mut lexer = Lexer::new(r#"ROW a = "bad\q" | LIMIT 1"#, LexerOptions::default());
        let tokens = lexer.tokenize_all();
        let diags = lexer.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("escape"));
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Error));
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Limit));
    }

    #[test]
    fn test_unterminated_string_resets_to_default() {
        let mut lexer = Lexer::new("ROW a = \"open\nLIMIT 5", LexerOptions::default());
        let tokens = lexer.tokenize_all();
        let diags = lexer.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::Lexical);
        assert_eq!((diags[0].line, diags[0].col), (1, 9));
        let err = tokens.iter().find(|t| t.kind == TokenKind::Error).unwrap();
        assert_eq!(err.text, "\"open");
        // Lexing resumed in Default mode, so LIMIT is a command again.
        assert!(tokens
            .iter()
            .any(|t| t.kind == TokenKind::Limit && t.line == 2 && t.col == 1));
        assert_eq!(lexer.mode_stack().modes(), vec![Mode::Default]);
    }

    #[test]
    fn test_unterminated_triple_quoted_string() {
        let mut lexer = Lexer::new("ROW a = \"\"\"never closed", LexerOptions::default());
        let tokens = lexer.tokenize_all();
        assert_eq!(lexer.take_diagnostics().len(), 1);
        assert_eq!(tokens[tokens.len() - 2].kind, TokenKind::Error);
    }

    #[test]
    fn test_comments_and_whitespace_are_hidden() {
        let tokens = lex_with("FROM a // trailing\n/* one /* nested */ done */ | LIMIT 1", false);
        let hidden: Vec<_> = tokens
            .iter()
            .filter(|t| t.is_hidden())
            .map(|t| t.kind)
            .collect();
        assert!(hidden.contains(&TokenKind::LineComment));
        assert!(hidden.contains(&TokenKind::MultilineComment));
        let block = tokens
            .iter()
            .find(|t| t.kind == TokenKind::MultilineComment)
            .unwrap();
        assert_eq!(block.text, "/* one /* nested */ done */");
        assert_eq!(block.line, 2);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let mut lexer = Lexer::new("FROM a /* /* */", LexerOptions::default());
        let tokens = lexer.tokenize_all();
        let diags = lexer.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("block comment"));
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn test_quoted_identifier_with_doubled_backquote() {
        let src = "EVAL `a``b` = 1";
        assert_eq!(texts(src)[1], "`a``b`");
        assert_eq!(kinds(src)[1], TokenKind::QuotedIdentifier);
    }

    #[test]
    fn test_unquoted_identifier_shapes() {
        use TokenKind::*;
        assert_eq!(
            kinds("EVAL _a, @timestamp, x_1"),
            vec![Eval, UnquotedIdentifier, Comma, UnquotedIdentifier, Comma, UnquotedIdentifier, Eof]
        );
        // A lone underscore is not an identifier.
        assert_eq!(kinds("EVAL _ ")[1], Error);
    }

    #[test]
    fn test_identifier_prefix_runs() {
        use TokenKind::*;
        assert_eq!(texts("ROW a = _@x"), vec!["ROW", "a", "=", "_@x"]);
        assert_eq!(kinds("ROW a = @@x"), vec![Row, UnquotedIdentifier, Assign, UnquotedIdentifier, Eof]);
        assert_eq!(texts("EVAL __, @_"), vec!["EVAL", "__", ",", "@_"]);
        assert_eq!(kinds("EVAL @@ ")[1], Error);
        assert_eq!(kinds("KEEP _@x*"), vec![Keep, IdPattern, Eof]);
        assert_eq!(texts("KEEP _@x*, @@*"), vec!["KEEP", "_@x*", ",", "@@*"]);
    }

    #[test]
    fn test_parameters() {
        use TokenKind::*;
        assert_eq!(
            kinds("ROW a = ?, b = ?name, c = ?1"),
            vec![
                Row,
                UnquotedIdentifier,
                Assign,
                Param,
                Comma,
                UnquotedIdentifier,
                Assign,
                NamedOrPositionalParam,
                Comma,
                UnquotedIdentifier,
                Assign,
                NamedOrPositionalParam,
                Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("EVAL a == b =~ c != d <= e >= f < g > h :: + - * / %"),
            vec![
                Eval,
                UnquotedIdentifier,
                Eq,
                UnquotedIdentifier,
                CiEq,
                UnquotedIdentifier,
                Neq,
                UnquotedIdentifier,
                Lte,
                UnquotedIdentifier,
                Gte,
                UnquotedIdentifier,
                Lt,
                UnquotedIdentifier,
                Gt,
                UnquotedIdentifier,
                CastOp,
                Plus,
                Minus,
                Asterisk,
                Slash,
                Percent,
                Eof,
            ]
        );
    }

    #[test]
    fn test_expression_brackets_nest() {
        let src = "ROW a = [1, [2]]";
        assert_eq!(final_modes(src, false), vec![Mode::Default]);
        assert_eq!(
            final_modes("ROW a = [1, [2]", false),
            vec![Mode::Default, Mode::Expression, Mode::Expression]
        );
    }

    #[test]
    fn test_keep_patterns() {
        use TokenKind::*;
        let src = "KEEP a*, `b``c`*, d.e, *";
        assert_eq!(
            kinds(src),
            vec![Keep, IdPattern, Comma, IdPattern, Comma, IdPattern, Dot, IdPattern, Comma, IdPattern, Eof]
        );
        assert_eq!(texts(src)[3], "`b``c`*");
    }

    #[test]
    fn test_rename_as_and_assign() {
        use TokenKind::*;
        assert_eq!(
            kinds("RENAME a AS b, c = d, ascii AS asx"),
            vec![
                Rename,
                IdPattern,
                As,
                IdPattern,
                Comma,
                IdPattern,
                Assign,
                IdPattern,
                Comma,
                IdPattern,
                As,
                IdPattern,
                Eof,
            ]
        );
    }

    #[test]
    fn test_enrich_modes() {
        use TokenKind::*;
        let src = "ENRICH [ccq.mode:any] _remote:my-policy ON host WITH n = name, other | LIMIT 1";
        assert_eq!(
            kinds(src),
            vec![
                Enrich,
                OpeningBracket,
                Setting,
                Colon,
                Setting,
                ClosingBracket,
                EnrichPolicyName,
                On,
                IdPattern,
                With,
                IdPattern,
                Assign,
                IdPattern,
                Comma,
                IdPattern,
                Pipe,
                Limit,
                IntegerLiteral,
                Eof,
            ]
        );
        assert_eq!(texts(src)[6], "_remote:my-policy");
        assert_eq!(final_modes(src, false), vec![Mode::Default]);
    }

    #[test]
    fn test_mv_expand_and_show() {
        use TokenKind::*;
        assert_eq!(
            kinds("MV_EXPAND a.`b` | SHOW info"),
            vec![MvExpand, UnquotedIdentifier, Dot, QuotedIdentifier, Pipe, Show, Info, Eof]
        );
        assert_eq!(kinds("SHOW infos")[1], Error);
    }

    #[test]
    fn test_explain_pushes_bracketed_default() {
        use TokenKind::*;
        let src = "EXPLAIN [ FROM a | WHERE b ] | LIMIT 1";
        assert_eq!(
            kinds(src),
            vec![
                Explain,
                OpeningBracket,
                From,
                UnquotedSource,
                Pipe,
                Where,
                UnquotedIdentifier,
                ClosingBracket,
                Pipe,
                Limit,
                IntegerLiteral,
                Eof,
            ]
        );
        assert_eq!(final_modes(src, false), vec![Mode::Default]);
        assert_eq!(
            final_modes("EXPLAIN [ FROM a", false),
            vec![Mode::Default, Mode::Explain, Mode::Default]
        );
    }

    #[test]
    fn test_dev_keywords_are_gated() {
        use TokenKind::*;
        assert_eq!(kinds_with("INLINESTATS count(*)", false)[0], UnknownCmd);
        assert_eq!(kinds_with("INLINESTATS count(*)", true)[0], DevInlineStats);
        assert_eq!(kinds_with("WHERE a MATCH \"x\"", false)[2], UnquotedIdentifier);
        assert_eq!(kinds_with("WHERE a MATCH \"x\"", true)[2], DevMatch);
        let off: Vec<_> = lex_with("INLINESTATS max(x) BY y", false)
            .iter()
            .map(|t| t.span)
            .collect();
        let on: Vec<_> = lex_with("INLINESTATS max(x) BY y", true)
            .iter()
            .map(|t| t.span)
            .collect();
        assert_eq!(off, on);
    }

    #[test]
    fn test_lookup_modes() {
        use TokenKind::*;
        assert_eq!(
            kinds_with("LOOKUP JOIN tbl ON a, b.c", true),
            vec![DevLookup, UnquotedSource, UnquotedSource, On, IdPattern, Comma, IdPattern, Dot, IdPattern, Eof]
        );
        assert_eq!(
            kinds_with("LOOKUP JOIN tbl ON a", false),
            vec![
                UnknownCmd,
                UnquotedIdentifier,
                UnquotedIdentifier,
                UnquotedIdentifier,
                UnquotedIdentifier,
                Eof
            ]
        );
    }

    #[test]
    fn test_metrics_mode_switching() {
        use TokenKind::*;
        let src = "METRICS a, r:b max(x) BY y";
        assert_eq!(
            kinds_with(src, true),
            vec![
                DevMetrics,
                UnquotedSource,
                Comma,
                UnquotedSource,
                Colon,
                UnquotedSource,
                UnquotedIdentifier,
                LeftParen,
                UnquotedIdentifier,
                RightParen,
                By,
                UnquotedIdentifier,
                Eof,
            ]
        );
        assert_eq!(
            kinds_with("METRICS a BY host", true),
            vec![DevMetrics, UnquotedSource, By, UnquotedIdentifier, Eof]
        );
    }

    #[test]
    fn test_unknown_command_pushes_expression() {
        use TokenKind::*;
        assert_eq!(
            kinds("SELECT a, b | LIMIT 1"),
            vec![UnknownCmd, UnquotedIdentifier, Comma, UnquotedIdentifier, Pipe, Limit, IntegerLiteral, Eof]
        );
    }

    #[test]
    fn test_error_run_keeps_mode() {
        let mut lexer = Lexer::new("EVAL a = b #junk + 1", LexerOptions::default());
        let tokens = lexer.tokenize_all();
        let diags = lexer.take_diagnostics();
        assert_eq!(diags.len(), 1);
        let err = tokens.iter().find(|t| t.kind == TokenKind::Error).unwrap();
        assert_eq!(err.text, "#junk");
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Plus));
    }

    #[test]
    fn test_pipe_only_input() {
        use TokenKind::*;
        assert_eq!(kinds("| |"), vec![Pipe, Pipe, Eof]);
        assert_eq!(kinds(""), vec![Eof]);
    }

    #[test]
    fn test_spans_and_positions() {
        let tokens = lex_with("FROM a\n| LIMIT 10", false);
        let limit = tokens.iter().find(|t| t.kind == TokenKind::Limit).unwrap();
        assert_eq!(limit.span, Span::new(9, 14));
        assert_eq!((limit.line, limit.col), (2, 3));
        let eof = tokens.last().unwrap();
        assert_eq!(eof.span, Span::new(17, 17));
    }

    #[test]
    fn test_eof_repeats() {
        let mut lexer = Lexer::new("x", LexerOptions::default());
        let _ = lexer.tokenize_all();
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }
}

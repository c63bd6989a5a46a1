// ES|QL parser
//
// Hand-written recursive descent over the default-channel tokens. Commands
// are parsed here; expressions, literals and names live in expr.rs. Errors
// never abort the parse: each becomes a diagnostic and the parser
// resynchronizes at the next top-level `|`.

use esql_ast::{
    Assignment, Command, CommandOption, DissectCommand, DropCommand, EnrichCommand, EnrichField,
    EnrichMode, EvalCommand, ExplainCommand, Expr, FromCommand, GrokCommand, IndexPattern,
    InlineStatsCommand, KeepCommand, LimitCommand, LookupCommand, MatchCommand, MetadataClause,
    MetricsCommand, MvExpandCommand, NullsOrder, PatternPart, PolicyName, Query,
    QualifiedNamePattern, RenameClause, RenameCommand, RenameSyntax, RowCommand, Setting,
    ShowCommand, ShowItem, SortCommand, SortDirection, SortKey, SourceIdentifier, Span,
    StatsCommand, WhereCommand,
};
use esql_error::{sort_diagnostics, Diagnostic, DiagnosticKind, EsqlError, Result};
use memchr::{memchr_iter, memrchr};
use serde::Serialize;
use tracing::debug;

use crate::config::ParseOptions;
use crate::expr::unescape_string;
use crate::filter::TokenFilter;
use crate::lexer::Lexer;
use crate::mode::Mode;
use crate::token::{command_keyword, Channel, Token, TokenKind};

pub(crate) type ParseResult<T> = std::result::Result<T, Diagnostic>;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Everything a parse produces: a best-effort query, every diagnostic in
/// source order, the unfiltered token stream and the lexer's final modes.
#[derive(Debug, Clone, Serialize)]
pub struct ParseOutput<'a> {
    pub query: Query,
    pub diagnostics: Vec<Diagnostic>,
    pub tokens: Vec<Token<'a>>,
    pub final_modes: Vec<Mode>,
}

impl ParseOutput<'_> {
    /// Whether no error-severity diagnostic was produced.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    /// The query, or every diagnostic when any of them is an error.
    pub fn into_result(self) -> Result<Query> {
        if self.is_ok() {
            Ok(self.query)
        } else {
            Err(EsqlError::InvalidQuery {
                diagnostics: self.diagnostics,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    pos: usize,
    prev_end: u32,
}

pub struct Parser<'a> {
    source: &'a str,
    pub(crate) filter: TokenFilter<'a>,
    /// Index into the default-channel tokens.
    pub(crate) pos: usize,
    /// End offset of the last consumed token.
    pub(crate) prev_end: u32,
    pub(crate) depth: usize,
    pub(crate) options: ParseOptions,
    diagnostics: Vec<Diagnostic>,
    lexical: Vec<Diagnostic>,
    lexical_error_starts: Vec<u32>,
    final_modes: Vec<Mode>,
    eof: Token<'a>,
}

impl<'a> Parser<'a> {
    /// Lex `source` and prepare to parse it.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(source: &'a str, options: &ParseOptions) -> Self {
        let mut lexer = Lexer::new(source, options.lexer_options());
        let tokens = lexer.tokenize_all();
        let lexical = lexer.take_diagnostics();
        let final_modes = lexer.mode_stack().modes();
        let lexical_error_starts = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Error)
            .map(|t| t.span.start)
            .collect();
        let end = source.len() as u32;
        let eof = tokens.last().copied().unwrap_or(Token {
            kind: TokenKind::Eof,
            text: "",
            span: Span::at(end),
            line: 1,
            col: 1,
            channel: Channel::Default,
        });
        Self {
            source,
            filter: TokenFilter::new(tokens),
            pos: 0,
            prev_end: 0,
            depth: 0,
            options: options.clone(),
            diagnostics: Vec::new(),
            lexical,
            lexical_error_starts,
            final_modes,
            eof,
        }
    }

    /// Parse the whole input.
    #[must_use]
    pub fn parse(mut self) -> ParseOutput<'a> {
        let query = self.parse_query();
        let mut diagnostics = self.lexical;
        diagnostics.append(&mut self.diagnostics);
        sort_diagnostics(&mut diagnostics);
        ParseOutput {
            query,
            diagnostics,
            tokens: self.filter.into_tokens(),
            final_modes: self.final_modes,
        }
    }

    fn parse_query(&mut self) -> Query {
        let commands = self.parse_pipeline(None);
        // Command frames unwind at EOF, so anything left above the bottom
        // frame hangs off a `[` that was never closed.
        if self.final_modes.len() > 1 {
            let eof = self.current();
            debug!(modes = ?self.final_modes, "mode stack not unwound at end of input");
            let diag = self.structural("unclosed '[' at end of input", eof.span);
            self.record(diag);
        }
        if commands.is_empty() && self.diagnostics.is_empty() && self.lexical.is_empty() {
            let eof = self.current();
            self.record(Diagnostic::syntax(
                "query must contain at least one command",
                eof.span,
                eof.line,
                eof.col,
            ));
        }
        let span = commands_span(&commands).unwrap_or(Span::ZERO);
        Query { commands, span }
    }

    // -----------------------------------------------------------------------
    // Token navigation
    // -----------------------------------------------------------------------

    pub(crate) fn current(&self) -> Token<'a> {
        self.filter.get(self.pos).copied().unwrap_or(self.eof)
    }

    pub(crate) fn peek(&self) -> TokenKind {
        self.current().kind
    }

    pub(crate) fn peek_nth(&self, n: usize) -> TokenKind {
        self.filter
            .get(self.pos + n)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    pub(crate) fn advance(&mut self) -> Token<'a> {
        let tok = self.current();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
            self.prev_end = tok.span.end;
        }
        tok
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> Option<Token<'a>> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> ParseResult<Token<'a>> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.err_expected(what))
        }
    }

    pub(crate) const fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            prev_end: self.prev_end,
        }
    }

    pub(crate) fn rewind(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.pos;
        self.prev_end = checkpoint.prev_end;
    }

    /// Span from `start` to the end of the last consumed token.
    pub(crate) fn span_from(&self, start: Span) -> Span {
        Span::new(start.start, self.prev_end.max(start.end))
    }

    /// The end of a command: `|`, EOF, or the `]` closing an EXPLAIN.
    pub(crate) fn at_command_end(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Pipe | TokenKind::Eof | TokenKind::ClosingBracket
        )
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    pub(crate) fn err_expected(&self, what: &str) -> Diagnostic {
        let tok = self.current();
        let found = if tok.kind == TokenKind::Eof {
            "end of input".to_owned()
        } else {
            format!("'{}'", tok.text)
        };
        Diagnostic::syntax(
            format!("expected {what}, found {found}"),
            tok.span,
            tok.line,
            tok.col,
        )
    }

    pub(crate) fn structural(&self, message: impl Into<String>, span: Span) -> Diagnostic {
        let (line, col) = self.line_col(span.start);
        Diagnostic::structural(message, span, line, col)
    }

    /// Record a diagnostic unless the lexer already reported a problem at
    /// the same place, or an identical one was recorded.
    pub(crate) fn record(&mut self, diag: Diagnostic) {
        if self.lexical_error_starts.contains(&diag.span.start) {
            debug!(span = %diag.span, "suppressed error at lexical error token");
            return;
        }
        if self
            .diagnostics
            .iter()
            .any(|d| d.span.start == diag.span.start && d.kind == diag.kind)
        {
            return;
        }
        self.diagnostics.push(diag);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn line_col(&self, offset: u32) -> (u32, u32) {
        let offset = (offset as usize).min(self.source.len());
        let before = self.source.get(..offset).unwrap_or_default();
        let bytes = before.as_bytes();
        let line = 1 + memchr_iter(b'\n', bytes).count();
        let line_start = memrchr(b'\n', bytes).map_or(0, |i| i + 1);
        let col = 1 + before[line_start..].chars().count();
        (line as u32, col as u32)
    }

    /// Run `f` one nesting level deeper, failing once `max_depth` is hit.
    pub(crate) fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        if self.depth >= self.options.max_depth {
            let tok = self.current();
            return Err(Diagnostic::structural(
                format!(
                    "query nesting exceeds the limit of {}",
                    self.options.max_depth
                ),
                tok.span,
                tok.line,
                tok.col,
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Skip to the next `|`, the `]` ending the enclosing subquery, or EOF.
    /// Brackets only shield a `]` here: a `|` always pops the lexer back to
    /// a Default frame, so it starts a new command whatever came before.
    fn recover(&mut self, terminator: Option<TokenKind>) {
        let mut depth = 0usize;
        let mut skipped = 0usize;
        loop {
            match self.peek() {
                TokenKind::Eof | TokenKind::Pipe => break,
                TokenKind::ClosingBracket if depth == 0 && terminator.is_some() => break,
                TokenKind::OpeningBracket => depth += 1,
                TokenKind::ClosingBracket => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
            skipped += 1;
        }
        debug!(skipped, at = %self.current().span, "resynchronized");
    }

    // -----------------------------------------------------------------------
    // Pipelines and commands
    // -----------------------------------------------------------------------

    fn at_pipeline_end(&self, terminator: Option<TokenKind>) -> bool {
        let kind = self.peek();
        kind == TokenKind::Eof || Some(kind) == terminator
    }

    /// `command (| command)*` up to EOF or `terminator`.
    fn parse_pipeline(&mut self, terminator: Option<TokenKind>) -> Vec<Command> {
        let mut commands = Vec::new();
        loop {
            if self.at_pipeline_end(terminator) {
                break;
            }
            if self.check(TokenKind::Pipe) {
                let diag = self.err_expected("a command");
                self.record(diag);
                self.advance();
                continue;
            }
            match self.parse_command() {
                Ok(command) => commands.push(command),
                Err(diag) => {
                    self.record(diag);
                    self.recover(terminator);
                }
            }
            if !self.at_pipeline_end(terminator) && !self.check(TokenKind::Pipe) {
                let diag = self.err_expected("'|'");
                self.record(diag);
                self.recover(terminator);
            }
            if self.eat(TokenKind::Pipe).is_some() && self.at_pipeline_end(terminator) {
                let diag = self.err_expected("a command after '|'");
                self.record(diag);
            }
        }
        commands
    }

    fn parse_command(&mut self) -> ParseResult<Command> {
        let tok = self.current();
        debug!(command = tok.kind.describe(), span = %tok.span, "parse command");
        match tok.kind {
            TokenKind::From => self.parse_from().map(Command::From),
            TokenKind::Row => self.parse_row().map(Command::Row),
            TokenKind::Show => self.parse_show().map(Command::Show),
            TokenKind::Explain => self.parse_explain().map(Command::Explain),
            TokenKind::DevMetrics => self.parse_metrics().map(Command::Metrics),
            TokenKind::Eval => self.parse_eval().map(Command::Eval),
            TokenKind::Where => self.parse_where().map(Command::Where),
            TokenKind::Stats => self.parse_stats().map(Command::Stats),
            TokenKind::DevInlineStats => self.parse_inline_stats().map(Command::InlineStats),
            TokenKind::Sort => self.parse_sort().map(Command::Sort),
            TokenKind::Limit => self.parse_limit().map(Command::Limit),
            TokenKind::Keep => self.parse_keep().map(Command::Keep),
            TokenKind::Drop => self.parse_drop().map(Command::Drop),
            TokenKind::Rename => self.parse_rename().map(Command::Rename),
            TokenKind::Dissect => self.parse_dissect().map(Command::Dissect),
            TokenKind::Grok => self.parse_grok().map(Command::Grok),
            TokenKind::Enrich => self.parse_enrich().map(Command::Enrich),
            TokenKind::MvExpand => self.parse_mv_expand().map(Command::MvExpand),
            TokenKind::DevLookup => self.parse_lookup().map(Command::Lookup),
            TokenKind::DevMatch => self.parse_match().map(Command::Match),
            TokenKind::UnknownCmd => Err(self.unknown_command(tok)),
            _ => Err(self.err_expected("a command")),
        }
    }

    fn unknown_command(&self, tok: Token<'a>) -> Diagnostic {
        let mut message = format!("unknown command '{}'", tok.text);
        if command_keyword(tok.text).is_some() {
            message.push_str(", available only with dev features enabled");
        }
        Diagnostic::error(
            DiagnosticKind::UnknownCommand,
            message,
            tok.span,
            tok.line,
            tok.col,
        )
    }

    // ── Source commands ─────────────────────────────────────────────────

    fn parse_from(&mut self) -> ParseResult<FromCommand> {
        let kw = self.advance();
        let sources = self.parse_index_patterns()?;
        let metadata = self.parse_metadata()?;
        Ok(FromCommand {
            sources,
            metadata,
            span: self.span_from(kw.span),
        })
    }

    fn parse_index_patterns(&mut self) -> ParseResult<Vec<IndexPattern>> {
        let mut sources = vec![self.parse_index_pattern()?];
        while self.eat(TokenKind::Comma).is_some() {
            sources.push(self.parse_index_pattern()?);
        }
        Ok(sources)
    }

    /// `[cluster:]index`, with nothing hidden around the colon.
    fn parse_index_pattern(&mut self) -> ParseResult<IndexPattern> {
        let first_pos = self.pos;
        let first = self.parse_source_identifier()?;
        if !self.check(TokenKind::Colon) {
            return Ok(IndexPattern {
                span: first.span,
                cluster: None,
                index: first,
            });
        }
        let colon_pos = self.pos;
        self.advance();
        let index = self.parse_source_identifier()?;
        let span = first.span.merge(index.span);
        if !self.filter.hidden_between(first_pos, colon_pos).is_empty()
            || !self.filter.hidden_between(colon_pos, colon_pos + 1).is_empty()
        {
            let diag = self.structural(
                "cluster and index names must not be separated by whitespace or comments",
                span,
            );
            self.record(diag);
        }
        Ok(IndexPattern {
            cluster: Some(first),
            index,
            span,
        })
    }

    fn parse_source_identifier(&mut self) -> ParseResult<SourceIdentifier> {
        let tok = self.current();
        match tok.kind {
            TokenKind::UnquotedSource => {
                self.advance();
                Ok(SourceIdentifier {
                    name: tok.text.to_owned(),
                    quoted: false,
                    span: tok.span,
                })
            }
            TokenKind::QuotedString => {
                self.advance();
                Ok(SourceIdentifier {
                    name: unescape_string(tok.text),
                    quoted: true,
                    span: tok.span,
                })
            }
            _ => Err(self.err_expected("an index pattern")),
        }
    }

    fn parse_metadata(&mut self) -> ParseResult<Option<MetadataClause>> {
        let bracketed =
            self.check(TokenKind::OpeningBracket) && self.peek_nth(1) == TokenKind::Metadata;
        if !bracketed && !self.check(TokenKind::Metadata) {
            return Ok(None);
        }
        let start = self.advance().span;
        if bracketed {
            self.advance();
        }
        let mut fields = vec![self.parse_source_identifier()?];
        while self.eat(TokenKind::Comma).is_some() {
            fields.push(self.parse_source_identifier()?);
        }
        if bracketed {
            self.expect(TokenKind::ClosingBracket, "']'")?;
        }
        Ok(Some(MetadataClause {
            fields,
            bracketed,
            span: self.span_from(start),
        }))
    }

    fn parse_row(&mut self) -> ParseResult<RowCommand> {
        let kw = self.advance();
        let fields = self.parse_fields()?;
        Ok(RowCommand {
            fields,
            span: self.span_from(kw.span),
        })
    }

    fn parse_show(&mut self) -> ParseResult<ShowCommand> {
        let kw = self.advance();
        self.expect(TokenKind::Info, "INFO")?;
        Ok(ShowCommand {
            item: ShowItem::Info,
            span: self.span_from(kw.span),
        })
    }

    fn parse_explain(&mut self) -> ParseResult<ExplainCommand> {
        let kw = self.advance();
        let open = self.expect(TokenKind::OpeningBracket, "'['")?;
        let commands =
            self.nested(|p| Ok(p.parse_pipeline(Some(TokenKind::ClosingBracket))))?;
        if commands.is_empty() && self.prev_end == open.span.end {
            let diag = self.err_expected("a command");
            self.record(diag);
        }
        self.expect(TokenKind::ClosingBracket, "']'")?;
        let span = commands_span(&commands).unwrap_or(Span::at(open.span.end));
        Ok(ExplainCommand {
            query: Box::new(Query { commands, span }),
            span: self.span_from(kw.span),
        })
    }

    fn parse_metrics(&mut self) -> ParseResult<MetricsCommand> {
        let kw = self.advance();
        let sources = self.parse_index_patterns()?;
        let (aggregations, groupings) = self.parse_stats_body()?;
        Ok(MetricsCommand {
            sources,
            aggregations,
            groupings,
            span: self.span_from(kw.span),
        })
    }

    // ── Processing commands ─────────────────────────────────────────────

    fn parse_eval(&mut self) -> ParseResult<EvalCommand> {
        let kw = self.advance();
        let fields = self.parse_fields()?;
        Ok(EvalCommand {
            fields,
            span: self.span_from(kw.span),
        })
    }

    fn parse_where(&mut self) -> ParseResult<WhereCommand> {
        let kw = self.advance();
        let condition = self.parse_expr()?;
        Ok(WhereCommand {
            condition,
            span: self.span_from(kw.span),
        })
    }

    /// `[fields] [BY fields]`
    fn parse_stats_body(&mut self) -> ParseResult<(Vec<Assignment>, Vec<Assignment>)> {
        let aggregations = if self.at_command_end() || self.check(TokenKind::By) {
            Vec::new()
        } else {
            self.parse_fields()?
        };
        let groupings = if self.eat(TokenKind::By).is_some() {
            self.parse_fields()?
        } else {
            Vec::new()
        };
        Ok((aggregations, groupings))
    }

    fn parse_stats(&mut self) -> ParseResult<StatsCommand> {
        let kw = self.advance();
        let (aggregations, groupings) = self.parse_stats_body()?;
        if aggregations.is_empty() && groupings.is_empty() {
            let diag =
                self.structural("STATS requires at least one aggregation or grouping", kw.span);
            self.record(diag);
        }
        Ok(StatsCommand {
            aggregations,
            groupings,
            span: self.span_from(kw.span),
        })
    }

    fn parse_inline_stats(&mut self) -> ParseResult<InlineStatsCommand> {
        let kw = self.advance();
        let (aggregations, groupings) = self.parse_stats_body()?;
        if aggregations.is_empty() {
            let diag = self.structural("INLINESTATS requires at least one aggregation", kw.span);
            self.record(diag);
        }
        Ok(InlineStatsCommand {
            aggregations,
            groupings,
            span: self.span_from(kw.span),
        })
    }

    fn parse_sort(&mut self) -> ParseResult<SortCommand> {
        let kw = self.advance();
        let mut keys = vec![self.parse_sort_key()?];
        while self.eat(TokenKind::Comma).is_some() {
            keys.push(self.parse_sort_key()?);
        }
        Ok(SortCommand {
            keys,
            span: self.span_from(kw.span),
        })
    }

    fn parse_sort_key(&mut self) -> ParseResult<SortKey> {
        let expr = self.parse_expr()?;
        let direction = if self.eat(TokenKind::Asc).is_some() {
            Some(SortDirection::Asc)
        } else if self.eat(TokenKind::Desc).is_some() {
            Some(SortDirection::Desc)
        } else {
            None
        };
        let nulls = if self.eat(TokenKind::Nulls).is_some() {
            if self.eat(TokenKind::First).is_some() {
                Some(NullsOrder::First)
            } else if self.eat(TokenKind::Last).is_some() {
                Some(NullsOrder::Last)
            } else {
                return Err(self.err_expected("FIRST or LAST"));
            }
        } else {
            None
        };
        Ok(SortKey {
            span: self.span_from(expr.span()),
            expr,
            direction,
            nulls,
        })
    }

    fn parse_limit(&mut self) -> ParseResult<LimitCommand> {
        let kw = self.advance();
        let tok = self.expect(TokenKind::IntegerLiteral, "an integer")?;
        let count = tok.text.parse::<u64>().map_err(|_| {
            self.structural(format!("LIMIT value [{}] is out of range", tok.text), tok.span)
        })?;
        Ok(LimitCommand {
            count,
            raw: tok.text.to_owned(),
            span: self.span_from(kw.span),
        })
    }

    fn parse_name_patterns(&mut self) -> ParseResult<Vec<QualifiedNamePattern>> {
        let mut fields = vec![self.parse_qualified_name_pattern()?];
        while self.eat(TokenKind::Comma).is_some() {
            fields.push(self.parse_qualified_name_pattern()?);
        }
        Ok(fields)
    }

    fn parse_keep(&mut self) -> ParseResult<KeepCommand> {
        let kw = self.advance();
        let fields = self.parse_name_patterns()?;
        Ok(KeepCommand {
            fields,
            span: self.span_from(kw.span),
        })
    }

    fn parse_drop(&mut self) -> ParseResult<DropCommand> {
        let kw = self.advance();
        let fields = self.parse_name_patterns()?;
        for field in &fields {
            let drops_everything = matches!(
                field.parts.as_slice(),
                [PatternPart::Pattern(p)] if p.raw == "*"
            );
            if drops_everything {
                let diag = self.structural("removing all fields is not allowed [*]", field.span);
                self.record(diag);
            }
        }
        Ok(DropCommand {
            fields,
            span: self.span_from(kw.span),
        })
    }

    fn parse_rename(&mut self) -> ParseResult<RenameCommand> {
        let kw = self.advance();
        let mut clauses = vec![self.parse_rename_clause()?];
        while self.eat(TokenKind::Comma).is_some() {
            clauses.push(self.parse_rename_clause()?);
        }
        Ok(RenameCommand {
            clauses,
            span: self.span_from(kw.span),
        })
    }

    fn parse_rename_clause(&mut self) -> ParseResult<RenameClause> {
        let first = self.parse_qualified_name_pattern()?;
        let (old_name, new_name, syntax) = if self.eat(TokenKind::As).is_some() {
            let second = self.parse_qualified_name_pattern()?;
            (first, second, RenameSyntax::As)
        } else if self.eat(TokenKind::Assign).is_some() {
            let second = self.parse_qualified_name_pattern()?;
            (second, first, RenameSyntax::Assign)
        } else {
            return Err(self.err_expected("AS or '='"));
        };
        let span = old_name.span.merge(new_name.span);
        for name in [&old_name, &new_name] {
            if name.has_wildcard() {
                let diag = self.structural(
                    format!("using wildcards [*] in RENAME is not allowed [{name}]"),
                    name.span,
                );
                self.record(diag);
            }
        }
        Ok(RenameClause {
            old_name,
            new_name,
            syntax,
            span,
        })
    }

    fn parse_dissect(&mut self) -> ParseResult<DissectCommand> {
        let kw = self.advance();
        let input = self.parse_primary()?;
        let pattern = self.parse_string_literal("a dissect pattern")?;
        let mut options = Vec::new();
        if matches!(
            self.peek(),
            TokenKind::UnquotedIdentifier | TokenKind::QuotedIdentifier
        ) {
            options.push(self.parse_dissect_option()?);
            while self.eat(TokenKind::Comma).is_some() {
                options.push(self.parse_dissect_option()?);
            }
        }
        Ok(DissectCommand {
            input,
            pattern,
            options,
            span: self.span_from(kw.span),
        })
    }

    fn parse_dissect_option(&mut self) -> ParseResult<CommandOption> {
        let name = self.parse_identifier("an option name")?;
        self.expect(TokenKind::Assign, "'='")?;
        let value = self.parse_constant()?;
        let span = name.span.merge(value.span());
        if !name.name.eq_ignore_ascii_case("append_separator") {
            let diag = self.structural(
                format!(
                    "invalid option for DISSECT: [{}], only [append_separator] is supported",
                    name.name
                ),
                name.span,
            );
            self.record(diag);
        } else if !value.is_string_literal() {
            let diag = self.structural(
                format!("invalid value for DISSECT append_separator: expected a string, found [{value}]"),
                value.span(),
            );
            self.record(diag);
        }
        Ok(CommandOption { name, value, span })
    }

    fn parse_grok(&mut self) -> ParseResult<GrokCommand> {
        let kw = self.advance();
        let input = self.parse_primary()?;
        let pattern = self.parse_string_literal("a grok pattern")?;
        Ok(GrokCommand {
            input,
            pattern,
            span: self.span_from(kw.span),
        })
    }

    fn parse_enrich(&mut self) -> ParseResult<EnrichCommand> {
        let kw = self.advance();
        let mut settings: Vec<Setting> = Vec::new();
        while self.check(TokenKind::OpeningBracket) {
            let setting = self.parse_setting()?;
            if settings.iter().any(|s| s.name.eq_ignore_ascii_case(&setting.name)) {
                let diag = self.structural(
                    format!("only one [{}] setting is allowed", setting.name),
                    setting.span,
                );
                self.record(diag);
            }
            settings.push(setting);
        }
        let policy = self.parse_policy_name()?;
        let on = if self.eat(TokenKind::On).is_some() {
            Some(self.parse_qualified_name_pattern()?)
        } else {
            None
        };
        let mut with = Vec::new();
        if self.eat(TokenKind::With).is_some() {
            with.push(self.parse_enrich_field()?);
            while self.eat(TokenKind::Comma).is_some() {
                with.push(self.parse_enrich_field()?);
            }
        }
        Ok(EnrichCommand {
            settings,
            policy,
            on,
            with,
            span: self.span_from(kw.span),
        })
    }

    /// `[ccq.mode:value]`
    fn parse_setting(&mut self) -> ParseResult<Setting> {
        let open = self.advance();
        let name = self.expect(TokenKind::Setting, "a setting name")?;
        self.expect(TokenKind::Colon, "':'")?;
        let value = self.expect(TokenKind::Setting, "a setting value")?;
        self.expect(TokenKind::ClosingBracket, "']'")?;
        let span = self.span_from(open.span);
        if !name.text.eq_ignore_ascii_case("ccq.mode") {
            let diag = self.structural(
                format!("unsupported setting [{}], expected [ccq.mode]", name.text),
                name.span,
            );
            self.record(diag);
        } else if EnrichMode::from_name(value.text).is_none() {
            let diag = self.structural(
                format!(
                    "unrecognized value [{}] for setting [ccq.mode], expected one of [any, coordinator, remote]",
                    value.text
                ),
                value.span,
            );
            self.record(diag);
        }
        Ok(Setting {
            name: name.text.to_owned(),
            value: value.text.to_owned(),
            span,
        })
    }

    /// `[_mode:]name`
    fn parse_policy_name(&mut self) -> ParseResult<PolicyName> {
        let tok = self.expect(TokenKind::EnrichPolicyName, "an enrich policy name")?;
        let Some((prefix, name)) = tok.text.split_once(':') else {
            return Ok(PolicyName {
                mode: None,
                name: tok.text.to_owned(),
                span: tok.span,
            });
        };
        let mode = prefix.strip_prefix('_').and_then(EnrichMode::from_name);
        if mode.is_none() {
            let diag = self.structural(
                format!(
                    "unrecognized value [{prefix}], ENRICH policy qualifier needs to be one of [_any, _coordinator, _remote]"
                ),
                tok.span,
            );
            self.record(diag);
        }
        Ok(PolicyName {
            mode,
            name: name.to_owned(),
            span: tok.span,
        })
    }

    /// `[new =] field`
    fn parse_enrich_field(&mut self) -> ParseResult<EnrichField> {
        let first = self.parse_qualified_name_pattern()?;
        let (new_name, field) = if self.eat(TokenKind::Assign).is_some() {
            (Some(first), self.parse_qualified_name_pattern()?)
        } else {
            (None, first)
        };
        let span = new_name
            .as_ref()
            .map_or(field.span, |n| n.span.merge(field.span));
        for name in new_name.iter().chain(std::iter::once(&field)) {
            if name.has_wildcard() {
                let diag = self.structural(
                    format!("using wildcards [*] in ENRICH WITH projections is not allowed [{name}]"),
                    name.span,
                );
                self.record(diag);
            }
        }
        Ok(EnrichField {
            new_name,
            field,
            span,
        })
    }

    fn parse_mv_expand(&mut self) -> ParseResult<MvExpandCommand> {
        let kw = self.advance();
        let field = self.parse_qualified_name()?;
        Ok(MvExpandCommand {
            field,
            span: self.span_from(kw.span),
        })
    }

    fn parse_lookup(&mut self) -> ParseResult<LookupCommand> {
        let kw = self.advance();
        let tok = self.current();
        let join = tok.kind == TokenKind::UnquotedSource
            && tok.text.eq_ignore_ascii_case("join")
            && matches!(
                self.peek_nth(1),
                TokenKind::UnquotedSource | TokenKind::QuotedString
            );
        if join {
            self.advance();
        }
        let table = self.parse_index_pattern()?;
        self.expect(TokenKind::On, "ON")?;
        let match_fields = self.parse_name_patterns()?;
        Ok(LookupCommand {
            table,
            match_fields,
            join,
            span: self.span_from(kw.span),
        })
    }

    fn parse_match(&mut self) -> ParseResult<MatchCommand> {
        let kw = self.advance();
        let query = self.parse_string_literal("a query string")?;
        Ok(MatchCommand {
            query,
            span: self.span_from(kw.span),
        })
    }

    // ── Fields ──────────────────────────────────────────────────────────

    pub(crate) fn parse_fields(&mut self) -> ParseResult<Vec<Assignment>> {
        let mut fields = vec![self.parse_field()?];
        while self.eat(TokenKind::Comma).is_some() {
            fields.push(self.parse_field()?);
        }
        Ok(fields)
    }

    /// `[name =] expression`
    fn parse_field(&mut self) -> ParseResult<Assignment> {
        if matches!(
            self.peek(),
            TokenKind::UnquotedIdentifier
                | TokenKind::QuotedIdentifier
                | TokenKind::Param
                | TokenKind::NamedOrPositionalParam
        ) {
            let checkpoint = self.checkpoint();
            if let Ok(target) = self.parse_qualified_name() {
                if self.eat(TokenKind::Assign).is_some() {
                    let value = self.parse_expr()?;
                    let span = target.span.merge(value.span());
                    return Ok(Assignment {
                        target: Some(target),
                        value,
                        span,
                    });
                }
            }
            self.rewind(checkpoint);
        }
        let value: Expr = self.parse_expr()?;
        Ok(Assignment {
            target: None,
            span: value.span(),
            value,
        })
    }
}

fn commands_span(commands: &[Command]) -> Option<Span> {
    match (commands.first(), commands.last()) {
        (Some(first), Some(last)) => Some(first.span().merge(last.span())),
        _ => None,
    }
}

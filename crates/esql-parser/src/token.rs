// Token types
//
// Every token carries a discriminant, the exact source slice, a byte-offset
// Span and its starting line/column. Keywords are their own variants so the
// parser matches on kinds, never on text.

use esql_ast::Span;
use serde::Serialize;

/// Which stream a token belongs to. Hidden tokens (whitespace, comments)
/// are kept for tooling and skipped by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Default,
    Hidden,
}

/// A single token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// The source text of the token, verbatim.
    pub text: &'a str,
    /// Byte-offset span into the original source.
    pub span: Span,
    /// Line number (1-based) at the start of the token.
    pub line: u32,
    /// Column number (1-based, in characters) at the start of the token.
    pub col: u32,
    pub channel: Channel,
}

impl Token<'_> {
    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        matches!(self.channel, Channel::Hidden)
    }
}

/// Token discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // === Command keywords ===
    Dissect,
    Drop,
    Enrich,
    Eval,
    Explain,
    From,
    Grok,
    Keep,
    Limit,
    MvExpand,
    Rename,
    Row,
    Show,
    Sort,
    Stats,
    Where,
    /// Dev/preview commands, recognized only with dev features enabled.
    DevInlineStats,
    DevLookup,
    DevMatch,
    DevMetrics,
    /// Any other word in command position.
    UnknownCmd,

    // === Trivia ===
    LineComment,
    MultilineComment,
    Whitespace,

    // === Punctuation and operators ===
    Pipe,
    Comma,
    Dot,
    LeftParen,
    RightParen,
    /// `=`
    Assign,
    /// `==`
    Eq,
    /// `=~`
    CiEq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// `::`
    CastOp,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Percent,
    /// Anonymous parameter `?`.
    Param,
    Colon,
    OpeningBracket,
    ClosingBracket,

    // === Expression keywords ===
    By,
    And,
    Asc,
    Desc,
    False,
    First,
    In,
    Is,
    Last,
    Like,
    Not,
    Null,
    Nulls,
    Or,
    Rlike,
    True,

    // === Mode keywords ===
    Metadata,
    As,
    On,
    With,
    Info,

    // === Literals and names ===
    IntegerLiteral,
    DecimalLiteral,
    /// `"..."` or `"""..."""`.
    QuotedString,
    UnquotedIdentifier,
    /// `` `...` ``
    QuotedIdentifier,
    /// `?name` or `?1`.
    NamedOrPositionalParam,
    /// Index or table name in FROM, LOOKUP and METRICS.
    UnquotedSource,
    /// Field name pattern in KEEP, DROP, RENAME, ENRICH and LOOKUP.
    IdPattern,
    EnrichPolicyName,
    /// Word inside an ENRICH `[name:value]` setting.
    Setting,

    // === Special ===
    /// Input the active mode does not accept.
    Error,
    Eof,
}

impl TokenKind {
    /// Whitespace and comments.
    #[must_use]
    pub const fn is_trivia(self) -> bool {
        matches!(
            self,
            Self::Whitespace | Self::LineComment | Self::MultilineComment
        )
    }

    /// Human-readable description used in diagnostics.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Dissect => "DISSECT",
            Self::Drop => "DROP",
            Self::Enrich => "ENRICH",
            Self::Eval => "EVAL",
            Self::Explain => "EXPLAIN",
            Self::From => "FROM",
            Self::Grok => "GROK",
            Self::Keep => "KEEP",
            Self::Limit => "LIMIT",
            Self::MvExpand => "MV_EXPAND",
            Self::Rename => "RENAME",
            Self::Row => "ROW",
            Self::Show => "SHOW",
            Self::Sort => "SORT",
            Self::Stats => "STATS",
            Self::Where => "WHERE",
            Self::DevInlineStats => "INLINESTATS",
            Self::DevLookup => "LOOKUP",
            Self::DevMatch => "MATCH",
            Self::DevMetrics => "METRICS",
            Self::UnknownCmd => "command",
            Self::LineComment | Self::MultilineComment => "comment",
            Self::Whitespace => "whitespace",
            Self::Pipe => "'|'",
            Self::Comma => "','",
            Self::Dot => "'.'",
            Self::LeftParen => "'('",
            Self::RightParen => "')'",
            Self::Assign => "'='",
            Self::Eq => "'=='",
            Self::CiEq => "'=~'",
            Self::Neq => "'!='",
            Self::Lt => "'<'",
            Self::Lte => "'<='",
            Self::Gt => "'>'",
            Self::Gte => "'>='",
            Self::CastOp => "'::'",
            Self::Plus => "'+'",
            Self::Minus => "'-'",
            Self::Asterisk => "'*'",
            Self::Slash => "'/'",
            Self::Percent => "'%'",
            Self::Param => "'?'",
            Self::Colon => "':'",
            Self::OpeningBracket => "'['",
            Self::ClosingBracket => "']'",
            Self::By => "BY",
            Self::And => "AND",
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::False => "FALSE",
            Self::First => "FIRST",
            Self::In => "IN",
            Self::Is => "IS",
            Self::Last => "LAST",
            Self::Like => "LIKE",
            Self::Not => "NOT",
            Self::Null => "NULL",
            Self::Nulls => "NULLS",
            Self::Or => "OR",
            Self::Rlike => "RLIKE",
            Self::True => "TRUE",
            Self::Metadata => "METADATA",
            Self::As => "AS",
            Self::On => "ON",
            Self::With => "WITH",
            Self::Info => "INFO",
            Self::IntegerLiteral => "integer",
            Self::DecimalLiteral => "decimal",
            Self::QuotedString => "string",
            Self::UnquotedIdentifier | Self::QuotedIdentifier => "identifier",
            Self::NamedOrPositionalParam => "parameter",
            Self::UnquotedSource => "source name",
            Self::IdPattern => "field pattern",
            Self::EnrichPolicyName => "policy name",
            Self::Setting => "setting",
            Self::Error => "invalid input",
            Self::Eof => "end of input",
        }
    }
}

/// Look up a command keyword (case-insensitive). Dev keywords are returned
/// as their `Dev*` kinds regardless of the dev gate; the lexer applies it.
#[must_use]
pub fn command_keyword(word: &str) -> Option<TokenKind> {
    const COMMANDS: &[(&str, TokenKind)] = &[
        ("dissect", TokenKind::Dissect),
        ("drop", TokenKind::Drop),
        ("enrich", TokenKind::Enrich),
        ("eval", TokenKind::Eval),
        ("explain", TokenKind::Explain),
        ("from", TokenKind::From),
        ("grok", TokenKind::Grok),
        ("keep", TokenKind::Keep),
        ("limit", TokenKind::Limit),
        ("mv_expand", TokenKind::MvExpand),
        ("rename", TokenKind::Rename),
        ("row", TokenKind::Row),
        ("show", TokenKind::Show),
        ("sort", TokenKind::Sort),
        ("stats", TokenKind::Stats),
        ("where", TokenKind::Where),
        ("inlinestats", TokenKind::DevInlineStats),
        ("lookup", TokenKind::DevLookup),
        ("match", TokenKind::DevMatch),
        ("metrics", TokenKind::DevMetrics),
    ];
    lookup(COMMANDS, word)
}

/// Look up an expression keyword (case-insensitive). `match` is not listed;
/// it is dev-gated and handled by the lexer.
#[must_use]
pub fn expression_keyword(word: &str) -> Option<TokenKind> {
    const KEYWORDS: &[(&str, TokenKind)] = &[
        ("and", TokenKind::And),
        ("asc", TokenKind::Asc),
        ("by", TokenKind::By),
        ("desc", TokenKind::Desc),
        ("false", TokenKind::False),
        ("first", TokenKind::First),
        ("in", TokenKind::In),
        ("is", TokenKind::Is),
        ("last", TokenKind::Last),
        ("like", TokenKind::Like),
        ("not", TokenKind::Not),
        ("null", TokenKind::Null),
        ("nulls", TokenKind::Nulls),
        ("or", TokenKind::Or),
        ("rlike", TokenKind::Rlike),
        ("true", TokenKind::True),
    ];
    lookup(KEYWORDS, word)
}

fn lookup(table: &[(&str, TokenKind)], word: &str) -> Option<TokenKind> {
    table
        .iter()
        .find(|(kw, _)| kw.eq_ignore_ascii_case(word))
        .map(|&(_, kind)| kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_keywords_case_insensitive() {
        assert_eq!(command_keyword("FROM"), Some(TokenKind::From));
        assert_eq!(command_keyword("Mv_Expand"), Some(TokenKind::MvExpand));
        assert_eq!(command_keyword("lookup"), Some(TokenKind::DevLookup));
        assert_eq!(command_keyword("select"), None);
    }

    #[test]
    fn test_expression_keywords() {
        assert_eq!(expression_keyword("NULLS"), Some(TokenKind::Nulls));
        assert_eq!(expression_keyword("rLike"), Some(TokenKind::Rlike));
        assert_eq!(expression_keyword("match"), None);
        assert_eq!(expression_keyword("host"), None);
    }

    #[test]
    fn test_kind_classification() {
        assert!(TokenKind::Whitespace.is_trivia());
        assert!(TokenKind::MultilineComment.is_trivia());
        assert!(!TokenKind::Pipe.is_trivia());
    }

    #[test]
    fn test_describe_for_diagnostics() {
        assert_eq!(TokenKind::Pipe.describe(), "'|'");
        assert_eq!(TokenKind::Eof.describe(), "end of input");
        assert_eq!(TokenKind::DevInlineStats.describe(), "INLINESTATS");
    }
}

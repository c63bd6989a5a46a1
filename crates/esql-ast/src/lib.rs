//! ES|QL abstract syntax tree node types.
//!
//! Every query parsed by `esql-parser` produces a [`Query`] built from these
//! nodes. All nodes that represent user-written syntax carry a [`Span`] so
//! diagnostics, editors and re-serialization can point back at the exact
//! source text.

mod display;

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Span: source location tracking
// ---------------------------------------------------------------------------

/// A byte-offset range into the original query text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    /// Byte offset of the first character (inclusive).
    pub start: u32,
    /// Byte offset one past the last character (exclusive).
    pub end: u32,
}

impl Span {
    /// Create a new span from start (inclusive) to end (exclusive) byte offsets.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A zero-length span at position 0, used as a placeholder.
    pub const ZERO: Self = Self { start: 0, end: 0 };

    /// An empty span located at `offset`.
    #[must_use]
    pub const fn at(offset: u32) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Merge two spans into one that covers both.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        let start = if self.start < other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end > other.end {
            self.end
        } else {
            other.end
        };
        Self { start, end }
    }

    /// Length in bytes.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.end - self.start
    }

    /// Whether the span is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// The slice of `source` covered by this span.
    ///
    /// Returns an empty string when the span does not fall on character
    /// boundaries of `source`.
    #[must_use]
    pub fn slice(self, source: &str) -> &str {
        source
            .get(self.start as usize..self.end as usize)
            .unwrap_or_default()
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Query and commands
// ---------------------------------------------------------------------------

/// A parsed query: commands in pipe order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub commands: Vec<Command>,
    pub span: Span,
}

impl Query {
    /// An empty query anchored at `span`. Only produced for inputs that
    /// contain no recoverable command.
    #[must_use]
    pub const fn empty(span: Span) -> Self {
        Self {
            commands: Vec::new(),
            span,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// A single pipe-delimited stage of a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    // Source commands
    From(FromCommand),
    Row(RowCommand),
    Show(ShowCommand),
    Explain(ExplainCommand),
    Metrics(MetricsCommand),

    // Processing commands
    Eval(EvalCommand),
    Where(WhereCommand),
    Stats(StatsCommand),
    InlineStats(InlineStatsCommand),
    Sort(SortCommand),
    Limit(LimitCommand),
    Keep(KeepCommand),
    Drop(DropCommand),
    Rename(RenameCommand),
    Dissect(DissectCommand),
    Grok(GrokCommand),
    Enrich(EnrichCommand),
    MvExpand(MvExpandCommand),
    Lookup(LookupCommand),
    Match(MatchCommand),
}

impl Command {
    /// Return the span of this command, keyword included.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::From(c) => c.span,
            Self::Row(c) => c.span,
            Self::Show(c) => c.span,
            Self::Explain(c) => c.span,
            Self::Metrics(c) => c.span,
            Self::Eval(c) => c.span,
            Self::Where(c) => c.span,
            Self::Stats(c) => c.span,
            Self::InlineStats(c) => c.span,
            Self::Sort(c) => c.span,
            Self::Limit(c) => c.span,
            Self::Keep(c) => c.span,
            Self::Drop(c) => c.span,
            Self::Rename(c) => c.span,
            Self::Dissect(c) => c.span,
            Self::Grok(c) => c.span,
            Self::Enrich(c) => c.span,
            Self::MvExpand(c) => c.span,
            Self::Lookup(c) => c.span,
            Self::Match(c) => c.span,
        }
    }

    /// The command keyword as written in canonical (upper) case.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::From(_) => "FROM",
            Self::Row(_) => "ROW",
            Self::Show(_) => "SHOW",
            Self::Explain(_) => "EXPLAIN",
            Self::Metrics(_) => "METRICS",
            Self::Eval(_) => "EVAL",
            Self::Where(_) => "WHERE",
            Self::Stats(_) => "STATS",
            Self::InlineStats(_) => "INLINESTATS",
            Self::Sort(_) => "SORT",
            Self::Limit(_) => "LIMIT",
            Self::Keep(_) => "KEEP",
            Self::Drop(_) => "DROP",
            Self::Rename(_) => "RENAME",
            Self::Dissect(_) => "DISSECT",
            Self::Grok(_) => "GROK",
            Self::Enrich(_) => "ENRICH",
            Self::MvExpand(_) => "MV_EXPAND",
            Self::Lookup(_) => "LOOKUP",
            Self::Match(_) => "MATCH",
        }
    }

    /// Whether this command produces rows on its own (may start a query).
    #[must_use]
    pub const fn is_source(&self) -> bool {
        matches!(
            self,
            Self::From(_) | Self::Row(_) | Self::Show(_) | Self::Explain(_) | Self::Metrics(_)
        )
    }
}

/// `FROM index, remote:index [METADATA _id, _index]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FromCommand {
    pub sources: Vec<IndexPattern>,
    pub metadata: Option<MetadataClause>,
    pub span: Span,
}

/// `METADATA _id, _index`, optionally in the legacy `[METADATA ...]` form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataClause {
    pub fields: Vec<SourceIdentifier>,
    pub bracketed: bool,
    pub span: Span,
}

/// `ROW a = 1, b = "x"`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowCommand {
    pub fields: Vec<Assignment>,
    pub span: Span,
}

/// `EVAL x = a + 1, y`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalCommand {
    pub fields: Vec<Assignment>,
    pub span: Span,
}

/// `WHERE condition`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhereCommand {
    pub condition: Expr,
    pub span: Span,
}

/// `STATS [aggregations] [BY groupings]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsCommand {
    pub aggregations: Vec<Assignment>,
    pub groupings: Vec<Assignment>,
    pub span: Span,
}

/// `INLINESTATS aggregations [BY groupings]` (dev/preview).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineStatsCommand {
    pub aggregations: Vec<Assignment>,
    pub groupings: Vec<Assignment>,
    pub span: Span,
}

/// `SORT key [ASC|DESC] [NULLS FIRST|LAST], ...`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortCommand {
    pub keys: Vec<SortKey>,
    pub span: Span,
}

/// `LIMIT n`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimitCommand {
    pub count: u64,
    /// The integer exactly as written.
    pub raw: String,
    pub span: Span,
}

/// `KEEP pattern, ...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeepCommand {
    pub fields: Vec<QualifiedNamePattern>,
    pub span: Span,
}

/// `DROP pattern, ...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropCommand {
    pub fields: Vec<QualifiedNamePattern>,
    pub span: Span,
}

/// `RENAME old AS new, new2 = old2`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameCommand {
    pub clauses: Vec<RenameClause>,
    pub span: Span,
}

/// A single renaming inside `RENAME`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameClause {
    pub old_name: QualifiedNamePattern,
    pub new_name: QualifiedNamePattern,
    pub syntax: RenameSyntax,
    pub span: Span,
}

/// Which of the two renaming spellings was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameSyntax {
    /// `old AS new`
    As,
    /// `new = old`
    Assign,
}

/// `DISSECT input "pattern" [append_separator = "-"]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DissectCommand {
    pub input: Expr,
    pub pattern: Expr,
    pub options: Vec<CommandOption>,
    pub span: Span,
}

/// `name = constant` option of a command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOption {
    pub name: Identifier,
    pub value: Expr,
    pub span: Span,
}

/// `GROK input "pattern"`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrokCommand {
    pub input: Expr,
    pub pattern: Expr,
    pub span: Span,
}

/// `ENRICH [ccq.mode:any] policy ON field WITH new = field, ...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichCommand {
    pub settings: Vec<Setting>,
    pub policy: PolicyName,
    pub on: Option<QualifiedNamePattern>,
    pub with: Vec<EnrichField>,
    pub span: Span,
}

/// `[name:value]` setting in front of an ENRICH policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Setting {
    pub name: String,
    pub value: String,
    pub span: Span,
}

/// Where an enrich policy is resolved in a cross-cluster query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichMode {
    Any,
    Coordinator,
    Remote,
}

impl EnrichMode {
    /// Parse a mode name case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("any") {
            Some(Self::Any)
        } else if name.eq_ignore_ascii_case("coordinator") {
            Some(Self::Coordinator)
        } else if name.eq_ignore_ascii_case("remote") {
            Some(Self::Remote)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Coordinator => "coordinator",
            Self::Remote => "remote",
        }
    }
}

/// An enrich policy name, optionally prefixed with `_mode:`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyName {
    pub mode: Option<EnrichMode>,
    pub name: String,
    pub span: Span,
}

/// `[new =] field` inside `ENRICH ... WITH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichField {
    pub new_name: Option<QualifiedNamePattern>,
    pub field: QualifiedNamePattern,
    pub span: Span,
}

/// `MV_EXPAND field`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MvExpandCommand {
    pub field: QualifiedName,
    pub span: Span,
}

/// `LOOKUP [JOIN] table ON field, ...` (dev/preview).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupCommand {
    pub table: IndexPattern,
    pub match_fields: Vec<QualifiedNamePattern>,
    /// Whether the `JOIN` word followed `LOOKUP`.
    pub join: bool,
    pub span: Span,
}

/// `METRICS index, ... [aggregations] [BY groupings]` (dev/preview).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsCommand {
    pub sources: Vec<IndexPattern>,
    pub aggregations: Vec<Assignment>,
    pub groupings: Vec<Assignment>,
    pub span: Span,
}

/// `SHOW INFO`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShowCommand {
    pub item: ShowItem,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowItem {
    Info,
}

/// `EXPLAIN [ query ]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainCommand {
    pub query: Box<Query>,
    pub span: Span,
}

/// `MATCH "query string"` (dev/preview).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCommand {
    pub query: Expr,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Command building blocks
// ---------------------------------------------------------------------------

/// `[target =] value` as used by ROW, EVAL, STATS and friends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub target: Option<QualifiedName>,
    pub value: Expr,
    pub span: Span,
}

/// One key of a SORT command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortKey {
    pub expr: Expr,
    pub direction: Option<SortDirection>,
    pub nulls: Option<NullsOrder>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NullsOrder {
    First,
    Last,
}

// ---------------------------------------------------------------------------
// Names, sources and patterns
// ---------------------------------------------------------------------------

/// An identifier with quoting removed and doubled backquotes collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Identifier {
    pub name: String,
    /// Whether the identifier was written between backquotes.
    pub quoted: bool,
    pub span: Span,
}

impl Identifier {
    #[must_use]
    pub fn new(name: impl Into<String>, quoted: bool, span: Span) -> Self {
        Self {
            name: name.into(),
            quoted,
            span,
        }
    }
}

/// A query parameter: `?`, `?name` or `?1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Parameter {
    Anonymous,
    Named(String),
    Positional(u32),
}

/// One dot-separated segment of a field name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NamePart {
    Identifier(Identifier),
    Parameter { param: Parameter, span: Span },
}

impl NamePart {
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Identifier(id) => id.span,
            Self::Parameter { span, .. } => *span,
        }
    }

    /// The unquoted name, or `None` for a parameter segment.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Identifier(id) => Some(&id.name),
            Self::Parameter { .. } => None,
        }
    }
}

/// A dotted field name such as `host.name` or `` `a.b`.c ``.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedName {
    pub parts: Vec<NamePart>,
    pub span: Span,
}

impl QualifiedName {
    /// The unquoted segment names, with parameter segments skipped.
    #[must_use]
    pub fn path(&self) -> Vec<&str> {
        self.parts.iter().filter_map(NamePart::name).collect()
    }

    /// Whether this name is the single unquoted/quoted segment `name`.
    #[must_use]
    pub fn is_simple(&self, name: &str) -> bool {
        matches!(self.parts.as_slice(), [NamePart::Identifier(id)] if id.name == name)
    }
}

/// A field pattern segment as used by KEEP, DROP, RENAME and ENRICH.
///
/// `pattern` is the normalized text (backquotes removed, wildcards kept);
/// `raw` is the text as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IdPattern {
    pub pattern: String,
    pub raw: String,
    pub span: Span,
}

impl IdPattern {
    /// Whether the pattern contains an unquoted `*` wildcard.
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        let mut in_quotes = false;
        for ch in self.raw.chars() {
            match ch {
                '`' => in_quotes = !in_quotes,
                '*' if !in_quotes => return true,
                _ => {}
            }
        }
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternPart {
    Pattern(IdPattern),
    Parameter { param: Parameter, span: Span },
}

impl PatternPart {
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Pattern(p) => p.span,
            Self::Parameter { span, .. } => *span,
        }
    }
}

/// A dotted field pattern such as `host.*` or `` `a.b`* ``.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedNamePattern {
    pub parts: Vec<PatternPart>,
    pub span: Span,
}

impl QualifiedNamePattern {
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, PatternPart::Pattern(id) if id.has_wildcard()))
    }

    /// The normalized dotted text, with `?` standing in for parameters.
    #[must_use]
    pub fn dotted(&self) -> String {
        let mut out = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match part {
                PatternPart::Pattern(p) => out.push_str(&p.pattern),
                PatternPart::Parameter { .. } => out.push('?'),
            }
        }
        out
    }
}

/// An index or table name as written in FROM, METRICS or LOOKUP.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceIdentifier {
    pub name: String,
    /// Whether the name was a quoted string (`"logs-*"`).
    pub quoted: bool,
    pub span: Span,
}

/// `[cluster:]index`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IndexPattern {
    pub cluster: Option<SourceIdentifier>,
    pub index: SourceIdentifier,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Literals and operators
// ---------------------------------------------------------------------------

/// A literal constant.
///
/// Numeric and string literals keep the text exactly as written next to
/// the decoded value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Literal {
    Null,
    Boolean { value: bool },
    Integer { raw: String, value: u64 },
    Decimal { raw: String, value: f64 },
    /// An integer followed by a unit, e.g. `1 day` or `15 minutes`.
    QualifiedInteger { raw: String, value: u64, unit: String },
    String { raw: String, value: String },
    /// The `*` argument of `count(*)`.
    Star,
}

impl Literal {
    /// Decoded string value, if this is a string literal.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,

    // Comparison
    Eq,
    /// `=~`, case-insensitive equality.
    InsensitiveEq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And,
    Or,
}

impl BinaryOp {
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::InsensitiveEq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Eq => "==",
            Self::InsensitiveEq => "=~",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "AND",
            Self::Or => "OR",
        })
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// Unary minus (`-expr`).
    Negate,
    /// Unary plus (`+expr`).
    Plus,
    /// Logical NOT (`NOT expr`).
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Negate => "-",
            Self::Plus => "+",
            Self::Not => "NOT",
        })
    }
}

/// Pattern-matching operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeOp {
    Like,
    Rlike,
}

/// How a list literal was delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListDelimiter {
    /// `[a, b]`
    Bracket,
    /// `(a, b)`
    Paren,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// An expression node in the AST.
///
/// Every variant carries a [`Span`] for source-location tracking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Expr {
    /// A literal constant.
    Literal { literal: Literal, span: Span },

    /// A field reference such as `host.name`.
    Field { name: QualifiedName, span: Span },

    /// A query parameter.
    Parameter { param: Parameter, span: Span },

    /// `name(args)`; `count(*)` has a single [`Literal::Star`] argument.
    FunctionCall {
        name: NamePart,
        args: Vec<Self>,
        span: Span,
    },

    /// A binary operation: `left op right`.
    BinaryOp {
        left: Box<Self>,
        op: BinaryOp,
        right: Box<Self>,
        span: Span,
    },

    /// A unary operation: `op expr`.
    UnaryOp {
        op: UnaryOp,
        expr: Box<Self>,
        span: Span,
    },

    /// `expr::type`
    Cast {
        expr: Box<Self>,
        data_type: Identifier,
        span: Span,
    },

    /// `[a, b, c]` or `(a, b, c)`.
    List {
        items: Vec<Self>,
        delimiter: ListDelimiter,
        span: Span,
    },

    /// `expr [NOT] IN (a, b, ...)`.
    In {
        expr: Box<Self>,
        list: Vec<Self>,
        not: bool,
        span: Span,
    },

    /// `expr [NOT] LIKE|RLIKE "pattern"`.
    Like {
        expr: Box<Self>,
        pattern: Box<Self>,
        op: LikeOp,
        not: bool,
        span: Span,
    },

    /// `expr IS [NOT] NULL`.
    IsNull {
        expr: Box<Self>,
        not: bool,
        span: Span,
    },

    /// `field MATCH "query"` (dev/preview).
    Match {
        expr: Box<Self>,
        query: Box<Self>,
        span: Span,
    },
}

impl Expr {
    /// Return the span of this expression node.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Literal { span, .. }
            | Self::Field { span, .. }
            | Self::Parameter { span, .. }
            | Self::FunctionCall { span, .. }
            | Self::BinaryOp { span, .. }
            | Self::UnaryOp { span, .. }
            | Self::Cast { span, .. }
            | Self::List { span, .. }
            | Self::In { span, .. }
            | Self::Like { span, .. }
            | Self::IsNull { span, .. }
            | Self::Match { span, .. } => *span,
        }
    }

    /// The literal carried by this node, if it is a literal.
    #[must_use]
    pub const fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal { literal, .. } => Some(literal),
            _ => None,
        }
    }

    /// Whether this node is a string literal.
    #[must_use]
    pub const fn is_string_literal(&self) -> bool {
        matches!(
            self,
            Self::Literal {
                literal: Literal::String { .. },
                ..
            }
        )
    }
}

//! ES|QL rendering via `fmt::Display` for AST nodes.
//!
//! Every command and expression renders back to query text with upper-case
//! keywords and commands joined by ` | `. Parsing the rendered text yields
//! the same tree (spans aside). Compound sub-expressions are always
//! parenthesized, so the output never depends on operator precedence.

#[allow(clippy::wildcard_imports)]
use crate::*;
use std::fmt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn comma_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn dotted<T: fmt::Display>(f: &mut fmt::Formatter<'_>, parts: &[T]) -> fmt::Result {
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            f.write_str(".")?;
        }
        write!(f, "{part}")?;
    }
    Ok(())
}

/// Words that lex as keywords inside expressions and therefore cannot be
/// used as bare field names.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "and", "asc", "by", "desc", "false", "first", "in", "is", "last", "like", "match", "not",
    "null", "nulls", "or", "rlike", "true",
];

/// Returns true if `name` cannot be written as an unquoted identifier.
fn needs_quoting(name: &str) -> bool {
    let bytes = name.as_bytes();
    let Some(&first) = bytes.first() else {
        return true;
    };
    let body_ok = |b: &u8| b.is_ascii_alphanumeric() || *b == b'_';
    let shape_ok = if first.is_ascii_alphabetic() {
        bytes[1..].iter().all(body_ok)
    } else if first == b'_' || first == b'@' {
        bytes.len() > 1 && bytes[1..].iter().all(body_ok)
    } else {
        false
    };
    !shape_ok
        || EXPRESSION_KEYWORDS
            .iter()
            .any(|kw| kw.eq_ignore_ascii_case(name))
}

fn write_ident(f: &mut fmt::Formatter<'_>, name: &str, quoted: bool) -> fmt::Result {
    if quoted || needs_quoting(name) {
        write!(f, "`{}`", name.replace('`', "``"))
    } else {
        f.write_str(name)
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in value.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            other => write!(f, "{other}")?,
        }
    }
    f.write_str("\"")
}

/// Write an expression, wrapping it in parentheses unless it is atomic.
fn write_paren_if_compound(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    if matches!(
        expr,
        Expr::BinaryOp { .. }
            | Expr::UnaryOp { .. }
            | Expr::In { .. }
            | Expr::Like { .. }
            | Expr::IsNull { .. }
            | Expr::Match { .. }
    ) {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

fn write_not(f: &mut fmt::Formatter<'_>, not: bool) -> fmt::Result {
    if not {
        f.write_str(" NOT")?;
    }
    Ok(())
}

fn write_stats_body(
    f: &mut fmt::Formatter<'_>,
    aggregations: &[Assignment],
    groupings: &[Assignment],
) -> fmt::Result {
    if !aggregations.is_empty() {
        f.write_str(" ")?;
        comma_list(f, aggregations)?;
    }
    if !groupings.is_empty() {
        f.write_str(" BY ")?;
        comma_list(f, groupings)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_ident(f, &self.name, self.quoted)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("?"),
            Self::Named(name) => write!(f, "?{name}"),
            Self::Positional(n) => write!(f, "?{n}"),
        }
    }
}

impl fmt::Display for NamePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(id) => write!(f, "{id}"),
            Self::Parameter { param, .. } => write!(f, "{param}"),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dotted(f, &self.parts)
    }
}

impl fmt::Display for IdPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Display for PatternPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(p) => write!(f, "{p}"),
            Self::Parameter { param, .. } => write!(f, "{param}"),
        }
    }
}

impl fmt::Display for QualifiedNamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dotted(f, &self.parts)
    }
}

impl fmt::Display for SourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write_string(f, &self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

impl fmt::Display for IndexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cluster) = &self.cluster {
            write!(f, "{cluster}:")?;
        }
        write!(f, "{}", self.index)
    }
}

// ---------------------------------------------------------------------------
// Literals and expressions
// ---------------------------------------------------------------------------

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean { value } => f.write_str(if *value { "true" } else { "false" }),
            Self::Integer { raw, .. } | Self::Decimal { raw, .. } | Self::String { raw, .. } => {
                f.write_str(raw)
            }
            Self::QualifiedInteger { raw, unit, .. } => write!(f, "{raw} {unit}"),
            Self::Star => f.write_str("*"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal { literal, .. } => write!(f, "{literal}"),
            Self::Field { name, .. } => write!(f, "{name}"),
            Self::Parameter { param, .. } => write!(f, "{param}"),
            Self::FunctionCall { name, args, .. } => {
                write!(f, "{name}(")?;
                comma_list(f, args)?;
                f.write_str(")")
            }
            Self::BinaryOp {
                left, op, right, ..
            } => {
                write_paren_if_compound(f, left)?;
                write!(f, " {op} ")?;
                write_paren_if_compound(f, right)
            }
            Self::UnaryOp { op, expr, .. } => {
                if matches!(op, UnaryOp::Not) {
                    f.write_str("NOT ")?;
                } else {
                    write!(f, "{op}")?;
                }
                write_paren_if_compound(f, expr)
            }
            Self::Cast {
                expr, data_type, ..
            } => {
                write_paren_if_compound(f, expr)?;
                write!(f, "::{data_type}")
            }
            Self::List {
                items, delimiter, ..
            } => {
                let (open, close) = match delimiter {
                    ListDelimiter::Bracket => ("[", "]"),
                    ListDelimiter::Paren => ("(", ")"),
                };
                f.write_str(open)?;
                comma_list(f, items)?;
                f.write_str(close)
            }
            Self::In {
                expr, list, not, ..
            } => {
                write_paren_if_compound(f, expr)?;
                write_not(f, *not)?;
                f.write_str(" IN (")?;
                comma_list(f, list)?;
                f.write_str(")")
            }
            Self::Like {
                expr,
                pattern,
                op,
                not,
                ..
            } => {
                write_paren_if_compound(f, expr)?;
                write_not(f, *not)?;
                f.write_str(match op {
                    LikeOp::Like => " LIKE ",
                    LikeOp::Rlike => " RLIKE ",
                })?;
                write!(f, "{pattern}")
            }
            Self::IsNull { expr, not, .. } => {
                write_paren_if_compound(f, expr)?;
                f.write_str(if *not { " IS NOT NULL" } else { " IS NULL" })
            }
            Self::Match { expr, query, .. } => {
                write_paren_if_compound(f, expr)?;
                write!(f, " MATCH {query}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Command building blocks
// ---------------------------------------------------------------------------

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(target) = &self.target {
            write!(f, "{target} = ")?;
        }
        write!(f, "{}", self.value)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        match self.direction {
            Some(SortDirection::Asc) => f.write_str(" ASC")?,
            Some(SortDirection::Desc) => f.write_str(" DESC")?,
            None => {}
        }
        match self.nulls {
            Some(NullsOrder::First) => f.write_str(" NULLS FIRST"),
            Some(NullsOrder::Last) => f.write_str(" NULLS LAST"),
            None => Ok(()),
        }
    }
}

impl fmt::Display for RenameClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.syntax {
            RenameSyntax::As => write!(f, "{} AS {}", self.old_name, self.new_name),
            RenameSyntax::Assign => write!(f, "{} = {}", self.new_name, self.old_name),
        }
    }
}

impl fmt::Display for CommandOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.name, self.value)
    }
}

impl fmt::Display for PolicyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(mode) = self.mode {
            write!(f, "_{}:", mode.as_str())?;
        }
        f.write_str(&self.name)
    }
}

impl fmt::Display for EnrichField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(new_name) = &self.new_name {
            write!(f, "{new_name} = ")?;
        }
        write!(f, "{}", self.field)
    }
}

impl fmt::Display for MetadataClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bracketed {
            f.write_str("[")?;
        }
        f.write_str("METADATA ")?;
        comma_list(f, &self.fields)?;
        if self.bracketed {
            f.write_str("]")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Commands and queries
// ---------------------------------------------------------------------------

impl fmt::Display for Command {
    #[allow(clippy::too_many_lines)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())?;
        match self {
            Self::From(c) => {
                f.write_str(" ")?;
                comma_list(f, &c.sources)?;
                if let Some(metadata) = &c.metadata {
                    write!(f, " {metadata}")?;
                }
                Ok(())
            }
            Self::Row(c) => {
                f.write_str(" ")?;
                comma_list(f, &c.fields)
            }
            Self::Eval(c) => {
                f.write_str(" ")?;
                comma_list(f, &c.fields)
            }
            Self::Where(c) => write!(f, " {}", c.condition),
            Self::Stats(c) => write_stats_body(f, &c.aggregations, &c.groupings),
            Self::InlineStats(c) => write_stats_body(f, &c.aggregations, &c.groupings),
            Self::Sort(c) => {
                f.write_str(" ")?;
                comma_list(f, &c.keys)
            }
            Self::Limit(c) => write!(f, " {}", c.raw),
            Self::Keep(c) => {
                f.write_str(" ")?;
                comma_list(f, &c.fields)
            }
            Self::Drop(c) => {
                f.write_str(" ")?;
                comma_list(f, &c.fields)
            }
            Self::Rename(c) => {
                f.write_str(" ")?;
                comma_list(f, &c.clauses)
            }
            Self::Dissect(c) => {
                f.write_str(" ")?;
                write_paren_if_compound(f, &c.input)?;
                write!(f, " {}", c.pattern)?;
                if !c.options.is_empty() {
                    f.write_str(" ")?;
                    comma_list(f, &c.options)?;
                }
                Ok(())
            }
            Self::Grok(c) => {
                f.write_str(" ")?;
                write_paren_if_compound(f, &c.input)?;
                write!(f, " {}", c.pattern)
            }
            Self::Enrich(c) => {
                for setting in &c.settings {
                    write!(f, " {setting}")?;
                }
                write!(f, " {}", c.policy)?;
                if let Some(on) = &c.on {
                    write!(f, " ON {on}")?;
                }
                if !c.with.is_empty() {
                    f.write_str(" WITH ")?;
                    comma_list(f, &c.with)?;
                }
                Ok(())
            }
            Self::MvExpand(c) => write!(f, " {}", c.field),
            Self::Lookup(c) => {
                if c.join {
                    f.write_str(" JOIN")?;
                }
                write!(f, " {} ON ", c.table)?;
                comma_list(f, &c.match_fields)
            }
            Self::Metrics(c) => {
                f.write_str(" ")?;
                comma_list(f, &c.sources)?;
                write_stats_body(f, &c.aggregations, &c.groupings)
            }
            Self::Show(c) => match c.item {
                ShowItem::Info => f.write_str(" INFO"),
            },
            Self::Explain(c) => write!(f, " [ {} ]", c.query),
            Self::Match(c) => write!(f, " {}", c.query),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{command}")?;
        }
        Ok(())
    }
}

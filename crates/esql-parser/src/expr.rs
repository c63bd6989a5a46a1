// Expression syntax
//
// Pratt expression parser plus the name, literal and constant rules the
// command grammar shares.
//
// Precedence table (lowest to highest):
//   OR
//   AND
//   NOT (prefix)
//   [NOT] IN, [NOT] LIKE, [NOT] RLIKE, IS [NOT] NULL, MATCH
//   == =~ != < <= > >= (non-associative)
//   + - (binary)
//   * / %
//   - + (unary prefix)
//   :: (postfix cast, on primaries)
//
// Predicates and NOT yield conditions, which only AND/OR may combine; a
// condition inside a comparison or arithmetic needs parentheses.

use esql_ast::{
    BinaryOp, Expr, Identifier, IdPattern, LikeOp, ListDelimiter, Literal, NamePart, Parameter,
    PatternPart, QualifiedName, QualifiedNamePattern, Span, UnaryOp,
};

use esql_error::Diagnostic;

use crate::parser::{ParseResult, Parser};
use crate::token::{Token, TokenKind};

// Binding powers: higher = tighter binding.
// Left BP is checked against min_bp; right BP is passed to recursive call.
mod bp {
    pub const OR: (u8, u8) = (1, 2);
    pub const AND: (u8, u8) = (3, 4);
    pub const NOT_PREFIX: u8 = 5;
    // IN, LIKE, RLIKE, IS NULL, MATCH (postfix left BP)
    pub const PREDICATE: u8 = 7;
    pub const COMPARISON: (u8, u8) = (9, 10);
    pub const ADD: (u8, u8) = (11, 12);
    pub const MUL: (u8, u8) = (13, 14);
    pub const UNARY: u8 = 15;
}

/// What the expression parsed so far may still be an operand of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// Any operator.
    Value,
    /// `a < b`: a predicate, AND or OR.
    Comparison,
    /// Predicate, NOT, AND or OR result: only AND or OR.
    Condition,
}

impl Parser<'_> {
    /// Parse a boolean or value expression.
    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_expr_bp(0)
    }

    // ── Pratt core ──────────────────────────────────────────────────────

    /// A value expression: comparisons allowed, conditions only when
    /// parenthesized.
    fn parse_value_expr(&mut self) -> ParseResult<Expr> {
        self.parse_expr_bp(bp::COMPARISON.0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> ParseResult<Expr> {
        self.nested(|p| {
            let (mut lhs, mut shape) = p.parse_prefix(min_bp)?;
            loop {
                if p.predicate_ahead() {
                    if bp::PREDICATE < min_bp {
                        break;
                    }
                    if shape == Shape::Condition {
                        return Err(p.misplaced_operator("a condition"));
                    }
                    lhs = p.parse_predicate(lhs)?;
                    shape = Shape::Condition;
                    continue;
                }
                if let Some(((l_bp, r_bp), op)) = p.infix_op() {
                    if l_bp < min_bp {
                        break;
                    }
                    let logical = matches!(op, BinaryOp::And | BinaryOp::Or);
                    match shape {
                        Shape::Condition if !logical => {
                            return Err(p.misplaced_operator("a condition"));
                        }
                        Shape::Comparison if !logical => {
                            return Err(p.misplaced_operator("a comparison"));
                        }
                        _ => {}
                    }
                    p.advance();
                    let rhs = p.parse_expr_bp(r_bp)?;
                    let span = lhs.span().merge(rhs.span());
                    lhs = Expr::BinaryOp {
                        left: Box::new(lhs),
                        op,
                        right: Box::new(rhs),
                        span,
                    };
                    shape = if logical {
                        Shape::Condition
                    } else if op.is_comparison() {
                        Shape::Comparison
                    } else {
                        Shape::Value
                    };
                    continue;
                }
                break;
            }
            Ok(lhs)
        })
    }

    /// The operator at the cursor cannot take `what` as its left operand.
    fn misplaced_operator(&self, what: &str) -> Diagnostic {
        let tok = self.current();
        Diagnostic::syntax(
            format!("'{}' cannot follow {what} without parentheses", tok.text),
            tok.span,
            tok.line,
            tok.col,
        )
    }

    fn infix_op(&self) -> Option<((u8, u8), BinaryOp)> {
        let op = match self.peek() {
            TokenKind::Or => return Some((bp::OR, BinaryOp::Or)),
            TokenKind::And => return Some((bp::AND, BinaryOp::And)),
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::CiEq => BinaryOp::InsensitiveEq,
            TokenKind::Neq => BinaryOp::Ne,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Lte => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Gte => BinaryOp::Ge,
            TokenKind::Plus => return Some((bp::ADD, BinaryOp::Add)),
            TokenKind::Minus => return Some((bp::ADD, BinaryOp::Subtract)),
            TokenKind::Asterisk => return Some((bp::MUL, BinaryOp::Multiply)),
            TokenKind::Slash => return Some((bp::MUL, BinaryOp::Divide)),
            TokenKind::Percent => return Some((bp::MUL, BinaryOp::Modulo)),
            _ => return None,
        };
        Some((bp::COMPARISON, op))
    }

    fn predicate_ahead(&self) -> bool {
        match self.peek() {
            TokenKind::In | TokenKind::Like | TokenKind::Rlike | TokenKind::Is | TokenKind::DevMatch => {
                true
            }
            TokenKind::Not => matches!(
                self.peek_nth(1),
                TokenKind::In | TokenKind::Like | TokenKind::Rlike
            ),
            _ => false,
        }
    }

    // ── Prefix ──────────────────────────────────────────────────────────

    /// NOT only where a condition may stand: at the top, or under NOT,
    /// AND or OR.
    fn parse_prefix(&mut self, min_bp: u8) -> ParseResult<(Expr, Shape)> {
        let tok = self.current();
        let (op, r_bp, shape) = match tok.kind {
            TokenKind::Not if min_bp > bp::NOT_PREFIX => {
                return Err(self.err_expected("a value"));
            }
            TokenKind::Not => (UnaryOp::Not, bp::NOT_PREFIX, Shape::Condition),
            TokenKind::Minus => (UnaryOp::Negate, bp::UNARY, Shape::Value),
            TokenKind::Plus => (UnaryOp::Plus, bp::UNARY, Shape::Value),
            _ => return Ok((self.parse_primary()?, Shape::Value)),
        };
        self.advance();
        let inner = self.parse_expr_bp(r_bp)?;
        let expr = Expr::UnaryOp {
            op,
            span: tok.span.merge(inner.span()),
            expr: Box::new(inner),
        };
        Ok((expr, shape))
    }

    // ── Predicates ──────────────────────────────────────────────────────

    fn parse_predicate(&mut self, lhs: Expr) -> ParseResult<Expr> {
        let not = self.eat(TokenKind::Not).is_some();
        let tok = self.advance();
        let expr = Box::new(lhs);
        match tok.kind {
            TokenKind::In => {
                self.expect(TokenKind::LeftParen, "'('")?;
                let mut list = vec![self.parse_value_expr()?];
                while self.eat(TokenKind::Comma).is_some() {
                    list.push(self.parse_value_expr()?);
                }
                self.expect(TokenKind::RightParen, "')'")?;
                Ok(Expr::In {
                    span: self.span_from(expr.span()),
                    expr,
                    list,
                    not,
                })
            }
            TokenKind::Like | TokenKind::Rlike => {
                let op = if tok.kind == TokenKind::Like {
                    LikeOp::Like
                } else {
                    LikeOp::Rlike
                };
                let pattern = self.parse_string_literal("a pattern string")?;
                Ok(Expr::Like {
                    span: expr.span().merge(pattern.span()),
                    expr,
                    pattern: Box::new(pattern),
                    op,
                    not,
                })
            }
            TokenKind::Is => {
                let not = self.eat(TokenKind::Not).is_some();
                let null = self.expect(TokenKind::Null, "NULL")?;
                Ok(Expr::IsNull {
                    span: expr.span().merge(null.span),
                    expr,
                    not,
                })
            }
            TokenKind::DevMatch => {
                let query = self.parse_string_literal("a query string")?;
                Ok(Expr::Match {
                    span: expr.span().merge(query.span()),
                    expr,
                    query: Box::new(query),
                })
            }
            _ => Err(self.structural(
                format!("unexpected '{}' after an expression", tok.text),
                tok.span,
            )),
        }
    }

    fn parse_expr_list(&mut self) -> ParseResult<Vec<Expr>> {
        let mut items = vec![self.parse_expr()?];
        while self.eat(TokenKind::Comma).is_some() {
            items.push(self.parse_expr()?);
        }
        Ok(items)
    }

    // ── Primaries ───────────────────────────────────────────────────────

    /// A primary expression followed by any number of `::type` casts.
    pub(crate) fn parse_primary(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary_atom()?;
        while self.eat(TokenKind::CastOp).is_some() {
            let data_type = self.parse_identifier("a data type")?;
            expr = Expr::Cast {
                span: expr.span().merge(data_type.span),
                expr: Box::new(expr),
                data_type,
            };
        }
        Ok(expr)
    }

    fn parse_primary_atom(&mut self) -> ParseResult<Expr> {
        let tok = self.current();
        match tok.kind {
            TokenKind::IntegerLiteral => {
                self.advance();
                self.integer_literal(tok)
            }
            TokenKind::DecimalLiteral => {
                self.advance();
                Ok(decimal_literal(tok))
            }
            TokenKind::QuotedString => {
                self.advance();
                Ok(string_literal(tok))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal {
                    literal: Literal::Null,
                    span: tok.span,
                })
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                Ok(Expr::Literal {
                    literal: Literal::Boolean {
                        value: tok.kind == TokenKind::True,
                    },
                    span: tok.span,
                })
            }
            TokenKind::UnquotedIdentifier
            | TokenKind::QuotedIdentifier
            | TokenKind::Param
            | TokenKind::NamedOrPositionalParam => self.parse_name_expr(),
            TokenKind::LeftParen => {
                self.advance();
                let first = self.parse_expr()?;
                if !self.check(TokenKind::Comma) {
                    self.expect(TokenKind::RightParen, "')'")?;
                    return Ok(first);
                }
                let mut items = vec![first];
                while self.eat(TokenKind::Comma).is_some() {
                    items.push(self.parse_expr()?);
                }
                self.expect(TokenKind::RightParen, "')'")?;
                Ok(Expr::List {
                    items,
                    delimiter: ListDelimiter::Paren,
                    span: self.span_from(tok.span),
                })
            }
            TokenKind::OpeningBracket => {
                self.advance();
                let items = if self.check(TokenKind::ClosingBracket) {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                self.expect(TokenKind::ClosingBracket, "']'")?;
                Ok(Expr::List {
                    items,
                    delimiter: ListDelimiter::Bracket,
                    span: self.span_from(tok.span),
                })
            }
            _ => Err(self.err_expected("an expression")),
        }
    }

    /// `1`, `1 day`, or a decimal when the value does not fit in 64 bits.
    fn integer_literal(&mut self, tok: Token<'_>) -> ParseResult<Expr> {
        let raw = tok.text.to_owned();
        if self.check(TokenKind::UnquotedIdentifier) {
            let unit = self.advance();
            let value = tok.text.parse::<u64>().map_err(|_| {
                self.structural(format!("number [{}] is out of range", tok.text), tok.span)
            })?;
            return Ok(Expr::Literal {
                literal: Literal::QualifiedInteger {
                    raw,
                    value,
                    unit: unit.text.to_owned(),
                },
                span: tok.span.merge(unit.span),
            });
        }
        let literal = match tok.text.parse::<u64>() {
            Ok(value) => Literal::Integer { raw, value },
            Err(_) => Literal::Decimal {
                value: tok.text.parse::<f64>().unwrap_or(f64::INFINITY),
                raw,
            },
        };
        Ok(Expr::Literal {
            literal,
            span: tok.span,
        })
    }

    /// A field reference, a parameter or a function call.
    fn parse_name_expr(&mut self) -> ParseResult<Expr> {
        let name = self.parse_qualified_name()?;
        if self.check(TokenKind::LeftParen) && name.parts.len() == 1 {
            let start = name.span;
            let Some(function) = name.parts.into_iter().next() else {
                return Err(self.err_expected("a function name"));
            };
            return self.parse_function_call(function, start);
        }
        if let [NamePart::Parameter { param, span }] = name.parts.as_slice() {
            return Ok(Expr::Parameter {
                param: param.clone(),
                span: *span,
            });
        }
        Ok(Expr::Field {
            span: name.span,
            name,
        })
    }

    /// `name(*)`, `name()` or `name(arg, ...)`.
    fn parse_function_call(&mut self, name: NamePart, start: Span) -> ParseResult<Expr> {
        self.advance();
        let args = if self.check(TokenKind::RightParen) {
            Vec::new()
        } else if let Some(star) = self.eat(TokenKind::Asterisk) {
            vec![Expr::Literal {
                literal: Literal::Star,
                span: star.span,
            }]
        } else {
            self.parse_expr_list()?
        };
        self.expect(TokenKind::RightParen, "')'")?;
        Ok(Expr::FunctionCall {
            name,
            args,
            span: self.span_from(start),
        })
    }

    // ── Constants ───────────────────────────────────────────────────────

    pub(crate) fn parse_string_literal(&mut self, what: &str) -> ParseResult<Expr> {
        let tok = self.expect(TokenKind::QuotedString, what)?;
        Ok(string_literal(tok))
    }

    /// A literal, a signed number, a parameter or a `[...]` list.
    pub(crate) fn parse_constant(&mut self) -> ParseResult<Expr> {
        match self.peek() {
            TokenKind::Minus | TokenKind::Plus
                if matches!(
                    self.peek_nth(1),
                    TokenKind::IntegerLiteral | TokenKind::DecimalLiteral
                ) =>
            {
                self.parse_prefix(bp::UNARY).map(|(expr, _)| expr)
            }
            TokenKind::Null
            | TokenKind::True
            | TokenKind::False
            | TokenKind::IntegerLiteral
            | TokenKind::DecimalLiteral
            | TokenKind::QuotedString
            | TokenKind::Param
            | TokenKind::NamedOrPositionalParam
            | TokenKind::OpeningBracket => self.parse_primary(),
            _ => Err(self.err_expected("a constant")),
        }
    }

    // ── Names ───────────────────────────────────────────────────────────

    pub(crate) fn parse_identifier(&mut self, what: &str) -> ParseResult<Identifier> {
        let tok = self.current();
        match tok.kind {
            TokenKind::UnquotedIdentifier => {
                self.advance();
                Ok(Identifier::new(tok.text, false, tok.span))
            }
            TokenKind::QuotedIdentifier => {
                self.advance();
                Ok(Identifier::new(unquote_backquoted(tok.text), true, tok.span))
            }
            _ => Err(self.err_expected(what)),
        }
    }

    /// `part (. part)*` where each part is an identifier or a parameter.
    pub(crate) fn parse_qualified_name(&mut self) -> ParseResult<QualifiedName> {
        let first = self.parse_name_part()?;
        let start = first.span();
        let mut parts = vec![first];
        while self.eat(TokenKind::Dot).is_some() {
            parts.push(self.parse_name_part()?);
        }
        Ok(QualifiedName {
            parts,
            span: self.span_from(start),
        })
    }

    fn parse_name_part(&mut self) -> ParseResult<NamePart> {
        let tok = self.current();
        match tok.kind {
            TokenKind::Param | TokenKind::NamedOrPositionalParam => {
                self.advance();
                Ok(NamePart::Parameter {
                    param: self.parameter(tok)?,
                    span: tok.span,
                })
            }
            _ => self
                .parse_identifier("a field name")
                .map(NamePart::Identifier),
        }
    }

    /// `pattern (. pattern)*` as written in KEEP, DROP, RENAME and ENRICH.
    pub(crate) fn parse_qualified_name_pattern(&mut self) -> ParseResult<QualifiedNamePattern> {
        let first = self.parse_pattern_part()?;
        let start = first.span();
        let mut parts = vec![first];
        while self.eat(TokenKind::Dot).is_some() {
            parts.push(self.parse_pattern_part()?);
        }
        Ok(QualifiedNamePattern {
            parts,
            span: self.span_from(start),
        })
    }

    fn parse_pattern_part(&mut self) -> ParseResult<PatternPart> {
        let tok = self.current();
        match tok.kind {
            TokenKind::IdPattern => {
                self.advance();
                Ok(PatternPart::Pattern(IdPattern {
                    pattern: unquote_backquoted(tok.text),
                    raw: tok.text.to_owned(),
                    span: tok.span,
                }))
            }
            TokenKind::Param | TokenKind::NamedOrPositionalParam => {
                self.advance();
                Ok(PatternPart::Parameter {
                    param: self.parameter(tok)?,
                    span: tok.span,
                })
            }
            _ => Err(self.err_expected("a field name pattern")),
        }
    }

    fn parameter(&self, tok: Token<'_>) -> ParseResult<Parameter> {
        if tok.kind == TokenKind::Param {
            return Ok(Parameter::Anonymous);
        }
        let body = tok.text.strip_prefix('?').unwrap_or(tok.text);
        if body.bytes().all(|b| b.is_ascii_digit()) {
            body.parse::<u32>().map(Parameter::Positional).map_err(|_| {
                self.structural(
                    format!("parameter index [{body}] is out of range"),
                    tok.span,
                )
            })
        } else {
            Ok(Parameter::Named(body.to_owned()))
        }
    }
}

fn decimal_literal(tok: Token<'_>) -> Expr {
    Expr::Literal {
        literal: Literal::Decimal {
            raw: tok.text.to_owned(),
            value: tok.text.parse::<f64>().unwrap_or(f64::NAN),
        },
        span: tok.span,
    }
}

fn string_literal(tok: Token<'_>) -> Expr {
    Expr::Literal {
        literal: Literal::String {
            raw: tok.text.to_owned(),
            value: unescape_string(tok.text),
        },
        span: tok.span,
    }
}

/// Decode a string token: strip the quotes and resolve `\t \n \r \" \\`.
/// Triple-quoted strings are taken verbatim.
pub(crate) fn unescape_string(raw: &str) -> String {
    if let Some(inner) = raw.strip_prefix("\"\"\"") {
        return inner.strip_suffix("\"\"\"").unwrap_or(inner).to_owned();
    }
    let inner = raw.strip_prefix('"').unwrap_or(raw);
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Remove backquotes, collapsing doubled ones inside quoted runs. Works for
/// plain quoted identifiers and for patterns that glue quoted parts together.
pub(crate) fn unquote_backquoted(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut quoted = false;
    while let Some(c) = chars.next() {
        if c != '`' {
            out.push(c);
        } else if quoted && chars.peek() == Some(&'`') {
            chars.next();
            out.push('`');
        } else {
            quoted = !quoted;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseOptions;
    use esql_ast::Command;
    use esql_error::DiagnosticKind;

    fn parse_with(src: &str, options: &ParseOptions) -> Result<Expr, Vec<DiagnosticKind>> {
        let text = format!("ROW {src}");
        let out = Parser::new(&text, options).parse();
        if !out.diagnostics.is_empty() {
            return Err(out.diagnostics.iter().map(|d| d.kind).collect());
        }
        match out.query.commands.into_iter().next() {
            Some(Command::Row(mut row)) => Ok(row.fields.remove(0).value),
            other => unreachable!("expected ROW, got {other:?}"),
        }
    }

    fn parse(src: &str) -> Expr {
        match parse_with(src, &ParseOptions::default()) {
            Ok(expr) => expr,
            Err(kinds) => unreachable!("parse error for `{src}`: {kinds:?}"),
        }
    }

    // ── Precedence ──────────────────────────────────────────────────────

    #[test]
    fn test_arithmetic_precedence() {
        // 1 + 2 * 3 → 1 + (2 * 3)
        let expr = parse("1 + 2 * 3");
        match &expr {
            Expr::BinaryOp {
                op: BinaryOp::Add,
                left,
                right,
                ..
            } => {
                assert!(matches!(
                    left.as_ref(),
                    Expr::Literal {
                        literal: Literal::Integer { value: 1, .. },
                        ..
                    }
                ));
                assert!(matches!(
                    right.as_ref(),
                    Expr::BinaryOp {
                        op: BinaryOp::Multiply,
                        ..
                    }
                ));
            }
            other => unreachable!("expected Add(1, Mul(2,3)), got {other:?}"),
        }
    }

    #[test]
    fn test_subtraction_left_associative() {
        // a - b - c → (a - b) - c
        let expr = parse("a - b - c");
        match &expr {
            Expr::BinaryOp {
                op: BinaryOp::Subtract,
                left,
                ..
            } => assert!(matches!(
                left.as_ref(),
                Expr::BinaryOp {
                    op: BinaryOp::Subtract,
                    ..
                }
            )),
            other => unreachable!("expected Sub(Sub(a,b),c), got {other:?}"),
        }
    }

    #[test]
    fn test_and_higher_than_or() {
        // a OR b AND c → a OR (b AND c)
        let expr = parse("a OR b AND c");
        match &expr {
            Expr::BinaryOp {
                op: BinaryOp::Or,
                right,
                ..
            } => assert!(matches!(
                right.as_ref(),
                Expr::BinaryOp {
                    op: BinaryOp::And,
                    ..
                }
            )),
            other => unreachable!("expected Or(a, And(b,c)), got {other:?}"),
        }
    }

    #[test]
    fn test_not_lower_than_comparison() {
        // NOT a == b → NOT (a == b)
        let expr = parse("NOT a == b");
        match &expr {
            Expr::UnaryOp {
                op: UnaryOp::Not,
                expr: inner,
                ..
            } => assert!(matches!(
                inner.as_ref(),
                Expr::BinaryOp {
                    op: BinaryOp::Eq,
                    ..
                }
            )),
            other => unreachable!("expected NOT(Eq), got {other:?}"),
        }
    }

    #[test]
    fn test_not_binds_tighter_than_and() {
        // NOT a AND b → (NOT a) AND b
        let expr = parse("NOT a AND b");
        match &expr {
            Expr::BinaryOp {
                op: BinaryOp::And,
                left,
                ..
            } => assert!(matches!(
                left.as_ref(),
                Expr::UnaryOp {
                    op: UnaryOp::Not,
                    ..
                }
            )),
            other => unreachable!("expected And(Not(a), b), got {other:?}"),
        }
    }

    #[test]
    fn test_negation_wraps_cast() {
        // -x::long → -(x::long)
        let expr = parse("-x::long");
        match &expr {
            Expr::UnaryOp {
                op: UnaryOp::Negate,
                expr: inner,
                ..
            } => match inner.as_ref() {
                Expr::Cast { data_type, .. } => assert_eq!(data_type.name, "long"),
                other => unreachable!("expected Cast inside Negate, got {other:?}"),
            },
            other => unreachable!("expected Negate(Cast), got {other:?}"),
        }
    }

    #[test]
    fn test_unary_minus_is_not_folded() {
        let expr = parse("-1");
        assert!(matches!(
            expr,
            Expr::UnaryOp {
                op: UnaryOp::Negate,
                ..
            }
        ));
    }

    #[test]
    fn test_comparison_operators() {
        for (src, expected) in [
            ("a == 1", BinaryOp::Eq),
            ("a =~ \"x\"", BinaryOp::InsensitiveEq),
            ("a != 1", BinaryOp::Ne),
            ("a < 1", BinaryOp::Lt),
            ("a <= 1", BinaryOp::Le),
            ("a > 1", BinaryOp::Gt),
            ("a >= 1", BinaryOp::Ge),
            ("a % 2", BinaryOp::Modulo),
        ] {
            match parse(src) {
                Expr::BinaryOp { op, .. } => assert_eq!(op, expected, "for `{src}`"),
                other => unreachable!("expected BinaryOp for `{src}`, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_comparisons_do_not_chain() {
        for src in ["a == b == c", "a < b > c", "1 != 2 =~ \"x\""] {
            assert_eq!(
                parse_with(src, &ParseOptions::default()),
                Err(vec![DiagnosticKind::Syntax]),
                "for `{src}`"
            );
        }
        // Parentheses make the inner comparison a value again.
        match parse("(a == b) == c") {
            Expr::BinaryOp { op: BinaryOp::Eq, left, .. } => {
                assert!(matches!(*left, Expr::BinaryOp { op: BinaryOp::Eq, .. }));
            }
            other => unreachable!("expected Eq(Eq, c), got {other:?}"),
        }
    }

    #[test]
    fn test_conditions_are_not_value_operands() {
        for src in [
            "a IN (1) == true",
            "a IS NULL + 1",
            "a LIKE \"x\" < 2",
            "a IS NULL IS NULL",
            "a IN (1) NOT IN (2)",
            "a == NOT b",
            "1 + NOT b",
            "-NOT b",
            "a IN (b IN (1))",
            "a IN (NOT b)",
        ] {
            assert!(
                parse_with(src, &ParseOptions::default()).is_err(),
                "`{src}` should be rejected"
            );
        }
        let err = Parser::new("ROW a IN (1) == true", &ParseOptions::default())
            .parse()
            .diagnostics;
        assert_eq!(err.len(), 1);
        assert!(err[0].message.contains("'=='"), "{}", err[0].message);
    }

    #[test]
    fn test_conditions_combine_with_and_or() {
        assert!(matches!(parse("(a IN (1)) == true"), Expr::BinaryOp { op: BinaryOp::Eq, .. }));
        assert!(matches!(
            parse("a IS NULL OR b LIKE \"x\" AND NOT c"),
            Expr::BinaryOp { op: BinaryOp::Or, .. }
        ));
        // a == b IN (1, 2) → (a == b) IN (1, 2)
        match parse("a == b IN (1, 2)") {
            Expr::In { expr, list, .. } => {
                assert!(matches!(*expr, Expr::BinaryOp { op: BinaryOp::Eq, .. }));
                assert_eq!(list.len(), 2);
            }
            other => unreachable!("expected In(Eq), got {other:?}"),
        }
        assert!(matches!(parse("a IN (b == 1, c + 1)"), Expr::In { .. }));
        assert!(matches!(parse("NOT NOT a"), Expr::UnaryOp { op: UnaryOp::Not, .. }));
    }

    // ── Predicates ──────────────────────────────────────────────────────

    #[test]
    fn test_not_in_list() {
        let expr = parse("a NOT IN (1, 2, 3)");
        match &expr {
            Expr::In { list, not, span, .. } => {
                assert!(*not);
                assert_eq!(list.len(), 3);
                assert_eq!(*span, Span::new(4, 22));
            }
            other => unreachable!("expected In, got {other:?}"),
        }
    }

    #[test]
    fn test_not_prefix_wraps_in() {
        // NOT a IN (1) → NOT (a IN (1))
        let expr = parse("NOT a IN (1)");
        match &expr {
            Expr::UnaryOp {
                op: UnaryOp::Not,
                expr: inner,
                ..
            } => assert!(matches!(inner.as_ref(), Expr::In { not: false, .. })),
            other => unreachable!("expected Not(In), got {other:?}"),
        }
    }

    #[test]
    fn test_like_and_rlike() {
        match parse("msg NOT LIKE \"err*\"") {
            Expr::Like { op, not, pattern, .. } => {
                assert_eq!(op, LikeOp::Like);
                assert!(not);
                assert_eq!(pattern.as_literal().and_then(Literal::as_str), Some("err*"));
            }
            other => unreachable!("expected Like, got {other:?}"),
        }
        assert!(matches!(
            parse("msg RLIKE \"e.*\""),
            Expr::Like {
                op: LikeOp::Rlike,
                not: false,
                ..
            }
        ));
    }

    #[test]
    fn test_like_requires_string_pattern() {
        let err = parse_with("a LIKE b", &ParseOptions::default()).unwrap_err();
        assert_eq!(err, vec![DiagnosticKind::Syntax]);
    }

    #[test]
    fn test_is_null() {
        assert!(matches!(parse("a IS NULL"), Expr::IsNull { not: false, .. }));
        assert!(matches!(parse("a IS NOT NULL"), Expr::IsNull { not: true, .. }));
        // a + 1 IS NULL → (a + 1) IS NULL
        match parse("a + 1 IS NULL") {
            Expr::IsNull { expr, .. } => assert!(matches!(*expr, Expr::BinaryOp { .. })),
            other => unreachable!("expected IsNull, got {other:?}"),
        }
    }

    #[test]
    fn test_match_operator_is_dev_gated() {
        let dev = ParseOptions::default().with_dev_features(true);
        assert!(matches!(
            parse_with("title MATCH \"quick\"", &dev),
            Ok(Expr::Match { .. })
        ));
        assert!(parse_with("title MATCH \"quick\"", &ParseOptions::default()).is_err());
    }

    // ── Primaries ───────────────────────────────────────────────────────

    #[test]
    fn test_function_calls() {
        match parse("count(*)") {
            Expr::FunctionCall { name, args, .. } => {
                assert_eq!(name.name(), Some("count"));
                assert!(matches!(
                    args.as_slice(),
                    [Expr::Literal {
                        literal: Literal::Star,
                        ..
                    }]
                ));
            }
            other => unreachable!("expected FunctionCall, got {other:?}"),
        }
        match parse("now()") {
            Expr::FunctionCall { args, span, .. } => {
                assert!(args.is_empty());
                assert_eq!(span, Span::new(4, 9));
            }
            other => unreachable!("expected FunctionCall, got {other:?}"),
        }
        match parse("coalesce(a, b.c, 1)") {
            Expr::FunctionCall { args, .. } => assert_eq!(args.len(), 3),
            other => unreachable!("expected FunctionCall, got {other:?}"),
        }
    }

    #[test]
    fn test_function_name_parameter() {
        match parse("?fn(x)") {
            Expr::FunctionCall { name, .. } => assert!(matches!(
                name,
                NamePart::Parameter {
                    param: Parameter::Named(ref n),
                    ..
                } if n == "fn"
            )),
            other => unreachable!("expected FunctionCall, got {other:?}"),
        }
    }

    #[test]
    fn test_parameters() {
        assert!(matches!(
            parse("?"),
            Expr::Parameter {
                param: Parameter::Anonymous,
                ..
            }
        ));
        assert!(matches!(
            parse("?2"),
            Expr::Parameter {
                param: Parameter::Positional(2),
                ..
            }
        ));
        match parse("?start") {
            Expr::Parameter {
                param: Parameter::Named(name),
                ..
            } => assert_eq!(name, "start"),
            other => unreachable!("expected named parameter, got {other:?}"),
        }
    }

    #[test]
    fn test_qualified_field_names() {
        match parse("host.`first name`.x") {
            Expr::Field { name, span } => {
                assert_eq!(name.path(), vec!["host", "first name", "x"]);
                assert_eq!(span, Span::new(4, 23));
            }
            other => unreachable!("expected Field, got {other:?}"),
        }
        match parse("`a``b`") {
            Expr::Field { name, .. } => assert_eq!(name.path(), vec!["a`b"]),
            other => unreachable!("expected Field, got {other:?}"),
        }
    }

    #[test]
    fn test_lists() {
        match parse("[1, 2, 3]") {
            Expr::List {
                items, delimiter, ..
            } => {
                assert_eq!(items.len(), 3);
                assert_eq!(delimiter, ListDelimiter::Bracket);
            }
            other => unreachable!("expected List, got {other:?}"),
        }
        match parse("(a, b)") {
            Expr::List { delimiter, .. } => assert_eq!(delimiter, ListDelimiter::Paren),
            other => unreachable!("expected List, got {other:?}"),
        }
        assert!(matches!(parse("(a)"), Expr::Field { .. }));
        assert!(matches!(parse("[]"), Expr::List { ref items, .. } if items.is_empty()));
    }

    #[test]
    fn test_numeric_literals() {
        match parse("1 day") {
            Expr::Literal {
                literal: Literal::QualifiedInteger { value, unit, .. },
                span,
            } => {
                assert_eq!(value, 1);
                assert_eq!(unit, "day");
                assert_eq!(span, Span::new(4, 9));
            }
            other => unreachable!("expected QualifiedInteger, got {other:?}"),
        }
        match parse("18446744073709551616") {
            Expr::Literal {
                literal: Literal::Decimal { raw, value },
                ..
            } => {
                assert_eq!(raw, "18446744073709551616");
                assert!(value > 1.8e19);
            }
            other => unreachable!("expected Decimal on overflow, got {other:?}"),
        }
        match parse("1.5e3") {
            Expr::Literal {
                literal: Literal::Decimal { value, .. },
                ..
            } => assert!((value - 1500.0).abs() < f64::EPSILON),
            other => unreachable!("expected Decimal, got {other:?}"),
        }
    }

    #[test]
    fn test_boolean_and_null() {
        assert!(matches!(
            parse("TRUE"),
            Expr::Literal {
                literal: Literal::Boolean { value: true },
                ..
            }
        ));
        assert!(matches!(
            parse("null"),
            Expr::Literal {
                literal: Literal::Null,
                ..
            }
        ));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(unescape_string(r#""a\tb\"c\\""#), "a\tb\"c\\");
        assert_eq!(unescape_string(r#""""a"b""""#), "a\"b");
        assert_eq!(unescape_string(r#""""x""""""#), "x\"\"");
        assert_eq!(unescape_string("\"\""), "");
        match parse(r#""line\nbreak""#) {
            Expr::Literal {
                literal: Literal::String { raw, value },
                ..
            } => {
                assert_eq!(raw, r#""line\nbreak""#);
                assert_eq!(value, "line\nbreak");
            }
            other => unreachable!("expected String, got {other:?}"),
        }
    }

    #[test]
    fn test_unquote_backquoted() {
        assert_eq!(unquote_backquoted("`a``b`"), "a`b");
        assert_eq!(unquote_backquoted("foo`.bar`*"), "foo.bar*");
        assert_eq!(unquote_backquoted("plain*"), "plain*");
    }

    #[test]
    fn test_chained_casts() {
        match parse("x::long::double") {
            Expr::Cast { expr, data_type, .. } => {
                assert_eq!(data_type.name, "double");
                assert!(matches!(*expr, Expr::Cast { .. }));
            }
            other => unreachable!("expected Cast(Cast), got {other:?}"),
        }
    }

    // ── Depth limit ─────────────────────────────────────────────────────

    #[test]
    fn test_nesting_limit() {
        let options = ParseOptions::default().with_max_depth(32);
        let deep = format!("{}1{}", "(".repeat(40), ")".repeat(40));
        assert_eq!(
            parse_with(&deep, &options).unwrap_err(),
            vec![DiagnosticKind::Structural]
        );
        let shallow = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        assert!(parse_with(&shallow, &options).is_ok());
        let negations = format!("{}x", "- ".repeat(40));
        assert!(parse_with(&negations, &options).is_err());
    }

    #[test]
    fn test_missing_operand() {
        let err = parse_with("1 +", &ParseOptions::default()).unwrap_err();
        assert_eq!(err, vec![DiagnosticKind::Syntax]);
        let err = parse_with("f(a,", &ParseOptions::default()).unwrap_err();
        assert_eq!(err, vec![DiagnosticKind::Syntax]);
    }
}

// ES|QL lexer and parser
//
// Mode-driven lexer, token filter and hand-written recursive descent parser
// with Pratt precedence-climbing for expressions. Produces an AST from
// `esql-ast` and diagnostics from `esql-error`.

pub mod config;
mod expr;
pub mod filter;
pub mod lexer;
pub mod mode;
pub mod parser;
pub mod stream;
pub mod token;

use esql_ast::Query;
use esql_error::{EsqlError, Result};

pub use config::ParseOptions;
pub use filter::TokenFilter;
pub use lexer::{Lexer, LexerOptions};
pub use mode::{Mode, ModeStack};
pub use parser::{ParseOutput, Parser};
pub use stream::CharStream;
pub use token::{Channel, Token, TokenKind};

/// Parse `text`, always returning a query (possibly partial) together with
/// every diagnostic found.
#[must_use]
pub fn parse<'a>(text: &'a str, options: &ParseOptions) -> ParseOutput<'a> {
    Parser::new(text, options).parse()
}

/// Parse `text` into a query, failing on oversize input or on any
/// error-severity diagnostic.
pub fn try_parse(text: &str, options: &ParseOptions) -> Result<Query> {
    if text.len() > options.max_input_bytes {
        return Err(EsqlError::InputTooLong {
            length: text.len(),
            max: options.max_input_bytes,
        });
    }
    parse(text, options).into_result()
}

/// The full token stream for `text`, hidden tokens included.
#[must_use]
pub fn tokenize<'a>(text: &'a str, options: &ParseOptions) -> Vec<Token<'a>> {
    Lexer::tokenize(text, options.lexer_options())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_parse_rejects_oversize_input() {
        let options = ParseOptions {
            max_input_bytes: 8,
            ..ParseOptions::default()
        };
        let err = try_parse("FROM logs | LIMIT 1", &options).unwrap_err();
        assert!(matches!(
            err,
            EsqlError::InputTooLong {
                length: 19,
                max: 8
            }
        ));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_try_parse_ok_and_invalid() {
        let query = try_parse("ROW a = 1", &ParseOptions::default()).unwrap();
        assert_eq!(query.commands.len(), 1);
        let err = try_parse("ROW a =", &ParseOptions::default()).unwrap_err();
        assert_eq!(err.diagnostics().len(), 1);
    }

    #[test]
    fn test_tokenize_keeps_hidden_tokens() {
        let tokens = tokenize("FROM a // note", &ParseOptions::default());
        assert!(tokens.iter().any(|t| t.kind == TokenKind::LineComment));
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn test_parse_output_carries_final_modes() {
        let out = parse("FROM a | ENRICH [ccq.mode:any", &ParseOptions::default());
        assert_eq!(
            out.final_modes,
            vec![Mode::Default, Mode::Enrich, Mode::Setting]
        );
        assert!(!out.is_ok());
    }
}

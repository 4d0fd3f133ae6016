use log::trace;
use miette::{Diagnostic, Error, NamedSource, SourceSpan};
use thiserror::Error;

use crate::{
    ast::{
        CharacterLiteral, DefVar, Expression, ExpressionStatement, FloatLiteral, FunctionCall,
        Identifier, IntegerLiteral, ListLiteral, Program, StringLiteral, VectorLiteral,
    },
    lex::{Eof, Lexer, Token, TokenKind},
};

#[derive(Error, Debug, Diagnostic)]
#[error("expected {expected}, found {}", .found.describe())]
#[diagnostic(code(parse::unexpected_token))]
pub struct UnexpectedTokenError {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    bad_bit: SourceSpan,

    pub expected: &'static str,
    pub found: TokenKind,
}

#[derive(Error, Debug, Diagnostic)]
#[error("invalid numeric literal '{literal}': {reason}")]
#[diagnostic(code(parse::number_literal), help("integers must fit in 64 bits"))]
pub struct NumberLiteralError {
    #[source_code]
    src: NamedSource<String>,

    #[label("this numeric literal")]
    bad_bit: SourceSpan,

    pub literal: String,
    pub reason: String,
}

type SpecialForm<'de> = fn(&mut Parser<'de>, Token<'de>) -> Result<Expression<'de>, Error>;

pub struct Parser<'de> {
    lexer: Lexer<'de>,
    current: Token<'de>,
    consumed: Vec<Token<'de>>,
}

impl<'de> Parser<'de> {
    pub fn new(filename: Option<&'de str>, whole: &'de str) -> Self {
        let mut lexer = Lexer::new(filename, whole);
        let current = lexer.next_token();
        Parser {
            lexer,
            current,
            consumed: Vec::new(),
        }
    }

    /// Tokens consumed so far, oldest first.
    pub fn consumed(&self) -> &[Token<'de>] {
        &self.consumed
    }

    pub fn parse(mut self) -> Result<Program<'de>, Error> {
        let mut statements = Vec::new();
        while self.current.kind != TokenKind::Eof {
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    fn next(&mut self) -> Token<'de> {
        let next = self.lexer.next_token();
        let token = std::mem::replace(&mut self.current, next);
        trace!("consumed {token}");
        self.consumed.push(token);
        token
    }

    fn special_form(name: &str) -> Option<SpecialForm<'de>> {
        match name {
            "defvar" => Some(Self::parse_defvar),
            _ => None,
        }
    }

    /// Error for the current token when it does not fit the grammar.
    fn unexpected(&self, expected: &'static str) -> Error {
        if let Some(error) = self.lexer.illegal(&self.current) {
            return error;
        }
        match self.current.kind {
            TokenKind::Eof => Eof::build(&self.lexer).into(),
            found => UnexpectedTokenError {
                src: self.lexer.named_source(),
                bad_bit: self.current.span(),
                expected,
                found,
            }
            .into(),
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token<'de>, Error> {
        if self.current.kind == expected {
            Ok(self.next())
        } else {
            Err(self.unexpected(expected.describe()))
        }
    }

    fn parse_statement(&mut self) -> Result<ExpressionStatement<'de>, Error> {
        Ok(ExpressionStatement {
            expression: self.parse_expression()?,
        })
    }

    pub fn parse_expression(&mut self) -> Result<Expression<'de>, Error> {
        match self.current.kind {
            TokenKind::LeftParen => self.parse_call(),
            TokenKind::Quote => self.parse_list(),
            TokenKind::LeftBracket => self.parse_vector(),
            TokenKind::Ident => self.parse_identifier().map(Expression::Identifier),
            TokenKind::Integer => self.parse_integer(),
            TokenKind::Float => self.parse_float(),
            TokenKind::String => self.parse_string().map(Expression::String),
            TokenKind::Character => self.parse_character(),
            TokenKind::RightParen
            | TokenKind::RightBracket
            | TokenKind::Colon
            | TokenKind::Illegal(_)
            | TokenKind::Eof => Err(self.unexpected("an expression")),
        }
    }

    fn parse_call(&mut self) -> Result<Expression<'de>, Error> {
        let open = self.expect(TokenKind::LeftParen)?;
        let callee = self.parse_identifier()?;
        if let Some(special) = Self::special_form(callee.name) {
            return special(self, callee.token);
        }

        let arguments = self.parse_expression_list(TokenKind::RightParen)?;
        self.expect(TokenKind::RightParen)?;

        Ok(Expression::FunctionCall(FunctionCall {
            token: open,
            callee,
            arguments,
        }))
    }

    fn parse_defvar(&mut self, token: Token<'de>) -> Result<Expression<'de>, Error> {
        let name = self.parse_identifier()?;
        let value = self.parse_expression()?;
        let documentation = match self.current.kind {
            TokenKind::String => Some(self.parse_string()?),
            _ => None,
        };
        self.expect(TokenKind::RightParen)?;

        Ok(Expression::DefVar(DefVar {
            token,
            name,
            value: Box::new(value),
            documentation,
        }))
    }

    fn parse_list(&mut self) -> Result<Expression<'de>, Error> {
        let token = self.expect(TokenKind::Quote)?;
        self.expect(TokenKind::LeftParen)?;
        let elements = self.parse_expression_list(TokenKind::RightParen)?;
        self.expect(TokenKind::RightParen)?;

        Ok(Expression::List(ListLiteral { token, elements }))
    }

    fn parse_vector(&mut self) -> Result<Expression<'de>, Error> {
        let token = self.expect(TokenKind::LeftBracket)?;
        let elements = self.parse_expression_list(TokenKind::RightBracket)?;
        self.expect(TokenKind::RightBracket)?;

        Ok(Expression::Vector(VectorLiteral { token, elements }))
    }

    /// Parses expressions up to, but not including, `terminator`.
    fn parse_expression_list(
        &mut self,
        terminator: TokenKind,
    ) -> Result<Vec<Expression<'de>>, Error> {
        let mut expressions = Vec::new();
        while self.current.kind != terminator {
            expressions.push(self.parse_expression()?);
        }
        Ok(expressions)
    }

    fn parse_identifier(&mut self) -> Result<Identifier<'de>, Error> {
        let token = self.expect(TokenKind::Ident)?;
        Ok(Identifier {
            token,
            name: token.literal,
        })
    }

    fn parse_string(&mut self) -> Result<StringLiteral<'de>, Error> {
        let token = self.expect(TokenKind::String)?;
        Ok(StringLiteral {
            token,
            value: token.literal,
        })
    }

    fn number_error(&self, token: &Token<'de>, reason: impl ToString) -> Error {
        NumberLiteralError {
            src: self.lexer.named_source(),
            bad_bit: token.span(),
            literal: token.literal.to_string(),
            reason: reason.to_string(),
        }
        .into()
    }

    fn parse_integer(&mut self) -> Result<Expression<'de>, Error> {
        let token = self.expect(TokenKind::Integer)?;
        let value = token
            .literal
            .parse::<i64>()
            .map_err(|e| self.number_error(&token, e))?;
        Ok(Expression::Integer(IntegerLiteral { token, value }))
    }

    fn parse_float(&mut self) -> Result<Expression<'de>, Error> {
        let token = self.expect(TokenKind::Float)?;
        let value = token
            .literal
            .parse::<f64>()
            .map_err(|e| self.number_error(&token, e))?;
        Ok(Expression::Float(FloatLiteral { token, value }))
    }

    fn parse_character(&mut self) -> Result<Expression<'de>, Error> {
        let token = self.expect(TokenKind::Character)?;
        let Some(value) = token.literal.chars().next() else {
            return Err(self.unexpected("a character"));
        };
        Ok(Expression::Character(CharacterLiteral { token, value }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::{MalformedNumberError, SingleTokenError, StringTerminationError};

    fn tok(kind: TokenKind, offset: usize, literal: &str) -> Token<'_> {
        Token {
            kind,
            literal,
            offset,
            byte: offset,
        }
    }

    fn ident(offset: usize, name: &str) -> Identifier<'_> {
        Identifier {
            token: tok(TokenKind::Ident, offset, name),
            name,
        }
    }

    fn int(offset: usize, literal: &str, value: i64) -> Expression<'_> {
        Expression::Integer(IntegerLiteral {
            token: tok(TokenKind::Integer, offset, literal),
            value,
        })
    }

    fn string(offset: usize, value: &str) -> StringLiteral<'_> {
        StringLiteral {
            token: tok(TokenKind::String, offset, value),
            value,
        }
    }

    fn parse(input: &str) -> Vec<Expression<'_>> {
        Parser::new(None, input)
            .parse()
            .unwrap_or_else(|e| panic!("{input:?} failed to parse: {e:?}"))
            .statements
            .into_iter()
            .map(|statement| statement.expression)
            .collect()
    }

    fn parse_err(input: &str) -> Error {
        match Parser::new(None, input).parse() {
            Ok(program) => panic!("{input:?} parsed to {program}"),
            Err(e) => e,
        }
    }

    #[test]
    fn defvar_without_documentation() {
        assert_eq!(
            parse("(defvar int-list '(1 2))"),
            vec![Expression::DefVar(DefVar {
                token: tok(TokenKind::Ident, 1, "defvar"),
                name: ident(8, "int-list"),
                value: Box::new(Expression::List(ListLiteral {
                    token: tok(TokenKind::Quote, 17, "'"),
                    elements: vec![int(19, "1", 1), int(21, "2", 2)],
                })),
                documentation: None,
            })]
        );
    }

    #[test]
    fn defvar_with_documentation() {
        assert_eq!(
            parse(r#"(defvar int-list '(1 2) "a list of ints")"#),
            vec![Expression::DefVar(DefVar {
                token: tok(TokenKind::Ident, 1, "defvar"),
                name: ident(8, "int-list"),
                value: Box::new(Expression::List(ListLiteral {
                    token: tok(TokenKind::Quote, 17, "'"),
                    elements: vec![int(19, "1", 1), int(21, "2", 2)],
                })),
                documentation: Some(string(24, "a list of ints")),
            })]
        );
    }

    #[test]
    fn vector_of_strings() {
        assert_eq!(
            parse(r#"["a" "b" "c"]"#),
            vec![Expression::Vector(VectorLiteral {
                token: tok(TokenKind::LeftBracket, 0, "["),
                elements: vec![
                    Expression::String(string(1, "a")),
                    Expression::String(string(5, "b")),
                    Expression::String(string(9, "c")),
                ],
            })]
        );
    }

    #[test]
    fn call_with_quoted_list_argument() {
        assert_eq!(
            parse(r#"(print '("a" "b" "c"))"#),
            vec![Expression::FunctionCall(FunctionCall {
                token: tok(TokenKind::LeftParen, 0, "("),
                callee: ident(1, "print"),
                arguments: vec![Expression::List(ListLiteral {
                    token: tok(TokenKind::Quote, 7, "'"),
                    elements: vec![
                        Expression::String(string(9, "a")),
                        Expression::String(string(13, "b")),
                        Expression::String(string(17, "c")),
                    ],
                })],
            })]
        );
    }

    #[test]
    fn append_call() {
        assert_eq!(
            parse("(append '(1 2) 3)"),
            vec![Expression::FunctionCall(FunctionCall {
                token: tok(TokenKind::LeftParen, 0, "("),
                callee: ident(1, "append"),
                arguments: vec![
                    Expression::List(ListLiteral {
                        token: tok(TokenKind::Quote, 8, "'"),
                        elements: vec![int(10, "1", 1), int(12, "2", 2)],
                    }),
                    int(15, "3", 3),
                ],
            })]
        );
    }

    #[test]
    fn nested_calls() {
        assert_eq!(
            parse("(* 2 (- 5 1))"),
            vec![Expression::FunctionCall(FunctionCall {
                token: tok(TokenKind::LeftParen, 0, "("),
                callee: ident(1, "*"),
                arguments: vec![
                    int(3, "2", 2),
                    Expression::FunctionCall(FunctionCall {
                        token: tok(TokenKind::LeftParen, 5, "("),
                        callee: ident(6, "-"),
                        arguments: vec![int(8, "5", 5), int(10, "1", 1)],
                    }),
                ],
            })]
        );
    }

    #[test]
    fn leaves_and_several_statements() {
        let parsed = parse("1 2.5 x 'c' \"s\"");
        let rendered: Vec<String> = parsed.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["1", "2.5", "x", "'c'", "\"s\""]);
        assert!(matches!(&parsed[1], Expression::Float(f) if f.value == 2.5));
        assert!(matches!(&parsed[3], Expression::Character(c) if c.value == 'c'));
    }

    #[test]
    fn empty_input_is_an_empty_program() {
        assert!(parse("").is_empty());
        assert!(parse("  \n\t ").is_empty());
    }

    #[test]
    fn consumed_tokens_are_kept() {
        let mut parser = Parser::new(None, "(+ 1 2)");
        parser.parse_expression().expect("expression");
        let literals: Vec<&str> = parser.consumed().iter().map(|t| t.literal).collect();
        assert_eq!(literals, vec!["(", "+", "1", "2", ")"]);
    }

    #[test]
    fn unterminated_list_is_unexpected_eof() {
        let error = parse_err("(+ 1 2");
        assert!(error.downcast_ref::<Eof>().is_some(), "{error:?}");

        let error = parse_err("'(1 2");
        assert!(error.downcast_ref::<Eof>().is_some(), "{error:?}");
    }

    #[test]
    fn mismatched_closer() {
        let error = parse_err("[1 2)");
        let unexpected = error
            .downcast_ref::<UnexpectedTokenError>()
            .expect("unexpected token");
        assert_eq!(unexpected.found, TokenKind::RightParen);
        assert_eq!(unexpected.expected, "an expression");
    }

    #[test]
    fn quote_must_open_a_list() {
        let error = parse_err("'[1]");
        let unexpected = error
            .downcast_ref::<UnexpectedTokenError>()
            .expect("unexpected token");
        assert_eq!(unexpected.expected, "`(`");
        assert_eq!(unexpected.found, TokenKind::LeftBracket);
    }

    #[test]
    fn callee_must_be_an_identifier() {
        let error = parse_err("(1 2)");
        let unexpected = error
            .downcast_ref::<UnexpectedTokenError>()
            .expect("unexpected token");
        assert_eq!(unexpected.expected, "identifier");
        assert_eq!(unexpected.found, TokenKind::Integer);
    }

    #[test]
    fn defvar_requires_closing_paren() {
        let error = parse_err(r#"(defvar x 1 "doc" 2)"#);
        let unexpected = error
            .downcast_ref::<UnexpectedTokenError>()
            .expect("unexpected token");
        assert_eq!(unexpected.expected, "`)`");
        assert_eq!(unexpected.found, TokenKind::Integer);
    }

    #[test]
    fn defvar_name_must_be_an_identifier() {
        let error = parse_err("(defvar 1 2)");
        assert!(error.downcast_ref::<UnexpectedTokenError>().is_some());
    }

    #[test]
    fn colon_has_no_production() {
        let error = parse_err(":");
        let unexpected = error
            .downcast_ref::<UnexpectedTokenError>()
            .expect("unexpected token");
        assert_eq!(unexpected.found, TokenKind::Colon);
    }

    #[test]
    fn illegal_tokens_surface_their_scan_error() {
        assert!(parse_err("(+ 1 %)").downcast_ref::<SingleTokenError>().is_some());
        assert!(
            parse_err("(print \"oops")
                .downcast_ref::<StringTerminationError>()
                .is_some()
        );
        assert!(
            parse_err("(+ 1.2.3 1)")
                .downcast_ref::<MalformedNumberError>()
                .is_some()
        );
    }

    #[test]
    fn integer_overflow_is_a_literal_error() {
        let error = parse_err("99999999999999999999");
        let literal = error
            .downcast_ref::<NumberLiteralError>()
            .expect("number literal error");
        assert_eq!(literal.literal, "99999999999999999999");
    }

    #[test]
    fn rendering_reparses_to_the_same_shape() {
        let source = r#"(defvar xs '(1 2.5 "a" 'b' [3 4]) "doc") (print (+ 1 2))"#;
        let first = Parser::new(None, source).parse().expect("parse");
        let rendered = first.to_string();
        let second = Parser::new(None, &rendered).parse().expect("reparse");
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(first.statements.len(), second.statements.len());
    }
}

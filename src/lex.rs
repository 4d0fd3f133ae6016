use std::fmt::Display;

use miette::{Diagnostic, Error, NamedSource, SourceSpan};
use thiserror::Error;

/// 1-based line number of a byte offset.
pub fn line_of(src: &str, byte: usize) -> usize {
    src[..byte.min(src.len())].matches('\n').count() + 1
}

#[derive(Error, Debug, Diagnostic)]
#[error("Unexpected token '{token}'")]
#[diagnostic(help("remove or correct the token: `{token}`"))]
pub struct SingleTokenError {
    #[source_code]
    src: NamedSource<String>,

    #[label("this character")]
    bad_bit: SourceSpan,

    pub token: char,
}

impl SingleTokenError {
    pub fn line(&self) -> usize {
        line_of(self.src.inner(), self.bad_bit.offset())
    }
}

#[derive(Error, Debug, Diagnostic)]
#[error("unterminated double quote string")]
#[diagnostic(help("strings have no escape sequences, every `\"` opens or closes one"))]
pub struct StringTerminationError {
    #[source_code]
    src: NamedSource<String>,

    #[label("Syntax Error: Missing trailing `\"` symbol to terminate the string literal")]
    bad_line: SourceSpan,
}

impl StringTerminationError {
    pub fn line(&self) -> usize {
        line_of(self.src.inner(), self.bad_line.offset())
    }
}

#[derive(Error, Debug, Diagnostic)]
#[error("malformed number '{literal}'")]
#[diagnostic(help("a number may contain at most one `.`"))]
pub struct MalformedNumberError {
    #[source_code]
    src: NamedSource<String>,

    #[label("this numeric literal")]
    bad_bit: SourceSpan,

    pub literal: String,
}

impl MalformedNumberError {
    pub fn line(&self) -> usize {
        line_of(self.src.inner(), self.bad_bit.offset())
    }
}

#[derive(Error, Debug, Diagnostic)]
#[error("Unexpected end of file")]
#[diagnostic(help("The input ended unexpectedly, possibly due to a missing `)` or `]`."))]
pub struct Eof {
    #[source_code]
    src: NamedSource<String>,

    #[label("Syntax Error: Unexpected end of file")]
    bad_line: SourceSpan,
}

impl Eof {
    pub fn build(lexer: &Lexer<'_>) -> Self {
        let start = lexer.whole[..lexer.byte]
            .char_indices()
            .next_back()
            .map_or(0, |(i, _)| i);
        Eof {
            src: lexer.named_source(),
            bad_line: SourceSpan::from(start..lexer.byte),
        }
    }

    pub fn line(&self) -> usize {
        line_of(self.src.inner(), self.bad_line.offset())
    }
}

/// Why the scanner refused a piece of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Illegal {
    Character,
    UnterminatedString,
    MalformedNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Quote,
    Colon,
    Ident,
    Integer,
    Float,
    String,
    Character,
    Illegal(Illegal),
    Eof,
}

impl TokenKind {
    /// Human readable name used in parse diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::LeftParen => "`(`",
            TokenKind::RightParen => "`)`",
            TokenKind::LeftBracket => "`[`",
            TokenKind::RightBracket => "`]`",
            TokenKind::Quote => "`'`",
            TokenKind::Colon => "`:`",
            TokenKind::Ident => "identifier",
            TokenKind::Integer => "integer",
            TokenKind::Float => "float",
            TokenKind::String => "string",
            TokenKind::Character => "character",
            TokenKind::Illegal(_) => "illegal token",
            TokenKind::Eof => "end of file",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'de> {
    pub kind: TokenKind,
    pub literal: &'de str,
    /// Character position of the token's first character.
    pub offset: usize,
    /// Byte position of the token's first character.
    pub byte: usize,
}

impl Token<'_> {
    /// Byte span of the token in the source, delimiters included.
    pub fn span(&self) -> SourceSpan {
        let delimiters = match self.kind {
            TokenKind::String | TokenKind::Character => 2,
            _ => 0,
        };
        SourceSpan::from(self.byte..self.byte + self.literal.len() + delimiters)
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.literal;
        match self.kind {
            TokenKind::LeftParen => write!(f, "LEFT_PAREN {lit} null"),
            TokenKind::RightParen => write!(f, "RIGHT_PAREN {lit} null"),
            TokenKind::LeftBracket => write!(f, "LEFT_BRACKET {lit} null"),
            TokenKind::RightBracket => write!(f, "RIGHT_BRACKET {lit} null"),
            TokenKind::Quote => write!(f, "QUOTE {lit} null"),
            TokenKind::Colon => write!(f, "COLON {lit} null"),
            TokenKind::Ident => write!(f, "IDENTIFIER {lit} null"),
            TokenKind::Integer => write!(f, "INTEGER {lit} {lit}"),
            TokenKind::Float => write!(f, "FLOAT {lit} {lit}"),
            TokenKind::String => write!(f, "STRING \"{lit}\" {lit}"),
            TokenKind::Character => write!(f, "CHARACTER '{lit}' {lit}"),
            TokenKind::Illegal(_) => write!(f, "ILLEGAL {lit} null"),
            TokenKind::Eof => write!(f, "EOF  null"),
        }
    }
}

/// `'('` directly followed by element text is a quoted list whose first
/// element is itself quoted, as in `'('a' 'b')`, not the character `(`.
fn opens_quoted_list(payload: char, after: &str) -> bool {
    payload == '('
        && after
            .chars()
            .next()
            .is_some_and(|c| !c.is_whitespace() && !matches!(c, ')' | ']'))
}

pub fn is_ident(c: char) -> bool {
    c.is_alphabetic() || matches!(c, '<' | '>' | '=' | '*' | '/' | '+' | '-')
}

pub struct Lexer<'de> {
    filename: Option<&'de str>,
    whole: &'de str,
    rest: &'de str,
    pub byte: usize,
    pub offset: usize,
    finished: bool,
}

impl<'de> Lexer<'de> {
    pub fn new(filename: Option<&'de str>, input: &'de str) -> Self {
        Lexer {
            filename,
            whole: input,
            rest: input,
            byte: 0,
            offset: 0,
            finished: false,
        }
    }

    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.filename.unwrap_or("<input>"), self.whole.to_string())
    }

    /// Turns an illegal token into the diagnostic that describes it.
    ///
    /// Returns `None` for tokens the scanner accepted.
    pub fn illegal(&self, token: &Token<'de>) -> Option<Error> {
        let TokenKind::Illegal(reason) = token.kind else {
            return None;
        };
        let src = self.named_source();
        Some(match reason {
            Illegal::Character => SingleTokenError {
                src,
                bad_bit: token.span(),
                token: token.literal.chars().next().unwrap_or('\0'),
            }
            .into(),
            Illegal::UnterminatedString => StringTerminationError {
                src,
                bad_line: token.span(),
            }
            .into(),
            Illegal::MalformedNumber => MalformedNumberError {
                src,
                bad_bit: token.span(),
                literal: token.literal.to_string(),
            }
            .into(),
        })
    }

    fn bump(&mut self, bytes: usize) {
        self.offset += self.rest[..bytes].chars().count();
        self.byte += bytes;
        self.rest = &self.rest[bytes..];
    }

    /// Scans the next token. Once the input is exhausted every call yields `Eof`.
    pub fn next_token(&mut self) -> Token<'de> {
        let trimmed = self.rest.trim_start_matches([' ', '\t', '\r', '\n']);
        self.bump(self.rest.len() - trimmed.len());

        let (offset, byte) = (self.offset, self.byte);
        let token = |kind: TokenKind, literal: &'de str| Token {
            kind,
            literal,
            offset,
            byte,
        };

        let cur = self.rest;
        let Some(c) = cur.chars().next() else {
            return token(TokenKind::Eof, "");
        };

        enum Start {
            Fixed(TokenKind),
            Quote,
            String,
            Ident,
            Number,
        }

        let started = match c {
            '(' => Start::Fixed(TokenKind::LeftParen),
            ')' => Start::Fixed(TokenKind::RightParen),
            '[' => Start::Fixed(TokenKind::LeftBracket),
            ']' => Start::Fixed(TokenKind::RightBracket),
            ':' => Start::Fixed(TokenKind::Colon),
            '\'' => Start::Quote,
            '"' => Start::String,
            '0'..='9' => Start::Number,
            c if is_ident(c) => Start::Ident,
            c => {
                self.bump(c.len_utf8());
                return token(
                    TokenKind::Illegal(Illegal::Character),
                    &cur[..c.len_utf8()],
                );
            }
        };

        match started {
            Start::Fixed(kind) => {
                self.bump(1);
                token(kind, &cur[..1])
            }
            Start::Quote => {
                let mut after = cur[1..].chars();
                match (after.next(), after.next()) {
                    (Some(ch), Some('\''))
                        if !ch.is_whitespace()
                            && !opens_quoted_list(ch, &cur[ch.len_utf8() + 2..]) =>
                    {
                        let len = ch.len_utf8();
                        self.bump(len + 2);
                        token(TokenKind::Character, &cur[1..1 + len])
                    }
                    _ => {
                        self.bump(1);
                        token(TokenKind::Quote, &cur[..1])
                    }
                }
            }
            Start::String => {
                let body = &cur[1..];
                match body.find('"') {
                    Some(end) => {
                        self.bump(end + 2);
                        token(TokenKind::String, &body[..end])
                    }
                    None => {
                        self.bump(cur.len());
                        token(TokenKind::Illegal(Illegal::UnterminatedString), cur)
                    }
                }
            }
            Start::Ident => {
                let end = cur.find(|c: char| !is_ident(c)).unwrap_or(cur.len());
                self.bump(end);
                token(TokenKind::Ident, &cur[..end])
            }
            Start::Number => {
                let end = cur
                    .find(|c: char| !matches!(c, '0'..='9' | '.'))
                    .unwrap_or(cur.len());
                let literal = &cur[..end];
                self.bump(end);

                let kind = match literal.matches('.').count() {
                    0 => TokenKind::Integer,
                    1 => TokenKind::Float,
                    _ => TokenKind::Illegal(Illegal::MalformedNumber),
                };
                token(kind, literal)
            }
        }
    }
}

impl<'de> Iterator for Lexer<'de> {
    type Item = Token<'de>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            self.finished = true;
        }
        Some(token)
    }
}

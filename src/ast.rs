use std::fmt::Display;

use crate::lex::Token;

/// Discriminates the AST variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Program,
    ExpressionStatement,
    FunctionCall,
    Identifier,
    IntegerLiteral,
    FloatLiteral,
    StringLiteral,
    CharacterLiteral,
    ListLiteral,
    VectorLiteral,
    DefVar,
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NodeKind::Program => "Program",
            NodeKind::ExpressionStatement => "ExpressionStatement",
            NodeKind::FunctionCall => "FunctionCall",
            NodeKind::Identifier => "Identifier",
            NodeKind::IntegerLiteral => "IntegerLiteral",
            NodeKind::FloatLiteral => "FloatLiteral",
            NodeKind::StringLiteral => "StringLiteral",
            NodeKind::CharacterLiteral => "CharacterLiteral",
            NodeKind::ListLiteral => "ListLiteral",
            NodeKind::VectorLiteral => "VectorLiteral",
            NodeKind::DefVar => "DefVar",
        };
        f.write_str(name)
    }
}

/// Shared surface of every AST node: where it starts, what it is, and its
/// source-like rendering through `Display`.
pub trait Node: Display {
    fn pos(&self) -> usize;
    fn kind(&self) -> NodeKind;
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program<'de> {
    pub statements: Vec<ExpressionStatement<'de>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement<'de> {
    pub expression: Expression<'de>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression<'de> {
    FunctionCall(FunctionCall<'de>),
    Identifier(Identifier<'de>),
    Integer(IntegerLiteral<'de>),
    Float(FloatLiteral<'de>),
    String(StringLiteral<'de>),
    Character(CharacterLiteral<'de>),
    List(ListLiteral<'de>),
    Vector(VectorLiteral<'de>),
    DefVar(DefVar<'de>),
}

/// `(callee arg...)`; `token` is the opening parenthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall<'de> {
    pub token: Token<'de>,
    pub callee: Identifier<'de>,
    pub arguments: Vec<Expression<'de>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier<'de> {
    pub token: Token<'de>,
    pub name: &'de str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegerLiteral<'de> {
    pub token: Token<'de>,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatLiteral<'de> {
    pub token: Token<'de>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral<'de> {
    pub token: Token<'de>,
    pub value: &'de str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterLiteral<'de> {
    pub token: Token<'de>,
    pub value: char,
}

/// `'(a b c)`; `token` is the quote.
#[derive(Debug, Clone, PartialEq)]
pub struct ListLiteral<'de> {
    pub token: Token<'de>,
    pub elements: Vec<Expression<'de>>,
}

/// `[a b c]`; `token` is the opening bracket.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorLiteral<'de> {
    pub token: Token<'de>,
    pub elements: Vec<Expression<'de>>,
}

/// `(defvar name value "doc")`; `token` is the `defvar` identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct DefVar<'de> {
    pub token: Token<'de>,
    pub name: Identifier<'de>,
    pub value: Box<Expression<'de>>,
    pub documentation: Option<StringLiteral<'de>>,
}

impl Node for Program<'_> {
    fn pos(&self) -> usize {
        0
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Program
    }
}

impl Node for ExpressionStatement<'_> {
    fn pos(&self) -> usize {
        self.expression.pos()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::ExpressionStatement
    }
}

impl Node for Expression<'_> {
    fn pos(&self) -> usize {
        let token = match self {
            Expression::FunctionCall(call) => &call.token,
            Expression::Identifier(ident) => &ident.token,
            Expression::Integer(int) => &int.token,
            Expression::Float(float) => &float.token,
            Expression::String(string) => &string.token,
            Expression::Character(character) => &character.token,
            Expression::List(list) => &list.token,
            Expression::Vector(vector) => &vector.token,
            Expression::DefVar(defvar) => &defvar.token,
        };
        token.offset
    }

    fn kind(&self) -> NodeKind {
        match self {
            Expression::FunctionCall(_) => NodeKind::FunctionCall,
            Expression::Identifier(_) => NodeKind::Identifier,
            Expression::Integer(_) => NodeKind::IntegerLiteral,
            Expression::Float(_) => NodeKind::FloatLiteral,
            Expression::String(_) => NodeKind::StringLiteral,
            Expression::Character(_) => NodeKind::CharacterLiteral,
            Expression::List(_) => NodeKind::ListLiteral,
            Expression::Vector(_) => NodeKind::VectorLiteral,
            Expression::DefVar(_) => NodeKind::DefVar,
        }
    }
}

fn write_spaced(f: &mut std::fmt::Formatter<'_>, items: &[Expression<'_>]) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl Display for Program<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, statement) in self.statements.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{statement}")?;
        }
        Ok(())
    }
}

impl Display for ExpressionStatement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.expression)
    }
}

impl Display for Identifier<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

impl Display for StringLiteral<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", self.value)
    }
}

impl Display for Expression<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::FunctionCall(call) => {
                write!(f, "({}", call.callee)?;
                for argument in &call.arguments {
                    write!(f, " {argument}")?;
                }
                f.write_str(")")
            }
            Expression::Identifier(ident) => write!(f, "{ident}"),
            // numeric literals render exactly as they were written
            Expression::Integer(int) => f.write_str(int.token.literal),
            Expression::Float(float) => f.write_str(float.token.literal),
            Expression::String(string) => write!(f, "{string}"),
            Expression::Character(character) => write!(f, "'{}'", character.value),
            Expression::List(list) => {
                f.write_str("'(")?;
                write_spaced(f, &list.elements)?;
                f.write_str(")")
            }
            Expression::Vector(vector) => {
                f.write_str("[")?;
                write_spaced(f, &vector.elements)?;
                f.write_str("]")
            }
            Expression::DefVar(defvar) => {
                write!(f, "(defvar {} {}", defvar.name, defvar.value)?;
                if let Some(documentation) = &defvar.documentation {
                    write!(f, " {documentation}")?;
                }
                f.write_str(")")
            }
        }
    }
}

use std::fmt::{Display, Formatter, Result};

use crate::ast::{Expression, ExpressionStatement, Node, Program};

/// Debug rendering of an AST: kind, position and children of every node.
pub struct DebugTree<'a, T: ?Sized>(pub &'a T);

fn write_all(f: &mut Formatter<'_>, expressions: &[Expression<'_>]) -> Result {
    f.write_str("[")?;
    for (i, expression) in expressions.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", DebugTree(expression))?;
    }
    f.write_str("]")
}

impl Display for DebugTree<'_, Program<'_>> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        for (i, statement) in self.0.statements.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", DebugTree(statement))?;
        }
        Ok(())
    }
}

impl Display for DebugTree<'_, ExpressionStatement<'_>> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", DebugTree(&self.0.expression))
    }
}

impl Display for DebugTree<'_, Expression<'_>> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let node = self.0;
        write!(f, "<ast.{} pos: {}", node.kind(), node.pos())?;
        match node {
            Expression::Identifier(ident) => write!(f, " value: {}", ident.name)?,
            Expression::Integer(int) => write!(f, " value: {}", int.value)?,
            Expression::Float(float) => write!(f, " value: {:?}", float.value)?,
            Expression::String(string) => write!(f, " value: {:?}", string.value)?,
            Expression::Character(character) => write!(f, " value: {:?}", character.value)?,
            Expression::List(list) => {
                f.write_str(" elements: ")?;
                write_all(f, &list.elements)?;
            }
            Expression::Vector(vector) => {
                f.write_str(" elements: ")?;
                write_all(f, &vector.elements)?;
            }
            Expression::FunctionCall(call) => {
                write!(f, " callee: {} arguments: ", call.callee)?;
                write_all(f, &call.arguments)?;
            }
            Expression::DefVar(defvar) => {
                write!(
                    f,
                    " name: {} value: {}",
                    defvar.name,
                    DebugTree(defvar.value.as_ref())
                )?;
                if let Some(documentation) = &defvar.documentation {
                    write!(f, " documentation: {:?}", documentation.value)?;
                }
            }
        }
        f.write_str(">")
    }
}

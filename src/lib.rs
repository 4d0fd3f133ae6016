//! A small interpreter for an S-expression language.
//!
//! Source text goes through [`Lexer`] → [`Parser`] → [`Interpreter`]; the
//! variable store lives in a [`Context`] owned by the caller for the length of
//! a session.

use std::io::{self, Write};

use miette::Error;

pub mod ast;
pub mod builtin;
pub mod context;
pub mod eval;
pub mod lex;
pub mod object;
pub mod parse;
pub mod printer;

pub use context::Context;
pub use eval::Interpreter;
pub use lex::Lexer;
pub use object::Object;
pub use parse::Parser;

/// Parses and evaluates `source`, printing to stdout.
pub fn run(source: &str, context: &mut Context) -> Result<Option<Object>, Error> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with_output(None, source, context, &mut out)
}

/// Parses and evaluates `source`, sending `print` output to `out`.
///
/// Nothing is evaluated when the source fails to parse.
pub fn run_with_output(
    filename: Option<&str>,
    source: &str,
    context: &mut Context,
    out: &mut dyn Write,
) -> Result<Option<Object>, Error> {
    let program = Parser::new(filename, source).parse()?;
    Interpreter::new(context, out).eval_program(&program)
}

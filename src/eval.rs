use std::io::{self, Write};

use log::debug;
use miette::{Diagnostic, Error};
use thiserror::Error;

use crate::{
    ast::{DefVar, Expression, ExpressionStatement, FunctionCall, Program},
    builtin,
    context::Context,
    object::{Object, ObjectKind},
};

#[derive(Error, Debug, Diagnostic)]
pub enum EvalError {
    #[error("function `{name}` is not defined")]
    #[diagnostic(code(eval::undefined_function))]
    UndefinedFunction { name: String },

    #[error("{function} expects at least {minimum} args, {given} given")]
    #[diagnostic(code(eval::arity))]
    Arity {
        function: &'static str,
        minimum: usize,
        given: usize,
    },

    #[error(
        "{function} expects positional argument #{position} to be of type {expected}, {given} given"
    )]
    #[diagnostic(code(eval::type_mismatch))]
    TypeMismatch {
        function: &'static str,
        position: usize,
        expected: ObjectKind,
        given: ObjectKind,
    },

    #[error("{function} is not defined for type {kind}")]
    #[diagnostic(code(eval::unsupported_type))]
    UnsupportedType {
        function: &'static str,
        kind: ObjectKind,
    },

    #[error("vector element #{position} is of type {found}, but the vector holds {expected}")]
    #[diagnostic(
        code(eval::vector_element),
        help("use a quoted list `'(...)` to mix element types")
    )]
    VectorElementMismatch {
        position: usize,
        expected: ObjectKind,
        found: ObjectKind,
    },

    #[error("division by zero in `{function}`")]
    #[diagnostic(code(eval::division_by_zero))]
    DivisionByZero { function: &'static str },

    #[error("integer overflow in `{function}`")]
    #[diagnostic(code(eval::overflow))]
    Overflow { function: &'static str },

    #[error("cannot allocate a string of {length} bytes")]
    #[diagnostic(code(eval::allocation))]
    Allocation { length: usize },

    #[error("cannot repeat a string {count} times")]
    #[diagnostic(code(eval::negative_repeat))]
    NegativeRepeat { count: i64 },

    #[error("`{expression}` does not produce a value")]
    #[diagnostic(code(eval::no_value), help("`print` and `defvar` cannot be used as values"))]
    NoValue { expression: String },

    #[error("failed to write output")]
    #[diagnostic(code(eval::output))]
    Output(#[from] io::Error),
}

/// Walks the AST against a session [`Context`], sending `print` output to `out`.
pub struct Interpreter<'a> {
    context: &'a mut Context,
    out: &'a mut dyn Write,
}

/// Evaluates `program` with stdout as the output stream.
pub fn eval(program: &Program<'_>, context: &mut Context) -> Result<Option<Object>, Error> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    Interpreter::new(context, &mut out).eval_program(program)
}

impl<'a> Interpreter<'a> {
    pub fn new(context: &'a mut Context, out: &'a mut dyn Write) -> Self {
        Self { context, out }
    }

    /// Runs statements in order; the last one decides the result.
    pub fn eval_program(&mut self, program: &Program<'_>) -> Result<Option<Object>, Error> {
        let mut last = None;
        for statement in &program.statements {
            last = self.eval_statement(statement)?;
        }
        Ok(last)
    }

    pub fn eval_statement(
        &mut self,
        statement: &ExpressionStatement<'_>,
    ) -> Result<Option<Object>, Error> {
        self.eval_expression(&statement.expression)
    }

    pub fn eval_expression(&mut self, expr: &Expression<'_>) -> Result<Option<Object>, Error> {
        Ok(Some(match expr {
            Expression::Integer(int) => Object::Int(int.value),
            Expression::Float(float) => Object::Float(float.value),
            Expression::String(string) => Object::String(string.value.to_string()),
            Expression::Character(character) => Object::Character(character.value),
            Expression::Identifier(ident) => self.context.get(ident.name)?.clone(),
            Expression::List(list) => Object::List(self.eval_elements(&list.elements)?),
            Expression::Vector(vector) => self.eval_vector(&vector.elements)?,
            Expression::DefVar(defvar) => {
                self.eval_defvar(defvar)?;
                return Ok(None);
            }
            Expression::FunctionCall(call) => return self.eval_call(call),
        }))
    }

    /// Evaluates an expression that must yield an object.
    fn eval_value(&mut self, expr: &Expression<'_>) -> Result<Object, Error> {
        match self.eval_expression(expr)? {
            Some(value) => Ok(value),
            None => Err(EvalError::NoValue {
                expression: expr.to_string(),
            }
            .into()),
        }
    }

    fn eval_elements(&mut self, elements: &[Expression<'_>]) -> Result<Vec<Object>, Error> {
        elements
            .iter()
            .map(|element| self.eval_value(element))
            .collect()
    }

    fn eval_vector(&mut self, elements: &[Expression<'_>]) -> Result<Object, Error> {
        let values = self.eval_elements(elements)?;
        if let Some(first) = values.first() {
            let expected = first.kind();
            if let Some((position, value)) = values
                .iter()
                .enumerate()
                .find(|(_, value)| value.kind() != expected)
            {
                return Err(EvalError::VectorElementMismatch {
                    position,
                    expected,
                    found: value.kind(),
                }
                .into());
            }
        }
        Ok(Object::Vector(values))
    }

    fn eval_defvar(&mut self, defvar: &DefVar<'_>) -> Result<(), Error> {
        let value = self.eval_value(&defvar.value)?;
        let documentation = defvar.documentation.as_ref().map(|doc| doc.value.to_string());
        debug!("defvar {} = {value}", defvar.name);
        self.context.define(defvar.name.name, value, documentation)?;
        Ok(())
    }

    fn eval_call(&mut self, call: &FunctionCall<'_>) -> Result<Option<Object>, Error> {
        let name = call.callee.name;
        let Some(function) = builtin::lookup(name) else {
            return Err(EvalError::UndefinedFunction {
                name: name.to_string(),
            }
            .into());
        };

        let arguments = self.eval_elements(&call.arguments)?;
        debug!("calling `{name}` with {} argument(s)", arguments.len());
        Ok(function(&mut *self.out, &arguments)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Parser, context::ContextError};

    fn eval_with(context: &mut Context, source: &str) -> (Result<Option<Object>, Error>, String) {
        let program = Parser::new(None, source)
            .parse()
            .unwrap_or_else(|e| panic!("{source:?} failed to parse: {e:?}"));
        let mut out = Vec::new();
        let result = Interpreter::new(context, &mut out).eval_program(&program);
        (result, String::from_utf8(out).expect("utf-8 output"))
    }

    fn eval_ok(source: &str) -> Option<Object> {
        let (result, _) = eval_with(&mut Context::new(), source);
        result.unwrap_or_else(|e| panic!("{source:?} failed: {e:?}"))
    }

    fn eval_err(source: &str) -> Error {
        let (result, _) = eval_with(&mut Context::new(), source);
        match result {
            Ok(value) => panic!("{source:?} evaluated to {value:?}"),
            Err(e) => e,
        }
    }

    #[test]
    fn literals() {
        assert_eq!(eval_ok("42"), Some(Object::Int(42)));
        assert_eq!(eval_ok("4.5"), Some(Object::Float(4.5)));
        assert_eq!(eval_ok("\"hi\""), Some(Object::String("hi".into())));
        assert_eq!(eval_ok("'z'"), Some(Object::Character('z')));
    }

    #[test]
    fn eval_binds_into_the_callers_context() {
        let program = Parser::new(None, "(defvar answer (* 6 7))")
            .parse()
            .expect("parse");
        let mut context = Context::new();
        assert_eq!(eval(&program, &mut context).expect("eval"), None);
        assert_eq!(context.get("answer"), Ok(&Object::Int(42)));
    }

    #[test]
    fn empty_program_has_no_value() {
        assert_eq!(eval_ok(""), None);
    }

    #[test]
    fn last_statement_wins() {
        assert_eq!(eval_ok("1 2 (+ 1 2)"), Some(Object::Int(3)));
        assert_eq!(eval_ok("1 (print 2)"), None);
    }

    #[test]
    fn multiplication() {
        assert_eq!(eval_ok("(* 2 5)"), Some(Object::Int(10)));
    }

    #[test]
    fn quoted_lists_may_mix_kinds() {
        assert_eq!(
            eval_ok("'(1 \"a\" 2.0 (+ 1 1))"),
            Some(Object::List(vec![
                Object::Int(1),
                Object::String("a".into()),
                Object::Float(2.0),
                Object::Int(2),
            ]))
        );
    }

    #[test]
    fn vector_of_strings() {
        assert_eq!(
            eval_ok(r#"["a" "b" "c"]"#),
            Some(Object::Vector(vec![
                Object::String("a".into()),
                Object::String("b".into()),
                Object::String("c".into()),
            ]))
        );
        assert_eq!(eval_ok("[]"), Some(Object::Vector(vec![])));
    }

    #[test]
    fn mixed_vector_is_a_type_mismatch() {
        let error = eval_err(r#"[1 2 "a"]"#);
        match error.downcast_ref::<EvalError>() {
            Some(EvalError::VectorElementMismatch {
                position,
                expected,
                found,
            }) => {
                assert_eq!(*position, 2);
                assert_eq!(*expected, ObjectKind::Int);
                assert_eq!(*found, ObjectKind::String);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn defvar_binds_without_a_value() {
        let mut context = Context::new();
        let (result, _) = eval_with(&mut context, r#"(defvar x '(1 2) "doc")"#);
        assert_eq!(result.expect("defvar"), None);
        assert_eq!(
            context.get("x"),
            Ok(&Object::List(vec![Object::Int(1), Object::Int(2)]))
        );
        assert_eq!(context.documentation("x"), Some("doc"));
    }

    #[test]
    fn identifiers_read_the_context() {
        let mut context = Context::new();
        let (result, _) = eval_with(&mut context, "(defvar n 4) (* n n)");
        assert_eq!(result.expect("program"), Some(Object::Int(16)));
    }

    #[test]
    fn redefinition_is_an_error() {
        let mut context = Context::new();
        let (first, _) = eval_with(&mut context, "(defvar x 1)");
        assert_eq!(first.expect("first defvar"), None);

        let (second, _) = eval_with(&mut context, "(defvar x 2)");
        let error = second.expect_err("second defvar");
        assert_eq!(
            error.downcast_ref::<ContextError>(),
            Some(&ContextError::Redefinition { name: "x".into() })
        );
        assert_eq!(context.get("x"), Ok(&Object::Int(1)));
    }

    #[test]
    fn undefined_variable() {
        let error = eval_err("(+ y 1)");
        assert_eq!(
            error.downcast_ref::<ContextError>(),
            Some(&ContextError::Undefined { name: "y".into() })
        );
    }

    #[test]
    fn undefined_function() {
        let error = eval_err("(frobnicate 1 2)");
        assert!(matches!(
            error.downcast_ref::<EvalError>(),
            Some(EvalError::UndefinedFunction { name }) if name == "frobnicate"
        ));
    }

    #[test]
    fn print_writes_in_source_order() {
        let (result, out) = eval_with(
            &mut Context::new(),
            r#"(print 1 "two" 3.0) (defvar x '(1 "a")) (print x) (print)"#,
        );
        assert_eq!(result.expect("program"), None);
        assert_eq!(out, "1 two 3.0\n(1 \"a\")\n\n");
    }

    #[test]
    fn side_effects_before_an_error_are_kept() {
        let (result, out) = eval_with(&mut Context::new(), "(print 1) (+ 1) (print 2)");
        assert!(result.is_err());
        assert_eq!(out, "1\n");
    }

    #[test]
    fn nested_statement_forms_have_no_value() {
        let error = eval_err("(+ (print 1) 2)");
        assert!(matches!(
            error.downcast_ref::<EvalError>(),
            Some(EvalError::NoValue { expression }) if expression == "(print 1)"
        ));

        let error = eval_err("'((defvar a 1))");
        assert!(matches!(
            error.downcast_ref::<EvalError>(),
            Some(EvalError::NoValue { .. })
        ));
    }

    #[test]
    fn arguments_are_evaluated_left_to_right() {
        let (result, out) = eval_with(&mut Context::new(), "(append '() (print 1))");
        assert!(result.is_err());
        assert_eq!(out, "1\n");
    }
}

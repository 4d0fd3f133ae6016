use std::collections::{HashMap, hash_map::Entry};

use miette::Diagnostic;
use thiserror::Error;

use crate::object::Object;

#[derive(Error, Debug, Diagnostic, PartialEq)]
pub enum ContextError {
    #[error("redefinition of variable `{name}`")]
    #[diagnostic(
        code(context::redefinition),
        help("variables are bound once per session, pick another name")
    )]
    Redefinition { name: String },

    #[error("undefined variable `{name}`")]
    #[diagnostic(code(context::undefined), help("bind it first with `(defvar {name} ...)`"))]
    Undefined { name: String },
}

#[derive(Debug, Clone, PartialEq)]
struct Variable {
    value: Object,
    documentation: Option<String>,
}

/// The flat variable store of one session. Names are bound at most once.
#[derive(Debug, Default)]
pub struct Context {
    variables: HashMap<String, Variable>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(
        &mut self,
        name: &str,
        value: Object,
        documentation: Option<String>,
    ) -> Result<(), ContextError> {
        match self.variables.entry(name.to_string()) {
            Entry::Occupied(_) => Err(ContextError::Redefinition {
                name: name.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(Variable {
                    value,
                    documentation,
                });
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Result<&Object, ContextError> {
        self.variables
            .get(name)
            .map(|variable| &variable.value)
            .ok_or_else(|| ContextError::Undefined {
                name: name.to_string(),
            })
    }

    pub fn documentation(&self, name: &str) -> Option<&str> {
        self.variables
            .get(name)
            .and_then(|variable| variable.documentation.as_deref())
    }

    /// Bound names in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

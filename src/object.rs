use std::fmt::Display;

/// Discriminates the runtime value variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Int,
    Float,
    String,
    Character,
    Bool,
    List,
    Vector,
}

impl Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ObjectKind::Int => "Int",
            ObjectKind::Float => "Float",
            ObjectKind::String => "String",
            ObjectKind::Character => "Character",
            ObjectKind::Bool => "Bool",
            ObjectKind::List => "List",
            ObjectKind::Vector => "Vector",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Int(i64),
    Float(f64),
    String(String),
    Character(char),
    Bool(bool),
    List(Vec<Object>),
    /// Every element has the same [`ObjectKind`].
    Vector(Vec<Object>),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Int(_) => ObjectKind::Int,
            Object::Float(_) => ObjectKind::Float,
            Object::String(_) => ObjectKind::String,
            Object::Character(_) => ObjectKind::Character,
            Object::Bool(_) => ObjectKind::Bool,
            Object::List(_) => ObjectKind::List,
            Object::Vector(_) => ObjectKind::Vector,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Object::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Object::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Rendering used for collection elements, where strings and characters
    /// keep their delimiters.
    fn fmt_nested(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Object::String(s) => write!(f, "\"{s}\""),
            Object::Character(c) => write!(f, "'{c}'"),
            other => write!(f, "{other}"),
        }
    }
}

fn fmt_elements(f: &mut std::fmt::Formatter<'_>, elements: &[Object]) -> std::fmt::Result {
    for (i, element) in elements.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        element.fmt_nested(f)?;
    }
    Ok(())
}

impl Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Object::Int(n) => write!(f, "{n}"),
            Object::Float(n) => {
                if n.is_finite() && *n == n.trunc() {
                    write!(f, "{n}.0")
                } else {
                    write!(f, "{n}")
                }
            }
            Object::String(s) => write!(f, "{s}"),
            Object::Character(c) => write!(f, "{c}"),
            Object::Bool(b) => write!(f, "{b}"),
            Object::List(elements) => {
                f.write_str("(")?;
                fmt_elements(f, elements)?;
                f.write_str(")")
            }
            Object::Vector(elements) => {
                f.write_str("[")?;
                fmt_elements(f, elements)?;
                f.write_str("]")
            }
        }
    }
}

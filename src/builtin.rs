use std::{collections::HashMap, io::Write, sync::LazyLock};

use crate::{
    eval::EvalError,
    object::{Object, ObjectKind},
};

/// A builtin receives the interpreter's output stream and its evaluated arguments.
pub type Builtin = fn(&mut dyn Write, &[Object]) -> Result<Option<Object>, EvalError>;

static BUILTINS: LazyLock<HashMap<&'static str, Builtin>> = LazyLock::new(|| {
    let table: [(&'static str, Builtin); 9] = [
        ("+", add),
        ("-", sub),
        ("*", mul),
        ("/", div),
        ("=", equal),
        ("<", less),
        (">", greater),
        ("print", print),
        ("append", append),
    ];
    HashMap::from(table)
});

pub fn lookup(name: &str) -> Option<Builtin> {
    BUILTINS.get(name).copied()
}

/// Every builtin name, sorted.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<_> = BUILTINS.keys().copied().collect();
    names.sort_unstable();
    names
}

fn ensure_arity(function: &'static str, minimum: usize, args: &[Object]) -> Result<(), EvalError> {
    if args.len() < minimum {
        return Err(EvalError::Arity {
            function,
            minimum,
            given: args.len(),
        });
    }
    Ok(())
}

/// Pulls a payload out of every argument, reporting positions relative to the
/// full argument list (`rest` starts at position `start`).
fn extract<T>(
    function: &'static str,
    rest: &[Object],
    start: usize,
    expected: ObjectKind,
    get: impl Fn(&Object) -> Option<T>,
) -> Result<Vec<T>, EvalError> {
    rest.iter()
        .enumerate()
        .map(|(i, arg)| {
            get(arg).ok_or(EvalError::TypeMismatch {
                function,
                position: start + i,
                expected,
                given: arg.kind(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Arithmetic {
    Add,
    Sub,
    Mul,
    Div,
}

impl Arithmetic {
    fn name(self) -> &'static str {
        match self {
            Arithmetic::Add => "+",
            Arithmetic::Sub => "-",
            Arithmetic::Mul => "*",
            Arithmetic::Div => "/",
        }
    }

    fn ints(self, lhs: i64, rhs: i64) -> Result<i64, EvalError> {
        let function = self.name();
        match self {
            Arithmetic::Add => lhs.checked_add(rhs),
            Arithmetic::Sub => lhs.checked_sub(rhs),
            Arithmetic::Mul => lhs.checked_mul(rhs),
            Arithmetic::Div if rhs == 0 => return Err(EvalError::DivisionByZero { function }),
            Arithmetic::Div => lhs.checked_div(rhs),
        }
        .ok_or(EvalError::Overflow { function })
    }

    fn floats(self, lhs: f64, rhs: f64) -> Result<f64, EvalError> {
        Ok(match self {
            Arithmetic::Add => lhs + rhs,
            Arithmetic::Sub => lhs - rhs,
            Arithmetic::Mul => lhs * rhs,
            Arithmetic::Div if rhs == 0.0 => {
                return Err(EvalError::DivisionByZero {
                    function: self.name(),
                });
            }
            Arithmetic::Div => lhs / rhs,
        })
    }

    /// Left fold over the arguments; the first one picks the numeric type.
    fn apply(self, args: &[Object]) -> Result<Object, EvalError> {
        let function = self.name();
        ensure_arity(function, 2, args)?;

        match &args[0] {
            Object::Int(first) => extract(function, &args[1..], 1, ObjectKind::Int, Object::as_int)?
                .into_iter()
                .try_fold(*first, |acc, n| self.ints(acc, n))
                .map(Object::Int),
            Object::Float(first) => {
                extract(function, &args[1..], 1, ObjectKind::Float, Object::as_float)?
                    .into_iter()
                    .try_fold(*first, |acc, n| self.floats(acc, n))
                    .map(Object::Float)
            }
            Object::String(s) if matches!(self, Arithmetic::Mul) => {
                let counts = extract(function, &args[1..], 1, ObjectKind::Int, Object::as_int)?;
                repeat(s, &counts).map(Object::String)
            }
            other => Err(EvalError::UnsupportedType {
                function,
                kind: other.kind(),
            }),
        }
    }
}

/// `(* "ab" 2 3)` repeats "ab" twice, then the result three times.
fn repeat(s: &str, counts: &[i64]) -> Result<String, EvalError> {
    let mut value = s.to_string();
    for &count in counts {
        let Ok(times) = usize::try_from(count) else {
            return Err(if count < 0 {
                EvalError::NegativeRepeat { count }
            } else {
                EvalError::Overflow { function: "*" }
            });
        };
        if value.is_empty() || times == 0 {
            value.clear();
            continue;
        }

        let length = value
            .len()
            .checked_mul(times)
            .filter(|&length| length <= isize::MAX as usize)
            .ok_or(EvalError::Overflow { function: "*" })?;

        let mut repeated = String::new();
        repeated
            .try_reserve_exact(length)
            .map_err(|_| EvalError::Allocation { length })?;
        for _ in 0..times {
            repeated.push_str(&value);
        }
        value = repeated;
    }
    Ok(value)
}

pub fn add(_: &mut dyn Write, args: &[Object]) -> Result<Option<Object>, EvalError> {
    Arithmetic::Add.apply(args).map(Some)
}

pub fn sub(_: &mut dyn Write, args: &[Object]) -> Result<Option<Object>, EvalError> {
    Arithmetic::Sub.apply(args).map(Some)
}

pub fn mul(_: &mut dyn Write, args: &[Object]) -> Result<Option<Object>, EvalError> {
    Arithmetic::Mul.apply(args).map(Some)
}

pub fn div(_: &mut dyn Write, args: &[Object]) -> Result<Option<Object>, EvalError> {
    Arithmetic::Div.apply(args).map(Some)
}

/// Checks `holds` over every adjacent pair of numeric arguments.
fn compare(
    function: &'static str,
    args: &[Object],
    holds: fn(std::cmp::Ordering) -> bool,
) -> Result<Option<Object>, EvalError> {
    ensure_arity(function, 2, args)?;

    let orderings: Vec<Option<std::cmp::Ordering>> = match &args[0] {
        Object::Int(_) => {
            let ints = extract(function, args, 0, ObjectKind::Int, Object::as_int)?;
            ints.windows(2).map(|w| Some(w[0].cmp(&w[1]))).collect()
        }
        Object::Float(_) => {
            let floats = extract(function, args, 0, ObjectKind::Float, Object::as_float)?;
            floats.windows(2).map(|w| w[0].partial_cmp(&w[1])).collect()
        }
        other => {
            return Err(EvalError::UnsupportedType {
                function,
                kind: other.kind(),
            });
        }
    };

    // NaN compares as neither less, greater nor equal
    let result = orderings.into_iter().all(|ordering| ordering.is_some_and(holds));
    Ok(Some(Object::Bool(result)))
}

pub fn equal(_: &mut dyn Write, args: &[Object]) -> Result<Option<Object>, EvalError> {
    compare("=", args, std::cmp::Ordering::is_eq)
}

pub fn less(_: &mut dyn Write, args: &[Object]) -> Result<Option<Object>, EvalError> {
    compare("<", args, std::cmp::Ordering::is_lt)
}

pub fn greater(_: &mut dyn Write, args: &[Object]) -> Result<Option<Object>, EvalError> {
    compare(">", args, std::cmp::Ordering::is_gt)
}

pub fn print(out: &mut dyn Write, args: &[Object]) -> Result<Option<Object>, EvalError> {
    let line = args
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "{line}")?;
    Ok(None)
}

pub fn append(_: &mut dyn Write, args: &[Object]) -> Result<Option<Object>, EvalError> {
    ensure_arity("append", 2, args)?;

    let Object::List(elements) = &args[0] else {
        return Err(EvalError::TypeMismatch {
            function: "append",
            position: 0,
            expected: ObjectKind::List,
            given: args[0].kind(),
        });
    };

    let mut appended = elements.clone();
    appended.extend_from_slice(&args[1..]);
    Ok(Some(Object::List(appended)))
}

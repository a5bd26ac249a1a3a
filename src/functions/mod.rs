use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::value::Value;

/// Module that holds the built-in functions; every lookup falls back to it.
pub const STD_MODULE: &str = "std";

/// Which way a bidirectional transform runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Right,
    Left,
}

impl Direction {
    pub fn flip(self) -> Self {
        match self {
            Direction::Right => Direction::Left,
            Direction::Left => Direction::Right,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Right => f.write_str("right"),
            Direction::Left => f.write_str("left"),
        }
    }
}

/// Trait for pluggable transforms called from rule results.
pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;
    fn arity(&self) -> std::ops::RangeInclusive<usize>;
    fn supports(&self, _direction: Direction) -> bool {
        true
    }
    fn call(&self, direction: Direction, args: &[Value]) -> Result<Value>;
}

/// Thread-safe function registry keyed by (module, name).
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<(String, &'static str), Arc<dyn Function>>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.inner.keys().map(|(m, n)| format!("{m}::{n}")))
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register(STD_MODULE, builtins::Upper);
        reg.register(STD_MODULE, builtins::Lower);
        reg.register(STD_MODULE, builtins::Reverse);
        reg.register(STD_MODULE, builtins::Length);
        reg.register(STD_MODULE, builtins::Join);
        reg.register(STD_MODULE, builtins::Int);
        reg
    }

    pub fn register<F: Function + 'static>(&mut self, module: &str, f: F) {
        let map = Arc::make_mut(&mut self.inner);
        map.insert((module.to_string(), f.name()), Arc::new(f));
    }

    /// Resolve (module, name, direction), falling back to the std module.
    pub fn lookup(&self, module: &str, name: &str, direction: Direction) -> Result<Arc<dyn Function>> {
        [module, STD_MODULE]
            .iter()
            .find_map(|m| {
                self.inner
                    .iter()
                    .find(|((fm, fname), _)| fm == m && *fname == name)
                    .map(|(_, f)| f.clone())
            })
            .filter(|f| f.supports(direction))
            .ok_or_else(|| Error::UnknownFunction {
                module: module.to_string(),
                name: name.to_string(),
                direction,
            })
    }

    /// Look up and call, checking arity.
    pub fn call(&self, module: &str, name: &str, direction: Direction, args: &[Value]) -> Result<Value> {
        let f = self.lookup(module, name, direction)?;
        if !f.arity().contains(&args.len()) {
            return Err(Error::Function {
                name: name.to_string(),
                message: format!("expected {:?} arguments, got {}", f.arity(), args.len()),
            });
        }
        f.call(direction, args)
    }
}

pub mod builtins {
    use super::*;

    fn text_arg(name: &str, args: &[Value]) -> Result<String> {
        match args.first() {
            Some(Value::Str(s)) => Ok(s.clone()),
            Some(Value::Char(c)) => Ok(c.to_string()),
            Some(other) => Ok(other.to_string()),
            None => Err(Error::Function {
                name: name.to_string(),
                message: "missing argument".into(),
            }),
        }
    }

    /// Upper-cases going right, lower-cases going left.
    pub struct Upper;
    impl Function for Upper {
        fn name(&self) -> &'static str { "upper" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, direction: Direction, args: &[Value]) -> Result<Value> {
            let s = text_arg(self.name(), args)?;
            Ok(Value::Str(match direction {
                Direction::Right => s.to_uppercase(),
                Direction::Left => s.to_lowercase(),
            }))
        }
    }

    pub struct Lower;
    impl Function for Lower {
        fn name(&self) -> &'static str { "lower" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, direction: Direction, args: &[Value]) -> Result<Value> {
            Upper.call(direction.flip(), args)
        }
    }

    /// Its own inverse.
    pub struct Reverse;
    impl Function for Reverse {
        fn name(&self) -> &'static str { "reverse" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, _direction: Direction, args: &[Value]) -> Result<Value> {
            Ok(match args.first() {
                Some(Value::List(items)) => Value::List(items.iter().rev().cloned().collect()),
                Some(Value::Tuple(items)) => Value::Tuple(items.iter().rev().cloned().collect()),
                _ => Value::Str(text_arg(self.name(), args)?.chars().rev().collect()),
            })
        }
    }

    /// Only defined going right.
    pub struct Length;
    impl Function for Length {
        fn name(&self) -> &'static str { "length" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn supports(&self, direction: Direction) -> bool {
            direction == Direction::Right
        }
        fn call(&self, _direction: Direction, args: &[Value]) -> Result<Value> {
            let len = match args.first() {
                Some(Value::List(items)) | Some(Value::Tuple(items)) => items.len(),
                Some(Value::Str(s)) => s.chars().count(),
                Some(Value::Unset) | None => 0,
                Some(_) => 1,
            };
            Ok(Value::Int(len as i64))
        }
    }

    /// Joins a list into text going right; splits text into characters going
    /// left. An optional second argument is the separator.
    pub struct Join;
    impl Function for Join {
        fn name(&self) -> &'static str { "join" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=2 }
        fn call(&self, direction: Direction, args: &[Value]) -> Result<Value> {
            let sep = args.get(1).map(|v| v.to_string()).unwrap_or_default();
            match direction {
                Direction::Right => Ok(match args.first() {
                    Some(Value::List(items)) | Some(Value::Tuple(items)) => Value::Str(
                        items.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(&sep),
                    ),
                    Some(other) => Value::Str(other.to_string()),
                    None => Value::str(""),
                }),
                Direction::Left => {
                    let s = text_arg(self.name(), args)?;
                    let parts = if sep.is_empty() {
                        s.chars().map(|c| Value::Str(c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(Value::from).collect()
                    };
                    Ok(Value::List(parts))
                }
            }
        }
    }

    /// Parses decimal text going right, prints it going left.
    pub struct Int;
    impl Function for Int {
        fn name(&self) -> &'static str { "int" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, direction: Direction, args: &[Value]) -> Result<Value> {
            match (direction, args.first()) {
                (Direction::Right, Some(Value::Int(i))) => Ok(Value::Int(*i)),
                (Direction::Right, _) => {
                    let s = text_arg(self.name(), args)?;
                    s.trim().parse::<i64>().map(Value::Int).map_err(|e| Error::Function {
                        name: self.name().to_string(),
                        message: format!("`{s}`: {e}"),
                    })
                }
                (Direction::Left, _) => Ok(Value::Str(text_arg(self.name(), args)?)),
            }
        }
    }
}

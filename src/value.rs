//! Values bound to variables, read from the input, and produced by rendering.

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A matched, bound or rendered value.
///
/// Equality is deep and structural; it is what "same variable, same value"
/// means for repeated variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Sentinel for "no value yet": never bound by deferred resolution.
    Unset,
    Char(char),
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Named { name: String, value: Box<Value> },
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn named(name: impl Into<String>, value: Value) -> Self {
        Value::Named {
            name: name.into(),
            value: Box::new(value),
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Unset)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The parts a structural matcher walks when it descends into this value.
    pub fn parts(&self) -> Vec<Value> {
        match self {
            Value::Tuple(items) | Value::List(items) => items.clone(),
            Value::Str(s) => s.chars().map(Value::Char).collect(),
            Value::Named { value, .. } => value.parts(),
            Value::Unset => Vec::new(),
            other => vec![other.clone()],
        }
    }

    /// The input items that spell this value when it is matched as a
    /// bound variable: strings expand to their characters.
    pub fn spelling(&self) -> Vec<Value> {
        match self {
            Value::Str(s) => s.chars().map(Value::Char).collect(),
            Value::Unset => Vec::new(),
            other => vec![other.clone()],
        }
    }

    /// Materialize a run of input items. Character runs become strings, a
    /// single structured item stands for itself.
    pub fn from_span(items: &[Value]) -> Value {
        if items.iter().all(|v| matches!(v, Value::Char(_))) {
            return Value::Str(
                items
                    .iter()
                    .filter_map(|v| match v {
                        Value::Char(c) => Some(*c),
                        _ => None,
                    })
                    .collect(),
            );
        }
        match items {
            [single] => single.clone(),
            _ => Value::List(items.to_vec()),
        }
    }

    /// Concatenate rendered pieces: text stays text, anything else is
    /// collected into a list.
    pub fn concat(pieces: Vec<Value>) -> Value {
        let textual = pieces
            .iter()
            .all(|v| matches!(v, Value::Str(_) | Value::Char(_) | Value::Int(_) | Value::Unset));
        if textual {
            Value::Str(pieces.iter().map(|v| v.to_string()).collect())
        } else {
            let flat = pieces
                .into_iter()
                .filter(|v| !v.is_unset())
                .flat_map(|v| match v {
                    Value::List(items) => items,
                    other => vec![other],
                })
                .collect();
            Value::List(flat)
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unset => Ok(()),
            Value::Char(c) => write!(f, "{c}"),
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) => items.iter().try_for_each(|v| write!(f, "{v}")),
            Value::Tuple(items) => write!(f, "({})", items.iter().join(", ")),
            Value::Named { name, value } => write!(f, "{name}: {value}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

/// JSON documents map onto structured input: arrays are tuples, single-key
/// objects are named values, other objects are tuples of named values.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Unset,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Str(n.to_string()),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::Tuple(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                let mut entries: Vec<Value> = map
                    .into_iter()
                    .map(|(k, v)| Value::named(k, Value::from(v)))
                    .collect();
                if entries.len() == 1 {
                    entries.remove(0)
                } else {
                    Value::Tuple(entries)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn char_spans_materialize_as_strings() {
        let span = [Value::Char('a'), Value::Char('b')];
        assert_eq!(Value::from_span(&span), Value::str("ab"));
        assert_eq!(Value::from_span(&[]), Value::str(""));
        assert_eq!(Value::from_span(&[Value::Int(3)]), Value::Int(3));
    }

    #[test]
    fn json_objects_become_named_values() {
        let v = Value::from(json!({"point": [1, 2]}));
        assert_eq!(
            v,
            Value::named("point", Value::Tuple(vec![Value::Int(1), Value::Int(2)]))
        );
        assert_eq!(v.to_string(), "point: (1, 2)");
    }

    #[test]
    fn concat_keeps_text_textual() {
        let out = Value::concat(vec![Value::str("n"), Value::Char('+'), Value::Int(2)]);
        assert_eq!(out, Value::str("n+2"));
        let list = Value::concat(vec![Value::Tuple(vec![]), Value::str("x")]);
        assert_eq!(list, Value::List(vec![Value::Tuple(vec![]), Value::str("x")]));
    }
}

//! The rule tree.
//!
//! Nodes are immutable and shared; each node instance carries a unique
//! [`NodeId`] under which the runtime keeps its match sessions. Trees are
//! built with [`build`] or deserialized from JSON.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::Param;

static NEXT_NODE: AtomicUsize = AtomicUsize::new(1);

/// Identity of one node instance in a rule tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A shared rule-tree node.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "ExprKind", into = "ExprKind")]
pub struct Expr(Arc<Node>);

struct Node {
    id: NodeId,
    kind: ExprKind,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        let id = NodeId(NEXT_NODE.fetch_add(1, Ordering::Relaxed));
        Expr(Arc::new(Node { id, kind }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    /// Variables this expression can bind or reference, in first-seen order.
    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<String>) {
        fn push(name: &String, out: &mut Vec<String>) {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        match self.kind() {
            ExprKind::Var(name) => push(name, out),
            ExprKind::Bind { name, pattern } => {
                push(name, out);
                pattern.collect_variables(out);
            }
            ExprKind::Seq(items) | ExprKind::Or(items) | ExprKind::And(items) | ExprKind::Tuple(items) => {
                items.iter().for_each(|e| e.collect_variables(out))
            }
            ExprKind::Not(inner) | ExprKind::Text(inner) => inner.collect_variables(out),
            ExprKind::Repeat { operand, .. } => operand.collect_variables(out),
            ExprKind::Named { value, .. } => value.collect_variables(out),
            ExprKind::Call { target, args, .. } => {
                if let CallTarget::Var(name) = target {
                    push(name, out);
                }
                args.iter().for_each(|e| e.collect_variables(out));
            }
            ExprKind::Function { args, .. } => args.iter().for_each(|e| e.collect_variables(out)),
            ExprKind::Param { body, .. } | ExprKind::Typed { body, .. } => body.collect_variables(out),
            ExprKind::Empty
            | ExprKind::Any
            | ExprKind::Literal(_)
            | ExprKind::Range(..)
            | ExprKind::Anchor(_)
            | ExprKind::Int(_) => {}
        }
    }
}

impl From<ExprKind> for Expr {
    fn from(kind: ExprKind) -> Self {
        Expr::new(kind)
    }
}

impl From<Expr> for ExprKind {
    fn from(expr: Expr) -> Self {
        expr.0.kind.clone()
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind().fmt(f)
    }
}

/// Node kinds. Pattern-side and result-side expressions share one tree type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    /// Matches the empty span.
    Empty,
    /// Any single item.
    Any,
    /// A run of characters.
    Literal(String),
    /// One character in an inclusive range.
    Range(char, char),
    Anchor(Anchor),
    /// One integer item.
    Int(i64),
    /// `$x`: matches the bound value, or binds one item.
    Var(String),
    /// `$x:pattern`: binds the span `pattern` consumed.
    Bind { name: String, pattern: Expr },
    Seq(Vec<Expr>),
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Not(Expr),
    Repeat { operand: Expr, count: Count },
    /// `(p, q, ...)` over one tuple item.
    Tuple(Vec<Expr>),
    /// `name: p` over one named item.
    Named { name: String, value: Expr },
    /// A string item whose characters match the inner pattern.
    Text(Expr),
    /// `<name arg...>`: a rule call.
    Call {
        #[serde(default)]
        module: Option<String>,
        target: CallTarget,
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// A registry function; matched by value, rendered by calling it.
    Function {
        name: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// `[param](body)`: scopes a boolean parameter.
    Param {
        param: Param,
        #[serde(default = "enabled")]
        on: bool,
        body: Expr,
    },
    /// Inline type binding for a call variable.
    Typed { var: String, ty: String, body: Expr },
}

fn enabled() -> bool {
    true
}

impl ExprKind {
    /// Short name used in traces and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            ExprKind::Empty => "empty",
            ExprKind::Any => "any",
            ExprKind::Literal(_) => "literal",
            ExprKind::Range(..) => "range",
            ExprKind::Anchor(_) => "anchor",
            ExprKind::Int(_) => "int",
            ExprKind::Var(_) => "var",
            ExprKind::Bind { .. } => "bind",
            ExprKind::Seq(_) => "seq",
            ExprKind::Or(_) => "or",
            ExprKind::And(_) => "and",
            ExprKind::Not(_) => "not",
            ExprKind::Repeat { .. } => "repeat",
            ExprKind::Tuple(_) => "tuple",
            ExprKind::Named { .. } => "named",
            ExprKind::Text(_) => "text",
            ExprKind::Call { .. } => "call",
            ExprKind::Function { .. } => "function",
            ExprKind::Param { .. } => "param",
            ExprKind::Typed { .. } => "typed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    Start,
    End,
}

/// Repetition counts for `*`, `+`, `?` and `#n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Count {
    Star,
    Plus,
    Optional,
    Exact(usize),
}

impl Count {
    pub fn allows(self, n: usize) -> bool {
        match self {
            Count::Star => true,
            Count::Plus => n > 0,
            Count::Optional => n <= 1,
            Count::Exact(k) => n == k,
        }
    }

    /// No enumeration needs to go deeper than this many repetitions.
    pub fn max(self) -> Option<usize> {
        match self {
            Count::Star | Count::Plus => None,
            Count::Optional => Some(1),
            Count::Exact(k) => Some(k),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallTarget {
    Rule(String),
    /// The rule name is the value of a variable, or enumerated from the
    /// variable's declared type when it is unbound.
    Var(String),
}

/// Constructors for rule trees.
pub mod build {
    use super::*;

    pub fn empty() -> Expr {
        ExprKind::Empty.into()
    }

    pub fn any() -> Expr {
        ExprKind::Any.into()
    }

    pub fn lit(text: &str) -> Expr {
        ExprKind::Literal(text.to_string()).into()
    }

    pub fn range(lo: char, hi: char) -> Expr {
        ExprKind::Range(lo, hi).into()
    }

    pub fn start() -> Expr {
        ExprKind::Anchor(Anchor::Start).into()
    }

    pub fn end() -> Expr {
        ExprKind::Anchor(Anchor::End).into()
    }

    pub fn int(i: i64) -> Expr {
        ExprKind::Int(i).into()
    }

    pub fn var(name: &str) -> Expr {
        ExprKind::Var(name.to_string()).into()
    }

    pub fn bind(name: &str, pattern: Expr) -> Expr {
        ExprKind::Bind {
            name: name.to_string(),
            pattern,
        }
        .into()
    }

    pub fn seq(items: impl IntoIterator<Item = Expr>) -> Expr {
        ExprKind::Seq(items.into_iter().collect()).into()
    }

    pub fn or(items: impl IntoIterator<Item = Expr>) -> Expr {
        ExprKind::Or(items.into_iter().collect()).into()
    }

    pub fn and(items: impl IntoIterator<Item = Expr>) -> Expr {
        ExprKind::And(items.into_iter().collect()).into()
    }

    pub fn not(inner: Expr) -> Expr {
        ExprKind::Not(inner).into()
    }

    pub fn repeat(operand: Expr, count: Count) -> Expr {
        ExprKind::Repeat { operand, count }.into()
    }

    pub fn star(operand: Expr) -> Expr {
        repeat(operand, Count::Star)
    }

    pub fn plus(operand: Expr) -> Expr {
        repeat(operand, Count::Plus)
    }

    pub fn opt(operand: Expr) -> Expr {
        repeat(operand, Count::Optional)
    }

    pub fn exactly(operand: Expr, n: usize) -> Expr {
        repeat(operand, Count::Exact(n))
    }

    pub fn tuple(items: impl IntoIterator<Item = Expr>) -> Expr {
        ExprKind::Tuple(items.into_iter().collect()).into()
    }

    pub fn named(name: &str, value: Expr) -> Expr {
        ExprKind::Named {
            name: name.to_string(),
            value,
        }
        .into()
    }

    pub fn text(inner: Expr) -> Expr {
        ExprKind::Text(inner).into()
    }

    pub fn call(name: &str, args: impl IntoIterator<Item = Expr>) -> Expr {
        ExprKind::Call {
            module: None,
            target: CallTarget::Rule(name.to_string()),
            args: args.into_iter().collect(),
        }
        .into()
    }

    pub fn call_in(module: &str, name: &str, args: impl IntoIterator<Item = Expr>) -> Expr {
        ExprKind::Call {
            module: Some(module.to_string()),
            target: CallTarget::Rule(name.to_string()),
            args: args.into_iter().collect(),
        }
        .into()
    }

    pub fn call_var(var: &str, args: impl IntoIterator<Item = Expr>) -> Expr {
        ExprKind::Call {
            module: None,
            target: CallTarget::Var(var.to_string()),
            args: args.into_iter().collect(),
        }
        .into()
    }

    pub fn func(name: &str, args: impl IntoIterator<Item = Expr>) -> Expr {
        ExprKind::Function {
            name: name.to_string(),
            args: args.into_iter().collect(),
        }
        .into()
    }

    pub fn param(param: Param, body: Expr) -> Expr {
        ExprKind::Param {
            param,
            on: true,
            body,
        }
        .into()
    }

    pub fn without(param: Param, body: Expr) -> Expr {
        ExprKind::Param {
            param,
            on: false,
            body,
        }
        .into()
    }

    pub fn lazy(body: Expr) -> Expr {
        param(Param::Lazy, body)
    }

    pub fn typed(var: &str, ty: &str, body: Expr) -> Expr {
        ExprKind::Typed {
            var: var.to_string(),
            ty: ty.to_string(),
            body,
        }
        .into()
    }
}

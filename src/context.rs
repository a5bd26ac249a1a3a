//! Per-attempt matching environment: variable bindings, scoped parameters,
//! inline type bindings, the preferred-length stack and the derivation trail.
//!
//! Every field is shared copy-on-write, so cloning a context to try a branch
//! is cheap and dropping the clone discards everything the branch bound.

use std::collections::BTreeMap;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::value::Value;

bitflags! {
    /// Boolean parameters, scoped by push/pop around a sub-match.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Params: u16 {
        const IGNORE_WHITESPACE = 1 << 0;
        const KEEP_INITIATOR = 1 << 1;
        const LEFT_DIRECTION = 1 << 2;
        const CAPTURE_MATCH = 1 << 3;
        const CAPTURE_FULL_MATCH = 1 << 4;
        const MULTI_RESULT = 1 << 5;
        const LAZY_QUANTIFIERS = 1 << 6;
        const LINE_ANCHORS = 1 << 7;
        const LEFT_RECURSION = 1 << 8;
        const OPTIONAL_CONTEXT = 1 << 9;
        const CASE_INSENSITIVE = 1 << 10;
        const COLLECT_INTO_LIST = 1 << 11;
    }
}

/// A single parameter, as written in a rule tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    IgnoreWhitespace,
    KeepInitiator,
    LeftDirection,
    CaptureMatch,
    CaptureFullMatch,
    MultiResult,
    Lazy,
    LineAnchors,
    LeftRecursion,
    OptionalContext,
    CaseInsensitive,
    Collect,
}

impl Param {
    pub fn flag(self) -> Params {
        match self {
            Param::IgnoreWhitespace => Params::IGNORE_WHITESPACE,
            Param::KeepInitiator => Params::KEEP_INITIATOR,
            Param::LeftDirection => Params::LEFT_DIRECTION,
            Param::CaptureMatch => Params::CAPTURE_MATCH,
            Param::CaptureFullMatch => Params::CAPTURE_FULL_MATCH,
            Param::MultiResult => Params::MULTI_RESULT,
            Param::Lazy => Params::LAZY_QUANTIFIERS,
            Param::LineAnchors => Params::LINE_ANCHORS,
            Param::LeftRecursion => Params::LEFT_RECURSION,
            Param::OptionalContext => Params::OPTIONAL_CONTEXT,
            Param::CaseInsensitive => Params::CASE_INSENSITIVE,
            Param::Collect => Params::COLLECT_INTO_LIST,
        }
    }
}

/// Variable environment threaded through matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    vars: Arc<BTreeMap<String, Value>>,
    types: Arc<Vec<(String, String)>>,
    params: Params,
    lengths: Arc<Vec<usize>>,
    trail: Arc<Vec<usize>>,
}

impl Context {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    /// A fresh scope for a rule body: no bindings, no inline types, same
    /// parameters.
    pub fn callee(&self) -> Self {
        Self::new(self.params)
    }

    // ---- variables ----

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn bindings(&self) -> &BTreeMap<String, Value> {
        &self.vars
    }

    /// Two contexts describe the same outcome when they bind the same values.
    pub fn same_bindings(&self, other: &Context) -> bool {
        self.vars == other.vars
    }

    /// Bind `name`, or check it against its existing binding.
    ///
    /// Returns `None` when the variable is already bound to a different value.
    pub fn bind(&self, name: &str, value: Value) -> Option<Context> {
        match self.vars.get(name) {
            Some(existing) if *existing == value => Some(self.clone()),
            Some(_) => None,
            None => {
                let mut next = self.clone();
                Arc::make_mut(&mut next.vars).insert(name.to_string(), value);
                Some(next)
            }
        }
    }

    /// Overwrite a binding without the consistency check.
    pub fn set(&mut self, name: &str, value: Value) {
        Arc::make_mut(&mut self.vars).insert(name.to_string(), value);
    }

    pub fn unbind(&mut self, names: &[String]) {
        if names.iter().any(|n| self.vars.contains_key(n)) {
            let vars = Arc::make_mut(&mut self.vars);
            for n in names {
                vars.remove(n);
            }
        }
    }

    // ---- parameters ----

    pub fn params(&self) -> Params {
        self.params
    }

    pub fn param(&self, flag: Params) -> bool {
        self.params.contains(flag)
    }

    pub fn with_param(&self, flag: Params, on: bool) -> Context {
        let mut next = self.clone();
        next.params.set(flag, on);
        next
    }

    /// Pop a parameter scope: restore the parameters an outer scope had.
    pub fn restore_params(&mut self, params: Params) {
        self.params = params;
    }

    // ---- inline type bindings ----

    pub fn push_type(&self, var: &str, ty: &str) -> Context {
        let mut next = self.clone();
        Arc::make_mut(&mut next.types).push((var.to_string(), ty.to_string()));
        next
    }

    pub fn pop_type(&mut self) {
        Arc::make_mut(&mut self.types).pop();
    }

    /// The innermost inline type bound to `var`.
    pub fn type_of(&self, var: &str) -> Option<&str> {
        self.types
            .iter()
            .rev()
            .find(|(v, _)| v == var)
            .map(|(_, ty)| ty.as_str())
    }

    // ---- preferred length stack ----

    pub fn push_length(&self, len: usize) -> Context {
        let mut next = self.clone();
        Arc::make_mut(&mut next.lengths).push(len);
        next
    }

    pub fn pop_length(&mut self) {
        Arc::make_mut(&mut self.lengths).pop();
    }

    pub fn preferred_length(&self) -> Option<usize> {
        self.lengths.last().copied()
    }

    /// Same bindings, no preferred length. Used where matching restarts on
    /// other terms: a nested input or a negation's own check.
    pub fn without_lengths(&self) -> Context {
        Context {
            lengths: Arc::default(),
            ..self.clone()
        }
    }

    pub fn restore_lengths(&mut self, from: &Context) {
        self.lengths = from.lengths.clone();
    }

    // ---- derivation trail ----

    pub fn trail(&self) -> &[usize] {
        &self.trail
    }

    pub fn extend_trail(&mut self, path: &[usize]) {
        if !path.is_empty() {
            Arc::make_mut(&mut self.trail).extend_from_slice(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn repeated_binding_requires_equal_value() {
        let ctx = Context::default();
        let bound = ctx.bind("x", Value::str("ab")).expect("free variable binds");
        assert!(bound.bind("x", Value::str("ab")).is_some());
        assert!(bound.bind("x", Value::str("ac")).is_none());
        // the parent context never saw the binding
        assert!(ctx.get("x").is_none());
    }

    #[test]
    fn scoped_parameters_and_types() {
        let ctx = Context::new(Params::CASE_INSENSITIVE);
        let mut inner = ctx.with_param(Params::LAZY_QUANTIFIERS, true);
        assert!(inner.param(Params::LAZY_QUANTIFIERS));
        inner.restore_params(ctx.params());
        assert_eq!(inner.params(), Params::CASE_INSENSITIVE);

        let typed = ctx.push_type("r", "digit").push_type("r", "letter");
        assert_eq!(typed.type_of("r"), Some("letter"));
        let mut popped = typed.clone();
        popped.pop_type();
        assert_eq!(popped.type_of("r"), Some("digit"));
    }

    #[test]
    fn callee_scope_keeps_parameters_only() {
        let ctx = Context::new(Params::LEFT_RECURSION)
            .bind("x", Value::Int(1))
            .unwrap()
            .push_length(3);
        let callee = ctx.callee();
        assert!(callee.get("x").is_none());
        assert_eq!(callee.preferred_length(), None);
        assert!(callee.param(Params::LEFT_RECURSION));
    }

    #[test]
    fn lengths_can_be_cleared_and_restored() {
        let ctx = Context::default().bind("x", Value::Int(1)).unwrap().push_length(2);
        let mut cleared = ctx.without_lengths();
        assert_eq!(cleared.preferred_length(), None);
        assert_eq!(cleared.get("x"), Some(&Value::Int(1)));
        cleared.restore_lengths(&ctx);
        assert_eq!(cleared.preferred_length(), Some(2));
    }
}

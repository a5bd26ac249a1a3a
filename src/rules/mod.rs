//! Named, parameterised rules grouped into modules.
//!
//! A rule may have several alternatives: definitions sharing a name and an
//! arity are tried in definition order. Modules also declare types, which
//! are sets of rule names a call through an unbound variable enumerates.

pub mod recursion;
pub(crate) mod set;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::expr::Expr;
use crate::functions::{Function, Registry};

/// One alternative of a rule: `<name params…> := body`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDef {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Expr>,
    pub body: Expr,
    /// Resolve calls with seed growing even without the `left_recursion`
    /// parameter.
    #[serde(default)]
    pub left_recursive: bool,
}

impl RuleDef {
    pub fn new(name: &str, params: impl IntoIterator<Item = Expr>, body: Expr) -> Self {
        Self {
            name: name.to_string(),
            params: params.into_iter().collect(),
            body,
            left_recursive: false,
        }
    }

    pub fn left_recursive(mut self) -> Self {
        self.left_recursive = true;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    #[serde(default)]
    pub rules: Vec<RuleDef>,
    /// Type name to the rule names it contains.
    #[serde(default)]
    pub types: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grammar {
    #[serde(default)]
    modules: BTreeMap<String, Module>,
    #[serde(skip, default = "Registry::with_builtins")]
    functions: Registry,
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar {
    /// Module that top-level patterns and unqualified calls start in.
    pub const DEFAULT_MODULE: &'static str = "main";

    pub fn new() -> Self {
        Self {
            modules: BTreeMap::new(),
            functions: Registry::with_builtins(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add an alternative to the default module.
    pub fn rule(mut self, rule: RuleDef) -> Self {
        self.define(Self::DEFAULT_MODULE, rule);
        self
    }

    /// Declare a type in the default module.
    pub fn with_type(mut self, ty: &str, members: &[&str]) -> Self {
        self.declare_type(Self::DEFAULT_MODULE, ty, members);
        self
    }

    pub fn define(&mut self, module: &str, rule: RuleDef) {
        self.modules.entry(module.to_string()).or_default().rules.push(rule);
    }

    pub fn declare_type(&mut self, module: &str, ty: &str, members: &[&str]) {
        self.modules
            .entry(module.to_string())
            .or_default()
            .types
            .insert(ty.to_string(), members.iter().map(|m| m.to_string()).collect());
    }

    pub fn register_function<F: Function + 'static>(&mut self, module: &str, f: F) {
        self.functions.register(module, f);
    }

    pub fn functions(&self) -> &Registry {
        &self.functions
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// The alternatives of `module::name` taking `arity` arguments, in
    /// definition order.
    pub fn lookup(&self, module: &str, name: &str, arity: usize) -> Result<Vec<&RuleDef>> {
        let defined: Vec<&RuleDef> = self
            .modules
            .get(module)
            .map(|m| m.rules.iter().filter(|r| r.name == name).collect())
            .unwrap_or_default();
        if defined.is_empty() {
            return Err(Error::UnknownRule {
                module: module.to_string(),
                name: name.to_string(),
            });
        }
        let matching: Vec<&RuleDef> = defined.iter().copied().filter(|r| r.params.len() == arity).collect();
        if matching.is_empty() {
            let mut expected: Vec<usize> = defined.iter().map(|r| r.params.len()).collect();
            expected.sort_unstable();
            expected.dedup();
            return Err(Error::Arity {
                module: module.to_string(),
                name: name.to_string(),
                expected,
                found: arity,
            });
        }
        Ok(matching)
    }

    pub fn type_members(&self, module: &str, ty: &str) -> Result<&[String]> {
        self.modules
            .get(module)
            .and_then(|m| m.types.get(ty))
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownType(ty.to_string()))
    }
}

//! Binding and unification between two possibly-variable expressions.
//!
//! One side must be ground (free of unbound variables) for unification to
//! resolve on the spot. When neither is, the pair is kept as a
//! [`BindingFormula`] and resolved after the callee has matched.

use crate::context::Context;
use crate::expr::{Expr, ExprKind};
use crate::value::Value;

/// Evaluate a value expression. Anything that is not fully bound, or not a
/// value expression at all, evaluates to [`Value::Unset`].
pub fn evaluate(expr: &Expr, ctx: &Context) -> Value {
    let all = |items: &[Expr]| -> Option<Vec<Value>> {
        items
            .iter()
            .map(|e| Some(evaluate(e, ctx)).filter(|v| !v.is_unset()))
            .collect()
    };
    match expr.kind() {
        ExprKind::Empty => Value::str(""),
        ExprKind::Literal(s) => Value::str(s.as_str()),
        ExprKind::Int(i) => Value::Int(*i),
        ExprKind::Var(name) | ExprKind::Bind { name, .. } => {
            ctx.get(name).cloned().unwrap_or(Value::Unset)
        }
        ExprKind::Tuple(items) => all(items).map(Value::Tuple).unwrap_or(Value::Unset),
        ExprKind::Seq(items) => all(items).map(Value::concat).unwrap_or(Value::Unset),
        ExprKind::Named { name, value } => match evaluate(value, ctx) {
            Value::Unset => Value::Unset,
            v => Value::named(name.as_str(), v),
        },
        ExprKind::Text(inner) => match evaluate(inner, ctx) {
            Value::Unset => Value::Unset,
            v => Value::Str(v.to_string()),
        },
        _ => Value::Unset,
    }
}

/// Whether `expr` has no free variables under `ctx`.
pub fn is_ground(expr: &Expr, ctx: &Context) -> bool {
    match expr.kind() {
        ExprKind::Empty | ExprKind::Literal(_) | ExprKind::Int(_) => true,
        ExprKind::Var(name) | ExprKind::Bind { name, .. } => ctx.is_bound(name),
        ExprKind::Tuple(items) | ExprKind::Seq(items) => items.iter().all(|e| is_ground(e, ctx)),
        ExprKind::Named { value, .. } => is_ground(value, ctx),
        ExprKind::Text(inner) => is_ground(inner, ctx),
        _ => false,
    }
}

/// Bind the free variables of `target` so that it evaluates to `value`.
///
/// Tuples and named values are destructured; ground parts are compared.
pub fn bind_value(target: &Expr, value: &Value, ctx: &Context) -> Option<Context> {
    match (target.kind(), value) {
        (ExprKind::Var(name), _) | (ExprKind::Bind { name, .. }, _) => ctx.bind(name, value.clone()),
        (ExprKind::Tuple(items), Value::Tuple(parts)) | (ExprKind::Tuple(items), Value::List(parts)) => {
            if items.len() != parts.len() {
                return None;
            }
            items
                .iter()
                .zip(parts)
                .try_fold(ctx.clone(), |acc, (item, part)| bind_value(item, part, &acc))
        }
        (
            ExprKind::Named { name, value: inner },
            Value::Named {
                name: actual,
                value: part,
            },
        ) if name == actual => bind_value(inner, part, ctx),
        _ if is_ground(target, ctx) => (evaluate(target, ctx) == *value).then(|| ctx.clone()),
        _ => None,
    }
}

/// A unification that could not be resolved when it was first seen.
#[derive(Debug, Clone)]
pub struct BindingFormula {
    pub target: Expr,
    pub source: Expr,
    /// Free variables of the target at the time the formula was made.
    pub target_vars: Vec<String>,
    /// Free variables of the source at the time the formula was made.
    pub source_vars: Vec<String>,
}

impl BindingFormula {
    fn new(target: &Expr, source: &Expr, target_ctx: &Context, source_ctx: &Context) -> Self {
        let free = |e: &Expr, ctx: &Context| {
            e.variables()
                .into_iter()
                .filter(|v| !ctx.is_bound(v))
                .collect::<Vec<_>>()
        };
        Self {
            target: target.clone(),
            source: source.clone(),
            target_vars: free(target, target_ctx),
            source_vars: free(source, source_ctx),
        }
    }

    /// Evaluate the source in its completed context and bind the result into
    /// the target context. An unset source leaves the target untouched.
    pub fn resolve(&self, source_ctx: &Context, target_ctx: &Context) -> Option<Context> {
        match evaluate(&self.source, source_ctx) {
            Value::Unset => Some(target_ctx.clone()),
            value => bind_value(&self.target, &value, target_ctx),
        }
    }
}

/// Outcome of unifying one pair: both contexts after binding, and a formula
/// when resolution had to be deferred.
pub struct Unified {
    pub target: Context,
    pub source: Context,
    pub deferred: Option<BindingFormula>,
}

pub fn unify(target: &Expr, source: &Expr, target_ctx: &Context, source_ctx: &Context) -> Option<Unified> {
    let done = |target: Context, source: Context| Unified {
        target,
        source,
        deferred: None,
    };
    match (is_ground(target, target_ctx), is_ground(source, source_ctx)) {
        (true, true) => (evaluate(target, target_ctx) == evaluate(source, source_ctx))
            .then(|| done(target_ctx.clone(), source_ctx.clone())),
        (true, false) => {
            let value = evaluate(target, target_ctx);
            let source_ctx = bind_value(source, &value, source_ctx)?;
            Some(done(target_ctx.clone(), source_ctx))
        }
        (false, true) => {
            let value = evaluate(source, source_ctx);
            let target_ctx = bind_value(target, &value, target_ctx)?;
            Some(done(target_ctx, source_ctx.clone()))
        }
        (false, false) => Some(Unified {
            target: target_ctx.clone(),
            source: source_ctx.clone(),
            deferred: Some(BindingFormula::new(target, source, target_ctx, source_ctx)),
        }),
    }
}

/// Unify call arguments (caller side) with formal parameters (callee side)
/// pairwise.
pub fn unify_all(
    args: &[Expr],
    params: &[Expr],
    caller: &Context,
    callee: &Context,
) -> Option<(Context, Context, Vec<BindingFormula>)> {
    let mut caller = caller.clone();
    let mut callee = callee.clone();
    let mut formulas = Vec::new();
    for (arg, param) in args.iter().zip(params) {
        let u = unify(arg, param, &caller, &callee)?;
        caller = u.target;
        callee = u.source;
        formulas.extend(u.deferred);
    }
    Some((caller, callee, formulas))
}

/// Resolve deferred formulas once the callee context is complete.
pub fn resolve_all(formulas: &[BindingFormula], callee: &Context, caller: &Context) -> Option<Context> {
    formulas
        .iter()
        .try_fold(caller.clone(), |acc, f| f.resolve(callee, &acc))
}

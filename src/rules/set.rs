//! Rule calls: resolving the target, unifying arguments with parameters and
//! matching the chosen alternative's body in a fresh callee scope.

use std::borrow::Cow;
use std::sync::Arc;

use crate::context::{Context, Params};
use crate::errors::{Error, Result};
use crate::expr::{CallTarget, Expr, NodeId};
use crate::runtime::{Matcher, Session, SessionId};
use crate::unify::{resolve_all, unify_all, BindingFormula};
use crate::value::Value;

use super::recursion::{self, Replay};

#[derive(Debug)]
pub(crate) enum CallState {
    Direct(Direct),
    Replay(Replay),
}

/// The call node being resolved.
pub(crate) struct Site<'e> {
    pub(crate) node: NodeId,
    pub(crate) target: &'e CallTarget,
    pub(crate) args: &'e [Expr],
}

/// Walks the candidate rules and their alternatives, enumerating each
/// alternative's body before moving on.
#[derive(Debug)]
pub(crate) struct Direct {
    start: usize,
    module: Arc<str>,
    candidates: Vec<String>,
    cand: usize,
    alt: usize,
    body: SessionId,
    caller: Context,
    callee: Context,
    formulas: Vec<BindingFormula>,
}

impl Direct {
    pub(crate) fn new(start: usize, module: Arc<str>, candidates: Vec<String>, body: SessionId, ctx: &Context) -> Self {
        Self {
            start,
            module,
            candidates,
            cand: 0,
            alt: 0,
            body,
            caller: ctx.clone(),
            callee: ctx.callee(),
            formulas: Vec::new(),
        }
    }
}

/// One successful body match.
pub(crate) struct Found {
    /// Caller context; only argument bindings when formulas were skipped.
    pub(crate) caller: Context,
    pub(crate) callee: Context,
    pub(crate) alt: usize,
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn call(
    m: &mut Matcher<'_>,
    node: NodeId,
    sid: SessionId,
    ctx: &Context,
    next: bool,
    module: Option<&str>,
    target: &CallTarget,
    args: &[Expr],
) -> Result<Option<Context>> {
    let site = Site { node, target, args };
    let saved = m.runtime.take(node, sid);
    if next {
        return match saved {
            Some(Session::Call(CallState::Direct(st))) => direct(m, &site, sid, st, ctx, true),
            Some(Session::Call(CallState::Replay(st))) => recursion::replay(m, &site, sid, st, ctx),
            _ => Ok(None),
        };
    }

    let module: Arc<str> = module.map(Arc::from).unwrap_or_else(|| m.module.clone());
    let start = m.position();
    let candidates = candidates(m, &module, target, args.len(), ctx)?;
    if let CallTarget::Rule(name) = target {
        if left_recursive(m, &module, name, args.len(), ctx)? {
            return recursion::call(m, &site, sid, ctx, module, name, start);
        }
    }
    let body = match saved {
        Some(Session::Call(CallState::Direct(old))) => old.body,
        _ => m.fresh_session(),
    };
    let st = Direct::new(start, module, candidates, body, ctx);
    direct(m, &site, sid, st, ctx, false)
}

fn direct(
    m: &mut Matcher<'_>,
    site: &Site<'_>,
    sid: SessionId,
    mut st: Direct,
    ctx: &Context,
    resume: bool,
) -> Result<Option<Context>> {
    match step(m, site, &mut st, ctx, resume, false)? {
        Some(found) => {
            m.runtime.put(site.node, sid, Session::Call(CallState::Direct(st)));
            Ok(Some(found.caller))
        }
        None => {
            m.seek(st.start);
            Ok(None)
        }
    }
}

/// Rule names a call may resolve to. A call through a bound variable uses its
/// value; through an unbound one, every member of the variable's declared
/// type that takes this many arguments.
fn candidates(
    m: &Matcher<'_>,
    module: &str,
    target: &CallTarget,
    arity: usize,
    ctx: &Context,
) -> Result<Vec<String>> {
    let grammar = m.grammar;
    match target {
        CallTarget::Rule(name) => {
            grammar.lookup(module, name, arity)?;
            Ok(vec![name.clone()])
        }
        CallTarget::Var(var) => {
            if let Some(value) = ctx.get(var) {
                let name = value.to_string();
                grammar.lookup(module, &name, arity)?;
                return Ok(vec![name]);
            }
            let ty = ctx
                .type_of(var)
                .ok_or_else(|| Error::UntypedCall(var.clone()))?;
            let mut names = Vec::new();
            for member in grammar.type_members(module, ty)? {
                match grammar.lookup(module, member, arity) {
                    Ok(_) => names.push(member.clone()),
                    Err(Error::Arity { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
            Ok(names)
        }
    }
}

fn left_recursive(m: &Matcher<'_>, module: &str, name: &str, arity: usize, ctx: &Context) -> Result<bool> {
    if ctx.param(Params::LEFT_RECURSION) {
        return Ok(true);
    }
    Ok(m.grammar.lookup(module, name, arity)?.iter().any(|r| r.left_recursive))
}

/// Produce the next successful body match. With `collect_only` the deferred
/// formulas are left unresolved and the raw callee context is returned; the
/// growth loop resolves them later, per caller.
pub(crate) fn step(
    m: &mut Matcher<'_>,
    site: &Site<'_>,
    st: &mut Direct,
    ctx: &Context,
    mut resume: bool,
    collect_only: bool,
) -> Result<Option<Found>> {
    let grammar = m.grammar;
    loop {
        let Some(name) = st.candidates.get(st.cand) else {
            return Ok(None);
        };
        let alts = grammar.lookup(&st.module, name, site.args.len())?;
        let Some(rule) = alts.get(st.alt).copied() else {
            st.cand += 1;
            st.alt = 0;
            resume = false;
            continue;
        };
        if !resume {
            match unify_all(site.args, &rule.params, ctx, &ctx.callee()) {
                Some((caller, callee, formulas)) => {
                    st.caller = caller;
                    st.callee = callee;
                    st.formulas = formulas;
                }
                None => {
                    st.alt += 1;
                    continue;
                }
            }
        }

        m.seek(st.start);
        let module = st.module.clone();
        let label = Cow::Owned(format!("<{name}>"));
        let (body, callee) = (st.body, &st.callee);
        let found = m.with_frame(site.node, st.alt, label, |m| {
            m.in_module(&module, |m| rule.body.matches(m, body, callee, resume))
        })?;
        let Some(callee_out) = found else {
            st.alt += 1;
            resume = false;
            continue;
        };
        resume = true;

        if collect_only {
            return Ok(Some(Found {
                caller: st.caller.clone(),
                callee: callee_out,
                alt: st.alt,
            }));
        }
        if let Some(caller) = finish(m, site.target, &st.caller, &st.formulas, &callee_out, name, st.start) {
            return Ok(Some(Found {
                caller,
                callee: callee_out,
                alt: st.alt,
            }));
        }
    }
}

/// Complete a call in the caller's scope: resolve deferred formulas against
/// the finished callee, bind a call variable to the chosen rule, and capture
/// the span under the rule name when `CAPTURE_MATCH` is on.
pub(crate) fn finish(
    m: &mut Matcher<'_>,
    target: &CallTarget,
    caller: &Context,
    formulas: &[BindingFormula],
    callee: &Context,
    name: &str,
    start: usize,
) -> Option<Context> {
    let mut out = resolve_all(formulas, callee, caller)?;
    if let CallTarget::Var(var) = target {
        out = out.bind(var, Value::str(name))?;
    }
    if out.param(Params::CAPTURE_MATCH) {
        let span = m.input.span(start, m.position());
        out = out.bind(name, span)?;
    }
    Some(out)
}

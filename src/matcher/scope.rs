//! Nodes that wrap one operand: captures, parameter scopes and inline types.

use crate::context::{Context, Params};
use crate::errors::Result;
use crate::expr::{Expr, NodeId};
use crate::runtime::{Matcher, Session, SessionId};

#[derive(Debug)]
pub(crate) struct BindState {
    start: usize,
}

/// `$name:pattern` binds the span the pattern consumed. Alternatives whose
/// span disagrees with an existing binding are skipped.
pub(super) fn bind(
    m: &mut Matcher<'_>,
    node: NodeId,
    sid: SessionId,
    ctx: &Context,
    next: bool,
    name: &str,
    pattern: &Expr,
) -> Result<Option<Context>> {
    let start = if next {
        match m.runtime.take(node, sid) {
            Some(Session::Bind(st)) => st.start,
            _ => return Ok(None),
        }
    } else {
        m.position()
    };
    let mut resume = next;
    loop {
        let Some(out) = pattern.matches(m, sid, ctx, resume)? else {
            m.seek(start);
            return Ok(None);
        };
        resume = true;
        let span = m.input.span(start, m.position());
        if let Some(bound) = out.bind(name, span) {
            m.runtime.put(node, sid, Session::Bind(BindState { start }));
            return Ok(Some(bound));
        }
    }
}

/// Run `body` with one parameter switched; the outer parameters come back on
/// every result.
pub(super) fn param(
    m: &mut Matcher<'_>,
    sid: SessionId,
    ctx: &Context,
    next: bool,
    flag: Params,
    on: bool,
    body: &Expr,
) -> Result<Option<Context>> {
    let inner = ctx.with_param(flag, on);
    Ok(body.matches(m, sid, &inner, next)?.map(|mut out| {
        out.restore_params(ctx.params());
        out
    }))
}

/// Run `body` with `$var` declared as type `ty` for calls through it.
pub(super) fn typed(
    m: &mut Matcher<'_>,
    sid: SessionId,
    ctx: &Context,
    next: bool,
    var: &str,
    ty: &str,
    body: &Expr,
) -> Result<Option<Context>> {
    let inner = ctx.push_type(var, ty);
    Ok(body.matches(m, sid, &inner, next)?.map(|mut out| {
        out.pop_type();
        out
    }))
}

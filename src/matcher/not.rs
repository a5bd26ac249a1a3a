//! Negation that can consume input.

use crate::context::Context;
use crate::errors::Result;
use crate::expr::{Expr, NodeId};
use crate::runtime::{Matcher, Session, SessionId};

#[derive(Debug)]
pub(crate) struct NotState {
    start: usize,
    len: usize,
}

/// `!X` first matches the empty span, provided `X` fails at the start. Each
/// resumption widens the span by one item; a span of `L >= 2` additionally
/// needs `X` to fail at `start + L - 1`. The span never outgrows the
/// preferred length set by an enclosing conjunction, nor the input.
pub(super) fn not(
    m: &mut Matcher<'_>,
    node: NodeId,
    sid: SessionId,
    ctx: &Context,
    next: bool,
    inner: &Expr,
) -> Result<Option<Context>> {
    if !next {
        let start = m.position();
        if succeeds_at(m, inner, ctx, start)? {
            m.seek(start);
            return Ok(None);
        }
        m.seek(start);
        m.runtime.put(node, sid, Session::Not(NotState { start, len: 0 }));
        return Ok(Some(ctx.clone()));
    }

    let Some(Session::Not(mut st)) = m.runtime.take(node, sid) else {
        return Ok(None);
    };
    let len = st.len + 1;
    let exhausted = ctx.preferred_length().is_some_and(|max| len > max) || {
        m.seek(st.start + len - 1);
        m.input.at_end()
    };
    if exhausted || (len >= 2 && succeeds_at(m, inner, ctx, st.start + len - 1)?) {
        m.seek(st.start);
        return Ok(None);
    }
    st.len = len;
    m.seek(st.start + len);
    m.runtime.put(node, sid, Session::Not(st));
    Ok(Some(ctx.clone()))
}

/// Whether `inner` has any match at `pos`, as a fresh enumeration. The check
/// ignores any enclosing preferred length and is never resumed, so every
/// session it leaves suspended is dropped.
fn succeeds_at(m: &mut Matcher<'_>, inner: &Expr, ctx: &Context, pos: usize) -> Result<bool> {
    m.seek(pos);
    let check = m.fresh_session();
    let found = inner.matches(m, check, &ctx.without_lengths(), false);
    m.runtime.discard_sessions_from(check);
    Ok(found?.is_some())
}

//! Concatenation and ordered choice.

use crate::context::Context;
use crate::errors::Result;
use crate::expr::{Expr, NodeId};
use crate::runtime::{Matcher, Session, SessionId};

#[derive(Debug)]
pub(crate) struct SeqState {
    start: usize,
    sids: Vec<SessionId>,
    /// `ctxs[i]` and `positions[i]` are the input to operand `i`; the last
    /// entries are the sequence's result.
    ctxs: Vec<Context>,
    positions: Vec<usize>,
}

#[derive(Debug)]
pub(crate) struct OrState {
    start: usize,
    sids: Vec<SessionId>,
    current: usize,
}

/// Child sessions survive restarts of the same parent session, so a child
/// only ever sees one caller.
fn child_sessions(m: &mut Matcher<'_>, previous: Option<Vec<SessionId>>, n: usize) -> Vec<SessionId> {
    match previous {
        Some(sids) if sids.len() == n => sids,
        _ => (0..n).map(|_| m.fresh_session()).collect(),
    }
}

pub(super) fn seq(
    m: &mut Matcher<'_>,
    node: NodeId,
    sid: SessionId,
    ctx: &Context,
    next: bool,
    items: &[Expr],
) -> Result<Option<Context>> {
    run_sequence(m, node, sid, ctx, next, items, "seq")
}

/// Match `items` one after another, backtracking chronologically: when an
/// operand runs out of alternatives the previous one is asked for its next.
pub(crate) fn run_sequence(
    m: &mut Matcher<'_>,
    node: NodeId,
    sid: SessionId,
    ctx: &Context,
    next: bool,
    items: &[Expr],
    label: &'static str,
) -> Result<Option<Context>> {
    let n = items.len();
    let saved = m.runtime.take(node, sid);
    let (mut st, mut i, mut resume) = if next {
        let Some(Session::Seq(mut st)) = saved else {
            return Ok(None);
        };
        if n == 0 {
            m.seek(st.start);
            return Ok(None);
        }
        st.ctxs.truncate(n);
        st.positions.truncate(n);
        (st, n - 1, true)
    } else {
        let previous = match saved {
            Some(Session::Seq(old)) => Some(old.sids),
            _ => None,
        };
        let start = m.position();
        let st = SeqState {
            start,
            sids: child_sessions(m, previous, n),
            ctxs: vec![ctx.clone()],
            positions: vec![start],
        };
        (st, 0, false)
    };

    loop {
        if i == n {
            let out = st.ctxs[n].clone();
            m.seek(st.positions[n]);
            m.runtime.put(node, sid, Session::Seq(st));
            return Ok(Some(out));
        }
        m.seek(st.positions[i]);
        let found = m.with_frame(node, i, label, |m| {
            items[i].matches(m, st.sids[i], &st.ctxs[i], resume)
        })?;
        match found {
            Some(out) => {
                st.ctxs.push(out);
                st.positions.push(m.position());
                i += 1;
                resume = false;
            }
            None if i == 0 => {
                m.seek(st.start);
                return Ok(None);
            }
            None => {
                i -= 1;
                st.ctxs.truncate(i + 1);
                st.positions.truncate(i + 1);
                resume = true;
            }
        }
    }
}

/// Try each branch at the same start, in order, exhausting one before
/// moving on to the next.
pub(super) fn or(
    m: &mut Matcher<'_>,
    node: NodeId,
    sid: SessionId,
    ctx: &Context,
    next: bool,
    items: &[Expr],
) -> Result<Option<Context>> {
    let saved = m.runtime.take(node, sid);
    let (mut st, mut resume) = if next {
        let Some(Session::Or(st)) = saved else {
            return Ok(None);
        };
        (st, true)
    } else {
        let previous = match saved {
            Some(Session::Or(old)) => Some(old.sids),
            _ => None,
        };
        let st = OrState {
            start: m.position(),
            sids: child_sessions(m, previous, items.len()),
            current: 0,
        };
        (st, false)
    };

    while st.current < items.len() {
        let i = st.current;
        m.seek(st.start);
        let found = m.with_frame(node, i, "or", |m| items[i].matches(m, st.sids[i], ctx, resume))?;
        if let Some(out) = found {
            m.runtime.put(node, sid, Session::Or(st));
            return Ok(Some(out));
        }
        st.current += 1;
        resume = false;
    }
    m.seek(st.start);
    Ok(None)
}

//! Conjunction: every operand must match the same span.

use crate::context::Context;
use crate::errors::Result;
use crate::expr::{Expr, NodeId};
use crate::runtime::{Matcher, Session, SessionId};

#[derive(Debug)]
pub(crate) struct AndState {
    start: usize,
    /// End of the span the first operand chose.
    target: usize,
    sids: Vec<SessionId>,
    ctxs: Vec<Context>,
}

/// The first operand picks the span; the others run from the same start with
/// that span's length as their preferred length, and only alternatives that
/// end exactly there count. Backtracking walks the operands like a sequence.
pub(super) fn and(
    m: &mut Matcher<'_>,
    node: NodeId,
    sid: SessionId,
    ctx: &Context,
    next: bool,
    items: &[Expr],
) -> Result<Option<Context>> {
    let n = items.len();
    let saved = m.runtime.take(node, sid);
    let (mut st, mut i, mut resume) = if next {
        let Some(Session::And(mut st)) = saved else {
            return Ok(None);
        };
        if n == 0 {
            m.seek(st.start);
            return Ok(None);
        }
        st.ctxs.truncate(n);
        (st, n - 1, true)
    } else {
        let sids = match saved {
            Some(Session::And(old)) if old.sids.len() == n => old.sids,
            _ => (0..n).map(|_| m.fresh_session()).collect(),
        };
        let start = m.position();
        let st = AndState {
            start,
            target: start,
            sids,
            ctxs: vec![ctx.clone()],
        };
        (st, 0, false)
    };

    loop {
        if i == n {
            let out = st.ctxs[n].clone();
            m.seek(st.target);
            m.runtime.put(node, sid, Session::And(st));
            return Ok(Some(out));
        }
        m.seek(st.start);
        let input = if i == 0 {
            st.ctxs[0].clone()
        } else {
            st.ctxs[i].push_length(st.target - st.start)
        };
        let found = m.with_frame(node, i, "and", |m| items[i].matches(m, st.sids[i], &input, resume))?;
        match found {
            Some(mut out) => {
                resume = true;
                let end = m.position();
                if i == 0 {
                    st.target = end;
                } else if end != st.target {
                    continue;
                } else {
                    out.pop_length();
                }
                st.ctxs.push(out);
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
                resume = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::enumerate;
    use crate::expr::build::*;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn operands_share_the_span() {
        // a word with no "x" in it
        let word = bind("x", plus(range('a', 'z')));
        let p = and([word, not(lit("x"))]);
        assert_eq!(
            enumerate(&p, "abxd", "x"),
            vec![(2, Some(Value::str("ab"))), (1, Some(Value::str("a")))]
        );
    }

    #[test]
    fn later_operands_must_end_at_the_target() {
        let p = and([bind("x", or([lit("ab"), lit("a")])), lit("a")]);
        assert_eq!(enumerate(&p, "ab", "x"), vec![(1, Some(Value::str("a")))]);
    }
}

//! Repetition: `*`, `+`, `?` and `#n`.
//!
//! Greedy repetition explores the operand depth-first once, collects every
//! distinct `(count, context, end)` outcome and offers them from most to
//! fewest repetitions. Lazy repetition (`LAZY_QUANTIFIERS`) walks the same
//! tree pre-order instead, so it offers fewest repetitions first. Either way
//! the count predicate is applied as alternatives are offered, and a
//! repetition that consumes nothing is never counted.

use crate::context::{Context, Params};
use crate::errors::Result;
use crate::expr::{Count, Expr, NodeId};
use crate::runtime::{Matcher, Session, SessionId};
use crate::value::Value;

#[derive(Debug)]
pub(crate) enum RepeatState {
    Greedy(Greedy),
    Lazy(Lazy),
}

#[derive(Debug)]
pub(crate) struct Greedy {
    start: usize,
    outcomes: Vec<Outcome>,
    offered: usize,
}

#[derive(Debug)]
pub(crate) struct Lazy {
    start: usize,
    levels: Vec<Level>,
    /// Accumulated context and end of the deepest repetition reached.
    last: (Context, usize),
    sids: Vec<SessionId>,
}

#[derive(Debug, Clone, PartialEq)]
struct Outcome {
    count: usize,
    ctx: Context,
    end: usize,
}

/// One repetition in progress: its input and whether its operand session has
/// already produced an alternative.
#[derive(Debug)]
struct Level {
    acc: Context,
    pos: usize,
    started: bool,
}

/// Under `COLLECT_INTO_LIST`, each variable the operand binds gets a list of
/// its values across repetitions instead of one value that every repetition
/// has to agree on.
struct Collector {
    names: Vec<String>,
}

impl Collector {
    fn new(operand: &Expr, ctx: &Context) -> Self {
        let names = if ctx.param(Params::COLLECT_INTO_LIST) {
            operand
                .variables()
                .into_iter()
                .filter(|name| !ctx.is_bound(name))
                .collect()
        } else {
            Vec::new()
        };
        Self { names }
    }

    /// Context for zero repetitions.
    fn zero(&self, ctx: &Context) -> Context {
        let mut out = ctx.clone();
        for name in &self.names {
            out.set(name, Value::List(Vec::new()));
        }
        out
    }

    /// Context one repetition starts from.
    fn input(&self, acc: &Context) -> Context {
        let mut out = acc.clone();
        out.unbind(&self.names);
        out
    }

    /// Fold one repetition's result into the accumulated lists.
    fn merge(&self, acc: &Context, rep: Context) -> Context {
        if self.names.is_empty() {
            return rep;
        }
        let mut out = rep.clone();
        for name in &self.names {
            let mut list = match acc.get(name) {
                Some(Value::List(items)) => items.clone(),
                _ => Vec::new(),
            };
            list.extend(rep.get(name).cloned());
            out.set(name, Value::List(list));
        }
        out
    }
}

fn level_session(m: &mut Matcher<'_>, sids: &mut Vec<SessionId>, depth: usize) -> SessionId {
    while sids.len() <= depth {
        sids.push(m.fresh_session());
    }
    sids[depth]
}

/// Ask the operand at the top of `levels` for its next alternative. Returns
/// the merged context and end of a repetition that consumed input, or `None`
/// once the top level is exhausted (the level is then popped).
fn advance(
    m: &mut Matcher<'_>,
    operand: &Expr,
    collector: &Collector,
    levels: &mut Vec<Level>,
    sids: &mut Vec<SessionId>,
) -> Result<Option<(Context, usize)>> {
    let depth = levels.len() - 1;
    let sid = level_session(m, sids, depth);
    loop {
        let level = &mut levels[depth];
        let resume = level.started;
        level.started = true;
        let input = collector.input(&level.acc);
        let pos = level.pos;
        m.seek(pos);
        match operand.matches(m, sid, &input, resume)? {
            Some(rep) if m.position() != pos => {
                let end = m.position();
                return Ok(Some((collector.merge(&levels[depth].acc, rep), end)));
            }
            // consumed nothing: not a repetition, ask again
            Some(_) => {}
            None => {
                levels.pop();
                return Ok(None);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn repeat(
    m: &mut Matcher<'_>,
    node: NodeId,
    sid: SessionId,
    ctx: &Context,
    next: bool,
    operand: &Expr,
    count: Count,
) -> Result<Option<Context>> {
    let collector = Collector::new(operand, ctx);
    let lazy = ctx.param(Params::LAZY_QUANTIFIERS);
    let saved = m.runtime.take(node, sid);
    if next {
        return match saved {
            Some(Session::Repeat(RepeatState::Greedy(st))) => offer(m, node, sid, st, count),
            Some(Session::Repeat(RepeatState::Lazy(st))) => {
                lazy_next(m, node, sid, st, operand, count, &collector, true)
            }
            _ => Ok(None),
        };
    }

    let start = m.position();
    let zero = collector.zero(ctx);
    if lazy {
        let sids = match saved {
            Some(Session::Repeat(RepeatState::Lazy(old))) => old.sids,
            _ => Vec::new(),
        };
        let st = Lazy {
            start,
            levels: Vec::new(),
            last: (zero.clone(), start),
            sids,
        };
        if count.allows(0) {
            m.runtime.put(node, sid, Session::Repeat(RepeatState::Lazy(st)));
            return Ok(Some(zero));
        }
        return lazy_next(m, node, sid, st, operand, count, &collector, true);
    }

    let outcomes = explore(m, operand, &collector, zero, start, count)?;
    let st = Greedy {
        start,
        outcomes,
        offered: 0,
    };
    offer(m, node, sid, st, count)
}

/// Depth-first enumeration of every repetition chain. Chains stop where the
/// operand has no further alternative or the count's maximum is reached.
fn explore(
    m: &mut Matcher<'_>,
    operand: &Expr,
    collector: &Collector,
    zero: Context,
    start: usize,
    count: Count,
) -> Result<Vec<Outcome>> {
    let max = count.max();
    let mut outcomes = vec![Outcome {
        count: 0,
        ctx: zero.clone(),
        end: start,
    }];
    let mut levels = Vec::new();
    let mut sids = Vec::new();
    if max != Some(0) {
        levels.push(Level {
            acc: zero,
            pos: start,
            started: false,
        });
    }
    while !levels.is_empty() {
        let Some((acc, end)) = advance(m, operand, collector, &mut levels, &mut sids)? else {
            continue;
        };
        let count = levels.len();
        let outcome = Outcome {
            count,
            ctx: acc.clone(),
            end,
        };
        if !outcomes.contains(&outcome) {
            outcomes.push(outcome);
        }
        if max.map_or(true, |max| count < max) {
            levels.push(Level {
                acc,
                pos: end,
                started: false,
            });
        }
    }
    // most repetitions first, then the longest span; stable otherwise
    outcomes.sort_by(|a, b| (b.count, b.end).cmp(&(a.count, a.end)));
    m.seek(start);
    Ok(outcomes)
}

fn offer(
    m: &mut Matcher<'_>,
    node: NodeId,
    sid: SessionId,
    mut st: Greedy,
    count: Count,
) -> Result<Option<Context>> {
    while st.offered < st.outcomes.len() {
        let outcome = &st.outcomes[st.offered];
        st.offered += 1;
        if count.allows(outcome.count) {
            let out = outcome.ctx.clone();
            m.seek(outcome.end);
            m.runtime.put(node, sid, Session::Repeat(RepeatState::Greedy(st)));
            return Ok(Some(out));
        }
    }
    m.seek(st.start);
    Ok(None)
}

/// Pre-order walk: after yielding `n` repetitions, first try to extend to
/// `n + 1`, and only then fall back to the next alternative of repetition `n`.
#[allow(clippy::too_many_arguments)]
fn lazy_next(
    m: &mut Matcher<'_>,
    node: NodeId,
    sid: SessionId,
    mut st: Lazy,
    operand: &Expr,
    count: Count,
    collector: &Collector,
    mut extend: bool,
) -> Result<Option<Context>> {
    let max = count.max();
    loop {
        if extend && max.map_or(true, |max| st.levels.len() < max) {
            let (acc, pos) = st.last.clone();
            st.levels.push(Level {
                acc,
                pos,
                started: false,
            });
        }
        extend = false;
        if st.levels.is_empty() {
            m.seek(st.start);
            return Ok(None);
        }
        let Some((acc, end)) = advance(m, operand, collector, &mut st.levels, &mut st.sids)? else {
            continue;
        };
        st.last = (acc.clone(), end);
        if count.allows(st.levels.len()) {
            m.seek(end);
            m.runtime.put(node, sid, Session::Repeat(RepeatState::Lazy(st)));
            return Ok(Some(acc));
        }
        extend = true;
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Param;
    use crate::expr::build::*;
    use crate::matcher::tests::enumerate;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn ends(pattern: &crate::expr::Expr, text: &str) -> Vec<usize> {
        enumerate(pattern, text, "x").into_iter().map(|(end, _)| end).collect()
    }

    #[test]
    fn greedy_offers_most_repetitions_first() {
        assert_eq!(ends(&star(lit("a")), "aaa"), vec![3, 2, 1, 0]);
        assert_eq!(ends(&plus(lit("a")), "aaa"), vec![3, 2, 1]);
        assert_eq!(ends(&opt(lit("a")), "aaa"), vec![1, 0]);
        assert_eq!(ends(&exactly(lit("a"), 2), "aaa"), vec![2]);
        assert_eq!(ends(&exactly(lit("a"), 4), "aaa"), Vec::<usize>::new());
    }

    #[test]
    fn lazy_offers_fewest_repetitions_first() {
        assert_eq!(ends(&lazy(star(lit("a"))), "aaa"), vec![0, 1, 2, 3]);
        assert_eq!(ends(&lazy(plus(lit("a"))), "aaa"), vec![1, 2, 3]);
        assert_eq!(ends(&lazy(exactly(lit("a"), 3)), "aaaa"), vec![3]);
    }

    #[test]
    fn zero_width_repetitions_do_not_count() {
        assert_eq!(ends(&star(opt(lit("a"))), "aa"), vec![2, 1, 0]);
        assert_eq!(ends(&lazy(star(opt(lit("a")))), "aa"), vec![0, 1, 2]);
    }

    #[test]
    fn operand_alternatives_are_explored() {
        // each repetition may take one or two characters
        let p = bind("x", star(or([lit("a"), lit("aa")])));
        let found = enumerate(&p, "aa", "x");
        assert_eq!(
            found,
            vec![
                (2, Some(Value::str("aa"))),
                (2, Some(Value::str("aa"))),
                (1, Some(Value::str("a"))),
                (0, Some(Value::str(""))),
            ]
        );
    }

    #[test]
    fn collect_mode_builds_lists() {
        let p = param(Param::Collect, star(seq([bind("x", range('a', 'z')), lit(",")])));
        let found = enumerate(&p, "a,b,", "x");
        assert_eq!(
            found[0],
            (4, Some(Value::List(vec![Value::str("a"), Value::str("b")])))
        );
        assert_eq!(found.last().cloned(), Some((0, Some(Value::List(vec![])))));
    }
}

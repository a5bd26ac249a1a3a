//! The resumable matching protocol.
//!
//! Every pattern node answers [`Expr::matches`]. A call with `next == false`
//! starts a fresh enumeration at the current cursor; `next == true` resumes
//! the enumeration saved under the same `(node, session)` key and yields the
//! following alternative. `Ok(None)` means no (further) alternative, and the
//! cursor is then back where the enumeration started. `Err` is reserved for
//! fatal conditions that abort the whole transformation.

mod and;
mod leaf;
mod not;
mod scope;
mod sequence;
mod structure;

pub(crate) use and::AndState;
pub(crate) use leaf::LeafState;
pub(crate) use not::NotState;
pub(crate) use scope::BindState;
pub(crate) use sequence::{run_sequence, OrState, SeqState};
pub(crate) use structure::StructState;

use crate::context::Context;
use crate::errors::Result;
use crate::expr::{Expr, ExprKind};
use crate::quantifier;
use crate::rules::set;
use crate::runtime::{Matcher, Session, SessionId};
use crate::stack::ensure_sufficient_stack;

impl Expr {
    /// Produce the first (`next == false`) or following (`next == true`)
    /// way this node matches at the cursor.
    pub fn matches(
        &self,
        m: &mut Matcher<'_>,
        sid: SessionId,
        ctx: &Context,
        next: bool,
    ) -> Result<Option<Context>> {
        if m.runtime.poll_cancel() {
            return Ok(None);
        }
        m.runtime.enter()?;
        let out = ensure_sufficient_stack(|| self.dispatch(m, sid, ctx, next));
        m.runtime.leave();
        out
    }

    fn dispatch(
        &self,
        m: &mut Matcher<'_>,
        sid: SessionId,
        ctx: &Context,
        next: bool,
    ) -> Result<Option<Context>> {
        let id = self.id();
        match self.kind() {
            ExprKind::Empty => single(m, self, sid, next, |_| Ok(Some(ctx.clone()))),
            ExprKind::Any => single(m, self, sid, next, |m| Ok(leaf::any(m, ctx))),
            ExprKind::Literal(text) => single(m, self, sid, next, |m| Ok(leaf::literal(m, ctx, text))),
            ExprKind::Range(lo, hi) => single(m, self, sid, next, |m| Ok(leaf::range(m, ctx, *lo, *hi))),
            ExprKind::Anchor(anchor) => single(m, self, sid, next, |m| Ok(leaf::anchor(m, ctx, *anchor))),
            ExprKind::Int(i) => single(m, self, sid, next, |m| Ok(leaf::int(m, ctx, *i))),
            ExprKind::Var(name) => single(m, self, sid, next, |m| Ok(leaf::variable(m, ctx, name))),
            ExprKind::Function { .. } => single(m, self, sid, next, |m| leaf::function(m, ctx, self)),
            ExprKind::Bind { name, pattern } => scope::bind(m, id, sid, ctx, next, name, pattern),
            ExprKind::Param { param, on, body } => scope::param(m, sid, ctx, next, param.flag(), *on, body),
            ExprKind::Typed { var, ty, body } => scope::typed(m, sid, ctx, next, var, ty, body),
            ExprKind::Seq(items) => sequence::seq(m, id, sid, ctx, next, items),
            ExprKind::Or(items) => sequence::or(m, id, sid, ctx, next, items),
            ExprKind::And(items) => and::and(m, id, sid, ctx, next, items),
            ExprKind::Not(inner) => not::not(m, id, sid, ctx, next, inner),
            ExprKind::Repeat { operand, count } => quantifier::repeat(m, id, sid, ctx, next, operand, *count),
            ExprKind::Tuple(items) => structure::tuple(m, id, sid, ctx, next, items),
            ExprKind::Named { name, value } => structure::named(m, id, sid, ctx, next, name, value),
            ExprKind::Text(inner) => structure::text(m, id, sid, ctx, next, inner),
            ExprKind::Call { module, target, args } => {
                set::call(m, id, sid, ctx, next, module.as_deref(), target, args)
            }
        }
    }
}

/// Drive a node that matches at most one way. The first call runs `attempt`;
/// resuming only restores the cursor and reports exhaustion.
fn single(
    m: &mut Matcher<'_>,
    node: &Expr,
    sid: SessionId,
    next: bool,
    attempt: impl FnOnce(&mut Matcher<'_>) -> Result<Option<Context>>,
) -> Result<Option<Context>> {
    if next {
        if let Some(Session::Leaf(state)) = m.runtime.take(node.id(), sid) {
            m.seek(state.start);
        }
        return Ok(None);
    }
    let start = m.position();
    match attempt(m)? {
        Some(ctx) => {
            m.runtime.put(node.id(), sid, Session::Leaf(LeafState { start }));
            Ok(Some(ctx))
        }
        None => {
            m.seek(start);
            Ok(None)
        }
    }
}

//! Matching inside a single structured input item.
//!
//! A tuple, named value or string item is opened up as a nested input and
//! the inner patterns run against its parts. Unless `OPTIONAL_CONTEXT` is
//! set the inner patterns must consume every part.

use std::slice;

use crate::context::{Context, Params};
use crate::errors::Result;
use crate::expr::{Expr, NodeId};
use crate::runtime::{Matcher, Session, SessionId};
use crate::value::Value;

use super::run_sequence;

#[derive(Debug)]
pub(crate) struct StructState {
    start: usize,
    parts: Vec<Value>,
    inner: SessionId,
}

pub(super) fn tuple(
    m: &mut Matcher<'_>,
    node: NodeId,
    sid: SessionId,
    ctx: &Context,
    next: bool,
    items: &[Expr],
) -> Result<Option<Context>> {
    let open = |item: &Value| match item {
        Value::Tuple(parts) | Value::List(parts) => Some(parts.clone()),
        _ => None,
    };
    structured(m, node, sid, ctx, next, items, "tuple", open)
}

/// The value of `name: pattern` is matched as a single item.
pub(super) fn named(
    m: &mut Matcher<'_>,
    node: NodeId,
    sid: SessionId,
    ctx: &Context,
    next: bool,
    name: &str,
    value: &Expr,
) -> Result<Option<Context>> {
    let open = |item: &Value| match item {
        Value::Named { name: actual, value: inner } if actual == name => Some(vec![(**inner).clone()]),
        _ => None,
    };
    structured(m, node, sid, ctx, next, slice::from_ref(value), "named", open)
}

pub(super) fn text(
    m: &mut Matcher<'_>,
    node: NodeId,
    sid: SessionId,
    ctx: &Context,
    next: bool,
    inner: &Expr,
) -> Result<Option<Context>> {
    let open = |item: &Value| match item {
        Value::Str(_) | Value::Char(_) => Some(item.parts()),
        _ => None,
    };
    structured(m, node, sid, ctx, next, slice::from_ref(inner), "text", open)
}

#[allow(clippy::too_many_arguments)]
fn structured(
    m: &mut Matcher<'_>,
    node: NodeId,
    sid: SessionId,
    ctx: &Context,
    next: bool,
    items: &[Expr],
    label: &'static str,
    open: impl Fn(&Value) -> Option<Vec<Value>>,
) -> Result<Option<Context>> {
    let saved = m.runtime.take(node, sid);
    let st = if next {
        match saved {
            Some(Session::Struct(st)) => st,
            _ => return Ok(None),
        }
    } else {
        let start = m.position();
        let item = m.input.read();
        let Some(parts) = item.as_ref().and_then(&open) else {
            m.seek(start);
            m.fail_at(start, item);
            return Ok(None);
        };
        let inner = match saved {
            Some(Session::Struct(old)) => old.inner,
            _ => m.fresh_session(),
        };
        StructState { start, parts, inner }
    };

    let partial = ctx.param(Params::OPTIONAL_CONTEXT);
    // a preferred length counts items of the outer input only
    let inside = ctx.without_lengths();
    let found = m.nested(st.parts.clone(), 0, |sub| {
        let mut resume = next;
        loop {
            match run_sequence(sub, node, st.inner, &inside, resume, items, label)? {
                Some(mut out) if partial || sub.input.at_end() => {
                    out.restore_lengths(ctx);
                    return Ok(Some(out));
                }
                Some(_) => resume = true,
                None => return Ok(None),
            }
        }
    })?;
    match found {
        Some(out) => {
            m.seek(st.start + 1);
            m.runtime.put(node, sid, Session::Struct(st));
            Ok(Some(out))
        }
        None => {
            m.seek(st.start);
            if !next {
                m.fail_at(st.start, None);
            }
            Ok(None)
        }
    }
}

//! Single-alternative matchers over input items.

use crate::comparison::{char_in_range, values_equal};
use crate::context::{Context, Params};
use crate::errors::Result;
use crate::expr::{Anchor, Expr};
use crate::input::peek_at;
use crate::render;
use crate::runtime::Matcher;
use crate::value::Value;

#[derive(Debug)]
pub(crate) struct LeafState {
    pub(crate) start: usize,
}

fn skip_whitespace(m: &mut Matcher<'_>, ctx: &Context) {
    if !ctx.param(Params::IGNORE_WHITESPACE) {
        return;
    }
    loop {
        let here = m.position();
        match m.input.read() {
            Some(Value::Char(c)) if c.is_whitespace() => {}
            _ => {
                m.seek(here);
                return;
            }
        }
    }
}

/// Match `expected` item by item.
fn items(m: &mut Matcher<'_>, ctx: &Context, expected: &[Value]) -> Option<Context> {
    skip_whitespace(m, ctx);
    let fold = ctx.param(Params::CASE_INSENSITIVE);
    for want in expected {
        let here = m.position();
        match m.input.read() {
            Some(got) if values_equal(&got, want, fold) => {}
            found => {
                m.seek(here);
                m.fail_at(here, found);
                return None;
            }
        }
    }
    Some(ctx.clone())
}

pub(super) fn literal(m: &mut Matcher<'_>, ctx: &Context, text: &str) -> Option<Context> {
    let expected: Vec<Value> = text.chars().map(Value::Char).collect();
    items(m, ctx, &expected)
}

pub(super) fn int(m: &mut Matcher<'_>, ctx: &Context, i: i64) -> Option<Context> {
    items(m, ctx, &[Value::Int(i)])
}

pub(super) fn any(m: &mut Matcher<'_>, ctx: &Context) -> Option<Context> {
    skip_whitespace(m, ctx);
    let here = m.position();
    match m.input.read() {
        Some(_) => Some(ctx.clone()),
        None => {
            m.fail_at(here, None);
            None
        }
    }
}

pub(super) fn range(m: &mut Matcher<'_>, ctx: &Context, lo: char, hi: char) -> Option<Context> {
    skip_whitespace(m, ctx);
    let here = m.position();
    let fold = ctx.param(Params::CASE_INSENSITIVE);
    match m.input.read() {
        Some(Value::Char(c)) if char_in_range(c, lo, hi, fold) => Some(ctx.clone()),
        found => {
            m.seek(here);
            m.fail_at(here, found);
            None
        }
    }
}

pub(super) fn anchor(m: &mut Matcher<'_>, ctx: &Context, anchor: Anchor) -> Option<Context> {
    let pos = m.position();
    let lines = ctx.param(Params::LINE_ANCHORS);
    let newline = Value::Char('\n');
    let holds = match anchor {
        Anchor::Start => {
            pos == 0 || (lines && peek_at(&mut *m.input, pos - 1).as_ref() == Some(&newline))
        }
        Anchor::End => {
            m.input.at_end() || (lines && peek_at(&mut *m.input, pos).as_ref() == Some(&newline))
        }
    };
    if holds {
        Some(ctx.clone())
    } else {
        m.fail_at(pos, None);
        None
    }
}

/// A bound variable matches its value's spelling; a free one consumes a
/// single item and binds it.
pub(super) fn variable(m: &mut Matcher<'_>, ctx: &Context, name: &str) -> Option<Context> {
    if let Some(value) = ctx.get(name) {
        let expected = value.spelling();
        return items(m, ctx, &expected);
    }
    skip_whitespace(m, ctx);
    let here = m.position();
    match m.input.read() {
        Some(Value::Char(c)) => ctx.bind(name, Value::Str(c.to_string())),
        Some(item) => ctx.bind(name, item),
        None => {
            m.fail_at(here, None);
            None
        }
    }
}

/// A function call inside a pattern matches the value it renders to.
pub(super) fn function(m: &mut Matcher<'_>, ctx: &Context, call: &Expr) -> Result<Option<Context>> {
    let limit = m.runtime.config().max_function_depth;
    let value = render::apply_in(call, ctx, m.grammar, &m.module, limit)?;
    Ok(items(m, ctx, &value.spelling()))
}

//! Rendering result expressions from a finished match.

use crate::context::{Context, Params};
use crate::errors::{Error, Result};
use crate::expr::{Expr, ExprKind};
use crate::functions::Direction;
use crate::rules::Grammar;
use crate::value::Value;

/// Evaluates a result expression against the bindings of one match.
pub struct Renderer<'a> {
    grammar: &'a Grammar,
    module: &'a str,
    max_depth: usize,
    depth: usize,
}

/// Render `expr` in the default module.
pub fn apply(expr: &Expr, ctx: &Context, grammar: &Grammar, max_function_depth: usize) -> Result<Value> {
    apply_in(expr, ctx, grammar, Grammar::DEFAULT_MODULE, max_function_depth)
}

pub fn apply_in(
    expr: &Expr,
    ctx: &Context,
    grammar: &Grammar,
    module: &str,
    max_function_depth: usize,
) -> Result<Value> {
    let direction = if ctx.param(Params::LEFT_DIRECTION) {
        Direction::Left
    } else {
        Direction::Right
    };
    Renderer {
        grammar,
        module,
        max_depth: max_function_depth,
        depth: 0,
    }
    .render(expr, ctx, direction)
}

impl Renderer<'_> {
    fn render(&mut self, expr: &Expr, ctx: &Context, direction: Direction) -> Result<Value> {
        match expr.kind() {
            ExprKind::Empty => Ok(Value::str("")),
            ExprKind::Literal(text) => Ok(Value::str(text.as_str())),
            ExprKind::Int(i) => Ok(Value::Int(*i)),
            ExprKind::Var(name) | ExprKind::Bind { name, .. } => {
                ctx.get(name).cloned().ok_or_else(|| Error::Unbound(name.clone()))
            }
            ExprKind::Seq(items) => Ok(Value::concat(self.render_all(items, ctx, direction)?)),
            ExprKind::Tuple(items) => Ok(Value::Tuple(self.render_all(items, ctx, direction)?)),
            ExprKind::Named { name, value } => {
                Ok(Value::named(name.as_str(), self.render(value, ctx, direction)?))
            }
            ExprKind::Text(inner) => Ok(Value::Str(self.render(inner, ctx, direction)?.to_string())),
            // first branch whose variables are all bound
            ExprKind::Or(items) => {
                let mut last = Error::NotRenderable("or");
                for item in items {
                    match self.render(item, ctx, direction) {
                        Err(e @ Error::Unbound(_)) => last = e,
                        other => return other,
                    }
                }
                Err(last)
            }
            ExprKind::Function { name, args } => {
                if self.depth >= self.max_depth {
                    return Err(Error::FunctionNesting(self.depth + 1));
                }
                self.depth += 1;
                let values = self.render_all(args, ctx, direction);
                self.depth -= 1;
                self.grammar
                    .functions()
                    .call(self.module, name, direction, &values?)
            }
            ExprKind::Param { param, on, body } => {
                let direction = if param.flag() != Params::LEFT_DIRECTION {
                    direction
                } else if *on {
                    Direction::Left
                } else {
                    Direction::Right
                };
                self.render(body, ctx, direction)
            }
            ExprKind::Typed { body, .. } => self.render(body, ctx, direction),
            kind @ (ExprKind::Any
            | ExprKind::Range(..)
            | ExprKind::Anchor(_)
            | ExprKind::And(_)
            | ExprKind::Not(_)
            | ExprKind::Repeat { .. }
            | ExprKind::Call { .. }) => Err(Error::NotRenderable(kind.label())),
        }
    }

    fn render_all(&mut self, items: &[Expr], ctx: &Context, direction: Direction) -> Result<Vec<Value>> {
        items.iter().map(|e| self.render(e, ctx, direction)).collect()
    }
}

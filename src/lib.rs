pub mod config;
pub mod context;
pub mod diagnostics;
pub mod engine;
pub mod errors;
pub mod expr;
pub mod functions; // plugin model
pub mod input;
pub mod matcher;
pub mod quantifier;
pub mod render;
pub mod rules;
pub mod runtime;
pub mod unify;
pub mod value;
mod comparison;
mod stack;

pub use config::{Config, Unmatched};
pub use context::{Context, Param, Params};
pub use diagnostics::BestTry;
pub use engine::{Outcome, Program, TransformRule, Transformer};
pub use errors::{Error, Result};
pub use expr::{build, Anchor, CallTarget, Count, Expr, ExprKind};
pub use functions::{Direction, Function, Registry};
pub use input::{Input, Source};
pub use rules::{Grammar, Module, RuleDef};
pub use runtime::{CancelToken, Matcher, Runtime, SessionId};
pub use value::Value;

/// Convenience: load a JSON program and transform `input` with it.
pub fn transform(program_json: &str, input: &str) -> Result<String> {
    let program = Program::from_json(program_json)?;
    Transformer::from_program(program).transform(input)
}

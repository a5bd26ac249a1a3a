use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{Config, Unmatched};
use crate::context::{Context, Param, Params};
use crate::errors::{Error, Result};
use crate::expr::Expr;
use crate::input::{Input, Source};
use crate::render;
use crate::rules::Grammar;
use crate::runtime::{CancelToken, Matcher, Runtime};
use crate::value::Value;

/// Variable that holds the whole consumed span under `CAPTURE_FULL_MATCH`.
pub const FULL_MATCH_VAR: &str = "match";

/// `pattern => result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformRule {
    pub pattern: Expr,
    pub result: Expr,
    /// Parameters switched on for this rule in addition to the configured
    /// ones.
    #[serde(default)]
    pub params: Params,
}

impl TransformRule {
    pub fn new(pattern: Expr, result: Expr) -> Self {
        Self {
            pattern,
            result,
            params: Params::empty(),
        }
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.params |= param.flag();
        self
    }
}

/// Everything a transformation needs, as loaded from a program file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub grammar: Grammar,
    #[serde(default)]
    pub rules: Vec<TransformRule>,
    #[serde(default)]
    pub config: Config,
}

impl Program {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One way a pattern matched: where it ended and what it bound.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub end: usize,
    pub context: Context,
}

/// How many alternatives to draw from one top-level match.
#[derive(Clone, Copy)]
enum Take {
    First,
    SameEnd,
    All,
}

/// Scans input left to right, rewriting each position with the first rule
/// whose pattern matches there.
#[derive(Debug, Clone, Default)]
pub struct Transformer {
    grammar: Grammar,
    rules: Vec<TransformRule>,
    config: Config,
    cancel: CancelToken,
}

impl Transformer {
    pub fn new(grammar: Grammar) -> Self {
        Self {
            grammar,
            ..Self::default()
        }
    }

    pub fn from_program(program: Program) -> Self {
        Self {
            grammar: program.grammar,
            rules: program.rules,
            config: program.config,
            cancel: CancelToken::new(),
        }
    }

    pub fn rule(mut self, rule: TransformRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle that cancels every transformation this transformer runs.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Transform text; rendered values are concatenated.
    pub fn transform(&self, text: &str) -> Result<String> {
        let values = self.transform_source(&mut Source::from_text(text))?;
        Ok(values.iter().map(ToString::to_string).collect())
    }

    /// Transform a sequence of structured items.
    pub fn transform_items(&self, items: Vec<Value>) -> Result<Vec<Value>> {
        self.transform_source(&mut Source::from_items(items))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(items = source.len()))]
    pub fn transform_source(&self, source: &mut Source) -> Result<Vec<Value>> {
        let mut runtime = self.runtime();
        let mut out = Vec::new();
        let mut pos = source.position();
        while pos < source.len() {
            let step = self
                .rewrite_at(&mut runtime, source, pos)
                .map_err(|e| wrap(e, &mut runtime))?;
            if let Some((end, values)) = step {
                out.extend(values);
                if end > pos {
                    pos = end;
                    continue;
                }
            }
            let Some(item) = source.get(pos).cloned() else {
                break;
            };
            match self.config.unmatched {
                Unmatched::Copy => out.push(item),
                Unmatched::Skip => {}
                Unmatched::Error => {
                    warn!(pos, "no rule matches");
                    return Err(Error::Unmatched {
                        pos,
                        best: runtime.take_best_try(),
                    });
                }
            }
            pos += 1;
        }
        debug!(values = out.len(), "transformed");
        Ok(out)
    }

    /// Every way `pattern` matches at the source's current position, in
    /// enumeration order.
    pub fn alternatives(&self, pattern: &Expr, source: &mut Source) -> Result<Vec<Outcome>> {
        let mut runtime = self.runtime();
        let base = Context::new(self.config.params);
        let pos = source.position();
        self.outcomes(&mut runtime, source, pattern, &base, pos, Take::All)
            .map_err(|e| wrap(e, &mut runtime))
    }

    fn runtime(&self) -> Runtime {
        Runtime::new(self.config.clone()).with_cancel(self.cancel.clone())
    }

    fn rewrite_at(
        &self,
        runtime: &mut Runtime,
        source: &mut Source,
        pos: usize,
    ) -> Result<Option<(usize, Vec<Value>)>> {
        for rule in &self.rules {
            let base = Context::new(self.config.params | rule.params);
            let take = if base.param(Params::MULTI_RESULT) {
                Take::SameEnd
            } else {
                Take::First
            };
            let found = self.outcomes(runtime, source, &rule.pattern, &base, pos, take)?;
            let Some(end) = found.first().map(|o| o.end) else {
                continue;
            };
            let span = source.span(pos, end);
            let mut values = Vec::new();
            for outcome in found {
                let mut ctx = outcome.context;
                if base.param(Params::CAPTURE_FULL_MATCH) {
                    ctx.set(FULL_MATCH_VAR, span.clone());
                }
                if base.param(Params::KEEP_INITIATOR) {
                    values.push(span.clone());
                }
                values.push(render::apply(
                    &rule.result,
                    &ctx,
                    &self.grammar,
                    self.config.max_function_depth,
                )?);
            }
            return Ok(Some((end, values)));
        }
        Ok(None)
    }

    fn outcomes(
        &self,
        runtime: &mut Runtime,
        source: &mut Source,
        pattern: &Expr,
        base: &Context,
        pos: usize,
        take: Take,
    ) -> Result<Vec<Outcome>> {
        runtime.reset_sessions();
        source.set_position(pos);
        let sid = runtime.fresh_session();
        let mut m = Matcher::new(source, runtime, &self.grammar);
        let mut found: Vec<Outcome> = Vec::new();
        let mut next = false;
        while let Some(context) = pattern.matches(&mut m, sid, base, next)? {
            next = true;
            let end = m.position();
            match take {
                Take::First => {
                    found.push(Outcome { end, context });
                    break;
                }
                Take::SameEnd if found.first().is_some_and(|first| first.end != end) => {}
                Take::SameEnd | Take::All => found.push(Outcome { end, context }),
            }
        }
        if m.runtime.was_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(found)
    }
}

/// Attach the furthest failure to a fatal error. Cancellation is reported
/// as is.
fn wrap(error: Error, runtime: &mut Runtime) -> Error {
    if error.is_cancelled() {
        return Error::Cancelled;
    }
    warn!(%error, "transformation aborted");
    Error::Transform {
        best: runtime.take_best_try(),
        source: Box::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::build::*;
    use pretty_assertions::assert_eq;

    fn upcase_words() -> Transformer {
        Transformer::new(Grammar::new()).rule(TransformRule::new(
            bind("w", plus(range('a', 'z'))),
            func("upper", [var("w")]),
        ))
    }

    #[test]
    fn rewrites_and_copies_the_rest() {
        assert_eq!(upcase_words().transform("ab, cd!").unwrap(), "AB, CD!");
    }

    #[test]
    fn unmatched_modes() {
        let skip = upcase_words().with_config(Config::default().with_unmatched(Unmatched::Skip));
        assert_eq!(skip.transform("ab, cd!").unwrap(), "ABCD");

        let strict = upcase_words().with_config(Config::default().with_unmatched(Unmatched::Error));
        match strict.transform("ab, cd") {
            Err(Error::Unmatched { pos, .. }) => assert_eq!(pos, 2),
            other => panic!("expected an unmatched error, got {other:?}"),
        }
    }

    #[test]
    fn keep_initiator_and_full_match() {
        let t = Transformer::new(Grammar::new())
            .rule(TransformRule::new(lit("a"), lit("!")).with_param(Param::KeepInitiator))
            .rule(
                TransformRule::new(plus(range('0', '9')), seq([lit("["), var(FULL_MATCH_VAR), lit("]")]))
                    .with_param(Param::CaptureFullMatch),
            );
        assert_eq!(t.transform("ab12a").unwrap(), "a!b[12]a!");
    }

    #[test]
    fn multi_result_renders_every_alternative_with_the_same_end() {
        let pattern = or([
            bind("x", lit("ab")),
            seq([bind("x", lit("a")), lit("b")]),
            bind("x", lit("a")),
        ]);
        let t = Transformer::new(Grammar::new())
            .rule(TransformRule::new(pattern, var("x")).with_param(Param::MultiResult));
        assert_eq!(t.transform("ab").unwrap(), "aba");
    }

    #[test]
    fn alternatives_enumerate_in_order() {
        let t = Transformer::new(Grammar::new());
        let mut source = Source::from_text("aaa");
        let found = t.alternatives(&star(lit("a")), &mut source).unwrap();
        let ends: Vec<usize> = found.iter().map(|o| o.end).collect();
        assert_eq!(ends, vec![3, 2, 1, 0]);
    }

    #[test]
    fn fatal_errors_carry_the_best_try() {
        let t = Transformer::new(Grammar::new()).rule(TransformRule::new(
            seq([lit("a"), call("missing", [])]),
            empty(),
        ));
        match t.transform("xa") {
            Err(Error::Transform { source, best }) => {
                assert!(matches!(*source, Error::UnknownRule { .. }));
                assert_eq!(best.pos, 0);
            }
            other => panic!("expected a wrapped error, got {other:?}"),
        }
    }
}

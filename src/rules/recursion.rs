//! Left recursion by seed growing.
//!
//! The first visit to a call site plants an anchor and enumerates the body.
//! Re-entrant calls to the same site are answered from what the anchor knows
//! so far, which is nothing on the first round, so only the base cases
//! match. Each further round re-runs the body with the previous round's
//! answers available and pools whatever is new. Once a round adds nothing
//! the anchor fires: its derivations are ordered by derivation path and
//! replayed to the caller one by one.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::context::{Context, Params};
use crate::errors::Result;
use crate::expr::NodeId;
use crate::runtime::{Matcher, Session, SessionId};
use crate::unify::{evaluate, unify_all};
use crate::value::Value;

use super::set::{self, CallState, Direct, Site};

/// Identifies one left-recursive call: the same rule, at the same place,
/// with the same evaluated arguments and parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSite {
    pub pos: usize,
    pub input: u64,
    pub module: Arc<str>,
    pub rule: String,
    /// Evaluated arguments; unbound ones are [`Value::Unset`].
    pub args: Vec<Value>,
    pub params: Params,
}

/// One way the rule matched at its call site.
#[derive(Debug, Clone)]
pub struct Derivation {
    pub end: usize,
    /// The finished callee context; formulas are resolved against it per
    /// caller.
    pub callee: Context,
    /// Alternative index followed by the paths of nested left-recursive
    /// answers the body used.
    pub path: Vec<usize>,
}

impl Derivation {
    fn alt(&self) -> usize {
        self.path.first().copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct Anchor {
    pub node: NodeId,
    pub known: Arc<Vec<Derivation>>,
    pub fired: bool,
    /// Planted while another anchor was growing, so its answers may change
    /// with that anchor's next round.
    pub dependent: bool,
    pub epoch: u64,
}

/// Anchors by call site, shared by every branch of one top-level attempt and
/// cleared before the next. A memo planted under a growing anchor is only
/// reused within its own epoch.
#[derive(Debug, Default)]
pub struct RecursionTable {
    anchors: HashMap<CallSite, Anchor>,
    epoch: u64,
    growing: usize,
}

enum Visit {
    /// The site is still growing: answer from what it knows so far.
    Growing(Arc<Vec<Derivation>>),
    /// The site fired and its answers are still valid.
    Memo(Arc<Vec<Derivation>>),
    Fresh,
}

impl RecursionTable {
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn get(&self, key: &CallSite) -> Option<&Anchor> {
        self.anchors.get(key)
    }

    fn visit(&self, key: &CallSite) -> Visit {
        match self.anchors.get(key) {
            Some(anchor) if !anchor.fired => Visit::Growing(anchor.known.clone()),
            Some(anchor) if !anchor.dependent || anchor.epoch == self.epoch => {
                Visit::Memo(anchor.known.clone())
            }
            _ => Visit::Fresh,
        }
    }

    fn plant(&mut self, key: CallSite, node: NodeId) {
        let anchor = Anchor {
            node,
            known: Arc::default(),
            fired: false,
            dependent: self.growing > 0,
            epoch: self.epoch,
        };
        self.growing += 1;
        self.anchors.insert(key, anchor);
    }

    fn record(&mut self, key: &CallSite, known: Arc<Vec<Derivation>>) {
        if let Some(anchor) = self.anchors.get_mut(key) {
            anchor.known = known;
        }
    }

    fn fire(&mut self, key: &CallSite, known: Arc<Vec<Derivation>>) {
        self.growing = self.growing.saturating_sub(1);
        let epoch = self.epoch;
        if let Some(anchor) = self.anchors.get_mut(key) {
            anchor.known = known;
            anchor.fired = true;
            anchor.epoch = epoch;
        }
    }

    fn remove(&mut self, key: &CallSite) {
        self.anchors.remove(key);
    }
}

/// Replays a fired (or growing) anchor's derivations to one caller.
#[derive(Debug)]
pub(crate) struct Replay {
    start: usize,
    module: Arc<str>,
    name: String,
    derivations: Arc<Vec<Derivation>>,
    offered: usize,
    /// Set when this call grew the anchor; it removes the anchor once
    /// exhausted.
    owner: Option<CallSite>,
}

pub(crate) fn call(
    m: &mut Matcher<'_>,
    site: &Site<'_>,
    sid: SessionId,
    ctx: &Context,
    module: Arc<str>,
    name: &str,
    start: usize,
) -> Result<Option<Context>> {
    let key = CallSite {
        pos: start,
        input: m.input_id(),
        module: module.clone(),
        rule: name.to_string(),
        args: site.args.iter().map(|a| evaluate(a, ctx)).collect(),
        params: ctx.params(),
    };
    let (derivations, owner) = match m.runtime.recursion.visit(&key) {
        Visit::Growing(known) => {
            trace!(rule = name, pos = start, answers = known.len(), "re-entrant call");
            (known, None)
        }
        Visit::Memo(known) => (known, None),
        Visit::Fresh => {
            let known = Arc::new(grow(m, site, ctx, &key, &module, name, start)?);
            m.runtime.recursion.fire(&key, known.clone());
            if known.is_empty() {
                m.runtime.recursion.remove(&key);
                m.seek(start);
                return Ok(None);
            }
            (known, Some(key))
        }
    };
    let st = Replay {
        start,
        module,
        name: name.to_string(),
        derivations,
        offered: 0,
        owner,
    };
    replay(m, site, sid, st, ctx)
}

#[tracing::instrument(level = "debug", skip_all, fields(rule = %key.rule, pos = key.pos))]
fn grow(
    m: &mut Matcher<'_>,
    site: &Site<'_>,
    ctx: &Context,
    key: &CallSite,
    module: &Arc<str>,
    name: &str,
    start: usize,
) -> Result<Vec<Derivation>> {
    m.runtime.recursion.plant(key.clone(), site.node);
    let body = m.fresh_session();
    let mut known: Vec<Derivation> = Vec::new();
    for round in 1usize.. {
        m.runtime.recursion.epoch += 1;
        let before = known.len();
        let mut st = Direct::new(start, module.clone(), vec![name.to_string()], body, ctx);
        let mut resume = false;
        while let Some(found) = set::step(m, site, &mut st, ctx, resume, true)? {
            resume = true;
            let end = m.position();
            let seen = known
                .iter()
                .any(|d| d.end == end && d.callee.same_bindings(&found.callee));
            if !seen {
                let mut path = vec![found.alt];
                path.extend_from_slice(found.callee.trail());
                known.push(Derivation {
                    end,
                    callee: found.callee,
                    path,
                });
            }
        }
        debug!(round, derivations = known.len(), "seed grown");
        if known.len() == before {
            break;
        }
        m.runtime.recursion.record(key, Arc::new(known.clone()));
    }
    known.sort_by(|a, b| a.path.cmp(&b.path));
    m.seek(start);
    Ok(known)
}

/// Offer the next derivation: re-unify the caller's arguments with the
/// parameters of the alternative it came from, resolve the formulas against
/// the derivation's callee context and move the cursor to its end.
pub(crate) fn replay(
    m: &mut Matcher<'_>,
    site: &Site<'_>,
    sid: SessionId,
    mut st: Replay,
    ctx: &Context,
) -> Result<Option<Context>> {
    let grammar = m.grammar;
    let alts = grammar.lookup(&st.module, &st.name, site.args.len())?;
    let derivations = st.derivations.clone();
    while let Some(d) = derivations.get(st.offered) {
        st.offered += 1;
        let Some(rule) = alts.get(d.alt()) else {
            continue;
        };
        let Some((caller, _, formulas)) = unify_all(site.args, &rule.params, ctx, &ctx.callee()) else {
            continue;
        };
        m.seek(d.end);
        let Some(mut out) = set::finish(m, site.target, &caller, &formulas, &d.callee, &st.name, st.start) else {
            continue;
        };
        out.extend_trail(&d.path);
        m.runtime.put(site.node, sid, Session::Call(CallState::Replay(st)));
        return Ok(Some(out));
    }
    if let Some(key) = &st.owner {
        m.runtime.recursion.remove(key);
    }
    m.seek(st.start);
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::expr::build::*;
    use crate::expr::build::call;
    use crate::input::Source;
    use crate::rules::{Grammar, RuleDef};
    use crate::runtime::Runtime;
    use pretty_assertions::assert_eq;

    fn expression_grammar() -> Grammar {
        Grammar::new()
            .rule(RuleDef::new("E", [], seq([call("E", []), lit("+"), call("E", [])])).left_recursive())
            .rule(RuleDef::new("E", [], seq([call("E", []), lit("*"), call("E", [])])).left_recursive())
            .rule(RuleDef::new("E", [], lit("n")).left_recursive())
    }

    #[test]
    fn growth_finds_every_distinct_end() {
        let grammar = expression_grammar();
        let mut source = Source::from_text("n+n*n");
        let mut runtime = Runtime::new(Config::default());
        let sid = runtime.fresh_session();
        let pattern = call("E", []);
        let mut ends = Vec::new();
        {
            let mut m = Matcher::new(&mut source, &mut runtime, &grammar);
            let ctx = Context::default();
            let mut next = false;
            while pattern.matches(&mut m, sid, &ctx, next).unwrap().is_some() {
                ends.push(m.position());
                next = true;
            }
            assert_eq!(m.position(), 0);
        }
        ends.sort_unstable();
        assert_eq!(ends, vec![1, 3, 5]);
        assert!(runtime.recursion.is_empty(), "exhausted anchors are removed");
    }

    #[test]
    fn memo_answers_repeat_visits() {
        let mut table = RecursionTable::default();
        let key = CallSite {
            pos: 0,
            input: 0,
            module: Arc::from("main"),
            rule: "E".into(),
            args: vec![],
            params: Params::empty(),
        };
        let node = lit("n").id();
        table.plant(key.clone(), node);
        assert!(matches!(table.visit(&key), Visit::Growing(_)));
        table.fire(&key, Arc::new(vec![]));
        assert!(matches!(table.visit(&key), Visit::Memo(_)));

        // planted under a growing anchor: only valid in its own epoch
        let inner = CallSite { pos: 2, ..key.clone() };
        table.plant(key.clone(), node);
        table.plant(inner.clone(), node);
        table.fire(&inner, Arc::new(vec![]));
        assert!(matches!(table.visit(&inner), Visit::Memo(_)));
        table.epoch += 1;
        assert!(matches!(table.visit(&inner), Visit::Fresh));

        table.remove(&key);
        assert!(matches!(table.visit(&key), Visit::Fresh));
        assert_eq!(table.len(), 1);
    }
}

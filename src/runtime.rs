//! Request-scoped matching state.
//!
//! One [`Runtime`] belongs to one top-level transformation. It owns the
//! session table every node resumes from, the call-depth ceiling, the
//! cancellation signal, the best-try register and the left-recursion table.
//! Nothing here is global, so a rule tree can be matched by several runtimes
//! at once.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::diagnostics::{BestTry, Frame};
use crate::errors::{Error, Result};
use crate::expr::NodeId;
use crate::input::{Input, Source};
use crate::matcher::{AndState, BindState, LeafState, NotState, OrState, SeqState, StructState};
use crate::quantifier::RepeatState;
use crate::rules::recursion::RecursionTable;
use crate::rules::set::CallState;
use crate::rules::Grammar;
use crate::value::Value;

/// Identifies one enumeration of one node, for one caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

/// Cooperative cancellation signal, shared with whoever may cancel.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Saved enumeration state, one variant per node family.
#[derive(Debug)]
pub(crate) enum Session {
    Leaf(LeafState),
    Seq(SeqState),
    Or(OrState),
    And(AndState),
    Not(NotState),
    Bind(BindState),
    Struct(StructState),
    Repeat(RepeatState),
    Call(CallState),
}

#[derive(Debug)]
pub struct Runtime {
    config: Config,
    depth: usize,
    sessions: HashMap<(NodeId, SessionId), Session>,
    next_session: u64,
    cancel: CancelToken,
    cancelled: bool,
    best: Option<BestTry>,
    trace: Vec<Frame>,
    pub(crate) recursion: RecursionTable,
}

impl Runtime {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            depth: 0,
            sessions: HashMap::new(),
            next_session: 0,
            cancel: CancelToken::new(),
            cancelled: false,
            best: None,
            trace: Vec::new(),
            recursion: RecursionTable::default(),
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn fresh_session(&mut self) -> SessionId {
        self.next_session += 1;
        SessionId(self.next_session)
    }

    pub(crate) fn take(&mut self, node: NodeId, sid: SessionId) -> Option<Session> {
        self.sessions.remove(&(node, sid))
    }

    pub(crate) fn put(&mut self, node: NodeId, sid: SessionId, session: Session) {
        self.sessions.insert((node, sid), session);
    }

    /// Drop every session opened at or after `first`. Ids are handed out in
    /// order, so once the enumeration that opened `first` is abandoned these
    /// all belong to it.
    pub(crate) fn discard_sessions_from(&mut self, first: SessionId) {
        self.sessions.retain(|(_, sid), _| *sid < first);
    }

    /// Number of suspended sessions. An exhausted top-level enumeration
    /// leaves none behind.
    pub fn live_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Drop every suspended session and recursion anchor. Only valid between
    /// top-level matches.
    pub fn reset_sessions(&mut self) {
        self.sessions.clear();
        self.trace.clear();
        self.recursion = RecursionTable::default();
    }

    // ---- depth ceiling and cancellation ----

    pub(crate) fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            let depth = self.depth;
            self.depth -= 1;
            return Err(Error::StackOverflow(depth));
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Poll the cancellation signal; remembers that it fired.
    pub(crate) fn poll_cancel(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            self.cancelled = true;
        }
        self.cancelled
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    // ---- best-try register ----

    pub(crate) fn push_frame(&mut self, node: NodeId, operand: usize, label: Cow<'static, str>) {
        self.trace.push(Frame {
            node,
            operand,
            label,
        });
    }

    pub(crate) fn pop_frame(&mut self) {
        self.trace.pop();
    }

    pub(crate) fn record_failure(&mut self, pos: usize, found: Option<Value>) {
        let candidate = BestTry {
            pos,
            trace: self.trace.clone(),
            found,
        };
        let replace = match &self.best {
            None => true,
            Some(best) => candidate.beats(best),
        };
        if replace {
            self.best = Some(candidate);
        }
    }

    pub fn best_try(&self) -> Option<&BestTry> {
        self.best.as_ref()
    }

    pub fn take_best_try(&mut self) -> BestTry {
        self.best.take().unwrap_or_default()
    }
}

/// Everything a node needs while matching: the input cursor, the runtime
/// and the rule set.
pub struct Matcher<'a> {
    pub(crate) input: &'a mut dyn Input,
    pub(crate) runtime: &'a mut Runtime,
    pub(crate) grammar: &'a Grammar,
    pub(crate) module: Arc<str>,
    /// Distinguishes nested inputs, whose positions restart at zero.
    input_id: u64,
    nested: bool,
}

impl<'a> Matcher<'a> {
    pub fn new(input: &'a mut dyn Input, runtime: &'a mut Runtime, grammar: &'a Grammar) -> Self {
        Self {
            input,
            runtime,
            grammar,
            module: Arc::from(Grammar::DEFAULT_MODULE),
            input_id: 0,
            nested: false,
        }
    }

    pub fn position(&self) -> usize {
        self.input.position()
    }

    pub fn seek(&mut self, pos: usize) {
        self.input.set_position(pos);
    }

    pub fn runtime(&mut self) -> &mut Runtime {
        &mut *self.runtime
    }

    pub fn fresh_session(&mut self) -> SessionId {
        self.runtime.fresh_session()
    }

    pub(crate) fn input_id(&self) -> u64 {
        self.input_id
    }

    /// Report a leaf failure at `pos` to the best-try register. Failures
    /// inside structured items are reported by the structural matcher.
    pub(crate) fn fail_at(&mut self, pos: usize, found: Option<Value>) {
        if !self.nested {
            self.runtime.record_failure(pos, found);
        }
    }

    pub(crate) fn with_frame<R>(
        &mut self,
        node: NodeId,
        operand: usize,
        label: impl Into<Cow<'static, str>>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.runtime.push_frame(node, operand, label.into());
        let out = f(self);
        self.runtime.pop_frame();
        out
    }

    /// Run `f` against a nested input over `items`, starting at `pos`.
    pub(crate) fn nested<R>(
        &mut self,
        items: Vec<Value>,
        pos: usize,
        f: impl FnOnce(&mut Matcher<'_>) -> Result<R>,
    ) -> Result<R> {
        let mut source = Source::from_items(items);
        source.set_position(pos);
        let input_id = self.runtime.fresh_session().0;
        let mut sub = Matcher {
            input: &mut source,
            runtime: &mut *self.runtime,
            grammar: self.grammar,
            module: self.module.clone(),
            input_id,
            nested: true,
        };
        f(&mut sub)
    }

    /// Run `f` with `module` as the current module.
    pub(crate) fn in_module<R>(&mut self, module: &Arc<str>, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.module, module.clone());
        let out = f(self);
        self.module = saved;
        out
    }
}

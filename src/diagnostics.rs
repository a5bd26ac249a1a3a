//! Best-partial-match tracking.
//!
//! Failing leaves report where they gave up together with the call trace
//! that led there. The register keeps the deepest such report, which the
//! driver attaches to errors.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use itertools::Itertools;

use crate::comparison::best_try_order;
use crate::expr::NodeId;
use crate::value::Value;

/// One step of the call trace: a composite node and the operand it was
/// matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub node: NodeId,
    pub operand: usize,
    pub label: Cow<'static, str>,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.label, self.operand)
    }
}

/// The furthest failure seen so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BestTry {
    pub pos: usize,
    pub trace: Vec<Frame>,
    /// The item found where the attempt gave up, if any.
    pub found: Option<Value>,
}

impl BestTry {
    /// Whether this record should replace `other` in the register.
    ///
    /// Deeper positions win. At equal depth the traces are walked from the
    /// root; at the first frame where they diverge inside the same node, the
    /// path that had reached the later operand tried harder and wins.
    pub fn beats(&self, other: &BestTry) -> bool {
        match self.pos.cmp(&other.pos) {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => {}
        }
        for (mine, theirs) in self.trace.iter().zip(&other.trace) {
            if mine == theirs {
                continue;
            }
            if mine.node == theirs.node && mine.operand != theirs.operand {
                return mine.operand > theirs.operand;
            }
            break;
        }
        match (&self.found, &other.found) {
            (Some(a), Some(b)) => best_try_order(a, b) == Ordering::Greater,
            _ => false,
        }
    }
}

impl fmt::Display for BestTry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "furthest match reached position {}", self.pos)?;
        if let Some(found) = &self.found {
            write!(f, " at {found:?}")?;
        }
        if !self.trace.is_empty() {
            write!(f, " via {}", self.trace.iter().join(" > "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::build::lit;

    fn frame(node: NodeId, operand: usize) -> Frame {
        Frame {
            node,
            operand,
            label: Cow::Borrowed("seq"),
        }
    }

    #[test]
    fn deeper_position_wins() {
        let a = BestTry {
            pos: 4,
            ..BestTry::default()
        };
        let b = BestTry {
            pos: 2,
            ..BestTry::default()
        };
        assert!(a.beats(&b));
        assert!(!b.beats(&a));
    }

    #[test]
    fn later_operand_breaks_ties() {
        let root = lit("x").id();
        let other = lit("y").id();
        let early = BestTry {
            pos: 3,
            trace: vec![frame(root, 0), frame(other, 5)],
            found: None,
        };
        let late = BestTry {
            pos: 3,
            trace: vec![frame(root, 1)],
            found: None,
        };
        assert!(late.beats(&early));
        assert!(!early.beats(&late));
    }

    #[test]
    fn identical_records_keep_the_first() {
        let a = BestTry {
            pos: 1,
            trace: vec![],
            found: Some(Value::Char('a')),
        };
        let b = BestTry {
            pos: 1,
            trace: vec![],
            found: Some(Value::Char('b')),
        };
        assert!(!a.beats(&b));
        assert!(!b.beats(&a));
    }
}

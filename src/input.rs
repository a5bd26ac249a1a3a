//! The seekable cursor the matcher reads from.

use crate::value::Value;

/// A seekable, rewindable stream of input items.
///
/// Positions are item indices. Every node saves the positions it needs and
/// rewinds explicitly, so an implementation only has to support arbitrary
/// `set_position`.
pub trait Input {
    fn position(&self) -> usize;
    fn set_position(&mut self, pos: usize);
    /// Read the item at the cursor and advance past it.
    fn read(&mut self) -> Option<Value>;
    fn at_end(&self) -> bool;
    /// Materialize the items in `from..to` as one value.
    fn span(&self, from: usize, to: usize) -> Value;
}

/// In-memory input over text characters or structured items.
#[derive(Debug, Clone, Default)]
pub struct Source {
    items: Vec<Value>,
    pos: usize,
}

impl Source {
    pub fn from_text(text: &str) -> Self {
        Self::from_items(text.chars().map(Value::Char).collect())
    }

    pub fn from_items(items: Vec<Value>) -> Self {
        Self { items, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item at `pos`, without moving the cursor.
    pub fn get(&self, pos: usize) -> Option<&Value> {
        self.items.get(pos)
    }
}

impl Input for Source {
    fn position(&self) -> usize {
        self.pos
    }

    fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.items.len());
    }

    fn read(&mut self) -> Option<Value> {
        let item = self.items.get(self.pos).cloned()?;
        self.pos += 1;
        Some(item)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.items.len()
    }

    fn span(&self, from: usize, to: usize) -> Value {
        let to = to.min(self.items.len());
        let from = from.min(to);
        Value::from_span(&self.items[from..to])
    }
}

/// Look at the item at `pos` through the cursor interface, leaving the
/// cursor where it was.
pub fn peek_at(input: &mut dyn Input, pos: usize) -> Option<Value> {
    let saved = input.position();
    input.set_position(pos);
    let item = input.read();
    input.set_position(saved);
    item
}

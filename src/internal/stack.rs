//! Resolution stack used for cycle detection.

use smallvec::SmallVec;

/// Errors raised by [`ResolutionStack`] misuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
    #[error("Stack is empty")]
    Empty,
    #[error("Item already exists in stack")]
    Exists,
}

/// Ordered sequence of in-flight item names with set semantics.
///
/// A duplicate push signals a cycle. Resolution chains are shallow in
/// practice, so the names live inline until the chain grows past eight.
#[derive(Debug, Default, Clone)]
pub struct ResolutionStack {
    items: SmallVec<[&'static str; 8]>,
}

impl ResolutionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: &'static str) -> Result<(), StackError> {
        if self.contains(item) {
            return Err(StackError::Exists);
        }
        self.items.push(item);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<&'static str, StackError> {
        self.items.pop().ok_or(StackError::Empty)
    }

    pub fn peek(&self) -> Option<&'static str> {
        self.items.last().copied()
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.iter().any(|&n| n == item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Snapshot of the stack, outermost first.
    pub fn to_vec(&self) -> Vec<&'static str> {
        self.items.to_vec()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.items.iter().copied()
    }
}

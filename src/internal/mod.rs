//! Internal implementation details.

pub(crate) mod resolution;
pub(crate) mod stack;

pub(crate) use resolution::Resolution;
pub use stack::{ResolutionStack, StackError};

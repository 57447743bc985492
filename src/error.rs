//! Error types for module resolution.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Shared, cloneable cause attached to an [`DependencyResolutionError`].
pub type Cause = Arc<dyn Error + Send + Sync + 'static>;

/// Boxed error returned by fallible resolvers and initializers.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Machine-checkable failure kind.
///
/// The textual form (used in messages) is the variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A consumer read a name that is not part of the public surface.
    PrivateMemberAccessFailure,
    /// The item is already being resolved further down the stack.
    CircularDependencyFailure,
    /// No resolver is registered under the requested name.
    ResolverIsNotDefined,
    /// The resolver body (or its initializer) failed.
    InstantiationFailure,
    /// The resolved value is not of the requested type.
    TypeMismatch,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::PrivateMemberAccessFailure => "PrivateMemberAccessFailure",
            ErrorCode::CircularDependencyFailure => "CircularDependencyFailure",
            ErrorCode::ResolverIsNotDefined => "ResolverIsNotDefined",
            ErrorCode::InstantiationFailure => "InstantiationFailure",
            ErrorCode::TypeMismatch => "TypeMismatch",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single error produced by the resolution engine.
///
/// Every error records the resolution stack (ancestor names, outermost first)
/// at the point where it was reported and the offending item name.
///
/// # Examples
///
/// ```rust
/// use ditory::{DependencyResolutionError, ErrorCode};
///
/// let err = DependencyResolutionError::new(
///     ErrorCode::CircularDependencyFailure,
///     vec!["b", "c", "d"],
///     "a",
/// );
/// assert_eq!(
///     err.to_string(),
///     "CircularDependencyFailure in attempting to resolve <a> with stack <b> <- <c> <- <d>"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct DependencyResolutionError {
    code: ErrorCode,
    resolution_stack: Vec<&'static str>,
    item: String,
    cause: Option<Cause>,
}

impl DependencyResolutionError {
    pub fn new(code: ErrorCode, resolution_stack: Vec<&'static str>, item: impl Into<String>) -> Self {
        Self {
            code,
            resolution_stack,
            item: item.into(),
            cause: None,
        }
    }

    /// Creates an error carrying the original failure as its cause.
    pub fn with_cause(
        code: ErrorCode,
        resolution_stack: Vec<&'static str>,
        item: impl Into<String>,
        cause: Cause,
    ) -> Self {
        Self {
            cause: Some(cause),
            ..Self::new(code, resolution_stack, item)
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn resolution_stack(&self) -> &[&'static str] {
        &self.resolution_stack
    }

    pub fn item(&self) -> &str {
        &self.item
    }

    /// The underlying failure, if the resolver body produced one.
    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// Recovers the taxonomy error from a boxed resolver error without re-wrapping.
    pub(crate) fn from_boxed(err: BoxError) -> Result<Self, BoxError> {
        err.downcast::<Self>().map(|boxed| *boxed)
    }
}

impl fmt::Display for DependencyResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in attempting to resolve <{}>", self.code, self.item)?;
        if !self.resolution_stack.is_empty() {
            f.write_str(" with stack ")?;
            for (i, parent) in self.resolution_stack.iter().enumerate() {
                if i > 0 {
                    f.write_str(" <- ")?;
                }
                write!(f, "<{}>", parent)?;
            }
        }
        Ok(())
    }
}

impl Error for DependencyResolutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn Error + 'static))
    }
}

/// Panic raised inside a resolver body, captured as an error cause.
#[derive(Debug, Clone, thiserror::Error)]
#[error("resolver panicked: {message}")]
pub struct ResolverPanic {
    pub message: String,
}

impl ResolverPanic {
    pub(crate) fn from_payload(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { message }
    }
}

/// Result type for resolution operations.
pub type DiResult<T> = Result<T, DependencyResolutionError>;

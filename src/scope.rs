//! Scope tags and the scope-composition rule.

use std::fmt;
use std::str::FromStr;

/// Cache lifetime policy for a resolver's value.
///
/// - **Module**: cached once per container instance (default)
/// - **Singleton**: cached once per process, shared by every container built
///   from the same declarations
/// - **Transient**: re-invoked on every access, memoized within one top-level
///   resolution
/// - **Async**: cached once per continuation context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum Scope {
    Module,
    Singleton,
    Transient,
    Async,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Module => "module",
            Scope::Singleton => "singleton",
            Scope::Transient => "transient",
            Scope::Async => "async",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strongly a scope tag holds against a dependent's suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeMarker {
    /// Plain declaration; may be widened by a dependent.
    Declared,
    /// `!scope`: never widened.
    Forced,
    /// `?scope`: a default that applies only where nothing else is declared.
    Suggested,
}

/// A scope plus its marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeTag {
    pub scope: Scope,
    pub marker: ScopeMarker,
}

impl ScopeTag {
    pub const MODULE: ScopeTag = ScopeTag::declared(Scope::Module);
    pub const SINGLETON: ScopeTag = ScopeTag::declared(Scope::Singleton);
    pub const TRANSIENT: ScopeTag = ScopeTag::declared(Scope::Transient);
    pub const ASYNC: ScopeTag = ScopeTag::declared(Scope::Async);

    pub const fn declared(scope: Scope) -> Self {
        Self { scope, marker: ScopeMarker::Declared }
    }

    pub const fn forced(scope: Scope) -> Self {
        Self { scope, marker: ScopeMarker::Forced }
    }

    pub const fn suggested(scope: Scope) -> Self {
        Self { scope, marker: ScopeMarker::Suggested }
    }

    /// The scope without its marker.
    pub fn normalize(&self) -> Scope {
        self.scope
    }

    pub fn is_forced(&self) -> bool {
        self.marker == ScopeMarker::Forced
    }

    pub fn is_suggested(&self) -> bool {
        self.marker == ScopeMarker::Suggested
    }
}

impl From<Scope> for ScopeTag {
    fn from(scope: Scope) -> Self {
        ScopeTag::declared(scope)
    }
}

impl fmt::Display for ScopeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.marker {
            ScopeMarker::Declared => write!(f, "{}", self.scope),
            ScopeMarker::Forced => write!(f, "!{}", self.scope),
            ScopeMarker::Suggested => write!(f, "?{}", self.scope),
        }
    }
}

/// Error returned when parsing an unknown scope name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scope `{0}`")]
pub struct ParseScopeError(pub String);

impl FromStr for Scope {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "module" => Ok(Scope::Module),
            "singleton" => Ok(Scope::Singleton),
            "transient" => Ok(Scope::Transient),
            "async" => Ok(Scope::Async),
            other => Err(ParseScopeError(other.to_string())),
        }
    }
}

impl FromStr for ScopeTag {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix('!') {
            rest.parse().map(ScopeTag::forced)
        } else if let Some(rest) = s.strip_prefix('?') {
            rest.parse().map(ScopeTag::suggested)
        } else {
            s.parse().map(ScopeTag::declared)
        }
    }
}

/// Composes a dependency's own scope with the scope suggested by a dependent.
///
/// `singleton` and `transient` are terminal, `module` widens to `async` or
/// `transient`, `async` widens to `transient`. Forced targets and suggested
/// sources never change an existing scope.
///
/// # Examples
///
/// ```rust
/// use ditory::{override_scope, ScopeTag, Scope};
///
/// let widened = override_scope(Some(ScopeTag::MODULE), Some(ScopeTag::TRANSIENT));
/// assert_eq!(widened, Some(ScopeTag::TRANSIENT));
///
/// let pinned = override_scope(Some(ScopeTag::forced(Scope::Module)), Some(ScopeTag::ASYNC));
/// assert_eq!(pinned, Some(ScopeTag::forced(Scope::Module)));
/// ```
pub fn override_scope(own: Option<ScopeTag>, suggested: Option<ScopeTag>) -> Option<ScopeTag> {
    let Some(suggested) = suggested else {
        return own;
    };
    let normalized = suggested.normalize();
    let Some(own) = own else {
        return Some(ScopeTag::declared(normalized));
    };

    if own.is_forced() || suggested.is_suggested() {
        return Some(own);
    }

    // A suggested tag on the target side only ever marks a proxy target; keep it.
    if own.is_suggested() {
        return Some(own);
    }

    match own.scope {
        Scope::Singleton | Scope::Transient => Some(own),
        Scope::Module => match normalized {
            Scope::Async | Scope::Transient => Some(ScopeTag::declared(normalized)),
            _ => Some(own),
        },
        Scope::Async => match normalized {
            Scope::Transient => Some(ScopeTag::declared(normalized)),
            _ => Some(own),
        },
    }
}

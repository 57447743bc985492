//! # ditory
//!
//! Lazy, scope-aware dependency resolution for Rust.
//!
//! Items are declared by name with a resolver `(view, params) -> value` and
//! computed on first access. Every resolver carries a scope that decides how
//! long its value is cached.
//!
//! ## Features
//!
//! - **Four scopes**: `module` (per container), `singleton` (per process),
//!   `transient` (per top-level access) and `async` (per continuation context)
//! - **Scope widening**: a dependent is widened to the shortest-lived scope of
//!   its dependencies unless its scope is forced
//! - **Private and public items**: only public items are reachable from outside
//! - **Cycle detection** with the full resolution path in the error
//! - **Scope-isolation proxies** and lazy back-references for object cycles
//!
//! ## Quick Start
//!
//! ```rust
//! use ditory::{ModuleBuilder, Resolver, Resolvers, Scope};
//! use std::sync::Arc;
//!
//! struct Config {
//!     url: String,
//! }
//!
//! struct Repository {
//!     config: Arc<Config>,
//! }
//!
//! let mut builder = ModuleBuilder::new();
//! builder
//!     .private(
//!         Resolvers::new().item("config", |_, url: &String| Config { url: url.clone() }),
//!         None,
//!     )?
//!     .public(
//!         Resolvers::new().with(
//!             "repository",
//!             Resolver::try_new(|m, _| m.get::<Config>("config").map(|config| Repository { config })),
//!         ),
//!         None,
//!     )?;
//!
//! let module = builder.create("postgres://localhost".to_string());
//! let repository = module.get::<Repository>("repository")?;
//! assert_eq!(repository.config.url, "postgres://localhost");
//! assert_eq!(module.scope_of("repository").map(|s| s.normalize()), Some(Scope::Module));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Scopes
//!
//! ```rust
//! use ditory::{ModuleBuilder, Resolver, Resolvers, Scope, ScopeTag};
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//!
//! let calls = Arc::new(AtomicU32::new(0));
//! let counter = calls.clone();
//!
//! let mut builder = ModuleBuilder::new();
//! builder
//!     .private(
//!         Resolvers::new().item("stamp", move |_, _: &()| counter.fetch_add(1, Ordering::SeqCst)),
//!         Some(ScopeTag::TRANSIENT),
//!     )?
//!     .public(
//!         Resolvers::new().with("report", Resolver::try_new(|m, _| m.get::<u32>("stamp").map(|s| *s))),
//!         None,
//!     )?;
//!
//! let module = builder.create(());
//! module.get::<u32>("report")?;
//! module.get::<u32>("report")?;
//! // `report` was widened to transient by its dependency.
//! assert_eq!(module.scope_of("report"), Some(ScopeTag::TRANSIENT));
//! assert_eq!(calls.load(Ordering::SeqCst), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod async_scope;
pub mod builder;
pub mod config;
pub mod error;
pub mod key;
pub mod module;
pub mod observer;
pub mod reference;
pub mod scope;
pub mod scope_proxy;
pub mod store;

mod internal;
mod registration;

pub use async_scope::{AsyncScopeApi, BoxFuture, SharedAsyncScope};
#[cfg(feature = "async")]
pub use async_scope::TaskLocalAsyncScope;
pub use builder::{DeclarationError, Initializers, ModuleBuilder, Resolver, Resolvers};
pub use config::{FailurePolicy, ModuleOptions, OptionsError};
pub use error::{BoxError, Cause, DependencyResolutionError, DiResult, ErrorCode, ResolverPanic};
pub use internal::{ResolutionStack, StackError};
pub use key::{ModuleId, ResolverId};
pub use module::{Injector, Method, Module, ModuleRef};
pub use observer::{ResolutionObserver, TracingObserver};
pub use reference::Ref;
pub use scope::{override_scope, ParseScopeError, Scope, ScopeMarker, ScopeTag};
pub use scope_proxy::{Proxy, ScopeProxy};
pub use store::{AnyArc, AsyncStorage, InstanceMap, SingletonStore};

//! Module builder.
//!
//! The builder accumulates named resolvers in a private and a public
//! namespace, optional post-construction hooks and container settings, and
//! produces [`Module`] instances with [`ModuleBuilder::create`]. Attaching
//! initializers or creating a container seals the builder against further
//! declarations.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::async_scope::{AsyncScopeApi, SharedAsyncScope};
use crate::config::ModuleOptions;
use crate::module::{Injector, Method, Module, ModuleInner};
use crate::observer::{Observers, ResolutionObserver};
use crate::registration::{InitFn, Registration, Registry, Visibility};
use crate::scope::{Scope, ScopeTag};
use crate::store::{AnyArc, SingletonStore};

mod resolvers;
pub use resolvers::{Initializers, Resolver, Resolvers};

/// Errors raised while declaring items.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeclarationError {
    #[error("Cannot extend initialized module")]
    Sealed,
    #[error("item <{0}> is already declared")]
    DuplicateItem(&'static str),
    #[error("item names must not be empty")]
    EmptyName,
}

/// Frozen declarations shared by every container a builder creates.
pub(crate) struct Blueprint<P> {
    pub(crate) registry: Registry<P>,
    pub(crate) initializers: HashMap<&'static str, InitFn<P>>,
}

/// Declares items and creates containers.
///
/// # Examples
///
/// ```rust
/// use ditory::{ModuleBuilder, Resolver, Resolvers};
///
/// let mut builder = ModuleBuilder::new();
/// builder
///     .private(Resolvers::new().item("base", |_, offset: &u32| 40 + *offset), None)?
///     .public(
///         Resolvers::new().with(
///             "answer",
///             Resolver::try_new(|m, _| m.get::<u32>("base").map(|base| *base)),
///         ),
///         None,
///     )?;
///
/// let module = builder.create(2);
/// assert_eq!(*module.get::<u32>("answer")?, 42);
/// assert!(module.get::<u32>("base").is_err());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ModuleBuilder<P = ()> {
    registry: Registry<P>,
    initializers: HashMap<&'static str, InitFn<P>>,
    blueprint: Option<Arc<Blueprint<P>>>,
    sealed: bool,
    singletons: Arc<SingletonStore>,
    async_scope: Arc<dyn AsyncScopeApi>,
    options: ModuleOptions,
    observers: Observers,
}

impl<P: Send + Sync + 'static> ModuleBuilder<P> {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            initializers: HashMap::new(),
            blueprint: None,
            sealed: false,
            singletons: SingletonStore::process(),
            async_scope: Arc::new(SharedAsyncScope::new()),
            options: ModuleOptions::default(),
            observers: Observers::new(),
        }
    }

    // ----- Declarations -----

    /// Declares items visible only to other resolvers of this module.
    ///
    /// Resolvers without a scope of their own take `scope`, or `module` when
    /// `scope` is `None`.
    pub fn private(
        &mut self,
        resolvers: Resolvers<P>,
        scope: Option<ScopeTag>,
    ) -> Result<&mut Self, DeclarationError> {
        self.declare(resolvers, scope, Visibility::Private)
    }

    /// Declares items reachable through [`Module::get`].
    pub fn public(
        &mut self,
        resolvers: Resolvers<P>,
        scope: Option<ScopeTag>,
    ) -> Result<&mut Self, DeclarationError> {
        self.declare(resolvers, scope, Visibility::Public)
    }

    /// Declares a private callable operation; see [`public_impl`](Self::public_impl).
    pub fn private_impl<A, R, F>(&mut self, name: &'static str, method: F) -> Result<&mut Self, DeclarationError>
    where
        A: 'static,
        R: 'static,
        F: for<'a> Fn(&Injector<'a, P>, A) -> R + Send + Sync + 'static,
    {
        self.declare(
            Resolvers::new().with(name, method_resolver(method)),
            None,
            Visibility::Private,
        )
    }

    /// Declares a public callable operation.
    ///
    /// The item's value is a [`Method`]; every call gets a fresh view of the
    /// module, so dependencies are resolved at call time.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ditory::{ModuleBuilder, Resolvers};
    ///
    /// let mut builder = ModuleBuilder::new();
    /// builder
    ///     .private(Resolvers::new().item("greeting", |_, _: &()| "hello".to_string()), None)?
    ///     .public_impl("greet", |m, name: &'static str| -> String {
    ///         let greeting = m.get::<String>("greeting").map(|g| g.to_string()).unwrap_or_default();
    ///         format!("{greeting}, {name}")
    ///     })?;
    ///
    /// let module = builder.create(());
    /// assert_eq!(module.call::<&'static str, String>("greet", "world")?, "hello, world");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn public_impl<A, R, F>(&mut self, name: &'static str, method: F) -> Result<&mut Self, DeclarationError>
    where
        A: 'static,
        R: 'static,
        F: for<'a> Fn(&Injector<'a, P>, A) -> R + Send + Sync + 'static,
    {
        self.declare(
            Resolvers::new().with(name, method_resolver(method)),
            None,
            Visibility::Public,
        )
    }

    /// Attaches post-construction hooks and seals the builder.
    ///
    /// May be called more than once before the first [`create`](Self::create);
    /// a later hook for the same name replaces the earlier one.
    pub fn init(&mut self, initializers: Initializers<P>) -> Result<&mut Self, DeclarationError> {
        if self.blueprint.is_some() {
            return Err(DeclarationError::Sealed);
        }
        self.sealed = true;
        self.initializers.extend(initializers.hooks);
        Ok(self)
    }

    fn declare(
        &mut self,
        resolvers: Resolvers<P>,
        scope: Option<ScopeTag>,
        visibility: Visibility,
    ) -> Result<&mut Self, DeclarationError> {
        if self.sealed {
            return Err(DeclarationError::Sealed);
        }
        // Validate the whole batch first so a rejected call declares nothing.
        for (i, &(name, _)) in resolvers.items.iter().enumerate() {
            if name.is_empty() {
                return Err(DeclarationError::EmptyName);
            }
            let repeated = resolvers.items[..i].iter().any(|(earlier, _)| *earlier == name);
            if repeated || self.registry.contains(name) {
                return Err(DeclarationError::DuplicateItem(name));
            }
        }

        let batch_scope = scope.unwrap_or(ScopeTag::MODULE);
        for (name, mut resolver) in resolvers.items {
            if let Some(target) = resolver.target.take() {
                let hidden_scope = target.scope;
                self.registry.insert(Registration {
                    id: target.id,
                    name: hidden_name(hidden_scope, name),
                    visibility: Visibility::Hidden,
                    scope: hidden_scope,
                    ctor: target.ctor,
                });
            }
            tracing::trace!(item = name, ?visibility, "declared");
            self.registry.insert(Registration {
                id: resolver.id,
                name,
                visibility,
                scope: Some(resolver.scope.unwrap_or(batch_scope)),
                ctor: resolver.ctor,
            });
        }
        Ok(self)
    }

    // ----- Container settings -----

    /// Uses `store` for singleton-scoped items instead of the process-wide
    /// store.
    pub fn with_singleton_store(&mut self, store: Arc<SingletonStore>) -> &mut Self {
        self.singletons = store;
        self
    }

    /// Uses `provider` to locate the store of async-scoped items.
    pub fn with_async_scope(&mut self, provider: Arc<dyn AsyncScopeApi>) -> &mut Self {
        self.async_scope = provider;
        self
    }

    pub fn with_options(&mut self, options: ModuleOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Adds an observer notified of every resolver invocation of containers
    /// created afterwards.
    pub fn add_observer(&mut self, observer: Arc<dyn ResolutionObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    // ----- Construction -----

    /// Creates a container bound to `params`, sealing the builder.
    ///
    /// Every container created by one builder shares the declarations and
    /// the singleton store; module-scoped values are per container.
    pub fn create(&mut self, params: P) -> Module<P> {
        self.sealed = true;
        let blueprint = match &self.blueprint {
            Some(blueprint) => blueprint.clone(),
            None => {
                let blueprint = Arc::new(Blueprint {
                    registry: std::mem::take(&mut self.registry),
                    initializers: std::mem::take(&mut self.initializers),
                });
                self.blueprint = Some(blueprint.clone());
                blueprint
            }
        };
        Module::from_inner(ModuleInner::new(
            blueprint,
            params,
            self.singletons.clone(),
            self.async_scope.clone(),
            self.options.clone(),
            self.observers.clone(),
        ))
    }
}

impl<P: Send + Sync + 'static> Default for ModuleBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for ModuleBuilder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let declared = match &self.blueprint {
            Some(blueprint) => blueprint.registry.len(),
            None => self.registry.len(),
        };
        f.debug_struct("ModuleBuilder")
            .field("declared", &declared)
            .field("sealed", &self.sealed)
            .field("options", &self.options)
            .finish()
    }
}

/// Wraps a `(view, args) -> result` function into a forced-module resolver
/// whose value is a [`Method`] bound to the container.
fn method_resolver<P, A, R, F>(method: F) -> Resolver<P>
where
    P: Send + Sync + 'static,
    A: 'static,
    R: 'static,
    F: for<'a> Fn(&Injector<'a, P>, A) -> R + Send + Sync + 'static,
{
    let method = Arc::new(method);
    Resolver::from_fn(move |injector, _| {
        let item = injector.current().unwrap_or_default();
        let module = injector.handle();
        let method = method.clone();
        let bound = Method::new(move |args: A| module.with_view(item, |view| method(view, args)));
        Ok(Arc::new(bound) as AnyArc)
    })
    .scoped(ScopeTag::forced(Scope::Module))
}

/// Interned display name of a proxy target, e.g. `async::requestId`.
///
/// Leaked once per proxy declaration so the name can sit on the resolution
/// stack like any declared name.
fn hidden_name(scope: Option<ScopeTag>, name: &'static str) -> &'static str {
    let scope = scope.map_or(Scope::Module, |s| s.normalize());
    Box::leak(format!("{scope}::{name}").into_boxed_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicates_across_namespaces() {
        let mut builder = ModuleBuilder::<()>::new();
        builder.private(Resolvers::new().item("a", |_, _| 1u8), None).unwrap();
        let err = builder
            .public(Resolvers::new().item("a", |_, _| 2u8), None)
            .unwrap_err();
        assert_eq!(err, DeclarationError::DuplicateItem("a"));
    }

    #[test]
    fn rejects_duplicates_within_a_batch_atomically() {
        let mut builder = ModuleBuilder::<()>::new();
        let err = builder
            .public(
                Resolvers::new()
                    .item("x", |_, _| 1u8)
                    .item("y", |_, _| 1u8)
                    .item("x", |_, _| 1u8),
                None,
            )
            .unwrap_err();
        assert_eq!(err, DeclarationError::DuplicateItem("x"));
        assert!(!builder.registry.contains("y"));
    }

    #[test]
    fn rejects_empty_names() {
        let mut builder = ModuleBuilder::<()>::new();
        let err = builder.public(Resolvers::new().item("", |_, _| 1u8), None).unwrap_err();
        assert_eq!(err, DeclarationError::EmptyName);
    }

    #[test]
    fn init_seals_declarations() {
        let mut builder = ModuleBuilder::<()>::new();
        builder.init(Initializers::new()).unwrap();
        let err = builder.public(Resolvers::new().item("a", |_, _| 1u8), None).unwrap_err();
        assert_eq!(err.to_string(), "Cannot extend initialized module");
        assert!(builder.is_sealed());
    }

    #[test]
    fn create_seals_everything() {
        let mut builder = ModuleBuilder::<()>::new();
        let _module = builder.create(());
        assert_eq!(
            builder.public_impl("m", |_, ()| ()).unwrap_err(),
            DeclarationError::Sealed
        );
        assert_eq!(builder.init(Initializers::new()).unwrap_err(), DeclarationError::Sealed);
    }

    #[test]
    fn declaration_scope_applies_to_unscoped_resolvers() {
        let mut builder = ModuleBuilder::<()>::new();
        builder
            .public(
                Resolvers::new()
                    .item("plain", |_, _| 1u8)
                    .with("own", Resolver::new(|_, _| 1u8).scoped(Scope::Singleton)),
                Some(ScopeTag::TRANSIENT),
            )
            .unwrap();
        let plain = builder.registry.index_of("plain").unwrap();
        let own = builder.registry.index_of("own").unwrap();
        assert_eq!(builder.registry.entry(plain).scope, Some(ScopeTag::TRANSIENT));
        assert_eq!(builder.registry.entry(own).scope, Some(ScopeTag::SINGLETON));
    }

    #[test]
    fn hidden_names_carry_the_scope() {
        assert_eq!(
            hidden_name(Some(ScopeTag::suggested(Scope::Async)), "requestId"),
            "async::requestId"
        );
    }
}

//! Core registry implementation

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::any::type_name;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, trace, warn};

use crate::autowire::{Autowire, AutowireFn, Injector, Shape};
use crate::config::{RegistryConfig, SimilarMatchPolicy};
use crate::entry::{Entry, EntryId, Producer};
use crate::error::{DiError, DiResult};
use crate::handle::Handle;
use crate::lifecycle::Lifecycle;
use crate::matcher::{self, Conversion, Match};
use crate::provider::ServiceProvider;
use crate::registration::{Binding, Registration, Source};
use crate::types::{downcast_instance, Instance, TypeInfo, TypeKey};

/// Entries owned by one registry
#[derive(Default)]
struct RegistryState {
    /// Registration order, used for full scans
    entries: Vec<Arc<Entry>>,
    by_handle: FxHashMap<Arc<str>, Arc<Entry>>,
    by_type: FxHashMap<TypeKey, Vec<Arc<Entry>>>,
}

impl RegistryState {
    fn insert(&mut self, entry: Arc<Entry>) {
        if let Some(replaced) = self
            .by_handle
            .insert(Arc::clone(entry.handle()), Arc::clone(&entry))
        {
            self.unindex(&replaced);
        }

        self.by_type
            .entry(entry.info().key())
            .or_default()
            .push(Arc::clone(&entry));
        self.entries.push(entry);
    }

    fn unindex(&mut self, replaced: &Entry) {
        let id = replaced.id();
        let key = replaced.info().key();

        self.entries.retain(|entry| entry.id() != id);
        if let Some(indexed) = self.by_type.get_mut(&key) {
            indexed.retain(|entry| entry.id() != id);
            if indexed.is_empty() {
                self.by_type.remove(&key);
            }
        }
    }
}

pub(crate) struct RegistryInner {
    state: RwLock<RegistryState>,
    parent: Option<Registry>,
    config: RegistryConfig,
}

/// Thread-safe registry of producers, optionally chained to a parent
///
/// Cloning is cheap and yields another handle to the same registry.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

/// A matched entry and the conversion that turns it into the target
struct Candidate {
    entry: Arc<Entry>,
    conversion: Conversion,
}

impl Candidate {
    fn produce(&self, target: &TypeInfo) -> DiResult<Resolved> {
        let instance = self.entry.resolve()?;
        let instance = matcher::coerce(target, self.entry.info(), instance, &self.conversion)?;
        Ok(Resolved {
            instance,
            declared: self.entry.info().name(),
        })
    }
}

/// An instance already converted to the requested type
struct Resolved {
    instance: Instance,
    declared: &'static str,
}

impl Resolved {
    fn from_entry(entry: &Entry) -> DiResult<Self> {
        Ok(Self {
            instance: entry.resolve()?,
            declared: entry.info().name(),
        })
    }

    fn typed<T: Clone + 'static>(&self) -> DiResult<T> {
        downcast_instance::<T>(&self.instance).ok_or(DiError::TypeMismatch {
            expected: type_name::<T>(),
            found: self.declared,
        })
    }
}

impl Registry {
    /// Create a root registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a root registry
    pub fn with_config(config: RegistryConfig) -> Self {
        Self::from_parts(None, config)
    }

    /// Create a registry that falls back to `parent` on lookup misses
    ///
    /// The parent link is fixed for the lifetime of the scope and the
    /// parent's configuration is inherited.
    pub fn new_scoped(parent: &Registry) -> Self {
        debug!(parent_entries = parent.len(), "created scoped registry");
        Self::from_parts(Some(parent.clone()), parent.config().clone())
    }

    fn from_parts(parent: Option<Registry>, config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                state: RwLock::new(RegistryState::default()),
                parent,
                config,
            }),
        }
    }

    /// Process-wide root registry
    ///
    /// Created on first use and never torn down. Nothing in this crate
    /// registers into it implicitly.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    /// Parent registry, or `None` for a root
    pub fn parent(&self) -> Option<&Registry> {
        self.inner.parent.as_ref()
    }

    /// Configuration in effect
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Whether both values refer to the same registry
    pub fn ptr_eq(&self, other: &Registry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of local entries
    pub fn len(&self) -> usize {
        self.inner.state.read().entries.len()
    }

    /// Whether there are no local entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a fixed value under its own type
    ///
    /// Every call adds a new entry, so providing the same type twice makes
    /// by-type resolution of that type ambiguous.
    pub fn provide_value<T: Send + Sync + 'static>(&self, value: T) -> DiResult<()> {
        self.register([Registration::value(value)])
    }

    /// Register a singleton factory under its return type
    pub fn provide_factory<T, F>(&self, factory: F) -> DiResult<()>
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register([Registration::factory(factory)])
    }

    /// Register a prototype factory under its return type
    pub fn provide_prototype<T, F>(&self, factory: F) -> DiResult<()>
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register([Registration::prototype(factory)])
    }

    /// Register a singleton factory whose parameters are auto-wired
    ///
    /// Parameters are resolved from this registry when the factory first
    /// runs. Like any singleton failure, `RegistryReleased` (this registry was
    /// dropped before the first resolution) is memoized and returned on every
    /// later resolution of the entry.
    pub fn provide_auto_factory<Args, F>(&self, factory: F) -> DiResult<()>
    where
        F: AutowireFn<Args> + Send + Sync + 'static,
        F::Output: Send + Sync + 'static,
        Args: 'static,
    {
        self.register([Registration::autowired(Lifecycle::Singleton, factory)])
    }

    /// Register a prototype factory whose parameters are auto-wired
    pub fn provide_auto_prototype<Args, F>(&self, factory: F) -> DiResult<()>
    where
        F: AutowireFn<Args> + Send + Sync + 'static,
        F::Output: Send + Sync + 'static,
        Args: 'static,
    {
        self.register([Registration::autowired(Lifecycle::Prototype, factory)])
    }

    /// Apply a batch of registrations atomically
    ///
    /// The whole batch is validated before anything is inserted, and
    /// inserted under a single write-lock acquisition.
    pub fn register<I>(&self, registrations: I) -> DiResult<()>
    where
        I: IntoIterator,
        I::Item: Into<Binding>,
    {
        let bindings: Vec<Binding> = registrations.into_iter().map(Into::into).collect();
        for binding in &bindings {
            binding.validate()?;
        }

        let mut state = self.inner.state.write();
        Self::check_handles(&state, &bindings)?;

        let count = bindings.len();
        for binding in bindings {
            let entry = self.materialize(binding);
            state.insert(Arc::new(entry));
        }
        let total = state.entries.len();
        drop(state);

        debug!(count, total, "registered bindings");
        Ok(())
    }

    /// A handle key may only ever name one declared type per registry
    fn check_handles(state: &RegistryState, bindings: &[Binding]) -> DiResult<()> {
        let mut staged: FxHashMap<&str, TypeKey> = FxHashMap::default();

        for binding in bindings {
            let Some(key) = binding.handle.as_deref() else {
                continue;
            };
            let declared = binding.info.key();
            let bound = staged
                .get(key)
                .copied()
                .or_else(|| state.by_handle.get(key).map(|entry| entry.info().key()));

            if let Some(bound) = bound {
                if bound != declared {
                    return Err(DiError::InvalidRegistration(format!(
                        "handle {} is bound to {}, cannot rebind it to {}",
                        key, bound, declared
                    )));
                }
            }
            staged.insert(key, declared);
        }

        Ok(())
    }

    fn materialize(&self, binding: Binding) -> Entry {
        let id = Entry::allocate_id();
        let handle = binding
            .handle
            .unwrap_or_else(|| Arc::from(format!("__provided__{}#{}", binding.info.name(), id.get())));

        let producer = match binding.source {
            Source::Value(value) => Producer::Value(value),
            Source::Factory(factory) => Producer::Factory(factory),
            Source::Autowired(factory) => {
                let owner: Weak<RegistryInner> = Arc::downgrade(&self.inner);
                Producer::Factory(Arc::new(move || {
                    let inner = owner.upgrade().ok_or(DiError::RegistryReleased)?;
                    factory(&Registry { inner })
                }))
            }
        };

        Entry::new(id, handle, binding.info, binding.lifecycle, producer)
    }

    /// Resolve the entry bound to `handle`, searching the scope chain
    pub fn get<T: Clone + Send + Sync + 'static>(&self, handle: &Handle<T>) -> DiResult<T> {
        self.find(handle)?
            .ok_or_else(|| DiError::HandleNotFound(handle.key().to_string()))
    }

    /// Like [`get`](Self::get), reporting absence as `None`
    pub fn find<T: Clone + Send + Sync + 'static>(
        &self,
        handle: &Handle<T>,
    ) -> DiResult<Option<T>> {
        let Some(entry) = self.entry_for(handle.key()) else {
            return Ok(None);
        };
        Resolved::from_entry(&entry)?.typed::<T>().map(Some)
    }

    fn entry_for(&self, key: &str) -> Option<Arc<Entry>> {
        let local = self.inner.state.read().by_handle.get(key).cloned();
        match local {
            Some(entry) => Some(entry),
            None => self.parent()?.entry_for(key),
        }
    }

    /// Resolve a value by type
    ///
    /// A miss across the whole scope chain is `Ok(None)`. More than one exact
    /// candidate in a single registry is `AmbiguousRegistration`.
    pub fn resolve<T: Clone + Send + Sync + 'static>(&self) -> DiResult<Option<T>> {
        let target = TypeInfo::target::<T>();
        match self.resolve_instance(&target)? {
            Some(resolved) => resolved.typed::<T>().map(Some),
            None => Ok(None),
        }
    }

    /// Resolve a value by type, failing with `ServiceNotFound` on a miss
    pub fn must_resolve<T: Clone + Send + Sync + 'static>(&self) -> DiResult<T> {
        self.resolve::<T>()?.ok_or(DiError::ServiceNotFound {
            service_type: type_name::<T>(),
        })
    }

    fn indexed(&self, key: TypeKey) -> Vec<Arc<Entry>> {
        self.inner
            .state
            .read()
            .by_type
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    fn resolve_instance(&self, target: &TypeInfo) -> DiResult<Option<Resolved>> {
        match self.indexed(target.key()).as_slice() {
            [] => self.find_single(target),
            [entry] => {
                trace!(
                    target_type = target.name(),
                    entry = entry.id().get(),
                    "resolved from type index"
                );
                Resolved::from_entry(entry).map(Some)
            }
            many => Err(DiError::AmbiguousRegistration {
                service_type: target.name(),
                count: many.len(),
            }),
        }
    }

    /// Full scan of local entries, then the parent, then a local similar match
    fn find_single(&self, target: &TypeInfo) -> DiResult<Option<Resolved>> {
        let (exact, similar) = self.scan(target)?;

        if let Some(candidate) = exact {
            return candidate.produce(target).map(Some);
        }

        if let Some(parent) = self.parent() {
            if let Some(resolved) = parent.resolve_instance(target)? {
                return Ok(Some(resolved));
            }
        }

        match similar {
            Some(candidate) if self.config().similar_match.permits_coercion() => {
                self.report_similar(target, 1);
                candidate.produce(target).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn scan(&self, target: &TypeInfo) -> DiResult<(Option<Candidate>, Option<Candidate>)> {
        let state = self.inner.state.read();
        let mut exact = None;
        let mut exact_count = 0;
        let mut similar = None;

        for entry in &state.entries {
            match matcher::classify(target, entry.info()) {
                Some(Match::Exact(conversion)) => {
                    exact_count += 1;
                    if exact.is_none() {
                        exact = Some(Candidate {
                            entry: Arc::clone(entry),
                            conversion,
                        });
                    }
                }
                Some(Match::Similar(conversion)) if similar.is_none() => {
                    similar = Some(Candidate {
                        entry: Arc::clone(entry),
                        conversion,
                    });
                }
                _ => {}
            }
        }

        if exact_count > 1 {
            return Err(DiError::AmbiguousRegistration {
                service_type: target.name(),
                count: exact_count,
            });
        }

        Ok((exact, similar))
    }

    fn report_similar(&self, target: &TypeInfo, count: usize) {
        if self.config().similar_match == SimilarMatchPolicy::Warn {
            warn!(
                target_type = target.name(),
                similar_matches = count,
                "No exact match for type {}, using {} similar type(s). Consider registering the exact type.",
                target.name(),
                count
            );
        }
    }

    /// Every value matching `T` across the scope chain
    ///
    /// Local type-index hits come first, then other local matches, then the
    /// parent's. No entry contributes twice.
    pub fn resolve_all<T: Clone + Send + Sync + 'static>(&self) -> DiResult<Vec<T>> {
        let target = TypeInfo::target::<T>();
        let mut seen = FxHashSet::default();
        let mut found = Vec::new();

        for entry in self.indexed(target.key()) {
            if seen.insert(entry.id()) {
                found.push(Resolved::from_entry(&entry)?);
            }
        }

        self.collect_matching(&target, &mut seen, &mut found)?;

        found.iter().map(Resolved::typed::<T>).collect()
    }

    fn collect_matching(
        &self,
        target: &TypeInfo,
        seen: &mut FxHashSet<EntryId>,
        found: &mut Vec<Resolved>,
    ) -> DiResult<()> {
        let mut exact = Vec::new();
        let mut similar = Vec::new();

        {
            let state = self.inner.state.read();
            for entry in &state.entries {
                if seen.contains(&entry.id()) {
                    continue;
                }
                let (bucket, conversion) = match matcher::classify(target, entry.info()) {
                    Some(Match::Exact(conversion)) => (&mut exact, conversion),
                    Some(Match::Similar(conversion)) => (&mut similar, conversion),
                    None => continue,
                };
                seen.insert(entry.id());
                bucket.push(Candidate {
                    entry: Arc::clone(entry),
                    conversion,
                });
            }
        }

        let has_exact = !exact.is_empty();
        for candidate in &exact {
            found.push(candidate.produce(target)?);
        }

        if let Some(parent) = self.parent() {
            parent.collect_matching(target, seen, found)?;
        }

        if !has_exact && !similar.is_empty() && self.config().similar_match.permits_coercion() {
            self.report_similar(target, similar.len());
            for candidate in &similar {
                found.push(candidate.produce(target)?);
            }
        }

        Ok(())
    }

    /// Build a struct shape by injecting every field
    pub fn construct<S: Autowire>(&self) -> DiResult<S> {
        if S::shape() != Shape::Struct {
            return Err(DiError::InvalidTarget {
                target: type_name::<S>(),
            });
        }
        Injector::new(self).construct::<S>()
    }

    /// Overwrite `target` with a freshly injected value
    ///
    /// `target` is left untouched when any field fails to resolve.
    pub fn inject<S: Autowire>(&self, target: &mut S) -> DiResult<()> {
        *target = self.construct::<S>()?;
        Ok(())
    }

    /// Resolve every parameter of `callable` and invoke it once
    pub fn invoke<Args, F: AutowireFn<Args>>(&self, callable: F) -> DiResult<F::Output> {
        callable.call_autowired(self)
    }

    /// Like [`invoke`](Self::invoke) for callables returning `Result`
    pub fn call<Args, F, T, E>(&self, callable: F) -> DiResult<T>
    where
        F: AutowireFn<Args, Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.invoke(callable)?
            .map_err(|err| DiError::ServiceCreationFailed {
                service_type: type_name::<T>(),
                reason: err.to_string(),
            })
    }

    /// Drop every local entry; the parent is not affected
    pub fn clear(&self) {
        let mut state = self.inner.state.write();
        let dropped = std::mem::take(&mut *state);
        drop(state);

        debug!(dropped = dropped.entries.len(), "cleared registry");
    }
}

impl ServiceProvider for Registry {
    fn has_type(&self, key: TypeKey) -> bool {
        let local = self.inner.state.read().by_type.contains_key(&key);
        local || self.parent().is_some_and(|parent| parent.has_type(key))
    }

    fn has_handle(&self, key: &str) -> bool {
        self.entry_for(key).is_some()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.len())
            .field("scoped", &self.parent().is_some())
            .field("config", self.config())
            .finish()
    }
}

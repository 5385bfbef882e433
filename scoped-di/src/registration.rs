//! Declarative registrations applied by `Registry::register`

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::autowire::AutowireFn;
use crate::container::Registry;
use crate::entry::Factory;
use crate::error::{DiError, DiResult};
use crate::handle::Handle;
use crate::lifecycle::Lifecycle;
use crate::types::{Capability, Instance, TypeInfo};

/// Factory that resolves its inputs from the registry owning the entry
pub(crate) type AutowiredFactory = Arc<dyn Fn(&Registry) -> DiResult<Instance> + Send + Sync>;

pub(crate) enum Source {
    Value(Instance),
    Factory(Factory),
    Autowired(AutowiredFactory),
}

/// Typed description of one entry: handle, lifecycle and producer
///
/// Nothing happens until the registration is handed to
/// [`Registry::register`](crate::Registry::register).
pub struct Registration<T> {
    binding: Binding,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Registration<T> {
    fn from_source(handle: Option<&Handle<T>>, lifecycle: Lifecycle, source: Source) -> Self {
        Self {
            binding: Binding {
                handle: handle.map(Handle::shared_key),
                info: TypeInfo::of::<T>(),
                lifecycle,
                source,
            },
            _marker: PhantomData,
        }
    }

    /// A fixed value without an explicit handle
    pub fn value(value: T) -> Self {
        Self::from_source(None, Lifecycle::Singleton, Source::Value(Arc::new(value)))
    }

    /// A singleton factory without an explicit handle
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::from_source(None, Lifecycle::Singleton, plain_factory(factory))
    }

    /// A prototype factory without an explicit handle
    pub fn prototype<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::from_source(None, Lifecycle::Prototype, plain_factory(factory))
    }

    /// A fallible factory; an `Err` surfaces as `ServiceCreationFailed`
    pub fn try_factory<F, E>(lifecycle: Lifecycle, factory: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        let factory: Factory = Arc::new(move || match factory() {
            Ok(value) => Ok(Arc::new(value) as Instance),
            Err(err) => Err(DiError::ServiceCreationFailed {
                service_type: std::any::type_name::<T>(),
                reason: err.to_string(),
            }),
        });
        Self::from_source(None, lifecycle, Source::Factory(factory))
    }

    /// A factory whose parameters are resolved from the owning registry
    pub fn autowired<Args, F>(lifecycle: Lifecycle, factory: F) -> Self
    where
        F: AutowireFn<Args, Output = T> + Send + Sync + 'static,
        Args: 'static,
    {
        Self::from_source(None, lifecycle, autowired_factory(factory))
    }

    /// Bind `value` to `handle`
    pub fn bind(handle: &Handle<T>, value: T) -> Self {
        Self::from_source(
            Some(handle),
            Lifecycle::Singleton,
            Source::Value(Arc::new(value)),
        )
    }

    /// Bind a singleton factory to `handle`
    pub fn bind_factory<F>(handle: &Handle<T>, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::from_source(Some(handle), Lifecycle::Singleton, plain_factory(factory))
    }

    /// Bind a prototype factory to `handle`
    pub fn bind_prototype<F>(handle: &Handle<T>, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::from_source(Some(handle), Lifecycle::Prototype, plain_factory(factory))
    }

    /// Bind an auto-wired singleton factory to `handle`
    ///
    /// A failed first run, including `RegistryReleased`, is memoized.
    pub fn bind_auto_factory<Args, F>(handle: &Handle<T>, factory: F) -> Self
    where
        F: AutowireFn<Args, Output = T> + Send + Sync + 'static,
        Args: 'static,
    {
        Self::from_source(
            Some(handle),
            Lifecycle::Singleton,
            autowired_factory(factory),
        )
    }

    /// Bind an auto-wired prototype factory to `handle`
    pub fn bind_auto_prototype<Args, F>(handle: &Handle<T>, factory: F) -> Self
    where
        F: AutowireFn<Args, Output = T> + Send + Sync + 'static,
        Args: 'static,
    {
        Self::from_source(
            Some(handle),
            Lifecycle::Prototype,
            autowired_factory(factory),
        )
    }

    /// Also make the entry resolvable as `C`, e.g. `Arc<dyn Trait>`
    pub fn exposing<C, F>(mut self, cast: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn(&T) -> C + Send + Sync + 'static,
    {
        self.binding.info.push_capability(Capability::new(cast));
        self
    }

    /// Declared type of the produced value
    pub fn type_info(&self) -> &TypeInfo {
        &self.binding.info
    }

    /// Lifecycle of the produced value
    pub fn lifecycle(&self) -> Lifecycle {
        self.binding.lifecycle
    }
}

fn plain_factory<T, F>(factory: F) -> Source
where
    T: Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Source::Factory(Arc::new(move || Ok(Arc::new(factory()) as Instance)))
}

fn autowired_factory<T, Args, F>(factory: F) -> Source
where
    T: Send + Sync + 'static,
    F: AutowireFn<Args, Output = T> + Send + Sync + 'static,
    Args: 'static,
{
    Source::Autowired(Arc::new(move |registry: &Registry| {
        let value = factory.call_autowired(registry)?;
        Ok(Arc::new(value) as Instance)
    }))
}

/// Type-erased registration, ready to be applied to a registry
pub struct Binding {
    pub(crate) handle: Option<Arc<str>>,
    pub(crate) info: TypeInfo,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) source: Source,
}

impl Binding {
    /// Explicit handle key, if any
    pub fn handle_key(&self) -> Option<&str> {
        self.handle.as_deref()
    }

    /// Reject capability tables that cannot be matched unambiguously
    pub(crate) fn validate(&self) -> DiResult<()> {
        let capabilities = self.info.capabilities();
        for (index, capability) in capabilities.iter().enumerate() {
            if capability.key() == self.info.key() {
                return Err(DiError::InvalidRegistration(format!(
                    "{} cannot be exposed as its own type",
                    self.info.name()
                )));
            }
            if capabilities[..index]
                .iter()
                .any(|earlier| earlier.key() == capability.key())
            {
                return Err(DiError::InvalidRegistration(format!(
                    "{} exposes {} more than once",
                    self.info.name(),
                    capability.key()
                )));
            }
        }
        Ok(())
    }
}

impl<T> From<Registration<T>> for Binding {
    fn from(registration: Registration<T>) -> Self {
        registration.binding
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("handle", &self.handle)
            .field("type", &self.info.key())
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}

impl<T> fmt::Debug for Registration<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.binding.fmt(f)
    }
}

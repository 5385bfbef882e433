//! Stable type descriptors used for by-type matching
//!
//! Matching never consults the compiler's reflection beyond `TypeId`: every
//! registered entry carries a [`TypeInfo`] describing its declared type, the
//! key of the shared (`Arc`) form of that type, and the capabilities it was
//! declared to satisfy.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Type-erased value produced by an entry
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Converts an instance into another declared type
pub(crate) type CastFn = Arc<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;

/// Shape converter between `T` and `Arc<T>`
pub(crate) type ShapeFn = fn(&Instance) -> Option<Instance>;

/// Stable identity of a type
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key of `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Underlying `TypeId`
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// An additional type an entry can be resolved as
#[derive(Clone)]
pub struct Capability {
    pub(crate) key: TypeKey,
    pub(crate) cast: CastFn,
}

impl Capability {
    /// Capability exposing values of `T` as `C`
    pub fn new<T, C, F>(cast: F) -> Self
    where
        T: Send + Sync + 'static,
        C: Send + Sync + 'static,
        F: Fn(&T) -> C + Send + Sync + 'static,
    {
        Self {
            key: TypeKey::of::<C>(),
            cast: Arc::new(move |instance: &Instance| {
                let value = instance.downcast_ref::<T>()?;
                Some(Arc::new(cast(value)) as Instance)
            }),
        }
    }

    /// Key of the exposed type
    pub fn key(&self) -> TypeKey {
        self.key
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Capability").field(&self.key).finish()
    }
}

/// Descriptor of a declared or requested type
#[derive(Clone)]
pub struct TypeInfo {
    pub(crate) key: TypeKey,
    pub(crate) shared: TypeKey,
    pub(crate) share: ShapeFn,
    pub(crate) unshare: Option<ShapeFn>,
    pub(crate) capabilities: Vec<Capability>,
}

impl TypeInfo {
    /// Descriptor for a registered type
    pub fn of<T: Send + Sync + 'static>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            shared: TypeKey::of::<Arc<T>>(),
            share: share_instance::<T>,
            unshare: None,
            capabilities: Vec::new(),
        }
    }

    /// Descriptor for a requested type, able to dereference `Arc<T>` into `T`
    pub fn target<T: Clone + Send + Sync + 'static>() -> Self {
        Self {
            unshare: Some(unshare_instance::<T>),
            ..Self::of::<T>()
        }
    }

    /// Key of the described type
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Fully qualified name of the described type
    pub fn name(&self) -> &'static str {
        self.key.name
    }

    /// Declared capabilities
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub(crate) fn push_capability(&mut self, capability: Capability) {
        self.capabilities.push(capability);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("key", &self.key)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// `T` to `Arc<T>`, sharing the stored allocation
fn share_instance<T: Send + Sync + 'static>(instance: &Instance) -> Option<Instance> {
    let shared: Arc<T> = Arc::clone(instance).downcast::<T>().ok()?;
    Some(Arc::new(shared))
}

/// `Arc<T>` to `T` by cloning the pointee
fn unshare_instance<T: Clone + Send + Sync + 'static>(instance: &Instance) -> Option<Instance> {
    let shared = instance.downcast_ref::<Arc<T>>()?;
    Some(Arc::new(T::clone(shared)))
}

/// Read a typed clone out of an instance
pub(crate) fn downcast_instance<T: Clone + 'static>(instance: &Instance) -> Option<T> {
    instance.downcast_ref::<T>().cloned()
}

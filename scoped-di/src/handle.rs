//! Typed handles for targeted resolution

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// Explicit identity of an entry producing `T`
///
/// Two handles are equal when their keys are equal, so a handle may be
/// recreated from its name wherever it is needed.
pub struct Handle<T> {
    key: Arc<str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> Handle<T> {
    /// Handle keyed by the qualified name of `T`, with one outer `Arc` removed
    pub fn new() -> Self {
        Self::from_key(derived_key::<T>())
    }

    /// Handle keyed by `name`; an empty name falls back to the derived key
    pub fn named(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        if name.is_empty() {
            Self::new()
        } else {
            Self::from_key(name)
        }
    }

    fn from_key(key: impl Into<Arc<str>>) -> Self {
        Self {
            key: key.into(),
            _marker: PhantomData,
        }
    }
}

impl<T> Handle<T> {
    /// The identity key
    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn shared_key(&self) -> Arc<str> {
        Arc::clone(&self.key)
    }
}

fn derived_key<T: 'static>() -> String {
    let name = std::any::type_name::<T>();
    name.strip_prefix("alloc::sync::Arc<")
        .and_then(|inner| inner.strip_suffix('>'))
        .unwrap_or(name)
        .to_string()
}

impl<T: 'static> Default for Handle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            key: Arc::clone(&self.key),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.key).finish()
    }
}

impl<T> fmt::Display for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

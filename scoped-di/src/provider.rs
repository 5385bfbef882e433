//! Read-only lookup interface over the scope chain

use crate::types::TypeKey;

/// Presence queries that never run a factory
pub trait ServiceProvider: Send + Sync {
    /// Whether an entry declared exactly as `key` is reachable
    fn has_type(&self, key: TypeKey) -> bool;

    /// Whether an entry is bound to the handle key anywhere in the chain
    fn has_handle(&self, key: &str) -> bool;

    /// Whether an entry declared as `T` is reachable
    fn contains<T: ?Sized + 'static>(&self) -> bool
    where
        Self: Sized,
    {
        self.has_type(TypeKey::of::<T>())
    }
}

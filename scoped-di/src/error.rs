//! Error types for the registry

use thiserror::Error;

/// Result type alias for registry operations
pub type DiResult<T> = Result<T, DiError>;

/// Errors that can occur while registering or resolving
///
/// Errors are `Clone` because a failed singleton initialization is memoized
/// and handed to every caller that resolves the same entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiError {
    /// Registration rejected before any mutation
    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    /// No producer for the type anywhere in the scope chain
    #[error("Service not found: {service_type}")]
    ServiceNotFound { service_type: &'static str },

    /// No entry bound to the handle anywhere in the scope chain
    #[error("Service not found for handle: {0}")]
    HandleNotFound(String),

    /// More than one exact candidate in a single registry
    #[error("Ambiguous registration for {service_type}: found {count} candidates")]
    AmbiguousRegistration {
        service_type: &'static str,
        count: usize,
    },

    /// Injection target is not struct-shaped
    #[error("Invalid injection target: {target} is not struct-shaped")]
    InvalidTarget { target: &'static str },

    /// Struct field could not be resolved or constructed
    #[error("Could not resolve field {field} ({field_type}) in struct {owner}")]
    UnresolvedField {
        owner: &'static str,
        field: &'static str,
        field_type: &'static str,
    },

    /// Callable parameter of primitive or collection shape
    #[error("Cannot auto-resolve primitive type {type_name} (parameter {position})")]
    PrimitiveParameter {
        position: usize,
        type_name: &'static str,
    },

    /// Callable parameter with no registration
    #[error("No registration found for parameter {position} ({type_name})")]
    UnresolvedParameter {
        position: usize,
        type_name: &'static str,
    },

    /// Shape coercion could not bridge the two types
    #[error("Type mismatch: cannot convert {found} to {expected}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A struct shape requires itself while being constructed
    #[error("Circular dependency detected: {path}")]
    CircularDependency { path: String },

    /// Struct construction nested deeper than the configured limit
    #[error("Injection depth limit of {limit} exceeded while constructing {type_name}")]
    DepthExceeded {
        limit: usize,
        type_name: &'static str,
    },

    /// A fallible factory returned an error
    #[error("Failed to create service: {service_type}: {reason}")]
    ServiceCreationFailed {
        service_type: &'static str,
        reason: String,
    },

    /// The registry owning an auto-wired factory was dropped
    #[error("Registry was released before its auto-wired factory ran")]
    RegistryReleased,

    /// Configuration error
    #[cfg(feature = "config")]
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DiError {
    /// Whether this error reports a missing producer rather than a broken one
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DiError::ServiceNotFound { .. }
                | DiError::HandleNotFound(_)
                | DiError::UnresolvedField { .. }
                | DiError::UnresolvedParameter { .. }
        )
    }
}

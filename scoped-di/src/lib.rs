//! Runtime dependency-resolution registry
//!
//! Producers (fixed values, singleton factories, prototype factories) are
//! registered under an explicit typed [`Handle`] or under their own type, and
//! later resolved by handle or by type. A [`Registry`] may be scoped to a
//! parent, in which case lookups that miss locally fall back along the chain.
//!
//! By-type resolution distinguishes exact matches (same declared type, or a
//! declared capability such as `Arc<dyn Trait>`) from similar matches that
//! only differ by `Arc` shape; similar matches are coerced and reported
//! through `tracing`.
//!
//! ```
//! use std::sync::Arc;
//! use scoped_di::prelude::*;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Config { name: String }
//!
//! let root = Registry::new();
//! root.provide_value(Config { name: "x".into() }).unwrap();
//!
//! let scoped = Registry::new_scoped(&root);
//! assert_eq!(scoped.must_resolve::<Config>().unwrap().name, "x");
//!
//! scoped.provide_value(Config { name: "y".into() }).unwrap();
//! assert_eq!(scoped.must_resolve::<Config>().unwrap().name, "y");
//! assert_eq!(root.must_resolve::<Config>().unwrap().name, "x");
//!
//! // A bare value also satisfies requests for its shared form.
//! let shared: Arc<Config> = root.must_resolve().unwrap();
//! assert_eq!(shared.name, "x");
//! ```

pub mod autowire;
pub mod config;
pub mod container;
mod entry;
pub mod error;
pub mod handle;
pub mod lifecycle;
pub mod matcher;
pub mod provider;
pub mod registration;
pub mod types;

pub use autowire::{Autowire, AutowireFn, Injector, Shape};
pub use config::{RegistryConfig, SimilarMatchPolicy};
pub use container::Registry;
pub use error::{DiError, DiResult};
pub use handle::Handle;
pub use lifecycle::Lifecycle;
pub use matcher::{is_exact_match, is_similar_match};
pub use provider::ServiceProvider;
pub use registration::{Binding, Registration};
pub use types::{Capability, Instance, TypeInfo, TypeKey};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        injectable, Autowire, Binding, DiError, DiResult, Handle, Lifecycle, Registration,
        Registry, RegistryConfig, ServiceProvider, SimilarMatchPolicy,
    };
}

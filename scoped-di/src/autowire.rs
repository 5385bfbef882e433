//! Auto-wiring of callable parameters and struct fields
//!
//! A type takes part in auto-wiring through [`Autowire`]. Its [`Shape`] decides
//! what happens when no registration matches: primitives and collections are
//! never auto-resolved as parameters, services must be registered, and struct
//! shapes are constructed field by field with an [`Injector`]. `Arc<T>` has
//! the shape of `T`.
//!
//! ```
//! use std::sync::Arc;
//! use scoped_di::{injectable, Autowire, Registry};
//!
//! #[derive(Clone)]
//! struct Database { url: String }
//! impl Autowire for Database {}
//!
//! injectable! {
//!     #[derive(Clone)]
//!     struct Repository {
//!         db: Arc<Database>,
//!     }
//! }
//!
//! let registry = Registry::new();
//! registry.provide_value(Database { url: "pg://localhost".into() }).unwrap();
//!
//! let repo: Repository = registry.construct().unwrap();
//! assert_eq!(repo.db.url, "pg://localhost");
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};
use std::sync::Arc;

use crate::container::Registry;
use crate::error::{DiError, DiResult};
use crate::types::TypeKey;

/// How a type behaves when it cannot be resolved by type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Scalars and strings
    Primitive,
    /// Built-in collections
    Collection,
    /// Anything that must come from a registration
    Service,
    /// A struct whose fields can be injected
    Struct,
}

/// A type that can be supplied to auto-wired callables and struct fields
///
/// Unsized types such as `dyn Trait` may implement it too, so that `Arc`
/// of them can be auto-wired. `Arc<T>` takes the shape of `T`.
pub trait Autowire: Send + Sync + 'static {
    /// Shape of the type
    fn shape() -> Shape {
        Shape::Service
    }

    /// Build a fresh value by injecting every field
    ///
    /// Only struct shapes construct; see [`injectable!`](crate::injectable).
    fn construct(_injector: &mut Injector<'_>) -> DiResult<Self>
    where
        Self: Sized,
    {
        Err(DiError::InvalidTarget {
            target: std::any::type_name::<Self>(),
        })
    }

    /// Build a fresh value behind an `Arc`
    fn construct_shared(_injector: &mut Injector<'_>) -> DiResult<Arc<Self>> {
        Err(DiError::InvalidTarget {
            target: std::any::type_name::<Arc<Self>>(),
        })
    }
}

macro_rules! autowire_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Autowire for $ty {
                fn shape() -> Shape {
                    Shape::Primitive
                }
            }
        )*
    };
}

autowire_primitive!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, &'static str, str,
);

macro_rules! autowire_collection {
    ($($ty:ident<$($param:ident),+>),* $(,)?) => {
        $(
            impl<$($param: Clone + Send + Sync + 'static),+> Autowire for $ty<$($param),+> {
                fn shape() -> Shape {
                    Shape::Collection
                }
            }
        )*
    };
}

autowire_collection!(
    Vec<T>,
    VecDeque<T>,
    LinkedList<T>,
    BTreeSet<T>,
    BTreeMap<K, V>,
    HashSet<T, S>,
    HashMap<K, V, S>,
);

impl<T: Send + Sync + 'static> Autowire for [T] {
    fn shape() -> Shape {
        Shape::Collection
    }
}

impl<T: ?Sized + Autowire> Autowire for Arc<T> {
    fn shape() -> Shape {
        T::shape()
    }

    fn construct(injector: &mut Injector<'_>) -> DiResult<Self> {
        T::construct_shared(injector)
    }
}

impl Autowire for () {
    fn shape() -> Shape {
        Shape::Primitive
    }
}

/// Walks struct shapes, resolving each field from a registry
pub struct Injector<'r> {
    registry: &'r Registry,
    path: Vec<TypeKey>,
}

impl<'r> Injector<'r> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            path: Vec::new(),
        }
    }

    /// Registry fields are resolved from
    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Resolve field `field` of struct `owner`
    ///
    /// A miss on a struct-shaped field constructs it recursively; any other
    /// miss is `UnresolvedField`.
    pub fn field<F: Autowire + Clone>(&mut self, owner: &'static str, field: &'static str) -> DiResult<F> {
        if let Some(value) = self.registry.resolve::<F>()? {
            return Ok(value);
        }

        if F::shape() == Shape::Struct {
            return self.construct::<F>();
        }

        Err(DiError::UnresolvedField {
            owner,
            field,
            field_type: std::any::type_name::<F>(),
        })
    }

    /// Resolve parameter `position` of a callable taking `arity` parameters
    pub fn parameter<P: Autowire + Clone>(&mut self, position: usize, arity: usize) -> DiResult<P> {
        let type_name = std::any::type_name::<P>();

        match P::shape() {
            Shape::Primitive | Shape::Collection => {
                return Err(DiError::PrimitiveParameter {
                    position,
                    type_name,
                })
            }
            Shape::Service | Shape::Struct => {}
        }

        if let Some(value) = self.registry.resolve::<P>()? {
            return Ok(value);
        }

        if arity == 1 && P::shape() == Shape::Struct {
            return self.construct::<P>();
        }

        Err(DiError::UnresolvedParameter {
            position,
            type_name,
        })
    }

    /// Construct a struct shape, guarding against cycles and runaway depth
    pub fn construct<S: Autowire>(&mut self) -> DiResult<S> {
        let key = TypeKey::of::<S>();

        if self.path.contains(&key) {
            let mut path: Vec<&str> = self.path.iter().map(TypeKey::name).collect();
            path.push(key.name());
            return Err(DiError::CircularDependency {
                path: path.join(" -> "),
            });
        }

        let limit = self.registry.config().max_injection_depth;
        if self.path.len() >= limit {
            return Err(DiError::DepthExceeded {
                limit,
                type_name: key.name(),
            });
        }

        self.path.push(key);
        let built = S::construct(self);
        self.path.pop();
        built
    }
}

/// A callable whose parameters are resolved from a registry
pub trait AutowireFn<Args> {
    /// Return type of the callable
    type Output;

    /// Resolve every parameter from `registry` and invoke once
    fn call_autowired(&self, registry: &Registry) -> DiResult<Self::Output>;
}

macro_rules! impl_autowire_fn {
    ($arity:expr; $($position:tt $ty:ident $var:ident),*) => {
        impl<Func, Out, $($ty,)*> AutowireFn<($($ty,)*)> for Func
        where
            Func: Fn($($ty),*) -> Out,
            $($ty: Autowire + Clone,)*
        {
            type Output = Out;

            #[allow(unused_mut, unused_variables)]
            fn call_autowired(&self, registry: &Registry) -> DiResult<Out> {
                let mut injector = Injector::new(registry);
                $( let $var = injector.parameter::<$ty>($position, $arity)?; )*
                Ok((self)($($var),*))
            }
        }
    };
}

impl_autowire_fn!(0;);
impl_autowire_fn!(1; 0 A1 a1);
impl_autowire_fn!(2; 0 A1 a1, 1 A2 a2);
impl_autowire_fn!(3; 0 A1 a1, 1 A2 a2, 2 A3 a3);
impl_autowire_fn!(4; 0 A1 a1, 1 A2 a2, 2 A3 a3, 3 A4 a4);
impl_autowire_fn!(5; 0 A1 a1, 1 A2 a2, 2 A3 a3, 3 A4 a4, 4 A5 a5);
impl_autowire_fn!(6; 0 A1 a1, 1 A2 a2, 2 A3 a3, 3 A4 a4, 4 A5 a5, 5 A6 a6);
impl_autowire_fn!(7; 0 A1 a1, 1 A2 a2, 2 A3 a3, 3 A4 a4, 4 A5 a5, 5 A6 a6, 6 A7 a7);
impl_autowire_fn!(8; 0 A1 a1, 1 A2 a2, 2 A3 a3, 3 A4 a4, 4 A5 a5, 5 A6 a6, 6 A7 a7, 7 A8 a8);

/// Declare a struct whose fields are injected by type
///
/// The struct must be `Clone`; every field type must implement [`Autowire`]
/// and `Clone`. `Arc` of the struct is constructed the same way.
#[macro_export]
macro_rules! injectable {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field : $ty,
            )*
        }

        impl $crate::Autowire for $name {
            fn shape() -> $crate::Shape {
                $crate::Shape::Struct
            }

            #[allow(unused_variables)]
            fn construct(injector: &mut $crate::Injector<'_>) -> $crate::DiResult<Self> {
                Ok(Self {
                    $(
                        $field: injector.field::<$ty>(stringify!($name), stringify!($field))?,
                    )*
                })
            }

            fn construct_shared(
                injector: &mut $crate::Injector<'_>,
            ) -> $crate::DiResult<::std::sync::Arc<Self>> {
                <Self as $crate::Autowire>::construct(injector).map(::std::sync::Arc::new)
            }
        }
    };
}

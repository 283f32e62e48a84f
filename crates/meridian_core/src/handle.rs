//! Opaque, identity-compared handles for engine-owned values.
//!
//! The orchestrator never looks inside a schema or a parsed document; it
//! only moves them between the engine and hooks, and compares them by
//! *identity*. Each handle wraps an `Arc<dyn Any + Send + Sync>`: two
//! handles are equal exactly when they share one allocation, which is what
//! schema replacement uses to decide whether anything changed.
//!
//! Engines get their concrete value back with
//! [`downcast_ref`](Schema::downcast_ref) or
//! [`downcast_arc`](Schema::downcast_arc).

use core::any::Any;
use core::fmt;
use std::sync::{Arc, Weak};

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            value: Arc<dyn Any + Send + Sync>,
            type_name: &'static str,
        }

        impl $name {
            /// Wraps `value` in a handle with a fresh identity.
            #[must_use]
            pub fn new<T: Any + Send + Sync>(value: T) -> Self {
                Self::from_arc(Arc::new(value))
            }

            /// Wraps an existing allocation. Handles built from clones of the
            /// same `Arc` compare equal.
            #[must_use]
            pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
                Self {
                    value,
                    type_name: core::any::type_name::<T>(),
                }
            }

            /// Borrows the wrapped value if it is a `T`.
            #[must_use]
            pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
                self.value.downcast_ref::<T>()
            }

            /// Returns a shared pointer to the wrapped value if it is a `T`.
            #[must_use]
            pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
                Arc::clone(&self.value).downcast::<T>().ok()
            }

            /// Type name of the wrapped value.
            #[must_use]
            pub fn type_name(&self) -> &'static str {
                self.type_name
            }

            /// Returns `true` if both handles share one allocation.
            #[must_use]
            pub fn ptr_eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.value, &other.value)
            }

            /// Address of the wrapped allocation, stable while any handle lives.
            #[must_use]
            pub fn addr(&self) -> usize {
                Arc::as_ptr(&self.value).cast::<()>().addr()
            }

            /// Weak reference to the wrapped allocation.
            #[must_use]
            pub fn downgrade(&self) -> Weak<dyn Any + Send + Sync> {
                Arc::downgrade(&self.value)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.ptr_eq(other)
            }
        }

        impl Eq for $name {}

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("type", &self.type_name)
                    .field("addr", &format_args!("{:#x}", self.addr()))
                    .finish()
            }
        }
    };
}

opaque_handle!(
    /// The schema (or configuration) every phase runs against.
    Schema
);

opaque_handle!(
    /// A parsed document produced by the parse phase.
    Document
);

opaque_handle!(
    /// Engine-specific type information passed to validation.
    TypeInfo
);

opaque_handle!(
    /// An engine-specific resolver function or object.
    Resolver
);

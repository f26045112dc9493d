//! Explicit type lineage: the superclass / interface chain walked on write.
//!
//! Rust has no runtime class hierarchy, so a type that should fall back to
//! an ancestor's codec declares its ancestors up front. Each link carries a
//! projection from the descendant value to the ancestor value, which is
//! what the ancestor's codec actually receives.

use std::any::{Any, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::codec::TypeKey;
use crate::error::EncodeError;

/// Continuation handed to a projection: receives the projected value.
pub(crate) type Next<'n> = dyn FnMut(&dyn Any) -> Result<(), EncodeError> + 'n;

/// Type-erased projection from a descendant to one ancestor.
pub(crate) type Projector =
    dyn Fn(&dyn Any, &mut Next<'_>) -> Result<(), EncodeError> + Send + Sync;

/// One edge of a lineage.
#[derive(Clone)]
pub(crate) struct Link {
    pub(crate) ancestor: TypeKey,
    pub(crate) project: Arc<Projector>,
}

/// The ancestors declared for one type.
#[derive(Clone, Default)]
pub(crate) struct LineageEntry {
    pub(crate) superclass: Option<Link>,
    pub(crate) interfaces: Vec<Link>,
}

/// Ancestors of `R`, committed with
/// [`Registry::declare`](super::Registry::declare).
///
/// The superclass is reached by borrowing (a struct embedding its base),
/// interfaces either by borrowing or by building an owned view.
///
/// ```rust
/// use binio::{Lineage, Registry};
///
/// struct Base {
///     id: i32,
/// }
///
/// struct Derived {
///     base: Base,
///     label: String,
/// }
///
/// let registry = Registry::new();
/// registry.declare(
///     Lineage::<Derived>::new()
///         .extends(|d: &Derived| &d.base)
///         .implements_ref(|d: &Derived| &d.label),
/// );
/// ```
pub struct Lineage<R> {
    pub(crate) entry: LineageEntry,
    _marker: PhantomData<fn(&R)>,
}

impl<R: Any> Lineage<R> {
    /// Starts an empty lineage for `R`.
    pub fn new() -> Self {
        Self {
            entry: LineageEntry::default(),
            _marker: PhantomData,
        }
    }

    /// Declares `A` as the superclass of `R`. A later call replaces it.
    pub fn extends<A, F>(mut self, upcast: F) -> Self
    where
        A: Any,
        F: Fn(&R) -> &A + Send + Sync + 'static,
    {
        self.entry.superclass = Some(Link {
            ancestor: TypeKey::of::<A>(),
            project: borrowed::<R, A, F>(upcast),
        });
        self
    }

    /// Declares an interface reached by borrowing from `R`.
    pub fn implements_ref<A, F>(mut self, view: F) -> Self
    where
        A: Any,
        F: Fn(&R) -> &A + Send + Sync + 'static,
    {
        self.entry.interfaces.push(Link {
            ancestor: TypeKey::of::<A>(),
            project: borrowed::<R, A, F>(view),
        });
        self
    }

    /// Declares an interface reached through an owned view of `R`.
    pub fn implements<A, F>(mut self, view: F) -> Self
    where
        A: Any,
        F: Fn(&R) -> A + Send + Sync + 'static,
    {
        let project = projector(move |value, next| {
            let owned = view(downcast::<R>(value)?);
            let projected: &dyn Any = &owned;
            next(projected)
        });
        self.entry.interfaces.push(Link {
            ancestor: TypeKey::of::<A>(),
            project,
        });
        self
    }
}

impl<R: Any> Default for Lineage<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn borrowed<R, A, F>(upcast: F) -> Arc<Projector>
where
    R: Any,
    A: Any,
    F: Fn(&R) -> &A + Send + Sync + 'static,
{
    projector(move |value, next| {
        let projected: &dyn Any = upcast(downcast::<R>(value)?);
        next(projected)
    })
}

fn projector<F>(project: F) -> Arc<Projector>
where
    F: Fn(&dyn Any, &mut Next<'_>) -> Result<(), EncodeError> + Send + Sync + 'static,
{
    Arc::new(project)
}

fn downcast<R: Any>(value: &dyn Any) -> Result<&R, EncodeError> {
    value.downcast_ref::<R>().ok_or(EncodeError::TypeMismatch {
        expected: type_name::<R>(),
    })
}

//! Ties a [`MapperSpec`]/[`Relationship`] to the Rust code that knows how
//! to build and mutate the concrete target type.
//!
//! Some reference implementations generate this construction code at
//! runtime via reflection. Rust has no such reflection, so the caller
//! supplies the equivalent as a plain closure once, at binding
//! declaration time, written by hand instead of generated.

use std::any::Any;
use std::sync::Arc;

use compact_str::CompactString;
use sqlkit_core::{MapperSpec, ParamValue, Relationship};

/// Type-erased handle to a hydrated object, shared between the identity
/// map, the emitted output, and any relationship that attaches it.
pub type AnyObject = Arc<dyn Any + Send + Sync>;

/// How to build one instance of a shape's target type from its mapped
/// field values, in the exact order `fields` lists them.
pub type ConstructFn = Arc<dyn Fn(&[ParamValue]) -> AnyObject + Send + Sync>;

/// A declared shape plus the glue needed to construct it.
#[derive(Clone)]
pub struct ShapeBinding {
    pub spec: MapperSpec,
    /// Field names in the order `construct` expects their values.
    pub fields: Vec<CompactString>,
    pub construct: ConstructFn,
}

impl ShapeBinding {
    pub fn new(
        spec: MapperSpec,
        fields: impl IntoIterator<Item = impl Into<CompactString>>,
        construct: impl Fn(&[ParamValue]) -> AnyObject + Send + Sync + 'static,
    ) -> Self {
        ShapeBinding {
            spec,
            fields: fields.into_iter().map(Into::into).collect(),
            construct: Arc::new(construct),
        }
    }

    pub fn shape_name(&self) -> &str {
        self.spec.shape_name()
    }
}

/// How to attach a newly-resolved `right` object onto an already-resolved
/// `left` object, for one declared [`Relationship`].
///
/// The closure is written once per relationship by whoever owns the
/// target types, since only they know how the field is stored (a
/// `RefCell<Option<Arc<Right>>>` for ONE_TO_ONE, a
/// `RefCell<Vec<Arc<Right>>>` for ONE_TO_MANY, etc. — any interior
/// mutability the target type chooses, since the object is already
/// shared via [`AnyObject`] by the time a relationship attaches to it).
pub type AttachFn = Arc<dyn Fn(&AnyObject, &AnyObject) + Send + Sync>;

#[derive(Clone)]
pub struct RelationshipBinding {
    pub relationship: Relationship,
    pub attach: AttachFn,
}

impl RelationshipBinding {
    pub fn new(relationship: Relationship, attach: impl Fn(&AnyObject, &AnyObject) + Send + Sync + 'static) -> Self {
        RelationshipBinding {
            relationship,
            attach: Arc::new(attach),
        }
    }
}

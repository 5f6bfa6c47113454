//! The mapping specification data model: [`MapperSpec`], [`Relationship`],
//! and the `<shape>__<field>` column-naming protocol.

use std::any::{type_name, TypeId};
use std::hash::{Hash, Hasher};

use compact_str::CompactString;
use smallvec::SmallVec;

/// How a [`MapperSpec`]'s target type is constructed and written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accessor {
    /// Fields are written by named attribute assignment; the type is
    /// built via keyword-style construction (a plain Rust struct
    /// constructor in this port).
    Attr,
    /// Fields are written by keyed assignment on a mapping container
    /// (e.g. a `serde_json::Map`-backed generic record type).
    Item,
}

/// A declared target record shape participating in hydration.
///
/// Equality and [`Hash`] are structural over `(target_type, shape_name,
/// id_fields)` — [`Accessor`] is deliberately excluded, since it has no
/// bearing on which rows resolve to which identity.
#[derive(Debug, Clone)]
pub struct MapperSpec {
    type_id: TypeId,
    type_name: &'static str,
    shape_name: CompactString,
    id_fields: SmallVec<[CompactString; 4]>,
    accessor: Accessor,
}

impl MapperSpec {
    /// Build a spec for `T`. The default `shape_name` is the lowercased
    /// simple type name, the default `id_fields` is `["id"]`, and the
    /// default accessor is [`Accessor::Attr`].
    pub fn new<T: 'static>() -> Self {
        let full_name = type_name::<T>();
        let simple_name = full_name.rsplit("::").next().unwrap_or(full_name);
        MapperSpec {
            type_id: TypeId::of::<T>(),
            type_name: full_name,
            shape_name: CompactString::from(simple_name.to_lowercase()),
            id_fields: SmallVec::from_slice(&[CompactString::from("id")]),
            accessor: Accessor::Attr,
        }
    }

    /// Override the default `shape_name`.
    pub fn name(mut self, custom: impl Into<CompactString>) -> Self {
        self.shape_name = custom.into();
        self
    }

    /// Override the default `id_fields`. Panics if given an empty slice:
    /// `id_fields` is always a non-empty tuple.
    pub fn id(mut self, fields: impl IntoIterator<Item = impl Into<CompactString>>) -> Self {
        let fields: SmallVec<[CompactString; 4]> = fields.into_iter().map(Into::into).collect();
        assert!(!fields.is_empty(), "id_fields must be non-empty");
        self.id_fields = fields;
        self
    }

    /// Switch to [`Accessor::Item`] for mapping-container targets.
    pub fn item_accessor(mut self) -> Self {
        self.accessor = Accessor::Item;
        self
    }

    pub fn shape_name(&self) -> &str {
        &self.shape_name
    }

    pub fn id_fields(&self) -> &[CompactString] {
        &self.id_fields
    }

    pub fn accessor(&self) -> Accessor {
        self.accessor
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for MapperSpec {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
            && self.shape_name == other.shape_name
            && self.id_fields == other.id_fields
    }
}
impl Eq for MapperSpec {}

impl Hash for MapperSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.shape_name.hash(state);
        self.id_fields.hash(state);
    }
}

/// One-to-one or one-to-many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    OneToOne,
    OneToMany,
}

/// A relationship between two declared shapes: after both `left` and
/// `right` objects for a row are resolved, `right` is attached to
/// `left.field`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relationship {
    pub kind: RelationshipKind,
    pub left: CompactString,
    pub field: CompactString,
    pub right: CompactString,
}

impl Relationship {
    pub fn one_to_one(
        left: impl Into<CompactString>,
        field: impl Into<CompactString>,
        right: impl Into<CompactString>,
    ) -> Self {
        Relationship {
            kind: RelationshipKind::OneToOne,
            left: left.into(),
            field: field.into(),
            right: right.into(),
        }
    }

    pub fn one_to_many(
        left: impl Into<CompactString>,
        field: impl Into<CompactString>,
        right: impl Into<CompactString>,
    ) -> Self {
        Relationship {
            kind: RelationshipKind::OneToMany,
            left: left.into(),
            field: field.into(),
            right: right.into(),
        }
    }
}

/// A selected column's `<shape>__<field>` name, split on the *first*
/// `__`; columns that don't split are ignored by the hydrator (but
/// remain available to raw fetches).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub shape: CompactString,
    pub field: CompactString,
}

impl ColumnRef {
    /// Parse `name` as `<shape>__<field>`, returning `None` if there is
    /// no `__` separator to split on.
    pub fn parse(name: &str) -> Option<ColumnRef> {
        let (shape, field) = name.split_once("__")?;
        if shape.is_empty() || field.is_empty() {
            return None;
        }
        Some(ColumnRef {
            shape: CompactString::from(shape),
            field: CompactString::from(field),
        })
    }

    /// Case-insensitive comparison of this column's shape prefix against
    /// a declared `shape_name`.
    pub fn shape_matches(&self, shape_name: &str) -> bool {
        self.shape.eq_ignore_ascii_case(shape_name)
    }
}

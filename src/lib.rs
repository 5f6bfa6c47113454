//! `sqlkit`: templated SQL rendering with automatic parameter binding,
//! plus a row-stream object hydrator with identity-map and relationship
//! wiring.
//!
//! This crate is a thin facade re-exporting `sqlkit-core`,
//! `sqlkit-render`, `sqlkit-mapper`, and `sqlkit-query`, the way
//! `sqruff`'s own root crate re-exports `sqruff-lib`/`sqruff-lib-core`.

pub use sqlkit_core::{
    quote_identifier, recognize, validate_quote_char, Accessor, BoundParams, ColumnRef, ConfigError, DriverError,
    FinalParams, MapperSpec, MappingSpecError, ParamStyle, ParamStyleSource, ParamValue, Relationship,
    RelationshipKind, SqlSafe, SqlkitError, TemplateError, UsageError, VALID_QUOTE_CHARS,
};

pub use sqlkit_render::{auto_bind, render_template, CachedQuery, QueryCache, QueryKind, Rendered};

pub use sqlkit_mapper::{
    compile, AnyObject, AttachFn, CacheKey, ConstructFn, HydrateIter, HydrationOutput, Hydrator, IdKey, IdScalar,
    MapperCache, MappingPlan, RelationshipBinding, ResultShape, Row, ShapeBinding, ShapePlan,
};

pub use sqlkit_query::{
    with_current, ColumnDescriptor, Connection, Cursor, CursorHandle, MappedIter, MappedQuery, Pool, Query,
    QueryArgs, QueryTemplate, RowIter, ScopeGuard, ScopedConnection, Transaction,
};
pub use sqlkit_query::testing;

/// The `minijinja::value::Value` type used to build render contexts; the
/// `minijinja::context!` macro is the usual way to construct one.
pub use minijinja::value::Value;

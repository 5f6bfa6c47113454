//! Error kinds for sqlkit: a handful of small, concrete error
//! structs/enums rather than one catch-all. Five concrete types rather
//! than one giant enum, because only [`DriverError`] needs to be generic
//! over the driver's own error type — keeping the other four non-generic
//! lets callers write `Result<T, ConfigError>` etc. without threading a
//! type parameter everywhere.

use thiserror::Error;

/// Invalid identifier-quote character; unknown placeholder dialect
/// requested; dialect discovery failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid identifier quote character {0:?}, expected one of {:?}", crate::identifier::VALID_QUOTE_CHARS)]
    InvalidQuoteChar(char),

    #[error("unknown placeholder dialect {0:?}")]
    UnknownParamStyle(String),

    #[error("could not discover a paramstyle by walking up from {module_path:?}")]
    ParamStyleDiscoveryFailed { module_path: String },
}

/// Template parse/render failure; `inclause` applied to a non-iterable;
/// `identifier` applied to a non-string non-iterable.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to load template {name:?}: {message}")]
    Load { name: String, message: String },

    #[error("failed to render template {name:?}: {message}")]
    Render { name: String, message: String },

    #[error("`inclause` filter requires an iterable value")]
    InclauseNotIterable,

    #[error("`identifier` filter requires a string or iterable of strings")]
    IdentifierNotStringOrIterable,
}

/// Referenced shape not declared; an `id_field` has no mapped column;
/// cyclic relationship graph (no unique root in a unary result).
#[derive(Debug, Error)]
pub enum MappingSpecError {
    #[error("relationship references undeclared shape {shape:?}")]
    UndeclaredShape { shape: String },

    #[error("shape {shape:?} has id field {field:?} with no mapped column")]
    MissingIdColumn { shape: String, field: String },

    #[error(
        "result shape is unary but the relationship graph has no unique root \
         (found {candidates} in-degree-zero shapes, need exactly 1)"
    )]
    NoUniqueRoot { candidates: usize },

    #[error("identity column held a float or opaque value, which cannot back an identity key")]
    NonHashableIdValue,
}

/// Cursor access without an active connection scope; args supplied to a
/// query call that don't match its kind; `one` requested from an empty
/// cursor when the caller set a "raising" flag.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("no active connection scope on this thread; enter a ScopedConnection first")]
    NoActiveScope,

    #[error("args don't match this query's kind: a static query takes params directly, a dynamic query takes a render context")]
    ConflictingExecuteArgs,

    #[error("one() found no row and `raising` was set")]
    EmptyResultRaising,
}

/// A driver (cursor/connection) error, passed through unchanged and
/// never caught by the core.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct DriverError<E>(#[from] pub E)
where
    E: std::error::Error + Send + Sync + 'static;

/// The union of all error kinds a `sqlkit` call site can surface,
/// parameterized by the driver's own error type.
#[derive(Debug, Error)]
pub enum SqlkitError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    MappingSpec(#[from] MappingSpecError),

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Driver(#[from] DriverError<E>),
}

//! Foundational, driver-agnostic types shared by the rest of sqlkit:
//! placeholder-dialect recognition, identifier quoting, bound-parameter
//! collection, the mapping specification data model, and the error
//! taxonomy every other crate's `Result` is built from.

pub mod error;
pub mod identifier;
pub mod param_style;
pub mod params;
pub mod spec;

pub use error::{ConfigError, DriverError, MappingSpecError, SqlkitError, TemplateError, UsageError};
pub use identifier::{quote_identifier, validate_quote_char, SqlSafe, VALID_QUOTE_CHARS};
pub use param_style::{recognize, ParamStyle, ParamStyleSource};
pub use params::{BoundParams, FinalParams, ParamValue};
pub use spec::{Accessor, ColumnRef, MapperSpec, Relationship, RelationshipKind};

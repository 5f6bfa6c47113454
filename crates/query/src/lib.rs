//! The query orchestrator: driver traits, per-thread connection scoping,
//! RAII transactions, and the execute/iter/all/one/scalar/return_as
//! surface over a rendered query template.

pub mod driver;
pub mod query;
pub mod scope;
pub mod testing;
pub mod transaction;

pub use driver::{ColumnDescriptor, Connection, Cursor, Pool};
pub use query::{CursorHandle, MappedIter, MappedQuery, Query, QueryArgs, QueryTemplate, RowIter};
pub use scope::{with_current, ScopeGuard, ScopedConnection};
pub use transaction::Transaction;

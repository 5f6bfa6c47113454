//! The thin driver contracts the core consumes: a cursor, the connection
//! it comes from, and the pool that hands out connections.

use compact_str::CompactString;
use sqlkit_core::{FinalParams, ParamStyle, ParamValue};

#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub name: CompactString,
}

/// A DB-API-style cursor: `rowcount`, `description`, `execute`,
/// `executemany`, `fetchone`, `fetchmany`, `fetchall`, `close`. Rows are
/// positional tuples whose length equals the column count.
pub trait Cursor {
    type Error: std::error::Error + Send + Sync + 'static;

    fn rowcount(&self) -> i64;
    fn description(&self) -> &[ColumnDescriptor];

    fn execute(&mut self, sql: &str, params: &FinalParams) -> Result<(), Self::Error>;
    fn executemany(&mut self, sql: &str, batches: &[FinalParams]) -> Result<(), Self::Error>;

    fn fetchone(&mut self) -> Result<Option<Vec<ParamValue>>, Self::Error>;
    fn fetchmany(&mut self, n: usize) -> Result<Vec<Vec<ParamValue>>, Self::Error>;
    fn fetchall(&mut self) -> Result<Vec<Vec<ParamValue>>, Self::Error>;

    fn close(&mut self) -> Result<(), Self::Error>;

    fn column_names(&self) -> Vec<CompactString> {
        self.description().iter().map(|c| c.name.clone()).collect()
    }
}

/// A DB-API-style connection: `autocommit`, `cursor()`, `commit()`,
/// `rollback()`, `close()`.
pub trait Connection {
    type Cursor: Cursor<Error = Self::Error>;
    type Error: std::error::Error + Send + Sync + 'static;

    fn autocommit(&self) -> bool;
    fn set_autocommit(&mut self, value: bool) -> Result<(), Self::Error>;

    fn cursor(&mut self) -> Result<Self::Cursor, Self::Error>;
    fn commit(&mut self) -> Result<(), Self::Error>;
    fn rollback(&mut self) -> Result<(), Self::Error>;
    fn close(&mut self) -> Result<(), Self::Error>;
}

/// A connection pool: `acquire() -> Connection`, `release(Connection)`,
/// and the dialect its connections speak.
pub trait Pool {
    type Connection: Connection;

    fn acquire(&self) -> Result<Self::Connection, <Self::Connection as Connection>::Error>;
    fn release(&self, conn: Self::Connection);

    /// The placeholder dialect connections from this pool speak. A real
    /// adapter typically implements this with `sqlkit_core::recognize`
    /// over its own crate path; a test double can just return a constant.
    fn param_style(&self) -> ParamStyle;
}

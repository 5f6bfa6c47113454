//! A minimal in-memory `Connection`/`Cursor` test double, which doubles
//! as the worked example for integrators writing their own driver
//! adapter. Used by this crate's own tests and by the scenario tests in
//! the root crate.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use compact_str::CompactString;
use thiserror::Error;

use sqlkit_core::{FinalParams, ParamStyle, ParamValue};

use crate::driver::{ColumnDescriptor, Connection, Cursor, Pool};

#[derive(Debug, Error)]
#[error("fake driver error: {0}")]
pub struct FakeError(pub String);

/// One canned result a queued `execute` call will be served, in the
/// order they were queued.
pub struct FakeResultSet {
    pub columns: Vec<CompactString>,
    pub rows: Vec<Vec<ParamValue>>,
}

impl FakeResultSet {
    pub fn new(columns: impl IntoIterator<Item = impl Into<CompactString>>, rows: Vec<Vec<ParamValue>>) -> Self {
        FakeResultSet {
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
        }
    }
}

#[derive(Default)]
struct Shared {
    queued_results: VecDeque<FakeResultSet>,
    executed_sql: Vec<String>,
    executed_params: Vec<FinalParams>,
    commits: usize,
    rollbacks: usize,
}

/// A pool of `FakeConnection`s that all share one queue of canned result
/// sets and one log of executed SQL/params, so a test can queue results
/// up front and assert on what ran afterward regardless of how many
/// connections/cursors were acquired along the way.
#[derive(Clone)]
pub struct FakePool {
    dialect: ParamStyle,
    shared: Arc<Mutex<Shared>>,
}

impl FakePool {
    pub fn new(dialect: ParamStyle) -> Self {
        FakePool {
            dialect,
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    pub fn queue_result(&self, result: FakeResultSet) {
        self.shared.lock().unwrap().queued_results.push_back(result);
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.shared.lock().unwrap().executed_sql.clone()
    }

    pub fn executed_params(&self) -> Vec<FinalParams> {
        self.shared.lock().unwrap().executed_params.clone()
    }

    pub fn commit_count(&self) -> usize {
        self.shared.lock().unwrap().commits
    }

    pub fn rollback_count(&self) -> usize {
        self.shared.lock().unwrap().rollbacks
    }
}

impl Pool for FakePool {
    type Connection = FakeConnection;

    fn acquire(&self) -> Result<Self::Connection, FakeError> {
        Ok(FakeConnection {
            autocommit: true,
            shared: self.shared.clone(),
        })
    }

    fn release(&self, _conn: Self::Connection) {}

    fn param_style(&self) -> ParamStyle {
        self.dialect
    }
}

pub struct FakeConnection {
    autocommit: bool,
    shared: Arc<Mutex<Shared>>,
}

impl Connection for FakeConnection {
    type Cursor = FakeCursor;
    type Error = FakeError;

    fn autocommit(&self) -> bool {
        self.autocommit
    }

    fn set_autocommit(&mut self, value: bool) -> Result<(), Self::Error> {
        self.autocommit = value;
        Ok(())
    }

    fn cursor(&mut self) -> Result<Self::Cursor, Self::Error> {
        Ok(FakeCursor {
            shared: self.shared.clone(),
            columns: Vec::new(),
            rows: VecDeque::new(),
            rowcount: -1,
        })
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        self.shared.lock().unwrap().commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        self.shared.lock().unwrap().rollbacks += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub struct FakeCursor {
    shared: Arc<Mutex<Shared>>,
    columns: Vec<ColumnDescriptor>,
    rows: VecDeque<Vec<ParamValue>>,
    rowcount: i64,
}

impl FakeCursor {
    fn load_next_queued(&mut self) {
        let mut shared = self.shared.lock().unwrap();
        let result = shared
            .queued_results
            .pop_front()
            .expect("FakeCursor::execute called with no queued FakeResultSet");
        self.rowcount = result.rows.len() as i64;
        self.columns = result.columns.into_iter().map(|name| ColumnDescriptor { name }).collect();
        self.rows = result.rows.into();
    }
}

impl Cursor for FakeCursor {
    type Error = FakeError;

    fn rowcount(&self) -> i64 {
        self.rowcount
    }

    fn description(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    fn execute(&mut self, sql: &str, params: &FinalParams) -> Result<(), Self::Error> {
        {
            let mut shared = self.shared.lock().unwrap();
            shared.executed_sql.push(sql.to_string());
            shared.executed_params.push(params.clone());
        }
        self.load_next_queued();
        Ok(())
    }

    fn executemany(&mut self, sql: &str, batches: &[FinalParams]) -> Result<(), Self::Error> {
        {
            let mut shared = self.shared.lock().unwrap();
            for batch in batches {
                shared.executed_sql.push(sql.to_string());
                shared.executed_params.push(batch.clone());
            }
        }
        self.load_next_queued();
        Ok(())
    }

    fn fetchone(&mut self) -> Result<Option<Vec<ParamValue>>, Self::Error> {
        Ok(self.rows.pop_front())
    }

    fn fetchmany(&mut self, n: usize) -> Result<Vec<Vec<ParamValue>>, Self::Error> {
        let mut out = Vec::with_capacity(n.min(self.rows.len()));
        for _ in 0..n {
            match self.rows.pop_front() {
                Some(row) => out.push(row),
                None => break,
            }
        }
        Ok(out)
    }

    fn fetchall(&mut self) -> Result<Vec<Vec<ParamValue>>, Self::Error> {
        Ok(self.rows.drain(..).collect())
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

//! A scoped transaction: toggle autocommit off on entry, commit or
//! rollback on exit, then restore the prior autocommit state.
//!
//! Rust has no implicit "did the block raise" signal outside `Drop`, so
//! the caller commits or rolls back explicitly; an unfinished
//! transaction (caller propagated an error with `?`, or panicked) rolls
//! back on drop.

use crate::driver::Connection;

pub struct Transaction<'c, C: Connection> {
    conn: &'c mut C,
    restore_autocommit: bool,
    finished: bool,
}

impl<'c, C: Connection> Transaction<'c, C> {
    pub fn begin(conn: &'c mut C) -> Result<Self, C::Error> {
        let restore_autocommit = conn.autocommit();
        if restore_autocommit {
            conn.set_autocommit(false)?;
        }
        Ok(Transaction {
            conn,
            restore_autocommit,
            finished: false,
        })
    }

    pub fn commit(mut self) -> Result<(), C::Error> {
        self.finished = true;
        self.conn.commit()?;
        if self.restore_autocommit {
            self.conn.set_autocommit(true)?;
        }
        Ok(())
    }

    pub fn rollback(mut self) -> Result<(), C::Error> {
        self.finished = true;
        self.conn.rollback()?;
        if self.restore_autocommit {
            self.conn.set_autocommit(true)?;
        }
        Ok(())
    }
}

impl<'c, C: Connection> Drop for Transaction<'c, C> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.conn.rollback() {
            log::warn!("failed to roll back unfinished transaction on drop: {e}");
        }
        if self.restore_autocommit {
            let _ = self.conn.set_autocommit(true);
        }
    }
}

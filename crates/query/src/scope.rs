//! Per-thread connection scoping: borrow a connection from the pool on
//! scope entry, release it on scope exit, committing or rolling back
//! first depending on autocommit state and whether the scope exited
//! normally.
//!
//! Some reference implementations model this as a single mutable
//! thread-local singleton attached to an engine instance; Rust has no
//! such construct, so the equivalent here is a thread-local registry
//! keyed by the pool's connection type, so ambient access
//! ([`with_current`]) works from anywhere on the thread without threading
//! a guard value through every call. Nested [`ScopedConnection::enter`]
//! calls on the same thread reuse the outer connection.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;

use sqlkit_core::UsageError;

use crate::driver::{Connection, Pool};

struct ScopeSlot {
    connection: Box<dyn Any>,
    depth: usize,
    commit_on_exit: bool,
}

thread_local! {
    static SCOPES: RefCell<HashMap<TypeId, ScopeSlot>> = RefCell::new(HashMap::new());
}

/// Borrows connections of type `P::Connection` from `pool` for the
/// current thread.
pub struct ScopedConnection<P: Pool> {
    pool: P,
    commit_on_exit: bool,
}

impl<P> ScopedConnection<P>
where
    P: Pool,
    P::Connection: 'static,
{
    pub fn new(pool: P, commit_on_exit: bool) -> Self {
        ScopedConnection { pool, commit_on_exit }
    }

    /// Enter the scope: acquires a connection on the outermost call,
    /// reuses it on any nested call from the same thread.
    pub fn enter(&self) -> Result<ScopeGuard<'_, P>, <P::Connection as Connection>::Error> {
        let type_id = TypeId::of::<P::Connection>();
        let already_open = SCOPES.with(|scopes| scopes.borrow().contains_key(&type_id));

        if already_open {
            SCOPES.with(|scopes| {
                scopes.borrow_mut().get_mut(&type_id).unwrap().depth += 1;
            });
        } else {
            let conn = self.pool.acquire()?;
            SCOPES.with(|scopes| {
                scopes.borrow_mut().insert(
                    type_id,
                    ScopeSlot {
                        connection: Box::new(conn),
                        depth: 1,
                        commit_on_exit: self.commit_on_exit,
                    },
                );
            });
        }

        Ok(ScopeGuard {
            pool: &self.pool,
            type_id,
        })
    }

    /// Run `f` against the current thread's active connection of this
    /// pool's type. Fails with [`UsageError::NoActiveScope`] outside any
    /// [`ScopedConnection::enter`] call.
    pub fn with_current<R>(&self, f: impl FnOnce(&mut P::Connection) -> R) -> Result<R, UsageError> {
        with_current::<P, R>(f)
    }
}

/// Free function form of [`ScopedConnection::with_current`], usable
/// anywhere on the thread without holding a `ScopedConnection` handle —
/// this is the "ambient" access the scoped connection provides.
pub fn with_current<P, R>(f: impl FnOnce(&mut P::Connection) -> R) -> Result<R, UsageError>
where
    P: Pool,
    P::Connection: 'static,
{
    SCOPES.with(|scopes| {
        let mut scopes = scopes.borrow_mut();
        let slot = scopes
            .get_mut(&TypeId::of::<P::Connection>())
            .ok_or(UsageError::NoActiveScope)?;
        let conn = slot
            .connection
            .downcast_mut::<P::Connection>()
            .expect("scope slot is always keyed by its own connection type");
        Ok(f(conn))
    })
}

/// RAII guard returned by [`ScopedConnection::enter`]. On the outermost
/// drop, commits (if the connection isn't in autocommit mode and the
/// thread isn't unwinding) or rolls back, then releases the connection
/// back to the pool.
pub struct ScopeGuard<'p, P: Pool> {
    pool: &'p P,
    type_id: TypeId,
}

impl<'p, P> Drop for ScopeGuard<'p, P>
where
    P: Pool,
    P::Connection: 'static,
{
    fn drop(&mut self) {
        let finished = SCOPES.with(|scopes| {
            let mut scopes = scopes.borrow_mut();
            let slot = scopes.get_mut(&self.type_id).expect("guard outlives its own scope slot");
            slot.depth -= 1;
            slot.depth == 0
        });
        if !finished {
            return;
        }
        let slot = SCOPES.with(|scopes| scopes.borrow_mut().remove(&self.type_id)).unwrap();
        let mut conn = *slot
            .connection
            .downcast::<P::Connection>()
            .expect("scope slot is always keyed by its own connection type");
        if !conn.autocommit() {
            let outcome = if std::thread::panicking() {
                conn.rollback()
            } else if slot.commit_on_exit {
                conn.commit()
            } else {
                conn.rollback()
            };
            if let Err(e) = outcome {
                log::warn!("failed to finalize scoped connection on exit: {e}");
            }
        }
        self.pool.release(conn);
    }
}

//! Nestable transaction scope

use cairn_core::adapter::PersistenceConnection;
use cairn_core::errors::Result;

/// Opens a transaction only when none is open and rolls back on drop
/// unless committed
///
/// A guard created inside another guard's scope does not own the
/// transaction: its `commit` is a no-op and its drop leaves the outer
/// transaction alone. This lets transactional operations call each other.
pub struct TransactionGuard<'c, C: PersistenceConnection> {
    conn: &'c C,
    owned: bool,
    finished: bool,
}

impl<'c, C: PersistenceConnection> TransactionGuard<'c, C> {
    /// # Errors
    ///
    /// Returns a Persistence error if a new transaction cannot be started.
    pub fn begin(conn: &'c C) -> Result<Self> {
        let owned = !conn.in_transaction();
        if owned {
            conn.start_transaction()?;
        }
        Ok(Self {
            conn,
            owned,
            finished: false,
        })
    }

    /// True when this guard started the transaction
    pub fn owns_transaction(&self) -> bool {
        self.owned
    }

    /// # Errors
    ///
    /// Returns a Persistence error if the commit fails; the transaction is
    /// then rolled back.
    pub fn commit(mut self) -> Result<()> {
        if self.owned {
            self.conn.commit()?;
        }
        self.finished = true;
        Ok(())
    }
}

impl<C: PersistenceConnection> Drop for TransactionGuard<'_, C> {
    fn drop(&mut self) {
        if self.owned && !self.finished && self.conn.in_transaction() {
            if let Err(err) = self.conn.rollback() {
                tracing::warn!(error = %err, "rollback of abandoned transaction failed");
            }
        }
    }
}

//! Unit of Work
//!
//! A [`UnitOfWork`] wraps one SQLite transaction with a wall-clock budget.
//! Commit on clean exit, rollback on drop. [`UnitOfWork::nested`] opens a
//! savepoint; whether a failure rolls back just the savepoint or poisons
//! the whole transaction is decided by the error's
//! [`ErrorClass`](crate::error::ErrorClass):
//!
//! - Recoverable / Validation: roll back the savepoint only, the outer
//!   transaction stays usable.
//! - System / Unknown: the caller must abandon the whole unit of work.
//!
//! Exceeding the budget surfaces as
//! [`DatabaseError::TransactionTimeout`]; the deadline is checked on every
//! connection access and at commit, and the transaction rolls back.
//! Long-lived units of work are an anti-pattern; split them instead of
//! raising the budget.

use crate::db::error::{DatabaseError, DbResult};
use crate::db::DatabasePool;
use sqlx::{Acquire, Sqlite, SqliteConnection, Transaction};
use std::time::{Duration, Instant};

/// One transactional boundary with a deadline
pub struct UnitOfWork {
    tx: Option<Transaction<'static, Sqlite>>,
    deadline: Instant,
    timeout: Duration,
}

impl UnitOfWork {
    /// Open a transaction with the given wall-clock budget
    pub async fn begin(pool: &DatabasePool, timeout: Duration) -> DbResult<Self> {
        let tx = pool.begin().await?;
        Ok(Self {
            tx: Some(tx),
            deadline: Instant::now() + timeout,
            timeout,
        })
    }

    fn check_deadline(&self) -> DbResult<()> {
        if Instant::now() >= self.deadline {
            return Err(DatabaseError::TransactionTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            });
        }
        Ok(())
    }

    fn tx_mut(&mut self) -> DbResult<&mut Transaction<'static, Sqlite>> {
        self.tx
            .as_mut()
            .ok_or_else(|| DatabaseError::TransactionError("transaction already finished".to_string()))
    }

    /// Connection handle for running queries inside the transaction
    ///
    /// Fails with `TransactionTimeout` once the budget is spent; the
    /// transaction then rolls back when the unit of work is dropped.
    pub fn conn(&mut self) -> DbResult<&mut SqliteConnection> {
        self.check_deadline()?;
        Ok(&mut *self.tx_mut()?)
    }

    /// Open a savepoint inside this transaction
    pub async fn nested(&mut self) -> DbResult<Savepoint<'_>> {
        self.check_deadline()?;
        let tx = self.tx_mut()?.begin().await?;
        Ok(Savepoint { tx })
    }

    /// Commit, consuming the unit of work
    pub async fn commit(mut self) -> DbResult<()> {
        self.check_deadline()?;
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    /// Roll back explicitly (dropping has the same effect)
    pub async fn rollback(mut self) -> DbResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}

/// A savepoint inside a [`UnitOfWork`]; rolls back on drop
pub struct Savepoint<'t> {
    tx: Transaction<'t, Sqlite>,
}

impl Savepoint<'_> {
    /// Connection handle scoped to the savepoint
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Release the savepoint, keeping its writes
    pub async fn commit(self) -> DbResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Roll back to the savepoint, discarding its writes
    pub async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

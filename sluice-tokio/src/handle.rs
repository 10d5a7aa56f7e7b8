use std::collections::BTreeMap;
use std::sync::Arc;

use rusqlite::{Params, Row};

use crate::context::StatementContext;
use crate::errors::{Cause, Error};
use crate::policy::{ExceptionPolicy, PolicyExt, PolicySlot};
use crate::policy::UNABLE_TO_CREATE_STATEMENT;
use crate::raw::PoolConnection;
use crate::row::FromRow;

pub const NO_RESULTS: &str = "No results to return";
pub const UNABLE_TO_DECODE_ROW: &str = "Unable to decode row";
pub const UNABLE_TO_ADVANCE_RESULT_SET: &str = "Unable to advance result set";
pub const IMPROPER_TRANSACTION_CLOSE: &str = "Improper transaction handling detected: \
    a Handle with an open transaction was closed. Transactions must be explicitly \
    committed or rolled back before closing the Handle. The transaction has been \
    rolled back.";

/// Transaction isolation level.
///
/// Raw values are the conventional SQL driver numbering, which is what a failed
/// isolation change reports in
/// [`Error::isolation_level`](crate::errors::Error::isolation_level).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionIsolationLevel {
    None,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Cause attached when the requested isolation level has no SQLite
/// equivalent.
#[derive(Debug, thiserror::Error)]
#[error("isolation level {0:?} is not supported by SQLite")]
pub struct UnsupportedIsolationLevel(pub TransactionIsolationLevel);

/// Cause attached when the connection is still inside a transaction after
/// it has been rolled back.
#[derive(Debug, thiserror::Error)]
#[error("connection is still inside a transaction after rollback")]
pub struct AutoCommitStillDisabled;

/// A single database connection checked out of a client's pool.
///
/// Every failure is handed to the exception policy installed on the client
/// at the moment the failure happens. The connection goes back to the pool
/// when the handle is dropped or [closed](Handle::close).
#[derive(Debug)]
pub struct Handle {
    conn: PoolConnection,
    policy: PolicySlot,
    attributes: BTreeMap<String, String>,
}

/// Several statements executed one after another.
///
/// Created by [`Handle::batch`]. Statements are executed in order and
/// execution stops at the first failure. There is no implicit
/// transaction: wrap it into [`Handle::in_transaction`] if needed.
#[derive(Debug)]
pub struct Batch<'a> {
    handle: &'a Handle,
    parts: Vec<String>,
}

impl TransactionIsolationLevel {
    pub fn as_raw(self) -> i32 {
        use TransactionIsolationLevel::*;
        match self {
            None => 0,
            ReadUncommitted => 1,
            ReadCommitted => 2,
            RepeatableRead => 4,
            Serializable => 8,
        }
    }
    pub fn from_raw(raw: i32) -> Option<TransactionIsolationLevel> {
        use TransactionIsolationLevel::*;
        match raw {
            0 => Some(None),
            1 => Some(ReadUncommitted),
            2 => Some(ReadCommitted),
            4 => Some(RepeatableRead),
            8 => Some(Serializable),
            _ => Option::None,
        }
    }
}

impl Handle {
    pub(crate) fn new(conn: PoolConnection, policy: PolicySlot) -> Handle {
        Handle {
            conn,
            policy,
            attributes: BTreeMap::new(),
        }
    }

    /// Policy currently installed on the client this handle belongs to.
    pub fn exception_policy(&self) -> Arc<dyn ExceptionPolicy> {
        self.policy.load()
    }

    /// Define an attribute that is reported in the statement context of
    /// every following statement.
    pub fn define(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Handle {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    fn context(&self, sql: &str) -> StatementContext {
        StatementContext::new(sql, &self.attributes)
    }

    fn prepare(&self, ctx: &StatementContext, sql: &str) -> Result<rusqlite::Statement<'_>, Error> {
        self.conn.inner().prepare(sql).map_err(|e| {
            self.exception_policy()
                .statement_creation_failure(UNABLE_TO_CREATE_STATEMENT, Box::new(e), Some(ctx))
        })
    }

    /// Execute a statement that returns no rows.
    ///
    /// Returns number of rows changed.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize, Error> {
        let ctx = self.context(sql);
        let mut stmt = self.prepare(&ctx, sql)?;
        stmt.execute(params).map_err(|e| {
            self.exception_policy()
                .statement_execution_failure_cause(Box::new(e), Some(&ctx))
        })
    }

    /// Execute several semicolon-separated statements.
    pub fn script(&self, sql: &str) -> Result<(), Error> {
        let ctx = self.context(sql);
        self.conn.inner().execute_batch(sql).map_err(|e| {
            self.exception_policy()
                .statement_execution_failure_cause(Box::new(e), Some(&ctx))
        })
    }

    pub fn batch(&self) -> Batch<'_> {
        Batch {
            handle: self,
            parts: Vec::new(),
        }
    }

    fn fetch<T, P, F>(
        &self,
        ctx: &StatementContext,
        sql: &str,
        params: P,
        limit: Option<usize>,
        mut decode: F,
    ) -> Result<Vec<T>, Error>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> Result<T, Error>,
    {
        let mut stmt = self.prepare(ctx, sql)?;
        let mut rows = stmt.query(params).map_err(|e| {
            self.exception_policy()
                .statement_execution_failure_cause(Box::new(e), Some(ctx))
        })?;
        let mut result = Vec::new();
        while limit.map_or(true, |limit| result.len() < limit) {
            let row = match rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(e) => {
                    return Err(self.exception_policy().result_set_failure(
                        UNABLE_TO_ADVANCE_RESULT_SET,
                        Box::new(e),
                        Some(ctx),
                    ))
                }
            };
            result.push(decode(row)?);
        }
        Ok(result)
    }

    fn decode_row<T: FromRow>(&self, ctx: &StatementContext, row: &Row<'_>) -> Result<T, Error> {
        T::from_row(row).map_err(|e| {
            self.exception_policy()
                .result_set_failure(UNABLE_TO_DECODE_ROW, Box::new(e), Some(ctx))
        })
    }

    /// Run a query and decode all rows.
    pub fn query<T: FromRow, P: Params>(&self, sql: &str, params: P) -> Result<Vec<T>, Error> {
        let ctx = self.context(sql);
        self.fetch(&ctx, sql, params, None, |row| self.decode_row(&ctx, row))
    }

    /// Run a query and decode the first row, if any.
    pub fn query_single<T: FromRow, P: Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Option<T>, Error> {
        let ctx = self.context(sql);
        let rows = self.fetch(&ctx, sql, params, Some(1), |row| self.decode_row(&ctx, row))?;
        Ok(rows.into_iter().next())
    }

    /// Run a query and decode the first row, failing if there is none.
    pub fn query_required_single<T: FromRow, P: Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<T, Error> {
        let ctx = self.context(sql);
        let rows = self.fetch(&ctx, sql, params, Some(1), |row| self.decode_row(&ctx, row))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| {
                self.exception_policy()
                    .no_results_failure(NO_RESULTS, None, Some(&ctx))
            })
    }

    /// Run a query and build results with a caller-supplied mapper.
    ///
    /// Errors returned by the mapper are reported as result production
    /// failures.
    pub fn query_map<T, E, P, F>(
        &self,
        sql: &str,
        params: P,
        mut mapper: F,
    ) -> Result<Vec<T>, Error>
    where
        P: Params,
        E: Into<Cause>,
        F: FnMut(&Row<'_>) -> Result<T, E>,
    {
        let ctx = self.context(sql);
        self.fetch(&ctx, sql, params, None, |row| {
            mapper(row).map_err(|e| {
                self.exception_policy()
                    .result_production_failure_cause(e.into(), Some(&ctx))
            })
        })
    }

    /// Run code against the underlying driver connection.
    ///
    /// Driver errors are passed through the policy as raw failures.
    pub fn with_raw<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, rusqlite::Error>,
    {
        f(self.conn.inner())
            .map_err(|e| self.exception_policy().raw_failure_cause(Box::new(e)))
    }

    pub fn is_in_transaction(&self) -> bool {
        !self.conn.inner().is_autocommit()
    }

    fn transaction_command(&self, sql: &str, reason: &str) -> Result<(), Error> {
        self.conn
            .inner()
            .execute_batch(sql)
            .map_err(|e| {
                self.exception_policy()
                    .transaction_failure(Some(reason), Some(Box::new(e)))
            })
    }

    pub fn begin(&self) -> Result<(), Error> {
        self.transaction_command("BEGIN", "Failed to start transaction")
    }

    pub fn commit(&self) -> Result<(), Error> {
        self.transaction_command("COMMIT", "Failed to commit transaction")
    }

    pub fn rollback(&self) -> Result<(), Error> {
        self.transaction_command("ROLLBACK", "Failed to rollback transaction")
    }

    /// Run `f` in a transaction.
    ///
    /// Commits if `f` succeeds and rolls back otherwise. If a transaction
    /// is already open `f` joins it. Afterwards the connection is put back
    /// into auto-commit mode.
    pub fn in_transaction<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&Handle) -> Result<T, Error>,
    {
        if self.is_in_transaction() {
            return f(self);
        }
        self.begin()?;
        let result = match f(self) {
            Ok(value) => self.commit().map(|()| value),
            Err(e) => {
                if let Err(rollback) = self.rollback() {
                    log::warn!("rollback after error failed: {:#}", rollback);
                }
                Err(e)
            }
        };
        match (result, self.restore_auto_commit()) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore)) => {
                log::warn!("{:#}", restore);
                Err(e)
            }
        }
    }

    /// Same as [`in_transaction`](Handle::in_transaction) but runs with the
    /// given isolation level, restoring the previous one afterwards.
    pub fn in_transaction_with_isolation<T, F>(
        &self,
        level: TransactionIsolationLevel,
        f: F,
    ) -> Result<T, Error>
    where
        F: FnOnce(&Handle) -> Result<T, Error>,
    {
        let previous = self.transaction_isolation()?;
        self.set_transaction_isolation(level)?;
        let result = self.in_transaction(f);
        match self.set_transaction_isolation(previous) {
            Ok(()) => result,
            Err(e) if result.is_ok() => Err(e),
            Err(e) => {
                log::warn!("cannot restore isolation level: {:#}", e);
                result
            }
        }
    }

    fn restore_auto_commit(&self) -> Result<(), Error> {
        let conn = self.conn.inner();
        if conn.is_autocommit() {
            return Ok(());
        }
        conn.execute_batch("ROLLBACK")
            .map_err(|e| self.exception_policy().auto_commit_restore_failure(Box::new(e)))?;
        if !conn.is_autocommit() {
            return Err(self
                .exception_policy()
                .auto_commit_restore_failure(Box::new(AutoCommitStillDisabled)));
        }
        Ok(())
    }

    /// Set isolation level for following transactions on this connection.
    ///
    /// SQLite only distinguishes `ReadUncommitted` and `Serializable`, other
    /// levels fail.
    pub fn set_transaction_isolation(&self, level: TransactionIsolationLevel) -> Result<(), Error> {
        let read_uncommitted = match level {
            TransactionIsolationLevel::ReadUncommitted => true,
            TransactionIsolationLevel::Serializable => false,
            other => {
                return Err(self.exception_policy().transaction_isolation_failure_level(
                    other.as_raw(),
                    Box::new(UnsupportedIsolationLevel(other)),
                ))
            }
        };
        self.conn
            .inner()
            .pragma_update(None, "read_uncommitted", read_uncommitted)
            .map_err(|e| {
                self.exception_policy()
                    .transaction_isolation_failure_level(level.as_raw(), Box::new(e))
            })
    }

    pub fn transaction_isolation(&self) -> Result<TransactionIsolationLevel, Error> {
        let read_uncommitted = self
            .conn
            .inner()
            .pragma_query_value(None, "read_uncommitted", |row| row.get::<_, bool>(0))
            .map_err(|e| {
                self.exception_policy().transaction_isolation_failure_reason(
                    "Unable to read transaction isolation level",
                    Box::new(e),
                )
            })?;
        if read_uncommitted {
            Ok(TransactionIsolationLevel::ReadUncommitted)
        } else {
            Ok(TransactionIsolationLevel::Serializable)
        }
    }

    /// Return the connection to the pool.
    ///
    /// Closing a handle with an open transaction rolls the transaction back
    /// and reports a transaction failure.
    pub fn close(self) -> Result<(), Error> {
        if !self.is_in_transaction() {
            return Ok(());
        }
        let policy = self.exception_policy();
        match self.conn.inner().execute_batch("ROLLBACK") {
            Ok(()) => Err(policy.transaction_failure_reason(IMPROPER_TRANSACTION_CLOSE)),
            Err(e) => Err(policy
                .transaction_failure(Some(IMPROPER_TRANSACTION_CLOSE), Some(Box::new(e)))),
        }
    }
}

impl<'a> Batch<'a> {
    pub fn add(mut self, sql: impl Into<String>) -> Batch<'a> {
        self.parts.push(sql.into());
        self
    }

    pub fn size(&self) -> usize {
        self.parts.len()
    }

    /// Execute statements in order, returning changed row counts.
    pub fn execute(self) -> Result<Vec<usize>, Error> {
        let mut counts = Vec::with_capacity(self.parts.len());
        for sql in &self.parts {
            counts.push(self.handle.execute(sql, [])?);
        }
        Ok(counts)
    }
}

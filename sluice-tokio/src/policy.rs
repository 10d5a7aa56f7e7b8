//! Exception policies
//!
//! Every calling site in the pipeline that detects a failure hands it to
//! the [`ExceptionPolicy`] installed on the [`Client`](crate::Client), and
//! returns whatever error the policy produces. Replacing the policy is the
//! way to get database-specific classification or messages without
//! touching the pipeline:
//!
//! ```rust
//! use sluice_tokio::{Cause, ExceptionPolicy, StatementContext};
//! use sluice_tokio::errors::{Error, ErrorKind, StatementCreationFailure};
//!
//! struct Terse;
//!
//! impl ExceptionPolicy for Terse {
//!     fn statement_creation_failure(
//!         &self,
//!         _reason: &str,
//!         cause: Cause,
//!         _ctx: Option<&StatementContext>,
//!     ) -> Error {
//!         StatementCreationFailure::with_source_box(cause).context("bad sql")
//!     }
//! }
//! ```
//!
//! Methods of [`ExceptionPolicy`] are the full forms, one per category.
//! The shorter forms in [`PolicyExt`] fill in a default reason and
//! forward to the full form, so overriding a full form changes the
//! outcome for every caller of that category.
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;

use crate::context::StatementContext;
use crate::errors::fields::{Attributes, IsolationLevel, StatementText};
use crate::errors::{AutoCommitRestoreFailure, Cause, CloseFailure, ConnectionFailure};
use crate::errors::{Error, ErrorKind, Kind, NoResultsFailure, RawFailure};
use crate::errors::{ResultProductionFailure, ResultSetFailure};
use crate::errors::{StatementCreationFailure, StatementExecutionFailure};
use crate::errors::{TransactionFailure, TransactionIsolationFailure};

pub const UNABLE_TO_CREATE_STATEMENT: &str = "Unable to create statement.";
pub const UNABLE_TO_EXECUTE_STATEMENT: &str = "Unable to execute statement";
pub const UNABLE_TO_PRODUCE_RESULT: &str = "Unable to produce result.";
pub const UNABLE_TO_RESTORE_AUTO_COMMIT: &str = "Failed to restore connection auto-commit state";
pub const UNABLE_TO_ACQUIRE_CONNECTION: &str = "Unable to acquire connection";
pub const TRANSACTION_FAILED: &str = "Transaction failed";
pub const ISOLATION_LEVEL_UNSPECIFIED: &str =
    "Unable to manipulate transaction isolation level: unspecified";

static DEFAULT_POLICY: Lazy<Arc<dyn ExceptionPolicy>> = Lazy::new(|| Arc::new(DefaultPolicy));

/// Maps failures detected by the pipeline to the [`Error`] returned to
/// the caller.
///
/// There is one method per failure category. None of them has a success
/// value: the error returned is the outcome of the failure, and the caller
/// propagates it unchanged.
///
/// All methods have default implementations (the ones used by
/// [`DefaultPolicy`]), so an implementation only overrides the categories it
/// cares about. An override that needs the default behavior for some
/// inputs can delegate to [`DefaultPolicy`].
///
/// Policies are shared between all threads using a client and must hold no
/// per-call mutable state.
pub trait ExceptionPolicy: Send + Sync + 'static {
    /// The pipeline could not build an executable statement from SQL text.
    ///
    /// The message of the default is always [`UNABLE_TO_CREATE_STATEMENT`].
    /// `reason` is passed for overrides that want to report it.
    fn statement_creation_failure(
        &self,
        _reason: &str,
        cause: Cause,
        ctx: Option<&StatementContext>,
    ) -> Error {
        classified::<StatementCreationFailure>(UNABLE_TO_CREATE_STATEMENT, Some(cause), ctx)
    }

    /// Statement was built, but executing it failed.
    fn statement_execution_failure(
        &self,
        reason: &str,
        cause: Cause,
        ctx: Option<&StatementContext>,
    ) -> Error {
        classified::<StatementExecutionFailure>(reason, Some(cause), ctx)
    }

    /// Reading or changing the transaction isolation level failed.
    ///
    /// The error carries exactly one of: the level (if given, it wins
    /// over `reason`), the reason, or neither, in which case the message
    /// says the level is unspecified.
    fn transaction_isolation_failure(
        &self,
        level: Option<i32>,
        reason: Option<&str>,
        cause: Cause,
    ) -> Error {
        let err = match (level, reason) {
            (Some(level), _) => {
                TransactionIsolationFailure::with_source_box(cause)
                    .context(format!("Unable to set isolation level to {}", level))
                    .set::<IsolationLevel>(level)
            }
            (None, Some(reason)) => TransactionIsolationFailure::with_source_box(cause)
                .context(reason.to_owned()),
            (None, None) => TransactionIsolationFailure::with_source_box(cause)
                .context(ISOLATION_LEVEL_UNSPECIFIED),
        };
        log_classified(&err);
        err
    }

    /// A row mapper supplied by the caller failed to produce a result.
    fn result_production_failure(
        &self,
        reason: &str,
        cause: Cause,
        ctx: Option<&StatementContext>,
    ) -> Error {
        classified::<ResultProductionFailure>(reason, Some(cause), ctx)
    }

    /// Auto-commit could not be restored after a transaction ended.
    fn auto_commit_restore_failure(&self, cause: Cause) -> Error {
        classified::<AutoCommitRestoreFailure>(UNABLE_TO_RESTORE_AUTO_COMMIT, Some(cause), None)
    }

    /// A connection could not be opened or set up.
    fn connection_failure(&self, cause: Cause) -> Error {
        classified::<ConnectionFailure>(UNABLE_TO_ACQUIRE_CONNECTION, Some(cause), None)
    }

    /// Beginning, committing or rolling back a transaction failed, or a
    /// transaction was misused.
    fn transaction_failure(&self, reason: Option<&str>, cause: Option<Cause>) -> Error {
        classified::<TransactionFailure>(reason.unwrap_or(TRANSACTION_FAILED), cause, None)
    }

    /// Releasing a connection or another resource failed.
    fn close_failure(&self, reason: &str, cause: Cause) -> Error {
        classified::<CloseFailure>(reason, Some(cause), None)
    }

    /// A result was required but the statement produced none.
    fn no_results_failure(
        &self,
        reason: &str,
        cause: Option<Cause>,
        ctx: Option<&StatementContext>,
    ) -> Error {
        classified::<NoResultsFailure>(reason, cause, ctx)
    }

    /// Reading rows or decoding a column failed.
    fn result_set_failure(
        &self,
        reason: &str,
        cause: Cause,
        ctx: Option<&StatementContext>,
    ) -> Error {
        classified::<ResultSetFailure>(reason, Some(cause), ctx)
    }

    /// Low-level failure passed through as itself.
    ///
    /// Message is `reason`, or empty when only a cause is given.
    fn raw_failure(&self, reason: Option<&str>, cause: Option<Cause>) -> Error {
        if reason.is_none() && cause.is_none() {
            log::warn!("raw failure reported with neither reason nor cause");
        }
        classified::<RawFailure>(reason.unwrap_or(""), cause, None)
    }
}

/// Shorter forms of the [`ExceptionPolicy`] methods.
///
/// Implemented for every policy and not overridable: each method fills in
/// the default reason for its category and calls the full form on the
/// policy.
pub trait PolicyExt: ExceptionPolicy {
    fn statement_creation_failure_cause(&self, cause: Cause) -> Error {
        self.statement_creation_failure(UNABLE_TO_CREATE_STATEMENT, cause, None)
    }
    fn statement_execution_failure_cause(
        &self,
        cause: Cause,
        ctx: Option<&StatementContext>,
    ) -> Error {
        self.statement_execution_failure(UNABLE_TO_EXECUTE_STATEMENT, cause, ctx)
    }
    fn transaction_isolation_failure_level(&self, level: i32, cause: Cause) -> Error {
        self.transaction_isolation_failure(Some(level), None, cause)
    }
    fn transaction_isolation_failure_reason(&self, reason: &str, cause: Cause) -> Error {
        self.transaction_isolation_failure(None, Some(reason), cause)
    }
    fn result_production_failure_cause(
        &self,
        cause: Cause,
        ctx: Option<&StatementContext>,
    ) -> Error {
        self.result_production_failure(UNABLE_TO_PRODUCE_RESULT, cause, ctx)
    }
    fn transaction_failure_cause(&self, cause: Cause) -> Error {
        self.transaction_failure(None, Some(cause))
    }
    fn transaction_failure_reason(&self, reason: &str) -> Error {
        self.transaction_failure(Some(reason), None)
    }
    fn raw_failure_cause(&self, cause: Cause) -> Error {
        self.raw_failure(None, Some(cause))
    }
    fn raw_failure_reason(&self, reason: &str) -> Error {
        self.raw_failure(Some(reason), None)
    }
}

impl<P: ExceptionPolicy + ?Sized> PolicyExt for P {}

/// Policy with all the default classifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl ExceptionPolicy for DefaultPolicy {}

/// The current-policy slot of a client.
///
/// Replacing the policy is a single atomic swap. A failure that already
/// loaded the previous policy finishes with it.
#[derive(Clone)]
pub(crate) struct PolicySlot(Arc<ArcSwap<Arc<dyn ExceptionPolicy>>>);

impl PolicySlot {
    pub(crate) fn new(policy: Arc<dyn ExceptionPolicy>) -> PolicySlot {
        PolicySlot(Arc::new(ArcSwap::from_pointee(policy)))
    }
    pub(crate) fn load(&self) -> Arc<dyn ExceptionPolicy> {
        Arc::clone(&**self.0.load())
    }
    pub(crate) fn store(&self, policy: Arc<dyn ExceptionPolicy>) {
        self.0.store(Arc::new(policy));
    }
}

impl Default for PolicySlot {
    fn default() -> PolicySlot {
        PolicySlot::new(DEFAULT_POLICY.clone())
    }
}

impl fmt::Debug for PolicySlot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PolicySlot({:p})", Arc::as_ptr(&self.load()))
    }
}

fn classified<K: ErrorKind>(
    reason: &str,
    cause: Option<Cause>,
    ctx: Option<&StatementContext>,
) -> Error {
    let mut err = Error::new(K::KIND, reason.to_owned(), cause);
    if let Some(ctx) = ctx {
        if let Some(sql) = ctx.sql() {
            err.insert::<StatementText>(sql);
        }
        if !ctx.attributes().is_empty() {
            err.insert::<Attributes>(ctx.attributes().clone());
        }
    }
    log_classified(&err);
    err
}

fn log_classified(err: &Error) {
    match err.kind() {
        // pass-through failures are the caller's business
        Kind::RawFailure => {}
        _ => log::debug!("classified failure: {:#}", err),
    }
}

use std::sync::Arc;

use crate::builder::Config;
use crate::errors::Error;
use crate::handle::Handle;
use crate::policy::{ExceptionPolicy, PolicySlot};
use crate::raw::Pool;
use crate::row::FromRow;

/// Sluice database client.
///
/// Internally it contains a connection pool and the current exception
/// policy.
///
/// Clones of a client share both, so
/// [`set_exception_policy`](Client::set_exception_policy) on any clone is
/// seen by all of them and by the handles they opened. Use
/// [`with_exception_policy`](Client::with_exception_policy) to get a client
/// with its own policy that still shares the pool.
#[derive(Debug, Clone)]
pub struct Client {
    pool: Pool,
    policy: PolicySlot,
}

impl Client {
    /// Create a new client with the [`DefaultPolicy`](crate::DefaultPolicy).
    ///
    /// Note this does not create a connection immediately.
    /// Use [`ensure_connected()`][Client::ensure_connected] to establish a
    /// connection and verify that the connection is usable.
    pub fn new(config: &Config) -> Client {
        Client {
            pool: Pool::new(config),
            policy: PolicySlot::default(),
        }
    }

    pub fn config(&self) -> &Config {
        self.pool.config()
    }

    /// The policy installed last, the very same instance.
    pub fn exception_policy(&self) -> Arc<dyn ExceptionPolicy> {
        self.policy.load()
    }

    /// Replace the exception policy.
    ///
    /// Failures detected after this call are classified by the new policy.
    /// The previous policy is not consulted anymore, except by failures
    /// that were already being classified during the swap.
    pub fn set_exception_policy(&self, policy: Arc<dyn ExceptionPolicy>) {
        log::debug!("installing new exception policy");
        self.policy.store(policy);
    }

    /// Create a shallow copy of the client with its own exception policy.
    ///
    /// The copy shares the connection pool with this client.
    pub fn with_exception_policy(&self, policy: Arc<dyn ExceptionPolicy>) -> Client {
        Client {
            pool: self.pool.clone(),
            policy: PolicySlot::new(policy),
        }
    }

    /// Check out a connection.
    ///
    /// This is a blocking call, see [`use_handle`](Client::use_handle) for
    /// async code.
    pub fn open(&self) -> Result<Handle, Error> {
        let conn = self.pool.acquire(&*self.policy.load())?;
        Ok(Handle::new(conn, self.policy.clone()))
    }

    /// Ensure that there is at least one working connection to the pool.
    ///
    /// This can be used at application startup to ensure that you have a
    /// working connection.
    pub async fn ensure_connected(&self) -> Result<(), Error> {
        self.use_handle(|_| Ok(())).await
    }

    /// Run `f` with a handle on the blocking thread pool.
    ///
    /// The handle is closed after `f` returns successfully, so a transaction
    /// left open by `f` is rolled back and reported.
    pub async fn use_handle<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Handle) -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let client = self.clone();
        let task = tokio::task::spawn_blocking(move || -> Result<T, Error> {
            let mut handle = client.open()?;
            let value = f(&mut handle)?;
            handle.close()?;
            Ok(value)
        });
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(self.policy.load().connection_failure(Box::new(e))),
        }
    }

    /// Execute a statement, returning number of rows changed.
    pub async fn execute(&self, sql: impl Into<String>) -> Result<usize, Error> {
        let sql = sql.into();
        self.use_handle(move |handle| handle.execute(&sql, []))
            .await
    }

    /// Execute a query and return all rows.
    ///
    /// ```rust,no_run
    /// # async fn run(client: sluice_tokio::Client) -> Result<(), sluice_tokio::Error> {
    /// let two_numbers: Vec<(i64, i64)> = client.query("SELECT 10, 20").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn query<T>(&self, sql: impl Into<String>) -> Result<Vec<T>, Error>
    where
        T: FromRow + Send + 'static,
    {
        let sql = sql.into();
        self.use_handle(move |handle| handle.query(&sql, [])).await
    }

    /// Execute a query and return a single row.
    ///
    /// Fails with [`NoResultsFailure`](crate::errors::NoResultsFailure) if
    /// the query returns no rows.
    pub async fn query_required_single<T>(&self, sql: impl Into<String>) -> Result<T, Error>
    where
        T: FromRow + Send + 'static,
    {
        let sql = sql.into();
        self.use_handle(move |handle| handle.query_required_single(&sql, []))
            .await
    }

    /// Run `f` in a transaction on a pooled connection.
    pub async fn transaction<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&Handle) -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        self.use_handle(move |handle| handle.in_transaction(f)).await
    }

    /// Close idle connections of the pool.
    ///
    /// Returns number of connections closed. Handles that are checked out
    /// at the moment are not affected.
    pub fn close(&self) -> Result<usize, Error> {
        self.pool.close_idle(&*self.policy.load())
    }
}

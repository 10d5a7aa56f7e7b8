mod connection;

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex as BlockingMutex};

use crate::builder::Config;
use crate::errors::Error;
use crate::policy::ExceptionPolicy;

#[derive(Clone, Debug)]
pub(crate) struct Pool(Arc<PoolInner>);

#[derive(Debug)]
struct PoolInner {
    config: Config,
    queue: BlockingMutex<VecDeque<rusqlite::Connection>>,
}

/// Connection borrowed from the pool, returned to it on drop.
pub(crate) struct PoolConnection {
    inner: Option<rusqlite::Connection>,
    pool: Arc<PoolInner>,
}

impl Pool {
    pub fn new(config: &Config) -> Pool {
        Pool(Arc::new(PoolInner {
            queue: BlockingMutex::new(VecDeque::with_capacity(config.max_idle)),
            config: config.clone(),
        }))
    }
    pub fn config(&self) -> &Config {
        &self.0.config
    }
    pub fn acquire(&self, policy: &dyn ExceptionPolicy) -> Result<PoolConnection, Error> {
        if let Some(conn) = self.0.next_conn() {
            return Ok(PoolConnection {
                inner: Some(conn),
                pool: self.0.clone(),
            });
        }
        log::debug!("opening new connection to {:?}", self.0.config.database);
        let conn = connection::open(&self.0.config)
            .map_err(|e| policy.connection_failure(Box::new(e)))?;
        Ok(PoolConnection {
            inner: Some(conn),
            pool: self.0.clone(),
        })
    }
    /// Close all idle connections.
    ///
    /// Every connection is closed even if some fail, the first failure is
    /// reported.
    pub fn close_idle(&self, policy: &dyn ExceptionPolicy) -> Result<usize, Error> {
        let idle = std::mem::take(&mut *self.0.lock_queue());
        let mut closed = 0;
        let mut first_error = None;
        for conn in idle {
            match conn.close() {
                Ok(()) => closed += 1,
                Err((_conn, e)) => {
                    log::warn!("error closing connection: {}", e);
                    if first_error.is_none() {
                        first_error =
                            Some(policy.close_failure("Unable to close connection", Box::new(e)));
                    }
                }
            }
        }
        log::debug!("closed {} idle connections", closed);
        match first_error {
            Some(e) => Err(e),
            None => Ok(closed),
        }
    }
    pub fn idle_count(&self) -> usize {
        self.0.lock_queue().len()
    }
}

impl PoolInner {
    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<rusqlite::Connection>> {
        self.queue
            .lock()
            .expect("pool shared state mutex is not poisoned")
    }
    fn next_conn(&self) -> Option<rusqlite::Connection> {
        self.lock_queue().pop_front()
    }
    fn release(&self, conn: rusqlite::Connection) {
        // a shared-cache memory database disappears with its last
        // connection, so an open transaction is rolled back, not dropped
        if !connection::is_consistent(&conn) {
            log::warn!("rolling back transaction left open on returned connection");
            if !connection::reset(&conn) {
                log::warn!("dropping connection left inside a transaction");
                return;
            }
        }
        let mut queue = self.lock_queue();
        if queue.len() < self.config.max_idle {
            queue.push_back(conn);
        }
    }
}

impl PoolConnection {
    pub fn inner(&self) -> &rusqlite::Connection {
        self.inner.as_ref().expect("connection is not released")
    }
}

impl Drop for PoolConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.inner.take() {
            self.pool.release(conn);
        }
    }
}

impl fmt::Debug for PoolConnection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PoolConnection")
            .field("database", &self.pool.config.database)
            .finish()
    }
}

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::{ConnectionFailure, Error, ErrorKind};

pub const DEFAULT_MAX_IDLE: usize = 4;
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
pub const MEMORY_DATABASE: &str = ":memory:";

static MEMORY_DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Where the connections of a client point to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Database {
    File(PathBuf),
    /// Shared-cache in-memory database, named so that every pooled
    /// connection of one client opens the same one.
    Memory(String),
}

/// Builder for [`Config`]
#[derive(Debug, Clone, Default)]
pub struct Builder {
    database: Option<String>,
    max_idle: Option<usize>,
    busy_timeout: Option<Duration>,
    read_only: Option<bool>,
    foreign_keys: Option<bool>,
}

/// Connection configuration of a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) database: Database,
    pub(crate) max_idle: usize,
    pub(crate) busy_timeout: Duration,
    pub(crate) read_only: bool,
    pub(crate) foreign_keys: bool,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Read options from `SLUICE_*` environment variables.
    ///
    /// Variables that are not set leave the option unchanged.
    #[cfg(feature = "env")]
    pub fn from_env(mut self) -> Result<Builder, Error> {
        use std::env;

        if let Some(database) = env_var("SLUICE_DATABASE")? {
            self.database = Some(database);
        }
        if let Some(max_idle) = env_var("SLUICE_MAX_IDLE")? {
            self.max_idle = Some(parse_env("SLUICE_MAX_IDLE", &max_idle)?);
        }
        if let Some(timeout) = env_var("SLUICE_BUSY_TIMEOUT_MS")? {
            let ms = parse_env("SLUICE_BUSY_TIMEOUT_MS", &timeout)?;
            self.busy_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(read_only) = env_var("SLUICE_READ_ONLY")? {
            self.read_only = Some(match &read_only[..] {
                "1" | "true" | "on" => true,
                "0" | "false" | "off" => false,
                _ => {
                    return Err(ConnectionFailure::with_message(format!(
                        "invalid SLUICE_READ_ONLY: {:?}",
                        read_only
                    )))
                }
            });
        }
        return Ok(self);

        fn env_var(name: &str) -> Result<Option<String>, Error> {
            match env::var(name) {
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(e) => Err(ConnectionFailure::with_source(e)
                    .context(format!("cannot read {}", name))),
            }
        }
    }

    /// Database file path, or `":memory:"`.
    pub fn database(mut self, database: impl AsRef<Path>) -> Builder {
        self.database = Some(database.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Maximum number of idle connections kept open by the pool.
    pub fn max_idle(mut self, max_idle: usize) -> Builder {
        self.max_idle = Some(max_idle);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Builder {
        self.busy_timeout = Some(timeout);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Builder {
        self.read_only = Some(read_only);
        self
    }

    /// Enforce foreign keys on every connection (on by default).
    pub fn foreign_keys(mut self, foreign_keys: bool) -> Builder {
        self.foreign_keys = Some(foreign_keys);
        self
    }

    pub fn build(self) -> Result<Config, Error> {
        let database = match self.database.as_deref() {
            None | Some(MEMORY_DATABASE) => {
                let n = MEMORY_DB_COUNTER.fetch_add(1, Ordering::Relaxed);
                Database::Memory(format!(
                    "file:sluice-memdb-{}-{}?mode=memory&cache=shared",
                    std::process::id(),
                    n
                ))
            }
            Some("") => {
                return Err(ConnectionFailure::with_message("database path is empty"));
            }
            Some(path) => Database::File(PathBuf::from(path)),
        };
        let max_idle = self.max_idle.unwrap_or(DEFAULT_MAX_IDLE);
        if max_idle == 0 && matches!(database, Database::Memory(_)) {
            // the database lives only as long as one of its connections
            return Err(ConnectionFailure::with_message(
                "in-memory database requires max_idle of at least 1",
            ));
        }
        Ok(Config {
            database,
            max_idle,
            busy_timeout: self.busy_timeout.unwrap_or(DEFAULT_BUSY_TIMEOUT),
            read_only: self.read_only.unwrap_or(false),
            foreign_keys: self.foreign_keys.unwrap_or(true),
        })
    }
}

#[cfg(feature = "env")]
fn parse_env<T>(name: &str, value: &str) -> Result<T, Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConnectionFailure::with_source(e).context(format!("invalid {}", name)))
}

impl Config {
    pub fn database(&self) -> &Database {
        &self.database
    }
    pub fn max_idle(&self) -> usize {
        self.max_idle
    }
    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }
    pub fn read_only(&self) -> bool {
        self.read_only
    }
    pub fn foreign_keys(&self) -> bool {
        self.foreign_keys
    }
}

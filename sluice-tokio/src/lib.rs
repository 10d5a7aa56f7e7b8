/*!
SQLite client for tokio with pluggable exception policies.

Every failure detected while talking to the database (a statement that
does not parse, a constraint violation, a transaction that cannot be
committed, a row that cannot be decoded, ...) is handed to the
[`ExceptionPolicy`] installed on the [`Client`]. The policy decides the
[`Kind`](errors::Kind) and message of the [`Error`] that is returned to the
caller, keeping the driver error as its cause.

The [`DefaultPolicy`] is installed on every new client. Custom policies
override only the categories they need:

```rust,no_run
use std::sync::Arc;

use sluice_tokio::errors::{Error, ErrorKind, StatementCreationFailure};
use sluice_tokio::{Builder, Cause, Client, ExceptionPolicy, StatementContext};

struct MyPolicy;

impl ExceptionPolicy for MyPolicy {
    fn statement_creation_failure(
        &self,
        _reason: &str,
        cause: Cause,
        ctx: Option<&StatementContext>,
    ) -> Error {
        let sql = ctx.and_then(|c| c.sql()).unwrap_or("").to_owned();
        StatementCreationFailure::with_source_box(cause).context(format!("bad SQL: {sql}"))
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let client = Client::new(&Builder::new().database("app.db").build()?);
    client.set_exception_policy(Arc::new(MyPolicy));
    let err = client.execute("SHOULDFAIL").await.unwrap_err();
    assert_eq!(err.message(), "bad SQL: SHOULDFAIL");
    Ok(())
}
```
*/

mod builder;
mod client;
mod context;
mod handle;
mod policy;
mod raw;
mod row;

pub mod errors {
    //! Error types, re-exported from `sluice-errors`
    pub use sluice_errors::*;
}

pub use builder::{Builder, Config, Database};
pub use builder::{DEFAULT_BUSY_TIMEOUT, DEFAULT_MAX_IDLE, MEMORY_DATABASE};
pub use client::Client;
pub use context::StatementContext;
pub use errors::{Cause, Error};
pub use handle::{AutoCommitStillDisabled, UnsupportedIsolationLevel};
pub use handle::{Batch, Handle, TransactionIsolationLevel};
pub use handle::{IMPROPER_TRANSACTION_CLOSE, NO_RESULTS};
pub use handle::{UNABLE_TO_ADVANCE_RESULT_SET, UNABLE_TO_DECODE_ROW};
pub use policy::{DefaultPolicy, ExceptionPolicy, PolicyExt};
pub use policy::{ISOLATION_LEVEL_UNSPECIFIED, TRANSACTION_FAILED};
pub use policy::{UNABLE_TO_ACQUIRE_CONNECTION, UNABLE_TO_CREATE_STATEMENT};
pub use policy::{UNABLE_TO_EXECUTE_STATEMENT, UNABLE_TO_PRODUCE_RESULT};
pub use policy::UNABLE_TO_RESTORE_AUTO_COMMIT;
pub use row::FromRow;

/// Create a client configured from `SLUICE_*` environment variables
///
/// This method opens a single connection immediately to ensure that
/// configuration is valid and will error out otherwise.
///
/// For more fine-grained setup see [`Client`] and [`Builder`] documentation.
#[cfg(feature = "env")]
pub async fn create_client() -> Result<Client, Error> {
    let config = Builder::new().from_env()?.build()?;
    let client = Client::new(&config);
    client.ensure_connected().await?;
    Ok(client)
}

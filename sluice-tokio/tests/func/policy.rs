use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sluice_tokio::errors::{Error, ErrorKind, Kind, StatementCreationFailure};
use sluice_tokio::errors::{StatementError, StatementExecutionFailure};
use sluice_tokio::{Cause, DefaultPolicy, ExceptionPolicy, StatementContext};
use sluice_tokio::{UNABLE_TO_CREATE_STATEMENT, UNABLE_TO_EXECUTE_STATEMENT};

use crate::db::TestDb;

struct CustomCreation;

impl ExceptionPolicy for CustomCreation {
    fn statement_creation_failure(
        &self,
        _reason: &str,
        cause: Cause,
        _ctx: Option<&StatementContext>,
    ) -> Error {
        StatementCreationFailure::with_source_box(cause).context("Custom reason")
    }
}

struct CustomExecution;

impl ExceptionPolicy for CustomExecution {
    fn statement_execution_failure(
        &self,
        _reason: &str,
        cause: Cause,
        _ctx: Option<&StatementContext>,
    ) -> Error {
        StatementExecutionFailure::with_source_box(cause).context("Execute statement")
    }
}

/// Re-classifies every malformed statement as an execution failure.
struct Reclassify;

impl ExceptionPolicy for Reclassify {
    fn statement_creation_failure(
        &self,
        reason: &str,
        cause: Cause,
        ctx: Option<&StatementContext>,
    ) -> Error {
        DefaultPolicy.statement_execution_failure(reason, cause, ctx)
    }
}

#[test_log::test(tokio::test)]
async fn malformed_sql_is_statement_creation_failure() {
    let db = TestDb::new();
    let err = db.client.execute("SHOULDFAIL").await.unwrap_err();
    assert_eq!(err.kind(), Kind::StatementCreationFailure);
    assert!(err.is::<StatementError>());
    assert_eq!(err.message(), UNABLE_TO_CREATE_STATEMENT);
    assert_eq!(err.statement_text(), Some("SHOULDFAIL"));
    let cause = err.downcast_cause::<rusqlite::Error>().unwrap();
    assert!(cause.to_string().contains("syntax error"), "{cause}");
}

#[test_log::test(tokio::test)]
async fn replacing_exception_policy() {
    let db = TestDb::new();
    let custom: Arc<dyn ExceptionPolicy> = Arc::new(CustomCreation);
    db.client.set_exception_policy(custom.clone());
    assert!(Arc::ptr_eq(&db.client.exception_policy(), &custom));
    // clones share the slot
    let clone = db.client.clone();
    assert!(Arc::ptr_eq(&clone.exception_policy(), &custom));
    assert!(Arc::ptr_eq(&db.handle().exception_policy(), &custom));
}

#[test_log::test(tokio::test)]
async fn policy_is_used_for_create_statement() {
    let db = TestDb::new();
    db.client.set_exception_policy(Arc::new(CustomCreation));
    let err = db
        .client
        .use_handle(|handle| handle.execute("SHOULDFAIL", []))
        .await
        .unwrap_err();
    assert!(err.is::<StatementCreationFailure>());
    assert_eq!(err.message(), "Custom reason");
    assert!(err.downcast_cause::<rusqlite::Error>().is_some());
}

#[test_log::test(tokio::test)]
async fn policy_is_used_for_execute_statement() {
    let db = TestDb::new();
    db.client.set_exception_policy(Arc::new(CustomExecution));
    let err = db
        .client
        .use_handle(|handle| {
            handle
                .batch()
                .add("INSERT INTO exception_policy (name) VALUES ('test')")
                .add("INSERT INTO exception_policy (name) VALUES ('test')")
                .execute()
        })
        .await
        .unwrap_err();
    assert!(err.is::<StatementExecutionFailure>());
    assert_eq!(err.message(), "Execute statement");
}

#[test_log::test(tokio::test)]
async fn override_does_not_leak_into_other_categories() -> anyhow::Result<()> {
    let db = TestDb::new();
    db.client.set_exception_policy(Arc::new(CustomCreation));
    db.client
        .execute("INSERT INTO exception_policy (name) VALUES ('dup')")
        .await?;
    let err = db
        .client
        .execute("INSERT INTO exception_policy (name) VALUES ('dup')")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Kind::StatementExecutionFailure);
    assert_eq!(err.message(), UNABLE_TO_EXECUTE_STATEMENT);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn override_can_reclassify() {
    let db = TestDb::new();
    db.client.set_exception_policy(Arc::new(Reclassify));
    let err = db.client.execute("SHOULDFAIL").await.unwrap_err();
    assert_eq!(err.kind(), Kind::StatementExecutionFailure);
    assert_eq!(err.message(), UNABLE_TO_CREATE_STATEMENT);
    assert_eq!(err.statement_text(), Some("SHOULDFAIL"));
}

#[test_log::test(tokio::test)]
async fn independent_clients() {
    let db = TestDb::new();
    let custom = db.client.with_exception_policy(Arc::new(CustomCreation));
    let err = custom.execute("SHOULDFAIL").await.unwrap_err();
    assert_eq!(err.message(), "Custom reason");
    let err = db.client.execute("SHOULDFAIL").await.unwrap_err();
    assert_eq!(err.message(), UNABLE_TO_CREATE_STATEMENT);
}

#[test_log::test]
fn swap_is_seen_by_open_handle() {
    let db = TestDb::new();
    let handle = db.handle();
    let err = handle.execute("SHOULDFAIL", []).unwrap_err();
    assert_eq!(err.message(), UNABLE_TO_CREATE_STATEMENT);

    db.client.set_exception_policy(Arc::new(CustomCreation));
    let err = handle.execute("SHOULDFAIL", []).unwrap_err();
    assert_eq!(err.message(), "Custom reason");

    db.client.set_exception_policy(Arc::new(DefaultPolicy));
    let err = handle.execute("SHOULDFAIL", []).unwrap_err();
    assert_eq!(err.message(), UNABLE_TO_CREATE_STATEMENT);
}

struct Counting(Arc<AtomicUsize>);

impl ExceptionPolicy for Counting {
    fn statement_creation_failure(
        &self,
        reason: &str,
        cause: Cause,
        ctx: Option<&StatementContext>,
    ) -> Error {
        self.0.fetch_add(1, Ordering::SeqCst);
        DefaultPolicy.statement_creation_failure(reason, cause, ctx)
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn concurrent_failures_during_swap() {
    let db = TestDb::new();
    let mut tasks = Vec::new();
    for i in 0..32 {
        let client = db.client.clone();
        tasks.push(tokio::spawn(async move {
            client.execute(format!("SHOULDFAIL {i}")).await.unwrap_err()
        }));
        if i == 16 {
            db.client.set_exception_policy(Arc::new(CustomCreation));
        }
    }
    for task in tasks {
        let err = task.await.unwrap();
        assert_eq!(err.kind(), Kind::StatementCreationFailure);
        assert!(
            err.message() == UNABLE_TO_CREATE_STATEMENT || err.message() == "Custom reason",
            "{err:#}"
        );
    }
    let err = db.client.execute("SHOULDFAIL").await.unwrap_err();
    assert_eq!(err.message(), "Custom reason");

    // with no swap in flight every failure goes to the installed policy
    let calls = Arc::new(AtomicUsize::new(0));
    db.client
        .set_exception_policy(Arc::new(Counting(calls.clone())));
    let tasks = (0..8)
        .map(|i| {
            let client = db.client.clone();
            tokio::spawn(async move {
                client.execute(format!("SHOULDFAIL {i}")).await.unwrap_err()
            })
        })
        .collect::<Vec<_>>();
    for task in tasks {
        let err = task.await.unwrap();
        assert_eq!(err.message(), UNABLE_TO_CREATE_STATEMENT);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 8);
}

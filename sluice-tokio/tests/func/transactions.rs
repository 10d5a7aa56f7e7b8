use sluice_tokio::errors::{Kind, TransactionError};
use sluice_tokio::{TransactionIsolationLevel, UnsupportedIsolationLevel};
use sluice_tokio::IMPROPER_TRANSACTION_CLOSE;

use crate::db::TestDb;

fn count(db: &TestDb, table: &str) -> i64 {
    db.handle()
        .query_required_single(&format!("SELECT count(*) FROM {table}"), [])
        .unwrap()
}

#[test_log::test]
fn commit_and_rollback() -> anyhow::Result<()> {
    let db = TestDb::new();
    let handle = db.handle();
    handle.in_transaction(|h| h.execute("INSERT INTO exception_policy VALUES ('kept')", []))?;
    let err = handle
        .in_transaction(|h| {
            h.execute("INSERT INTO exception_policy VALUES ('lost')", [])?;
            h.execute("SHOULDFAIL", [])
        })
        .unwrap_err();
    assert_eq!(err.kind(), Kind::StatementCreationFailure);
    assert!(!handle.is_in_transaction());
    drop(handle);
    assert_eq!(count(&db, "exception_policy"), 1);
    Ok(())
}

#[test_log::test]
fn nested_transaction_joins_outer() -> anyhow::Result<()> {
    let db = TestDb::new();
    let handle = db.handle();
    handle.in_transaction(|h| {
        h.in_transaction(|h| h.execute("INSERT INTO exception_policy VALUES ('a')", []))?;
        assert!(h.is_in_transaction());
        Ok(())
    })?;
    assert!(!handle.is_in_transaction());
    Ok(())
}

#[test_log::test]
fn commit_without_transaction() {
    let db = TestDb::new();
    let err = db.handle().commit().unwrap_err();
    assert_eq!(err.kind(), Kind::TransactionFailure);
    assert!(err.is::<TransactionError>());
    assert_eq!(err.message(), "Failed to commit transaction");
    assert!(err.downcast_cause::<rusqlite::Error>().is_some());
}

#[test_log::test]
fn begin_twice() {
    let db = TestDb::new();
    let handle = db.handle();
    handle.begin().unwrap();
    let err = handle.begin().unwrap_err();
    assert_eq!(err.kind(), Kind::TransactionFailure);
    assert_eq!(err.message(), "Failed to start transaction");
    handle.rollback().unwrap();
}

#[test_log::test]
fn deferred_constraint_fails_commit() {
    let db = TestDb::new();
    let handle = db.handle();
    let err = handle
        .in_transaction(|h| h.execute("INSERT INTO child (parent_id) VALUES (42)", []))
        .unwrap_err();
    assert_eq!(err.kind(), Kind::TransactionFailure);
    assert_eq!(err.message(), "Failed to commit transaction");
    let cause = err.downcast_cause::<rusqlite::Error>().unwrap();
    assert!(cause.to_string().contains("FOREIGN KEY"), "{cause}");
    // auto-commit is restored even though commit failed
    assert!(!handle.is_in_transaction());
    drop(handle);
    assert_eq!(count(&db, "child"), 0);
}

#[test_log::test]
fn close_with_open_transaction() {
    let db = TestDb::new();
    let handle = db.handle();
    handle.begin().unwrap();
    handle
        .execute("INSERT INTO exception_policy VALUES ('uncommitted')", [])
        .unwrap();
    let err = handle.close().unwrap_err();
    assert_eq!(err.kind(), Kind::TransactionFailure);
    assert_eq!(err.message(), IMPROPER_TRANSACTION_CLOSE);
    assert_eq!(count(&db, "exception_policy"), 0);
}

#[test_log::test(tokio::test)]
async fn use_handle_reports_open_transaction() {
    let db = TestDb::new();
    let err = db
        .client
        .use_handle(|h| h.begin())
        .await
        .unwrap_err();
    assert_eq!(err.message(), IMPROPER_TRANSACTION_CLOSE);
}

#[test_log::test(tokio::test)]
async fn client_transaction() -> anyhow::Result<()> {
    let db = TestDb::new();
    let inserted = db
        .client
        .transaction(|h| {
            h.execute("INSERT INTO parent (id) VALUES (1)", [])?;
            h.execute("INSERT INTO child (parent_id) VALUES (1)", [])
        })
        .await?;
    assert_eq!(inserted, 1);
    let total: i64 = db
        .client
        .query_required_single("SELECT count(*) FROM child")
        .await?;
    assert_eq!(total, 1);
    Ok(())
}

#[test_log::test]
fn unsupported_isolation_level() {
    let db = TestDb::new();
    let err = db
        .handle()
        .set_transaction_isolation(TransactionIsolationLevel::RepeatableRead)
        .unwrap_err();
    assert_eq!(err.kind(), Kind::TransactionIsolationFailure);
    assert_eq!(err.isolation_level(), Some(4));
    assert_eq!(err.message(), "Unable to set isolation level to 4");
    let cause = err.downcast_cause::<UnsupportedIsolationLevel>().unwrap();
    assert_eq!(cause.0, TransactionIsolationLevel::RepeatableRead);
}

#[test_log::test]
fn isolation_roundtrip() -> anyhow::Result<()> {
    let db = TestDb::new();
    let handle = db.handle();
    assert_eq!(handle.transaction_isolation()?, TransactionIsolationLevel::Serializable);
    handle.set_transaction_isolation(TransactionIsolationLevel::ReadUncommitted)?;
    assert_eq!(
        handle.transaction_isolation()?,
        TransactionIsolationLevel::ReadUncommitted
    );
    handle.set_transaction_isolation(TransactionIsolationLevel::Serializable)?;
    handle.in_transaction_with_isolation(TransactionIsolationLevel::ReadUncommitted, |h| {
        assert_eq!(
            h.transaction_isolation()?,
            TransactionIsolationLevel::ReadUncommitted
        );
        Ok(())
    })?;
    assert_eq!(handle.transaction_isolation()?, TransactionIsolationLevel::Serializable);
    Ok(())
}

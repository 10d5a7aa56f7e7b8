use sluice_tokio::errors::Kind;
use sluice_tokio::{Builder, Client, MEMORY_DATABASE};

use crate::db::TestDb;

#[test_log::test(tokio::test)]
async fn simple() -> anyhow::Result<()> {
    let db = TestDb::new();
    db.client.ensure_connected().await?;

    let value = db.client.query::<i64>("SELECT 7*93").await?;
    assert_eq!(value, vec![651]);

    let pair = db.client.query_required_single::<(i64, String)>("SELECT 5*11, 'x' || 'y'").await?;
    assert_eq!(pair, (55, "xy".to_string()));

    let changed = db
        .client
        .execute("INSERT INTO exception_policy (name) VALUES ('simple')")
        .await?;
    assert_eq!(changed, 1);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn memory_database_is_shared_between_connections() -> anyhow::Result<()> {
    let config = Builder::new().database(MEMORY_DATABASE).build()?;
    let client = Client::new(&config);
    let keep = client.open()?;
    client.execute("CREATE TABLE shared (x INTEGER)").await?;
    client.execute("INSERT INTO shared VALUES (1)").await?;
    let rows = client.query::<i64>("SELECT x FROM shared").await?;
    assert_eq!(rows, vec![1]);
    drop(keep);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn memory_database_survives_failed_transaction() -> anyhow::Result<()> {
    let client = Client::new(&Builder::new().database(MEMORY_DATABASE).build()?);
    client.execute("CREATE TABLE t (x INTEGER)").await?;
    client.execute("INSERT INTO t VALUES (1)").await?;
    let err = client
        .use_handle(|h| {
            h.begin()?;
            h.execute("INSERT INTO t VALUES (2)", [])?;
            h.execute("SHOULDFAIL", [])
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Kind::StatementCreationFailure);
    let rows = client.query::<i64>("SELECT x FROM t").await?;
    assert_eq!(rows, vec![1]);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn ensure_connected_fails_on_bad_path() {
    let config = Builder::new()
        .database("/nonexistent-sluice-dir/nested/test.db")
        .build()
        .unwrap();
    let err = Client::new(&config).ensure_connected().await.unwrap_err();
    assert_eq!(err.kind(), Kind::ConnectionFailure);
}

#[test_log::test]
fn close_idle_connections() -> anyhow::Result<()> {
    let db = TestDb::new();
    let a = db.handle();
    let b = db.handle();
    a.close()?;
    b.close()?;
    assert_eq!(db.client.close()?, 2);
    assert_eq!(db.client.close()?, 0);
    // pool opens new connections after close
    db.handle().execute("INSERT INTO exception_policy VALUES ('again')", [])?;
    assert!(db.path.exists());
    Ok(())
}

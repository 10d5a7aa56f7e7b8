use std::path::PathBuf;

use sluice_tokio::{Builder, Client, Handle};
use tempfile::TempDir;

pub struct TestDb {
    pub client: Client,
    pub path: PathBuf,
    _dir: TempDir,
}

impl TestDb {
    pub fn new() -> TestDb {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("test.db");
        let config = Builder::new()
            .database(&path)
            .build()
            .expect("valid config");
        let client = Client::new(&config);
        let handle = client.open().expect("database opens");
        handle
            .script(
                "CREATE TABLE exception_policy (name VARCHAR(20) UNIQUE);
                 CREATE TABLE parent (id INTEGER PRIMARY KEY);
                 CREATE TABLE child (
                     parent_id INTEGER REFERENCES parent(id)
                         DEFERRABLE INITIALLY DEFERRED
                 );",
            )
            .expect("schema is created");
        TestDb {
            client,
            path,
            _dir: dir,
        }
    }

    pub fn handle(&self) -> Handle {
        self.client.open().expect("handle opens")
    }
}

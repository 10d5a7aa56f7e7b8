use rusqlite::{Connection, OpenFlags};

use crate::builder::{Config, Database};

pub(crate) fn open(config: &Config) -> Result<Connection, rusqlite::Error> {
    let mut flags = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    if config.read_only {
        flags |= OpenFlags::SQLITE_OPEN_READ_ONLY;
    } else {
        flags |= OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
    }
    let conn = match &config.database {
        Database::File(path) => Connection::open_with_flags(path, flags)?,
        Database::Memory(uri) => Connection::open_with_flags(uri, flags)?,
    };
    conn.busy_timeout(config.busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
    Ok(conn)
}

/// Connection is reusable if nobody left a transaction open on it.
pub(crate) fn is_consistent(conn: &Connection) -> bool {
    conn.is_autocommit()
}

/// Roll back a transaction left open on the connection.
///
/// Returns `false` if the connection is still unusable afterwards.
pub(crate) fn reset(conn: &Connection) -> bool {
    if is_consistent(conn) {
        return true;
    }
    if let Err(e) = conn.execute_batch("ROLLBACK") {
        log::warn!("cannot roll back returned connection: {}", e);
        return false;
    }
    is_consistent(conn)
}

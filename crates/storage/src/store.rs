// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::Connection;

use crate::error::StoreError;
use crate::schema;

/// Handle to the harness's relational database file. One writer, many
/// readers, per §4.1. `rusqlite::Connection` is not `Sync`, so we serialize
/// access behind a mutex; this matches the single-process, single-writer
/// discipline the rest of the harness already assumes.
pub struct Store {
    pub(crate) conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        schema::apply(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory store for tests. WAL mode is a no-op on `:memory:` but
    /// foreign keys still apply.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        schema::apply(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_in_memory_and_applies_schema() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn.lock();
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='sessions'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}

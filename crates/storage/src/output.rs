// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output chunk CRUD. Append-only: the Durable Store never rewrites or
//! deletes an output row except via cascade-delete of its session.

use gsdh_core::clock::MillisSinceEpoch;
use gsdh_core::output::{OutputChunk, StreamTag};
use gsdh_core::session::SessionId;
use rusqlite::{params, Row};

use crate::error::StoreError;
use crate::Store;

fn from_row(row: &Row<'_>) -> rusqlite::Result<OutputChunk> {
    let stream: String = row.get("stream")?;
    Ok(OutputChunk {
        session: SessionId::from_string(row.get::<_, String>("session_id")?),
        at: row.get("at")?,
        stream: if stream == "stderr" { StreamTag::Stderr } else { StreamTag::Stdout },
        bytes: row.get("bytes")?,
    })
}

impl Store {
    pub fn append_output(&self, chunk: &OutputChunk) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO output_chunks (session_id, at, stream, bytes) VALUES (?1, ?2, ?3, ?4)",
            params![chunk.session.as_str(), chunk.at, chunk.stream.to_string(), chunk.bytes],
        )?;
        Ok(())
    }

    /// Full output history for a session, oldest first.
    pub fn get_output(&self, session: &SessionId) -> Result<Vec<OutputChunk>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT * FROM output_chunks WHERE session_id = ?1 ORDER BY at ASC, rowid_pk ASC")?;
        let rows = stmt.query_map(params![session.as_str()], from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    /// Incremental slice strictly after `since` (exclusive), for
    /// `get_output(session, since)` polling.
    pub fn get_output_since(
        &self,
        session: &SessionId,
        since: MillisSinceEpoch,
    ) -> Result<Vec<OutputChunk>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT * FROM output_chunks WHERE session_id = ?1 AND at > ?2 ORDER BY at ASC, rowid_pk ASC",
        )?;
        let rows = stmt.query_map(params![session.as_str(), since], from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    /// Last `n` chunks for a session, oldest first within the returned slice.
    pub fn get_output_tail(&self, session: &SessionId, n: usize) -> Result<Vec<OutputChunk>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT * FROM (SELECT * FROM output_chunks WHERE session_id = ?1 ORDER BY at DESC, rowid_pk DESC LIMIT ?2)
             ORDER BY at ASC, rowid_pk ASC",
        )?;
        let rows = stmt.query_map(params![session.as_str(), n as i64], from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }
}

use crate::ingest::reconcile::ReconcileResult;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionBatch {
    pub id: i64,
    pub partition_key: String,
    pub content_sha256: Option<String>,
    pub started_at: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
    pub listings_seen: Option<i64>,
    pub created: Option<i64>,
    pub updated: Option<i64>,
    pub skipped: Option<i64>,
    pub removed: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
}

pub fn start_batch(
    conn: &Connection,
    partition_key: &str,
    content_sha256: Option<&str>,
    now: NaiveDateTime,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO ingestion_batches (partition_key, content_sha256, started_at, success) VALUES (?, ?, ?, 0)",
        params![partition_key, content_sha256, now],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Closes a batch with either its reconcile counts or the error that stopped it.
pub fn finish_batch(
    conn: &Connection,
    batch_id: i64,
    now: NaiveDateTime,
    listings_seen: usize,
    outcome: Result<&ReconcileResult, &str>,
) -> rusqlite::Result<()> {
    let (counts, error) = match outcome {
        Ok(r) => (Some(*r), None),
        Err(message) => (None, Some(message)),
    };
    conn.execute(
        "UPDATE ingestion_batches
         SET finished_at = ?, listings_seen = ?, created = ?, updated = ?, skipped = ?, removed = ?,
             success = ?, error_message = ?
         WHERE id = ?",
        params![
            now,
            listings_seen as i64,
            counts.map(|c| c.created as i64),
            counts.map(|c| c.updated as i64),
            counts.map(|c| c.skipped as i64),
            counts.map(|c| c.removed as i64),
            error.is_none(),
            error,
            batch_id
        ],
    )?;
    Ok(())
}

pub fn get_recent_batches(conn: &Connection) -> rusqlite::Result<Vec<IngestionBatch>> {
    let mut stmt = conn.prepare(
        "SELECT id, partition_key, content_sha256, started_at, finished_at, listings_seen,
                created, updated, skipped, removed, success, error_message
         FROM ingestion_batches ORDER BY started_at DESC, id DESC LIMIT 50",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(IngestionBatch {
            id: row.get(0)?,
            partition_key: row.get(1)?,
            content_sha256: row.get(2)?,
            started_at: row.get(3)?,
            finished_at: row.get(4)?,
            listings_seen: row.get(5)?,
            created: row.get(6)?,
            updated: row.get(7)?,
            skipped: row.get(8)?,
            removed: row.get(9)?,
            success: row.get(10)?,
            error_message: row.get(11)?,
        })
    })?;

    rows.collect()
}

use crate::db::connection::Database;
use crate::domain::{CurrentOffer, Decimal, Listing, Operation, VersionedRecord};
use crate::filter::translate::{order_by_sql, SqlTranslator};
use crate::filter::{FilterNode, SortClause};
use crate::ingest::repository::{ExistingOffer, OfferRepository, RepositoryError, VersionEntry};
use chrono::{NaiveDateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{ffi, params, params_from_iter, Connection, Row, Statement, ToSql};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Ids bound per statement. Stays well under SQLite's bound-parameter limit.
const ID_CHUNK: usize = 500;

/// Snapshot columns in the order `read_listing` expects them.
const SNAPSHOT_COLUMNS: &str = "v.uf, v.city, v.neighborhood, v.address, v.description, \
     v.property_type, v.selling_type, v.asking_price, v.evaluation_price, v.discount_percent";

const INSERT_VERSION_SQL: &str = r#"
    INSERT INTO offer_versions (
        source_id, version, operation, batch_id, recorded_at,
        uf, city, neighborhood, address, description, property_type, selling_type,
        asking_price, evaluation_price, discount_percent
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
"#;

impl ToSql for Operation {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Operation {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// Reads the ten snapshot columns starting at column `first`.
fn read_listing(row: &Row<'_>, source_id: String, first: usize) -> rusqlite::Result<Listing> {
    Ok(Listing {
        source_id,
        uf: row.get(first)?,
        city: row.get(first + 1)?,
        neighborhood: row.get(first + 2)?,
        address: row.get(first + 3)?,
        description: row.get(first + 4)?,
        property_type: row.get(first + 5)?,
        selling_type: row.get(first + 6)?,
        asking_price: Decimal::from_micros(row.get(first + 7)?),
        evaluation_price: Decimal::from_micros(row.get(first + 8)?),
        discount_percent: Decimal::from_micros(row.get(first + 9)?),
    })
}

/// Rows that exist but cannot be decoded are corruption, not transient failures.
fn read_error(err: rusqlite::Error) -> RepositoryError {
    match err {
        rusqlite::Error::FromSqlConversionFailure(..) | rusqlite::Error::InvalidColumnType(..) => {
            RepositoryError::Corrupt(err.to_string())
        }
        other => RepositoryError::Database(other),
    }
}

/// Primary-key and unique violations on version rows mean another writer got there first.
fn conflict_or(err: rusqlite::Error, source_id: &str, version: i64) -> RepositoryError {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            RepositoryError::VersionConflict {
                source_id: source_id.to_string(),
                version,
            }
        }
        other => RepositoryError::Database(other),
    }
}

fn append_version(
    stmt: &mut Statement<'_>,
    listing: &Listing,
    version: i64,
    operation: Operation,
    batch_id: i64,
    now: NaiveDateTime,
) -> Result<(), RepositoryError> {
    stmt.execute(params![
        &listing.source_id,
        version,
        operation,
        batch_id,
        now,
        &listing.uf,
        &listing.city,
        &listing.neighborhood,
        &listing.address,
        &listing.description,
        &listing.property_type,
        &listing.selling_type,
        listing.asking_price.micros(),
        listing.evaluation_price.micros(),
        listing.discount_percent.micros(),
    ])
    .map_err(|e| conflict_or(e, &listing.source_id, version))?;
    Ok(())
}

/// `OfferRepository` over the SQLite schema in `sql/schema.sql`.
///
/// Each trait call runs in its own transaction, so a failed call leaves no partial writes.
pub struct SqliteOfferRepository<'a> {
    db: &'a Database,
}

impl<'a> SqliteOfferRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }
}

impl OfferRepository for SqliteOfferRepository<'_> {
    fn find_existing_offers(
        &mut self,
        listings: &[Listing],
    ) -> Result<HashMap<String, ExistingOffer>, RepositoryError> {
        self.db.with_conn(|conn| {
            let mut found = HashMap::new();

            for chunk in listings.chunks(ID_CHUNK) {
                let incoming: HashMap<&str, &Listing> =
                    chunk.iter().map(|l| (l.source_id.as_str(), l)).collect();

                let placeholders = vec!["?"; chunk.len()].join(", ");
                let sql = format!(
                    "SELECT h.source_id, h.latest_version, h.is_active, {SNAPSHOT_COLUMNS}
                     FROM offer_heads h
                     JOIN offer_versions v
                       ON v.source_id = h.source_id AND v.version = h.latest_version
                     WHERE h.source_id IN ({placeholders})"
                );
                let mut stmt = conn.prepare_cached(&sql)?;
                let rows = stmt.query_map(
                    params_from_iter(chunk.iter().map(|l| l.source_id.as_str())),
                    |row| {
                        let source_id: String = row.get(0)?;
                        let latest_version: i64 = row.get(1)?;
                        let is_active: bool = row.get(2)?;
                        let stored = read_listing(row, source_id.clone(), 3)?;
                        Ok((source_id, latest_version, is_active, stored))
                    },
                )?;

                for row in rows {
                    let (source_id, latest_version, is_active, stored) = row.map_err(read_error)?;
                    let changed = !is_active
                        || incoming
                            .get(source_id.as_str())
                            .map_or(true, |l| **l != stored);
                    found.insert(
                        source_id,
                        ExistingOffer {
                            latest_version,
                            is_active,
                            changed,
                        },
                    );
                }
            }

            debug!(incoming = listings.len(), existing = found.len(), "fetched offer heads");
            Ok(found)
        })
    }

    fn insert_versions(
        &mut self,
        entries: &[VersionEntry],
        batch_id: i64,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now().naive_utc();

        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            {
                let mut insert_version = tx.prepare_cached(INSERT_VERSION_SQL)?;
                let mut insert_head = tx.prepare_cached(
                    r#"
                    INSERT INTO offer_heads (
                        source_id, uf, latest_version, is_active,
                        first_seen_at, last_seen_at, last_seen_batch_id
                    ) VALUES (?1, ?2, 1, 1, ?3, ?3, ?4)
                    ON CONFLICT(source_id) DO NOTHING
                    "#,
                )?;
                // Optimistic guard: only advance a head that is still at the version we read.
                let mut advance_head = tx.prepare_cached(
                    r#"
                    UPDATE offer_heads
                    SET latest_version = ?1, is_active = 1, uf = ?2,
                        last_seen_at = ?3, last_seen_batch_id = ?4
                    WHERE source_id = ?5 AND latest_version = ?6
                    "#,
                )?;

                for entry in entries {
                    let listing = &entry.listing;
                    append_version(
                        &mut insert_version,
                        listing,
                        entry.version,
                        entry.operation,
                        batch_id,
                        now,
                    )?;

                    let moved = if entry.version == 1 {
                        insert_head.execute(params![&listing.source_id, &listing.uf, now, batch_id])?
                    } else {
                        advance_head.execute(params![
                            entry.version,
                            &listing.uf,
                            now,
                            batch_id,
                            &listing.source_id,
                            entry.version - 1
                        ])?
                    };
                    if moved != 1 {
                        return Err(RepositoryError::VersionConflict {
                            source_id: listing.source_id.clone(),
                            version: entry.version,
                        });
                    }
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn touch_offers(&mut self, source_ids: &[String], batch_id: i64) -> Result<(), RepositoryError> {
        let now = Utc::now().naive_utc();

        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            for chunk in source_ids.chunks(ID_CHUNK) {
                let placeholders = vec!["?"; chunk.len()].join(", ");
                let sql = format!(
                    "UPDATE offer_heads SET last_seen_at = ?, last_seen_batch_id = ?
                     WHERE source_id IN ({placeholders})"
                );
                let mut values: Vec<&dyn ToSql> = Vec::with_capacity(chunk.len() + 2);
                values.push(&now);
                values.push(&batch_id);
                values.extend(chunk.iter().map(|id| id as &dyn ToSql));

                tx.prepare_cached(&sql)?.execute(values.as_slice())?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn insert_delete_versions(
        &mut self,
        partition_key: &str,
        active_ids: &HashSet<String>,
        batch_id: i64,
    ) -> Result<usize, RepositoryError> {
        let now = Utc::now().naive_utc();

        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;

            let missing: Vec<(Listing, i64)> = {
                let sql = format!(
                    "SELECT h.source_id, h.latest_version, {SNAPSHOT_COLUMNS}
                     FROM offer_heads h
                     JOIN offer_versions v
                       ON v.source_id = h.source_id AND v.version = h.latest_version
                     WHERE h.uf = ?1 AND h.is_active = 1"
                );
                let mut stmt = tx.prepare(&sql)?;
                let rows = stmt.query_map([partition_key], |row| {
                    let source_id: String = row.get(0)?;
                    let latest_version: i64 = row.get(1)?;
                    Ok((read_listing(row, source_id, 2)?, latest_version))
                })?;

                let mut missing = Vec::new();
                for row in rows {
                    let (listing, latest_version) = row.map_err(read_error)?;
                    if !active_ids.contains(&listing.source_id) {
                        missing.push((listing, latest_version));
                    }
                }
                missing
            };

            {
                let mut insert_version = tx.prepare_cached(INSERT_VERSION_SQL)?;
                let mut deactivate = tx.prepare_cached(
                    "UPDATE offer_heads SET latest_version = ?1, is_active = 0
                     WHERE source_id = ?2 AND latest_version = ?3",
                )?;

                for (listing, latest_version) in &missing {
                    let version = latest_version + 1;
                    append_version(
                        &mut insert_version,
                        listing,
                        version,
                        Operation::Delete,
                        batch_id,
                        now,
                    )?;
                    if deactivate.execute(params![version, &listing.source_id, latest_version])? != 1 {
                        return Err(RepositoryError::VersionConflict {
                            source_id: listing.source_id.clone(),
                            version,
                        });
                    }
                }
            }

            tx.commit()?;
            Ok(missing.len())
        })
    }
}

/// One page of active offers, filtered and sorted.
pub fn query_current_offers(
    db: &Database,
    filter: Option<&FilterNode>,
    sort: &[SortClause],
    limit: u32,
    offset: u32,
) -> rusqlite::Result<Vec<CurrentOffer>> {
    let (where_sql, mut values) = match filter {
        Some(node) => {
            let predicate = SqlTranslator::translate(node);
            (format!("WHERE {}", predicate.sql), predicate.params)
        }
        None => (String::new(), Vec::new()),
    };
    values.push(SqlValue::Integer(limit.into()));
    values.push(SqlValue::Integer(offset.into()));

    let sql = format!(
        r#"
        SELECT
            source_id, version,
            uf, city, neighborhood, address, description, property_type, selling_type,
            asking_price, evaluation_price, discount_percent,
            created_at, last_seen_at
        FROM current_offers
        {where_sql}
        {}
        LIMIT ? OFFSET ?
        "#,
        order_by_sql(sort)
    );

    db.with_conn(|conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok(CurrentOffer {
                version: row.get(1)?,
                listing: read_listing(row, row.get(0)?, 2)?,
                created_at: row.get(12)?,
                last_seen_at: row.get(13)?,
            })
        })?;
        rows.collect()
    })
}

/// Full version history of one offer, oldest first. Empty when the offer is unknown.
pub fn offer_history(db: &Database, source_id: &str) -> rusqlite::Result<Vec<VersionedRecord>> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT v.source_id, v.version, v.operation, v.batch_id, v.recorded_at, {SNAPSHOT_COLUMNS}
             FROM offer_versions v
             WHERE v.source_id = ?1
             ORDER BY v.version"
        ))?;
        let rows = stmt.query_map([source_id], |row| {
            let source_id: String = row.get(0)?;
            Ok(VersionedRecord {
                version: row.get(1)?,
                operation: row.get(2)?,
                batch_id: row.get(3)?,
                recorded_at: row.get(4)?,
                listing: read_listing(row, source_id.clone(), 5)?,
                source_id,
            })
        })?;
        rows.collect()
    })
}

/// Source ids of the active offers in one partition.
pub fn active_source_ids(conn: &Connection, partition_key: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT source_id FROM offer_heads WHERE uf = ?1 AND is_active = 1 ORDER BY source_id",
    )?;
    let rows = stmt.query_map([partition_key], |row| row.get(0))?;
    rows.collect()
}

use crate::db::{finish_batch, start_batch, Database, SqliteOfferRepository};
use crate::domain::Listing;
use crate::ingest::reconcile::{ReconcileProgress, ReconcileResult, Reconciler};
use crate::ingest::repository::RepositoryError;
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

/// One full download of the upstream listing feed.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub listings: Vec<Listing>,
    /// Hex SHA-256 of the raw bytes, when the source has them.
    pub content_sha256: Option<String>,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot is not a JSON array of listings: {0}")]
    Json(#[from] serde_json::Error),
    #[error("listing #{index} is invalid: {reason}")]
    InvalidListing { index: usize, reason: String },
}

/// Where snapshots come from.
pub trait ListingSource {
    fn fetch(&mut self) -> Result<Snapshot, SourceError>;
}

/// Reads a snapshot saved as a JSON array of listings.
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    path: PathBuf,
}

impl JsonSnapshotSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Parses raw snapshot bytes. Every listing is normalized before it is returned.
    pub fn parse(bytes: &[u8]) -> Result<Snapshot, SourceError> {
        let raw: Vec<Listing> = serde_json::from_slice(bytes)?;
        let listings = raw
            .into_iter()
            .enumerate()
            .map(|(index, listing)| {
                listing
                    .normalized()
                    .map_err(|reason| SourceError::InvalidListing { index, reason })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Snapshot {
            listings,
            content_sha256: Some(format!("{:x}", Sha256::digest(bytes))),
        })
    }
}

impl ListingSource for JsonSnapshotSource {
    fn fetch(&mut self) -> Result<Snapshot, SourceError> {
        let bytes = std::fs::read(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "read snapshot");
        Self::parse(&bytes)
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("partition {partition} (batch {batch_id}) failed: {source}")]
    Repository {
        partition: String,
        batch_id: i64,
        #[source]
        source: RepositoryError,
    },
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// What happened to one partition during an ingestion run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionReport {
    pub partition_key: String,
    pub batch_id: i64,
    pub listings_seen: usize,
    pub result: ReconcileResult,
}

/// Splits a snapshot by region code.
///
/// With `requested` empty every region present is returned. Otherwise only the requested
/// regions are, and a requested region absent from the snapshot maps to an empty batch.
pub fn partition_listings(
    listings: Vec<Listing>,
    requested: &[String],
) -> BTreeMap<String, Vec<Listing>> {
    let mut groups: BTreeMap<String, Vec<Listing>> = BTreeMap::new();
    for listing in listings {
        groups.entry(listing.uf.clone()).or_default().push(listing);
    }

    if requested.is_empty() {
        return groups;
    }

    let wanted: BTreeSet<String> = requested
        .iter()
        .map(|uf| uf.trim().to_uppercase())
        .filter(|uf| !uf.is_empty())
        .collect();
    let ignored: usize = groups
        .iter()
        .filter(|(uf, _)| !wanted.contains(*uf))
        .map(|(_, l)| l.len())
        .sum();
    if ignored > 0 {
        debug!(ignored, "skipping listings outside the requested partitions");
    }

    wanted
        .into_iter()
        .map(|uf| {
            let listings = groups.remove(&uf).unwrap_or_default();
            (uf, listings)
        })
        .collect()
}

/// Fetches one snapshot and reconciles it partition by partition, recording an
/// ingestion batch per partition.
///
/// Stops at the first failing partition. Its batch row is closed with the error before
/// the error is returned; earlier partitions stay committed.
pub fn ingest_snapshot<S: ListingSource + ?Sized>(
    db: &Database,
    source: &mut S,
    partitions: &[String],
    mut on_progress: impl FnMut(&str, &ReconcileProgress),
) -> Result<Vec<PartitionReport>, IngestError> {
    let snapshot = source.fetch()?;
    let sha = snapshot.content_sha256;
    info!(
        listings = snapshot.listings.len(),
        sha256 = sha.as_deref().unwrap_or("-"),
        "fetched snapshot"
    );

    let mut reports = Vec::new();

    for (partition_key, listings) in partition_listings(snapshot.listings, partitions) {
        let listings_seen = listings.len();
        let batch_id = db.with_conn(|conn| {
            start_batch(conn, &partition_key, sha.as_deref(), Utc::now().naive_utc())
        })?;
        info!(partition = %partition_key, batch_id, listings_seen, "starting batch");

        let mut repo = SqliteOfferRepository::new(db);
        let outcome = Reconciler::new(&mut repo)
            .on_progress(|event| on_progress(&partition_key, event))
            .run(&partition_key, listings, batch_id);

        match outcome {
            Ok(result) => {
                db.with_conn(|conn| {
                    finish_batch(conn, batch_id, Utc::now().naive_utc(), listings_seen, Ok(&result))
                })?;
                reports.push(PartitionReport {
                    partition_key,
                    batch_id,
                    listings_seen,
                    result,
                });
            }
            Err(err) => {
                error!(partition = %partition_key, batch_id, error = %err, "batch failed");
                let message = err.to_string();
                let closed = db.with_conn(|conn| {
                    finish_batch(
                        conn,
                        batch_id,
                        Utc::now().naive_utc(),
                        listings_seen,
                        Err(&message),
                    )
                });
                // Keep the repository error; a failed close is only logged.
                if let Err(close_err) = closed {
                    error!(
                        partition = %partition_key,
                        batch_id,
                        error = %close_err,
                        "could not record batch failure"
                    );
                }
                return Err(IngestError::Repository {
                    partition: partition_key,
                    batch_id,
                    source: err,
                });
            }
        }
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: &str, uf: &str) -> Listing {
        serde_json::from_value(serde_json::json!({ "sourceId": id, "uf": uf })).unwrap()
    }

    #[test]
    fn parse_normalizes_and_hashes() {
        let bytes = br#"[{"sourceId":" 7 ","uf":" sp ","city":"SAO PAULO","askingPrice":"10.50"}]"#;
        let snapshot = JsonSnapshotSource::parse(bytes).unwrap();

        assert_eq!(snapshot.listings[0].source_id, "7");
        assert_eq!(snapshot.listings[0].uf, "SP");
        assert_eq!(snapshot.listings[0].asking_price.to_string(), "10.5");

        let sha = snapshot.content_sha256.unwrap();
        assert_eq!(sha.len(), 64);
        assert_eq!(sha, format!("{:x}", Sha256::digest(bytes)));
    }

    #[test]
    fn parse_reports_index_of_bad_listing() {
        let bytes = br#"[{"sourceId":"1","uf":"SP"},{"sourceId":"","uf":"SP"}]"#;
        let err = JsonSnapshotSource::parse(bytes).unwrap_err();
        assert!(matches!(err, SourceError::InvalidListing { index: 1, .. }));
    }

    #[test]
    fn parse_rejects_non_array() {
        let err = JsonSnapshotSource::parse(br#"{"sourceId":"1"}"#).unwrap_err();
        assert!(matches!(err, SourceError::Json(_)));
    }

    #[test]
    fn partitions_group_by_region() {
        let groups = partition_listings(
            vec![listing("1", "SP"), listing("2", "RJ"), listing("3", "SP")],
            &[],
        );
        assert_eq!(groups.keys().collect::<Vec<_>>(), ["RJ", "SP"]);
        assert_eq!(groups["SP"].len(), 2);
    }

    #[test]
    fn requested_partitions_restrict_and_fill_missing() {
        let groups = partition_listings(
            vec![listing("1", "SP"), listing("2", "RJ")],
            &["sp".to_string(), "MG".to_string()],
        );
        assert_eq!(groups.keys().collect::<Vec<_>>(), ["MG", "SP"]);
        assert!(groups["MG"].is_empty());
        assert_eq!(groups["SP"].len(), 1);
    }
}

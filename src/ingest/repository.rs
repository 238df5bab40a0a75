use crate::domain::{Listing, Operation};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// What the store knows about an offer that appears in an incoming batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExistingOffer {
    pub latest_version: i64,
    pub is_active: bool,
    /// True when the offer is inactive or its latest snapshot differs from the incoming one.
    pub changed: bool,
}

/// A version row to append. `version` is 1 for inserts and `latest_version + 1` otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionEntry {
    pub listing: Listing,
    pub version: i64,
    pub operation: Operation,
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Another writer appended to this offer since it was read.
    #[error("version conflict on offer {source_id}: version {version} already exists or its predecessor moved")]
    VersionConflict { source_id: String, version: i64 },
    #[error("stored data is unreadable: {0}")]
    Corrupt(String),
}

/// Persistence capability used by the reconciliation engine.
///
/// Every batch method must accept inputs of any size; chunking to fit the backing
/// store's parameter limits is the implementation's job.
pub trait OfferRepository {
    /// Latest known state for each incoming listing that the store has seen before.
    fn find_existing_offers(
        &mut self,
        listings: &[Listing],
    ) -> Result<HashMap<String, ExistingOffer>, RepositoryError>;

    /// Appends insert and update versions, advancing each offer's head.
    fn insert_versions(
        &mut self,
        entries: &[VersionEntry],
        batch_id: i64,
    ) -> Result<(), RepositoryError>;

    /// Records that unchanged offers were seen again. No version rows are written.
    fn touch_offers(&mut self, source_ids: &[String], batch_id: i64) -> Result<(), RepositoryError>;

    /// Appends a delete version for every active offer in the partition missing from
    /// `active_ids`. Returns how many offers were removed.
    fn insert_delete_versions(
        &mut self,
        partition_key: &str,
        active_ids: &HashSet<String>,
        batch_id: i64,
    ) -> Result<usize, RepositoryError>;
}

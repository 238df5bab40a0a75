use crate::domain::{Listing, Operation, VersionedRecord};
use crate::filter::{FilterNode, ListingMatcher};
use crate::ingest::repository::{ExistingOffer, OfferRepository, RepositoryError, VersionEntry};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};

/// `OfferRepository` kept entirely in memory. Same append-only rules as the SQLite store.
#[derive(Debug, Default)]
pub struct MemoryOfferRepository {
    history: BTreeMap<String, Vec<VersionedRecord>>,
    last_seen: HashMap<String, i64>,
}

impl MemoryOfferRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every version of an offer, oldest first.
    pub fn history(&self, source_id: &str) -> &[VersionedRecord] {
        self.history.get(source_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_active(&self, source_id: &str) -> bool {
        self.latest(source_id).is_some_and(|r| !r.is_delete())
    }

    pub fn last_seen_batch(&self, source_id: &str) -> Option<i64> {
        self.last_seen.get(source_id).copied()
    }

    /// Active offers matching `filter`, ordered by source id.
    pub fn current<'a>(&'a self, filter: Option<&'a FilterNode>) -> impl Iterator<Item = &'a Listing> {
        self.history
            .values()
            .filter_map(|versions| versions.last())
            .filter(|r| !r.is_delete())
            .map(|r| &r.listing)
            .filter(move |l| filter.map_or(true, |f| ListingMatcher::matches(f, l)))
    }

    fn latest(&self, source_id: &str) -> Option<&VersionedRecord> {
        self.history.get(source_id).and_then(|v| v.last())
    }

    fn append(
        &mut self,
        listing: Listing,
        version: i64,
        operation: Operation,
        batch_id: i64,
    ) -> Result<(), RepositoryError> {
        let versions = self.history.entry(listing.source_id.clone()).or_default();
        if version != versions.len() as i64 + 1 {
            return Err(RepositoryError::VersionConflict {
                source_id: listing.source_id,
                version,
            });
        }
        self.last_seen.insert(listing.source_id.clone(), batch_id);
        versions.push(VersionedRecord {
            source_id: listing.source_id.clone(),
            version,
            operation,
            batch_id,
            recorded_at: Utc::now().naive_utc(),
            listing,
        });
        Ok(())
    }
}

impl OfferRepository for MemoryOfferRepository {
    fn find_existing_offers(
        &mut self,
        listings: &[Listing],
    ) -> Result<HashMap<String, ExistingOffer>, RepositoryError> {
        Ok(listings
            .iter()
            .filter_map(|incoming| {
                let latest = self.latest(&incoming.source_id)?;
                let is_active = !latest.is_delete();
                Some((
                    incoming.source_id.clone(),
                    ExistingOffer {
                        latest_version: latest.version,
                        is_active,
                        changed: !is_active || latest.listing != *incoming,
                    },
                ))
            })
            .collect())
    }

    fn insert_versions(
        &mut self,
        entries: &[VersionEntry],
        batch_id: i64,
    ) -> Result<(), RepositoryError> {
        // Validate first so a conflict leaves nothing half-applied.
        for entry in entries {
            let current = self.history(&entry.listing.source_id).len() as i64;
            if entry.version != current + 1 {
                return Err(RepositoryError::VersionConflict {
                    source_id: entry.listing.source_id.clone(),
                    version: entry.version,
                });
            }
        }
        for entry in entries {
            self.append(entry.listing.clone(), entry.version, entry.operation, batch_id)?;
        }
        Ok(())
    }

    fn touch_offers(&mut self, source_ids: &[String], batch_id: i64) -> Result<(), RepositoryError> {
        for id in source_ids {
            self.last_seen.insert(id.clone(), batch_id);
        }
        Ok(())
    }

    fn insert_delete_versions(
        &mut self,
        partition_key: &str,
        active_ids: &HashSet<String>,
        batch_id: i64,
    ) -> Result<usize, RepositoryError> {
        let missing: Vec<(Listing, i64)> = self
            .history
            .values()
            .filter_map(|versions| versions.last())
            .filter(|r| !r.is_delete() && r.listing.uf == partition_key)
            .filter(|r| !active_ids.contains(&r.source_id))
            .map(|r| (r.listing.clone(), r.version + 1))
            .collect();

        for (listing, version) in &missing {
            self.append(listing.clone(), *version, Operation::Delete, batch_id)?;
        }
        Ok(missing.len())
    }
}

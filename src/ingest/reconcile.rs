use crate::domain::{Listing, Operation};
use crate::ingest::repository::{OfferRepository, RepositoryError, VersionEntry};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Outcome counts of one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileResult {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub removed: usize,
}

/// Progress events, emitted in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "lowercase")]
pub enum ReconcileProgress {
    Classifying { total: usize },
    Classified { created: usize, updated: usize, skipped: usize },
    Inserting { count: usize },
    Updating { count: usize },
    Touching { count: usize },
    Removing,
}

/// Diffs one partition's incoming batch against stored history and applies the minimal
/// set of appends.
///
/// Phases run strictly in order: fetch, insert, update, touch, delete. A repository error
/// aborts the run and is returned unchanged.
pub struct Reconciler<'r, R: OfferRepository + ?Sized> {
    repo: &'r mut R,
    observer: Option<Box<dyn FnMut(&ReconcileProgress) + 'r>>,
}

impl<'r, R: OfferRepository + ?Sized> Reconciler<'r, R> {
    pub fn new(repo: &'r mut R) -> Self {
        Self {
            repo,
            observer: None,
        }
    }

    pub fn on_progress(mut self, observer: impl FnMut(&ReconcileProgress) + 'r) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    fn emit(&mut self, event: ReconcileProgress) {
        debug!(?event, "reconcile progress");
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
    }

    /// Reconciles `listings` as the complete current contents of `partition_key`.
    ///
    /// When a source id appears more than once, the last occurrence wins.
    pub fn run(
        mut self,
        partition_key: &str,
        listings: Vec<Listing>,
        batch_id: i64,
    ) -> Result<ReconcileResult, RepositoryError> {
        let incoming = dedupe_last_wins(listings);
        let dropped = incoming.duplicates;
        let listings = incoming.listings;
        if dropped > 0 {
            warn!(
                partition = partition_key,
                duplicates = dropped,
                "batch contains repeated source ids; keeping the last occurrence"
            );
        }

        self.emit(ReconcileProgress::Classifying {
            total: listings.len(),
        });

        let active_ids: HashSet<String> = listings.iter().map(|l| l.source_id.clone()).collect();
        let existing = self.repo.find_existing_offers(&listings)?;

        let mut inserts = Vec::new();
        let mut updates = Vec::new();
        let mut touches = Vec::new();

        for listing in listings {
            match existing.get(&listing.source_id) {
                None => inserts.push(VersionEntry {
                    listing,
                    version: 1,
                    operation: Operation::Insert,
                }),
                Some(found) if found.changed => updates.push(VersionEntry {
                    listing,
                    version: found.latest_version + 1,
                    operation: Operation::Update,
                }),
                Some(_) => touches.push(listing.source_id),
            }
        }

        self.emit(ReconcileProgress::Classified {
            created: inserts.len(),
            updated: updates.len(),
            skipped: touches.len(),
        });

        self.emit(ReconcileProgress::Inserting {
            count: inserts.len(),
        });
        if !inserts.is_empty() {
            self.repo.insert_versions(&inserts, batch_id)?;
        }

        self.emit(ReconcileProgress::Updating {
            count: updates.len(),
        });
        if !updates.is_empty() {
            self.repo.insert_versions(&updates, batch_id)?;
        }

        self.emit(ReconcileProgress::Touching {
            count: touches.len(),
        });
        if !touches.is_empty() {
            self.repo.touch_offers(&touches, batch_id)?;
        }

        self.emit(ReconcileProgress::Removing);
        let removed = self
            .repo
            .insert_delete_versions(partition_key, &active_ids, batch_id)?;

        let result = ReconcileResult {
            created: inserts.len(),
            updated: updates.len(),
            skipped: touches.len(),
            removed,
        };
        info!(
            partition = partition_key,
            batch_id,
            created = result.created,
            updated = result.updated,
            skipped = result.skipped,
            removed = result.removed,
            "reconciled partition"
        );
        Ok(result)
    }
}

/// Convenience wrapper for callers that do not stream progress.
pub fn reconcile<R: OfferRepository + ?Sized>(
    repo: &mut R,
    partition_key: &str,
    listings: Vec<Listing>,
    batch_id: i64,
) -> Result<ReconcileResult, RepositoryError> {
    Reconciler::new(repo).run(partition_key, listings, batch_id)
}

struct Deduped {
    listings: Vec<Listing>,
    duplicates: usize,
}

/// Keeps the first position of each source id but the last value seen for it.
fn dedupe_last_wins(listings: Vec<Listing>) -> Deduped {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(listings.len());
    let mut out: Vec<Listing> = Vec::with_capacity(listings.len());
    let mut duplicates = 0;

    for listing in listings {
        match index.get(&listing.source_id) {
            Some(&i) => {
                out[i] = listing;
                duplicates += 1;
            }
            None => {
                index.insert(listing.source_id.clone(), out.len());
                out.push(listing);
            }
        }
    }

    Deduped {
        listings: out,
        duplicates,
    }
}

pub mod memory;
pub mod orchestrator;
pub mod reconcile;
pub mod repository;

pub use memory::MemoryOfferRepository;
pub use orchestrator::{
    ingest_snapshot, IngestError, JsonSnapshotSource, ListingSource, PartitionReport, Snapshot,
    SourceError,
};
pub use reconcile::{reconcile, ReconcileProgress, ReconcileResult, Reconciler};
pub use repository::{ExistingOffer, OfferRepository, RepositoryError, VersionEntry};

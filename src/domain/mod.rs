pub mod decimal;
pub mod listing;
pub mod version;

pub use decimal::Decimal;
pub use listing::{CurrentOffer, Listing};
pub use version::{Operation, VersionedRecord};

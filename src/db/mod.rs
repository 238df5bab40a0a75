pub mod batches;
pub mod connection;
pub mod offers;

pub use batches::{finish_batch, get_recent_batches, start_batch, IngestionBatch};
pub use connection::{init_db, Database};
pub use offers::{offer_history, query_current_offers, SqliteOfferRepository};

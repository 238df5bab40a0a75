//! Auction offer ingestion with an append-only version history, and a filter/sort query
//! language for reading the current offers back.
//!
//! The `offer_tracker` binary wires these modules into `serve` and `ingest` commands.
//! Embedders can drive [`ingest::Reconciler`] against any [`ingest::OfferRepository`],
//! including the in-memory [`ingest::MemoryOfferRepository`].

pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod filter;
pub mod ingest;
pub mod responses;
pub mod router;

#[cfg(test)]
mod tests;

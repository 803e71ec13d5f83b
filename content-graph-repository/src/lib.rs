//! # Content Graph Repository
//! This crate provides the storage contract of the content graph projection:
//! a read-only hypergraph query port, a write port, and the transactional
//! store that hands out both. It ships a PostgreSQL implementation and an
//! in-memory implementation for tests and local development.
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod postgres;

pub use config::PostgresGraphStoreConfig;
pub use errors::RepositoryError;
pub use interfaces::{
    DescendantNodeAggregateIds, GraphStore, GraphTransaction, GraphWriter, ProjectionHypergraph,
};
pub use memory::{InMemoryGraphStore, InMemoryGraphTransaction};
pub use postgres::{PostgresGraphStore, PostgresGraphTransaction, TableNames};

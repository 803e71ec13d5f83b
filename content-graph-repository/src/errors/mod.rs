//! Error types for the content graph repository.
mod repository;

pub use repository::RepositoryError;

use crate::errors::RepositoryError;

use super::{GraphWriter, ProjectionHypergraph};

/// A unit of work against the projection: queries and writes issued through
/// it become visible to others on [`GraphTransaction::commit`]. Dropping a
/// transaction without committing rolls all of its writes back.
#[async_trait::async_trait]
pub trait GraphTransaction: ProjectionHypergraph + GraphWriter {
    async fn commit(self) -> Result<(), RepositoryError>;
}

/// Hands out transactions on the projection tables and manages their schema.
#[async_trait::async_trait]
pub trait GraphStore: Send + Sync {
    type Transaction: GraphTransaction;

    async fn begin(&self) -> Result<Self::Transaction, RepositoryError>;

    /// Creates the projection tables if they do not exist yet.
    async fn setup(&self) -> Result<(), RepositoryError>;

    /// Removes all projected rows, leaving the schema in place.
    async fn reset(&self) -> Result<(), RepositoryError>;
}

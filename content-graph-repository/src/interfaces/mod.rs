//! This module defines and re-exports the storage contract of the content
//! graph projection.
mod hypergraph;
mod store;
mod writer;

pub use hypergraph::{DescendantNodeAggregateIds, ProjectionHypergraph};
pub use store::{GraphStore, GraphTransaction};
pub use writer::GraphWriter;

//! # Content Graph Shared
//! Value types shared by the content graph repository and projection crates:
//! identifiers, dimension space points, the node / hyperrelation records and
//! the domain events that are replayed into the graph.
pub mod types;

pub use types::*;

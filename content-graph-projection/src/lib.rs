//! # Content Graph Projection
//! Keeps the content graph hypergraph consistent with the stream of content
//! graph events: content stream forks and removals, node creation, removal,
//! modification, referencing, renaming, retyping, variation, tagging,
//! disabling and moves.
//!
//! Writes to node records shared between content streams go through
//! [`copy_on_write()`], so a fork only ever copies the nodes it changes.
pub mod copy_on_write;
pub mod engine;
pub mod errors;
mod handlers;

pub use copy_on_write::{copy_on_write, NodePatch};
pub use engine::ProjectionEngine;
pub use errors::ProjectionError;

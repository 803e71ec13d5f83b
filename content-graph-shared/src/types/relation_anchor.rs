use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Surrogate key of one physical node row.
///
/// Hierarchy, restriction and reference relations join on the anchor rather
/// than on the node aggregate id, so a logical node can be represented by a
/// different row in each content stream once copy-on-write has diverged them.
/// Anchors are minted once and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationAnchorPoint(Uuid);

impl RelationAnchorPoint {
    pub fn create() -> Self {
        Self(Uuid::new_v4())
    }

    /// The parent anchor of the hierarchy hyperrelations holding root nodes.
    /// No node record ever carries it.
    pub fn for_root_edge() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_root_edge(&self) -> bool {
        self.0.is_nil()
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RelationAnchorPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

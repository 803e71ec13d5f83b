use super::dimension::{DimensionSpacePoint, DimensionSpacePointHash};
use super::ids::ContentStreamId;
use super::relation_anchor::RelationAnchorPoint;

/// Parent → ordered children edge set, scoped to one content stream and one
/// dimension space point.
///
/// Keyed by `(content_stream_id, dimension_space_point_hash, parent_node_anchor)`.
/// Within one such scope an anchor is the child of at most one hyperrelation.
#[derive(Clone, Debug, PartialEq)]
pub struct HierarchyHyperrelationRecord {
    pub content_stream_id: ContentStreamId,
    pub parent_node_anchor: RelationAnchorPoint,
    pub dimension_space_point: DimensionSpacePoint,
    pub dimension_space_point_hash: DimensionSpacePointHash,
    pub child_node_anchors: Vec<RelationAnchorPoint>,
}

impl HierarchyHyperrelationRecord {
    pub fn new(
        content_stream_id: ContentStreamId,
        parent_node_anchor: RelationAnchorPoint,
        dimension_space_point: DimensionSpacePoint,
        child_node_anchors: Vec<RelationAnchorPoint>,
    ) -> Self {
        let dimension_space_point_hash = dimension_space_point.hash();
        Self {
            content_stream_id,
            parent_node_anchor,
            dimension_space_point,
            dimension_space_point_hash,
            child_node_anchors,
        }
    }

    /// Inserts `anchor` before `succeeding_sibling`, or appends it when no
    /// sibling is given or the sibling is not a child here. An anchor that is
    /// already a child is moved rather than duplicated.
    pub fn add_child_node_anchor(
        &mut self,
        anchor: RelationAnchorPoint,
        succeeding_sibling: Option<RelationAnchorPoint>,
    ) {
        self.child_node_anchors.retain(|child| *child != anchor);
        let position = succeeding_sibling.and_then(|sibling| {
            self.child_node_anchors
                .iter()
                .position(|child| *child == sibling)
        });
        match position {
            Some(position) => self.child_node_anchors.insert(position, anchor),
            None => self.child_node_anchors.push(anchor),
        }
    }

    pub fn remove_child_node_anchor(&mut self, anchor: RelationAnchorPoint) -> bool {
        let before = self.child_node_anchors.len();
        self.child_node_anchors.retain(|child| *child != anchor);
        self.child_node_anchors.len() != before
    }

    /// Swaps `old` for `new` in place, keeping its position.
    pub fn replace_child_node_anchor(
        &mut self,
        old: RelationAnchorPoint,
        new: RelationAnchorPoint,
    ) -> bool {
        match self.child_node_anchors.iter().position(|child| *child == old) {
            Some(position) => {
                self.child_node_anchors[position] = new;
                true
            }
            None => false,
        }
    }

    pub fn contains_child_node_anchor(&self, anchor: RelationAnchorPoint) -> bool {
        self.child_node_anchors.contains(&anchor)
    }

    /// The child directly after `anchor`, if any.
    pub fn succeeding_sibling_of(&self, anchor: RelationAnchorPoint) -> Option<RelationAnchorPoint> {
        let position = self
            .child_node_anchors
            .iter()
            .position(|child| *child == anchor)?;
        self.child_node_anchors.get(position + 1).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.child_node_anchors.is_empty()
    }
}

use std::collections::BTreeSet;

use super::dimension::DimensionSpacePointHash;
use super::ids::{ContentStreamId, NodeAggregateId, SubtreeTag};

/// Subtree marker: the origin aggregate is tagged with `tag` in one dimension
/// space point of one content stream, and so is every affected aggregate
/// below it. The origin aggregate itself is part of the affected set.
#[derive(Clone, Debug, PartialEq)]
pub struct RestrictionHyperrelationRecord {
    pub content_stream_id: ContentStreamId,
    pub dimension_space_point_hash: DimensionSpacePointHash,
    pub origin_node_aggregate_id: NodeAggregateId,
    pub tag: SubtreeTag,
    pub affected_node_aggregate_ids: BTreeSet<NodeAggregateId>,
}

impl RestrictionHyperrelationRecord {
    pub fn new(
        content_stream_id: ContentStreamId,
        dimension_space_point_hash: DimensionSpacePointHash,
        origin_node_aggregate_id: NodeAggregateId,
        tag: SubtreeTag,
        affected_node_aggregate_ids: BTreeSet<NodeAggregateId>,
    ) -> Self {
        Self {
            content_stream_id,
            dimension_space_point_hash,
            origin_node_aggregate_id,
            tag,
            affected_node_aggregate_ids,
        }
    }

    pub fn add_affected_node_aggregate_id(&mut self, id: NodeAggregateId) -> bool {
        self.affected_node_aggregate_ids.insert(id)
    }

    pub fn remove_affected_node_aggregate_id(&mut self, id: &NodeAggregateId) -> bool {
        self.affected_node_aggregate_ids.remove(id)
    }

    pub fn affects(&self, id: &NodeAggregateId) -> bool {
        self.affected_node_aggregate_ids.contains(id)
    }
}

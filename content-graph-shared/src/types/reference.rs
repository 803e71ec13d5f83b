use super::ids::{NodeAggregateId, ReferenceName};
use super::properties::SerializedPropertyValues;
use super::relation_anchor::RelationAnchorPoint;

/// Named, ordered edge from a node record to another node aggregate.
///
/// References hang off the source anchor and are not scoped by content
/// stream; positions per `(source_node_anchor, name)` run contiguously from 0.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceRelationRecord {
    pub source_node_anchor: RelationAnchorPoint,
    pub name: ReferenceName,
    pub position: u32,
    pub properties: Option<SerializedPropertyValues>,
    pub destination_node_aggregate_id: NodeAggregateId,
}

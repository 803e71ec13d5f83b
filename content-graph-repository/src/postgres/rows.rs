//! Row types of the projection tables and their conversion into records.
use content_graph_shared::{
    ContentStreamId, DimensionSpacePoint, DimensionSpacePointHash, HierarchyHyperrelationRecord,
    NodeAggregateClassification, NodeAggregateId, NodeName, NodeRecord, NodeTypeName,
    OriginDimensionSpacePoint, ReferenceName, ReferenceRelationRecord, RelationAnchorPoint,
    RestrictionHyperrelationRecord, SerializedPropertyValues, SubtreeTag,
};
use uuid::Uuid;

use crate::errors::RepositoryError;

pub(super) const NODE_COLUMNS: &str = "n.relation_anchor_point, n.node_aggregate_id, \
    n.origin_dimension_space_point, n.origin_dimension_space_point_hash, n.properties, \
    n.node_type_name, n.classification, n.node_name";

pub(super) const HIERARCHY_COLUMNS: &str = "h.content_stream_id, h.parent_node_anchor, \
    h.dimension_space_point, h.dimension_space_point_hash, h.child_node_anchors";

pub(super) const RESTRICTION_COLUMNS: &str = "r.content_stream_id, r.dimension_space_point_hash, \
    r.origin_node_aggregate_id, r.tag, r.affected_node_aggregate_ids";

pub(super) const REFERENCE_COLUMNS: &str = "ref.source_node_anchor, ref.name, ref.position, \
    ref.properties, ref.destination_node_aggregate_id";

#[derive(sqlx::FromRow)]
pub(super) struct NodeRow {
    relation_anchor_point: Uuid,
    node_aggregate_id: String,
    origin_dimension_space_point: serde_json::Value,
    origin_dimension_space_point_hash: String,
    properties: serde_json::Value,
    node_type_name: String,
    classification: String,
    node_name: Option<String>,
}

impl TryFrom<NodeRow> for NodeRecord {
    type Error = RepositoryError;

    fn try_from(row: NodeRow) -> Result<Self, Self::Error> {
        let origin: DimensionSpacePoint = serde_json::from_value(row.origin_dimension_space_point)?;
        let properties: SerializedPropertyValues = serde_json::from_value(row.properties)?;
        let classification: NodeAggregateClassification = row
            .classification
            .parse()
            .map_err(|e| RepositoryError::invalid_record(format!("{e}")))?;

        Ok(NodeRecord {
            relation_anchor_point: RelationAnchorPoint::from_uuid(row.relation_anchor_point),
            node_aggregate_id: NodeAggregateId::new(row.node_aggregate_id),
            origin_dimension_space_point: OriginDimensionSpacePoint::new(origin),
            origin_dimension_space_point_hash: DimensionSpacePointHash::new(
                row.origin_dimension_space_point_hash,
            ),
            properties,
            node_type_name: NodeTypeName::new(row.node_type_name),
            classification,
            node_name: row.node_name.map(NodeName::new),
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct HierarchyRow {
    content_stream_id: String,
    parent_node_anchor: Uuid,
    dimension_space_point: serde_json::Value,
    dimension_space_point_hash: String,
    child_node_anchors: Vec<Uuid>,
}

impl TryFrom<HierarchyRow> for HierarchyHyperrelationRecord {
    type Error = RepositoryError;

    fn try_from(row: HierarchyRow) -> Result<Self, Self::Error> {
        Ok(HierarchyHyperrelationRecord {
            content_stream_id: ContentStreamId::new(row.content_stream_id),
            parent_node_anchor: RelationAnchorPoint::from_uuid(row.parent_node_anchor),
            dimension_space_point: serde_json::from_value(row.dimension_space_point)?,
            dimension_space_point_hash: DimensionSpacePointHash::new(
                row.dimension_space_point_hash,
            ),
            child_node_anchors: row
                .child_node_anchors
                .into_iter()
                .map(RelationAnchorPoint::from_uuid)
                .collect(),
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct RestrictionRow {
    content_stream_id: String,
    dimension_space_point_hash: String,
    origin_node_aggregate_id: String,
    tag: String,
    affected_node_aggregate_ids: Vec<String>,
}

impl From<RestrictionRow> for RestrictionHyperrelationRecord {
    fn from(row: RestrictionRow) -> Self {
        RestrictionHyperrelationRecord::new(
            ContentStreamId::new(row.content_stream_id),
            DimensionSpacePointHash::new(row.dimension_space_point_hash),
            NodeAggregateId::new(row.origin_node_aggregate_id),
            SubtreeTag::new(row.tag),
            row.affected_node_aggregate_ids
                .into_iter()
                .map(NodeAggregateId::new)
                .collect(),
        )
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct ReferenceRow {
    source_node_anchor: Uuid,
    name: String,
    position: i32,
    properties: Option<serde_json::Value>,
    destination_node_aggregate_id: String,
}

impl TryFrom<ReferenceRow> for ReferenceRelationRecord {
    type Error = RepositoryError;

    fn try_from(row: ReferenceRow) -> Result<Self, Self::Error> {
        let position = u32::try_from(row.position).map_err(|_| {
            RepositoryError::invalid_record(format!("negative reference position {}", row.position))
        })?;

        Ok(ReferenceRelationRecord {
            source_node_anchor: RelationAnchorPoint::from_uuid(row.source_node_anchor),
            name: ReferenceName::new(row.name),
            position,
            properties: row.properties.map(serde_json::from_value).transpose()?,
            destination_node_aggregate_id: NodeAggregateId::new(row.destination_node_aggregate_id),
        })
    }
}

pub(super) fn position_to_db(position: u32) -> Result<i32, RepositoryError> {
    i32::try_from(position).map_err(|_| {
        RepositoryError::invalid_record(format!("reference position {position} out of range"))
    })
}

pub(super) fn anchors_to_db(anchors: &[RelationAnchorPoint]) -> Vec<Uuid> {
    anchors.iter().map(RelationAnchorPoint::as_uuid).collect()
}

//! The read port the event handlers query the current graph state through.
use std::collections::{BTreeMap, BTreeSet};

use content_graph_shared::{
    ContentStreamId, DimensionSpacePoint, DimensionSpacePointHash, DimensionSpacePointSet,
    HierarchyHyperrelationRecord, NodeAggregateId, NodeRecord, OriginDimensionSpacePoint,
    ReferenceRelationRecord, RelationAnchorPoint, RestrictionHyperrelationRecord,
};

use crate::errors::RepositoryError;

/// Aggregate ids of a subtree, per dimension space point hash. The entry
/// aggregate is part of each set.
pub type DescendantNodeAggregateIds = BTreeMap<DimensionSpacePointHash, BTreeSet<NodeAggregateId>>;

/// Queries over the projected hypergraph, as seen from inside one transaction.
///
/// Methods take `&mut self` because reads run on the transaction's
/// connection and must observe the transaction's own uncommitted writes.
#[async_trait::async_trait]
pub trait ProjectionHypergraph: Send {
    async fn find_node_record_by_relation_anchor_point(
        &mut self,
        anchor: RelationAnchorPoint,
    ) -> Result<Option<NodeRecord>, RepositoryError>;

    /// The variant of `node_aggregate_id` that originates in `origin` and is
    /// visible somewhere in the content stream.
    async fn find_node_record_by_origin(
        &mut self,
        content_stream_id: &ContentStreamId,
        origin: &OriginDimensionSpacePoint,
        node_aggregate_id: &NodeAggregateId,
    ) -> Result<Option<NodeRecord>, RepositoryError>;

    /// The variant of `node_aggregate_id` visible in `dimension_space_point`.
    async fn find_node_record_by_coverage(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_point: &DimensionSpacePoint,
        node_aggregate_id: &NodeAggregateId,
    ) -> Result<Option<NodeRecord>, RepositoryError>;

    /// Every distinct node record of the aggregate visible in the stream.
    async fn find_node_records_for_node_aggregate(
        &mut self,
        content_stream_id: &ContentStreamId,
        node_aggregate_id: &NodeAggregateId,
    ) -> Result<Vec<NodeRecord>, RepositoryError>;

    async fn find_hierarchy_hyperrelation_by_parent_node_anchor(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_point: &DimensionSpacePoint,
        parent_node_anchor: RelationAnchorPoint,
    ) -> Result<Option<HierarchyHyperrelationRecord>, RepositoryError>;

    async fn find_hierarchy_hyperrelation_by_child_node_anchor(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_point: &DimensionSpacePoint,
        child_node_anchor: RelationAnchorPoint,
    ) -> Result<Option<HierarchyHyperrelationRecord>, RepositoryError>;

    /// Hyperrelations of the stream holding `child_node_anchor` as a child,
    /// optionally limited to the given dimension space points.
    async fn find_ingoing_hierarchy_hyperrelations(
        &mut self,
        content_stream_id: &ContentStreamId,
        child_node_anchor: RelationAnchorPoint,
        dimension_space_points: Option<&DimensionSpacePointSet>,
    ) -> Result<Vec<HierarchyHyperrelationRecord>, RepositoryError>;

    /// Hyperrelations of the stream whose parent is `parent_node_anchor`,
    /// optionally limited to the given dimension space points.
    async fn find_outgoing_hierarchy_hyperrelations(
        &mut self,
        content_stream_id: &ContentStreamId,
        parent_node_anchor: RelationAnchorPoint,
        dimension_space_points: Option<&DimensionSpacePointSet>,
    ) -> Result<Vec<HierarchyHyperrelationRecord>, RepositoryError>;

    async fn find_hierarchy_hyperrelations_for_content_stream(
        &mut self,
        content_stream_id: &ContentStreamId,
    ) -> Result<Vec<HierarchyHyperrelationRecord>, RepositoryError>;

    /// Whether any hierarchy hyperrelation, in any stream and dimension space
    /// point, still holds the anchor as a child.
    async fn is_child_node_anchor_in_any_hierarchy(
        &mut self,
        anchor: RelationAnchorPoint,
    ) -> Result<bool, RepositoryError>;

    /// Number of distinct content streams whose hierarchy holds the anchor as
    /// a child. Stores with concurrent writers lock the node record until the
    /// transaction ends, so the count stays valid for a following copy.
    async fn count_content_stream_coverage(
        &mut self,
        anchor: RelationAnchorPoint,
    ) -> Result<usize, RepositoryError>;

    /// Dimension space points in which the aggregate is visible in the stream.
    async fn find_coverage_by_node_aggregate_id(
        &mut self,
        content_stream_id: &ContentStreamId,
        node_aggregate_id: &NodeAggregateId,
    ) -> Result<DimensionSpacePointSet, RepositoryError>;

    /// The subtree below (and including) the entry aggregate, per dimension
    /// space point. Points in which the entry aggregate is not visible are
    /// absent from the result.
    async fn find_descendant_node_aggregate_ids(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_points: &DimensionSpacePointSet,
        entry_node_aggregate_id: &NodeAggregateId,
    ) -> Result<DescendantNodeAggregateIds, RepositoryError>;

    /// Restriction hyperrelations that list the aggregate as affected.
    async fn find_ingoing_restriction_relations(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_point_hash: &DimensionSpacePointHash,
        node_aggregate_id: &NodeAggregateId,
    ) -> Result<Vec<RestrictionHyperrelationRecord>, RepositoryError>;

    /// Restriction hyperrelations originating at the aggregate.
    async fn find_outgoing_restriction_relations(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_point_hash: &DimensionSpacePointHash,
        origin_node_aggregate_id: &NodeAggregateId,
    ) -> Result<Vec<RestrictionHyperrelationRecord>, RepositoryError>;

    async fn find_restriction_hyperrelations_for_content_stream(
        &mut self,
        content_stream_id: &ContentStreamId,
    ) -> Result<Vec<RestrictionHyperrelationRecord>, RepositoryError>;

    /// Ordered by reference name, then position.
    async fn find_outgoing_reference_relations(
        &mut self,
        source_node_anchor: RelationAnchorPoint,
    ) -> Result<Vec<ReferenceRelationRecord>, RepositoryError>;

    async fn count_node_records(&mut self) -> Result<usize, RepositoryError>;

    /// A hierarchy hyperrelation holding a parent variant of
    /// `parent_node_aggregate_id` in the given dimension space point.
    async fn find_child_hierarchy_hyperrelation(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_point: &DimensionSpacePoint,
        parent_node_aggregate_id: &NodeAggregateId,
    ) -> Result<Option<HierarchyHyperrelationRecord>, RepositoryError> {
        let Some(parent) = self
            .find_node_record_by_coverage(
                content_stream_id,
                dimension_space_point,
                parent_node_aggregate_id,
            )
            .await?
        else {
            return Ok(None);
        };

        self.find_hierarchy_hyperrelation_by_parent_node_anchor(
            content_stream_id,
            dimension_space_point,
            parent.relation_anchor_point,
        )
        .await
    }

    /// The parent of the aggregate's variant originating in `origin`, looked
    /// up in the hierarchy of the origin point itself.
    async fn find_parent_node_record_by_origin(
        &mut self,
        content_stream_id: &ContentStreamId,
        origin: &OriginDimensionSpacePoint,
        child_node_aggregate_id: &NodeAggregateId,
    ) -> Result<Option<NodeRecord>, RepositoryError> {
        let Some(child) = self
            .find_node_record_by_origin(content_stream_id, origin, child_node_aggregate_id)
            .await?
        else {
            return Ok(None);
        };

        let Some(ingoing) = self
            .find_hierarchy_hyperrelation_by_child_node_anchor(
                content_stream_id,
                origin.as_dimension_space_point(),
                child.relation_anchor_point,
            )
            .await?
        else {
            return Ok(None);
        };

        self.find_node_record_by_relation_anchor_point(ingoing.parent_node_anchor)
            .await
    }

    /// The node directly after the aggregate's variant originating in
    /// `origin`, among the children of its parent in the origin point.
    async fn find_succeeding_sibling_node_record_by_origin(
        &mut self,
        content_stream_id: &ContentStreamId,
        origin: &OriginDimensionSpacePoint,
        node_aggregate_id: &NodeAggregateId,
    ) -> Result<Option<NodeRecord>, RepositoryError> {
        let Some(node) = self
            .find_node_record_by_origin(content_stream_id, origin, node_aggregate_id)
            .await?
        else {
            return Ok(None);
        };

        let Some(ingoing) = self
            .find_hierarchy_hyperrelation_by_child_node_anchor(
                content_stream_id,
                origin.as_dimension_space_point(),
                node.relation_anchor_point,
            )
            .await?
        else {
            return Ok(None);
        };

        match ingoing.succeeding_sibling_of(node.relation_anchor_point) {
            Some(sibling_anchor) => {
                self.find_node_record_by_relation_anchor_point(sibling_anchor)
                    .await
            }
            None => Ok(None),
        }
    }
}

//! The write port: row mutations issued by the event handlers.
use content_graph_shared::{
    ContentStreamId, DimensionSpacePointSet, HierarchyHyperrelationRecord, NodeAggregateId,
    NodeRecord, ReferenceName, ReferenceRelationRecord, RelationAnchorPoint,
    RestrictionHyperrelationRecord, SubtreeTag,
};

use crate::errors::RepositoryError;

/// Row mutations on the four projection tables. Every call runs inside the
/// transaction that implements it.
#[async_trait::async_trait]
pub trait GraphWriter: Send {
    /// Serializes this transaction with every other transaction that locks
    /// the same content stream, until commit or rollback.
    async fn lock_content_stream(
        &mut self,
        content_stream_id: &ContentStreamId,
    ) -> Result<(), RepositoryError>;

    async fn insert_node_record(&mut self, node: &NodeRecord) -> Result<(), RepositoryError>;

    /// Overwrites the record stored under `node.relation_anchor_point`.
    async fn update_node_record(&mut self, node: &NodeRecord) -> Result<(), RepositoryError>;

    /// Deletes those of the given node records that no hierarchy
    /// hyperrelation holds as a child anymore, along with their outgoing
    /// references. Returns the number of deleted node records.
    async fn delete_orphaned_node_records(
        &mut self,
        anchors: &[RelationAnchorPoint],
    ) -> Result<u64, RepositoryError>;

    async fn insert_hierarchy_hyperrelation(
        &mut self,
        relation: &HierarchyHyperrelationRecord,
    ) -> Result<(), RepositoryError>;

    /// Persists `relation.child_node_anchors` for the relation's key.
    async fn update_hierarchy_hyperrelation_children(
        &mut self,
        relation: &HierarchyHyperrelationRecord,
    ) -> Result<(), RepositoryError>;

    /// Moves the relation (and with it all of its children) to another
    /// parent anchor.
    async fn reassign_hierarchy_hyperrelation_parent(
        &mut self,
        relation: &HierarchyHyperrelationRecord,
        new_parent_node_anchor: RelationAnchorPoint,
    ) -> Result<(), RepositoryError>;

    async fn delete_hierarchy_hyperrelation(
        &mut self,
        relation: &HierarchyHyperrelationRecord,
    ) -> Result<(), RepositoryError>;

    /// Duplicates the source stream's hierarchy and restriction rows into the
    /// target stream. Node and reference rows are untouched. Returns the
    /// number of copied hierarchy and restriction rows.
    async fn fork_content_stream(
        &mut self,
        source_content_stream_id: &ContentStreamId,
        target_content_stream_id: &ContentStreamId,
    ) -> Result<(u64, u64), RepositoryError>;

    /// Deletes the stream's hierarchy and restriction rows and returns every
    /// anchor the deleted hierarchy rows held as a child.
    async fn remove_content_stream(
        &mut self,
        content_stream_id: &ContentStreamId,
    ) -> Result<Vec<RelationAnchorPoint>, RepositoryError>;

    /// Inserts the restriction, replacing an existing one with the same key.
    async fn upsert_restriction_hyperrelation(
        &mut self,
        restriction: &RestrictionHyperrelationRecord,
    ) -> Result<(), RepositoryError>;

    /// Persists `restriction.affected_node_aggregate_ids` for the key.
    async fn update_restriction_hyperrelation(
        &mut self,
        restriction: &RestrictionHyperrelationRecord,
    ) -> Result<(), RepositoryError>;

    /// Deletes restrictions originating at the aggregate in the given
    /// dimension space points, for one tag or for all of them.
    async fn delete_outgoing_restriction_hyperrelations(
        &mut self,
        content_stream_id: &ContentStreamId,
        origin_node_aggregate_id: &NodeAggregateId,
        tag: Option<&SubtreeTag>,
        dimension_space_points: &DimensionSpacePointSet,
    ) -> Result<u64, RepositoryError>;

    async fn insert_reference_relations(
        &mut self,
        references: &[ReferenceRelationRecord],
    ) -> Result<(), RepositoryError>;

    /// Deletes the anchor's outgoing references, of one name or all.
    async fn delete_reference_relations(
        &mut self,
        source_node_anchor: RelationAnchorPoint,
        name: Option<&ReferenceName>,
    ) -> Result<u64, RepositoryError>;

    async fn copy_reference_relations(
        &mut self,
        source_node_anchor: RelationAnchorPoint,
        target_node_anchor: RelationAnchorPoint,
    ) -> Result<u64, RepositoryError>;
}

use content_graph_repository::GraphTransaction;
use content_graph_shared::{
    ContentStreamId, DimensionSpacePointSet, NodeAggregateId, RestrictionHyperrelationRecord,
    SubtreeTag, SubtreeWasTagged, SubtreeWasUntagged,
};
use tracing::debug;

use crate::errors::ProjectionError;

pub(crate) async fn when_subtree_was_tagged<T: GraphTransaction>(
    tx: &mut T,
    event: &SubtreeWasTagged,
) -> Result<(), ProjectionError> {
    tag_subtree(
        tx,
        &event.content_stream_id,
        &event.node_aggregate_id,
        &event.affected_dimension_space_points,
        &event.tag,
    )
    .await
}

pub(crate) async fn when_subtree_was_untagged<T: GraphTransaction>(
    tx: &mut T,
    event: &SubtreeWasUntagged,
) -> Result<(), ProjectionError> {
    untag_subtree(
        tx,
        &event.content_stream_id,
        &event.node_aggregate_id,
        &event.affected_dimension_space_points,
        &event.tag,
    )
    .await
}

/// Writes one restriction per affected point, listing the origin aggregate
/// and all of its descendants there.
pub(crate) async fn tag_subtree<T: GraphTransaction>(
    tx: &mut T,
    content_stream_id: &ContentStreamId,
    origin_node_aggregate_id: &NodeAggregateId,
    affected_dimension_space_points: &DimensionSpacePointSet,
    tag: &SubtreeTag,
) -> Result<(), ProjectionError> {
    let descendants = tx
        .find_descendant_node_aggregate_ids(
            content_stream_id,
            affected_dimension_space_points,
            origin_node_aggregate_id,
        )
        .await?;

    for (dimension_space_point_hash, affected) in descendants {
        debug!(
            node_aggregate_id = %origin_node_aggregate_id,
            dimension_space_point_hash = %dimension_space_point_hash,
            tag = %tag,
            affected_count = affected.len(),
            "Subtree was tagged"
        );
        let restriction = RestrictionHyperrelationRecord::new(
            content_stream_id.clone(),
            dimension_space_point_hash,
            origin_node_aggregate_id.clone(),
            tag.clone(),
            affected,
        );
        tx.upsert_restriction_hyperrelation(&restriction).await?;
    }
    Ok(())
}

pub(crate) async fn untag_subtree<T: GraphTransaction>(
    tx: &mut T,
    content_stream_id: &ContentStreamId,
    origin_node_aggregate_id: &NodeAggregateId,
    affected_dimension_space_points: &DimensionSpacePointSet,
    tag: &SubtreeTag,
) -> Result<(), ProjectionError> {
    let deleted = tx
        .delete_outgoing_restriction_hyperrelations(
            content_stream_id,
            origin_node_aggregate_id,
            Some(tag),
            affected_dimension_space_points,
        )
        .await?;

    debug!(
        node_aggregate_id = %origin_node_aggregate_id,
        tag = %tag,
        deleted_count = deleted,
        "Subtree was untagged"
    );
    Ok(())
}

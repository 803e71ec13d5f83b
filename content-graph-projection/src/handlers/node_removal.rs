use content_graph_repository::{GraphTransaction, RepositoryError};
use content_graph_shared::{
    ContentStreamId, DimensionSpacePoint, DimensionSpacePointSet, NodeAggregateWasRemoved,
    RelationAnchorPoint,
};
use tracing::{debug, info};

use super::hierarchy::{detach_from_parent, remove_from_restrictions};
use crate::errors::ProjectionError;

const NODE_AGGREGATE_WAS_REMOVED: &str = "NodeAggregateWasRemoved";

pub(crate) async fn when_node_aggregate_was_removed<T: GraphTransaction>(
    tx: &mut T,
    event: &NodeAggregateWasRemoved,
) -> Result<(), ProjectionError> {
    let mut orphan_candidates = Vec::new();

    for dimension_space_point in &event.affected_covered_dimension_space_points {
        let node = tx
            .find_node_record_by_coverage(
                &event.content_stream_id,
                dimension_space_point,
                &event.node_aggregate_id,
            )
            .await?
            .ok_or_else(|| {
                ProjectionError::source_node_missing(
                    NODE_AGGREGATE_WAS_REMOVED,
                    &event.node_aggregate_id,
                    Some(dimension_space_point),
                )
            })?;

        if let Some(ingoing) = tx
            .find_hierarchy_hyperrelation_by_child_node_anchor(
                &event.content_stream_id,
                dimension_space_point,
                node.relation_anchor_point,
            )
            .await?
        {
            detach_from_parent(tx, ingoing, node.relation_anchor_point).await?;
        }

        remove_from_restrictions(
            tx,
            &event.content_stream_id,
            dimension_space_point,
            &event.node_aggregate_id,
        )
        .await?;

        let single_point: DimensionSpacePointSet =
            std::iter::once(dimension_space_point.clone()).collect();
        tx.delete_outgoing_restriction_hyperrelations(
            &event.content_stream_id,
            &event.node_aggregate_id,
            None,
            &single_point,
        )
        .await?;

        orphan_candidates.push(node.relation_anchor_point);
        orphan_candidates.extend(
            cascade_hierarchy(
                tx,
                &event.content_stream_id,
                dimension_space_point,
                node.relation_anchor_point,
            )
            .await?,
        );
    }

    let deleted = tx
        .delete_orphaned_node_records(&orphan_candidates)
        .await?;

    info!(
        node_aggregate_id = %event.node_aggregate_id,
        candidate_count = orphan_candidates.len(),
        deleted_count = deleted,
        "Node aggregate was removed"
    );
    Ok(())
}

/// Tears down the subtree below `entry_anchor` in one content stream and
/// dimension space point. Returns the anchors no hierarchy references as a
/// child anymore; their references are already gone.
async fn cascade_hierarchy<T: GraphTransaction>(
    tx: &mut T,
    content_stream_id: &ContentStreamId,
    dimension_space_point: &DimensionSpacePoint,
    entry_anchor: RelationAnchorPoint,
) -> Result<Vec<RelationAnchorPoint>, RepositoryError> {
    let mut orphaned = Vec::new();
    let mut stack = vec![entry_anchor];
    let single_point: DimensionSpacePointSet =
        std::iter::once(dimension_space_point.clone()).collect();

    while let Some(parent_anchor) = stack.pop() {
        let Some(relation) = tx
            .find_hierarchy_hyperrelation_by_parent_node_anchor(
                content_stream_id,
                dimension_space_point,
                parent_anchor,
            )
            .await?
        else {
            continue;
        };
        tx.delete_hierarchy_hyperrelation(&relation).await?;

        for child_anchor in relation.child_node_anchors {
            if !tx.is_child_node_anchor_in_any_hierarchy(child_anchor).await? {
                tx.delete_reference_relations(child_anchor, None).await?;
                orphaned.push(child_anchor);
            }

            if let Some(child) = tx
                .find_node_record_by_relation_anchor_point(child_anchor)
                .await?
            {
                remove_from_restrictions(
                    tx,
                    content_stream_id,
                    dimension_space_point,
                    &child.node_aggregate_id,
                )
                .await?;
                tx.delete_outgoing_restriction_hyperrelations(
                    content_stream_id,
                    &child.node_aggregate_id,
                    None,
                    &single_point,
                )
                .await?;
            }

            stack.push(child_anchor);
        }
    }

    debug!(
        content_stream_id = %content_stream_id,
        dimension_space_point = %dimension_space_point,
        orphaned_count = orphaned.len(),
        "Cascaded removal through hierarchy"
    );
    Ok(orphaned)
}

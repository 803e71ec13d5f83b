use std::collections::BTreeSet;

use content_graph_repository::GraphTransaction;
use content_graph_shared::{
    ContentStreamId, CoverageSucceedingSibling, DimensionSpacePoint, DimensionSpacePointSet,
    NodeAggregateId, NodeAggregateWasMoved,
};
use tracing::debug;

use super::hierarchy::{connect_to_parent, detach_from_parent, resolve_sibling_anchor};
use crate::errors::ProjectionError;

const NODE_AGGREGATE_WAS_MOVED: &str = "NodeAggregateWasMoved";

/// Repositions the aggregate in each listed point: among its current
/// siblings when no new parent is given, below the new parent otherwise.
pub(crate) async fn when_node_aggregate_was_moved<T: GraphTransaction>(
    tx: &mut T,
    event: &NodeAggregateWasMoved,
) -> Result<(), ProjectionError> {
    for coverage_sibling in &event.succeeding_siblings_for_coverage {
        move_in_point(tx, event, coverage_sibling).await?;
    }
    Ok(())
}

async fn move_in_point<T: GraphTransaction>(
    tx: &mut T,
    event: &NodeAggregateWasMoved,
    coverage_sibling: &CoverageSucceedingSibling,
) -> Result<(), ProjectionError> {
    let content_stream_id = &event.content_stream_id;
    let dimension_space_point = &coverage_sibling.dimension_space_point;

    let node = tx
        .find_node_record_by_coverage(
            content_stream_id,
            dimension_space_point,
            &event.node_aggregate_id,
        )
        .await?
        .ok_or_else(|| {
            ProjectionError::source_node_missing(
                NODE_AGGREGATE_WAS_MOVED,
                &event.node_aggregate_id,
                Some(dimension_space_point),
            )
        })?;
    let anchor = node.relation_anchor_point;

    let mut current = tx
        .find_hierarchy_hyperrelation_by_child_node_anchor(
            content_stream_id,
            dimension_space_point,
            anchor,
        )
        .await?
        .ok_or_else(|| {
            ProjectionError::source_parent_node_missing(
                NODE_AGGREGATE_WAS_MOVED,
                &event.node_aggregate_id,
                Some(dimension_space_point),
            )
        })?;

    let new_parent = match &event.new_parent_node_aggregate_id {
        Some(new_parent_id) => Some(
            tx.find_node_record_by_coverage(content_stream_id, dimension_space_point, new_parent_id)
                .await?
                .ok_or_else(|| {
                    ProjectionError::target_parent_node_missing(
                        NODE_AGGREGATE_WAS_MOVED,
                        new_parent_id,
                        Some(dimension_space_point),
                    )
                })?,
        ),
        None => None,
    };

    let sibling_id = coverage_sibling
        .succeeding_sibling_node_aggregate_id
        .as_ref()
        .filter(|sibling_id| *sibling_id != &event.node_aggregate_id);
    let sibling_anchor =
        resolve_sibling_anchor(tx, content_stream_id, dimension_space_point, sibling_id).await?;

    let new_parent = new_parent.filter(|parent| {
        parent.relation_anchor_point != current.parent_node_anchor
    });

    let Some(new_parent) = new_parent else {
        current.add_child_node_anchor(anchor, sibling_anchor);
        tx.update_hierarchy_hyperrelation_children(&current).await?;
        debug!(
            node_aggregate_id = %event.node_aggregate_id,
            dimension_space_point = %dimension_space_point,
            "Node was reordered among its siblings"
        );
        return Ok(());
    };

    detach_from_parent(tx, current, anchor).await?;
    connect_to_parent(
        tx,
        content_stream_id,
        dimension_space_point,
        new_parent.relation_anchor_point,
        anchor,
        sibling_anchor,
    )
    .await?;

    reassign_restrictions(
        tx,
        content_stream_id,
        dimension_space_point,
        &event.node_aggregate_id,
        &new_parent.node_aggregate_id,
    )
    .await?;

    debug!(
        node_aggregate_id = %event.node_aggregate_id,
        new_parent_node_aggregate_id = %new_parent.node_aggregate_id,
        dimension_space_point = %dimension_space_point,
        "Node was moved to a new parent"
    );
    Ok(())
}

/// The moved subtree leaves every restriction it inherited from its old
/// ancestors and joins every restriction affecting the new parent.
/// Restrictions originating inside the subtree stay as they are.
async fn reassign_restrictions<T: GraphTransaction>(
    tx: &mut T,
    content_stream_id: &ContentStreamId,
    dimension_space_point: &DimensionSpacePoint,
    node_aggregate_id: &NodeAggregateId,
    new_parent_node_aggregate_id: &NodeAggregateId,
) -> Result<(), ProjectionError> {
    let hash = dimension_space_point.hash();
    let point: DimensionSpacePointSet = std::iter::once(dimension_space_point.clone()).collect();
    let subtree: BTreeSet<NodeAggregateId> = tx
        .find_descendant_node_aggregate_ids(content_stream_id, &point, node_aggregate_id)
        .await?
        .remove(&hash)
        .unwrap_or_default();

    for mut restriction in tx
        .find_ingoing_restriction_relations(content_stream_id, &hash, node_aggregate_id)
        .await?
    {
        if subtree.contains(&restriction.origin_node_aggregate_id) {
            continue;
        }
        for id in &subtree {
            restriction.remove_affected_node_aggregate_id(id);
        }
        tx.update_restriction_hyperrelation(&restriction).await?;
    }

    for mut restriction in tx
        .find_ingoing_restriction_relations(content_stream_id, &hash, new_parent_node_aggregate_id)
        .await?
    {
        for id in &subtree {
            restriction.add_affected_node_aggregate_id(id.clone());
        }
        tx.update_restriction_hyperrelation(&restriction).await?;
    }
    Ok(())
}

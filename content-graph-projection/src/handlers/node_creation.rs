use content_graph_repository::GraphTransaction;
use content_graph_shared::{
    NodeAggregateWithNodeWasCreated, NodeRecord, OriginDimensionSpacePoint, RelationAnchorPoint,
    RootNodeAggregateWithNodeWasCreated, SerializedPropertyValues,
};
use tracing::debug;

use super::hierarchy::{connect_to_parent, inherit_restrictions, resolve_sibling_anchor};
use crate::errors::ProjectionError;

const NODE_AGGREGATE_WITH_NODE_WAS_CREATED: &str = "NodeAggregateWithNodeWasCreated";

/// Root nodes hang below the root edge in every covered dimension space point.
pub(crate) async fn when_root_node_aggregate_with_node_was_created<T: GraphTransaction>(
    tx: &mut T,
    event: &RootNodeAggregateWithNodeWasCreated,
) -> Result<(), ProjectionError> {
    let node = NodeRecord::new(
        RelationAnchorPoint::create(),
        event.node_aggregate_id.clone(),
        OriginDimensionSpacePoint::empty(),
        SerializedPropertyValues::new(),
        event.node_type_name.clone(),
        event.node_aggregate_classification,
        None,
    );
    tx.insert_node_record(&node).await?;

    for dimension_space_point in &event.covered_dimension_space_points {
        connect_to_parent(
            tx,
            &event.content_stream_id,
            dimension_space_point,
            RelationAnchorPoint::for_root_edge(),
            node.relation_anchor_point,
            None,
        )
        .await?;
    }

    debug!(
        node_aggregate_id = %event.node_aggregate_id,
        anchor = %node.relation_anchor_point,
        "Root node was created"
    );
    Ok(())
}

pub(crate) async fn when_node_aggregate_with_node_was_created<T: GraphTransaction>(
    tx: &mut T,
    event: &NodeAggregateWithNodeWasCreated,
) -> Result<(), ProjectionError> {
    let node = NodeRecord::new(
        RelationAnchorPoint::create(),
        event.node_aggregate_id.clone(),
        event.origin_dimension_space_point.clone(),
        event.initial_property_values.clone(),
        event.node_type_name.clone(),
        event.node_aggregate_classification,
        event.node_name.clone(),
    );
    tx.insert_node_record(&node).await?;

    let child_ids = [event.node_aggregate_id.clone()];
    for dimension_space_point in &event.covered_dimension_space_points {
        let parent = tx
            .find_node_record_by_coverage(
                &event.content_stream_id,
                dimension_space_point,
                &event.parent_node_aggregate_id,
            )
            .await?
            .ok_or_else(|| {
                ProjectionError::target_parent_node_missing(
                    NODE_AGGREGATE_WITH_NODE_WAS_CREATED,
                    &event.parent_node_aggregate_id,
                    Some(dimension_space_point),
                )
            })?;

        let succeeding_sibling_anchor = resolve_sibling_anchor(
            tx,
            &event.content_stream_id,
            dimension_space_point,
            event.succeeding_node_aggregate_id.as_ref(),
        )
        .await?;

        connect_to_parent(
            tx,
            &event.content_stream_id,
            dimension_space_point,
            parent.relation_anchor_point,
            node.relation_anchor_point,
            succeeding_sibling_anchor,
        )
        .await?;

        inherit_restrictions(
            tx,
            &event.content_stream_id,
            dimension_space_point,
            &event.parent_node_aggregate_id,
            &child_ids,
        )
        .await?;
    }

    debug!(
        node_aggregate_id = %event.node_aggregate_id,
        anchor = %node.relation_anchor_point,
        coverage = event.covered_dimension_space_points.len(),
        "Node was created"
    );
    Ok(())
}

use content_graph_repository::GraphTransaction;
use content_graph_shared::{NodeAggregateWasDisabled, NodeAggregateWasEnabled, SubtreeTag};

use super::subtree_tagging::{tag_subtree, untag_subtree};
use crate::errors::ProjectionError;

/// Disabling is tagging the subtree with the `disabled` tag.
pub(crate) async fn when_node_aggregate_was_disabled<T: GraphTransaction>(
    tx: &mut T,
    event: &NodeAggregateWasDisabled,
) -> Result<(), ProjectionError> {
    tag_subtree(
        tx,
        &event.content_stream_id,
        &event.node_aggregate_id,
        &event.affected_dimension_space_points,
        &SubtreeTag::disabled(),
    )
    .await
}

pub(crate) async fn when_node_aggregate_was_enabled<T: GraphTransaction>(
    tx: &mut T,
    event: &NodeAggregateWasEnabled,
) -> Result<(), ProjectionError> {
    untag_subtree(
        tx,
        &event.content_stream_id,
        &event.node_aggregate_id,
        &event.affected_dimension_space_points,
        &SubtreeTag::disabled(),
    )
    .await
}

use content_graph_repository::GraphTransaction;
use content_graph_shared::NodeAggregateNameWasChanged;
use tracing::debug;

use crate::copy_on_write::{copy_on_write, NodePatch};
use crate::errors::ProjectionError;

const NODE_AGGREGATE_NAME_WAS_CHANGED: &str = "NodeAggregateNameWasChanged";

/// Renames every variant of the aggregate visible in the content stream.
pub(crate) async fn when_node_aggregate_name_was_changed<T: GraphTransaction>(
    tx: &mut T,
    event: &NodeAggregateNameWasChanged,
) -> Result<(), ProjectionError> {
    let nodes = tx
        .find_node_records_for_node_aggregate(&event.content_stream_id, &event.node_aggregate_id)
        .await?;
    if nodes.is_empty() {
        return Err(ProjectionError::source_node_missing(
            NODE_AGGREGATE_NAME_WAS_CHANGED,
            &event.node_aggregate_id,
            None,
        ));
    }

    let patch = NodePatch::RenameTo(event.new_node_name.clone());
    for node in &nodes {
        copy_on_write(tx, &event.content_stream_id, node, &patch).await?;
    }

    debug!(
        node_aggregate_id = %event.node_aggregate_id,
        new_node_name = %event.new_node_name,
        variant_count = nodes.len(),
        "Node aggregate was renamed"
    );
    Ok(())
}
